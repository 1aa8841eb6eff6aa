//! Polling loop and manual burst
//!
//! The loop honours the peak schedule, sleeps through `StopFlag` so a stop
//! request cuts any wait short, and evicts started events after every
//! successful cycle. A manual burst ignores the schedule, polls fast for a
//! bounded duration and may run alongside the loop; only one burst runs at a
//! time.

use chrono::{Datelike, Local, Timelike, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::engine::{ScanEngine, ScanStats};
use super::schedule::PeakSchedule;
use crate::adapters::OddsFeed;
use crate::config::ScannerConfig;
use crate::coordination::{StopFlag, StopReason};
use crate::error::{OddsArbError, Result};

/// Summary of one manual burst
#[derive(Debug, Clone)]
pub struct BurstReport {
    pub burst_id: Uuid,
    pub scans: u32,
    pub stats: ScanStats,
    pub credits_used: u32,
    pub elapsed: Duration,
}

impl BurstReport {
    pub fn message(&self) -> String {
        format!(
            "📊 **MANUAL SCAN COMPLETE**\n\n\
             ⏱️ Duration: {:.1}s\n\
             🔄 Scans Performed: {}\n\
             🎯 Opportunities Found: {}\n\
             💳 API Credits Used: {}\n\n\
             _Scan {} finished at {}_",
            self.elapsed.as_secs_f64(),
            self.scans,
            self.stats.opportunities,
            self.credits_used,
            self.burst_id,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Clears the burst flag when the burst ends, however it ends
struct BurstGuard(Arc<AtomicBool>);

impl BurstGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| OddsArbError::BurstInProgress)?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for BurstGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Runner {
    engine: Arc<ScanEngine>,
    feed: Arc<dyn OddsFeed>,
    schedule: PeakSchedule,
    config: ScannerConfig,
    sports: Vec<String>,
    stop: Arc<StopFlag>,
    burst_active: Arc<AtomicBool>,
}

impl Runner {
    pub fn new(
        engine: Arc<ScanEngine>,
        feed: Arc<dyn OddsFeed>,
        schedule: PeakSchedule,
        config: ScannerConfig,
        sports: Vec<String>,
        stop: Arc<StopFlag>,
    ) -> Self {
        Self {
            engine,
            feed,
            schedule,
            config,
            sports,
            stop,
            burst_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sports(&self) -> &[String] {
        &self.sports
    }

    pub fn is_burst_active(&self) -> bool {
        self.burst_active.load(Ordering::SeqCst)
    }

    /// Fetch and scan each sport once.
    ///
    /// A failing sport is logged and skipped; the cycle only errors when
    /// every fetch failed.
    pub async fn run_cycle(&self, sports: &[String]) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        let mut last_error = None;

        for sport in sports {
            match self.feed.fetch_events(sport).await {
                Ok(events) => {
                    let batch = self.engine.process_events(sport, &events, Utc::now()).await;
                    stats.merge(&batch);
                }
                Err(e) => {
                    error!("Failed to fetch {} from {}: {}", sport, self.feed.name(), e);
                    stats.fetch_failures += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if stats.fetch_failures == sports.len() => Err(e),
            _ => Ok(stats),
        }
    }

    /// Poll until stopped or until `duration` has elapsed
    pub async fn run(&self, duration: Option<Duration>) -> ScanStats {
        let started = Instant::now();
        let deadline = duration.map(|d| started + d);
        let mut total = ScanStats::default();
        let mut cycle: u64 = 0;

        info!(
            "Scanner started: sports [{}], feed {}",
            self.sports.join(", "),
            self.feed.name()
        );
        for line in self.schedule.describe() {
            info!("  Peak window {}", line);
        }

        loop {
            if self.stop.is_stopped() {
                break;
            }
            if deadline.map_or(false, |d| Instant::now() >= d) {
                self.stop.request_stop(StopReason::DurationElapsed);
                break;
            }

            let now = Local::now();
            let (weekday, hour) = (now.weekday().num_days_from_monday(), now.hour());
            let active = self.schedule.active_sports_at(&self.sports, weekday, hour);

            if active.is_empty() {
                for sport in &self.sports {
                    if let Some(next) = self.schedule.next_window(sport, weekday, hour) {
                        info!("{} off-peak, next window {}", sport, next);
                    }
                }
                let wait = self.schedule.interval(false);
                info!("Sleeping {}s (off-peak mode)", wait.as_secs());
                self.pause(wait, deadline).await;
                continue;
            }

            cycle += 1;
            info!("Cycle #{} at {}", cycle, now.format("%H:%M:%S"));

            match self.run_cycle(&active).await {
                Ok(stats) => {
                    info!("Cycle #{} complete: {}", cycle, stats.summary());
                    total.merge(&stats);
                    self.engine.evict_started(Utc::now()).await;
                    self.pause(self.schedule.interval(true), deadline).await;
                }
                Err(e) => {
                    total.fetch_failures += active.len();
                    error!(
                        "Cycle #{} failed: {}; retrying in {}s",
                        cycle, e, self.config.retry_delay_secs
                    );
                    self.pause(Duration::from_secs(self.config.retry_delay_secs), deadline)
                        .await;
                }
            }
        }

        info!(
            "Scanner stopped after {} cycles in {:.0}s: {}",
            cycle,
            started.elapsed().as_secs_f64(),
            total.summary()
        );
        total
    }

    /// Run one burst on the current task
    pub async fn run_burst(&self, sports: &[String]) -> Result<BurstReport> {
        let guard = BurstGuard::acquire(&self.burst_active)?;
        Ok(self.burst(sports, guard).await)
    }

    /// Start a burst on its own task, alongside the polling loop.
    ///
    /// Fails immediately when a burst is already running.
    pub fn spawn_burst(self: &Arc<Self>, sports: Vec<String>) -> Result<JoinHandle<BurstReport>> {
        let guard = BurstGuard::acquire(&self.burst_active)?;
        let runner = Arc::clone(self);
        Ok(tokio::spawn(async move { runner.burst(&sports, guard).await }))
    }

    /// Start a burst on every SIGUSR1 until the stop flag is set
    #[cfg(unix)]
    pub fn install_burst_trigger(self: &Arc<Self>) {
        use tokio::signal::unix::{signal, SignalKind};

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let mut usr1 = match signal(SignalKind::user_defined1()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Burst trigger unavailable: {}", e);
                    return;
                }
            };
            loop {
                tokio::select! {
                    received = usr1.recv() => {
                        if received.is_none() {
                            break;
                        }
                    }
                    _ = runner.stop.wait() => break,
                }
                match runner.spawn_burst(runner.sports.clone()) {
                    Ok(_) => info!("Manual scan triggered by SIGUSR1"),
                    Err(e) => warn!("{}", e),
                }
            }
        });
    }

    async fn burst(&self, sports: &[String], _guard: BurstGuard) -> BurstReport {
        let burst_id = Uuid::new_v4();
        let duration = Duration::from_secs(self.config.burst_duration_secs);
        let interval = Duration::from_secs(self.config.burst_interval_secs);
        let credits_before = self.feed.requests_made();
        let started = Instant::now();
        let mut stats = ScanStats::default();
        let mut scans: u32 = 0;

        info!(
            "🚀 MANUAL SCAN BURST STARTED ({}) | Duration: {}s | Interval: {}s",
            burst_id,
            duration.as_secs(),
            interval.as_secs()
        );

        while started.elapsed() < duration && !self.stop.is_stopped() {
            scans += 1;
            info!("🔄 Manual Scan #{} at {}", scans, Local::now().format("%H:%M:%S"));

            match self.run_cycle(sports).await {
                Ok(batch) => {
                    if batch.opportunities > 0 {
                        warn!("✅ Manual scan found {} arbs", batch.opportunities);
                    }
                    stats.merge(&batch);
                }
                Err(e) => {
                    error!("❌ Error during manual scan: {}", e);
                    stats.fetch_failures += sports.len();
                }
            }

            if !self.stop.sleep(interval).await {
                break;
            }
        }

        let report = BurstReport {
            burst_id,
            scans,
            stats,
            credits_used: self.feed.requests_made().saturating_sub(credits_before),
            elapsed: started.elapsed(),
        };

        if let Err(e) = self.engine.alerts().notify_text(&report.message()).await {
            error!("Failed to send scan report: {}", e);
        }
        info!(
            "✅ Manual scan complete: {} scans, {} arbs, {} credits",
            report.scans, report.stats.opportunities, report.credits_used
        );
        report
    }

    /// Sleep, but never past the run deadline
    async fn pause(&self, wait: Duration, deadline: Option<Instant>) {
        let wait = match deadline {
            Some(d) => wait.min(d.saturating_duration_since(Instant::now())),
            None => wait,
        };
        self.stop.sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LogNotifier;
    use crate::config::AppConfig;
    use crate::domain::Event;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    struct CountingFeed {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl OddsFeed for CountingFeed {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch_events(&self, _sport: &str) -> Result<Vec<Event>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(OddsArbError::Feed("down".to_string()))
            } else {
                Ok(Vec::new())
            }
        }

        fn requests_made(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn runner(fail: bool, burst_duration_secs: u64) -> Arc<Runner> {
        let mut config = AppConfig::default_config(true);
        config.scanner.burst_duration_secs = burst_duration_secs;
        config.scanner.burst_interval_secs = 1;
        let engine = Arc::new(ScanEngine::from_config(&config, Arc::new(LogNotifier)));
        let feed = Arc::new(CountingFeed {
            calls: AtomicU32::new(0),
            fail,
        });
        Arc::new(Runner::new(
            engine,
            feed,
            PeakSchedule::always(Duration::from_secs(60)),
            config.scanner,
            vec!["basketball_nba".to_string(), "tennis_atp".to_string()],
            StopFlag::new(),
        ))
    }

    #[tokio::test]
    async fn test_cycle_errors_only_when_every_fetch_fails() {
        let ok = runner(false, 0);
        let stats = ok.run_cycle(ok.sports()).await.unwrap();
        assert_eq!(stats.fetch_failures, 0);

        let down = runner(true, 0);
        assert!(down.run_cycle(down.sports()).await.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_flag() {
        let r = runner(false, 0);
        let handle = {
            let r = Arc::clone(&r);
            tokio::spawn(async move { r.run(None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        r.stop.request_stop(StopReason::Requested);

        let stats = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.fetch_failures, 0);
    }

    #[tokio::test]
    async fn test_run_honours_duration() {
        let r = runner(false, 0);
        tokio::time::timeout(Duration::from_secs(2), r.run(Some(Duration::from_millis(20))))
            .await
            .unwrap();
        assert!(r.stop.is_stopped());
    }

    #[tokio::test]
    async fn test_only_one_burst_at_a_time() {
        let r = runner(false, 1);
        let first = r.spawn_burst(r.sports().to_vec()).unwrap();
        assert!(r.is_burst_active());
        assert!(matches!(
            r.run_burst(r.sports()).await,
            Err(OddsArbError::BurstInProgress)
        ));

        let report = first.await.unwrap();
        assert!(report.scans >= 1);
        assert_eq!(report.credits_used, report.scans * 2);
        assert!(!r.is_burst_active());
        assert!(report.message().contains("MANUAL SCAN COMPLETE"));
    }
}
