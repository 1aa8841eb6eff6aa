//! Alert Manager
//!
//! Formats opportunities and market signals for chat delivery and keeps a
//! per-event cooldown so the same arbitrage is not announced every cycle.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::adapters::Notifier;
use crate::bookmakers::{display_name, BookmakerClassifier, RiskLevel, RiskStatus, RuleDatabase};
use crate::config::{AlertConfig, MAX_WINDOW_MINUTES};
use crate::domain::{DriftSignal, MarketSignal, Opportunity, SportFamily, ValueBetSignal};
use crate::error::Result;

/// Cooldown state for one event
#[derive(Debug, Clone)]
struct CooldownEntry {
    alerted_at: DateTime<Utc>,
    starts_at: DateTime<Utc>,
}

fn sport_emoji(sport_key: &str) -> &'static str {
    let sport = sport_key.to_lowercase();
    if sport.contains("basketball") {
        "\u{1f3c0}" // basketball
    } else if sport.contains("tennis") {
        "\u{1f3be}" // tennis
    } else {
        "\u{26bd}" // soccer ball
    }
}

/// Market type key handed to the risk check
fn market_type(sport_key: &str) -> String {
    match SportFamily::from_sport_key(sport_key) {
        SportFamily::Basketball => "basketball_moneyline".to_string(),
        SportFamily::Soccer => "soccer_h2h".to_string(),
        SportFamily::Other => sport_key.to_string(),
    }
}

/// Alert Manager for opportunity and signal notifications
pub struct AlertManager {
    config: AlertConfig,
    notifier: Arc<dyn Notifier>,
    classifier: Arc<BookmakerClassifier>,
    rules: Arc<RuleDatabase>,
    recent: Arc<RwLock<HashMap<String, CooldownEntry>>>,
}

impl AlertManager {
    pub fn new(
        config: AlertConfig,
        notifier: Arc<dyn Notifier>,
        classifier: Arc<BookmakerClassifier>,
        rules: Arc<RuleDatabase>,
    ) -> Self {
        Self {
            config,
            notifier,
            classifier,
            rules,
            recent: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Most severe risk status across every bookmaker pair of the opportunity
    pub fn assess(&self, opp: &Opportunity) -> RiskStatus {
        let market = market_type(&opp.sport_key);
        let bookmakers = opp.bookmakers();

        let mut worst: Option<RiskStatus> = None;
        for (i, a) in bookmakers.iter().enumerate() {
            for b in &bookmakers[i + 1..] {
                if a == b {
                    continue;
                }
                let status = self.rules.risk_check(&market, a, b);
                if worst.as_ref().map_or(true, |w| status.level > w.level) {
                    worst = Some(status);
                }
            }
        }

        worst.unwrap_or(RiskStatus {
            level: RiskLevel::Ok,
            message: "Rules match".to_string(),
        })
    }

    /// Mobile-friendly alert text for an opportunity
    pub fn format_opportunity(&self, opp: &Opportunity, now: DateTime<Utc>) -> String {
        let risk = self.assess(opp);
        let first = opp.bets.first().map(|b| b.bookmaker.as_str()).unwrap_or_default();
        let second = opp
            .bets
            .iter()
            .map(|b| b.bookmaker.as_str())
            .find(|b| *b != first)
            .unwrap_or(first);
        let tag = self.classifier.priority_tag(first, second);

        let mut lines = Vec::new();
        if risk.level == RiskLevel::Critical {
            lines.push(format!(
                "{} **RULE MISMATCH: CHECK TERMS BEFORE BETTING!**",
                RiskLevel::Critical.emoji()
            ));
            lines.push(format!(
                "\u{1f6a8} **ARB FOUND ({:.1}% Profit) - HIGH RISK**",
                opp.roi.round_dp(1)
            ));
        } else {
            lines.push(format!(
                "{} **[{}] ARB FOUND ({:.1}% Profit)**",
                tag.icon(),
                tag.label(),
                opp.roi.round_dp(1)
            ));
        }
        lines.push(format!(
            "{} **{}** ({})",
            sport_emoji(&opp.sport_key),
            opp.event_name,
            opp.sport
        ));
        lines.push(format!(
            "Starts: {}",
            opp.commence_time.format("%Y-%m-%d %H:%M UTC")
        ));

        for (i, bet) in opp.bets.iter().enumerate() {
            lines.push(String::new());
            lines.push(format!(
                "**BET {}:** Back **{}** @ **{:.2}**",
                i + 1,
                bet.outcome,
                bet.price.round_dp(2)
            ));
            lines.push(format!("Bookie: **{}**", display_name(&bet.bookmaker)));
            lines.push(format!("Stake: **${}**", bet.stake.round_dp(0)));
        }

        lines.push(String::new());
        lines.push(format!(
            "**Total Risk:** ${} | **Guaranteed Profit:** ${:.2}",
            opp.total_stake().round_dp(0),
            opp.guaranteed_profit().round_dp(2)
        ));

        if risk.level != RiskLevel::Critical {
            lines.push(String::new());
            lines.push(format!("**Why {}?** {}", tag.label(), tag.explanation()));
        }

        if let Some(recommendation) = self.classifier.recommendation(first, second) {
            lines.push(String::new());
            lines.push(recommendation);
        }

        lines.push(String::new());
        lines.push(format!("**Risk Check:** {}", risk));

        lines.push(String::new());
        lines.push("**Pre-Bet Checklist:**".to_string());
        for item in self.rules.checklist(first, second, &opp.sport_key) {
            lines.push(format!("- {}", item));
        }

        lines.push(String::new());
        lines.push(format!(
            "_Alert generated: {}_",
            now.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        lines.join("\n")
    }

    pub fn format_drift(signal: &DriftSignal) -> String {
        format!(
            "\u{1f4c9} **ODDS DRIFT DETECTED**\n\
             Event: {}\n\
             Outcome: **{}**\n\
             Bookie: **{}**\n\
             Previous: {:.2} -> Current: {:.2}\n\
             Change: **{:.1}%**\n\n\
             _This may signal an upcoming arbitrage opportunity. Monitor closely._",
            signal.event_id,
            signal.outcome,
            display_name(&signal.bookmaker),
            signal.previous_price.round_dp(2),
            signal.current_price.round_dp(2),
            signal.change_percent.round_dp(1)
        )
    }

    pub fn format_value_bet(signal: &ValueBetSignal) -> String {
        format!(
            "\u{1f48e} **VALUE BET DETECTED**\n\n\
             **Outcome:** {}\n\
             **Event:** {}\n\n\
             **Soft Bookie:** {} @ **{:.2}**\n\
             **Sharp Consensus:** {} @ {:.2}\n\
             **Value Edge:** +{:.1}%\n\n\
             **Recommendation:**\n{}\n\n\
             _This is NOT arbitrage. The soft bookie will likely adjust their price down soon._",
            signal.outcome,
            signal.event_id,
            display_name(&signal.soft_bookmaker),
            signal.soft_price.round_dp(2),
            display_name(&signal.sharp_bookmaker),
            signal.sharp_price.round_dp(2),
            signal.value_gap_percent.round_dp(1),
            signal.recommendation
        )
    }

    pub fn format_signal(signal: &MarketSignal) -> String {
        match signal {
            MarketSignal::Drift(s) => Self::format_drift(s),
            MarketSignal::ValueBet(s) => Self::format_value_bet(s),
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::minutes(self.config.cooldown_minutes.min(MAX_WINDOW_MINUTES))
    }

    /// Was this event alerted within the cooldown window
    pub async fn is_duplicate(&self, event_id: &str, now: DateTime<Utc>) -> bool {
        let recent = self.recent.read().await;
        recent.get(event_id).map_or(false, |entry| {
            now - entry.alerted_at < self.cooldown()
        })
    }

    /// Record an alert and prune back to the most recent `max_entries`
    pub async fn mark_alerted(&self, event_id: &str, starts_at: DateTime<Utc>, now: DateTime<Utc>) {
        let mut recent = self.recent.write().await;
        self.record(&mut recent, event_id, starts_at, now);
    }

    /// Check the cooldown and claim the event in one step.
    ///
    /// Returns `false` when the event is cooling down. A successful claim
    /// counts as an alert until `release` undoes it.
    pub async fn try_claim(&self, event_id: &str, starts_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let mut recent = self.recent.write().await;
        let cooling = recent.get(event_id).map_or(false, |entry| {
            now - entry.alerted_at < self.cooldown()
        });
        if cooling {
            return false;
        }
        self.record(&mut recent, event_id, starts_at, now);
        true
    }

    /// Undo a claim whose delivery failed
    pub async fn release(&self, event_id: &str, claimed_at: DateTime<Utc>) {
        let mut recent = self.recent.write().await;
        if recent.get(event_id).map_or(false, |entry| entry.alerted_at == claimed_at) {
            recent.remove(event_id);
        }
    }

    fn record(
        &self,
        recent: &mut HashMap<String, CooldownEntry>,
        event_id: &str,
        starts_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        recent.insert(
            event_id.to_string(),
            CooldownEntry {
                alerted_at: now,
                starts_at,
            },
        );

        if recent.len() > self.config.max_entries {
            let mut by_age: Vec<(String, DateTime<Utc>)> = recent
                .iter()
                .map(|(id, entry)| (id.clone(), entry.alerted_at))
                .collect();
            by_age.sort_by(|a, b| b.1.cmp(&a.1));
            for (id, _) in by_age.into_iter().skip(self.config.max_entries) {
                recent.remove(&id);
            }
            debug!("Alert cooldown cache pruned to {}", recent.len());
        }
    }

    /// Forget events that have started
    pub async fn evict_started(&self, now: DateTime<Utc>) -> usize {
        let mut recent = self.recent.write().await;
        let before = recent.len();
        recent.retain(|_, entry| entry.starts_at > now);
        before - recent.len()
    }

    pub async fn tracked_events(&self) -> usize {
        self.recent.read().await.len()
    }

    /// Deliver an opportunity alert unless the event is cooling down.
    ///
    /// Returns whether a message went out. The event is claimed before the
    /// send so concurrent scans of the same event alert once; a failed
    /// delivery releases the claim.
    pub async fn notify_opportunity(&self, opp: &Opportunity, now: DateTime<Utc>) -> Result<bool> {
        if !self.try_claim(&opp.event_id, opp.commence_time, now).await {
            info!("Skipping duplicate alert for {}", opp.event_id);
            return Ok(false);
        }

        let risk = self.assess(opp);
        match risk.level {
            RiskLevel::Critical => error!("CRITICAL RISK on {}: {}", opp.event_name, risk.message),
            RiskLevel::Warning => warn!("{}: {}", opp.event_name, risk.message),
            RiskLevel::Ok => info!("{}: {}", opp.event_name, risk.message),
        }

        if let [a, b, ..] = opp.bets.as_slice() {
            let validation = self.rules.validate_pair(&a.bookmaker, &b.bookmaker, &opp.sport_key);
            if let Some(warning) = &validation.warning {
                warn!("Risk alert: {} ({})", warning, validation.recommendation);
            }
        }

        let message = self.format_opportunity(opp, now);
        if let Err(e) = self.notifier.send(&message).await {
            self.release(&opp.event_id, now).await;
            return Err(e);
        }
        info!(
            "Alert sent via {} for {}",
            self.notifier.name(),
            opp.event_name
        );
        Ok(true)
    }

    /// Deliver a drift or value-bet alert; signals have no cooldown
    pub async fn notify_signal(&self, signal: &MarketSignal) -> Result<()> {
        let message = Self::format_signal(signal);
        self.notifier.send(&message).await?;
        debug!("{} alert sent for {}", signal.kind(), signal.event_id());
        Ok(())
    }

    /// Deliver free-form text (burst reports, startup notices)
    pub async fn notify_text(&self, message: &str) -> Result<()> {
        self.notifier.send(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::domain::Bet;
    use crate::error::OddsArbError;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn send(&self, message: &str) -> Result<()> {
            if self.fail {
                return Err(OddsArbError::Notify("down".to_string()));
            }
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn manager(notifier: Arc<Recorder>, max_entries: usize) -> AlertManager {
        AlertManager::new(
            AlertConfig {
                cooldown_minutes: 10,
                max_entries,
                webhook_url: None,
            },
            notifier,
            Arc::new(BookmakerClassifier::new(&["pinnacle"], &["unibet", "1xbet"])),
            Arc::new(RuleDatabase::new(&RulesConfig::default())),
        )
    }

    fn opportunity(event_id: &str, sport_key: &str, a: &str, b: &str) -> Opportunity {
        let bet = |bookmaker: &str, outcome: &str, price, stake| Bet {
            outcome: outcome.to_string(),
            price,
            bookmaker: bookmaker.to_string(),
            stake,
            raw_stake: stake,
        };
        Opportunity {
            event_id: event_id.to_string(),
            sport: "NBA".to_string(),
            sport_key: sport_key.to_string(),
            event_name: "Lakers vs Celtics".to_string(),
            commence_time: Utc::now() + Duration::hours(2),
            roi: dec!(3.73),
            bets: vec![
                bet(a, "Lakers", dec!(2.10), dec!(500)),
                bet(b, "Celtics", dec!(2.05), dec!(500)),
            ],
        }
    }

    #[test]
    fn test_opportunity_format() {
        let m = manager(Arc::new(Recorder::default()), 100);
        let text = m.format_opportunity(
            &opportunity("e1", "basketball_nba", "pinnacle", "unibet"),
            Utc::now(),
        );

        assert!(text.contains("[HIGH CONFIDENCE] ARB FOUND (3.7% Profit)"));
        assert!(text.contains("Back **Lakers** @ **2.10**"));
        assert!(text.contains("Bookie: **Pinnacle**"));
        assert!(text.contains("Guaranteed Profit:** $25.00"));
        assert!(text.contains("Pro Tip"));
        assert!(text.contains("Rules match"));
        assert!(text.contains("Paper trade first"));
    }

    #[test]
    fn test_high_risk_header() {
        let m = manager(Arc::new(Recorder::default()), 100);
        let opp = opportunity("e1", "basketball_nba", "kwiff", "bovada");
        assert_eq!(m.assess(&opp).level, RiskLevel::Critical);

        let text = m.format_opportunity(&opp, Utc::now());
        assert!(text.starts_with(RiskLevel::Critical.emoji()));
        assert!(text.contains("HIGH RISK"));
        assert!(!text.contains("**Why"));
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_repeat() {
        let recorder = Arc::new(Recorder::default());
        let m = manager(recorder.clone(), 100);
        let now = Utc::now();
        let opp = opportunity("e1", "tennis_atp", "pinnacle", "unibet");

        assert!(m.notify_opportunity(&opp, now).await.unwrap());
        assert!(!m
            .notify_opportunity(&opp, now + Duration::minutes(5))
            .await
            .unwrap());
        assert!(m
            .notify_opportunity(&opp, now + Duration::minutes(11))
            .await
            .unwrap());
        assert_eq!(recorder.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_start_cooldown() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let m = manager(recorder, 100);
        let now = Utc::now();
        let opp = opportunity("e1", "tennis_atp", "pinnacle", "unibet");

        assert!(m.notify_opportunity(&opp, now).await.is_err());
        assert!(!m.is_duplicate("e1", now).await);
    }

    #[tokio::test]
    async fn test_claim_is_exclusive_until_released() {
        let m = manager(Arc::new(Recorder::default()), 100);
        let now = Utc::now();
        let starts = now + Duration::hours(1);

        assert!(m.try_claim("e1", starts, now).await);
        assert!(!m.try_claim("e1", starts, now).await);

        m.release("e1", now).await;
        assert!(m.try_claim("e1", starts, now).await);

        // a stale release leaves a newer claim alone
        m.release("e1", now - Duration::minutes(1)).await;
        assert!(m.is_duplicate("e1", now).await);
    }

    #[tokio::test]
    async fn test_cache_pruned_to_most_recent() {
        let m = manager(Arc::new(Recorder::default()), 3);
        let now = Utc::now();
        let later = now + Duration::hours(5);

        for i in 0..5 {
            m.mark_alerted(&format!("e{i}"), later, now + Duration::seconds(i))
                .await;
        }

        assert_eq!(m.tracked_events().await, 3);
        assert!(!m.is_duplicate("e0", now).await);
        assert!(!m.is_duplicate("e1", now).await);
        assert!(m.is_duplicate("e4", now).await);
    }

    #[tokio::test]
    async fn test_evict_started() {
        let m = manager(Arc::new(Recorder::default()), 100);
        let now = Utc::now();
        m.mark_alerted("live", now - Duration::minutes(1), now).await;
        m.mark_alerted("later", now + Duration::hours(1), now).await;

        assert_eq!(m.evict_started(now).await, 1);
        assert!(m.is_duplicate("later", now).await);
        assert!(!m.is_duplicate("live", now).await);
    }

    #[tokio::test]
    async fn test_signal_formats() {
        let recorder = Arc::new(Recorder::default());
        let m = manager(recorder.clone(), 100);

        let signal = MarketSignal::ValueBet(ValueBetSignal {
            event_id: "e1".to_string(),
            outcome: "Lakers".to_string(),
            soft_bookmaker: "1xbet".to_string(),
            soft_price: dec!(1.90),
            sharp_bookmaker: "pinnacle".to_string(),
            sharp_price: dec!(1.80),
            value_gap_percent: dec!(5.555),
            recommendation: "Bet Lakers".to_string(),
            detected_at: Utc::now(),
        });
        m.notify_signal(&signal).await.unwrap();

        let sent = recorder.sent.lock().unwrap();
        assert!(sent[0].contains("VALUE BET DETECTED"));
        assert!(sent[0].contains("+5.6%"));
        assert!(sent[0].contains("Pinnacle @ 1.80"));
        drop(sent);

        let drift = MarketSignal::Drift(DriftSignal {
            event_id: "e1".to_string(),
            outcome: "Lakers".to_string(),
            bookmaker: "1xbet".to_string(),
            previous_price: dec!(1.90),
            current_price: dec!(1.50),
            change_percent: dec!(21.06),
            detected_at: Utc::now(),
        });
        m.notify_signal(&drift).await.unwrap();

        let sent = recorder.sent.lock().unwrap();
        assert!(sent[1].contains("ODDS DRIFT DETECTED"));
        assert!(sent[1].contains("Bookie: **1xBet**"));
        assert!(sent[1].contains("Change: **21.1%**"));
    }
}
