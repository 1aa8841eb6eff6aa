//! Peak-hours polling schedule
//!
//! A sport with configured windows is "peak" only inside one of them; a sport
//! with no entry is always peak. Hours are local wall-clock hours.

use chrono::{Datelike, Local, Timelike};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::{PeakWindowConfig, ScannerConfig};

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Weekday/hour range, end exclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeakWindow {
    /// 0 = Monday
    pub days: Vec<u32>,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl PeakWindow {
    pub fn contains(&self, weekday: u32, hour: u32) -> bool {
        self.days.contains(&weekday) && self.start_hour <= hour && hour < self.end_hour
    }

    pub fn describe(&self) -> String {
        let days: Vec<&str> = self
            .days
            .iter()
            .filter_map(|d| DAY_NAMES.get(*d as usize).copied())
            .collect();
        format!(
            "{}: {:02}:00 - {:02}:00",
            days.join(", "),
            self.start_hour,
            self.end_hour
        )
    }
}

impl From<&PeakWindowConfig> for PeakWindow {
    fn from(config: &PeakWindowConfig) -> Self {
        Self {
            days: config.days.clone(),
            start_hour: config.start_hour,
            end_hour: config.end_hour,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PeakSchedule {
    windows: HashMap<String, Vec<PeakWindow>>,
    poll_interval: Duration,
    off_peak_interval: Duration,
}

impl PeakSchedule {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            windows: config
                .peak_hours
                .iter()
                .map(|(sport, windows)| {
                    (sport.clone(), windows.iter().map(PeakWindow::from).collect())
                })
                .collect(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            off_peak_interval: Duration::from_secs(config.off_peak_interval_secs),
        }
    }

    /// Schedule without any windows: every sport is always peak
    pub fn always(poll_interval: Duration) -> Self {
        Self {
            windows: HashMap::new(),
            poll_interval,
            off_peak_interval: poll_interval,
        }
    }

    pub fn is_peak_at(&self, sport: &str, weekday: u32, hour: u32) -> bool {
        match self.windows.get(sport) {
            Some(windows) => windows.iter().any(|w| w.contains(weekday, hour)),
            None => true,
        }
    }

    pub fn is_peak_now(&self, sport: &str) -> bool {
        let now = Local::now();
        self.is_peak_at(sport, now.weekday().num_days_from_monday(), now.hour())
    }

    /// Sports in a peak window at the given time
    pub fn active_sports_at(&self, sports: &[String], weekday: u32, hour: u32) -> Vec<String> {
        sports
            .iter()
            .filter(|s| self.is_peak_at(s, weekday, hour))
            .cloned()
            .collect()
    }

    pub fn active_sports_now(&self, sports: &[String]) -> Vec<String> {
        let now = Local::now();
        self.active_sports_at(sports, now.weekday().num_days_from_monday(), now.hour())
    }

    /// Human-readable next opening for a sport
    pub fn next_window(&self, sport: &str, weekday: u32, hour: u32) -> Option<String> {
        let windows = self.windows.get(sport)?;

        // rest of today first, then the following days
        for offset in 0..7u32 {
            let day = (weekday + offset) % 7;
            let opening = windows
                .iter()
                .filter(|w| w.days.contains(&day))
                .filter(|w| offset > 0 || w.start_hour > hour)
                .map(|w| w.start_hour)
                .min();
            if let Some(start) = opening {
                let when = if offset == 0 {
                    "Today".to_string()
                } else {
                    DAY_NAMES[day as usize].to_string()
                };
                return Some(format!("{} at {:02}:00", when, start));
            }
        }
        None
    }

    /// One line per configured sport window, for startup logs
    pub fn describe(&self) -> Vec<String> {
        let mut sports: Vec<&String> = self.windows.keys().collect();
        sports.sort();
        sports
            .into_iter()
            .flat_map(|sport| {
                self.windows[sport]
                    .iter()
                    .map(move |w| format!("{}: {}", sport, w.describe()))
            })
            .collect()
    }

    /// Wait before the next cycle
    pub fn interval(&self, any_active: bool) -> Duration {
        if any_active {
            self.poll_interval
        } else {
            self.off_peak_interval
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn schedule() -> PeakSchedule {
        PeakSchedule::from_config(&AppConfig::default_config(true).scanner)
    }

    #[test]
    fn test_window_is_end_exclusive() {
        let s = schedule();
        assert!(s.is_peak_at("basketball_nba", 2, 18));
        assert!(s.is_peak_at("basketball_nba", 2, 22));
        assert!(!s.is_peak_at("basketball_nba", 2, 23));
        assert!(!s.is_peak_at("basketball_nba", 2, 10));
        assert!(s.is_peak_at("tennis_atp", 6, 9));
    }

    #[test]
    fn test_unscheduled_sport_always_peak() {
        let s = schedule();
        assert!(s.is_peak_at("soccer_epl", 0, 3));
    }

    #[test]
    fn test_active_sports_and_interval() {
        let s = schedule();
        let sports = vec!["basketball_nba".to_string(), "tennis_atp".to_string()];

        assert_eq!(s.active_sports_at(&sports, 1, 19), sports);
        assert_eq!(
            s.active_sports_at(&sports, 1, 10),
            vec!["tennis_atp".to_string()]
        );
        assert!(s.active_sports_at(&sports, 1, 3).is_empty());

        assert_eq!(s.interval(true), Duration::from_secs(60));
        assert_eq!(s.interval(false), Duration::from_secs(1800));
    }

    #[test]
    fn test_next_window() {
        let s = schedule();
        assert_eq!(
            s.next_window("basketball_nba", 0, 10).as_deref(),
            Some("Today at 18:00")
        );
        assert_eq!(
            s.next_window("basketball_nba", 0, 23).as_deref(),
            Some("Tue at 18:00")
        );
        assert_eq!(s.next_window("soccer_epl", 0, 23), None);
    }
}
