//! Saved Odds API payload as a feed
//!
//! The file holds the same JSON array the HTTP endpoint returns, for one or
//! several sports. It is re-read on every fetch so it can be swapped while
//! the scanner runs.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::odds_api::parse_events;
use super::OddsFeed;
use crate::domain::Event;
use crate::error::Result;

pub struct SnapshotFeed {
    path: PathBuf,
}

impl SnapshotFeed {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every event in the file regardless of sport
    pub async fn load_all(&self) -> Result<Vec<Event>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let payload: serde_json::Value = serde_json::from_str(&raw)?;
        parse_events(payload, Utc::now())
    }

    /// Distinct sport keys present in the file, first-seen order
    pub async fn sports(&self) -> Result<Vec<String>> {
        let mut sports: Vec<String> = Vec::new();
        for event in self.load_all().await? {
            if !sports.contains(&event.sport) {
                sports.push(event.sport);
            }
        }
        Ok(sports)
    }
}

#[async_trait]
impl OddsFeed for SnapshotFeed {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn fetch_events(&self, sport: &str) -> Result<Vec<Event>> {
        let events: Vec<Event> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|e| e.sport == sport)
            .collect();
        debug!(
            "Snapshot {}: {} events for {}",
            self.path.display(),
            events.len(),
            sport
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_filters_by_sport() {
        let path = std::env::temp_dir().join(format!("oddsarb-snapshot-{}.json", uuid::Uuid::new_v4()));
        let payload = serde_json::json!([
            {
                "id": "nba-1",
                "sport_key": "basketball_nba",
                "commence_time": "2026-10-20T23:30:00Z",
                "home_team": "Lakers",
                "away_team": "Celtics",
                "bookmakers": []
            },
            {
                "id": "epl-1",
                "sport_key": "soccer_epl",
                "commence_time": "2026-10-21T14:00:00Z",
                "home_team": "Arsenal",
                "away_team": "Chelsea",
                "bookmakers": []
            }
        ]);
        tokio::fs::write(&path, payload.to_string()).await.unwrap();

        let feed = SnapshotFeed::new(&path);
        let nba = feed.fetch_events("basketball_nba").await.unwrap();
        assert_eq!(nba.len(), 1);
        assert_eq!(nba[0].id, "nba-1");
        assert_eq!(
            feed.sports().await.unwrap(),
            vec!["basketball_nba".to_string(), "soccer_epl".to_string()]
        );

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let feed = SnapshotFeed::new("/nonexistent/oddsarb.json");
        assert!(feed.fetch_events("basketball_nba").await.is_err());
    }
}
