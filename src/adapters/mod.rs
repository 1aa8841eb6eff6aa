//! Collaborator boundaries
//!
//! - `OddsFeed` supplies parsed events per sport
//! - `Notifier` delivers formatted alert text
//!
//! Implementations: The Odds API over HTTP, a saved JSON snapshot, a chat
//! webhook, and a log-only notifier for dry runs.

pub mod odds_api;
pub mod snapshot;
pub mod webhook;

use async_trait::async_trait;
use tracing::info;

use crate::domain::Event;
use crate::error::Result;

pub use odds_api::{parse_events, ApiBookmaker, ApiEvent, ApiMarket, ApiOutcome, OddsApiClient};
pub use snapshot::SnapshotFeed;
pub use webhook::WebhookNotifier;

/// Source of events with quotes already parsed
#[async_trait]
pub trait OddsFeed: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Every upcoming or live event for a sport key
    async fn fetch_events(&self, sport: &str) -> Result<Vec<Event>>;

    /// Billable requests issued so far; zero for offline feeds
    fn requests_made(&self) -> u32 {
        0
    }
}

/// Alert delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &str) -> Result<()>;
}

/// Writes alerts to the log instead of delivering them
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &str) -> Result<()> {
        info!("DRY RUN alert:\n{}", message);
        Ok(())
    }
}
