//! The Odds API (v4) REST adapter
//!
//! Only the `h2h` market is turned into quotes. Events that fail to parse are
//! dropped one by one so a single malformed record cannot sink a batch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::OddsFeed;
use crate::config::FeedConfig;
use crate::domain::{Event, Quote};
use crate::error::{OddsArbError, Result};

const MONEYLINE_MARKET: &str = "h2h";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOutcome {
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMarket {
    pub key: String,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outcomes: Vec<ApiOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiBookmaker {
    pub key: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub markets: Vec<ApiMarket>,
}

/// One event as returned by `/sports/{sport}/odds`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEvent {
    pub id: String,
    pub sport_key: String,
    #[serde(default)]
    pub sport_title: Option<String>,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<ApiBookmaker>,
}

impl ApiEvent {
    /// Flatten moneyline outcomes into quotes. Quotes without any provider
    /// timestamp are stamped with `fetched_at`.
    pub fn into_event(self, fetched_at: DateTime<Utc>) -> Event {
        let mut quotes = Vec::new();
        for bookmaker in &self.bookmakers {
            for market in bookmaker.markets.iter().filter(|m| m.key == MONEYLINE_MARKET) {
                let observed_at = market
                    .last_update
                    .or(bookmaker.last_update)
                    .unwrap_or(fetched_at);
                for outcome in &market.outcomes {
                    quotes.push(Quote::new(
                        &bookmaker.key,
                        &outcome.name,
                        outcome.price,
                        observed_at,
                    ));
                }
            }
        }

        Event {
            id: self.id,
            sport: self.sport_key,
            sport_title: self.sport_title,
            participants: (self.home_team, self.away_team),
            start_time: self.commence_time,
            quotes,
        }
    }
}

/// Parse a raw payload array, skipping records that don't fit the schema
pub fn parse_events(payload: serde_json::Value, fetched_at: DateTime<Utc>) -> Result<Vec<Event>> {
    let serde_json::Value::Array(records) = payload else {
        return Err(OddsArbError::Feed("expected a JSON array of events".to_string()));
    };

    let mut events = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<ApiEvent>(record) {
            Ok(event) => events.push(event.into_event(fetched_at)),
            Err(e) => warn!("Dropping malformed event record: {}", e),
        }
    }
    Ok(events)
}

/// HTTP client for The Odds API with a request budget
pub struct OddsApiClient {
    http: Client,
    config: FeedConfig,
    api_key: String,
    requests_made: AtomicU32,
}

impl OddsApiClient {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                OddsArbError::Validation(
                    "feed.api_key is required (set ODDSARB_FEED__API_KEY)".to_string(),
                )
            })?;

        let http = Client::builder()
            .user_agent("oddsarb/0.1")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OddsArbError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            api_key,
            requests_made: AtomicU32::new(0),
        })
    }

    fn endpoint(&self, sport: &str) -> String {
        format!(
            "{}/sports/{}/odds",
            self.config.base_url.trim_end_matches('/'),
            sport
        )
    }

    fn log_quota(headers: &reqwest::header::HeaderMap) {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        if let (Some(used), Some(remaining)) =
            (read("x-requests-used"), read("x-requests-remaining"))
        {
            info!("API quota: {} used | {} remaining", used, remaining);
        }
    }

    async fn fetch_once(&self, sport: &str) -> Result<serde_json::Value> {
        let regions = self.config.regions.join(",");
        let markets = self.config.markets.join(",");

        let resp = self
            .http
            .get(self.endpoint(sport))
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", regions.as_str()),
                ("markets", markets.as_str()),
                ("oddsFormat", "decimal"),
            ])
            .send()
            .await?;

        Self::log_quota(resp.headers());

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(OddsArbError::Auth("invalid API key".to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OddsArbError::Feed(format!("HTTP {}: {}", status, body)));
        }

        self.requests_made.fetch_add(1, Ordering::Relaxed);
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl OddsFeed for OddsApiClient {
    fn name(&self) -> &str {
        "the-odds-api"
    }

    fn requests_made(&self) -> u32 {
        self.requests_made.load(Ordering::Relaxed)
    }

    async fn fetch_events(&self, sport: &str) -> Result<Vec<Event>> {
        if self.requests_made() >= self.config.max_requests {
            return Err(OddsArbError::QuotaExhausted(format!(
                "{} requests made (budget {})",
                self.requests_made(),
                self.config.max_requests
            )));
        }

        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            debug!("Fetching odds for {} (attempt {}/{})", sport, attempt, attempts);
            match self.fetch_once(sport).await {
                Ok(payload) => {
                    let events = parse_events(payload, Utc::now())?;
                    info!("Fetched {} events for {}", events.len(), sport);
                    return Ok(events);
                }
                Err(e @ OddsArbError::Auth(_)) => {
                    error!("Odds API rejected the key, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    warn!("Fetch for {} failed: {}", sport, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_secs(2 * attempt as u64)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OddsArbError::Feed(format!("failed to fetch odds for {}", sport))
        }))
    }
}
