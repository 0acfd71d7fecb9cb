//! Priority ranking for request listings.
//!
//! ```text
//! score = urgency_weight * 10
//!       + max(0, expiration - now in ms) / 1e9
//!       + 20 if updated within the freshness window
//! ```
//!
//! Only the default `list` ordering uses this; nearby search and donor
//! assignment do not.

use chrono::{DateTime, Duration, Utc};

use crate::models::BloodRequest;

/// Multiplier applied to the urgency weight.
const URGENCY_FACTOR: f64 = 10.0;

/// Divisor applied to the remaining lifetime in milliseconds.
const TIME_LEFT_DIVISOR: f64 = 1e9;

/// Bonus for requests touched inside the freshness window.
const RECENT_UPDATE_BONUS: f64 = 20.0;

/// Score calculator evaluated at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct PriorityRanker {
    now: DateTime<Utc>,
    recent_window: Duration,
}

impl PriorityRanker {
    pub fn new(now: DateTime<Utc>, recent_window: Duration) -> Self {
        Self { now, recent_window }
    }

    /// Ranker with the default 6 hour freshness window.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self::new(now, Duration::hours(6))
    }

    pub fn score(&self, request: &BloodRequest) -> f64 {
        let urgency = request.urgency_level.weight() * URGENCY_FACTOR;

        let time_left_ms = (request.expiration_date - self.now).num_milliseconds().max(0);
        let time_left = time_left_ms as f64 / TIME_LEFT_DIVISOR;

        let recent = if self.now - request.updated_at < self.recent_window {
            RECENT_UPDATE_BONUS
        } else {
            0.0
        };

        urgency + time_left + recent
    }

    /// Pair each request with its score, highest first. Ties keep input order.
    pub fn rank(&self, requests: Vec<BloodRequest>) -> Vec<(BloodRequest, f64)> {
        let mut scored: Vec<(BloodRequest, f64)> = requests
            .into_iter()
            .map(|r| {
                let score = self.score(&r);
                (r, score)
            })
            .collect();

        // sort_by is stable, so equal scores stay in store order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }
}
