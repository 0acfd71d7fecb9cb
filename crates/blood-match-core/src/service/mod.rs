//! Request lifecycle operations.
//!
//! [`BloodRequestService`] owns the store behind a mutex and talks to the
//! hospital locator and the notifier through their traits. Locator calls
//! are made with the store unlocked.

mod lifecycle;
mod queries;
mod validation;

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::db::Database;
use crate::locator::HospitalLocator;
use crate::models::{BloodRequest, RequesterProfile, User};
use crate::notify::Notifier;
use crate::BloodMatchResult;

/// Entry point for every blood request operation.
pub struct BloodRequestService {
    db: Arc<Mutex<Database>>,
    locator: Arc<dyn HospitalLocator>,
    notifier: Arc<dyn Notifier>,
    config: MatchConfig,
}

impl BloodRequestService {
    pub fn new(
        db: Database,
        locator: Arc<dyn HospitalLocator>,
        notifier: Arc<dyn Notifier>,
        config: MatchConfig,
    ) -> Self {
        Self::with_shared_db(Arc::new(Mutex::new(db)), locator, notifier, config)
    }

    /// Build on a database handle shared with other components.
    pub fn with_shared_db(
        db: Arc<Mutex<Database>>,
        locator: Arc<dyn HospitalLocator>,
        notifier: Arc<dyn Notifier>,
        config: MatchConfig,
    ) -> Self {
        Self {
            db,
            locator,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Mirror a user record from the identity service.
    pub fn sync_user(&self, user: &User) -> BloodMatchResult<()> {
        self.db()?.upsert_user(user)?;
        Ok(())
    }

    fn db(&self) -> BloodMatchResult<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }
}

/// Listing query. String fields are validated like create payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListQuery {
    pub blood_type: Option<String>,
    /// Matches `location.city` exactly.
    pub city: Option<String>,
    pub urgency_level: Option<String>,
    pub status: Option<String>,
    /// Hide requests past their expiration date.
    pub active_only: bool,
    /// 1-based
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// A request as returned to callers, with its requester joined in.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BloodRequestView {
    #[serde(flatten)]
    pub request: BloodRequest,
    /// `None` when the requester is unknown to the user read model.
    pub requester: Option<RequesterProfile>,
    /// Only set by listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub total_requests: u64,
    pub total_pages: u64,
    pub current_page: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn new(total_requests: u64, current_page: usize, limit: usize) -> Self {
        Self {
            total_requests,
            total_pages: total_requests.div_ceil(limit.max(1) as u64),
            current_page,
            limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
