//! Read-side operations.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, instrument};

use super::validation::build_filter;
use super::{BloodRequestService, BloodRequestView, ListQuery, Page, Pagination};
use crate::db::{Database, RequestFilter, RequestSort};
use crate::models::{BloodRequest, GeoPoint, RequesterProfile};
use crate::priority::PriorityRanker;
use crate::{BloodMatchError, BloodMatchResult};

impl BloodRequestService {
    /// Filtered listing, highest priority first.
    ///
    /// Open to any caller. Every matching request is scored before the page
    /// window is cut, so page boundaries follow priority order.
    #[instrument(skip(self))]
    pub fn list_requests(&self, query: &ListQuery) -> BloodMatchResult<Page<BloodRequestView>> {
        let now = Utc::now();
        let filter = build_filter(query, now)?;
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(self.config.default_page_limit)
            .min(self.config.max_page_limit)
            .max(1);

        let db = self.db()?;
        let total = db.count_requests(&filter)?;
        let matching = db.list_requests(&filter, RequestSort::Natural, 0, None)?;

        let ranker = PriorityRanker::new(now, self.config.recent_update_window());
        let mut profiles = HashMap::new();
        let mut data = Vec::with_capacity(limit);
        for (request, score) in ranker
            .rank(matching)
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
        {
            let requester = requester_profile(&db, &mut profiles, &request.requested_by)?;
            data.push(BloodRequestView {
                request,
                requester,
                priority_score: Some(score),
            });
        }
        debug!(total, returned = data.len(), "listed blood requests");

        Ok(Page {
            data,
            pagination: Pagination::new(total, page, limit),
        })
    }

    #[instrument(skip(self), fields(request_id = %id))]
    pub fn get_request(&self, id: &str) -> BloodMatchResult<BloodRequestView> {
        let db = self.db()?;
        let request = db
            .get_request(id)?
            .ok_or_else(|| BloodMatchError::NotFound(format!("blood request {id}")))?;
        let requester = db.get_user(&request.requested_by)?.map(|u| u.profile());
        Ok(BloodRequestView {
            request,
            requester,
            priority_score: None,
        })
    }

    /// Requests posted by `user_id`, newest first.
    #[instrument(skip(self))]
    pub fn my_requests(&self, user_id: &str) -> BloodMatchResult<Vec<BloodRequest>> {
        Ok(self.db()?.list_requests_by_requester(user_id)?)
    }

    /// Requests within `radius_km` of a point, nearest first. Not paginated.
    #[instrument(skip(self))]
    pub fn search_nearby(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
        radius_km: f64,
    ) -> BloodMatchResult<Vec<BloodRequest>> {
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(BloodMatchError::Validation(
                "Latitude and longitude are required.".to_string(),
            ));
        };
        if !(radius_km.is_finite() && radius_km > 0.0) {
            return Err(BloodMatchError::Validation(format!(
                "Search radius must be a positive number of kilometers, got {radius_km}"
            )));
        }
        let center = GeoPoint::new(longitude, latitude)?;

        let found = self.db()?.find_nearby(
            &center,
            crate::db::km_to_meters(radius_km),
            &RequestFilter::default(),
        )?;
        debug!(found = found.len(), "nearby search complete");
        Ok(found.into_iter().map(|m| m.request).collect())
    }
}

/// Requester profile lookup, cached per listing.
fn requester_profile(
    db: &Database,
    cache: &mut HashMap<String, Option<RequesterProfile>>,
    user_id: &str,
) -> BloodMatchResult<Option<RequesterProfile>> {
    if let Some(profile) = cache.get(user_id) {
        return Ok(profile.clone());
    }
    let profile = db.get_user(user_id)?.map(|u| u.profile());
    cache.insert(user_id.to_string(), profile.clone());
    Ok(profile)
}
