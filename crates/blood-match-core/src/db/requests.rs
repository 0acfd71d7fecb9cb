//! Blood request database operations, including radius queries.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{BoundingBox, Database, DbError, DbResult};
use crate::models::{
    BloodRequest, BloodType, ContactInfo, GeoLocation, GeoPoint, Hospital, RequestStatus,
    StatusUpdate, UrgencyDescription, UrgencyLevel,
};

/// Columns selected for a request, aliased against `blood_requests r`.
///
/// Assigned donors come back as one JSON array per row, in assignment order.
const REQUEST_COLUMNS: &str = r#"
    r.id, r.requested_by, r.blood_type, r.longitude, r.latitude, r.city,
    r.urgency_level, r.urgency_description, r.status, r.blood_units,
    r.fulfilled_units, r.expiration_date, r.additional_notes, r.contact_info,
    r.tags, r.hospital_name, r.hospital_address, r.hospital_contact,
    r.status_history, r.created_at, r.updated_at,
    (SELECT json_group_array(d.donor_id ORDER BY d.rowid)
       FROM request_donors d WHERE d.request_id = r.id) AS donors
"#;

/// Equality filters shared by listing, counting and radius queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFilter {
    pub blood_type: Option<BloodType>,
    pub city: Option<String>,
    pub urgency_level: Option<UrgencyLevel>,
    pub status: Option<RequestStatus>,
    pub requested_by: Option<String>,
    /// Only requests still unexpired at this instant.
    pub active_at: Option<DateTime<Utc>>,
}

impl RequestFilter {
    /// SQL conditions (joined with AND) and their positional values.
    fn to_sql(&self) -> (Vec<&'static str>, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(blood_type) = self.blood_type {
            clauses.push("r.blood_type = ?");
            values.push(Value::Text(blood_type.as_str().to_string()));
        }
        if let Some(city) = &self.city {
            clauses.push("r.city = ?");
            values.push(Value::Text(city.clone()));
        }
        if let Some(urgency) = self.urgency_level {
            clauses.push("r.urgency_level = ?");
            values.push(Value::Text(urgency.as_str().to_string()));
        }
        if let Some(status) = self.status {
            clauses.push("r.status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(requested_by) = &self.requested_by {
            clauses.push("r.requested_by = ?");
            values.push(Value::Text(requested_by.clone()));
        }
        if let Some(at) = self.active_at {
            clauses.push("r.expiration_date > ?");
            values.push(Value::Text(format_ts(&at)));
        }

        (clauses, values)
    }
}

/// Ordering for [`Database::list_requests`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestSort {
    /// Insertion order
    #[default]
    Natural,
    /// Most recently created first
    Newest,
}

impl RequestSort {
    fn order_by(&self) -> &'static str {
        match self {
            RequestSort::Natural => "r.rowid ASC",
            RequestSort::Newest => "r.created_at DESC, r.rowid DESC",
        }
    }
}

/// A request returned by a radius query, with its distance from the query point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyRequest {
    pub request: BloodRequest,
    pub distance_m: f64,
}

impl Database {
    /// Insert a new request together with any pre-assigned donors.
    pub fn insert_request(&self, request: &BloodRequest) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO blood_requests (
                id, requested_by, blood_type, longitude, latitude, city,
                urgency_level, urgency_description, status, blood_units,
                fulfilled_units, expiration_date, additional_notes, contact_info,
                tags, hospital_name, hospital_address, hospital_contact,
                status_history, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21)
            "#,
            params![
                request.id,
                request.requested_by,
                request.blood_type.as_str(),
                request.location.point.longitude,
                request.location.point.latitude,
                request.location.city,
                request.urgency_level.as_str(),
                request.urgency_description.map(|d| d.as_str()),
                request.status.as_str(),
                request.blood_units,
                request.fulfilled_units,
                format_ts(&request.expiration_date),
                request.additional_notes,
                contact_to_json(request.contact_info.as_ref())?,
                serde_json::to_string(&request.tags)?,
                request.hospital.name,
                request.hospital.address,
                request.hospital.contact_number,
                serde_json::to_string(&request.status_update_history)?,
                format_ts(&request.created_at),
                format_ts(&request.updated_at),
            ],
        )?;
        for donor_id in &request.assigned_donors {
            tx.execute(
                "INSERT OR IGNORE INTO request_donors (request_id, donor_id) VALUES (?1, ?2)",
                params![request.id, donor_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Overwrite the mutable columns of an existing request.
    ///
    /// Donor assignments are not touched; use [`Database::add_donor_if_absent`].
    pub fn update_request(&self, request: &BloodRequest) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE blood_requests SET
                longitude = ?2,
                latitude = ?3,
                city = ?4,
                urgency_level = ?5,
                urgency_description = ?6,
                status = ?7,
                blood_units = ?8,
                fulfilled_units = ?9,
                expiration_date = ?10,
                additional_notes = ?11,
                contact_info = ?12,
                tags = ?13,
                hospital_name = ?14,
                hospital_address = ?15,
                hospital_contact = ?16,
                status_history = ?17,
                updated_at = ?18
            WHERE id = ?1
            "#,
            params![
                request.id,
                request.location.point.longitude,
                request.location.point.latitude,
                request.location.city,
                request.urgency_level.as_str(),
                request.urgency_description.map(|d| d.as_str()),
                request.status.as_str(),
                request.blood_units,
                request.fulfilled_units,
                format_ts(&request.expiration_date),
                request.additional_notes,
                contact_to_json(request.contact_info.as_ref())?,
                serde_json::to_string(&request.tags)?,
                request.hospital.name,
                request.hospital.address,
                request.hospital.contact_number,
                serde_json::to_string(&request.status_update_history)?,
                format_ts(&request.updated_at),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a request by ID.
    pub fn get_request(&self, id: &str) -> DbResult<Option<BloodRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM blood_requests r WHERE r.id = ?");
        let row = self
            .conn
            .query_row(&sql, [id], RequestRow::from_row)
            .optional()?;
        row.map(BloodRequest::try_from).transpose()
    }

    /// Delete a request. Its donor assignments cascade.
    pub fn delete_request(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM blood_requests WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Add a donor to a request's assignment set in a single statement.
    ///
    /// Returns `false` when the donor was already assigned. Fails with
    /// [`DbError::NotFound`] when the request does not exist.
    pub fn add_donor_if_absent(&self, request_id: &str, donor_id: &str) -> DbResult<bool> {
        let result = self.conn.execute(
            "INSERT OR IGNORE INTO request_donors (request_id, donor_id) VALUES (?1, ?2)",
            params![request_id, donor_id],
        );
        match result {
            Ok(rows) => {
                if rows > 0 {
                    self.conn.execute(
                        "UPDATE blood_requests SET updated_at = ?2 WHERE id = ?1",
                        params![request_id, format_ts(&Utc::now())],
                    )?;
                }
                Ok(rows > 0)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(DbError::NotFound(format!("blood request {request_id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Count requests matching a filter.
    pub fn count_requests(&self, filter: &RequestFilter) -> DbResult<u64> {
        let (clauses, values) = filter.to_sql();
        let sql = format!(
            "SELECT COUNT(*) FROM blood_requests r {}",
            where_clause(&clauses)
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// List requests matching a filter, with an optional page window.
    pub fn list_requests(
        &self,
        filter: &RequestFilter,
        sort: RequestSort,
        skip: usize,
        limit: Option<usize>,
    ) -> DbResult<Vec<BloodRequest>> {
        let (clauses, mut values) = filter.to_sql();
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM blood_requests r {} ORDER BY {} LIMIT ? OFFSET ?",
            where_clause(&clauses),
            sort.order_by()
        );
        // SQLite treats a negative LIMIT as unbounded.
        values.push(Value::Integer(limit.map_or(-1, |l| l as i64)));
        values.push(Value::Integer(skip as i64));
        self.query_requests(&sql, values)
    }

    /// All requests owned by a user, newest first.
    pub fn list_requests_by_requester(&self, user_id: &str) -> DbResult<Vec<BloodRequest>> {
        let filter = RequestFilter {
            requested_by: Some(user_id.to_string()),
            ..Default::default()
        };
        self.list_requests(&filter, RequestSort::Newest, 0, None)
    }

    /// Requests within `radius_m` of `center`, nearest first.
    pub fn find_nearby(
        &self,
        center: &GeoPoint,
        radius_m: f64,
        filter: &RequestFilter,
    ) -> DbResult<Vec<NearbyRequest>> {
        let mut matches = self.radius_query(center, radius_m, filter)?;
        matches.sort_by(|a, b| {
            a.distance_m
                .partial_cmp(&b.distance_m)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(matches)
    }

    /// Requests within `radius_m` of `center`, in natural store order.
    pub fn find_within(
        &self,
        center: &GeoPoint,
        radius_m: f64,
        filter: &RequestFilter,
    ) -> DbResult<Vec<BloodRequest>> {
        Ok(self
            .radius_query(center, radius_m, filter)?
            .into_iter()
            .map(|m| m.request)
            .collect())
    }

    /// Spatial index prefilter followed by an exact great-circle check.
    fn radius_query(
        &self,
        center: &GeoPoint,
        radius_m: f64,
        filter: &RequestFilter,
    ) -> DbResult<Vec<NearbyRequest>> {
        let bbox = BoundingBox::around(center, radius_m);
        let (mut clauses, filter_values) = filter.to_sql();
        clauses.insert(0, "g.max_lng >= ? AND g.min_lng <= ? AND g.max_lat >= ? AND g.min_lat <= ?");

        let mut values = vec![
            Value::Real(bbox.min_lng),
            Value::Real(bbox.max_lng),
            Value::Real(bbox.min_lat),
            Value::Real(bbox.max_lat),
        ];
        values.extend(filter_values);

        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM blood_requests r
             JOIN blood_requests_geo g ON g.id = r.rowid
             {} ORDER BY r.rowid ASC",
            where_clause(&clauses)
        );

        Ok(self
            .query_requests(&sql, values)?
            .into_iter()
            .filter_map(|request| {
                let distance_m = center.distance_m(&request.location.point);
                (distance_m <= radius_m).then_some(NearbyRequest {
                    request,
                    distance_m,
                })
            })
            .collect())
    }

    fn query_requests(&self, sql: &str, values: Vec<Value>) -> DbResult<Vec<BloodRequest>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values), RequestRow::from_row)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?.try_into()?);
        }
        Ok(requests)
    }
}

fn where_clause(clauses: &[&str]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}

/// Fixed-width RFC 3339 so stored timestamps compare lexicographically.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_ts(raw: &str) -> DbResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn contact_to_json(contact: Option<&ContactInfo>) -> DbResult<Option<String>> {
    contact
        .map(serde_json::to_string)
        .transpose()
        .map_err(Into::into)
}

/// Internal row representation for database mapping.
struct RequestRow {
    id: String,
    requested_by: String,
    blood_type: String,
    longitude: f64,
    latitude: f64,
    city: Option<String>,
    urgency_level: String,
    urgency_description: Option<String>,
    status: String,
    blood_units: f64,
    fulfilled_units: f64,
    expiration_date: String,
    additional_notes: Option<String>,
    contact_info: Option<String>,
    tags: String,
    hospital_name: String,
    hospital_address: String,
    hospital_contact: String,
    status_history: String,
    created_at: String,
    updated_at: String,
    donors: String,
}

impl RequestRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            requested_by: row.get(1)?,
            blood_type: row.get(2)?,
            longitude: row.get(3)?,
            latitude: row.get(4)?,
            city: row.get(5)?,
            urgency_level: row.get(6)?,
            urgency_description: row.get(7)?,
            status: row.get(8)?,
            blood_units: row.get(9)?,
            fulfilled_units: row.get(10)?,
            expiration_date: row.get(11)?,
            additional_notes: row.get(12)?,
            contact_info: row.get(13)?,
            tags: row.get(14)?,
            hospital_name: row.get(15)?,
            hospital_address: row.get(16)?,
            hospital_contact: row.get(17)?,
            status_history: row.get(18)?,
            created_at: row.get(19)?,
            updated_at: row.get(20)?,
            donors: row.get(21)?,
        })
    }
}

impl TryFrom<RequestRow> for BloodRequest {
    type Error = DbError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let blood_type = BloodType::parse(&row.blood_type)
            .ok_or_else(|| DbError::Constraint(format!("unknown blood type: {}", row.blood_type)))?;
        let urgency_level = UrgencyLevel::parse(&row.urgency_level).ok_or_else(|| {
            DbError::Constraint(format!("unknown urgency level: {}", row.urgency_level))
        })?;
        let urgency_description = row
            .urgency_description
            .as_deref()
            .map(|raw| {
                UrgencyDescription::parse(raw)
                    .ok_or_else(|| DbError::Constraint(format!("unknown urgency description: {raw}")))
            })
            .transpose()?;
        let status = RequestStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("unknown status: {}", row.status)))?;
        let point = GeoPoint::new(row.longitude, row.latitude)
            .map_err(|e| DbError::Constraint(e.to_string()))?;
        let contact_info: Option<ContactInfo> = row
            .contact_info
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let tags: Vec<String> = serde_json::from_str(&row.tags)?;
        let status_update_history: Vec<StatusUpdate> = serde_json::from_str(&row.status_history)?;
        let assigned_donors: Vec<String> = serde_json::from_str(&row.donors)?;

        Ok(BloodRequest {
            id: row.id,
            requested_by: row.requested_by,
            blood_type,
            location: GeoLocation {
                point,
                city: row.city,
            },
            urgency_level,
            urgency_description,
            status,
            blood_units: row.blood_units,
            fulfilled_units: row.fulfilled_units,
            assigned_donors,
            expiration_date: parse_ts(&row.expiration_date)?,
            additional_notes: row.additional_notes,
            contact_info,
            tags,
            hospital: Hospital {
                name: row.hospital_name,
                address: row.hospital_address,
                contact_number: row.hospital_contact,
            },
            status_update_history,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}
