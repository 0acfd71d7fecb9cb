//! SQLite schema definition.

/// Complete database schema for blood-match.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Users (read model owned by the identity service)
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    blood_type TEXT,                              -- raw label, may be unrecognized
    roles TEXT NOT NULL DEFAULT '[]',             -- JSON array of strings
    longitude REAL,
    latitude REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Blood Requests
-- ============================================================================

CREATE TABLE IF NOT EXISTS blood_requests (
    id TEXT PRIMARY KEY,
    requested_by TEXT NOT NULL,
    blood_type TEXT NOT NULL
        CHECK (blood_type IN ('O-', 'O+', 'A-', 'A+', 'B-', 'B+', 'AB-', 'AB+')),
    longitude REAL NOT NULL CHECK (longitude BETWEEN -180 AND 180),
    latitude REAL NOT NULL CHECK (latitude BETWEEN -90 AND 90),
    city TEXT,
    urgency_level TEXT NOT NULL CHECK (urgency_level IN ('high', 'medium', 'low')),
    urgency_description TEXT
        CHECK (urgency_description IS NULL OR urgency_description IN ('Critical', 'High', 'Medium', 'Low')),
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'matched', 'fulfilled')),
    blood_units REAL NOT NULL CHECK (blood_units > 0),
    fulfilled_units REAL NOT NULL DEFAULT 0 CHECK (fulfilled_units >= 0),
    expiration_date TEXT NOT NULL,
    additional_notes TEXT,
    contact_info TEXT,                            -- JSON object {phone, email}
    tags TEXT NOT NULL DEFAULT '[]',              -- JSON array of strings
    hospital_name TEXT NOT NULL,
    hospital_address TEXT NOT NULL,
    hospital_contact TEXT NOT NULL,
    status_history TEXT NOT NULL DEFAULT '[]',    -- JSON array of {status, updated_at, updated_by}
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_requests_requested_by ON blood_requests(requested_by);
CREATE INDEX IF NOT EXISTS idx_requests_type_status ON blood_requests(blood_type, status);
CREATE INDEX IF NOT EXISTS idx_requests_city ON blood_requests(city);

-- R*Tree spatial index over request points (degenerate boxes)
CREATE VIRTUAL TABLE IF NOT EXISTS blood_requests_geo USING rtree(
    id,
    min_lng, max_lng,
    min_lat, max_lat
);

-- Triggers to keep the spatial index in sync with the main table
CREATE TRIGGER IF NOT EXISTS blood_requests_geo_ai AFTER INSERT ON blood_requests BEGIN
    INSERT INTO blood_requests_geo(id, min_lng, max_lng, min_lat, max_lat)
    VALUES (new.rowid, new.longitude, new.longitude, new.latitude, new.latitude);
END;

CREATE TRIGGER IF NOT EXISTS blood_requests_geo_ad AFTER DELETE ON blood_requests BEGIN
    DELETE FROM blood_requests_geo WHERE id = old.rowid;
END;

CREATE TRIGGER IF NOT EXISTS blood_requests_geo_au AFTER UPDATE OF longitude, latitude ON blood_requests BEGIN
    UPDATE blood_requests_geo
    SET min_lng = new.longitude, max_lng = new.longitude,
        min_lat = new.latitude, max_lat = new.latitude
    WHERE id = new.rowid;
END;

-- ============================================================================
-- Donor Assignments (set semantics per request, insertion ordered)
-- ============================================================================

CREATE TABLE IF NOT EXISTS request_donors (
    request_id TEXT NOT NULL REFERENCES blood_requests(id) ON DELETE CASCADE,
    donor_id TEXT NOT NULL,
    assigned_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (request_id, donor_id)
);

CREATE INDEX IF NOT EXISTS idx_request_donors_donor ON request_donors(donor_id);
"#;
