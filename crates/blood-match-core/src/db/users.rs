//! User read-model operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{GeoPoint, User};

impl Database {
    /// Insert or replace a user record.
    pub fn upsert_user(&self, user: &User) -> DbResult<()> {
        let roles_json = serde_json::to_string(&user.roles)?;
        self.conn.execute(
            r#"
            INSERT INTO users (
                id, first_name, last_name, phone, email, blood_type,
                roles, longitude, latitude, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                phone = excluded.phone,
                email = excluded.email,
                blood_type = excluded.blood_type,
                roles = excluded.roles,
                longitude = excluded.longitude,
                latitude = excluded.latitude
            "#,
            params![
                user.id,
                user.first_name,
                user.last_name,
                user.phone,
                user.email,
                user.blood_type,
                roles_json,
                user.location.map(|p| p.longitude),
                user.location.map(|p| p.latitude),
                user.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, first_name, last_name, phone, email, blood_type,
                       roles, longitude, latitude, created_at
                FROM users
                WHERE id = ?
                "#,
                [id],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        phone: row.get(3)?,
                        email: row.get(4)?,
                        blood_type: row.get(5)?,
                        roles: row.get(6)?,
                        longitude: row.get(7)?,
                        latitude: row.get(8)?,
                        created_at: row.get(9)?,
                    })
                },
            )
            .optional()?;
        row.map(|row| row.try_into()).transpose()
    }
}

/// Internal row representation for database mapping.
struct UserRow {
    id: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    email: Option<String>,
    blood_type: Option<String>,
    roles: String,
    longitude: Option<f64>,
    latitude: Option<f64>,
    created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = super::DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let roles: Vec<String> = serde_json::from_str(&row.roles)?;
        let location = match (row.longitude, row.latitude) {
            (Some(lng), Some(lat)) => GeoPoint::new(lng, lat).ok(),
            _ => None,
        };

        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            email: row.email,
            blood_type: row.blood_type,
            roles,
            location,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_get_user() {
        let db = Database::open_in_memory().unwrap();

        let mut user = User::new("Karim".into(), "Saad".into());
        user.blood_type = Some("O-".into());
        user.roles.push("donor".into());
        user.location = Some(GeoPoint::new(35.5, 33.9).unwrap());
        db.upsert_user(&user).unwrap();

        let retrieved = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(retrieved, user);

        user.phone = Some("03-000000".into());
        db.upsert_user(&user).unwrap();
        let retrieved = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(retrieved.phone.as_deref(), Some("03-000000"));
    }

    #[test]
    fn test_get_missing_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_user("nobody").unwrap().is_none());
    }
}
