use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::permissions::{GrantDiff, reconcile};
use crate::tenancy::Scope;
use crate::types::*;

const CENTER_COLUMNS: &str = "id, code, name, is_active, created_at";
const USER_COLUMNS: &str = "id, username, role, center_id, is_active, created_at, updated_at";
const TOKEN_COLUMNS: &str = "id, token_hash, token_lookup, user_id, session_center_id, created_at, expires_at, last_used_at";
const ITEM_COLUMNS: &str = "id, center_id, name, quantity, unit, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database, used by tests and throwaway tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn center_from_row(row: &Row<'_>) -> rusqlite::Result<VocationalCenter> {
    Ok(VocationalCenter {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        is_active: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(2)?;
    let role = Role::parse(&role).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, format!("unknown role '{role}'").into())
    })?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        role,
        center_id: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn grant_from_row(row: &Row<'_>) -> rusqlite::Result<PermissionGrant> {
    Ok(PermissionGrant {
        user_id: row.get(0)?,
        permission_key: row.get(1)?,
        allowed: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        session_center_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        center_id: row.get(1)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        unit: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Center operations

    fn create_center(&self, center: &VocationalCenter) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO vocational_centers (id, code, name, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                center.id,
                center.code,
                center.name,
                center.is_active,
                format_datetime(&center.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_center(&self, id: &str) -> Result<Option<VocationalCenter>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CENTER_COLUMNS} FROM vocational_centers WHERE id = ?1"),
            params![id],
            center_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_center_by_code(&self, code: &str) -> Result<Option<VocationalCenter>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CENTER_COLUMNS} FROM vocational_centers WHERE code = ?1"),
            params![code],
            center_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_centers(&self, active_only: bool) -> Result<Vec<VocationalCenter>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CENTER_COLUMNS} FROM vocational_centers
             WHERE (?1 = 0 OR is_active = 1) ORDER BY code"
        ))?;

        let rows = stmt.query_map(params![active_only], center_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_center_active(&self, id: &str, is_active: bool) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE vocational_centers SET is_active = ?1 WHERE id = ?2",
            params![is_active, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, username, role, center_id, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id,
                user.username,
                user.role.as_str(),
                user.center_id,
                user.is_active,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, scope: &Scope, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let predicate = scope.membership_predicate("center_id");
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE {} AND id > :cursor ORDER BY id LIMIT :limit",
            predicate.clause
        ))?;

        let mut args: Vec<(&str, &dyn ToSql)> = vec![(":cursor", &cursor), (":limit", &limit)];
        if let Some(center_id) = &predicate.center_id {
            args.push((":center_id", center_id));
        }

        let rows = stmt.query_map(args.as_slice(), user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET role = ?1, center_id = ?2, is_active = ?3, updated_at = ?4 WHERE id = ?5",
            params![
                user.role.as_str(),
                user.center_id,
                user.is_active,
                format_datetime(&Utc::now()),
                user.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn has_founder(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1",
            params![Role::Founder.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Permission grant operations

    fn get_permission_grant(&self, user_id: &str, key: &str) -> Result<Option<PermissionGrant>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, permission_key, allowed, created_at, updated_at
             FROM user_permissions WHERE user_id = ?1 AND permission_key = ?2",
            params![user_id, key],
            grant_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_grants(&self, user_id: &str) -> Result<Vec<PermissionGrant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, permission_key, allowed, created_at, updated_at
             FROM user_permissions WHERE user_id = ?1 ORDER BY permission_key",
        )?;

        let rows = stmt.query_map(params![user_id], grant_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_allowed_keys(&self, user_id: &str) -> Result<BTreeSet<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT permission_key FROM user_permissions WHERE user_id = ?1 AND allowed = 1",
        )?;

        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;

        rows.collect::<std::result::Result<BTreeSet<_>, _>>()
            .map_err(Error::from)
    }

    fn upsert_permission_grant(&self, grant: &PermissionGrant) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_permissions (user_id, permission_key, allowed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (user_id, permission_key) DO UPDATE SET
                allowed = excluded.allowed,
                updated_at = excluded.updated_at",
            params![
                grant.user_id,
                grant.permission_key,
                grant.allowed,
                format_datetime(&grant.created_at),
                format_datetime(&grant.updated_at),
            ],
        )?;
        Ok(())
    }

    fn replace_grants(
        &self,
        user_id: &str,
        desired: &BTreeMap<String, bool>,
        prune: bool,
    ) -> Result<GrantDiff> {
        let now = format_datetime(&Utc::now());
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = {
            let mut stmt = tx.prepare(
                "SELECT user_id, permission_key, allowed, created_at, updated_at
                 FROM user_permissions WHERE user_id = ?1",
            )?;
            let rows = stmt.query_map(params![user_id], grant_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut diff = reconcile(&current, desired);
        if !prune {
            let kept = std::mem::take(&mut diff.removed);
            diff.unchanged.extend(kept);
        }

        for key in &diff.removed {
            tx.execute(
                "DELETE FROM user_permissions WHERE user_id = ?1 AND permission_key = ?2",
                params![user_id, key],
            )?;
        }

        for (key, allowed) in &diff.added {
            tx.execute(
                "INSERT INTO user_permissions (user_id, permission_key, allowed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![user_id, key, allowed, now],
            )?;
        }

        for (key, allowed) in &diff.changed {
            tx.execute(
                "UPDATE user_permissions SET allowed = ?1, updated_at = ?2
                 WHERE user_id = ?3 AND permission_key = ?4",
                params![allowed, now, user_id, key],
            )?;
        }

        tx.commit()?;
        Ok(diff)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, session_center_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                token.session_center_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn set_session_center(&self, token_id: &str, center_id: Option<&str>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE tokens SET session_center_id = ?1 WHERE id = ?2",
            params![center_id, token_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Item operations

    fn create_item(&self, item: &Item) -> Result<()> {
        self.conn().execute(
            "INSERT INTO items (id, center_id, name, quantity, unit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.id,
                item.center_id,
                item.name,
                item.quantity,
                item.unit,
                format_datetime(&item.created_at),
                format_datetime(&item.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_item(&self, id: &str) -> Result<Option<Item>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
            params![id],
            item_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_items(&self, scope: &Scope, cursor: &str, limit: i32) -> Result<Vec<Item>> {
        let predicate = scope.predicate("center_id");
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE {} AND id > :cursor ORDER BY id LIMIT :limit",
            predicate.clause
        ))?;

        let mut args: Vec<(&str, &dyn ToSql)> = vec![(":cursor", &cursor), (":limit", &limit)];
        if let Some(center_id) = &predicate.center_id {
            args.push((":center_id", center_id));
        }

        let rows = stmt.query_map(args.as_slice(), item_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_item(&self, item: &Item) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE items SET center_id = ?1, name = ?2, quantity = ?3, unit = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                item.center_id,
                item.name,
                item.quantity,
                item.unit,
                format_datetime(&item.updated_at),
                item.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_item(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Activity log

    fn record_activity(&self, entry: &ActivityLog) -> Result<()> {
        self.conn().execute(
            "INSERT INTO activity_logs (id, actor_id, action, entity_type, entity_id, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.actor_id,
                entry.action,
                entry.entity_type,
                entry.entity_id,
                entry.detail,
                format_datetime(&entry.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_activity(&self, cursor: &str, limit: i32) -> Result<Vec<ActivityLog>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, actor_id, action, entity_type, entity_id, detail, created_at
             FROM activity_logs WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], |row| {
            Ok(ActivityLog {
                id: row.get(0)?,
                actor_id: row.get(1)?,
                action: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                detail: row.get(5)?,
                created_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
