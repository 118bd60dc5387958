use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::StoreError;
use crate::schema::events;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Bumped whenever the on-disk shape changes in a way `run_pending_migrations`
/// alone can't reconcile (e.g. a column meaning changes). Stored in SQLite's
/// own `user_version` pragma rather than a table, so a schema check never
/// depends on the `events` table itself existing yet.
const SCHEMA_VERSION: i64 = 1;

#[derive(QueryableByName)]
struct UserVersionRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    user_version: i64,
}

/// One row of the append-only `events` table (§3 AuditEvent, §4.6).
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = events)]
pub struct AuditEventRow {
    pub id: i64,
    pub ts: String,
    pub agent_id: String,
    pub event: String,
    pub wallet_pk: String,
    pub signature: Option<String>,
    pub status: Option<String>,
    pub details_json: String,
}

#[derive(Insertable)]
#[diesel(table_name = events)]
struct NewAuditEvent<'a> {
    ts: &'a str,
    agent_id: &'a str,
    event: &'a str,
    wallet_pk: &'a str,
    signature: Option<&'a str>,
    status: Option<&'a str>,
    details_json: &'a str,
}

/// New-event payload, pre-sanitization. Callers build this; [`AuditDb::append`]
/// sanitizes `details` before it ever reaches the database.
pub struct NewEvent<'a> {
    pub ts: chrono::DateTime<chrono::Utc>,
    pub agent_id: &'a str,
    pub event: &'a str,
    pub wallet_pk: &'a str,
    pub signature: Option<&'a str>,
    pub status: Option<&'a str>,
    pub details: serde_json::Value,
}

#[derive(Default)]
pub struct QueryFilter<'a> {
    pub agent_id: Option<&'a str>,
    pub wallet_pk: Option<&'a str>,
    pub event: Option<&'a str>,
    pub before: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: i64,
}

impl<'a> QueryFilter<'a> {
    pub fn new() -> Self {
        QueryFilter {
            limit: 50,
            ..Default::default()
        }
    }
}

pub struct SummaryRow {
    pub agent_id: String,
    pub event: String,
    pub count: i64,
}

/// Append-only embedded event log. Once [`close`](AuditDb::close) has run,
/// every subsequent write fails with [`StoreError::ClosedStore`] — there is
/// no way to reopen a closed handle; open a fresh one instead.
pub struct AuditDb {
    conn: Option<SqliteConnection>,
}

impl std::fmt::Debug for AuditDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditDb")
            .field("conn", &self.conn.as_ref().map(|_| "SqliteConnection"))
            .finish()
    }
}

impl AuditDb {
    /// Opens (or creates) a store at the given file path and runs pending
    /// migrations. Journaling mode is write-ahead, synchronous=normal.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let mut conn = SqliteConnection::establish(path)?;
        Self::configure(&mut conn)?;
        Ok(AuditDb { conn: Some(conn) })
    }

    /// Opens an in-memory store, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = SqliteConnection::establish(":memory:")?;
        Self::configure(&mut conn)?;
        Ok(AuditDb { conn: Some(conn) })
    }

    fn configure(conn: &mut SqliteConnection) -> Result<(), StoreError> {
        diesel::sql_query("PRAGMA journal_mode = WAL").execute(conn)?;
        diesel::sql_query("PRAGMA synchronous = NORMAL").execute(conn)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Self::check_schema_version(conn)?;
        Ok(())
    }

    /// A fresh database (never stamped) is tagged with the current version.
    /// Any other stored version that disagrees means this binary and the
    /// on-disk store were built against different schema expectations.
    fn check_schema_version(conn: &mut SqliteConnection) -> Result<(), StoreError> {
        let row: UserVersionRow = diesel::sql_query("PRAGMA user_version").get_result(conn)?;
        if row.user_version == 0 {
            diesel::sql_query(format!("PRAGMA user_version = {SCHEMA_VERSION}")).execute(conn)?;
            return Ok(());
        }
        if row.user_version != SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: row.user_version,
            });
        }
        Ok(())
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::ClosedStore)
    }

    /// Appends one sanitized event row. `details` is recursively stripped of
    /// key-adjacent fields (§4.6) before it is serialized — the caller's
    /// original value is untouched.
    pub fn append(&mut self, new_event: NewEvent<'_>) -> Result<i64, StoreError> {
        let sanitized = wallet_sdk::redact::sanitize(&new_event.details);
        let details_json = serde_json::to_string(&sanitized)
            .map_err(|e| StoreError::InvalidData(format!("details serialization failed: {e}")))?;
        wallet_sdk::redact::assert_no_key_material(&details_json)
            .map_err(StoreError::InvalidData)?;

        let ts = new_event.ts.to_rfc3339();
        let row = NewAuditEvent {
            ts: &ts,
            agent_id: new_event.agent_id,
            event: new_event.event,
            wallet_pk: new_event.wallet_pk,
            signature: new_event.signature,
            status: new_event.status,
            details_json: &details_json,
        };
        let conn = self.conn()?;
        diesel::insert_into(events::table)
            .values(&row)
            .execute(conn)?;
        let id: i64 = diesel::select(diesel::dsl::sql::<diesel::sql_types::BigInt>("last_insert_rowid()"))
            .get_result(conn)?;
        Ok(id)
    }

    /// Rows in descending timestamp order, newest first.
    pub fn query(&mut self, filter: QueryFilter<'_>) -> Result<Vec<AuditEventRow>, StoreError> {
        let conn = self.conn()?;
        let mut query = events::table.into_boxed();
        if let Some(agent_id) = filter.agent_id {
            query = query.filter(events::agent_id.eq(agent_id.to_string()));
        }
        if let Some(wallet_pk) = filter.wallet_pk {
            query = query.filter(events::wallet_pk.eq(wallet_pk.to_string()));
        }
        if let Some(event) = filter.event {
            query = query.filter(events::event.eq(event.to_string()));
        }
        if let Some(before) = filter.before {
            query = query.filter(events::ts.lt(before.to_rfc3339()));
        }
        let limit = if filter.limit > 0 { filter.limit } else { 50 };
        let rows = query
            .order(events::ts.desc())
            .limit(limit)
            .select(AuditEventRow::as_select())
            .load(conn)?;
        Ok(rows)
    }

    /// Latest `system_stop_request` row for `agent_id`, if any — the
    /// cross-process mailbox the AgentLoop polls each tick (§4.7 step 2).
    pub fn latest_stop_request(&mut self, agent_id: &str) -> Result<Option<AuditEventRow>, StoreError> {
        let conn = self.conn()?;
        let row = events::table
            .filter(events::agent_id.eq(agent_id.to_string()))
            .filter(events::event.eq("system_stop_request"))
            .order(events::ts.desc())
            .limit(1)
            .select(AuditEventRow::as_select())
            .first(conn)
            .optional()?;
        Ok(row)
    }

    pub fn summarise(&mut self) -> Result<Vec<SummaryRow>, StoreError> {
        let conn = self.conn()?;
        let rows: Vec<(String, String, i64)> = events::table
            .group_by((events::agent_id, events::event))
            .select((
                events::agent_id,
                events::event,
                diesel::dsl::count(events::id),
            ))
            .load(conn)?;
        Ok(rows
            .into_iter()
            .map(|(agent_id, event, count)| SummaryRow {
                agent_id,
                event,
                count,
            })
            .collect())
    }

    pub fn count(&mut self, agent_id: Option<&str>, wallet_pk: Option<&str>) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        let mut query = events::table.into_boxed();
        if let Some(agent_id) = agent_id {
            query = query.filter(events::agent_id.eq(agent_id.to_string()));
        }
        if let Some(wallet_pk) = wallet_pk {
            query = query.filter(events::wallet_pk.eq(wallet_pk.to_string()));
        }
        let count: i64 = query.count().get_result(conn)?;
        Ok(count)
    }

    /// Checkpoints the WAL and closes the connection. Any subsequent call
    /// on this handle returns [`StoreError::ClosedStore`].
    pub fn close(&mut self) -> Result<(), StoreError> {
        if let Some(mut conn) = self.conn.take() {
            diesel::sql_query("PRAGMA wal_checkpoint(TRUNCATE)").execute(&mut conn)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event<'a>(agent_id: &'a str, event: &'a str) -> NewEvent<'a> {
        NewEvent {
            ts: chrono::Utc::now(),
            agent_id,
            event,
            wallet_pk: "Fg6PaFpoGXkYsidMpWxTWrCmZevqrCNVDDRXq5YqbVS4",
            signature: None,
            status: None,
            details: json!({"amount": 5}),
        }
    }

    #[test]
    fn append_and_query_round_trip() {
        let mut db = AuditDb::open_in_memory().unwrap();
        db.append(sample_event("agent-a", "agent_start")).unwrap();
        db.append(sample_event("agent-a", "agent_noop")).unwrap();
        let rows = db.query(QueryFilter::new()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event, "agent_noop"); // newest first
    }

    #[test]
    fn sanitizes_key_adjacent_fields_before_persisting() {
        let mut db = AuditDb::open_in_memory().unwrap();
        let mut ev = sample_event("agent-a", "agent_error");
        ev.details = json!({"mnemonic": "abandon abandon", "code": "X"});
        db.append(ev).unwrap();
        let rows = db.query(QueryFilter::new()).unwrap();
        assert!(!rows[0].details_json.to_lowercase().contains("mnemonic"));
        assert!(rows[0].details_json.contains("code"));
    }

    #[test]
    fn writes_after_close_fail() {
        let mut db = AuditDb::open_in_memory().unwrap();
        db.close().unwrap();
        let err = db.append(sample_event("agent-a", "agent_stop")).unwrap_err();
        assert!(matches!(err, StoreError::ClosedStore));
    }

    #[test]
    fn rejects_a_store_stamped_with_a_different_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");
        let path = path.to_str().unwrap();

        AuditDb::open(path).unwrap().close().unwrap();

        let mut raw = SqliteConnection::establish(path).unwrap();
        diesel::sql_query("PRAGMA user_version = 999").execute(&mut raw).unwrap();
        drop(raw);

        let err = AuditDb::open(path).unwrap_err();
        assert!(matches!(
            err,
            StoreError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: 999
            }
        ));
    }

    #[test]
    fn latest_stop_request_picks_newest() {
        let mut db = AuditDb::open_in_memory().unwrap();
        db.append(sample_event("agent-a", "system_stop_request")).unwrap();
        let row = db.latest_stop_request("agent-a").unwrap();
        assert!(row.is_some());
        assert!(db.latest_stop_request("agent-b").unwrap().is_none());
    }
}
