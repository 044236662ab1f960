//! Table layout and migrations

use rusqlite::Connection;
use tracing::info;

use crate::core::entity::EntityFamily;
use crate::core::error::{Result, TemporalError};

/// Value stored in `PRAGMA user_version` once migrations have run
pub const SCHEMA_VERSION: i64 = 1;

/// DDL for one family's version table
///
/// The two partial unique indexes carry the storage-level half of the
/// timeline invariants: one non-deleted version per effective date, and one
/// current version per timeline.
fn family_ddl(family: EntityFamily) -> String {
    let t = family.table();
    format!(
        "CREATE TABLE IF NOT EXISTS {t} (
           record_id      TEXT PRIMARY KEY,
           tenant_id      TEXT NOT NULL,
           code           TEXT NOT NULL,
           name           TEXT NOT NULL,
           parent_code    TEXT,
           level          INTEGER NOT NULL,
           code_path      TEXT NOT NULL,
           name_path      TEXT NOT NULL,
           status         TEXT NOT NULL,
           effective_date TEXT NOT NULL,
           end_date       TEXT,
           is_current     INTEGER NOT NULL DEFAULT 0,
           payload        TEXT NOT NULL,
           change_reason  TEXT,
           created_at     TEXT NOT NULL,
           updated_at     TEXT NOT NULL,
           deleted_at     TEXT
         );
         CREATE UNIQUE INDEX IF NOT EXISTS {t}_point
           ON {t} (tenant_id, code, effective_date) WHERE status != 'DELETED';
         CREATE UNIQUE INDEX IF NOT EXISTS {t}_current
           ON {t} (tenant_id, code) WHERE is_current = 1;
         CREATE INDEX IF NOT EXISTS {t}_parent
           ON {t} (tenant_id, parent_code) WHERE status != 'DELETED';"
    )
}

pub(super) fn migrate(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(TemporalError::Config(format!(
            "database schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }
    if version == SCHEMA_VERSION {
        return Ok(());
    }

    let mut ddl = String::new();
    for family in EntityFamily::ALL {
        ddl.push_str(&family_ddl(family));
        ddl.push('\n');
    }
    ddl.push_str(&format!("PRAGMA user_version = {};", SCHEMA_VERSION));
    conn.execute_batch(&ddl)?;
    info!(from = version, to = SCHEMA_VERSION, "migrated database schema");
    Ok(())
}
