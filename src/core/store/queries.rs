//! Typed queries against a family's version table
//!
//! Every function takes a plain `&Connection` so it can run either inside an
//! exclusive section (a `Transaction` derefs to its connection) or as a
//! standalone snapshot read.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::de::DeserializeOwned;

use super::rows::{
    node_from_row, payload_json, temporal_from_row, version_from_row, HierarchyNode, TemporalRow,
    NODE_COLUMNS, TEMPORAL_COLUMNS, VERSION_COLUMNS,
};
use crate::core::entity::{EntityFamily, Payload};
use crate::core::error::{Result, TemporalError};
use crate::core::identity::{BusinessCode, RecordId, TenantId};
use crate::core::version::{Hierarchy, Version};

// =========================================================================
// Version reads
// =========================================================================

/// Non-deleted versions of one timeline, ascending by effective date
pub fn load_timeline<P: DeserializeOwned>(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
    code: &BusinessCode,
) -> Result<Vec<Version<P>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE tenant_id = ?1 AND code = ?2 AND status != 'DELETED'
         ORDER BY effective_date",
        VERSION_COLUMNS,
        family.table()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![tenant, code], version_from_row::<P>)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Every version of one timeline, tombstones included
pub fn load_history<P: DeserializeOwned>(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
    code: &BusinessCode,
) -> Result<Vec<Version<P>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE tenant_id = ?1 AND code = ?2
         ORDER BY effective_date, created_at, record_id",
        VERSION_COLUMNS,
        family.table()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![tenant, code], version_from_row::<P>)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// A single version by record id, whatever its status
pub fn load_version<P: DeserializeOwned>(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
    record_id: RecordId,
) -> Result<Option<Version<P>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE tenant_id = ?1 AND record_id = ?2",
        VERSION_COLUMNS,
        family.table()
    );
    Ok(conn
        .query_row(&sql, params![tenant, record_id], version_from_row::<P>)
        .optional()?)
}

/// The version flagged current for each business key of a tenant, by code
pub fn load_current_versions<P: DeserializeOwned>(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
) -> Result<Vec<Version<P>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE tenant_id = ?1 AND is_current = 1 AND status != 'DELETED'
         ORDER BY code",
        VERSION_COLUMNS,
        family.table()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![tenant], version_from_row::<P>)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Temporal columns of the non-deleted versions of one timeline
pub fn load_temporal_rows(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
    code: &BusinessCode,
) -> Result<Vec<TemporalRow>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE tenant_id = ?1 AND code = ?2 AND status != 'DELETED'
         ORDER BY effective_date",
        TEMPORAL_COLUMNS,
        family.table()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![tenant, code], temporal_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Distinct business codes of a tenant that have at least one live version
pub fn list_codes(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
) -> Result<Vec<BusinessCode>> {
    let sql = format!(
        "SELECT DISTINCT code FROM {} WHERE tenant_id = ?1 AND status != 'DELETED' ORDER BY code",
        family.table()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![tenant], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Id of a non-deleted version at `date`, ignoring `exclude`
pub fn find_point(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
    code: &BusinessCode,
    date: NaiveDate,
    exclude: Option<RecordId>,
) -> Result<Option<RecordId>> {
    let sql = format!(
        "SELECT record_id FROM {} WHERE tenant_id = ?1 AND code = ?2 AND effective_date = ?3
           AND status != 'DELETED' AND (?4 IS NULL OR record_id != ?4)
         LIMIT 1",
        family.table()
    );
    Ok(conn
        .query_row(&sql, params![tenant, code, date, exclude], |row| row.get(0))
        .optional()?)
}

// =========================================================================
// Version writes
// =========================================================================

/// Insert a new version row exactly as given
///
/// A collision on the effective-date index surfaces as a point conflict.
pub fn insert_version<P: Payload>(
    conn: &Connection,
    version: &Version<P>,
    parent_code: Option<&BusinessCode>,
) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        P::FAMILY.table(),
        VERSION_COLUMNS
    );
    let payload = payload_json(&version.payload)?;
    let result = conn.execute(
        &sql,
        params![
            version.record_id,
            version.tenant_id,
            version.code,
            version.payload.name().trim(),
            parent_code,
            version.hierarchy.level,
            version.hierarchy.code_path,
            version.hierarchy.name_path,
            version.status,
            version.effective_date,
            version.end_date,
            version.is_current,
            payload,
            version.change_reason,
            version.created_at,
            version.updated_at,
            version.deleted_at,
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_point_violation(&e) => Err(TemporalError::TemporalPointConflict {
            family: P::FAMILY,
            code: version.code.to_string(),
            date: version.effective_date,
        }),
        Err(e) => Err(e.into()),
    }
}

fn is_point_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == ErrorCode::ConstraintViolation && msg.contains("effective_date")
        }
        _ => false,
    }
}

/// Persist recalculated temporal fields of one version
pub fn write_temporal(
    conn: &Connection,
    family: EntityFamily,
    record_id: RecordId,
    end_date: Option<NaiveDate>,
    is_current: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET end_date = ?2, is_current = ?3, updated_at = ?4 WHERE record_id = ?1",
        family.table()
    );
    conn.execute(&sql, params![record_id, end_date, is_current, now])?;
    Ok(())
}

/// Turn a version into a tombstone
pub fn soft_delete(
    conn: &Connection,
    family: EntityFamily,
    record_id: RecordId,
    now: DateTime<Utc>,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET status = 'DELETED', is_current = 0, deleted_at = ?2, updated_at = ?2
         WHERE record_id = ?1 AND status != 'DELETED'",
        family.table()
    );
    conn.execute(&sql, params![record_id, now])?;
    Ok(())
}

/// Replace the payload of a version in place, without touching its dates
pub fn update_payload<P: Payload>(
    conn: &Connection,
    record_id: RecordId,
    payload: &P,
    parent_code: Option<&BusinessCode>,
    hierarchy: &Hierarchy,
    change_reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET name = ?2, parent_code = ?3, level = ?4, code_path = ?5, name_path = ?6,
           payload = ?7, change_reason = COALESCE(?8, change_reason), updated_at = ?9
         WHERE record_id = ?1",
        P::FAMILY.table()
    );
    conn.execute(
        &sql,
        params![
            record_id,
            payload.name().trim(),
            parent_code,
            hierarchy.level,
            hierarchy.code_path,
            hierarchy.name_path,
            payload_json(payload)?,
            change_reason,
            now,
        ],
    )?;
    Ok(())
}

/// Rewrite the structural fields of one version
pub fn update_hierarchy(
    conn: &Connection,
    family: EntityFamily,
    record_id: RecordId,
    hierarchy: &Hierarchy,
    now: DateTime<Utc>,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET level = ?2, code_path = ?3, name_path = ?4, updated_at = ?5
         WHERE record_id = ?1",
        family.table()
    );
    conn.execute(
        &sql,
        params![
            record_id,
            hierarchy.level,
            hierarchy.code_path,
            hierarchy.name_path,
            now
        ],
    )?;
    Ok(())
}

// =========================================================================
// Structural reads
// =========================================================================

/// Current, non-deleted snapshot of one business key
pub fn current_node(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
    code: &BusinessCode,
) -> Result<Option<HierarchyNode>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE tenant_id = ?1 AND code = ?2 AND is_current = 1
           AND status != 'DELETED'",
        NODE_COLUMNS,
        family.table()
    );
    Ok(conn
        .query_row(&sql, params![tenant, code], |row| node_from_row(row, 0))
        .optional()?)
}

/// Every non-deleted version in `family` whose parent is `parent`
pub fn child_nodes(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
    parent: &BusinessCode,
) -> Result<Vec<HierarchyNode>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE tenant_id = ?1 AND parent_code = ?2 AND status != 'DELETED'
         ORDER BY code, effective_date",
        NODE_COLUMNS,
        family.table()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![tenant, parent], |row| node_from_row(row, 1))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Current snapshot tree below `root`, breadth first
///
/// Walks `parent_code` links within one family, never deeper than
/// `max_depth` edges from the root.
pub fn subtree(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
    root: &BusinessCode,
    max_depth: u32,
) -> Result<Vec<HierarchyNode>> {
    let t = family.table();
    let sql = format!(
        "WITH RECURSIVE tree(rid, code, depth) AS (
           SELECT record_id, code, 0 FROM {t}
            WHERE tenant_id = ?1 AND code = ?2 AND is_current = 1 AND status != 'DELETED'
           UNION ALL
           SELECT c.record_id, c.code, tree.depth + 1
             FROM {t} c JOIN tree ON c.parent_code = tree.code
            WHERE c.tenant_id = ?1 AND c.is_current = 1 AND c.status != 'DELETED'
              AND tree.depth < ?3
         )
         SELECT {cols}, tree.depth FROM tree JOIN {t} n ON n.record_id = tree.rid
         ORDER BY tree.depth, n.code",
        cols = prefixed_node_columns("n"),
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![tenant, root, max_depth], |row| {
        let depth: u32 = row.get(10)?;
        node_from_row(row, depth)
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn prefixed_node_columns(alias: &str) -> String {
    NODE_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
