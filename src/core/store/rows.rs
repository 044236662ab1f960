//! Row mapping between version tables and domain types

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::entity::Status;
use crate::core::identity::{BusinessCode, RecordId};
use crate::core::version::{Hierarchy, Version, VersionedRecord};

/// Column list matching [`version_from_row`]
pub(super) const VERSION_COLUMNS: &str = "record_id, tenant_id, code, name, parent_code, \
     level, code_path, name_path, status, effective_date, end_date, is_current, payload, \
     change_reason, created_at, updated_at, deleted_at";

const PAYLOAD_COLUMN: usize = 12;

pub(super) fn version_from_row<P: DeserializeOwned>(row: &Row<'_>) -> rusqlite::Result<Version<P>> {
    let raw: String = row.get(PAYLOAD_COLUMN)?;
    let payload = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(PAYLOAD_COLUMN, Type::Text, Box::new(e))
    })?;
    Ok(Version {
        record_id: row.get(0)?,
        tenant_id: row.get(1)?,
        code: row.get(2)?,
        hierarchy: Hierarchy {
            level: row.get(5)?,
            code_path: row.get(6)?,
            name_path: row.get(7)?,
        },
        status: row.get(8)?,
        effective_date: row.get(9)?,
        end_date: row.get(10)?,
        is_current: row.get(11)?,
        payload,
        change_reason: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        deleted_at: row.get(16)?,
    })
}

pub(super) fn payload_json<P: Serialize>(payload: &P) -> rusqlite::Result<String> {
    serde_json::to_string(payload).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Temporal columns only, for checks that never need the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalRow {
    pub record_id: RecordId,
    pub status: Status,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}

pub(super) const TEMPORAL_COLUMNS: &str = "record_id, status, effective_date, end_date, is_current";

pub(super) fn temporal_from_row(row: &Row<'_>) -> rusqlite::Result<TemporalRow> {
    Ok(TemporalRow {
        record_id: row.get(0)?,
        status: row.get(1)?,
        effective_date: row.get(2)?,
        end_date: row.get(3)?,
        is_current: row.get(4)?,
    })
}

impl VersionedRecord for TemporalRow {
    fn record_id(&self) -> RecordId {
        self.record_id
    }

    fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }

    fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    fn is_current(&self) -> bool {
        self.is_current
    }

    fn status(&self) -> Status {
        self.status
    }

    fn set_end_date(&mut self, end_date: Option<NaiveDate>) {
        self.end_date = end_date;
    }

    fn set_current(&mut self, current: bool) {
        self.is_current = current;
    }
}

/// One node of a structural tree, taken from a current version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyNode {
    pub record_id: RecordId,
    pub code: BusinessCode,
    pub name: String,
    pub parent_code: Option<BusinessCode>,
    pub status: Status,
    pub effective_date: NaiveDate,
    pub is_current: bool,
    #[serde(flatten)]
    pub hierarchy: Hierarchy,
    /// Distance from the root of the query (root = 0)
    pub depth: u32,
}

pub(super) const NODE_COLUMNS: &str =
    "record_id, code, name, parent_code, status, effective_date, is_current, level, code_path, name_path";

pub(super) fn node_from_row(row: &Row<'_>, depth: u32) -> rusqlite::Result<HierarchyNode> {
    Ok(HierarchyNode {
        record_id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        parent_code: row.get(3)?,
        status: row.get(4)?,
        effective_date: row.get(5)?,
        is_current: row.get(6)?,
        hierarchy: Hierarchy {
            level: row.get(7)?,
            code_path: row.get(8)?,
            name_path: row.get(9)?,
        },
        depth,
    })
}
