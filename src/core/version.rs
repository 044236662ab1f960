//! Version records and timelines

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Status;
use crate::core::identity::{BusinessCode, RecordId, TenantId};

/// The temporal surface of a version, independent of its payload
///
/// The timeline recalculator only ever reads and writes these fields, so any
/// record type implementing this trait can be recalculated.
pub trait VersionedRecord {
    fn record_id(&self) -> RecordId;
    fn effective_date(&self) -> NaiveDate;
    fn end_date(&self) -> Option<NaiveDate>;
    fn is_current(&self) -> bool;
    fn status(&self) -> Status;
    fn set_end_date(&mut self, end_date: Option<NaiveDate>);
    fn set_current(&mut self, current: bool);
}

/// Structural position of a node relative to its parent's current snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    /// Root = 1
    pub level: u32,
    pub code_path: String,
    pub name_path: String,
}

impl Hierarchy {
    pub fn root(code: &str, name: &str) -> Self {
        Self {
            level: 1,
            code_path: format!("/{}", code),
            name_path: format!("/{}", name),
        }
    }

    pub fn child_of(parent: &Hierarchy, code: &str, name: &str) -> Self {
        Self {
            level: parent.level + 1,
            code_path: format!("{}/{}", parent.code_path, code),
            name_path: format!("{}/{}", parent.name_path, name),
        }
    }

    /// Codes along the path from the root down to this node
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.code_path.split('/').filter(|s| !s.is_empty())
    }
}

/// One dated version of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version<P> {
    pub record_id: RecordId,
    pub tenant_id: TenantId,
    pub code: BusinessCode,
    pub status: Status,
    pub effective_date: NaiveDate,
    /// `None` only on the last version of a timeline
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub hierarchy: Hierarchy,
    pub payload: P,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl<P> Version<P> {
    /// Whether `date` falls within `[effective_date, end_date]`
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.effective_date <= date && self.end_date.map_or(true, |end| date <= end)
    }
}

impl<P> VersionedRecord for Version<P> {
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

/// The ordered, non-overlapping non-deleted versions of one business key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline<P> {
    versions: Vec<Version<P>>,
}

impl<P> Timeline<P> {
    /// Wrap versions already sorted by effective date
    pub fn new(versions: Vec<Version<P>>) -> Self {
        Self { versions }
    }

    pub fn empty() -> Self {
        Self {
            versions: Vec::new(),
        }
    }

    pub fn versions(&self) -> &[Version<P>] {
        &self.versions
    }

    pub fn into_versions(self) -> Vec<Version<P>> {
        self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Version<P>> {
        self.versions.iter()
    }

    pub fn current(&self) -> Option<&Version<P>> {
        self.versions.iter().find(|v| v.is_current)
    }

    pub fn find(&self, record_id: RecordId) -> Option<&Version<P>> {
        self.versions.iter().find(|v| v.record_id == record_id)
    }

    pub fn at(&self, date: NaiveDate) -> Option<&Version<P>> {
        self.versions.iter().find(|v| v.covers(date))
    }

    pub fn last(&self) -> Option<&Version<P>> {
        self.versions.last()
    }
}

impl<'a, P> IntoIterator for &'a Timeline<P> {
    type Item = &'a Version<P>;
    type IntoIter = std::slice::Iter<'a, Version<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.iter()
    }
}
