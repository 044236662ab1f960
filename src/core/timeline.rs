//! Timeline recalculation
//!
//! The derivation itself is a pure function over any [`VersionedRecord`]
//! slice. [`recalculate`] wraps it with the load and write-back that run inside
//! an exclusive section.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::core::entity::Payload;
use crate::core::error::Result;
use crate::core::identity::{BusinessCode, RecordId, TenantId};
use crate::core::store;
use crate::core::version::{Timeline, VersionedRecord};

/// Recompute end dates and the current flag for a whole chain
///
/// `records` must be the non-deleted versions of one timeline sorted by
/// effective date. Returns the index of the current version, if any.
pub fn derive<R: VersionedRecord>(records: &mut [R], today: NaiveDate) -> Option<usize> {
    for record in records.iter_mut() {
        record.set_current(false);
    }

    let successors: Vec<Option<NaiveDate>> = records
        .iter()
        .skip(1)
        .map(|next| next.effective_date().pred_opt())
        .chain(std::iter::once(None))
        .collect();
    for (record, end) in records.iter_mut().zip(successors) {
        record.set_end_date(end);
    }

    let current = records.iter().rposition(|r| r.effective_date() <= today);
    if let Some(idx) = current {
        records[idx].set_current(true);
    }
    current
}

/// A broken timeline invariant found by [`check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A version that is not last does not end the day before its successor
    Gap {
        record_id: RecordId,
        end_date: Option<NaiveDate>,
        next_effective: NaiveDate,
    },
    /// The last version has an end date
    ClosedTail {
        record_id: RecordId,
        end_date: NaiveDate,
    },
    /// Two versions share an effective date
    DuplicatePoint { date: NaiveDate },
    /// The current flag is on the wrong version, or on more than one
    WrongCurrent {
        expected: Option<RecordId>,
        flagged: Vec<RecordId>,
    },
    /// A tombstone appeared among the live versions
    DeletedInTimeline { record_id: RecordId },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Gap {
                record_id,
                end_date,
                next_effective,
            } => match end_date {
                Some(end) => write!(
                    f,
                    "{} ends {} but the next version starts {}",
                    record_id, end, next_effective
                ),
                None => write!(
                    f,
                    "{} is open-ended but a later version starts {}",
                    record_id, next_effective
                ),
            },
            Violation::ClosedTail {
                record_id,
                end_date,
            } => write!(f, "last version {} is closed at {}", record_id, end_date),
            Violation::DuplicatePoint { date } => {
                write!(f, "more than one version is effective {}", date)
            }
            Violation::WrongCurrent { expected, flagged } => {
                let expected = expected
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".to_string());
                let flagged = if flagged.is_empty() {
                    "none".to_string()
                } else {
                    flagged
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                write!(f, "current should be {} but is {}", expected, flagged)
            }
            Violation::DeletedInTimeline { record_id } => {
                write!(f, "deleted version {} is part of the timeline", record_id)
            }
        }
    }
}

/// Check a stored chain against the timeline invariants without changing it
pub fn check<R: VersionedRecord>(records: &[R], today: NaiveDate) -> Vec<Violation> {
    let mut violations = Vec::new();

    for record in records {
        if record.status().is_deleted() {
            violations.push(Violation::DeletedInTimeline {
                record_id: record.record_id(),
            });
        }
    }

    for pair in records.windows(2) {
        let (this, next) = (&pair[0], &pair[1]);
        if this.effective_date() == next.effective_date() {
            violations.push(Violation::DuplicatePoint {
                date: this.effective_date(),
            });
        } else if this.end_date() != next.effective_date().pred_opt() {
            violations.push(Violation::Gap {
                record_id: this.record_id(),
                end_date: this.end_date(),
                next_effective: next.effective_date(),
            });
        }
    }

    if let Some(last) = records.last() {
        if let Some(end_date) = last.end_date() {
            violations.push(Violation::ClosedTail {
                record_id: last.record_id(),
                end_date,
            });
        }
    }

    let expected = records
        .iter()
        .rev()
        .find(|r| r.effective_date() <= today)
        .map(|r| r.record_id());
    let flagged: Vec<RecordId> = records
        .iter()
        .filter(|r| r.is_current())
        .map(|r| r.record_id())
        .collect();
    let ok = match expected {
        Some(id) => flagged == [id],
        None => flagged.is_empty(),
    };
    if !ok {
        violations.push(Violation::WrongCurrent { expected, flagged });
    }

    violations
}

/// Reload, re-derive and persist one timeline
///
/// Must run inside an exclusive section. Only rows whose end date or current
/// flag changed are written, and a row losing the current flag is written
/// before the row gaining it, so the single-current index never sees two.
pub fn recalculate<P: Payload>(
    conn: &Connection,
    tenant: &TenantId,
    code: &BusinessCode,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Timeline<P>> {
    let family = P::FAMILY;
    let mut versions = store::load_timeline::<P>(conn, family, tenant, code)?;
    if versions.is_empty() {
        debug!(%family, %tenant, %code, "empty timeline; nothing to recalculate");
        return Ok(Timeline::empty());
    }

    let before: Vec<(Option<NaiveDate>, bool)> = versions
        .iter()
        .map(|v| (v.end_date, v.is_current))
        .collect();
    let current = derive(&mut versions, today);

    let changed: Vec<usize> = (0..versions.len())
        .filter(|&i| (versions[i].end_date, versions[i].is_current) != before[i])
        .collect();

    let (gaining, losing): (Vec<usize>, Vec<usize>) =
        changed.iter().copied().partition(|&i| versions[i].is_current);
    for i in losing.into_iter().chain(gaining) {
        let v = &mut versions[i];
        store::write_temporal(conn, family, v.record_id, v.end_date, v.is_current, now)?;
        v.updated_at = now;
    }

    match current {
        Some(idx) => debug!(
            %family, %tenant, %code,
            versions = versions.len(),
            rewritten = changed.len(),
            current = %versions[idx].record_id,
            "recalculated timeline"
        ),
        None => warn!(
            %family, %tenant, %code,
            versions = versions.len(),
            "timeline has no current version; every version is future-dated"
        ),
    }

    Ok(Timeline::new(versions))
}
