//! Effective-date collision checks

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use tracing::debug;

use crate::core::entity::EntityFamily;
use crate::core::error::{Result, TemporalError};
use crate::core::identity::{BusinessCode, RecordId, TenantId};
use crate::core::store;

/// Years a stored effective date may fall in
///
/// Dates are kept as ISO-8601 text, which only sorts chronologically for
/// four-digit years.
pub const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Fail with a validation error if `date` is outside [`STORABLE_YEARS`]
pub fn ensure_storable(date: NaiveDate) -> Result<()> {
    if STORABLE_YEARS.contains(&date.year()) {
        Ok(())
    } else {
        Err(TemporalError::validation(format!(
            "effective date {} is outside 0001-01-01..=9999-12-31",
            date
        )))
    }
}

/// Fail with a point conflict if another live version already starts on `date`
///
/// `exclude` names a version that is about to be replaced and therefore
/// does not count as a collision. Dates outside [`STORABLE_YEARS`] are
/// rejected first.
pub fn ensure_point_free(
    conn: &Connection,
    family: EntityFamily,
    tenant: &TenantId,
    code: &BusinessCode,
    date: NaiveDate,
    exclude: Option<RecordId>,
) -> Result<()> {
    ensure_storable(date)?;
    match store::find_point(conn, family, tenant, code, date, exclude)? {
        Some(existing) => {
            debug!(%family, %tenant, %code, %date, %existing, "effective date already taken");
            Err(TemporalError::TemporalPointConflict {
                family,
                code: code.to_string(),
                date,
            })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorCode;
    use crate::core::store::Store;

    fn insert_row(store: &Store, record_id: RecordId, date: &str, status: &str) {
        store
            .conn()
            .execute(
                "INSERT INTO job_family_groups (record_id, tenant_id, code, name, level, code_path,
                   name_path, status, effective_date, is_current, payload, created_at, updated_at)
                 VALUES (?1, 't1', 'TECH', 'Tech', 1, '/TECH', '/Tech', ?2, ?3, 0, '{}',
                   '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                rusqlite::params![record_id, status, date],
            )
            .unwrap();
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_detects_live_collision() {
        let store = Store::open_in_memory().unwrap();
        insert_row(&store, RecordId::new(), "2024-06-01", "ACTIVE");

        let tenant: TenantId = "t1".parse().unwrap();
        let code: BusinessCode = "TECH".parse().unwrap();
        let family = EntityFamily::JobFamilyGroup;

        let err = ensure_point_free(store.conn(), family, &tenant, &code, date("2024-06-01"), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TemporalPointConflict);
        assert!(
            ensure_point_free(store.conn(), family, &tenant, &code, date("2024-06-02"), None)
                .is_ok()
        );
    }

    #[test]
    fn test_tombstones_and_excluded_version_do_not_collide() {
        let store = Store::open_in_memory().unwrap();
        let live = RecordId::new();
        insert_row(&store, RecordId::new(), "2024-01-01", "DELETED");
        insert_row(&store, live, "2024-06-01", "ACTIVE");

        let tenant: TenantId = "t1".parse().unwrap();
        let code: BusinessCode = "TECH".parse().unwrap();
        let family = EntityFamily::JobFamilyGroup;

        assert!(
            ensure_point_free(store.conn(), family, &tenant, &code, date("2024-01-01"), None)
                .is_ok()
        );
        assert!(ensure_point_free(
            store.conn(),
            family,
            &tenant,
            &code,
            date("2024-06-01"),
            Some(live)
        )
        .is_ok());
    }

    #[test]
    fn test_dates_beyond_four_digit_years_rejected() {
        let store = Store::open_in_memory().unwrap();
        let tenant: TenantId = "t1".parse().unwrap();
        let code: BusinessCode = "TECH".parse().unwrap();
        let family = EntityFamily::JobFamilyGroup;

        let last = date("9999-12-31");
        assert!(ensure_point_free(store.conn(), family, &tenant, &code, last, None).is_ok());

        let beyond = NaiveDate::from_ymd_opt(10000, 1, 1).unwrap();
        let err = ensure_point_free(store.conn(), family, &tenant, &code, beyond, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let before_era = NaiveDate::from_ymd_opt(0, 12, 31).unwrap();
        assert!(ensure_storable(before_era).is_err());
        assert!(ensure_storable(date("0001-01-01")).is_ok());
    }

    #[test]
    fn test_other_tenant_does_not_collide() {
        let store = Store::open_in_memory().unwrap();
        insert_row(&store, RecordId::new(), "2024-06-01", "ACTIVE");

        let other: TenantId = "t2".parse().unwrap();
        let code: BusinessCode = "TECH".parse().unwrap();
        assert!(ensure_point_free(
            store.conn(),
            EntityFamily::JobFamilyGroup,
            &other,
            &code,
            date("2024-06-01"),
            None
        )
        .is_ok());
    }
}
