//! Status transitions
//!
//! A transition never edits an existing version. It appends a new version
//! carrying the current version's structural payload with the target status,
//! dated today or in the future, and lets recalculation place it.

use chrono::NaiveDate;
use tracing::info;

use crate::core::conflict::{ensure_point_free, ensure_storable};
use crate::core::entity::{Payload, Status};
use crate::core::error::{Result, TemporalError};
use crate::core::hierarchy::Placement;
use crate::core::identity::BusinessCode;
use crate::core::mutator::Scope;
use crate::core::timeline;
use crate::core::version::Timeline;

/// Move `code` to `target` from `effective_date` on
///
/// Already being at `target` is a successful no-op.
pub fn change_status<P: Payload>(
    scope: &Scope<'_>,
    code: &BusinessCode,
    target: Status,
    effective_date: NaiveDate,
    reason: &str,
) -> Result<Timeline<P>> {
    if target.is_deleted() || !P::FAMILY.allows_status(target) {
        return Err(TemporalError::validation(format!(
            "{} is not a valid status for a {}",
            target,
            P::FAMILY
        )));
    }
    ensure_storable(effective_date)?;

    let before = scope.current_hierarchy::<P>(code)?;
    let timeline = timeline::recalculate::<P>(scope.conn, scope.tenant, code, scope.today, scope.now)?;
    let current = timeline.current().ok_or_else(|| {
        TemporalError::RecordNotFound(format!("{} {} has no current version", P::FAMILY, code))
    })?;

    if current.status == target {
        info!(
            family = %P::FAMILY, tenant = %scope.tenant, %code, status = %target,
            "status already at target; nothing to do"
        );
        return Ok(timeline);
    }

    ensure_point_free(scope.conn, P::FAMILY, scope.tenant, code, effective_date, None)?;

    let from = current.status;
    let placement = Placement {
        parent: scope.resolver.parent_code(current.payload.parent_code())?,
        hierarchy: current.hierarchy.clone(),
    };
    let record_id = scope.write_version(
        code,
        current.payload.structural_clone(),
        target,
        effective_date,
        placement,
        Some(reason),
    )?;
    let timeline = scope.settle::<P>(code, before)?;

    info!(
        family = %P::FAMILY, tenant = %scope.tenant, %code, %record_id,
        %from, to = %target, %effective_date,
        scheduled = effective_date > scope.today,
        "changed status"
    );
    Ok(timeline)
}

/// Transition to `INACTIVE`
pub fn suspend<P: Payload>(
    scope: &Scope<'_>,
    code: &BusinessCode,
    effective_date: NaiveDate,
    reason: &str,
) -> Result<Timeline<P>> {
    change_status::<P>(scope, code, Status::Inactive, effective_date, reason)
}

/// Transition to `ACTIVE`
pub fn activate<P: Payload>(
    scope: &Scope<'_>,
    code: &BusinessCode,
    effective_date: NaiveDate,
    reason: &str,
) -> Result<Timeline<P>> {
    change_status::<P>(scope, code, Status::Active, effective_date, reason)
}
