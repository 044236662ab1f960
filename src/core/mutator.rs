//! Version mutations: insert, soft delete, move, in-place field update
//!
//! Each operation runs inside an exclusive section supplied by the caller and
//! ends with a recalculation of the touched timeline.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::core::conflict::ensure_point_free;
use crate::core::entity::{Payload, Status};
use crate::core::error::{Result, TemporalError};
use crate::core::hierarchy::{HierarchyResolver, Placement};
use crate::core::identity::{BusinessCode, RecordId, TenantId};
use crate::core::store;
use crate::core::timeline;
use crate::core::version::{Hierarchy, Timeline, Version};

/// Connection, tenant and time frame shared by one mutation
pub struct Scope<'a> {
    pub conn: &'a Connection,
    pub tenant: &'a TenantId,
    /// Calendar day used to pick the current version
    pub today: NaiveDate,
    /// Timestamp stamped on every row written
    pub now: DateTime<Utc>,
    pub resolver: HierarchyResolver<'a>,
}

impl Scope<'_> {
    /// Hierarchy of the current version of `code`, if there is one
    pub(crate) fn current_hierarchy<P: Payload>(
        &self,
        code: &BusinessCode,
    ) -> Result<Option<Hierarchy>> {
        Ok(store::current_node(self.conn, P::FAMILY, self.tenant, code)?.map(|n| n.hierarchy))
    }

    /// Recalculate `code` and, if its current snapshot moved, its descendants
    pub(crate) fn settle<P: Payload>(
        &self,
        code: &BusinessCode,
        before: Option<Hierarchy>,
    ) -> Result<Timeline<P>> {
        let timeline = timeline::recalculate::<P>(self.conn, self.tenant, code, self.today, self.now)?;
        let after = timeline.current().map(|v| &v.hierarchy);
        if after.is_some() && after != before.as_ref() {
            self.resolver
                .refresh_descendants(self.conn, P::FAMILY, self.tenant, code, self.now)?;
        }
        Ok(timeline)
    }

    /// A live version of this tenant, or `RECORD_NOT_FOUND`
    pub(crate) fn live_version<P: Payload>(&self, record_id: RecordId) -> Result<Version<P>> {
        store::load_version::<P>(self.conn, P::FAMILY, self.tenant, record_id)?
            .filter(|v| !v.status.is_deleted())
            .ok_or_else(|| {
                TemporalError::RecordNotFound(format!(
                    "{} version {} not found",
                    P::FAMILY,
                    record_id
                ))
            })
    }

    /// Write a provisional version row: open-ended and not current
    pub(crate) fn write_version<P: Payload>(
        &self,
        code: &BusinessCode,
        payload: P,
        status: Status,
        effective_date: NaiveDate,
        placement: Placement,
        reason: Option<&str>,
    ) -> Result<RecordId> {
        let version = Version {
            record_id: RecordId::new(),
            tenant_id: self.tenant.clone(),
            code: code.clone(),
            status,
            effective_date,
            end_date: None,
            is_current: false,
            hierarchy: placement.hierarchy,
            payload,
            change_reason: clean_reason(reason),
            created_at: self.now,
            updated_at: self.now,
            deleted_at: None,
        };
        store::insert_version(self.conn, &version, placement.parent.as_ref())?;
        Ok(version.record_id)
    }
}

fn clean_reason(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

fn validate_payload<P: Payload>(payload: &P) -> Result<()> {
    payload.validate().map_err(TemporalError::Validation)
}

/// Every cross-family reference of `payload` names a current version
fn ensure_references<P: Payload>(scope: &Scope<'_>, payload: &P) -> Result<()> {
    for (family, raw) in payload.references() {
        let code: BusinessCode = raw.parse()?;
        if store::current_node(scope.conn, family, scope.tenant, &code)?.is_none() {
            return Err(TemporalError::validation(format!(
                "{} {} referenced by this {} has no current version",
                family,
                code,
                P::FAMILY
            )));
        }
    }
    Ok(())
}

/// Refuse to leave `code` without a current version while nodes still hang below it
fn ensure_no_dependents<P: Payload>(
    scope: &Scope<'_>,
    code: &BusinessCode,
    timeline: &Timeline<P>,
) -> Result<()> {
    if timeline.current().is_some() {
        return Ok(());
    }
    for child_family in P::FAMILY.child_families() {
        if let Some(child) = store::child_nodes(scope.conn, child_family, scope.tenant, code)?
            .into_iter()
            .next()
        {
            return Err(TemporalError::validation(format!(
                "{} {} has children ({} {} and possibly more); remove or re-parent them first",
                P::FAMILY,
                code,
                child_family,
                child.code
            )));
        }
    }
    Ok(())
}

/// Insert a new dated version of `code`
pub fn insert<P: Payload>(
    scope: &Scope<'_>,
    code: &BusinessCode,
    payload: P,
    effective_date: NaiveDate,
    reason: Option<&str>,
) -> Result<Version<P>> {
    validate_payload(&payload)?;
    ensure_references(scope, &payload)?;
    let placement = scope.resolver.resolve(
        scope.conn,
        P::FAMILY,
        scope.tenant,
        code,
        payload.parent_code(),
        payload.name(),
    )?;
    ensure_point_free(scope.conn, P::FAMILY, scope.tenant, code, effective_date, None)?;

    let before = scope.current_hierarchy::<P>(code)?;
    let record_id = scope.write_version(
        code,
        payload,
        P::initial_status(),
        effective_date,
        placement,
        reason,
    )?;
    let timeline = scope.settle::<P>(code, before)?;

    info!(
        family = %P::FAMILY, tenant = %scope.tenant, %code, %record_id, %effective_date,
        "inserted version"
    );
    timeline
        .into_versions()
        .into_iter()
        .find(|v| v.record_id == record_id)
        .ok_or_else(|| {
            TemporalError::RecordNotFound(format!("inserted version {} vanished", record_id))
        })
}

/// Soft-delete one version and close the gap it leaves
pub fn delete<P: Payload>(scope: &Scope<'_>, record_id: RecordId) -> Result<Timeline<P>> {
    let target = scope.live_version::<P>(record_id)?;
    let before = scope.current_hierarchy::<P>(&target.code)?;

    store::soft_delete(scope.conn, P::FAMILY, record_id, scope.now)?;
    let timeline = scope.settle::<P>(&target.code, before)?;
    ensure_no_dependents(scope, &target.code, &timeline)?;

    info!(
        family = %P::FAMILY, tenant = %scope.tenant, code = %target.code, %record_id,
        remaining = timeline.len(),
        "deleted version"
    );
    Ok(timeline)
}

/// Re-date a version: tombstone the original, insert a copy at `new_date`
pub fn move_effective_date<P: Payload>(
    scope: &Scope<'_>,
    record_id: RecordId,
    new_date: NaiveDate,
    reason: &str,
) -> Result<Timeline<P>> {
    let target = scope.live_version::<P>(record_id)?;
    ensure_point_free(
        scope.conn,
        P::FAMILY,
        scope.tenant,
        &target.code,
        new_date,
        Some(record_id),
    )?;
    let before = scope.current_hierarchy::<P>(&target.code)?;

    store::soft_delete(scope.conn, P::FAMILY, record_id, scope.now)?;
    let placement = Placement {
        parent: scope.resolver.parent_code(target.payload.parent_code())?,
        hierarchy: target.hierarchy,
    };
    let moved = scope.write_version(
        &target.code,
        target.payload,
        target.status,
        new_date,
        placement,
        Some(reason),
    )?;
    let timeline = scope.settle::<P>(&target.code, before)?;
    ensure_no_dependents(scope, &target.code, &timeline)?;

    info!(
        family = %P::FAMILY, tenant = %scope.tenant, code = %target.code,
        from = %target.effective_date, to = %new_date, %record_id, new_record_id = %moved,
        "moved version"
    );
    Ok(timeline)
}

/// Replace a version's payload without changing where it sits in time
///
/// Placement is re-resolved only when the parent reference or the name
/// changed; a current version then pushes its new paths down to descendants.
pub fn update_fields<P: Payload>(
    scope: &Scope<'_>,
    record_id: RecordId,
    payload: P,
    reason: Option<&str>,
) -> Result<Version<P>> {
    let target = scope.live_version::<P>(record_id)?;
    validate_payload(&payload)?;
    if payload.references() != target.payload.references() {
        ensure_references(scope, &payload)?;
    }

    let old_parent = scope.resolver.parent_code(target.payload.parent_code())?;
    let new_parent = scope.resolver.parent_code(payload.parent_code())?;
    let moved = old_parent != new_parent || target.payload.name().trim() != payload.name().trim();

    let placement = if moved {
        scope.resolver.resolve(
            scope.conn,
            P::FAMILY,
            scope.tenant,
            &target.code,
            payload.parent_code(),
            payload.name(),
        )?
    } else {
        Placement {
            parent: new_parent,
            hierarchy: target.hierarchy.clone(),
        }
    };

    store::update_payload(
        scope.conn,
        record_id,
        &payload,
        placement.parent.as_ref(),
        &placement.hierarchy,
        reason,
        scope.now,
    )?;
    if moved && target.is_current {
        scope
            .resolver
            .refresh_descendants(scope.conn, P::FAMILY, scope.tenant, &target.code, scope.now)?;
    }

    info!(
        family = %P::FAMILY, tenant = %scope.tenant, code = %target.code, %record_id,
        restructured = moved,
        "updated version fields"
    );
    scope.live_version::<P>(record_id)
}
