//! Timeline behaviour through the service: insert, delete, move, status changes

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{add_unit, assert_invariants, code, ctx, date, service, service_on, TODAY};
use epochal::core::{
    Cancellation, Config, ErrorCode, FixedClock, ReferenceZone, Status, TemporalService,
};
use epochal::entities::{OrgUnit, Position};

fn hq() -> OrgUnit {
    OrgUnit::new("Headquarters")
}

// ============================================================================
// Recalculation scenarios
// ============================================================================

#[test]
fn test_three_versions_are_contiguous() {
    let mut svc = service();
    let ctx = ctx();

    // Insertion order does not matter
    add_unit(&mut svc, &ctx, "HQ", "2024-12-01", hq());
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    add_unit(&mut svc, &ctx, "HQ", "2024-06-01", hq());

    let timeline = svc.timeline::<OrgUnit>(&ctx, &code("HQ")).unwrap();
    let ends: Vec<_> = timeline.iter().map(|v| v.end_date).collect();
    assert_eq!(
        ends,
        vec![Some(date("2024-05-31")), Some(date("2024-11-30")), None]
    );
    assert_eq!(
        timeline.current().unwrap().effective_date,
        date("2024-12-01")
    );
    assert_invariants(&timeline, date(TODAY));
}

#[test]
fn test_delete_middle_closes_gap() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    let middle = add_unit(&mut svc, &ctx, "HQ", "2024-06-01", hq());
    add_unit(&mut svc, &ctx, "HQ", "2024-12-01", hq());

    let timeline = svc.delete_version::<OrgUnit>(&ctx, middle).unwrap();

    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline.versions()[0].end_date, Some(date("2024-11-30")));
    assert_invariants(&timeline, date(TODAY));

    let history = svc.history::<OrgUnit>(&ctx, &code("HQ")).unwrap();
    assert_eq!(history.len(), 3);
    let tombstone = history.iter().find(|v| v.record_id == middle).unwrap();
    assert_eq!(tombstone.status, Status::Deleted);
    assert!(!tombstone.is_current);
    assert!(tombstone.deleted_at.is_some());
}

#[test]
fn test_delete_only_version_leaves_empty_timeline() {
    let mut svc = service();
    let ctx = ctx();
    let only = add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());

    let timeline = svc.delete_version::<OrgUnit>(&ctx, only).unwrap();

    assert!(timeline.is_empty());
    assert!(svc.current::<OrgUnit>(&ctx, &code("HQ")).unwrap().is_none());
}

#[test]
fn test_recalculate_is_idempotent() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    add_unit(&mut svc, &ctx, "HQ", "2999-01-01", hq());

    let first = svc.recalculate::<OrgUnit>(&ctx, &code("HQ")).unwrap();
    let second = svc.recalculate::<OrgUnit>(&ctx, &code("HQ")).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        svc.timeline::<OrgUnit>(&ctx, &code("HQ")).unwrap(),
        second
    );
}

#[test]
fn test_recalculate_unknown_code_is_empty() {
    let mut svc = service();
    let timeline = svc.recalculate::<OrgUnit>(&ctx(), &code("NOPE")).unwrap();
    assert!(timeline.is_empty());
}

#[test]
fn test_all_future_timeline_has_no_current() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "LAB", "2999-01-01", OrgUnit::new("Lab"));

    let timeline = svc.timeline::<OrgUnit>(&ctx, &code("LAB")).unwrap();
    assert!(timeline.current().is_none());
    assert_invariants(&timeline, date(TODAY));

    add_unit(&mut svc, &ctx, "LAB", "2024-01-01", OrgUnit::new("Lab"));
    let timeline = svc.timeline::<OrgUnit>(&ctx, &code("LAB")).unwrap();
    assert_eq!(
        timeline.current().unwrap().effective_date,
        date("2024-01-01")
    );
    assert_eq!(timeline.versions()[0].end_date, Some(date("2998-12-31")));
}

#[test]
fn test_version_effective_today_is_current() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    add_unit(&mut svc, &ctx, "HQ", TODAY, hq());

    let current = svc.current::<OrgUnit>(&ctx, &code("HQ")).unwrap().unwrap();
    assert_eq!(current.effective_date, date(TODAY));
}

#[test]
fn test_as_of_picks_covering_version() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", OrgUnit::new("Old"));
    add_unit(&mut svc, &ctx, "HQ", "2024-06-01", OrgUnit::new("New"));

    let hq = code("HQ");
    let before = svc.as_of::<OrgUnit>(&ctx, &hq, date("2024-05-31")).unwrap().unwrap();
    let after = svc.as_of::<OrgUnit>(&ctx, &hq, date("2024-06-01")).unwrap().unwrap();
    assert_eq!(before.payload.name, "Old");
    assert_eq!(after.payload.name, "New");
    assert!(svc.as_of::<OrgUnit>(&ctx, &hq, date("2023-12-31")).unwrap().is_none());
}

// ============================================================================
// Conflicts
// ============================================================================

#[test]
fn test_insert_same_date_conflicts() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());

    let err = svc
        .insert_version(&ctx, &code("HQ"), hq(), date("2024-01-01"), None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TemporalPointConflict);
    assert_eq!(svc.timeline::<OrgUnit>(&ctx, &code("HQ")).unwrap().len(), 1);
}

#[test]
fn test_tombstone_does_not_block_its_date() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    let second = add_unit(&mut svc, &ctx, "HQ", "2024-06-01", hq());
    svc.delete_version::<OrgUnit>(&ctx, second).unwrap();

    let again = svc
        .insert_version(&ctx, &code("HQ"), hq(), date("2024-06-01"), None)
        .unwrap();
    assert!(again.is_current);
    assert_ne!(again.record_id, second);
}

#[test]
fn test_same_code_in_other_tenant_is_independent() {
    let mut svc = service();
    let acme = ctx();
    let globex = epochal::core::RequestContext::new("globex".parse().unwrap());
    add_unit(&mut svc, &acme, "HQ", "2024-01-01", hq());
    add_unit(&mut svc, &globex, "HQ", "2024-01-01", hq());

    assert_eq!(svc.timeline::<OrgUnit>(&acme, &code("HQ")).unwrap().len(), 1);
    assert_eq!(svc.timeline::<OrgUnit>(&globex, &code("HQ")).unwrap().len(), 1);
}

// ============================================================================
// Move effective date
// ============================================================================

#[test]
fn test_move_onto_existing_date_conflicts() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    add_unit(&mut svc, &ctx, "HQ", "2024-06-01", hq());
    let current = add_unit(&mut svc, &ctx, "HQ", "2024-12-01", hq());
    let before = svc.timeline::<OrgUnit>(&ctx, &code("HQ")).unwrap();

    let err = svc
        .move_effective_date::<OrgUnit>(&ctx, current, date("2024-06-01"), "realign")
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::TemporalPointConflict);
    assert_eq!(svc.timeline::<OrgUnit>(&ctx, &code("HQ")).unwrap(), before);
    assert_eq!(svc.history::<OrgUnit>(&ctx, &code("HQ")).unwrap().len(), 3);
}

#[test]
fn test_move_to_own_date_is_allowed() {
    let mut svc = service();
    let ctx = ctx();
    let only = add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());

    let timeline = svc
        .move_effective_date::<OrgUnit>(&ctx, only, date("2024-01-01"), "re-stamp")
        .unwrap();

    assert_eq!(timeline.len(), 1);
    assert_ne!(timeline.versions()[0].record_id, only);
}

#[test]
fn test_move_replaces_version_and_rederives_neighbours() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    let middle = add_unit(&mut svc, &ctx, "HQ", "2024-06-01", OrgUnit::new("Renamed"));
    add_unit(&mut svc, &ctx, "HQ", "2024-12-01", hq());

    let timeline = svc
        .move_effective_date::<OrgUnit>(&ctx, middle, date("2024-08-15"), "board approval slipped")
        .unwrap();

    let dates: Vec<_> = timeline.iter().map(|v| v.effective_date).collect();
    assert_eq!(
        dates,
        vec![date("2024-01-01"), date("2024-08-15"), date("2024-12-01")]
    );
    assert_eq!(timeline.versions()[0].end_date, Some(date("2024-08-14")));

    let moved = &timeline.versions()[1];
    assert_eq!(moved.payload.name, "Renamed");
    assert_eq!(moved.change_reason.as_deref(), Some("board approval slipped"));

    let original = svc.version::<OrgUnit>(&ctx, middle).unwrap();
    assert_eq!(original.status, Status::Deleted);
    assert_invariants(&timeline, date(TODAY));
}

#[test]
fn test_tombstones_cannot_be_mutated() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    let gone = add_unit(&mut svc, &ctx, "HQ", "2024-06-01", hq());
    svc.delete_version::<OrgUnit>(&ctx, gone).unwrap();
    let tombstone = svc.version::<OrgUnit>(&ctx, gone).unwrap();

    let err = svc.delete_version::<OrgUnit>(&ctx, gone).unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordNotFound);
    let err = svc
        .move_effective_date::<OrgUnit>(&ctx, gone, date("2024-09-01"), "x")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordNotFound);
    let err = svc
        .update_fields(&ctx, gone, OrgUnit::new("Zombie"), None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordNotFound);

    // Later recalculations leave the tombstone alone
    add_unit(&mut svc, &ctx, "HQ", "2024-03-01", hq());
    assert_eq!(svc.version::<OrgUnit>(&ctx, gone).unwrap(), tombstone);
}

// ============================================================================
// Status transitions
// ============================================================================

#[test]
fn test_status_already_at_target_is_noop() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    let before = svc.timeline::<OrgUnit>(&ctx, &code("HQ")).unwrap();

    let after = svc
        .change_status::<OrgUnit>(&ctx, &code("HQ"), Status::Active, date(TODAY), "noop")
        .unwrap();

    assert_eq!(after, before);
    assert_eq!(svc.history::<OrgUnit>(&ctx, &code("HQ")).unwrap().len(), 1);
}

#[test]
fn test_suspend_today_becomes_current() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq().with_type(epochal::entities::UnitType::Company));

    let timeline = svc
        .suspend::<OrgUnit>(&ctx, &code("HQ"), date(TODAY), "restructuring")
        .unwrap();

    assert_eq!(timeline.len(), 2);
    let current = timeline.current().unwrap();
    assert_eq!(current.status, Status::Inactive);
    assert_eq!(current.effective_date, date(TODAY));
    assert_eq!(current.payload.unit_type, epochal::entities::UnitType::Company);
    assert_eq!(current.change_reason.as_deref(), Some("restructuring"));
    assert_invariants(&timeline, date(TODAY));
}

#[test]
fn test_scheduled_suspend_stays_future() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());

    let timeline = svc
        .suspend::<OrgUnit>(&ctx, &code("HQ"), date("2999-06-01"), "planned closure")
        .unwrap();

    let current = timeline.current().unwrap();
    assert_eq!(current.status, Status::Active);
    assert_eq!(current.end_date, Some(date("2999-05-31")));
    let scheduled = timeline.last().unwrap();
    assert_eq!(scheduled.status, Status::Inactive);
    assert!(!scheduled.is_current);

    // Activating again is a no-op: the current version is still active
    let same = svc
        .activate::<OrgUnit>(&ctx, &code("HQ"), date(TODAY), "already active")
        .unwrap();
    assert_eq!(same, timeline);
}

#[test]
fn test_status_change_on_occupied_date_conflicts() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());

    let err = svc
        .suspend::<OrgUnit>(&ctx, &code("HQ"), date("2024-01-01"), "x")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TemporalPointConflict);
}

#[test]
fn test_status_change_without_current_version() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "LAB", "2999-01-01", OrgUnit::new("Lab"));

    let err = svc
        .suspend::<OrgUnit>(&ctx, &code("LAB"), date("2999-02-01"), "x")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordNotFound);
}

#[test]
fn test_status_must_fit_family() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());

    let err = svc
        .change_status::<OrgUnit>(&ctx, &code("HQ"), Status::Vacant, date(TODAY), "x")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    let err = svc
        .change_status::<OrgUnit>(&ctx, &code("HQ"), Status::Deleted, date(TODAY), "x")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}

#[test]
fn test_position_status_lifecycle() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "FIN", "2024-01-01", OrgUnit::new("Finance"));
    let position = Position::new("Analyst", "FIN");
    let planned = svc
        .insert_version(&ctx, &code("P-001"), position, date("2024-02-01"), None)
        .unwrap();
    assert_eq!(planned.status, Status::Planned);

    svc.change_status::<Position>(&ctx, &code("P-001"), Status::Vacant, date("2024-03-01"), "opened")
        .unwrap();
    let timeline = svc
        .change_status::<Position>(&ctx, &code("P-001"), Status::Filled, date("2024-04-01"), "hired")
        .unwrap();

    let statuses: Vec<_> = timeline.iter().map(|v| v.status).collect();
    assert_eq!(statuses, vec![Status::Planned, Status::Vacant, Status::Filled]);
    assert_eq!(timeline.current().unwrap().status, Status::Filled);
}

// ============================================================================
// Field updates
// ============================================================================

#[test]
fn test_update_fields_keeps_dates() {
    let mut svc = service();
    let ctx = ctx();
    let first = add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    add_unit(&mut svc, &ctx, "HQ", "2024-06-01", hq());

    let mut payload = hq();
    payload.description = Some("Main office".to_string());
    let updated = svc
        .update_fields(&ctx, first, payload, Some("typo"))
        .unwrap();

    assert_eq!(updated.effective_date, date("2024-01-01"));
    assert_eq!(updated.end_date, Some(date("2024-05-31")));
    assert_eq!(updated.payload.description.as_deref(), Some("Main office"));
    assert_eq!(updated.change_reason.as_deref(), Some("typo"));
}

#[test]
fn test_dates_past_year_9999_rejected() {
    let mut svc = service();
    let ctx = ctx();
    let first = add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());
    let beyond = chrono::NaiveDate::from_ymd_opt(10000, 1, 1).unwrap();

    let err = svc
        .insert_version(&ctx, &code("HQ"), hq(), beyond, None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let err = svc
        .move_effective_date::<OrgUnit>(&ctx, first, beyond, "far future")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let err = svc
        .suspend::<OrgUnit>(&ctx, &code("HQ"), beyond, "far future")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    add_unit(&mut svc, &ctx, "HQ", "9999-12-31", hq());
    let timeline = svc.timeline::<OrgUnit>(&ctx, &code("HQ")).unwrap();
    assert_eq!(timeline.len(), 2);
    assert_invariants(&timeline, date(TODAY));
    assert_eq!(timeline.versions()[0].end_date, Some(date("9999-12-30")));
}

#[test]
fn test_invalid_payload_rejected() {
    let mut svc = service();
    let err = svc
        .insert_version(&ctx(), &code("HQ"), OrgUnit::new("   "), date("2024-01-01"), None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}

// ============================================================================
// Reference zone for "today"
// ============================================================================

fn service_in_zone(zone: ReferenceZone) -> TemporalService {
    let mut config = Config::default();
    config.timeline.reference_zone = zone;
    // 20:00 UTC on the 15th is already the 16th in +09:00
    let instant = Utc.with_ymd_and_hms(2025, 3, 15, 20, 0, 0).unwrap();
    TemporalService::in_memory(config)
        .unwrap()
        .with_clock(Arc::new(FixedClock::at(instant)))
}

#[test]
fn test_utc_zone_decides_current() {
    let mut svc = service_in_zone(ReferenceZone::Utc);
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2025-01-01", hq());
    add_unit(&mut svc, &ctx, "HQ", "2025-03-16", hq());

    assert_eq!(svc.today(), date("2025-03-15"));
    let current = svc.current::<OrgUnit>(&ctx, &code("HQ")).unwrap().unwrap();
    assert_eq!(current.effective_date, date("2025-01-01"));
}

#[test]
fn test_offset_zone_decides_current() {
    let mut svc = service_in_zone(ReferenceZone::Offset(9 * 3600));
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2025-01-01", hq());
    add_unit(&mut svc, &ctx, "HQ", "2025-03-16", hq());

    assert_eq!(svc.today(), date("2025-03-16"));
    let current = svc.current::<OrgUnit>(&ctx, &code("HQ")).unwrap().unwrap();
    assert_eq!(current.effective_date, date("2025-03-16"));
}

#[test]
fn test_clock_advance_is_picked_up_by_recalculate() {
    let mut early = service_on("2024-03-01");
    let ctx = ctx();
    add_unit(&mut early, &ctx, "HQ", "2024-01-01", hq());
    add_unit(&mut early, &ctx, "HQ", "2024-06-01", hq());
    assert_eq!(
        early.current::<OrgUnit>(&ctx, &code("HQ")).unwrap().unwrap().effective_date,
        date("2024-01-01")
    );

    let mut later = early.with_clock(Arc::new(FixedClock::on(date("2024-07-01"))));
    let timeline = later.recalculate::<OrgUnit>(&ctx, &code("HQ")).unwrap();
    assert_eq!(timeline.current().unwrap().effective_date, date("2024-06-01"));
    assert!(later.verify(&ctx, epochal::core::EntityFamily::OrgUnit, &code("HQ")).unwrap().is_empty());
}

#[test]
fn test_verify_reports_stale_current_flag() {
    let mut early = service_on("2024-03-01");
    let ctx = ctx();
    add_unit(&mut early, &ctx, "HQ", "2024-01-01", hq());
    add_unit(&mut early, &ctx, "HQ", "2024-06-01", hq());

    let later = early.with_clock(Arc::new(FixedClock::on(date("2024-07-01"))));
    let violations = later
        .verify(&ctx, epochal::core::EntityFamily::OrgUnit, &code("HQ"))
        .unwrap();
    assert!(!violations.is_empty());
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_cancelled_request_writes_nothing() {
    let mut svc = service();
    let ctx = ctx();
    add_unit(&mut svc, &ctx, "HQ", "2024-01-01", hq());

    let cancellation = Cancellation::none();
    cancellation.cancel();
    let cancelled = ctx.clone().with_cancellation(cancellation);
    let err = svc
        .insert_version(&cancelled, &code("HQ"), hq(), date("2024-06-01"), None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TransactionCancelled);

    let expired = ctx.clone().with_cancellation(Cancellation::with_timeout(Duration::ZERO));
    let err = svc
        .suspend::<OrgUnit>(&expired, &code("HQ"), date(TODAY), "x")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TransactionCancelled);

    assert_eq!(svc.history::<OrgUnit>(&ctx, &code("HQ")).unwrap().len(), 1);
}
