//! Transaction-scoped facade over the temporal engine
//!
//! [`TemporalService`] is what calling layers use. Every mutating method runs
//! one exclusive section: it resolves, checks, writes and recalculates, then
//! commits, or rolls everything back on the first error. Read methods return
//! the last committed state.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::instrument;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::Config;
use crate::core::entity::{EntityFamily, Payload, Status};
use crate::core::error::{Result, TemporalError};
use crate::core::hierarchy::HierarchyResolver;
use crate::core::identity::{BusinessCode, RecordId, TenantId};
use crate::core::mutator::{self, Scope};
use crate::core::status;
use crate::core::store::{self, Cancellation, HierarchyNode, Store};
use crate::core::timeline::{self, Violation};
use crate::core::version::{Hierarchy, Timeline, Version};

/// Per-request inputs: whose data, and until when to keep trying
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant: TenantId,
    pub cancellation: Cancellation,
}

impl RequestContext {
    pub fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            cancellation: Cancellation::none(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }
}

pub struct TemporalService {
    store: Store,
    config: Config,
    clock: Arc<dyn Clock>,
}

impl TemporalService {
    pub fn new(store: Store, config: Config) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Open the database named by `config` under `workspace`
    pub fn open(workspace: &Path, config: Config) -> Result<Self> {
        let path = config.database_path(workspace);
        let store = Store::open(&path, config.lock_timeout())?;
        Ok(Self::new(store, config))
    }

    /// Open a database at an explicit path
    pub fn open_path(path: &Path, config: Config) -> Result<Self> {
        let store = Store::open(path, config.lock_timeout())?;
        Ok(Self::new(store, config))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        Ok(Self::new(Store::open_in_memory()?, config))
    }

    /// Replace the clock used for "today" and row timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Calendar day, in the configured reference zone, that decides currency
    pub fn today(&self) -> NaiveDate {
        self.clock.today(self.config.timeline.reference_zone)
    }

    fn mutate<T>(
        &mut self,
        ctx: &RequestContext,
        f: impl FnOnce(&Scope<'_>) -> Result<T>,
    ) -> Result<T> {
        let today = self.clock.today(self.config.timeline.reference_zone);
        let now = self.clock.now();
        let hierarchy = &self.config.hierarchy;
        self.store.exclusive(&ctx.cancellation, |tx| {
            let conn: &Connection = tx;
            let scope = Scope {
                conn,
                tenant: &ctx.tenant,
                today,
                now,
                resolver: HierarchyResolver::new(hierarchy),
            };
            f(&scope)
        })
    }

    fn resolver(&self) -> HierarchyResolver<'_> {
        HierarchyResolver::new(&self.config.hierarchy)
    }

    // =====================================================================
    // Mutations
    // =====================================================================

    /// Re-derive and persist the timeline of `code`
    #[instrument(skip_all, fields(tenant = %ctx.tenant, family = %P::FAMILY, code = %code))]
    pub fn recalculate<P: Payload>(
        &mut self,
        ctx: &RequestContext,
        code: &BusinessCode,
    ) -> Result<Timeline<P>> {
        self.mutate(ctx, |scope| {
            let before = scope.current_hierarchy::<P>(code)?;
            scope.settle::<P>(code, before)
        })
    }

    #[instrument(
        skip_all,
        fields(tenant = %ctx.tenant, family = %P::FAMILY, code = %code, effective_date = %effective_date)
    )]
    pub fn insert_version<P: Payload>(
        &mut self,
        ctx: &RequestContext,
        code: &BusinessCode,
        payload: P,
        effective_date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<Version<P>> {
        self.mutate(ctx, |scope| {
            mutator::insert(scope, code, payload, effective_date, reason)
        })
    }

    #[instrument(
        skip_all,
        fields(tenant = %ctx.tenant, family = %P::FAMILY, record_id = %record_id)
    )]
    pub fn delete_version<P: Payload>(
        &mut self,
        ctx: &RequestContext,
        record_id: RecordId,
    ) -> Result<Timeline<P>> {
        self.mutate(ctx, |scope| mutator::delete::<P>(scope, record_id))
    }

    #[instrument(
        skip_all,
        fields(tenant = %ctx.tenant, family = %P::FAMILY, record_id = %record_id, new_date = %new_date)
    )]
    pub fn move_effective_date<P: Payload>(
        &mut self,
        ctx: &RequestContext,
        record_id: RecordId,
        new_date: NaiveDate,
        reason: &str,
    ) -> Result<Timeline<P>> {
        self.mutate(ctx, |scope| {
            mutator::move_effective_date::<P>(scope, record_id, new_date, reason)
        })
    }

    #[instrument(
        skip_all,
        fields(tenant = %ctx.tenant, family = %P::FAMILY, code = %code, target = %target)
    )]
    pub fn change_status<P: Payload>(
        &mut self,
        ctx: &RequestContext,
        code: &BusinessCode,
        target: Status,
        effective_date: NaiveDate,
        reason: &str,
    ) -> Result<Timeline<P>> {
        self.mutate(ctx, |scope| {
            status::change_status::<P>(scope, code, target, effective_date, reason)
        })
    }

    pub fn suspend<P: Payload>(
        &mut self,
        ctx: &RequestContext,
        code: &BusinessCode,
        effective_date: NaiveDate,
        reason: &str,
    ) -> Result<Timeline<P>> {
        self.mutate(ctx, |scope| {
            status::suspend::<P>(scope, code, effective_date, reason)
        })
    }

    pub fn activate<P: Payload>(
        &mut self,
        ctx: &RequestContext,
        code: &BusinessCode,
        effective_date: NaiveDate,
        reason: &str,
    ) -> Result<Timeline<P>> {
        self.mutate(ctx, |scope| {
            status::activate::<P>(scope, code, effective_date, reason)
        })
    }

    #[instrument(
        skip_all,
        fields(tenant = %ctx.tenant, family = %P::FAMILY, record_id = %record_id)
    )]
    pub fn update_fields<P: Payload>(
        &mut self,
        ctx: &RequestContext,
        record_id: RecordId,
        payload: P,
        reason: Option<&str>,
    ) -> Result<Version<P>> {
        self.mutate(ctx, |scope| {
            mutator::update_fields(scope, record_id, payload, reason)
        })
    }

    /// Rewrite the paths of everything below `code` from its current snapshot
    #[instrument(skip_all, fields(tenant = %ctx.tenant, family = %family, code = %code))]
    pub fn refresh_descendants(
        &mut self,
        ctx: &RequestContext,
        family: EntityFamily,
        code: &BusinessCode,
    ) -> Result<usize> {
        self.mutate(ctx, |scope| {
            scope
                .resolver
                .refresh_descendants(scope.conn, family, scope.tenant, code, scope.now)
        })
    }

    // =====================================================================
    // Reads
    // =====================================================================

    /// Placement a node named `name` would get under `parent_ref` right now
    pub fn compute_hierarchy(
        &self,
        ctx: &RequestContext,
        family: EntityFamily,
        code: &BusinessCode,
        parent_ref: Option<&str>,
        name: &str,
    ) -> Result<Hierarchy> {
        self.resolver()
            .resolve(self.store.conn(), family, &ctx.tenant, code, parent_ref, name)
            .map(|placement| placement.hierarchy)
    }

    /// Non-deleted versions of `code`, ascending
    pub fn timeline<P: Payload>(
        &self,
        ctx: &RequestContext,
        code: &BusinessCode,
    ) -> Result<Timeline<P>> {
        let versions = store::load_timeline::<P>(self.store.conn(), P::FAMILY, &ctx.tenant, code)?;
        Ok(Timeline::new(versions))
    }

    /// Every version of `code`, tombstones included
    pub fn history<P: Payload>(
        &self,
        ctx: &RequestContext,
        code: &BusinessCode,
    ) -> Result<Vec<Version<P>>> {
        store::load_history::<P>(self.store.conn(), P::FAMILY, &ctx.tenant, code)
    }

    pub fn current<P: Payload>(
        &self,
        ctx: &RequestContext,
        code: &BusinessCode,
    ) -> Result<Option<Version<P>>> {
        Ok(self.timeline::<P>(ctx, code)?.into_versions().into_iter().find(|v| v.is_current))
    }

    /// The version in effect on `date`
    pub fn as_of<P: Payload>(
        &self,
        ctx: &RequestContext,
        code: &BusinessCode,
        date: NaiveDate,
    ) -> Result<Option<Version<P>>> {
        Ok(self
            .timeline::<P>(ctx, code)?
            .into_versions()
            .into_iter()
            .find(|v| v.covers(date)))
    }

    /// One version by id, tombstones included
    pub fn version<P: Payload>(
        &self,
        ctx: &RequestContext,
        record_id: RecordId,
    ) -> Result<Version<P>> {
        store::load_version::<P>(self.store.conn(), P::FAMILY, &ctx.tenant, record_id)?.ok_or_else(
            || TemporalError::RecordNotFound(format!("{} version {} not found", P::FAMILY, record_id)),
        )
    }

    /// Current version of every business key of the family
    pub fn list<P: Payload>(&self, ctx: &RequestContext) -> Result<Vec<Version<P>>> {
        store::load_current_versions::<P>(self.store.conn(), P::FAMILY, &ctx.tenant)
    }

    /// Business codes with at least one live version
    pub fn codes(&self, ctx: &RequestContext, family: EntityFamily) -> Result<Vec<BusinessCode>> {
        store::list_codes(self.store.conn(), family, &ctx.tenant)
    }

    pub fn subtree(
        &self,
        ctx: &RequestContext,
        family: EntityFamily,
        root: &BusinessCode,
        max_depth: Option<u32>,
    ) -> Result<Vec<HierarchyNode>> {
        self.resolver()
            .subtree(self.store.conn(), family, &ctx.tenant, root, max_depth)
    }

    /// Check the stored timeline of `code` without changing it
    pub fn verify(
        &self,
        ctx: &RequestContext,
        family: EntityFamily,
        code: &BusinessCode,
    ) -> Result<Vec<Violation>> {
        let rows = store::load_temporal_rows(self.store.conn(), family, &ctx.tenant, code)?;
        Ok(timeline::check(&rows, self.today()))
    }
}
