//! Core module - temporal engine, storage and shared types

pub mod clock;
pub mod config;
pub mod conflict;
pub mod entity;
pub mod error;
pub mod hierarchy;
pub mod identity;
pub mod mutator;
pub mod service;
pub mod status;
pub mod store;
pub mod telemetry;
pub mod timeline;
pub mod version;

pub use clock::{Clock, FixedClock, ReferenceZone, SystemClock};
pub use config::Config;
pub use entity::{EntityFamily, Payload, Status};
pub use error::{ErrorCode, Result, TemporalError};
pub use hierarchy::{HierarchyResolver, Placement};
pub use identity::{BusinessCode, IdParseError, RecordId, TenantId};
pub use service::{RequestContext, TemporalService};
pub use store::{Cancellation, HierarchyNode, Store};
pub use timeline::Violation;
pub use version::{Hierarchy, Timeline, Version, VersionedRecord};
