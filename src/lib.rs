//! Epochal: temporally versioned business entities
//!
//! Keeps every timeline of dated versions gapless, non-overlapping, with a
//! single current version and an open-ended tail, in a transactional SQLite
//! store keyed by tenant and business code.

pub mod cli;
pub mod core;
pub mod entities;
