//! Entity payload definitions

pub mod job_catalog;
pub mod org_unit;
pub mod position;

pub use job_catalog::{JobFamily, JobFamilyGroup, JobLevel, JobRole, SalaryBand};
pub use org_unit::{OrgUnit, UnitType};
pub use position::{EmploymentType, Position, PositionType};
