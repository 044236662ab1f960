//! Position entity type

use serde::{Deserialize, Serialize};

use crate::core::entity::{validate_name, EntityFamily, Payload, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum PositionType {
    #[default]
    Regular,
    Temporary,
    Contractor,
}

impl std::fmt::Display for PositionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionType::Regular => write!(f, "REGULAR"),
            PositionType::Temporary => write!(f, "TEMPORARY"),
            PositionType::Contractor => write!(f, "CONTRACTOR"),
        }
    }
}

impl std::str::FromStr for PositionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REGULAR" => Ok(PositionType::Regular),
            "TEMPORARY" => Ok(PositionType::Temporary),
            "CONTRACTOR" => Ok(PositionType::Contractor),
            _ => Err(format!("Unknown position type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum EmploymentType {
    #[default]
    FullTime,
    PartTime,
    Intern,
}

impl std::fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmploymentType::FullTime => write!(f, "FULL_TIME"),
            EmploymentType::PartTime => write!(f, "PART_TIME"),
            EmploymentType::Intern => write!(f, "INTERN"),
        }
    }
}

impl std::str::FromStr for EmploymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "FULL_TIME" => Ok(EmploymentType::FullTime),
            "PART_TIME" => Ok(EmploymentType::PartTime),
            "INTERN" => Ok(EmploymentType::Intern),
            _ => Err(format!("Unknown employment type: {}", s)),
        }
    }
}

/// A staffed (or staffable) position inside an organization unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub title: String,

    /// Organization unit the position belongs to
    pub organization_code: String,

    /// Job level this position is graded at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_level_code: Option<String>,

    #[serde(default)]
    pub position_type: PositionType,

    #[serde(default)]
    pub employment_type: EmploymentType,

    /// Full-time equivalents the position can hold
    #[serde(default = "default_headcount")]
    pub headcount_capacity: f64,

    /// Note attached to this version only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

fn default_headcount() -> f64 {
    1.0
}

impl Position {
    pub fn new(title: impl Into<String>, organization_code: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            organization_code: organization_code.into(),
            job_level_code: None,
            position_type: PositionType::default(),
            employment_type: EmploymentType::default(),
            headcount_capacity: default_headcount(),
            remarks: None,
        }
    }
}

impl Payload for Position {
    const FAMILY: EntityFamily = EntityFamily::Position;

    fn name(&self) -> &str {
        &self.title
    }

    fn parent_code(&self) -> Option<&str> {
        Some(&self.organization_code)
    }

    fn validate(&self) -> Result<(), String> {
        validate_name("title", &self.title)?;
        if !self.headcount_capacity.is_finite() || self.headcount_capacity < 0.0 {
            return Err(format!(
                "headcount_capacity must be a non-negative number (got {})",
                self.headcount_capacity
            ));
        }
        Ok(())
    }

    fn references(&self) -> Vec<(EntityFamily, &str)> {
        self.job_level_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| vec![(EntityFamily::JobLevel, c)])
            .unwrap_or_default()
    }

    fn structural_clone(&self) -> Self {
        Self {
            remarks: None,
            ..self.clone()
        }
    }

    fn initial_status() -> Status {
        Status::Planned
    }
}
