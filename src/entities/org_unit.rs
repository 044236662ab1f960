//! Organization unit entity type

use serde::{Deserialize, Serialize};

use crate::core::entity::{validate_name, EntityFamily, Payload};

/// Kind of organizational unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum UnitType {
    Company,
    #[default]
    Department,
    OrganizationUnit,
    ProjectTeam,
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitType::Company => write!(f, "COMPANY"),
            UnitType::Department => write!(f, "DEPARTMENT"),
            UnitType::OrganizationUnit => write!(f, "ORGANIZATION_UNIT"),
            UnitType::ProjectTeam => write!(f, "PROJECT_TEAM"),
        }
    }
}

impl std::str::FromStr for UnitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "COMPANY" => Ok(UnitType::Company),
            "DEPARTMENT" => Ok(UnitType::Department),
            "ORGANIZATION_UNIT" => Ok(UnitType::OrganizationUnit),
            "PROJECT_TEAM" => Ok(UnitType::ProjectTeam),
            _ => Err(format!("Unknown unit type: {}", s)),
        }
    }
}

/// An organization unit (company, department, team)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgUnit {
    pub name: String,

    #[serde(default)]
    pub unit_type: UnitType,

    /// Parent unit code; absent or a root sentinel for top-level units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordering among siblings
    #[serde(default)]
    pub sort_order: i32,
}

impl OrgUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit_type: UnitType::default(),
            parent_code: None,
            description: None,
            sort_order: 0,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_code = Some(parent.into());
        self
    }

    pub fn with_type(mut self, unit_type: UnitType) -> Self {
        self.unit_type = unit_type;
        self
    }
}

impl Payload for OrgUnit {
    const FAMILY: EntityFamily = EntityFamily::OrgUnit;

    fn name(&self) -> &str {
        &self.name
    }

    fn parent_code(&self) -> Option<&str> {
        self.parent_code.as_deref()
    }

    fn validate(&self) -> Result<(), String> {
        validate_name("name", &self.name)
    }
}
