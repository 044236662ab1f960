//! Entity families, lifecycle status and the payload capability trait

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Longest accepted display name
pub const MAX_NAME_LEN: usize = 255;

/// Common interface for the business payload carried by a version
///
/// The timeline machinery is generic over this trait: it never looks inside a
/// payload beyond what these methods expose.
pub trait Payload: Serialize + DeserializeOwned + Clone + std::fmt::Debug {
    /// Family (and therefore table) this payload belongs to
    const FAMILY: EntityFamily;

    /// Display name used for the hierarchy name path
    fn name(&self) -> &str;

    /// Raw parent reference, resolved against `FAMILY.parent_family()`
    fn parent_code(&self) -> Option<&str>;

    /// Entity-specific payload rules
    fn validate(&self) -> Result<(), String>;

    /// Codes in other families this payload points at, besides its parent
    ///
    /// Each must have a current version when the payload is written.
    fn references(&self) -> Vec<(EntityFamily, &str)> {
        Vec::new()
    }

    /// Copy of the fields a status transition carries into its new version
    ///
    /// Payloads holding per-version annotations override this to drop them.
    fn structural_clone(&self) -> Self {
        self.clone()
    }

    /// Status given to a freshly inserted version
    fn initial_status() -> Status {
        Status::Active
    }
}

/// Shared name rule: non-blank, bounded, no path separator
pub fn validate_name(field: &str, name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(format!("{} exceeds {} characters", field, MAX_NAME_LEN));
    }
    if trimmed.contains('/') {
        return Err(format!("{} must not contain '/'", field));
    }
    Ok(())
}

/// Lifecycle marker of a single version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum Status {
    #[default]
    Active,
    Inactive,
    /// Position declared but not yet open for staffing
    Planned,
    /// Position open and unfilled
    Vacant,
    /// Position staffed
    Filled,
    /// Position temporarily closed
    Frozen,
    /// Soft-deleted tombstone; never part of a timeline
    Deleted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Inactive => "INACTIVE",
            Status::Planned => "PLANNED",
            Status::Vacant => "VACANT",
            Status::Filled => "FILLED",
            Status::Frozen => "FROZEN",
            Status::Deleted => "DELETED",
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Status::Deleted)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(Status::Active),
            "INACTIVE" => Ok(Status::Inactive),
            "PLANNED" => Ok(Status::Planned),
            "VACANT" => Ok(Status::Vacant),
            "FILLED" => Ok(Status::Filled),
            "FROZEN" => Ok(Status::Frozen),
            "DELETED" => Ok(Status::Deleted),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// The kinds of versioned entity the store manages
///
/// Each family lives in its own table and may reference a parent family for
/// hierarchy resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityFamily {
    OrgUnit,
    JobFamilyGroup,
    JobFamily,
    JobRole,
    JobLevel,
    Position,
}

impl EntityFamily {
    pub const ALL: [EntityFamily; 6] = [
        EntityFamily::OrgUnit,
        EntityFamily::JobFamilyGroup,
        EntityFamily::JobFamily,
        EntityFamily::JobRole,
        EntityFamily::JobLevel,
        EntityFamily::Position,
    ];

    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            EntityFamily::OrgUnit => "organization_units",
            EntityFamily::JobFamilyGroup => "job_family_groups",
            EntityFamily::JobFamily => "job_families",
            EntityFamily::JobRole => "job_roles",
            EntityFamily::JobLevel => "job_levels",
            EntityFamily::Position => "positions",
        }
    }

    /// Family that parent references resolve against
    pub fn parent_family(&self) -> Option<EntityFamily> {
        match self {
            EntityFamily::OrgUnit => Some(EntityFamily::OrgUnit),
            EntityFamily::JobFamilyGroup => None,
            EntityFamily::JobFamily => Some(EntityFamily::JobFamilyGroup),
            EntityFamily::JobRole => Some(EntityFamily::JobFamily),
            EntityFamily::JobLevel => Some(EntityFamily::JobRole),
            EntityFamily::Position => Some(EntityFamily::OrgUnit),
        }
    }

    /// Whether a version of this family must name a parent
    pub fn requires_parent(&self) -> bool {
        matches!(
            self,
            EntityFamily::JobFamily
                | EntityFamily::JobRole
                | EntityFamily::JobLevel
                | EntityFamily::Position
        )
    }

    /// Families whose parent references point at this family
    pub fn child_families(&self) -> Vec<EntityFamily> {
        Self::ALL
            .into_iter()
            .filter(|f| f.parent_family() == Some(*self))
            .collect()
    }

    /// Whether `status` is a legal lifecycle state for this family
    pub fn allows_status(&self, status: Status) -> bool {
        match status {
            Status::Active | Status::Inactive | Status::Deleted => true,
            Status::Planned | Status::Vacant | Status::Filled | Status::Frozen => {
                matches!(self, EntityFamily::Position)
            }
        }
    }
}

impl std::fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityFamily::OrgUnit => write!(f, "organization unit"),
            EntityFamily::JobFamilyGroup => write!(f, "job family group"),
            EntityFamily::JobFamily => write!(f, "job family"),
            EntityFamily::JobRole => write!(f, "job role"),
            EntityFamily::JobLevel => write!(f, "job level"),
            EntityFamily::Position => write!(f, "position"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Finance").is_ok());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", "R&D/Labs").is_err());
        assert!(validate_name("name", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("inactive".parse::<Status>().unwrap(), Status::Inactive);
        assert_eq!(" Active ".parse::<Status>().unwrap(), Status::Active);
        assert!("archived".parse::<Status>().is_err());
    }

    #[test]
    fn test_job_catalog_chain() {
        assert_eq!(EntityFamily::JobFamilyGroup.parent_family(), None);
        assert_eq!(
            EntityFamily::JobLevel.parent_family(),
            Some(EntityFamily::JobRole)
        );
        assert_eq!(
            EntityFamily::JobRole.child_families(),
            vec![EntityFamily::JobLevel]
        );
    }

    #[test]
    fn test_org_unit_children() {
        let children = EntityFamily::OrgUnit.child_families();
        assert!(children.contains(&EntityFamily::OrgUnit));
        assert!(children.contains(&EntityFamily::Position));
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_position_only_statuses() {
        assert!(EntityFamily::Position.allows_status(Status::Vacant));
        assert!(!EntityFamily::OrgUnit.allows_status(Status::Vacant));
        assert!(EntityFamily::JobRole.allows_status(Status::Inactive));
    }
}
