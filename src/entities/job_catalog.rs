//! Job catalog entity types
//!
//! The catalog is a fixed four-layer chain: family group → family → role →
//! level. Each layer is versioned independently and resolves its parent
//! against the current version of the layer above.

use serde::{Deserialize, Serialize};

use crate::core::entity::{validate_name, EntityFamily, Payload};

/// Top layer of the job catalog; never has a parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFamilyGroup {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl JobFamilyGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

impl Payload for JobFamilyGroup {
    const FAMILY: EntityFamily = EntityFamily::JobFamilyGroup;

    fn name(&self) -> &str {
        &self.name
    }

    fn parent_code(&self) -> Option<&str> {
        None
    }

    fn validate(&self) -> Result<(), String> {
        validate_name("name", &self.name)
    }
}

/// A job family within a family group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFamily {
    pub name: String,

    /// Owning family group code
    pub group_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl JobFamily {
    pub fn new(name: impl Into<String>, group_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_code: group_code.into(),
            description: None,
        }
    }
}

impl Payload for JobFamily {
    const FAMILY: EntityFamily = EntityFamily::JobFamily;

    fn name(&self) -> &str {
        &self.name
    }

    fn parent_code(&self) -> Option<&str> {
        Some(&self.group_code)
    }

    fn validate(&self) -> Result<(), String> {
        validate_name("name", &self.name)
    }
}

/// A job role within a family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRole {
    pub name: String,

    /// Owning job family code
    pub family_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Free-form competency model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competency_model: Option<serde_json::Value>,
}

impl JobRole {
    pub fn new(name: impl Into<String>, family_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family_code: family_code.into(),
            description: None,
            competency_model: None,
        }
    }
}

impl Payload for JobRole {
    const FAMILY: EntityFamily = EntityFamily::JobRole;

    fn name(&self) -> &str {
        &self.name
    }

    fn parent_code(&self) -> Option<&str> {
        Some(&self.family_code)
    }

    fn validate(&self) -> Result<(), String> {
        validate_name("name", &self.name)?;
        match &self.competency_model {
            None | Some(serde_json::Value::Object(_)) => Ok(()),
            Some(_) => Err("competency_model must be an object".to_string()),
        }
    }
}

/// Pay range attached to a job level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryBand {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

impl SalaryBand {
    fn validate(&self) -> Result<(), String> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err("salary band bounds must be finite".to_string());
        }
        if self.min < 0.0 {
            return Err("salary band minimum must not be negative".to_string());
        }
        if self.min > self.max {
            return Err(format!(
                "salary band minimum {} exceeds maximum {}",
                self.min, self.max
            ));
        }
        let currency = self.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("currency '{}' is not a 3-letter code", self.currency));
        }
        Ok(())
    }
}

/// A job level within a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLevel {
    pub name: String,

    /// Owning job role code
    pub role_code: String,

    /// Rank label such as "P3" or "M1"
    pub level_rank: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_band: Option<SalaryBand>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl JobLevel {
    pub fn new(
        name: impl Into<String>,
        role_code: impl Into<String>,
        level_rank: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role_code: role_code.into(),
            level_rank: level_rank.into(),
            salary_band: None,
            description: None,
        }
    }
}

impl Payload for JobLevel {
    const FAMILY: EntityFamily = EntityFamily::JobLevel;

    fn name(&self) -> &str {
        &self.name
    }

    fn parent_code(&self) -> Option<&str> {
        Some(&self.role_code)
    }

    fn validate(&self) -> Result<(), String> {
        validate_name("name", &self.name)?;
        if self.level_rank.trim().is_empty() {
            return Err("level_rank must not be empty".to_string());
        }
        if let Some(band) = &self.salary_band {
            band.validate()?;
        }
        Ok(())
    }
}
