//! Identity types for versioned records
//!
//! Every version row carries a [`RecordId`] (a ULID, unique per version) and
//! belongs to exactly one timeline identified by `(TenantId, BusinessCode)`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

/// Maximum length of a business code
pub const MAX_CODE_LEN: usize = 64;

/// Errors raised when parsing identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("record id is not a valid ULID: {0}")]
    InvalidRecordId(String),

    #[error("tenant id must not be empty")]
    EmptyTenant,

    #[error("business code must not be empty")]
    EmptyCode,

    #[error("business code '{code}' exceeds {max} characters")]
    CodeTooLong { code: String, max: usize },

    #[error("business code '{code}' contains invalid character '{ch}' (allowed: A-Z, 0-9, '_', '-')")]
    InvalidCodeChar { code: String, ch: char },
}

/// Opaque identity of one version row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(Ulid);

impl RecordId {
    /// Generate a fresh, time-ordered record id
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim())
            .map(RecordId)
            .map_err(|_| IdParseError::InvalidRecordId(s.to_string()))
    }
}

impl TryFrom<String> for RecordId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.to_string()
    }
}

/// Tenant scope; timelines never span tenants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdParseError::EmptyTenant);
        }
        Ok(TenantId(trimmed.to_string()))
    }
}

impl TryFrom<String> for TenantId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// Stable external key shared by every version of one entity
///
/// Codes are trimmed and upper-cased on parse so `dept-01` and `DEPT-01`
/// address the same timeline. The `/` separator is rejected because codes are
/// joined into hierarchy paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BusinessCode(String);

impl BusinessCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusinessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BusinessCode {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        if code.is_empty() {
            return Err(IdParseError::EmptyCode);
        }
        if code.chars().count() > MAX_CODE_LEN {
            return Err(IdParseError::CodeTooLong {
                code,
                max: MAX_CODE_LEN,
            });
        }
        if let Some(ch) = code
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(IdParseError::InvalidCodeChar { code, ch });
        }
        Ok(BusinessCode(code))
    }
}

impl TryFrom<String> for BusinessCode {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BusinessCode> for String {
    fn from(code: BusinessCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_roundtrip() {
        let id = RecordId::new();
        let parsed: RecordId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_record_id_rejects_garbage() {
        assert!("not-a-ulid".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_record_ids_are_time_ordered() {
        let a = RecordId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = RecordId::new();
        assert!(a < b);
    }

    #[test]
    fn test_business_code_normalizes() {
        let code: BusinessCode = "  dept-01 ".parse().unwrap();
        assert_eq!(code.as_str(), "DEPT-01");
    }

    #[test]
    fn test_business_code_rejects_path_separator() {
        let err = "A/B".parse::<BusinessCode>().unwrap_err();
        assert_eq!(
            err,
            IdParseError::InvalidCodeChar {
                code: "A/B".to_string(),
                ch: '/'
            }
        );
    }

    #[test]
    fn test_business_code_length_limit() {
        let long = "X".repeat(MAX_CODE_LEN + 1);
        assert!(matches!(
            long.parse::<BusinessCode>(),
            Err(IdParseError::CodeTooLong { .. })
        ));
        assert!("X".repeat(MAX_CODE_LEN).parse::<BusinessCode>().is_ok());
    }

    #[test]
    fn test_empty_tenant_rejected() {
        assert_eq!("   ".parse::<TenantId>(), Err(IdParseError::EmptyTenant));
    }
}
