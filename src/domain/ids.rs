//! Domain identifier types with validation
//!
//! Newtype wrappers keep job and profile identifiers from being mixed up with
//! each other or with the record identifiers flowing through a job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Job execution identifier
///
/// Every export job is keyed by a UUID. The id names the job's registry
/// entry, its reference data cache slot and its output directory.
///
/// # Examples
///
/// ```
/// use bibexport::domain::ids::JobExecutionId;
/// use std::str::FromStr;
///
/// let id = JobExecutionId::from_str("6f1b2c1e-2d7a-4a36-8f3c-0b1f5d1c9a11").unwrap();
/// assert_eq!(id.to_string(), "6f1b2c1e-2d7a-4a36-8f3c-0b1f5d1c9a11");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobExecutionId(Uuid);

impl JobExecutionId {
    /// Generates a fresh random job id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobExecutionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| format!("Invalid job execution id '{s}': {e}"))
    }
}

/// Mapping profile identifier
///
/// Profiles are owned by profile management and may use any non-empty id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    /// Creates a new ProfileId
    ///
    /// # Returns
    ///
    /// Returns `Ok(ProfileId)` if the ID is non-empty, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Profile ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Wraps an id known to be non-empty, such as a built-in constant
    pub(crate) fn from_trusted(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Returns the profile ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProfileId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ProfileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true when the identifier is a well-formed UUID
///
/// Catalog record identifiers are UUIDs; anything else is counted as an
/// invalid identifier before any fetch is attempted.
pub fn is_valid_record_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_execution_id_round_trip_through_string() {
        let id = JobExecutionId::generate();
        let parsed = JobExecutionId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_job_execution_id_rejects_garbage() {
        assert!(JobExecutionId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_profile_id_validation() {
        assert!(ProfileId::new("").is_err());
        assert!(ProfileId::new("   ").is_err());
        assert_eq!(ProfileId::new("default").unwrap().as_str(), "default");
    }

    #[test]
    fn test_is_valid_record_id() {
        assert!(is_valid_record_id("c8b50e3f-0446-429c-960e-03774b88223f"));
        assert!(!is_valid_record_id("in00000000001"));
        assert!(!is_valid_record_id(""));
    }
}
