//! Member profiles and the directory trait.
//!
//! The member roster lives in the host application; the dues subsystem
//! only needs enough of it to price dues and build the manage view.

use crate::error::Result;
use crate::roles::ClubRole;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared membership type, used to resolve the dues price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    /// Full professional membership.
    #[default]
    Professional,
    /// Discounted student membership.
    Student,
}

impl MembershipType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Student => "student",
        }
    }
}

impl FromStr for MembershipType {
    type Err = ParseMembershipTypeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "professional" => Ok(Self::Professional),
            "student" => Ok(Self::Student),
            _ => Err(ParseMembershipTypeError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing a membership type string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMembershipTypeError {
    invalid_value: String,
}

impl fmt::Display for ParseMembershipTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid membership type: '{}' (expected: professional or student)",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseMembershipTypeError {}

/// A member as the dues subsystem sees one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    /// Unique member ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Declared membership type.
    pub membership_type: MembershipType,
    /// Club role.
    pub role: ClubRole,
}

/// Trait for reading the club's member roster.
///
/// Implement this against your user store. An in-memory implementation
/// is provided for testing.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// List every member of the club.
    async fn list_members(&self) -> Result<Vec<MemberProfile>>;

    /// Look up a single member.
    async fn get_member(&self, member_id: &str) -> Result<Option<MemberProfile>>;
}

/// In-memory member directory for testing and examples.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    /// In-memory member directory.
    ///
    /// Wraps data in `Arc` for cheap cloning.
    #[derive(Default, Clone)]
    pub struct InMemoryMemberDirectory {
        members: Arc<RwLock<HashMap<String, MemberProfile>>>,
    }

    impl InMemoryMemberDirectory {
        /// Create an empty directory.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Add or replace a member.
        pub fn upsert(&self, member: MemberProfile) {
            self.members
                .write()
                .unwrap()
                .insert(member.id.clone(), member);
        }

        /// Seed the directory with members.
        pub fn seed(&self, members: Vec<MemberProfile>) {
            let mut map = self.members.write().unwrap();
            for member in members {
                map.insert(member.id.clone(), member);
            }
        }
    }

    #[async_trait]
    impl MemberDirectory for InMemoryMemberDirectory {
        async fn list_members(&self) -> Result<Vec<MemberProfile>> {
            let mut members: Vec<MemberProfile> =
                self.members.read().unwrap().values().cloned().collect();
            members.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(members)
        }

        async fn get_member(&self, member_id: &str) -> Result<Option<MemberProfile>> {
            Ok(self.members.read().unwrap().get(member_id).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryMemberDirectory;
    use super::*;

    fn profile(id: &str, membership_type: MembershipType) -> MemberProfile {
        MemberProfile {
            id: id.to_string(),
            name: format!("Member {}", id),
            email: format!("{}@example.com", id),
            membership_type,
            role: ClubRole::Member,
        }
    }

    #[test]
    fn test_membership_type_parsing() {
        assert_eq!(
            "professional".parse::<MembershipType>().unwrap(),
            MembershipType::Professional
        );
        assert_eq!(
            "Student".parse::<MembershipType>().unwrap(),
            MembershipType::Student
        );
        assert!("alumni".parse::<MembershipType>().is_err());
    }

    #[test]
    fn test_membership_type_serialization() {
        let json = serde_json::to_string(&MembershipType::Student).unwrap();
        assert_eq!(json, "\"student\"");
    }

    #[tokio::test]
    async fn test_in_memory_directory() {
        let directory = InMemoryMemberDirectory::new();
        assert!(directory.list_members().await.unwrap().is_empty());

        directory.seed(vec![
            profile("mem_b", MembershipType::Student),
            profile("mem_a", MembershipType::Professional),
        ]);

        let members = directory.list_members().await.unwrap();
        assert_eq!(members.len(), 2);
        // Sorted by ID for stable listings
        assert_eq!(members[0].id, "mem_a");

        let found = directory.get_member("mem_b").await.unwrap().unwrap();
        assert_eq!(found.membership_type, MembershipType::Student);
        assert!(directory.get_member("mem_z").await.unwrap().is_none());
    }
}
