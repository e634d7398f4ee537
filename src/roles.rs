//! Club roles and dues capabilities.
//!
//! Authorization for dues operations goes through one capability layer
//! instead of ad hoc role-string comparisons at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a club member can hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClubRole {
    /// Regular member with no dues-management permissions.
    #[default]
    Member,
    /// Board member with read access to dues reports.
    Board,
    /// Treasurer with full dues management.
    Treasurer,
    /// President with full dues management.
    President,
}

impl ClubRole {
    /// Get the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Board => "board",
            Self::Treasurer => "treasurer",
            Self::President => "president",
        }
    }
}

/// Error returned when parsing a role string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    invalid_value: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid role: '{}' (expected: member, board, treasurer, or president)",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for ClubRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "board" => Ok(Self::Board),
            "treasurer" => Ok(Self::Treasurer),
            "president" => Ok(Self::President),
            _ => Err(ParseRoleError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ClubRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capability checks for dues operations.
///
/// Implement this trait on a custom role type to plug it into the
/// managers; [`ClubRole`] provides the default hierarchy.
pub trait DuesPermissions {
    /// Check if this role can approve, waive, or reset dues records.
    fn can_manage_dues(&self) -> bool;

    /// Check if this role can create, edit, or activate dues cycles
    /// and change payment settings.
    fn can_manage_cycles(&self) -> bool;

    /// Check if this role can view the club-wide dues report.
    fn can_view_dues_reports(&self) -> bool;
}

impl DuesPermissions for ClubRole {
    fn can_manage_dues(&self) -> bool {
        matches!(self, Self::Treasurer | Self::President)
    }

    fn can_manage_cycles(&self) -> bool {
        matches!(self, Self::Treasurer | Self::President)
    }

    fn can_view_dues_reports(&self) -> bool {
        matches!(self, Self::Board | Self::Treasurer | Self::President)
    }
}

/// The authenticated caller of a dues operation.
///
/// Authentication itself is an external collaborator; the host
/// application resolves the session and hands the managers an `Actor`.
/// In the HTTP surface it is read from request extensions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The caller's member ID.
    pub member_id: String,
    /// The caller's role.
    pub role: ClubRole,
}

impl Actor {
    /// Create a new actor.
    #[must_use]
    pub fn new(member_id: impl Into<String>, role: ClubRole) -> Self {
        Self {
            member_id: member_id.into(),
            role,
        }
    }
}
