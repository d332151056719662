//! User-related types for the marketplace engine
//!
//! This module defines user identity, registration category, and the
//! authorization capability passed into privileged operations.

use serde::{Deserialize, Serialize};

/// User identifier
///
/// Supports user IDs from 0 to 2^64-1
pub type UserId = u64;

/// Registration category of a user
///
/// The category determines the initial block allocation minted into the
/// user's wallet at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserCategory {
    /// A single person: 100,000 blocks by default
    Individual,
    /// A registered business name: 500,000 blocks by default
    Venture,
    /// An incorporated company: 1,000,000 blocks by default
    Company,
}

impl UserCategory {
    /// Parse a category from its lowercase string form
    ///
    /// # Returns
    ///
    /// * `Some(UserCategory)` - If the string matches a known category
    /// * `None` - Otherwise
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "individual" => Some(UserCategory::Individual),
            "venture" => Some(UserCategory::Venture),
            "company" => Some(UserCategory::Company),
            _ => None,
        }
    }

    /// Lowercase string form of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            UserCategory::Individual => "individual",
            UserCategory::Venture => "venture",
            UserCategory::Company => "company",
        }
    }
}

/// Registered user profile
///
/// Created once at registration. Only the `is_admin` and `is_frozen` flags
/// change afterwards; identity fields are immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    /// The user ID
    pub id: UserId,

    /// Registration category (drives the initial block allocation)
    pub category: UserCategory,

    /// Whether this user may perform administrative operations
    pub is_admin: bool,

    /// Whether this user is frozen
    ///
    /// Frozen users are rejected from every balance-moving operation.
    pub is_frozen: bool,

    /// Referral code owned by this user, if one was generated
    pub referral_code: Option<String>,
}

impl UserProfile {
    /// Create a new unfrozen, non-admin profile
    pub fn new(id: UserId, category: UserCategory) -> Self {
        UserProfile {
            id,
            category,
            is_admin: false,
            is_frozen: false,
            referral_code: None,
        }
    }
}

/// Authorization capability for an operation
///
/// Entry points receive an already-authenticated identity; privileged
/// operations check `is_admin` on this capability rather than consulting
/// ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizedActor {
    /// The authenticated user ID
    pub user_id: UserId,

    /// Whether the authenticated user holds admin authority
    pub is_admin: bool,
}

impl AuthorizedActor {
    /// Build the capability carried by a profile
    pub fn for_profile(profile: &UserProfile) -> Self {
        AuthorizedActor {
            user_id: profile.id,
            is_admin: profile.is_admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("individual", Some(UserCategory::Individual))]
    #[case("venture", Some(UserCategory::Venture))]
    #[case("company", Some(UserCategory::Company))]
    #[case("COMPANY", Some(UserCategory::Company))]
    #[case("cooperative", None)]
    #[case("", None)]
    fn test_category_parse(#[case] input: &str, #[case] expected: Option<UserCategory>) {
        assert_eq!(UserCategory::parse(input), expected);
    }

    #[test]
    fn test_new_profile_has_no_flags_set() {
        let profile = UserProfile::new(7, UserCategory::Venture);
        assert!(!profile.is_admin);
        assert!(!profile.is_frozen);
        assert!(profile.referral_code.is_none());
    }

    #[test]
    fn test_actor_carries_admin_flag() {
        let mut profile = UserProfile::new(1, UserCategory::Individual);
        profile.is_admin = true;

        let actor = AuthorizedActor::for_profile(&profile);
        assert_eq!(actor.user_id, 1);
        assert!(actor.is_admin);
    }
}
