//! Group membership types.

use chrono::{DateTime, Utc};

use super::AccountId;

/// Group membership record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupMember {
    pub account_id: AccountId,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

/// Parameters for changing a member's role
#[derive(Clone, Debug)]
pub struct UpdateMemberParams {
    pub is_admin: bool,
}
