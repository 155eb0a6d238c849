//! Invite link types.

use chrono::{DateTime, Utc};

use super::{AccountId, GroupId, InviteCode};

/// Reusable join link. Redeeming it does not consume it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupInviteLink {
    pub code: InviteCode,
    pub group_id: GroupId,
    pub generated_by_account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Parameters for creating an invite link
#[derive(Clone, Debug)]
pub struct CreateInviteLinkParams {
    pub group_id: GroupId,
    pub code: InviteCode, // generated by the caller from a CSPRNG
    pub generated_by_account_id: AccountId,
    pub valid_until: DateTime<Utc>,
}
