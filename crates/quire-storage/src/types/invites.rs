//! Invite types.

use chrono::{DateTime, Utc};

use super::{AccountId, GroupId, InviteId};

/// Pending invite record. Accepting, denying or revoking removes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupInvite {
    pub id: InviteId,
    pub group_id: GroupId,
    pub sender_account_id: AccountId,
    pub recipient_account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>, // past this the invite reads as missing
}

impl GroupInvite {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until <= now
    }
}

/// Parameters for creating an invite
#[derive(Clone, Debug)]
pub struct CreateInviteParams {
    pub group_id: GroupId,
    pub sender_account_id: AccountId,
    pub recipient_account_id: AccountId,
    pub valid_until: DateTime<Utc>,
}

/// Invite listing filter. `viewer` restricts results to invites the account
/// sent, received, or can see as a member of the group.
#[derive(Clone, Debug)]
pub struct InviteFilter {
    pub viewer: AccountId,
    pub sender_account_id: Option<AccountId>,
    pub recipient_account_id: Option<AccountId>,
    pub group_id: Option<GroupId>,
}
