//! Group aggregate types.
//!
//! A group is either a personal workspace (`workspace_account_id` set, no
//! members, invites or conversations) or a regular group with at least one
//! admin member.

use chrono::{DateTime, Utc};

use super::{AccountId, ConversationId, GroupId, GroupInvite, GroupMember};

/// Group record, loaded together with its embedded collections.
///
/// Invite links are not part of the aggregate view: their codes are
/// credentials and only their creator may read them.
#[derive(Clone, Debug)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub workspace_account_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub members: Vec<GroupMember>, // ordered by joined_at
    pub invites: Vec<GroupInvite>, // unexpired only
    pub conversations: Vec<Conversation>,
}

impl Group {
    pub fn is_workspace(&self) -> bool {
        self.workspace_account_id.is_some()
    }

    /// Member of the group, or owner of the workspace.
    pub fn is_member(&self, account_id: &AccountId) -> bool {
        self.workspace_account_id.as_ref() == Some(account_id)
            || self.members.iter().any(|m| &m.account_id == account_id)
    }

    /// Admin member. A workspace owner is its implicit sole admin.
    pub fn is_admin(&self, account_id: &AccountId) -> bool {
        self.workspace_account_id.as_ref() == Some(account_id)
            || self
                .members
                .iter()
                .any(|m| &m.account_id == account_id && m.is_admin)
    }

    pub fn member(&self, account_id: &AccountId) -> Option<&GroupMember> {
        self.members.iter().find(|m| &m.account_id == account_id)
    }

    pub fn admin_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_admin).count()
    }
}

/// Conversation metadata embedded in a group.
#[derive(Clone, Debug)]
pub struct Conversation {
    pub id: ConversationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a regular group
#[derive(Clone, Debug)]
pub struct CreateGroupParams {
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub owner_account_id: AccountId, // becomes the first admin member
}

/// Parameters for creating a personal workspace
#[derive(Clone, Debug)]
pub struct CreateWorkspaceParams {
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub owner_account_id: AccountId,
}

/// Partial update of group fields; `None` leaves the field unchanged.
#[derive(Clone, Debug, Default)]
pub struct UpdateGroupParams {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateGroupParams {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.avatar_url.is_none()
    }
}

/// Groups visible to an account, one page at a time.
#[derive(Clone, Debug)]
pub struct ListGroupsParams {
    pub account_id: AccountId,
    pub limit: u32,
    pub offset: u64,
}

/// A page of groups.
#[derive(Clone, Debug)]
pub struct GroupPage {
    pub groups: Vec<Group>,
    pub next_offset: Option<u64>,
}
