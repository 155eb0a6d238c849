//! Request and response messages of the `quire.v1.QuireService` RPC surface.
//!
//! Bodies are JSON. Optional fields may be omitted.

use chrono::{DateTime, Utc};
use quire_storage::{
    AccountId, AccountPurge, Conversation, ConversationId, GroupId, GroupInvite, GroupInviteLink,
    GroupMember, InviteCode, InviteId,
};
use serde::{Deserialize, Serialize};

// ───────────────────────────── Shared ─────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub workspace_account_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub members: Vec<Member>,
    pub invites: Vec<Invite>,
    pub conversations: Vec<ConversationInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Member {
    pub account_id: AccountId,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Invite {
    pub id: InviteId,
    pub group_id: GroupId,
    pub sender_account_id: AccountId,
    pub recipient_account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteLink {
    pub code: InviteCode,
    pub group_id: GroupId,
    pub generated_by_account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationInfo {
    pub id: ConversationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<quire_storage::Group> for Group {
    fn from(g: quire_storage::Group) -> Self {
        Self {
            id: g.id,
            name: g.name,
            description: g.description,
            avatar_url: g.avatar_url,
            workspace_account_id: g.workspace_account_id,
            created_at: g.created_at,
            modified_at: g.modified_at,
            members: g.members.into_iter().map(Member::from).collect(),
            invites: g.invites.into_iter().map(Invite::from).collect(),
            conversations: g.conversations.into_iter().map(ConversationInfo::from).collect(),
        }
    }
}

impl From<GroupMember> for Member {
    fn from(m: GroupMember) -> Self {
        Self {
            account_id: m.account_id,
            is_admin: m.is_admin,
            joined_at: m.joined_at,
        }
    }
}

impl From<GroupInvite> for Invite {
    fn from(i: GroupInvite) -> Self {
        Self {
            id: i.id,
            group_id: i.group_id,
            sender_account_id: i.sender_account_id,
            recipient_account_id: i.recipient_account_id,
            created_at: i.created_at,
            valid_until: i.valid_until,
        }
    }
}

impl From<GroupInviteLink> for InviteLink {
    fn from(l: GroupInviteLink) -> Self {
        Self {
            code: l.code,
            group_id: l.group_id,
            generated_by_account_id: l.generated_by_account_id,
            created_at: l.created_at,
            valid_until: l.valid_until,
        }
    }
}

impl From<Conversation> for ConversationInfo {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            name: c.name,
            created_at: c.created_at,
        }
    }
}

// ───────────────────────────── Groups ─────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetGroupRequest {
    pub group_id: GroupId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    pub group_id: GroupId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteGroupRequest {
    pub group_id: GroupId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteGroupResponse {
    pub notes_relocated: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListGroupsRequest {
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListGroupsResponse {
    pub groups: Vec<Group>,
    pub next_page_token: Option<String>,
}

// ───────────────────────────── Members ─────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateMemberRequest {
    pub group_id: GroupId,
    pub account_id: AccountId,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveMemberRequest {
    pub group_id: GroupId,
    pub account_id: AccountId,
}

// ───────────────────────────── Invites ─────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SendInviteRequest {
    pub group_id: GroupId,
    pub recipient_account_id: AccountId,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

/// Addresses one invite; used by Get, Accept, Deny and Revoke.
#[derive(Debug, Serialize, Deserialize)]
pub struct InviteRef {
    pub group_id: GroupId,
    pub invite_id: InviteId,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListInvitesRequest {
    #[serde(default)]
    pub sender_account_id: Option<AccountId>,
    #[serde(default)]
    pub recipient_account_id: Option<AccountId>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteList {
    pub invites: Vec<Invite>,
}

// ───────────────────────────── Invite Links ─────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateInviteLinkRequest {
    pub group_id: GroupId,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

/// Addresses one invite link; used by Get, Revoke and Use.
#[derive(Debug, Serialize, Deserialize)]
pub struct InviteLinkRef {
    pub group_id: GroupId,
    pub code: InviteCode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListInviteLinksRequest {
    pub group_id: GroupId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteLinkList {
    pub links: Vec<InviteLink>,
}

// ───────────────────────────── Accounts ─────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct OnAccountDeleteRequest {
    pub account_id: AccountId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountPurgeResponse {
    pub invites_removed: u64,
    pub invite_links_removed: u64,
    pub workspaces_deleted: u64,
    pub memberships_removed: u64,
    pub admins_promoted: u64,
    pub orphaned_groups_deleted: u64,
}

impl From<AccountPurge> for AccountPurgeResponse {
    fn from(p: AccountPurge) -> Self {
        Self {
            invites_removed: p.invites_removed,
            invite_links_removed: p.invite_links_removed,
            workspaces_deleted: p.workspaces_deleted,
            memberships_removed: p.memberships_removed,
            admins_promoted: p.admins_promoted,
            orphaned_groups_deleted: p.orphaned_groups_deleted,
        }
    }
}
