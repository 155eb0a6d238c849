//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait the server depends on.
///
/// Mutating methods take the acting account and are **conditional**: the
/// authorization rule is part of the same atomic write. Backends report an
/// unmatched condition as `NotFound`, and only refine it into
/// `AlreadyExists` or `Conflict` when the caller is allowed to see the group.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Groups ─────────────────────────────────────────

    /// Create a regular group with the owner as its only (admin) member and one
    /// default conversation.
    async fn create_group(&self, params: &CreateGroupParams) -> Result<Group, StoreError>;

    /// Create the owner's personal workspace. An account has at most one
    /// (`AlreadyExists` otherwise).
    async fn create_workspace(&self, params: &CreateWorkspaceParams)
        -> Result<Group, StoreError>;

    /// Get a group visible to `account_id` (member or workspace owner).
    async fn get_group(
        &self,
        group_id: &GroupId,
        account_id: &AccountId,
    ) -> Result<Group, StoreError>;

    /// Get the personal workspace owned by `account_id`.
    async fn get_workspace(&self, account_id: &AccountId) -> Result<Group, StoreError>;

    /// Update group fields. Requires admin (or workspace owner).
    async fn update_group(
        &self,
        group_id: &GroupId,
        account_id: &AccountId,
        params: &UpdateGroupParams,
    ) -> Result<Group, StoreError>;

    /// Delete a regular group. Requires admin. Notes of the group are moved to
    /// their authors' workspaces in the same transaction; returns how many.
    async fn delete_group(
        &self,
        group_id: &GroupId,
        account_id: &AccountId,
    ) -> Result<u64, StoreError>;

    /// List groups where the account is a member or workspace owner.
    async fn list_groups(&self, params: &ListGroupsParams) -> Result<GroupPage, StoreError>;

    // ───────────────────────────────────── Members ────────────────────────────────────────

    /// Change a member's admin flag. Requires admin. Setting the flag to its
    /// current value, or demoting the last admin, is a `Conflict`.
    async fn update_member(
        &self,
        group_id: &GroupId,
        actor: &AccountId,
        target: &AccountId,
        params: &UpdateMemberParams,
    ) -> Result<GroupMember, StoreError>;

    /// Remove a member. Anyone may remove themselves; removing someone else
    /// requires admin. Removing the last admin is a `Conflict`.
    async fn remove_member(
        &self,
        group_id: &GroupId,
        actor: &AccountId,
        target: &AccountId,
    ) -> Result<(), StoreError>;

    // ───────────────────────────────────── Invites ────────────────────────────────────────

    /// Create an invite. Sender must be a member, recipient must not be, and
    /// the (sender, recipient) pair must not already have a pending invite.
    async fn create_invite(&self, params: &CreateInviteParams) -> Result<GroupInvite, StoreError>;

    /// Get an unexpired invite visible to its sender, recipient or any member.
    async fn get_invite(
        &self,
        group_id: &GroupId,
        invite_id: &InviteId,
        account_id: &AccountId,
    ) -> Result<GroupInvite, StoreError>;

    /// Accept an invite as its recipient: removes it and adds a regular member.
    async fn accept_invite(
        &self,
        group_id: &GroupId,
        invite_id: &InviteId,
        recipient: &AccountId,
    ) -> Result<GroupMember, StoreError>;

    /// Deny an invite as its recipient.
    async fn deny_invite(
        &self,
        group_id: &GroupId,
        invite_id: &InviteId,
        recipient: &AccountId,
    ) -> Result<(), StoreError>;

    /// Revoke an invite as its sender or as a group admin.
    async fn revoke_invite(
        &self,
        group_id: &GroupId,
        invite_id: &InviteId,
        actor: &AccountId,
    ) -> Result<(), StoreError>;

    /// List unexpired invites matching the filter and visible to its viewer.
    async fn list_invites(&self, filter: &InviteFilter) -> Result<Vec<GroupInvite>, StoreError>;

    // ───────────────────────────────────── Invite Links ───────────────────────────────────

    /// Create an invite link. Requires admin; one active link per creator per
    /// group (`AlreadyExists` otherwise).
    async fn create_invite_link(
        &self,
        params: &CreateInviteLinkParams,
    ) -> Result<GroupInviteLink, StoreError>;

    /// Get an unexpired invite link. Only its creator can see it.
    async fn get_invite_link(
        &self,
        group_id: &GroupId,
        code: &InviteCode,
        account_id: &AccountId,
    ) -> Result<GroupInviteLink, StoreError>;

    /// List the caller's own unexpired links in a group.
    async fn list_invite_links(
        &self,
        group_id: &GroupId,
        account_id: &AccountId,
    ) -> Result<Vec<GroupInviteLink>, StoreError>;

    /// Revoke an invite link. Only its creator can revoke it.
    async fn revoke_invite_link(
        &self,
        group_id: &GroupId,
        code: &InviteCode,
        account_id: &AccountId,
    ) -> Result<(), StoreError>;

    /// Redeem an invite link as a non-member. The link stays usable.
    async fn use_invite_link(
        &self,
        group_id: &GroupId,
        code: &InviteCode,
        account_id: &AccountId,
    ) -> Result<GroupMember, StoreError>;

    // ───────────────────────────────────── Accounts ───────────────────────────────────────

    /// Remove every trace of a deleted account: its invites and links, its
    /// workspace and its memberships. Steps are applied one after another
    /// without an enclosing transaction; re-running converges.
    async fn purge_account(&self, account_id: &AccountId) -> Result<AccountPurge, StoreError>;
}
