//! Account cleanup types.

/// What an account purge removed. Counts are per run; a retry after partial
/// completion reports only what was still left.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountPurge {
    pub invites_removed: u64,
    pub invite_links_removed: u64,
    pub workspaces_deleted: u64,
    pub memberships_removed: u64,
    pub admins_promoted: u64,
    pub orphaned_groups_deleted: u64,
}

impl AccountPurge {
    pub fn is_noop(&self) -> bool {
        *self == AccountPurge::default()
    }
}
