//! Row types and their conversion into storage records.
//!
//! Ids are stored as hyphenated UUID text and timestamps as unix milliseconds.

use chrono::{DateTime, Utc};
use quire_storage::{
    AccountId, Conversation, ConversationId, GroupId, GroupInvite, GroupInviteLink, GroupMember,
    InviteCode, InviteId, StoreError,
};
use uuid::Uuid;

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(format!("invalid uuid {s:?}: {e}")))
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {ms}")))
}

#[derive(sqlx::FromRow)]
pub(crate) struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub workspace_account_id: Option<String>,
    pub created_at: i64,
    pub modified_at: i64,
}

#[derive(sqlx::FromRow)]
pub(crate) struct MemberRow {
    pub account_id: String,
    pub is_admin: bool,
    pub joined_at: i64,
}

impl TryFrom<MemberRow> for GroupMember {
    type Error = StoreError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(GroupMember {
            account_id: AccountId(parse_uuid(&row.account_id)?),
            is_admin: row.is_admin,
            joined_at: from_millis(row.joined_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct InviteRow {
    pub id: String,
    pub group_id: String,
    pub sender_account_id: String,
    pub recipient_account_id: String,
    pub created_at: i64,
    pub valid_until: i64,
}

impl TryFrom<InviteRow> for GroupInvite {
    type Error = StoreError;

    fn try_from(row: InviteRow) -> Result<Self, Self::Error> {
        Ok(GroupInvite {
            id: InviteId(parse_uuid(&row.id)?),
            group_id: GroupId(parse_uuid(&row.group_id)?),
            sender_account_id: AccountId(parse_uuid(&row.sender_account_id)?),
            recipient_account_id: AccountId(parse_uuid(&row.recipient_account_id)?),
            created_at: from_millis(row.created_at)?,
            valid_until: from_millis(row.valid_until)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct InviteLinkRow {
    pub code: String,
    pub group_id: String,
    pub generated_by_account_id: String,
    pub created_at: i64,
    pub valid_until: i64,
}

impl TryFrom<InviteLinkRow> for GroupInviteLink {
    type Error = StoreError;

    fn try_from(row: InviteLinkRow) -> Result<Self, Self::Error> {
        Ok(GroupInviteLink {
            code: InviteCode(row.code),
            group_id: GroupId(parse_uuid(&row.group_id)?),
            generated_by_account_id: AccountId(parse_uuid(&row.generated_by_account_id)?),
            created_at: from_millis(row.created_at)?,
            valid_until: from_millis(row.valid_until)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ConversationRow {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = StoreError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        Ok(Conversation {
            id: ConversationId(parse_uuid(&row.id)?),
            name: row.name,
            created_at: from_millis(row.created_at)?,
        })
    }
}

/// Convert a batch of rows, failing on the first malformed one.
pub(crate) fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
