//! SQLite implementation of the quire [`Store`].
//!
//! Every mutation is one conditional statement (or a transaction that opens
//! with one) whose `WHERE` clause carries the authorization rule. When the
//! statement matches no rows the result is `NotFound`; a follow-up read on the
//! same connection decides whether the caller may learn more than that.

mod rows;

use std::str::FromStr;

use chrono::Utc;
use quire_storage::{
    AccountId, AccountPurge, CreateGroupParams, CreateInviteLinkParams, CreateInviteParams,
    CreateWorkspaceParams, Group, GroupId, GroupInvite, GroupInviteLink, GroupMember, GroupPage,
    InviteCode, InviteFilter, InviteId, ListGroupsParams, Store, StoreError, UpdateGroupParams,
    UpdateMemberParams,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::rows::{
    convert, from_millis, parse_uuid, ConversationRow, GroupRow, InviteLinkRow, InviteRow,
    MemberRow,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Name of the conversation every regular group starts with.
pub const DEFAULT_CONVERSATION_NAME: &str = "General";

/// Name given to a workspace created implicitly to receive relocated notes.
pub const DEFAULT_WORKSPACE_NAME: &str = "Personal";

const GROUP_COLUMNS: &str =
    "g.id, g.name, g.description, g.avatar_url, g.workspace_account_id, g.created_at, g.modified_at";

const INVITE_COLUMNS: &str =
    "i.id, i.group_id, i.sender_account_id, i.recipient_account_id, i.created_at, i.valid_until";

const LINK_COLUMNS: &str = "l.code, l.group_id, l.generated_by_account_id, l.created_at, l.valid_until";

/// SQL predicate: the account bound at `param` is a member of group `g`, or
/// owns it as a workspace.
fn visible_to(param: &str) -> String {
    format!(
        "(g.workspace_account_id = {param} OR EXISTS (
             SELECT 1 FROM group_members m WHERE m.group_id = g.id AND m.account_id = {param}))"
    )
}

pub struct SqliteStore {
    pool: SqlitePool,
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Like [`backend`], but unique-constraint violations become `AlreadyExists`.
fn write_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists,
        _ => StoreError::Backend(e.to_string()),
    }
}

impl SqliteStore {
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true)
            .foreign_keys(true);

        // A single connection serializes writers. An in-memory database lives
        // only as long as that connection, so it must never be recycled.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(backend)?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ───────────────────────────── Helpers ─────────────────────────────

/// Load a group's embedded collections and assemble the record.
async fn hydrate(
    conn: &mut SqliteConnection,
    row: GroupRow,
    now_ms: i64,
) -> Result<Group, StoreError> {
    let members = sqlx::query_as::<_, MemberRow>(
        "SELECT account_id, is_admin, joined_at FROM group_members
         WHERE group_id = ?1 ORDER BY joined_at, rowid",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(backend)?;

    let invites = sqlx::query_as::<_, InviteRow>(&format!(
        "SELECT {INVITE_COLUMNS} FROM group_invites i
         WHERE i.group_id = ?1 AND i.valid_until > ?2 ORDER BY i.created_at, i.id"
    ))
    .bind(&row.id)
    .bind(now_ms)
    .fetch_all(&mut *conn)
    .await
    .map_err(backend)?;

    let conversations = sqlx::query_as::<_, ConversationRow>(
        "SELECT id, name, created_at FROM conversations
         WHERE group_id = ?1 ORDER BY created_at, id",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(backend)?;

    Ok(Group {
        id: GroupId(parse_uuid(&row.id)?),
        workspace_account_id: row
            .workspace_account_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(AccountId),
        name: row.name,
        description: row.description,
        avatar_url: row.avatar_url,
        created_at: from_millis(row.created_at)?,
        modified_at: from_millis(row.modified_at)?,
        members: convert(members)?,
        invites: convert(invites)?,
        conversations: convert(conversations)?,
    })
}

/// The group as `account` would see it, or `None` if they may not see it.
async fn visible_group(
    conn: &mut SqliteConnection,
    group_id: &GroupId,
    account: &AccountId,
    now_ms: i64,
) -> Result<Option<Group>, StoreError> {
    let row = sqlx::query_as::<_, GroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM groups g WHERE g.id = ?1 AND {}",
        visible_to("?2")
    ))
    .bind(group_id.0.to_string())
    .bind(account.0.to_string())
    .fetch_optional(&mut *conn)
    .await
    .map_err(backend)?;

    match row {
        Some(row) => Ok(Some(hydrate(conn, row, now_ms).await?)),
        None => Ok(None),
    }
}

async fn touch(conn: &mut SqliteConnection, group_id: &str, now_ms: i64) -> Result<(), StoreError> {
    sqlx::query("UPDATE groups SET modified_at = ?2 WHERE id = ?1")
        .bind(group_id)
        .bind(now_ms)
        .execute(&mut *conn)
        .await
        .map_err(backend)?;
    Ok(())
}

async fn insert_workspace(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
    avatar_url: Option<&str>,
    owner: &str,
    now_ms: i64,
) -> Result<String, StoreError> {
    let id = Uuid::now_v7().to_string();
    sqlx::query(
        "INSERT INTO groups (id, name, description, avatar_url, workspace_account_id, created_at, modified_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(&id)
    .bind(name)
    .bind(description)
    .bind(avatar_url)
    .bind(owner)
    .bind(now_ms)
    .execute(&mut *conn)
    .await
    .map_err(write_err)?;
    Ok(id)
}

/// Move every note of a (just deleted) group into its author's workspace,
/// creating the workspace where the author has none. Returns notes moved.
async fn relocate_notes(
    conn: &mut SqliteConnection,
    group_id: &str,
    now_ms: i64,
) -> Result<u64, StoreError> {
    let homeless = sqlx::query_as::<_, (String,)>(
        "SELECT DISTINCT n.author_account_id FROM notes n
         WHERE n.group_id = ?1 AND NOT EXISTS (
             SELECT 1 FROM groups w WHERE w.workspace_account_id = n.author_account_id)",
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(backend)?;

    for (author,) in homeless {
        debug!(account_id = %author, "creating workspace to receive relocated notes");
        insert_workspace(conn, DEFAULT_WORKSPACE_NAME, None, None, &author, now_ms).await?;
    }

    let moved = sqlx::query(
        "UPDATE notes SET
             group_id = (SELECT w.id FROM groups w WHERE w.workspace_account_id = notes.author_account_id),
             modified_at = ?2
         WHERE group_id = ?1",
    )
    .bind(group_id)
    .bind(now_ms)
    .execute(&mut *conn)
    .await
    .map_err(backend)?
    .rows_affected();

    Ok(moved)
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Groups ─────────────────────────────

    async fn create_group(&self, p: &CreateGroupParams) -> Result<Group, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let group_id = Uuid::now_v7().to_string();
        let owner = p.owner_account_id.0.to_string();

        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO groups (id, name, description, avatar_url, workspace_account_id, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
        )
        .bind(&group_id)
        .bind(&p.name)
        .bind(&p.description)
        .bind(&p.avatar_url)
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query(
            "INSERT INTO group_members (group_id, account_id, is_admin, joined_at)
             VALUES (?1, ?2, 1, ?3)",
        )
        .bind(&group_id)
        .bind(&owner)
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query(
            "INSERT INTO conversations (id, group_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(&group_id)
        .bind(DEFAULT_CONVERSATION_NAME)
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups g WHERE g.id = ?1"
        ))
        .bind(&group_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;
        let group = hydrate(&mut tx, row, now_ms).await?;

        tx.commit().await.map_err(backend)?;
        Ok(group)
    }

    async fn create_workspace(&self, p: &CreateWorkspaceParams) -> Result<Group, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let id = insert_workspace(
            &mut tx,
            &p.name,
            p.description.as_deref(),
            p.avatar_url.as_deref(),
            &p.owner_account_id.0.to_string(),
            now_ms,
        )
        .await?;

        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups g WHERE g.id = ?1"
        ))
        .bind(&id)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;
        let group = hydrate(&mut tx, row, now_ms).await?;

        tx.commit().await.map_err(backend)?;
        Ok(group)
    }

    async fn get_group(
        &self,
        group_id: &GroupId,
        account_id: &AccountId,
    ) -> Result<Group, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        // One read transaction so the group and its collections are a snapshot.
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let group = visible_group(&mut tx, group_id, account_id, now_ms).await?;
        tx.commit().await.map_err(backend)?;
        group.ok_or(StoreError::NotFound)
    }

    async fn get_workspace(&self, account_id: &AccountId) -> Result<Group, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups g WHERE g.workspace_account_id = ?1"
        ))
        .bind(account_id.0.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let group = match row {
            Some(row) => hydrate(&mut tx, row, now_ms).await?,
            None => return Err(StoreError::NotFound),
        };
        tx.commit().await.map_err(backend)?;
        Ok(group)
    }

    async fn update_group(
        &self,
        group_id: &GroupId,
        account_id: &AccountId,
        p: &UpdateGroupParams,
    ) -> Result<Group, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query_as::<_, GroupRow>(
            "UPDATE groups SET
                 name = COALESCE(?3, name),
                 description = COALESCE(?4, description),
                 avatar_url = COALESCE(?5, avatar_url),
                 modified_at = ?6
             WHERE id = ?1 AND (
                 workspace_account_id = ?2 OR EXISTS (
                     SELECT 1 FROM group_members a
                     WHERE a.group_id = ?1 AND a.account_id = ?2 AND a.is_admin = 1))
             RETURNING id, name, description, avatar_url, workspace_account_id, created_at, modified_at",
        )
        .bind(group_id.0.to_string())
        .bind(account_id.0.to_string())
        .bind(&p.name)
        .bind(&p.description)
        .bind(&p.avatar_url)
        .bind(now_ms)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        let group = hydrate(&mut tx, row, now_ms).await?;
        tx.commit().await.map_err(backend)?;
        Ok(group)
    }

    async fn delete_group(
        &self,
        group_id: &GroupId,
        account_id: &AccountId,
    ) -> Result<u64, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let gid = group_id.0.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Workspaces go away only with their owner's account.
        let deleted = sqlx::query(
            "DELETE FROM groups
             WHERE id = ?1 AND workspace_account_id IS NULL AND EXISTS (
                 SELECT 1 FROM group_members a
                 WHERE a.group_id = ?1 AND a.account_id = ?2 AND a.is_admin = 1)",
        )
        .bind(&gid)
        .bind(account_id.0.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .rows_affected();

        if deleted == 0 {
            return Err(StoreError::NotFound);
        }

        let moved = relocate_notes(&mut tx, &gid, now_ms).await?;
        tx.commit().await.map_err(backend)?;
        Ok(moved)
    }

    async fn list_groups(&self, p: &ListGroupsParams) -> Result<GroupPage, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let limit = i64::from(p.limit.max(1));
        let offset = i64::try_from(p.offset)
            .map_err(|_| StoreError::Backend(format!("offset out of range: {}", p.offset)))?;

        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Fetch one extra row to learn whether another page follows.
        let mut rows = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups g
             WHERE {}
             ORDER BY g.created_at, g.id
             LIMIT ?2 OFFSET ?3",
            visible_to("?1")
        ))
        .bind(p.account_id.0.to_string())
        .bind(limit + 1)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;

        let has_more = rows.len() as i64 > limit;
        rows.truncate(limit as usize);

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(hydrate(&mut tx, row, now_ms).await?);
        }
        tx.commit().await.map_err(backend)?;

        let next_offset = has_more.then(|| p.offset + groups.len() as u64);
        Ok(GroupPage {
            groups,
            next_offset,
        })
    }

    // ───────────────────────────── Members ─────────────────────────────

    async fn update_member(
        &self,
        group_id: &GroupId,
        actor: &AccountId,
        target: &AccountId,
        p: &UpdateMemberParams,
    ) -> Result<GroupMember, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let gid = group_id.0.to_string();
        let target_id = target.0.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query_as::<_, MemberRow>(
            "UPDATE group_members SET is_admin = ?4
             WHERE group_id = ?1 AND account_id = ?3 AND is_admin <> ?4
               AND EXISTS (
                   SELECT 1 FROM group_members a
                   WHERE a.group_id = ?1 AND a.account_id = ?2 AND a.is_admin = 1)
               AND (?4 = 1 OR (
                   SELECT COUNT(*) FROM group_members c
                   WHERE c.group_id = ?1 AND c.is_admin = 1) > 1)
             RETURNING account_id, is_admin, joined_at",
        )
        .bind(&gid)
        .bind(actor.0.to_string())
        .bind(&target_id)
        .bind(p.is_admin)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            let group = visible_group(&mut tx, group_id, actor, now_ms).await?;
            return Err(match group {
                Some(g) if g.is_admin(actor) => match g.member(target) {
                    Some(m) if m.is_admin == p.is_admin => StoreError::Conflict,
                    Some(m) if m.is_admin && g.admin_count() <= 1 => StoreError::Conflict,
                    _ => StoreError::NotFound,
                },
                _ => StoreError::NotFound,
            });
        };

        if !p.is_admin {
            // Only admins hold invite links.
            sqlx::query(
                "DELETE FROM group_invite_links WHERE group_id = ?1 AND generated_by_account_id = ?2",
            )
            .bind(&gid)
            .bind(&target_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        touch(&mut tx, &gid, now_ms).await?;
        tx.commit().await.map_err(backend)?;
        GroupMember::try_from(row)
    }

    async fn remove_member(
        &self,
        group_id: &GroupId,
        actor: &AccountId,
        target: &AccountId,
    ) -> Result<(), StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let gid = group_id.0.to_string();
        let target_id = target.0.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let removed = sqlx::query(
            "DELETE FROM group_members
             WHERE group_id = ?1 AND account_id = ?3
               AND (?2 = ?3 OR EXISTS (
                   SELECT 1 FROM group_members a
                   WHERE a.group_id = ?1 AND a.account_id = ?2 AND a.is_admin = 1))
               AND (is_admin = 0 OR (
                   SELECT COUNT(*) FROM group_members c
                   WHERE c.group_id = ?1 AND c.is_admin = 1) > 1)",
        )
        .bind(&gid)
        .bind(actor.0.to_string())
        .bind(&target_id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .rows_affected();

        if removed == 0 {
            let group = visible_group(&mut tx, group_id, actor, now_ms).await?;
            return Err(match group {
                Some(g) if actor == target || g.is_admin(actor) => match g.member(target) {
                    Some(m) if m.is_admin && g.admin_count() <= 1 => StoreError::Conflict,
                    _ => StoreError::NotFound,
                },
                _ => StoreError::NotFound,
            });
        }

        sqlx::query(
            "DELETE FROM group_invite_links WHERE group_id = ?1 AND generated_by_account_id = ?2",
        )
        .bind(&gid)
        .bind(&target_id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        touch(&mut tx, &gid, now_ms).await?;
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    // ───────────────────────────── Invites ─────────────────────────────

    async fn create_invite(&self, p: &CreateInviteParams) -> Result<GroupInvite, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let valid_until_ms = p.valid_until.timestamp_millis();
        let invite_id = Uuid::now_v7();
        let gid = p.group_id.0.to_string();
        let sender = p.sender_account_id.0.to_string();
        let recipient = p.recipient_account_id.0.to_string();

        let mut tx = self.pool.begin().await.map_err(backend)?;

        // An expired invite for the same pair must not block a fresh one.
        sqlx::query(
            "DELETE FROM group_invites
             WHERE group_id = ?1 AND sender_account_id = ?2 AND recipient_account_id = ?3
               AND valid_until <= ?4",
        )
        .bind(&gid)
        .bind(&sender)
        .bind(&recipient)
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let inserted = sqlx::query(
            "INSERT INTO group_invites
                 (id, group_id, sender_account_id, recipient_account_id, created_at, valid_until)
             SELECT ?1, g.id, ?3, ?4, ?5, ?6 FROM groups g
             WHERE g.id = ?2 AND g.workspace_account_id IS NULL
               AND EXISTS (
                   SELECT 1 FROM group_members s WHERE s.group_id = g.id AND s.account_id = ?3)
               AND NOT EXISTS (
                   SELECT 1 FROM group_members r WHERE r.group_id = g.id AND r.account_id = ?4)",
        )
        .bind(invite_id.to_string())
        .bind(&gid)
        .bind(&sender)
        .bind(&recipient)
        .bind(now_ms)
        .bind(valid_until_ms)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?
        .rows_affected();

        if inserted == 0 {
            let group = visible_group(&mut tx, &p.group_id, &p.sender_account_id, now_ms).await?;
            return Err(match group {
                Some(g) if !g.is_workspace() && g.is_member(&p.recipient_account_id) => {
                    StoreError::AlreadyExists
                }
                _ => StoreError::NotFound,
            });
        }

        touch(&mut tx, &gid, now_ms).await?;
        tx.commit().await.map_err(backend)?;

        Ok(GroupInvite {
            id: InviteId(invite_id),
            group_id: p.group_id.clone(),
            sender_account_id: p.sender_account_id.clone(),
            recipient_account_id: p.recipient_account_id.clone(),
            created_at: from_millis(now_ms)?,
            valid_until: from_millis(valid_until_ms)?,
        })
    }

    async fn get_invite(
        &self,
        group_id: &GroupId,
        invite_id: &InviteId,
        account_id: &AccountId,
    ) -> Result<GroupInvite, StoreError> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM group_invites i
             WHERE i.id = ?1 AND i.group_id = ?2 AND i.valid_until > ?4
               AND (i.sender_account_id = ?3 OR i.recipient_account_id = ?3 OR EXISTS (
                   SELECT 1 FROM group_members m WHERE m.group_id = i.group_id AND m.account_id = ?3))"
        ))
        .bind(invite_id.0.to_string())
        .bind(group_id.0.to_string())
        .bind(account_id.0.to_string())
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        GroupInvite::try_from(row)
    }

    async fn accept_invite(
        &self,
        group_id: &GroupId,
        invite_id: &InviteId,
        recipient: &AccountId,
    ) -> Result<GroupMember, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let gid = group_id.0.to_string();
        let recipient_id = recipient.0.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let claimed = sqlx::query(
            "DELETE FROM group_invites
             WHERE id = ?1 AND group_id = ?2 AND recipient_account_id = ?3 AND valid_until > ?4",
        )
        .bind(invite_id.0.to_string())
        .bind(&gid)
        .bind(&recipient_id)
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .rows_affected();

        if claimed == 0 {
            return Err(StoreError::NotFound);
        }

        // A duplicate membership aborts the transaction and keeps the invite.
        let row = sqlx::query_as::<_, MemberRow>(
            "INSERT INTO group_members (group_id, account_id, is_admin, joined_at)
             VALUES (?1, ?2, 0, ?3)
             RETURNING account_id, is_admin, joined_at",
        )
        .bind(&gid)
        .bind(&recipient_id)
        .bind(now_ms)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_err)?;

        sqlx::query("DELETE FROM group_invites WHERE group_id = ?1 AND recipient_account_id = ?2")
            .bind(&gid)
            .bind(&recipient_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        touch(&mut tx, &gid, now_ms).await?;
        tx.commit().await.map_err(backend)?;
        GroupMember::try_from(row)
    }

    async fn deny_invite(
        &self,
        group_id: &GroupId,
        invite_id: &InviteId,
        recipient: &AccountId,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            "DELETE FROM group_invites
             WHERE id = ?1 AND group_id = ?2 AND recipient_account_id = ?3 AND valid_until > ?4",
        )
        .bind(invite_id.0.to_string())
        .bind(group_id.0.to_string())
        .bind(recipient.0.to_string())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn revoke_invite(
        &self,
        group_id: &GroupId,
        invite_id: &InviteId,
        actor: &AccountId,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            "DELETE FROM group_invites
             WHERE id = ?1 AND group_id = ?2 AND valid_until > ?4 AND (
                 sender_account_id = ?3 OR EXISTS (
                     SELECT 1 FROM group_members a
                     WHERE a.group_id = ?2 AND a.account_id = ?3 AND a.is_admin = 1))",
        )
        .bind(invite_id.0.to_string())
        .bind(group_id.0.to_string())
        .bind(actor.0.to_string())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_invites(&self, f: &InviteFilter) -> Result<Vec<GroupInvite>, StoreError> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM group_invites i
             WHERE i.valid_until > ?1
               AND (?2 IS NULL OR i.sender_account_id = ?2)
               AND (?3 IS NULL OR i.recipient_account_id = ?3)
               AND (?4 IS NULL OR i.group_id = ?4)
               AND (i.sender_account_id = ?5 OR i.recipient_account_id = ?5 OR EXISTS (
                   SELECT 1 FROM group_members m WHERE m.group_id = i.group_id AND m.account_id = ?5))
             ORDER BY i.created_at, i.id"
        ))
        .bind(Utc::now().timestamp_millis())
        .bind(f.sender_account_id.as_ref().map(|a| a.0.to_string()))
        .bind(f.recipient_account_id.as_ref().map(|a| a.0.to_string()))
        .bind(f.group_id.as_ref().map(|g| g.0.to_string()))
        .bind(f.viewer.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        convert(rows)
    }

    // ───────────────────────────── Invite Links ─────────────────────────────

    async fn create_invite_link(
        &self,
        p: &CreateInviteLinkParams,
    ) -> Result<GroupInviteLink, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let valid_until_ms = p.valid_until.timestamp_millis();
        let gid = p.group_id.0.to_string();
        let creator = p.generated_by_account_id.0.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "DELETE FROM group_invite_links
             WHERE group_id = ?1 AND generated_by_account_id = ?2 AND valid_until <= ?3",
        )
        .bind(&gid)
        .bind(&creator)
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let inserted = sqlx::query(
            "INSERT INTO group_invite_links
                 (code, group_id, generated_by_account_id, created_at, valid_until)
             SELECT ?1, g.id, ?3, ?4, ?5 FROM groups g
             WHERE g.id = ?2 AND g.workspace_account_id IS NULL AND EXISTS (
                 SELECT 1 FROM group_members a
                 WHERE a.group_id = g.id AND a.account_id = ?3 AND a.is_admin = 1)",
        )
        .bind(&p.code.0)
        .bind(&gid)
        .bind(&creator)
        .bind(now_ms)
        .bind(valid_until_ms)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(backend)?;
        Ok(GroupInviteLink {
            code: p.code.clone(),
            group_id: p.group_id.clone(),
            generated_by_account_id: p.generated_by_account_id.clone(),
            created_at: from_millis(now_ms)?,
            valid_until: from_millis(valid_until_ms)?,
        })
    }

    async fn get_invite_link(
        &self,
        group_id: &GroupId,
        code: &InviteCode,
        account_id: &AccountId,
    ) -> Result<GroupInviteLink, StoreError> {
        let row = sqlx::query_as::<_, InviteLinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM group_invite_links l
             WHERE l.code = ?1 AND l.group_id = ?2 AND l.generated_by_account_id = ?3
               AND l.valid_until > ?4"
        ))
        .bind(&code.0)
        .bind(group_id.0.to_string())
        .bind(account_id.0.to_string())
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        GroupInviteLink::try_from(row)
    }

    async fn list_invite_links(
        &self,
        group_id: &GroupId,
        account_id: &AccountId,
    ) -> Result<Vec<GroupInviteLink>, StoreError> {
        let rows = sqlx::query_as::<_, InviteLinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM group_invite_links l
             WHERE l.group_id = ?1 AND l.generated_by_account_id = ?2 AND l.valid_until > ?3
             ORDER BY l.created_at, l.code"
        ))
        .bind(group_id.0.to_string())
        .bind(account_id.0.to_string())
        .bind(Utc::now().timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        convert(rows)
    }

    async fn revoke_invite_link(
        &self,
        group_id: &GroupId,
        code: &InviteCode,
        account_id: &AccountId,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            "DELETE FROM group_invite_links
             WHERE code = ?1 AND group_id = ?2 AND generated_by_account_id = ?3
               AND valid_until > ?4",
        )
        .bind(&code.0)
        .bind(group_id.0.to_string())
        .bind(account_id.0.to_string())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn use_invite_link(
        &self,
        group_id: &GroupId,
        code: &InviteCode,
        account_id: &AccountId,
    ) -> Result<GroupMember, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let gid = group_id.0.to_string();
        let account = account_id.0.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query_as::<_, MemberRow>(
            "INSERT INTO group_members (group_id, account_id, is_admin, joined_at)
             SELECT l.group_id, ?3, 0, ?4 FROM group_invite_links l
             WHERE l.code = ?1 AND l.group_id = ?2 AND l.valid_until > ?4
               AND NOT EXISTS (
                   SELECT 1 FROM group_members m WHERE m.group_id = l.group_id AND m.account_id = ?3)
             RETURNING account_id, is_admin, joined_at",
        )
        .bind(&code.0)
        .bind(&gid)
        .bind(&account)
        .bind(now_ms)
        .fetch_optional(&mut *tx)
        .await
        .map_err(write_err)?;

        let Some(row) = row else {
            // Holding a live link is what entitles the caller to AlreadyExists.
            let link_active = sqlx::query_as::<_, (i64,)>(
                "SELECT COUNT(*) FROM group_invite_links
                 WHERE code = ?1 AND group_id = ?2 AND valid_until > ?3",
            )
            .bind(&code.0)
            .bind(&gid)
            .bind(now_ms)
            .fetch_one(&mut *tx)
            .await
            .map_err(backend)?
            .0 > 0;
            let already_member = visible_group(&mut tx, group_id, account_id, now_ms)
                .await?
                .is_some();
            return Err(if link_active && already_member {
                StoreError::AlreadyExists
            } else {
                StoreError::NotFound
            });
        };

        sqlx::query("DELETE FROM group_invites WHERE group_id = ?1 AND recipient_account_id = ?2")
            .bind(&gid)
            .bind(&account)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        touch(&mut tx, &gid, now_ms).await?;
        tx.commit().await.map_err(backend)?;
        GroupMember::try_from(row)
    }

    // ───────────────────────────── Accounts ─────────────────────────────

    async fn purge_account(&self, account_id: &AccountId) -> Result<AccountPurge, StoreError> {
        let account = account_id.0.to_string();
        let mut out = AccountPurge::default();

        out.invites_removed = sqlx::query(
            "DELETE FROM group_invites WHERE sender_account_id = ?1 OR recipient_account_id = ?1",
        )
        .bind(&account)
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();

        out.invite_links_removed =
            sqlx::query("DELETE FROM group_invite_links WHERE generated_by_account_id = ?1")
                .bind(&account)
                .execute(&self.pool)
                .await
                .map_err(backend)?
                .rows_affected();

        sqlx::query(
            "DELETE FROM notes WHERE group_id IN (
                 SELECT id FROM groups WHERE workspace_account_id = ?1)",
        )
        .bind(&account)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        out.workspaces_deleted = sqlx::query("DELETE FROM groups WHERE workspace_account_id = ?1")
            .bind(&account)
            .execute(&self.pool)
            .await
            .map_err(backend)?
            .rows_affected();

        out.memberships_removed = sqlx::query("DELETE FROM group_members WHERE account_id = ?1")
            .bind(&account)
            .execute(&self.pool)
            .await
            .map_err(backend)?
            .rows_affected();

        let (promoted, orphaned) = self.repair_groups().await?;
        out.admins_promoted = promoted;
        out.orphaned_groups_deleted = orphaned;

        debug!(account_id = %account, ?out, "account purged");
        Ok(out)
    }
}

impl SqliteStore {
    /// Promote the longest-standing member of every regular group left
    /// without an admin, and delete regular groups left without members.
    ///
    /// Runs over all groups rather than the purged account's, so a retry after
    /// a crash between steps still converges.
    async fn repair_groups(&self) -> Result<(u64, u64), StoreError> {
        let promoted = sqlx::query(
            "UPDATE group_members SET is_admin = 1
             WHERE rowid IN (
                 SELECT (
                     SELECT m.rowid FROM group_members m
                     WHERE m.group_id = g.id ORDER BY m.joined_at, m.rowid LIMIT 1)
                 FROM groups g
                 WHERE g.workspace_account_id IS NULL
                   AND EXISTS (SELECT 1 FROM group_members x WHERE x.group_id = g.id)
                   AND NOT EXISTS (
                       SELECT 1 FROM group_members a WHERE a.group_id = g.id AND a.is_admin = 1))",
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();

        let orphans: Vec<(String,)> = sqlx::query_as(
            "SELECT g.id FROM groups g
             WHERE g.workspace_account_id IS NULL
               AND NOT EXISTS (SELECT 1 FROM group_members m WHERE m.group_id = g.id)",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut deleted = 0;
        for (gid,) in orphans {
            let now_ms = Utc::now().timestamp_millis();
            let mut tx = self.pool.begin().await.map_err(backend)?;
            let n = sqlx::query(
                "DELETE FROM groups WHERE id = ?1 AND workspace_account_id IS NULL
                   AND NOT EXISTS (SELECT 1 FROM group_members m WHERE m.group_id = ?1)",
            )
            .bind(&gid)
            .execute(&mut *tx)
            .await
            .map_err(backend)?
            .rows_affected();
            if n == 0 {
                // Someone joined in the meantime.
                continue;
            }
            let moved = relocate_notes(&mut tx, &gid, now_ms).await?;
            tx.commit().await.map_err(backend)?;
            if moved > 0 {
                warn!(group_id = %gid, notes = moved, "orphaned group deleted, notes relocated");
            }
            deleted += n;
        }

        Ok((promoted, deleted))
    }
}
