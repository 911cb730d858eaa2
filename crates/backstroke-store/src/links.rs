//! Link and user rows

use crate::{from_millis, to_millis, Database, StoreError};
use async_trait::async_trait;
use backstroke_domain::traits::LinkRepository;
use backstroke_domain::{
    ForkDescriptor, ForkType, Link, LinkId, LinkSyncCandidate, RepositoryError,
    UpstreamDescriptor, UpstreamType, User, UserId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const LINK_COLUMNS: &str = "l.id, l.name, l.enabled, l.webhook_id, l.last_synced_at,
    l.upstream_type, l.upstream_owner, l.upstream_repo, l.upstream_is_fork,
    l.upstream_branches, l.upstream_branch, l.upstream_last_sha,
    l.fork_type, l.fork_owner, l.fork_repo, l.fork_branches, l.fork_branch,
    l.owner_id";

/// Number of columns in [`LINK_COLUMNS`]; user columns follow at this offset
const LINK_COLUMN_COUNT: usize = 18;

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.github_id, u.access_token,
    u.public_scope, u.created_at, u.last_logged_in_at";

/// SQLite-based implementation of [`LinkRepository`]
///
/// Beyond the trait, exposes the few inserts and lookups needed to seed a
/// database; full link/user CRUD belongs to the web application.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Create a store over an open database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the database at `path` and create a store over it
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use backstroke_store::SqliteStore;
    ///
    /// let store = SqliteStore::open("backstroke.db").unwrap();
    /// ```
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Insert a user, keeping its id
    pub fn insert_user(&self, user: &User) -> Result<UserId, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, github_id, access_token, public_scope, created_at, last_logged_in_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.id.0,
                    &user.username,
                    &user.email,
                    &user.github_id,
                    &user.access_token,
                    user.public_scope,
                    to_millis(user.created_at),
                    to_millis(user.last_logged_in_at),
                ],
            )?;
            Ok(user.id)
        })
    }

    /// Insert a link, keeping its id
    pub fn insert_link(&self, link: &Link) -> Result<LinkId, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO links (id, name, enabled, webhook_id, last_synced_at,
                    upstream_type, upstream_owner, upstream_repo, upstream_is_fork,
                    upstream_branches, upstream_branch, upstream_last_sha,
                    fork_type, fork_owner, fork_repo, fork_branches, fork_branch, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    link.id.0,
                    &link.name,
                    link.enabled,
                    &link.webhook_id,
                    to_millis(link.last_synced_at),
                    link.upstream.kind.map(|k| k.as_str()),
                    &link.upstream.owner,
                    &link.upstream.repo,
                    link.upstream.is_fork,
                    &link.upstream.branches,
                    &link.upstream.branch,
                    &link.upstream.last_sha,
                    link.fork.kind.map(|k| k.as_str()),
                    &link.fork.owner,
                    &link.fork.repo,
                    &link.fork.branches,
                    &link.fork.branch,
                    link.owner_id.map(|id| id.0),
                ],
            )?;
            Ok(link.id)
        })
    }

    /// Get a link by id
    pub fn get_link(&self, id: LinkId) -> Result<Option<Link>, StoreError> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {} FROM links l WHERE l.id = ?1", LINK_COLUMNS);
            let link = conn
                .query_row(&sql, params![id.0], |row| link_from_row(row))
                .optional()?;
            Ok(link)
        })
    }

    /// Links due for a sync check, joined with their owners
    ///
    /// Links without an owner row are never candidates.
    pub fn sync_candidates(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<LinkSyncCandidate>, StoreError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, {}
                 FROM links l JOIN users u ON u.id = l.owner_id
                 WHERE l.name != ''
                   AND l.enabled = 1
                   AND l.last_synced_at < ?1
                   AND l.upstream_type IS NOT NULL
                   AND l.upstream_owner IS NOT NULL
                   AND l.upstream_repo IS NOT NULL
                   AND l.fork_type IS NOT NULL
                   AND l.fork_owner IS NOT NULL
                   AND l.fork_repo IS NOT NULL
                 ORDER BY l.id",
                LINK_COLUMNS, USER_COLUMNS
            );

            let mut stmt = conn.prepare(&sql)?;
            let candidates = stmt
                .query_map(params![to_millis(older_than)], |row| {
                    Ok(LinkSyncCandidate {
                        link: link_from_row(row)?,
                        owner: user_from_row(row, LINK_COLUMN_COUNT)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(candidates)
        })
    }

    /// Set `last_synced_at` and `upstream_last_sha` on exactly one link
    pub fn update_sync_check(
        &self,
        id: LinkId,
        checked_at: DateTime<Utc>,
        upstream_sha: Option<&str>,
    ) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE links SET last_synced_at = ?1, upstream_last_sha = ?2 WHERE id = ?3",
                params![to_millis(checked_at), upstream_sha, id.0],
            )?;

            if changed == 0 {
                return Err(StoreError::NotFound(format!("link {}", id)));
            }
            Ok(())
        })
    }
}

#[async_trait]
impl LinkRepository for SqliteStore {
    async fn find_sync_candidates(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<LinkSyncCandidate>, RepositoryError> {
        Ok(self.sync_candidates(older_than)?)
    }

    async fn record_sync_check(
        &self,
        id: LinkId,
        checked_at: DateTime<Utc>,
        upstream_sha: Option<&str>,
    ) -> Result<(), RepositoryError> {
        match self.update_sync_check(id, checked_at, upstream_sha) {
            Err(StoreError::NotFound(_)) => Err(RepositoryError::NotFound(id)),
            other => Ok(other?),
        }
    }
}

fn conversion_error(index: usize, err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Integer, Box::new(err))
}

fn timestamp_at(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    from_millis(row.get(index)?).map_err(|e| conversion_error(index, e))
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    let upstream_type: Option<String> = row.get(5)?;
    let upstream_kind = upstream_type
        .map(|s| {
            UpstreamType::parse(&s).ok_or_else(|| {
                conversion_error(5, StoreError::InvalidData(format!("Unknown upstream type: {}", s)))
            })
        })
        .transpose()?;

    let fork_type: Option<String> = row.get(12)?;
    let fork_kind = fork_type
        .map(|s| {
            ForkType::parse(&s).ok_or_else(|| {
                conversion_error(12, StoreError::InvalidData(format!("Unknown fork type: {}", s)))
            })
        })
        .transpose()?;

    Ok(Link {
        id: LinkId(row.get(0)?),
        name: row.get(1)?,
        enabled: row.get(2)?,
        webhook_id: row.get(3)?,
        last_synced_at: timestamp_at(row, 4)?,
        upstream: UpstreamDescriptor {
            kind: upstream_kind,
            owner: row.get(6)?,
            repo: row.get(7)?,
            is_fork: row.get(8)?,
            branches: row.get(9)?,
            branch: row.get(10)?,
            last_sha: row.get(11)?,
        },
        fork: ForkDescriptor {
            kind: fork_kind,
            owner: row.get(13)?,
            repo: row.get(14)?,
            branches: row.get(15)?,
            branch: row.get(16)?,
        },
        owner_id: row.get::<_, Option<i64>>(17)?.map(UserId),
    })
}

fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(offset)?),
        username: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        github_id: row.get(offset + 3)?,
        access_token: row.get(offset + 4)?,
        public_scope: row.get(offset + 5)?,
        created_at: timestamp_at(row, offset + 6)?,
        last_logged_in_at: timestamp_at(row, offset + 7)?,
    })
}
