use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;
use super::store::{
    IdeaStore, check_owner, check_page_bounds, generate_token, group_not_found, idea_not_found,
    summarize_groups,
};
use super::types::*;

/// Draws before giving up on finding an unissued token.
const TOKEN_ATTEMPTS: usize = 8;

const IDEA_COLUMNS: &str = "id, shareable_id, group_id, creator_id, sort_order, title, description, \
     votes_super_like, votes_up, votes_neutral, views, created_at";

#[derive(sqlx::FromRow)]
struct IdeaRow {
    id: i64,
    shareable_id: String,
    group_id: String,
    creator_id: String,
    sort_order: i32,
    title: String,
    description: String,
    votes_super_like: i64,
    votes_up: i64,
    votes_neutral: i64,
    views: i64,
    created_at: DateTime<Utc>,
}

impl From<IdeaRow> for Idea {
    fn from(row: IdeaRow) -> Self {
        Idea {
            id: row.id,
            shareable_id: row.shareable_id,
            group_id: row.group_id,
            creator_id: row.creator_id,
            order: row.sort_order,
            title: row.title,
            description: row.description,
            votes: VoteCounts {
                super_like: row.votes_super_like,
                up: row.votes_up,
                neutral: row.votes_neutral,
            },
            views: row.views,
            created_at: row.created_at,
        }
    }
}

/// `IdeaStore` backed by Postgres. Counter updates are single `UPDATE ... RETURNING`
/// statements, so concurrent votes never read-modify-write.
#[derive(Clone)]
pub struct PgIdeaStore {
    pool: PgPool,
}

impl PgIdeaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Record a fresh token in `issued_tokens` and return it.
async fn claim_token(conn: &mut PgConnection) -> Result<String, AppError> {
    for _ in 0..TOKEN_ATTEMPTS {
        let token = generate_token();
        let claimed =
            sqlx::query("INSERT INTO issued_tokens (token) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(&token)
                .execute(&mut *conn)
                .await?;
        if claimed.rows_affected() == 1 {
            return Ok(token);
        }
        log::warn!("Token {} already issued, drawing another", token);
    }
    Err(AppError::Internal("could not allocate an unused token".to_string()))
}

async fn insert_ideas(
    conn: &mut PgConnection,
    group_id: &str,
    creator_id: &str,
    ideas: &[IdeaInput],
) -> Result<Vec<Idea>, AppError> {
    let sql = format!(
        "INSERT INTO ideas (shareable_id, group_id, creator_id, sort_order, title, description) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {IDEA_COLUMNS}"
    );

    let mut created = Vec::with_capacity(ideas.len());
    for (index, idea) in ideas.iter().enumerate() {
        let shareable_id = claim_token(&mut *conn).await?;
        let row = sqlx::query_as::<_, IdeaRow>(&sql)
            .bind(shareable_id)
            .bind(group_id)
            .bind(creator_id)
            .bind(index as i32)
            .bind(&idea.title)
            .bind(&idea.description)
            .fetch_one(&mut *conn)
            .await?;
        created.push(Idea::from(row));
    }
    Ok(created)
}

/// Lock the group and verify the caller owns it.
///
/// The advisory lock serializes writers per group, so a waiting writer reads
/// the rows the previous one committed rather than the ones it deleted.
async fn lock_owned_group(
    conn: &mut PgConnection,
    group_id: &str,
    creator_id: &str,
) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(group_id)
        .execute(&mut *conn)
        .await?;

    let owners: Vec<(String,)> =
        sqlx::query_as("SELECT creator_id FROM ideas WHERE group_id = $1 FOR UPDATE")
            .bind(group_id)
            .fetch_all(&mut *conn)
            .await?;

    let (owner,) = owners.first().ok_or_else(|| group_not_found(group_id))?;
    check_owner(group_id, owner, creator_id)
}

#[async_trait]
impl IdeaStore for PgIdeaStore {
    async fn create_group(
        &self,
        creator_id: &str,
        ideas: &[IdeaInput],
    ) -> Result<GroupCreated, AppError> {
        let mut tx = self.pool.begin().await?;
        let group_id = claim_token(&mut tx).await?;
        let created = insert_ideas(&mut tx, &group_id, creator_id, ideas).await?;
        tx.commit().await?;

        log::info!("Created group {} with {} ideas", group_id, created.len());

        Ok(GroupCreated {
            group_title: created.first().map(|i| i.title.clone()).unwrap_or_default(),
            group_id,
            count: created.len(),
        })
    }

    async fn list_page(
        &self,
        group_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<IdeaPage, AppError> {
        check_page_bounds(offset, limit)?;

        // Count, title and slice must come from one snapshot.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let (total, group_title): (i64, Option<String>) = sqlx::query_as(
            "SELECT COUNT(*), \
                    (SELECT title FROM ideas WHERE group_id = $1 ORDER BY sort_order, id LIMIT 1) \
             FROM ideas WHERE group_id = $1",
        )
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await?;

        if total == 0 {
            return Err(group_not_found(group_id));
        }

        let rows = sqlx::query_as::<_, IdeaRow>(&format!(
            "SELECT {IDEA_COLUMNS} FROM ideas WHERE group_id = $1 \
             ORDER BY sort_order, id OFFSET $2 LIMIT $3"
        ))
        .bind(group_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let ideas: Vec<Idea> = rows.into_iter().map(Idea::from).collect();
        Ok(IdeaPage {
            pagination: Pagination::new(offset, limit, total, ideas.len()),
            ideas,
            group_title: group_title.unwrap_or_default(),
        })
    }

    async fn replace_group(
        &self,
        group_id: &str,
        creator_id: &str,
        ideas: &[IdeaInput],
    ) -> Result<GroupReplaced, AppError> {
        let mut tx = self.pool.begin().await?;
        lock_owned_group(&mut tx, group_id, creator_id).await?;

        sqlx::query("DELETE FROM ideas WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        let created = insert_ideas(&mut tx, group_id, creator_id, ideas).await?;
        tx.commit().await?;

        log::info!("Replaced group {} with {} ideas", group_id, created.len());

        Ok(GroupReplaced {
            group_id: group_id.to_string(),
            group_title: created.first().map(|i| i.title.clone()).unwrap_or_default(),
            ideas: created,
        })
    }

    async fn delete_group(&self, group_id: &str, creator_id: &str) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        lock_owned_group(&mut tx, group_id, creator_id).await?;

        let result = sqlx::query("DELETE FROM ideas WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        log::info!("Deleted group {} ({} ideas)", group_id, result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn find_idea(&self, shareable_id: &str) -> Result<Option<Idea>, AppError> {
        let row = sqlx::query_as::<_, IdeaRow>(&format!(
            "SELECT {IDEA_COLUMNS} FROM ideas WHERE shareable_id = $1"
        ))
        .bind(shareable_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Idea::from))
    }

    async fn submit_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, AppError> {
        let column = vote.column();
        let row = sqlx::query_as::<_, IdeaRow>(&format!(
            "UPDATE ideas SET {column} = {column} + 1 WHERE shareable_id = $1 \
             RETURNING {IDEA_COLUMNS}"
        ))
        .bind(shareable_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Idea::from).ok_or_else(|| idea_not_found(shareable_id))
    }

    async fn undo_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, AppError> {
        let column = vote.column();
        let row = sqlx::query_as::<_, IdeaRow>(&format!(
            "UPDATE ideas SET {column} = {column} - 1 WHERE shareable_id = $1 AND {column} > 0 \
             RETURNING {IDEA_COLUMNS}"
        ))
        .bind(shareable_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Idea::from(row)),
            None => {
                let idea = self
                    .find_idea(shareable_id)
                    .await?
                    .ok_or_else(|| idea_not_found(shareable_id))?;
                log::debug!("Undo {} on {} ignored: counter already zero", vote, shareable_id);
                Ok(idea)
            }
        }
    }

    async fn increment_view(&self, shareable_id: &str) -> Result<i64, AppError> {
        let views: Option<(i64,)> = sqlx::query_as(
            "UPDATE ideas SET views = views + 1 WHERE shareable_id = $1 RETURNING views",
        )
        .bind(shareable_id)
        .fetch_optional(&self.pool)
        .await?;

        views.map(|(v,)| v).ok_or_else(|| idea_not_found(shareable_id))
    }

    async fn groups_for_creator(&self, creator_id: &str) -> Result<Vec<GroupSummary>, AppError> {
        let rows = sqlx::query_as::<_, IdeaRow>(&format!(
            "SELECT {IDEA_COLUMNS} FROM ideas WHERE creator_id = $1 ORDER BY group_id, sort_order, id"
        ))
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(summarize_groups(rows.into_iter().map(Idea::from).collect()))
    }
}
