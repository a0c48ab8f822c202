//! Vote aggregation.
//!
//! One vote per `(report, fingerprint)`. A repeat vote of the same type is a
//! no-op that still succeeds; a vote of the other type swings both counters.

use async_trait::async_trait;
use log::{log, Level};
use rand::{distributions::Uniform, Rng};
use serde::Serialize;
use sqlx::{query, query_as, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::schema::db::{Vote, VoteType};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteCounts {
    pub upvotes: i32,
    pub downvotes: i32,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VoteRecordAction {
    Inserted,
    Unchanged,
    Switched { from: VoteType, to: VoteType },
}

impl VoteRecordAction {
    /// `(upvote delta, downvote delta)` this action applies to the report
    /// when `requested` was the vote cast.
    pub fn delta(&self, requested: VoteType) -> (i32, i32) {
        match self {
            VoteRecordAction::Inserted => match requested {
                VoteType::Upvote => (1, 0),
                VoteType::Downvote => (0, 1),
            },
            VoteRecordAction::Unchanged => (0, 0),
            VoteRecordAction::Switched { from, to } => {
                let (mut up, mut down) = (0, 0);
                match from {
                    VoteType::Upvote => up -= 1,
                    VoteType::Downvote => down -= 1,
                }
                match to {
                    VoteType::Upvote => up += 1,
                    VoteType::Downvote => down += 1,
                }
                (up, down)
            }
        }
    }
}

/// Decides what a vote does given the voter's current vote on the report.
pub fn plan_vote(existing: Option<VoteType>, requested: VoteType) -> VoteRecordAction {
    match existing {
        None => VoteRecordAction::Inserted,
        Some(current) if current == requested => VoteRecordAction::Unchanged,
        Some(current) => VoteRecordAction::Switched {
            from: current,
            to: requested,
        },
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub upvotes: i32,
    pub downvotes: i32,
    pub action: VoteRecordAction,
}

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("report {0} does not exist")]
    ReportNotFound(Uuid),
    #[error("vote store failure: {0}")]
    Store(#[from] anyhow::Error),
}

#[async_trait]
pub trait VoteStore: Send {
    async fn report_counts(&mut self, report_id: Uuid) -> anyhow::Result<Option<VoteCounts>>;

    async fn find_vote(&mut self, report_id: Uuid, fingerprint: &str)
        -> anyhow::Result<Option<Vote>>;

    async fn insert_vote(
        &mut self,
        report_id: Uuid,
        fingerprint: &str,
        vote_type: VoteType,
    ) -> anyhow::Result<()>;

    async fn update_vote_type(&mut self, vote_id: Uuid, vote_type: VoteType) -> anyhow::Result<()>;

    /// Applies the delta to the stored counters and returns the new values.
    async fn adjust_counts(
        &mut self,
        report_id: Uuid,
        upvotes: i32,
        downvotes: i32,
    ) -> anyhow::Result<VoteCounts>;
}

pub async fn cast_vote<S: VoteStore + ?Sized>(
    store: &mut S,
    report_id: Uuid,
    fingerprint: &str,
    vote_type: VoteType,
) -> Result<VoteOutcome, VoteError> {
    let counts = store
        .report_counts(report_id)
        .await?
        .ok_or(VoteError::ReportNotFound(report_id))?;
    let existing = store.find_vote(report_id, fingerprint).await?;
    let action = plan_vote(existing.as_ref().map(|v| v.vote_type), vote_type);

    let (up, down) = action.delta(vote_type);
    let counts = match (action, existing) {
        (VoteRecordAction::Unchanged, _) => counts,
        (VoteRecordAction::Switched { .. }, Some(vote)) => {
            store.update_vote_type(vote.id, vote_type).await?;
            store.adjust_counts(report_id, up, down).await?
        }
        _ => {
            store.insert_vote(report_id, fingerprint, vote_type).await?;
            store.adjust_counts(report_id, up, down).await?
        }
    };

    log!(
        Level::Debug,
        "vote {vote_type} on {report_id}: {action:?} -> {}/{}",
        counts.upvotes,
        counts.downvotes
    );

    Ok(VoteOutcome {
        upvotes: counts.upvotes,
        downvotes: counts.downvotes,
        action,
    })
}

/// Short random base36 token identifying an anonymous voter.
pub fn generate_fingerprint() -> String {
    random_base36(12)
}

pub fn random_base36(len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    rand::thread_rng()
        .sample_iter(Uniform::from(0..ALPHABET.len()))
        .take(len)
        .map(|i| ALPHABET[i] as char)
        .collect()
}

pub fn is_valid_fingerprint(fingerprint: &str) -> bool {
    !fingerprint.trim().is_empty() && fingerprint.len() <= 64
}

/// Vote store running inside a single transaction; dropping it without
/// [`PgVoteStore::commit`] rolls every write back.
pub struct PgVoteStore<'a> {
    tx: Transaction<'a, Postgres>,
}

impl<'a> PgVoteStore<'a> {
    pub fn new(tx: Transaction<'a, Postgres>) -> Self {
        Self { tx }
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}

#[async_trait]
impl<'a> VoteStore for PgVoteStore<'a> {
    async fn report_counts(&mut self, report_id: Uuid) -> anyhow::Result<Option<VoteCounts>> {
        let row: Option<(i32, i32)> =
            sqlx::query_as("SELECT upvotes, downvotes FROM reports WHERE id = $1 FOR UPDATE")
                .bind(report_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(row.map(|(upvotes, downvotes)| VoteCounts { upvotes, downvotes }))
    }

    async fn find_vote(
        &mut self,
        report_id: Uuid,
        fingerprint: &str,
    ) -> anyhow::Result<Option<Vote>> {
        Ok(query_as::<_, Vote>(
            "SELECT id, report_id, user_fingerprint, vote_type FROM votes
            WHERE report_id = $1 AND user_fingerprint = $2",
        )
        .bind(report_id)
        .bind(fingerprint)
        .fetch_optional(&mut *self.tx)
        .await?)
    }

    async fn insert_vote(
        &mut self,
        report_id: Uuid,
        fingerprint: &str,
        vote_type: VoteType,
    ) -> anyhow::Result<()> {
        query("INSERT INTO votes (report_id, user_fingerprint, vote_type) VALUES ($1, $2, $3)")
            .bind(report_id)
            .bind(fingerprint)
            .bind(vote_type)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_vote_type(&mut self, vote_id: Uuid, vote_type: VoteType) -> anyhow::Result<()> {
        query("UPDATE votes SET vote_type = $2 WHERE id = $1")
            .bind(vote_id)
            .bind(vote_type)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn adjust_counts(
        &mut self,
        report_id: Uuid,
        upvotes: i32,
        downvotes: i32,
    ) -> anyhow::Result<VoteCounts> {
        let (upvotes, downvotes): (i32, i32) = sqlx::query_as(
            "UPDATE reports SET upvotes = upvotes + $2, downvotes = downvotes + $3
            WHERE id = $1 RETURNING upvotes, downvotes",
        )
        .bind(report_id)
        .bind(upvotes)
        .bind(downvotes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(VoteCounts { upvotes, downvotes })
    }
}
