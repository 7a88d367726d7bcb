use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, FromRepr};

use crate::error::{Result, SchedulerError};
use crate::scheduler::MemoryState;

/// Memory state seeded into items that predate their first scheduled review.
/// These match the tracker's legacy column defaults.
pub const SEED_STABILITY: f32 = 2.5;
pub const SEED_DIFFICULTY: f32 = 3.5;

/// User feedback on one review, ordered from forgotten to effortless.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    FromRepr,
)]
#[repr(u8)]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    /// Parse the integer form used by review submissions.
    pub fn from_int(rating: u8) -> Result<Self> {
        Self::from_repr(rating).ok_or(SchedulerError::InvalidRating { rating })
    }
}

/// Coarse label shown in the problem table. `Revisited` and `Stuck` are
/// user-curated; the scheduler only ever produces `Solved` and `ToRevise`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Status {
    #[default]
    ToRevise,
    Revisited,
    Stuck,
    Solved,
}

impl Status {
    /// Default policy mapping a review outcome to a status. Callers that want
    /// a different threshold substitute their own function.
    pub fn from_rating(rating: Rating) -> Self {
        if rating >= Rating::Good {
            Status::Solved
        } else {
            Status::ToRevise
        }
    }
}

/// Persisted review state for one tracked problem. The field layout mirrors
/// the item store's columns; `Scheduler::schedule` replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub stability: f32,
    pub difficulty: f32,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
    pub review_count: u32,
    pub last_rating: Option<Rating>,
    pub status: Status,
}

impl CardState {
    /// State for a freshly tracked problem: seed memory, due immediately.
    pub fn new(created: DateTime<Utc>) -> Self {
        Self {
            stability: SEED_STABILITY,
            difficulty: SEED_DIFFICULTY,
            due: created,
            last_review: None,
            review_count: 0,
            last_rating: None,
            status: Status::default(),
        }
    }

    pub fn memory(&self) -> MemoryState {
        MemoryState {
            stability: self.stability,
            difficulty: self.difficulty,
        }
    }

    /// An item is presented for review once its due date has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }

    /// Whole days since the last review, or since creation for items never
    /// rated. The due date doubles as the creation date until the first
    /// review lands. Clamped at zero for clocks that ran backwards.
    pub fn elapsed_days(&self, now: DateTime<Utc>) -> u32 {
        let reference = self.last_review.unwrap_or(self.due);
        (now - reference).num_days().max(0) as u32
    }
}
