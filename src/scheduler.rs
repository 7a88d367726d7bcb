use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::parameters::{
    D_MAX, D_MIN, INIT_S_MAX, Parameters, S_MAX, S_MIN, check_and_fill_parameters, clip_parameters,
};
use crate::review::{CardState, Rating, Status};

/// Recall probability targeted at the moment an item comes due.
pub const DEFAULT_DESIRED_RETENTION: f32 = 0.9;

/// The two continuous quantities the model tracks per item: `stability` is the
/// number of days until recall probability decays to the desired retention,
/// `difficulty` modulates how fast stability grows on success.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MemoryState {
    pub stability: f32,
    pub difficulty: f32,
}

/// Outcome preview for each of the four ratings.
#[derive(Debug, Clone, PartialEq)]
pub struct NextStates {
    pub again: ItemState,
    pub hard: ItemState,
    pub good: ItemState,
    pub easy: ItemState,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ItemState {
    pub memory: MemoryState,
    pub interval: f32,
}

/// This is the main structure provided by this crate. Construct it once at
/// process start and pass it to every call site that applies reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    w: Vec<f32>,
    desired_retention: f32,
}

impl Scheduler {
    /// Parameters may be an empty slice to use the default values instead.
    pub fn new(parameters: &Parameters) -> Result<Self> {
        Self::with_desired_retention(parameters, DEFAULT_DESIRED_RETENTION)
    }

    pub fn with_desired_retention(parameters: &Parameters, desired_retention: f32) -> Result<Self> {
        if !desired_retention.is_finite() || desired_retention <= 0.0 || desired_retention >= 1.0 {
            return Err(SchedulerError::InvalidRetention {
                retention: desired_retention,
            });
        }
        let w = clip_parameters(&check_and_fill_parameters(parameters)?);
        Ok(Self {
            w,
            desired_retention,
        })
    }

    pub fn desired_retention(&self) -> f32 {
        self.desired_retention
    }

    fn decay(&self) -> f32 {
        -self.w[20]
    }

    fn factor(&self) -> f32 {
        0.9f32.powf(1.0 / self.decay()) - 1.0
    }

    /// Probability of recall `t` days after the last review of an item with
    /// the given stability. Decreasing in `t`, increasing in stability, and
    /// exactly 0.9 at `t == stability`.
    pub fn power_forgetting_curve(&self, t: f32, stability: f32) -> f32 {
        (t / stability * self.factor() + 1.0).powf(self.decay())
    }

    /// Days until recall probability decays to the desired retention.
    /// Monotonically increasing in stability; equal to the stability itself
    /// at the default retention of 0.9.
    pub fn next_interval(&self, stability: f32) -> f32 {
        stability / self.factor() * (self.desired_retention.powf(1.0 / self.decay()) - 1.0)
    }

    fn init_stability(&self, rating: Rating) -> f32 {
        self.w[rating as usize - 1].clamp(S_MIN, INIT_S_MAX)
    }

    // Unclamped; call sites clamp, mean reversion wants the raw value.
    fn init_difficulty(&self, rating: Rating) -> f32 {
        self.w[4] - ((rating as u8 as f32 - 1.0) * self.w[5]).exp() + 1.0
    }

    fn stability_after_success(&self, s: f32, d: f32, r: f32, rating: Rating) -> f32 {
        let hard_penalty = if rating == Rating::Hard {
            self.w[15]
        } else {
            1.0
        };
        let easy_bonus = if rating == Rating::Easy {
            self.w[16]
        } else {
            1.0
        };
        (s * (self.w[8].exp()
            * (11.0 - d)
            * s.powf(-self.w[9])
            * (((1.0 - r) * self.w[10]).exp() - 1.0)
            * hard_penalty)
            .mul_add(easy_bonus, 1.0))
        .clamp(S_MIN, S_MAX)
    }

    fn stability_after_failure(&self, s: f32, d: f32, r: f32) -> f32 {
        let new_s_min = s / (self.w[17] * self.w[18]).exp();
        let new_s = (self.w[11]
            * d.powf(-self.w[12])
            * ((s + 1.0).powf(self.w[13]) - 1.0)
            * ((1.0 - r) * self.w[14]).exp())
        .min(new_s_min);
        new_s.clamp(S_MIN, S_MAX)
    }

    fn stability_short_term(&self, s: f32, rating: Rating) -> f32 {
        let sinc =
            (self.w[17] * (rating as u8 as f32 - 3.0 + self.w[18])).exp() * s.powf(-self.w[19]);
        let new_s = s * if rating >= Rating::Good {
            sinc.max(1.0)
        } else {
            sinc
        };
        new_s.clamp(S_MIN, S_MAX)
    }

    fn mean_reversion(&self, new_d: f32) -> f32 {
        self.w[7]
            .mul_add(self.init_difficulty(Rating::Easy) - new_d, new_d)
    }

    fn next_difficulty(&self, d: f32, rating: Rating) -> f32 {
        let delta_d = -self.w[6] * (rating as u8 as f32 - 3.0);
        let new_d = d + delta_d * (10.0 - d) / 9.0;
        self.mean_reversion(new_d).clamp(D_MIN, D_MAX)
    }

    /// One application of the memory-model update rules. `None` means the
    /// item has never been rated; its state is initialized from the rating
    /// alone. `elapsed_days == 0` takes the same-day branch, so a first
    /// review can never divide by zero.
    pub fn next_memory_state(
        &self,
        state: Option<MemoryState>,
        rating: Rating,
        elapsed_days: u32,
    ) -> MemoryState {
        let Some(state) = state else {
            return MemoryState {
                stability: self.init_stability(rating),
                difficulty: self.init_difficulty(rating).clamp(D_MIN, D_MAX),
            };
        };
        let s = state.stability.clamp(S_MIN, S_MAX);
        let d = state.difficulty.clamp(D_MIN, D_MAX);
        let stability = if elapsed_days == 0 {
            self.stability_short_term(s, rating)
        } else {
            let r = self.power_forgetting_curve(elapsed_days as f32, s);
            match rating {
                Rating::Again => self.stability_after_failure(s, d, r),
                _ => self.stability_after_success(s, d, r, rating),
            }
        };
        MemoryState {
            stability,
            difficulty: self.next_difficulty(d, rating),
        }
    }

    /// Next memory state and interval for each possible rating, for preview
    /// surfaces that show all four buttons.
    pub fn next_states(&self, state: Option<MemoryState>, elapsed_days: u32) -> NextStates {
        let next = |rating: Rating| {
            let memory = self.next_memory_state(state.clone(), rating, elapsed_days);
            let interval = self.next_interval(memory.stability);
            ItemState { memory, interval }
        };
        NextStates {
            again: next(Rating::Again),
            hard: next(Rating::Hard),
            good: next(Rating::Good),
            easy: next(Rating::Easy),
        }
    }

    /// Apply one review outcome to a stored card, producing the full
    /// replacement record. Pure and deterministic; elapsed time is measured
    /// from the last review, or from creation for items never rated. The
    /// interval is rounded to whole days with a floor of one, so the new due
    /// date is always in the future relative to `now`.
    pub fn schedule(&self, card: &CardState, rating: Rating, now: DateTime<Utc>) -> CardState {
        let elapsed_days = card.elapsed_days(now);
        let memory = self.next_memory_state(Some(card.memory()), rating, elapsed_days);
        let interval_days = self.next_interval(memory.stability).round().max(1.0) as i64;
        debug!(
            "rating={rating} elapsed={elapsed_days}d stability={:.2} next review in {interval_days}d",
            memory.stability
        );
        CardState {
            stability: memory.stability,
            difficulty: memory.difficulty,
            due: now + Duration::days(interval_days),
            last_review: Some(now),
            review_count: card.review_count + 1,
            last_rating: Some(rating),
            status: Status::from_rating(rating),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestHelper;
    use chrono::TimeZone;

    fn scheduler() -> Scheduler {
        Scheduler::new(&[]).unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn invalid_retention_is_rejected() {
        for retention in [0.0, 1.0, -0.5, f32::NAN] {
            assert!(matches!(
                Scheduler::with_desired_retention(&[], retention),
                Err(SchedulerError::InvalidRetention { .. })
            ));
        }
        assert_eq!(scheduler().desired_retention(), 0.9);
    }

    #[test]
    fn test_power_forgetting_curve() {
        let scheduler = scheduler();
        let retrievability: Vec<f32> = [(0.0, 1.0), (1.0, 2.0), (2.0, 3.0), (3.0, 4.0), (4.0, 4.0), (5.0, 2.0)]
            .into_iter()
            .map(|(t, s)| scheduler.power_forgetting_curve(t, s))
            .collect();
        retrievability.assert_approx_eq([1.0, 0.9403443, 0.9253786, 0.9185229, 0.9, 0.8261359]);
    }

    #[test]
    fn test_init_states() {
        let scheduler = scheduler();
        let init: Vec<MemoryState> = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy]
            .into_iter()
            .map(|rating| scheduler.next_memory_state(None, rating, 0))
            .collect();
        let stability: Vec<f32> = init.iter().map(|state| state.stability).collect();
        let difficulty: Vec<f32> = init.iter().map(|state| state.difficulty).collect();
        stability.assert_approx_eq([0.212, 1.2931, 2.3065, 8.2956]);
        difficulty.assert_approx_eq([6.4133, 5.1121707, 2.118104, 1.0]);
    }

    #[test]
    fn test_next_difficulty() {
        let scheduler = scheduler();
        let difficulty: Vec<f32> = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy]
            .into_iter()
            .map(|rating| scheduler.next_difficulty(5.0, rating))
            .collect();
        difficulty.assert_approx_eq([8.341763, 6.6659956, 4.990228, 3.3144615]);
    }

    #[test]
    fn test_next_stability() {
        let scheduler = scheduler();
        let cases = [
            (1.0, 0.9, Rating::Again),
            (2.0, 0.8, Rating::Hard),
            (3.0, 0.7, Rating::Good),
            (4.0, 0.6, Rating::Easy),
        ];
        let success: Vec<f32> = cases
            .into_iter()
            .map(|(d, r, rating)| scheduler.stability_after_success(5.0, d, r, rating))
            .collect();
        success.assert_approx_eq([25.602521, 28.226571, 58.655991, 127.226693]);

        let failure: Vec<f32> = cases
            .into_iter()
            .map(|(d, r, _)| scheduler.stability_after_failure(5.0, d, r))
            .collect();
        failure.assert_approx_eq([1.0525396, 1.189433, 1.3680839, 1.584989]);

        let short_term: Vec<f32> = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy]
            .into_iter()
            .map(|rating| scheduler.stability_short_term(5.0, rating))
            .collect();
        short_term.assert_approx_eq([1.596818, 2.7470096, 5.0, 8.1296096]);
    }

    #[test]
    fn test_memory_state_sequences() {
        let scheduler = scheduler();
        let cases = [
            (Rating::Again, 1),
            (Rating::Hard, 1),
            (Rating::Good, 1),
            (Rating::Easy, 1),
            (Rating::Again, 2),
            (Rating::Hard, 2),
        ];
        let states: Vec<MemoryState> = cases
            .into_iter()
            .map(|(rating, elapsed)| {
                let first = scheduler.next_memory_state(None, rating, 0);
                scheduler.next_memory_state(Some(first), rating, elapsed)
            })
            .collect();
        let stability: Vec<f32> = states.iter().map(|state| state.stability).collect();
        let difficulty: Vec<f32> = states.iter().map(|state| state.difficulty).collect();
        stability.assert_approx_eq([
            0.1008858, 3.2494118, 7.3153007, 18.0149445, 0.1127982, 4.4694553,
        ]);
        difficulty.assert_approx_eq([
            8.8063045, 6.7404595, 2.1112142, 1.0, 8.8063045, 6.7404595,
        ]);
    }

    #[test]
    fn interval_equals_stability_at_default_retention() {
        let scheduler = scheduler();
        [scheduler.next_interval(5.0)].as_slice().assert_approx_eq([5.0]);
        assert!(scheduler.next_interval(1.0) < scheduler.next_interval(10.0));
        assert!(scheduler.next_interval(10.0) < scheduler.next_interval(100.0));
    }

    #[test]
    fn next_states_grow_with_the_rating() {
        let scheduler = scheduler();
        let states = scheduler.next_states(
            Some(MemoryState {
                stability: 20.0,
                difficulty: 5.0,
            }),
            20,
        );
        assert!(states.again.interval < states.hard.interval);
        assert!(states.hard.interval < states.good.interval);
        assert!(states.good.interval < states.easy.interval);
        assert!(states.again.memory.difficulty > states.hard.memory.difficulty);
        assert!(states.hard.memory.difficulty > states.good.memory.difficulty);
        assert!(states.good.memory.difficulty > states.easy.memory.difficulty);
    }

    #[test]
    fn scheduling_is_deterministic() {
        let scheduler = scheduler();
        let card = CardState::new(at(1));
        let first = scheduler.schedule(&card, Rating::Good, at(4));
        let second = scheduler.schedule(&card, Rating::Good, at(4));
        assert_eq!(first, second);
    }

    #[test]
    fn good_review_of_a_new_item() {
        let scheduler = scheduler();
        let card = CardState::new(at(1));
        let now = at(4);
        let next = scheduler.schedule(&card, Rating::Good, now);

        assert_eq!(next.review_count, 1);
        assert_eq!(next.last_review, Some(now));
        assert_eq!(next.last_rating, Some(Rating::Good));
        assert_eq!(next.status, Status::Solved);
        assert!(next.due > now);
        assert!(next.stability > crate::review::SEED_STABILITY);
        [next.stability, next.difficulty]
            .as_slice()
            .assert_approx_eq([12.351185, 3.4917283]);
        assert_eq!(next.due, now + Duration::days(12));
    }

    #[test]
    fn lapse_shrinks_the_schedule_but_not_below_the_floor() {
        let scheduler = scheduler();
        let card = CardState::new(at(1));
        let reviewed = scheduler.schedule(&card, Rating::Good, at(4));

        let lapsed = scheduler.schedule(&reviewed, Rating::Again, reviewed.due);
        assert!(lapsed.difficulty > reviewed.difficulty);
        assert!(lapsed.stability < reviewed.stability);
        assert!(lapsed.stability > 0.0);
        assert_eq!(lapsed.status, Status::ToRevise);
        assert_eq!(lapsed.review_count, 2);

        let retained = scheduler.schedule(&reviewed, Rating::Good, reviewed.due);
        assert!(lapsed.due - reviewed.due < retained.due - reviewed.due);
        [lapsed.stability, lapsed.difficulty]
            .as_slice()
            .assert_approx_eq([1.5768733, 7.8460037]);
        assert_eq!(lapsed.due, reviewed.due + Duration::days(2));
        assert_eq!(retained.due, reviewed.due + Duration::days(45));
    }

    #[test]
    fn repeated_easy_reviews_never_shorten_the_interval() {
        let scheduler = scheduler();
        let mut card = CardState::new(at(1));
        let mut now = at(1);
        let mut previous_stability = 0.0;
        let mut previous_interval = Duration::zero();
        for _ in 0..8 {
            now = card.due.max(now);
            let next = scheduler.schedule(&card, Rating::Easy, now);
            let interval = next.due - now;
            assert!(next.stability >= previous_stability);
            assert!(interval >= previous_interval);
            assert!(next.difficulty >= 1.0 && next.difficulty <= 10.0);
            previous_stability = next.stability;
            previous_interval = interval;
            card = next;
        }
    }

    #[test]
    fn repeated_failure_stays_positive_and_bounded() {
        let scheduler = scheduler();
        let mut state = MemoryState {
            stability: 0.001,
            difficulty: 9.9,
        };
        for _ in 0..5 {
            state = scheduler.next_memory_state(Some(state), Rating::Again, 1);
            assert!(state.stability > 0.0);
            assert!(state.difficulty >= 1.0 && state.difficulty <= 10.0);
        }
    }

    #[test]
    fn same_day_first_review_is_total() {
        let scheduler = scheduler();
        let card = CardState::new(at(1));
        let next = scheduler.schedule(&card, Rating::Good, at(1));
        assert_eq!(next.stability, 2.5);
        assert!(next.difficulty.is_finite());
        assert!(next.due > at(1));
        assert_eq!(next.review_count, 1);
    }
}
