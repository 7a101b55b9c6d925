use serde::Serialize;

use crate::domain::UserId;

use super::expr::parse_integer;

/// Counting state of one group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GroupState {
    /// Last successfully accepted number.
    pub current_count: u64,
    /// Highest count reached before any break.
    pub high_score: u64,
    /// Who posted `current_count`; `None` at 0 or right after a reset.
    pub last_contributor: Option<UserId>,
}

impl GroupState {
    /// Clear the running sequence. The high score survives.
    pub fn reset(&mut self) {
        self.current_count = 0;
        self.last_contributor = None;
    }

    /// Next number the group is expected to post. Widened so the successor of
    /// `u64::MAX` is still exact rather than clamped.
    pub fn expected(&self) -> u128 {
        u128::from(self.current_count) + 1
    }
}

/// Why a sequence was broken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakReason {
    /// The posted number was not `current_count + 1`.
    WrongNumber { expected: u128, got: i128 },
    /// Right number, but the same person counted twice in a row.
    SelfConsecutive,
}

/// What the messaging layer should do with an incoming message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Not a number; leave the message alone.
    Ignore,
    /// Valid continuation: acknowledge and announce `new_count`.
    Accept { new_count: u64 },
    /// Sequence broken at `broken_at`: suppress the message and announce the break.
    Reject {
        broken_at: u64,
        new_high_score: Option<u64>,
        reason: BreakReason,
    },
}

/// Decide what `content` posted by `contributor` does to `state`.
///
/// Pure: returns the next state alongside the outcome and never fails.
pub fn evaluate(content: &str, contributor: UserId, state: &GroupState) -> (GroupState, Outcome) {
    let Some(number) = parse_integer(content) else {
        return (*state, Outcome::Ignore);
    };

    let expected = state.expected();
    // A counter at u64::MAX has no representable successor, so nothing matches.
    let next_count = u64::try_from(number)
        .ok()
        .filter(|&n| u128::from(n) == expected);

    if let Some(new_count) = next_count {
        if state.last_contributor != Some(contributor) {
            let next = GroupState {
                current_count: new_count,
                high_score: state.high_score,
                last_contributor: Some(contributor),
            };
            return (next, Outcome::Accept { new_count });
        }
    }

    let reason = if next_count.is_some() {
        BreakReason::SelfConsecutive
    } else {
        BreakReason::WrongNumber {
            expected,
            got: number,
        }
    };

    let broken_at = state.current_count;
    let mut next = *state;
    let new_high_score = if broken_at > state.high_score {
        next.high_score = broken_at;
        Some(broken_at)
    } else {
        None
    };
    next.reset();

    (
        next,
        Outcome::Reject {
            broken_at,
            new_high_score,
            reason,
        },
    )
}
