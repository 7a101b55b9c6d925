use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::domain::{ChatId, UserId};

use super::evaluator::{self, GroupState, Outcome};

/// In-memory counting state for every group the bot has seen.
///
/// Each group sits behind its own lock; the outer map lock is only held while
/// looking up or inserting an entry. Evaluations in one group are serialized,
/// different groups never contend.
#[derive(Default)]
pub struct GroupStore {
    groups: Mutex<HashMap<ChatId, Arc<Mutex<GroupState>>>>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, group: ChatId) -> Arc<Mutex<GroupState>> {
        let mut map = self.groups.lock().await;
        map.entry(group)
            .or_insert_with(|| Arc::new(Mutex::new(GroupState::default())))
            .clone()
    }

    /// Snapshot of the group's state, creating a fresh one on first access.
    pub async fn get_or_create(&self, group: ChatId) -> GroupState {
        let entry = self.entry(group).await;
        let state = *entry.lock().await;
        state
    }

    /// Run the evaluator for one message and commit the resulting state.
    pub async fn evaluate(&self, group: ChatId, contributor: UserId, content: &str) -> Outcome {
        let entry = self.entry(group).await;
        let mut state = entry.lock().await;
        let (next, outcome) = evaluator::evaluate(content, contributor, &state);
        *state = next;
        outcome
    }

    /// Zero the running count. The high score is kept.
    pub async fn reset(&self, group: ChatId) {
        let entry = self.entry(group).await;
        entry.lock().await.reset();
    }

    pub async fn count(&self, group: ChatId) -> u64 {
        self.get_or_create(group).await.current_count
    }

    pub async fn high_score(&self, group: ChatId) -> u64 {
        self.get_or_create(group).await.high_score
    }

    pub async fn group_count(&self) -> usize {
        self.groups.lock().await.len()
    }
}
