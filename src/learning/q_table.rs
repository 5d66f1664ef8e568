use std::collections::HashMap;

use rand::{Rng, seq::IndexedRandom};
use strum::{EnumCount, IntoEnumIterator};

use crate::{actions::Action, learning::perceived_state::PerceivedState};

/// One value per action, indexed by `Action::index`.
pub type QRow = [f32; Action::COUNT];

/// Sparse table of action values, populated on first access.
#[derive(Debug, Clone, Default)]
pub struct QTable {
    tab: HashMap<PerceivedState, QRow>,
}

impl QTable {
    pub fn new() -> Self {
        QTable::default()
    }

    /// Row for `state`, materialized at 0.0 for every action if never seen.
    pub fn row_mut(&mut self, state: PerceivedState) -> &mut QRow {
        self.tab.entry(state).or_insert([0.0; Action::COUNT])
    }

    /// Lazy-initializing lookup.
    pub fn value_of(&mut self, state: PerceivedState, action: Action) -> f32 {
        self.row_mut(state)[action.index()]
    }

    pub fn set(&mut self, state: PerceivedState, action: Action, value: f32) {
        self.row_mut(state)[action.index()] = value;
    }

    /// Read-only lookup for reporting. Unseen pairs read as 0.0 and nothing is inserted.
    pub fn peek(&self, state: &PerceivedState, action: Action) -> f32 {
        self.tab
            .get(state)
            .map_or(0.0, |row| row[action.index()])
    }

    pub fn row(&self, state: &PerceivedState) -> Option<&QRow> {
        self.tab.get(state)
    }

    /// Number of materialized states.
    pub fn len(&self) -> usize {
        self.tab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tab.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &PerceivedState> {
        self.tab.keys()
    }

    /// Snapshot of a row as `(action, value)` pairs, in enumeration order.
    pub fn action_values(&self, state: &PerceivedState) -> Option<Vec<(Action, f32)>> {
        self.row(state)
            .map(|row| Action::iter().map(|a| (a, row[a.index()])).collect())
    }

    /// Highest-valued action among `candidates`, exact ties broken uniformly at random.
    /// Returns `(None, 0.0)` when there are no candidates.
    pub fn best_action<R: Rng + ?Sized>(
        &mut self,
        state: PerceivedState,
        candidates: &[Action],
        rng: &mut R,
    ) -> (Option<Action>, f32) {
        let mut q_optimal = f32::NEG_INFINITY;
        let mut optimal: Vec<Action> = Vec::with_capacity(candidates.len());
        for &a in candidates {
            let q_a = self.value_of(state, a);
            if q_a > q_optimal {
                q_optimal = q_a;
                optimal.clear();
                optimal.push(a);
            } else if q_a == q_optimal {
                optimal.push(a);
            }
        }
        match optimal.choose(rng) {
            Some(&a) => (Some(a), q_optimal),
            None => (None, 0.0),
        }
    }
}
