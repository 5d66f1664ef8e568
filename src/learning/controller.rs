use rand::{Rng, rngs::StdRng, seq::IndexedRandom};

use crate::{
    actions::Action,
    agent::AgentState,
    learning::{
        perceived_state::PerceivedState,
        policy::{EXPLOIT_PROBABILITY, Policy},
        q_table::QTable,
        reward::Reward,
    },
};

/// The learner behind one agent. Owns the agent's value table and its random source.
#[derive(Debug, Clone)]
pub struct LearningController {
    pub q_table: QTable,
    learning_rate: f32,
    discount_factor: f32,
    rng: StdRng,
}

impl LearningController {
    pub fn new(learning_rate: f32, discount_factor: f32, rng: StdRng) -> Self {
        LearningController {
            q_table: QTable::new(),
            learning_rate,
            discount_factor,
            rng,
        }
    }

    pub fn current_state(&self, agent: &AgentState, other: &AgentState) -> PerceivedState {
        PerceivedState::observe(agent, other)
    }

    pub fn value_of(&mut self, state: PerceivedState, action: Action) -> f32 {
        self.q_table.value_of(state, action)
    }

    pub fn best_action(
        &mut self,
        state: PerceivedState,
        candidates: &[Action],
    ) -> (Option<Action>, f32) {
        self.q_table.best_action(state, candidates, &mut self.rng)
    }

    /// Choose an action from `candidates`. Pickup, then Dropoff, are always taken
    /// when available, whatever the policy.
    pub fn select_action(
        &mut self,
        policy: Policy,
        state: PerceivedState,
        candidates: &[Action],
    ) -> Option<Action> {
        if candidates.is_empty() {
            return None;
        }
        if candidates.contains(&Action::Pickup) {
            return Some(Action::Pickup);
        }
        if candidates.contains(&Action::Dropoff) {
            return Some(Action::Dropoff);
        }
        match policy {
            Policy::PRandom => candidates.choose(&mut self.rng).copied(),
            Policy::PGreedy => self.best_action(state, candidates).0,
            Policy::PExploit => {
                let (best, _) = self.best_action(state, candidates);
                if self.rng.random::<f64>() < EXPLOIT_PROBABILITY {
                    return best;
                }
                let others: Vec<Action> = candidates
                    .iter()
                    .copied()
                    .filter(|a| Some(*a) != best)
                    .collect();
                others.choose(&mut self.rng).copied().or(best)
            }
        }
    }

    fn blend(&mut self, state: PerceivedState, action: Action, reward: Reward, next_q: f32) {
        let old_q = self.q_table.value_of(state, action);
        let temporal_difference = reward.as_f32() + self.discount_factor * next_q - old_q;
        self.q_table
            .set(state, action, old_q + self.learning_rate * temporal_difference);
    }

    /// Off-policy update: bootstrap from the best action available in `new_state`.
    pub fn update_q_learning(
        &mut self,
        old_state: PerceivedState,
        action: Action,
        reward: Reward,
        new_state: PerceivedState,
        new_candidates: &[Action],
    ) {
        let (_, max_next_q) = self.best_action(new_state, new_candidates);
        self.blend(old_state, action, reward, max_next_q);
    }

    /// On-policy update: bootstrap from the action actually chosen in `new_state`.
    pub fn update_sarsa(
        &mut self,
        old_state: PerceivedState,
        action: Action,
        reward: Reward,
        new_state: PerceivedState,
        next_action: Option<Action>,
    ) {
        let next_q = next_action.map_or(0.0, |a| self.q_table.value_of(new_state, a));
        self.blend(old_state, action, reward, next_q);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::Position;

    const EPS: f32 = 1e-5;

    fn controller(seed: u64) -> LearningController {
        LearningController::new(0.3, 0.5, StdRng::seed_from_u64(seed))
    }

    fn s0() -> PerceivedState {
        PerceivedState::new(Position::new(1, 2), false, Position::new(4, 2))
    }

    fn s1() -> PerceivedState {
        PerceivedState::new(Position::new(1, 2), true, Position::new(4, 2))
    }

    const MOVES: [Action; 4] = [Action::North, Action::South, Action::East, Action::West];

    #[test]
    fn test_current_state() {
        let c = controller(0);
        let f = AgentState::new("F", Position::new(0, 2));
        let m = AgentState::new("M", Position::new(4, 2));
        assert_eq!(
            c.current_state(&f, &m),
            PerceivedState::new(Position::new(0, 2), false, Position::new(4, 2))
        );
    }

    #[test]
    fn test_pickup_precedence() {
        let mut c = controller(3);
        let mut candidates = MOVES.to_vec();
        candidates.push(Action::Pickup);
        c.q_table.set(s0(), Action::East, 100.0);
        for policy in Policy::iter() {
            for _ in 0..50 {
                assert_eq!(
                    c.select_action(policy, s0(), &candidates),
                    Some(Action::Pickup)
                );
            }
        }
    }

    #[test]
    fn test_dropoff_precedence() {
        let mut c = controller(4);
        let mut candidates = MOVES.to_vec();
        candidates.push(Action::Dropoff);
        for policy in Policy::iter() {
            for _ in 0..50 {
                assert_eq!(
                    c.select_action(policy, s1(), &candidates),
                    Some(Action::Dropoff)
                );
            }
        }
    }

    #[test]
    fn test_empty_candidates() {
        let mut c = controller(0);
        for policy in Policy::iter() {
            assert_eq!(c.select_action(policy, s0(), &[]), None);
        }
    }

    #[test]
    fn test_greedy_follows_table() {
        let mut c = controller(5);
        c.q_table.set(s0(), Action::West, 0.5);
        for _ in 0..50 {
            assert_eq!(
                c.select_action(Policy::PGreedy, s0(), &MOVES),
                Some(Action::West)
            );
        }
    }

    #[test]
    fn test_random_covers_candidates() {
        let mut c = controller(6);
        c.q_table.set(s0(), Action::West, 0.5);
        let seen: HashSet<Action> = (0..200)
            .filter_map(|_| c.select_action(Policy::PRandom, s0(), &MOVES))
            .collect();
        assert_eq!(seen.len(), MOVES.len());
    }

    #[test]
    fn test_exploit_mostly_best() {
        let mut c = controller(8);
        c.q_table.set(s0(), Action::South, 1.0);
        let trials = 2000;
        let picks: Vec<Action> = (0..trials)
            .filter_map(|_| c.select_action(Policy::PExploit, s0(), &MOVES))
            .collect();
        let best = picks.iter().filter(|&&a| a == Action::South).count();
        let ratio = best as f64 / trials as f64;
        assert!((0.74..0.86).contains(&ratio), "ratio was {ratio}");
        let explored: HashSet<Action> = picks.into_iter().filter(|&a| a != Action::South).collect();
        assert_eq!(explored.len(), 3);
    }

    #[test]
    fn test_exploit_single_candidate() {
        let mut c = controller(9);
        for _ in 0..50 {
            assert_eq!(
                c.select_action(Policy::PExploit, s0(), &[Action::North]),
                Some(Action::North)
            );
        }
    }

    #[test]
    fn test_q_learning_update() {
        let mut c = controller(0);
        c.q_table.set(s1(), Action::North, 2.0);
        c.q_table.set(s1(), Action::South, -4.0);
        c.update_q_learning(
            s0(),
            Action::Pickup,
            Reward::new(13),
            s1(),
            &[Action::North, Action::South],
        );
        // 0.0 + 0.3 * (13 + 0.5 * 2.0 - 0.0)
        assert!((c.value_of(s0(), Action::Pickup) - 4.2).abs() < EPS);
    }

    #[test]
    fn test_q_learning_update_without_next_actions() {
        let mut c = controller(0);
        c.q_table.set(s0(), Action::East, 1.0);
        c.update_q_learning(s0(), Action::East, Reward::new(-1), s1(), &[]);
        // 1.0 + 0.3 * (-1 + 0.0 - 1.0)
        assert!((c.value_of(s0(), Action::East) - 0.4).abs() < EPS);
    }

    #[test]
    fn test_sarsa_uses_chosen_action() {
        let mut q = controller(0);
        let mut sarsa = controller(0);
        for c in [&mut q, &mut sarsa] {
            c.q_table.set(s1(), Action::North, 2.0);
            c.q_table.set(s1(), Action::South, -4.0);
        }
        let next = [Action::North, Action::South];
        q.update_q_learning(s0(), Action::Pickup, Reward::new(13), s1(), &next);
        sarsa.update_sarsa(s0(), Action::Pickup, Reward::new(13), s1(), Some(Action::South));
        assert!((q.value_of(s0(), Action::Pickup) - 4.2).abs() < EPS);
        // 0.3 * (13 + 0.5 * -4.0)
        assert!((sarsa.value_of(s0(), Action::Pickup) - 3.3).abs() < EPS);
    }

    #[test]
    fn test_sarsa_without_next_action() {
        let mut c = controller(0);
        c.update_sarsa(s0(), Action::West, Reward::new(-10), s1(), None);
        assert!((c.value_of(s0(), Action::West) + 3.0).abs() < EPS);
        // The missing next action does not touch the table for s1.
        assert!(c.q_table.row(&s1()).is_none());
    }
}
