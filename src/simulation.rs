use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Int, Position, UInt,
    actions::Action,
    agent::AgentState,
    config::{ExperimentConfig, ScheduleEntry, WorldConfig},
    error::ConfigError,
    learning::{
        Algorithm, controller::LearningController, perceived_state::PerceivedState,
        policy::Policy,
    },
    world::GridWorld,
};

pub const AGENT_NAMES: [&str; 2] = ["F", "M"];

/// Statistics gathered over one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub name: String,
    pub seed: u64,
    pub algorithm: Algorithm,
    pub total_steps: UInt,
    /// Steps taken to reach each terminal state.
    pub steps_per_run: Vec<UInt>,
    /// Distance between the agents, sampled after every second agent's move.
    pub manhattan_distances: Vec<UInt>,
    pub total_rewards: [Int; 2],
    pub terminal_states: UInt,
    /// Number of completed runs when the schedule first switched policy.
    pub first_policy_switch_run: Option<usize>,
    pub q_table_sizes: [usize; 2],
}

impl RunStats {
    fn new(experiment: &ExperimentConfig, seed: u64) -> Self {
        RunStats {
            name: experiment.name.clone(),
            seed,
            algorithm: experiment.algorithm,
            total_steps: experiment.total_steps,
            steps_per_run: vec![],
            manhattan_distances: vec![],
            total_rewards: [0, 0],
            terminal_states: 0,
            first_policy_switch_run: None,
            q_table_sizes: [0, 0],
        }
    }

    pub fn avg_steps_per_run(&self) -> Option<f32> {
        mean(&self.steps_per_run)
    }

    pub fn avg_manhattan_distance(&self) -> Option<f32> {
        mean(&self.manhattan_distances)
    }
}

fn mean(values: &[UInt]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|&v| v as f32).sum::<f32>() / values.len() as f32)
}

/// Walks through a list of `(steps, policy)` legs. The last leg never ends.
#[derive(Debug, Clone)]
pub struct PolicySchedule {
    entries: Vec<ScheduleEntry>,
    index: usize,
    switch_step: UInt,
}

impl PolicySchedule {
    pub fn new(entries: &[ScheduleEntry]) -> Result<Self, ConfigError> {
        let first = entries
            .first()
            .ok_or_else(|| ConfigError::EmptySchedule(String::new()))?;
        Ok(PolicySchedule {
            entries: entries.to_vec(),
            index: 0,
            switch_step: first.steps,
        })
    }

    pub fn current(&self) -> Policy {
        self.entries[self.index].policy
    }

    /// Move to the next leg once `step` reaches the current leg's end.
    /// Returns the new policy when a switch happens.
    pub fn advance(&mut self, step: UInt) -> Option<Policy> {
        if self.index + 1 < self.entries.len() && step >= self.switch_step {
            self.index += 1;
            self.switch_step += self.entries[self.index].steps;
            return Some(self.current());
        }
        None
    }
}

/// The state/action pair SARSA carries from one turn of an agent to the next.
#[derive(Debug, Clone, Copy)]
struct Pending {
    state: PerceivedState,
    action: Option<Action>,
}

/// The acting agent and a read-only view of the other one.
fn split_turn(agents: &mut [AgentState; 2], turn: usize) -> (&mut AgentState, &AgentState) {
    let [f, m] = agents;
    if turn == 0 { (f, &*m) } else { (m, &*f) }
}

/// Two agents taking alternate turns in one `GridWorld`, each with its own learner.
#[derive(Debug)]
pub struct Simulation {
    pub world: GridWorld,
    pub agents: [AgentState; 2],
    pub controllers: [LearningController; 2],
    starts: [Position; 2],
    experiment: ExperimentConfig,
    schedule: PolicySchedule,
    policy: Policy,
    reconfigured: bool,
    current_run_steps: UInt,
    stats: RunStats,
}

impl Simulation {
    pub fn new(world: &WorldConfig, experiment: ExperimentConfig) -> Result<Self, ConfigError> {
        world.validate()?;
        experiment.validate(world)?;
        let seed = experiment.seed.unwrap_or_else(|| rand::rng().random());
        let schedule = PolicySchedule::new(&experiment.policy_schedule)?;
        let controllers = [0, 1].map(|i| {
            LearningController::new(
                experiment.learning_rate,
                experiment.discount_factor,
                StdRng::seed_from_u64(seed.wrapping_add(i)),
            )
        });
        Ok(Simulation {
            world: GridWorld::new(world),
            agents: [0, 1].map(|i| AgentState::new(AGENT_NAMES[i], world.starts[i])),
            controllers,
            starts: world.starts,
            policy: schedule.current(),
            schedule,
            reconfigured: false,
            current_run_steps: 0,
            stats: RunStats::new(&experiment, seed),
            experiment,
        })
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn experiment(&self) -> &ExperimentConfig {
        &self.experiment
    }

    /// Run all configured steps. Meant to be called once per simulation.
    pub fn run(&mut self) -> &RunStats {
        info!(
            "Starting simulation {}: {} steps, seed {}",
            self.experiment.name, self.experiment.total_steps, self.stats.seed
        );
        info!(
            "Algorithm: {}, LR(α): {}, γ: {}",
            self.experiment.algorithm,
            self.experiment.learning_rate,
            self.experiment.discount_factor
        );
        match self.experiment.algorithm {
            Algorithm::QLearning => self.run_q_learning(),
            Algorithm::Sarsa => self.run_sarsa(),
        }
        self.stats.q_table_sizes = [0, 1].map(|i| self.controllers[i].q_table.len());
        &self.stats
    }

    fn run_q_learning(&mut self) {
        for step in 0..self.experiment.total_steps {
            self.before_step(step);
            if self.step_q_learning(step) {
                self.after_step(step);
            }
        }
    }

    fn run_sarsa(&mut self) {
        let mut pending = [0, 1].map(|turn| self.fresh_pending(turn));
        for step in 0..self.experiment.total_steps {
            self.before_step(step);
            let turn = (step % 2) as usize;
            if self.step_sarsa(step, &mut pending[turn]) && self.after_step(step) {
                pending = [0, 1].map(|turn| self.fresh_pending(turn));
            }
        }
    }

    /// Policy switches and the one-off world change.
    fn before_step(&mut self, step: UInt) {
        if let Some(policy) = self.schedule.advance(step) {
            if self.stats.first_policy_switch_run.is_none() {
                self.stats.first_policy_switch_run = Some(self.stats.steps_per_run.len());
            }
            info!("Step {step}: switching policy to {policy}");
            self.policy = policy;
        }

        if let Some(reconfigure) = &self.experiment.reconfigure {
            if !self.reconfigured && self.stats.terminal_states >= reconfigure.after_terminal_states
            {
                self.world.change_configuration(&reconfigure.pickup_sites);
                self.reconfigured = true;
            }
        }
    }

    /// Observe, act and learn for the agent whose turn it is. Returns false if it was trapped.
    fn step_q_learning(&mut self, step: UInt) -> bool {
        let turn = (step % 2) as usize;
        let (agent, other) = split_turn(&mut self.agents, turn);
        let controller = &mut self.controllers[turn];

        let old_state = controller.current_state(agent, other);
        let candidates = self.world.legal_actions(agent, other);
        let Some(action) = controller.select_action(self.policy, old_state, &candidates) else {
            debug!("Step {step}: agent {} is trapped", agent.name);
            return false;
        };

        let reward = self.world.apply_action(agent, other, action);
        self.stats.total_rewards[turn] += reward.val;

        let new_state = controller.current_state(agent, other);
        let new_candidates = self.world.legal_actions(agent, other);
        controller.update_q_learning(old_state, action, reward, new_state, &new_candidates);
        debug!("Step {step}: {} took {action}, reward {}", agent.name, reward.val);
        true
    }

    /// Apply the pending action, choose the next one and learn from both. An agent that
    /// was trapped when its pending action was chosen looks again first. Returns false if
    /// it is still trapped.
    fn step_sarsa(&mut self, step: UInt, pending: &mut Pending) -> bool {
        let turn = (step % 2) as usize;
        let (agent, other) = split_turn(&mut self.agents, turn);
        let controller = &mut self.controllers[turn];

        if pending.action.is_none() {
            let state = controller.current_state(agent, other);
            let candidates = self.world.legal_actions(agent, other);
            *pending = Pending {
                state,
                action: controller.select_action(self.policy, state, &candidates),
            };
        }
        let Some(action) = pending.action else {
            debug!("Step {step}: agent {} is trapped", agent.name);
            return false;
        };

        let reward = self.world.apply_action(agent, other, action);
        self.stats.total_rewards[turn] += reward.val;

        let new_state = controller.current_state(agent, other);
        let new_candidates = self.world.legal_actions(agent, other);
        let next_action = controller.select_action(self.policy, new_state, &new_candidates);
        controller.update_sarsa(pending.state, action, reward, new_state, next_action);
        debug!("Step {step}: {} took {action}, reward {}", agent.name, reward.val);

        *pending = Pending {
            state: new_state,
            action: next_action,
        };
        true
    }

    fn fresh_pending(&mut self, turn: usize) -> Pending {
        let (agent, other) = split_turn(&mut self.agents, turn);
        let controller = &mut self.controllers[turn];
        let state = controller.current_state(agent, other);
        let candidates = self.world.legal_actions(agent, other);
        Pending {
            state,
            action: controller.select_action(self.policy, state, &candidates),
        }
    }

    /// Record statistics and start a new episode if the task is complete.
    /// Returns true when the world was reset.
    fn after_step(&mut self, step: UInt) -> bool {
        if step % 2 == 1 {
            let [f, m] = &self.agents;
            self.stats
                .manhattan_distances
                .push(f.position.manhattan(&m.position));
        }

        self.current_run_steps += 1;
        if !self.world.is_terminal() {
            return false;
        }

        self.stats.terminal_states += 1;
        info!(
            "Step {step}: terminal state {} reached in {} steps",
            self.stats.terminal_states, self.current_run_steps
        );
        self.stats.steps_per_run.push(self.current_run_steps);
        self.current_run_steps = 0;

        self.world.reset();
        for (agent, start) in self.agents.iter_mut().zip(self.starts) {
            agent.reset(start);
        }
        true
    }
}
