use std::fmt::Write;

use itertools::Itertools;
use rand::{Rng, seq::IteratorRandom};

use crate::{
    Position,
    actions::Action,
    learning::{perceived_state::PerceivedState, q_table::QTable},
    simulation::{AGENT_NAMES, RunStats},
    world::GridWorld,
};

/// Best move out of `state` by table value. Strict comparison, so on ties the
/// first move in enumeration order wins. Never inserts into the table.
pub fn best_move(table: &QTable, state: &PerceivedState) -> Action {
    let mut best = Action::North;
    let mut max_q = f32::NEG_INFINITY;
    for action in Action::moves() {
        let q = table.peek(state, action);
        if q > max_q {
            max_q = q;
            best = action;
        }
    }
    best
}

/// Text map of the preferred move in every cell, with the other agent held at
/// `other`. Pickup cells are drawn as `[>]`, dropoff cells as `(>)` and the other
/// agent as `@`.
pub fn attractive_paths(
    table: &QTable,
    world: &GridWorld,
    carrying: bool,
    other: Position,
) -> String {
    let mut out = String::new();
    for y in 0..world.height() {
        let row = (0..world.width())
            .map(|x| {
                let cell = Position::new(x, y);
                let mark = if cell == other {
                    '@'
                } else {
                    best_move(table, &PerceivedState::new(cell, carrying, other)).arrow()
                };
                if world.pickup().contains_key(&cell) {
                    format!("[{mark}]")
                } else if world.dropoff().contains_key(&cell) {
                    format!("({mark})")
                } else {
                    format!(" {mark} ")
                }
            })
            .join("");
        let _ = writeln!(out, "{row}");
    }
    out
}

/// Up to `num_states` randomly chosen states with all their action values.
pub fn q_table_sample<R: Rng + ?Sized>(table: &QTable, num_states: usize, rng: &mut R) -> String {
    let mut out = format!("Q-Table sample (size: {} states)\n", table.len());
    if table.is_empty() {
        out.push_str("Q-Table is empty.\n");
        return out;
    }
    for state in table.states().choose_multiple(rng, num_states).into_iter().sorted() {
        let actions = table
            .action_values(state)
            .unwrap_or_default()
            .into_iter()
            .map(|(action, q)| format!("{action}: {q:.2}"))
            .join(", ");
        let _ = writeln!(
            out,
            "State: ({}, {}, {}, {}, {})\n  Actions: {actions}",
            state.x, state.y, state.carrying, state.other_x, state.other_y
        );
    }
    out
}

/// One bar per completed run, scaled so the longest run spans `width` columns. The run
/// in progress when the schedule first switched policy is marked.
pub fn steps_per_run_chart(stats: &RunStats, width: usize) -> String {
    let mut out = format!("Steps per run ({})\n", stats.name);
    let Some(&longest) = stats.steps_per_run.iter().max() else {
        out.push_str("No terminal state reached.\n");
        return out;
    };
    let longest = longest.max(1) as usize;
    for (run, &steps) in stats.steps_per_run.iter().enumerate() {
        let bar = "#".repeat((steps as usize * width).div_ceil(longest));
        let mark = if stats.first_policy_switch_run == Some(run) {
            " <- policy switch"
        } else {
            ""
        };
        let _ = writeln!(out, "{:>4} {steps:>6} {bar}{mark}", run + 1);
    }
    let late_switch = stats
        .first_policy_switch_run
        .filter(|&run| run >= stats.steps_per_run.len());
    if let Some(run) = late_switch {
        let _ = writeln!(out, "Policy switch after run {run}");
    }
    out
}

/// End-of-run summary, one line per figure.
pub fn summary(stats: &RunStats) -> Vec<String> {
    let mut lines = vec![
        format!("Experiment: {}", stats.name),
        format!("Algorithm: {}, seed: {}", stats.algorithm, stats.seed),
        format!("Total Steps: {}", stats.total_steps),
    ];
    for (name, reward) in AGENT_NAMES.iter().zip(stats.total_rewards) {
        lines.push(format!("Total Reward ({name}): {reward}"));
    }
    lines.push(format!("Total Terminal States: {}", stats.terminal_states));
    if let Some(avg) = stats.avg_steps_per_run() {
        lines.push(format!("Avg steps per run: {avg:.2}"));
    }
    if let Some(avg) = stats.avg_manhattan_distance() {
        lines.push(format!("Average Manhattan Distance: {avg:.2}"));
    }
    if let Some(run) = stats.first_policy_switch_run {
        lines.push(format!("First policy switch after run: {run}"));
    }
    for (name, size) in AGENT_NAMES.iter().zip(stats.q_table_sizes) {
        lines.push(format!("Q-Table size ({name}): {size} states"));
    }
    lines
}
