use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use pdworld::{
    config::Config,
    learning::Algorithm,
    report,
    simulation::{AGENT_NAMES, Simulation},
};
use rand::{SeedableRng, rngs::StdRng};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Experiment file to load
    #[arg(short, long, value_name = "CONFIG_FILE", default_value = "pdworld.toml")]
    config: PathBuf,

    /// Only run experiments whose name contains this string
    #[arg(short, long)]
    experiment: Option<String>,

    /// Seed every selected experiment with this value
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override the update rule (Q_LEARNING or SARSA)
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Directory for the JSON run summaries
    #[arg(short, long, default_value = "results")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let algorithm = args
        .algorithm
        .map(Algorithm::try_from)
        .transpose()?;
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let selected = config.experiments.iter().filter(|e| {
        args.experiment
            .as_deref()
            .is_none_or(|name| e.name.contains(name))
    });
    for experiment in selected {
        let mut experiment = experiment.clone();
        if let Some(seed) = args.seed {
            experiment.seed = Some(seed);
        }
        if let Some(algorithm) = algorithm {
            experiment.algorithm = algorithm;
        }

        let mut sim = Simulation::new(&config.world, experiment)
            .with_context(|| "invalid experiment configuration")?;
        let stats = sim.run().clone();
        for line in report::summary(&stats) {
            info!("{line}");
        }
        info!("{}", report::steps_per_run_chart(&stats, 50));

        if sim.experiment().visualize_paths {
            let other = config.world.starts[1];
            for carrying in [false, true] {
                let map = report::attractive_paths(
                    &sim.controllers[0].q_table,
                    &sim.world,
                    carrying,
                    other,
                );
                let label = if carrying { "with block" } else { "no block" };
                info!("Agent {} paths ({label}):\n{map}", AGENT_NAMES[0]);
            }
        }
        let mut rng = StdRng::seed_from_u64(stats.seed);
        info!(
            "{}",
            report::q_table_sample(&sim.controllers[0].q_table, 5, &mut rng)
        );

        let path = args.output.join(format!("{}.json", stats.name));
        let s = serde_json::to_string_pretty(&stats)?;
        std::fs::write(&path, s).with_context(|| format!("writing {}", path.display()))?;
        info!("Saved run summary to '{}'", path.display());
    }
    Ok(())
}
