//! Ferry - DTN routing simulation
//!
//! Runs the probabilistic copy-limited router over contact traces and
//! reports delivery statistics.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use ferry_logging::{FerrySubscriberBuilder, LogConfig, WorkerGuard};
use ferry_simulation::{
    ContactGeneration, HostId, RunConfig, Simulation, format_contacts, generate_contacts,
    load_contacts, scenarios,
};

#[derive(Parser)]
#[command(
    name = "ferry-sim",
    about = "Contact-trace simulation of probabilistic copy-limited DTN routing",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a settings file
    Run {
        /// Run document (TOML with [DRINC], [simulation], [logging])
        #[arg(short, long)]
        settings: PathBuf,

        /// Contact trace; synthetic contacts are generated when absent
        #[arg(short, long)]
        contacts: Option<PathBuf>,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a simulation and print every node's routing state and the links
    /// still up at the end
    Info {
        /// Run document (TOML with [DRINC], [simulation], [logging])
        #[arg(short, long)]
        settings: PathBuf,

        /// Contact trace; synthetic contacts are generated when absent
        #[arg(short, long)]
        contacts: Option<PathBuf>,

        /// Only print this node (e.g. n3)
        #[arg(short, long)]
        node: Option<HostId>,
    },

    /// Write a synthetic contact trace
    GenerateContacts {
        /// Number of nodes
        #[arg(short, long, default_value = "10")]
        nodes: u32,

        /// Trace length in seconds
        #[arg(short, long, default_value = "43200")]
        end_time: f64,

        /// Number of meetings
        #[arg(short, long, default_value = "500")]
        meetings: u32,

        /// Shortest meeting in seconds
        #[arg(long, default_value = "60")]
        min_duration: f64,

        /// Longest meeting in seconds
        #[arg(long, default_value = "600")]
        max_duration: f64,

        /// RNG seed
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a pre-built scenario
    Scenario {
        #[arg(value_enum)]
        name: ScenarioName,

        /// Seed for the random scenario
        #[arg(long, default_value = "1")]
        seed: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioName {
    /// Two-hop delivery through a well-connected relay
    RelayChain,
    /// A mobile node carries a message across a partition
    DataFerry,
    /// Synthetic contacts and traffic between 20 nodes
    Random,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            settings,
            contacts,
            json,
        } => {
            let config = load_config(&settings)?;
            let _guard = init_logging(config.logging.clone(), cli.verbose)?;

            let mut sim = build_simulation(config, contacts.as_deref())?;
            let stats = sim.run()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats.report())?);
            } else {
                println!("{}", stats);
            }
        }
        Commands::Info {
            settings,
            contacts,
            node,
        } => {
            let config = load_config(&settings)?;
            let _guard = init_logging(config.logging.clone(), cli.verbose)?;

            let mut sim = build_simulation(config, contacts.as_deref())?;
            sim.run()?;

            let ids: Vec<HostId> = match node {
                Some(id) => vec![id],
                None => sim.nodes().iter().map(|n| n.id).collect(),
            };
            for id in &ids {
                let routing = sim
                    .routing_info(*id)
                    .with_context(|| format!("No node {} in this run", id))?;
                print!("{}: {}", id, routing);
            }
            if node.is_none() {
                println!("links up at {}: {}", sim.now(), sim.links().link_count());
                let links = sim.links().visualize();
                if !links.is_empty() {
                    println!("{}", links);
                }
            }
        }
        Commands::GenerateContacts {
            nodes,
            end_time,
            meetings,
            min_duration,
            max_duration,
            seed,
            output,
        } => {
            let _guard = init_logging(LogConfig::default(), cli.verbose)?;
            let generation = ContactGeneration {
                meetings,
                min_duration,
                max_duration,
            };
            generation.validate()?;

            let trace = format_contacts(&generate_contacts(nodes, end_time, &generation, seed));
            match output {
                Some(path) => {
                    fs::write(&path, trace)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Contact trace written");
                }
                None => print!("{}", trace),
            }
        }
        Commands::Scenario { name, seed } => {
            let _guard = init_logging(LogConfig::development(), cli.verbose)?;
            let sim = match name {
                ScenarioName::RelayChain => scenarios::run_relay_chain_scenario()?,
                ScenarioName::DataFerry => scenarios::run_data_ferry_scenario()?,
                ScenarioName::Random => scenarios::run_random_scenario(20, 43_200.0, seed)?,
            };
            println!("{}", sim.stats());
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<RunConfig> {
    RunConfig::load(path).with_context(|| format!("Failed to load settings {}", path.display()))
}

fn build_simulation(config: RunConfig, contacts: Option<&Path>) -> anyhow::Result<Simulation> {
    let sim = match contacts {
        Some(path) => {
            let events = load_contacts(path)
                .with_context(|| format!("Failed to load contacts {}", path.display()))?;
            Simulation::new(config, events)?
        }
        None => Simulation::with_generated_contacts(config)?,
    };
    Ok(sim)
}

fn init_logging(config: LogConfig, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let mut builder = FerrySubscriberBuilder::new().with_config(config);
    if verbose {
        builder = builder.with_level("debug");
    }
    Ok(builder.init()?)
}
