use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use orflow_agent::agent::{ExecMode, FlowAgent, FlowConfig};
use orflow_agent::decision::Constraints;
use orflow_agent::llm::OllamaClient;

/// Autonomous RTL-to-layout flow agent: plans with an LLM, generates and
/// repairs per-step OpenROAD code, executes it, and iterates until the
/// timing/congestion/DRC constraints are met or the budget runs out.
#[derive(Parser, Debug)]
#[command(name = "orflow-agent", version, about)]
struct Cli {
    /// High-level goal for the run, e.g. "Complete RTL to GDS with timing closure"
    goal: String,

    /// Maximum replan iterations before giving up
    #[arg(long, default_value_t = 3)]
    max_iterations: u32,

    /// Actually execute generated code in a subprocess instead of
    /// returning mock outcomes
    #[arg(long)]
    real: bool,

    /// Model name passed to the generation endpoint
    #[arg(long, default_value = "llama3")]
    model: String,

    /// Base URL of an Ollama-compatible generation endpoint
    #[arg(long, default_value = "http://localhost:11434")]
    endpoint: String,

    /// Where the run memory is persisted at run end
    #[arg(long, default_value = "flow_log.json")]
    log_file: PathBuf,

    /// Working directory for generated step scripts
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Minimum acceptable worst negative slack, in ns
    #[arg(long, default_value_t = 0.0)]
    wns_min: f64,

    /// Maximum acceptable routing congestion, in percent
    #[arg(long, default_value_t = 90)]
    max_congestion: u32,

    /// Maximum acceptable DRC violation count
    #[arg(long, default_value_t = 0)]
    max_drc: u32,

    /// Wall-clock timeout per executed step, in seconds
    #[arg(long, default_value_t = 30)]
    step_timeout: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mode = if cli.real { ExecMode::Real } else { ExecMode::Mock };

    println!("{}", "=".repeat(70).dimmed());
    println!("{}", "STARTING AUTONOMOUS FLOW".bold());
    println!("{}", "=".repeat(70).dimmed());
    println!("Goal: {}", cli.goal.cyan());
    println!("Max iterations: {}", cli.max_iterations);
    println!(
        "Mode: {}",
        match mode {
            ExecMode::Mock => "MOCK".yellow(),
            ExecMode::Real => "REAL".green(),
        }
    );

    let generator = OllamaClient::new(&cli.endpoint, &cli.model);
    let config = FlowConfig {
        max_iterations: cli.max_iterations,
        mode,
        constraints: Constraints {
            wns_min: cli.wns_min,
            max_congestion: cli.max_congestion,
            drc_violations: cli.max_drc,
        },
        work_dir: cli.work_dir,
        log_path: cli.log_file,
        step_timeout: Duration::from_secs(cli.step_timeout),
    };

    let mut agent = FlowAgent::new(Box::new(generator), config);
    match agent.run(&cli.goal) {
        Ok(summary) => {
            println!("{}", "=".repeat(70).dimmed());
            println!("{}", "FINAL RESULT".bold());
            println!("{}", "=".repeat(70).dimmed());
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(_) => println!("{summary:#?}"),
            }
        }
        Err(e) => {
            eprintln!("{} {e}", "flow failed:".red().bold());
            std::process::exit(1);
        }
    }
}
