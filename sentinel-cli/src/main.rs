use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sentinel::prelude::*;
use sentinel_core::{DatasetSummary, PatientGenerator};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sentinel",
    about = "Concurrent booking stress harness for healthcare portals"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the booking stress test against the configured portal.
    Run(RunArgs),
    /// Generate a batch of synthetic patient records.
    Patients(PatientArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Number of simulated users.
    #[arg(long)]
    users: Option<u32>,
    /// Cap on concurrently open sessions.
    #[arg(long)]
    concurrency: Option<u32>,
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config/config.json")]
    config: PathBuf,
    /// Write the full results (aggregate + per-task) as JSON.
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    verbose: bool,
}

#[derive(Args)]
struct PatientArgs {
    /// Number of records to generate.
    #[arg(long, default_value_t = 100)]
    count: usize,
    /// Seed for reproducible data.
    #[arg(long)]
    seed: Option<u64>,
    /// Write the batch as JSON.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_stress(args).await,
        Command::Patients(args) => generate_patients(args),
    }
}

async fn run_stress(args: RunArgs) -> Result<()> {
    init_tracing(args.verbose);

    let mut config = StressConfig::from_file(&args.config)?;
    config.apply_overrides(std::env::vars())?;
    if let Some(users) = args.users {
        config.load.users = users;
    }
    if let Some(concurrency) = args.concurrency {
        config.load.concurrency = concurrency;
    }

    let environment = config.environment()?;
    tracing::info!(
        "target: {} (environment {})",
        environment.base_url,
        config.active_environment
    );

    let portal = HttpPortal::new(environment);
    let report = StressTest::new(portal, config).await?;

    println!("{}", report.aggregate);

    if let Some(path) = args.out {
        std::fs::write(&path, serde_json::to_vec_pretty(&report)?)?;
        tracing::info!("results written to {}", path.display());
    }
    Ok(())
}

fn generate_patients(args: PatientArgs) -> Result<()> {
    let mut generator = match args.seed {
        Some(seed) => PatientGenerator::seeded(seed),
        None => PatientGenerator::new(),
    };
    let patients = generator.generate_batch(args.count);

    for patient in patients.iter().take(5) {
        println!(
            "{} | {} | born {} | {} | allergies: {}",
            patient.patient_id,
            patient.full_name,
            patient.date_of_birth,
            patient.blood_type,
            patient.allergies
        );
    }
    if patients.len() > 5 {
        println!("... and {} more", patients.len() - 5);
    }
    println!("{}", DatasetSummary::analyze(&patients));

    if let Some(path) = args.out {
        std::fs::write(&path, serde_json::to_vec_pretty(&patients)?)?;
        println!("batch written to {}", path.display());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sentinel=debug" } else { "sentinel=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .init();
}
