use crate::demo::{render_match_report, run_demo, DemoArgs};
use crate::infra::{build_engine, read_json, InMemoryTrialCatalog};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use trial_match::config::AppConfig;
use trial_match::error::AppError;
use trial_match::matching::{EligibilityAssessor, Patient, Trial, TrialMatchingService};

#[derive(Parser, Debug)]
#[command(
    name = "Trial Match",
    about = "Assess clinical trial eligibility and rank trials with diversity-aware scoring",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Assess one patient against one trial and print the result as JSON
    Assess(AssessArgs),
    /// Assess a patient against a list of trials and print the ranking
    Rank(RankArgs),
    /// Run an end-to-end demo over built-in sample data
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// JSON file of trials served by the in-memory catalog
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Patient record (JSON)
    #[arg(long)]
    pub(crate) patient: PathBuf,
    /// Trial record (JSON)
    #[arg(long)]
    pub(crate) trial: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Patient record (JSON)
    #[arg(long)]
    pub(crate) patient: PathBuf,
    /// Array of trial records (JSON)
    #[arg(long)]
    pub(crate) trials: PathBuf,
    /// Print the raw match report as JSON instead of the console summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Assess(args) => run_assess(args).await,
        Command::Rank(args) => run_rank(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

async fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let patient: Patient = read_json(&args.patient)?;
    let trial: Trial = read_json(&args.trial)?;
    patient
        .validate()
        .map_err(|err| AppError::Matching(err.into()))?;

    let engine = build_engine(&config.reasoner)?;
    let result = engine.assess(&patient, &trial).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let patient: Patient = read_json(&args.patient)?;
    let trials: Vec<Trial> = read_json(&args.trials)?;

    let engine = build_engine(&config.reasoner)?;
    let service = TrialMatchingService::new(
        Arc::new(engine),
        Arc::new(InMemoryTrialCatalog::default()),
        config.matching.concurrency,
    );

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let report = service.match_trials_until(&patient, trials, cancel).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_match_report(&report);
    }
    Ok(())
}
