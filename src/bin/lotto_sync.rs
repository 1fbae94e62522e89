use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use lotto_sync::app::{App, FetchResult, SyncOptions, SyncOutcome, SyncReport};
use lotto_sync::config::{ConfigLoader, ResolvedConfig};
use lotto_sync::dataset::DatasetFile;
use lotto_sync::domain::{DrawNo, ExitPolicy};
use lotto_sync::error::LottoError;
use lotto_sync::lottery::LotteryHttpClient;
use lotto_sync::output::{JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "lotto-sync")]
#[command(about = "Fetch the next lottery draw and upsert it into a local CSV dataset")]
#[command(version, author)]
struct Cli {
    /// JSON config file (default: ./lotto-sync.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Dataset CSV path (overrides the config file)
    #[arg(long, global = true)]
    dataset: Option<String>,

    /// Print a JSON report on stdout instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Probe the next round(s) and append any published draw (default)")]
    Sync(SyncArgs),
    #[command(about = "Fetch one round and print it without writing")]
    Fetch(FetchArgs),
    #[command(about = "Print the latest round in the dataset")]
    Latest,
    #[command(about = "Create an empty dataset with the CSV header")]
    Init,
}

#[derive(Args, Clone, Default)]
struct SyncArgs {
    /// Consecutive rounds to probe at most
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    rounds: Option<u32>,

    /// Pause between probes in milliseconds
    #[arg(long)]
    probe_delay_ms: Option<u64>,

    /// Probe every round the draw calendar says should be out
    #[arg(long)]
    catch_up: bool,

    /// Exit status when no new round is found
    #[arg(long)]
    exit_policy: Option<ExitPolicy>,

    /// HTTP timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    #[arg(long)]
    user_agent: Option<String>,
}

#[derive(Args)]
struct FetchArgs {
    round: String,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<LottoError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &LottoError) -> u8 {
    match error {
        LottoError::ConfigRead(_)
        | LottoError::ConfigParse(_)
        | LottoError::InvalidUrlTemplate(_)
        | LottoError::InvalidDrawNo(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<u8> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(dataset) = cli.dataset {
        config.dataset = Utf8PathBuf::from(dataset);
    }

    match cli.command.unwrap_or(Commands::Sync(SyncArgs::default())) {
        Commands::Sync(args) => run_sync(args, config, output_mode),
        Commands::Fetch(args) => run_fetch(args, config, output_mode),
        Commands::Latest => run_latest(config, output_mode),
        Commands::Init => run_init(config, output_mode),
    }
}

fn run_sync(
    args: SyncArgs,
    mut config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<u8> {
    if let Some(secs) = args.timeout_secs {
        config.client.timeout = Duration::from_secs(secs);
    }
    if let Some(user_agent) = args.user_agent {
        config.client.user_agent = user_agent;
    }
    let exit_policy = args.exit_policy.unwrap_or(config.exit_policy);
    let options = SyncOptions {
        max_rounds: args.rounds.unwrap_or(config.max_rounds),
        probe_delay: args
            .probe_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(config.probe_delay),
        catch_up: args.catch_up,
    };

    let app = build_app(&config)?;
    let report = app.sync(&options);
    match output_mode {
        OutputMode::Json => JsonOutput::print_sync(&report).into_diagnostic()?,
        OutputMode::Human => print_sync_summary(&report, exit_policy),
    }
    Ok(report.exit_code(exit_policy))
}

fn run_fetch(
    args: FetchArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<u8> {
    let round: DrawNo = args.round.parse()?;
    let app = build_app(&config)?;
    let result = app.fetch(round);
    match output_mode {
        OutputMode::Json => JsonOutput::print_fetch(&result).into_diagnostic()?,
        OutputMode::Human => print_fetch_summary(&result),
    }
    Ok(if result.record.is_some() { 0 } else { 1 })
}

fn run_latest(config: ResolvedConfig, output_mode: OutputMode) -> miette::Result<u8> {
    let app = build_app(&config)?;
    let result = app.latest()?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_latest(&result).into_diagnostic()?,
        OutputMode::Human => {
            println!(
                "📊 Latest round in {}: {}",
                result.dataset, result.latest_round
            );
            println!(
                "📅 Latest round by the draw calendar: {}",
                result.expected_round
            );
        }
    }
    Ok(0)
}

fn run_init(config: ResolvedConfig, output_mode: OutputMode) -> miette::Result<u8> {
    let app = build_app(&config)?;
    let result = app.init()?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_init(&result).into_diagnostic()?,
        OutputMode::Human => {
            if result.created {
                println!("✅ Created {}", result.dataset);
            } else {
                println!("ℹ️ {} already exists, left untouched", result.dataset);
            }
        }
    }
    Ok(0)
}

fn build_app(config: &ResolvedConfig) -> miette::Result<App<LotteryHttpClient>> {
    let client = LotteryHttpClient::new(&config.client)?;
    Ok(App::new(DatasetFile::new(config.dataset.clone()), client))
}

fn print_sync_summary(report: &SyncReport, policy: ExitPolicy) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}🎰 lotto-sync: {}{reset}", report.dataset);
    println!(
        "{cyan}📊 Latest round before this run: {}{reset}",
        report.previous_round
    );

    match report.outcome {
        SyncOutcome::Updated => {
            for record in &report.added {
                println!("{green}✅ Added {record}{reset}");
            }
            if let Some(summary) = &report.summary {
                println!("{green}   {} rows in dataset{reset}", summary.total_rows);
            }
        }
        SyncOutcome::NoNewRound => {
            println!(
                "{yellow}⏳ Round {} is not available yet{reset}",
                report.next_round()
            );
            if policy == ExitPolicy::Retry {
                println!("{yellow}   Will retry in the next scheduled run{reset}");
            }
        }
        SyncOutcome::WriteFailed => {
            for record in &report.added {
                println!("{green}✅ Added {record}{reset}");
            }
            let error = report.error.as_deref().unwrap_or("unknown error");
            println!("{red}❌ Failed to update dataset: {error}{reset}");
        }
    }
}

fn print_fetch_summary(result: &FetchResult) {
    match (&result.record, &result.error) {
        (Some(record), _) => println!("✅ {record}"),
        (None, error) => {
            let error = error.as_deref().unwrap_or("no data");
            println!("⏳ Round {}: {error}", result.round);
            if let Some(date) = &result.scheduled_date
                && !result.scheduled_passed
            {
                println!("📅 Scheduled for {date}");
            }
        }
    }
}
