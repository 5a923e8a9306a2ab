use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use corsascore_core::cli::print_session_report;
use corsascore_core::session::SessionReport;
use corsascore_core::storage::{load_session, save_config, save_session, save_sessions_csv};
use corsascore_core::strava::{StravaClient, DEFAULT_LIMIT};
use corsascore_core::{
    analyze_files, import_from_source, load_config, telemetry, CorsaConfig, CorsaError,
    ScoreCalculator,
};

#[derive(Parser)]
#[command(name = "corsascore")]
#[command(about = "Aerobic efficiency score (power, heart rate, decoupling) for running workouts", long_about = None)]
struct Cli {
    /// Config file (athlete, policy, strava)
    #[arg(long, global = true, default_value = "corsascore.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score workout files (device-log JSON, sample JSON/CSV, Strava streams)
    Score {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Write a config file with default values
    InitConfig {
        #[arg(long)]
        force: bool,
    },
    /// Strava OAuth and import
    Strava {
        #[command(subcommand)]
        command: StravaCommands,
    },
}

#[derive(Subcommand)]
enum StravaCommands {
    /// Print the authorization URL
    AuthUrl,
    /// Exchange the `code` from the redirect for a token
    Exchange {
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "strava_session.json")]
        session: PathBuf,
    },
    /// Import and score recent runs
    Import {
        #[arg(long, default_value = "strava_session.json")]
        session: PathBuf,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Also write the session table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
    /// Print prometheus counters after the report
    #[arg(long)]
    metrics: bool,
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitConfig { force } => {
            if cli.config.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    cli.config.display()
                );
            }
            save_config(&CorsaConfig::default(), &cli.config)?;
            println!("Config written to {}", cli.config.display());
        }
        Commands::Score { files, output } => {
            let config = read_config(&cli.config)?;
            let report = analyze_files(&calculator(&config), &files);
            emit(&report, &output)?;
        }
        Commands::Strava { command } => {
            let config = read_config(&cli.config)?;
            let strava = config.strava.clone().context(
                "strava is not configured: add a `strava` section or set CORSASCORE_STRAVA_CLIENT_ID/SECRET",
            )?;
            let client = StravaClient::new(strava);

            match command {
                StravaCommands::AuthUrl => println!("{}", client.authorize_url()),
                StravaCommands::Exchange { code, session } => {
                    let s = client
                        .exchange_code(&code)
                        .context("token exchange failed")?;
                    save_session(&s, &session)?;
                    println!("Connected to Strava, token saved to {}", session.display());
                }
                StravaCommands::Import {
                    session,
                    limit,
                    output,
                } => {
                    let mut s = load_session(&session).with_context(|| {
                        format!(
                            "no Strava session at {} (run `corsascore strava exchange`)",
                            session.display()
                        )
                    })?;
                    if s.is_expired(Utc::now()) {
                        s = client.refresh(&s).context("token refresh failed")?;
                        save_session(&s, &session)?;
                    }
                    let report = match import_from_source(&client, &s, limit, &calculator(&config)) {
                        Ok(r) => r,
                        Err(CorsaError::Unauthorized) => bail!(
                            "Strava token expired or revoked, reconnect with `corsascore strava auth-url`"
                        ),
                        Err(e) => return Err(e).context("strava import failed"),
                    };
                    emit(&report, &output)?;
                }
            }
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> anyhow::Result<CorsaConfig> {
    let mut config =
        load_config(path).with_context(|| format!("failed to load {}", path.display()))?;
    config.apply_env(|k| std::env::var(k).ok());
    Ok(config)
}

fn calculator(config: &CorsaConfig) -> ScoreCalculator {
    ScoreCalculator::new(config.athlete.clone(), config.policy.clone())
}

fn emit(report: &SessionReport, output: &OutputArgs) -> anyhow::Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_session_report(report);
    }
    if let Some(path) = &output.csv {
        save_sessions_csv(&report.rows, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if output.metrics {
        print!("{}", telemetry::render());
    }
    Ok(())
}
