use anyhow::Result;
use clap::{Parser, Subcommand};
use depot_cli::config::{config_path, init_config, load_config};
use depot_cli::reports_cmd::{self, ReportArgs};
use depot_cli::triggers_cmd::{self, TriggersCommand};
use depot_reports::ReportKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "depot",
    version = env!("DEPOT_BUILD_SHA"),
    about = "Depot parcel-event reports and scheduled report triggers"
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// ISO week label and Monday..Sunday range for a date (YYYY-MM-DD)
    Week { date: String },

    /// Resolve a period selector to its inclusive date range
    Range {
        /// day, week or month
        period_type: String,
        /// YYYY-MM-DD, YYYY-Www or YYYY-MM
        value: String,
    },

    /// Generate a ranked report for a period
    Report {
        kind: ReportKind,
        period_type: String,
        value: String,

        /// Event log (.csv or .jsonl); defaults to config.data.events
        #[arg(long)]
        events: Option<PathBuf>,

        /// Rows to print (default: config.reports.top_n)
        #[arg(long)]
        limit: Option<usize>,

        /// Print the full report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Also write the report to ~/.depot/reports/
        #[arg(long, default_value_t = false)]
        save: bool,
    },

    /// Recurring report triggers
    Triggers {
        #[command(subcommand)]
        command: TriggersCommand,
    },

    /// Manage ~/.depot/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "depot=debug" } else { "depot=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Week { date } => reports_cmd::week(&date)?,

        Command::Range { period_type, value } => reports_cmd::range(&period_type, &value)?,

        Command::Report {
            kind,
            period_type,
            value,
            events,
            limit,
            json,
            save,
        } => {
            let cfg = load_config()?;
            reports_cmd::report(
                ReportArgs {
                    kind,
                    period_type,
                    value,
                    events,
                    limit,
                    json,
                    save,
                },
                &cfg,
            )?;
        }

        Command::Triggers { command } => {
            let cfg = load_config()?;
            triggers_cmd::run(command, &cfg).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => init_config()?,
            ConfigCommand::Show => {
                let cfg = load_config()?;
                println!("# {}", config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg)?);
            }
        },
    }

    Ok(())
}
