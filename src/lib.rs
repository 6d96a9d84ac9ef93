pub mod config;
pub mod contract;
pub mod export;
pub mod hierarchy;
pub mod merge;
pub mod remote;
pub mod report;
pub mod roster;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

use config::{load_report_config, Language, ReportConfig};
use contract::{BatchReport, Session};
use remote::{ConnectOptions, RestClient};
use roster::Roster;

/// CLI for tabreport: back up workbooks and generate client report bundles.
#[derive(Parser)]
#[clap(
    name = "tabreport",
    version,
    about = "Export Tableau workbooks and per-client report pages, and merge them into single documents"
)]
pub struct Cli {
    /// Logging level
    #[clap(long, short = 'l', value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl LogLevel {
    pub fn as_level(&self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LanguageArg {
    #[value(name = "EN", alias = "en")]
    En,
    #[value(name = "FR", alias = "fr")]
    Fr,
    #[value(name = "all")]
    All,
}

impl LanguageArg {
    fn languages(&self) -> Vec<Language> {
        match self {
            LanguageArg::En => vec![Language::En],
            LanguageArg::Fr => vec![Language::Fr],
            LanguageArg::All => vec![Language::En, Language::Fr],
        }
    }
}

/// Options shared by every subcommand that touches the report output tree.
#[derive(Args)]
pub struct CommonOpts {
    /// Language of reports
    #[clap(long, value_enum, default_value_t = LanguageArg::En)]
    pub language: LanguageArg,

    /// Output directory (default: current directory)
    #[clap(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// YAML file overriding the built-in view tables and portfolio lists
    #[clap(long)]
    pub report_config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export client report pages from the server
    Export {
        /// Server username
        username: String,
        /// Server password
        password: String,
        /// Server address
        server: String,
        /// Client CMR number, or "all"
        client: String,
        /// Cut-off date for reports
        cut_off_date: String,

        /// Page number to generate, or "all"
        #[clap(long, short = 'p', default_value = "1")]
        page: String,

        /// Server site
        #[clap(long, short = 's')]
        site: Option<String>,

        /// Path to the client roster JSON file
        #[clap(long, default_value = "clients.json")]
        roster: PathBuf,

        /// Skip TLS certificate verification
        #[clap(long)]
        insecure: bool,

        #[clap(flatten)]
        common: CommonOpts,
    },

    /// Back up all workbooks into a tree mirroring the project hierarchy
    Backup {
        /// Server username
        username: String,
        /// Server password
        password: String,
        /// Server address
        server: String,

        /// Server site
        #[clap(long, short = 's')]
        site: Option<String>,

        /// Output directory (default: ./workbooks)
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,

        /// Skip TLS certificate verification
        #[clap(long)]
        insecure: bool,
    },

    /// Merge individual report pages into a single file per client
    Merge {
        #[clap(flatten)]
        common: CommonOpts,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main().
///
/// Setup failures (roster, config, sign-in) return an error and fail the
/// process; per-item batch failures are printed in the summary but leave the
/// exit status untouched.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Export {
            username,
            password,
            server,
            client,
            cut_off_date,
            page,
            site,
            roster,
            insecure,
            common,
        } => {
            let report_config = resolve_report_config(&common)?;
            let roster = Roster::from_json_file(&roster)?;
            let clients = roster.select(&client)?;
            let output_root = common.output.clone().unwrap_or_else(|| PathBuf::from("."));
            let languages = common.language.languages();

            // Everything fallible that does not need a session happens
            // before sign-in, so a connected run always reaches sign-out.
            let mut plan = Vec::new();
            for language in &languages {
                let pages = parse_page_selector(&page, &report_config, *language)?;
                plan.push((*language, report_config.views_for(*language, &pages)));
            }

            report::ensure_portfolio_dirs(&report_config, &output_root);

            let remote = RestClient::connect(&ConnectOptions {
                username,
                password,
                server,
                site,
                insecure,
            })
            .await?;

            println!("Export starting...");
            let mut batch = BatchReport::default();
            for (language, views) in &plan {
                batch.absorb(
                    report::generate_reports(
                        &remote,
                        &report_config,
                        views,
                        &clients,
                        *language,
                        &cut_off_date,
                        &output_root,
                    )
                    .await,
                );
            }

            if let Err(e) = remote.sign_out().await {
                warn!(error = %e, "Failed to sign out cleanly");
            }

            print_summary("Export", &batch);
            Ok(())
        }

        Commands::Backup {
            username,
            password,
            server,
            site,
            output,
            insecure,
        } => {
            let output_root = output.unwrap_or_else(|| PathBuf::from("workbooks"));

            let remote = RestClient::connect(&ConnectOptions {
                username,
                password,
                server,
                site,
                insecure,
            })
            .await?;

            println!("Backup starting...");
            let outcome = export::export_workbooks(&remote, &output_root).await;

            // Sign out before propagating any listing failure.
            if let Err(e) = remote.sign_out().await {
                warn!(error = %e, "Failed to sign out cleanly");
            }

            let batch = outcome?;
            print_summary("Backup", &batch);
            Ok(())
        }

        Commands::Merge { common } => {
            let report_config = resolve_report_config(&common)?;
            let output_root = common.output.clone().unwrap_or_else(|| PathBuf::from("."));

            let mut batch = BatchReport::default();
            for language in common.language.languages() {
                batch.absorb(merge::merge_reports(&report_config, &output_root, language));
            }

            print_summary("Merge", &batch);
            Ok(())
        }
    }
}

fn resolve_report_config(common: &CommonOpts) -> Result<ReportConfig> {
    match &common.report_config {
        Some(path) => load_report_config(path),
        None => Ok(ReportConfig::builtin()),
    }
}

fn parse_page_selector(
    selector: &str,
    config: &ReportConfig,
    language: Language,
) -> Result<Vec<u8>> {
    let known = config.page_numbers(language);
    if selector == "all" {
        return Ok(known);
    }
    let page: u8 = selector
        .parse()
        .with_context(|| format!("Page selector must be a number or \"all\", got {selector:?}"))?;
    if !known.contains(&page) {
        bail!("Page {page} is not configured for {language}");
    }
    Ok(vec![page])
}

fn print_summary(operation: &str, batch: &BatchReport) {
    println!("{operation} complete: {}", batch.summary());
    for failure in &batch.failed {
        eprintln!("  failed {}: {}", failure.item, failure.reason);
    }
}
