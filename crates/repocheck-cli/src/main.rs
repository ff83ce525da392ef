//! repocheck CLI
//!
//! Audits the repositories of a GitHub organization against the standard
//! hygiene rules.
//!
//! ## Commands
//!
//! - `scan`: scan an organization (or one repository) and print a table
//! - `report`: scan and write a JSON, HTML, or CSV report to a file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use repocheck_core::{
    render_table, write_report, CheckError, ClientConfig, GitHubClient, ReportFormat, ScanOptions,
    ScanRun, ScanTarget, Scanner, DEFAULT_PAGE_SIZE, EDITOR_CONFIG_FILE_NAME,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "repocheck")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Audit organization repositories against hygiene rules", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan an organization or a single repository and print the results
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Scan and write a report file
    Report {
        #[command(flatten)]
        scan: ScanArgs,

        /// Output file for the report
        #[arg(short, long)]
        output: PathBuf,

        /// Report format: json, html, or csv
        #[arg(short, long, default_value_t = ReportFormat::Json)]
        format: ReportFormat,

        /// HTML template with {{title}}, {{summary}}, {{table}}, {{generated_at}}
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Organization name
    #[arg(long)]
    org: String,

    /// Scan only this repository
    #[arg(long)]
    repo: Option<String>,

    /// API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// API root URL (GitHub Enterprise: https://host/api/v3)
    #[arg(long, env = "GITHUB_API_URL", default_value = repocheck_core::config::DEFAULT_API_URL)]
    api_url: String,

    /// Repositories requested per listing page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Maximum concurrent repository fetches
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Filename the editor-config rule looks for
    #[arg(long, default_value = EDITOR_CONFIG_FILE_NAME)]
    editor_config_name: String,
}

impl ScanArgs {
    fn target(&self) -> Result<ScanTarget, CheckError> {
        ScanTarget::from_args(&self.org, self.repo.as_deref())
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.api_url).with_token(&self.token)
    }

    fn options(&self) -> ScanOptions {
        ScanOptions::default()
            .with_page_size(self.page_size)
            .with_concurrency(self.concurrency)
            .with_editor_config_file_name(&self.editor_config_name)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    repocheck_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Scan { scan } => cmd_scan(&scan).await,
        Commands::Report {
            scan,
            output,
            format,
            template,
        } => cmd_report(&scan, &output, format, template.as_deref()).await,
    };

    if let Err(err) = &result {
        if let Some(CheckError::Configuration(msg)) = err.downcast_ref::<CheckError>() {
            Cli::command()
                .error(ErrorKind::ValueValidation, msg)
                .exit();
        }
    }
    result
}

/// Build the scanner and run it, cancelling on Ctrl-C.
async fn run_scan(args: &ScanArgs) -> Result<ScanRun> {
    let target = args.target()?;
    let client = GitHubClient::new(args.client_config())?;
    let scanner = Scanner::new(Arc::new(client), args.options())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current repository");
            on_interrupt.cancel();
        }
    });

    info!(org = %target.organization, "Standard validation routine started");
    let run = scanner
        .scan(&target, &cancel)
        .await
        .with_context(|| format!("Failed to scan organization {}", target.organization))?;
    Ok(run)
}

async fn cmd_scan(args: &ScanArgs) -> Result<()> {
    let run = run_scan(args).await?;
    print!("{}", render_table(&run));
    for skipped in &run.skipped {
        println!("skipped {}: {}", skipped.name, skipped.reason);
    }
    println!("{}", run.summary_line());
    Ok(())
}

async fn cmd_report(
    args: &ScanArgs,
    output: &Path,
    format: ReportFormat,
    template: Option<&Path>,
) -> Result<()> {
    if template.is_some() && format != ReportFormat::Html {
        warn!(format = %format, "--template only applies to html reports; ignoring");
    }
    let run = run_scan(args).await?;

    info!(path = ?output, format = %format, "Generating report");
    write_report(output, format, &run, template)
        .with_context(|| format!("Failed to write report to {:?}", output))?;

    println!("Report written to {}", output.display());
    println!("{}", run.summary_line());
    Ok(())
}
