mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nsefetch_lib::{ClientConfig, NseFetch, Verbosity};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "nsefetch")]
#[command(about = "Fetch corporate announcements from NSE India")]
struct Cli {
    /// Output format: table, json, csv or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Attempts per request before the client shuts down
    #[arg(long, global = true)]
    max_retries: Option<usize>,

    /// Log request details
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Do not log at all
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Directory for the rotated log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll corporate announcements and mirror them to CSV
    Announcements(commands::announcements::AnnouncementsArgs),
    /// Look up symbols and their issuer names
    Search(commands::search::SearchArgs),
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output);

    let client = NseFetch::new(build_config(&cli))?;
    let result = match &cli.command {
        Commands::Announcements(args) => commands::announcements::run(args, &client, &format),
        Commands::Search(args) => commands::search::run(args, &client, &format),
    };
    client.close();
    result
}

/// Environment first, then flags. Signals stop the polling loop through the
/// closed client rather than ending the process.
fn build_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::from_env().with_exit_on_signal(false);
    if let Some(max_retries) = cli.max_retries {
        config = config.with_max_retries(max_retries);
    }
    if cli.verbose {
        config = config.with_verbosity(Verbosity::Debug);
    } else if cli.quiet {
        config = config.with_verbosity(Verbosity::Quiet);
    }
    if let Some(dir) = &cli.log_dir {
        config = config.with_log_dir(dir.clone());
    }
    config
}
