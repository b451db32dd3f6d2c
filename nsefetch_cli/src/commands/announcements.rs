//! The `announcements` subcommand: polls corporate announcements, mirrors
//! each fetched table to a CSV file and prints a preview.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Args;
use nsefetch_lib::{
    AnnouncementRequest, Announcements, DateBound, Index, NseFetch, NseFetchError, Period,
};

use crate::output::{print_announcements, OutputFormat};

/// Arguments for the `announcements` subcommand.
///
/// `--from`/`--to` only apply with `--period Custom`; every other period is
/// resolved relative to today.
#[derive(Args)]
pub struct AnnouncementsArgs {
    /// Market segment: equities, sme, sse, debt, municipalBond, invitsreits, mf
    #[arg(long, default_value = "equities")]
    pub index: String,

    /// Period: Today, Last1Week, Next1Week, Last15Days, Next15Days, Last1Month,
    /// Next1Month, Last3Months, Next3Months, Last6Months, Last1Year, Custom,
    /// AllForthcoming
    #[arg(long, default_value = "AllForthcoming")]
    pub period: String,

    /// Restrict to one trading symbol (e.g. INFY)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Start date (DD-MM-YYYY or YYYY-MM-DD), requires --period Custom
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// End date (DD-MM-YYYY or YYYY-MM-DD), requires --period Custom
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// CSV file rewritten after every fetch [default: <index>_corporate_announcements.csv]
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Seconds between polls
    #[arg(long, default_value = "3")]
    pub interval: u64,

    /// Fetch once and exit instead of polling
    #[arg(long)]
    pub once: bool,

    /// Rows shown in the terminal preview
    #[arg(long, default_value = "10")]
    pub rows: usize,
}

pub fn run(args: &AnnouncementsArgs, client: &NseFetch, format: &OutputFormat) -> Result<()> {
    let request = build_request(args)?;
    let out = output_path(args, request.index);

    loop {
        match client.get_corporate_announcement(&request) {
            Ok(Some(Announcements::Table(table))) => {
                table.to_csv_path(&out)?;
                tracing::info!("Wrote {} announcements to {}", table.len(), out.display());
                print_announcements(&table, format, args.rows)?;
            }
            Ok(Some(Announcements::NoData(message))) => println!("{}", message),
            Ok(None) => {
                let symbol = args.symbol.as_deref().unwrap_or_default();
                bail!("Issuer details for symbol {} not found", symbol);
            }
            Err(NseFetchError::LoopClosed) => break,
            Err(e) if e.is_fatal() || args.once => return Err(e.into()),
            Err(e) => tracing::warn!("Fetch failed, will retry next poll: {}", e),
        }

        if args.once || client.is_closed() {
            break;
        }
        std::thread::sleep(Duration::from_secs(args.interval));
        if client.is_closed() {
            break;
        }
    }
    Ok(())
}

/// Validates the flags and resolves the date range once up front so a bad
/// combination fails before the first poll.
fn build_request(args: &AnnouncementsArgs) -> Result<AnnouncementRequest> {
    let index: Index = args.index.parse()?;
    let period: Period = args.period.parse()?;

    let mut request = AnnouncementRequest::new(index, period);
    if let Some(symbol) = &args.symbol {
        request = request.with_symbol(&symbol.trim().to_uppercase());
    }
    if let (Some(from), Some(to)) = (&args.from, &args.to) {
        request = request.with_range(parse_date(from)?, parse_date(to)?);
    }
    request.to_query()?;
    Ok(request)
}

fn parse_date(s: &str) -> Result<DateBound> {
    ["%d-%m-%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s.trim(), fmt).ok())
        .map(DateBound::Date)
        .ok_or_else(|| anyhow::anyhow!("Invalid date '{}': expected DD-MM-YYYY or YYYY-MM-DD", s))
}

fn output_path(args: &AnnouncementsArgs, index: Index) -> PathBuf {
    args.out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}_corporate_announcements.csv", index)))
}
