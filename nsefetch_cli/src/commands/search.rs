//! The `search` subcommand: symbol autocomplete lookup.

use anyhow::Result;
use clap::Args;
use nsefetch_lib::types::SearchResponse;
use nsefetch_lib::NseFetch;

use crate::output::{print_json, print_symbols, OutputFormat};

#[derive(Args)]
pub struct SearchArgs {
    /// Symbol or company name fragment
    pub query: String,

    /// Print the raw response instead of the parsed matches
    #[arg(long)]
    pub raw: bool,
}

pub fn run(args: &SearchArgs, client: &NseFetch, format: &OutputFormat) -> Result<()> {
    let data = client.search(args.query.trim())?;
    if args.raw {
        print_json(&data);
        return Ok(());
    }
    let resp: SearchResponse = serde_json::from_value(data)?;
    if resp.symbols.is_empty() {
        eprintln!("No symbols matched '{}'", args.query);
        return Ok(());
    }
    print_symbols(&resp, format)
}
