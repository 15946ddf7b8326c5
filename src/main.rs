//! Budget Ledger CLI
//!
//! Command-line interface over the shared transaction ledger and the budget
//! recommendation engine.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- add --user alice --operation income --amount 5000 --time "2024/06/01 09:00"
//! cargo run -- recommend --user alice --date 2024/06/15
//! cargo run -- budget set --user alice --amount 1200
//! cargo run -- --ledger data/transactions.csv export --user alice > alice.csv
//! ```
//!
//! Reports go to stdout, logs to stderr (`RUST_LOG` adjusts the filter).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (invalid record, unreadable file, bad import header, etc.)

use budget_ledger::{cli, logging};
use std::process;

fn main() {
    logging::init_tracing();

    let args = cli::parse_args();

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(args, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
