use clap::Parser;
use simpledb::repl;
use simpledb::storage::{Table, MAX_PAGES};
use std::io::{self, BufReader};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "simpledb", version = VERSION, about = "An embedded single-table row store with a line-oriented REPL.")]
struct Cli {
    /// Path to the database file. Created on first use if it doesn't exist.
    filename: String,

    /// Page-cache ceiling. Can only shrink the built-in 100-page cap, never
    /// raise it.
    #[arg(long, env = "SIMPLEDB_MAX_PAGES", default_value_t = MAX_PAGES)]
    max_pages: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let mut table = match Table::open_with_max_pages(&cli.filename, cli.max_pages) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let mut input = BufReader::new(stdin.lock());
    let mut stdout = io::stdout();

    match repl::run(&mut table, &mut input, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
