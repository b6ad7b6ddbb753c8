pub mod company;
pub mod payments;
pub mod rates;
pub mod schema;
pub mod summary;

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::Args;
use paye::tax::{read_ledger_json, Ledger, RateTable};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Inputs shared by every command that reads the ledger
#[derive(Args, Debug)]
pub struct LedgerArgs {
    /// Ledger JSON file. Reads from stdin with "-".
    #[arg(short, long, global = true, default_value = "-")]
    ledger: PathBuf,

    /// JSON rate table to use instead of the built-in HMRC rates
    #[arg(long, global = true)]
    rates: Option<PathBuf>,

    /// Date to report status against (defaults to today)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
}

/// What a command needs once the inputs are loaded
pub struct Context {
    pub ledger: Ledger,
    pub today: NaiveDate,
}

impl LedgerArgs {
    /// Install the rate table override, if any. Must run before any
    /// calculation.
    pub fn install_rates(&self) -> anyhow::Result<()> {
        if let Some(path) = &self.rates {
            let file = File::open(path)
                .with_context(|| format!("Failed to open rate table {}", path.display()))?;
            RateTable::install(RateTable::from_json(BufReader::new(file))?)?;
            log::info!("Using rate table from {}", path.display());
        }
        Ok(())
    }

    pub fn load(&self) -> anyhow::Result<Context> {
        self.install_rates()?;
        let ledger = read_ledger(&self.ledger)?;
        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        Ok(Context { ledger, today })
    }
}

/// Read the ledger from a file, or stdin with "-"
pub fn read_ledger(path: &Path) -> anyhow::Result<Ledger> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        let file = File::open(path)
            .with_context(|| format!("Failed to open ledger {}", path.display()))?;
        read_ledger_json(BufReader::new(file))
    }
}

fn read_from_stdin() -> anyhow::Result<Ledger> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a ledger file or pipe it to stdin.");
    }

    read_ledger_json(io::Cursor::new(buffer))
}
