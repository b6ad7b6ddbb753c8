//! Rates command - print the rate table in effect

use crate::cmd::LedgerArgs;
use clap::Args;
use paye::tax::{RateTable, TaxYear};

#[derive(Args, Debug)]
pub struct RatesCommand {
    /// Only print the rates for this tax year (e.g., 2021 for 2021/22)
    #[arg(short, long)]
    year: Option<i32>,
}

impl RatesCommand {
    pub fn exec(&self, args: &LedgerArgs) -> anyhow::Result<()> {
        args.install_rates()?;
        let table = RateTable::current();
        let json = match self.year {
            Some(year) => serde_json::to_string_pretty(table.year(TaxYear(year))?)?,
            None => serde_json::to_string_pretty(table)?,
        };
        println!("{}", json);
        Ok(())
    }
}
