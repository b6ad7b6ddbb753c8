//! Schema command - print expected input formats

use clap::Args;
use paye::tax::{Ledger, RateTable};
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Which input to describe
    #[arg(value_enum, default_value = "ledger")]
    target: SchemaTarget,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaTarget {
    /// JSON Schema for the ledger file
    Ledger,
    /// JSON Schema for a rate table passed with --rates
    Rates,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let schema = match self.target {
            SchemaTarget::Ledger => schema_for!(Ledger),
            SchemaTarget::Rates => schema_for!(RateTable),
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}
