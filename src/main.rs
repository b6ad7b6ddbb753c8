use clap::{Parser, Subcommand};

mod cmd;

use cmd::{
    company::CompanyCommand, payments::PaymentsCommand, rates::RatesCommand,
    schema::SchemaCommand, summary::SummaryCommand, LedgerArgs,
};

/// UK income tax, National Insurance and student loan for company directors
#[derive(Parser, Debug)]
#[command(name = "paye", version, about)]
struct Cli {
    #[command(flatten)]
    ledger: LedgerArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// What is owed for each personal tax year
    Summary(SummaryCommand),
    /// Every payment received in a personal tax year
    Payments(PaymentsCommand),
    /// Balance with a company and its income by company tax year
    Company(CompanyCommand),
    /// Print the rate table in effect
    Rates(RatesCommand),
    /// Print the JSON Schema of an input file
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Summary(cmd) => cmd.exec(&cli.ledger),
        Command::Payments(cmd) => cmd.exec(&cli.ledger),
        Command::Company(cmd) => cmd.exec(&cli.ledger),
        Command::Rates(cmd) => cmd.exec(&cli.ledger),
        Command::Schema(cmd) => cmd.exec(),
    }
}
