//! Company command - director's balance and income by company tax year

use crate::cmd::LedgerArgs;
use clap::Args;
use paye::money::format_gbp;
use paye::tax::CompanyReport;
use rust_decimal::Decimal;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CompanyCommand {
    /// Company name as it appears in the ledger. All companies when omitted.
    #[arg(short, long)]
    name: Option<String>,

    /// Include future transactions
    #[arg(short, long)]
    future: bool,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl CompanyCommand {
    pub fn exec(&self, args: &LedgerArgs) -> anyhow::Result<()> {
        let ctx = args.load()?;
        let names: Vec<&str> = match &self.name {
            Some(name) => vec![name.as_str()],
            None => ctx.ledger.companies.iter().map(|c| c.name.as_str()).collect(),
        };

        let reports = names
            .into_iter()
            .map(|name| CompanyReport::build(&ctx.ledger, name, self.future, ctx.today))
            .collect::<Result<Vec<_>, _>>()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            for report in &reports {
                print_report(report);
            }
        }
        Ok(())
    }
}

fn print_report(report: &CompanyReport) {
    println!();
    println!("{}", report.name.to_uppercase());
    if report.owed > Decimal::ZERO {
        println!("The company owes you {}", format_gbp(report.owed));
    } else if report.owed < Decimal::ZERO {
        println!("You owe the company {}", format_gbp(report.owed.abs()));
    } else {
        println!("All square with the company");
    }

    let rows: Vec<IncomeRow> = report
        .years
        .iter()
        .flat_map(|year| {
            year.income.iter().map(move |income| IncomeRow {
                tax_year: year.tax_year.to_string(),
                status: year.status.to_string(),
                income_type: income.component_type.to_string(),
                amount: format_gbp(income.amount),
                by_personal_year: income
                    .by_personal_year
                    .iter()
                    .map(|(personal, amount)| format!("{}: {}", personal, format_gbp(*amount)))
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        })
        .collect();

    if rows.is_empty() {
        println!("No income recorded");
    } else {
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    println!();
}

#[derive(Tabled)]
struct IncomeRow {
    #[tabled(rename = "Company Year")]
    tax_year: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    income_type: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "By Personal Year")]
    by_personal_year: String,
}
