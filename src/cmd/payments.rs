//! Payments command - every payment received in a personal tax year

use crate::cmd::LedgerArgs;
use clap::Args;
use paye::money::format_gbp;
use paye::tax::{payment_components, PaymentRow, TaxYear};
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct PaymentsCommand {
    /// Tax year to list (e.g., 2021 for 2021/22)
    #[arg(short, long)]
    year: i32,

    /// Include future transactions, predicting their deductions
    #[arg(short, long)]
    future: bool,

    /// Include payments under £200
    #[arg(long)]
    show_small: bool,

    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output the annotated components as JSON
    #[arg(long)]
    json: bool,
}

impl PaymentsCommand {
    pub fn exec(&self, args: &LedgerArgs) -> anyhow::Result<()> {
        let ctx = args.load()?;
        let components = payment_components(
            &ctx.ledger.companies,
            TaxYear(self.year),
            self.future,
            self.show_small,
        )?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&components)?);
            return Ok(());
        }

        let rows: Vec<PaymentRow> = components.iter().map(PaymentRow::from).collect();
        if self.csv {
            self.write_csv(&rows)
        } else {
            self.print_table(&rows);
            Ok(())
        }
    }

    fn print_table(&self, rows: &[PaymentRow]) {
        if rows.is_empty() {
            println!("No payments found in {}", TaxYear(self.year));
            return;
        }

        let rows: Vec<PaymentView> = rows.iter().map(PaymentView::from).collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    fn write_csv(&self, rows: &[PaymentRow]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[derive(Tabled)]
struct PaymentView {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Company")]
    company: String,
    #[tabled(rename = "Type")]
    component_type: String,
    #[tabled(rename = "Gross")]
    gross: String,
    #[tabled(rename = "Income Tax")]
    income_tax: String,
    #[tabled(rename = "NI")]
    employee_ni: String,
    #[tabled(rename = "Student Loan")]
    student_loan: String,
    #[tabled(rename = "Net")]
    net: String,
}

impl From<&PaymentRow> for PaymentView {
    fn from(row: &PaymentRow) -> Self {
        let mut date = row.date.format("%-d %b %Y").to_string();
        if row.future {
            date.push_str(" *");
        }
        PaymentView {
            date,
            company: row.company.clone(),
            component_type: row.component_type.to_string(),
            gross: format_gbp(row.gross),
            income_tax: format_gbp(row.income_tax),
            employee_ni: format_gbp(row.employee_ni),
            student_loan: format_gbp(row.student_loan),
            net: format_gbp(row.net),
        }
    }
}
