//! Summary command - what is owed for each personal tax year

use crate::cmd::LedgerArgs;
use clap::Args;
use paye::money::format_gbp;
use paye::tax::report::Paye;
use paye::tax::{personal_tax_years, PersonalYearReport, TaxYear, Tranche};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct SummaryCommand {
    /// Tax year to report (e.g., 2021 for 2021/22). All years when omitted.
    #[arg(short, long)]
    year: Option<i32>,

    /// Include future transactions, predicting their deductions
    #[arg(short, long)]
    future: bool,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl SummaryCommand {
    pub fn exec(&self, args: &LedgerArgs) -> anyhow::Result<()> {
        let ctx = args.load()?;
        let years = match self.year {
            Some(year) => vec![TaxYear(year)],
            None => personal_tax_years(&ctx.ledger, self.future),
        };

        let reports = years
            .into_iter()
            .map(|year| PersonalYearReport::build(&ctx.ledger, year, self.future, ctx.today))
            .collect::<Result<Vec<_>, _>>()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else if reports.is_empty() {
            println!("No transactions found");
        } else {
            for report in &reports {
                print_report(report);
            }
        }
        Ok(())
    }
}

fn print_report(report: &PersonalYearReport) {
    println!();
    println!("TAX YEAR {} ({})", report.tax_year, report.status);
    println!();

    println!("INCOME");
    for line in &report.income {
        println!("  {}: {}", line.component_type, format_gbp(line.total));
        for company in &line.by_company {
            println!("    {}: {}", company.company, format_gbp(company.amount));
        }
    }
    println!("  Total: {}", format_gbp(report.total_income));
    println!();

    println!("INCOME TAX");
    println!(
        "  Owed: {} | PAYE: {} | HMRC bill: {}",
        format_gbp(report.income_tax.owed),
        format_gbp(report.paye.income_tax),
        format_gbp(report.income_tax_bill)
    );
    print_paye_by_company(report, |p| p.income_tax);
    if !report.income_tax.tranches.is_empty() {
        let rows: Vec<TrancheRow> = report
            .income_tax
            .tranches
            .iter()
            .map(TrancheRow::from)
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }
    println!();

    println!("NATIONAL INSURANCE");
    println!("  PAYE: {}", format_gbp(report.paye.employee_ni));
    print_paye_by_company(report, |p| p.employee_ni);
    println!();

    println!("STUDENT LOAN");
    println!(
        "  Owed: {} | PAYE: {} | HMRC bill: {}",
        format_gbp(report.student_loan_owed),
        format_gbp(report.paye.student_loan),
        format_gbp(report.student_loan_bill)
    );
    print_paye_by_company(report, |p| p.student_loan);
    println!();

    match &report.tax_return {
        Some(filed) => {
            println!("TAX RETURN: {}", format_gbp(filed.total()));
            println!(
                "  Income tax: {} (predicted {}) | Student loan: {} (predicted {})",
                format_gbp(filed.income_tax),
                format_gbp(report.income_tax_bill),
                format_gbp(filed.student_loan),
                format_gbp(report.student_loan_bill)
            );
            println!("  Predicted: {}", format_gbp(report.predicted_bill));
        }
        None => {
            println!("TAX RETURN (predicted): {}", format_gbp(report.predicted_bill));
            println!(
                "  Income tax: {} | Student loan: {}",
                format_gbp(report.income_tax_bill),
                format_gbp(report.student_loan_bill)
            );
        }
    }
    if report.it_pot > Decimal::ZERO || report.sl_pot > Decimal::ZERO {
        println!(
            "  Pot: income tax {} | student loan {} | total {}",
            format_gbp(report.it_pot),
            format_gbp(report.sl_pot),
            format_gbp(report.it_pot + report.sl_pot)
        );
    }
    for payment in &report.hmrc_payments {
        println!(
            "  Paid {}: {}",
            payment.date.format("%-d %B %Y"),
            format_gbp(payment.amount)
        );
    }
    if report.year_over {
        if report.outstanding.is_zero() {
            println!("  Paid");
        } else if report.outstanding > Decimal::ZERO {
            println!("  Owe {}", format_gbp(report.outstanding));
        } else {
            println!("  Owed {}", format_gbp(report.outstanding.abs()));
        }
    }
    println!();
}

fn print_paye_by_company(report: &PersonalYearReport, field: fn(&Paye) -> Decimal) {
    for company in &report.paye_by_company {
        let amount = field(&company.paye);
        if !amount.is_zero() {
            println!("    {}: {}", company.company, format_gbp(amount));
        }
    }
}

#[derive(Tabled)]
struct TrancheRow {
    #[tabled(rename = "Income")]
    income_type: String,
    #[tabled(rename = "Band")]
    band: &'static str,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Tax")]
    tax: String,
}

impl From<&Tranche> for TrancheRow {
    fn from(tranche: &Tranche) -> Self {
        let band = match tranche.region {
            0 => "Personal allowance",
            1 => "Basic",
            2 => "Higher",
            _ => "Additional",
        };
        TrancheRow {
            income_type: tranche.income_type.to_string(),
            band,
            rate: format!("{}%", (tranche.rate * dec!(100)).normalize()),
            amount: format_gbp(tranche.amount),
            tax: format_gbp(tranche.amount * tranche.rate),
        }
    }
}
