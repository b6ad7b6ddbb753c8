//! Per tax year figures for a person and per company, built from the
//! annotated components of the ledger.

use super::components::{
    derive_transaction_amount, extract_components, AnnotatedComponent, ComponentFilter,
};
use super::income::{calculate_income_tax_owed, IncomeTaxOwed};
use super::ledger::{Company, ComponentType, HmrcPayment, Ledger, TaxReturn};
use super::student_loan::calculate_student_loan_owed;
use super::year::TaxYear;
use super::TaxError;
use crate::money::{round2, truncate};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Payments below this gross amount are hidden from the payments table by default
pub const SMALL_PAYMENT: Decimal = dec!(200);

/// Income types shown in a personal year, in display order
const PERSONAL_INCOME: [ComponentType; 4] = [
    ComponentType::Salary,
    ComponentType::Dividend,
    ComponentType::UseOfHome,
    ComponentType::Interest,
];

/// Income types shown for a company year, in display order
const COMPANY_INCOME: [ComponentType; 3] = [
    ComponentType::Salary,
    ComponentType::Dividend,
    ComponentType::UseOfHome,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum YearStatus {
    Done,
    PaymentsPending,
    NeedsTaxReturn,
    Ongoing,
    Future,
}

impl YearStatus {
    pub fn display(&self) -> &'static str {
        match self {
            YearStatus::Done => "Done",
            YearStatus::PaymentsPending => "Payments pending",
            YearStatus::NeedsTaxReturn => "Needs tax return",
            YearStatus::Ongoing => "Ongoing",
            YearStatus::Future => "Future",
        }
    }
}

impl std::fmt::Display for YearStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyAmount {
    pub company: String,
    pub color: String,
    pub amount: Decimal,
}

/// Total of one kind of income, and how much came from each company
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeLine {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub total: Decimal,
    pub by_company: Vec<CompanyAmount>,
}

/// Deductions taken through payroll
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paye {
    pub income_tax: Decimal,
    #[serde(rename = "employeeNI")]
    pub employee_ni: Decimal,
    pub student_loan: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyPaye {
    pub company: String,
    pub color: String,
    pub paye: Paye,
}

/// Everything owed and paid for one personal tax year
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalYearReport {
    pub tax_year: TaxYear,
    pub include_future: bool,
    /// Non-zero income types only
    pub income: Vec<IncomeLine>,
    pub total_income: Decimal,
    pub paye: Paye,
    /// Companies that paid a salary in the year
    pub paye_by_company: Vec<CompanyPaye>,
    pub income_tax: IncomeTaxOwed,
    /// Income tax still due after PAYE, negative for a refund
    pub income_tax_bill: Decimal,
    pub student_loan_owed: Decimal,
    /// Student loan still due after PAYE, in whole pounds
    pub student_loan_bill: Decimal,
    pub predicted_bill: Decimal,
    pub it_pot: Decimal,
    pub sl_pot: Decimal,
    pub tax_return: Option<TaxReturn>,
    pub hmrc_payments: Vec<HmrcPayment>,
    pub paid: Decimal,
    /// Left to pay HMRC against the filed return, or the prediction without one
    pub outstanding: Decimal,
    pub year_over: bool,
    pub status: YearStatus,
}

impl PersonalYearReport {
    pub fn build(
        ledger: &Ledger,
        tax_year: TaxYear,
        include_future: bool,
        today: NaiveDate,
    ) -> Result<Self, TaxError> {
        let filter = ComponentFilter::new()
            .tax_year(tax_year)
            .include_future(include_future);
        let components = extract_components(&ledger.companies, &filter)?;

        let income: Vec<IncomeLine> = PERSONAL_INCOME
            .iter()
            .map(|t| income_line(&ledger.companies, &components, *t))
            .filter(|line| !line.total.is_zero())
            .collect();
        let total_income: Decimal = income.iter().map(|line| line.total).sum();

        let total_of = |component_type: ComponentType| {
            components
                .iter()
                .filter(|c| c.component_type() == component_type)
                .map(|c| c.income.gross())
                .sum::<Decimal>()
        };
        let salary = total_of(ComponentType::Salary);
        let interest = total_of(ComponentType::Interest);
        let dividend = total_of(ComponentType::Dividend);

        let paye = paye_of(components.iter());
        let paye_by_company = ledger
            .companies
            .iter()
            .filter_map(|company| {
                let mut salaries = components
                    .iter()
                    .filter(|c| c.company == company.name && c.income.salary().is_some())
                    .peekable();
                salaries.peek()?;
                Some(CompanyPaye {
                    company: company.name.clone(),
                    color: company.color.clone(),
                    paye: paye_of(salaries),
                })
            })
            .collect();

        let income_tax = calculate_income_tax_owed(salary, interest, dividend, tax_year)?;
        let income_tax_bill = income_tax.owed - paye.income_tax;

        let student_loan_owed = calculate_student_loan_owed(salary + interest + dividend, tax_year)?;
        let student_loan_bill = truncate(student_loan_owed - paye.student_loan);
        let predicted_bill = income_tax_bill + student_loan_bill;

        let taxed = components.iter().filter(|c| {
            matches!(
                c.component_type(),
                ComponentType::Salary | ComponentType::Dividend | ComponentType::Interest
            )
        });
        let (it_pot, sl_pot) = taxed.fold((Decimal::ZERO, Decimal::ZERO), |(it, sl), c| {
            (
                it + c.it_pot.unwrap_or_default(),
                sl + c.sl_pot.unwrap_or_default(),
            )
        });

        let tax_return = ledger.tax_return(tax_year).cloned();
        let hmrc_payments: Vec<HmrcPayment> = ledger.payments_for(tax_year).cloned().collect();
        let paid: Decimal = hmrc_payments.iter().map(|p| p.amount).sum();
        let due = tax_return.as_ref().map_or(predicted_bill, TaxReturn::total);
        let outstanding = round2(due - paid);

        let year_over = today > tax_year.end_date();
        let status = match &tax_return {
            Some(_) if outstanding.is_zero() => YearStatus::Done,
            Some(_) => YearStatus::PaymentsPending,
            None if year_over => YearStatus::NeedsTaxReturn,
            None if today >= tax_year.start_date() => YearStatus::Ongoing,
            None => YearStatus::Future,
        };

        log::info!(
            "{}: income {}, income tax owed {}, student loan owed {}, outstanding {} ({})",
            tax_year,
            total_income,
            income_tax.owed,
            student_loan_owed,
            outstanding,
            status
        );

        Ok(PersonalYearReport {
            tax_year,
            include_future,
            income,
            total_income,
            paye,
            paye_by_company,
            income_tax,
            income_tax_bill,
            student_loan_owed,
            student_loan_bill,
            predicted_bill,
            it_pot,
            sl_pot,
            tax_return,
            hmrc_payments,
            paid,
            outstanding,
            year_over,
            status,
        })
    }
}

fn income_line(
    companies: &[Company],
    components: &[AnnotatedComponent],
    component_type: ComponentType,
) -> IncomeLine {
    let of_type: Vec<&AnnotatedComponent> = components
        .iter()
        .filter(|c| c.component_type() == component_type)
        .collect();
    let by_company = companies
        .iter()
        .filter_map(|company| {
            let amount: Decimal = of_type
                .iter()
                .filter(|c| c.company == company.name)
                .map(|c| c.income.gross())
                .sum();
            (!amount.is_zero()).then(|| CompanyAmount {
                company: company.name.clone(),
                color: company.color.clone(),
                amount,
            })
        })
        .collect();
    IncomeLine {
        component_type,
        total: of_type.iter().map(|c| c.income.gross()).sum(),
        by_company,
    }
}

fn paye_of<'a>(components: impl Iterator<Item = &'a AnnotatedComponent>) -> Paye {
    components
        .filter_map(|c| c.income.salary())
        .fold(Paye::default(), |acc, s| Paye {
            income_tax: acc.income_tax + s.income_tax,
            employee_ni: acc.employee_ni + s.employee_ni,
            student_loan: acc.student_loan + s.student_loan,
        })
}

/// Personal tax years with at least one transaction, latest first
pub fn personal_tax_years(ledger: &Ledger, include_future: bool) -> Vec<TaxYear> {
    let years: BTreeSet<TaxYear> = ledger
        .companies
        .iter()
        .flat_map(|c| c.transactions.iter())
        .filter(|t| include_future || !t.future)
        .map(|t| TaxYear::from_date(t.date))
        .collect();
    years.into_iter().rev().collect()
}

/// One line of the payments table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRow {
    pub date: NaiveDate,
    pub company: String,
    pub color: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub gross: Decimal,
    pub income_tax: Decimal,
    #[serde(rename = "employeeNI")]
    pub employee_ni: Decimal,
    pub student_loan: Decimal,
    pub net: Decimal,
    pub future: bool,
}

/// Income types listed as payments, in the order they appear on the same day
const PAYMENT_INCOME: [ComponentType; 4] = [
    ComponentType::Salary,
    ComponentType::Dividend,
    ComponentType::Interest,
    ComponentType::UseOfHome,
];

/// Annotated components received in a personal tax year, by date. Salaries
/// come before other income paid on the same day.
pub fn payment_components(
    companies: &[Company],
    tax_year: TaxYear,
    include_future: bool,
    show_small: bool,
) -> Result<Vec<AnnotatedComponent>, TaxError> {
    let filter = ComponentFilter::new()
        .tax_year(tax_year)
        .include_future(include_future);
    let components = extract_components(companies, &filter)?;

    let mut payments: Vec<AnnotatedComponent> = PAYMENT_INCOME
        .iter()
        .flat_map(|t| components.iter().filter(move |c| c.component_type() == *t))
        .filter(|c| show_small || c.income.gross() >= SMALL_PAYMENT)
        .cloned()
        .collect();
    payments.sort_by_key(|c| c.date);
    Ok(payments)
}

/// Every payment received in a personal tax year, as table rows
pub fn payment_rows(
    companies: &[Company],
    tax_year: TaxYear,
    include_future: bool,
    show_small: bool,
) -> Result<Vec<PaymentRow>, TaxError> {
    let components = payment_components(companies, tax_year, include_future, show_small)?;
    Ok(components.iter().map(PaymentRow::from).collect())
}

impl From<&AnnotatedComponent> for PaymentRow {
    fn from(c: &AnnotatedComponent) -> Self {
        let (income_tax, employee_ni, student_loan) = match c.income.salary() {
            Some(s) => (s.income_tax, s.employee_ni, s.student_loan),
            None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };
        PaymentRow {
            date: c.date,
            company: c.company.clone(),
            color: c.color.clone(),
            component_type: c.component_type(),
            gross: c.income.gross(),
            income_tax,
            employee_ni,
            student_loan,
            net: c.income.net(),
            future: c.future,
        }
    }
}

/// Income of one type paid by a company within one of its tax years
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyIncome {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub amount: Decimal,
    /// Split by the personal tax year of the payment date
    pub by_personal_year: BTreeMap<TaxYear, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyYear {
    pub tax_year: TaxYear,
    pub status: YearStatus,
    /// Non-zero income types only
    pub income: Vec<CompanyIncome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyReport {
    pub name: String,
    pub color: String,
    /// Positive when the company owes the director, negative the other way
    pub owed: Decimal,
    /// Latest first
    pub years: Vec<CompanyYear>,
}

impl CompanyReport {
    pub fn build(
        ledger: &Ledger,
        name: &str,
        include_future: bool,
        today: NaiveDate,
    ) -> Result<Self, TaxError> {
        let company = ledger.company(name)?;
        let filter = ComponentFilter::new()
            .company(name)
            .include_future(include_future);
        let components = extract_components(&ledger.companies, &filter)?;

        let mut net_paid = Decimal::ZERO;
        let mut years = BTreeSet::new();
        for (index, transaction) in company.transactions.iter().enumerate() {
            if transaction.future && !include_future {
                continue;
            }
            net_paid += match transaction.amount {
                Some(amount) => amount,
                None => derive_transaction_amount(
                    components.iter().filter(|c| c.transaction_index == index),
                ),
            };
            years.insert(TaxYear::for_company(transaction.date, company.month_start));
        }
        let accounted: Decimal = components.iter().map(|c| c.income.net()).sum();
        let owed = round2(accounted - net_paid);

        let years = years
            .into_iter()
            .rev()
            .map(|tax_year| CompanyYear {
                tax_year,
                status: company_year_status(company, tax_year, today),
                income: COMPANY_INCOME
                    .iter()
                    .filter_map(|t| company_income(&components, tax_year, *t))
                    .collect(),
            })
            .collect();

        log::info!("{}: balance with director {}", company.name, owed);

        Ok(CompanyReport {
            name: company.name.clone(),
            color: company.color.clone(),
            owed,
            years,
        })
    }
}

fn company_income(
    components: &[AnnotatedComponent],
    tax_year: TaxYear,
    component_type: ComponentType,
) -> Option<CompanyIncome> {
    let mut amount = Decimal::ZERO;
    let mut by_personal_year = BTreeMap::new();
    for c in components
        .iter()
        .filter(|c| c.company_tax_year == tax_year && c.component_type() == component_type)
    {
        let gross = c.income.gross();
        amount += gross;
        *by_personal_year
            .entry(TaxYear::from_date(c.date))
            .or_insert(Decimal::ZERO) += gross;
    }
    (!amount.is_zero()).then_some(CompanyIncome {
        component_type,
        amount,
        by_personal_year,
    })
}

fn company_year_status(company: &Company, tax_year: TaxYear, today: NaiveDate) -> YearStatus {
    if today >= tax_year.next().company_start_date(company.month_start) {
        YearStatus::Done
    } else if today < tax_year.company_start_date(company.month_start) {
        YearStatus::Future
    } else {
        YearStatus::Ongoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::ledger::read_ledger_json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    const LEDGER: &str = r#"{
        "companies": [
            {"name": "Sunrise Ventures", "color": "red", "monthStart": 9, "transactions": [
                {"date": "2021-04-23", "amount": 3000, "components": [
                    {"type": "salary", "amount": 900, "incomeTax": 100, "employeeNI": 50, "studentLoan": 10, "itPot": 300}
                ]},
                {"date": "2021-05-23", "amount": 13700, "components": [
                    {"type": "salary", "amount": 13700, "incomeTax": 0, "employeeNI": 0}
                ]},
                {"date": "2021-06-01", "amount": -500},
                {"date": "2021-09-15", "amount": null, "components": [
                    {"type": "dividend", "amount": 58733.22, "slPot": 1000},
                    {"type": "use of home", "amount": 26}
                ]},
                {"date": "2022-05-01", "amount": null, "future": true, "components": [
                    {"type": "dividend", "amount": 10000}
                ]}
            ]},
            {"name": "Blue Horizon", "color": "purple", "transactions": [
                {"date": "2021-06-15", "amount": 150, "components": [
                    {"type": "interest", "amount": 150}
                ]}
            ]}
        ],
        "taxReturns": [{"taxYear": 2020, "incomeTax": 500, "studentLoan": 120}],
        "hmrcPayments": [
            {"taxYear": 2020, "date": "2021-12-20", "amount": 620},
            {"taxYear": 2021, "date": "2022-07-31", "amount": 1000}
        ]
    }"#;

    fn ledger() -> Ledger {
        read_ledger_json(LEDGER.as_bytes()).unwrap()
    }

    #[test]
    fn personal_year_totals() {
        let report =
            PersonalYearReport::build(&ledger(), TaxYear(2021), false, date("2022-10-01")).unwrap();

        let totals: Vec<(ComponentType, Decimal)> =
            report.income.iter().map(|l| (l.component_type, l.total)).collect();
        assert_eq!(
            totals,
            vec![
                (ComponentType::Salary, dec!(14760)),
                (ComponentType::Dividend, dec!(58733.22)),
                (ComponentType::UseOfHome, dec!(26)),
                (ComponentType::Interest, dec!(150)),
            ]
        );
        assert_eq!(report.total_income, dec!(73669.22));
        assert_eq!(report.income[3].by_company[0].company, "Blue Horizon");

        assert_eq!(
            report.paye,
            Paye {
                income_tax: dec!(100),
                employee_ni: dec!(50),
                student_loan: dec!(10),
            }
        );
        assert_eq!(report.paye_by_company.len(), 1);

        // salary 14760, interest 150, dividend 58733.22 in 2021/22
        assert_eq!(report.income_tax.owed, dec!(10536.3));
        assert_eq!(report.income_tax_bill, dec!(10436.3));
        assert_eq!(report.student_loan_owed, dec!(4837.34));
        assert_eq!(report.student_loan_bill, dec!(4827));
        assert_eq!(report.predicted_bill, dec!(15263.3));

        assert_eq!(report.it_pot, dec!(300));
        assert_eq!(report.sl_pot, dec!(1000));
        assert_eq!(report.paid, dec!(1000));
        assert_eq!(report.outstanding, dec!(14263.3));
        assert!(report.year_over);
        assert_eq!(report.status, YearStatus::NeedsTaxReturn);
    }

    #[test]
    fn personal_year_status() {
        let ledger = ledger();
        let status = |year, today| {
            PersonalYearReport::build(&ledger, TaxYear(year), false, date(today))
                .unwrap()
                .status
        };
        assert_eq!(status(2020, "2022-10-01"), YearStatus::Done);
        assert_eq!(status(2021, "2022-04-05"), YearStatus::Ongoing);
        assert_eq!(status(2021, "2022-04-06"), YearStatus::NeedsTaxReturn);
        assert_eq!(status(2022, "2022-04-05"), YearStatus::Future);
    }

    #[test]
    fn filed_return_with_payments_pending() {
        let mut ledger = ledger();
        ledger.hmrc_payments.remove(0);
        let report =
            PersonalYearReport::build(&ledger, TaxYear(2020), false, date("2022-10-01")).unwrap();
        assert_eq!(report.outstanding, dec!(620));
        assert_eq!(report.status, YearStatus::PaymentsPending);
    }

    #[test]
    fn tax_years_latest_first() {
        assert_eq!(personal_tax_years(&ledger(), false), vec![TaxYear(2021)]);
        assert_eq!(
            personal_tax_years(&ledger(), true),
            vec![TaxYear(2022), TaxYear(2021)]
        );
    }

    #[test]
    fn payments_hide_small_amounts() {
        let ledger = ledger();
        let rows = payment_rows(&ledger.companies, TaxYear(2021), false, false).unwrap();
        let summary: Vec<(NaiveDate, ComponentType, Decimal)> = rows
            .iter()
            .map(|r| (r.date, r.component_type, r.gross))
            .collect();
        assert_eq!(
            summary,
            vec![
                (date("2021-04-23"), ComponentType::Salary, dec!(1060)),
                (date("2021-05-23"), ComponentType::Salary, dec!(13700)),
                (date("2021-09-15"), ComponentType::Dividend, dec!(58733.22)),
            ]
        );
        assert_eq!(rows[0].net, dec!(900));
        assert_eq!(rows[0].employee_ni, dec!(50));

        let all = payment_rows(&ledger.companies, TaxYear(2021), false, true).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[2].component_type, ComponentType::Interest);
        assert_eq!(all[4].component_type, ComponentType::UseOfHome);
    }

    #[test]
    fn payment_components_carry_annotations() {
        let ledger = ledger();
        let payments = payment_components(&ledger.companies, TaxYear(2021), false, true).unwrap();
        assert_eq!(payments.len(), 5);

        let first = &payments[0];
        assert_eq!(first.company, "Sunrise Ventures");
        assert_eq!(first.personal_tax_year, TaxYear(2021));
        assert_eq!(first.company_tax_year, TaxYear(2020));
        assert_eq!(first.it_pot, Some(dec!(300)));
        assert_eq!(first.income.salary().unwrap().gross, dec!(1060));

        let json = serde_json::to_value(first).unwrap();
        assert_eq!(json["type"], "salary");
        assert_eq!(json["personalTaxYear"], 2021);
        assert_eq!(json["companyTaxYear"], 2020);
        assert!(json.get("employeeNI").is_some());

        let rows = payment_rows(&ledger.companies, TaxYear(2021), false, true).unwrap();
        assert_eq!(rows[0], PaymentRow::from(first));
    }

    #[test]
    fn personal_year_report_is_repeatable() {
        let ledger = ledger();
        let build = || {
            PersonalYearReport::build(&ledger, TaxYear(2020), false, date("2022-10-01")).unwrap()
        };
        let report = build();
        assert_eq!(report, build());
        assert_eq!(
            report.tax_return,
            Some(TaxReturn {
                tax_year: TaxYear(2020),
                income_tax: dec!(500),
                student_loan: dec!(120),
            })
        );
        assert_eq!(
            report.hmrc_payments,
            vec![HmrcPayment {
                tax_year: TaxYear(2020),
                date: date("2021-12-20"),
                amount: dec!(620),
            }]
        );
    }

    #[test]
    fn company_balance_and_years() {
        let report =
            CompanyReport::build(&ledger(), "Sunrise Ventures", false, date("2022-05-01")).unwrap();
        // paid 3000 + 13700 - 500 + 58759.22, accounted for 900 + 13700 + 58759.22
        assert_eq!(report.owed, dec!(-1600));

        let years: Vec<(TaxYear, YearStatus)> =
            report.years.iter().map(|y| (y.tax_year, y.status)).collect();
        assert_eq!(
            years,
            vec![
                (TaxYear(2021), YearStatus::Ongoing),
                (TaxYear(2020), YearStatus::Done),
            ]
        );

        let current = &report.years[0];
        assert_eq!(current.income.len(), 2);
        assert_eq!(current.income[0].component_type, ComponentType::Dividend);
        assert_eq!(current.income[1].amount, dec!(26));

        let previous = &report.years[1];
        assert_eq!(previous.income.len(), 1);
        assert_eq!(previous.income[0].amount, dec!(14760));
        assert_eq!(
            previous.income[0].by_personal_year,
            BTreeMap::from([(TaxYear(2021), dec!(14760))])
        );
    }

    #[test]
    fn company_future_year() {
        let report =
            CompanyReport::build(&ledger(), "Sunrise Ventures", true, date("2022-05-01")).unwrap();
        assert_eq!(report.years.len(), 2);
        assert_eq!(report.years[0].income[0].amount, dec!(68733.22));
    }

    #[test]
    fn unknown_company() {
        let err = CompanyReport::build(&ledger(), "Nope", false, date("2022-05-01")).unwrap_err();
        assert_eq!(err, TaxError::UnknownCompany("Nope".to_string()));
    }
}
