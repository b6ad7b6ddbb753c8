//! Flattens the ledger into annotated income components, filling in the
//! deductions on salary payments that are missing or still to come.

use super::ledger::{Company, ComponentKind, ComponentType, SalaryComponent};
use super::predict::{
    predict_directors_employee_ni, predict_employee_ni, predict_income_tax, predict_student_loan,
};
use super::year::TaxYear;
use super::TaxError;
use crate::money::round2;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Salary paid and deducted so far in a tax year, by one company
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YearToDate {
    pub income: Decimal,
    pub income_tax: Decimal,
    pub employee_ni: Decimal,
}

impl YearToDate {
    pub fn add(&mut self, salary: &SalaryBreakdown) {
        self.income += salary.gross;
        self.income_tax += salary.income_tax;
        self.employee_ni += salary.employee_ni;
    }
}

/// A salary payment with every deduction known
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryBreakdown {
    /// As recorded: net for past payments, gross for future ones
    pub amount: Decimal,
    pub gross: Decimal,
    pub net: Decimal,
    pub income_tax: Decimal,
    #[serde(rename = "employeeNI")]
    pub employee_ni: Decimal,
    pub student_loan: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Income {
    #[serde(rename = "salary")]
    Salary(SalaryBreakdown),
    #[serde(rename = "dividend")]
    Dividend { amount: Decimal },
    #[serde(rename = "interest")]
    Interest { amount: Decimal },
    #[serde(rename = "use of home")]
    UseOfHome { amount: Decimal },
    #[serde(rename = "shares")]
    Shares { amount: Decimal },
}

impl Income {
    pub fn component_type(&self) -> ComponentType {
        match self {
            Income::Salary(_) => ComponentType::Salary,
            Income::Dividend { .. } => ComponentType::Dividend,
            Income::Interest { .. } => ComponentType::Interest,
            Income::UseOfHome { .. } => ComponentType::UseOfHome,
            Income::Shares { .. } => ComponentType::Shares,
        }
    }

    /// Before deductions
    pub fn gross(&self) -> Decimal {
        match self {
            Income::Salary(salary) => salary.gross,
            Income::Dividend { amount }
            | Income::Interest { amount }
            | Income::UseOfHome { amount }
            | Income::Shares { amount } => *amount,
        }
    }

    /// What actually reaches the bank account
    pub fn net(&self) -> Decimal {
        match self {
            Income::Salary(salary) => salary.net,
            other => other.gross(),
        }
    }

    pub fn salary(&self) -> Option<&SalaryBreakdown> {
        match self {
            Income::Salary(salary) => Some(salary),
            _ => None,
        }
    }
}

/// A ledger component with its provenance and resolved tax years
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedComponent {
    pub company: String,
    pub color: String,
    /// Transaction date
    pub date: NaiveDate,
    pub future: bool,
    /// Position of the transaction within its company
    pub transaction_index: usize,
    /// Date counted for personal tax
    pub personal_date: NaiveDate,
    /// Date counted for the company's accounts
    pub company_date: NaiveDate,
    pub personal_tax_year: TaxYear,
    pub company_tax_year: TaxYear,
    #[serde(flatten)]
    pub income: Income,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub it_pot: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl_pot: Option<Decimal>,
}

impl AnnotatedComponent {
    pub fn component_type(&self) -> ComponentType {
        self.income.component_type()
    }
}

/// Which components [`extract_components`] returns. The default keeps every
/// past component of every company.
#[derive(Debug, Clone, Default)]
pub struct ComponentFilter {
    pub component_type: Option<ComponentType>,
    pub company: Option<String>,
    /// Personal tax year, or the company's own tax year when filtering by company
    pub tax_year: Option<TaxYear>,
    pub include_future: bool,
}

impl ComponentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = Some(component_type);
        self
    }

    pub fn company(mut self, name: impl Into<String>) -> Self {
        self.company = Some(name.into());
        self
    }

    pub fn tax_year(mut self, year: TaxYear) -> Self {
        self.tax_year = Some(year);
        self
    }

    pub fn include_future(mut self, include: bool) -> Self {
        self.include_future = include;
        self
    }

    fn matches(&self, component: &AnnotatedComponent) -> bool {
        if let Some(component_type) = self.component_type {
            if component.component_type() != component_type {
                return false;
            }
        }
        match (self.tax_year, &self.company) {
            (Some(year), Some(_)) => component.company_tax_year == year,
            (Some(year), None) => component.personal_tax_year == year,
            (None, _) => true,
        }
    }
}

/// Walk companies and their transactions in ledger order, annotating every
/// component and keeping those the filter selects.
///
/// Salary deductions are predicted from running totals per company and
/// personal tax year. The totals include components the filter drops, so
/// transactions are expected in date order within each company.
pub fn extract_components(
    companies: &[Company],
    filter: &ComponentFilter,
) -> Result<Vec<AnnotatedComponent>, TaxError> {
    let mut extracted = Vec::new();

    for company in companies {
        if filter.company.as_ref().is_some_and(|name| *name != company.name) {
            continue;
        }

        let mut to_date: HashMap<TaxYear, YearToDate> = HashMap::new();
        let mut previous: Option<NaiveDate> = None;

        for (transaction_index, transaction) in company.transactions.iter().enumerate() {
            if transaction.future && !filter.include_future {
                continue;
            }
            if previous.is_some_and(|p| transaction.date < p) {
                log::warn!(
                    "{}: transaction on {} is out of date order, predictions may be off",
                    company.name,
                    transaction.date
                );
            }
            previous = Some(transaction.date);

            for component in &transaction.components {
                let personal_date = component.personal_date.unwrap_or(transaction.date);
                let company_date = component.company_date.unwrap_or(transaction.date);
                let personal_tax_year = TaxYear::from_date(personal_date);

                let income = match &component.kind {
                    ComponentKind::Salary(salary) => {
                        let ytd = to_date.entry(personal_tax_year).or_default();
                        let breakdown = annotate_salary_component(
                            salary,
                            transaction.future,
                            personal_date,
                            ytd,
                            company.cumulative_ni,
                        )?;
                        ytd.add(&breakdown);
                        Income::Salary(breakdown)
                    }
                    ComponentKind::Dividend { amount } => Income::Dividend { amount: *amount },
                    ComponentKind::Interest { amount } => Income::Interest { amount: *amount },
                    ComponentKind::UseOfHome { amount } => Income::UseOfHome { amount: *amount },
                    ComponentKind::Shares { amount } => Income::Shares { amount: *amount },
                };

                let annotated = AnnotatedComponent {
                    company: company.name.clone(),
                    color: company.color.clone(),
                    date: transaction.date,
                    future: transaction.future,
                    transaction_index,
                    personal_date,
                    company_date,
                    personal_tax_year,
                    company_tax_year: TaxYear::for_company(company_date, company.month_start),
                    income,
                    it_pot: component.it_pot,
                    sl_pot: component.sl_pot,
                };
                if filter.matches(&annotated) {
                    extracted.push(annotated);
                }
            }
        }
    }

    Ok(extracted)
}

/// Work out gross, net and deductions of one salary payment.
///
/// Past payments record the net amount and any deductions, missing ones
/// count as zero. Future payments record the gross amount; missing
/// deductions are predicted from `to_date`, the company's totals for the
/// tax year before this payment.
pub fn annotate_salary_component(
    salary: &SalaryComponent,
    future: bool,
    date: NaiveDate,
    to_date: &YearToDate,
    cumulative_ni: bool,
) -> Result<SalaryBreakdown, TaxError> {
    let amount = salary.amount;

    let breakdown = if future {
        let salary_to_date = to_date.income + amount;
        let income_tax = match salary.income_tax {
            Some(income_tax) => income_tax,
            None => predict_income_tax(salary_to_date, date, to_date.income_tax)?,
        };
        let employee_ni = match salary.employee_ni {
            Some(employee_ni) => employee_ni,
            None if cumulative_ni => {
                predict_directors_employee_ni(salary_to_date, date, to_date.employee_ni)?
            }
            None => predict_employee_ni(amount, date)?,
        };
        let student_loan = match salary.student_loan {
            Some(student_loan) => student_loan,
            None => predict_student_loan(amount, date)?,
        };
        SalaryBreakdown {
            amount,
            gross: amount,
            net: round2(amount - income_tax - employee_ni - student_loan),
            income_tax,
            employee_ni,
            student_loan,
        }
    } else {
        let income_tax = salary.income_tax.unwrap_or_default();
        let employee_ni = salary.employee_ni.unwrap_or_default();
        let student_loan = salary.student_loan.unwrap_or_default();
        SalaryBreakdown {
            amount,
            gross: round2(amount + income_tax + employee_ni + student_loan),
            net: amount,
            income_tax,
            employee_ni,
            student_loan,
        }
    };

    log::debug!(
        "{date}: salary gross {} net {} (income tax {}, NI {}, student loan {}){}",
        breakdown.gross,
        breakdown.net,
        breakdown.income_tax,
        breakdown.employee_ni,
        breakdown.student_loan,
        if future { " predicted" } else { "" }
    );
    Ok(breakdown)
}

/// Net amount of a transaction recorded without one: the sum of its
/// components' net amounts.
pub fn derive_transaction_amount<'a>(
    components: impl IntoIterator<Item = &'a AnnotatedComponent>,
) -> Decimal {
    round2(components.into_iter().map(|c| c.income.net()).sum())
}
