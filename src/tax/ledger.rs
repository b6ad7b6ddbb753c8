//! Input document: companies, the transactions paid out of them and the
//! income components each transaction is made of.

use super::year::{MonthStart, TaxYear};
use super::TaxError;
use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;

/// Ledger root
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub companies: Vec<Company>,
    /// Self assessment returns already filed
    #[serde(default)]
    pub tax_returns: Vec<TaxReturn>,
    /// Payments made to HMRC against self assessment
    #[serde(default)]
    pub hmrc_payments: Vec<HmrcPayment>,
}

impl Ledger {
    pub fn company(&self, name: &str) -> Result<&Company, TaxError> {
        self.companies
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| TaxError::UnknownCompany(name.to_string()))
    }

    pub fn tax_return(&self, year: TaxYear) -> Option<&TaxReturn> {
        self.tax_returns.iter().find(|r| r.tax_year == year)
    }

    pub fn payments_for(&self, year: TaxYear) -> impl Iterator<Item = &HmrcPayment> {
        self.hmrc_payments.iter().filter(move |p| p.tax_year == year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    /// Colour used to tell companies apart when displayed
    #[serde(default)]
    pub color: String,
    /// Month (1-12) the company's financial year starts on the 1st of.
    /// Defaults to the personal tax year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_start: Option<MonthStart>,
    /// Predict employee NI with the cumulative (directors') method
    #[serde(default)]
    pub cumulative_ni: bool,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    #[serde(deserialize_with = "deserialize_date")]
    #[schemars(with = "String")]
    pub date: NaiveDate,
    /// Net cash moved. When absent it is the sum of the component net amounts.
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub amount: Option<Decimal>,
    /// Not paid yet; missing deductions are predicted
    #[serde(default)]
    pub future: bool,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// One typed income item within a transaction
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(flatten)]
    pub kind: ComponentKind,
    /// Date this counts towards for personal tax, when not the transaction date
    #[serde(
        default,
        deserialize_with = "deserialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub personal_date: Option<NaiveDate>,
    /// Date this counts towards for company accounts, when not the transaction date
    #[serde(
        default,
        deserialize_with = "deserialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub company_date: Option<NaiveDate>,
    /// Money put aside for income tax from this payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub it_pot: Option<Decimal>,
    /// Money put aside for student loan from this payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub sl_pot: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum ComponentKind {
    #[serde(rename = "salary")]
    Salary(SalaryComponent),
    #[serde(rename = "dividend")]
    Dividend {
        #[schemars(with = "f64")]
        amount: Decimal,
    },
    #[serde(rename = "interest")]
    Interest {
        #[schemars(with = "f64")]
        amount: Decimal,
    },
    #[serde(rename = "use of home")]
    UseOfHome {
        #[schemars(with = "f64")]
        amount: Decimal,
    },
    #[serde(rename = "shares")]
    Shares {
        #[schemars(with = "f64")]
        amount: Decimal,
    },
}

impl ComponentKind {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentKind::Salary(_) => ComponentType::Salary,
            ComponentKind::Dividend { .. } => ComponentType::Dividend,
            ComponentKind::Interest { .. } => ComponentType::Interest,
            ComponentKind::UseOfHome { .. } => ComponentType::UseOfHome,
            ComponentKind::Shares { .. } => ComponentType::Shares,
        }
    }
}

/// Salary as recorded on a payslip. `amount` is net for past payments and
/// gross for future ones. A missing deduction is derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SalaryComponent {
    #[serde(default)]
    #[schemars(with = "f64")]
    pub amount: Decimal,
    #[serde(rename = "incomeTax", default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub income_tax: Option<Decimal>,
    #[serde(rename = "employeeNI", default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub employee_ni: Option<Decimal>,
    #[serde(rename = "studentLoan", default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub student_loan: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentType {
    #[serde(rename = "salary")]
    Salary,
    #[serde(rename = "dividend")]
    Dividend,
    #[serde(rename = "interest")]
    Interest,
    #[serde(rename = "use of home")]
    UseOfHome,
    #[serde(rename = "shares")]
    Shares,
}

impl ComponentType {
    pub fn display(&self) -> &'static str {
        match self {
            ComponentType::Salary => "Salary",
            ComponentType::Dividend => "Dividend",
            ComponentType::Interest => "Interest",
            ComponentType::UseOfHome => "Use of Home",
            ComponentType::Shares => "Shares",
        }
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaxReturn {
    pub tax_year: TaxYear,
    #[schemars(with = "f64")]
    pub income_tax: Decimal,
    #[schemars(with = "f64")]
    pub student_loan: Decimal,
}

impl TaxReturn {
    pub fn total(&self) -> Decimal {
        self.income_tax + self.student_loan
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HmrcPayment {
    pub tax_year: TaxYear,
    #[serde(deserialize_with = "deserialize_date")]
    #[schemars(with = "String")]
    pub date: NaiveDate,
    #[schemars(with = "f64")]
    pub amount: Decimal,
}

pub fn read_ledger_json<R: Read>(reader: R) -> anyhow::Result<Ledger> {
    let ledger: Ledger = serde_json::from_reader(reader).context("Failed to parse ledger")?;
    log::debug!(
        "Read ledger with {} companies, {} transactions",
        ledger.companies.len(),
        ledger
            .companies
            .iter()
            .map(|c| c.transactions.len())
            .sum::<usize>()
    );
    Ok(ledger)
}

/// Accepts unpadded months and days ("2021-4-6") as well as ISO dates
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}"))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_date(&s).map_err(serde::de::Error::custom)
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| parse_date(&s))
        .transpose()
        .map_err(serde::de::Error::custom)
}
