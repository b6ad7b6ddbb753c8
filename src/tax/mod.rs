pub mod components;
pub mod income;
pub mod ledger;
pub mod predict;
pub mod rates;
pub mod report;
pub mod student_loan;
pub mod year;

use chrono::NaiveDate;

pub use components::{
    annotate_salary_component, derive_transaction_amount, extract_components, AnnotatedComponent,
    ComponentFilter, Income, SalaryBreakdown, YearToDate,
};
pub use income::{calculate_income_tax_owed, calculate_personal_allowance, IncomeTaxOwed, Tranche};
pub use ledger::{
    read_ledger_json, Company, Component, ComponentKind, ComponentType, HmrcPayment, Ledger,
    SalaryComponent, TaxReturn, Transaction,
};
pub use predict::{
    predict_directors_employee_ni, predict_employee_ni, predict_income_tax, predict_student_loan,
};
pub use rates::{RateTable, YearRates};
pub use report::{
    payment_components, payment_rows, personal_tax_years, CompanyReport, PaymentRow,
    PersonalYearReport, YearStatus,
};
pub use student_loan::calculate_student_loan_owed;
pub use year::{resolve_tax_year, MonthStart, TaxYear};

/// Errors from the tax engine. All of them mean the inputs fall outside what
/// the rate table or ledger describes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaxError {
    #[error("no rates available for tax year {0}")]
    UnsupportedTaxYear(TaxYear),
    #[error("no National Insurance rates in effect on {0}")]
    NoNationalInsurancePeriod(NaiveDate),
    #[error("unknown company: {0}")]
    UnknownCompany(String),
    #[error("invalid company month start {0} (expected 1-12)")]
    InvalidMonthStart(u32),
}
