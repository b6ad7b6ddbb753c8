use super::year::TaxYear;
use super::{RateTable, TaxError};
use crate::money::round2;
use rust_decimal::Decimal;

/// Student loan repayment due on a year's total income
pub fn calculate_student_loan_owed(
    total_income: Decimal,
    tax_year: TaxYear,
) -> Result<Decimal, TaxError> {
    let plan = RateTable::current().year(tax_year)?.student_loan;
    Ok(round2(
        (total_income - plan.threshold).max(Decimal::ZERO) * plan.rate,
    ))
}
