//! Deductions expected on a salary payment that has not happened yet,
//! projected from the year to date.

use super::income::calculate_personal_allowance;
use super::rates::NiPeriod;
use super::year::{tax_month, TaxYear};
use super::{RateTable, TaxError};
use crate::money::{round2, truncate};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Added to the standard personal allowance when projecting PAYE income tax,
/// matching the 1257L style tax codes payroll uses.
pub const TAX_CODE_ALLOWANCE_OFFSET: Decimal = dec!(9);

const MONTHS: Decimal = dec!(12);

/// Income tax due on a payment, given the salary paid in the tax year up to
/// and including it and the income tax already paid.
///
/// Allowance and bands are pro-rated to the payroll month. A negative result
/// is a refund.
pub fn predict_income_tax(
    salary_to_date: Decimal,
    date: NaiveDate,
    income_tax_paid: Decimal,
) -> Result<Decimal, TaxError> {
    let rates = RateTable::current().year(TaxYear::from_date(date))?;
    let month = Decimal::from(tax_month(date));

    let annual_salary = salary_to_date / month * MONTHS;
    let allowance = calculate_personal_allowance(
        annual_salary,
        rates.personal_allowance + TAX_CODE_ALLOWANCE_OFFSET,
        rates,
    );

    let allowance_to_date = allowance * month / MONTHS;
    let higher_to_date = rates.higher_band * month / MONTHS;
    let additional_to_date = rates.additional_band * month / MONTHS;

    let taxable = (salary_to_date - allowance_to_date).max(Decimal::ZERO);
    let salary = &rates.salary;
    let owed = if taxable <= higher_to_date {
        taxable * salary.basic
    } else if taxable <= additional_to_date {
        higher_to_date * salary.basic + (taxable - higher_to_date) * salary.higher
    } else {
        higher_to_date * salary.basic
            + (additional_to_date - higher_to_date) * salary.higher
            + (taxable - additional_to_date) * salary.additional
    };

    let due = round2(owed - income_tax_paid);
    log::debug!(
        "{date}: income tax on {salary_to_date} to date (month {month}, allowance {allowance_to_date}) is {due}"
    );
    Ok(due)
}

/// Employee NI on a single monthly payment, using the rates in effect on
/// `date` (the non-cumulative method).
pub fn predict_employee_ni(amount: Decimal, date: NaiveDate) -> Result<Decimal, TaxError> {
    let period = RateTable::current().ni_period(date)?;
    let primary = period.pt / MONTHS;
    let upper = period.uel / MONTHS;

    let ni = if amount <= primary {
        Decimal::ZERO
    } else if amount <= upper {
        round2((amount - primary) * period.employee_rate1)
    } else {
        round2((upper - primary) * period.employee_rate1 + (amount - upper) * period.employee_rate2)
    };
    log::debug!("{date}: employee NI on {amount} is {ni}");
    Ok(ni)
}

/// Employee NI due on a payment using the annual earnings period directors
/// are assessed on: salary to date against annual thresholds.
///
/// When rates change during the year, the rates of every period that has
/// started are blended, weighted by the months each is in effect.
pub fn predict_directors_employee_ni(
    salary_to_date: Decimal,
    date: NaiveDate,
    employee_ni_paid: Decimal,
) -> Result<Decimal, TaxError> {
    let year = TaxYear::from_date(date);
    let rates = RateTable::current().year(year)?;
    let periods = rates.ni_periods_started(year, date);
    let (current, _) = periods
        .last()
        .copied()
        .ok_or(TaxError::NoNationalInsurancePeriod(date))?;

    let months: Decimal = periods.iter().map(|(_, m)| Decimal::from(*m)).sum();
    let (rate1, rate2) = if months.is_zero() {
        (current.employee_rate1, current.employee_rate2)
    } else {
        let blend = |rate: fn(&NiPeriod) -> Decimal| {
            periods
                .iter()
                .map(|(p, m)| rate(p) * Decimal::from(*m))
                .sum::<Decimal>()
                / months
        };
        (blend(|p| p.employee_rate1), blend(|p| p.employee_rate2))
    };

    let owed = if salary_to_date <= current.pt {
        Decimal::ZERO
    } else if salary_to_date <= current.uel {
        (salary_to_date - current.pt) * rate1
    } else {
        (current.uel - current.pt) * rate1 + (salary_to_date - current.uel) * rate2
    };

    let due = round2(owed - employee_ni_paid);
    log::debug!(
        "{date}: directors' NI on {salary_to_date} to date at blended {rate1}/{rate2} is {due}"
    );
    Ok(due)
}

/// Student loan deduction on a single monthly payment, in whole pounds
pub fn predict_student_loan(amount: Decimal, date: NaiveDate) -> Result<Decimal, TaxError> {
    let rates = RateTable::current().year(TaxYear::from_date(date))?;
    let excess = (amount - rates.student_loan.threshold / MONTHS).max(Decimal::ZERO);
    let deduction = round2(truncate(excess * rates.student_loan.rate));
    log::debug!("{date}: student loan on {amount} is {deduction}");
    Ok(deduction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn income_tax_three_months_in() {
        let due = predict_income_tax(dec!(18000), date("2022-06-12"), dec!(4000)).unwrap();
        assert_eq!(due, dec!(57.1));
    }

    #[test]
    fn income_tax_refund_when_overpaid() {
        let due = predict_income_tax(dec!(20000), date("2022-01-06"), dec!(3000)).unwrap();
        assert_eq!(due, dec!(-1096.5));
    }

    #[test]
    fn income_tax_first_month() {
        let due = predict_income_tax(dec!(5000), date("2022-04-06"), dec!(0)).unwrap();
        assert_eq!(due, dec!(952.37));
    }

    #[test]
    fn income_tax_reaches_additional_rate() {
        let due = predict_income_tax(dec!(65000), date("2022-07-06"), dec!(2743.33)).unwrap();
        assert_eq!(due, dec!(21493.34));
    }

    #[test]
    fn income_tax_unsupported_year() {
        let err = predict_income_tax(dec!(1000), date("2030-05-06"), dec!(0)).unwrap_err();
        assert_eq!(err, TaxError::UnsupportedTaxYear(TaxYear(2030)));
    }

    #[test]
    fn employee_ni_below_primary_threshold() {
        assert_eq!(predict_employee_ni(dec!(1048), date("2024-04-06")).unwrap(), dec!(0));
    }

    #[test]
    fn employee_ni_main_rate() {
        assert_eq!(predict_employee_ni(dec!(3000), date("2021-06-01")).unwrap(), dec!(264.36));
        assert_eq!(predict_employee_ni(dec!(3000), date("2022-06-12")).unwrap(), dec!(288.45));
    }

    #[test]
    fn employee_ni_above_upper_earnings_limit() {
        assert_eq!(predict_employee_ni(dec!(5000), date("2024-04-23")).unwrap(), dec!(267.5));
        assert_eq!(predict_employee_ni(dec!(5000), date("2022-01-06")).unwrap(), dec!(423.26));
        assert_eq!(predict_employee_ni(dec!(50000), date("2022-07-06")).unwrap(), dec!(1905.04));
    }

    #[test]
    fn directors_ni_single_period() {
        let due = predict_directors_employee_ni(dec!(18000), date("2022-06-12"), dec!(10)).unwrap();
        assert_eq!(due, dec!(1066.43));
        let due = predict_directors_employee_ni(dec!(10000), date("2022-05-06"), dec!(0)).unwrap();
        assert_eq!(due, dec!(16.43));
    }

    #[test]
    fn directors_ni_blends_started_periods() {
        let due =
            predict_directors_employee_ni(dec!(65000), date("2022-07-06"), dec!(16.43)).unwrap();
        assert_eq!(due, dec!(5456.55));
        let due =
            predict_directors_employee_ni(dec!(70000), date("2022-08-06"), dec!(5472.98)).unwrap();
        assert_eq!(due, dec!(162.5));
        let due = predict_directors_employee_ni(dec!(60000), date("2022-12-06"), dec!(0)).unwrap();
        assert_eq!(due, dec!(5063.48));
        let due = predict_directors_employee_ni(dec!(40000), date("2024-02-06"), dec!(0)).unwrap();
        assert_eq!(due, dec!(3153.76));
    }

    #[test]
    fn student_loan_whole_pounds() {
        assert_eq!(predict_student_loan(dec!(3000), date("2022-06-12")).unwrap(), dec!(118));
        assert_eq!(predict_student_loan(dec!(5000), date("2022-01-06")).unwrap(), dec!(300));
        assert_eq!(predict_student_loan(dec!(50000), date("2022-07-06")).unwrap(), dec!(4348));
    }

    #[test]
    fn student_loan_below_threshold() {
        assert_eq!(predict_student_loan(dec!(1000), date("2022-06-12")).unwrap(), dec!(0));
    }
}
