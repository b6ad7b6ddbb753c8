//! Income tax owed for a whole year, allocating salary, interest and
//! dividends across the progressive bands.

use super::ledger::ComponentType;
use super::rates::{BandRates, YearRates};
use super::year::TaxYear;
use super::{RateTable, TaxError};
use crate::money::round2;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Starting rate for savings band width
const STARTING_RATE_BAND: Decimal = dec!(5000);

/// Number of bounded regions: personal allowance, basic and higher. The
/// additional rate region above them is unbounded.
const BOUNDED_REGIONS: usize = 3;
const LAST_REGION: usize = BOUNDED_REGIONS;

/// One slice of income taxed at a single rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tranche {
    #[serde(rename = "type")]
    pub income_type: ComponentType,
    pub rate: Decimal,
    /// 0 personal allowance, 1 basic, 2 higher, 3 additional
    pub region: usize,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeTaxOwed {
    pub owed: Decimal,
    pub tranches: Vec<Tranche>,
}

/// Personal allowance after the taper: reduced by 1 for every 2 of income
/// above the threshold, never below zero.
pub fn calculate_personal_allowance(
    income: Decimal,
    allowance: Decimal,
    rates: &YearRates,
) -> Decimal {
    if income <= rates.personal_allowance_threshold {
        allowance
    } else {
        (allowance - (income - rates.personal_allowance_threshold) / dec!(2)).max(Decimal::ZERO)
    }
}

/// A stage income is poured through, in order
#[derive(Debug, Clone, Copy)]
enum Step {
    /// Fill regions from the current one up to and including `through`,
    /// at the rate of each region
    Bands {
        through: usize,
        rates: [Decimal; LAST_REGION + 1],
    },
    /// Zero rate allowance of at most this much. It still takes up room in
    /// whichever regions it lands in.
    Allowance(Decimal),
}

/// Running position of total income across the regions
struct Pour {
    bounds: [Decimal; BOUNDED_REGIONS],
    position: Decimal,
    region: usize,
    tranches: Vec<Tranche>,
}

impl Pour {
    fn new(bounds: [Decimal; BOUNDED_REGIONS]) -> Self {
        let mut pour = Pour {
            bounds,
            position: Decimal::ZERO,
            region: 0,
            tranches: Vec::new(),
        };
        pour.settle();
        pour
    }

    /// Move past every region whose bound has been reached
    fn settle(&mut self) {
        while self.region < BOUNDED_REGIONS && self.position >= self.bounds[self.region] {
            self.region += 1;
        }
    }

    /// Amount that fits before the current region ends
    fn room(&self, amount: Decimal) -> Decimal {
        match self.bounds.get(self.region) {
            Some(bound) => (*bound - self.position).min(amount),
            None => amount,
        }
    }

    fn take(&mut self, income_type: ComponentType, rate: Decimal, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.tranches.push(Tranche {
                income_type,
                rate,
                region: self.region,
                amount,
            });
        }
        self.position += amount;
        self.settle();
    }

    fn pour(&mut self, income_type: ComponentType, mut amount: Decimal, steps: &[Step]) {
        for step in steps {
            match *step {
                Step::Bands { through, rates } => {
                    while amount > Decimal::ZERO && self.region <= through {
                        let slice = self.room(amount);
                        self.take(income_type, rates[self.region], slice);
                        amount -= slice;
                    }
                }
                Step::Allowance(mut remaining) => {
                    while amount > Decimal::ZERO && remaining > Decimal::ZERO {
                        let slice = self.room(amount).min(remaining);
                        self.take(income_type, Decimal::ZERO, slice);
                        amount -= slice;
                        remaining -= slice;
                    }
                }
            }
        }
    }
}

fn region_rates(rates: &BandRates) -> [Decimal; LAST_REGION + 1] {
    [Decimal::ZERO, rates.basic, rates.higher, rates.additional]
}

/// Income tax owed on a year's income, with the tranches it is made of.
///
/// Income is allocated salary first, then interest, then dividends. Interest
/// and dividends use whatever personal allowance salary left, then their own
/// zero rate allowances, then the bands at their own rates.
pub fn calculate_income_tax_owed(
    salary: Decimal,
    interest: Decimal,
    dividend: Decimal,
    tax_year: TaxYear,
) -> Result<IncomeTaxOwed, TaxError> {
    let rates = RateTable::current().year(tax_year)?;
    let total = salary + interest + dividend;

    let personal_allowance =
        calculate_personal_allowance(total, rates.personal_allowance, rates);
    let basic_limit = personal_allowance + rates.higher_band;

    let savings_allowance = if total <= basic_limit {
        dec!(1000)
    } else if total <= rates.additional_band {
        dec!(500)
    } else {
        Decimal::ZERO
    };

    let non_savings = salary + dividend;
    let starting_rate = if non_savings <= personal_allowance + STARTING_RATE_BAND {
        STARTING_RATE_BAND - (non_savings - personal_allowance).max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let salary_rates = region_rates(&rates.salary);
    let dividend_rates = region_rates(&rates.dividend);

    let mut pour = Pour::new([personal_allowance, basic_limit, rates.additional_band]);
    pour.pour(
        ComponentType::Salary,
        salary,
        &[Step::Bands {
            through: LAST_REGION,
            rates: salary_rates,
        }],
    );
    pour.pour(
        ComponentType::Interest,
        interest,
        &[
            Step::Bands {
                through: 0,
                rates: salary_rates,
            },
            Step::Allowance(starting_rate),
            Step::Allowance(savings_allowance),
            Step::Bands {
                through: LAST_REGION,
                rates: salary_rates,
            },
        ],
    );
    pour.pour(
        ComponentType::Dividend,
        dividend,
        &[
            Step::Bands {
                through: 0,
                rates: dividend_rates,
            },
            Step::Allowance(rates.dividend_allowance),
            Step::Bands {
                through: LAST_REGION,
                rates: dividend_rates,
            },
        ],
    );

    let owed = round2(pour.tranches.iter().map(|t| t.amount * t.rate).sum());
    log::debug!(
        "{}: income tax on salary {}, interest {}, dividend {} is {} ({} tranches)",
        tax_year,
        salary,
        interest,
        dividend,
        owed,
        pour.tranches.len()
    );

    Ok(IncomeTaxOwed {
        owed,
        tranches: pour.tranches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ComponentType::{Dividend, Interest, Salary};

    fn tranche(income_type: ComponentType, rate: Decimal, region: usize, amount: Decimal) -> Tranche {
        Tranche {
            income_type,
            rate,
            region,
            amount,
        }
    }

    fn owed(salary: Decimal, interest: Decimal, dividend: Decimal, year: i32) -> IncomeTaxOwed {
        calculate_income_tax_owed(salary, interest, dividend, TaxYear(year)).unwrap()
    }

    fn assert_exhaustive(result: &IncomeTaxOwed, total: Decimal) {
        let allocated: Decimal = result.tranches.iter().map(|t| t.amount).sum();
        assert_eq!(allocated, total);
    }

    #[test]
    fn salary_within_basic_rate() {
        let result = owed(dec!(50000), dec!(0), dec!(0), 2020);
        assert_eq!(result.owed, dec!(7500));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0), 0, dec!(12500)),
                tranche(Salary, dec!(0.2), 1, dec!(37500)),
            ]
        );
    }

    #[test]
    fn salary_and_dividends_fill_bands_in_order() {
        let result = owed(dec!(14600), dec!(0), dec!(58733.22), 2021);
        assert_eq!(result.owed, dec!(10426.8));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0), 0, dec!(12570)),
                tranche(Salary, dec!(0.2), 1, dec!(2030)),
                tranche(Dividend, dec!(0), 1, dec!(2000)),
                tranche(Dividend, dec!(0.075), 1, dec!(33670)),
                tranche(Dividend, dec!(0.325), 2, dec!(23063.22)),
            ]
        );
        assert_exhaustive(&result, dec!(73333.22));
    }

    #[test]
    fn starting_rate_for_savings_crosses_into_basic_band() {
        let result = owed(dec!(10000), dec!(5000), dec!(0), 2021);
        assert_eq!(result.owed, dec!(0));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0), 0, dec!(10000)),
                tranche(Interest, dec!(0), 0, dec!(2570)),
                tranche(Interest, dec!(0), 1, dec!(2430)),
            ]
        );
    }

    #[test]
    fn savings_allowance_for_basic_rate_taxpayer() {
        let result = owed(dec!(20000), dec!(8000), dec!(0), 2021);
        assert_eq!(result.owed, dec!(2886));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0), 0, dec!(12570)),
                tranche(Salary, dec!(0.2), 1, dec!(7430)),
                tranche(Interest, dec!(0), 1, dec!(1000)),
                tranche(Interest, dec!(0.2), 1, dec!(7000)),
            ]
        );
    }

    #[test]
    fn savings_allowance_split_at_higher_rate_boundary() {
        let result = owed(dec!(50000), dec!(2000), dec!(0), 2021);
        assert_eq!(result.owed, dec!(8086));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0), 0, dec!(12570)),
                tranche(Salary, dec!(0.2), 1, dec!(37430)),
                tranche(Interest, dec!(0), 1, dec!(270)),
                tranche(Interest, dec!(0), 2, dec!(230)),
                tranche(Interest, dec!(0.4), 2, dec!(1500)),
            ]
        );
    }

    #[test]
    fn tapered_personal_allowance() {
        let result = owed(dec!(110000), dec!(0), dec!(0), 2021);
        assert_eq!(result.owed, dec!(33432));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0), 0, dec!(7570)),
                tranche(Salary, dec!(0.2), 1, dec!(37700)),
                tranche(Salary, dec!(0.4), 2, dec!(64730)),
            ]
        );
    }

    #[test]
    fn additional_rate_with_no_allowance_left() {
        let result = owed(dec!(200000), dec!(0), dec!(10000), 2023);
        assert_eq!(result.owed, dec!(79744.5));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0.2), 1, dec!(37700)),
                tranche(Salary, dec!(0.4), 2, dec!(87440)),
                tranche(Salary, dec!(0.45), 3, dec!(74860)),
                tranche(Dividend, dec!(0), 3, dec!(1000)),
                tranche(Dividend, dec!(0.3935), 3, dec!(9000)),
            ]
        );
        assert_exhaustive(&result, dec!(210000));
    }

    #[test]
    fn no_savings_allowance_for_additional_rate_taxpayer() {
        let result = owed(dec!(130000), dec!(2000), dec!(0), 2023);
        assert_eq!(result.owed, dec!(45603));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0.2), 1, dec!(37700)),
                tranche(Salary, dec!(0.4), 2, dec!(87440)),
                tranche(Salary, dec!(0.45), 3, dec!(4860)),
                tranche(Interest, dec!(0.45), 3, dec!(2000)),
            ]
        );
        assert_exhaustive(&result, dec!(132000));
    }

    #[test]
    fn starting_rate_for_savings_reduced_by_salary_over_allowance() {
        let result = owed(dec!(15000), dec!(3000), dec!(0), 2021);
        assert_eq!(result.owed, dec!(486));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0), 0, dec!(12570)),
                tranche(Salary, dec!(0.2), 1, dec!(2430)),
                tranche(Interest, dec!(0), 1, dec!(2570)),
                tranche(Interest, dec!(0), 1, dec!(430)),
            ]
        );
        assert_exhaustive(&result, dec!(18000));
    }

    #[test]
    fn dividend_allowance_straddles_personal_allowance() {
        let result = owed(dec!(12000), dec!(300), dec!(1500), 2024);
        assert_eq!(result.owed, dec!(63.88));
        assert_eq!(
            result.tranches,
            vec![
                tranche(Salary, dec!(0), 0, dec!(12000)),
                tranche(Interest, dec!(0), 0, dec!(300)),
                tranche(Dividend, dec!(0), 0, dec!(270)),
                tranche(Dividend, dec!(0), 1, dec!(500)),
                tranche(Dividend, dec!(0.0875), 1, dec!(730)),
            ]
        );
    }

    #[test]
    fn no_income_no_tranches() {
        let result = owed(dec!(0), dec!(0), dec!(0), 2021);
        assert_eq!(result.owed, dec!(0));
        assert!(result.tranches.is_empty());
    }

    #[test]
    fn unsupported_year() {
        let err = calculate_income_tax_owed(dec!(1), dec!(0), dec!(0), TaxYear(2015)).unwrap_err();
        assert_eq!(err, TaxError::UnsupportedTaxYear(TaxYear(2015)));
    }

    #[test]
    fn personal_allowance_taper() {
        let rates = RateTable::current().year(TaxYear(2021)).unwrap();
        let pa = rates.personal_allowance;
        assert_eq!(calculate_personal_allowance(dec!(100000), pa, rates), dec!(12570));
        assert_eq!(calculate_personal_allowance(dec!(100001), pa, rates), dec!(12569.5));
        assert_eq!(calculate_personal_allowance(dec!(125140), pa, rates), dec!(0));
        assert_eq!(calculate_personal_allowance(dec!(300000), pa, rates), dec!(0));
    }
}
