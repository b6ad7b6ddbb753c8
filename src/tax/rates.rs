//! HMRC rate tables, keyed by tax year (and by effective date for National
//! Insurance, whose rates can change part way through a year).

use super::year::{months_between, TaxYear};
use super::TaxError;
use anyhow::Context;
use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::OnceLock;

/// Income tax rates for one kind of income
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BandRates {
    #[schemars(with = "f64")]
    pub basic: Decimal,
    #[schemars(with = "f64")]
    pub higher: Decimal,
    #[schemars(with = "f64")]
    pub additional: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StudentLoanRates {
    /// Annual repayment threshold
    #[schemars(with = "f64")]
    pub threshold: Decimal,
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

/// National Insurance thresholds and employee rates in effect from a date.
/// Thresholds are annual amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NiPeriod {
    #[schemars(with = "String")]
    pub effective: NaiveDate,
    /// Lower earnings limit
    #[schemars(with = "f64")]
    pub lel: Decimal,
    /// Primary threshold
    #[schemars(with = "f64")]
    pub pt: Decimal,
    /// Secondary threshold
    #[schemars(with = "f64")]
    pub st: Decimal,
    /// Upper earnings limit
    #[schemars(with = "f64")]
    pub uel: Decimal,
    /// Employee rate between the primary threshold and the upper earnings limit
    #[schemars(with = "f64")]
    pub employee_rate1: Decimal,
    /// Employee rate above the upper earnings limit
    #[schemars(with = "f64")]
    pub employee_rate2: Decimal,
}

/// Everything HMRC publishes for one tax year that the calculators need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct YearRates {
    #[schemars(with = "f64")]
    pub personal_allowance: Decimal,
    /// Width of the basic rate band above the personal allowance
    #[schemars(with = "f64")]
    pub higher_band: Decimal,
    /// Total income at which the additional rate starts
    #[schemars(with = "f64")]
    pub additional_band: Decimal,
    /// Income above which the personal allowance is tapered away
    #[schemars(with = "f64")]
    pub personal_allowance_threshold: Decimal,
    pub salary: BandRates,
    pub dividend: BandRates,
    #[schemars(with = "f64")]
    pub dividend_allowance: Decimal,
    pub student_loan: StudentLoanRates,
    /// Rate periods, ordered by effective date
    pub national_insurance: Vec<NiPeriod>,
}

impl YearRates {
    /// Most recent NI period in effect on `date`
    pub fn ni_period_at(&self, date: NaiveDate) -> Option<&NiPeriod> {
        self.national_insurance
            .iter()
            .rev()
            .find(|p| p.effective <= date)
    }

    /// NI periods that have started by `date`, each paired with the number of
    /// months it is in effect for: up to the next period's start, or the start
    /// of the following tax year for the last one.
    pub fn ni_periods_started(&self, year: TaxYear, date: NaiveDate) -> Vec<(&NiPeriod, i32)> {
        let year_end = year.next().start_date();
        self.national_insurance
            .iter()
            .enumerate()
            .take_while(|(_, p)| p.effective <= date)
            .map(|(i, p)| {
                let until = self
                    .national_insurance
                    .get(i + 1)
                    .map_or(year_end, |next| next.effective);
                (p, months_between(p.effective, until))
            })
            .collect()
    }
}

/// Versioned lookup of HMRC constants. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RateTable {
    pub years: BTreeMap<TaxYear, YearRates>,
}

impl RateTable {
    /// Rates published by HMRC for 2019/20 to 2025/26
    pub fn hmrc() -> &'static RateTable {
        static TABLE: OnceLock<RateTable> = OnceLock::new();
        TABLE.get_or_init(builtin_table)
    }

    /// The table calculations use: one installed at startup, otherwise the
    /// built-in HMRC rates
    pub fn current() -> &'static RateTable {
        ACTIVE.get().unwrap_or_else(RateTable::hmrc)
    }

    /// Replace the built-in rates for the rest of the process. Only the first
    /// call has any effect.
    pub fn install(table: RateTable) -> anyhow::Result<()> {
        ACTIVE
            .set(table)
            .map_err(|_| anyhow::anyhow!("Rate table already installed"))
    }

    /// Read a rate table from JSON, in the same shape it serializes to
    pub fn from_json<R: Read>(reader: R) -> anyhow::Result<RateTable> {
        let mut table: RateTable =
            serde_json::from_reader(reader).context("Failed to parse rate table")?;
        for (year, rates) in table.years.iter_mut() {
            rates.national_insurance.sort_by_key(|p| p.effective);
            if rates.national_insurance.is_empty() {
                anyhow::bail!("Rate table for {} has no National Insurance periods", year);
            }
            if let Some(p) = rates
                .national_insurance
                .iter()
                .find(|p| TaxYear::from_date(p.effective) != *year)
            {
                anyhow::bail!(
                    "National Insurance period {} is outside tax year {}",
                    p.effective,
                    year
                );
            }
        }
        log::debug!("Loaded rate table for {} tax years", table.years.len());
        Ok(table)
    }

    pub fn year(&self, year: TaxYear) -> Result<&YearRates, TaxError> {
        self.years
            .get(&year)
            .ok_or(TaxError::UnsupportedTaxYear(year))
    }

    /// The NI period in effect on `date`, within the personal tax year of `date`
    pub fn ni_period(&self, date: NaiveDate) -> Result<&NiPeriod, TaxError> {
        self.year(TaxYear::from_date(date))?
            .ni_period_at(date)
            .ok_or(TaxError::NoNationalInsurancePeriod(date))
    }
}

static ACTIVE: OnceLock<RateTable> = OnceLock::new();

fn builtin_table() -> RateTable {
    let pre_2022_dividends = BandRates {
        basic: dec!(0.075),
        higher: dec!(0.325),
        additional: dec!(0.381),
    };
    let dividends = BandRates {
        basic: dec!(0.0875),
        higher: dec!(0.3375),
        additional: dec!(0.3935),
    };

    let years = [
        (
            2019,
            (dec!(12500), dec!(37500), dec!(150000)),
            pre_2022_dividends,
            dec!(2000),
            dec!(18935),
            vec![ni((2019, 0), 512, 719, 719, 4167, dec!(0.08), dec!(0.02))],
        ),
        (
            2020,
            (dec!(12500), dec!(37500), dec!(150000)),
            pre_2022_dividends,
            dec!(2000),
            dec!(19390),
            vec![ni((2020, 0), 520, 792, 732, 4167, dec!(0.12), dec!(0.02))],
        ),
        (
            2021,
            (dec!(12570), dec!(37700), dec!(150000)),
            pre_2022_dividends,
            dec!(2000),
            dec!(19895),
            vec![ni((2021, 0), 520, 797, 737, 4189, dec!(0.12), dec!(0.02))],
        ),
        (
            2022,
            (dec!(12570), dec!(37700), dec!(150000)),
            dividends,
            dec!(2000),
            dec!(20195),
            vec![
                ni((2022, 0), 533, 823, 758, 4189, dec!(0.1325), dec!(0.0325)),
                ni((2022, 3), 533, 1048, 758, 4189, dec!(0.1325), dec!(0.0325)),
                ni((2022, 7), 533, 1048, 758, 4189, dec!(0.12), dec!(0.02)),
            ],
        ),
        (
            2023,
            (dec!(12570), dec!(37700), dec!(125140)),
            dividends,
            dec!(1000),
            dec!(22015),
            vec![
                ni((2023, 0), 533, 1048, 758, 4189, dec!(0.12), dec!(0.02)),
                ni((2023, 9), 533, 1048, 758, 4189, dec!(0.1), dec!(0.02)),
            ],
        ),
        (
            2024,
            (dec!(12570), dec!(37700), dec!(125140)),
            dividends,
            dec!(500),
            dec!(24990),
            vec![ni((2024, 0), 533, 1048, 758, 4189, dec!(0.08), dec!(0.02))],
        ),
        (
            2025,
            (dec!(12570), dec!(37700), dec!(125140)),
            dividends,
            dec!(500),
            dec!(26065),
            vec![ni((2025, 0), 533, 1048, 758, 4189, dec!(0.08), dec!(0.02))],
        ),
    ];

    let years = years
        .into_iter()
        .map(
            |(year, (pa, higher_band, additional_band), dividend, allowance, sl, periods)| {
                let rates = YearRates {
                    personal_allowance: pa,
                    higher_band,
                    additional_band,
                    personal_allowance_threshold: dec!(100000),
                    salary: BandRates {
                        basic: dec!(0.2),
                        higher: dec!(0.4),
                        additional: dec!(0.45),
                    },
                    dividend,
                    dividend_allowance: allowance,
                    student_loan: StudentLoanRates {
                        threshold: sl,
                        rate: dec!(0.09),
                    },
                    national_insurance: periods,
                };
                (TaxYear(year), rates)
            },
        )
        .collect();

    RateTable { years }
}

/// Thresholds are given per month, as HMRC publishes them for monthly payroll.
/// The period starts `months` whole months after 6 April of `year`.
fn ni(
    (year, months): (i32, u32),
    lel: i64,
    pt: i64,
    st: i64,
    uel: i64,
    employee_rate1: Decimal,
    employee_rate2: Decimal,
) -> NiPeriod {
    let annual = |monthly: i64| Decimal::from(monthly * 12);
    NiPeriod {
        effective: TaxYear(year).start_date() + Months::new(months),
        lel: annual(lel),
        pt: annual(pt),
        st: annual(st),
        uel: annual(uel),
        employee_rate1,
        employee_rate2,
    }
}
