use super::TaxError;
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Personal tax years start on 6 April
pub const PERSONAL_CUTOFF_MONTH: u32 = 4;
pub const PERSONAL_CUTOFF_DAY: u32 = 6;

/// UK Tax Year, identified by the calendar year it starts in
/// (e.g. 2021 = 6 April 2021 to 5 April 2022 for a person).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct TaxYear(pub i32);

/// Calendar month (1-12) a company's financial year starts on the 1st of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "u32", into = "u32")]
pub struct MonthStart(u32);

impl MonthStart {
    pub fn new(month: u32) -> Result<Self, TaxError> {
        if (1..=12).contains(&month) {
            Ok(MonthStart(month))
        } else {
            Err(TaxError::InvalidMonthStart(month))
        }
    }

    pub fn month(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for MonthStart {
    type Error = TaxError;

    fn try_from(month: u32) -> Result<Self, Self::Error> {
        MonthStart::new(month)
    }
}

impl From<MonthStart> for u32 {
    fn from(month: MonthStart) -> u32 {
        month.0
    }
}

impl TaxYear {
    /// Personal tax year containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        resolve_tax_year(date, None)
    }

    /// Company tax year containing `date`, for a company whose year starts on
    /// the 1st of `month_start`. Companies without a month start follow the
    /// personal year.
    pub fn for_company(date: NaiveDate, month_start: Option<MonthStart>) -> Self {
        resolve_tax_year(date, month_start)
    }

    /// First day of the personal tax year
    pub fn start_date(&self) -> NaiveDate {
        ymd(self.0, PERSONAL_CUTOFF_MONTH, PERSONAL_CUTOFF_DAY)
    }

    /// Last day of the personal tax year
    pub fn end_date(&self) -> NaiveDate {
        ymd(self.0 + 1, PERSONAL_CUTOFF_MONTH, PERSONAL_CUTOFF_DAY - 1)
    }

    /// First day of a company tax year
    pub fn company_start_date(&self, month_start: Option<MonthStart>) -> NaiveDate {
        match month_start {
            Some(month) => ymd(self.0, month.month(), 1),
            None => self.start_date(),
        }
    }

    pub fn next(&self) -> TaxYear {
        TaxYear(self.0 + 1)
    }

    /// Display as "2021/22" format
    pub fn display(&self) -> String {
        format!("{}/{:02}", self.0, (self.0 + 1) % 100)
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Map a date to the tax year it falls in.
///
/// With no `month_start` the personal cutoff (6 April) applies. A company
/// month start always cuts over on day 1 of that month, including April.
pub fn resolve_tax_year(date: NaiveDate, month_start: Option<MonthStart>) -> TaxYear {
    let (cutoff_month, cutoff_day) = match month_start {
        Some(month) => (month.month(), 1),
        None => (PERSONAL_CUTOFF_MONTH, PERSONAL_CUTOFF_DAY),
    };
    let month = date.month();
    if month > cutoff_month || (month == cutoff_month && date.day() >= cutoff_day) {
        TaxYear(date.year())
    } else {
        TaxYear(date.year() - 1)
    }
}

/// Payroll month number of `date`: April is 1, March is 12.
///
/// Goes by calendar month only, so 1-5 April count as month 1.
pub fn tax_month(date: NaiveDate) -> u32 {
    let month0 = date.month0();
    if month0 < 3 {
        month0 + 10
    } else {
        month0 - 2
    }
}

/// Whole calendar months from `from` to `to`, ignoring the day of month
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

// Months and days are always valid here. Years beyond what chrono can
// represent saturate to its bounds.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(if year < 0 {
        NaiveDate::MIN
    } else {
        NaiveDate::MAX
    })
}
