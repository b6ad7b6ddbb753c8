//! UK personal tax engine for company directors: PAYE deductions on salary,
//! income tax across salary, interest and dividends, National Insurance and
//! student loan repayments.

pub mod money;
pub mod tax;
