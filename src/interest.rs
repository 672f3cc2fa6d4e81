//! Simple (non-compounding) interest approximation for vault yield.

use std::fmt;

use serde::Serialize;

/// Days per year used to turn an APY into a daily rate.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Window used for the "this month" figure.
pub const DAYS_PER_MONTH: u32 = 30;

/// Interest accrued on `principal` over `days` at `apy_percent`.
///
/// `principal × (apy / 100 / 365) × days`. Not an accrual engine: no
/// compounding, no day-count conventions.
///
/// # Examples
///
/// ```
/// use beenergy::interest::calculate_interest;
///
/// let earned = calculate_interest(1000.0, 8.5, 30);
/// assert!((earned - 6.986).abs() < 1e-3);
/// ```
pub fn calculate_interest(principal: f64, apy_percent: f64, days: u32) -> f64 {
    let daily_rate = apy_percent / 100.0 / DAYS_PER_YEAR;
    principal * daily_rate * f64::from(days)
}

/// Yield figures reported for one user's position in a vault.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldStats {
    /// Assets held in the vault.
    pub balance: f64,
    /// Current APY, in percent.
    pub apy: f64,
    /// Interest for a single day.
    pub interest_today: f64,
    /// Interest over [`DAYS_PER_MONTH`] days.
    pub interest_this_month: f64,
}

impl YieldStats {
    /// Derives daily and monthly interest from a balance and APY.
    pub fn from_balance(balance: f64, apy: f64) -> Self {
        Self {
            balance,
            apy,
            interest_today: calculate_interest(balance, apy, 1),
            interest_this_month: calculate_interest(balance, apy, DAYS_PER_MONTH),
        }
    }
}

impl fmt::Display for YieldStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Yield ---")?;
        writeln!(f, "Balance:            {:.2}", self.balance)?;
        writeln!(f, "APY:                {:.2}%", self.apy)?;
        writeln!(f, "Interest today:     {:.4}", self.interest_today)?;
        write!(f, "Interest this month: {:.4}", self.interest_this_month)
    }
}
