//! Pro-rata billing calculator.
//!
//! Computes the partial charge owed when a paid subscription starts
//! outside a billing-cycle boundary: the gap from the payment date to the
//! next cycle start is billed at a daily rate, on top of the full fee for
//! the following cycle. Pure computation; persisting the resulting
//! invoice is the caller's concern.
//!
//! The daily rate always divides the flat fee by the configured cycle
//! length in days; there is no hard-coded 30-day divisor.

use chrono::{Duration, NaiveDate};
use log::warn;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::BillingSettings;
use crate::models::time::{day_of_month_clamped, day_of_next_month_clamped, days_between};

/// Errors for pro-rata computation inputs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BillingError {
    /// Cycle length must be at least one day.
    #[error("Validity duration must be positive, got {0}")]
    NonPositiveValidity(u32),

    /// Due day must be a calendar day of month.
    #[error("Due day must be within 1..=31, got {0}")]
    InvalidDueDay(u32),

    /// A negative fee can never produce a meaningful charge.
    #[error("Fee must not be negative, got {0}")]
    NegativeFee(Decimal),
}

/// Result of a pro-rata computation.
///
/// All monetary amounts are rounded to 2 decimal places, half-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProRataInvoice {
    /// First cycle boundary on or after the payment date.
    pub cycle_start: NaiveDate,
    /// `cycle_start` + the validity duration.
    pub cycle_end: NaiveDate,
    /// Days between the payment date and `cycle_start` (never negative).
    pub gap_days: i64,
    /// Fee divided by the validity duration, 2 decimal places.
    pub daily_rate: Decimal,
    /// Charge covering the gap; zero when payment lands on the boundary
    /// or when waived.
    pub pro_rata_amount: Decimal,
    /// `pro_rata_amount` plus the full fee for the following cycle.
    pub total_due: Decimal,
    /// Whether the pro-rata portion was waived by the caller.
    pub waived: bool,
    /// Set when the computed gap came out negative (due-day
    /// misconfiguration); the amount was clamped to zero and the caller
    /// should review the configuration.
    pub needs_review: bool,
}

/// Compute the pro-rata charge for a subscription starting at
/// `payment_date`.
///
/// # Arguments
/// * `fee` - Flat recurring fee per cycle
/// * `payment_date` - Date the subscription is paid/started
/// * `due_day` - Day of month on which cycles begin (1..=31; clamped to
///   the last day of shorter months)
/// * `validity_days` - Cycle length in days, the daily-rate divisor
/// * `waive_pro_rata` - Charge only the full fee, skipping the gap
///
/// # Returns
/// * `Ok(ProRataInvoice)` with the breakdown
/// * `Err(BillingError)` for non-positive validity, an out-of-range due
///   day or a negative fee
pub fn compute_pro_rata(
    fee: Decimal,
    payment_date: NaiveDate,
    due_day: u32,
    validity_days: u32,
    waive_pro_rata: bool,
) -> Result<ProRataInvoice, BillingError> {
    if validity_days == 0 {
        return Err(BillingError::NonPositiveValidity(validity_days));
    }
    if !(1..=31).contains(&due_day) {
        return Err(BillingError::InvalidDueDay(due_day));
    }
    if fee.is_sign_negative() {
        return Err(BillingError::NegativeFee(fee));
    }

    // First date >= payment_date carrying the due day; if this month's
    // due day is already past, the cycle starts next month.
    let mut cycle_start = day_of_month_clamped(payment_date, due_day);
    if cycle_start < payment_date {
        cycle_start = day_of_next_month_clamped(payment_date, due_day);
    }
    let cycle_end = cycle_start + Duration::days(validity_days as i64);

    let mut gap_days = days_between(payment_date, cycle_start);
    let mut needs_review = false;
    if gap_days < 0 {
        warn!(
            "Pro-rata gap came out negative ({} days) for payment {} with due day {}; \
             clamping to zero",
            gap_days, payment_date, due_day
        );
        gap_days = 0;
        needs_review = true;
    }

    let daily_rate_exact = fee / Decimal::from(validity_days);
    let pro_rata_amount = round_money(if waive_pro_rata {
        Decimal::ZERO
    } else {
        daily_rate_exact * Decimal::from(gap_days)
    });
    let total_due = round_money(pro_rata_amount + fee);

    Ok(ProRataInvoice {
        cycle_start,
        cycle_end,
        gap_days,
        daily_rate: round_money(daily_rate_exact),
        pro_rata_amount,
        total_due,
        waived: waive_pro_rata,
        needs_review,
    })
}

/// Convenience wrapper over the configured billing settings.
pub fn compute_pro_rata_with_settings(
    settings: &BillingSettings,
    payment_date: NaiveDate,
    waive_pro_rata: bool,
) -> Result<ProRataInvoice, BillingError> {
    compute_pro_rata(
        settings.monthly_fee,
        payment_date,
        settings.due_day,
        settings.validity_days,
        waive_pro_rata,
    )
}

/// Half-up rounding to 2 decimal places. The result always carries two
/// fractional digits so amounts render as "10.00", not "10".
fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
