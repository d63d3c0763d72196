//! Rental fee rule.
//!
//! The first month of every rental is free. Each further month costs one
//! hundredth of the book's page count, so a 250 page book costs 2.50 per
//! billable month. All arithmetic is fixed-point with two decimal places.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Page count assumed when the real one is unknown
pub const DEFAULT_PAGE_COUNT: i64 = 100;

/// Currency scale used for stored fees
const FEE_SCALE: u32 = 2;

/// Monthly and cumulative fee for a rental
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fees {
    pub monthly: Decimal,
    pub total: Decimal,
}

impl Fees {
    pub const FREE: Fees = Fees {
        monthly: Decimal::ZERO,
        total: Decimal::ZERO,
    };

    /// Both fees in integer cents, or `None` if they do not fit in an `i64`
    pub fn to_cents(self) -> Option<(i64, i64)> {
        Some((to_cents(self.monthly)?, to_cents(self.total)?))
    }
}

/// Compute fees for `months_rented` months of a book with `pages` pages.
pub fn calculate(months_rented: i64, pages: i64) -> Fees {
    if months_rented <= 1 {
        return Fees::FREE;
    }

    let monthly = Decimal::new(pages, FEE_SCALE);
    // Saturates instead of panicking; `to_cents` rejects saturated totals.
    let total = monthly
        .saturating_mul(Decimal::from(months_rented - 1))
        .round_dp(FEE_SCALE);

    Fees { monthly, total }
}

pub fn to_cents(amount: Decimal) -> Option<i64> {
    amount
        .round_dp(FEE_SCALE)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_i64()
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, FEE_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_first_month_is_free_for_any_page_count() {
        for pages in [1, 100, 250, 1_000_000] {
            assert_eq!(calculate(1, pages), Fees::FREE);
        }
        assert_eq!(calculate(0, 250), Fees::FREE);
    }

    #[test]
    fn test_billable_months() {
        let fees = calculate(3, 250);
        assert_eq!(fees.monthly, dec!(2.50));
        assert_eq!(fees.total, dec!(5.00));

        let fees = calculate(2, DEFAULT_PAGE_COUNT);
        assert_eq!(fees.monthly, dec!(1.00));
        assert_eq!(fees.total, dec!(1.00));
    }

    #[test]
    fn test_odd_page_counts_stay_exact() {
        let fees = calculate(13, 333);
        assert_eq!(fees.monthly, dec!(3.33));
        assert_eq!(fees.total, dec!(39.96));
        assert_eq!(fees.monthly.to_string(), "3.33");
    }

    #[test]
    fn test_total_is_monthly_times_billable_months() {
        for months in 2..=24 {
            for pages in [7, 99, 101, 412, 1234] {
                let fees = calculate(months, pages);
                assert_eq!(fees.monthly * Decimal::from(months - 1), fees.total);
            }
        }
    }

    #[test]
    fn test_cents_conversion() {
        assert_eq!(to_cents(dec!(2.50)), Some(250));
        assert_eq!(to_cents(Decimal::ZERO), Some(0));
        assert_eq!(from_cents(500), dec!(5.00));
        assert_eq!(from_cents(500).to_string(), "5.00");
        assert_eq!(calculate(3, 250).to_cents(), Some((250, 500)));
    }

    #[test]
    fn test_oversized_totals_do_not_fit_in_cents() {
        let fees = calculate(i64::MAX, i64::MAX);
        assert_eq!(fees.to_cents(), None);
    }
}
