//! Cent-precision arithmetic shared by every allocation computation.
//!
//! Amounts and percentages are `Decimal` so that sums are exact. Values are
//! rounded through [`round2`], half away from zero, except where a half-up
//! share would hand out more than the total; those shares use [`floor2`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Tolerance used when comparing a sum against its target at validation time.
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest amount or percent accepted from callers (one trillion).
///
/// Keeps every product the engine forms well inside `Decimal`'s range.
pub const MAX_VALUE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Rounds to two fractional digits, half away from zero.
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncates to two fractional digits, toward zero.
#[must_use]
pub fn floor2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Returns true if `value` is at most [`MAX_VALUE`] in magnitude.
#[must_use]
pub fn within_range(value: Decimal) -> bool {
    value.abs() <= MAX_VALUE
}

/// Returns true if `a` and `b` differ by at most [`TOLERANCE`].
#[must_use]
pub fn nearly_equal(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= TOLERANCE
}

/// Amount owed for `percent` of `total`, rounded to cents.
#[must_use]
pub fn amount_for_percent(total: Decimal, percent: Decimal) -> Decimal {
    round2(total * percent / Decimal::ONE_HUNDRED)
}

/// Percentage `amount` represents of `total`, rounded to two digits.
///
/// Returns `None` when `total` is not positive.
#[must_use]
pub fn percent_of(amount: Decimal, total: Decimal) -> Option<Decimal> {
    if total <= Decimal::ZERO {
        return None;
    }
    Some(round2(amount / total * Decimal::ONE_HUNDRED))
}

/// Splits `target` into `n` rounded shares whose sum is exactly `round2(target)`.
///
/// Every share but the last is `round2(target / n)`, or the truncated share
/// when rounding up would leave the last one negative; the last absorbs the
/// remainder and is never below zero for a non-negative target.
#[must_use]
pub fn split_evenly(target: Decimal, n: usize) -> Vec<Decimal> {
    if n == 0 {
        return Vec::new();
    }
    let target = round2(target);
    let count = Decimal::from(n);
    let others = Decimal::from(n - 1);

    let mut base = round2(target / count);
    if base * others > target {
        base = floor2(target / count);
    }
    let last = target - base * others;

    let mut shares = vec![base; n - 1];
    shares.push(last);
    shares
}

/// Rescales `values` (summing to `current`) so they sum to `target`.
///
/// All but the last value get their proportional share rounded to cents
/// (truncated instead if rounding would hand out more than `target`); the
/// last receives `target` minus what was already handed out.
/// A single value is set to `target` outright.
#[must_use]
pub fn scale_to_target(values: &[Decimal], current: Decimal, target: Decimal) -> Vec<Decimal> {
    match values {
        [] => Vec::new(),
        [_] => vec![round2(target)],
        [head @ .., _] => {
            if current <= Decimal::ZERO {
                return split_evenly(target, values.len());
            }
            let target = round2(target);
            let mut scaled: Vec<Decimal> = head
                .iter()
                .map(|value| round2(target * *value / current))
                .collect();
            let mut distributed: Decimal = scaled.iter().copied().sum();
            if distributed > target {
                scaled = head
                    .iter()
                    .map(|value| floor2(target * *value / current))
                    .collect();
                distributed = scaled.iter().copied().sum();
            }
            scaled.push((target - distributed).max(Decimal::ZERO));
            scaled
        }
    }
}
