//! Normalization of a set of shares back to a target sum.
//!
//! A share is "touched" when it is non-zero: the user typed something there.
//! Touched shares are left alone while untouched ones can absorb the gap;
//! only when every share is touched (or the set is over the target) are the
//! touched shares rescaled proportionally.

use rust_decimal::Decimal;

use crate::money::{nearly_equal, scale_to_target, split_evenly};

/// Returns `values` rebalanced so that they sum to `target`.
///
/// The output has the same length and order as the input. Calling this on
/// its own output returns that output unchanged.
#[must_use]
pub fn rebalance(values: &[Decimal], target: Decimal) -> Vec<Decimal> {
    if values.is_empty() {
        return Vec::new();
    }

    let (touched, blank): (Vec<usize>, Vec<usize>) =
        (0..values.len()).partition(|&i| values[i] > Decimal::ZERO);

    if touched.is_empty() {
        return split_evenly(target, values.len());
    }

    let touched_values: Vec<Decimal> = touched.iter().map(|&i| values[i]).collect();
    let touched_sum: Decimal = touched_values.iter().copied().sum();
    let remainder = target - touched_sum;

    let mut result = values.to_vec();

    if !blank.is_empty() && remainder > Decimal::ZERO {
        for (index, share) in blank.iter().zip(fill_blanks(remainder, blank.len())) {
            result[*index] = share;
        }
    } else if (blank.is_empty() && !nearly_equal(touched_sum, target))
        || remainder < Decimal::ZERO
    {
        let scaled = scale_to_target(&touched_values, touched_sum, target);
        for (index, share) in touched.iter().zip(scaled) {
            result[*index] = share;
        }
    }

    result
}

/// Spreads `remainder` over `count` blank shares. Blanks never go negative,
/// even when the remainder is only a few cents.
fn fill_blanks(remainder: Decimal, count: usize) -> Vec<Decimal> {
    split_evenly(remainder, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sum(values: &[Decimal]) -> Decimal {
        values.iter().copied().sum()
    }

    #[test]
    fn all_blank_distributes_equally() {
        let result = rebalance(&[Decimal::ZERO; 3], dec!(100));
        assert_eq!(result, vec![dec!(33.33), dec!(33.33), dec!(33.34)]);
    }

    #[test]
    fn single_blank_takes_whole_remainder() {
        let result = rebalance(&[dec!(100.00), Decimal::ZERO], dec!(150.00));
        assert_eq!(result, vec![dec!(100.00), dec!(50.00)]);
    }

    #[test]
    fn multiple_blanks_split_remainder_and_last_absorbs() {
        let result = rebalance(
            &[dec!(40), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO],
            dec!(100),
        );
        assert_eq!(result, vec![dec!(40), dec!(20), dec!(20), dec!(20)]);

        let result = rebalance(&[dec!(10), Decimal::ZERO, Decimal::ZERO], dec!(100));
        assert_eq!(result, vec![dec!(10), dec!(45), dec!(45)]);

        let result = rebalance(
            &[dec!(0.5), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO],
            dec!(100),
        );
        assert_eq!(result, vec![dec!(0.5), dec!(33.17), dec!(33.17), dec!(33.16)]);
        assert_eq!(sum(&result), dec!(100));
    }

    #[test]
    fn blanks_interleaved_with_touched_keep_positions() {
        let result = rebalance(
            &[Decimal::ZERO, dec!(30), Decimal::ZERO, dec!(20)],
            dec!(100),
        );
        assert_eq!(result, vec![dec!(25), dec!(30), dec!(25), dec!(20)]);
    }

    #[test]
    fn all_touched_over_target_scales_down() {
        let result = rebalance(&[dec!(80), dec!(80)], dec!(100.00));
        assert_eq!(result, vec![dec!(50.00), dec!(50.00)]);
    }

    #[test]
    fn all_touched_under_target_scales_up() {
        let result = rebalance(&[dec!(10), dec!(20), dec!(30)], dec!(120));
        assert_eq!(result, vec![dec!(20), dec!(40), dec!(60)]);

        let result = rebalance(&[dec!(1), dec!(1), dec!(1)], dec!(100));
        assert_eq!(result, vec![dec!(33.33), dec!(33.33), dec!(33.34)]);
    }

    #[test]
    fn single_touched_snaps_to_target() {
        assert_eq!(rebalance(&[dec!(12.34)], dec!(100)), vec![dec!(100)]);
        assert_eq!(rebalance(&[dec!(100)], dec!(100)), vec![dec!(100)]);
    }

    #[test]
    fn over_target_with_blanks_scales_touched_only() {
        let result = rebalance(&[dec!(90), dec!(30), Decimal::ZERO], dec!(100));
        assert_eq!(result, vec![dec!(75), dec!(25), Decimal::ZERO]);
    }

    #[test]
    fn balanced_input_is_untouched() {
        let input = vec![dec!(33.33), dec!(33.33), dec!(33.34)];
        assert_eq!(rebalance(&input, dec!(100)), input);

        // within tolerance and no blanks: left alone
        let input = vec![dec!(50), dec!(49.995)];
        assert_eq!(rebalance(&input, dec!(100)), input);
    }

    #[test]
    fn exact_fill_with_blanks_is_untouched() {
        let input = vec![dec!(60), dec!(40), Decimal::ZERO];
        assert_eq!(rebalance(&input, dec!(100)), input);
    }

    #[test]
    fn rebalance_is_idempotent() {
        let cases: Vec<(Vec<Decimal>, Decimal)> = vec![
            (vec![Decimal::ZERO; 7], dec!(100)),
            (vec![dec!(12.5), Decimal::ZERO, Decimal::ZERO], dec!(77.77)),
            (vec![dec!(80), dec!(80)], dec!(100)),
            (vec![dec!(3), dec!(7), dec!(11)], dec!(1000)),
            (vec![dec!(90), dec!(30), Decimal::ZERO, Decimal::ZERO], dec!(100)),
            (vec![dec!(0.01), Decimal::ZERO, Decimal::ZERO], dec!(0.02)),
            (vec![dec!(33.3333), dec!(33.3333), dec!(33.3333)], dec!(100)),
            (
                vec![
                    dec!(100),
                    Decimal::ZERO,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    Decimal::ZERO,
                ],
                dec!(100.04),
            ),
        ];
        for (input, target) in cases {
            let once = rebalance(&input, target);
            let twice = rebalance(&once, target);
            assert_eq!(once, twice, "input {input:?} target {target}");
        }
    }

    #[test]
    fn rebalanced_sum_is_cent_exact() {
        let cases: Vec<(Vec<Decimal>, Decimal)> = vec![
            (vec![Decimal::ZERO; 6], dec!(100)),
            (vec![dec!(20), Decimal::ZERO, Decimal::ZERO], dec!(100)),
            (vec![dec!(70), dec!(70), dec!(70)], dec!(100)),
            (vec![dec!(1), dec!(2)], dec!(10.01)),
            (vec![dec!(10), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO], dec!(10.02)),
        ];
        for (input, target) in cases {
            assert_eq!(sum(&rebalance(&input, target)), target, "input {input:?}");
        }
    }

    #[test]
    fn few_cents_over_many_blanks_stay_non_negative() {
        let mut input = vec![Decimal::ZERO; 7];
        input[0] = dec!(100);
        let result = rebalance(&input, dec!(100.04));
        assert_eq!(
            result,
            vec![
                dec!(100),
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                dec!(0.04)
            ]
        );
        assert!(result.iter().all(|v| *v >= Decimal::ZERO));
        assert_eq!(sum(&result), dec!(100.04));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(rebalance(&[], dec!(100)).is_empty());
    }
}
