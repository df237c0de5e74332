//! Fee totals and the GEA / GLAB revenue split
//!
//! All arithmetic is in integer minor units. The GEA share is rounded half
//! up to the nearest minor unit and the GLAB receives the remainder, so the
//! two parts always add back to the total exactly.

use crate::{WorkflowError, WorkflowResult};
use gea_types::{FeeSchedule, FeeSplit, Money};

/// GEA's share of each project fee, in basis points (15%)
pub const DEFAULT_GEA_FEE_BPS: u32 = 1_500;

const BPS_SCALE: i128 = 10_000;

/// Computes project fee splits at a fixed GEA rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeCalculator {
    gea_fee_bps: u32,
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self {
            gea_fee_bps: DEFAULT_GEA_FEE_BPS,
        }
    }
}

impl FeeCalculator {
    pub fn new(gea_fee_bps: u32) -> WorkflowResult<Self> {
        if gea_fee_bps as i128 > BPS_SCALE {
            return Err(WorkflowError::InvalidFee(format!(
                "GEA fee of {} bps exceeds 100%",
                gea_fee_bps
            )));
        }
        Ok(Self { gea_fee_bps })
    }

    pub fn gea_fee_bps(&self) -> u32 {
        self.gea_fee_bps
    }

    /// Total of a fee schedule; negative components are rejected
    pub fn total(&self, schedule: &FeeSchedule) -> WorkflowResult<Money> {
        match schedule {
            FeeSchedule::Flat { total } => {
                non_negative("total", *total)?;
                Ok(*total)
            }
            FeeSchedule::DayRate {
                days,
                day_rate,
                multi_site_premium,
                other_fees,
                taxes,
            } => {
                non_negative("day_rate", *day_rate)?;
                non_negative("multi_site_premium", *multi_site_premium)?;
                non_negative("other_fees", *other_fees)?;
                non_negative("taxes", *taxes)?;

                day_rate
                    .checked_mul(i64::from(*days))
                    .and_then(|m| m.checked_add(*multi_site_premium))
                    .and_then(|m| m.checked_add(*other_fees))
                    .and_then(|m| m.checked_add(*taxes))
                    .ok_or_else(|| WorkflowError::InvalidFee("fee total overflows".to_string()))
            }
        }
    }

    /// Split a schedule's total into GEA fee and GLAB revenue
    pub fn split(&self, schedule: &FeeSchedule) -> WorkflowResult<FeeSplit> {
        let total = self.total(schedule)?;
        Ok(self.split_total(total))
    }

    /// Split an already validated, non-negative total
    pub fn split_total(&self, total: Money) -> FeeSplit {
        let scaled = total.minor() as i128 * self.gea_fee_bps as i128;
        let gea_fee = (scaled + BPS_SCALE / 2) / BPS_SCALE;
        // gea_fee <= total, so the narrowing cannot truncate
        let gea_fee = Money::from_minor(gea_fee as i64);
        FeeSplit {
            total,
            gea_fee,
            glab_revenue: total - gea_fee,
        }
    }
}

fn non_negative(field: &str, amount: Money) -> WorkflowResult<()> {
    if amount.is_negative() {
        return Err(WorkflowError::InvalidFee(format!(
            "{} must not be negative",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_flat_split() {
        let calc = FeeCalculator::default();
        let split = calc
            .split(&FeeSchedule::Flat {
                total: Money::from_major(10_000),
            })
            .unwrap();
        assert_eq!(split.gea_fee, Money::from_major(1_500));
        assert_eq!(split.glab_revenue, Money::from_major(8_500));
    }

    #[test]
    fn test_day_rate_total() {
        let calc = FeeCalculator::default();
        let schedule = FeeSchedule::DayRate {
            days: 5,
            day_rate: Money::from_major(800),
            multi_site_premium: Money::from_major(500),
            other_fees: Money::from_major(250),
            taxes: Money::from_minor(12_345),
        };
        assert_eq!(calc.total(&schedule).unwrap(), Money::from_minor(487_345));
    }

    #[test]
    fn test_rounds_half_up() {
        let calc = FeeCalculator::default();
        // 10 * 0.15 = 1.5 -> 2
        let split = calc.split_total(Money::from_minor(10));
        assert_eq!(split.gea_fee, Money::from_minor(2));
        assert_eq!(split.glab_revenue, Money::from_minor(8));
        // 3 * 0.15 = 0.45 -> 0
        assert_eq!(calc.split_total(Money::from_minor(3)).gea_fee, Money::ZERO);
    }

    #[test]
    fn test_negative_inputs_rejected() {
        let calc = FeeCalculator::default();
        let err = calc
            .split(&FeeSchedule::Flat {
                total: Money::from_minor(-1),
            })
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidFee(_)));

        let err = calc
            .total(&FeeSchedule::DayRate {
                days: 1,
                day_rate: Money::from_major(100),
                multi_site_premium: Money::ZERO,
                other_fees: Money::ZERO,
                taxes: Money::from_minor(-5),
            })
            .unwrap_err();
        assert!(err.to_string().contains("taxes"));
    }

    #[test]
    fn test_overflow_rejected() {
        let calc = FeeCalculator::default();
        let schedule = FeeSchedule::DayRate {
            days: u32::MAX,
            day_rate: Money::from_minor(i64::MAX / 2),
            multi_site_premium: Money::ZERO,
            other_fees: Money::ZERO,
            taxes: Money::ZERO,
        };
        assert!(calc.total(&schedule).is_err());
    }

    #[test]
    fn test_rate_above_hundred_percent_rejected() {
        assert!(FeeCalculator::new(10_001).is_err());
        assert_eq!(FeeCalculator::new(2_000).unwrap().gea_fee_bps(), 2_000);
    }

    proptest! {
        #[test]
        fn prop_split_sums_to_total(minor in 0i64..=i64::MAX, bps in 0u32..=10_000) {
            let calc = FeeCalculator::new(bps).unwrap();
            let split = calc.split_total(Money::from_minor(minor));
            prop_assert_eq!(split.gea_fee + split.glab_revenue, split.total);
            prop_assert!(!split.gea_fee.is_negative());
            prop_assert!(!split.glab_revenue.is_negative());
        }

        #[test]
        fn prop_day_rate_split_is_exact(
            days in 0u32..400,
            rate in 0i64..10_000_000,
            premium in 0i64..10_000_000,
            taxes in 0i64..10_000_000,
        ) {
            let calc = FeeCalculator::default();
            let schedule = FeeSchedule::DayRate {
                days,
                day_rate: Money::from_minor(rate),
                multi_site_premium: Money::from_minor(premium),
                other_fees: Money::ZERO,
                taxes: Money::from_minor(taxes),
            };
            let split = calc.split(&schedule).unwrap();
            prop_assert_eq!(split.gea_fee + split.glab_revenue, split.total);
        }
    }
}
