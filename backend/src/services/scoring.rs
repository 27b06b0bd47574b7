//! Quote scoring engine
//!
//! Ranks quotes by a weighted sum of four percentage sub-scores. The weights
//! are fixed policy. Sub-scores are stored alongside the aggregate so any
//! stored score can be recomputed and audited.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::round2;

// ============================================================================
// Weights
// ============================================================================

/// Weight for price competitiveness (0.40)
pub const WEIGHT_PRICE: Decimal = Decimal::from_parts(40, 0, 0, false, 2);

/// Weight for external reputation (0.30)
pub const WEIGHT_REPUTATION: Decimal = Decimal::from_parts(30, 0, 0, false, 2);

/// Weight for financial health (0.20)
pub const WEIGHT_FINANCIAL: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Weight for litigation history (0.10)
pub const WEIGHT_LITIGATION: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Litigation sub-score assumed when none is supplied
pub const DEFAULT_LITIGATION_SCORE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

const MAX_SUB_SCORE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Percentage sub-scores (0-100) feeding the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub price: Decimal,
    pub reputation: Decimal,
    pub financial: Decimal,
    pub litigation: Option<Decimal>,
}

impl SubScores {
    /// Reject any sub-score outside 0-100, naming the offending field
    pub fn validate(&self) -> ApiResult<()> {
        let fields = [
            ("score_price", Some(self.price)),
            ("score_reputation", Some(self.reputation)),
            ("score_financial", Some(self.financial)),
            ("score_litigation", self.litigation),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                if value < Decimal::ZERO || value > MAX_SUB_SCORE {
                    return Err(ApiError::BadRequest(format!(
                        "{} must be between 0 and 100, got {}",
                        name, value
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Weighted aggregate, rounded to two decimals
pub fn aggregate_score(scores: &SubScores) -> Decimal {
    let litigation = scores.litigation.unwrap_or(DEFAULT_LITIGATION_SCORE);
    round2(
        scores.price * WEIGHT_PRICE
            + scores.reputation * WEIGHT_REPUTATION
            + scores.financial * WEIGHT_FINANCIAL
            + litigation * WEIGHT_LITIGATION,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn scores(p: &str, r: &str, f: &str, l: Option<&str>) -> SubScores {
        SubScores {
            price: d(p),
            reputation: d(r),
            financial: d(f),
            litigation: l.map(d),
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert_eq!(
            WEIGHT_PRICE + WEIGHT_REPUTATION + WEIGHT_FINANCIAL + WEIGHT_LITIGATION,
            Decimal::ONE
        );
    }

    #[test]
    fn test_aggregate_with_litigation() {
        assert_eq!(aggregate_score(&scores("90", "85", "80", Some("95"))), d("87.00"));
    }

    #[test]
    fn test_aggregate_defaults_litigation_to_full_marks() {
        assert_eq!(aggregate_score(&scores("80", "70", "60", None)), d("75.00"));
    }

    #[test]
    fn test_aggregate_rounds_to_two_decimals() {
        // 33.33*0.4 + 66.67*0.3 + 12.345*0.2 + 100*0.1 = 13.332 + 20.001 + 2.469 + 10
        assert_eq!(
            aggregate_score(&scores("33.33", "66.67", "12.345", None)),
            d("45.80")
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert_eq!(aggregate_score(&scores("0", "0", "0", Some("0"))), d("0"));
        assert_eq!(aggregate_score(&scores("100", "100", "100", None)), d("100"));
        assert!(scores("100", "0", "100", Some("0")).validate().is_ok());
    }

    #[test]
    fn test_out_of_range_sub_score_is_named() {
        let err = scores("101", "50", "50", None).validate().unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(err.message().contains("score_price"));
        assert!(err.message().contains("101"));

        let err = scores("50", "50", "50", Some("-1")).validate().unwrap_err();
        assert!(err.message().contains("score_litigation"));
    }
}
