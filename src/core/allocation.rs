use super::error::{CalcError, Result};
use super::types::{AllocationAdvice, AllocationMetrics, AllocationMix, AssetClass, RiskLabel};

// Per percentage point of weight; the results are in percentage points too.
const EQUITY_RETURN: f64 = 0.12;
const DEBT_RETURN: f64 = 0.06;
const GOLD_RETURN: f64 = 0.08;
const INTERNATIONAL_RETURN: f64 = 0.10;

// Fixed-weight heuristic used only to bucket the risk label.
const EQUITY_RISK: f64 = 0.8;
const DEBT_RISK: f64 = 0.1;
const GOLD_RISK: f64 = 0.4;
const INTERNATIONAL_RISK: f64 = 0.9;

const HIGH_RISK_ABOVE: f64 = 60.0;
const MODERATE_RISK_ABOVE: f64 = 30.0;

const GOAL_SUCCESS_PER_RETURN_PCT: f64 = 8.0;
const GOAL_SUCCESS_CAP: u32 = 99;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Reject mixes whose weights do not add up to 100.
    pub enforce_sum_100: bool,
}

fn expected_return(asset: AssetClass) -> f64 {
    match asset {
        AssetClass::Equity => EQUITY_RETURN,
        AssetClass::Debt => DEBT_RETURN,
        AssetClass::Gold => GOLD_RETURN,
        AssetClass::International => INTERNATIONAL_RETURN,
    }
}

fn risk_weight(asset: AssetClass) -> f64 {
    match asset {
        AssetClass::Equity => EQUITY_RISK,
        AssetClass::Debt => DEBT_RISK,
        AssetClass::Gold => GOLD_RISK,
        AssetClass::International => INTERNATIONAL_RISK,
    }
}

pub fn risk_label(score: f64) -> RiskLabel {
    if score > HIGH_RISK_ABOVE {
        RiskLabel::High
    } else if score > MODERATE_RISK_ABOVE {
        RiskLabel::Moderate
    } else {
        RiskLabel::Conservative
    }
}

impl AllocationAdvice {
    /// The advice uses a strict `< 30` for the conservative branch, so a
    /// score of exactly 30 is labelled Conservative but advised as
    /// RiskEfficient.
    pub fn for_score(score: f64) -> Self {
        if score > HIGH_RISK_ABOVE {
            AllocationAdvice::IncreaseDebt { points: 10 }
        } else if score < MODERATE_RISK_ABOVE {
            AllocationAdvice::IncreaseEquity { points: 15 }
        } else {
            AllocationAdvice::RiskEfficient
        }
    }
}

fn goal_success_pct(expected_return_pct: f64) -> u32 {
    let shown = (expected_return_pct * 10.0).round() / 10.0;
    let pct = (shown * GOAL_SUCCESS_PER_RETURN_PCT).round().max(0.0) as u32;
    pct.min(GOAL_SUCCESS_CAP)
}

/// Metrics for any mix, balanced or not. Use [`evaluate_with`] to reject
/// malformed weights.
pub fn evaluate(mix: &AllocationMix) -> AllocationMetrics {
    let mut expected_return_pct = 0.0;
    let mut risk_score = 0.0;
    for asset in AssetClass::ALL {
        let weight = mix.weight(asset);
        expected_return_pct += weight * expected_return(asset);
        risk_score += weight * risk_weight(asset);
    }

    AllocationMetrics {
        expected_return_pct,
        risk_score,
        risk_label: risk_label(risk_score),
        total_pct: mix.total(),
        balanced: mix.is_balanced(),
        goal_success_pct: goal_success_pct(expected_return_pct),
        advice: AllocationAdvice::for_score(risk_score),
    }
}

pub fn evaluate_with(mix: &AllocationMix, config: &EvaluatorConfig) -> Result<AllocationMetrics> {
    for asset in AssetClass::ALL {
        let weight = mix.weight(asset);
        if !weight.is_finite() || weight < 0.0 {
            return Err(CalcError::invalid(format!(
                "{} allocation must be >= 0",
                asset.name()
            )));
        }
    }
    if config.enforce_sum_100 && !mix.is_balanced() {
        return Err(CalcError::invalid(format!(
            "allocation totals {}% but must be 100%",
            mix.total()
        )));
    }
    Ok(evaluate(mix))
}
