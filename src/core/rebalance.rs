use super::error::{CalcError, Result};
use super::types::{AllocationMix, AssetClass, AssetDrift, DriftAction, RebalancePlan};

pub const DEFAULT_DRIFT_THRESHOLD_PCT: f64 = 5.0;

fn check_mix(label: &str, mix: &AllocationMix) -> Result<()> {
    for asset in AssetClass::ALL {
        let weight = mix.weight(asset);
        if !weight.is_finite() || weight < 0.0 {
            return Err(CalcError::invalid(format!(
                "{label} {} allocation must be >= 0",
                asset.name()
            )));
        }
    }
    Ok(())
}

/// Compares a drifted portfolio against its target split. Drift is
/// `current - target` in percentage points, so an overweight class has a
/// positive drift and should be sold down.
pub fn plan_rebalance(
    current: &AllocationMix,
    target: &AllocationMix,
    threshold_pct: f64,
) -> Result<RebalancePlan> {
    check_mix("current", current)?;
    check_mix("target", target)?;
    if !threshold_pct.is_finite() || threshold_pct < 0.0 {
        return Err(CalcError::invalid("drift threshold must be >= 0"));
    }

    let mut drifts = Vec::with_capacity(AssetClass::ALL.len());
    let mut max_abs_drift = 0.0_f64;
    let mut worst = None;

    for asset in AssetClass::ALL {
        let current_pct = current.weight(asset);
        let target_pct = target.weight(asset);
        let drift_pct = current_pct - target_pct;

        let action = if drift_pct.abs() <= threshold_pct {
            DriftAction::Hold
        } else if drift_pct > 0.0 {
            DriftAction::Sell
        } else {
            DriftAction::Buy
        };

        if drift_pct.abs() > max_abs_drift {
            max_abs_drift = drift_pct.abs();
            worst = Some(asset);
        }

        drifts.push(AssetDrift {
            asset,
            current_pct,
            target_pct,
            drift_pct,
            action,
        });
    }

    Ok(RebalancePlan {
        threshold_pct,
        drifts,
        max_abs_drift,
        worst,
        needs_rebalance: max_abs_drift > threshold_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn drifted() -> (AllocationMix, AllocationMix) {
        (
            AllocationMix::new(68.0, 22.0, 10.0, 0.0),
            AllocationMix::new(60.0, 30.0, 10.0, 0.0),
        )
    }

    #[test]
    fn equity_overweight_triggers_rebalance() {
        let (current, target) = drifted();
        let plan = plan_rebalance(&current, &target, DEFAULT_DRIFT_THRESHOLD_PCT).expect("plan");

        assert!(plan.needs_rebalance);
        assert_approx(plan.max_abs_drift, 8.0);
        assert_eq!(plan.worst, Some(AssetClass::Equity));
        assert_eq!(plan.drifts.len(), 4);

        let equity = plan.drifts[0];
        assert_eq!(equity.asset, AssetClass::Equity);
        assert_approx(equity.drift_pct, 8.0);
        assert_eq!(equity.action, DriftAction::Sell);

        let debt = plan.drifts[1];
        assert_approx(debt.drift_pct, -8.0);
        assert_eq!(debt.action, DriftAction::Buy);

        assert_eq!(plan.drifts[2].action, DriftAction::Hold);
        assert_eq!(plan.drifts[3].action, DriftAction::Hold);
    }

    #[test]
    fn wide_threshold_holds_everything() {
        let (current, target) = drifted();
        let plan = plan_rebalance(&current, &target, 10.0).expect("plan");

        assert!(!plan.needs_rebalance);
        assert!(plan.drifts.iter().all(|d| d.action == DriftAction::Hold));
    }

    #[test]
    fn on_target_portfolio_has_no_worst_class() {
        let target = AllocationMix::new(50.0, 30.0, 10.0, 10.0);
        let plan = plan_rebalance(&target, &target, 0.0).expect("plan");

        assert!(!plan.needs_rebalance);
        assert_eq!(plan.worst, None);
        assert_approx(plan.max_abs_drift, 0.0);
    }

    #[test]
    fn rejects_negative_weights_and_threshold() {
        let (current, target) = drifted();
        assert!(plan_rebalance(&current, &target, -1.0).is_err());

        let bad = AllocationMix::new(-5.0, 50.0, 50.0, 5.0);
        let err = plan_rebalance(&bad, &target, 5.0).expect_err("negative current equity");
        assert!(err.to_string().contains("current equity"));
    }
}
