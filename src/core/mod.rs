mod allocation;
mod error;
mod projection;
mod rebalance;
mod scenarios;
mod types;

pub use allocation::{EvaluatorConfig, evaluate, evaluate_with, risk_label};
pub use error::{CalcError, Result};
pub use projection::{
    MAX_HORIZON_YEARS, ProjectionConfig, annual_return, goal_progress_pct, plan_goal, project,
    summarize,
};
pub use rebalance::{DEFAULT_DRIFT_THRESHOLD_PCT, plan_rebalance};
pub use scenarios::{ScenarioFanConfig, ScenarioFanInput, fan_summary, scenario_fan};
pub use types::{
    AllocationAdvice, AllocationMetrics, AllocationMix, AssetClass, AssetDrift, ContributionAdvice,
    DriftAction, GoalParameters, GoalPlan, GoalPriority, GoalType, ProjectionPoint,
    ProjectionSummary, RebalancePlan, RiskCapacityBand, RiskLabel, ScenarioBand,
    ScenarioFanSummary,
};
