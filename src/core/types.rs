use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GoalType {
    Retirement,
    Education,
    Home,
    Vehicle,
    Travel,
    Custom,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GoalPriority {
    Essential,
    Important,
    Aspirational,
}

/// Inputs for one goal projection. Amounts are in the caller's currency unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalParameters {
    pub target_amount: f64,
    pub target_year: i32,
    pub monthly_contribution: f64,
    /// 0 (lowest) to 100 (highest).
    pub risk_capacity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionPoint {
    pub year: i32,
    pub projected_value: f64,
    pub cumulative_contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContributionAdvice {
    OnTrack,
    #[serde(rename_all = "camelCase")]
    IncreaseMonthlyBy {
        amount: f64,
    },
    /// The target year is the current year, so there are no months left to
    /// spread a shortfall over.
    HorizonReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub final_value: f64,
    pub funded_ratio_pct: u32,
    pub shortfall: f64,
    pub advice: ContributionAdvice,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum RiskCapacityBand {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskCapacityBand {
    pub fn from_capacity(risk_capacity: u8) -> Self {
        if risk_capacity > 70 {
            RiskCapacityBand::Aggressive
        } else if risk_capacity > 30 {
            RiskCapacityBand::Moderate
        } else {
            RiskCapacityBand::Conservative
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPlan {
    pub annual_return: f64,
    pub risk_band: RiskCapacityBand,
    pub points: Vec<ProjectionPoint>,
    pub summary: ProjectionSummary,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetClass {
    Equity,
    Debt,
    Gold,
    International,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Equity,
        AssetClass::Debt,
        AssetClass::Gold,
        AssetClass::International,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Debt => "debt",
            AssetClass::Gold => "gold",
            AssetClass::International => "international",
        }
    }
}

/// Percentage split across the four asset classes. Fields are percentage
/// points (0-100) and are expected, but not required, to sum to 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationMix {
    pub equity: f64,
    pub debt: f64,
    pub gold: f64,
    pub international: f64,
}

impl AllocationMix {
    pub fn new(equity: f64, debt: f64, gold: f64, international: f64) -> Self {
        Self {
            equity,
            debt,
            gold,
            international,
        }
    }

    pub fn weight(&self, asset: AssetClass) -> f64 {
        match asset {
            AssetClass::Equity => self.equity,
            AssetClass::Debt => self.debt,
            AssetClass::Gold => self.gold,
            AssetClass::International => self.international,
        }
    }

    pub fn total(&self) -> f64 {
        AssetClass::ALL.iter().map(|&asset| self.weight(asset)).sum()
    }

    pub fn is_balanced(&self) -> bool {
        (self.total() - 100.0).abs() <= 1e-9
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum RiskLabel {
    Conservative,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AllocationAdvice {
    IncreaseDebt { points: u32 },
    IncreaseEquity { points: u32 },
    RiskEfficient,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationMetrics {
    pub expected_return_pct: f64,
    pub risk_score: f64,
    pub risk_label: RiskLabel,
    pub total_pct: f64,
    pub balanced: bool,
    pub goal_success_pct: u32,
    pub advice: AllocationAdvice,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum DriftAction {
    Sell,
    Buy,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDrift {
    pub asset: AssetClass,
    pub current_pct: f64,
    pub target_pct: f64,
    pub drift_pct: f64,
    pub action: DriftAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalancePlan {
    pub threshold_pct: f64,
    pub drifts: Vec<AssetDrift>,
    pub max_abs_drift: f64,
    pub worst: Option<AssetClass>,
    pub needs_rebalance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioBand {
    pub year: i32,
    pub pessimistic: f64,
    pub median: f64,
    pub optimistic: f64,
    pub target: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioFanSummary {
    pub pessimistic_reaches_target: Option<i32>,
    pub median_reaches_target: Option<i32>,
    pub optimistic_reaches_target: Option<i32>,
}
