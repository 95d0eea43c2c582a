use super::error::{CalcError, Result};
use super::types::{
    ContributionAdvice, GoalParameters, GoalPlan, ProjectionPoint, ProjectionSummary,
    RiskCapacityBand,
};

/// Longest horizon accepted by [`project`].
pub const MAX_HORIZON_YEARS: i32 = 200;

/// Blended-rate parameters for the goal projection. The annual return moves
/// linearly from `annual_return_base` at risk capacity 0 to
/// `annual_return_base + annual_return_risk_slope` at risk capacity 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    pub annual_return_base: f64,
    pub annual_return_risk_slope: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            annual_return_base: 0.08,
            annual_return_risk_slope: 0.04,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.annual_return_base.is_finite() || !self.annual_return_risk_slope.is_finite() {
            return Err(CalcError::invalid("annual return parameters must be finite"));
        }
        let lowest = self
            .annual_return_base
            .min(self.annual_return_base + self.annual_return_risk_slope);
        if lowest <= -1.0 {
            return Err(CalcError::invalid("annual return must be > -100%"));
        }
        Ok(())
    }
}

pub fn annual_return(risk_capacity: u8, config: &ProjectionConfig) -> f64 {
    config.annual_return_base
        + (f64::from(risk_capacity) / 100.0) * config.annual_return_risk_slope
}

fn horizon_years(params: &GoalParameters, current_year: i32) -> Result<i32> {
    let years = params
        .target_year
        .checked_sub(current_year)
        .ok_or_else(|| CalcError::invalid("target year is out of range"))?;
    if years < 0 {
        return Err(CalcError::invalid(format!(
            "target year {} is before current year {current_year}",
            params.target_year
        )));
    }
    if years > MAX_HORIZON_YEARS {
        return Err(CalcError::invalid(format!(
            "horizon of {years} years exceeds {MAX_HORIZON_YEARS}"
        )));
    }
    Ok(years)
}

fn validate_goal(params: &GoalParameters) -> Result<()> {
    if !params.target_amount.is_finite() || params.target_amount <= 0.0 {
        return Err(CalcError::invalid("target amount must be > 0"));
    }
    if !params.monthly_contribution.is_finite() || params.monthly_contribution < 0.0 {
        return Err(CalcError::invalid("monthly contribution must be >= 0"));
    }
    if params.risk_capacity > 100 {
        return Err(CalcError::invalid("risk capacity must be between 0 and 100"));
    }
    Ok(())
}

/// Year-by-year projection from `current_year` to the target year inclusive.
///
/// The annual contribution is deposited at the start of each year and the
/// balance compounds once per year at the blended rate. The first point is
/// always zero: nothing has been invested yet.
pub fn project(
    params: &GoalParameters,
    current_year: i32,
    config: &ProjectionConfig,
) -> Result<Vec<ProjectionPoint>> {
    validate_goal(params)?;
    config.validate()?;
    let years = horizon_years(params, current_year)?;

    let rate = annual_return(params.risk_capacity, config);
    let annual_contribution = params.monthly_contribution * 12.0;
    if !annual_contribution.is_finite() {
        return Err(CalcError::invalid("monthly contribution is too large"));
    }

    let mut points = Vec::with_capacity(years as usize + 1);
    let mut value = 0.0_f64;
    for i in 0..=years {
        if !value.is_finite() {
            return Err(CalcError::invalid(
                "projected value overflows; lower the contribution or horizon",
            ));
        }
        points.push(ProjectionPoint {
            year: current_year + i,
            projected_value: value.round(),
            cumulative_contribution: annual_contribution * f64::from(i),
        });
        value = (value + annual_contribution) * (1.0 + rate);
    }

    Ok(points)
}

pub fn summarize(
    params: &GoalParameters,
    current_year: i32,
    points: &[ProjectionPoint],
) -> Result<ProjectionSummary> {
    validate_goal(params)?;
    let years = horizon_years(params, current_year)?;
    let last = points
        .last()
        .ok_or_else(|| CalcError::invalid("projection series is empty"))?;

    let final_value = last.projected_value;
    let funded_ratio_pct = (100.0 * final_value / params.target_amount)
        .round()
        .clamp(0.0, 100.0) as u32;
    let gap = params.target_amount - final_value;

    let advice = if funded_ratio_pct >= 100 {
        ContributionAdvice::OnTrack
    } else if years == 0 {
        ContributionAdvice::HorizonReached
    } else {
        ContributionAdvice::IncreaseMonthlyBy {
            amount: (gap / (f64::from(years) * 12.0)).round(),
        }
    };

    Ok(ProjectionSummary {
        final_value,
        funded_ratio_pct,
        shortfall: gap.max(0.0),
        advice,
    })
}

pub fn plan_goal(
    params: &GoalParameters,
    current_year: i32,
    config: &ProjectionConfig,
) -> Result<GoalPlan> {
    let points = project(params, current_year, config)?;
    let summary = summarize(params, current_year, &points)?;
    Ok(GoalPlan {
        annual_return: annual_return(params.risk_capacity, config),
        risk_band: RiskCapacityBand::from_capacity(params.risk_capacity),
        points,
        summary,
    })
}

/// Percentage of `target` already saved. Not capped: an overfunded goal
/// reports more than 100. The projection endpoint and `project --current-value`
/// report it as `progressPct`.
pub fn goal_progress_pct(current: f64, target: f64) -> Result<u32> {
    if !target.is_finite() || target <= 0.0 {
        return Err(CalcError::invalid("goal target must be > 0"));
    }
    if !current.is_finite() || current < 0.0 {
        return Err(CalcError::invalid("goal current value must be >= 0"));
    }
    Ok((current / target * 100.0).round() as u32)
}
