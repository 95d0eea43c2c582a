use super::error::{CalcError, Result};
use super::types::{ScenarioBand, ScenarioFanSummary};

/// Growth factors for the three deterministic curves. These are fixed
/// compounding paths, not sampled percentiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioFanConfig {
    pub base_growth: f64,
    pub optimistic_factor: f64,
    pub pessimistic_factor: f64,
}

impl Default for ScenarioFanConfig {
    fn default() -> Self {
        Self {
            base_growth: 0.08,
            optimistic_factor: 1.15,
            pessimistic_factor: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioFanInput {
    pub start_value: f64,
    pub start_year: i32,
    pub years: u32,
    pub target: f64,
}

const MAX_FAN_YEARS: u32 = 100;

pub fn scenario_fan(
    input: &ScenarioFanInput,
    config: &ScenarioFanConfig,
) -> Result<Vec<ScenarioBand>> {
    if !input.start_value.is_finite() || input.start_value < 0.0 {
        return Err(CalcError::invalid("start value must be >= 0"));
    }
    if !input.target.is_finite() || input.target <= 0.0 {
        return Err(CalcError::invalid("target must be > 0"));
    }
    if input.years > MAX_FAN_YEARS {
        return Err(CalcError::invalid(format!(
            "scenario horizon must be <= {MAX_FAN_YEARS} years"
        )));
    }
    if !config.base_growth.is_finite() || config.base_growth <= -1.0 {
        return Err(CalcError::invalid("base growth must be > -100%"));
    }
    if !(config.optimistic_factor.is_finite() && config.optimistic_factor > 0.0)
        || !(config.pessimistic_factor.is_finite() && config.pessimistic_factor > 0.0)
    {
        return Err(CalcError::invalid("scenario factors must be > 0"));
    }
    if config.pessimistic_factor > config.optimistic_factor {
        return Err(CalcError::invalid(
            "pessimistic factor cannot exceed optimistic factor",
        ));
    }
    let last_year = i32::try_from(input.years)
        .ok()
        .and_then(|years| input.start_year.checked_add(years));
    if last_year.is_none() {
        return Err(CalcError::invalid("start year is out of range"));
    }

    let bands = (0..=input.years)
        .map(|i| {
            let n = i as i32;
            let median = input.start_value * (1.0 + config.base_growth).powi(n);
            ScenarioBand {
                year: input.start_year + n,
                pessimistic: median * config.pessimistic_factor.powi(n),
                median,
                optimistic: median * config.optimistic_factor.powi(n),
                target: input.target,
            }
        })
        .collect();

    Ok(bands)
}

pub fn fan_summary(bands: &[ScenarioBand]) -> ScenarioFanSummary {
    let first_year = |pick: fn(&ScenarioBand) -> f64| {
        bands
            .iter()
            .find(|band| pick(band) >= band.target)
            .map(|band| band.year)
    };

    ScenarioFanSummary {
        pessimistic_reaches_target: first_year(|b| b.pessimistic),
        median_reaches_target: first_year(|b| b.median),
        optimistic_reaches_target: first_year(|b| b.optimistic),
    }
}
