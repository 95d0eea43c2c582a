use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{
    AllocationMetrics, AllocationMix, CalcError, DEFAULT_DRIFT_THRESHOLD_PCT, EvaluatorConfig,
    GoalParameters, GoalPlan, GoalPriority, GoalType, ProjectionConfig, RebalancePlan,
    ScenarioBand, ScenarioFanConfig, ScenarioFanInput, ScenarioFanSummary, evaluate_with,
    fan_summary, goal_progress_pct, plan_goal, plan_rebalance, scenario_fan,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGoalType {
    Retirement,
    Education,
    Home,
    Vehicle,
    Travel,
    Custom,
}

impl From<CliGoalType> for GoalType {
    fn from(value: CliGoalType) -> Self {
        match value {
            CliGoalType::Retirement => GoalType::Retirement,
            CliGoalType::Education => GoalType::Education,
            CliGoalType::Home => GoalType::Home,
            CliGoalType::Vehicle => GoalType::Vehicle,
            CliGoalType::Travel => GoalType::Travel,
            CliGoalType::Custom => GoalType::Custom,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGoalPriority {
    Essential,
    Important,
    Aspirational,
}

impl From<CliGoalPriority> for GoalPriority {
    fn from(value: CliGoalPriority) -> Self {
        match value {
            CliGoalPriority::Essential => GoalPriority::Essential,
            CliGoalPriority::Important => GoalPriority::Important,
            CliGoalPriority::Aspirational => GoalPriority::Aspirational,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalType {
    #[serde(alias = "Retirement")]
    Retirement,
    #[serde(alias = "Education")]
    Education,
    #[serde(alias = "Home")]
    Home,
    #[serde(alias = "Vehicle")]
    Vehicle,
    #[serde(alias = "Travel")]
    Travel,
    #[serde(alias = "Custom")]
    Custom,
}

impl From<ApiGoalType> for CliGoalType {
    fn from(value: ApiGoalType) -> Self {
        match value {
            ApiGoalType::Retirement => CliGoalType::Retirement,
            ApiGoalType::Education => CliGoalType::Education,
            ApiGoalType::Home => CliGoalType::Home,
            ApiGoalType::Vehicle => CliGoalType::Vehicle,
            ApiGoalType::Travel => CliGoalType::Travel,
            ApiGoalType::Custom => CliGoalType::Custom,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalPriority {
    #[serde(alias = "Essential")]
    Essential,
    #[serde(alias = "Important")]
    Important,
    #[serde(alias = "Aspirational")]
    Aspirational,
}

impl From<ApiGoalPriority> for CliGoalPriority {
    fn from(value: ApiGoalPriority) -> Self {
        match value {
            ApiGoalPriority::Essential => CliGoalPriority::Essential,
            ApiGoalPriority::Important => CliGoalPriority::Important,
            ApiGoalPriority::Aspirational => CliGoalPriority::Aspirational,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "goalplan",
    about = "Goal projection and asset allocation calculators with a JSON HTTP API"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP
    Serve(ServeArgs),
    /// Project a goal and print the result as JSON
    Project(ProjectArgs),
    /// Evaluate an asset allocation and print the result as JSON
    Allocate(AllocateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CalculatorArgs {
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Annual return at zero risk capacity in percent"
    )]
    pub annual_return_base: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Extra annual return at full risk capacity in percent"
    )]
    pub annual_return_risk_slope: f64,
    #[arg(long, help = "Reject allocations that do not total 100%")]
    pub enforce_sum_100: bool,
    #[arg(
        long,
        default_value_t = DEFAULT_DRIFT_THRESHOLD_PCT,
        help = "Drift in percentage points that triggers a rebalance"
    )]
    pub rebalance_threshold: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[command(flatten)]
    pub calculator: CalculatorArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, default_value_t = 10_000_000.0)]
    pub target_amount: f64,
    #[arg(long, default_value_t = 2045)]
    pub target_year: i32,
    #[arg(long, default_value_t = 25_000.0)]
    pub monthly_contribution: f64,
    #[arg(long, default_value_t = 50, help = "Risk capacity from 0 to 100")]
    pub risk_capacity: u32,
    #[arg(long, help = "Defaults to the current calendar year")]
    pub current_year: Option<i32>,
    #[arg(long, help = "Amount already saved; adds progressPct to the output")]
    pub current_value: Option<f64>,
    #[arg(long, value_enum, default_value_t = CliGoalType::Retirement)]
    pub goal_type: CliGoalType,
    #[arg(long, value_enum, default_value_t = CliGoalPriority::Essential)]
    pub priority: CliGoalPriority,
    #[command(flatten)]
    pub calculator: CalculatorArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AllocateArgs {
    #[arg(long, default_value_t = 50.0)]
    pub equity: f64,
    #[arg(long, default_value_t = 30.0)]
    pub debt: f64,
    #[arg(long, default_value_t = 10.0)]
    pub gold: f64,
    #[arg(long, default_value_t = 10.0)]
    pub international: f64,
    #[command(flatten)]
    pub calculator: CalculatorArgs,
}

/// Calculator settings shared by every request.
#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
    pub projection: ProjectionConfig,
    pub evaluator: EvaluatorConfig,
    pub rebalance_threshold_pct: f64,
    pub scenarios: ScenarioFanConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig::default(),
            evaluator: EvaluatorConfig::default(),
            rebalance_threshold_pct: DEFAULT_DRIFT_THRESHOLD_PCT,
            scenarios: ScenarioFanConfig::default(),
        }
    }
}

pub fn build_config(args: &CalculatorArgs) -> Result<AppConfig, String> {
    if !args.annual_return_base.is_finite() || args.annual_return_base <= -100.0 {
        return Err("--annual-return-base must be > -100".to_string());
    }
    if !args.annual_return_risk_slope.is_finite() {
        return Err("--annual-return-risk-slope must be finite".to_string());
    }
    if !args.rebalance_threshold.is_finite() || args.rebalance_threshold < 0.0 {
        return Err("--rebalance-threshold must be >= 0".to_string());
    }

    let projection = ProjectionConfig {
        annual_return_base: args.annual_return_base / 100.0,
        annual_return_risk_slope: args.annual_return_risk_slope / 100.0,
    };
    if projection.validate().is_err() {
        return Err("--annual-return-base + --annual-return-risk-slope must be > -100".to_string());
    }

    Ok(AppConfig {
        projection,
        evaluator: EvaluatorConfig {
            enforce_sum_100: args.enforce_sum_100,
        },
        rebalance_threshold_pct: args.rebalance_threshold,
        scenarios: ScenarioFanConfig::default(),
    })
}

fn clock_year() -> i32 {
    chrono::Local::now().year()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    target_amount: Option<f64>,
    target_year: Option<i32>,
    monthly_contribution: Option<f64>,
    risk_capacity: Option<u32>,
    current_year: Option<i32>,
    current_value: Option<f64>,
    goal_type: Option<ApiGoalType>,
    priority: Option<ApiGoalPriority>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AllocationPayload {
    equity: Option<f64>,
    debt: Option<f64>,
    gold: Option<f64>,
    international: Option<f64>,
    enforce_sum100: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RebalancePayload {
    current_equity: Option<f64>,
    current_debt: Option<f64>,
    current_gold: Option<f64>,
    current_international: Option<f64>,
    target_equity: Option<f64>,
    target_debt: Option<f64>,
    target_gold: Option<f64>,
    target_international: Option<f64>,
    threshold_pct: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScenarioPayload {
    start_value: Option<f64>,
    start_year: Option<i32>,
    years: Option<u32>,
    target: Option<f64>,
}

#[derive(Debug)]
struct ProjectionRequest {
    goal: GoalParameters,
    current_year: i32,
    current_value: Option<f64>,
    goal_type: GoalType,
    priority: GoalPriority,
}

#[derive(Debug)]
struct AllocationRequest {
    mix: AllocationMix,
    evaluator: EvaluatorConfig,
}

#[derive(Debug)]
struct RebalanceRequest {
    current: AllocationMix,
    target: AllocationMix,
    threshold_pct: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    goal_type: GoalType,
    priority: GoalPriority,
    current_year: i32,
    target_year: i32,
    target_amount: f64,
    monthly_contribution: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress_pct: Option<u32>,
    #[serde(flatten)]
    plan: GoalPlan,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllocationResponse {
    allocation: AllocationMix,
    #[serde(flatten)]
    metrics: AllocationMetrics,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioResponse {
    bands: Vec<ScenarioBand>,
    summary: ScenarioFanSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn projection_request_from_payload(
    payload: ProjectionPayload,
    fallback_year: i32,
) -> Result<ProjectionRequest, String> {
    let risk_capacity = payload.risk_capacity.unwrap_or(50);
    let risk_capacity = u8::try_from(risk_capacity)
        .ok()
        .filter(|r| *r <= 100)
        .ok_or_else(|| "riskCapacity must be between 0 and 100".to_string())?;

    let goal_type: CliGoalType = payload
        .goal_type
        .map(Into::into)
        .unwrap_or(CliGoalType::Retirement);
    let priority: CliGoalPriority = payload
        .priority
        .map(Into::into)
        .unwrap_or(CliGoalPriority::Essential);

    Ok(ProjectionRequest {
        goal: GoalParameters {
            target_amount: payload.target_amount.unwrap_or(10_000_000.0),
            target_year: payload.target_year.unwrap_or(2045),
            monthly_contribution: payload.monthly_contribution.unwrap_or(25_000.0),
            risk_capacity,
        },
        current_year: payload.current_year.unwrap_or(fallback_year),
        current_value: payload.current_value,
        goal_type: goal_type.into(),
        priority: priority.into(),
    })
}

fn allocation_request_from_payload(
    payload: AllocationPayload,
    config: &AppConfig,
) -> AllocationRequest {
    let mut evaluator = config.evaluator;
    if let Some(v) = payload.enforce_sum100 {
        evaluator.enforce_sum_100 = v;
    }

    AllocationRequest {
        mix: AllocationMix {
            equity: payload.equity.unwrap_or(50.0),
            debt: payload.debt.unwrap_or(30.0),
            gold: payload.gold.unwrap_or(10.0),
            international: payload.international.unwrap_or(10.0),
        },
        evaluator,
    }
}

fn rebalance_request_from_payload(
    payload: RebalancePayload,
    config: &AppConfig,
) -> RebalanceRequest {
    RebalanceRequest {
        current: AllocationMix {
            equity: payload.current_equity.unwrap_or(68.0),
            debt: payload.current_debt.unwrap_or(22.0),
            gold: payload.current_gold.unwrap_or(10.0),
            international: payload.current_international.unwrap_or(0.0),
        },
        target: AllocationMix {
            equity: payload.target_equity.unwrap_or(60.0),
            debt: payload.target_debt.unwrap_or(30.0),
            gold: payload.target_gold.unwrap_or(10.0),
            international: payload.target_international.unwrap_or(0.0),
        },
        threshold_pct: payload.threshold_pct.unwrap_or(config.rebalance_threshold_pct),
    }
}

fn scenario_input_from_payload(payload: ScenarioPayload) -> ScenarioFanInput {
    ScenarioFanInput {
        start_value: payload.start_value.unwrap_or(2_000_000.0),
        start_year: payload.start_year.unwrap_or(2026),
        years: payload.years.unwrap_or(15),
        target: payload.target.unwrap_or(5_000_000.0),
    }
}

fn build_projection_response(
    request: &ProjectionRequest,
    config: &AppConfig,
) -> Result<ProjectionResponse, CalcError> {
    let plan = plan_goal(&request.goal, request.current_year, &config.projection)?;
    let progress_pct = request
        .current_value
        .map(|saved| goal_progress_pct(saved, request.goal.target_amount))
        .transpose()?;
    Ok(ProjectionResponse {
        goal_type: request.goal_type,
        priority: request.priority,
        current_year: request.current_year,
        target_year: request.goal.target_year,
        target_amount: request.goal.target_amount,
        monthly_contribution: request.goal.monthly_contribution,
        progress_pct,
        plan,
    })
}

fn build_allocation_response(
    request: &AllocationRequest,
) -> Result<AllocationResponse, CalcError> {
    let metrics = evaluate_with(&request.mix, &request.evaluator)?;
    Ok(AllocationResponse {
        allocation: request.mix,
        metrics,
    })
}

fn build_rebalance_response(request: &RebalanceRequest) -> Result<RebalancePlan, CalcError> {
    plan_rebalance(&request.current, &request.target, request.threshold_pct)
}

fn build_scenario_response(
    input: &ScenarioFanInput,
    config: &AppConfig,
) -> Result<ScenarioResponse, CalcError> {
    let bands = scenario_fan(input, &config.scenarios)?;
    let summary = fan_summary(&bands);
    Ok(ScenarioResponse { bands, summary })
}

pub async fn run_http_server(addr: SocketAddr, config: AppConfig) -> std::io::Result<()> {
    let app = router(config);

    let listener = TcpListener::bind(addr).await?;
    info!("goal planning API listening on http://{addr}");
    info!(
        "annual return {:.2}% + {:.2}% at full risk capacity, rebalance threshold {}pp",
        config.projection.annual_return_base * 100.0,
        config.projection.annual_return_risk_slope * 100.0,
        config.rebalance_threshold_pct
    );

    axum::serve(listener, app).await
}

pub fn router(config: AppConfig) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route(
            "/api/allocation",
            get(allocation_get_handler).post(allocation_post_handler),
        )
        .route(
            "/api/rebalance",
            get(rebalance_get_handler).post(rebalance_post_handler),
        )
        .route(
            "/api/scenarios",
            get(scenarios_get_handler).post(scenarios_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(Arc::new(config))
}

type SharedConfig = State<Arc<AppConfig>>;

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_get_handler(
    State(config): SharedConfig,
    payload: Result<Query<ProjectionPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => projection_handler_impl(&config, payload, clock_year()),
        Err(e) => reject(&e.body_text()),
    }
}

async fn projection_post_handler(
    State(config): SharedConfig,
    payload: Result<Json<ProjectionPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => projection_handler_impl(&config, payload, clock_year()),
        Err(e) => reject(&e.body_text()),
    }
}

async fn allocation_get_handler(
    State(config): SharedConfig,
    payload: Result<Query<AllocationPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => allocation_handler_impl(&config, payload),
        Err(e) => reject(&e.body_text()),
    }
}

async fn allocation_post_handler(
    State(config): SharedConfig,
    payload: Result<Json<AllocationPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => allocation_handler_impl(&config, payload),
        Err(e) => reject(&e.body_text()),
    }
}

async fn rebalance_get_handler(
    State(config): SharedConfig,
    payload: Result<Query<RebalancePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => rebalance_handler_impl(&config, payload),
        Err(e) => reject(&e.body_text()),
    }
}

async fn rebalance_post_handler(
    State(config): SharedConfig,
    payload: Result<Json<RebalancePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => rebalance_handler_impl(&config, payload),
        Err(e) => reject(&e.body_text()),
    }
}

async fn scenarios_get_handler(
    State(config): SharedConfig,
    payload: Result<Query<ScenarioPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => scenarios_handler_impl(&config, payload),
        Err(e) => reject(&e.body_text()),
    }
}

async fn scenarios_post_handler(
    State(config): SharedConfig,
    payload: Result<Json<ScenarioPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => scenarios_handler_impl(&config, payload),
        Err(e) => reject(&e.body_text()),
    }
}

fn projection_handler_impl(config: &AppConfig, payload: ProjectionPayload, year: i32) -> Response {
    let request = match projection_request_from_payload(payload, year) {
        Ok(request) => request,
        Err(msg) => return reject(&msg),
    };
    debug!(
        "projection: target {} by {} from {}, {} monthly, risk {}",
        request.goal.target_amount,
        request.goal.target_year,
        request.current_year,
        request.goal.monthly_contribution,
        request.goal.risk_capacity
    );
    match build_projection_response(&request, config) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => reject(&e.to_string()),
    }
}

fn allocation_handler_impl(config: &AppConfig, payload: AllocationPayload) -> Response {
    let request = allocation_request_from_payload(payload, config);
    debug!("allocation: {:?}", request.mix);
    match build_allocation_response(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => reject(&e.to_string()),
    }
}

fn rebalance_handler_impl(config: &AppConfig, payload: RebalancePayload) -> Response {
    let request = rebalance_request_from_payload(payload, config);
    debug!(
        "rebalance: {:?} -> {:?} at {}pp",
        request.current, request.target, request.threshold_pct
    );
    match build_rebalance_response(&request) {
        Ok(plan) => json_response(StatusCode::OK, plan),
        Err(e) => reject(&e.to_string()),
    }
}

fn scenarios_handler_impl(config: &AppConfig, payload: ScenarioPayload) -> Response {
    let input = scenario_input_from_payload(payload);
    debug!("scenarios: {input:?}");
    match build_scenario_response(&input, config) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => reject(&e.to_string()),
    }
}

fn reject(msg: &str) -> Response {
    warn!("rejected request: {msg}");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

pub fn run_project_command(args: ProjectArgs) -> Result<String, String> {
    let config = build_config(&args.calculator)?;
    let payload = ProjectionPayload {
        target_amount: Some(args.target_amount),
        target_year: Some(args.target_year),
        monthly_contribution: Some(args.monthly_contribution),
        risk_capacity: Some(args.risk_capacity),
        current_year: args.current_year,
        current_value: args.current_value,
        goal_type: None,
        priority: None,
    };
    let mut request = projection_request_from_payload(payload, clock_year())?;
    request.goal_type = args.goal_type.into();
    request.priority = args.priority.into();

    let response = build_projection_response(&request, &config).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&response).map_err(|e| format!("failed to encode result: {e}"))
}

pub fn run_allocate_command(args: AllocateArgs) -> Result<String, String> {
    let config = build_config(&args.calculator)?;
    let request = AllocationRequest {
        mix: AllocationMix::new(args.equity, args.debt, args.gold, args.international),
        evaluator: config.evaluator,
    };

    let response = build_allocation_response(&request).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&response).map_err(|e| format!("failed to encode result: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_calculator_args() -> CalculatorArgs {
        CalculatorArgs {
            annual_return_base: 8.0,
            annual_return_risk_slope: 4.0,
            enforce_sum_100: false,
            rebalance_threshold: DEFAULT_DRIFT_THRESHOLD_PCT,
        }
    }

    fn projection_request_from_json(json: &str, year: i32) -> Result<ProjectionRequest, String> {
        let payload = serde_json::from_str::<ProjectionPayload>(json)
            .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
        projection_request_from_payload(payload, year)
    }

    async fn send(request: Request<Body>) -> (StatusCode, Option<String>, serde_json::Value) {
        let response = router(AppConfig::default())
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let cache = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body = serde_json::from_slice(&bytes).expect("body should be JSON");
        (status, cache, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request")
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }

    #[test]
    fn build_config_converts_percent_to_fractions() {
        let config = build_config(&sample_calculator_args()).expect("valid config");
        assert_approx(config.projection.annual_return_base, 0.08);
        assert_approx(config.projection.annual_return_risk_slope, 0.04);
        assert!(!config.evaluator.enforce_sum_100);
        assert_approx(config.rebalance_threshold_pct, 5.0);
    }

    #[test]
    fn build_config_rejects_invalid_values() {
        let mut args = sample_calculator_args();
        args.annual_return_base = -100.0;
        let err = build_config(&args).expect_err("must reject -100% base");
        assert!(err.contains("--annual-return-base"));

        let mut args = sample_calculator_args();
        args.annual_return_risk_slope = -150.0;
        let err = build_config(&args).expect_err("must reject total loss at full risk");
        assert!(err.contains("--annual-return-risk-slope"));

        let mut args = sample_calculator_args();
        args.rebalance_threshold = -1.0;
        let err = build_config(&args).expect_err("must reject negative threshold");
        assert!(err.contains("--rebalance-threshold"));
    }

    #[test]
    fn projection_request_from_json_parses_web_keys() {
        let json = r#"{
          "targetAmount": 5000000,
          "targetYear": 2040,
          "monthlyContribution": 15000,
          "riskCapacity": 80,
          "currentYear": 2026,
          "goalType": "education",
          "priority": "Important"
        }"#;
        let request = projection_request_from_json(json, 1999).expect("json should parse");

        assert_approx(request.goal.target_amount, 5_000_000.0);
        assert_eq!(request.goal.target_year, 2040);
        assert_approx(request.goal.monthly_contribution, 15_000.0);
        assert_eq!(request.goal.risk_capacity, 80);
        assert_eq!(request.current_year, 2026);
        assert_eq!(request.goal_type, GoalType::Education);
        assert_eq!(request.priority, GoalPriority::Important);
    }

    #[test]
    fn projection_request_defaults_to_goal_form_values() {
        let request = projection_request_from_json("{}", 2030).expect("empty payload is valid");
        assert_approx(request.goal.target_amount, 10_000_000.0);
        assert_eq!(request.goal.target_year, 2045);
        assert_approx(request.goal.monthly_contribution, 25_000.0);
        assert_eq!(request.goal.risk_capacity, 50);
        assert_eq!(request.current_year, 2030);
        assert_eq!(request.goal_type, GoalType::Retirement);
        assert_eq!(request.priority, GoalPriority::Essential);
    }

    #[test]
    fn projection_request_rejects_out_of_range_risk() {
        let err = projection_request_from_json(r#"{"riskCapacity": 300}"#, 2026)
            .expect_err("must reject risk above 100");
        assert!(err.contains("riskCapacity"));
    }

    #[test]
    fn projection_handler_rejects_past_target_year() {
        let config = AppConfig::default();
        let payload = ProjectionPayload {
            target_year: Some(2020),
            ..ProjectionPayload::default()
        };
        let response = projection_handler_impl(&config, payload, 2026);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
    }

    #[test]
    fn projection_handler_accepts_defaults() {
        let response =
            projection_handler_impl(&AppConfig::default(), ProjectionPayload::default(), 2026);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn projection_response_serialization_contains_expected_fields() {
        let request = projection_request_from_json(
            r#"{"targetYear": 2026, "currentYear": 2025, "targetAmount": 330000}"#,
            2025,
        )
        .expect("valid request");
        let response =
            build_projection_response(&request, &AppConfig::default()).expect("valid projection");
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"goalType\":\"Retirement\""));
        assert!(json.contains("\"riskBand\":\"Moderate\""));
        assert!(json.contains("\"points\""));
        assert!(json.contains("\"projectedValue\":330000.0"));
        assert!(json.contains("\"cumulativeContribution\":300000.0"));
        assert!(json.contains("\"fundedRatioPct\":100"));
        assert!(json.contains("\"advice\":{\"kind\":\"onTrack\"}"));
    }

    #[test]
    fn allocation_payload_honours_enforce_flag() {
        let payload = serde_json::from_str::<AllocationPayload>(
            r#"{"equity": 70, "debt": 30, "gold": 10, "international": 0, "enforceSum100": true}"#,
        )
        .expect("json should parse");
        let request = allocation_request_from_payload(payload, &AppConfig::default());
        assert!(request.evaluator.enforce_sum_100);

        let err = build_allocation_response(&request).expect_err("110% must be rejected");
        assert!(err.to_string().contains("must be 100%"));
    }

    #[test]
    fn allocation_response_serialization_contains_expected_fields() {
        let request =
            allocation_request_from_payload(AllocationPayload::default(), &AppConfig::default());
        let response = build_allocation_response(&request).expect("default mix is valid");
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"allocation\""));
        assert!(json.contains("\"expectedReturnPct\""));
        assert!(json.contains("\"riskScore\""));
        assert!(json.contains("\"riskLabel\":\"Moderate\""));
        assert!(json.contains("\"balanced\":true"));
        assert!(json.contains("\"goalSuccessPct\":77"));
    }

    #[test]
    fn rebalance_defaults_match_drift_alert() {
        let request =
            rebalance_request_from_payload(RebalancePayload::default(), &AppConfig::default());
        let plan = build_rebalance_response(&request).expect("valid plan");
        assert!(plan.needs_rebalance);
        assert_approx(plan.max_abs_drift, 8.0);

        let payload = RebalancePayload {
            threshold_pct: Some(10.0),
            ..RebalancePayload::default()
        };
        let request = rebalance_request_from_payload(payload, &AppConfig::default());
        let plan = build_rebalance_response(&request).expect("valid plan");
        assert!(!plan.needs_rebalance);
    }

    #[test]
    fn scenario_handler_reports_bad_target() {
        let payload = ScenarioPayload {
            target: Some(-1.0),
            ..ScenarioPayload::default()
        };
        let response = scenarios_handler_impl(&AppConfig::default(), payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = scenarios_handler_impl(&AppConfig::default(), ScenarioPayload::default());
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn cli_parses_serve_and_project_subcommands() {
        let cli = Cli::try_parse_from(["goalplan", "serve", "--port", "9000", "--enforce-sum-100"])
            .expect("serve args parse");
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.port, 9000);
                assert!(args.calculator.enforce_sum_100);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "goalplan",
            "project",
            "--target-year",
            "2026",
            "--current-year",
            "2025",
            "--goal-type",
            "home",
        ])
        .expect("project args parse");
        match cli.command {
            Command::Project(args) => {
                assert_eq!(args.target_year, 2026);
                assert_eq!(args.current_year, Some(2025));
                assert_eq!(args.goal_type, CliGoalType::Home);
                let json = run_project_command(args).expect("projection runs");
                assert!(json.contains("\"goalType\": \"Home\""));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn allocate_command_reports_invalid_mix() {
        let args = AllocateArgs {
            equity: -10.0,
            debt: 60.0,
            gold: 30.0,
            international: 20.0,
            calculator: sample_calculator_args(),
        };
        let err = run_allocate_command(args).expect_err("negative equity");
        assert!(err.contains("equity"));
    }

    #[test]
    fn projection_response_reports_progress_when_current_value_is_given() {
        let request = projection_request_from_json(
            r#"{"targetAmount": 20000000, "currentValue": 8600000, "currentYear": 2026}"#,
            2026,
        )
        .expect("valid request");
        let response =
            build_projection_response(&request, &AppConfig::default()).expect("valid projection");
        assert_eq!(response.progress_pct, Some(43));
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"progressPct\":43"));

        let request = projection_request_from_json(r#"{"currentYear": 2026}"#, 2026)
            .expect("valid request");
        let response =
            build_projection_response(&request, &AppConfig::default()).expect("valid projection");
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(!json.contains("progressPct"));

        let request = projection_request_from_json(r#"{"currentValue": -1}"#, 2026)
            .expect("valid request");
        let err = build_projection_response(&request, &AppConfig::default())
            .expect_err("negative savings");
        assert!(err.to_string().contains("current value"));
    }

    #[tokio::test]
    async fn router_serves_health_and_json_not_found() {
        let (status, cache, body) = send(get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert_eq!(body["status"], "ok");

        let (status, _, body) = send(get_request("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn router_projects_from_query_string() {
        let (status, cache, body) = send(get_request(
            "/api/projection?targetAmount=330000&targetYear=2026&currentYear=2025\
             &goalType=education&currentValue=165000",
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert_eq!(body["goalType"], "Education");
        assert_eq!(body["progressPct"], 50);
        assert_eq!(body["points"][1]["projectedValue"], 330000.0);
        assert_eq!(body["summary"]["advice"]["kind"], "onTrack");
    }

    #[tokio::test]
    async fn router_reports_malformed_requests_as_json_400() {
        for request in [
            post_json("/api/projection", "{not json"),
            get_request("/api/projection?riskCapacity=-5"),
            post_json("/api/allocation", r#"{"equity":"x"}"#),
            get_request("/api/rebalance?thresholdPct=lots"),
            post_json("/api/scenarios", r#"{"years": -3}"#),
        ] {
            let uri = request.uri().to_string();
            let (status, cache, body) = send(request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(cache.as_deref(), Some("no-store"), "{uri}");
            assert!(
                body["error"].as_str().is_some_and(|msg| !msg.is_empty()),
                "{uri}: {body}"
            );
        }
    }

    #[tokio::test]
    async fn router_rejects_scenario_start_year_out_of_range() {
        let (status, _, body) = send(get_request("/api/scenarios?startYear=2147483647")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|msg| msg.contains("start year is out of range"))
        );

        let (status, _, body) = send(post_json("/api/scenarios", "{}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bands"].as_array().map(Vec::len), Some(16));
    }
}
