// 🌐 REST API with Axum
//
// Every route lives under /api. Handlers lock the shared connection,
// call into db.rs and map failures through ApiError.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, APP_VERSION};
use crate::db::{self, Upsert};
use crate::entities::{
    normalize_mask, Card, CardType, CardWithOwner, Entrepreneur, EntrepreneurWithCards,
    ExpenseItem, ExpenseItemUpdate, ExpenseTask, NewExpenseItem, NewExpenseTask, PeriodStatus,
    TaskError, TaskUpdate, User,
};
use crate::importer::{ImportError, ImportSummary, ReconcilingImporter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(conn: Connection, config: Config) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<TaskError>() {
            Some(task_err) => ApiError::BadRequest(task_err.to_string()),
            None => ApiError::Internal(format!("{:#}", err)),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::SourceNotFound(_) => ApiError::NotFound(err.to_string()),
            ImportError::SourceUnreadable { .. } => ApiError::BadRequest(err.to_string()),
            ImportError::StoreUnavailable(_) => ApiError::Internal(err.to_string()),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct IndexResponse {
    message: &'static str,
    version: &'static str,
    endpoints: Vec<&'static str>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCardRequest {
    #[serde(alias = "ipId")]
    pub entrepreneur_ref: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub number_mask: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub extra: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeactivatedItemResponse {
    message: &'static str,
    expense_item: ExpenseItem,
}

#[derive(Deserialize)]
pub struct ImportRequest {
    /// Sheet file name, relative to the configured import directory
    pub path: String,
    #[serde(default)]
    pub period: Option<String>,
}

// ============================================================================
// HANDLERS: service
// ============================================================================

/// GET /api/health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Expense tracker is running",
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// GET /
async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Expense Manager API",
        version: APP_VERSION,
        endpoints: vec![
            "/api/health",
            "/api/auth/login",
            "/api/ips",
            "/api/cards",
            "/api/expense-items",
            "/api/tasks",
            "/api/utils",
            "/api/import",
        ],
    })
}

/// POST /api/auth/login
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Response, ApiError> {
    let user = {
        let conn = state.conn()?;
        db::authenticate(&conn, &req.email, &req.password)?
    };

    let response = match user {
        Some(user) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                user: Some(user),
                message: None,
            }),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                user: None,
                message: Some("Invalid credentials"),
            }),
        ),
    };
    Ok(response.into_response())
}

// ============================================================================
// HANDLERS: entrepreneurs
// ============================================================================

/// GET /api/ips
async fn list_ips(State(state): State<AppState>) -> ApiResult<Vec<Entrepreneur>> {
    let conn = state.conn()?;
    Ok(Json(db::get_all_entrepreneurs(&conn)?))
}

/// GET /api/ips/region/:region
async fn ips_by_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Vec<Entrepreneur>> {
    let conn = state.conn()?;
    Ok(Json(db::get_entrepreneurs_by_region(&conn, &region)?))
}

/// GET /api/ips/:id
async fn get_ip(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Entrepreneur> {
    let conn = state.conn()?;
    db::get_entrepreneur(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Entrepreneur not found".to_string()))
}

// ============================================================================
// HANDLERS: cards
// ============================================================================

/// GET /api/cards
async fn list_cards(State(state): State<AppState>) -> ApiResult<Vec<CardWithOwner>> {
    let conn = state.conn()?;
    Ok(Json(db::get_all_cards(&conn)?))
}

/// GET /api/cards/region/:region
async fn cards_by_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Vec<CardWithOwner>> {
    let conn = state.conn()?;
    Ok(Json(db::get_cards_by_region(&conn, &region)?))
}

/// POST /api/cards
async fn create_card(
    State(state): State<AppState>,
    Json(req): Json<NewCardRequest>,
) -> Result<(StatusCode, Json<Card>), ApiError> {
    let mask = normalize_mask(&req.number_mask)
        .ok_or_else(|| ApiError::BadRequest("numberMask is required".to_string()))?;

    let conn = state.conn()?;
    if db::get_entrepreneur(&conn, &req.entrepreneur_ref)?.is_none() {
        return Err(ApiError::BadRequest("unknown entrepreneurRef".to_string()));
    }

    let mut card = Card::new(&req.entrepreneur_ref, req.card_type, &mask, &req.status);
    card.extra = req.extra.trim().to_string();

    match db::insert_card(&conn, &card)? {
        Upsert::Created(_) => Ok((StatusCode::CREATED, Json(card))),
        Upsert::Existing(_) => Err(ApiError::BadRequest(format!(
            "{} card {} already exists for this entrepreneur",
            card.card_type, card.number_mask
        ))),
    }
}

/// PUT /api/cards/:id/periods/:period
async fn update_card_period(
    State(state): State<AppState>,
    Path((id, period)): Path<(String, String)>,
    Json(status): Json<PeriodStatus>,
) -> ApiResult<Card> {
    if status.is_empty() {
        return Err(ApiError::BadRequest(
            "one of corporate, market, personal is required".to_string(),
        ));
    }

    let conn = state.conn()?;
    if db::get_card(&conn, &id)?.is_none() {
        return Err(ApiError::NotFound("Card not found".to_string()));
    }
    db::merge_card_period(&conn, &id, period.trim(), &status)?;

    db::get_card(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))
}

// ============================================================================
// HANDLERS: expense items
// ============================================================================

/// GET /api/expense-items
async fn list_expense_items(State(state): State<AppState>) -> ApiResult<Vec<ExpenseItem>> {
    let conn = state.conn()?;
    Ok(Json(db::get_active_expense_items(&conn)?))
}

/// GET /api/expense-items/created-by/:user_id
async fn expense_items_by_creator(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<ExpenseItem>> {
    let conn = state.conn()?;
    Ok(Json(db::get_expense_items_by_creator(&conn, &user_id)?))
}

/// POST /api/expense-items
async fn create_expense_item(
    State(state): State<AppState>,
    Json(req): Json<NewExpenseItem>,
) -> Result<(StatusCode, Json<ExpenseItem>), ApiError> {
    let item = req.into_item().map_err(ApiError::BadRequest)?;
    let conn = state.conn()?;
    db::insert_expense_item(&conn, &item)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/expense-items/:id
async fn update_expense_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ExpenseItemUpdate>,
) -> ApiResult<ExpenseItem> {
    let conn = state.conn()?;
    let Some(mut item) = db::get_expense_item(&conn, &id)? else {
        return Err(ApiError::NotFound("Expense item not found".to_string()));
    };
    // Validate before writing so a bad name is a 400, not a 500
    update.apply(&mut item).map_err(ApiError::BadRequest)?;

    db::update_expense_item(&conn, &id, &update)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Expense item not found".to_string()))
}

/// DELETE /api/expense-items/:id
async fn deactivate_expense_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeactivatedItemResponse> {
    let conn = state.conn()?;
    let item = db::deactivate_expense_item(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Expense item not found".to_string()))?;

    Ok(Json(DeactivatedItemResponse {
        message: "Expense item deactivated",
        expense_item: item,
    }))
}

// ============================================================================
// HANDLERS: tasks
// ============================================================================

/// GET /api/tasks
async fn list_tasks(State(state): State<AppState>) -> ApiResult<Vec<ExpenseTask>> {
    let conn = state.conn()?;
    Ok(Json(db::get_all_tasks(&conn)?))
}

/// GET /api/tasks/responsible/:user_id
async fn tasks_by_assignee(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<ExpenseTask>> {
    let conn = state.conn()?;
    Ok(Json(db::get_tasks_by_assignee(&conn, &user_id)?))
}

/// GET /api/tasks/region/:region
async fn tasks_by_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Vec<ExpenseTask>> {
    let conn = state.conn()?;
    Ok(Json(db::get_tasks_by_region(&conn, &region)?))
}

/// POST /api/tasks
async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<NewExpenseTask>,
) -> Result<(StatusCode, Json<ExpenseTask>), ApiError> {
    let task = req
        .into_task()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let conn = state.conn()?;
    db::insert_task(&conn, &task)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /api/tasks/:id
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> ApiResult<ExpenseTask> {
    let conn = state.conn()?;
    db::update_task(&conn, &id, &update)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

// ============================================================================
// HANDLERS: utils
// ============================================================================

/// GET /api/utils/managers/:region
async fn managers_by_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Vec<User>> {
    let conn = state.conn()?;
    Ok(Json(db::get_managers_by_region(&conn, &region)?))
}

/// GET /api/utils/regions
async fn regions(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let conn = state.conn()?;
    Ok(Json(db::get_regions(&conn)?))
}

/// GET /api/utils/cards-by-ip/:ip_id
async fn cards_by_ip(
    State(state): State<AppState>,
    Path(ip_id): Path<String>,
) -> ApiResult<Vec<Card>> {
    let conn = state.conn()?;
    Ok(Json(db::get_cards_for_entrepreneur(&conn, &ip_id)?))
}

/// GET /api/utils/ips-with-cards/:region
async fn ips_with_cards(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Vec<EntrepreneurWithCards>> {
    let conn = state.conn()?;
    Ok(Json(db::get_entrepreneurs_with_cards(&conn, &region)?))
}

// ============================================================================
// HANDLERS: import
// ============================================================================

/// POST /api/import - runs on the blocking pool, rows are written in order
async fn run_import(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> ApiResult<ImportSummary> {
    let source = state
        .config
        .import_source(&req.path)
        .map_err(ApiError::BadRequest)?;
    let period = state.config.period_or_default(req.period.as_deref());

    let db = state.db.clone();
    let summary = tokio::task::spawn_blocking(move || -> Result<ImportSummary, ApiError> {
        let conn = db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))?;
        Ok(ReconcilingImporter::new(&conn, &period).run(&source)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("import task failed: {}", e)))??;

    Ok(Json(summary))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/ips", get(list_ips))
        .route("/ips/region/:region", get(ips_by_region))
        .route("/ips/:id", get(get_ip))
        .route("/cards", get(list_cards).post(create_card))
        .route("/cards/region/:region", get(cards_by_region))
        .route("/cards/:id/periods/:period", put(update_card_period))
        .route("/expense-items", get(list_expense_items).post(create_expense_item))
        .route("/expense-items/created-by/:user_id", get(expense_items_by_creator))
        .route(
            "/expense-items/:id",
            put(update_expense_item).delete(deactivate_expense_item),
        )
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/responsible/:user_id", get(tasks_by_assignee))
        .route("/tasks/region/:region", get(tasks_by_region))
        .route("/tasks/:id", put(update_task))
        .route("/utils/managers/:region", get(managers_by_region))
        .route("/utils/regions", get(regions))
        .route("/utils/cards-by-ip/:ip_id", get(cards_by_ip))
        .route("/utils/ips-with-cards/:region", get(ips_with_cards))
        .route("/import", post(run_import));

    Router::new()
        .route("/", get(index))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================
