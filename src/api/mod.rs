mod cli;

use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::core::{
    AccountId, AdjustmentItem, BudgetBook, BudgetPlan, CheckEntry, Derived, EditError,
    NewAccount, PaycheckResult, Snapshot, Tab, compute_paycheck, recompute,
};
use crate::store::{SnapshotStore, persist, restore_or_bootstrap};

pub use cli::{CheckArgs, Cli, Command, build_check};

pub struct AppState {
    book: Mutex<BudgetBook>,
    store: Box<dyn SnapshotStore>,
}

impl AppState {
    pub fn load(store: Box<dyn SnapshotStore>) -> Self {
        let book = BudgetBook::from_snapshot(restore_or_bootstrap(store.as_ref()));
        Self {
            book: Mutex::new(book),
            store,
        }
    }

    fn book(&self) -> MutexGuard<'_, BudgetBook> {
        self.book
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_through(&self, book: &BudgetBook) {
        if let Err(err) = persist(self.store.as_ref(), book.snapshot()) {
            error!(error = %err, "failed to persist snapshot");
        }
    }
}

type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse {
    snapshot: Snapshot,
    derived: Derived,
}

impl StateResponse {
    fn of(book: &BudgetBook) -> Self {
        Self {
            snapshot: book.snapshot().clone(),
            derived: book.derived(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResetRequest {
    confirm: bool,
}

#[derive(Debug, Serialize)]
struct ResetResponse {
    reset: bool,
    #[serde(flatten)]
    state: StateResponse,
}

#[derive(Debug, Deserialize)]
struct TabRequest {
    tab: Tab,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/state", get(get_state_handler).put(put_state_handler))
        .route("/api/recompute", post(recompute_handler))
        .route(
            "/api/paycheck",
            get(paycheck_get_handler).post(paycheck_post_handler),
        )
        .route("/api/checks", post(add_check_handler))
        .route(
            "/api/checks/:index",
            put(update_check_handler).delete(remove_check_handler),
        )
        .route("/api/checks/:index/duplicate", post(duplicate_check_handler))
        .route("/api/accounts", post(add_account_handler))
        .route(
            "/api/accounts/:id",
            put(update_account_handler).delete(remove_account_handler),
        )
        .route("/api/items", post(add_item_handler))
        .route(
            "/api/items/:index",
            put(update_item_handler).delete(remove_item_handler),
        )
        .route("/api/budget", put(update_budget_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/theme/toggle", post(toggle_theme_handler))
        .route("/api/tab", put(set_tab_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, store: Box<dyn SnapshotStore>) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(Arc::new(AppState::load(store)));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "budget HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/state");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn get_state_handler(State(state): State<SharedState>) -> Response {
    let book = state.book();
    json_response(StatusCode::OK, StateResponse::of(&book))
}

async fn put_state_handler(
    State(state): State<SharedState>,
    Json(snapshot): Json<Snapshot>,
) -> Response {
    let mut book = state.book();
    *book = BudgetBook::from_snapshot(snapshot);
    state.write_through(&book);
    info!("snapshot replaced");
    json_response(StatusCode::OK, StateResponse::of(&book))
}

async fn recompute_handler(Json(snapshot): Json<Snapshot>) -> Response {
    json_response(StatusCode::OK, recompute(&snapshot))
}

async fn paycheck_get_handler(Query(entry): Query<CheckEntry>) -> Response {
    paycheck_response(&entry)
}

async fn paycheck_post_handler(Json(entry): Json<CheckEntry>) -> Response {
    paycheck_response(&entry)
}

fn paycheck_response(entry: &CheckEntry) -> Response {
    let result: PaycheckResult = compute_paycheck(&entry.to_input());
    json_response(StatusCode::OK, result)
}

fn edit<T>(
    state: &AppState,
    action: &str,
    apply: impl FnOnce(&mut BudgetBook) -> Result<T, EditError>,
) -> Response {
    let mut book = state.book();
    match apply(&mut book) {
        Ok(_) => {
            state.write_through(&book);
            info!(action, "budget updated");
            json_response(StatusCode::OK, StateResponse::of(&book))
        }
        Err(err) => {
            info!(action, error = %err, "edit rejected");
            edit_error_response(&err)
        }
    }
}

async fn add_check_handler(
    State(state): State<SharedState>,
    entry: Option<Json<CheckEntry>>,
) -> Response {
    let entry = entry.map(|Json(entry)| entry).unwrap_or_default();
    edit(&state, "add check", |book| Ok(book.add_check(entry)))
}

async fn update_check_handler(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
    Json(entry): Json<CheckEntry>,
) -> Response {
    edit(&state, "update check", |book| {
        *book.check_mut(index)? = entry;
        Ok(())
    })
}

async fn duplicate_check_handler(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Response {
    edit(&state, "duplicate check", |book| book.duplicate_check(index))
}

async fn remove_check_handler(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Response {
    edit(&state, "remove check", |book| book.remove_check(index))
}

async fn add_account_handler(
    State(state): State<SharedState>,
    new_account: Option<Json<NewAccount>>,
) -> Response {
    let new_account = new_account.map(|Json(body)| body).unwrap_or_default();
    edit(&state, "add account", |book| Ok(book.add_account(new_account)))
}

async fn update_account_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(update): Json<NewAccount>,
) -> Response {
    let id = AccountId::from(id.as_str());
    edit(&state, "update account", |book| {
        let account = book.account_mut(&id)?;
        account.custom_name = update.custom_name;
        account.amount = update.amount;
        account.set_type(update.account_type);
        Ok(())
    })
}

async fn remove_account_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    let id = AccountId::from(id.as_str());
    edit(&state, "remove account", |book| book.remove_account(&id))
}

async fn add_item_handler(
    State(state): State<SharedState>,
    item: Option<Json<AdjustmentItem>>,
) -> Response {
    let item = item.map(|Json(item)| item).unwrap_or_default();
    edit(&state, "add item", |book| Ok(book.add_item(item)))
}

async fn update_item_handler(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
    Json(item): Json<AdjustmentItem>,
) -> Response {
    edit(&state, "update item", |book| {
        *book.item_mut(index)? = item;
        Ok(())
    })
}

async fn remove_item_handler(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Response {
    edit(&state, "remove item", |book| book.remove_item(index))
}

async fn update_budget_handler(
    State(state): State<SharedState>,
    Json(budget): Json<BudgetPlan>,
) -> Response {
    edit(&state, "update budget", |book| book.set_budget(budget))
}

async fn reset_handler(
    State(state): State<SharedState>,
    request: Option<Json<ResetRequest>>,
) -> Response {
    let confirm = request.map(|Json(body)| body.confirm).unwrap_or(false);
    let mut book = state.book();
    let reset = book.reset(confirm);
    if reset {
        state.write_through(&book);
        info!("budget reset to defaults");
    }
    json_response(
        StatusCode::OK,
        ResetResponse {
            reset,
            state: StateResponse::of(&book),
        },
    )
}

async fn toggle_theme_handler(State(state): State<SharedState>) -> Response {
    edit(&state, "toggle theme", |book| Ok(book.toggle_theme()))
}

async fn set_tab_handler(
    State(state): State<SharedState>,
    Json(request): Json<TabRequest>,
) -> Response {
    edit(&state, "set tab", |book| {
        book.set_active_tab(request.tab);
        Ok(())
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
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

fn edit_error_response(err: &EditError) -> Response {
    let status = match err {
        EditError::LastCheck => StatusCode::CONFLICT,
        EditError::UnknownAccount(_) => StatusCode::NOT_FOUND,
        EditError::CheckOutOfRange { .. } | EditError::ItemOutOfRange { .. } => {
            StatusCode::NOT_FOUND
        }
    };
    error_response(status, &err.to_string())
}
