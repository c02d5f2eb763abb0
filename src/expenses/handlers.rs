use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderName, StatusCode},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ExpenseQuery, ExpenseRequest, ExpenseResponse, PatchExpenseRequest},
    repo_types::{Expense, ExpenseChanges, ExpenseFilter},
    services::{validate_new, validate_patch, validate_replace},
    summary::{expense_summary, ExpenseSummary},
};
use crate::{
    auth::{extractors::CurrentUser, repo::is_foreign_key_violation},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses/", get(list_expenses).post(create_expense))
        .route("/expenses/summary/", get(get_summary))
        .route(
            "/expenses/:id/",
            get(get_expense)
                .put(replace_expense)
                .patch(update_expense)
                .delete(delete_expense),
        )
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_expenses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<ExpenseQuery>, QueryRejection>,
) -> AppResult<Json<Vec<ExpenseResponse>>> {
    let Query(query) = query?;
    let filter = ExpenseFilter::from(query);
    let rows = Expense::list(&state.db, user.id, &filter).await?;
    debug!(user_id = %user.id, count = rows.len(), "expenses listed");
    Ok(Json(rows.into_iter().map(ExpenseResponse::from).collect()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<ExpenseResponse>> {
    let id = expense_id(id)?;
    let expense = Expense::find(&state.db, user.id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(expense.into()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ExpenseRequest>, JsonRejection>,
) -> AppResult<(StatusCode, [(HeaderName, String); 1], Json<ExpenseResponse>)> {
    let Json(payload) = payload?;
    let today = OffsetDateTime::now_utc().date();
    let new = validate_new(payload, today)?;

    let expense = match Expense::create(&state.db, user.id, &new).await {
        Ok(e) => e,
        Err(e) if is_foreign_key_violation(&e) => {
            warn!(user_id = %user.id, "user deleted while creating expense");
            return Err(AppError::unauthorized("User not found"));
        }
        Err(e) => return Err(e.into()),
    };
    info!(user_id = %user.id, expense_id = %expense.id, "expense created");

    let location = format!("/expenses/{}/", expense.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(expense.into()),
    ))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn replace_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ExpenseRequest>, JsonRejection>,
) -> AppResult<Json<ExpenseResponse>> {
    let id = expense_id(id)?;
    let Json(payload) = payload?;
    let changes = validate_replace(payload)?;
    apply_changes(&state, user.id, id, changes).await
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PatchExpenseRequest>, JsonRejection>,
) -> AppResult<Json<ExpenseResponse>> {
    let id = expense_id(id)?;
    let Json(payload) = payload?;
    let changes = validate_patch(payload)?;
    apply_changes(&state, user.id, id, changes).await
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    let id = expense_id(id)?;
    if !Expense::delete(&state.db, user.id, id).await? {
        return Err(AppError::NotFound);
    }
    info!(user_id = %user.id, expense_id = %id, "expense deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ExpenseSummary>> {
    let rows = Expense::list(&state.db, user.id, &ExpenseFilter::default()).await?;
    let summary = expense_summary(user.id, &user.email, &rows);
    debug!(user_id = %user.id, months = summary.summary.len(), "summary built");
    Ok(Json(summary))
}

async fn apply_changes(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    changes: ExpenseChanges,
) -> AppResult<Json<ExpenseResponse>> {
    let expense = Expense::update(&state.db, user_id, id, &changes)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(%user_id, expense_id = %id, "expense updated");
    Ok(Json(expense.into()))
}

/// Ids that do not parse cannot belong to the caller either.
fn expense_id(id: Result<Path<Uuid>, PathRejection>) -> AppResult<Uuid> {
    id.map(|Path(id)| id).map_err(|e| {
        warn!(error = %e, "bad expense id");
        AppError::NotFound
    })
}
