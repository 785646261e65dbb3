//! User accounts and the HTTP surface for registration, lookup, search,
//! update, and deletion.
//!
//! Accounts authenticate every mutating endpoint in the API, so the rules
//! here are strict: registration is anonymous-only, and an account may be
//! modified or deleted only by itself.

use std::sync::OnceLock;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{AnonymousOnly, CurrentAccount, OptionalAuth};
use crate::search::Page;
use crate::{ensure_positive_id, AppError};

/////////////////////////////////////////////// Account /////////////////////////////////////////////

/// A registered user. The password is stored and compared as-is; it never
/// appears in a response body.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Account {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Validated parameters for a new or updated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

//////////////////////////////////////////////// Wire ///////////////////////////////////////////////

/// Request body shared by registration and account update. Every field is
/// required.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("pattern is valid"))
}

fn required_text(value: Option<&str>, field: &str) -> Result<String, AppError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(AppError::invalid_input(format!(
            "{} must not be blank",
            field
        ))),
    }
}

impl AccountRequest {
    pub fn validate(&self) -> Result<NewAccount, AppError> {
        let first_name = required_text(self.first_name.as_deref(), "firstName")?;
        let last_name = required_text(self.last_name.as_deref(), "lastName")?;
        let email = required_text(self.email.as_deref(), "email")?;
        if !email_regex().is_match(&email) {
            return Err(AppError::invalid_input("email must be a valid address"));
        }
        let password = required_text(self.password.as_deref(), "password")?;
        Ok(NewAccount {
            first_name,
            last_name,
            email,
            password,
        })
    }
}

/// Account as it appears on the wire. No password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        AccountResponse {
            id: account.id,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
        }
    }
}

//////////////////////////////////////////////// Search /////////////////////////////////////////////

/// Raw account-search query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSearchQuery {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

/// Normalized account-search filter. Matching is case-insensitive substring
/// containment per field.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl AccountSearchQuery {
    pub fn normalize(&self) -> Result<(AccountFilter, Page), AppError> {
        let filter = AccountFilter {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        };
        let page = Page::new(self.from, self.size)?;
        Ok((filter, page))
    }
}

/////////////////////////////////////////////// Routes //////////////////////////////////////////////

/// Registers a new account. Refuses callers that present any credentials.
async fn register(
    State(pool): State<PgPool>,
    _: AnonymousOnly,
    Json(body): Json<AccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let params = body.validate()?;
    let account = crate::sql::account::insert(&pool, &params).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

async fn get_account(
    State(pool): State<PgPool>,
    OptionalAuth(_): OptionalAuth,
    Path(account_id): Path<i32>,
) -> Result<Json<AccountResponse>, AppError> {
    ensure_positive_id(account_id, "accountId")?;
    match crate::sql::account::get(&pool, account_id).await? {
        Some(account) => Ok(Json(AccountResponse::from(&account))),
        None => Err(AppError::not_found("account not found by id")),
    }
}

async fn search_accounts(
    State(pool): State<PgPool>,
    OptionalAuth(_): OptionalAuth,
    Query(query): Query<AccountSearchQuery>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let (filter, page) = query.normalize()?;
    let accounts = crate::sql::account::search(&pool, &filter, page).await?;
    Ok(Json(accounts.iter().map(AccountResponse::from).collect()))
}

/// Updates the caller's own account. Targeting any other id, including ids
/// that do not exist, is refused without revealing whether they exist.
async fn update_account(
    State(pool): State<PgPool>,
    CurrentAccount(executor): CurrentAccount,
    Path(account_id): Path<i32>,
    Json(body): Json<AccountRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    ensure_positive_id(account_id, "accountId")?;
    let params = body.validate()?;
    if executor.id != account_id {
        return Err(AppError::forbidden("cannot modify another account"));
    }
    let account = Account {
        id: account_id,
        first_name: params.first_name,
        last_name: params.last_name,
        email: params.email,
        password: params.password,
    };
    if !crate::sql::account::update(&pool, &account).await? {
        return Err(AppError::forbidden("cannot modify another account"));
    }
    Ok(Json(AccountResponse::from(&account)))
}

/// Deletes the caller's own account, unless animals still reference it as
/// their chipper.
async fn delete_account(
    State(pool): State<PgPool>,
    CurrentAccount(executor): CurrentAccount,
    Path(account_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    ensure_positive_id(account_id, "accountId")?;
    if executor.id != account_id {
        return Err(AppError::forbidden("cannot delete another account"));
    }
    if crate::sql::account::is_chipper(&pool, account_id).await? {
        return Err(AppError::invalid_input("account is linked to animals"));
    }
    if !crate::sql::account::delete(&pool, account_id).await? {
        return Err(AppError::forbidden("cannot delete another account"));
    }
    Ok(StatusCode::OK)
}

/// Creates a router with account endpoints.
///
/// # Arguments
/// * `pool` - PostgreSQL connection pool
pub fn create_account_router(pool: PgPool) -> Router {
    Router::new()
        .route("/registration", post(register))
        .route("/accounts/search", get(search_accounts))
        .route(
            "/accounts/:account_id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .with_state(pool)
}
