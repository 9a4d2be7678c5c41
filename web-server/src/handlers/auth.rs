//! Authentication handlers

use axum::{extract::{rejection::FormRejection, State}, response::Redirect, Form, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::middleware::auth::{issue_session, removal_cookie, session_cookie, UserContext};
use crate::models::{hash_password, CreateUser, LoginForm, RegisterForm, User};
use crate::{AppError, AppResult, AppState};

/// Form description returned by the GET side of `/login` and `/register`
#[derive(Debug, Serialize)]
pub struct FormPage {
    pub page: &'static str,
    pub action: &'static str,
    pub fields: &'static [&'static str],
}

pub async fn login_page() -> Json<FormPage> {
    Json(FormPage {
        page: "login",
        action: "/login",
        fields: &["email", "password"],
    })
}

pub async fn register_page() -> Json<FormPage> {
    Json(FormPage {
        page: "register",
        action: "/register",
        fields: &["username", "email", "password", "confirm"],
    })
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> AppResult<(CookieJar, Redirect)> {
    let Form(form) = form?;
    let user = User::find_by_email(&state.pool, &form.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !user.check_password(&form.password) {
        tracing::info!(user_id = user.id, "Rejected login: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_session(&user, &state.config)?;

    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    Ok((jar.add(session_cookie(token, &state.config)), Redirect::to("/")))
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> AppResult<Redirect> {
    let Form(form) = form?;
    form.validate()
        .map_err(|errors| AppError::ValidationError(first_message(&errors)))?;

    let password_hash = hash_password(&form.password)
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    // The UNIQUE constraints decide duplicates; there is no separate lookup
    let user = User::create(
        &state.pool,
        CreateUser {
            username: form.username,
            email: form.email,
        },
        password_hash,
    )
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::AlreadyExists("Username or email already exists".to_string())
        }
        other => other.into(),
    })?;

    tracing::info!(user_id = user.id, username = %user.username, "New user registered");

    Ok(Redirect::to("/login"))
}

/// Clear the session
pub async fn logout(user: UserContext, jar: CookieJar) -> (CookieJar, Redirect) {
    tracing::info!(user_id = user.user_id, "User logged out");
    (jar.remove(removal_cookie()), Redirect::to("/login"))
}

/// Message for the first failed rule, password confirmation first
fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    let mut entries: Vec<(&str, &Vec<ValidationError>)> = fields
        .iter()
        .map(|(name, errs)| (&**name, *errs))
        .collect();
    entries.sort_by_key(|(name, _)| (*name != "confirm", *name));

    entries
        .first()
        .and_then(|(_, errs)| errs.first())
        .and_then(|err| err.message.as_ref())
        .map(|message| message.to_string())
        .unwrap_or_else(|| "Invalid form submission".to_string())
}
