use super::Deleted;
use crate::application::auth::AuthOutcome;
use crate::domain::user::{PublicUser, Role};
use crate::interfaces::http::extract::{AuthUser, Owner};
use crate::interfaces::http::response::{ApiJson, ApiResponse, ApiResult};
use crate::interfaces::http::state::AppState;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetBody {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    users: Vec<PublicUser>,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<AuthOutcome> {
    let outcome = state
        .auth
        .register(&body.name, &body.email, &body.password)
        .await?;
    Ok(ApiResponse::created(outcome))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<AuthOutcome> {
    Ok(ApiResponse::ok(
        state.auth.login(&body.email, &body.password).await?,
    ))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EmailBody>,
) -> ApiResult<()> {
    state.auth.forgot_password(&body.email).await?;
    Ok(ApiResponse::empty()
        .message("If an account with that email exists, a password reset link has been sent."))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetBody>,
) -> ApiResult<()> {
    state.auth.reset_password(&body.token, &body.password).await?;
    Ok(ApiResponse::empty().message("Password has been reset successfully"))
}

pub async fn me(AuthUser(user): AuthUser) -> ApiResult<PublicUser> {
    Ok(ApiResponse::ok(PublicUser::from(&user)))
}

pub async fn list_users(_: Owner, State(state): State<AppState>) -> ApiResult<UserList> {
    Ok(ApiResponse::ok(UserList {
        users: state.auth.list_users().await?,
    }))
}

pub async fn create_user(
    _: Owner,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<PublicUser> {
    let user = state
        .auth
        .create_staff_user(&body.name, &body.email, &body.password)
        .await?;
    Ok(ApiResponse::created(user))
}

pub async fn update_role(
    _: Owner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    ApiJson(body): ApiJson<RoleBody>,
) -> ApiResult<PublicUser> {
    Ok(ApiResponse::ok(state.auth.update_role(id, body.role).await?))
}

pub async fn delete_user(
    _: Owner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Deleted> {
    state.auth.delete_user(id).await?;
    Ok(ApiResponse::ok(Deleted::YES))
}
