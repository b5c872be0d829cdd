use actix_web::{web, HttpResponse};
use validator::Validate;

use super::{ApiError, AppState, CurrentUser};
use crate::auth::{hash_password, normalize_email, verify_password, AuthError};
use crate::models::{Account, AccountView, AuthResponse, MeResponse, SignInRequest, SignUpRequest, UserRecord};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/auth/signup", web::post().to(sign_up))
        .route("/auth/signin", web::post().to(sign_in))
        .route("/auth/signout", web::post().to(sign_out))
        .route("/auth/me", web::get().to(me));
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            user_id: account.user_id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
        }
    }
}

/// Open a session watching the user's chats and issue its token
///
/// The session lapses together with the token, so an abandoned sign-in is
/// released by the registry's sweep rather than living on.
async fn start_session(state: &AppState, account: &Account) -> Result<AuthResponse, ApiError> {
    let chat_ids = state.postgres.chats_for_user(&account.user_id).await?;
    let expires_at = state.tokens.expires_at();
    let session = state
        .sessions
        .open(&account.user_id, &account.email, &chat_ids, expires_at)
        .await;

    match state
        .tokens
        .issue(&account.user_id, &account.email, &session.session_id, expires_at)
    {
        Ok(token) => Ok(AuthResponse {
            token,
            expires_at,
            user: AccountView::from(account),
        }),
        Err(e) => {
            state.sessions.close(&session.session_id).await;
            Err(e.into())
        }
    }
}

/// Store the account row and the user record together
///
/// The account row is removed again when the user record cannot be created,
/// so a failed sign-up leaves the email free for a retry.
async fn register(state: &AppState, account: &Account, record: &UserRecord) -> Result<(), ApiError> {
    state.postgres.create_account(account).await?;

    if let Err(e) = state.store.create_user(record).await {
        tracing::warn!("Sign-up for {} failed in the user store: {}", account.user_id, e);
        if let Err(cleanup) = state.postgres.delete_account(&account.user_id).await {
            tracing::error!("Failed to remove account {} after sign-up failure: {}", account.user_id, cleanup);
        }
        return Err(e.into());
    }

    Ok(())
}

/// Create an account and sign in
///
/// POST /api/v1/auth/signup
async fn sign_up(
    state: web::Data<AppState>,
    req: web::Json<SignUpRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let req = req.into_inner();

    let password = req.password;
    let password_hash = web::block(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let account = Account {
        user_id: uuid::Uuid::new_v4().to_string(),
        email: normalize_email(&req.email),
        name: req.name.trim().to_string(),
        password_hash,
        created_at: chrono::Utc::now(),
    };
    let mut record = UserRecord::new(&account.user_id, &account.name, &account.email);
    record.gender = req.gender;
    record.university = req.university;
    register(&state, &account, &record).await?;

    tracing::info!("Signed up user {}", account.user_id);

    let response = start_session(&state, &account).await?;
    Ok(HttpResponse::Created().json(response))
}

/// POST /api/v1/auth/signin
async fn sign_in(
    state: web::Data<AppState>,
    req: web::Json<SignInRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let req = req.into_inner();

    let account = state
        .postgres
        .find_account_by_email(&normalize_email(&req.email))
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let password = req.password;
    let hash = account.password_hash.clone();
    let valid = web::block(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !valid {
        return Err(AuthError::InvalidCredentials.into());
    }

    tracing::info!("Signed in user {}", account.user_id);

    let response = start_session(&state, &account).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/auth/signout
async fn sign_out(state: web::Data<AppState>, user: CurrentUser) -> HttpResponse {
    state.sessions.close(&user.session.session_id).await;
    tracing::info!("Signed out user {}", user.user_id);

    HttpResponse::NoContent().finish()
}

/// GET /api/v1/auth/me
async fn me(state: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, ApiError> {
    let account = state
        .postgres
        .get_account(&user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Account {}", user.user_id)))?;

    let profile = state.store.get_user(&user.user_id).await?;

    Ok(HttpResponse::Ok().json(MeResponse {
        account: AccountView::from(&account),
        profile,
    }))
}
