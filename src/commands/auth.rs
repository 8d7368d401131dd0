use crate::api::ApiError;
use crate::models::User;
use crate::validation::{self, FieldError};
use crate::App;
use serde::Serialize;
use tracing::{info, warn};

pub const ROOT_ROUTE: &str = "/";

pub const LOCKED_MESSAGE: &str =
    "Account is temporarily locked due to too many failed attempts. Please wait 15 minutes before trying again.";
pub const UNVERIFIED_MESSAGE: &str = "Please verify your email address before logging in.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub user: User,
    pub redirect_to: String,
}

/// User-facing copy for any API failure outside the login form.
pub fn user_message(err: &ApiError) -> String {
    match err {
        ApiError::Api { message, .. } => message.clone(),
        ApiError::Unauthenticated => SESSION_EXPIRED_MESSAGE.to_string(),
        _ => GENERIC_ERROR_MESSAGE.to_string(),
    }
}

/// Copy for a failed login: known cases get fixed wording, other server errors pass through.
pub fn login_error_message(err: &ApiError) -> String {
    let ApiError::Api { status, message } = err else {
        return GENERIC_ERROR_MESSAGE.to_string();
    };
    let lower = message.to_lowercase();
    match status {
        423 => LOCKED_MESSAGE.to_string(),
        403 => UNVERIFIED_MESSAGE.to_string(),
        _ if lower.contains("not verified") || lower.contains("verify your email") => {
            UNVERIFIED_MESSAGE.to_string()
        }
        401 => INVALID_CREDENTIALS_MESSAGE.to_string(),
        _ => message.clone(),
    }
}

fn reject(errors: Vec<FieldError>) -> Result<(), String> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(validation::summarize(&errors))
    }
}

/// Signs in, persists the session and arms the refresh loop.
pub async fn login(app: &App, email: &str, password: &str) -> Result<LoginOutcome, String> {
    reject(validation::validate_login(email, password))?;

    let grant = app
        .client
        .login(email.trim(), password)
        .await
        .map_err(|e| {
            warn!(error = %e, "Login failed");
            login_error_message(&e)
        })?;

    app.store
        .set_session(&grant.tokens, &grant.user, grant.workspace_id.as_deref())
        .map_err(|e| {
            warn!(error = %e, "Could not persist session");
            GENERIC_ERROR_MESSAGE.to_string()
        })?;
    app.refresher.start();
    info!(user_id = %grant.user.id, "Signed in");

    Ok(LoginOutcome {
        user: grant.user,
        redirect_to: ROOT_ROUTE.to_string(),
    })
}

pub async fn register(
    app: &App,
    name: &str,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<String, String> {
    reject(validation::validate_registration(name, email, password, confirm))?;
    let message = app
        .client
        .register(name.trim(), email.trim(), password)
        .await
        .map_err(|e| user_message(&e))?;
    Ok(non_empty_or(
        message,
        "Registration successful. Please check your email to verify your account.",
    ))
}

pub async fn request_password_reset(app: &App, email: &str) -> Result<String, String> {
    reject(validation::check_email(email).into_iter().collect())?;
    let message = app
        .client
        .request_password_reset(email.trim())
        .await
        .map_err(|e| user_message(&e))?;
    Ok(non_empty_or(
        message,
        "If an account exists for that email, a reset link has been sent.",
    ))
}

pub async fn reset_password(
    app: &App,
    token: &str,
    password: &str,
    confirm: &str,
) -> Result<String, String> {
    reject(validation::validate_password_reset(token, password, confirm))?;
    let message = app
        .client
        .reset_password(token.trim(), password)
        .await
        .map_err(|e| user_message(&e))?;
    Ok(non_empty_or(
        message,
        "Your password has been reset. You can now log in.",
    ))
}

pub async fn resend_verification(app: &App, email: &str) -> Result<String, String> {
    reject(validation::check_email(email).into_iter().collect())?;
    let message = app
        .client
        .resend_verification(email.trim())
        .await
        .map_err(|e| user_message(&e))?;
    Ok(non_empty_or(message, "Verification email sent."))
}

pub async fn verify_email(app: &App, token: &str) -> Result<String, String> {
    if token.trim().is_empty() {
        return Err("This verification link is invalid or incomplete.".to_string());
    }
    let message = app
        .client
        .verify_email(token.trim())
        .await
        .map_err(|e| user_message(&e))?;
    Ok(non_empty_or(message, "Your email has been verified. You can now log in."))
}

pub fn google_sign_in_url(app: &App) -> Result<String, String> {
    app.client
        .google_auth_url()
        .map(|u| u.to_string())
        .map_err(|e| user_message(&e))
}

/// Stops the refresh loop and clears every session entry.
pub fn logout(app: &App) -> Result<(), String> {
    app.refresher.stop();
    app.store.clear_session().map_err(|e| e.to_string())?;
    info!("Signed out");
    Ok(())
}

pub fn current_user(app: &App) -> Result<Option<User>, String> {
    app.store.get_user().map_err(|e| e.to_string())
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
