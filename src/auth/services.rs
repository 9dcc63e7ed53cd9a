use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest},
    extractors::Caller,
    jwt::{JwtKeys, TokenPair},
    password::{dummy_hash, hash_password, password_problems, verify_password},
    repo::UserStore,
    repo_types::{NewUser, User},
};
use crate::{
    config::AdminBootstrap,
    error::{AppError, AppResult, FieldErrors, StoreError, REQUIRED},
};

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "A user with that email already exists.";
const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, \
                                numbers, and @/./+/-/_ characters.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const NOT_A_STRING: &str = "Not a valid string.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.chars().count() <= EMAIL_MAX_LENGTH && EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    }
    username.chars().count() <= USERNAME_MAX_LENGTH && USERNAME_RE.is_match(username)
}

/// Text of a raw field: strings as-is, numbers in their JSON form.
/// `Err` for booleans, arrays and objects.
fn text(value: Option<Value>) -> Result<Option<String>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(()),
    }
}

/// Trimmed value, or a field error when absent, blank or not text.
fn required(errors: &mut FieldErrors, field: &str, value: Option<Value>) -> Option<String> {
    match text(value) {
        Ok(Some(v)) if !v.trim().is_empty() => Some(v.trim().to_string()),
        Ok(_) => {
            errors.add(field, REQUIRED);
            None
        }
        Err(()) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

/// Passwords are taken verbatim, only emptiness counts as missing.
fn required_secret(errors: &mut FieldErrors, field: &str, value: Option<Value>) -> Option<String> {
    match text(value) {
        Ok(Some(v)) if !v.is_empty() => Some(v),
        Ok(_) => {
            errors.add(field, REQUIRED);
            None
        }
        Err(()) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

/// Validates and creates an account. All field problems are collected
/// before anything is written.
pub async fn register(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> AppResult<(User, TokenPair)> {
    let mut errors = FieldErrors::new();

    let username = required(&mut errors, "username", req.username);
    let email = required(&mut errors, "email", req.email).map(|e| e.to_lowercase());
    let password = required_secret(&mut errors, "password", req.password);
    let password_confirm = required_secret(&mut errors, "password_confirm", req.password_confirm);

    if let Some(username) = username.as_deref() {
        if !is_valid_username(username) {
            errors.add("username", INVALID_USERNAME);
        } else if users.find_by_username(username).await?.is_some() {
            errors.add("username", USERNAME_TAKEN);
        }
    }

    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            errors.add("email", INVALID_EMAIL);
        } else if users.find_by_email(email).await?.is_some() {
            errors.add("email", EMAIL_TAKEN);
        }
    }

    if let (Some(password), Some(confirm)) = (password.as_deref(), password_confirm.as_deref()) {
        if password != confirm {
            errors.add("password_confirm", PASSWORDS_DO_NOT_MATCH);
        }
    }

    if let Some(password) = password.as_deref() {
        // Only well-formed attributes are compared; their lengths are bounded.
        let problems = password_problems(
            password,
            username.as_deref().filter(|u| is_valid_username(u)).unwrap_or_default(),
            email.as_deref().filter(|e| is_valid_email(e)).unwrap_or_default(),
        );
        for problem in problems {
            errors.add("password", problem);
        }
    }

    if !errors.is_empty() {
        warn!(fields = ?errors, "registration rejected");
        return Err(AppError::Validation(errors));
    }

    let (Some(username), Some(email), Some(password)) = (username, email, password) else {
        return Err(AppError::Internal(anyhow::anyhow!(
            "validated registration lost a field"
        )));
    };

    let user = create_user(users, username, email, &password, false).await?;
    let tokens = keys.issue_pair(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((user, tokens))
}

async fn create_user(
    users: &dyn UserStore,
    username: String,
    email: String,
    password: &str,
    is_staff: bool,
) -> AppResult<User> {
    let password_hash = hash_password(password)?;
    let new_user = NewUser {
        username,
        email,
        password_hash,
        is_staff,
    };
    // A concurrent registration can still win the race past the pre-checks
    match users.create(new_user).await {
        Ok(user) => Ok(user),
        Err(StoreError::Conflict(field)) => {
            let mut errors = FieldErrors::new();
            errors.add(field, if field == "email" { EMAIL_TAKEN } else { USERNAME_TAKEN });
            Err(AppError::Validation(errors))
        }
        Err(StoreError::Other(e)) => Err(AppError::Internal(e)),
    }
}

/// Verifies credentials. Unknown usernames and wrong passwords produce
/// the same error.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> AppResult<(User, TokenPair)> {
    let mut errors = FieldErrors::new();
    let username = required(&mut errors, "username", req.username);
    let password = required_secret(&mut errors, "password", req.password);
    errors.into_result()?;

    let (Some(username), Some(password)) = (username, password) else {
        return Err(AppError::InvalidCredentials);
    };

    let Some(user) = users.find_by_username(&username).await? else {
        // Same argon2 cost as a wrong password
        verify_password(&password, dummy_hash()?)?;
        warn!(username = %username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let tokens = keys.issue_pair(user.id)?;
    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((user, tokens))
}

/// Exchanges a refresh token for a new pair.
pub async fn refresh(users: &dyn UserStore, keys: &JwtKeys, token: &str) -> AppResult<TokenPair> {
    let claims = keys.verify_refresh(token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        AppError::InvalidToken
    })?;

    if users.find_by_id(claims.sub).await?.is_none() {
        warn!(user_id = %claims.sub, "refresh for unknown user");
        return Err(AppError::InvalidToken);
    }

    Ok(keys.issue_pair(claims.sub)?)
}

pub async fn me(users: &dyn UserStore, caller: &Caller) -> AppResult<User> {
    let id = caller.require_authenticated()?;
    users.find_by_id(id).await?.ok_or(AppError::InvalidToken)
}

/// Creates the configured staff account unless the username is already taken.
pub async fn ensure_admin(users: &dyn UserStore, admin: &AdminBootstrap) -> AppResult<()> {
    let username = admin.username.trim();
    if users.find_by_username(username).await?.is_some() {
        info!(username = %username, "admin account already present");
        return Ok(());
    }
    let user = create_user(
        users,
        username.to_string(),
        admin.email.trim().to_lowercase(),
        &admin.password,
        true,
    )
    .await?;
    info!(user_id = %user.id, username = %user.username, "admin account created");
    Ok(())
}
