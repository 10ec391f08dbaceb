use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use shame_db::models::UserRow;
use shame_db::queries::users;
use shame_engine::{feed::display_time, schedule};
use shame_types::api::{
    AuthResponse, Claims, LoginRequest, RegisterRequest, SearchQuery, UpdateProfileRequest,
};
use shame_types::models::{Profile, PublicUser};

use crate::{AppState, convert, error::ApiError, run_blocking, wakeup};

pub const DEFAULT_SLEEP_GOAL: &str = "7:00 AM";
pub const DEFAULT_BEDTIME_GOAL: &str = "11:00 PM";
const TOKEN_LIFETIME_DAYS: i64 = 30;
const MAX_SEARCH_RESULTS: u32 = 20;

// -- Validation --

fn validate_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim();
    if !(3..=254).contains(&email.len()) || !email.contains('@') {
        return Err(ApiError::validation("a valid email address is required"));
    }
    Ok(email.to_lowercase())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 8 {
        return Err(ApiError::validation("password must be at least 8 characters"));
    }
    Ok(())
}

fn validate_display_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if !(1..=32).contains(&name.chars().count()) {
        return Err(ApiError::validation("display name must be 1 to 32 characters"));
    }
    Ok(name.to_string())
}

/// Parses a goal and stores it in one canonical spelling ("7:00 AM").
fn normalize_goal(goal: &str) -> Result<String, ApiError> {
    Ok(display_time(schedule::parse_time_of_day(goal)?))
}

fn validate_offset(minutes: i32) -> Result<i32, ApiError> {
    schedule::user_offset(minutes)?;
    Ok(minutes)
}

// -- Tokens and passwords --

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    session_id: Uuid,
    display_name: &str,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        sid: session_id,
        display_name: display_name.to_string(),
        exp: (Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("bad stored password hash: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Unauthorized)
}

fn auth_response(secret: &str, user: &UserRow, session_id: Uuid) -> Result<AuthResponse, ApiError> {
    let profile = convert::profile(user)?;
    let token = create_token(secret, profile.id, session_id, &profile.display_name)?;
    Ok(AuthResponse {
        user_id: profile.id,
        token,
        profile,
    })
}

// -- Handlers --

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = validate_email(&req.email)?;
    validate_password(&req.password)?;
    let display_name = validate_display_name(&req.display_name)?;
    let sleep_goal = normalize_goal(req.sleep_goal.as_deref().unwrap_or(DEFAULT_SLEEP_GOAL))?;
    let bedtime_goal = normalize_goal(req.bedtime_goal.as_deref().unwrap_or(DEFAULT_BEDTIME_GOAL))?;
    let utc_offset_minutes = validate_offset(req.utc_offset_minutes.unwrap_or(0))?;

    let response = run_blocking(&state, move |s| {
        // Hash password with Argon2id
        let password = hash_password(&req.password)?;
        let now = convert::timestamp(Utc::now());
        let session_id = Uuid::new_v4();
        let user = UserRow {
            id: Uuid::new_v4().to_string(),
            email,
            password,
            display_name,
            sleep_goal,
            bedtime_goal,
            utc_offset_minutes,
            push_token: None,
            total_score: 0,
            current_streak: 0,
            longest_streak: 0,
            created_at: now.clone(),
        };

        s.db.transaction(|tx| {
            if users::user_by_email(tx, &user.email)?.is_some() {
                return Err(ApiError::conflict("email is already registered"));
            }
            users::insert_user(tx, &user)?;
            users::insert_session(tx, &session_id.to_string(), &user.id, &now)?;
            Ok(())
        })?;

        info!("Registered {} ({})", user.display_name, user.id);
        auth_response(&s.jwt_secret, &user, session_id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = run_blocking(&state, move |s| {
        let user = s
            .db
            .get_user_by_email(req.email.trim())?
            .ok_or(ApiError::Unauthorized)?;

        verify_password(&req.password, &user.password)?;

        let session_id = Uuid::new_v4();
        let now = Utc::now();
        let user = s.db.with_conn(|conn| {
            users::insert_session(conn, &session_id.to_string(), &user.id, &convert::timestamp(now))?;
            wakeup::with_current_streak(conn, user, now)
        })?;

        auth_response(&s.jwt_secret, &user, session_id)
    })
    .await?;

    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let sid = claims.sid.to_string();
    run_blocking(&state, move |s| {
        let now = convert::timestamp(Utc::now());
        s.db.with_conn(|conn| users::revoke_session(conn, &sid, &now))?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Profile>, ApiError> {
    let uid = claims.sub.to_string();
    let profile = run_blocking(&state, move |s| {
        let user = s
            .db
            .get_user_by_id(&uid)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        let user = s.db.with_conn(|conn| wakeup::with_current_streak(conn, user, Utc::now()))?;
        Ok(convert::profile(&user)?)
    })
    .await?;

    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let display_name = req.display_name.as_deref().map(validate_display_name).transpose()?;
    let sleep_goal = req.sleep_goal.as_deref().map(normalize_goal).transpose()?;
    let bedtime_goal = req.bedtime_goal.as_deref().map(normalize_goal).transpose()?;
    let utc_offset_minutes = req.utc_offset_minutes.map(validate_offset).transpose()?;

    let uid = claims.sub.to_string();
    let profile = run_blocking(&state, move |s| {
        let user = s.db.transaction(|tx| {
            let current = users::user_by_id(tx, &uid)?
                .ok_or_else(|| ApiError::not_found("user not found"))?;
            users::update_profile(
                tx,
                &uid,
                display_name.as_deref().unwrap_or(&current.display_name),
                sleep_goal.as_deref().unwrap_or(&current.sleep_goal),
                bedtime_goal.as_deref().unwrap_or(&current.bedtime_goal),
                utc_offset_minutes.unwrap_or(current.utc_offset_minutes),
            )?;
            let user = users::user_by_id(tx, &uid)?
                .ok_or_else(|| ApiError::not_found("user not found"))?;
            Ok::<_, ApiError>(wakeup::with_current_streak(tx, user, Utc::now())?)
        })?;
        Ok(convert::profile(&user)?)
    })
    .await?;

    Ok(Json(profile))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = run_blocking(&state, move |s| {
        let user = s
            .db
            .get_user_by_id(&user_id.to_string())?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        let user = s.db.with_conn(|conn| wakeup::with_current_streak(conn, user, Utc::now()))?;
        Ok(convert::public_user(&user)?)
    })
    .await?;

    Ok(Json(user))
}

/// Finds people to befriend. Existing friends and the caller are excluded.
pub async fn search_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let q = query.q.trim().to_string();
    if q.is_empty() {
        return Err(ApiError::validation("search query must not be empty"));
    }

    let uid = claims.sub.to_string();
    let results = run_blocking(&state, move |s| {
        let now = Utc::now();
        let rows = s.db.with_conn(|conn| {
            users::search_users(conn, &uid, &q, MAX_SEARCH_RESULTS)?
                .into_iter()
                .map(|user| wakeup::with_current_streak(conn, user, now))
                .collect::<anyhow::Result<Vec<_>>>()
        })?;
        Ok(rows
            .iter()
            .map(convert::public_user)
            .collect::<anyhow::Result<Vec<_>>>()?)
    })
    .await?;

    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(validate_email("  Alice@Example.com ").unwrap(), "alice@example.com");
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@").is_err());
    }

    #[test]
    fn display_name_bounds() {
        assert_eq!(validate_display_name("  Bob ").unwrap(), "Bob");
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(33)).is_err());
        assert!(validate_display_name(&"é".repeat(32)).is_ok());
    }

    #[test]
    fn goals_are_canonicalized() {
        assert_eq!(normalize_goal("06:30").unwrap(), "6:30 AM");
        assert_eq!(normalize_goal("11:00pm").unwrap(), "11:00 PM");
        assert!(matches!(normalize_goal("whenever"), Err(ApiError::Validation(_))));
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn token_carries_session() {
        let (user, session) = (Uuid::new_v4(), Uuid::new_v4());
        let token = create_token("secret", user, session, "Alice").unwrap();
        let claims = crate::middleware::decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.sid, session);
        assert!(crate::middleware::decode_token("other", &token).is_none());
    }
}
