use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use crate::auth::auth::AuthUser;
use crate::auth::jwt::generate_token;
use crate::auth::password::verify_password;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::officer::Officer;
use crate::models::ApiResponse;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub nip: String,
    pub password: String,
}

#[instrument(name = "auth_login", skip(pool, config, body), fields(nip = %body.nip))]
pub async fn login(
    body: web::Json<LoginRequest>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    if body.nip.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation("NIP and password are required!".into()));
    }

    debug!("Fetching officer");
    let officer = sqlx::query_as::<_, Officer>(
        "SELECT id, nip, name, password, role FROM officers WHERE nip = ?",
    )
    .bind(&body.nip)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::Unauthorized("Invalid NIP or password!".into()))?;

    if !verify_password(&body.password, &officer.password) {
        info!("Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid NIP or password!".into()));
    }

    let token = generate_token(
        officer.id,
        officer.nip.clone(),
        officer.name.clone(),
        officer.role.clone(),
        &config.jwt_secret,
        config.token_ttl,
    );

    info!("Login successful");
    Ok(HttpResponse::Ok().json(ApiResponse::message_with_data(
        "Login successful!",
        json!({
            "token": token,
            "user": {
                "id": officer.id,
                "nip": officer.nip,
                "name": officer.name,
                "role": officer.role,
            },
            "expires_in": config.token_ttl,
        }),
    )))
}

pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::data(json!({
        "id": auth.officer_id,
        "nip": auth.nip,
        "name": auth.name,
        "role": auth.role,
    })))
}

/// Re-sign a fresh token for the already-verified identity.
pub async fn refresh(auth: AuthUser, config: web::Data<Config>) -> impl Responder {
    let token = generate_token(
        auth.officer_id,
        auth.nip.clone(),
        auth.name.clone(),
        auth.role.to_string(),
        &config.jwt_secret,
        config.token_ttl,
    );

    HttpResponse::Ok().json(ApiResponse::message_with_data(
        "Token refreshed!",
        json!({ "token": token, "expires_in": config.token_ttl }),
    ))
}

/// Tokens are stateless; logout just tells the client to drop its copy.
pub async fn logout() -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::message(
        "Logout successful! Remove the token on the client.",
    ))
}
