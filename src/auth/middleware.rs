use std::str::FromStr;

use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    middleware::Next,
    web::Data,
};

use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;

/// Bearer token from `Authorization: Bearer ...`, falling back to the
/// `x-access-token` header.
pub fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    let headers = req.headers();
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-access-token").and_then(|h| h.to_str().ok()))
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let token = match bearer_token(&req) {
        Some(t) => t,
        None => {
            let resp =
                ApiError::Unauthorized("Token not found! Please login first.".into())
                    .error_response();
            return Ok(req.into_response(resp));
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => {
            let resp =
                ApiError::Unauthorized("Invalid or expired token!".into()).error_response();
            return Ok(req.into_response(resp));
        }
    };

    let role = match Role::from_str(&claims.role) {
        Ok(r) => r,
        Err(_) => {
            let resp = ApiError::Unauthorized("Invalid role!".into()).error_response();
            return Ok(req.into_response(resp));
        }
    };

    let auth_user = AuthUser {
        officer_id: claims.officer_id,
        nip: claims.sub,
        name: claims.name,
        role,
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
