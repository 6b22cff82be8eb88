use actix_web::{
    Error, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::auth::middleware::bearer_token;
use crate::clock::{Clock, SharedClock, now_millis};
use crate::config::Config;
use crate::error::ApiError;
use crate::store::rate_limit::{CLOCK_EVENT_ENDPOINT, CLOCK_EVENT_QUOTA, RateLimiter, RateQuota};

type HmacSha256 = Hmac<Sha256>;

/// Deterministic, non-reversible rate-limit key for a presented token. A
/// keyed MAC keeps raw credentials out of the bookkeeping table while
/// giving identical tokens identical keys across requests.
pub fn token_fingerprint(secret: &str, token: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// General limiter for reporting/read endpoints, keyed by the request path.
pub async fn general_rate_limit(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    admit_or_reject(req, next, None).await
}

/// Strict limiter for the clock-event endpoint, keyed by a fixed endpoint
/// identifier.
pub async fn clock_event_rate_limit(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    admit_or_reject(req, next, Some((CLOCK_EVENT_ENDPOINT, CLOCK_EVENT_QUOTA))).await
}

async fn admit_or_reject(
    req: ServiceRequest,
    next: Next<BoxBody>,
    fixed: Option<(&str, RateQuota)>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let limiter = req
        .app_data::<Data<RateLimiter>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Rate limiter missing"))?;
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;
    let clock = req
        .app_data::<Data<SharedClock>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Clock missing"))?;

    let token = match bearer_token(&req) {
        Some(t) => t.to_owned(),
        None => {
            let resp = ApiError::Unauthorized("Token required!".into()).error_response();
            return Ok(req.into_response(resp));
        }
    };

    let fingerprint = token_fingerprint(&config.jwt_secret, &token);
    let (endpoint, quota) = match fixed {
        Some((endpoint, quota)) => (endpoint.to_owned(), quota),
        None => (
            req.path().to_owned(),
            RateQuota {
                window_ms: config.rate_window_ms,
                max_requests: config.rate_max_requests,
            },
        ),
    };
    let ip_address = req
        .connection_info()
        .realip_remote_addr()
        .map(str::to_owned);
    let now_ms = now_millis(clock.now());

    match limiter
        .admit(&fingerprint, &endpoint, now_ms, quota, ip_address.as_deref())
        .await
    {
        Ok(()) => next.call(req).await,
        Err(e) => Ok(req.into_response(e.error_response())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic_per_token() {
        let a = token_fingerprint("secret", "token-a");
        assert_eq!(a, token_fingerprint("secret", "token-a"));
        assert_ne!(a, token_fingerprint("secret", "token-b"));
        assert_ne!(a, token_fingerprint("other-secret", "token-a"));
    }

    #[test]
    fn fingerprint_does_not_leak_the_token() {
        let fp = token_fingerprint("secret", "super-secret-token");
        assert!(!fp.contains("super-secret-token"));
        assert_eq!(fp.len(), 64);
    }
}
