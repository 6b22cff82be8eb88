use actix_web::{HttpResponse, middleware::from_fn, web};

use crate::api::{clock, report};
use crate::auth::{
    handlers,
    middleware::auth_middleware,
    rate_limit::{clock_event_rate_limit, general_rate_limit},
};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::ApiResponse;

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::failure("Endpoint not found!"))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Malformed bodies and query strings render the same envelope as every
    // other validation failure.
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| ApiError::Validation(err.to_string()).into()),
    );
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ApiError::Validation(err.to_string()).into()),
    );

    cfg.service(
        web::scope(&format!("{}/auth", config.api_prefix))
            .service(web::resource("/login").route(web::post().to(handlers::login)))
            .service(
                web::resource("/logout")
                    .wrap(from_fn(auth_middleware))
                    .route(web::post().to(handlers::logout)),
            )
            .service(
                web::resource("/me")
                    .wrap(from_fn(auth_middleware))
                    .route(web::get().to(handlers::me)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(from_fn(auth_middleware))
                    .route(web::post().to(handlers::refresh)),
            ),
    );

    // Middleware registered last runs first: authentication wraps the rate
    // limiters, so rejected credentials never consume rate budget.
    cfg.service(
        web::scope(&format!("{}/clock", config.api_prefix))
            .service(
                web::resource("")
                    .wrap(from_fn(clock_event_rate_limit))
                    .wrap(from_fn(auth_middleware))
                    .route(web::post().to(clock::record_clock)),
            )
            .service(
                web::resource("/status")
                    .wrap(from_fn(general_rate_limit))
                    .wrap(from_fn(auth_middleware))
                    .route(web::get().to(clock::live_status)),
            )
            .service(
                web::resource("/history")
                    .wrap(from_fn(general_rate_limit))
                    .wrap(from_fn(auth_middleware))
                    .route(web::get().to(clock::history)),
            ),
    );

    cfg.service(
        web::scope(&format!("{}/report", config.api_prefix))
            .wrap(from_fn(general_rate_limit))
            .wrap(from_fn(auth_middleware))
            .service(web::resource("/daily").route(web::get().to(report::daily)))
            .service(web::resource("/monthly").route(web::get().to(report::monthly)))
            .service(web::resource("/officer").route(web::get().to(report::per_officer)))
            .service(web::resource("/export").route(web::get().to(report::export))),
    );

    cfg.default_service(web::route().to(not_found));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SharedClock};
    use crate::db;
    use crate::store::rate_limit::{CLOCK_EVENT_QUOTA, RateLimiter, RateQuota};
    use actix_web::{App, http::StatusCode, test, web::Data};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use serde_json::{Value, json};

    fn test_config() -> Config {
        Config {
            server_addr: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            jwt_secret: "test-secret".into(),
            token_ttl: 86_400,
            rate_window_ms: 60_000,
            rate_max_requests: 100,
            late_cutoff: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            api_prefix: "/api".into(),
        }
    }

    fn seven_fifty_five() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(7, 55, 0)
            .unwrap()
    }

    macro_rules! spawn_app {
        ($clock:ident, $app:ident) => {
            let pool = db::test_pool().await;
            db::seed_default_officers(&pool).await.unwrap();
            let config = test_config();
            let $clock = ManualClock::starting_at(seven_fifty_five());
            let limiter = RateLimiter::new(
                pool.clone(),
                &[
                    RateQuota {
                        window_ms: config.rate_window_ms,
                        max_requests: config.rate_max_requests,
                    },
                    CLOCK_EVENT_QUOTA,
                ],
            );
            let shared: SharedClock = $clock.clone();
            let $app = test::init_service(
                App::new()
                    .app_data(Data::new(pool.clone()))
                    .app_data(Data::new(config.clone()))
                    .app_data(Data::new(limiter))
                    .app_data(Data::new(shared))
                    .configure(|cfg| configure(cfg, config.clone())),
            )
            .await;
        };
    }

    macro_rules! login {
        ($app:expr, $nip:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({"nip": $nip, "password": "admin123"}))
                .to_request();
            let body: Value = test::call_and_read_body_json(&$app, req).await;
            body["data"]["token"]
                .as_str()
                .expect("login should return a token")
                .to_owned()
        }};
    }

    macro_rules! post_clock {
        ($app:expr, $token:expr, $status:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/clock")
                .insert_header(("Authorization", format!("Bearer {}", $token)))
                .set_json(json!({"status": $status}))
                .to_request();
            test::call_service(&$app, req).await
        }};
    }

    #[actix_web::test]
    async fn login_rejects_bad_credentials() {
        spawn_app!(_clock, app);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"nip": "654321", "password": "wrong"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
    }

    #[actix_web::test]
    async fn full_day_over_http() {
        spawn_app!(clock, app);
        let token = login!(app, "654321");

        // 07:55 clock-in
        let resp = post_clock!(app, token, "in");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["attendance"]["clock_in"], json!("07:55:00"));

        // replay past the strict window: the state machine rejects it
        clock.advance(chrono::Duration::seconds(6));
        let resp = post_clock!(app, token, "in");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], json!("Already clocked in today!"));

        // 17:00 clock-out
        clock.set(
            NaiveDate::from_ymd_opt(2024, 6, 3)
                .unwrap()
                .and_hms_opt(17, 0, 0)
                .unwrap(),
        );
        let resp = post_clock!(app, token, "out");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["attendance"]["clock_out"], json!("17:00:00"));

        clock.advance(chrono::Duration::seconds(6));
        let resp = post_clock!(app, token, "out");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], json!("Already clocked out today!"));

        // derived report: on time, 9h05m worked
        let req = test::TestRequest::get()
            .uri("/api/report/officer")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["statistics"]["total_work_minutes"], json!(545));
        assert_eq!(body["data"]["attendance"][0]["presence"], json!("on_time"));
    }

    #[actix_web::test]
    async fn strict_limiter_allows_one_clock_event_per_five_seconds() {
        spawn_app!(clock, app);
        let token = login!(app, "654321");

        let resp = post_clock!(app, token, "break");
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = post_clock!(app, token, "break");
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));

        clock.advance(chrono::Duration::seconds(5));
        let resp = post_clock!(app, token, "break");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn unauthenticated_calls_consume_no_rate_budget() {
        spawn_app!(_clock, app);
        let token = login!(app, "654321");

        // no token: rejected by the access policy before the limiter
        let req = test::TestRequest::post()
            .uri("/api/clock")
            .set_json(json!({"status": "break"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // the strict 1-per-5s budget is still intact
        let resp = post_clock!(app, token, "break");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn invalid_clock_status_is_a_validation_error() {
        spawn_app!(_clock, app);
        let token = login!(app, "654321");

        let resp = post_clock!(app, token, "nap");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Status must be one of: in, out, break!"));
    }

    #[actix_web::test]
    async fn export_is_admin_only() {
        spawn_app!(_clock, app);

        let officer_token = login!(app, "654321");
        let req = test::TestRequest::get()
            .uri("/api/report/export")
            .insert_header(("Authorization", format!("Bearer {officer_token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let admin_token = login!(app, "123456");
        let req = test::TestRequest::get()
            .uri("/api/report/export?format=download")
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("content-disposition"));
    }

    #[actix_web::test]
    async fn daily_report_classifies_late_arrivals() {
        spawn_app!(clock, app);

        // 08:20 is past the 08:00 cutoff
        clock.set(
            NaiveDate::from_ymd_opt(2024, 6, 3)
                .unwrap()
                .and_hms_opt(8, 20, 0)
                .unwrap(),
        );
        let token = login!(app, "654321");
        let resp = post_clock!(app, token, "in");
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/report/daily")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["statistics"]["late"], json!(1));
        assert_eq!(body["data"]["statistics"]["present"], json!(1));
        assert_eq!(body["data"]["attendance"][0]["presence"], json!("late"));
    }

    #[actix_web::test]
    async fn unknown_routes_return_the_envelope() {
        spawn_app!(_clock, app);

        let req = test::TestRequest::get().uri("/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
    }
}
