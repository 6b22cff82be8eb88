use sqlx::SqlitePool;
use tracing::warn;

use crate::error::ApiError;

#[derive(Debug, Copy, Clone)]
pub struct RateQuota {
    pub window_ms: i64,
    pub max_requests: i64,
}

/// Clock events are limited under a fixed key, independent of the path the
/// request actually arrived on.
pub const CLOCK_EVENT_ENDPOINT: &str = "/api/clock";
pub const CLOCK_EVENT_QUOTA: RateQuota = RateQuota {
    window_ms: 5_000,
    max_requests: 1,
};

/// Sliding-window admission control over the `rate_events` table, keyed by
/// (credential fingerprint, endpoint). One instance serves every configured
/// quota.
#[derive(Clone)]
pub struct RateLimiter {
    pool: SqlitePool,
    prune_horizon_ms: i64,
}

impl RateLimiter {
    /// `quotas` must list every quota this limiter will admit against: the
    /// prune horizon is the widest of their windows, so a narrow-window
    /// admit never deletes entries a wider window still counts.
    pub fn new(pool: SqlitePool, quotas: &[RateQuota]) -> Self {
        let prune_horizon_ms = quotas.iter().map(|q| q.window_ms).max().unwrap_or(0);
        Self {
            pool,
            prune_horizon_ms,
        }
    }

    /// Admit or reject one request. Prunes expired entries, then counts and
    /// records in a single statement so concurrent calls cannot both read a
    /// stale undercount. Bookkeeping failures degrade open: the request is
    /// admitted and the failure logged.
    pub async fn admit(
        &self,
        fingerprint: &str,
        endpoint: &str,
        now_ms: i64,
        quota: RateQuota,
        ip_address: Option<&str>,
    ) -> Result<(), ApiError> {
        if let Err(e) = sqlx::query("DELETE FROM rate_events WHERE at_ms < ?")
            .bind(now_ms - self.prune_horizon_ms)
            .execute(&self.pool)
            .await
        {
            warn!(error = %e, "Failed to prune expired rate entries");
        }

        // Zero rows inserted means the window is already full. A rejected
        // request is not recorded and consumes no budget.
        let admitted = sqlx::query(
            r#"
            INSERT INTO rate_events (fingerprint, endpoint, at_ms, ip_address)
            SELECT ?1, ?2, ?3, ?4
            WHERE (
                SELECT COUNT(*) FROM rate_events
                WHERE fingerprint = ?1 AND endpoint = ?2 AND at_ms > ?5
            ) < ?6
            "#,
        )
        .bind(fingerprint)
        .bind(endpoint)
        .bind(now_ms)
        .bind(ip_address)
        .bind(now_ms - quota.window_ms)
        .bind(quota.max_requests)
        .execute(&self.pool)
        .await;

        match admitted {
            Ok(res) if res.rows_affected() == 0 => Err(ApiError::RateExceeded(format!(
                "Too many requests! Maximum {} per {} seconds.",
                quota.max_requests,
                quota.window_ms / 1000
            ))),
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Rate limit bookkeeping failed, admitting request");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    const GENERAL: RateQuota = RateQuota {
        window_ms: 60_000,
        max_requests: 100,
    };

    const T0: i64 = 1_717_400_000_000;

    async fn limiter() -> RateLimiter {
        RateLimiter::new(test_pool().await, &[GENERAL, CLOCK_EVENT_QUOTA])
    }

    #[actix_web::test]
    async fn general_window_admits_to_the_limit_and_recovers() {
        let rl = limiter().await;

        for i in 0..100 {
            rl.admit("fp", "/api/report/daily", T0 + i, GENERAL, None)
                .await
                .unwrap();
        }
        let err = rl
            .admit("fp", "/api/report/daily", T0 + 100, GENERAL, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RateExceeded(_)));

        // once the window has passed the newest entry, the call is admitted
        rl.admit("fp", "/api/report/daily", T0 + 99 + 60_000, GENERAL, None)
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn strict_quota_allows_one_per_five_seconds() {
        let rl = limiter().await;

        rl.admit("fp", CLOCK_EVENT_ENDPOINT, T0, CLOCK_EVENT_QUOTA, None)
            .await
            .unwrap();
        let err = rl
            .admit("fp", CLOCK_EVENT_ENDPOINT, T0 + 4_999, CLOCK_EVENT_QUOTA, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RateExceeded(_)));

        rl.admit("fp", CLOCK_EVENT_ENDPOINT, T0 + 5_000, CLOCK_EVENT_QUOTA, None)
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn rejected_requests_consume_no_budget() {
        let rl = limiter().await;

        rl.admit("fp", CLOCK_EVENT_ENDPOINT, T0, CLOCK_EVENT_QUOTA, None)
            .await
            .unwrap();
        for i in 1..5 {
            rl.admit("fp", CLOCK_EVENT_ENDPOINT, T0 + i, CLOCK_EVENT_QUOTA, None)
                .await
                .unwrap_err();
        }

        // only the admitted entry ages out of the window
        rl.admit("fp", CLOCK_EVENT_ENDPOINT, T0 + 5_000, CLOCK_EVENT_QUOTA, None)
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn keys_are_independent() {
        let rl = limiter().await;
        let one = RateQuota {
            window_ms: 60_000,
            max_requests: 1,
        };

        rl.admit("fp-a", "/x", T0, one, None).await.unwrap();
        // same endpoint, other credential
        rl.admit("fp-b", "/x", T0, one, None).await.unwrap();
        // same credential, other endpoint
        rl.admit("fp-a", "/y", T0, one, None).await.unwrap();

        let err = rl.admit("fp-a", "/x", T0 + 1, one, None).await.unwrap_err();
        assert!(matches!(err, ApiError::RateExceeded(_)));
    }

    #[actix_web::test]
    async fn narrow_window_prune_keeps_wide_window_entries() {
        let rl = limiter().await;
        let one = RateQuota {
            window_ms: 60_000,
            max_requests: 1,
        };

        rl.admit("fp", "/x", T0, one, None).await.unwrap();

        // a strict-quota admit 10s later prunes at the widest horizon only
        rl.admit("fp", CLOCK_EVENT_ENDPOINT, T0 + 10_000, CLOCK_EVENT_QUOTA, None)
            .await
            .unwrap();

        // the 60s-window entry must still count
        let err = rl.admit("fp", "/x", T0 + 10_001, one, None).await.unwrap_err();
        assert!(matches!(err, ApiError::RateExceeded(_)));
    }

    #[actix_web::test]
    async fn expired_entries_are_pruned_from_the_table() {
        let rl = limiter().await;

        rl.admit("fp", "/x", T0, GENERAL, None).await.unwrap();
        rl.admit("fp", "/x", T0 + 120_000, GENERAL, None).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rate_events")
            .fetch_one(&rl.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
