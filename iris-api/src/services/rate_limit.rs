//! Per-client request quotas for the credential endpoints

use chrono::Utc;
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use iris_common::config::RateLimitConfig;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::ApiError;

/// Keyed limiters for register, login and verify-otp, shared by every handler
#[derive(Clone)]
pub struct RateLimiters {
    register: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    login: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    verify_otp: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

fn per_minute(count: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(count).unwrap_or(NonZeroU32::MIN))
}

fn check(limiter: &DefaultKeyedRateLimiter<IpAddr>, ip: IpAddr) -> Result<(), ApiError> {
    limiter.check_key(&ip).map_err(|not_until| {
        let wait = not_until.wait_time_from(DefaultClock::default().now());
        let retry_at = Utc::now()
            + chrono::Duration::from_std(wait).unwrap_or_else(|_| chrono::Duration::seconds(60));
        tracing::warn!(client = %ip, "Rate limit exceeded");
        ApiError::RateLimited { retry_at }
    })
}

/// Forget clients whose budget has fully refilled
fn prune_one(limiter: &DefaultKeyedRateLimiter<IpAddr>) -> usize {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    limiter.len()
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_quotas(
            per_minute(config.register_per_minute),
            per_minute(config.login_per_minute),
            per_minute(config.verify_otp_per_minute),
        )
    }

    fn with_quotas(register: Quota, login: Quota, verify_otp: Quota) -> Self {
        Self {
            register: Arc::new(RateLimiter::keyed(register)),
            login: Arc::new(RateLimiter::keyed(login)),
            verify_otp: Arc::new(RateLimiter::keyed(verify_otp)),
        }
    }

    pub fn check_register(&self, ip: IpAddr) -> Result<(), ApiError> {
        check(&self.register, ip)
    }

    pub fn check_login(&self, ip: IpAddr) -> Result<(), ApiError> {
        check(&self.login, ip)
    }

    pub fn check_verify_otp(&self, ip: IpAddr) -> Result<(), ApiError> {
        check(&self.verify_otp, ip)
    }

    /// Drop idle clients from every limiter; returns how many are still tracked
    pub fn prune(&self) -> usize {
        prune_one(&self.register) + prune_one(&self.login) + prune_one(&self.verify_otp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn limits(register: u32, login: u32, verify_otp: u32) -> RateLimitConfig {
        RateLimitConfig {
            register_per_minute: register,
            login_per_minute: login,
            verify_otp_per_minute: verify_otp,
        }
    }

    #[test]
    fn test_quota_is_per_client() {
        let limiters = RateLimiters::new(&limits(2, 2, 2));
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiters.check_login(a).is_ok());
        assert!(limiters.check_login(a).is_ok());
        match limiters.check_login(a) {
            Err(ApiError::RateLimited { retry_at }) => assert!(retry_at > Utc::now()),
            other => panic!("expected rate limit rejection, got {:?}", other),
        }

        // Other clients and other endpoints keep their own budget
        assert!(limiters.check_login(b).is_ok());
        assert!(limiters.check_register(a).is_ok());
        assert!(limiters.check_verify_otp(a).is_ok());
    }

    #[test]
    fn test_zero_quota_still_allows_one_request() {
        let limiters = RateLimiters::new(&limits(0, 0, 0));
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(limiters.check_register(ip).is_ok());
        assert!(limiters.check_register(ip).is_err());
    }

    #[test]
    fn test_verify_otp_has_its_own_budget() {
        let limiters = RateLimiters::new(&limits(5, 5, 1));
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(limiters.check_verify_otp(ip).is_ok());
        assert!(matches!(limiters.check_verify_otp(ip), Err(ApiError::RateLimited { .. })));
        assert!(limiters.check_login(ip).is_ok());
    }

    #[test]
    fn test_prune_drops_refilled_clients_only() {
        let limiters = RateLimiters::new(&limits(5, 5, 5));
        limiters.check_login(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))).unwrap();
        limiters.check_register(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))).unwrap();
        // Budgets refill over a minute, so both are still tracked
        assert_eq!(limiters.prune(), 2);

        let fast = Quota::with_period(Duration::from_millis(1)).unwrap();
        let limiters = RateLimiters::with_quotas(fast, fast, fast);
        for last in 1..=50u8 {
            limiters.check_login(IpAddr::V4(Ipv4Addr::new(10, 0, 1, last))).unwrap();
        }
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(limiters.prune(), 0);
    }
}
