//! Environment override of the request limit.
//!
//! Kept in its own test binary because it mutates process environment.

use harmonic_core::quota::QUOTA_LIMIT_ENV;
use harmonic_core::QuotaPolicy;

#[test]
fn test_env_limit_fallbacks() {
    std::env::remove_var(QUOTA_LIMIT_ENV);
    assert_eq!(QuotaPolicy::from_env().limit, 3);

    for bad in ["abc", "-5", "0"] {
        std::env::set_var(QUOTA_LIMIT_ENV, bad);
        assert_eq!(QuotaPolicy::from_env().limit, 3, "value {bad:?}");
    }

    std::env::set_var(QUOTA_LIMIT_ENV, "10");
    assert_eq!(QuotaPolicy::from_env().limit, 10);

    std::env::remove_var(QUOTA_LIMIT_ENV);
}
