// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys. The library only emits through the
//! `metrics` facade; installing an exporter is up to the host binary.
pub const REGISTRATION: &str = "auth.registration";
pub const LOGIN_SUCCEEDED: &str = "auth.login.succeeded";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const RENEWAL_SUCCEEDED: &str = "auth.renewal.succeeded";
pub const RENEWAL_REUSE_DETECTED: &str = "auth.renewal.reuse_detected";
pub const LOGOUT: &str = "auth.logout";
pub const PASSWORD_CHANGED: &str = "auth.password.changed";
pub const THROTTLE_LOCKOUT: &str = "auth.throttle.lockout";
