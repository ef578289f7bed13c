// ============================
// sessionvault-backend/src/lib.rs
// ============================
//! Session-credential core: password verification, signed access and
//! renewal tokens, and single-slot renewal rotation over a user store.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod validation;

pub use auth::{AuthService, SessionManager, SessionPolicy};
pub use config::Settings;
pub use error::{AuthError, StoreError, TokenError};
pub use storage::{FlatFileUserStore, MemoryUserStore, UserRecord, UserStore};
