//! `ori-client`
//!
//! **Responsibility:** client-side session, access gating and REST access for
//! the ORI admin backend.
//!
//! This crate provides:
//! - Session store backed by persisted token storage
//! - Access gate and navigation guards over the current identity
//! - The admin route table and login flow
//! - Typed clients for the users, institutions and agreements resources
//! - Dashboard statistics, expiry notices, SNIES downloads and workbook uploads
//!
//! The backend stays the authority: tokens are decoded here, never verified.

pub mod api;
pub mod backend;
pub mod config;
pub mod gate;
pub mod login;
pub mod navigation;
pub mod session;
pub mod storage;

mod http;
#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, ListPage, Page};
pub use backend::{AuthBackend, BackendError, HttpAuthBackend, LoginResponse};
pub use config::{ClientConfig, ConfigError};
pub use gate::AccessGate;
pub use login::{LoginForm, LoginOutcome, logout_and_redirect};
pub use navigation::{
    AuthGuard, GuardDecision, Navigation, NavigationError, NavigationGuard, RoleGuard, Route, Router, View,
    admin_routes,
};
pub use session::{AuthError, SessionStatus, SessionStore};
pub use storage::{FileStorage, MemoryStorage, StorageError, TOKEN_KEY, TokenStorage, USERNAME_KEY};
