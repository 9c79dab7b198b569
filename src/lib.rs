//! # Nido (Family & Childcare Records API)
//!
//! `nido` is the backend for a family/childcare application. It owns
//! parent accounts, session tokens, and per-child records (vaccinations,
//! allergies, growth history).
//!
//! ## Accounts & Sessions
//!
//! - **Sign-up / sign-in** issue an opaque session token bound to the
//!   account; clients present it as a bearer token.
//! - **Uniqueness:** `user_id` and `email` are unique among active
//!   accounts, enforced by partial unique indexes so concurrent sign-ups
//!   cannot race past the pre-checks.
//! - **Soft deletes:** deleted accounts keep their rows; their identifiers
//!   become reusable and stop resolving for sign-in and password reset.
//!
//! ## Response contract
//!
//! Every endpoint answers with the same envelope:
//! `{status, message: [error-code, ...] | null, data | null}`. Error codes
//! are a closed set of stable kebab-case strings; validation failures are
//! aggregated into one response instead of being reported one at a time.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
