//! Router Module Index
//!
//! Organizes the application's routing logic into access-segregated modules.
//! Access control is applied explicitly at the module level (via Axum layers) or, for
//! object-level rules, inside the handlers the module registers.

/// Routes accessible to all clients (anonymous or logged-in).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a valid access token.
pub mod authenticated;

/// Routes that act on a single account and are restricted to that account's owner.
pub mod owner;
