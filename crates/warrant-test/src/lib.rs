//! Warrant Test - Shared test utilities for the Warrant auth kernel.
//!
//! This crate provides demo principals, identity builders and store mocks
//! that can be used across multiple Warrant crates as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! warrant-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! #[cfg(test)]
//! mod tests {
//!     use warrant_test::{DEMO_PASSWORD, in_memory_auth};
//!
//!     #[tokio::test]
//!     async fn test_login() {
//!         let auth = in_memory_auth();
//!         let alice = auth.login("alice@example.com", DEMO_PASSWORD).await.unwrap();
//!         assert_eq!(alice.user_id, "usr-alice-001");
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;
pub mod tracing_init;

pub use fixtures::*;
pub use mocks::*;
pub use tracing_init::*;
