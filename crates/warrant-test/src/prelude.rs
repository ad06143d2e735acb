//! Prelude module - commonly used test utilities for convenient import.
//!
//! Use `use warrant_test::prelude::*;` to import all essential helpers.

pub use crate::fixtures::{
    DEMO_PASSWORD, DEMO_PASSWORD_SHA256, demo_config, demo_credentials, expired_human,
    in_memory_auth, test_human,
};
pub use crate::mocks::FlakyKvStore;
pub use crate::tracing_init::init_test_tracing;
