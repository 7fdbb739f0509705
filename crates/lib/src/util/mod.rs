//! Shared test fixtures.

pub mod testutil;
