//! Shared test utilities for reportd integration tests.
//!
//! - `TestHarness`: an isolated project root with fake report scripts
//! - `FakeRemote`: an in-process stand-in for the ERP bulk-data API

pub mod harness;
pub mod remote;

pub use harness::TestHarness;
pub use remote::FakeRemote;
