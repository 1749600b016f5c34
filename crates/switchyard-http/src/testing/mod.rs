//! Test fixtures for code built on switchyard
//!
//! [`TestRequest`] stands in for a transport binding; the controller,
//! handler and middleware fixtures cover the common dispatch outcomes.

pub mod fixtures;

pub use fixtures::*;
