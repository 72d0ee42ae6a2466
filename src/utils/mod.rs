//! Cross-cutting helpers.
//!
//! - **`logging`**: initialization of the `tracing` subscriber, shared by the
//!   embedding application and the test suite.

pub mod logging;
