//! Behavioral contract tests
//!
//! Guarantees a caller can rely on regardless of how either side is
//! implemented: correlation, error transport, unknown actions, events and
//! peer isolation.
