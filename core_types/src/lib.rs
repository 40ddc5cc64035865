//! # Core Types
//!
//! This crate defines the identifiers shared by every layer of the messenger.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: Endpoints are named by typed ids, never by raw strings
//! - **Type safety first**: A peer id cannot be confused with a correlation id
//!
//! ## Key Types
//!
//! - [`PeerId`]: Identifier of a transport endpoint

pub mod ids;
pub mod uuid_tools;

pub use ids::PeerId;
pub use uuid_tools::new_uuid;
