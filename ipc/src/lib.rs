//! # Inter-Process Communication (IPC)
//!
//! This crate defines the wire protocol spoken between two messengers.
//!
//! ## Philosophy
//!
//! - **Three shapes, nothing else**: Requests, Responses and Events, told apart by their `type`
//! - **Foreign traffic is not an error**: Anything that does not parse is dropped
//! - **Errors travel as data**: Structured errors keep their category and context
//!
//! ## Architecture
//!
//! - [`message`]: message shapes, correlation ids and shape predicates
//! - [`error_codec`]: conversion between handler failures and error payloads

pub mod error_codec;
pub mod message;

pub use error_codec::{
    decode, encode, DecodeError, HandlerError, StructuredError, HANDLER_PANIC, UNKNOWN_ACTION,
};
pub use message::{
    is_event_message, is_request_message, is_response_message, EventMessage, Message, MessageId,
    RequestMessage, ResponseMessage, EVENT_TYPE, REQUEST_TYPE, RESPONSE_TYPE,
};
