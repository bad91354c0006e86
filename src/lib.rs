//! Virtual Vince - a persona chat widget backed by a completion API
//!
//! The server binary exposes the completion proxy over HTTP. The terminal
//! client drives the conversation state machine against it.

pub mod api;
pub mod conversation;
pub mod env;
pub mod llm;
pub mod persona;
pub mod proxy;
pub mod runtime;
