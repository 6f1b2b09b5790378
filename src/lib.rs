//! Oliv - companion chat backend
//!
//! Keeps the chat threads of a single session in memory and asks a remote
//! chat-completion service for Oliv's replies.

pub mod config;
pub mod conversation;
pub mod core;
pub mod providers;
pub mod routes;
