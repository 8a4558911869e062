//! Decision-call providers for triagent.
//!
//! Both implement the `triagent_core::Provider` trait: [`HttpProvider`]
//! speaks the OpenAI-compatible chat-completions shape, [`ScriptedProvider`]
//! replays canned outputs for tests and offline runs.

pub mod http;
pub mod scripted;

pub use http::HttpProvider;
pub use scripted::ScriptedProvider;
