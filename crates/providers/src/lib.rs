//! Model provider implementations for gymcoach.
//!
//! Providers implement the `gymcoach_core::Provider` trait; the coach never
//! knows which backend is behind it.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
