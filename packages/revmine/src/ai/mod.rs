//! AI provider implementations.
//!
//! This module provides reference implementations of the `DocumentAi` trait.
//! Users can use these directly or implement their own.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAi;
