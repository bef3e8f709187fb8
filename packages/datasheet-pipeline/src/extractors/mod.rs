//! Implementations of the [`PropertyExtractor`] boundary.
//!
//! [`PropertyExtractor`]: crate::extract::PropertyExtractor

pub mod openai;

pub use openai::OpenAiExtractor;
