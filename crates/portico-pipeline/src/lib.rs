//! # Portico Pipeline
//!
//! Stage implementations, pipeline assembly, and the invocation engine.
//!
//! [`assemble`] turns a resolved configuration into a fixed, ordered stage
//! list - once per handler definition. [`Engine`] drives that list for one
//! request at a time: `before` hooks front-to-back with short-circuiting,
//! the handler, then every `after` hook back-to-front, with every fault
//! caught at the engine boundary and converted into a terminal response.
//!
//! The stages themselves are deliberately thin. Negotiation, header
//! tables, codecs, and serializers all delegate to their libraries or to
//! caller-supplied functions; the interesting control flow lives in
//! [`engine`] and in the validation stage.

#![doc(html_root_url = "https://docs.rs/portico-pipeline/0.1.0")]
#![warn(missing_docs)]

pub mod assemble;
pub mod engine;
pub mod stages;

pub use assemble::assemble;
pub use engine::Engine;
