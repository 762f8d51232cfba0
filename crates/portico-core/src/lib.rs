//! # Portico Core
//!
//! Core types and contracts for the Portico function pipeline.
//!
//! This crate defines everything the rest of the workspace agrees on:
//!
//! - **[`event`]** - The inbound request envelope in both recognized payload
//!   versions, with uniform accessors
//! - **[`response`]** - The outbound response shape and the [`response::res`]
//!   helper constructors
//! - **[`error`]** - The [`Fault`] taxonomy and its mapping to terminal
//!   responses
//! - **[`schema`]** - The schema adapter: a closed set of validator variants
//!   driven through one `validate` operation
//! - **[`exchange`]** - The per-invocation mutable record that flows through
//!   the pipeline
//! - **[`stage`]** - The [`Stage`] contract implemented by every pipeline
//!   stage
//! - **[`handler`]** - The [`Handler`] contract and the typed view handlers
//!   receive
//!
//! Nothing in this crate performs I/O; it is the vocabulary shared by
//! `portico-config`, `portico-pipeline`, and the `portico` facade.

#![doc(html_root_url = "https://docs.rs/portico-core/0.1.0")]
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod event;
pub mod exchange;
pub mod handler;
pub mod response;
pub mod schema;
pub mod stage;

pub use context::{FunctionContext, InvocationId};
pub use error::Fault;
pub use event::{Event, PayloadVersion};
pub use exchange::Exchange;
pub use handler::{Handler, HandlerResult, Invocation};
pub use response::{HeaderValue, Response};
pub use schema::{
    ParseContext, PathSegment, Schema, SchemaViolations, ValidateOptions, ValidationError,
    ValidationTarget, Violation,
};
pub use stage::{BoxFuture, Stage};
