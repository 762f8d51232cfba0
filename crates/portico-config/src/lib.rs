//! # Portico Config
//!
//! Layered configuration for the Portico pipeline.
//!
//! Configuration is resolved once, at handler-definition time, from an
//! ordered sequence of partial layers: framework defaults, then a
//! handler-family layer, then per-function overrides. The merge rules are
//! small and total:
//!
//! - mapping nodes merge key-wise, later layer winning per key;
//! - scalars, lists, and opaque leaves (functions, schemas, stages) replace
//!   wholesale - lists are never concatenated;
//! - an explicit null overwrites (it disables an inherited section), while
//!   an omitted key leaves the earlier value untouched.
//!
//! The resolved [`Config`] is immutable and cheap to share across
//! concurrent invocations.
//!
//! # Example
//!
//! ```
//! use portico_config::{Config, ConfigLayer, CorsOptions};
//! use portico_telemetry::LogLevel;
//!
//! let family = ConfigLayer::new()
//!     .log_level(LogLevel::Warn)
//!     .cors(CorsOptions { origin: Some("*".to_owned()), ..CorsOptions::default() });
//! let per_function = ConfigLayer::new().log_level(LogLevel::Debug);
//!
//! let config = Config::resolve([family, per_function]);
//! assert_eq!(config.log_level(), LogLevel::Debug);
//! assert!(config.cors().unwrap().is_some());
//! ```

#![doc(html_root_url = "https://docs.rs/portico-config/0.1.0")]
#![warn(missing_docs)]

pub mod config;
pub mod options;
pub mod value;

pub use config::{Config, ConfigLayer};
pub use options::{
    CorsOptions, EncodingOptions, ErrorCallback, HstsOptions, RequestContentOptions,
    ResponseContentOptions, SecurityOptions, SerializerBinding, Severity, StageHandle,
    WarmupOptions,
};
pub use value::{merge, resolve, ConfigValue, OpaqueValue, Scalar};
