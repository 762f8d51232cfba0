//! The built-in pipeline stages.

mod accept;
mod body;
mod cors;
mod encoding;
mod metrics;
mod negotiate;
mod normalize;
mod security;
mod serialize;
mod validate;
mod warmup;

pub use body::BodyParserStage;
pub use cors::CorsStage;
pub use encoding::ContentEncodingStage;
pub use metrics::MetricsStage;
pub use negotiate::NegotiateStage;
pub use normalize::NormalizeStage;
pub use security::SecurityHeadersStage;
pub use serialize::SerializeStage;
pub use validate::ValidationStage;
pub use warmup::WarmupStage;
