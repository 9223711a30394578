pub mod config;
pub mod decoder;
pub mod error;
pub mod gateway;
pub mod interceptor;
pub mod logging;
pub mod network;
pub mod pipeline;
pub mod render;

pub use decoder::{AnalysisRecord, ResponseDecoder};
pub use error::FixError;
pub use pipeline::ErrorFixPipeline;
