pub mod bounder;
pub mod classifier;
pub mod extract;
pub mod normalization;

pub use bounder::InputBounder;
pub use classifier::{Classification, ContentPolicy, SafetyClassifier};
pub use extract::{Channel, IncomingRequest, TextExtractor};
