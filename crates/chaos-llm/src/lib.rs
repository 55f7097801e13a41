pub mod analysis;
pub mod client;

pub use analysis::{AnalysisResult, RecommendedAction, RemoteAnalysisDispatcher};
pub use client::AnalysisClient;
