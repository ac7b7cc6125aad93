pub mod classifier;
pub mod haiku;
pub mod nutrition;
pub mod pipeline;

pub use pipeline::AnalysisPipeline;
