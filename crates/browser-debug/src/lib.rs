pub mod config;
pub mod trace;

pub use config::DebugConfig;
pub use trace::{RenderTrace, StepRecord};
