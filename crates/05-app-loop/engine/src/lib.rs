//! Engine orchestration: configuration plus the job lifecycle for the render,
//! audio and user-logic subsystems.

mod config;
mod engine;

pub use config::{ConfigError, EngineConfig, JobConfig};
pub use engine::{Engine, EngineError, EngineResult};
