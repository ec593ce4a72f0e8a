//! Top-level orchestrator: starts subsystem jobs and stops them in reverse.

use crate::config::EngineConfig;
use anyhow::Context;
use dispatch::DispatchError;
use jobs::{JobError, JobHandle, JobRegistry, JobSpec};
use services_audio::{spawn_audio_job, AudioBackend, AudioContext};
use services_gpu::{spawn_render_job, RenderBackend, RenderContext};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("{subsystem} job already started")]
    AlreadyStarted { subsystem: &'static str },
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Owns the job registry for render, audio and user-logic jobs.
///
/// Start consumers before the user jobs that drive them: shutdown walks the
/// registry backwards, so user jobs stop first and a consumer never loses
/// its producer mid-frame.
pub struct Engine {
    config: EngineConfig,
    registry: JobRegistry,
    render_started: bool,
    audio_started: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: JobRegistry::new(),
            render_started: false,
            audio_started: false,
        }
    }

    /// Loads a TOML config and builds an engine from it.
    pub fn from_config_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = EngineConfig::from_path(path)
            .with_context(|| format!("loading engine config {path:?}"))?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn start_render<B, F>(&mut self, make_backend: F) -> EngineResult<RenderContext>
    where
        B: RenderBackend + 'static,
        F: FnOnce() -> B + Send + 'static,
    {
        if self.render_started {
            return Err(EngineError::AlreadyStarted {
                subsystem: "render",
            });
        }
        let ctx = spawn_render_job(
            &mut self.registry,
            JobSpec::new("render"),
            &self.config.render,
            make_backend,
        )?;
        self.render_started = true;
        Ok(ctx)
    }

    pub fn start_audio<B, F>(&mut self, make_backend: F) -> EngineResult<AudioContext>
    where
        B: AudioBackend + 'static,
        F: FnOnce() -> B + Send + 'static,
    {
        if self.audio_started {
            return Err(EngineError::AlreadyStarted { subsystem: "audio" });
        }
        let ctx = spawn_audio_job(
            &mut self.registry,
            JobSpec::new("audio"),
            &self.config.audio,
            make_backend,
        )?;
        self.audio_started = true;
        Ok(ctx)
    }

    /// Spawns a user-logic job with the configured stack size.
    ///
    /// `body` should loop until [`JobHandle::exit_requested`] reports `true`.
    pub fn spawn_user<F>(&mut self, name: &str, body: F) -> EngineResult<JobHandle>
    where
        F: FnOnce(JobHandle) + Send + 'static,
    {
        self.spawn_user_with(JobSpec::new(name), body)
    }

    /// Like [`Engine::spawn_user`] for a caller-built spec, e.g. one with a
    /// completion callback.
    pub fn spawn_user_with<F>(&mut self, spec: JobSpec, body: F) -> EngineResult<JobHandle>
    where
        F: FnOnce(JobHandle) + Send + 'static,
    {
        let spec = match self.config.jobs.stack_size {
            Some(bytes) => spec.stack_size(bytes),
            None => spec,
        };
        Ok(self.registry.create_job(spec, body)?)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &JobHandle> {
        self.registry.handles()
    }

    pub fn live_jobs(&self) -> usize {
        self.registry.live_count()
    }

    /// Stops every job, newest first, giving each the configured timeout.
    ///
    /// Jobs that miss their deadline are detached and reported in
    /// [`JobError::Leaked`].
    pub fn shutdown(mut self) -> EngineResult<()> {
        let timeout = self.config.jobs.shutdown_timeout();
        log::info!(
            "engine shutting down {} jobs ({}ms per job)",
            self.registry.live_count(),
            timeout.as_millis()
        );
        self.registry.terminate_all_timeout(timeout)?;
        Ok(())
    }
}
