//! Audio subsystem: an [`AudioContext`] on the control thread feeding an
//! audio job that owns the [`AudioBackend`].
//!
//! The audio thread drains its ring whenever the producer calls
//! [`AudioContext::consume`], then advances the engine and publishes every
//! slot's state for the getters to read. Released slots travel back to the
//! producer only after the publish that clears them, so a recycled handle
//! never reads the previous resource's state.

mod backend;
mod cmd;
mod context;
mod executor;
mod simulated;
mod state;

pub use backend::{AudioBackend, AudioBackendError, AudioBackendResult};
pub use cmd::{AudioCmd, AudioResourceKind, DspKind, EqBands};
pub use context::AudioContext;
pub use simulated::SimulatedAudioBackend;
pub use state::{
    AudioState, ChannelState, GroupState, PlayState, SoundFileInfo, Spectrum, SPECTRUM_BINS,
};

use dispatch::{spawn_dispatcher, ContinuePolicy, DispatchConfig, DispatchResult};
use executor::AudioExecutor;
use jobs::{JobRegistry, JobSpec};
use serde::Deserialize;
use state::AudioShared;
use std::sync::Arc;
use std::time::Duration;
use transport::CmdRing;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AudioConfig {
    pub ring_capacity: usize,
    /// Released slots the audio thread can hand back before it buffers them.
    pub release_ring_capacity: usize,
    pub initial_slots: u32,
    /// Entries preallocated in the audio thread's resource tables.
    pub reserved_resources: usize,
    pub idle_sleep_ms: u64,
    /// Make `consume` block until the audio thread picks the batch up.
    pub wait_for_continue: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 1024,
            release_ring_capacity: 128,
            initial_slots: 128,
            reserved_resources: 128,
            idle_sleep_ms: 1,
            wait_for_continue: true,
        }
    }
}

/// Starts the audio job. `make_backend` runs on the audio thread.
pub fn spawn_audio_job<B, F>(
    registry: &mut JobRegistry,
    spec: JobSpec,
    config: &AudioConfig,
    make_backend: F,
) -> DispatchResult<AudioContext>
where
    B: AudioBackend + 'static,
    F: FnOnce() -> B + Send + 'static,
{
    let (returned, freed) = CmdRing::with_capacity(config.release_ring_capacity)?.split();
    let shared = Arc::new(AudioShared::default());
    let dispatch = DispatchConfig {
        idle_sleep: Duration::from_millis(config.idle_sleep_ms),
        continue_policy: ContinuePolicy::OnConsume,
    };
    let reserved = config.reserved_resources;
    let executor_shared = Arc::clone(&shared);
    let queue = spawn_dispatcher(
        registry,
        spec,
        config.ring_capacity,
        dispatch,
        move |_job| AudioExecutor::new(make_backend(), executor_shared, returned, reserved),
    )?;
    log::info!(
        "audio job '{}' started (ring {})",
        queue.job().name(),
        config.ring_capacity
    );
    Ok(AudioContext::new(
        queue,
        freed,
        shared,
        config.initial_slots,
        config.wait_for_continue,
    ))
}
