//! Boundary to the audio engine.

use crate::cmd::{AudioResourceKind, DspKind, EqBands};
use crate::state::AudioState;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioBackendError {
    #[error("sound file '{filename}' not found")]
    NotFound { filename: String },

    #[error("slot {slot} does not hold a {expected:?}")]
    WrongKind {
        slot: u32,
        expected: AudioResourceKind,
    },

    #[error("audio engine refused to create {kind:?}: {reason}")]
    Refused {
        kind: AudioResourceKind,
        reason: &'static str,
    },
}

pub type AudioBackendResult = Result<(), AudioBackendError>;

/// One method per audio operation, called on the audio thread only.
///
/// Setters aimed at a slot of the wrong kind are ignored by the executor
/// before they reach the backend, so implementations only see slots that
/// were created successfully with the matching kind.
pub trait AudioBackend {
    fn initialise(&mut self) {}

    fn create_stream(&mut self, slot: u32, filename: &str) -> AudioBackendResult;
    fn create_sound(&mut self, slot: u32, filename: &str) -> AudioBackendResult;
    fn create_group(&mut self, slot: u32) -> AudioBackendResult;
    fn create_channel_for_sound(&mut self, slot: u32, sound: u32) -> AudioBackendResult;
    fn add_dsp_to_group(&mut self, slot: u32, group: u32, dsp: DspKind) -> AudioBackendResult;
    fn release(&mut self, kind: AudioResourceKind, slot: u32);

    fn add_channel_to_group(&mut self, channel: u32, group: u32);

    fn channel_set_position(&mut self, channel: u32, position_ms: u32);
    fn channel_set_frequency(&mut self, channel: u32, frequency: f32);
    fn channel_stop(&mut self, channel: u32);

    fn group_set_pause(&mut self, group: u32, paused: bool);
    fn group_set_mute(&mut self, group: u32, muted: bool);
    fn group_set_pitch(&mut self, group: u32, pitch: f32);
    fn group_set_volume(&mut self, group: u32, volume: f32);

    fn dsp_set_three_band_eq(&mut self, dsp: u32, bands: EqBands);
    fn dsp_set_gain(&mut self, dsp: u32, gain: f32);

    /// Advances the engine once per drained batch.
    fn update(&mut self);

    /// Current state of a live resource.
    fn poll(&self, slot: u32, kind: AudioResourceKind) -> AudioState;

    fn shutdown(&mut self) {}
}
