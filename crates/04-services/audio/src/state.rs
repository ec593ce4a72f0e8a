use crate::cmd::{AudioResourceKind, EqBands};
use smallvec::SmallVec;
use transport::MultiArrayBuffer;

/// Bins reported per FFT unit.
pub const SPECTRUM_BINS: usize = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayState {
    #[default]
    NotPlaying,
    Playing,
    Paused,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelState {
    pub play_state: PlayState,
    pub position_ms: u32,
    pub pitch: f32,
    pub volume: f32,
    pub frequency: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroupState {
    pub play_state: PlayState,
    pub pitch: f32,
    pub volume: f32,
    pub muted: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoundFileInfo {
    pub length_ms: u32,
}

pub type Spectrum = SmallVec<[f32; SPECTRUM_BINS]>;

/// Snapshot of one slot, polled from the backend after each drain.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AudioState {
    /// No resource created yet, or released.
    #[default]
    Vacant,
    /// The backend refused to create the resource.
    Failed(AudioResourceKind),
    Sound(SoundFileInfo),
    Channel(ChannelState),
    Group(GroupState),
    Spectrum(Spectrum),
    Eq(EqBands),
    Gain(f32),
}

impl AudioState {
    pub fn kind(&self) -> AudioResourceKind {
        match self {
            AudioState::Vacant => AudioResourceKind::None,
            AudioState::Failed(kind) => *kind,
            AudioState::Sound(_) => AudioResourceKind::Sound,
            AudioState::Channel(_) => AudioResourceKind::Channel,
            AudioState::Group(_) => AudioResourceKind::Group,
            AudioState::Spectrum(_) => AudioResourceKind::DspFft,
            AudioState::Eq(_) => AudioResourceKind::DspEq,
            AudioState::Gain(_) => AudioResourceKind::DspGain,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct AudioShared {
    pub(crate) states: MultiArrayBuffer<AudioState>,
}
