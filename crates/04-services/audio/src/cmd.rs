//! Audio command records.

/// What a slot holds on the audio thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AudioResourceKind {
    #[default]
    None,
    Sound,
    Channel,
    Group,
    DspFft,
    DspEq,
    DspGain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DspKind {
    Fft,
    ThreeBandEq,
    Gain,
}

impl DspKind {
    pub fn resource_kind(self) -> AudioResourceKind {
        match self {
            DspKind::Fft => AudioResourceKind::DspFft,
            DspKind::ThreeBandEq => AudioResourceKind::DspEq,
            DspKind::Gain => AudioResourceKind::DspGain,
        }
    }
}

/// Gains for the low, mid and high bands of an EQ unit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EqBands {
    pub low: f32,
    pub med: f32,
    pub high: f32,
}

/// One record in the audio command stream.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioCmd {
    CreateStream { slot: u32, filename: String },
    CreateSound { slot: u32, filename: String },
    CreateGroup { slot: u32 },
    CreateChannelForSound { slot: u32, sound: u32 },
    Release { slot: u32 },

    AddChannelToGroup { channel: u32, group: u32 },
    AddDspToGroup { slot: u32, group: u32, dsp: DspKind },

    ChannelSetPosition { channel: u32, position_ms: u32 },
    ChannelSetFrequency { channel: u32, frequency: f32 },
    ChannelStop { channel: u32 },

    GroupSetPause { group: u32, paused: bool },
    GroupSetMute { group: u32, muted: bool },
    GroupSetPitch { group: u32, pitch: f32 },
    GroupSetVolume { group: u32, volume: f32 },

    DspSetThreeBandEq { dsp: u32, bands: EqBands },
    DspSetGain { dsp: u32, gain: f32 },
}
