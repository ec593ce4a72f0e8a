//! Deterministic in-memory audio engine.
//!
//! Sounds come from a registered library of file names and lengths. Every
//! `update` advances playing channels by a fixed tick scaled by their group's
//! pitch, so tests can reason about positions without a clock.

use crate::backend::{AudioBackend, AudioBackendError, AudioBackendResult};
use crate::cmd::{AudioResourceKind, DspKind, EqBands};
use crate::state::{
    AudioState, ChannelState, GroupState, PlayState, SoundFileInfo, Spectrum, SPECTRUM_BINS,
};
use std::collections::HashMap;
use transport::{ResPool, NULL_SLOT};

const DEFAULT_FREQUENCY: f32 = 44_100.0;
const DEFAULT_TICK_MS: u32 = 10;

#[derive(Clone, Debug)]
struct Sound {
    length_ms: u32,
    looping: bool,
}

#[derive(Clone, Debug)]
struct Channel {
    length_ms: u32,
    looping: bool,
    position_ms: u32,
    frequency: f32,
    playing: bool,
    group: u32,
}

#[derive(Clone, Debug)]
struct Group {
    pitch: f32,
    volume: f32,
    paused: bool,
    muted: bool,
}

#[derive(Clone, Debug)]
enum Dsp {
    Fft { group: u32 },
    Eq(EqBands),
    Gain(f32),
}

#[derive(Clone, Debug, Default)]
enum SimObject {
    #[default]
    Vacant,
    Sound(Sound),
    Channel(Channel),
    Group(Group),
    Dsp(Dsp),
}

#[derive(Debug)]
pub struct SimulatedAudioBackend {
    library: HashMap<String, u32>,
    objects: ResPool<SimObject>,
    tick_ms: u32,
    updates: u64,
}

impl Default for SimulatedAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAudioBackend {
    pub fn new() -> Self {
        Self {
            library: HashMap::new(),
            objects: ResPool::with_capacity(128),
            tick_ms: DEFAULT_TICK_MS,
            updates: 0,
        }
    }

    /// Registers a file that `create_sound`/`create_stream` can open.
    pub fn with_sound(mut self, filename: impl Into<String>, length_ms: u32) -> Self {
        self.library.insert(filename.into(), length_ms);
        self
    }

    /// Milliseconds of playback per `update` at pitch 1.0.
    pub fn with_tick_ms(mut self, tick_ms: u32) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    fn open(&mut self, slot: u32, filename: &str, looping: bool) -> AudioBackendResult {
        let Some(&length_ms) = self.library.get(filename) else {
            return Err(AudioBackendError::NotFound {
                filename: filename.to_owned(),
            });
        };
        *self.objects.get_or_grow(slot) = SimObject::Sound(Sound { length_ms, looping });
        Ok(())
    }

    fn group(&self, slot: u32) -> Option<&Group> {
        match self.objects.get(slot) {
            Some(SimObject::Group(group)) => Some(group),
            _ => None,
        }
    }

    fn group_mut(&mut self, slot: u32) -> Option<&mut Group> {
        match self.objects.get_mut(slot) {
            Some(SimObject::Group(group)) => Some(group),
            _ => None,
        }
    }

    fn channel_mut(&mut self, slot: u32) -> Option<&mut Channel> {
        match self.objects.get_mut(slot) {
            Some(SimObject::Channel(channel)) => Some(channel),
            _ => None,
        }
    }

    fn channels_in(&self, group: u32) -> impl Iterator<Item = &Channel> {
        self.objects.iter().filter_map(move |(_, object)| match object {
            SimObject::Channel(channel) if channel.group == group => Some(channel),
            _ => None,
        })
    }

    fn channel_state(&self, channel: &Channel) -> ChannelState {
        let group = self.group(channel.group);
        let paused = group.map(|g| g.paused).unwrap_or(false);
        let play_state = match (channel.playing, paused) {
            (false, _) => PlayState::NotPlaying,
            (true, true) => PlayState::Paused,
            (true, false) => PlayState::Playing,
        };
        ChannelState {
            play_state,
            position_ms: channel.position_ms,
            pitch: group.map(|g| g.pitch).unwrap_or(1.0),
            volume: group.map(|g| g.volume).unwrap_or(1.0),
            frequency: channel.frequency,
        }
    }

    fn group_state(&self, slot: u32, group: &Group) -> GroupState {
        let playing = self.channels_in(slot).any(|c| c.playing);
        let play_state = match (playing, group.paused) {
            (false, _) => PlayState::NotPlaying,
            (true, true) => PlayState::Paused,
            (true, false) => PlayState::Playing,
        };
        GroupState {
            play_state,
            pitch: group.pitch,
            volume: group.volume,
            muted: group.muted,
        }
    }

    fn spectrum(&self, group_slot: u32) -> Spectrum {
        let mut bins = Spectrum::from_elem(0.0, SPECTRUM_BINS);
        let Some(group) = self.group(group_slot) else {
            return bins;
        };
        if group.paused || group.muted {
            return bins;
        }
        let voices = self.channels_in(group_slot).filter(|c| c.playing).count() as f32;
        for (i, bin) in bins.iter_mut().enumerate() {
            *bin = voices * group.volume / (i + 1) as f32;
        }
        bins
    }
}

impl AudioBackend for SimulatedAudioBackend {
    fn initialise(&mut self) {
        log::debug!(
            "simulated audio engine up with {} registered sounds",
            self.library.len()
        );
    }

    fn create_stream(&mut self, slot: u32, filename: &str) -> AudioBackendResult {
        self.open(slot, filename, true)
    }

    fn create_sound(&mut self, slot: u32, filename: &str) -> AudioBackendResult {
        self.open(slot, filename, false)
    }

    fn create_group(&mut self, slot: u32) -> AudioBackendResult {
        *self.objects.get_or_grow(slot) = SimObject::Group(Group {
            pitch: 1.0,
            volume: 1.0,
            paused: false,
            muted: false,
        });
        Ok(())
    }

    fn create_channel_for_sound(&mut self, slot: u32, sound: u32) -> AudioBackendResult {
        let Some(SimObject::Sound(source)) = self.objects.get(sound) else {
            return Err(AudioBackendError::WrongKind {
                slot: sound,
                expected: AudioResourceKind::Sound,
            });
        };
        let channel = Channel {
            length_ms: source.length_ms,
            looping: source.looping,
            position_ms: 0,
            frequency: DEFAULT_FREQUENCY,
            playing: true,
            group: NULL_SLOT,
        };
        *self.objects.get_or_grow(slot) = SimObject::Channel(channel);
        Ok(())
    }

    fn add_dsp_to_group(&mut self, slot: u32, group: u32, dsp: DspKind) -> AudioBackendResult {
        if self.group(group).is_none() {
            return Err(AudioBackendError::WrongKind {
                slot: group,
                expected: AudioResourceKind::Group,
            });
        }
        let unit = match dsp {
            DspKind::Fft => Dsp::Fft { group },
            DspKind::ThreeBandEq => Dsp::Eq(EqBands::default()),
            DspKind::Gain => Dsp::Gain(1.0),
        };
        *self.objects.get_or_grow(slot) = SimObject::Dsp(unit);
        Ok(())
    }

    fn release(&mut self, kind: AudioResourceKind, slot: u32) {
        if let Some(object) = self.objects.take(slot) {
            log::trace!("released {kind:?} at slot {slot}: {object:?}");
        }
    }

    fn add_channel_to_group(&mut self, channel: u32, group: u32) {
        if let Some(channel) = self.channel_mut(channel) {
            channel.group = group;
        }
    }

    fn channel_set_position(&mut self, channel: u32, position_ms: u32) {
        if let Some(channel) = self.channel_mut(channel) {
            channel.position_ms = position_ms.min(channel.length_ms);
        }
    }

    fn channel_set_frequency(&mut self, channel: u32, frequency: f32) {
        if let Some(channel) = self.channel_mut(channel) {
            channel.frequency = frequency;
        }
    }

    fn channel_stop(&mut self, channel: u32) {
        if let Some(channel) = self.channel_mut(channel) {
            channel.playing = false;
        }
    }

    fn group_set_pause(&mut self, group: u32, paused: bool) {
        if let Some(group) = self.group_mut(group) {
            group.paused = paused;
        }
    }

    fn group_set_mute(&mut self, group: u32, muted: bool) {
        if let Some(group) = self.group_mut(group) {
            group.muted = muted;
        }
    }

    fn group_set_pitch(&mut self, group: u32, pitch: f32) {
        if let Some(group) = self.group_mut(group) {
            group.pitch = pitch;
        }
    }

    fn group_set_volume(&mut self, group: u32, volume: f32) {
        if let Some(group) = self.group_mut(group) {
            group.volume = volume;
        }
    }

    fn dsp_set_three_band_eq(&mut self, dsp: u32, bands: EqBands) {
        if let Some(SimObject::Dsp(Dsp::Eq(current))) = self.objects.get_mut(dsp) {
            *current = bands;
        }
    }

    fn dsp_set_gain(&mut self, dsp: u32, gain: f32) {
        if let Some(SimObject::Dsp(Dsp::Gain(current))) = self.objects.get_mut(dsp) {
            *current = gain;
        }
    }

    fn update(&mut self) {
        self.updates += 1;
        let steps: Vec<(u32, u32)> = self
            .objects
            .iter()
            .filter_map(|(slot, object)| match object {
                SimObject::Channel(channel) if channel.playing => {
                    let group = self.group(channel.group);
                    if group.map(|g| g.paused).unwrap_or(false) {
                        return None;
                    }
                    let pitch = group.map(|g| g.pitch).unwrap_or(1.0).max(0.0);
                    Some((slot, (self.tick_ms as f32 * pitch) as u32))
                }
                _ => None,
            })
            .collect();

        for (slot, step) in steps {
            let Some(channel) = self.channel_mut(slot) else {
                continue;
            };
            let position = channel.position_ms.saturating_add(step);
            if position < channel.length_ms {
                channel.position_ms = position;
            } else if channel.looping && channel.length_ms > 0 {
                channel.position_ms = position % channel.length_ms;
            } else {
                channel.position_ms = channel.length_ms;
                channel.playing = false;
            }
        }
    }

    fn poll(&self, slot: u32, kind: AudioResourceKind) -> AudioState {
        match (self.objects.get(slot), kind) {
            (Some(SimObject::Sound(sound)), AudioResourceKind::Sound) => {
                AudioState::Sound(SoundFileInfo {
                    length_ms: sound.length_ms,
                })
            }
            (Some(SimObject::Channel(channel)), AudioResourceKind::Channel) => {
                AudioState::Channel(self.channel_state(channel))
            }
            (Some(SimObject::Group(group)), AudioResourceKind::Group) => {
                AudioState::Group(self.group_state(slot, group))
            }
            (Some(SimObject::Dsp(Dsp::Fft { group })), AudioResourceKind::DspFft) => {
                AudioState::Spectrum(self.spectrum(*group))
            }
            (Some(SimObject::Dsp(Dsp::Eq(bands))), AudioResourceKind::DspEq) => {
                AudioState::Eq(*bands)
            }
            (Some(SimObject::Dsp(Dsp::Gain(gain))), AudioResourceKind::DspGain) => {
                AudioState::Gain(*gain)
            }
            _ => AudioState::Vacant,
        }
    }

    fn shutdown(&mut self) {
        log::debug!("simulated audio engine down after {} updates", self.updates);
    }
}
