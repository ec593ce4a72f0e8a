//! Producer-side audio API.

use crate::cmd::{AudioCmd, DspKind, EqBands};
use crate::state::{AudioShared, AudioState, ChannelState, GroupState, SoundFileInfo, Spectrum};
use dispatch::{CommandQueue, QueryError, QueryResult};
use std::collections::HashSet;
use std::sync::Arc;
use transport::{RingConsumer, SlotAllocator, NULL_SLOT};

pub struct AudioContext {
    queue: CommandQueue<AudioCmd>,
    slots: SlotAllocator,
    returned: RingConsumer<u32>,
    releasing: HashSet<u32>,
    shared: Arc<AudioShared>,
    wait_for_continue: bool,
}

impl AudioContext {
    pub(crate) fn new(
        queue: CommandQueue<AudioCmd>,
        returned: RingConsumer<u32>,
        shared: Arc<AudioShared>,
        initial_slots: u32,
        wait_for_continue: bool,
    ) -> Self {
        Self {
            queue,
            slots: SlotAllocator::new(initial_slots),
            returned,
            releasing: HashSet::new(),
            shared,
            wait_for_continue,
        }
    }

    /// Lets the audio thread drain what has been queued so far.
    ///
    /// With `wait_for_continue` set this blocks until the audio thread has
    /// picked the batch up, which keeps a fast producer from running ahead.
    pub fn consume(&self) {
        if self.wait_for_continue {
            self.queue.kick_and_wait();
        } else {
            self.queue.kick();
        }
    }

    /// Slots held by live resources or by releases the audio thread has not
    /// handed back yet.
    pub fn slots_in_use(&self) -> usize {
        self.slots.used_count()
    }

    /// Allocates a slot, first recycling those the audio thread has returned.
    fn allocate(&mut self) -> u32 {
        while let Some(slot) = self.returned.get() {
            self.releasing.remove(&slot);
            if !self.slots.release(slot) {
                log::warn!("audio thread returned slot {slot} that was not in use");
            }
        }
        self.slots.allocate()
    }

    pub fn create_stream(&mut self, filename: &str) -> u32 {
        let slot = self.allocate();
        self.queue.submit(AudioCmd::CreateStream {
            slot,
            filename: filename.to_owned(),
        });
        slot
    }

    pub fn create_sound(&mut self, filename: &str) -> u32 {
        let slot = self.allocate();
        self.queue.submit(AudioCmd::CreateSound {
            slot,
            filename: filename.to_owned(),
        });
        slot
    }

    /// Starts playing `sound` on a new channel. Returns `NULL_SLOT` for a
    /// null sound.
    pub fn create_channel_for_sound(&mut self, sound: u32) -> u32 {
        if sound == NULL_SLOT {
            return NULL_SLOT;
        }
        let slot = self.allocate();
        self.queue
            .submit(AudioCmd::CreateChannelForSound { slot, sound });
        slot
    }

    pub fn create_channel_group(&mut self) -> u32 {
        let slot = self.allocate();
        self.queue.submit(AudioCmd::CreateGroup { slot });
        slot
    }

    pub fn add_dsp_to_group(&mut self, group: u32, dsp: DspKind) -> u32 {
        let slot = self.allocate();
        self.queue
            .submit(AudioCmd::AddDspToGroup { slot, group, dsp });
        slot
    }

    /// Queues the backend release of `slot`.
    ///
    /// Returns `false`, queuing nothing, when the slot is not allocated or is
    /// already being released. The slot becomes reusable once the audio
    /// thread has published its cleared state and handed it back.
    pub fn release_resource(&mut self, slot: u32) -> bool {
        if !self.slots.is_used(slot) || !self.releasing.insert(slot) {
            return false;
        }
        self.queue.submit(AudioCmd::Release { slot });
        true
    }

    pub fn add_channel_to_group(&mut self, channel: u32, group: u32) {
        if channel == NULL_SLOT || group == NULL_SLOT {
            return;
        }
        self.queue
            .submit(AudioCmd::AddChannelToGroup { channel, group });
    }

    pub fn channel_set_position(&mut self, channel: u32, position_ms: u32) {
        self.queue.submit(AudioCmd::ChannelSetPosition {
            channel,
            position_ms,
        });
    }

    pub fn channel_set_frequency(&mut self, channel: u32, frequency: f32) {
        self.queue
            .submit(AudioCmd::ChannelSetFrequency { channel, frequency });
    }

    pub fn channel_stop(&mut self, channel: u32) {
        self.queue.submit(AudioCmd::ChannelStop { channel });
    }

    pub fn group_set_pause(&mut self, group: u32, paused: bool) {
        self.queue.submit(AudioCmd::GroupSetPause { group, paused });
    }

    pub fn group_set_mute(&mut self, group: u32, muted: bool) {
        self.queue.submit(AudioCmd::GroupSetMute { group, muted });
    }

    pub fn group_set_pitch(&mut self, group: u32, pitch: f32) {
        self.queue.submit(AudioCmd::GroupSetPitch { group, pitch });
    }

    pub fn group_set_volume(&mut self, group: u32, volume: f32) {
        self.queue.submit(AudioCmd::GroupSetVolume { group, volume });
    }

    pub fn dsp_set_three_band_eq(&mut self, dsp: u32, low: f32, med: f32, high: f32) {
        self.queue.submit(AudioCmd::DspSetThreeBandEq {
            dsp,
            bands: EqBands { low, med, high },
        });
    }

    pub fn dsp_set_gain(&mut self, dsp: u32, gain: f32) {
        self.queue.submit(AudioCmd::DspSetGain { dsp, gain });
    }

    fn query<T>(&self, slot: u32, pick: impl FnOnce(&AudioState) -> Option<T>) -> QueryResult<T> {
        let front = self.shared.states.frontbuffer();
        match front.get(slot as usize) {
            None | Some(AudioState::Vacant) => Err(QueryError::NotReady),
            Some(AudioState::Failed(_)) => Err(QueryError::Failed),
            Some(state) => pick(state).ok_or(QueryError::Failed),
        }
    }

    pub fn channel_state(&self, channel: u32) -> QueryResult<ChannelState> {
        self.query(channel, |state| match state {
            AudioState::Channel(channel) => Some(*channel),
            _ => None,
        })
    }

    pub fn group_state(&self, group: u32) -> QueryResult<GroupState> {
        self.query(group, |state| match state {
            AudioState::Group(group) => Some(*group),
            _ => None,
        })
    }

    pub fn sound_file_info(&self, sound: u32) -> QueryResult<SoundFileInfo> {
        self.query(sound, |state| match state {
            AudioState::Sound(info) => Some(*info),
            _ => None,
        })
    }

    pub fn spectrum(&self, fft: u32) -> QueryResult<Spectrum> {
        self.query(fft, |state| match state {
            AudioState::Spectrum(bins) => Some(bins.clone()),
            _ => None,
        })
    }

    pub fn three_band_eq(&self, eq: u32) -> QueryResult<EqBands> {
        self.query(eq, |state| match state {
            AudioState::Eq(bands) => Some(*bands),
            _ => None,
        })
    }

    pub fn gain(&self, dsp: u32) -> QueryResult<f32> {
        self.query(dsp, |state| match state {
            AudioState::Gain(gain) => Some(*gain),
            _ => None,
        })
    }
}
