//! Audio-thread side: executes commands and publishes polled state.

use crate::backend::{AudioBackend, AudioBackendResult};
use crate::cmd::{AudioCmd, AudioResourceKind};
use crate::state::{AudioShared, AudioState};
use dispatch::{Executor, Flow};
use std::sync::Arc;
use transport::{ResPool, RingProducer, RingPush};

#[derive(Clone, Copy, Debug, Default)]
struct Entry {
    kind: AudioResourceKind,
    failed: bool,
}

pub struct AudioExecutor<B> {
    backend: B,
    shared: Arc<AudioShared>,
    entries: ResPool<Entry>,
    returned: RingProducer<u32>,
    /// Released this batch; returned once the cleared state is published.
    released: Vec<u32>,
    unreturned: Vec<u32>,
}

impl<B: AudioBackend> AudioExecutor<B> {
    pub(crate) fn new(
        mut backend: B,
        shared: Arc<AudioShared>,
        returned: RingProducer<u32>,
        reserved: usize,
    ) -> Self {
        backend.initialise();
        shared.states.init(reserved);
        Self {
            backend,
            shared,
            entries: ResPool::with_capacity(reserved),
            returned,
            released: Vec::new(),
            unreturned: Vec::new(),
        }
    }

    fn record(&mut self, slot: u32, kind: AudioResourceKind, result: AudioBackendResult) {
        let failed = match result {
            Ok(()) => false,
            Err(err) => {
                log::warn!("audio backend rejected {kind:?} at slot {slot}: {err}");
                true
            }
        };
        self.entries.insert(Entry { kind, failed }, slot);
    }

    /// `true` when `slot` holds a live resource of `kind`.
    fn holds(&self, slot: u32, kind: AudioResourceKind) -> bool {
        self.entries
            .get(slot)
            .map(|entry| entry.kind == kind && !entry.failed)
            .unwrap_or(false)
    }

    fn check(&self, slot: u32, kind: AudioResourceKind) -> bool {
        let ok = self.holds(slot, kind);
        if !ok {
            log::warn!("audio command for slot {slot} expects a live {kind:?}; ignored");
        }
        ok
    }

    /// Returns `false` when the slot held nothing.
    fn release(&mut self, slot: u32) -> bool {
        let entry = self.entries.take(slot).unwrap_or_default();
        match entry {
            Entry {
                kind: AudioResourceKind::None,
                ..
            } => {
                log::debug!("release of empty audio slot {slot}");
                return false;
            }
            Entry { failed: true, .. } => {}
            Entry { kind, .. } => self.backend.release(kind, slot),
        }
        true
    }

    fn return_released(&mut self) {
        let pending = std::mem::take(&mut self.unreturned);
        for slot in pending.into_iter().chain(self.released.drain(..)) {
            if let RingPush::WouldBlock(slot) = self.returned.try_put(slot) {
                self.unreturned.push(slot);
            }
        }
    }

    fn publish(&mut self) {
        {
            let mut back = self.shared.states.backbuffer();
            back.clear();
            back.extend(self.entries.iter().map(|(slot, entry)| match entry {
                Entry {
                    kind: AudioResourceKind::None,
                    ..
                } => AudioState::Vacant,
                Entry { kind, failed: true } => AudioState::Failed(*kind),
                Entry { kind, .. } => self.backend.poll(slot, *kind),
            }));
        }
        self.shared.states.swap_buffers();
        self.return_released();
    }
}

impl<B: AudioBackend> Executor for AudioExecutor<B> {
    type Cmd = AudioCmd;

    fn execute(&mut self, cmd: AudioCmd) -> Flow {
        use AudioResourceKind as Kind;

        match cmd {
            AudioCmd::CreateStream { slot, filename } => {
                let result = self.backend.create_stream(slot, &filename);
                self.record(slot, Kind::Sound, result);
            }
            AudioCmd::CreateSound { slot, filename } => {
                let result = self.backend.create_sound(slot, &filename);
                self.record(slot, Kind::Sound, result);
            }
            AudioCmd::CreateGroup { slot } => {
                let result = self.backend.create_group(slot);
                self.record(slot, Kind::Group, result);
            }
            AudioCmd::CreateChannelForSound { slot, sound } => {
                let result = self.backend.create_channel_for_sound(slot, sound);
                self.record(slot, Kind::Channel, result);
            }
            AudioCmd::Release { slot } => {
                if self.release(slot) {
                    self.released.push(slot);
                }
            }
            AudioCmd::AddChannelToGroup { channel, group } => {
                if self.check(channel, Kind::Channel) && self.check(group, Kind::Group) {
                    self.backend.add_channel_to_group(channel, group);
                }
            }
            AudioCmd::AddDspToGroup { slot, group, dsp } => {
                let result = self.backend.add_dsp_to_group(slot, group, dsp);
                self.record(slot, dsp.resource_kind(), result);
            }
            AudioCmd::ChannelSetPosition {
                channel,
                position_ms,
            } => {
                if self.check(channel, Kind::Channel) {
                    self.backend.channel_set_position(channel, position_ms);
                }
            }
            AudioCmd::ChannelSetFrequency { channel, frequency } => {
                if self.check(channel, Kind::Channel) {
                    self.backend.channel_set_frequency(channel, frequency);
                }
            }
            AudioCmd::ChannelStop { channel } => {
                if self.check(channel, Kind::Channel) {
                    self.backend.channel_stop(channel);
                }
            }
            AudioCmd::GroupSetPause { group, paused } => {
                if self.check(group, Kind::Group) {
                    self.backend.group_set_pause(group, paused);
                }
            }
            AudioCmd::GroupSetMute { group, muted } => {
                if self.check(group, Kind::Group) {
                    self.backend.group_set_mute(group, muted);
                }
            }
            AudioCmd::GroupSetPitch { group, pitch } => {
                if self.check(group, Kind::Group) {
                    self.backend.group_set_pitch(group, pitch);
                }
            }
            AudioCmd::GroupSetVolume { group, volume } => {
                if self.check(group, Kind::Group) {
                    self.backend.group_set_volume(group, volume);
                }
            }
            AudioCmd::DspSetThreeBandEq { dsp, bands } => {
                if self.check(dsp, Kind::DspEq) {
                    self.backend.dsp_set_three_band_eq(dsp, bands);
                }
            }
            AudioCmd::DspSetGain { dsp, gain } => {
                if self.check(dsp, Kind::DspGain) {
                    self.backend.dsp_set_gain(dsp, gain);
                }
            }
        }
        Flow::Continue
    }

    fn update(&mut self) {
        self.backend.update();
        self.publish();
    }

    fn shutdown(&mut self) {
        let live: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.kind != AudioResourceKind::None)
            .map(|(slot, _)| slot)
            .collect();
        log::debug!("audio executor releasing {} live resources", live.len());
        for slot in live {
            self.release(slot);
        }
        self.backend.shutdown();
    }
}
