//! Render-thread side: executes commands, defers releases, publishes state.

use crate::backend::{BackendResult, RenderBackend};
use crate::cmd::{RenderCmd, ResourceKind};
use crate::state::{FrameStats, RenderShared, ResourceInfo, ResourceState};
use dispatch::{Executor, Flow};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use transport::{ResPool, RingProducer, RingPush};

#[derive(Clone, Copy, Debug)]
struct PendingRelease {
    kind: ResourceKind,
    slot: u32,
    frame: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct FrameCounters {
    commands: u64,
    draw_calls: u64,
    releases: u64,
}

pub struct RenderExecutor<B> {
    backend: B,
    shared: Arc<RenderShared>,
    resources: ResPool<ResourceInfo>,
    live: usize,
    deferred: VecDeque<PendingRelease>,
    release_latency: u64,
    returned: RingProducer<u32>,
    unreturned: Vec<u32>,
    frame: u64,
    frame_started: Instant,
    counters: FrameCounters,
}

impl<B: RenderBackend> RenderExecutor<B> {
    pub(crate) fn new(
        backend: B,
        shared: Arc<RenderShared>,
        returned: RingProducer<u32>,
        release_latency: u64,
        reserved_slots: usize,
    ) -> Self {
        Self {
            backend,
            shared,
            resources: ResPool::with_capacity(reserved_slots),
            live: 0,
            deferred: VecDeque::with_capacity(returned.capacity()),
            release_latency,
            returned,
            unreturned: Vec::new(),
            frame: 0,
            frame_started: Instant::now(),
            counters: FrameCounters::default(),
        }
    }

    fn record(&mut self, slot: u32, info: ResourceInfo, result: BackendResult) {
        let info = match result {
            Ok(()) => {
                self.live += 1;
                ResourceInfo {
                    state: ResourceState::Ready,
                    created_frame: self.frame,
                    ..info
                }
            }
            Err(err) => {
                log::warn!("render backend rejected {:?} at slot {slot}: {err}", info.kind);
                ResourceInfo {
                    state: ResourceState::Failed,
                    created_frame: self.frame,
                    ..info
                }
            }
        };
        self.resources.insert(info, slot);
    }

    fn release_now(&mut self, pending: PendingRelease) {
        let info = self.resources.take(pending.slot).unwrap_or_default();
        if info.state == ResourceState::Vacant {
            log::debug!("slot {} already released; skipping", pending.slot);
            return;
        }
        if info.kind != pending.kind {
            log::warn!(
                "slot {} released as {:?} but holds {:?}",
                pending.slot,
                pending.kind,
                info.kind
            );
        }
        if info.state == ResourceState::Ready {
            self.backend.release(info.kind, pending.slot);
            self.live -= 1;
        }
        self.counters.releases += 1;
        self.return_slot(pending.slot);
    }

    fn return_slot(&mut self, slot: u32) {
        if let RingPush::WouldBlock(slot) = self.returned.try_put(slot) {
            self.unreturned.push(slot);
        }
    }

    fn flush_unreturned(&mut self) {
        let pending = std::mem::take(&mut self.unreturned);
        for slot in pending {
            self.return_slot(slot);
        }
    }

    fn run_deferred_releases(&mut self) {
        while let Some(front) = self.deferred.front() {
            if self.frame.saturating_sub(front.frame) < self.release_latency {
                break;
            }
            if let Some(pending) = self.deferred.pop_front() {
                self.release_now(pending);
            }
        }
    }

    fn publish(&mut self) {
        *self.shared.frame_stats.backbuffer() = FrameStats {
            frame: self.frame,
            commands: self.counters.commands,
            draw_calls: self.counters.draw_calls,
            releases: self.counters.releases,
            live_resources: self.live,
            frame_micros: self.frame_started.elapsed().as_micros() as u64,
        };
        self.shared.frame_stats.swap_buffers();

        {
            let mut back = self.shared.resources.backbuffer();
            back.clear();
            back.extend(self.resources.iter().map(|(_, info)| *info));
        }
        self.shared.resources.swap_buffers();
        self.counters = FrameCounters::default();
    }

    fn end_frame(&mut self) {
        self.backend.present();
        self.flush_unreturned();
        self.run_deferred_releases();
        self.publish();
    }
}

fn sized(kind: ResourceKind, byte_size: usize, width: u32, height: u32) -> ResourceInfo {
    ResourceInfo {
        kind,
        byte_size,
        width,
        height,
        ..ResourceInfo::default()
    }
}

fn plain(kind: ResourceKind) -> ResourceInfo {
    sized(kind, 0, 0, 0)
}

impl<B: RenderBackend> Executor for RenderExecutor<B> {
    type Cmd = RenderCmd;

    fn execute(&mut self, cmd: RenderCmd) -> Flow {
        self.counters.commands += 1;
        match cmd {
            RenderCmd::NewFrame { frame } => {
                self.frame = frame;
                self.frame_started = Instant::now();
                self.backend.new_frame(frame);
            }
            RenderCmd::Present => {
                self.end_frame();
                return Flow::EndBatch;
            }
            RenderCmd::LoadShader { slot, desc } => {
                let result = self.backend.create_shader(slot, &desc);
                let info = sized(ResourceKind::Shader, desc.byte_code.len(), 0, 0);
                self.record(slot, info, result);
            }
            RenderCmd::SetShader { slot, stage } => self.backend.set_shader(slot, stage),
            RenderCmd::CreateBuffer { slot, desc } => {
                let result = self.backend.create_buffer(slot, &desc);
                self.record(slot, sized(ResourceKind::Buffer, desc.byte_size, 0, 0), result);
            }
            RenderCmd::UpdateBuffer { slot, offset, data } => {
                if let Err(err) = self.backend.update_buffer(slot, offset, &data) {
                    log::warn!("buffer update on slot {slot} failed: {err}");
                }
            }
            RenderCmd::SetVertexBuffers { bindings } => self.backend.set_vertex_buffers(&bindings),
            RenderCmd::SetIndexBuffer {
                slot,
                format,
                offset,
            } => self.backend.set_index_buffer(slot, format, offset),
            RenderCmd::SetConstantBuffer { slot, unit, stage } => {
                self.backend.set_constant_buffer(slot, unit, stage)
            }
            RenderCmd::CreateTexture { slot, desc } => {
                let result = self.backend.create_texture(slot, &desc);
                let bytes = desc.width as usize
                    * desc.height as usize
                    * desc.format.bytes_per_texel();
                let info = sized(ResourceKind::Texture, bytes, desc.width, desc.height);
                self.record(slot, info, result);
            }
            RenderCmd::CreateSampler { slot, desc } => {
                let result = self.backend.create_sampler(slot, &desc);
                self.record(slot, plain(ResourceKind::Sampler), result);
            }
            RenderCmd::SetTexture {
                texture,
                sampler,
                unit,
                stage,
            } => self.backend.set_texture(texture, sampler, unit, stage),
            RenderCmd::CreateRasterState { slot, desc } => {
                let result = self.backend.create_raster_state(slot, &desc);
                self.record(slot, plain(ResourceKind::RasterState), result);
            }
            RenderCmd::SetRasterState { slot } => self.backend.set_raster_state(slot),
            RenderCmd::CreateBlendState { slot, desc } => {
                let result = self.backend.create_blend_state(slot, &desc);
                self.record(slot, plain(ResourceKind::BlendState), result);
            }
            RenderCmd::SetBlendState { slot } => self.backend.set_blend_state(slot),
            RenderCmd::CreateDepthStencilState { slot, desc } => {
                let result = self.backend.create_depth_stencil_state(slot, &desc);
                self.record(slot, plain(ResourceKind::DepthStencilState), result);
            }
            RenderCmd::SetDepthStencilState { slot } => self.backend.set_depth_stencil_state(slot),
            RenderCmd::SetStencilRef { value } => self.backend.set_stencil_ref(value),
            RenderCmd::CreateClearState { slot, desc } => {
                let result = self.backend.create_clear_state(slot, &desc);
                self.record(slot, plain(ResourceKind::ClearState), result);
            }
            RenderCmd::Clear { slot } => self.backend.clear(slot),
            RenderCmd::CreateRenderTarget { slot, desc } => {
                let result = self.backend.create_render_target(slot, &desc);
                let bytes = desc.width as usize
                    * desc.height as usize
                    * desc.format.bytes_per_texel()
                    * desc.samples.max(1) as usize;
                let info = sized(ResourceKind::RenderTarget, bytes, desc.width, desc.height);
                self.record(slot, info, result);
            }
            RenderCmd::SetTargets { colour, depth } => self.backend.set_targets(&colour, depth),
            RenderCmd::SetViewport(viewport) => self.backend.set_viewport(&viewport),
            RenderCmd::SetScissorRect(rect) => self.backend.set_scissor_rect(&rect),
            RenderCmd::Draw {
                vertex_count,
                start_vertex,
                topology,
            } => {
                self.counters.draw_calls += 1;
                self.backend.draw(vertex_count, start_vertex, topology);
            }
            RenderCmd::DrawIndexed {
                index_count,
                start_index,
                base_vertex,
                topology,
            } => {
                self.counters.draw_calls += 1;
                self.backend
                    .draw_indexed(index_count, start_index, base_vertex, topology);
            }
            RenderCmd::DrawIndexedInstanced {
                instance_count,
                start_instance,
                index_count,
                start_index,
                base_vertex,
                topology,
            } => {
                self.counters.draw_calls += 1;
                self.backend.draw_indexed_instanced(
                    instance_count,
                    start_instance,
                    index_count,
                    start_index,
                    base_vertex,
                    topology,
                );
            }
            RenderCmd::DispatchCompute { groups } => self.backend.dispatch_compute(groups),
            RenderCmd::PushPerfMarker { name } => self.backend.push_perf_marker(&name),
            RenderCmd::PopPerfMarker => self.backend.pop_perf_marker(),
            RenderCmd::Release { kind, slot, frame } => {
                self.deferred.push_back(PendingRelease { kind, slot, frame });
            }
        }
        Flow::Continue
    }

    fn shutdown(&mut self) {
        log::debug!(
            "render executor shutting down; flushing {} deferred releases",
            self.deferred.len()
        );
        while let Some(pending) = self.deferred.pop_front() {
            self.release_now(pending);
        }

        // Never released by the producer; their slots die with it.
        let live: Vec<(u32, ResourceKind)> = self
            .resources
            .iter()
            .filter(|(_, info)| info.state == ResourceState::Ready)
            .map(|(slot, info)| (slot, info.kind))
            .collect();
        log::debug!("render executor releasing {} live resources", live.len());
        for (slot, kind) in live {
            self.resources.take(slot);
            self.backend.release(kind, slot);
            self.live -= 1;
        }
        self.backend.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{BufferDesc, BufferUsage, Topology};
    use crate::headless::HeadlessBackend;
    use transport::{CmdRing, RingConsumer};

    fn executor(latency: u64) -> (RenderExecutor<HeadlessBackend>, RingConsumer<u32>) {
        let (returned, freed) = CmdRing::with_capacity(2).expect("ring").split();
        let shared = Arc::new(RenderShared::default());
        let executor = RenderExecutor::new(HeadlessBackend::new(), shared, returned, latency, 16);
        (executor, freed)
    }

    fn buffer(slot: u32) -> RenderCmd {
        RenderCmd::CreateBuffer {
            slot,
            desc: BufferDesc {
                usage: BufferUsage::Constant,
                byte_size: 64,
                data: Vec::new(),
            },
        }
    }

    fn run_frame(exec: &mut RenderExecutor<HeadlessBackend>, frame: u64, cmds: Vec<RenderCmd>) {
        exec.execute(RenderCmd::NewFrame { frame });
        for cmd in cmds {
            assert_eq!(exec.execute(cmd), Flow::Continue);
        }
        assert_eq!(exec.execute(RenderCmd::Present), Flow::EndBatch);
    }

    #[test]
    fn release_waits_for_latency_frames() {
        let (mut exec, mut freed) = executor(2);
        run_frame(&mut exec, 1, vec![buffer(1)]);
        run_frame(
            &mut exec,
            2,
            vec![RenderCmd::Release {
                kind: ResourceKind::Buffer,
                slot: 1,
                frame: 2,
            }],
        );
        assert_eq!(freed.get(), None);
        run_frame(&mut exec, 3, vec![]);
        assert_eq!(freed.get(), None);
        assert_eq!(exec.shared.frame_stats.frontbuffer().live_resources, 1);

        run_frame(&mut exec, 4, vec![]);
        assert_eq!(freed.get(), Some(1));
        let stats = *exec.shared.frame_stats.frontbuffer();
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.live_resources, 0);
        assert_eq!(
            exec.shared.resources.frontbuffer()[1].state,
            ResourceState::Vacant
        );
    }

    #[test]
    fn full_return_ring_keeps_slots_until_space() {
        let (mut exec, mut freed) = executor(0);
        run_frame(&mut exec, 1, (1..=3).map(buffer).collect());
        let releases = (1..=3)
            .map(|slot| RenderCmd::Release {
                kind: ResourceKind::Buffer,
                slot,
                frame: 1,
            })
            .collect();
        run_frame(&mut exec, 2, releases);
        assert_eq!(freed.get(), Some(1));
        assert_eq!(freed.get(), Some(2));
        assert_eq!(freed.get(), None);

        run_frame(&mut exec, 3, vec![]);
        assert_eq!(freed.get(), Some(3));
    }

    #[test]
    fn frame_stats_count_draws_and_commands() {
        let (mut exec, _freed) = executor(6);
        let draw = || RenderCmd::Draw {
            vertex_count: 3,
            start_vertex: 0,
            topology: Topology::TriangleList,
        };
        run_frame(&mut exec, 7, vec![draw(), draw()]);
        let stats = *exec.shared.frame_stats.frontbuffer();
        assert_eq!(stats.frame, 7);
        assert_eq!(stats.draw_calls, 2);
        // NewFrame, two draws and Present.
        assert_eq!(stats.commands, 4);
    }

    #[test]
    fn rejected_creation_is_published_as_failed() {
        let (mut exec, _freed) = executor(6);
        run_frame(
            &mut exec,
            1,
            vec![RenderCmd::CreateBuffer {
                slot: 2,
                desc: BufferDesc {
                    usage: BufferUsage::Vertex,
                    byte_size: 0,
                    data: Vec::new(),
                },
            }],
        );
        let info = exec.shared.resources.frontbuffer()[2];
        assert_eq!(info.state, ResourceState::Failed);
        assert_eq!(info.kind, ResourceKind::Buffer);
    }

    #[test]
    fn shutdown_flushes_deferred_releases_and_live_resources() {
        let (mut exec, mut freed) = executor(100);
        run_frame(&mut exec, 1, vec![buffer(1), buffer(2), buffer(3)]);
        exec.execute(RenderCmd::Release {
            kind: ResourceKind::Buffer,
            slot: 1,
            frame: 1,
        });
        assert_eq!(exec.backend.stats().live_objects, 3);

        exec.shutdown();
        assert_eq!(freed.get(), Some(1));
        assert_eq!(freed.get(), None);
        assert_eq!(exec.backend.stats().live_objects, 0);
        assert_eq!(exec.live, 0);
    }
}
