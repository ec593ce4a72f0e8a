//! Producer-side render API.
//!
//! Every `create_*` call allocates a slot, queues the creation and returns the
//! slot immediately; the render thread builds the object later. `present`
//! ends the frame and blocks until the render thread has executed it, which
//! caps the producer at one frame ahead of the GPU thread.

use crate::cmd::{
    BlendDesc, BufferDesc, ClearDesc, ColourTargets, DepthStencilDesc, IndexFormat, RasterDesc,
    RenderCmd, RenderTargetDesc, ResourceKind, SamplerDesc, ScissorRect, ShaderDesc, ShaderStage,
    TextureDesc, Topology, VertexBinding, VertexBindings, Viewport,
};
use crate::state::{FrameStats, RenderShared, ResourceInfo, ResourceState};
use dispatch::{CommandQueue, QueryError, QueryResult, Status};
use std::collections::HashSet;
use std::sync::Arc;
use transport::{RingConsumer, SlotAllocator, NULL_SLOT};

pub struct RenderContext {
    queue: CommandQueue<RenderCmd>,
    slots: SlotAllocator,
    returned: RingConsumer<u32>,
    releasing: HashSet<u32>,
    shared: Arc<RenderShared>,
    frame: u64,
}

impl RenderContext {
    pub(crate) fn new(
        queue: CommandQueue<RenderCmd>,
        returned: RingConsumer<u32>,
        shared: Arc<RenderShared>,
        initial_slots: u32,
    ) -> Self {
        Self {
            queue,
            slots: SlotAllocator::new(initial_slots),
            returned,
            releasing: HashSet::new(),
            shared,
            frame: 0,
        }
    }

    /// Index of the frame currently being recorded.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn slots_in_use(&self) -> usize {
        self.slots.used_count()
    }

    /// Starts a new frame, first recycling slots the render thread has
    /// finished releasing.
    pub fn new_frame(&mut self) {
        while let Some(slot) = self.returned.get() {
            self.releasing.remove(&slot);
            if !self.slots.release(slot) {
                log::warn!("render thread returned slot {slot} that was not in use");
            }
        }
        self.frame += 1;
        self.queue.submit(RenderCmd::NewFrame { frame: self.frame });
    }

    /// Ends the frame and waits for the render thread to present it.
    pub fn present(&mut self) {
        self.queue.submit(RenderCmd::Present);
        self.queue.kick_and_wait();
    }

    fn create(&mut self, build: impl FnOnce(u32) -> RenderCmd) -> u32 {
        let slot = self.slots.allocate();
        self.queue.submit(build(slot));
        slot
    }

    pub fn load_shader(&mut self, desc: ShaderDesc) -> u32 {
        self.create(|slot| RenderCmd::LoadShader { slot, desc })
    }

    pub fn set_shader(&mut self, slot: u32, stage: ShaderStage) {
        self.queue.submit(RenderCmd::SetShader { slot, stage });
    }

    pub fn create_buffer(&mut self, desc: BufferDesc) -> u32 {
        self.create(|slot| RenderCmd::CreateBuffer { slot, desc })
    }

    /// Copies `data` into the command stream; the caller keeps its buffer.
    pub fn update_buffer(&mut self, slot: u32, offset: usize, data: &[u8]) {
        self.queue.submit(RenderCmd::UpdateBuffer {
            slot,
            offset,
            data: data.to_vec(),
        });
    }

    pub fn set_vertex_buffers(&mut self, bindings: &[VertexBinding]) {
        self.queue.submit(RenderCmd::SetVertexBuffers {
            bindings: VertexBindings::from_slice(bindings),
        });
    }

    pub fn set_vertex_buffer(&mut self, buffer: u32, stride: u32, offset: u32) {
        self.set_vertex_buffers(&[VertexBinding {
            buffer,
            stride,
            offset,
        }]);
    }

    pub fn set_index_buffer(&mut self, slot: u32, format: IndexFormat, offset: u32) {
        self.queue.submit(RenderCmd::SetIndexBuffer {
            slot,
            format,
            offset,
        });
    }

    pub fn set_constant_buffer(&mut self, slot: u32, unit: u32, stage: ShaderStage) {
        self.queue
            .submit(RenderCmd::SetConstantBuffer { slot, unit, stage });
    }

    pub fn create_texture(&mut self, desc: TextureDesc) -> u32 {
        self.create(|slot| RenderCmd::CreateTexture { slot, desc })
    }

    pub fn create_sampler(&mut self, desc: SamplerDesc) -> u32 {
        self.create(|slot| RenderCmd::CreateSampler { slot, desc })
    }

    pub fn set_texture(&mut self, texture: u32, sampler: u32, unit: u32, stage: ShaderStage) {
        self.queue.submit(RenderCmd::SetTexture {
            texture,
            sampler,
            unit,
            stage,
        });
    }

    pub fn create_raster_state(&mut self, desc: RasterDesc) -> u32 {
        self.create(|slot| RenderCmd::CreateRasterState { slot, desc })
    }

    pub fn set_raster_state(&mut self, slot: u32) {
        self.queue.submit(RenderCmd::SetRasterState { slot });
    }

    pub fn create_blend_state(&mut self, desc: BlendDesc) -> u32 {
        self.create(|slot| RenderCmd::CreateBlendState { slot, desc })
    }

    pub fn set_blend_state(&mut self, slot: u32) {
        self.queue.submit(RenderCmd::SetBlendState { slot });
    }

    pub fn create_depth_stencil_state(&mut self, desc: DepthStencilDesc) -> u32 {
        self.create(|slot| RenderCmd::CreateDepthStencilState { slot, desc })
    }

    pub fn set_depth_stencil_state(&mut self, slot: u32) {
        self.queue.submit(RenderCmd::SetDepthStencilState { slot });
    }

    pub fn set_stencil_ref(&mut self, value: u8) {
        self.queue.submit(RenderCmd::SetStencilRef { value });
    }

    pub fn create_clear_state(&mut self, desc: ClearDesc) -> u32 {
        self.create(|slot| RenderCmd::CreateClearState { slot, desc })
    }

    pub fn clear(&mut self, clear_state: u32) {
        self.queue.submit(RenderCmd::Clear { slot: clear_state });
    }

    pub fn create_render_target(&mut self, desc: RenderTargetDesc) -> u32 {
        self.create(|slot| RenderCmd::CreateRenderTarget { slot, desc })
    }

    /// Binds colour targets and an optional depth target (`NULL_SLOT` for none).
    pub fn set_targets(&mut self, colour: &[u32], depth: u32) {
        self.queue.submit(RenderCmd::SetTargets {
            colour: ColourTargets::from_slice(colour),
            depth,
        });
    }

    /// Binds the back buffer with no depth target.
    pub fn set_back_buffer(&mut self) {
        self.set_targets(&[], NULL_SLOT);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.queue.submit(RenderCmd::SetViewport(viewport));
    }

    pub fn set_scissor_rect(&mut self, rect: ScissorRect) {
        self.queue.submit(RenderCmd::SetScissorRect(rect));
    }

    pub fn draw(&mut self, vertex_count: u32, start_vertex: u32, topology: Topology) {
        self.queue.submit(RenderCmd::Draw {
            vertex_count,
            start_vertex,
            topology,
        });
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        start_index: u32,
        base_vertex: u32,
        topology: Topology,
    ) {
        self.queue.submit(RenderCmd::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
            topology,
        });
    }

    pub fn draw_indexed_instanced(
        &mut self,
        instance_count: u32,
        start_instance: u32,
        index_count: u32,
        start_index: u32,
        base_vertex: u32,
        topology: Topology,
    ) {
        self.queue.submit(RenderCmd::DrawIndexedInstanced {
            instance_count,
            start_instance,
            index_count,
            start_index,
            base_vertex,
            topology,
        });
    }

    pub fn dispatch_compute(&mut self, groups: [u32; 3]) {
        self.queue.submit(RenderCmd::DispatchCompute { groups });
    }

    pub fn push_perf_marker(&mut self, name: &str) {
        self.queue.submit(RenderCmd::PushPerfMarker {
            name: name.to_owned(),
        });
    }

    pub fn pop_perf_marker(&mut self) {
        self.queue.submit(RenderCmd::PopPerfMarker);
    }

    /// Queues a deferred release of `slot`.
    ///
    /// Returns `false` without queuing anything when the slot is not
    /// allocated or a release for it is already in flight. The slot becomes
    /// reusable only after the render thread has executed the release and
    /// handed the slot back.
    pub fn release(&mut self, kind: ResourceKind, slot: u32) -> bool {
        if !self.slots.is_used(slot) || !self.releasing.insert(slot) {
            return false;
        }
        self.queue.submit(RenderCmd::Release {
            kind,
            slot,
            frame: self.frame,
        });
        true
    }

    /// Last published summary of `slot`, checked against `kind`.
    pub fn resource_info(&self, slot: u32, kind: ResourceKind) -> QueryResult<ResourceInfo> {
        let front = self.shared.resources.frontbuffer();
        let info = front.get(slot as usize).copied().unwrap_or_default();
        match info.state {
            ResourceState::Vacant => Err(QueryError::NotReady),
            ResourceState::Failed => Err(QueryError::Failed),
            ResourceState::Ready if info.kind != kind => Err(QueryError::Failed),
            ResourceState::Ready => Ok(info),
        }
    }

    pub fn resource_status(&self, slot: u32, kind: ResourceKind) -> Status {
        Status::from(&self.resource_info(slot, kind))
    }

    /// Statistics for the most recently presented frame.
    pub fn frame_stats(&self) -> FrameStats {
        *self.shared.frame_stats.frontbuffer()
    }

    /// Posts `consume` without waiting, e.g. to start loading before the
    /// first `present`.
    pub fn kick(&self) {
        self.queue.kick();
    }
}
