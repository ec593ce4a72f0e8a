//! Device-less backend that validates and records calls.
//!
//! Used by tests and the demo binary in place of a real graphics API. It keeps
//! a CPU-side copy of every object so slot bookkeeping and buffer updates can
//! be checked without a GPU.

use crate::backend::{BackendResult, RenderBackend, RenderBackendError};
use crate::cmd::{
    BlendDesc, BufferDesc, ClearDesc, DepthStencilDesc, IndexFormat, RasterDesc, RenderTargetDesc,
    ResourceKind, SamplerDesc, ScissorRect, ShaderDesc, ShaderStage, TextureDesc, Topology,
    VertexBinding, Viewport,
};
use transport::ResPool;

#[derive(Debug, Default)]
enum HeadlessObject {
    #[default]
    Vacant,
    Shader(ShaderStage),
    Buffer(Vec<u8>),
    Texture(TextureDesc),
    Sampler(SamplerDesc),
    Raster(RasterDesc),
    Blend(BlendDesc),
    DepthStencil(DepthStencilDesc),
    Clear(ClearDesc),
    RenderTarget(RenderTargetDesc),
}

impl HeadlessObject {
    fn kind(&self) -> ResourceKind {
        match self {
            HeadlessObject::Vacant => ResourceKind::None,
            HeadlessObject::Shader(_) => ResourceKind::Shader,
            HeadlessObject::Buffer(_) => ResourceKind::Buffer,
            HeadlessObject::Texture(_) => ResourceKind::Texture,
            HeadlessObject::Sampler(_) => ResourceKind::Sampler,
            HeadlessObject::Raster(_) => ResourceKind::RasterState,
            HeadlessObject::Blend(_) => ResourceKind::BlendState,
            HeadlessObject::DepthStencil(_) => ResourceKind::DepthStencilState,
            HeadlessObject::Clear(_) => ResourceKind::ClearState,
            HeadlessObject::RenderTarget(_) => ResourceKind::RenderTarget,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub frames: u64,
    pub draws: u64,
    pub dispatches: u64,
    pub clears: u64,
    pub live_objects: usize,
    pub max_marker_depth: usize,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    objects: ResPool<HeadlessObject>,
    stats: HeadlessStats,
    marker_depth: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(reserved: usize) -> Self {
        Self {
            objects: ResPool::with_capacity(reserved),
            ..Self::default()
        }
    }

    pub fn stats(&self) -> HeadlessStats {
        self.stats
    }

    /// CPU copy of a buffer's contents.
    pub fn buffer_contents(&self, slot: u32) -> Option<&[u8]> {
        match self.objects.get(slot) {
            Some(HeadlessObject::Buffer(bytes)) => Some(bytes),
            _ => None,
        }
    }

    fn store(&mut self, slot: u32, object: HeadlessObject) -> BackendResult {
        let previous = self.objects.get_or_grow(slot);
        if !matches!(previous, HeadlessObject::Vacant) {
            log::warn!(
                "slot {slot} recreated as {:?} while holding {:?}",
                object.kind(),
                previous.kind()
            );
        } else {
            self.stats.live_objects += 1;
        }
        *previous = object;
        Ok(())
    }

    fn expect_kind(&self, slot: u32, kind: ResourceKind) -> bool {
        let found = self.objects.get(slot).map(HeadlessObject::kind);
        if found != Some(kind) {
            log::warn!("slot {slot} bound as {kind:?} but holds {found:?}");
            return false;
        }
        true
    }
}

fn invalid(kind: ResourceKind, reason: &'static str) -> BackendResult {
    Err(RenderBackendError::InvalidDescriptor { kind, reason })
}

impl RenderBackend for HeadlessBackend {
    fn present(&mut self) {
        self.stats.frames += 1;
        if self.marker_depth != 0 {
            log::warn!("frame presented with {} open perf markers", self.marker_depth);
            self.marker_depth = 0;
        }
    }

    fn create_shader(&mut self, slot: u32, desc: &ShaderDesc) -> BackendResult {
        if desc.byte_code.is_empty() {
            return invalid(ResourceKind::Shader, "empty byte code");
        }
        self.store(slot, HeadlessObject::Shader(desc.stage))
    }

    fn set_shader(&mut self, slot: u32, _stage: ShaderStage) {
        self.expect_kind(slot, ResourceKind::Shader);
    }

    fn create_buffer(&mut self, slot: u32, desc: &BufferDesc) -> BackendResult {
        if desc.byte_size == 0 {
            return invalid(ResourceKind::Buffer, "zero-sized buffer");
        }
        if desc.data.len() > desc.byte_size {
            return invalid(ResourceKind::Buffer, "initial data larger than buffer");
        }
        let mut contents = vec![0u8; desc.byte_size];
        contents[..desc.data.len()].copy_from_slice(&desc.data);
        self.store(slot, HeadlessObject::Buffer(contents))
    }

    fn update_buffer(&mut self, slot: u32, offset: usize, data: &[u8]) -> BackendResult {
        let Some(HeadlessObject::Buffer(contents)) = self.objects.get_mut(slot) else {
            return Err(RenderBackendError::WrongKind {
                slot,
                expected: ResourceKind::Buffer,
            });
        };
        let size = contents.len();
        let end = offset.checked_add(data.len()).filter(|end| *end <= size);
        let Some(end) = end else {
            return Err(RenderBackendError::OutOfBounds {
                offset,
                len: data.len(),
                size,
            });
        };
        contents[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn set_vertex_buffers(&mut self, bindings: &[VertexBinding]) {
        for binding in bindings {
            self.expect_kind(binding.buffer, ResourceKind::Buffer);
        }
    }

    fn set_index_buffer(&mut self, slot: u32, _format: IndexFormat, _offset: u32) {
        self.expect_kind(slot, ResourceKind::Buffer);
    }

    fn set_constant_buffer(&mut self, slot: u32, _unit: u32, _stage: ShaderStage) {
        self.expect_kind(slot, ResourceKind::Buffer);
    }

    fn create_texture(&mut self, slot: u32, desc: &TextureDesc) -> BackendResult {
        if desc.width == 0 || desc.height == 0 {
            return invalid(ResourceKind::Texture, "zero extent");
        }
        let level0 = desc.width as usize * desc.height as usize * desc.format.bytes_per_texel();
        if !desc.data.is_empty() && desc.data.len() < level0 {
            return invalid(ResourceKind::Texture, "data shorter than mip 0");
        }
        self.store(slot, HeadlessObject::Texture(desc.clone()))
    }

    fn create_sampler(&mut self, slot: u32, desc: &SamplerDesc) -> BackendResult {
        self.store(slot, HeadlessObject::Sampler(*desc))
    }

    fn set_texture(&mut self, texture: u32, sampler: u32, _unit: u32, _stage: ShaderStage) {
        let is_texture = matches!(
            self.objects.get(texture),
            Some(HeadlessObject::Texture(_) | HeadlessObject::RenderTarget(_))
        );
        if !is_texture {
            log::warn!("slot {texture} bound as texture but holds no texture");
        }
        self.expect_kind(sampler, ResourceKind::Sampler);
    }

    fn create_raster_state(&mut self, slot: u32, desc: &RasterDesc) -> BackendResult {
        self.store(slot, HeadlessObject::Raster(*desc))
    }

    fn set_raster_state(&mut self, slot: u32) {
        self.expect_kind(slot, ResourceKind::RasterState);
    }

    fn create_blend_state(&mut self, slot: u32, desc: &BlendDesc) -> BackendResult {
        self.store(slot, HeadlessObject::Blend(*desc))
    }

    fn set_blend_state(&mut self, slot: u32) {
        self.expect_kind(slot, ResourceKind::BlendState);
    }

    fn create_depth_stencil_state(
        &mut self,
        slot: u32,
        desc: &DepthStencilDesc,
    ) -> BackendResult {
        self.store(slot, HeadlessObject::DepthStencil(*desc))
    }

    fn set_depth_stencil_state(&mut self, slot: u32) {
        self.expect_kind(slot, ResourceKind::DepthStencilState);
    }

    fn set_stencil_ref(&mut self, _value: u8) {}

    fn create_clear_state(&mut self, slot: u32, desc: &ClearDesc) -> BackendResult {
        self.store(slot, HeadlessObject::Clear(*desc))
    }

    fn clear(&mut self, slot: u32) {
        if self.expect_kind(slot, ResourceKind::ClearState) {
            self.stats.clears += 1;
        }
    }

    fn create_render_target(&mut self, slot: u32, desc: &RenderTargetDesc) -> BackendResult {
        if desc.width == 0 || desc.height == 0 {
            return invalid(ResourceKind::RenderTarget, "zero extent");
        }
        if desc.samples == 0 {
            return invalid(ResourceKind::RenderTarget, "zero samples");
        }
        self.store(slot, HeadlessObject::RenderTarget(*desc))
    }

    fn set_targets(&mut self, colour: &[u32], depth: u32) {
        for target in colour {
            self.expect_kind(*target, ResourceKind::RenderTarget);
        }
        if depth != transport::NULL_SLOT {
            self.expect_kind(depth, ResourceKind::RenderTarget);
        }
    }

    fn set_viewport(&mut self, _viewport: &Viewport) {}

    fn set_scissor_rect(&mut self, _rect: &ScissorRect) {}

    fn draw(&mut self, _vertex_count: u32, _start_vertex: u32, _topology: Topology) {
        self.stats.draws += 1;
    }

    fn draw_indexed(
        &mut self,
        _index_count: u32,
        _start_index: u32,
        _base_vertex: u32,
        _topology: Topology,
    ) {
        self.stats.draws += 1;
    }

    fn draw_indexed_instanced(
        &mut self,
        _instance_count: u32,
        _start_instance: u32,
        _index_count: u32,
        _start_index: u32,
        _base_vertex: u32,
        _topology: Topology,
    ) {
        self.stats.draws += 1;
    }

    fn dispatch_compute(&mut self, _groups: [u32; 3]) {
        self.stats.dispatches += 1;
    }

    fn push_perf_marker(&mut self, name: &str) {
        log::trace!("perf marker `{name}`");
        self.marker_depth += 1;
        self.stats.max_marker_depth = self.stats.max_marker_depth.max(self.marker_depth);
    }

    fn pop_perf_marker(&mut self) {
        self.marker_depth = self.marker_depth.saturating_sub(1);
    }

    fn release(&mut self, kind: ResourceKind, slot: u32) {
        match self.objects.take(slot) {
            Some(HeadlessObject::Vacant) | None => {
                log::warn!("release of empty slot {slot} as {kind:?}");
            }
            Some(object) if object.kind() == kind => self.stats.live_objects -= 1,
            Some(object) => {
                log::warn!(
                    "release of slot {slot} as {kind:?} but it held {:?}",
                    object.kind()
                );
                self.stats.live_objects -= 1;
            }
        }
    }

    fn shutdown(&mut self) {
        log::debug!(
            "headless backend shut down with {} live objects",
            self.stats.live_objects
        );
    }
}
