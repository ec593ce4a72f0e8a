//! Boundary to the native graphics API.

use crate::cmd::{
    BlendDesc, BufferDesc, ClearDesc, DepthStencilDesc, IndexFormat, RasterDesc, RenderTargetDesc,
    ResourceKind, SamplerDesc, ScissorRect, ShaderDesc, ShaderStage, TextureDesc, Topology,
    VertexBinding, Viewport,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderBackendError {
    #[error("invalid {kind:?} descriptor: {reason}")]
    InvalidDescriptor {
        kind: ResourceKind,
        reason: &'static str,
    },

    #[error("slot {slot} does not hold a {expected:?}")]
    WrongKind { slot: u32, expected: ResourceKind },

    #[error("write of {len} bytes at offset {offset} overflows buffer of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },
}

pub type BackendResult = Result<(), RenderBackendError>;

/// One method per GPU operation.
///
/// Called only from the render thread, one call per executed record and never
/// concurrently. Implementations own their native objects, keyed by slot, but
/// none of the threading.
pub trait RenderBackend {
    fn new_frame(&mut self, _frame: u64) {}
    fn present(&mut self);

    fn create_shader(&mut self, slot: u32, desc: &ShaderDesc) -> BackendResult;
    fn set_shader(&mut self, slot: u32, stage: ShaderStage);

    fn create_buffer(&mut self, slot: u32, desc: &BufferDesc) -> BackendResult;
    fn update_buffer(&mut self, slot: u32, offset: usize, data: &[u8]) -> BackendResult;
    fn set_vertex_buffers(&mut self, bindings: &[VertexBinding]);
    fn set_index_buffer(&mut self, slot: u32, format: IndexFormat, offset: u32);
    fn set_constant_buffer(&mut self, slot: u32, unit: u32, stage: ShaderStage);

    fn create_texture(&mut self, slot: u32, desc: &TextureDesc) -> BackendResult;
    fn create_sampler(&mut self, slot: u32, desc: &SamplerDesc) -> BackendResult;
    fn set_texture(&mut self, texture: u32, sampler: u32, unit: u32, stage: ShaderStage);

    fn create_raster_state(&mut self, slot: u32, desc: &RasterDesc) -> BackendResult;
    fn set_raster_state(&mut self, slot: u32);
    fn create_blend_state(&mut self, slot: u32, desc: &BlendDesc) -> BackendResult;
    fn set_blend_state(&mut self, slot: u32);
    fn create_depth_stencil_state(&mut self, slot: u32, desc: &DepthStencilDesc)
        -> BackendResult;
    fn set_depth_stencil_state(&mut self, slot: u32);
    fn set_stencil_ref(&mut self, value: u8);

    fn create_clear_state(&mut self, slot: u32, desc: &ClearDesc) -> BackendResult;
    fn clear(&mut self, slot: u32);

    fn create_render_target(&mut self, slot: u32, desc: &RenderTargetDesc) -> BackendResult;
    fn set_targets(&mut self, colour: &[u32], depth: u32);
    fn set_viewport(&mut self, viewport: &Viewport);
    fn set_scissor_rect(&mut self, rect: &ScissorRect);

    fn draw(&mut self, vertex_count: u32, start_vertex: u32, topology: Topology);
    fn draw_indexed(
        &mut self,
        index_count: u32,
        start_index: u32,
        base_vertex: u32,
        topology: Topology,
    );
    #[allow(clippy::too_many_arguments)]
    fn draw_indexed_instanced(
        &mut self,
        instance_count: u32,
        start_instance: u32,
        index_count: u32,
        start_index: u32,
        base_vertex: u32,
        topology: Topology,
    );
    fn dispatch_compute(&mut self, groups: [u32; 3]);

    fn push_perf_marker(&mut self, _name: &str) {}
    fn pop_perf_marker(&mut self) {}

    fn release(&mut self, kind: ResourceKind, slot: u32);

    fn shutdown(&mut self) {}
}
