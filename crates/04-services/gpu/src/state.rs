use crate::cmd::ResourceKind;
use transport::{MultiArrayBuffer, MultiBuffer};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing created at this slot yet, or already released.
    #[default]
    Vacant,
    Ready,
    /// The backend rejected the creation command.
    Failed,
}

/// Per-slot summary published by the render thread every presented frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceInfo {
    pub kind: ResourceKind,
    pub state: ResourceState,
    pub byte_size: usize,
    pub width: u32,
    pub height: u32,
    /// Producer frame during which the resource was created.
    pub created_frame: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub commands: u64,
    pub draw_calls: u64,
    pub releases: u64,
    pub live_resources: usize,
    /// Render-thread time between `NewFrame` and `Present`.
    pub frame_micros: u64,
}

/// State the render thread writes and producer threads read.
#[derive(Debug, Default)]
pub struct RenderShared {
    pub(crate) frame_stats: MultiBuffer<FrameStats>,
    pub(crate) resources: MultiArrayBuffer<ResourceInfo>,
}
