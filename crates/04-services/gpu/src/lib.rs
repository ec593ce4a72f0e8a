//! Render subsystem: a producer-side [`RenderContext`] feeding a render job
//! that owns the [`RenderBackend`].
//!
//! Resources are named by slot. The producer allocates slots eagerly and the
//! render thread fills them in; releases are deferred for
//! `release_latency_frames` presented frames so the GPU can finish with an
//! object before it is destroyed, after which the slot travels back to the
//! producer on a second ring and is recycled at the next `new_frame`.

mod backend;
mod cmd;
mod context;
mod executor;
mod headless;
mod state;

pub use backend::{BackendResult, RenderBackend, RenderBackendError};
pub use cmd::{
    AddressMode, BlendDesc, BlendFactor, BufferDesc, BufferUsage, ClearDesc, ColourTargets,
    CullMode, DepthStencilDesc, Filter, IndexFormat, RasterDesc, RenderCmd, RenderTargetDesc,
    ResourceKind, SamplerDesc, ScissorRect, ShaderDesc, ShaderStage, TextureDesc, TextureFormat,
    Topology, VertexBinding, VertexBindings, Viewport,
};
pub use context::RenderContext;
pub use headless::{HeadlessBackend, HeadlessStats};
pub use state::{FrameStats, ResourceInfo, ResourceState};

use dispatch::{spawn_dispatcher, ContinuePolicy, DispatchConfig, DispatchResult};
use executor::RenderExecutor;
use jobs::{JobRegistry, JobSpec};
use serde::Deserialize;
use state::RenderShared;
use std::sync::Arc;
use std::time::Duration;
use transport::CmdRing;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Records the command ring holds before `submit` blocks.
    pub ring_capacity: usize,
    /// Slots the render thread can hand back before it starts buffering them.
    pub release_ring_capacity: usize,
    /// Presented frames between a release command and the backend release.
    pub release_latency_frames: u64,
    pub initial_slots: u32,
    pub idle_sleep_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 1024,
            release_ring_capacity: 1024,
            release_latency_frames: 6,
            initial_slots: 2048,
            idle_sleep_ms: 1,
        }
    }
}

/// Starts the render job and returns the context that feeds it.
///
/// `make_backend` runs on the render thread. The job parks in its dispatch
/// loop until the first `present` or [`RenderContext::kick`].
pub fn spawn_render_job<B, F>(
    registry: &mut JobRegistry,
    spec: JobSpec,
    config: &RenderConfig,
    make_backend: F,
) -> DispatchResult<RenderContext>
where
    B: RenderBackend + 'static,
    F: FnOnce() -> B + Send + 'static,
{
    let (returned, freed) = CmdRing::with_capacity(config.release_ring_capacity)?.split();
    let shared = Arc::new(RenderShared::default());
    let dispatch = DispatchConfig {
        idle_sleep: Duration::from_millis(config.idle_sleep_ms),
        continue_policy: ContinuePolicy::AfterBatch,
    };
    let latency = config.release_latency_frames;
    let reserved = config.initial_slots as usize;
    let executor_shared = Arc::clone(&shared);
    let queue = spawn_dispatcher(
        registry,
        spec,
        config.ring_capacity,
        dispatch,
        move |_job| RenderExecutor::new(make_backend(), executor_shared, returned, latency, reserved),
    )?;
    log::info!(
        "render job '{}' started (ring {}, release latency {} frames)",
        queue.job().name(),
        config.ring_capacity,
        latency
    );
    Ok(RenderContext::new(queue, freed, shared, config.initial_slots))
}
