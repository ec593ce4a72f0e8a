//! Render command records and the descriptors they carry.

use smallvec::SmallVec;

/// Kinds of GPU resources addressed by slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    #[default]
    None,
    Shader,
    Buffer,
    Texture,
    Sampler,
    RasterState,
    BlendState,
    DepthStencilState,
    ClearState,
    RenderTarget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Compute,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Constant,
    Structured,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Bgra8,
    Rgba16F,
    R32F,
    D24S8,
}

impl TextureFormat {
    pub fn bytes_per_texel(self) -> usize {
        match self {
            TextureFormat::Rgba8 | TextureFormat::Bgra8 | TextureFormat::R32F => 4,
            TextureFormat::D24S8 => 4,
            TextureFormat::Rgba16F => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexFormat {
    U16,
    U32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Topology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderDesc {
    pub stage: ShaderStage,
    pub byte_code: Vec<u8>,
    pub entry_point: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferDesc {
    pub usage: BufferUsage,
    pub byte_size: usize,
    /// Initial contents; empty leaves the buffer zeroed.
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    Point,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    Wrap,
    Clamp,
    Mirror,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerDesc {
    pub filter: Filter,
    pub address: AddressMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterDesc {
    pub cull: CullMode,
    pub wireframe: bool,
    pub scissor: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    InvSrcAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlendDesc {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthStencilDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub stencil: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearDesc {
    /// `None` leaves the colour targets untouched.
    pub colour: Option<[f32; 4]>,
    pub depth: Option<f32>,
    pub stencil: Option<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub samples: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScissorRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexBinding {
    pub buffer: u32,
    pub stride: u32,
    pub offset: u32,
}

pub type VertexBindings = SmallVec<[VertexBinding; 4]>;
pub type ColourTargets = SmallVec<[u32; 4]>;

/// One record in the render command stream.
///
/// Owned payloads (byte code, buffer contents, marker names) travel with the
/// record and are dropped on the render thread after execution.
#[derive(Debug)]
pub enum RenderCmd {
    NewFrame { frame: u64 },
    Present,
    LoadShader { slot: u32, desc: ShaderDesc },
    SetShader { slot: u32, stage: ShaderStage },
    CreateBuffer { slot: u32, desc: BufferDesc },
    UpdateBuffer { slot: u32, offset: usize, data: Vec<u8> },
    SetVertexBuffers { bindings: VertexBindings },
    SetIndexBuffer { slot: u32, format: IndexFormat, offset: u32 },
    SetConstantBuffer { slot: u32, unit: u32, stage: ShaderStage },
    CreateTexture { slot: u32, desc: TextureDesc },
    CreateSampler { slot: u32, desc: SamplerDesc },
    SetTexture { texture: u32, sampler: u32, unit: u32, stage: ShaderStage },
    CreateRasterState { slot: u32, desc: RasterDesc },
    SetRasterState { slot: u32 },
    CreateBlendState { slot: u32, desc: BlendDesc },
    SetBlendState { slot: u32 },
    CreateDepthStencilState { slot: u32, desc: DepthStencilDesc },
    SetDepthStencilState { slot: u32 },
    SetStencilRef { value: u8 },
    CreateClearState { slot: u32, desc: ClearDesc },
    Clear { slot: u32 },
    CreateRenderTarget { slot: u32, desc: RenderTargetDesc },
    SetTargets { colour: ColourTargets, depth: u32 },
    SetViewport(Viewport),
    SetScissorRect(ScissorRect),
    Draw { vertex_count: u32, start_vertex: u32, topology: Topology },
    DrawIndexed { index_count: u32, start_index: u32, base_vertex: u32, topology: Topology },
    DrawIndexedInstanced {
        instance_count: u32,
        start_instance: u32,
        index_count: u32,
        start_index: u32,
        base_vertex: u32,
        topology: Topology,
    },
    DispatchCompute { groups: [u32; 3] },
    PushPerfMarker { name: String },
    PopPerfMarker,
    /// Stamped with the producer frame that issued it; executed once it is
    /// old enough.
    Release { kind: ResourceKind, slot: u32, frame: u64 },
}
