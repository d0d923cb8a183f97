//! A render-hardware-abstraction layer over an OpenGL-ES-style native API.
//!
//! [`GraphicsDevice`] exposes draw calls, transform/parameter registers, and
//! resource factories (buffers, vertex layouts, shaders, depth/stencil and
//! rasterizer state) to a frame loop. The backend keeps the *requested*
//! render state separate from the *last-applied* native state and reconciles
//! the two immediately before each draw, emitting only the native calls
//! needed to close the gap: multi-stream vertex attributes mapped against
//! shader-reported slots, field-level depth/stencil diffing, a buffer-bind
//! cache, and draw dispatch across indexed/non-indexed and
//! buffer-backed/client-memory call shapes.
//!
//! The native API is abstracted behind [`GlContext`]; a live driver binding
//! implements it outside this crate, and the `garnet-rhi-trace` crate
//! provides a recording implementation for tests and debugging.
//!
//! The device is single-threaded by contract: resources are `Rc`-shared and
//! nothing locks.

mod backend;
pub mod context;
mod device;
mod error;
mod params;
mod resources;
pub mod state;
mod stats;
mod transform;
pub mod vertex;

pub use backend::ClientIndices;
pub use context::GlContext;
pub use device::{ClearFlags, DeviceCapabilities, GraphicsDevice, MAX_ATTRIBUTE_SLOT_LIMIT};
pub use error::{DeviceError, DrawError};
pub use params::{RenderParams, MATRIX_REGISTERS, MAX_BONE_MATRICES, VECTOR_REGISTERS};
pub use resources::{Buffer, BufferKind, Shader};
pub use state::topology::{primitive_count, Topology};
pub use state::{
    CompareFunc, CullMode, DepthStencilDesc, DepthStencilState, FillMode, RasterizerDesc,
    RasterizerState, StencilFaceDesc, StencilOp, Winding,
};
pub use stats::{CommitStats, InvocationCounters};
pub use transform::{RenderTransform, SurfaceSize};
pub use vertex::{
    LayoutElement, VertexFormat, VertexLayout, VertexUsage, MAX_VERTEX_STAGES,
};
