use thiserror::Error;

use crate::resources::BufferKind;

/// Validation and resource-creation failures reported by the device facade.
///
/// Every variant is raised before any native call is made for the rejected
/// operation, and names the first offending field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("buffer element_count must be non-zero")]
    ZeroElementCount,
    #[error("buffer stride must be non-zero")]
    ZeroStride,
    #[error("initial data is {actual} bytes but element_count * stride is {expected}")]
    InitialDataSizeMismatch { expected: usize, actual: usize },
    #[error("buffer write out of bounds (buffer size {buffer_size}, write end {write_end})")]
    BufferWriteOutOfBounds { buffer_size: usize, write_end: usize },
    #[error("buffer is still shared ({refs} live references)")]
    BufferStillShared { refs: usize },
    #[error("a {actual:?} buffer cannot be bound to the {expected:?} slot")]
    BufferKindMismatch {
        expected: BufferKind,
        actual: BufferKind,
    },
    #[error("vertex stage {stage} out of range (device supports {max} stages)")]
    StageOutOfRange { stage: usize, max: usize },
    #[error("vertex layout must declare at least one element")]
    EmptyLayout,
    #[error("layout element {index} uses stage {stage} but the device supports {max} stages")]
    ElementStageOutOfRange { index: usize, stage: u32, max: usize },
    #[error("{stage} shader source is empty")]
    EmptyShaderSource { stage: &'static str },
    #[error("stencil {face} face reference {reference} exceeds the 8-bit stencil range")]
    StencilReferenceOutOfRange { face: &'static str, reference: i32 },
    #[error("{kind} register {index} out of range (device has {max})")]
    ParamRegisterOutOfRange {
        kind: &'static str,
        index: usize,
        max: usize,
    },
    #[error("bone palette of {count} matrices exceeds the maximum of {max}")]
    TooManyBoneMatrices { count: usize, max: usize },
    #[error("clear mask must name at least one buffer")]
    EmptyClearMask,
    #[error("native {kind} creation failed")]
    NativeCreationFailed { kind: &'static str },
}

/// Failures of a draw call itself.
///
/// Commit-time mismatches (unmapped slots, overflowed layouts, stride
/// disagreements) are logged and skipped rather than surfaced here; a draw
/// only fails outright when its preconditions cannot be met at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("draw called without a shader set")]
    MissingShader,
    #[error("draw called without a vertex layout set")]
    MissingLayout,
    #[error("draw_indexed called without an index buffer bound")]
    MissingIndexBuffer,
    #[error("index buffer stride {stride} does not resolve to a native index width (expected 2 or 4)")]
    UnsupportedIndexStride { stride: u32 },
    #[error("draw called with a zero vertex/index count")]
    ZeroCount,
    #[error("shader program {name:?} failed to compile or link")]
    ShaderLinkFailed { name: String },
}
