//! Vertex formats and layouts.
//!
//! A [`VertexLayout`] is an ordered set of elements grouped by stream stage;
//! per-stage strides are computed once at creation by summation in
//! declaration order and never mutated afterwards.

use crate::context::glconst;
use crate::error::DeviceError;

/// Number of vertex stream stages a layout may address.
pub const MAX_VERTEX_STAGES: usize = 4;

/// Element component format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float1,
    Float2,
    Float3,
    Float4,
    Byte4,
    UByte4,
    Short2,
    Short4,
    UShort2,
    UShort4,
}

impl VertexFormat {
    pub fn byte_size(self) -> u32 {
        match self {
            VertexFormat::Float1 => 4,
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
            VertexFormat::Byte4 | VertexFormat::UByte4 => 4,
            VertexFormat::Short2 | VertexFormat::UShort2 => 4,
            VertexFormat::Short4 | VertexFormat::UShort4 => 8,
        }
    }

    pub(crate) fn component_count(self) -> i32 {
        match self {
            VertexFormat::Float1 => 1,
            VertexFormat::Float2 | VertexFormat::Short2 | VertexFormat::UShort2 => 2,
            VertexFormat::Float3 => 3,
            VertexFormat::Float4
            | VertexFormat::Byte4
            | VertexFormat::UByte4
            | VertexFormat::Short4
            | VertexFormat::UShort4 => 4,
        }
    }

    pub(crate) fn gl_type(self) -> u32 {
        match self {
            VertexFormat::Float1
            | VertexFormat::Float2
            | VertexFormat::Float3
            | VertexFormat::Float4 => glconst::FLOAT,
            VertexFormat::Byte4 => glconst::BYTE,
            VertexFormat::UByte4 => glconst::UNSIGNED_BYTE,
            VertexFormat::Short2 | VertexFormat::Short4 => glconst::SHORT,
            VertexFormat::UShort2 | VertexFormat::UShort4 => glconst::UNSIGNED_SHORT,
        }
    }
}

/// Element semantic.
///
/// Carried for diagnostics and tooling; the committer maps layout elements to
/// shader slots by running logical index, not by semantic identity (the
/// convention the source contract establishes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexUsage {
    Position,
    Normal,
    Tangent,
    Binormal,
    BlendWeight,
    BlendIndices,
    Color,
    TexCoord,
    PointSize,
}

/// One attribute within a layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutElement {
    /// Stream stage this element reads from.
    pub stage: u32,
    pub format: VertexFormat,
    pub usage: VertexUsage,
    /// Byte offset within the stage's vertex.
    pub offset: u32,
    pub normalized: bool,
}

impl LayoutElement {
    pub fn new(stage: u32, format: VertexFormat, usage: VertexUsage, offset: u32) -> Self {
        Self {
            stage,
            format,
            usage,
            offset,
            normalized: false,
        }
    }
}

/// Immutable, stride-precomputed vertex layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    elements: Vec<LayoutElement>,
    stage_strides: [u32; MAX_VERTEX_STAGES],
    stage_counts: [u32; MAX_VERTEX_STAGES],
}

impl VertexLayout {
    pub(crate) fn validate(elements: &[LayoutElement]) -> Result<Self, DeviceError> {
        if elements.is_empty() {
            return Err(DeviceError::EmptyLayout);
        }
        let mut stage_strides = [0u32; MAX_VERTEX_STAGES];
        let mut stage_counts = [0u32; MAX_VERTEX_STAGES];
        for (index, element) in elements.iter().enumerate() {
            let stage = element.stage as usize;
            if stage >= MAX_VERTEX_STAGES {
                return Err(DeviceError::ElementStageOutOfRange {
                    index,
                    stage: element.stage,
                    max: MAX_VERTEX_STAGES,
                });
            }
            stage_strides[stage] += element.format.byte_size();
            stage_counts[stage] += 1;
        }
        Ok(Self {
            elements: elements.to_vec(),
            stage_strides,
            stage_counts,
        })
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Elements of `stage`, in declaration order.
    pub fn elements_of(&self, stage: usize) -> impl Iterator<Item = &LayoutElement> {
        self.elements
            .iter()
            .filter(move |e| e.stage as usize == stage)
    }

    pub fn stage_element_count(&self, stage: usize) -> u32 {
        self.stage_counts[stage]
    }

    /// Byte stride of one stage's vertex.
    pub fn stage_stride(&self, stage: usize) -> u32 {
        self.stage_strides[stage]
    }

    /// Stride of a fully interleaved (client-memory) vertex: the sum of every
    /// stage's stride.
    pub fn total_stride(&self) -> u32 {
        self.stage_strides.iter().sum()
    }
}
