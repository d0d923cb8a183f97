//! Depth/stencil and rasterizer state: immutable, validated-at-creation
//! property bags plus their abstract-to-native translations.

pub mod topology;

use crate::context::glconst;
use crate::error::DeviceError;

/// Depth/stencil compare function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

pub(crate) fn compare_to_gl(func: CompareFunc) -> u32 {
    match func {
        CompareFunc::Never => glconst::NEVER,
        CompareFunc::Less => glconst::LESS,
        CompareFunc::Equal => glconst::EQUAL,
        CompareFunc::LessEqual => glconst::LEQUAL,
        CompareFunc::Greater => glconst::GREATER,
        CompareFunc::NotEqual => glconst::NOTEQUAL,
        CompareFunc::GreaterEqual => glconst::GEQUAL,
        CompareFunc::Always => glconst::ALWAYS,
    }
}

/// Stencil face operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrClamp,
    DecrClamp,
    Invert,
    IncrWrap,
    DecrWrap,
}

pub(crate) fn stencil_op_to_gl(op: StencilOp) -> u32 {
    match op {
        StencilOp::Keep => glconst::KEEP,
        StencilOp::Zero => glconst::ZERO,
        StencilOp::Replace => glconst::REPLACE,
        StencilOp::IncrClamp => glconst::INCR,
        StencilOp::DecrClamp => glconst::DECR,
        StencilOp::Invert => glconst::INVERT,
        StencilOp::IncrWrap => glconst::INCR_WRAP,
        StencilOp::DecrWrap => glconst::DECR_WRAP,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FillMode {
    Solid,
    /// Not expressible in GLES; committed as solid with a logged diagnostic.
    Wireframe,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
}

pub(crate) fn winding_to_gl(winding: Winding) -> u32 {
    match winding {
        Winding::Clockwise => glconst::CW,
        Winding::CounterClockwise => glconst::CCW,
    }
}

/// One stencil face's compare/op/mask block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StencilFaceDesc {
    pub func: CompareFunc,
    pub reference: i32,
    pub read_mask: u32,
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub write_mask: u32,
}

impl Default for StencilFaceDesc {
    fn default() -> Self {
        Self {
            func: CompareFunc::Always,
            reference: 0,
            read_mask: 0xFF,
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            write_mask: 0xFF,
        }
    }
}

/// Depth/stencil properties.
///
/// The defaults are what an unset pending slot commits: depth test and write
/// on with `Less`, stencil off, both faces at their face defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthStencilDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareFunc,
    pub stencil_test: bool,
    /// When false, the front face block programs both native faces.
    pub two_sided: bool,
    pub front: StencilFaceDesc,
    pub back: StencilFaceDesc,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_func: CompareFunc::Less,
            stencil_test: false,
            two_sided: false,
            front: StencilFaceDesc::default(),
            back: StencilFaceDesc::default(),
        }
    }
}

/// Validated depth/stencil state object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepthStencilState {
    desc: DepthStencilDesc,
}

impl DepthStencilState {
    /// Validates every field before accepting the object. Stencil references
    /// must fit the 8-bit stencil range common to GLES depth24/stencil8
    /// surfaces.
    pub(crate) fn validate(desc: DepthStencilDesc) -> Result<Self, DeviceError> {
        for (face, block) in [("front", &desc.front), ("back", &desc.back)] {
            if !(0..=0xFF).contains(&block.reference) {
                return Err(DeviceError::StencilReferenceOutOfRange {
                    face,
                    reference: block.reference,
                });
            }
        }
        Ok(Self { desc })
    }

    pub fn desc(&self) -> &DepthStencilDesc {
        &self.desc
    }
}

/// Rasterizer properties. Defaults: solid fill, back-face culling, CCW front.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterizerDesc {
    pub fill: FillMode,
    pub cull: CullMode,
    pub winding: Winding,
}

impl Default for RasterizerDesc {
    fn default() -> Self {
        Self {
            fill: FillMode::Solid,
            cull: CullMode::Back,
            winding: Winding::CounterClockwise,
        }
    }
}

/// Validated rasterizer state object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterizerState {
    desc: RasterizerDesc,
}

impl RasterizerState {
    pub(crate) fn validate(desc: RasterizerDesc) -> Result<Self, DeviceError> {
        // All fields are typed enums; nothing numeric is left to range-check.
        Ok(Self { desc })
    }

    pub fn desc(&self) -> &RasterizerDesc {
        &self.desc
    }
}
