//! Session state: the backend's cache of what was last applied to the native
//! context. A cache, not an owner — it holds raw ids and plain values only,
//! with `None` as the "unknown" sentinel that forces a reprogram.

use crate::context::RawProgram;
use crate::state::{CompareFunc, CullMode, FillMode, StencilOp, Winding};

/// Cached native attribute binding descriptor for one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AttribDesc {
    /// Raw native buffer id (`0` for the zero descriptor of a missing stream).
    pub buffer: u32,
    pub size: i32,
    pub ty: u32,
    pub normalized: bool,
    pub stride: i32,
    pub offset: usize,
}

impl AttribDesc {
    /// Deterministic zero value a missing stream's slot is reset to, so a
    /// shader reading it observes zero rather than stale memory.
    pub(crate) const ZERO: Self = Self {
        buffer: 0,
        size: 0,
        ty: 0,
        normalized: false,
        stride: 0,
        offset: 0,
    };
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StencilFaceSession {
    /// `(func, reference, read_mask)` — one native call programs all three.
    pub func: Option<(CompareFunc, i32, u32)>,
    /// `(stencil_fail, depth_fail, pass)`.
    pub ops: Option<(StencilOp, StencilOp, StencilOp)>,
    pub write_mask: Option<u32>,
}

impl StencilFaceSession {
    pub(crate) fn invalidate(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DepthStencilSession {
    pub depth_test: Option<bool>,
    pub depth_write: Option<bool>,
    pub depth_func: Option<CompareFunc>,
    pub stencil_test: Option<bool>,
    pub two_sided: Option<bool>,
    pub front: StencilFaceSession,
    pub back: StencilFaceSession,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct RasterizerSession {
    pub cull: Option<CullMode>,
    pub winding: Option<Winding>,
    pub fill: Option<FillMode>,
}

/// Everything the backend remembers about the native context.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub program: Option<RawProgram>,
    /// Per-slot cached descriptors, `max_attribute_slots` long. `None` means
    /// unknown (never described, or invalidated by a client-memory draw).
    pub attribs: Vec<Option<AttribDesc>>,
    /// Slots currently enabled on the native context.
    pub enabled_mask: u64,
    pub depth_stencil: DepthStencilSession,
    pub rasterizer: RasterizerSession,
}

impl SessionState {
    pub(crate) fn new(max_attribute_slots: u32) -> Self {
        Self {
            program: None,
            attribs: vec![None; max_attribute_slots as usize],
            enabled_mask: 0,
            depth_stencil: DepthStencilSession::default(),
            rasterizer: RasterizerSession::default(),
        }
    }

    /// Forget everything; the next commit re-emits every native call. Used on
    /// device reset, when the native context itself may have been recreated.
    pub(crate) fn invalidate(&mut self) {
        let slots = self.attribs.len();
        *self = Self::new(slots as u32);
    }

    /// Drop cached descriptors that reference a deleted native buffer.
    pub(crate) fn forget_buffer(&mut self, raw_id: u32) {
        for desc in self.attribs.iter_mut() {
            if matches!(desc, Some(d) if d.buffer == raw_id) {
                *desc = None;
            }
        }
    }
}
