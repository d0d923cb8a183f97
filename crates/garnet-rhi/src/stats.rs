//! Telemetry counters.
//!
//! Write-only from the device's perspective; the frame loop snapshots them
//! once per iteration and calls [`InvocationCounters::reset`] (via
//! `GraphicsDevice::begin_iteration`) at the start of the next one. The
//! device is single-threaded, so these are plain `u64` fields.

/// Per-loop-iteration tallies of facade activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationCounters {
    /// Accepted facade operations of any kind.
    pub invokes: u64,
    pub begins: u64,
    pub ends: u64,
    /// Native program binds actually emitted (elided rebinds not counted).
    pub shader_binds: u64,
    pub param_writes: u64,
    pub transform_updates: u64,
    pub draws: u64,
    /// Primitives submitted, derived from topology and vertex/index count.
    pub primitives: u64,
}

impl InvocationCounters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Lifetime counters for the committer's diff-and-emit engine.
///
/// `unmapped_attributes` and `stride_mismatches` correspond to the logged
/// diagnostic-and-skip paths; the `elided_*` counters measure how much native
/// traffic the session cache saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Layout elements whose logical index the shader does not reflect.
    pub unmapped_attributes: u64,
    /// Commits in which the layout exceeded the device's attribute slots.
    pub layout_overflows: u64,
    /// Client draws whose caller stride disagreed with the layout stride.
    pub stride_mismatches: u64,
    /// Attribute descriptions skipped because the cached descriptor matched.
    pub elided_attribute_updates: u64,
    /// Buffer binds skipped because the target already held the id.
    pub elided_buffer_binds: u64,
}
