//! Native buffer-bind cache.

use crate::context::{glconst, GlContext, RawBuffer};
use crate::stats::CommitStats;

/// The three buffer binding points the backend touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BindTarget {
    Vertex = 0,
    Index = 1,
    Transfer = 2,
}

impl BindTarget {
    fn to_gl(self) -> u32 {
        match self {
            BindTarget::Vertex => glconst::ARRAY_BUFFER,
            BindTarget::Index => glconst::ELEMENT_ARRAY_BUFFER,
            BindTarget::Transfer => glconst::COPY_WRITE_BUFFER,
        }
    }
}

/// Remembers the last native id bound to each target so re-binding the same
/// id is a no-op. Outer `None` means the binding is unknown (after a device
/// reset); inner `None` means target is known-unbound.
#[derive(Debug, Default)]
pub(crate) struct BindCache {
    bound: [Option<Option<RawBuffer>>; 3],
}

impl BindCache {
    pub(crate) fn bind<C: GlContext>(
        &mut self,
        ctx: &mut C,
        target: BindTarget,
        buffer: Option<RawBuffer>,
        stats: &mut CommitStats,
    ) {
        let slot = &mut self.bound[target as usize];
        if *slot == Some(buffer) {
            stats.elided_buffer_binds += 1;
            return;
        }
        ctx.bind_buffer(target.to_gl(), buffer);
        *slot = Some(buffer);
    }

    /// Forget every cached binding; the next bind of each target is emitted
    /// unconditionally.
    pub(crate) fn invalidate(&mut self) {
        self.bound = [None; 3];
    }

    /// Drop any cached knowledge of `buffer` (it is being deleted).
    pub(crate) fn forget(&mut self, buffer: RawBuffer) {
        for slot in &mut self.bound {
            if *slot == Some(Some(buffer)) {
                *slot = None;
            }
        }
    }
}
