use std::fmt;

use crate::context::glconst;

/// Primitive topologies accepted by the draw calls.
///
/// This is a semantic enum rather than the raw native constants so the device
/// facade can stay backend-independent; the committer maps it to the native
/// draw mode through [`gl_mode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    Points,
    LineList,
    LineStrip,
    LineLoop,
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Topology::Points => "points",
            Topology::LineList => "line_list",
            Topology::LineStrip => "line_strip",
            Topology::LineLoop => "line_loop",
            Topology::TriangleList => "triangle_list",
            Topology::TriangleStrip => "triangle_strip",
            Topology::TriangleFan => "triangle_fan",
        };
        f.write_str(s)
    }
}

/// Native GLES draw mode for a topology.
pub(crate) fn gl_mode(topology: Topology) -> u32 {
    match topology {
        Topology::Points => glconst::POINTS,
        Topology::LineList => glconst::LINES,
        Topology::LineStrip => glconst::LINE_STRIP,
        Topology::LineLoop => glconst::LINE_LOOP,
        Topology::TriangleList => glconst::TRIANGLES,
        Topology::TriangleStrip => glconst::TRIANGLE_STRIP,
        Topology::TriangleFan => glconst::TRIANGLE_FAN,
    }
}

/// Primitives produced by drawing `count` vertices (or indices) with the
/// given topology. Degenerate counts yield zero.
pub fn primitive_count(topology: Topology, count: u32) -> u32 {
    match topology {
        Topology::Points => count,
        Topology::LineList => count / 2,
        Topology::LineStrip => count.saturating_sub(1),
        Topology::LineLoop => count,
        Topology::TriangleList => count / 3,
        Topology::TriangleStrip | Topology::TriangleFan => count.saturating_sub(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_table_matches_gles_constants() {
        assert_eq!(gl_mode(Topology::Points), 0x0000);
        assert_eq!(gl_mode(Topology::LineList), 0x0001);
        assert_eq!(gl_mode(Topology::LineLoop), 0x0002);
        assert_eq!(gl_mode(Topology::LineStrip), 0x0003);
        assert_eq!(gl_mode(Topology::TriangleList), 0x0004);
        assert_eq!(gl_mode(Topology::TriangleStrip), 0x0005);
        assert_eq!(gl_mode(Topology::TriangleFan), 0x0006);
    }

    #[test]
    fn primitive_counts() {
        assert_eq!(primitive_count(Topology::TriangleList, 6), 2);
        assert_eq!(primitive_count(Topology::TriangleStrip, 6), 4);
        assert_eq!(primitive_count(Topology::TriangleFan, 6), 4);
        assert_eq!(primitive_count(Topology::LineList, 6), 3);
        assert_eq!(primitive_count(Topology::LineStrip, 6), 5);
        assert_eq!(primitive_count(Topology::LineLoop, 6), 6);
        assert_eq!(primitive_count(Topology::Points, 6), 6);
    }

    #[test]
    fn degenerate_counts_yield_zero() {
        assert_eq!(primitive_count(Topology::TriangleStrip, 1), 0);
        assert_eq!(primitive_count(Topology::LineStrip, 0), 0);
    }
}
