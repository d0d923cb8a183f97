//! The native state sink the backend reconciles against.
//!
//! [`GlContext`] mirrors the bindable-object, immediate-draw call surface of an
//! OpenGL-ES-style driver. The committer owns every abstract-to-native lookup
//! table, so trait arguments are raw GLES enum values (see [`glconst`]); the
//! trait itself stays a thin recording/forwarding boundary. A live driver
//! binding implements this trait outside the crate; `garnet-rhi-trace`
//! provides the in-repo recording implementation used by tests.

/// Native buffer object id. `0` is never a valid object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawBuffer(pub u32);

/// Native shader object id (a single compiled stage, pre-link).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawShader(pub u32);

/// Native linked program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawProgram(pub u32);

/// GLES enum values used across the sink boundary.
///
/// Only the subset this backend emits; values are the authentic GLES 2.0/3.0
/// constants so a driver-backed implementation can pass them through.
pub mod glconst {
    // Buffer bind targets.
    pub const ARRAY_BUFFER: u32 = 0x8892;
    pub const ELEMENT_ARRAY_BUFFER: u32 = 0x8893;
    /// Staging/transfer target: uploads and readbacks go through here so the
    /// draw-path bindings stay cached.
    pub const COPY_WRITE_BUFFER: u32 = 0x8F37;

    // Buffer usage hints.
    pub const STATIC_DRAW: u32 = 0x88E4;
    pub const DYNAMIC_DRAW: u32 = 0x88E8;

    // Component types.
    pub const BYTE: u32 = 0x1400;
    pub const UNSIGNED_BYTE: u32 = 0x1401;
    pub const SHORT: u32 = 0x1402;
    pub const UNSIGNED_SHORT: u32 = 0x1403;
    pub const UNSIGNED_INT: u32 = 0x1405;
    pub const FLOAT: u32 = 0x1406;

    // Shader stages.
    pub const FRAGMENT_SHADER: u32 = 0x8B30;
    pub const VERTEX_SHADER: u32 = 0x8B31;

    // Server-side capabilities.
    pub const CULL_FACE: u32 = 0x0B44;
    pub const DEPTH_TEST: u32 = 0x0B71;
    pub const STENCIL_TEST: u32 = 0x0B90;

    // Compare functions (depth and stencil).
    pub const NEVER: u32 = 0x0200;
    pub const LESS: u32 = 0x0201;
    pub const EQUAL: u32 = 0x0202;
    pub const LEQUAL: u32 = 0x0203;
    pub const GREATER: u32 = 0x0204;
    pub const NOTEQUAL: u32 = 0x0205;
    pub const GEQUAL: u32 = 0x0206;
    pub const ALWAYS: u32 = 0x0207;

    // Stencil operations.
    pub const ZERO: u32 = 0;
    pub const KEEP: u32 = 0x1E00;
    pub const REPLACE: u32 = 0x1E01;
    pub const INCR: u32 = 0x1E02;
    pub const DECR: u32 = 0x1E03;
    pub const INVERT: u32 = 0x150A;
    pub const INCR_WRAP: u32 = 0x8507;
    pub const DECR_WRAP: u32 = 0x8508;

    // Face selectors and windings.
    pub const FRONT: u32 = 0x0404;
    pub const BACK: u32 = 0x0405;
    pub const FRONT_AND_BACK: u32 = 0x0408;
    pub const CW: u32 = 0x0900;
    pub const CCW: u32 = 0x0901;

    // Draw modes.
    pub const POINTS: u32 = 0x0000;
    pub const LINES: u32 = 0x0001;
    pub const LINE_LOOP: u32 = 0x0002;
    pub const LINE_STRIP: u32 = 0x0003;
    pub const TRIANGLES: u32 = 0x0004;
    pub const TRIANGLE_STRIP: u32 = 0x0005;
    pub const TRIANGLE_FAN: u32 = 0x0006;

    // Clear mask bits.
    pub const DEPTH_BUFFER_BIT: u32 = 0x0100;
    pub const STENCIL_BUFFER_BIT: u32 = 0x0400;
    pub const COLOR_BUFFER_BIT: u32 = 0x4000;
}

/// Native call surface consumed by the committer.
///
/// Object-creation calls report failure by returning `None`; everything else
/// is fire-and-forget, matching the underlying API. Reflection queries take
/// `&self` because they introspect rather than mutate native state.
pub trait GlContext {
    // Buffer objects.
    fn create_buffer(&mut self) -> Option<RawBuffer>;
    fn delete_buffer(&mut self, buffer: RawBuffer);
    fn bind_buffer(&mut self, target: u32, buffer: Option<RawBuffer>);
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);
    fn buffer_sub_data(&mut self, target: u32, offset: usize, data: &[u8]);
    fn read_buffer_data(&self, target: u32, offset: usize, out: &mut [u8]);

    // Programs.
    fn compile_shader(&mut self, stage: u32, source: &str) -> Option<RawShader>;
    fn link_program(&mut self, vertex: RawShader, fragment: RawShader) -> Option<RawProgram>;
    fn use_program(&mut self, program: Option<RawProgram>);
    fn active_attribute_count(&self, program: RawProgram) -> u32;
    /// Native slot of the `index`-th active attribute, in the program's
    /// reflection order. `None` when the linker assigned no slot.
    fn attribute_location(&self, program: RawProgram, index: u32) -> Option<u32>;

    // Parameter registers.
    fn uniform4fv(&mut self, register: u32, value: [f32; 4]);
    fn uniform_matrix4fv(&mut self, register: u32, value: [f32; 16]);

    // Fixed-function state.
    fn enable(&mut self, cap: u32);
    fn disable(&mut self, cap: u32);
    fn depth_func(&mut self, func: u32);
    fn depth_mask(&mut self, write: bool);
    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, read_mask: u32);
    fn stencil_op_separate(&mut self, face: u32, stencil_fail: u32, depth_fail: u32, pass: u32);
    fn stencil_mask_separate(&mut self, face: u32, write_mask: u32);
    fn cull_face(&mut self, face: u32);
    fn front_face(&mut self, winding: u32);

    // Vertex attributes.
    fn enable_vertex_attrib(&mut self, slot: u32);
    fn disable_vertex_attrib(&mut self, slot: u32);
    /// Describe `slot` against the currently bound `ARRAY_BUFFER`.
    fn vertex_attrib_pointer(
        &mut self,
        slot: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: usize,
    );
    /// Describe `slot` against client memory (`ARRAY_BUFFER` must be unbound).
    #[allow(clippy::too_many_arguments)]
    fn vertex_attrib_pointer_client(
        &mut self,
        slot: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        data: &[u8],
        offset: usize,
    );

    // Clears.
    fn clear_color(&mut self, color: [f32; 4]);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, stencil: i32);
    fn clear(&mut self, mask: u32);

    // Draw submission.
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: usize);
    fn draw_elements_client(&mut self, mode: u32, count: i32, index_type: u32, indices: &[u8]);

    fn flush(&mut self);
}
