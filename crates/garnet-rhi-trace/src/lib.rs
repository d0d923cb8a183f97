//! A recording [`GlContext`] implementation.
//!
//! [`TraceContext`] logs every native call as a [`TraceCall`] value and backs
//! the object calls with fake stores: buffer bytes are kept so readback
//! round-trips, and program reflection is faked by parsing `attribute`
//! declarations from the vertex source (sequential slot assignment,
//! overridable per program). Used as the test double for `garnet-rhi`'s
//! integration tests and as a debugging backend.

use std::collections::HashMap;

use garnet_rhi::context::{GlContext, RawBuffer, RawProgram, RawShader};

/// One recorded native call.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceCall {
    CreateBuffer {
        id: u32,
    },
    DeleteBuffer {
        id: u32,
    },
    /// `id` 0 records an unbind.
    BindBuffer {
        target: u32,
        id: u32,
    },
    BufferData {
        target: u32,
        len: usize,
        usage: u32,
    },
    BufferSubData {
        target: u32,
        offset: usize,
        len: usize,
    },
    CompileShader {
        stage: u32,
        id: u32,
    },
    LinkProgram {
        id: u32,
    },
    UseProgram {
        id: u32,
    },
    Uniform4 {
        register: u32,
        value: [f32; 4],
    },
    UniformMatrix4 {
        register: u32,
        value: [f32; 16],
    },
    Enable {
        cap: u32,
    },
    Disable {
        cap: u32,
    },
    DepthFunc {
        func: u32,
    },
    DepthMask {
        write: bool,
    },
    StencilFunc {
        face: u32,
        func: u32,
        reference: i32,
        read_mask: u32,
    },
    StencilOp {
        face: u32,
        stencil_fail: u32,
        depth_fail: u32,
        pass: u32,
    },
    StencilMask {
        face: u32,
        write_mask: u32,
    },
    CullFace {
        face: u32,
    },
    FrontFace {
        winding: u32,
    },
    EnableVertexAttrib {
        slot: u32,
    },
    DisableVertexAttrib {
        slot: u32,
    },
    VertexAttribPointer {
        slot: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: usize,
    },
    VertexAttribPointerClient {
        slot: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: usize,
    },
    ClearColor {
        color: [f32; 4],
    },
    ClearDepth {
        depth: f32,
    },
    ClearStencil {
        stencil: i32,
    },
    Clear {
        mask: u32,
    },
    DrawArrays {
        mode: u32,
        first: i32,
        count: i32,
    },
    DrawElements {
        mode: u32,
        count: i32,
        index_type: u32,
        offset: usize,
    },
    DrawElementsClient {
        mode: u32,
        count: i32,
        index_type: u32,
    },
    Flush,
}

impl TraceCall {
    /// A state-changing call: anything that reprograms the native context for
    /// subsequent draws. Parameter pushes and draw submissions are excluded,
    /// as are object creation, data transfer, and clear calls.
    pub fn is_state(&self) -> bool {
        matches!(
            self,
            TraceCall::BindBuffer { .. }
                | TraceCall::UseProgram { .. }
                | TraceCall::Enable { .. }
                | TraceCall::Disable { .. }
                | TraceCall::DepthFunc { .. }
                | TraceCall::DepthMask { .. }
                | TraceCall::StencilFunc { .. }
                | TraceCall::StencilOp { .. }
                | TraceCall::StencilMask { .. }
                | TraceCall::CullFace { .. }
                | TraceCall::FrontFace { .. }
                | TraceCall::EnableVertexAttrib { .. }
                | TraceCall::DisableVertexAttrib { .. }
                | TraceCall::VertexAttribPointer { .. }
                | TraceCall::VertexAttribPointerClient { .. }
        )
    }

    /// A parameter-register push.
    pub fn is_parameter(&self) -> bool {
        matches!(
            self,
            TraceCall::Uniform4 { .. } | TraceCall::UniformMatrix4 { .. }
        )
    }

    /// A work-submitting call: a draw, a clear, or a flush.
    pub fn is_submission(&self) -> bool {
        self.is_draw() || matches!(self, TraceCall::Clear { .. } | TraceCall::Flush)
    }

    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            TraceCall::DrawArrays { .. }
                | TraceCall::DrawElements { .. }
                | TraceCall::DrawElementsClient { .. }
        )
    }
}

#[derive(Debug)]
struct ProgramRecord {
    attribute_count: u32,
    /// Slot per reflection index; `None` is a hole the linker assigned no
    /// slot to.
    locations: Vec<Option<u32>>,
}

/// Recording native sink with fake buffer/program stores.
#[derive(Debug, Default)]
pub struct TraceContext {
    calls: Vec<TraceCall>,
    next_id: u32,
    buffers: HashMap<u32, Vec<u8>>,
    /// Last-bound buffer id per target (0 = unbound).
    bound: HashMap<u32, u32>,
    shader_sources: HashMap<u32, String>,
    programs: HashMap<u32, ProgramRecord>,
    location_override: Option<Vec<Option<u32>>>,
    fail_next_buffer: bool,
    fail_next_compile: bool,
    fail_next_link: bool,
}

impl TraceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[TraceCall] {
        &self.calls
    }

    /// Drain the call log, leaving the object stores intact. Tests bracket
    /// the calls under scrutiny with this.
    pub fn take_calls(&mut self) -> Vec<TraceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn state_calls(&self) -> impl Iterator<Item = &TraceCall> {
        self.calls.iter().filter(|c| c.is_state())
    }

    /// Bytes currently stored for native buffer `id`.
    pub fn buffer_bytes(&self, id: u32) -> Option<&[u8]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }

    /// Replace the sequential slot assignment for the next linked program,
    /// simulating a linker that remaps attributes or leaves holes.
    pub fn override_next_program_locations(&mut self, locations: Vec<Option<u32>>) {
        self.location_override = Some(locations);
    }

    /// Make the next `create_buffer` report failure.
    pub fn fail_next_buffer_creation(&mut self) {
        self.fail_next_buffer = true;
    }

    /// Make the next `compile_shader` report failure.
    pub fn fail_next_compile(&mut self) {
        self.fail_next_compile = true;
    }

    /// Make the next `link_program` report failure.
    pub fn fail_next_link(&mut self) {
        self.fail_next_link = true;
    }

    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn bound_buffer(&self, target: u32) -> u32 {
        self.bound.get(&target).copied().unwrap_or(0)
    }
}

/// Number of `attribute` declarations in a vertex source; the fake
/// reflection's active-attribute count.
fn count_attribute_declarations(source: &str) -> u32 {
    source
        .lines()
        .filter(|line| line.trim_start().starts_with("attribute "))
        .count() as u32
}

impl GlContext for TraceContext {
    fn create_buffer(&mut self) -> Option<RawBuffer> {
        if self.fail_next_buffer {
            self.fail_next_buffer = false;
            return None;
        }
        let id = self.alloc_id();
        self.buffers.insert(id, Vec::new());
        self.calls.push(TraceCall::CreateBuffer { id });
        Some(RawBuffer(id))
    }

    fn delete_buffer(&mut self, buffer: RawBuffer) {
        self.buffers.remove(&buffer.0);
        self.calls.push(TraceCall::DeleteBuffer { id: buffer.0 });
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<RawBuffer>) {
        let id = buffer.map_or(0, |b| b.0);
        self.bound.insert(target, id);
        self.calls.push(TraceCall::BindBuffer { target, id });
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        let id = self.bound_buffer(target);
        if let Some(store) = self.buffers.get_mut(&id) {
            *store = data.to_vec();
        }
        self.calls.push(TraceCall::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&mut self, target: u32, offset: usize, data: &[u8]) {
        let id = self.bound_buffer(target);
        if let Some(store) = self.buffers.get_mut(&id) {
            if store.len() < offset + data.len() {
                store.resize(offset + data.len(), 0);
            }
            store[offset..offset + data.len()].copy_from_slice(data);
        }
        self.calls.push(TraceCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn read_buffer_data(&self, target: u32, offset: usize, out: &mut [u8]) {
        let id = self.bound_buffer(target);
        if let Some(store) = self.buffers.get(&id) {
            out.copy_from_slice(&store[offset..offset + out.len()]);
        }
    }

    fn compile_shader(&mut self, stage: u32, source: &str) -> Option<RawShader> {
        if self.fail_next_compile {
            self.fail_next_compile = false;
            return None;
        }
        let id = self.alloc_id();
        self.shader_sources.insert(id, source.to_owned());
        self.calls.push(TraceCall::CompileShader { stage, id });
        Some(RawShader(id))
    }

    fn link_program(&mut self, vertex: RawShader, _fragment: RawShader) -> Option<RawProgram> {
        if self.fail_next_link {
            self.fail_next_link = false;
            return None;
        }
        let source = self.shader_sources.get(&vertex.0).cloned().unwrap_or_default();
        let attribute_count = count_attribute_declarations(&source);
        let locations = match self.location_override.take() {
            Some(locations) => locations,
            None => (0..attribute_count).map(Some).collect(),
        };
        let id = self.alloc_id();
        self.programs.insert(
            id,
            ProgramRecord {
                attribute_count,
                locations,
            },
        );
        self.calls.push(TraceCall::LinkProgram { id });
        Some(RawProgram(id))
    }

    fn use_program(&mut self, program: Option<RawProgram>) {
        self.calls.push(TraceCall::UseProgram {
            id: program.map_or(0, |p| p.0),
        });
    }

    fn active_attribute_count(&self, program: RawProgram) -> u32 {
        self.programs
            .get(&program.0)
            .map_or(0, |p| p.attribute_count)
    }

    fn attribute_location(&self, program: RawProgram, index: u32) -> Option<u32> {
        self.programs
            .get(&program.0)
            .and_then(|p| p.locations.get(index as usize).copied())
            .flatten()
    }

    fn uniform4fv(&mut self, register: u32, value: [f32; 4]) {
        self.calls.push(TraceCall::Uniform4 { register, value });
    }

    fn uniform_matrix4fv(&mut self, register: u32, value: [f32; 16]) {
        self.calls.push(TraceCall::UniformMatrix4 { register, value });
    }

    fn enable(&mut self, cap: u32) {
        self.calls.push(TraceCall::Enable { cap });
    }

    fn disable(&mut self, cap: u32) {
        self.calls.push(TraceCall::Disable { cap });
    }

    fn depth_func(&mut self, func: u32) {
        self.calls.push(TraceCall::DepthFunc { func });
    }

    fn depth_mask(&mut self, write: bool) {
        self.calls.push(TraceCall::DepthMask { write });
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, read_mask: u32) {
        self.calls.push(TraceCall::StencilFunc {
            face,
            func,
            reference,
            read_mask,
        });
    }

    fn stencil_op_separate(&mut self, face: u32, stencil_fail: u32, depth_fail: u32, pass: u32) {
        self.calls.push(TraceCall::StencilOp {
            face,
            stencil_fail,
            depth_fail,
            pass,
        });
    }

    fn stencil_mask_separate(&mut self, face: u32, write_mask: u32) {
        self.calls.push(TraceCall::StencilMask { face, write_mask });
    }

    fn cull_face(&mut self, face: u32) {
        self.calls.push(TraceCall::CullFace { face });
    }

    fn front_face(&mut self, winding: u32) {
        self.calls.push(TraceCall::FrontFace { winding });
    }

    fn enable_vertex_attrib(&mut self, slot: u32) {
        self.calls.push(TraceCall::EnableVertexAttrib { slot });
    }

    fn disable_vertex_attrib(&mut self, slot: u32) {
        self.calls.push(TraceCall::DisableVertexAttrib { slot });
    }

    fn vertex_attrib_pointer(
        &mut self,
        slot: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: usize,
    ) {
        self.calls.push(TraceCall::VertexAttribPointer {
            slot,
            size,
            ty,
            normalized,
            stride,
            offset,
        });
    }

    fn vertex_attrib_pointer_client(
        &mut self,
        slot: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        _data: &[u8],
        offset: usize,
    ) {
        self.calls.push(TraceCall::VertexAttribPointerClient {
            slot,
            size,
            ty,
            normalized,
            stride,
            offset,
        });
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        self.calls.push(TraceCall::ClearColor { color });
    }

    fn clear_depth(&mut self, depth: f32) {
        self.calls.push(TraceCall::ClearDepth { depth });
    }

    fn clear_stencil(&mut self, stencil: i32) {
        self.calls.push(TraceCall::ClearStencil { stencil });
    }

    fn clear(&mut self, mask: u32) {
        self.calls.push(TraceCall::Clear { mask });
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.calls.push(TraceCall::DrawArrays { mode, first, count });
    }

    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: usize) {
        self.calls.push(TraceCall::DrawElements {
            mode,
            count,
            index_type,
            offset,
        });
    }

    fn draw_elements_client(&mut self, mode: u32, count: i32, index_type: u32, _indices: &[u8]) {
        self.calls.push(TraceCall::DrawElementsClient {
            mode,
            count,
            index_type,
        });
    }

    fn flush(&mut self) {
        self.calls.push(TraceCall::Flush);
    }
}
