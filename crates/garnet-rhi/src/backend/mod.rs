//! The state committer: reconciles pending (requested) render state against
//! session (last-applied) state immediately before each draw, emitting only
//! the native calls needed to make reality match intent.
//!
//! Reconciliation is best-effort and non-transactional: commit-time
//! mismatches are logged and skipped, and native calls already emitted in the
//! same commit are not rolled back. Only a missing shader/layout, a failed
//! link, or an unresolvable index width fails the draw itself.

mod bind_cache;
mod session;

use std::rc::Rc;

use tracing::{debug, warn};

use crate::context::{glconst, GlContext, RawBuffer, RawProgram};
use crate::error::{DeviceError, DrawError};
use crate::params::{RenderParams, BONE_UNIFORM_BASE, MATRIX_UNIFORM_BASE};
use crate::resources::{Buffer, BufferKind, Reflection, Shader};
use crate::state::topology::{gl_mode, Topology};
use crate::state::{
    compare_to_gl, stencil_op_to_gl, winding_to_gl, CullMode, DepthStencilDesc, DepthStencilState,
    FillMode, RasterizerDesc, RasterizerState, StencilFaceDesc,
};
use crate::stats::{CommitStats, InvocationCounters};
use crate::vertex::{VertexLayout, MAX_VERTEX_STAGES};

use bind_cache::{BindCache, BindTarget};
use session::{AttribDesc, SessionState, StencilFaceSession};

/// Client-memory index data for the pointer-draw variants. The index width is
/// carried by the slice type, mirroring how buffer-backed draws resolve it
/// from the bound buffer's stride.
#[derive(Debug, Clone, Copy)]
pub enum ClientIndices<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl ClientIndices<'_> {
    pub fn len(&self) -> usize {
        match self {
            ClientIndices::U16(s) => s.len(),
            ClientIndices::U32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Render state requested by the most recent facade calls. Buffer/shader/
/// layout slots hold shared references (assigning a slot drops the previous
/// occupant); depth/stencil and rasterizer properties are by-value copies so
/// an unset slot commits the documented defaults, never leftover values.
#[derive(Debug, Default)]
struct PendingState {
    streams: [Option<Rc<Buffer>>; MAX_VERTEX_STAGES],
    indices: Option<Rc<Buffer>>,
    shader: Option<Rc<Shader>>,
    layout: Option<Rc<VertexLayout>>,
    depth_stencil: DepthStencilDesc,
    rasterizer: RasterizerDesc,
}

pub(crate) struct Committer {
    max_attribute_slots: u32,
    pending: PendingState,
    session: SessionState,
    bind_cache: BindCache,
    stats: CommitStats,
}

impl Committer {
    pub(crate) fn new(max_attribute_slots: u32) -> Self {
        Self {
            max_attribute_slots,
            pending: PendingState::default(),
            session: SessionState::new(max_attribute_slots),
            bind_cache: BindCache::default(),
            stats: CommitStats::default(),
        }
    }

    pub(crate) fn stats(&self) -> CommitStats {
        self.stats
    }

    /// Forget every session cache; the next draw recommits everything.
    pub(crate) fn invalidate_session(&mut self) {
        self.session.invalidate();
        self.bind_cache.invalidate();
    }

    // ------------------------------------------------------------------
    // Pending-state setters.
    // ------------------------------------------------------------------

    pub(crate) fn bind_vertex_buffer(
        &mut self,
        stage: usize,
        buffer: Option<Rc<Buffer>>,
    ) -> Result<(), DeviceError> {
        if stage >= MAX_VERTEX_STAGES {
            return Err(DeviceError::StageOutOfRange {
                stage,
                max: MAX_VERTEX_STAGES,
            });
        }
        if let Some(b) = &buffer {
            if b.kind() != BufferKind::Vertex {
                return Err(DeviceError::BufferKindMismatch {
                    expected: BufferKind::Vertex,
                    actual: b.kind(),
                });
            }
        }
        self.pending.streams[stage] = buffer;
        Ok(())
    }

    pub(crate) fn bind_index_buffer(
        &mut self,
        buffer: Option<Rc<Buffer>>,
    ) -> Result<(), DeviceError> {
        if let Some(b) = &buffer {
            if b.kind() != BufferKind::Index {
                return Err(DeviceError::BufferKindMismatch {
                    expected: BufferKind::Index,
                    actual: b.kind(),
                });
            }
        }
        self.pending.indices = buffer;
        Ok(())
    }

    pub(crate) fn set_shader(&mut self, shader: Option<Rc<Shader>>) {
        self.pending.shader = shader;
    }

    pub(crate) fn set_vertex_layout(&mut self, layout: Option<Rc<VertexLayout>>) {
        self.pending.layout = layout;
    }

    pub(crate) fn set_depth_stencil(&mut self, state: Option<&DepthStencilState>) {
        self.pending.depth_stencil = state.map(|s| *s.desc()).unwrap_or_default();
    }

    pub(crate) fn set_rasterizer(&mut self, state: Option<&RasterizerState>) {
        self.pending.rasterizer = state.map(|s| *s.desc()).unwrap_or_default();
    }

    // ------------------------------------------------------------------
    // Buffer lifecycle plumbing used by the device facade.
    // ------------------------------------------------------------------

    /// Bind `buffer` to the staging/transfer target for an upload or
    /// readback, leaving the draw-path bindings cached.
    pub(crate) fn bind_transfer<C: GlContext>(&mut self, ctx: &mut C, buffer: Option<RawBuffer>) {
        self.bind_cache
            .bind(ctx, BindTarget::Transfer, buffer, &mut self.stats);
    }

    /// Release any pending slot holding `buffer`.
    pub(crate) fn release_buffer(&mut self, buffer: &Rc<Buffer>) {
        for slot in &mut self.pending.streams {
            if slot.as_ref().is_some_and(|b| Rc::ptr_eq(b, buffer)) {
                *slot = None;
            }
        }
        if self
            .pending
            .indices
            .as_ref()
            .is_some_and(|b| Rc::ptr_eq(b, buffer))
        {
            self.pending.indices = None;
        }
    }

    /// Delete a native buffer and drop every cache entry that references it.
    pub(crate) fn forget_native<C: GlContext>(&mut self, ctx: &mut C, native: RawBuffer) {
        self.bind_cache.forget(native);
        self.session.forget_buffer(native.0);
        ctx.delete_buffer(native);
    }

    // ------------------------------------------------------------------
    // Draw dispatch.
    // ------------------------------------------------------------------

    pub(crate) fn draw_arrays<C: GlContext>(
        &mut self,
        ctx: &mut C,
        params: &RenderParams,
        counters: &mut InvocationCounters,
        topology: Topology,
        first: u32,
        count: u32,
    ) -> Result<(), DrawError> {
        self.commit(ctx, params, counters)?;
        ctx.draw_arrays(gl_mode(topology), first as i32, count as i32);
        Ok(())
    }

    pub(crate) fn draw_indexed<C: GlContext>(
        &mut self,
        ctx: &mut C,
        params: &RenderParams,
        counters: &mut InvocationCounters,
        topology: Topology,
        count: u32,
        first_index: u32,
    ) -> Result<(), DrawError> {
        let index_buffer = self
            .pending
            .indices
            .clone()
            .ok_or(DrawError::MissingIndexBuffer)?;
        // Resolve the native index width before anything is emitted: an
        // unresolvable stride fails the draw with zero native calls.
        let index_type = index_gl_type(index_buffer.stride())?;
        self.commit(ctx, params, counters)?;
        self.bind_cache.bind(
            ctx,
            BindTarget::Index,
            Some(index_buffer.native()),
            &mut self.stats,
        );
        let byte_offset = first_index as usize * index_buffer.stride() as usize;
        ctx.draw_elements(gl_mode(topology), count as i32, index_type, byte_offset);
        Ok(())
    }

    pub(crate) fn draw_client<C: GlContext>(
        &mut self,
        ctx: &mut C,
        params: &RenderParams,
        counters: &mut InvocationCounters,
        topology: Topology,
        vertices: &[u8],
        count: u32,
        stride: u32,
    ) -> Result<(), DrawError> {
        self.commit_client(ctx, params, counters, vertices, stride)?;
        ctx.draw_arrays(gl_mode(topology), 0, count as i32);
        Ok(())
    }

    pub(crate) fn draw_client_indexed<C: GlContext>(
        &mut self,
        ctx: &mut C,
        params: &RenderParams,
        counters: &mut InvocationCounters,
        topology: Topology,
        vertices: &[u8],
        stride: u32,
        indices: ClientIndices<'_>,
    ) -> Result<(), DrawError> {
        self.commit_client(ctx, params, counters, vertices, stride)?;
        let (index_type, index_bytes): (u32, &[u8]) = match indices {
            ClientIndices::U16(s) => (glconst::UNSIGNED_SHORT, bytemuck::cast_slice(s)),
            ClientIndices::U32(s) => (glconst::UNSIGNED_INT, bytemuck::cast_slice(s)),
        };
        ctx.draw_elements_client(
            gl_mode(topology),
            indices.len() as i32,
            index_type,
            index_bytes,
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Commit pipeline: shader, layout, depth/stencil, rasterizer.
    // ------------------------------------------------------------------

    fn commit<C: GlContext>(
        &mut self,
        ctx: &mut C,
        params: &RenderParams,
        counters: &mut InvocationCounters,
    ) -> Result<(), DrawError> {
        let shader = self.pending.shader.clone().ok_or(DrawError::MissingShader)?;
        let layout = self.pending.layout.clone().ok_or(DrawError::MissingLayout)?;
        let linked = shader
            .ensure_linked(ctx)
            .ok_or_else(|| DrawError::ShaderLinkFailed {
                name: shader.name().to_owned(),
            })?;
        let program = linked.program;
        self.commit_shader(ctx, program, params, counters);
        self.commit_layout(ctx, &layout, &linked.reflection);
        self.commit_depth_stencil(ctx);
        self.commit_rasterizer(ctx);
        Ok(())
    }

    fn commit_client<C: GlContext>(
        &mut self,
        ctx: &mut C,
        params: &RenderParams,
        counters: &mut InvocationCounters,
        vertices: &[u8],
        stride: u32,
    ) -> Result<(), DrawError> {
        let shader = self.pending.shader.clone().ok_or(DrawError::MissingShader)?;
        let layout = self.pending.layout.clone().ok_or(DrawError::MissingLayout)?;
        let linked = shader
            .ensure_linked(ctx)
            .ok_or_else(|| DrawError::ShaderLinkFailed {
                name: shader.name().to_owned(),
            })?;
        let program = linked.program;
        self.commit_shader(ctx, program, params, counters);
        self.commit_layout_client(ctx, &layout, &linked.reflection, vertices, stride);
        self.commit_depth_stencil(ctx);
        self.commit_rasterizer(ctx);
        Ok(())
    }

    fn commit_shader<C: GlContext>(
        &mut self,
        ctx: &mut C,
        program: RawProgram,
        params: &RenderParams,
        counters: &mut InvocationCounters,
    ) {
        if self.session.program != Some(program) {
            ctx.use_program(Some(program));
            self.session.program = Some(program);
            counters.shader_binds += 1;
        }
        // Parameter registers are re-pushed on every commit regardless of
        // program identity; their values may change every frame even when the
        // program does not.
        for (register, value) in params.written_vectors() {
            ctx.uniform4fv(register, value.to_array());
        }
        for (register, value) in params.written_matrices() {
            ctx.uniform_matrix4fv(MATRIX_UNIFORM_BASE + register, value.to_cols_array());
        }
        if let Some(bones) = params.bones() {
            for (i, bone) in bones.iter().enumerate() {
                ctx.uniform_matrix4fv(BONE_UNIFORM_BASE + i as u32, bone.to_cols_array());
            }
        }
    }

    /// Walk declared stream stages in fixed order, maintaining a running
    /// logical attribute index across all stages, and reconcile each mapped
    /// slot's enable bit and binding descriptor.
    fn commit_layout<C: GlContext>(
        &mut self,
        ctx: &mut C,
        layout: &VertexLayout,
        reflection: &Reflection,
    ) {
        let max_slots = self.max_attribute_slots;
        let mut logical = 0u32;
        let mut touched = 0u64;
        let mut overflow = 0u32;

        for stage in 0..MAX_VERTEX_STAGES {
            let declared = layout.stage_element_count(stage);
            if declared == 0 {
                continue;
            }
            match self.pending.streams[stage].clone() {
                Some(buffer) => {
                    self.bind_cache.bind(
                        ctx,
                        BindTarget::Vertex,
                        Some(buffer.native()),
                        &mut self.stats,
                    );
                    let stride = layout.stage_stride(stage) as i32;
                    for element in layout.elements_of(stage) {
                        let Some(slot) = map_slot(
                            reflection,
                            logical,
                            max_slots,
                            &mut self.stats,
                            &mut overflow,
                        ) else {
                            logical += 1;
                            continue;
                        };
                        let desc = AttribDesc {
                            buffer: buffer.native().0,
                            size: element.format.component_count(),
                            ty: element.format.gl_type(),
                            normalized: element.normalized,
                            stride,
                            offset: element.offset as usize,
                        };
                        let bit = 1u64 << slot;
                        if self.session.enabled_mask & bit == 0 {
                            ctx.enable_vertex_attrib(slot);
                            self.session.enabled_mask |= bit;
                        }
                        if self.session.attribs[slot as usize] != Some(desc) {
                            ctx.vertex_attrib_pointer(
                                slot,
                                desc.size,
                                desc.ty,
                                desc.normalized,
                                desc.stride,
                                desc.offset,
                            );
                            self.session.attribs[slot as usize] = Some(desc);
                        } else {
                            self.stats.elided_attribute_updates += 1;
                        }
                        touched |= bit;
                        logical += 1;
                    }
                }
                None => {
                    // Still advance the logical index by the declared element
                    // count so later stages are not misaligned; reset the
                    // slot so a shader reading a missing stream observes zero
                    // rather than stale memory.
                    for _ in 0..declared {
                        if let Some(slot) = reflection.slot(logical) {
                            if slot < max_slots {
                                let bit = 1u64 << slot;
                                if self.session.enabled_mask & bit != 0 {
                                    ctx.disable_vertex_attrib(slot);
                                    self.session.enabled_mask &= !bit;
                                }
                                self.session.attribs[slot as usize] = Some(AttribDesc::ZERO);
                            }
                        }
                        logical += 1;
                    }
                }
            }
        }

        // Disable anything a previous, heavier layout left enabled.
        let mut leftovers = self.session.enabled_mask & !touched;
        while leftovers != 0 {
            let slot = leftovers.trailing_zeros();
            ctx.disable_vertex_attrib(slot);
            leftovers &= leftovers - 1;
        }
        self.session.enabled_mask = touched;

        if overflow > 0 {
            self.stats.layout_overflows += 1;
            warn!(
                skipped = overflow,
                max_slots, "vertex layout exceeds device attribute slots; extra elements skipped"
            );
        }
    }

    /// The pointer-draw variant: identical slot-mapping and diagnostics
    /// against one client-memory buffer and an externally supplied stride,
    /// with no buffer-bind step for the vertex data itself.
    fn commit_layout_client<C: GlContext>(
        &mut self,
        ctx: &mut C,
        layout: &VertexLayout,
        reflection: &Reflection,
        vertices: &[u8],
        caller_stride: u32,
    ) {
        let computed = layout.total_stride();
        let stride = if caller_stride != computed {
            self.stats.stride_mismatches += 1;
            warn!(
                caller_stride,
                layout_stride = computed,
                "client draw stride disagrees with layout; using the layout stride"
            );
            computed
        } else {
            caller_stride
        } as i32;

        // Client pointers require the vertex target to be unbound.
        self.bind_cache
            .bind(ctx, BindTarget::Vertex, None, &mut self.stats);

        let max_slots = self.max_attribute_slots;
        let mut logical = 0u32;
        let mut touched = 0u64;
        let mut overflow = 0u32;
        let mut stage_base = 0u32;

        for stage in 0..MAX_VERTEX_STAGES {
            for element in layout.elements_of(stage) {
                let Some(slot) = map_slot(
                    reflection,
                    logical,
                    max_slots,
                    &mut self.stats,
                    &mut overflow,
                ) else {
                    logical += 1;
                    continue;
                };
                let bit = 1u64 << slot;
                if self.session.enabled_mask & bit == 0 {
                    ctx.enable_vertex_attrib(slot);
                    self.session.enabled_mask |= bit;
                }
                ctx.vertex_attrib_pointer_client(
                    slot,
                    element.format.component_count(),
                    element.format.gl_type(),
                    element.normalized,
                    stride,
                    vertices,
                    (stage_base + element.offset) as usize,
                );
                // Client pointers must be re-specified every draw; the cached
                // descriptor becomes unknown.
                self.session.attribs[slot as usize] = None;
                touched |= bit;
                logical += 1;
            }
            stage_base += layout.stage_stride(stage);
        }

        let mut leftovers = self.session.enabled_mask & !touched;
        while leftovers != 0 {
            let slot = leftovers.trailing_zeros();
            ctx.disable_vertex_attrib(slot);
            leftovers &= leftovers - 1;
        }
        self.session.enabled_mask = touched;

        if overflow > 0 {
            self.stats.layout_overflows += 1;
            warn!(
                skipped = overflow,
                max_slots, "vertex layout exceeds device attribute slots; extra elements skipped"
            );
        }
    }

    fn commit_depth_stencil<C: GlContext>(&mut self, ctx: &mut C) {
        let p = self.pending.depth_stencil;
        let s = &mut self.session.depth_stencil;

        if s.depth_test != Some(p.depth_test) {
            if p.depth_test {
                ctx.enable(glconst::DEPTH_TEST);
            } else {
                ctx.disable(glconst::DEPTH_TEST);
            }
            s.depth_test = Some(p.depth_test);
        }
        if s.depth_write != Some(p.depth_write) {
            ctx.depth_mask(p.depth_write);
            s.depth_write = Some(p.depth_write);
        }
        if s.depth_func != Some(p.depth_func) {
            ctx.depth_func(compare_to_gl(p.depth_func));
            s.depth_func = Some(p.depth_func);
        }
        if s.stencil_test != Some(p.stencil_test) {
            if p.stencil_test {
                ctx.enable(glconst::STENCIL_TEST);
            } else {
                ctx.disable(glconst::STENCIL_TEST);
            }
            s.stencil_test = Some(p.stencil_test);
        }
        // Toggling two-sidedness invalidates both faces' cached fields,
        // forcing a full reprogram on the comparison passes below.
        if s.two_sided != Some(p.two_sided) {
            s.front.invalidate();
            s.back.invalidate();
            s.two_sided = Some(p.two_sided);
        }
        if p.two_sided {
            commit_stencil_face(ctx, glconst::FRONT, &p.front, &mut s.front);
            commit_stencil_face(ctx, glconst::BACK, &p.back, &mut s.back);
        } else {
            commit_stencil_both_faces(ctx, &p.front, &mut s.front, &mut s.back);
        }
    }

    fn commit_rasterizer<C: GlContext>(&mut self, ctx: &mut C) {
        let p = self.pending.rasterizer;
        let s = &mut self.session.rasterizer;

        if s.cull != Some(p.cull) {
            match p.cull {
                CullMode::None => ctx.disable(glconst::CULL_FACE),
                mode => {
                    if !matches!(s.cull, Some(CullMode::Front | CullMode::Back)) {
                        ctx.enable(glconst::CULL_FACE);
                    }
                    ctx.cull_face(match mode {
                        CullMode::Front => glconst::FRONT,
                        _ => glconst::BACK,
                    });
                }
            }
            s.cull = Some(p.cull);
        }
        if s.winding != Some(p.winding) {
            ctx.front_face(winding_to_gl(p.winding));
            s.winding = Some(p.winding);
        }
        if s.fill != Some(p.fill) {
            if p.fill == FillMode::Wireframe {
                debug!("wireframe fill is not expressible in GLES; drawing solid");
            }
            s.fill = Some(p.fill);
        }
    }
}

/// Map a running logical attribute index to a native slot, or skip the
/// element with a diagnostic. Overflow past the device's slot capability is
/// tallied by the caller into a single per-commit warning.
fn map_slot(
    reflection: &Reflection,
    logical: u32,
    max_slots: u32,
    stats: &mut CommitStats,
    overflow: &mut u32,
) -> Option<u32> {
    if logical >= max_slots {
        *overflow += 1;
        return None;
    }
    match reflection.slot(logical) {
        Some(slot) if slot < max_slots => Some(slot),
        Some(slot) => {
            debug!(
                logical,
                slot, "reflected slot exceeds device attribute slots; skipping element"
            );
            stats.unmapped_attributes += 1;
            None
        }
        None => {
            debug!(
                logical,
                "shader does not reflect a slot for layout element; skipping"
            );
            stats.unmapped_attributes += 1;
            None
        }
    }
}

fn commit_stencil_face<C: GlContext>(
    ctx: &mut C,
    face: u32,
    desc: &StencilFaceDesc,
    cache: &mut StencilFaceSession,
) {
    let func = (desc.func, desc.reference, desc.read_mask);
    if cache.func != Some(func) {
        ctx.stencil_func_separate(face, compare_to_gl(desc.func), desc.reference, desc.read_mask);
        cache.func = Some(func);
    }
    let ops = (desc.fail_op, desc.depth_fail_op, desc.pass_op);
    if cache.ops != Some(ops) {
        ctx.stencil_op_separate(
            face,
            stencil_op_to_gl(desc.fail_op),
            stencil_op_to_gl(desc.depth_fail_op),
            stencil_op_to_gl(desc.pass_op),
        );
        cache.ops = Some(ops);
    }
    if cache.write_mask != Some(desc.write_mask) {
        ctx.stencil_mask_separate(face, desc.write_mask);
        cache.write_mask = Some(desc.write_mask);
    }
}

/// Single-sided mode: the front block programs both native faces with one
/// `FRONT_AND_BACK` call per differing group.
fn commit_stencil_both_faces<C: GlContext>(
    ctx: &mut C,
    desc: &StencilFaceDesc,
    front: &mut StencilFaceSession,
    back: &mut StencilFaceSession,
) {
    let func = (desc.func, desc.reference, desc.read_mask);
    if front.func != Some(func) || back.func != Some(func) {
        ctx.stencil_func_separate(
            glconst::FRONT_AND_BACK,
            compare_to_gl(desc.func),
            desc.reference,
            desc.read_mask,
        );
        front.func = Some(func);
        back.func = Some(func);
    }
    let ops = (desc.fail_op, desc.depth_fail_op, desc.pass_op);
    if front.ops != Some(ops) || back.ops != Some(ops) {
        ctx.stencil_op_separate(
            glconst::FRONT_AND_BACK,
            stencil_op_to_gl(desc.fail_op),
            stencil_op_to_gl(desc.depth_fail_op),
            stencil_op_to_gl(desc.pass_op),
        );
        front.ops = Some(ops);
        back.ops = Some(ops);
    }
    if front.write_mask != Some(desc.write_mask) || back.write_mask != Some(desc.write_mask) {
        ctx.stencil_mask_separate(glconst::FRONT_AND_BACK, desc.write_mask);
        front.write_mask = Some(desc.write_mask);
        back.write_mask = Some(desc.write_mask);
    }
}

/// Native index type for an index buffer stride; 2 and 4 are the only widths
/// the native API accepts.
fn index_gl_type(stride: u32) -> Result<u32, DrawError> {
    match stride {
        2 => Ok(glconst::UNSIGNED_SHORT),
        4 => Ok(glconst::UNSIGNED_INT),
        stride => Err(DrawError::UnsupportedIndexStride { stride }),
    }
}
