//! The graphics device facade.
//!
//! Owns the transform/parameter register blocks and the per-iteration
//! counters, validates every argument before anything native happens, and
//! dispatches draws to the committer. The facade is the only public entry
//! point; the committer and its session caches are internal.

use std::rc::Rc;

use bitflags::bitflags;
use glam::{Mat4, Vec4};
use tracing::{debug, warn};

use crate::backend::{ClientIndices, Committer};
use crate::context::{glconst, GlContext};
use crate::error::{DeviceError, DrawError};
use crate::params::RenderParams;
use crate::resources::{Buffer, BufferKind, Shader};
use crate::state::topology::{primitive_count, Topology};
use crate::state::{DepthStencilDesc, DepthStencilState, RasterizerDesc, RasterizerState};
use crate::stats::{CommitStats, InvocationCounters};
use crate::transform::{RenderTransform, SurfaceSize};
use crate::vertex::{LayoutElement, VertexLayout};

/// Highest attribute-slot count the session caches can represent; the slot
/// masks are `u64`.
pub const MAX_ATTRIBUTE_SLOT_LIMIT: u32 = 64;

/// Native limits reported by (or configured for) the underlying context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Vertex attribute slots; clamped to [`MAX_ATTRIBUTE_SLOT_LIMIT`] at
    /// device creation.
    pub max_attribute_slots: u32,
    pub max_vertex_buffers: u32,
    pub max_index_buffers: u32,
    pub max_textures: u32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        // The GLES 2.0 floor of 16 attribute slots.
        Self {
            max_attribute_slots: 16,
            max_vertex_buffers: 4096,
            max_index_buffers: 4096,
            max_textures: 1024,
        }
    }
}

bitflags! {
    /// Which buffers a [`GraphicsDevice::clear`] touches. Bit values are the
    /// native GLES clear-mask bits so the mask passes straight through.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        const COLOR = glconst::COLOR_BUFFER_BIT;
        const DEPTH = glconst::DEPTH_BUFFER_BIT;
        const STENCIL = glconst::STENCIL_BUFFER_BIT;
    }
}

/// The render-hardware-abstraction facade, generic over the native sink.
pub struct GraphicsDevice<C: GlContext> {
    ctx: C,
    caps: DeviceCapabilities,
    transform: RenderTransform,
    params: RenderParams,
    counters: InvocationCounters,
    committer: Committer,
    frame_open: bool,
    shader_counter: u64,
}

impl<C: GlContext> GraphicsDevice<C> {
    pub fn new(ctx: C, caps: DeviceCapabilities, surface: SurfaceSize) -> Self {
        let mut caps = caps;
        caps.max_attribute_slots = caps.max_attribute_slots.clamp(1, MAX_ATTRIBUTE_SLOT_LIMIT);
        Self {
            ctx,
            caps,
            transform: RenderTransform::new(surface),
            params: RenderParams::default(),
            counters: InvocationCounters::default(),
            committer: Committer::new(caps.max_attribute_slots),
            frame_open: false,
            shader_counter: 0,
        }
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.caps
    }

    pub fn transform(&self) -> &RenderTransform {
        &self.transform
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    pub fn counters(&self) -> InvocationCounters {
        self.counters
    }

    pub fn commit_stats(&self) -> CommitStats {
        self.committer.stats()
    }

    // ------------------------------------------------------------------
    // Frame bracket.
    // ------------------------------------------------------------------

    /// Zero the per-iteration counters. The frame loop calls this before
    /// anything else in each iteration.
    pub fn begin_iteration(&mut self) {
        self.counters.reset();
    }

    /// Recompute the size-dependent matrices, restore the register blocks to
    /// their defaults, and forget every session cache so the next draw
    /// recommits all native state. Invoked on drawable-surface resize, when
    /// the native context itself may have been recreated.
    pub fn reset(&mut self, surface: SurfaceSize) {
        debug!(
            width = surface.width,
            height = surface.height,
            "device reset"
        );
        self.transform.reset(surface);
        self.params.reset();
        self.committer.invalidate_session();
        self.frame_open = false;
    }

    /// Open the frame, optionally clearing all buffers to the background
    /// color first.
    pub fn begin(&mut self, clear: bool) {
        self.counters.invokes += 1;
        self.counters.begins += 1;
        self.frame_open = true;
        if clear {
            let background = self.params.background();
            self.ctx.clear_color(background.to_array());
            self.ctx.clear_depth(1.0);
            self.ctx.clear_stencil(0);
            self.ctx.clear(
                glconst::COLOR_BUFFER_BIT | glconst::DEPTH_BUFFER_BIT | glconst::STENCIL_BUFFER_BIT,
            );
        }
    }

    pub fn end(&mut self) {
        self.counters.invokes += 1;
        self.counters.ends += 1;
        self.frame_open = false;
    }

    /// Flush queued native work. A flush with the frame still open logs a
    /// warning and ends it implicitly first.
    pub fn flush(&mut self) {
        if self.frame_open {
            warn!("flush called with an open frame; ending it implicitly");
            self.end();
        }
        self.counters.invokes += 1;
        self.ctx.flush();
    }

    /// Clear the buffers named by `flags`. The mask must name at least one
    /// buffer; per-buffer clear values are set only for the named buffers.
    pub fn clear(
        &mut self,
        flags: ClearFlags,
        color: Vec4,
        depth: f32,
        stencil: i32,
    ) -> Result<(), DeviceError> {
        if flags.is_empty() {
            return Err(DeviceError::EmptyClearMask);
        }
        self.counters.invokes += 1;
        if flags.contains(ClearFlags::COLOR) {
            self.ctx.clear_color(color.to_array());
        }
        if flags.contains(ClearFlags::DEPTH) {
            self.ctx.clear_depth(depth);
        }
        if flags.contains(ClearFlags::STENCIL) {
            self.ctx.clear_stencil(stencil);
        }
        self.ctx.clear(flags.bits());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transform and parameter registers.
    // ------------------------------------------------------------------

    pub fn set_world(&mut self, world: Mat4) {
        self.transform.set_world(world);
        self.counters.invokes += 1;
        self.counters.transform_updates += 1;
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.transform.set_view(view);
        self.counters.invokes += 1;
        self.counters.transform_updates += 1;
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.transform.set_projection(projection);
        self.counters.invokes += 1;
        self.counters.transform_updates += 1;
    }

    pub fn set_background(&mut self, color: Vec4) {
        self.params.set_background(color);
        self.counters.invokes += 1;
    }

    pub fn set_param_vec(&mut self, index: usize, value: Vec4) -> Result<(), DeviceError> {
        self.params.set_vector(index, value)?;
        self.counters.invokes += 1;
        self.counters.param_writes += 1;
        Ok(())
    }

    pub fn set_param_mat(&mut self, index: usize, value: Mat4) -> Result<(), DeviceError> {
        self.params.set_matrix(index, value)?;
        self.counters.invokes += 1;
        self.counters.param_writes += 1;
        Ok(())
    }

    pub fn set_bone_matrices(&mut self, bones: &[Mat4]) -> Result<(), DeviceError> {
        self.params.set_bone_matrices(bones)?;
        self.counters.invokes += 1;
        self.counters.param_writes += 1;
        Ok(())
    }

    pub fn clear_bone_matrices(&mut self) {
        self.params.clear_bone_matrices();
        self.counters.invokes += 1;
    }

    // ------------------------------------------------------------------
    // Resource factories.
    // ------------------------------------------------------------------

    /// Create a buffer of `element_count` elements of `stride` bytes each,
    /// optionally initialized from `data` (whose length must then equal the
    /// buffer size). Without initial data the store is zero-filled.
    pub fn create_buffer(
        &mut self,
        kind: BufferKind,
        element_count: u32,
        stride: u32,
        data: Option<&[u8]>,
    ) -> Result<Rc<Buffer>, DeviceError> {
        if element_count == 0 {
            return Err(DeviceError::ZeroElementCount);
        }
        if stride == 0 {
            return Err(DeviceError::ZeroStride);
        }
        let size = element_count as usize * stride as usize;
        if let Some(data) = data {
            if data.len() != size {
                return Err(DeviceError::InitialDataSizeMismatch {
                    expected: size,
                    actual: data.len(),
                });
            }
        }
        let native = self
            .ctx
            .create_buffer()
            .ok_or(DeviceError::NativeCreationFailed { kind: "buffer" })?;
        self.committer.bind_transfer(&mut self.ctx, Some(native));
        match data {
            Some(data) => self
                .ctx
                .buffer_data(glconst::COPY_WRITE_BUFFER, data, glconst::STATIC_DRAW),
            None => {
                let zeros = vec![0u8; size];
                self.ctx
                    .buffer_data(glconst::COPY_WRITE_BUFFER, &zeros, glconst::DYNAMIC_DRAW);
            }
        }
        self.counters.invokes += 1;
        Ok(Rc::new(Buffer::new(kind, element_count, stride, native)))
    }

    /// Typed convenience over [`GraphicsDevice::create_buffer`]: one element
    /// per `T`, stride `size_of::<T>()`.
    pub fn create_buffer_with<T: bytemuck::Pod>(
        &mut self,
        kind: BufferKind,
        data: &[T],
    ) -> Result<Rc<Buffer>, DeviceError> {
        self.create_buffer(
            kind,
            data.len() as u32,
            std::mem::size_of::<T>() as u32,
            Some(bytemuck::cast_slice(data)),
        )
    }

    /// Overwrite a byte sub-range of an existing buffer.
    pub fn update_buffer(
        &mut self,
        buffer: &Rc<Buffer>,
        offset: usize,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        let write_end = offset + data.len();
        if write_end > buffer.size_bytes() {
            return Err(DeviceError::BufferWriteOutOfBounds {
                buffer_size: buffer.size_bytes(),
                write_end,
            });
        }
        self.committer
            .bind_transfer(&mut self.ctx, Some(buffer.native()));
        self.ctx
            .buffer_sub_data(glconst::COPY_WRITE_BUFFER, offset, data);
        self.counters.invokes += 1;
        Ok(())
    }

    /// Read a byte sub-range of a buffer back into `out`.
    pub fn read_buffer(
        &mut self,
        buffer: &Rc<Buffer>,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), DeviceError> {
        let read_end = offset + out.len();
        if read_end > buffer.size_bytes() {
            return Err(DeviceError::BufferWriteOutOfBounds {
                buffer_size: buffer.size_bytes(),
                write_end: read_end,
            });
        }
        self.committer
            .bind_transfer(&mut self.ctx, Some(buffer.native()));
        self.ctx
            .read_buffer_data(glconst::COPY_WRITE_BUFFER, offset, out);
        self.counters.invokes += 1;
        Ok(())
    }

    /// Destroy a buffer, deleting its native object. The handle passed in
    /// must be the last one: pending slots holding the buffer are released
    /// first, but clones held elsewhere make the destroy fail.
    pub fn destroy_buffer(&mut self, buffer: Rc<Buffer>) -> Result<(), DeviceError> {
        self.committer.release_buffer(&buffer);
        match Rc::try_unwrap(buffer) {
            Ok(buffer) => {
                self.committer.forget_native(&mut self.ctx, buffer.native());
                self.counters.invokes += 1;
                Ok(())
            }
            Err(shared) => Err(DeviceError::BufferStillShared {
                refs: Rc::strong_count(&shared) - 1,
            }),
        }
    }

    pub fn create_layout(
        &mut self,
        elements: &[LayoutElement],
    ) -> Result<Rc<VertexLayout>, DeviceError> {
        let layout = VertexLayout::validate(elements)?;
        self.counters.invokes += 1;
        Ok(Rc::new(layout))
    }

    /// Create a shader from vertex/fragment sources. Compilation and link are
    /// deferred to the first draw that commits the shader. Unnamed shaders
    /// are auto-named from a monotonic counter.
    pub fn create_shader(
        &mut self,
        name: Option<&str>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Rc<Shader>, DeviceError> {
        if vertex_source.trim().is_empty() {
            return Err(DeviceError::EmptyShaderSource { stage: "vertex" });
        }
        if fragment_source.trim().is_empty() {
            return Err(DeviceError::EmptyShaderSource { stage: "fragment" });
        }
        let name = match name {
            Some(name) => name.to_owned(),
            None => {
                self.shader_counter += 1;
                format!("shader-{}", self.shader_counter)
            }
        };
        self.counters.invokes += 1;
        Ok(Rc::new(Shader::new(
            name,
            vertex_source.to_owned(),
            fragment_source.to_owned(),
        )))
    }

    pub fn create_depth_stencil(
        &mut self,
        desc: DepthStencilDesc,
    ) -> Result<DepthStencilState, DeviceError> {
        let state = DepthStencilState::validate(desc)?;
        self.counters.invokes += 1;
        Ok(state)
    }

    pub fn create_rasterizer(
        &mut self,
        desc: RasterizerDesc,
    ) -> Result<RasterizerState, DeviceError> {
        let state = RasterizerState::validate(desc)?;
        self.counters.invokes += 1;
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Pending-state binds.
    // ------------------------------------------------------------------

    /// Bind a vertex buffer to a stream stage (or unbind with `None`). The
    /// previous occupant of the slot is released.
    pub fn bind_vertex_buffer(
        &mut self,
        stage: usize,
        buffer: Option<Rc<Buffer>>,
    ) -> Result<(), DeviceError> {
        self.committer.bind_vertex_buffer(stage, buffer)?;
        self.counters.invokes += 1;
        Ok(())
    }

    pub fn bind_index_buffer(&mut self, buffer: Option<Rc<Buffer>>) -> Result<(), DeviceError> {
        self.committer.bind_index_buffer(buffer)?;
        self.counters.invokes += 1;
        Ok(())
    }

    pub fn set_shader(&mut self, shader: Option<Rc<Shader>>) {
        self.committer.set_shader(shader);
        self.counters.invokes += 1;
    }

    pub fn set_vertex_layout(&mut self, layout: Option<Rc<VertexLayout>>) {
        self.committer.set_vertex_layout(layout);
        self.counters.invokes += 1;
    }

    /// Set the depth/stencil state; `None` restores the documented defaults.
    pub fn set_depth_stencil(&mut self, state: Option<&DepthStencilState>) {
        self.committer.set_depth_stencil(state);
        self.counters.invokes += 1;
    }

    /// Set the rasterizer state; `None` restores the documented defaults.
    pub fn set_rasterizer(&mut self, state: Option<&RasterizerState>) {
        self.committer.set_rasterizer(state);
        self.counters.invokes += 1;
    }

    // ------------------------------------------------------------------
    // Draws.
    // ------------------------------------------------------------------

    /// Non-indexed draw from the bound vertex stream(s).
    pub fn draw(&mut self, topology: Topology, first: u32, count: u32) -> Result<(), DrawError> {
        if count == 0 {
            return Err(DrawError::ZeroCount);
        }
        self.committer.draw_arrays(
            &mut self.ctx,
            &self.params,
            &mut self.counters,
            topology,
            first,
            count,
        )?;
        self.note_draw(topology, count);
        Ok(())
    }

    /// Indexed draw from the bound index buffer; the native index width is
    /// resolved from the index buffer's stride.
    pub fn draw_indexed(
        &mut self,
        topology: Topology,
        count: u32,
        first_index: u32,
    ) -> Result<(), DrawError> {
        if count == 0 {
            return Err(DrawError::ZeroCount);
        }
        self.committer.draw_indexed(
            &mut self.ctx,
            &self.params,
            &mut self.counters,
            topology,
            count,
            first_index,
        )?;
        self.note_draw(topology, count);
        Ok(())
    }

    /// Non-indexed draw from interleaved client-memory vertices.
    pub fn draw_client(
        &mut self,
        topology: Topology,
        vertices: &[u8],
        count: u32,
        stride: u32,
    ) -> Result<(), DrawError> {
        if count == 0 {
            return Err(DrawError::ZeroCount);
        }
        self.committer.draw_client(
            &mut self.ctx,
            &self.params,
            &mut self.counters,
            topology,
            vertices,
            count,
            stride,
        )?;
        self.note_draw(topology, count);
        Ok(())
    }

    /// Indexed draw from client-memory vertices and indices; the index width
    /// is carried by the [`ClientIndices`] variant.
    pub fn draw_client_indexed(
        &mut self,
        topology: Topology,
        vertices: &[u8],
        stride: u32,
        indices: ClientIndices<'_>,
    ) -> Result<(), DrawError> {
        if indices.is_empty() {
            return Err(DrawError::ZeroCount);
        }
        let count = indices.len() as u32;
        self.committer.draw_client_indexed(
            &mut self.ctx,
            &self.params,
            &mut self.counters,
            topology,
            vertices,
            stride,
            indices,
        )?;
        self.note_draw(topology, count);
        Ok(())
    }

    fn note_draw(&mut self, topology: Topology, count: u32) {
        self.counters.invokes += 1;
        self.counters.draws += 1;
        self.counters.primitives += primitive_count(topology, count) as u64;
    }
}
