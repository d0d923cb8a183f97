//! Buffer and shader resource objects.
//!
//! Resources are `Rc`-shared property bags around native handles. The device
//! is single-threaded by contract, so the shader's link-once cache uses
//! `OnceCell` rather than a lock.

use std::cell::OnceCell;

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::context::{glconst, GlContext, RawBuffer, RawProgram};

/// What a buffer holds, and therefore which pending slot will accept it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Native-handle wrapper for a vertex or index buffer.
///
/// Created exclusively owned by the factory caller; binding it to a pending
/// slot shares it (the slot holds an `Rc` clone) until the slot is
/// reassigned.
#[derive(Debug)]
pub struct Buffer {
    kind: BufferKind,
    element_count: u32,
    stride: u32,
    native: RawBuffer,
}

impl Buffer {
    pub(crate) fn new(kind: BufferKind, element_count: u32, stride: u32, native: RawBuffer) -> Self {
        Self {
            kind,
            element_count,
            stride,
            native,
        }
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn size_bytes(&self) -> usize {
        self.element_count as usize * self.stride as usize
    }

    pub(crate) fn native(&self) -> RawBuffer {
        self.native
    }
}

/// Attribute reflection table of a linked program: logical attribute index to
/// native slot, populated only for slots the program actually declares.
#[derive(Debug)]
pub(crate) struct Reflection {
    slots: HashMap<u32, u32>,
    used_mask: u64,
    count: u32,
}

impl Reflection {
    /// Queried once, immediately after link, and cached for the program's
    /// lifetime.
    pub(crate) fn query<C: GlContext>(ctx: &C, program: RawProgram) -> Self {
        let count = ctx.active_attribute_count(program);
        let mut slots = HashMap::with_capacity(count as usize);
        let mut used_mask = 0u64;
        for logical in 0..count {
            match ctx.attribute_location(program, logical) {
                Some(slot) => {
                    slots.insert(logical, slot);
                    if slot < u64::BITS as u32 {
                        used_mask |= 1 << slot;
                    }
                }
                None => {
                    debug!(logical, "program reflects no slot for attribute");
                }
            }
        }
        Self {
            slots,
            used_mask,
            count,
        }
    }

    /// Native slot for a logical attribute index, if the program declares one.
    pub(crate) fn slot(&self, logical: u32) -> Option<u32> {
        self.slots.get(&logical).copied()
    }

    pub(crate) fn attribute_count(&self) -> u32 {
        self.count
    }

    #[allow(dead_code)]
    pub(crate) fn used_mask(&self) -> u64 {
        self.used_mask
    }
}

#[derive(Debug)]
pub(crate) struct LinkedProgram {
    pub program: RawProgram,
    pub reflection: Reflection,
}

/// A shader pair with a deferred-linked native program.
///
/// Compilation and link happen on first use in a commit; the outcome
/// (including failure) is cached so a bad program fails each subsequent draw
/// without relinking.
#[derive(Debug)]
pub struct Shader {
    name: String,
    vertex_source: String,
    fragment_source: String,
    linked: OnceCell<Option<LinkedProgram>>,
}

impl Shader {
    pub(crate) fn new(name: String, vertex_source: String, fragment_source: String) -> Self {
        Self {
            name,
            vertex_source,
            fragment_source,
            linked: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn ensure_linked<C: GlContext>(&self, ctx: &mut C) -> Option<&LinkedProgram> {
        self.linked
            .get_or_init(|| {
                let vertex = match ctx.compile_shader(glconst::VERTEX_SHADER, &self.vertex_source)
                {
                    Some(s) => s,
                    None => {
                        warn!(name = %self.name, "vertex shader compilation failed");
                        return None;
                    }
                };
                let fragment =
                    match ctx.compile_shader(glconst::FRAGMENT_SHADER, &self.fragment_source) {
                        Some(s) => s,
                        None => {
                            warn!(name = %self.name, "fragment shader compilation failed");
                            return None;
                        }
                    };
                let program = match ctx.link_program(vertex, fragment) {
                    Some(p) => p,
                    None => {
                        warn!(name = %self.name, "program link failed");
                        return None;
                    }
                };
                let reflection = Reflection::query(ctx, program);
                debug!(
                    name = %self.name,
                    attributes = reflection.attribute_count(),
                    "linked shader program"
                );
                Some(LinkedProgram {
                    program,
                    reflection,
                })
            })
            .as_ref()
    }
}
