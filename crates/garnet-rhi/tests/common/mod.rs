//! Shared fixtures for the integration tests: a trace-backed device and the
//! usual shader/layout/buffer shapes.

#![allow(dead_code)]

use std::rc::Rc;

use garnet_rhi::{
    Buffer, BufferKind, DeviceCapabilities, GraphicsDevice, LayoutElement, Shader, SurfaceSize,
    VertexFormat, VertexLayout, VertexUsage,
};
use garnet_rhi_trace::TraceContext;

pub const FRAGMENT_SOURCE: &str = "void main() { gl_FragColor = vec4(1.0); }\n";

pub fn device() -> GraphicsDevice<TraceContext> {
    device_with_slots(16)
}

pub fn device_with_slots(max_attribute_slots: u32) -> GraphicsDevice<TraceContext> {
    let caps = DeviceCapabilities {
        max_attribute_slots,
        ..DeviceCapabilities::default()
    };
    GraphicsDevice::new(
        TraceContext::new(),
        caps,
        SurfaceSize {
            width: 800,
            height: 600,
        },
    )
}

/// A vertex source declaring `attributes` attribute lines, which the trace
/// context's fake reflection reports back as the active attribute count.
pub fn vertex_source(attributes: usize) -> String {
    let mut source = String::new();
    for i in 0..attributes {
        source.push_str(&format!("attribute vec4 a{i};\n"));
    }
    source.push_str("void main() { gl_Position = vec4(0.0); }\n");
    source
}

pub fn shader_with_attributes(
    device: &mut GraphicsDevice<TraceContext>,
    attributes: usize,
) -> Rc<Shader> {
    let vs = vertex_source(attributes);
    device.create_shader(None, &vs, FRAGMENT_SOURCE).unwrap()
}

/// Float3 position + Float2 texcoord, both on stage 0 (stride 20).
pub fn position_uv_layout(device: &mut GraphicsDevice<TraceContext>) -> Rc<VertexLayout> {
    device
        .create_layout(&[
            LayoutElement::new(0, VertexFormat::Float3, VertexUsage::Position, 0),
            LayoutElement::new(0, VertexFormat::Float2, VertexUsage::TexCoord, 12),
        ])
        .unwrap()
}

/// `elements` Float4 attributes on stage 0 (stride `16 * elements`).
pub fn wide_layout(
    device: &mut GraphicsDevice<TraceContext>,
    elements: u32,
) -> Rc<VertexLayout> {
    let elements: Vec<_> = (0..elements)
        .map(|i| LayoutElement::new(0, VertexFormat::Float4, VertexUsage::TexCoord, i * 16))
        .collect();
    device.create_layout(&elements).unwrap()
}

pub fn vertex_buffer(
    device: &mut GraphicsDevice<TraceContext>,
    element_count: u32,
    stride: u32,
) -> Rc<Buffer> {
    device
        .create_buffer(BufferKind::Vertex, element_count, stride, None)
        .unwrap()
}

pub fn index_buffer(
    device: &mut GraphicsDevice<TraceContext>,
    element_count: u32,
    stride: u32,
) -> Rc<Buffer> {
    device
        .create_buffer(BufferKind::Index, element_count, stride, None)
        .unwrap()
}

/// Shader + position/uv layout + a matching stream-0 buffer, ready to draw.
pub fn prime_triangle(device: &mut GraphicsDevice<TraceContext>) {
    let shader = shader_with_attributes(device, 2);
    let layout = position_uv_layout(device);
    let buffer = vertex_buffer(device, 3, 20);
    device.set_shader(Some(shader));
    device.set_vertex_layout(Some(layout));
    device.bind_vertex_buffer(0, Some(buffer)).unwrap();
}
