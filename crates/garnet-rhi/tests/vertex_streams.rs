//! Multi-stream vertex layout commit: logical-index mapping through shader
//! reflection, slot enable bookkeeping, and overflow/unmapped diagnostics.

mod common;

use common::*;
use garnet_rhi::{LayoutElement, Topology, VertexFormat, VertexUsage};
use garnet_rhi_trace::TraceCall;
use pretty_assertions::assert_eq;

fn enabled_slots(calls: &[TraceCall]) -> Vec<u32> {
    let mut slots: Vec<u32> = calls
        .iter()
        .filter_map(|c| match c {
            TraceCall::EnableVertexAttrib { slot } => Some(*slot),
            _ => None,
        })
        .collect();
    slots.sort_unstable();
    slots
}

fn pointer_slots(calls: &[TraceCall]) -> Vec<u32> {
    let mut slots: Vec<u32> = calls
        .iter()
        .filter_map(|c| match c {
            TraceCall::VertexAttribPointer { slot, .. } => Some(*slot),
            _ => None,
        })
        .collect();
    slots.sort_unstable();
    slots
}

#[test]
fn enabled_slots_are_independent_of_bind_order() {
    let slots_for = |bind_first: bool| {
        let mut device = device();
        let shader = shader_with_attributes(&mut device, 2);
        let layout = position_uv_layout(&mut device);
        let buffer = vertex_buffer(&mut device, 3, 20);
        if bind_first {
            device.bind_vertex_buffer(0, Some(buffer)).unwrap();
            device.set_vertex_layout(Some(layout));
            device.set_shader(Some(shader));
        } else {
            device.set_shader(Some(shader));
            device.set_vertex_layout(Some(layout));
            device.bind_vertex_buffer(0, Some(buffer)).unwrap();
        }
        device.draw(Topology::TriangleList, 0, 3).unwrap();
        enabled_slots(device.context_mut().take_calls().as_slice())
    };

    assert_eq!(slots_for(true), slots_for(false));
    assert_eq!(slots_for(true), vec![0, 1]);
}

#[test]
fn missing_stage_disables_its_slots_and_later_rebind_redescribes() {
    let mut device = device();
    let shader = shader_with_attributes(&mut device, 3);
    let layout = device
        .create_layout(&[
            LayoutElement::new(0, VertexFormat::Float3, VertexUsage::Position, 0),
            LayoutElement::new(0, VertexFormat::Float2, VertexUsage::TexCoord, 12),
            LayoutElement::new(1, VertexFormat::UByte4, VertexUsage::Color, 0),
        ])
        .unwrap();
    let stream0 = vertex_buffer(&mut device, 3, 20);
    let stream1 = vertex_buffer(&mut device, 3, 4);
    device.set_shader(Some(shader));
    device.set_vertex_layout(Some(layout));
    device.bind_vertex_buffer(0, Some(stream0)).unwrap();
    device.bind_vertex_buffer(1, Some(stream1.clone())).unwrap();

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    assert_eq!(
        enabled_slots(device.context_mut().take_calls().as_slice()),
        vec![0, 1, 2]
    );

    // Stage 1 goes away: its slot is disabled and zeroed.
    device.bind_vertex_buffer(1, None).unwrap();
    device.draw(Topology::TriangleList, 0, 3).unwrap();
    let calls = device.context_mut().take_calls();
    assert!(calls.contains(&TraceCall::DisableVertexAttrib { slot: 2 }));

    // Rebinding must both re-enable and re-describe the slot, since its
    // cached descriptor was reset.
    device.bind_vertex_buffer(1, Some(stream1)).unwrap();
    device.draw(Topology::TriangleList, 0, 3).unwrap();
    let calls = device.context_mut().take_calls();
    assert_eq!(enabled_slots(&calls), vec![2]);
    assert_eq!(pointer_slots(&calls), vec![2]);
}

#[test]
fn layout_overflow_caps_committed_slots_and_counts_once_per_commit() {
    let mut device = device_with_slots(8);
    let shader = shader_with_attributes(&mut device, 10);
    let layout = wide_layout(&mut device, 10);
    let buffer = vertex_buffer(&mut device, 3, 160);
    device.set_shader(Some(shader));
    device.set_vertex_layout(Some(layout));
    device.bind_vertex_buffer(0, Some(buffer)).unwrap();

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    let calls = device.context_mut().take_calls();
    assert_eq!(enabled_slots(&calls), vec![0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(pointer_slots(&calls).len(), 8);
    assert_eq!(device.commit_stats().layout_overflows, 1);

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    assert_eq!(device.commit_stats().layout_overflows, 2);
}

#[test]
fn unmapped_logical_indices_are_skipped() {
    let mut device = device();
    // Three layout elements, but the program only declares two attributes.
    let shader = shader_with_attributes(&mut device, 2);
    let layout = wide_layout(&mut device, 3);
    let buffer = vertex_buffer(&mut device, 3, 48);
    device.set_shader(Some(shader));
    device.set_vertex_layout(Some(layout));
    device.bind_vertex_buffer(0, Some(buffer)).unwrap();

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    let calls = device.context_mut().take_calls();
    assert_eq!(enabled_slots(&calls), vec![0, 1]);
    assert_eq!(device.commit_stats().unmapped_attributes, 1);
}

#[test]
fn slots_follow_the_reflection_table() {
    let mut device = device();
    device
        .context_mut()
        .override_next_program_locations(vec![Some(4), Some(2)]);
    let shader = shader_with_attributes(&mut device, 2);
    let layout = position_uv_layout(&mut device);
    let buffer = vertex_buffer(&mut device, 3, 20);
    device.set_shader(Some(shader));
    device.set_vertex_layout(Some(layout));
    device.bind_vertex_buffer(0, Some(buffer)).unwrap();

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    let calls = device.context_mut().take_calls();
    assert_eq!(enabled_slots(&calls), vec![2, 4]);
    assert_eq!(pointer_slots(&calls), vec![2, 4]);
}

#[test]
fn lighter_layout_disables_leftover_slots() {
    let mut device = device();
    let wide_shader = shader_with_attributes(&mut device, 3);
    let wide = wide_layout(&mut device, 3);
    let wide_buffer = vertex_buffer(&mut device, 3, 48);
    device.set_shader(Some(wide_shader));
    device.set_vertex_layout(Some(wide));
    device.bind_vertex_buffer(0, Some(wide_buffer)).unwrap();
    device.draw(Topology::TriangleList, 0, 3).unwrap();
    device.context_mut().take_calls();

    let narrow_shader = shader_with_attributes(&mut device, 2);
    let narrow = position_uv_layout(&mut device);
    let narrow_buffer = vertex_buffer(&mut device, 3, 20);
    device.set_shader(Some(narrow_shader));
    device.set_vertex_layout(Some(narrow));
    device.bind_vertex_buffer(0, Some(narrow_buffer)).unwrap();
    device.draw(Topology::TriangleList, 0, 3).unwrap();

    let calls = device.context_mut().take_calls();
    assert!(calls.contains(&TraceCall::DisableVertexAttrib { slot: 2 }));
}

#[test]
fn unchanged_descriptors_are_elided() {
    let mut device = device();
    prime_triangle(&mut device);

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    assert_eq!(device.commit_stats().elided_attribute_updates, 0);

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    assert_eq!(device.commit_stats().elided_attribute_updates, 2);
}
