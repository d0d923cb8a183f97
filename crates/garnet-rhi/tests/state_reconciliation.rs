//! Pending/session reconciliation: identical state must commit to nothing,
//! and each field-level change must commit to exactly its own native calls.

mod common;

use common::*;
use garnet_rhi::context::glconst;
use garnet_rhi::{
    DepthStencilDesc, SurfaceSize, Topology,
};
use garnet_rhi_trace::TraceCall;
use glam::{Mat4, Vec4};
use pretty_assertions::assert_eq;

#[test]
fn second_identical_draw_emits_only_the_draw_call() {
    let mut device = device();
    prime_triangle(&mut device);

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    device.context_mut().take_calls();

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    let calls = device.context_mut().take_calls();
    assert_eq!(
        calls,
        vec![TraceCall::DrawArrays {
            mode: glconst::TRIANGLES,
            first: 0,
            count: 3
        }]
    );
}

#[test]
fn written_params_are_repushed_without_state_calls() {
    let mut device = device();
    prime_triangle(&mut device);
    device.set_param_vec(3, Vec4::splat(0.5)).unwrap();
    device.set_param_mat(1, Mat4::IDENTITY).unwrap();

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    device.context_mut().take_calls();

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    let calls = device.context_mut().take_calls();
    assert_eq!(calls.iter().filter(|c| c.is_state()).count(), 0);
    // Vector registers push at their own index, matrix registers above the
    // vector block.
    assert!(calls.contains(&TraceCall::Uniform4 {
        register: 3,
        value: [0.5; 4]
    }));
    assert!(calls.contains(&TraceCall::UniformMatrix4 {
        register: 65,
        value: Mat4::IDENTITY.to_cols_array()
    }));
    assert!(matches!(calls.last(), Some(TraceCall::DrawArrays { .. })));
}

#[test]
fn bone_palette_pushes_above_the_matrix_block() {
    let mut device = device();
    prime_triangle(&mut device);
    device
        .set_bone_matrices(&[Mat4::IDENTITY, Mat4::IDENTITY])
        .unwrap();

    device.draw(Topology::TriangleList, 0, 3).unwrap();
    let calls = device.context_mut().take_calls();
    let bone_registers: Vec<u32> = calls
        .iter()
        .filter_map(|c| match c {
            TraceCall::UniformMatrix4 { register, .. } => Some(*register),
            _ => None,
        })
        .collect();
    assert_eq!(bone_registers, vec![80, 81]);
}

#[test]
fn stencil_write_mask_toggle_emits_exactly_one_mask_call() {
    let mut device = device();
    prime_triangle(&mut device);

    let mut desc = DepthStencilDesc {
        stencil_test: true,
        ..DepthStencilDesc::default()
    };
    let initial = device.create_depth_stencil(desc).unwrap();
    device.set_depth_stencil(Some(&initial));
    device.draw(Topology::TriangleList, 0, 3).unwrap();
    device.context_mut().take_calls();

    desc.front.write_mask = 0x0F;
    let masked = device.create_depth_stencil(desc).unwrap();
    device.set_depth_stencil(Some(&masked));
    device.draw(Topology::TriangleList, 0, 3).unwrap();

    let state: Vec<_> = device
        .context_mut()
        .take_calls()
        .into_iter()
        .filter(|c| c.is_state())
        .collect();
    assert_eq!(
        state,
        vec![TraceCall::StencilMask {
            face: glconst::FRONT_AND_BACK,
            write_mask: 0x0F
        }]
    );
}

#[test]
fn two_sided_toggle_reprograms_both_faces() {
    let mut device = device();
    prime_triangle(&mut device);

    let single = device
        .create_depth_stencil(DepthStencilDesc {
            stencil_test: true,
            ..DepthStencilDesc::default()
        })
        .unwrap();
    device.set_depth_stencil(Some(&single));
    device.draw(Topology::TriangleList, 0, 3).unwrap();
    device.context_mut().take_calls();

    // Same face values; only the two-sided flag flips. Both face caches are
    // invalidated, so both faces reprogram in full.
    let two_sided = device
        .create_depth_stencil(DepthStencilDesc {
            stencil_test: true,
            two_sided: true,
            ..DepthStencilDesc::default()
        })
        .unwrap();
    device.set_depth_stencil(Some(&two_sided));
    device.draw(Topology::TriangleList, 0, 3).unwrap();

    let calls = device.context_mut().take_calls();
    let faces: Vec<u32> = calls
        .iter()
        .filter_map(|c| match c {
            TraceCall::StencilFunc { face, .. } => Some(*face),
            _ => None,
        })
        .collect();
    assert_eq!(faces, vec![glconst::FRONT, glconst::BACK]);
    assert_eq!(calls.iter().filter(|c| c.is_state()).count(), 6);
}

#[test]
fn depth_test_disable_is_a_single_call() {
    let mut device = device();
    prime_triangle(&mut device);
    device.draw(Topology::TriangleList, 0, 3).unwrap();
    device.context_mut().take_calls();

    let no_depth = device
        .create_depth_stencil(DepthStencilDesc {
            depth_test: false,
            ..DepthStencilDesc::default()
        })
        .unwrap();
    device.set_depth_stencil(Some(&no_depth));
    device.draw(Topology::TriangleList, 0, 3).unwrap();

    let state: Vec<_> = device
        .context_mut()
        .take_calls()
        .into_iter()
        .filter(|c| c.is_state())
        .collect();
    assert_eq!(
        state,
        vec![TraceCall::Disable {
            cap: glconst::DEPTH_TEST
        }]
    );
}

#[test]
fn reset_forces_a_full_recommit() {
    let mut device = device();
    prime_triangle(&mut device);
    device.draw(Topology::TriangleList, 0, 3).unwrap();
    device.context_mut().take_calls();

    device.reset(SurfaceSize {
        width: 1024,
        height: 768,
    });
    device.draw(Topology::TriangleList, 0, 3).unwrap();

    let calls = device.context_mut().take_calls();
    // The session was invalidated wholesale: program, buffers, attributes,
    // and fixed-function state all re-emit. The link itself stays cached.
    assert!(calls.iter().any(|c| matches!(c, TraceCall::UseProgram { .. })));
    assert!(calls.iter().any(|c| matches!(c, TraceCall::BindBuffer { .. })));
    assert!(calls
        .iter()
        .any(|c| matches!(c, TraceCall::Enable { cap } if *cap == glconst::DEPTH_TEST)));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, TraceCall::CompileShader { .. })));
}
