//! Indexed parameter registers.
//!
//! Registers written since device creation (or the last reset) are re-pushed
//! to the native program at every shader commit, since their values may
//! change every frame even when the program does not. The written masks keep
//! the push proportional to what the caller actually uses.

use glam::{Mat4, Vec4};

use crate::error::DeviceError;

/// Number of `Vec4` parameter registers.
pub const VECTOR_REGISTERS: usize = 64;
/// Number of `Mat4` parameter registers.
pub const MATRIX_REGISTERS: usize = 16;
/// Upper bound on the bone-weight matrix palette.
pub const MAX_BONE_MATRICES: usize = 48;

/// Native uniform location of matrix register 0; vector registers occupy
/// locations `0..VECTOR_REGISTERS`.
pub(crate) const MATRIX_UNIFORM_BASE: u32 = VECTOR_REGISTERS as u32;
/// Native uniform location of bone matrix 0.
pub(crate) const BONE_UNIFORM_BASE: u32 = MATRIX_UNIFORM_BASE + MATRIX_REGISTERS as u32;

const DEFAULT_BACKGROUND: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// Vector/matrix register file plus the bone palette and background color.
#[derive(Clone, Debug)]
pub struct RenderParams {
    vectors: [Vec4; VECTOR_REGISTERS],
    matrices: [Mat4; MATRIX_REGISTERS],
    vector_written: u64,
    matrix_written: u16,
    bones: Option<Box<[Mat4]>>,
    background: Vec4,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            vectors: [Vec4::ZERO; VECTOR_REGISTERS],
            matrices: [Mat4::IDENTITY; MATRIX_REGISTERS],
            vector_written: 0,
            matrix_written: 0,
            bones: None,
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl RenderParams {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_vector(&mut self, index: usize, value: Vec4) -> Result<(), DeviceError> {
        if index >= VECTOR_REGISTERS {
            return Err(DeviceError::ParamRegisterOutOfRange {
                kind: "vector",
                index,
                max: VECTOR_REGISTERS,
            });
        }
        self.vectors[index] = value;
        self.vector_written |= 1 << index;
        Ok(())
    }

    pub fn set_matrix(&mut self, index: usize, value: Mat4) -> Result<(), DeviceError> {
        if index >= MATRIX_REGISTERS {
            return Err(DeviceError::ParamRegisterOutOfRange {
                kind: "matrix",
                index,
                max: MATRIX_REGISTERS,
            });
        }
        self.matrices[index] = value;
        self.matrix_written |= 1 << index;
        Ok(())
    }

    pub fn set_bone_matrices(&mut self, bones: &[Mat4]) -> Result<(), DeviceError> {
        if bones.len() > MAX_BONE_MATRICES {
            return Err(DeviceError::TooManyBoneMatrices {
                count: bones.len(),
                max: MAX_BONE_MATRICES,
            });
        }
        self.bones = Some(bones.into());
        Ok(())
    }

    pub fn clear_bone_matrices(&mut self) {
        self.bones = None;
    }

    pub fn set_background(&mut self, color: Vec4) {
        self.background = color;
    }

    pub fn background(&self) -> Vec4 {
        self.background
    }

    pub fn vector(&self, index: usize) -> Option<Vec4> {
        self.vectors.get(index).copied()
    }

    pub fn matrix(&self, index: usize) -> Option<Mat4> {
        self.matrices.get(index).copied()
    }

    pub(crate) fn written_vectors(&self) -> impl Iterator<Item = (u32, Vec4)> + '_ {
        let mask = self.vector_written;
        self.vectors
            .iter()
            .enumerate()
            .filter(move |(i, _)| mask & (1 << *i) != 0)
            .map(|(i, v)| (i as u32, *v))
    }

    pub(crate) fn written_matrices(&self) -> impl Iterator<Item = (u32, Mat4)> + '_ {
        let mask = self.matrix_written;
        self.matrices
            .iter()
            .enumerate()
            .filter(move |(i, _)| mask & (1 << *i) != 0)
            .map(|(i, m)| (i as u32, *m))
    }

    pub(crate) fn bones(&self) -> Option<&[Mat4]> {
        self.bones.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_registers_are_rejected() {
        let mut params = RenderParams::default();
        assert_eq!(
            params.set_vector(VECTOR_REGISTERS, Vec4::ONE).unwrap_err(),
            DeviceError::ParamRegisterOutOfRange {
                kind: "vector",
                index: VECTOR_REGISTERS,
                max: VECTOR_REGISTERS,
            }
        );
        assert_eq!(
            params
                .set_matrix(MATRIX_REGISTERS, Mat4::IDENTITY)
                .unwrap_err(),
            DeviceError::ParamRegisterOutOfRange {
                kind: "matrix",
                index: MATRIX_REGISTERS,
                max: MATRIX_REGISTERS,
            }
        );
    }

    #[test]
    fn only_written_registers_are_enumerated() {
        let mut params = RenderParams::default();
        params.set_vector(3, Vec4::splat(1.5)).unwrap();
        params.set_vector(40, Vec4::splat(2.5)).unwrap();
        let written: Vec<_> = params.written_vectors().collect();
        assert_eq!(
            written,
            vec![(3, Vec4::splat(1.5)), (40, Vec4::splat(2.5))]
        );
        assert_eq!(params.written_matrices().count(), 0);
    }

    #[test]
    fn bone_palette_is_bounded() {
        let mut params = RenderParams::default();
        let too_many = vec![Mat4::IDENTITY; MAX_BONE_MATRICES + 1];
        assert!(params.set_bone_matrices(&too_many).is_err());
        let ok = vec![Mat4::IDENTITY; MAX_BONE_MATRICES];
        assert!(params.set_bone_matrices(&ok).is_ok());
    }
}
