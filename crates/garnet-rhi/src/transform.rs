//! Transform register block.

use glam::Mat4;

/// Drawable surface size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn aspect(self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

const DEFAULT_FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
const DEFAULT_NEAR: f32 = 0.1;
const DEFAULT_FAR: f32 = 1000.0;

/// World/view/projection registers plus the composites derived from them.
///
/// `view_projection` and its inverse are recomputed on every dependent write;
/// the projection and orthographic matrices are recomputed from the surface
/// size on [`RenderTransform::reset`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTransform {
    world: Mat4,
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    inverse_view_projection: Mat4,
    orthographic: Mat4,
    surface: SurfaceSize,
}

impl RenderTransform {
    pub fn new(surface: SurfaceSize) -> Self {
        let mut t = Self {
            world: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            inverse_view_projection: Mat4::IDENTITY,
            orthographic: Mat4::IDENTITY,
            surface,
        };
        t.reset(surface);
        t
    }

    /// Restores defaults and recomputes the size-dependent matrices. Invoked
    /// on every drawable-surface resize.
    pub fn reset(&mut self, surface: SurfaceSize) {
        self.surface = surface;
        self.world = Mat4::IDENTITY;
        self.view = Mat4::IDENTITY;
        self.projection =
            Mat4::perspective_rh_gl(DEFAULT_FOV_Y, surface.aspect(), DEFAULT_NEAR, DEFAULT_FAR);
        self.orthographic = Mat4::orthographic_rh_gl(
            0.0,
            surface.width as f32,
            surface.height as f32,
            0.0,
            -1.0,
            1.0,
        );
        self.recompute_composites();
    }

    fn recompute_composites(&mut self) {
        self.view_projection = self.projection * self.view;
        self.inverse_view_projection = self.view_projection.inverse();
    }

    pub fn set_world(&mut self, world: Mat4) {
        self.world = world;
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
        self.recompute_composites();
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
        self.recompute_composites();
    }

    pub fn world(&self) -> Mat4 {
        self.world
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    pub fn inverse_view_projection(&self) -> Mat4 {
        self.inverse_view_projection
    }

    pub fn orthographic(&self) -> Mat4 {
        self.orthographic
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_recomputes_size_dependent_matrices() {
        let mut t = RenderTransform::new(SurfaceSize {
            width: 640,
            height: 480,
        });
        let ortho_small = t.orthographic();
        t.reset(SurfaceSize {
            width: 1280,
            height: 720,
        });
        assert_ne!(t.orthographic(), ortho_small);
        assert_eq!(t.world(), Mat4::IDENTITY);
    }

    #[test]
    fn view_projection_tracks_dependent_writes() {
        let mut t = RenderTransform::new(SurfaceSize {
            width: 100,
            height: 100,
        });
        let view = Mat4::from_translation(glam::Vec3::new(0.0, 0.0, -5.0));
        t.set_view(view);
        assert_eq!(t.view_projection(), t.projection() * view);
    }

    #[test]
    fn zero_height_surface_does_not_produce_nan() {
        let t = RenderTransform::new(SurfaceSize {
            width: 640,
            height: 0,
        });
        assert!(t.projection().is_finite());
    }
}
