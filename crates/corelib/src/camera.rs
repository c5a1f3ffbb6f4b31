use crate::{Mat4, Vec3};

/// Projection used by a [`Camera`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective { fov_y_rad: f32, aspect: f32 },
    /// Symmetric box `[-half_width, half_width] x [-half_height, half_height]`.
    Orthographic { half_width: f32, half_height: f32 },
}

/// View + projection (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            projection: Projection::Perspective { fov_y_rad, aspect },
            z_near,
            z_far,
        }
    }

    pub fn new_orthographic(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        half_width: f32,
        half_height: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            projection: Projection::Orthographic {
                half_width,
                half_height,
            },
            z_near,
            z_far,
        }
    }

    /// Fixed top-down camera for the minimap: above the origin, looking
    /// down with -Z as screen up, covering a 4x4 area.
    pub fn top_down_minimap() -> Self {
        Self::new_orthographic(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::ZERO,
            Vec3::NEG_Z,
            2.0,
            2.0,
            0.1,
            20.0,
        )
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Depth range is [0,1] (wgpu convention).
    #[inline]
    pub fn proj(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y_rad, aspect } => {
                Mat4::perspective_rh(fov_y_rad, aspect.max(1e-6), self.z_near, self.z_far)
            }
            Projection::Orthographic {
                half_width,
                half_height,
            } => Mat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                self.z_near,
                self.z_far,
            ),
        }
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    /// Only affects perspective cameras.
    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        if let Projection::Perspective { aspect: a, .. } = &mut self.projection {
            *a = aspect;
        }
        self
    }
}
