//! Core types: math re-exports, Transform, Camera, orbit input.

pub use glam::{EulerRot, Mat4, Quat, Vec3, Vec4, vec3};

pub mod camera;
pub mod orbit;
pub mod transform;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_then_scale_matrix() {
        let t = transform::Transform::from_trs(
            vec3(1.0, 2.0, 3.0),
            vec3(0.0, 0.0, 0.0),
            vec3(2.0, 2.0, 2.0),
        );
        // Last column is the translation, diagonal the scale (no rotation).
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::Camera::new_perspective(
            vec3(0.0, 0.0, 4.0),
            vec3(0.0, 0.0, 0.0),
            Vec3::Y,
            60f32.to_radians(),
            0.1,
            100.0,
            16.0 / 9.0,
        );
        let pv = cam.proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn minimap_sees_origin_at_center() {
        let cam = camera::Camera::top_down_minimap();
        let clip = cam.proj_view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&clip.z));

        // -Z in the world is up on the minimap.
        let ahead = cam.proj_view() * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!((ahead.y - 0.5).abs() < 1e-5);
    }
}
