//! Viewport rectangles in physical pixels, origin at the top-left corner.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const MINIMAP_SIZE: u32 = 200;
    pub const MINIMAP_MARGIN: u32 = 10;

    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }

    /// Square in the top-right corner. Shrinks on small windows and is
    /// `None` when nothing would be left.
    pub fn minimap(width: u32, height: u32) -> Option<Self> {
        let margin = Self::MINIMAP_MARGIN;
        let room = width.min(height).saturating_sub(2 * margin);
        let size = Self::MINIMAP_SIZE.min(room);
        if size == 0 {
            return None;
        }
        Some(Self {
            x: (width - size - margin) as f32,
            y: margin as f32,
            width: size as f32,
            height: size as f32,
        })
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height.max(1.0)
    }

    pub fn apply(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_viewport(self.x, self.y, self.width, self.height, 0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimap_in_top_right_corner() {
        let vp = Viewport::minimap(800, 500).expect("fits");
        assert_eq!(vp, Viewport { x: 590.0, y: 10.0, width: 200.0, height: 200.0 });
    }

    #[test]
    fn minimap_shrinks_then_disappears() {
        let vp = Viewport::minimap(120, 400).expect("fits");
        assert_eq!(vp.width, 100.0);
        assert_eq!(vp.x, 10.0);
        assert!(Viewport::minimap(20, 400).is_none());
        assert!(Viewport::minimap(0, 0).is_none());
    }

    #[test]
    fn full_viewport_aspect() {
        let vp = Viewport::full(800, 500);
        assert!((vp.aspect() - 1.6).abs() < 1e-6);
    }
}
