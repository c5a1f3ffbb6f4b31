//! CPU-side mesh representation produced by the OBJ loader.

/// Vertex with position/texcoord/normal. Values are in object space.
/// Channels a face corner did not reference are zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            uv,
            normal,
        }
    }
}

/// Triangle list: one vertex per face corner, `indices[i] == i`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    // Split views used for the per-attribute GPU buffers.

    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    pub fn texcoords(&self) -> Vec<[f32; 2]> {
        self.vertices.iter().map(|v| v.uv).collect()
    }

    pub fn normals(&self) -> Vec<[f32; 3]> {
        self.vertices.iter().map(|v| v.normal).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0]);
        assert!(data.is_valid());
        assert!(!MeshData::default().is_valid());
    }

    #[test]
    fn attribute_views_follow_vertex_order() {
        let data = MeshData::new(
            vec![
                MeshVertex::new([1.0, 2.0, 3.0], [0.5, 0.25], [0.0, 1.0, 0.0]),
                MeshVertex::new([4.0, 5.0, 6.0], [1.0, 0.0], [0.0, 0.0, 1.0]),
            ],
            vec![0, 1],
        );
        assert_eq!(data.positions(), vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(data.texcoords(), vec![[0.5, 0.25], [1.0, 0.0]]);
        assert_eq!(data.normals()[1], [0.0, 0.0, 1.0]);
    }
}
