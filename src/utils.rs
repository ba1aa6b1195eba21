use wgpu::util::DeviceExt;
use bytemuck::NoUninit;
use glam::Vec3;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Append another mesh, rebasing its indices.
    pub fn extend(&mut self, other: Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    /// Center the mesh on the origin and scale it so its longest side is
    /// `size` units, so every model shares the same footprint before its
    /// own scale factor is applied.
    pub fn normalize(&mut self, size: f32) {
        let Some((min, max)) = self.bounds() else { return };
        let center = (min + max) * 0.5;
        let longest = (max - min).max_element();
        let scale = if longest > 0.0 { size / longest } else { 1.0 };
        for v in self.vertices.iter_mut() {
            let p = (Vec3::from(v.pos) - center) * scale;
            v.pos = p.to_array();
        }
    }

    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = Vec3::from(self.vertices.first()?.pos);
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            let p = Vec3::from(v.pos);
            (lo.min(p), hi.max(p))
        }))
    }

    /// Replace vertex normals with the area-weighted sum of adjacent face normals.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (pa, pb, pc) = (
                Vec3::from(self.vertices[a].pos),
                Vec3::from(self.vertices[b].pos),
                Vec3::from(self.vertices[c].pos),
            );
            let n = (pb - pa).cross(pc - pa);
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }
        for (v, n) in self.vertices.iter_mut().zip(acc) {
            v.normal = n.normalize_or_zero().to_array();
        }
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {

        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Flat square in the XY plane at `z = depth`, facing +Z, with `uv = (0, 0)`
/// at the `-x, -y` corner. Rotated 90° about X it becomes the ground; at
/// half extent 0.5 it is the unit plane images are drawn on.
pub fn create_plane_mesh(half_extent: f32, depth: f32) -> Mesh {
    let h = half_extent;
    let normal = [0.0, 0.0, 1.0];
    let vertices = vec![
        Vertex { pos: [-h, -h, depth], normal, uv: [0.0, 0.0] },
        Vertex { pos: [h, -h, depth], normal, uv: [1.0, 0.0] },
        Vertex { pos: [h, h, depth], normal, uv: [1.0, 1.0] },
        Vertex { pos: [-h, h, depth], normal, uv: [0.0, 1.0] },
    ];
    Mesh { vertices, indices: vec![0, 1, 2, 0, 2, 3] }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(pos: [f32; 3]) -> Vertex {
        Vertex { pos, normal: [0.0; 3], uv: [0.0; 2] }
    }

    #[test]
    fn normalize_centers_and_scales_longest_side() {
        let mut mesh = Mesh {
            vertices: vec![vertex([10.0, 0.0, 0.0]), vertex([14.0, 2.0, 1.0])],
            indices: vec![0, 1, 0],
        };
        mesh.normalize(200.0);
        let (min, max) = mesh.bounds().unwrap();
        assert!((max.x - min.x - 200.0).abs() < 1e-4);
        assert!((max.y - min.y - 100.0).abs() < 1e-4);
        assert!(((min + max) * 0.5).length() < 1e-4);
    }

    #[test]
    fn extend_rebases_indices() {
        let mut a = create_plane_mesh(1.0, 0.0);
        a.extend(create_plane_mesh(2.0, 0.0));
        assert_eq!(a.vertices.len(), 8);
        assert_eq!(&a.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn computed_normals_face_out_of_ccw_triangle() {
        let mut mesh = Mesh {
            vertices: vec![vertex([0.0, 0.0, 0.0]), vertex([1.0, 0.0, 0.0]), vertex([0.0, 1.0, 0.0])],
            indices: vec![0, 1, 2],
        };
        mesh.compute_normals();
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn ground_is_a_two_triangle_quad_at_depth() {
        let ground = create_plane_mesh(10000.0, -200.0);
        assert_eq!(ground.indices.len(), 6);
        assert!(ground.vertices.iter().all(|v| v.pos[2] == -200.0));
    }
}
