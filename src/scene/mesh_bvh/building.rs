use crate::assets::Face;
use crate::geometry::{Aabb, WorldPoint};

use super::{BvhNode, MeshBvh};

impl MeshBvh {
    /// Builds the tree over `faces` with a recursive largest-axis median
    /// split. Nodes with at most `leaf_threshold` faces become leaves.
    pub fn build(faces: &[Face], leaf_threshold: u32) -> MeshBvh {
        let mut builder = Builder {
            face_bounds: faces
                .iter()
                .map(|f| Aabb::from_points(f.positions()))
                .collect(),
            face_centroids: faces
                .iter()
                .map(|f| {
                    let sum = f.a.position.coords + f.b.position.coords + f.c.position.coords;
                    WorldPoint::from(sum / 3.0)
                })
                .collect(),
            face_idx: (0..faces.len() as u32).collect(),
            nodes: Vec::with_capacity(2 * faces.len()),
            leaf_threshold: leaf_threshold.max(1),
        };

        if !faces.is_empty() {
            builder.build_node(0, faces.len() as u32);
        }

        let bvh = MeshBvh {
            nodes: builder.nodes,
            face_idx: builder.face_idx,
        };
        log::debug!(
            "built BVH over {} faces: {} nodes, depth {}",
            faces.len(),
            bvh.node_count(),
            bvh.depth()
        );
        bvh
    }
}

struct Builder {
    face_bounds: Vec<Aabb>,
    face_centroids: Vec<WorldPoint>,
    face_idx: Vec<u32>,
    nodes: Vec<BvhNode>,
    leaf_threshold: u32,
}

impl Builder {
    fn build_node(&mut self, start: u32, count: u32) -> u32 {
        let node_index = self.nodes.len() as u32;
        let aabb = self.range_bounds(start, count);
        self.nodes.push(BvhNode {
            aabb,
            left_first: start,
            right_child: 0,
            count,
        });

        if count <= self.leaf_threshold {
            return node_index;
        }

        // Median split along the widest axis of the node bounds. Splitting at
        // count / 2 keeps both sides non-empty, so the tree stays balanced
        // even when every centroid coincides.
        let axis = aabb.largest_axis();
        let mid = (count / 2) as usize;
        let range = &mut self.face_idx[start as usize..(start + count) as usize];
        let centroids = &self.face_centroids;
        range.select_nth_unstable_by(mid, |&a, &b| {
            centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
        });

        let left_count = count / 2;
        let left = self.build_node(start, left_count);
        let right = self.build_node(start + left_count, count - left_count);

        let node = &mut self.nodes[node_index as usize];
        node.left_first = left;
        node.right_child = right;
        node.count = 0;

        node_index
    }

    fn range_bounds(&self, start: u32, count: u32) -> Aabb {
        let mut bounds = Aabb::empty();
        for &fi in &self.face_idx[start as usize..(start + count) as usize] {
            bounds.grow(&self.face_bounds[fi as usize]);
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FaceVertex;
    use crate::geometry::{FloatType, WorldVector};
    use assert2::assert;

    fn quad_grid(n: u32) -> Vec<Face> {
        // n*n unit quads in the XY plane, two triangles each
        let mut faces = Vec::new();
        let vertex = |x: FloatType, y: FloatType| FaceVertex {
            position: [x, y, 0.0].into(),
            normal: WorldVector::z(),
            texcoord: [0.0, 0.0].into(),
        };
        for gy in 0..n {
            for gx in 0..n {
                let (x, y) = (gx as FloatType, gy as FloatType);
                faces.push(Face {
                    a: vertex(x, y),
                    b: vertex(x + 1.0, y),
                    c: vertex(x + 1.0, y + 1.0),
                    material_group: None,
                });
                faces.push(Face {
                    a: vertex(x, y),
                    b: vertex(x + 1.0, y + 1.0),
                    c: vertex(x, y + 1.0),
                    material_group: None,
                });
            }
        }
        faces
    }

    #[test]
    fn leaves_cover_every_face_exactly_once() {
        let faces = quad_grid(8);
        let bvh = MeshBvh::build(&faces, 2);

        let mut seen = vec![false; faces.len()];
        for node in &bvh.nodes {
            if node.is_leaf() {
                for i in node.left_first..node.left_first + node.count {
                    let fi = bvh.face_idx[i as usize] as usize;
                    assert!(!seen[fi]);
                    seen[fi] = true;
                }
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn depth_stays_logarithmic() {
        let faces = quad_grid(16); // 512 faces
        let bvh = MeshBvh::build(&faces, 2);

        let n = faces.len() as FloatType;
        assert!(bvh.depth() <= (2.0 * n.log2()) as usize + 2);
    }

    #[test]
    fn identical_centroids_still_terminate() {
        // Degenerate mesh: every face in the same spot
        let faces = vec![quad_grid(1)[0]; 33];
        let bvh = MeshBvh::build(&faces, 2);
        assert!(bvh.depth() <= 8);
    }

    #[test]
    fn single_face_is_one_leaf() {
        let faces = quad_grid(1);
        let bvh = MeshBvh::build(&faces[..1], 2);
        assert!(bvh.node_count() == 1);
        assert!(bvh.depth() == 1);
    }
}
