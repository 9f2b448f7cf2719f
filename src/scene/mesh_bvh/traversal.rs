use arrayvec::ArrayVec;

use crate::assets::{AlphaMode, Face, MeshData};
use crate::geometry::{FloatType, Ray, TexturePoint, intersect_triangle};

use super::MeshBvh;

/// Well-behaved median-split trees never get deeper than this; the builder
/// splits at count / 2, so depth grows with log2 of the face count.
const STACK_DEPTH: usize = 64;

/// Nearest accepted face intersection, in the space of the traversal ray.
#[derive(Copy, Clone, Debug)]
pub struct FaceHit {
    pub t: FloatType,
    pub u: FloatType,
    pub v: FloatType,
    pub face_index: u32,
}

impl MeshBvh {
    /// Walks the tree iteratively and returns the nearest face hit within
    /// `[t_min, t_max]`, or `None`.
    ///
    /// Faces whose material group uses alpha masking are sampled at the hit
    /// UV and discarded below the cutoff, letting the ray continue to faces
    /// behind them.
    pub fn intersect(
        &self,
        data: &MeshData,
        ray: &Ray,
        t_min: FloatType,
        t_max: FloatType,
    ) -> Option<FaceHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut closest_t = t_max;
        let mut best: Option<FaceHit> = None;

        let mut stack = ArrayVec::<u32, STACK_DEPTH>::new();
        stack.push(0);

        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index as usize];

            let (entry, exit) = node.aabb.intersect(ray);
            if entry.max(0.0) > exit.min(closest_t) {
                continue;
            }

            if node.is_leaf() {
                for i in node.left_first..node.left_first + node.count {
                    let face_index = self.face_idx[i as usize];
                    let face = &data.faces[face_index as usize];
                    let [a, b, c] = face.positions();

                    let Some(hit) = intersect_triangle(ray, a, b, c) else {
                        continue;
                    };
                    if hit.t < t_min || hit.t >= closest_t {
                        continue;
                    }
                    if alpha_masked(face, data, hit.u, hit.v) {
                        continue;
                    }

                    closest_t = hit.t;
                    best = Some(FaceHit {
                        t: hit.t,
                        u: hit.u,
                        v: hit.v,
                        face_index,
                    });
                }
            } else {
                let left = &self.nodes[node.left_first as usize];
                let right = &self.nodes[node.right_child as usize];

                let (left_entry, left_exit) = left.aabb.intersect(ray);
                let (right_entry, right_exit) = right.aabb.intersect(ray);
                let hit_left = left_entry.max(0.0) <= left_exit.min(closest_t);
                let hit_right = right_entry.max(0.0) <= right_exit.min(closest_t);

                // Push the farther child first so the nearer one is popped
                // next and can shrink closest_t before the farther is tested
                match (hit_left, hit_right) {
                    (true, true) => {
                        if left_entry < right_entry {
                            stack.push(node.right_child);
                            stack.push(node.left_first);
                        } else {
                            stack.push(node.left_first);
                            stack.push(node.right_child);
                        }
                    }
                    (true, false) => stack.push(node.left_first),
                    (false, true) => stack.push(node.right_child),
                    (false, false) => {}
                }
            }
        }

        best
    }
}

/// True when the face's alpha-Mask material leaves this hit transparent.
/// `Blend` counts as fully visible.
fn alpha_masked(face: &Face, data: &MeshData, u: FloatType, v: FloatType) -> bool {
    let Some(group_index) = face.material_group else {
        return false;
    };
    let group = &data.material_groups[group_index as usize];
    if group.alpha_mode != AlphaMode::Mask {
        return false;
    }

    let uv = face.interpolate(u, v, |vertex| vertex.texcoord.coords);
    let mut alpha = group.base_colour_factor.w;
    if let Some(texture) = group.base_colour_texture {
        alpha *= data.images[texture].sample_nearest(TexturePoint::from(uv)).w;
    }
    alpha < group.alpha_cutoff
}
