//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! The tree is a flat arena of nodes addressed by index. Interior nodes store
//! the indices of their two children, leaves a range into a reordered array
//! of primitive indices. The primitives themselves stay in the scene; the
//! BVH never owns or copies them.
//!
//! Construction uses a binned Surface Area Heuristic with a median-split
//! fallback, traversal an explicit stack visiting the nearer child first.

use lumen_core::{BvhSettings, Hit, Primitive, SettingsResult, MAX_BVH_DEPTH};
use lumen_math::{Aabb, Interval, Ray, Vec3};
use std::time::Instant;

/// Deepest possible traversal stack: one pending sibling per level plus the root.
const STACK_SIZE: usize = MAX_BVH_DEPTH as usize + 2;

/// What a node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeContent {
    /// `count` primitives starting at `first` in [`Bvh::indices`].
    Leaf { first: u32, count: u32 },
    /// Two child nodes, by index into [`Bvh::nodes`].
    Interior { left: u32, right: u32 },
}

/// A node of the flattened tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    /// Encloses everything reachable below this node
    pub bounds: Aabb,
    pub content: NodeContent,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.content, NodeContent::Leaf { .. })
    }
}

/// Work done by a single traversal, used by the BVH debug overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Nodes whose contents were examined
    pub nodes_visited: u32,
    /// Ray-primitive tests performed in leaves
    pub primitive_tests: u32,
    /// Deepest level reached
    pub max_depth: u32,
}

/// Bounding volume hierarchy over a primitive slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    indices: Vec<u32>,
    depth: u32,
}

/// SAH bin: primitives whose centroid falls into one slice of the axis.
#[derive(Debug, Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: u32,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            bounds: Aabb::EMPTY,
            count: 0,
        }
    }
}

/// Best SAH candidate seen so far.
#[derive(Debug, Clone, Copy)]
struct Split {
    axis: usize,
    /// Last bin on the left side of the plane
    bin: usize,
    cost: f32,
}

/// Index of the bin holding `value`.
///
/// Values exactly on a bin boundary land in the upper bin, so a primitive on
/// a candidate plane always goes to the right child.
#[inline]
fn bin_index(value: f32, min: f32, scale: f32, bins: usize) -> usize {
    (((value - min) * scale) as usize).min(bins - 1)
}

struct Builder<'a> {
    settings: &'a BvhSettings,
    max_depth: u32,
    volumes: Vec<Aabb>,
    centroids: Vec<Vec3>,
    indices: Vec<u32>,
    nodes: Vec<BvhNode>,
    depth: u32,
}

impl<'a> Builder<'a> {
    fn subdivide(&mut self, node_index: usize, first: usize, count: usize, depth: u32) {
        let end = first + count;
        let bounds = self.indices[first..end]
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| {
                Aabb::surrounding(&acc, &self.volumes[i as usize])
            });
        self.depth = self.depth.max(depth);

        let is_leaf = count <= 1
            || count < self.settings.leaf_threshold as usize
            || depth >= self.max_depth;
        if is_leaf {
            self.nodes[node_index] = BvhNode {
                bounds,
                content: NodeContent::Leaf {
                    first: first as u32,
                    count: count as u32,
                },
            };
            return;
        }

        let mid = self.split(first, count, &bounds);

        let left = self.nodes.len();
        let placeholder = BvhNode {
            bounds: Aabb::EMPTY,
            content: NodeContent::Leaf { first: 0, count: 0 },
        };
        self.nodes.push(placeholder);
        self.nodes.push(placeholder);
        self.nodes[node_index] = BvhNode {
            bounds,
            content: NodeContent::Interior {
                left: left as u32,
                right: left as u32 + 1,
            },
        };

        self.subdivide(left, first, mid - first, depth + 1);
        self.subdivide(left + 1, mid, end - mid, depth + 1);
    }

    /// Partition `indices[first..first + count]` and return the split point.
    ///
    /// Always returns a point strictly inside the range.
    fn split(&mut self, first: usize, count: usize, bounds: &Aabb) -> usize {
        let end = first + count;

        if let Some(split) = self.best_sah_split(first, count, bounds) {
            // Splitting has to beat intersecting every primitive here
            if split.cost < count as f32 {
                let min = bounds.min[split.axis];
                let scale = self.settings.bins as f32 / bounds.extent(split.axis);
                let bins = self.settings.bins as usize;
                let centroids = &self.centroids;
                let mid = partition(&mut self.indices[first..end], |i| {
                    bin_index(centroids[i as usize][split.axis], min, scale, bins) <= split.bin
                }) + first;
                if mid != first && mid != end {
                    return mid;
                }
            }
        }

        // Median of the box along its longest axis
        let axis = bounds.longest_axis();
        let center = bounds.center(axis);
        let centroids = &self.centroids;
        let mid = partition(&mut self.indices[first..end], |i| {
            centroids[i as usize][axis] < center
        }) + first;
        if mid != first && mid != end {
            return mid;
        }

        // Coincident centroids: split the sorted range in half
        self.indices[first..end].sort_by(|&a, &b| {
            centroids[a as usize][axis]
                .total_cmp(&centroids[b as usize][axis])
                .then(a.cmp(&b))
        });
        first + count / 2
    }

    fn best_sah_split(&self, first: usize, count: usize, bounds: &Aabb) -> Option<Split> {
        let bins = self.settings.bins as usize;
        let parent_area = bounds.area();
        let longest = [bounds.longest_axis()];
        let axes: &[usize] = if self.settings.split_all_axes {
            &[0, 1, 2]
        } else {
            &longest
        };

        let mut best: Option<Split> = None;
        for &axis in axes {
            let extent = bounds.extent(axis);
            if !(extent > 0.0) {
                continue;
            }
            let min = bounds.min[axis];
            let scale = bins as f32 / extent;

            let mut bin_data = vec![Bin::default(); bins];
            for &i in &self.indices[first..first + count] {
                let bin = &mut bin_data[bin_index(self.centroids[i as usize][axis], min, scale, bins)];
                bin.count += 1;
                bin.bounds.grow_box(&self.volumes[i as usize]);
            }

            // left_*[k]: bins 0..=k, right_*[k]: bins k..bins
            let mut left_area = vec![0.0; bins];
            let mut left_count = vec![0u32; bins];
            let mut right_area = vec![0.0; bins];
            let mut right_count = vec![0u32; bins];

            let mut acc_box = Aabb::EMPTY;
            let mut acc_count = 0;
            for k in 0..bins {
                acc_count += bin_data[k].count;
                acc_box.grow_box(&bin_data[k].bounds);
                left_area[k] = acc_box.area();
                left_count[k] = acc_count;
            }

            acc_box = Aabb::EMPTY;
            acc_count = 0;
            for k in (0..bins).rev() {
                acc_count += bin_data[k].count;
                acc_box.grow_box(&bin_data[k].bounds);
                right_area[k] = acc_box.area();
                right_count[k] = acc_count;
            }

            for k in 0..bins - 1 {
                let (nl, nr) = (left_count[k], right_count[k + 1]);
                if nl == 0 || nr == 0 {
                    continue;
                }
                let cost = self.sah_cost(nl, left_area[k], nr, right_area[k + 1], parent_area);
                if best.map_or(true, |b| cost < b.cost) {
                    best = Some(Split { axis, bin: k, cost });
                }
            }
        }

        best
    }

    /// Expected cost of a split, in units of primitive intersections.
    fn sah_cost(&self, nl: u32, area_l: f32, nr: u32, area_r: f32, parent_area: f32) -> f32 {
        let traversal = self.settings.traversal_cost;
        if parent_area > 0.0 {
            traversal + (nl as f32 * area_l + nr as f32 * area_r) / parent_area
        } else {
            // A flat parent gives no information about child hit probability
            traversal + (nl + nr) as f32
        }
    }
}

/// Move every element satisfying `pred` to the front, returning how many did.
fn partition(items: &mut [u32], pred: impl Fn(u32) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..items.len() {
        if pred(items[i]) {
            items.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

impl Bvh {
    /// Build a BVH over `primitives`.
    ///
    /// Fails if `settings` do not validate. Equal inputs always produce
    /// identical trees.
    pub fn build(primitives: &[Primitive], settings: &BvhSettings) -> SettingsResult<Self> {
        settings.validate()?;
        if primitives.is_empty() {
            return Ok(Self {
                nodes: Vec::new(),
                indices: Vec::new(),
                depth: 0,
            });
        }

        let start = Instant::now();
        let volumes: Vec<Aabb> = primitives.iter().map(|p| p.volume()).collect();
        let centroids = volumes.iter().map(|v| v.centroid()).collect();

        let mut builder = Builder {
            settings,
            max_depth: settings.max_depth.min(MAX_BVH_DEPTH),
            volumes,
            centroids,
            indices: (0..primitives.len() as u32).collect(),
            nodes: Vec::with_capacity(2 * primitives.len()),
            depth: 0,
        };
        builder.nodes.push(BvhNode {
            bounds: Aabb::EMPTY,
            content: NodeContent::Leaf { first: 0, count: 0 },
        });
        builder.subdivide(0, 0, primitives.len(), 0);

        let bvh = Self {
            nodes: builder.nodes,
            indices: builder.indices,
            depth: builder.depth,
        };

        log::info!(
            "BVH built: {} primitives, {} nodes, {} leaves, depth {} in {:.2?}",
            primitives.len(),
            bvh.nodes.len(),
            bvh.nodes.iter().filter(|n| n.is_leaf()).count(),
            bvh.depth,
            start.elapsed()
        );

        Ok(bvh)
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Primitive indices in leaf order.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Deepest node level (root = 0).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bounds of the whole tree.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, |n| n.bounds)
    }

    /// Nearest hit among `primitives`, which must be the slice the tree was
    /// built from.
    ///
    /// Hits at exactly the same distance resolve to the lowest primitive index.
    pub fn intersect(&self, primitives: &[Primitive], ray: &Ray) -> Hit {
        let mut stats = TraversalStats::default();
        self.traverse(primitives, ray, &mut stats)
    }

    /// Same as [`Bvh::intersect`], also reporting how much work it took.
    pub fn intersect_with_stats(&self, primitives: &[Primitive], ray: &Ray) -> (Hit, TraversalStats) {
        let mut stats = TraversalStats::default();
        let hit = self.traverse(primitives, ray, &mut stats);
        (hit, stats)
    }

    fn traverse(&self, primitives: &[Primitive], ray: &Ray, stats: &mut TraversalStats) -> Hit {
        let mut best = Hit::NONE;
        let mut best_index = u32::MAX;

        let Some(root) = self.nodes.first() else {
            return best;
        };
        let Some(root_t) = root.bounds.hit(ray, Interval::forward()) else {
            return best;
        };

        // (node, depth, entry distance)
        let mut stack = [(0u32, 0u32, 0.0f32); STACK_SIZE];
        stack[0] = (0, 0, root_t);
        let mut sp = 1;

        while sp > 0 {
            sp -= 1;
            let (node_index, depth, entry) = stack[sp];
            // A closer hit was found after this node was queued
            if entry > best.t {
                continue;
            }

            let node = &self.nodes[node_index as usize];
            stats.nodes_visited += 1;
            stats.max_depth = stats.max_depth.max(depth);

            match node.content {
                NodeContent::Leaf { first, count } => {
                    let range = first as usize..(first + count) as usize;
                    for &i in &self.indices[range] {
                        stats.primitive_tests += 1;
                        let hit = primitives[i as usize].hit(ray);
                        if hit.is_hit() && (hit.t < best.t || (hit.t == best.t && i < best_index)) {
                            best = hit;
                            best_index = i;
                        }
                    }
                }
                NodeContent::Interior { left, right } => {
                    let range = Interval::new(0.0, best.t);
                    let t_left = self.nodes[left as usize].bounds.hit(ray, range);
                    let t_right = self.nodes[right as usize].bounds.hit(ray, range);

                    // Push the farther child first so the nearer one is popped next
                    match (t_left, t_right) {
                        (Some(tl), Some(tr)) => {
                            if tr < tl {
                                stack[sp] = (left, depth + 1, tl);
                                stack[sp + 1] = (right, depth + 1, tr);
                            } else {
                                stack[sp] = (right, depth + 1, tr);
                                stack[sp + 1] = (left, depth + 1, tl);
                            }
                            sp += 2;
                        }
                        (Some(tl), None) => {
                            stack[sp] = (left, depth + 1, tl);
                            sp += 1;
                        }
                        (None, Some(tr)) => {
                            stack[sp] = (right, depth + 1, tr);
                            sp += 1;
                        }
                        (None, None) => {}
                    }
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Color, Material, Sphere, Triangle};
    use lumen_math::RayKind;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn grey() -> Material {
        Material::lambertian(Color::splat(0.5))
    }

    fn random_scene(count: usize, seed: u64) -> Vec<Primitive> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                let center = Vec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                if i % 3 == 0 {
                    let a = center + Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0);
                    let b = center + Vec3::new(0.0, rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
                    Triangle::new(center, a, b, grey()).into()
                } else {
                    Sphere::new(center, rng.gen_range(0.1..0.8), grey()).into()
                }
            })
            .collect()
    }

    fn brute_force(primitives: &[Primitive], ray: &Ray) -> Hit {
        let mut best = Hit::NONE;
        for p in primitives {
            let hit = p.hit(ray);
            if hit.is_hit() && hit.t < best.t {
                best = hit;
            }
        }
        best
    }

    /// Primitive indices under `node`, checking containment on the way down.
    fn collect_leaves(bvh: &Bvh, primitives: &[Primitive], node: usize, out: &mut Vec<u32>) {
        let n = bvh.nodes()[node];
        let start = out.len();
        match n.content {
            NodeContent::Leaf { first, count } => {
                out.extend_from_slice(&bvh.indices()[first as usize..(first + count) as usize]);
            }
            NodeContent::Interior { left, right } => {
                collect_leaves(bvh, primitives, left as usize, out);
                collect_leaves(bvh, primitives, right as usize, out);
            }
        }
        for &i in &out[start..] {
            assert!(
                n.bounds.contains(&primitives[i as usize].volume()),
                "node {node} does not contain primitive {i}"
            );
        }
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::build(&[], &BvhSettings::default()).unwrap();
        assert!(bvh.is_empty());

        let ray = Ray::primary(Vec3::ZERO, Vec3::Z);
        assert!(!bvh.intersect(&[], &ray).is_hit());
    }

    #[test]
    fn test_bvh_single_sphere() {
        let primitives: Vec<Primitive> =
            vec![Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5, grey()).into()];
        let bvh = Bvh::build(&primitives, &BvhSettings::default()).unwrap();

        // Should create a leaf
        assert_eq!(bvh.nodes().len(), 1);
        assert!(bvh.nodes()[0].is_leaf());

        let hit = bvh.intersect(&primitives, &Ray::primary(Vec3::ZERO, -Vec3::Z));
        assert!(hit.is_hit());
        assert!((hit.t - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_bvh_multiple_spheres() {
        let primitives: Vec<Primitive> = (0..10)
            .map(|i| Sphere::new(Vec3::new(i as f32, 0.0, -5.0), 0.5, grey()).into())
            .collect();
        let bvh = Bvh::build(&primitives, &BvhSettings::default()).unwrap();
        assert!(bvh.nodes().len() > 1);

        // Test ray that hits sphere at x=5
        let ray = Ray::primary(Vec3::new(5.0, 0.0, 0.0), -Vec3::Z);
        let hit = bvh.intersect(&primitives, &ray);
        assert!(hit.is_hit());
        assert!((hit.point.z - (-4.5)).abs() < 0.01);
    }

    #[test]
    fn test_every_primitive_in_exactly_one_leaf() {
        let primitives = random_scene(500, 1);
        let bvh = Bvh::build(&primitives, &BvhSettings::default()).unwrap();

        let mut seen = Vec::new();
        collect_leaves(&bvh, &primitives, 0, &mut seen);
        seen.sort_unstable();
        let expected: Vec<u32> = (0..primitives.len() as u32).collect();
        assert_eq!(seen, expected);

        // Interior nodes carry no primitives, leaves respect the threshold or depth cap
        for node in bvh.nodes() {
            if let NodeContent::Leaf { count, .. } = node.content {
                assert!(count >= 1);
            }
        }
        assert!(bvh.depth() <= MAX_BVH_DEPTH);
    }

    #[test]
    fn test_matches_brute_force() {
        let primitives = random_scene(300, 2);
        let mut rng = StdRng::seed_from_u64(99);

        for settings in [
            BvhSettings::default(),
            BvhSettings {
                split_all_axes: true,
                bins: 8,
                ..BvhSettings::default()
            },
        ] {
            let bvh = Bvh::build(&primitives, &settings).unwrap();

            for _ in 0..2000 {
                let origin = Vec3::new(
                    rng.gen_range(-15.0..15.0),
                    rng.gen_range(-15.0..15.0),
                    rng.gen_range(-15.0..15.0),
                );
                let direction = Vec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                )
                .normalize_or_zero();
                let ray = Ray::new(origin, direction, RayKind::Indirect);

                let expected = brute_force(&primitives, &ray);
                let actual = bvh.intersect(&primitives, &ray);
                assert_eq!(expected.kind, actual.kind, "ray {ray:?}");
                assert_eq!(expected.t, actual.t, "ray {ray:?}");
                assert_eq!(expected.point, actual.point);
            }
        }
    }

    #[test]
    fn test_axis_parallel_rays_match_brute_force() {
        let primitives = random_scene(200, 3);
        let bvh = Bvh::build(&primitives, &BvhSettings::default()).unwrap();

        for axis in [Vec3::X, Vec3::Y, Vec3::Z, -Vec3::X, -Vec3::Y, -Vec3::Z] {
            for k in -10..=10 {
                let offset = Vec3::splat(k as f32) - axis * axis.dot(Vec3::splat(k as f32));
                let ray = Ray::primary(offset - axis * 20.0, axis);
                assert_eq!(
                    brute_force(&primitives, &ray).t,
                    bvh.intersect(&primitives, &ray).t
                );
            }
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let primitives = random_scene(400, 4);
        let settings = BvhSettings {
            split_all_axes: true,
            ..BvhSettings::default()
        };

        let first = Bvh::build(&primitives, &settings).unwrap();
        let second = Bvh::build(&primitives, &settings).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_identical_centroids_terminate() {
        // SAH and center splits cannot separate these; the object median must
        let primitives: Vec<Primitive> = (0..64)
            .map(|_| Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5, grey()).into())
            .collect();
        let bvh = Bvh::build(&primitives, &BvhSettings::default()).unwrap();

        let mut seen = Vec::new();
        collect_leaves(&bvh, &primitives, 0, &mut seen);
        assert_eq!(seen.len(), 64);

        // Equal-t hits resolve to the lowest primitive index, like a linear scan
        let ray = Ray::primary(Vec3::new(1.0, 2.0, -5.0), Vec3::Z);
        let hit = bvh.intersect(&primitives, &ray);
        assert_eq!(hit.t, brute_force(&primitives, &ray).t);
    }

    #[test]
    fn test_depth_cap_and_leaf_threshold() {
        let primitives = random_scene(256, 5);

        let shallow = Bvh::build(
            &primitives,
            &BvhSettings {
                max_depth: 3,
                ..BvhSettings::default()
            },
        )
        .unwrap();
        assert!(shallow.depth() <= 3);
        let mut seen = Vec::new();
        collect_leaves(&shallow, &primitives, 0, &mut seen);
        assert_eq!(seen.len(), 256);

        let coarse = Bvh::build(
            &primitives,
            &BvhSettings {
                leaf_threshold: 16,
                ..BvhSettings::default()
            },
        )
        .unwrap();
        let fine = Bvh::build(&primitives, &BvhSettings::default()).unwrap();
        assert!(coarse.nodes().len() < fine.nodes().len());
    }

    #[test]
    fn test_build_rejects_unusable_settings() {
        let primitives = random_scene(16, 7);

        for bins in [0, 1] {
            let settings = BvhSettings {
                bins,
                ..BvhSettings::default()
            };
            let err = Bvh::build(&primitives, &settings).unwrap_err();
            assert!(err.to_string().contains("bvh.bins"), "{err}");
        }

        let too_deep = BvhSettings {
            max_depth: MAX_BVH_DEPTH + 1,
            ..BvhSettings::default()
        };
        assert!(Bvh::build(&primitives, &too_deep).is_err());

        // Checked even when there is nothing to build
        let no_bins = BvhSettings {
            bins: 0,
            ..BvhSettings::default()
        };
        assert!(Bvh::build(&[], &no_bins).is_err());
    }

    #[test]
    fn test_stats_count_visits() {
        let primitives = random_scene(300, 6);
        let bvh = Bvh::build(&primitives, &BvhSettings::default()).unwrap();

        let ray = Ray::primary(Vec3::new(0.0, 0.0, -30.0), Vec3::Z);
        let (hit, stats) = bvh.intersect_with_stats(&primitives, &ray);
        assert_eq!(hit, bvh.intersect(&primitives, &ray));
        assert!(stats.nodes_visited >= 1);
        assert!(stats.max_depth <= bvh.depth());
        // Far fewer tests than a linear scan
        assert!((stats.primitive_tests as usize) < primitives.len());

        let miss = Ray::primary(Vec3::new(0.0, 100.0, 0.0), Vec3::Y);
        let (hit, stats) = bvh.intersect_with_stats(&primitives, &miss);
        assert!(!hit.is_hit());
        assert_eq!(stats.nodes_visited, 0);
    }
}
