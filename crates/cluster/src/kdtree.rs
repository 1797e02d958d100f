use foundation::Aabb2;
use foundation::math::precision::stable_total_cmp_f64;

/// A static 2D KD index over points in projected space.
///
/// Ordering contract:
/// - `range` and `within` return point indices in ascending order.
///
/// Built once; there is no insert or delete. Points are stored in a flat array
/// partitioned around medians so queries walk index ranges instead of nodes.
#[derive(Debug, Clone)]
pub struct KdIndex {
    node_size: usize,
    ids: Vec<usize>,
    coords: Vec<[f64; 2]>,
}

impl KdIndex {
    pub fn build(points: &[[f64; 2]], node_size: usize) -> Self {
        let node_size = node_size.max(1);
        let mut entries: Vec<(usize, [f64; 2])> = points.iter().copied().enumerate().collect();
        partition(&mut entries, node_size, 0);

        let (ids, coords) = entries.into_iter().unzip();
        Self {
            node_size,
            ids,
            coords,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Indices of points inside the closed box.
    pub fn range(&self, bbox: Aabb2) -> Vec<usize> {
        let mut hits = Vec::new();
        self.walk(
            |p| bbox.contains(p),
            |axis, split| {
                let go_left = bbox.min[axis] <= split[axis];
                let go_right = bbox.max[axis] >= split[axis];
                (go_left, go_right)
            },
            &mut hits,
        );
        hits.sort_unstable();
        hits
    }

    /// Indices of points within Euclidean distance `r` of `center`.
    pub fn within(&self, center: [f64; 2], r: f64) -> Vec<usize> {
        let r2 = r * r;
        let mut hits = Vec::new();
        self.walk(
            |p| {
                let dx = p[0] - center[0];
                let dy = p[1] - center[1];
                dx * dx + dy * dy <= r2
            },
            |axis, split| {
                let go_left = center[axis] - r <= split[axis];
                let go_right = center[axis] + r >= split[axis];
                (go_left, go_right)
            },
            &mut hits,
        );
        hits.sort_unstable();
        hits
    }

    fn walk<A, D>(&self, mut accept: A, descend: D, hits: &mut Vec<usize>)
    where
        A: FnMut([f64; 2]) -> bool,
        D: Fn(usize, [f64; 2]) -> (bool, bool),
    {
        if self.ids.is_empty() {
            return;
        }

        // (lo, hi inclusive, axis)
        let mut stack: Vec<(usize, usize, usize)> = vec![(0, self.ids.len() - 1, 0)];
        while let Some((lo, hi, axis)) = stack.pop() {
            if hi - lo <= self.node_size {
                for i in lo..=hi {
                    if accept(self.coords[i]) {
                        hits.push(self.ids[i]);
                    }
                }
                continue;
            }

            let m = lo + (hi - lo) / 2;
            let split = self.coords[m];
            if accept(split) {
                hits.push(self.ids[m]);
            }

            let (go_left, go_right) = descend(axis, split);
            if go_left && m > lo {
                stack.push((lo, m - 1, 1 - axis));
            }
            if go_right && m < hi {
                stack.push((m + 1, hi, 1 - axis));
            }
        }
    }
}

fn partition(entries: &mut [(usize, [f64; 2])], node_size: usize, axis: usize) {
    if entries.len() <= node_size + 1 {
        return;
    }

    let m = (entries.len() - 1) / 2;
    // Deterministic tie-break on the original index.
    entries.select_nth_unstable_by(m, |a, b| {
        stable_total_cmp_f64(a.1[axis], b.1[axis]).then_with(|| a.0.cmp(&b.0))
    });

    let (left, rest) = entries.split_at_mut(m);
    partition(left, node_size, 1 - axis);
    partition(&mut rest[1..], node_size, 1 - axis);
}

#[cfg(test)]
mod tests {
    use super::KdIndex;
    use foundation::Aabb2;

    // Small deterministic LCG so tests do not need a rand dependency.
    fn points(n: usize, seed: u64) -> Vec<[f64; 2]> {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..n).map(|_| [next(), next()]).collect()
    }

    #[test]
    fn empty_index_returns_nothing() {
        let idx = KdIndex::build(&[], 8);
        assert!(idx.is_empty());
        assert!(idx.range(Aabb2::new([0.0, 0.0], [1.0, 1.0])).is_empty());
        assert!(idx.within([0.5, 0.5], 1.0).is_empty());
    }

    #[test]
    fn range_matches_brute_force() {
        let pts = points(1_000, 7);
        let idx = KdIndex::build(&pts, 8);
        let (min, max) = ([0.2, 0.3], [0.45, 0.8]);

        let expected: Vec<usize> = pts
            .iter()
            .enumerate()
            .filter(|(_, p)| p[0] >= min[0] && p[0] <= max[0] && p[1] >= min[1] && p[1] <= max[1])
            .map(|(i, _)| i)
            .collect();
        assert_eq!(idx.range(Aabb2::new(min, max)), expected);
    }

    #[test]
    fn within_matches_brute_force() {
        let pts = points(1_000, 42);
        let idx = KdIndex::build(&pts, 4);
        let (c, r) = ([0.6, 0.4], 0.1);

        let expected: Vec<usize> = pts
            .iter()
            .enumerate()
            .filter(|(_, p)| (p[0] - c[0]).powi(2) + (p[1] - c[1]).powi(2) <= r * r)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(idx.within(c, r), expected);
    }

    #[test]
    fn coincident_points_are_all_reported() {
        let pts = vec![[0.5, 0.5]; 20];
        let idx = KdIndex::build(&pts, 2);
        assert_eq!(idx.within([0.5, 0.5], 0.0).len(), 20);
        assert_eq!(idx.range(Aabb2::new([0.5, 0.5], [0.5, 0.5])), (0..20).collect::<Vec<_>>());
    }
}
