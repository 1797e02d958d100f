use foundation::math::projection::{lat_to_y, lng_to_x, project, unproject};
use foundation::{Aabb2, LngLat, LngLatBounds, wrap_lng};

use crate::kdtree::KdIndex;
use crate::{Aggregate, ClusterError, ClusterId, ClusterNode, ClusterOptions, Leaf};

#[derive(Debug, Clone, Copy, PartialEq)]
enum NodeKind {
    Item(usize),
    Cluster(ClusterId),
}

#[derive(Debug, Clone)]
struct LevelNode {
    /// Unit-square position.
    xy: [f64; 2],
    count: usize,
    kind: NodeKind,
    /// Aggregate this node was merged into one level up, if any.
    parent: Option<ClusterId>,
}

#[derive(Debug, Clone)]
struct Level {
    tree: KdIndex,
    nodes: Vec<LevelNode>,
}

impl Level {
    fn new(nodes: Vec<LevelNode>, node_size: usize) -> Self {
        let coords: Vec<[f64; 2]> = nodes.iter().map(|n| n.xy).collect();
        Self {
            tree: KdIndex::build(&coords, node_size),
            nodes,
        }
    }
}

/// Immutable multi-zoom clustering over a set of located items.
///
/// Level `max_zoom` holds every item on its own. Each shallower level is built
/// greedily from the one below it: an unvisited node absorbs all unvisited
/// neighbors within `radius_at(zoom)` when the combined count reaches
/// `min_points`.
#[derive(Debug, Clone)]
pub struct ClusterIndex<T> {
    options: ClusterOptions,
    items: Vec<T>,
    positions: Vec<LngLat>,
    /// `levels[z - min_zoom]` is the level for integer zoom `z`.
    levels: Vec<Level>,
}

impl<T> ClusterIndex<T> {
    pub fn build(
        points: impl IntoIterator<Item = (LngLat, T)>,
        options: ClusterOptions,
    ) -> Result<Self, ClusterError> {
        options.validate()?;

        let (positions, items): (Vec<LngLat>, Vec<T>) = points.into_iter().unzip();
        if let Some(index) = positions.iter().position(|p| !p.is_valid()) {
            return Err(ClusterError::InvalidPosition { index });
        }

        let base: Vec<LngLat> = positions.iter().map(|p| p.wrapped()).collect();
        let nodes = base
            .iter()
            .enumerate()
            .map(|(i, p)| LevelNode {
                xy: project(*p),
                count: 1,
                kind: NodeKind::Item(i),
                parent: None,
            })
            .collect();

        let mut levels = vec![Level::new(nodes, options.node_size)];
        for zoom in (options.min_zoom..options.max_zoom).rev() {
            let Some(deeper) = levels.last_mut() else {
                break;
            };
            let next = cluster_level(deeper, zoom, &options);
            tracing::trace!(zoom, nodes = next.nodes.len(), "cluster level built");
            levels.push(next);
        }
        levels.reverse();

        tracing::debug!(
            items = items.len(),
            levels = levels.len(),
            top_nodes = levels.first().map_or(0, |l| l.nodes.len()),
            "cluster index built"
        );

        Ok(Self {
            options,
            items,
            positions,
            levels,
        })
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Integer level answering queries at a fractional camera `zoom`.
    pub fn query_zoom(&self, zoom: f64) -> u8 {
        let (min, max) = (self.options.min_zoom, self.options.max_zoom);
        if zoom.is_nan() {
            return min;
        }
        zoom.floor().clamp(f64::from(min), f64::from(max)) as u8
    }

    /// Nodes visible inside `bounds` at `zoom`.
    ///
    /// Boxes that cross the antimeridian are answered as two queries; boxes that
    /// are at least 360 degrees wide cover every longitude.
    pub fn clusters(&self, bounds: LngLatBounds, zoom: f64) -> Vec<ClusterNode<'_, T>> {
        let LngLatBounds {
            west,
            south,
            east,
            north,
        } = bounds;
        if [west, south, east, north].iter().any(|v| v.is_nan()) {
            return Vec::new();
        }

        let south = south.clamp(-90.0, 90.0);
        let north = north.clamp(-90.0, 90.0);
        let mut min_lng = wrap_lng(west);
        let mut max_lng = if east == 180.0 { 180.0 } else { wrap_lng(east) };
        if east - west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            let mut out = self.clusters(LngLatBounds::new(min_lng, south, 180.0, north), zoom);
            out.extend(self.clusters(LngLatBounds::new(-180.0, south, max_lng, north), zoom));
            return out;
        }

        let level = self.level(self.query_zoom(zoom));
        let bbox = Aabb2::new(
            [lng_to_x(min_lng), lat_to_y(north)],
            [lng_to_x(max_lng), lat_to_y(south)],
        );
        level
            .tree
            .range(bbox)
            .into_iter()
            .map(|i| self.view(&level.nodes[i]))
            .collect()
    }

    /// Nodes one level deeper that were merged into `id`.
    pub fn children(&self, id: ClusterId) -> Result<Vec<ClusterNode<'_, T>>, ClusterError> {
        let unknown = || ClusterError::UnknownCluster(id);
        if id.zoom < self.options.min_zoom || id.zoom >= self.options.max_zoom {
            return Err(unknown());
        }

        let level = self.level(id.zoom + 1);
        let origin = level.nodes.get(id.seed as usize).ok_or_else(unknown)?;
        let children: Vec<_> = level
            .tree
            .within(origin.xy, self.options.radius_at(id.zoom))
            .into_iter()
            .map(|i| &level.nodes[i])
            .filter(|n| n.parent == Some(id))
            .map(|n| self.view(n))
            .collect();

        if children.is_empty() {
            return Err(unknown());
        }
        Ok(children)
    }

    /// Individual items under `id`, depth first, skipping `offset` and returning
    /// at most `limit`.
    pub fn leaves(
        &self,
        id: ClusterId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Leaf<'_, T>>, ClusterError> {
        let mut out = Vec::new();
        let mut skipped = 0;
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let children = self.children(current)?;
            let mut nested = Vec::new();
            for child in children {
                match child {
                    ClusterNode::Aggregate(agg) => nested.push(agg.id),
                    ClusterNode::Leaf(leaf) => {
                        if out.len() >= limit {
                            return Ok(out);
                        }
                        if skipped < offset {
                            skipped += 1;
                        } else {
                            out.push(leaf);
                        }
                    }
                }
            }
            stack.extend(nested.into_iter().rev());
        }
        out.truncate(limit);
        Ok(out)
    }

    /// Smallest zoom at which `id` breaks into more than one node.
    pub fn expansion_zoom(&self, id: ClusterId) -> Result<u8, ClusterError> {
        let mut current = id;
        let mut zoom = id.zoom;
        while zoom < self.options.max_zoom {
            let children = self.children(current)?;
            zoom = current.zoom + 1;
            match children.as_slice() {
                [ClusterNode::Aggregate(only)] => current = only.id,
                _ => break,
            }
        }
        Ok(zoom)
    }

    fn level(&self, zoom: u8) -> &Level {
        let idx = usize::from(zoom.saturating_sub(self.options.min_zoom));
        &self.levels[idx.min(self.levels.len() - 1)]
    }

    fn view(&self, node: &LevelNode) -> ClusterNode<'_, T> {
        match node.kind {
            NodeKind::Item(index) => ClusterNode::Leaf(Leaf {
                index,
                position: self.positions[index],
                item: &self.items[index],
            }),
            NodeKind::Cluster(id) => ClusterNode::Aggregate(Aggregate {
                id,
                position: unproject(node.xy),
                count: node.count,
            }),
        }
    }
}

fn cluster_level(deeper: &mut Level, zoom: u8, options: &ClusterOptions) -> Level {
    let r = options.radius_at(zoom);
    let mut visited = vec![false; deeper.nodes.len()];
    let mut out = Vec::with_capacity(deeper.nodes.len());

    for i in 0..deeper.nodes.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let seed = deeper.nodes[i].clone();
        let neighbors: Vec<usize> = deeper
            .tree
            .within(seed.xy, r)
            .into_iter()
            .filter(|&j| !visited[j])
            .collect();
        let own = seed.count;
        let total = own + neighbors.iter().map(|&j| deeper.nodes[j].count).sum::<usize>();

        if total > own && total >= options.min_points {
            let id = ClusterId::new(zoom, i as u32);
            let mut wx = seed.xy[0] * own as f64;
            let mut wy = seed.xy[1] * own as f64;
            for &j in &neighbors {
                visited[j] = true;
                let n = &mut deeper.nodes[j];
                wx += n.xy[0] * n.count as f64;
                wy += n.xy[1] * n.count as f64;
                n.parent = Some(id);
            }
            deeper.nodes[i].parent = Some(id);

            out.push(LevelNode {
                xy: [wx / total as f64, wy / total as f64],
                count: total,
                kind: NodeKind::Cluster(id),
                parent: None,
            });
        } else {
            out.push(LevelNode {
                parent: None,
                ..seed
            });
            // Too few to merge; neighbors carry over untouched.
            if total > own {
                for &j in &neighbors {
                    visited[j] = true;
                    out.push(LevelNode {
                        parent: None,
                        ..deeper.nodes[j].clone()
                    });
                }
            }
        }
    }

    Level::new(out, options.node_size)
}
