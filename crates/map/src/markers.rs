//! Turns cluster query results into interactive markers.
//!
//! Every settled viewport change tears the whole marker set down and builds a
//! new one from the query result, so the live handles always match the latest
//! query exactly.

use std::collections::HashMap;

use catalog::{GeoRecord, RecordId, Thumbnail};
use cluster::{Aggregate, ClusterIndex, ClusterNode};
use foundation::LngLat;
use serde::Serialize;

use crate::{
    Anchor, MapSurface, MarkerContent, MarkerSpec, PopupContent, PopupSpec, SurfaceMarkerId,
    Viewport,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MarkerTarget {
    Leaf {
        /// Position of the record in the index input.
        index: usize,
        record: RecordId,
    },
    Aggregate(Aggregate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerState {
    Rendered,
    PopupVisible,
}

/// One rendered marker. Lives until the next rebuild.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerHandle {
    pub surface_id: SurfaceMarkerId,
    pub target: MarkerTarget,
    pub state: MarkerState,
    popup: Option<PopupContent>,
}

impl MarkerHandle {
    pub fn popup(&self) -> Option<&PopupContent> {
        self.popup.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Enter(SurfaceMarkerId),
    Leave(SurfaceMarkerId),
    Click(SurfaceMarkerId),
}

/// What a click asks the rest of the map to do. The renderer never moves the
/// camera or navigates on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerAction {
    ExpandCluster { center: LngLat, zoom: f64 },
    SelectRecord { index: usize, id: RecordId },
}

pub fn popup_content(record: &GeoRecord) -> PopupContent {
    PopupContent {
        title: record.display_title().to_string(),
        location: record.display_location().to_string(),
        year: record.year,
    }
}

fn leaf_spec(record: &GeoRecord) -> MarkerSpec {
    let content = match record.thumbnail() {
        Thumbnail::Image(url) => MarkerContent::Thumbnail {
            url: url.to_string(),
            alt: record.display_title().to_string(),
        },
        Thumbnail::Pin => MarkerContent::Pin,
    };
    MarkerSpec {
        position: record.position,
        anchor: Anchor::Bottom,
        content,
    }
}

fn aggregate_spec(agg: &Aggregate) -> MarkerSpec {
    MarkerSpec {
        position: agg.position,
        anchor: Anchor::Center,
        content: MarkerContent::CountBadge { count: agg.count },
    }
}

#[derive(Debug)]
pub struct MarkerRenderer {
    handles: Vec<MarkerHandle>,
    by_surface: HashMap<SurfaceMarkerId, usize>,
    popup_offset_px: f64,
}

impl MarkerRenderer {
    pub fn new(popup_offset_px: f64) -> Self {
        Self {
            handles: Vec::new(),
            by_surface: HashMap::new(),
            popup_offset_px,
        }
    }

    pub fn handles(&self) -> &[MarkerHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handle(&self, id: SurfaceMarkerId) -> Option<&MarkerHandle> {
        self.by_surface.get(&id).map(|&i| &self.handles[i])
    }

    /// Replaces every marker with one per node visible in `viewport`.
    /// Returns the number of markers created.
    pub fn rebuild<S: MapSurface>(
        &mut self,
        surface: &mut S,
        index: &ClusterIndex<GeoRecord>,
        viewport: &Viewport,
    ) -> usize {
        self.teardown(surface);

        let nodes = index.clusters(viewport.bounds(), viewport.zoom);
        self.handles.reserve(nodes.len());
        for node in &nodes {
            let (spec, target, popup) = match node {
                ClusterNode::Leaf(leaf) => (
                    leaf_spec(leaf.item),
                    MarkerTarget::Leaf {
                        index: leaf.index,
                        record: leaf.item.id.clone(),
                    },
                    Some(popup_content(leaf.item)),
                ),
                ClusterNode::Aggregate(agg) => {
                    (aggregate_spec(agg), MarkerTarget::Aggregate(*agg), None)
                }
            };
            let surface_id = surface.add_marker(spec);
            self.by_surface.insert(surface_id, self.handles.len());
            self.handles.push(MarkerHandle {
                surface_id,
                target,
                state: MarkerState::Rendered,
                popup,
            });
        }

        tracing::debug!(
            markers = self.handles.len(),
            aggregates = nodes.iter().filter(|n| n.is_cluster()).count(),
            zoom = viewport.zoom,
            "markers rebuilt"
        );
        self.handles.len()
    }

    /// Removes every marker and any popup it shows.
    pub fn teardown<S: MapSurface>(&mut self, surface: &mut S) {
        for handle in self.handles.drain(..) {
            if handle.state == MarkerState::PopupVisible {
                surface.hide_popup(handle.surface_id);
            }
            surface.remove_marker(handle.surface_id);
        }
        self.by_surface.clear();
    }

    /// Applies pointer input to the marker it addresses.
    ///
    /// Events for markers from an earlier rebuild are ignored.
    pub fn handle_pointer<S: MapSurface>(
        &mut self,
        surface: &mut S,
        index: &ClusterIndex<GeoRecord>,
        event: PointerEvent,
    ) -> Option<MarkerAction> {
        let (PointerEvent::Enter(id) | PointerEvent::Leave(id) | PointerEvent::Click(id)) = event;
        let Some(&slot) = self.by_surface.get(&id) else {
            tracing::trace!(%id, "pointer event for stale marker");
            return None;
        };
        let offset_px = self.popup_offset_px;
        let handle = &mut self.handles[slot];

        match event {
            PointerEvent::Enter(_) => {
                if let (MarkerState::Rendered, Some(content)) = (handle.state, &handle.popup) {
                    surface.show_popup(
                        id,
                        PopupSpec {
                            content: content.clone(),
                            offset_px,
                        },
                    );
                    handle.state = MarkerState::PopupVisible;
                }
                None
            }
            PointerEvent::Leave(_) => {
                if handle.state == MarkerState::PopupVisible {
                    surface.hide_popup(id);
                    handle.state = MarkerState::Rendered;
                }
                None
            }
            PointerEvent::Click(_) => match &handle.target {
                MarkerTarget::Leaf { index: item, record } => Some(MarkerAction::SelectRecord {
                    index: *item,
                    id: record.clone(),
                }),
                MarkerTarget::Aggregate(agg) => match index.expansion_zoom(agg.id) {
                    Ok(zoom) => Some(MarkerAction::ExpandCluster {
                        center: agg.position,
                        zoom: f64::from(zoom),
                    }),
                    Err(err) => {
                        tracing::error!(%err, cluster = %agg.id, "marker outlived its index");
                        debug_assert!(false, "marker refers to unknown cluster {}", agg.id);
                        None
                    }
                },
            },
        }
    }
}
