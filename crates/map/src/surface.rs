//! The rendering collaborator: whatever draws markers and popups on screen.

use std::collections::BTreeMap;
use std::fmt;

use foundation::LngLat;
use serde::Serialize;

use crate::Viewport;

/// Marker id issued by a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SurfaceMarkerId(pub u64);

impl fmt::Display for SurfaceMarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// Which point of the marker element sits on the coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Center,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerContent {
    /// Round badge with the number of memories it stands for.
    CountBadge { count: usize },
    /// Image loaded by the surface; the marker counts as rendered immediately.
    Thumbnail { url: String, alt: String },
    /// Generic glyph for memories without photos.
    Pin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub position: LngLat,
    pub anchor: Anchor,
    pub content: MarkerContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupContent {
    pub title: String,
    pub location: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupSpec {
    pub content: PopupContent,
    /// Vertical distance between the marker anchor and the popup tip.
    pub offset_px: f64,
}

/// Drawing primitives the marker layer is built on.
///
/// Pointer input travels the other way: the host turns DOM events into
/// [`crate::PointerEvent`]s addressed by [`SurfaceMarkerId`].
pub trait MapSurface {
    fn add_marker(&mut self, spec: MarkerSpec) -> SurfaceMarkerId;
    fn remove_marker(&mut self, id: SurfaceMarkerId);
    /// Shows the popup attached to `marker`, replacing any popup it already has.
    fn show_popup(&mut self, marker: SurfaceMarkerId, popup: PopupSpec);
    fn hide_popup(&mut self, marker: SurfaceMarkerId);
    /// Moves the drawn camera. Called every frame while the camera animates.
    fn set_camera(&mut self, viewport: &Viewport);
}

/// In-memory surface for tests and the command line.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    next_id: u64,
    markers: BTreeMap<SurfaceMarkerId, MarkerSpec>,
    popups: BTreeMap<SurfaceMarkerId, PopupSpec>,
    camera: Option<Viewport>,
    camera_updates: u64,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker(&self, id: SurfaceMarkerId) -> Option<&MarkerSpec> {
        self.markers.get(&id)
    }

    /// Live markers in creation order.
    pub fn markers(&self) -> impl Iterator<Item = (SurfaceMarkerId, &MarkerSpec)> {
        self.markers.iter().map(|(id, spec)| (*id, spec))
    }

    pub fn popup(&self, marker: SurfaceMarkerId) -> Option<&PopupSpec> {
        self.popups.get(&marker)
    }

    pub fn popup_count(&self) -> usize {
        self.popups.len()
    }

    pub fn camera(&self) -> Option<&Viewport> {
        self.camera.as_ref()
    }

    pub fn camera_updates(&self) -> u64 {
        self.camera_updates
    }
}

impl MapSurface for HeadlessSurface {
    fn add_marker(&mut self, spec: MarkerSpec) -> SurfaceMarkerId {
        let id = SurfaceMarkerId(self.next_id);
        self.next_id += 1;
        self.markers.insert(id, spec);
        id
    }

    fn remove_marker(&mut self, id: SurfaceMarkerId) {
        // A marker's popup goes with it.
        self.popups.remove(&id);
        if self.markers.remove(&id).is_none() {
            tracing::warn!(%id, "removing unknown marker");
        }
    }

    fn show_popup(&mut self, marker: SurfaceMarkerId, popup: PopupSpec) {
        if !self.markers.contains_key(&marker) {
            tracing::warn!(id = %marker, "popup for unknown marker ignored");
            return;
        }
        self.popups.insert(marker, popup);
    }

    fn hide_popup(&mut self, marker: SurfaceMarkerId) {
        self.popups.remove(&marker);
    }

    fn set_camera(&mut self, viewport: &Viewport) {
        self.camera = Some(*viewport);
        self.camera_updates += 1;
    }
}
