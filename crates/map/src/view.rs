//! The map screen: index, camera, markers and surface wired together.

use std::fmt;

use catalog::GeoRecord;
use cluster::{ClusterError, ClusterIndex};
use foundation::LngLat;
use runtime::{Frame, Metrics};
use serde::Serialize;

use crate::{
    ConfigError, EaseTicket, Gesture, LoadError, MapConfig, MapSurface, MarkerAction,
    MarkerRenderer, PointerEvent, Viewport, ViewportChanged, ViewportController,
};

pub const METRIC_INDEX_REBUILDS: &str = "index.rebuilds";
pub const METRIC_MARKER_REBUILDS: &str = "markers.rebuilds";
pub const METRIC_VIEWPORT_CHANGES: &str = "viewport.changes";
pub const GAUGE_VISIBLE_MARKERS: &str = "markers.visible";
pub const DIST_MARKERS_PER_REBUILD: &str = "markers.per_rebuild";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Records are being fetched; the map shows no markers.
    Loading,
    Ready { records: usize },
    /// Shown inline. Reloading the page is the recovery path.
    Failed(String),
}

type RecordSelected = Box<dyn FnMut(&GeoRecord)>;

pub struct MapView<S: MapSurface> {
    config: MapConfig,
    surface: S,
    controller: ViewportController,
    renderer: MarkerRenderer,
    index: Option<ClusterIndex<GeoRecord>>,
    state: LoadState,
    on_record_selected: Option<RecordSelected>,
    metrics: Metrics,
    frame: Frame,
    last_change: Option<ViewportChanged>,
}

impl<S: MapSurface> fmt::Debug for MapView<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapView")
            .field("viewport", self.controller.viewport())
            .field("state", &self.state)
            .field("markers", &self.renderer.len())
            .finish_non_exhaustive()
    }
}

impl<S: MapSurface> MapView<S> {
    pub fn new(config: MapConfig, mut surface: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let controller = ViewportController::from_config(&config);
        surface.set_camera(controller.viewport());
        Ok(Self {
            renderer: MarkerRenderer::new(config.popup_offset_px),
            config,
            surface,
            controller,
            index: None,
            state: LoadState::Loading,
            on_record_selected: None,
            metrics: Metrics::new(),
            frame: Frame::first(),
            last_change: None,
        })
    }

    /// Registers the callback a leaf click reports to. The view never
    /// navigates itself.
    pub fn on_record_selected(&mut self, callback: impl FnMut(&GeoRecord) + 'static) {
        self.on_record_selected = Some(Box::new(callback));
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn viewport(&self) -> &Viewport {
        self.controller.viewport()
    }

    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    pub fn markers(&self) -> &MarkerRenderer {
        &self.renderer
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn index(&self) -> Option<&ClusterIndex<GeoRecord>> {
        self.index.as_ref()
    }

    /// Last settled camera change.
    pub fn last_change(&self) -> Option<&ViewportChanged> {
        self.last_change.as_ref()
    }

    /// Replaces the record set: the index is rebuilt from scratch and the
    /// markers redrawn for the current camera.
    pub fn set_records(&mut self, records: Vec<GeoRecord>) -> Result<(), ClusterError> {
        let count = records.len();
        let index = ClusterIndex::build(
            records.into_iter().map(|r| (r.position, r)),
            self.config.cluster.clone(),
        )?;
        self.index = Some(index);
        self.metrics.incr(METRIC_INDEX_REBUILDS);
        self.state = LoadState::Ready { records: count };
        let viewport = *self.controller.viewport();
        self.render(&viewport);
        Ok(())
    }

    /// Applies the outcome of a [`crate::RecordLoad`].
    pub fn apply_load(&mut self, result: Result<Vec<GeoRecord>, LoadError>) {
        let outcome = result.map_err(|e| e.to_string()).and_then(|records| {
            self.set_records(records).map_err(|e| e.to_string())
        });
        if let Err(message) = outcome {
            tracing::warn!(%message, "memories failed to load");
            self.renderer.teardown(&mut self.surface);
            self.index = None;
            self.state = LoadState::Failed(message);
        }
    }

    pub fn handle_gesture(&mut self, gesture: Gesture) {
        self.controller.handle(gesture);
        self.surface.set_camera(self.controller.viewport());
        self.process_changes();
    }

    pub fn jump_to(&mut self, center: LngLat, zoom: f64) {
        self.controller.jump_to(center, zoom);
        self.surface.set_camera(self.controller.viewport());
        self.process_changes();
    }

    pub fn ease_to(&mut self, center: LngLat, zoom: f64) -> EaseTicket {
        self.controller.ease_to(center, zoom)
    }

    pub fn resize(&mut self, width_px: f64, height_px: f64) {
        self.controller.resize(width_px, height_px);
        self.surface.set_camera(self.controller.viewport());
        self.process_changes();
    }

    /// Advances animations by one host frame.
    pub fn tick(&mut self, dt_s: f64) {
        self.frame = self.frame.advance(dt_s);
        if self.controller.is_easing() {
            self.controller.tick(&self.frame);
            self.surface.set_camera(self.controller.viewport());
        }
        self.process_changes();
    }

    /// Routes pointer input to the marker layer and carries out what it asks.
    pub fn pointer(&mut self, event: PointerEvent) {
        let Some(index) = self.index.as_ref() else {
            return;
        };
        let Some(action) = self.renderer.handle_pointer(&mut self.surface, index, event) else {
            return;
        };
        match action {
            MarkerAction::ExpandCluster { center, zoom } => {
                tracing::debug!(zoom, "expanding cluster");
                self.controller.ease_to(center, zoom);
            }
            MarkerAction::SelectRecord { index: item, id } => {
                let record = index.items().get(item);
                match (record, self.on_record_selected.as_mut()) {
                    (Some(record), Some(callback)) => callback(record),
                    (Some(_), None) => tracing::debug!(%id, "record selected without a listener"),
                    (None, _) => tracing::error!(%id, item, "selected record is not in the index"),
                }
            }
        }
    }

    /// Removes every marker and hands the surface back.
    pub fn teardown(mut self) -> S {
        self.renderer.teardown(&mut self.surface);
        tracing::debug!(counters = ?self.metrics.counters(), "map view torn down");
        self.surface
    }

    fn process_changes(&mut self) {
        for stamped in self.controller.drain_events() {
            self.metrics.incr(METRIC_VIEWPORT_CHANGES);
            let viewport = stamped.event.viewport;
            self.last_change = Some(stamped.event);
            self.render(&viewport);
        }
    }

    fn render(&mut self, viewport: &Viewport) {
        let Some(index) = self.index.as_ref() else {
            return;
        };
        let created = self.renderer.rebuild(&mut self.surface, index, viewport);
        self.metrics.incr(METRIC_MARKER_REBUILDS);
        self.metrics.set_gauge(GAUGE_VISIBLE_MARKERS, created as i64);
        self.metrics.observe(DIST_MARKERS_PER_REBUILD, created as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeadlessSurface, MarkerTarget};
    use catalog::{RecordId, StoreError};
    use foundation::math::geodesy::offset_m;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    const BRUSSELS: LngLat = LngLat {
        lng: 4.3517,
        lat: 50.8503,
    };

    fn record(id: &str, position: LngLat) -> GeoRecord {
        GeoRecord {
            id: RecordId::new(id),
            position,
            title: None,
            location_name: Some("Brussels".to_string()),
            year: None,
            photo_count: 0,
            photos: Vec::new(),
            created_at_ms: 0,
        }
    }

    fn records() -> Vec<GeoRecord> {
        vec![
            record("a", BRUSSELS),
            record("b", offset_m(BRUSSELS, 4.0, 3.0)),
            record("c", offset_m(BRUSSELS, -6.0, 2.0)),
            record("d", LngLat::new(-74.006, 40.7128)),
        ]
    }

    fn view() -> MapView<HeadlessSurface> {
        MapView::new(MapConfig::default(), HeadlessSurface::new()).unwrap()
    }

    fn settle(view: &mut MapView<HeadlessSurface>) {
        for _ in 0..90 {
            view.tick(1.0 / 60.0);
        }
    }

    fn assert_in_sync(view: &MapView<HeadlessSurface>) {
        let vp = view.viewport();
        let expected = view.index().unwrap().clusters(vp.bounds(), vp.zoom).len();
        assert_eq!(view.markers().len(), expected);
        assert_eq!(view.surface().marker_count(), expected);
    }

    #[test]
    fn no_markers_until_records_arrive() {
        let mut v = view();
        assert_eq!(v.load_state(), &LoadState::Loading);
        v.jump_to(BRUSSELS, 5.0);
        assert_eq!(v.surface().marker_count(), 0);

        v.set_records(records()).unwrap();
        assert_eq!(v.load_state(), &LoadState::Ready { records: 4 });
        assert!(v.surface().marker_count() > 0);
        assert_in_sync(&v);
    }

    #[test]
    fn markers_follow_every_settled_change() {
        let mut v = view();
        v.set_records(records()).unwrap();

        v.handle_gesture(Gesture::Start);
        v.handle_gesture(Gesture::Zoom {
            delta: 4.0,
            around_px: None,
        });
        // Mid-gesture the markers still reflect the previous camera.
        assert_eq!(v.metrics().counter(METRIC_VIEWPORT_CHANGES), 0);
        v.handle_gesture(Gesture::End);
        assert_in_sync(&v);

        v.jump_to(BRUSSELS, 18.0);
        assert_in_sync(&v);
        assert_eq!(v.surface().marker_count(), 3);

        v.resize(300.0, 200.0);
        assert_in_sync(&v);
        assert_eq!(v.metrics().counter(METRIC_VIEWPORT_CHANGES), 3);
        assert_eq!(v.metrics().counter(METRIC_MARKER_REBUILDS), 4);
        assert_eq!(v.metrics().counter(METRIC_INDEX_REBUILDS), 1);
        let per_rebuild = v.metrics().distribution(DIST_MARKERS_PER_REBUILD).unwrap();
        assert_eq!(per_rebuild.count, 4);
        assert_eq!(
            v.metrics().gauge(GAUGE_VISIBLE_MARKERS),
            Some(v.surface().marker_count() as i64)
        );
    }

    #[test]
    fn cluster_click_flies_to_expansion_zoom() {
        let mut v = view();
        v.set_records(records()).unwrap();
        v.jump_to(BRUSSELS, 3.0);

        let (id, agg) = v
            .markers()
            .handles()
            .iter()
            .find_map(|h| match h.target {
                MarkerTarget::Aggregate(agg) => Some((h.surface_id, agg)),
                MarkerTarget::Leaf { .. } => None,
            })
            .unwrap();
        assert_eq!(agg.count, 3);
        let expansion = v.index().unwrap().expansion_zoom(agg.id).unwrap();

        v.pointer(PointerEvent::Click(id));
        assert!(v.controller().is_easing());
        settle(&mut v);

        assert_eq!(v.viewport().zoom, f64::from(expansion));
        assert!(matches!(
            v.last_change().map(|c| c.cause),
            Some(crate::ChangeCause::Ease(_))
        ));
        assert_in_sync(&v);
        // The aggregate split apart at the new zoom.
        assert!(
            v.markers()
                .handles()
                .iter()
                .all(|h| !matches!(h.target, MarkerTarget::Aggregate(a) if a.count == 3))
        );
    }

    #[test]
    fn leaf_click_reports_selection() {
        let selected = Rc::new(RefCell::new(Vec::new()));
        let mut v = view();
        let sink = Rc::clone(&selected);
        v.on_record_selected(move |record| sink.borrow_mut().push(record.id.clone()));
        v.set_records(records()).unwrap();
        v.jump_to(LngLat::new(-74.006, 40.7128), 16.0);

        let leaf = v.markers().handles()[0].surface_id;
        v.pointer(PointerEvent::Enter(leaf));
        assert_eq!(v.surface().popup_count(), 1);
        assert_eq!(
            v.surface().popup(leaf).map(|p| p.content.title.as_str()),
            Some("Untitled Memory")
        );
        v.pointer(PointerEvent::Click(leaf));

        assert_eq!(*selected.borrow(), vec![RecordId::new("d")]);
        // Selecting does not move the camera.
        assert!(!v.controller().is_easing());
    }

    #[test]
    fn double_ease_emits_once_for_the_latest_target() {
        let mut v = view();
        v.set_records(records()).unwrap();
        v.ease_to(BRUSSELS, 10.0);
        v.tick(0.1);
        let second = v.ease_to(LngLat::new(-74.006, 40.7128), 8.0);
        settle(&mut v);

        assert_eq!(v.metrics().counter(METRIC_VIEWPORT_CHANGES), 1);
        let change = v.last_change().unwrap();
        assert_eq!(change.cause, crate::ChangeCause::Ease(second));
        assert_eq!(change.viewport.zoom, 8.0);
        assert_in_sync(&v);
    }

    #[test]
    fn failed_load_is_reported_inline() {
        let mut v = view();
        v.apply_load(Err(LoadError::Store(StoreError::Unavailable(
            "backend down".to_string(),
        ))));
        assert!(matches!(v.load_state(), LoadState::Failed(m) if m.contains("backend down")));
        assert_eq!(v.surface().marker_count(), 0);
    }

    #[test]
    fn invalid_record_fails_the_load() {
        let mut v = view();
        v.apply_load(Ok(vec![record("bad", LngLat::new(f64::NAN, 0.0))]));
        assert!(matches!(v.load_state(), LoadState::Failed(_)));
        assert!(v.index().is_none());
    }

    #[test]
    fn teardown_clears_the_surface() {
        let mut v = view();
        v.set_records(records()).unwrap();
        let surface = v.teardown();
        assert_eq!(surface.marker_count(), 0);
    }

    #[tokio::test]
    async fn loads_from_a_store() {
        use catalog::{InMemoryMemoryStore, MemoryRow};
        use std::sync::Arc;

        let store = InMemoryMemoryStore::with_rows(vec![MemoryRow {
            id: "m1".to_string(),
            longitude: Some(4.35),
            latitude: Some(50.85),
            ..MemoryRow::default()
        }]);
        let mut v = view();
        let load = crate::load_records(Arc::new(store));
        v.apply_load(load.finish().await);
        assert_eq!(v.load_state(), &LoadState::Ready { records: 1 });
        assert_eq!(v.surface().marker_count(), 1);
    }
}
