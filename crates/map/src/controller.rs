//! Camera controller for the memorial map.
//!
//! Pointer gestures and programmatic flights mutate the [`Viewport`]; settled
//! changes are published as [`ViewportChanged`] events on an [`EventBus`] so the
//! marker layer re-queries the index once per settled move rather than once per
//! animation frame.

use foundation::LngLat;
use foundation::math::Vec2;
use foundation::math::projection::{project, unproject};
use runtime::{EventBus, Frame, Stamped};
use serde::Serialize;

use crate::{CameraLimits, MapConfig, Viewport, clamp_center};

/// Identifies one `ease_to` call. Only the newest ticket can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EaseTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ChangeCause {
    Gesture,
    Jump,
    Ease(EaseTicket),
    Resize,
}

/// Published once per settled camera change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportChanged {
    pub viewport: Viewport,
    pub cause: ChangeCause,
}

/// User input, already reduced to map terms by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Pointer down or the first wheel tick.
    Start,
    /// Drag by a pixel delta.
    Pan { dx_px: f64, dy_px: f64 },
    /// Change zoom by `delta` levels, anchored at a screen point (centre when `None`).
    Zoom {
        delta: f64,
        around_px: Option<[f64; 2]>,
    },
    /// Pointer up or wheel settled.
    End,
}

#[derive(Debug, Clone, Copy)]
struct Ease {
    ticket: EaseTicket,
    from_xy: Vec2,
    from_zoom: f64,
    to_xy: Vec2,
    to_zoom: f64,
    duration_s: f64,
    elapsed_s: f64,
}

impl Ease {
    fn at(&self, t: f64) -> (LngLat, f64) {
        let e = ease_out_cubic(t);
        // Travel the short way round when the flight crosses the antimeridian.
        let mut to = self.to_xy;
        if to.x - self.from_xy.x > 0.5 {
            to.x -= 1.0;
        } else if to.x - self.from_xy.x < -0.5 {
            to.x += 1.0;
        }
        let xy = self.from_xy.lerp(to, e);
        let zoom = self.from_zoom + (self.to_zoom - self.from_zoom) * e;
        (unproject(xy.into()), zoom)
    }
}

pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug)]
pub struct ViewportController {
    viewport: Viewport,
    limits: CameraLimits,
    ease_duration_s: f64,
    /// `Some(moved)` while a gesture is in progress.
    gesture: Option<bool>,
    ease: Option<Ease>,
    next_ticket: u64,
    events: EventBus<ViewportChanged>,
}

impl ViewportController {
    pub fn new(viewport: Viewport, limits: CameraLimits, ease_duration_s: f64) -> Self {
        let viewport = Viewport {
            zoom: limits.clamp_zoom(viewport.zoom),
            ..Viewport::new(
                viewport.center,
                viewport.zoom,
                viewport.width_px,
                viewport.height_px,
            )
        };
        Self {
            viewport,
            limits,
            ease_duration_s: ease_duration_s.max(0.0),
            gesture: None,
            ease: None,
            next_ticket: 0,
            events: EventBus::new(),
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        let [width, height] = config.viewport_px;
        Self::new(
            Viewport::new(config.initial_center, config.initial_zoom, width, height),
            config.camera,
            config.ease_duration_s(),
        )
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn limits(&self) -> &CameraLimits {
        &self.limits
    }

    pub fn is_easing(&self) -> bool {
        self.ease.is_some()
    }

    pub fn is_gesturing(&self) -> bool {
        self.gesture.is_some()
    }

    /// Feeds one gesture step. Intermediate steps move the camera silently; the
    /// change is published on [`Gesture::End`] if anything moved.
    pub fn handle(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::Start => self.begin_gesture(),
            Gesture::Pan { dx_px, dy_px } => {
                self.begin_gesture();
                if !(dx_px.is_finite() && dy_px.is_finite()) || (dx_px == 0.0 && dy_px == 0.0) {
                    return;
                }
                self.viewport = self.viewport.panned(dx_px, dy_px);
                self.gesture = Some(true);
            }
            Gesture::Zoom { delta, around_px } => {
                self.begin_gesture();
                if !delta.is_finite() {
                    return;
                }
                let zoom = self.limits.clamp_zoom(self.viewport.zoom + delta);
                if zoom == self.viewport.zoom {
                    return;
                }
                let around = around_px
                    .filter(|p| p[0].is_finite() && p[1].is_finite())
                    .unwrap_or([self.viewport.width_px * 0.5, self.viewport.height_px * 0.5]);
                self.viewport = self.viewport.zoomed_around(zoom, around);
                self.gesture = Some(true);
            }
            Gesture::End => {
                if let Some(moved) = self.gesture.take() {
                    if moved {
                        self.publish(ChangeCause::Gesture);
                    }
                }
            }
        }
    }

    /// Moves the camera immediately and publishes the change.
    pub fn jump_to(&mut self, center: LngLat, zoom: f64) {
        self.cancel_ease();
        self.viewport = self.target(center, zoom);
        self.publish(ChangeCause::Jump);
    }

    /// Starts an animated flight over the configured duration.
    ///
    /// A newer `ease_to` or a user gesture supersedes this one; a superseded
    /// flight never publishes.
    pub fn ease_to(&mut self, center: LngLat, zoom: f64) -> EaseTicket {
        self.ease_to_over(center, zoom, self.ease_duration_s)
    }

    pub fn ease_to_over(&mut self, center: LngLat, zoom: f64, duration_s: f64) -> EaseTicket {
        self.cancel_ease();
        let target = self.target(center, zoom);
        let ticket = EaseTicket(self.next_ticket);
        self.next_ticket += 1;
        self.ease = Some(Ease {
            ticket,
            from_xy: project(self.viewport.center).into(),
            from_zoom: self.viewport.zoom,
            to_xy: project(target.center).into(),
            to_zoom: target.zoom,
            duration_s: if duration_s.is_finite() {
                duration_s.max(0.0)
            } else {
                0.0
            },
            elapsed_s: 0.0,
        });
        tracing::trace!(ticket = ticket.0, zoom = target.zoom, "ease started");
        ticket
    }

    pub fn resize(&mut self, width_px: f64, height_px: f64) {
        self.viewport = self.viewport.resized(width_px, height_px);
        self.publish(ChangeCause::Resize);
    }

    /// Advances an in-flight ease by the frame delta. The flight publishes
    /// exactly once, on the frame it reaches its target.
    pub fn tick(&mut self, frame: &Frame) {
        let Some(mut ease) = self.ease else {
            return;
        };
        ease.elapsed_s += frame.dt_s;
        let t = if ease.duration_s <= 0.0 {
            1.0
        } else {
            (ease.elapsed_s / ease.duration_s).min(1.0)
        };

        if t >= 1.0 {
            self.ease = None;
            self.viewport = Viewport {
                center: clamp_center(unproject(ease.to_xy.into())),
                zoom: ease.to_zoom,
                ..self.viewport
            };
            self.publish(ChangeCause::Ease(ease.ticket));
        } else {
            let (center, zoom) = ease.at(t);
            self.viewport = Viewport {
                center: clamp_center(center),
                zoom,
                ..self.viewport
            };
            self.ease = Some(ease);
        }
    }

    pub fn pending_events(&self) -> &[Stamped<ViewportChanged>] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<Stamped<ViewportChanged>> {
        self.events.drain()
    }

    fn begin_gesture(&mut self) {
        self.cancel_ease();
        if self.gesture.is_none() {
            self.gesture = Some(false);
        }
    }

    fn cancel_ease(&mut self) {
        if let Some(ease) = self.ease.take() {
            tracing::trace!(ticket = ease.ticket.0, "ease superseded");
        }
    }

    fn target(&self, center: LngLat, zoom: f64) -> Viewport {
        Viewport {
            center: clamp_center(center),
            zoom: self.limits.clamp_zoom(zoom),
            ..self.viewport
        }
    }

    fn publish(&mut self, cause: ChangeCause) {
        let seq = self.events.emit(ViewportChanged {
            viewport: self.viewport,
            cause,
        });
        tracing::debug!(
            seq,
            ?cause,
            zoom = self.viewport.zoom,
            lng = self.viewport.center.lng,
            lat = self.viewport.center.lat,
            "viewport changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn controller() -> ViewportController {
        ViewportController::from_config(&MapConfig::default())
    }

    fn causes(c: &mut ViewportController) -> Vec<ChangeCause> {
        c.drain_events().into_iter().map(|s| s.event.cause).collect()
    }

    fn run(c: &mut ViewportController, frames: usize, dt_s: f64) {
        let mut frame = Frame::first();
        for _ in 0..frames {
            frame = frame.advance(dt_s);
            c.tick(&frame);
        }
    }

    #[test]
    fn starts_at_product_default() {
        let c = controller();
        assert_eq!(c.viewport().center, LngLat::new(4.3517, 50.8503));
        assert_eq!(c.viewport().zoom, 0.75);
    }

    #[test]
    fn gesture_publishes_only_when_settled() {
        let mut c = controller();
        c.handle(Gesture::Start);
        for _ in 0..10 {
            c.handle(Gesture::Pan {
                dx_px: 5.0,
                dy_px: -3.0,
            });
        }
        c.handle(Gesture::Zoom {
            delta: 1.0,
            around_px: Some([100.0, 100.0]),
        });
        assert!(c.pending_events().is_empty());

        c.handle(Gesture::End);
        assert_eq!(causes(&mut c), vec![ChangeCause::Gesture]);
        assert_eq!(c.viewport().zoom, 1.75);
    }

    #[test]
    fn click_without_movement_is_silent() {
        let mut c = controller();
        c.handle(Gesture::Start);
        c.handle(Gesture::End);
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn zoom_is_clamped_to_limits() {
        let mut c = controller();
        c.handle(Gesture::Zoom {
            delta: -3.0,
            around_px: None,
        });
        c.handle(Gesture::End);
        // Already at the minimum, so nothing moved.
        assert!(c.drain_events().is_empty());

        c.jump_to(LngLat::new(0.0, 0.0), 40.0);
        assert_eq!(c.viewport().zoom, 18.0);
    }

    #[test]
    fn jump_publishes_immediately() {
        let mut c = controller();
        c.jump_to(LngLat::new(2.35, 48.85), 12.0);
        let events = c.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.cause, ChangeCause::Jump);
        assert_eq!(events[0].event.viewport.zoom, 12.0);
    }

    #[test]
    fn ease_publishes_once_at_completion() {
        let mut c = controller();
        let ticket = c.ease_to(LngLat::new(2.35, 48.85), 10.0);
        run(&mut c, 30, 1.0 / 60.0);
        assert!(c.is_easing());
        assert!(c.pending_events().is_empty());
        let midway = c.viewport().zoom;
        assert!(midway > 0.75 && midway < 10.0);

        run(&mut c, 60, 1.0 / 60.0);
        assert!(!c.is_easing());
        let events = c.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.cause, ChangeCause::Ease(ticket));
        assert_eq!(events[0].event.viewport.zoom, 10.0);

        run(&mut c, 10, 1.0 / 60.0);
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn second_ease_supersedes_first() {
        let mut c = controller();
        c.ease_to(LngLat::new(2.35, 48.85), 10.0);
        run(&mut c, 5, 1.0 / 60.0);
        let second = c.ease_to(LngLat::new(-3.7, 40.4), 6.0);
        run(&mut c, 120, 1.0 / 60.0);

        let events = c.drain_events();
        assert_eq!(events.len(), 1);
        let ViewportChanged { viewport, cause } = events[0].event;
        assert_eq!(cause, ChangeCause::Ease(second));
        assert_eq!(viewport.zoom, 6.0);
        assert!((viewport.center.lng - -3.7).abs() < 1e-9);
        assert!((viewport.center.lat - 40.4).abs() < 1e-9);
    }

    #[test]
    fn gesture_cancels_ease_without_publishing_it() {
        let mut c = controller();
        c.ease_to(LngLat::new(2.35, 48.85), 10.0);
        run(&mut c, 5, 1.0 / 60.0);
        c.handle(Gesture::Start);
        assert!(!c.is_easing());
        c.handle(Gesture::Pan {
            dx_px: 10.0,
            dy_px: 0.0,
        });
        c.handle(Gesture::End);
        run(&mut c, 120, 1.0 / 60.0);
        assert_eq!(causes(&mut c), vec![ChangeCause::Gesture]);
    }

    #[test]
    fn zero_duration_ease_lands_on_next_frame() {
        let mut c = controller();
        let ticket = c.ease_to_over(LngLat::new(10.0, 10.0), 5.0, 0.0);
        assert!(c.drain_events().is_empty());
        c.tick(&Frame::first());
        assert_eq!(causes(&mut c), vec![ChangeCause::Ease(ticket)]);
    }

    #[test]
    fn ease_crosses_antimeridian_the_short_way() {
        let mut c = ViewportController::new(
            Viewport::new(LngLat::new(170.0, 0.0), 4.0, 800.0, 600.0),
            CameraLimits::default(),
            1.0,
        );
        c.ease_to(LngLat::new(-170.0, 0.0), 4.0);
        run(&mut c, 30, 1.0 / 60.0);
        let lng = c.viewport().center.lng;
        assert!(lng > 170.0 || lng < -170.0, "went the long way: {lng}");
    }

    #[test]
    fn resize_publishes() {
        let mut c = controller();
        c.resize(400.0, 300.0);
        assert_eq!(causes(&mut c), vec![ChangeCause::Resize]);
        assert_eq!(c.viewport().width_px, 400.0);
    }

    #[test]
    fn easing_curve_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
    }
}
