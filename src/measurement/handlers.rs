//! Measurement message handlers
//!
//! Routes raw pointer input, given in display coordinates, to an
//! [`AngleMeasurementEngine`] in backing coordinates.

use super::AngleMeasurementEngine;
use super::display::DisplayMapping;

/// Identifies one touch contact or the mouse
pub type PointerId = u64;

/// Pointer input in client (display) coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down { id: PointerId, x: f64, y: f64 },
    Move { id: PointerId, x: f64, y: f64 },
    Up { id: PointerId },
    Cancel { id: PointerId },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MeasureMsg {
    Pointer(PointerEvent),
    Reset,
}

/// Single-pointer router between the display and the engine
///
/// The first pointer to go down owns the gesture until it is released or
/// cancelled. Other contacts are ignored meanwhile.
#[derive(Clone, Debug)]
pub struct PointerRouter {
    mapping: DisplayMapping,
    active: Option<PointerId>,
}

impl PointerRouter {
    pub fn new(mapping: DisplayMapping) -> Self {
        Self {
            mapping,
            active: None,
        }
    }

    /// Update where the surface is displayed, e.g. after a resize
    pub fn set_mapping(&mut self, mapping: DisplayMapping) {
        self.mapping = mapping;
    }

    pub fn active_pointer(&self) -> Option<PointerId> {
        self.active
    }

    /// Handle a MeasureMsg, modifying engine state
    pub fn handle(&mut self, engine: &mut AngleMeasurementEngine, msg: MeasureMsg) {
        match msg {
            MeasureMsg::Pointer(event) => self.handle_pointer(engine, event),
            MeasureMsg::Reset => {
                self.active = None;
                engine.reset();
            }
        }
    }

    fn handle_pointer(&mut self, engine: &mut AngleMeasurementEngine, event: PointerEvent) {
        match event {
            PointerEvent::Down { id, x, y } => {
                if self.active.is_some_and(|active| active != id) {
                    log::trace!("Ignoring secondary pointer {id}");
                    return;
                }
                self.active = Some(id);
                let pos = self.mapping.to_backing(x, y);
                engine.pointer_down(pos.x, pos.y);
            }
            PointerEvent::Move { id, x, y } => {
                if self.active == Some(id) {
                    let pos = self.mapping.to_backing(x, y);
                    engine.pointer_move(pos.x, pos.y);
                }
            }
            PointerEvent::Up { id } | PointerEvent::Cancel { id } => {
                if self.active == Some(id) {
                    self.active = None;
                    engine.pointer_up();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeasureConfig;
    use crate::measurement::compute_angle;
    use crate::domain::{Bounds, OrientedImage, Position};
    use image::{Rgba, RgbaImage};

    fn setup() -> (PointerRouter, AngleMeasurementEngine) {
        let backing = OrientedImage::from(RgbaImage::from_pixel(800, 600, Rgba([0, 0, 0, 255])));
        let engine = AngleMeasurementEngine::new(backing, &MeasureConfig::default());
        // Shown at half size
        let mapping = DisplayMapping::new(
            800,
            600,
            Bounds {
                left: 0.0,
                top: 0.0,
                width: 400.0,
                height: 300.0,
            },
        )
        .unwrap();
        (PointerRouter::new(mapping), engine)
    }

    fn tap(router: &mut PointerRouter, engine: &mut AngleMeasurementEngine, x: f64, y: f64) {
        router.handle(engine, MeasureMsg::Pointer(PointerEvent::Down { id: 1, x, y }));
        router.handle(engine, MeasureMsg::Pointer(PointerEvent::Up { id: 1 }));
    }

    #[test]
    fn test_taps_are_mapped_to_backing_space() {
        let (mut router, mut engine) = setup();
        tap(&mut router, &mut engine, 50.0, 25.0);
        tap(&mut router, &mut engine, 50.0, 100.0);
        tap(&mut router, &mut engine, 125.0, 100.0);

        assert_eq!(
            engine.points(),
            &[
                Position::new(100.0, 50.0),
                Position::new(100.0, 200.0),
                Position::new(250.0, 200.0),
            ]
        );
        assert_eq!(engine.angle_value(), Some(90.0));
        assert_eq!(router.active_pointer(), None);
    }

    #[test]
    fn test_fractional_client_coordinates_keep_full_precision() {
        let (mut router, mut engine) = setup();
        // 800x600 shown at 300x225, scale 8/3
        let shrunk = DisplayMapping::new(
            800,
            600,
            Bounds {
                left: 0.0,
                top: 0.0,
                width: 300.0,
                height: 225.0,
            },
        )
        .unwrap();
        router.set_mapping(shrunk);
        tap(&mut router, &mut engine, 100.1, 50.3);

        let first = engine.points()[0];
        assert!((first.x - 266.933_333_333_333_3).abs() < 1e-9, "x {}", first.x);
        assert!((first.y - 134.133_333_333_333_3).abs() < 1e-9, "y {}", first.y);

        // Resized to 600x450, scale 4/3
        let grown = DisplayMapping::new(
            800,
            600,
            Bounds {
                left: 12.5,
                top: 0.0,
                width: 600.0,
                height: 450.0,
            },
        )
        .unwrap();
        router.set_mapping(grown);
        tap(&mut router, &mut engine, 262.75, 300.2);
        tap(&mut router, &mut engine, 512.5, 300.2);

        let points = engine.points();
        assert_eq!(points.len(), 3);
        assert!((points[1].x - 333.666_666_666_666_7).abs() < 1e-9, "x {}", points[1].x);
        assert!((points[1].y - 400.266_666_666_666_7).abs() < 1e-9, "y {}", points[1].y);
        assert_eq!(
            engine.angle_value(),
            compute_angle(points[0], points[1], points[2])
        );
        // Stored positions round half up on export
        assert_eq!(engine.measurement_data().points[0].x, 267);
        assert_eq!(engine.measurement_data().points[2].x, 667);
    }

    #[test]
    fn test_secondary_pointer_is_ignored_while_active() {
        let (mut router, mut engine) = setup();
        tap(&mut router, &mut engine, 50.0, 50.0);

        router.handle(
            &mut engine,
            MeasureMsg::Pointer(PointerEvent::Down { id: 1, x: 50.0, y: 50.0 }),
        );
        assert!(engine.is_dragging());

        router.handle(
            &mut engine,
            MeasureMsg::Pointer(PointerEvent::Down { id: 2, x: 200.0, y: 200.0 }),
        );
        router.handle(
            &mut engine,
            MeasureMsg::Pointer(PointerEvent::Move { id: 2, x: 10.0, y: 10.0 }),
        );
        router.handle(&mut engine, MeasureMsg::Pointer(PointerEvent::Up { id: 2 }));
        assert_eq!(engine.points().len(), 1);
        assert!(engine.is_dragging());

        router.handle(
            &mut engine,
            MeasureMsg::Pointer(PointerEvent::Move { id: 1, x: 60.0, y: 70.0 }),
        );
        assert_eq!(engine.points()[0], Position::new(120.0, 140.0));
    }

    #[test]
    fn test_cancel_ends_drag() {
        let (mut router, mut engine) = setup();
        tap(&mut router, &mut engine, 50.0, 50.0);
        router.handle(
            &mut engine,
            MeasureMsg::Pointer(PointerEvent::Down { id: 7, x: 52.0, y: 50.0 }),
        );
        assert!(engine.is_dragging());

        router.handle(&mut engine, MeasureMsg::Pointer(PointerEvent::Cancel { id: 7 }));
        assert!(!engine.is_dragging());
        assert_eq!(router.active_pointer(), None);
    }

    #[test]
    fn test_reset_clears_engine_and_pointer() {
        let (mut router, mut engine) = setup();
        router.handle(
            &mut engine,
            MeasureMsg::Pointer(PointerEvent::Down { id: 3, x: 10.0, y: 10.0 }),
        );
        router.handle(&mut engine, MeasureMsg::Reset);
        assert!(engine.points().is_empty());
        assert_eq!(router.active_pointer(), None);
    }
}
