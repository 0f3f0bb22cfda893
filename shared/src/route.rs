use serde::{Deserialize, Serialize};

/// Lifecycle of the simulated route as reported by the map overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    #[default]
    Idle,
    /// Both pins placed, waiting for the user to start the animation.
    Ready,
    Requesting,
    Animating,
    Done,
    Error,
}

impl RouteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Requesting => "requesting",
            Self::Animating => "animating",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

/// What the route overlay exposes to panels outside the map.
///
/// `owner` identifies the overlay instance whose clear channel applies, so two
/// values are equal only when they describe the same overlay in the same
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteControls {
    pub has_markers: bool,
    pub owner: u64,
}

/// Replace `current` only when `next` differs. Returns whether it changed.
pub fn merge_route_controls(current: &mut RouteControls, next: RouteControls) -> bool {
    if *current == next {
        return false;
    }
    *current = next;
    true
}

pub fn route_status_label(status: RouteStatus, controls: &RouteControls) -> &'static str {
    if status == RouteStatus::Requesting {
        "Calculating route..."
    } else if controls.has_markers {
        "Pins ready. Start animation on map."
    } else {
        "Tap the map twice to set route pins."
    }
}

pub fn clear_disabled(status: RouteStatus, controls: &RouteControls) -> bool {
    !controls.has_markers || status == RouteStatus::Requesting
}

/// Two-click endpoint capture. A third click starts a new route.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoutePins {
    start: Option<[f64; 2]>,
    end: Option<[f64; 2]>,
}

impl RoutePins {
    pub fn start(&self) -> Option<[f64; 2]> {
        self.start
    }

    pub fn end(&self) -> Option<[f64; 2]> {
        self.end
    }

    pub fn has_markers(&self) -> bool {
        self.start.is_some()
    }

    /// Both endpoints, once the second pin is placed.
    pub fn endpoints(&self) -> Option<([f64; 2], [f64; 2])> {
        self.start.zip(self.end)
    }

    pub fn place(&mut self, lon_lat: [f64; 2]) {
        match (self.start, self.end) {
            (None, _) => self.start = Some(lon_lat),
            (Some(_), None) => self.end = Some(lon_lat),
            (Some(_), Some(_)) => {
                self.start = Some(lon_lat);
                self.end = None;
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Position along a polyline at fraction `t` (0..=1) of its vertex count.
pub fn point_along(path: &[[f64; 2]], t: f64) -> Option<[f64; 2]> {
    match path {
        [] => None,
        [only] => Some(*only),
        _ => {
            let t = t.clamp(0.0, 1.0);
            let scaled = t * (path.len() - 1) as f64;
            let index = (scaled.floor() as usize).min(path.len() - 2);
            let frac = scaled - index as f64;
            let [ax, ay] = path[index];
            let [bx, by] = path[index + 1];
            Some([ax + (bx - ax) * frac, ay + (by - ay) * frac])
        }
    }
}

/// Eased animation progress for a route animation started at `start_ms`.
pub fn animation_progress(start_ms: f64, now_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    let t = ((now_ms - start_ms) / duration_ms).clamp(0.0, 1.0);
    // Cubic ease-in-out.
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_label_three_way() {
        let none = RouteControls::default();
        let some = RouteControls {
            has_markers: true,
            owner: 1,
        };
        assert_eq!(
            route_status_label(RouteStatus::Requesting, &some),
            "Calculating route..."
        );
        assert_eq!(
            route_status_label(RouteStatus::Idle, &some),
            "Pins ready. Start animation on map."
        );
        assert_eq!(
            route_status_label(RouteStatus::Done, &none),
            "Tap the map twice to set route pins."
        );
    }

    #[test]
    fn clear_disabled_without_markers_or_while_requesting() {
        let some = RouteControls {
            has_markers: true,
            owner: 1,
        };
        assert!(clear_disabled(RouteStatus::Idle, &RouteControls::default()));
        assert!(clear_disabled(RouteStatus::Requesting, &some));
        assert!(!clear_disabled(RouteStatus::Done, &some));
    }

    #[test]
    fn merge_only_replaces_on_change() {
        let mut current = RouteControls::default();
        assert!(!merge_route_controls(&mut current, RouteControls::default()));
        let next = RouteControls {
            has_markers: true,
            owner: 7,
        };
        assert!(merge_route_controls(&mut current, next));
        assert_eq!(current, next);
        assert!(!merge_route_controls(&mut current, next));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RouteStatus::Requesting).expect("serialize"),
            "\"requesting\""
        );
        assert_eq!(RouteStatus::Idle.as_str(), "idle");
        assert_eq!(RouteStatus::Ready.as_str(), "ready");
    }

    #[test]
    fn pins_cycle_through_start_end_restart() {
        let mut pins = RoutePins::default();
        assert!(!pins.has_markers());
        pins.place([1.0, 70.0]);
        assert!(pins.has_markers());
        assert_eq!(pins.endpoints(), None);
        pins.place([2.0, 71.0]);
        assert_eq!(pins.endpoints(), Some(([1.0, 70.0], [2.0, 71.0])));
        pins.place([3.0, 72.0]);
        assert_eq!(pins.start(), Some([3.0, 72.0]));
        assert_eq!(pins.end(), None);
        pins.clear();
        assert!(!pins.has_markers());
    }

    #[test]
    fn point_along_interpolates_and_clamps() {
        let path = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]];
        assert_eq!(point_along(&path, 0.0), Some([0.0, 0.0]));
        assert_eq!(point_along(&path, 0.25), Some([5.0, 0.0]));
        assert_eq!(point_along(&path, 1.0), Some([10.0, 10.0]));
        assert_eq!(point_along(&path, 7.0), Some([10.0, 10.0]));
        assert_eq!(point_along(&[], 0.5), None);
    }

    #[test]
    fn animation_progress_bounds() {
        assert_eq!(animation_progress(100.0, 50.0, 1000.0), 0.0);
        assert_eq!(animation_progress(0.0, 500.0, 1000.0), 0.5);
        assert_eq!(animation_progress(0.0, 5000.0, 1000.0), 1.0);
        assert_eq!(animation_progress(0.0, 0.0, 0.0), 1.0);
    }
}
