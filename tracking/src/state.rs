use crate::{AzElWindow, Degrees};

/// Edge-triggered "in track" flag.
///
/// [`update`](TrackState::update) only reports a value when the flag flips, so
/// repeated positions on the same side of a boundary produce nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackState {
    in_track: bool,
}

impl TrackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_track(&self) -> bool {
        self.in_track
    }

    /// Stores `in_track` and returns it if it differs from the held value.
    pub fn update(&mut self, in_track: bool) -> Option<bool> {
        if self.in_track == in_track {
            return None;
        }

        self.in_track = in_track;
        Some(in_track)
    }
}

/// Track state derived from a minimum elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationThreshold {
    minimum: Degrees,
    state: TrackState,
}

impl ElevationThreshold {
    pub fn new(minimum: Degrees) -> Self {
        Self {
            minimum,
            state: TrackState::new(),
        }
    }

    pub fn minimum(&self) -> Degrees {
        self.minimum
    }

    pub fn is_in_track(&self) -> bool {
        self.state.is_in_track()
    }

    /// Feeds a new elevation, returning the new state on a crossing.
    pub fn update(&mut self, elevation: Degrees) -> Option<bool> {
        self.state.update(elevation >= self.minimum)
    }
}

/// Track state derived from an azimuth/elevation zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzElLimit {
    window: AzElWindow,
    state: TrackState,
}

impl AzElLimit {
    pub fn new(window: AzElWindow) -> Self {
        Self {
            window,
            state: TrackState::new(),
        }
    }

    pub fn window(&self) -> &AzElWindow {
        &self.window
    }

    pub fn is_in_track(&self) -> bool {
        self.state.is_in_track()
    }

    /// Feeds a new position, returning the new state when the zone is
    /// entered or left.
    ///
    /// Angles are truncated to whole degrees before the comparison.
    pub fn update(&mut self, azimuth: Degrees, elevation: Degrees) -> Option<bool> {
        let in_zone = self.window.contains(azimuth.trunc(), elevation.trunc());
        self.state.update(in_zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_state_reports_only_flips() {
        let mut state = TrackState::new();

        assert_eq!(state.update(false), None);
        assert_eq!(state.update(true), Some(true));
        assert_eq!(state.update(true), None);
        assert_eq!(state.update(false), Some(false));
        assert!(!state.is_in_track());
    }

    #[test]
    fn elevation_crossing_fires_once_each_way() {
        let mut threshold = ElevationThreshold::new(10.0);

        let transitions: Vec<(f64, bool)> = [0.0, 5.0, 9.9, 10.0, 25.0, 40.0, 12.0, 9.0, 3.0, -1.0]
            .into_iter()
            .filter_map(|el| threshold.update(el).map(|state| (el, state)))
            .collect();

        assert_eq!(transitions, vec![(10.0, true), (9.0, false)]);
    }

    #[test]
    fn unknown_elevation_is_below_any_sane_minimum() {
        let mut threshold = ElevationThreshold::new(0.0);

        assert_eq!(threshold.update(crate::UNKNOWN_ANGLE), None);
        assert!(!threshold.is_in_track());
    }

    #[test]
    fn azel_limit_enters_and_leaves_wrapped_zone() {
        let mut limit = AzElLimit::new(AzElWindow::new(300.0, 40.0, 0.0, 90.0));

        assert_eq!(limit.update(250.0, 10.0), None);
        assert_eq!(limit.update(310.0, 10.0), Some(true));
        assert_eq!(limit.update(0.0, 12.0), None);
        assert_eq!(limit.update(40.0, 15.0), None);
        assert_eq!(limit.update(41.0, 15.0), Some(false));
        assert_eq!(limit.update(100.0, 15.0), None);
    }

    #[test]
    fn azel_limit_truncates_to_whole_degrees() {
        let mut limit = AzElLimit::new(AzElWindow::new(10.0, 40.0, 5.0, 90.0));

        assert_eq!(limit.update(40.7, 20.0), Some(true));
        assert_eq!(limit.update(20.0, 4.9), Some(false));
    }
}
