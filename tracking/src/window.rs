use crate::Degrees;

/// Azimuth sector in which the antenna is allowed to track.
///
/// A window whose minimum is greater than its maximum crosses north: with
/// `min = 300.0` and `max = 40.0` every azimuth from 300° up to 360° and from
/// 0° up to 40° is inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AzimuthWindow {
    Normal { min: Degrees, max: Degrees },
    Wrapped { min: Degrees, max: Degrees },
}

impl AzimuthWindow {
    pub fn new(min: Degrees, max: Degrees) -> Self {
        if min <= max {
            if min == max {
                log::warn!(
                    "azimuth min equals azimuth max ({}), the window only covers one degree",
                    min
                );
            }

            AzimuthWindow::Normal { min, max }
        } else {
            AzimuthWindow::Wrapped { min, max }
        }
    }

    pub fn contains(&self, azimuth: Degrees) -> bool {
        match *self {
            AzimuthWindow::Normal { min, max } => min <= azimuth && azimuth <= max,
            AzimuthWindow::Wrapped { min, max } => azimuth >= min || azimuth <= max,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, AzimuthWindow::Wrapped { .. })
    }
}

/// Inclusive elevation band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationRange {
    pub min: Degrees,
    pub max: Degrees,
}

impl ElevationRange {
    pub fn new(min: Degrees, max: Degrees) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, elevation: Degrees) -> bool {
        self.min <= elevation && elevation <= self.max
    }
}

/// Combined azimuth/elevation zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzElWindow {
    pub azimuth: AzimuthWindow,
    pub elevation: ElevationRange,
}

impl AzElWindow {
    pub fn new(az_min: Degrees, az_max: Degrees, el_min: Degrees, el_max: Degrees) -> Self {
        Self {
            azimuth: AzimuthWindow::new(az_min, az_max),
            elevation: ElevationRange::new(el_min, el_max),
        }
    }

    pub fn contains(&self, azimuth: Degrees, elevation: Degrees) -> bool {
        self.elevation.contains(elevation) && self.azimuth.contains(azimuth)
    }
}
