use crate::engine::{LandMap, RainContamination, RainField};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoLand;

impl LandMap for NoLand {
    fn is_land(&self, _lon: f64, _lat: f64) -> bool {
        false
    }
}

/// Land inside a longitude/latitude box (rad). Longitudes wrap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl LandMap for LandBox {
    fn is_land(&self, lon: f64, lat: f64) -> bool {
        let lon = lon.rem_euclid(TAU);
        let (lon_min, lon_max) = (self.lon_min.rem_euclid(TAU), self.lon_max.rem_euclid(TAU));
        let in_lon = if lon_min <= lon_max {
            (lon_min..=lon_max).contains(&lon)
        } else {
            lon >= lon_min || lon <= lon_max
        };
        in_lon && (self.lat_min..=self.lat_max).contains(&lat)
    }
}

/// The same surface rain effect everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformRain {
    pub contamination: RainContamination,
    pub three_dimensional: bool,
}

impl RainField for UniformRain {
    fn is_three_dimensional(&self) -> bool {
        self.three_dimensional
    }

    fn contamination(&self, _lon: f64, _lat: f64, _incidence_angle: f64) -> Option<RainContamination> {
        Some(self.contamination)
    }
}
