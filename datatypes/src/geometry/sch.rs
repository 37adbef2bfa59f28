use super::{Vector3, geocentric_to_geodetic, geodetic_to_geocentric};
use crate::constants::{EARTH_ECCENTRICITY_SQUARED, EARTH_EQUATORIAL_RADIUS};
use crate::error::Error;
use crate::primitives::OrbitState;
use crate::util::Result;
use nalgebra::Matrix3;

/// Time offset of the two orbit positions used to derive the ground track heading.
const HEADING_BASELINE_SECONDS: f64 = 6.0;

/// Radius of curvature of the ellipsoid along `heading` (clockwise from north) at geodetic `lat`.
pub fn radius_along(lat: f64, heading: f64) -> f64 {
    let sin_lat = lat.sin();
    let w = (1.0 - EARTH_ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
    let east = EARTH_EQUATORIAL_RADIUS / w;
    let north = EARTH_EQUATORIAL_RADIUS * (1.0 - EARTH_ECCENTRICITY_SQUARED) / (w * w * w);
    let (sin_hdg, cos_hdg) = heading.sin_cos();
    east * north / (east * cos_hdg * cos_hdg + north * sin_hdg * sin_hdg)
}

/// Heading (clockwise from north) of the great circle from `(lon1, lat1)` towards `(lon2, lat2)`.
pub fn geo_heading(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let d_lon = lon2 - lon1;
    (d_lon.sin() * lat2.cos()).atan2(lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos())
}

/// Along-track (s), cross-track (c) and height (h) coordinates on the sphere osculating the
/// ellipsoid at a peg point in the direction of a heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchFrame {
    pub peg_lat: f64,
    pub peg_lon: f64,
    pub peg_heading: f64,
    radius: f64,
    rotation: Matrix3<f64>,
    origin: Vector3,
}

impl SchFrame {
    pub fn new(peg_lat: f64, peg_lon: f64, peg_heading: f64) -> Self {
        let (slt, clt) = peg_lat.sin_cos();
        let (sln, cln) = peg_lon.sin_cos();
        let (shdg, chdg) = peg_heading.sin_cos();

        let rotation = Matrix3::new(
            clt * cln,
            -shdg * sln - slt * cln * chdg,
            sln * chdg - slt * cln * shdg,
            clt * sln,
            cln * shdg - slt * sln * chdg,
            -cln * chdg - slt * sln * shdg,
            slt,
            clt * chdg,
            clt * shdg,
        );

        let radius = radius_along(peg_lat, peg_heading);
        let up = Vector3::new(clt * cln, clt * sln, slt);
        let origin = geodetic_to_geocentric(0.0, peg_lon, peg_lat) - up * radius;

        Self {
            peg_lat,
            peg_lon,
            peg_heading,
            radius,
            rotation,
            origin,
        }
    }

    /// Pegs the frame below the spacecraft, heading along its ground track.
    pub fn from_orbit(state: &OrbitState) -> Result<Self> {
        let (_, lon, lat) = geocentric_to_geodetic(&state.rsat).ok_or(Error::DegenerateFrame {
            reason: "spacecraft at the earth center",
        })?;
        let (_, lon_before, lat_before) =
            geocentric_to_geodetic(&state.extrapolated_position(-HEADING_BASELINE_SECONDS))
                .ok_or(Error::DegenerateFrame {
                    reason: "spacecraft at the earth center",
                })?;
        let (_, lon_after, lat_after) =
            geocentric_to_geodetic(&state.extrapolated_position(HEADING_BASELINE_SECONDS))
                .ok_or(Error::DegenerateFrame {
                    reason: "spacecraft at the earth center",
                })?;

        Ok(Self::new(
            lat,
            lon,
            geo_heading(lon_before, lat_before, lon_after, lat_after),
        ))
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Converts a geocentric position into `(s, c, h)`.
    pub fn xyz_to_sch(&self, xyz: &Vector3) -> Vector3 {
        let local = self.rotation.transpose() * (xyz - self.origin);
        let r = local.norm();
        let s_angle = local.y.atan2(local.x);
        let c_angle = (local.z / r).clamp(-1.0, 1.0).asin();
        Vector3::new(self.radius * s_angle, self.radius * c_angle, r - self.radius)
    }

    pub fn sch_to_xyz(&self, sch: &Vector3) -> Vector3 {
        let c_angle = sch.y / self.radius;
        let s_angle = sch.x / self.radius;
        let r = self.radius + sch.z;
        let local = Vector3::new(
            r * c_angle.cos() * s_angle.cos(),
            r * c_angle.cos() * s_angle.sin(),
            r * c_angle.sin(),
        );
        self.rotation * local + self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn radius_between_meridional_and_prime_vertical() {
        let lat = 0.6;
        let north = radius_along(lat, 0.0);
        let east = radius_along(lat, FRAC_PI_2);
        let diagonal = radius_along(lat, 0.7);
        assert!(north < diagonal && diagonal < east);
        assert_relative_eq!(radius_along(0.0, FRAC_PI_2), EARTH_EQUATORIAL_RADIUS);
    }

    #[test]
    fn heading_of_meridian() {
        assert_relative_eq!(geo_heading(0.3, 0.1, 0.3, 0.2), 0.0);
        assert_relative_eq!(geo_heading(0.3, 0.1, 0.3, 0.0).abs(), std::f64::consts::PI);
    }

    #[test]
    fn peg_is_origin() {
        let frame = SchFrame::new(0.4, 1.2, 0.3);
        let peg = geodetic_to_geocentric(0.0, 1.2, 0.4);
        assert_relative_eq!(frame.xyz_to_sch(&peg), Vector3::zeros(), epsilon = 1e-8);
    }

    #[test]
    fn sch_round_trip() {
        let frame = SchFrame::new(-0.2, 4.0, 2.0);
        let sch = Vector3::new(35.0, -12.5, 0.3);
        assert_relative_eq!(frame.xyz_to_sch(&frame.sch_to_xyz(&sch)), sch, epsilon = 1e-8);
    }

    #[test]
    fn along_track_follows_heading() {
        // heading north at the equator: moving north increases s only
        let frame = SchFrame::new(0.0, 0.0, 0.0);
        let north = geodetic_to_geocentric(0.0, 0.0, 0.01);
        let sch = frame.xyz_to_sch(&north);
        assert!(sch.x > 60.0);
        assert_relative_eq!(sch.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn frame_from_orbit() {
        let state = OrbitState::new(
            0.0,
            geodetic_to_geocentric(800.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 7.4),
        );
        let frame = SchFrame::from_orbit(&state).unwrap();
        assert_relative_eq!(frame.peg_heading, 0.0, epsilon = 1e-9);
        assert_relative_eq!(frame.peg_lat, 0.0, epsilon = 1e-12);
    }
}
