use super::Vector3;
use crate::constants::{EARTH_ECCENTRICITY_SQUARED, EARTH_EQUATORIAL_RADIUS, EARTH_POLAR_RADIUS};
use std::f64::consts::TAU;

/// Geocentric position of a point given by altitude (km), longitude and geodetic latitude (rad).
pub fn geodetic_to_geocentric(alt: f64, lon: f64, lat: f64) -> Vector3 {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let n = prime_vertical_radius(sin_lat);
    Vector3::new(
        (n + alt) * cos_lat * cos_lon,
        (n + alt) * cos_lat * sin_lon,
        (n * (1.0 - EARTH_ECCENTRICITY_SQUARED) + alt) * sin_lat,
    )
}

/// Returns `(altitude, longitude, geodetic latitude)` of a geocentric position, with the
/// longitude in `[0, 2π)`. Fails for the earth's center.
pub fn geocentric_to_geodetic(v: &Vector3) -> Option<(f64, f64, f64)> {
    const MAX_ITERATIONS: usize = 10;

    let p = v.x.hypot(v.y);
    if p == 0.0 && v.z == 0.0 {
        return None;
    }

    let lon = v.y.atan2(v.x).rem_euclid(TAU);

    if p == 0.0 {
        let lat = std::f64::consts::FRAC_PI_2.copysign(v.z);
        return Some((v.z.abs() - EARTH_POLAR_RADIUS, lon, lat));
    }

    let mut lat = (v.z / (p * (1.0 - EARTH_ECCENTRICITY_SQUARED))).atan();
    let mut alt = 0.0;
    for _ in 0..MAX_ITERATIONS {
        let sin_lat = lat.sin();
        let n = prime_vertical_radius(sin_lat);
        alt = p / lat.cos() - n;
        let next = (v.z / (p * (1.0 - EARTH_ECCENTRICITY_SQUARED * n / (n + alt)))).atan();
        let converged = (next - lat).abs() < 1e-14;
        lat = next;
        if converged {
            break;
        }
    }

    Some((alt, lon, lat))
}

fn prime_vertical_radius(sin_lat: f64) -> f64 {
    EARTH_EQUATORIAL_RADIUS / (1.0 - EARTH_ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt()
}

/// Outward ellipsoid normal at (or below/above) the given position.
pub fn surface_normal(v: &Vector3) -> Vector3 {
    match geocentric_to_geodetic(v) {
        Some((_, lon, lat)) => Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()),
        None => Vector3::z(),
    }
}

/// First intersection of the ray `origin + s·direction` (`s > 0`) with the ellipsoid surface.
pub fn earth_intersection(origin: &Vector3, direction: &Vector3) -> Option<Vector3> {
    // scale the ellipsoid into the unit sphere
    let scale = Vector3::new(
        1.0 / EARTH_EQUATORIAL_RADIUS,
        1.0 / EARTH_EQUATORIAL_RADIUS,
        1.0 / EARTH_POLAR_RADIUS,
    );
    let o = origin.component_mul(&scale);
    let d = direction.component_mul(&scale);

    let a = d.dot(&d);
    let b = 2.0 * o.dot(&d);
    let c = o.dot(&o) - 1.0;
    if a == 0.0 {
        return None;
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let near = (-b - root) / (2.0 * a);
    let far = (-b + root) / (2.0 * a);
    let s = if near > 0.0 { near } else { far };
    if s <= 0.0 {
        return None;
    }

    Some(origin + direction * s)
}

/// Angle between the surface normal at `target` and the direction towards `rsat`.
pub fn incidence_angle(rsat: &Vector3, target: &Vector3) -> f64 {
    let normal = surface_normal(target);
    let to_sat = rsat - target;
    (normal.dot(&to_sat) / to_sat.norm()).clamp(-1.0, 1.0).acos()
}

/// Azimuth of the horizontal projection of the look vector from `rsat` to `target`,
/// counter-clockwise from east.
pub fn east_azimuth(rsat: &Vector3, target: &Vector3) -> f64 {
    let Some((_, lon, lat)) = geocentric_to_geodetic(target) else {
        return 0.0;
    };
    let look = target - rsat;
    let east = Vector3::new(-lon.sin(), lon.cos(), 0.0);
    let north = Vector3::new(-lat.sin() * lon.cos(), -lat.sin() * lon.sin(), lat.cos());
    look.dot(&north).atan2(look.dot(&east))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn geodetic_round_trip() {
        let (alt, lon, lat) = (803.0, 2.5, -0.7);
        let v = geodetic_to_geocentric(alt, lon, lat);
        let (alt2, lon2, lat2) = geocentric_to_geodetic(&v).unwrap();
        assert_relative_eq!(alt2, alt, epsilon = 1e-6);
        assert_relative_eq!(lon2, lon, epsilon = 1e-12);
        assert_relative_eq!(lat2, lat, epsilon = 1e-12);
    }

    #[test]
    fn poles_and_center() {
        let (alt, _, lat) = geocentric_to_geodetic(&Vector3::new(0.0, 0.0, -7000.0)).unwrap();
        assert_relative_eq!(lat, -FRAC_PI_2);
        assert_relative_eq!(alt, 7000.0 - EARTH_POLAR_RADIUS);
        assert!(geocentric_to_geodetic(&Vector3::zeros()).is_none());
    }

    #[test]
    fn nadir_intersection() {
        let rsat = Vector3::new(EARTH_EQUATORIAL_RADIUS + 800.0, 0.0, 0.0);
        let hit = earth_intersection(&rsat, &(-rsat)).unwrap();
        assert_relative_eq!(hit, Vector3::new(EARTH_EQUATORIAL_RADIUS, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(incidence_angle(&rsat, &hit), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn looking_away_misses() {
        let rsat = Vector3::new(EARTH_EQUATORIAL_RADIUS + 800.0, 0.0, 0.0);
        assert!(earth_intersection(&rsat, &rsat).is_none());
        assert!(earth_intersection(&rsat, &Vector3::y()).is_none());
    }

    #[test]
    fn east_azimuth_of_northward_look() {
        let target = geodetic_to_geocentric(0.0, 0.0, 0.0);
        let rsat = geodetic_to_geocentric(800.0, 0.0, -0.05);
        assert_relative_eq!(east_azimuth(&rsat, &target), FRAC_PI_2, epsilon = 1e-9);
    }
}
