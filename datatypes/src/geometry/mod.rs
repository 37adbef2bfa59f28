//! Reference frames of the instrument and the earth.
//!
//! All positions are geocentric and in km unless stated otherwise.

mod coordinate_switch;
mod earth;
mod frames;
mod sch;

pub use coordinate_switch::{CoordinateSwitch, from_spherical, spherical};
pub use earth::{
    east_azimuth, earth_intersection, geocentric_to_geodetic, geodetic_to_geocentric,
    incidence_angle, surface_normal,
};
pub use frames::{VelocityFrame, gc_to_antenna, gc_to_range_azimuth, gc_to_spacecraft};
pub use sch::{SchFrame, geo_heading, radius_along};

pub type Vector3 = nalgebra::Vector3<f64>;
