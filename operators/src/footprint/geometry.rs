use crate::engine::Antenna;
use crate::error;
use crate::util::Result;
use scatsim_datatypes::geometry::{
    CoordinateSwitch, SchFrame, Vector3, VelocityFrame, earth_intersection, east_azimuth,
    from_spherical, gc_to_antenna, gc_to_range_azimuth, incidence_angle,
};
use scatsim_datatypes::primitives::{Attitude, InstrumentState, Meas, MeasSpot, OrbitState};
use scatsim_datatypes::tables::abs_to_rel_slice;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ensure};

/// Frames and reference points shared by all measurements of a spot.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotGeometry {
    pub beam_idx: usize,
    pub gc_to_antenna: CoordinateSwitch,
    /// Range/azimuth frame at the boresight intercept.
    pub gc_to_range_azimuth: CoordinateSwitch,
    pub spot_centroid: Vector3,
    pub look: Vector3,
    pub sch: SchFrame,
    /// Along-track position of the boresight intercept (km).
    pub bore_along: f64,
    /// Cross-track position of the boresight intercept (km).
    pub bore_cross: f64,
    /// One-way gain at the electrical boresight.
    pub max_gain: f64,
    /// Antenna azimuth in the ambiguity table convention (deg).
    pub ambiguity_scan_angle: f64,
}

impl SpotGeometry {
    pub fn new(
        orbit: &OrbitState,
        attitude: &Attitude,
        state: &InstrumentState,
        antenna: &dyn Antenna,
        velocity_frame: VelocityFrame,
    ) -> Result<Self> {
        let beam = state.beam_idx;
        let gc_to_antenna = gc_to_antenna(orbit, velocity_frame, attitude, state.antenna_azimuth)?;

        let (theta, phi) = antenna
            .electrical_boresight(beam)
            .context(error::MissingBoresight { beam })?;
        let max_gain = antenna
            .power_gain(beam, theta, phi)
            .context(error::MissingBoresight { beam })?;

        let look = gc_to_antenna.backward(&from_spherical(1.0, theta, phi));
        let spot_centroid =
            earth_intersection(&orbit.rsat, &look).context(error::BoresightMissesEarth { beam })?;
        let gc_to_range_azimuth = gc_to_range_azimuth(&spot_centroid, &look)?;

        let sch = SchFrame::from_orbit(orbit)?;
        let bore = sch.xyz_to_sch(&spot_centroid);

        let scan_angle = state.antenna_azimuth.to_degrees();
        let ambiguity_scan_angle = if scan_angle <= 270.0 {
            scan_angle + 90.0
        } else {
            scan_angle - 270.0
        };
        ensure!(
            (0.0..=360.0).contains(&ambiguity_scan_angle),
            error::InvalidScanAngle { scan_angle }
        );

        Ok(Self {
            beam_idx: beam,
            gc_to_antenna,
            gc_to_range_azimuth,
            spot_centroid,
            look,
            sch,
            bore_along: bore.x,
            bore_cross: bore.y,
            max_gain,
            ambiguity_scan_angle,
        })
    }

    /// Range and azimuth offsets (km) of `point` from the boresight intercept.
    pub fn range_azimuth_offset(&self, point: &Vector3) -> (f64, f64) {
        let offset = self.gc_to_range_azimuth.forward(&(point - self.spot_centroid));
        (offset.x, offset.y)
    }

    /// Geocentric position of the point at the given range/azimuth offsets.
    pub fn point_at(&self, range: f64, azimuth: f64) -> Vector3 {
        self.gc_to_range_azimuth
            .backward(&Vector3::new(range, azimuth, 0.0))
            + self.spot_centroid
    }

    /// Along/cross-track offsets (km) of `point` from the boresight intercept.
    pub fn along_cross_offset(&self, point: &Vector3) -> (f64, f64) {
        let sch = self.sch.xyz_to_sch(point);
        (sch.x - self.bore_along, sch.y - self.bore_cross)
    }

    /// Surface position of an ambiguity given relative to the boresight intercept.
    pub fn ambiguity_position(&self, along: f64, cross: f64) -> Vector3 {
        self.sch.sch_to_xyz(&Vector3::new(
            along + self.bore_along,
            cross + self.bore_cross,
            0.0,
        ))
    }
}

/// Arrangement of the measurement pixels of a spot in its range/azimuth frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelLayout {
    /// Pixels (or slices) across the echo bandwidth.
    pub range_pixels: usize,
    /// km
    pub range_spacing: f64,
    /// km, only used if more than one pulse is processed
    pub azimuth_spacing: f64,
}

impl Default for PixelLayout {
    fn default() -> Self {
        Self {
            range_pixels: 10,
            range_spacing: 2.0,
            azimuth_spacing: 2.0,
        }
    }
}

impl PixelLayout {
    pub fn azimuth_pixels(&self, state: &InstrumentState) -> usize {
        state.params.num_pulses.max(1)
    }
}

/// Creates the measurements of a spot on a regular range/azimuth grid around the
/// boresight intercept. Pixels whose line of sight misses the earth keep their centroid
/// at the origin.
pub fn locate_pixels(
    orbit: &OrbitState,
    state: &InstrumentState,
    geometry: &SpotGeometry,
    layout: &PixelLayout,
) -> Result<MeasSpot> {
    ensure!(
        layout.range_pixels > 0,
        error::InvalidParameter {
            name: "range pixels",
            reason: "a spot needs at least one pixel".to_string()
        }
    );
    let beam = state.beam().ok_or(scatsim_datatypes::error::Error::InvalidBeam {
        beam: state.beam_idx,
        beams: state.params.beams.len(),
    })?;

    let params = &state.params;
    let range_pixels = layout.range_pixels;
    let azimuth_pixels = layout.azimuth_pixels(state);
    let range_center = (range_pixels - 1) as f64 / 2.0;
    let azimuth_center = (azimuth_pixels - 1) as f64 / 2.0;

    let mut spot = MeasSpot::new(state.time, orbit.rsat, orbit.vsat);
    for j in 0..azimuth_pixels {
        for i in 0..range_pixels {
            let range = (i as f64 - range_center) * layout.range_spacing;
            let azimuth = (j as f64 - azimuth_center) * layout.azimuth_spacing;
            let in_plane = geometry.point_at(range, azimuth);
            let (centroid, incidence, azimuth_angle) =
                match earth_intersection(&orbit.rsat, &(in_plane - orbit.rsat)) {
                    Some(centroid) => (
                        centroid,
                        incidence_angle(&orbit.rsat, &centroid),
                        east_azimuth(&orbit.rsat, &centroid),
                    ),
                    None => (Vector3::zeros(), 0.0, 0.0),
                };

            spot.measurements.push(Meas {
                centroid,
                bandwidth: params.echo_bandwidth / range_pixels as f64,
                tx_pulse_width: params.tx_pulse_width,
                meas_type: beam.polarization,
                incidence_angle: incidence,
                east_azimuth: azimuth_angle,
                scan_angle: state.antenna_azimuth,
                beam_idx: state.beam_idx,
                start_slice_idx: abs_to_rel_slice(i, range_pixels).unwrap_or_default(),
                num_slices: 1,
                ..Meas::default()
            });
        }
    }
    Ok(spot)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mock::GaussianAntenna;
    use approx::assert_relative_eq;
    use scatsim_datatypes::geometry::geodetic_to_geocentric;
    use scatsim_datatypes::util::test::TestDefault;
    use std::f64::consts::FRAC_PI_2;

    pub(crate) fn equator_orbit() -> OrbitState {
        OrbitState::new(
            0.0,
            geodetic_to_geocentric(800.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 7.4),
        )
    }

    pub(crate) fn looking_right(beam_idx: usize) -> InstrumentState {
        InstrumentState {
            beam_idx,
            antenna_azimuth: FRAC_PI_2,
            ..InstrumentState::test_default()
        }
    }

    pub(crate) fn spot_geometry(state: &InstrumentState) -> SpotGeometry {
        let antenna = GaussianAntenna::new(state.params.beams.to_vec());
        SpotGeometry::new(
            &equator_orbit(),
            &Attitude::default(),
            state,
            &antenna,
            VelocityFrame::Inertial,
        )
        .unwrap()
    }

    #[test]
    fn boresight_frame() {
        let state = looking_right(1);
        let geometry = spot_geometry(&state);

        assert_relative_eq!(geometry.spot_centroid.norm(), 6378.137, epsilon = 1e-3);
        assert_relative_eq!(geometry.max_gain, state.params.beams[1].peak_gain);
        assert_relative_eq!(geometry.ambiguity_scan_angle, 180.0, epsilon = 1e-9);

        let (range, azimuth) = geometry.range_azimuth_offset(&geometry.spot_centroid);
        assert_relative_eq!(range, 0.0, epsilon = 1e-9);
        assert_relative_eq!(azimuth, 0.0, epsilon = 1e-9);

        // the beam looks perpendicular to the ground track
        let (along, cross) = geometry.along_cross_offset(&geometry.point_at(0.0, 3.0));
        assert_relative_eq!(along.abs(), 3.0, max_relative = 0.05);
        assert!(cross.abs() < 0.5);
    }

    #[test]
    fn ambiguity_positions_are_relative_to_the_boresight() {
        let geometry = spot_geometry(&looking_right(0));
        let position = geometry.ambiguity_position(0.0, 0.0);
        assert!((position - geometry.spot_centroid).norm() < 1.0);

        let shifted = geometry.ambiguity_position(10.0, 0.0);
        assert_relative_eq!((shifted - position).norm(), 10.0, max_relative = 0.05);
    }

    #[test]
    fn scan_angle_out_of_range() {
        let state = InstrumentState {
            antenna_azimuth: -2.0,
            ..looking_right(0)
        };
        let antenna = GaussianAntenna::new(state.params.beams.to_vec());
        let result = SpotGeometry::new(
            &equator_orbit(),
            &Attitude::default(),
            &state,
            &antenna,
            VelocityFrame::Inertial,
        );
        assert!(matches!(result, Err(error::Error::InvalidScanAngle { .. })));
    }

    #[test]
    fn pixels_straddle_the_boresight() {
        let state = looking_right(1);
        let geometry = spot_geometry(&state);
        let layout = PixelLayout {
            range_pixels: 4,
            range_spacing: 5.0,
            azimuth_spacing: 1.0,
        };
        let spot = locate_pixels(&equator_orbit(), &state, &geometry, &layout).unwrap();

        assert_eq!(spot.len(), 4);
        assert_eq!(
            spot.measurements
                .iter()
                .map(|m| m.start_slice_idx)
                .collect::<Vec<_>>(),
            vec![-2, -1, 1, 2]
        );
        for meas in &spot.measurements {
            assert!(meas.has_surface_centroid());
            assert_relative_eq!(meas.bandwidth, state.params.echo_bandwidth / 4.0);
            assert_eq!(meas.meas_type, state.params.beams[1].polarization);
        }
        // incidence grows with range
        assert!(spot.measurements[3].incidence_angle > spot.measurements[0].incidence_angle);
    }
}
