use super::IntegrationParameters;
use super::geometry::SpotGeometry;
use crate::error;
use crate::util::Result;
use scatsim_datatypes::geometry::Vector3;
use snafu::ensure;

/// Azimuth scaling of the sinc² response of the synthetic aperture processor.
const E_FACTOR: f64 = 1.644;

/// Range widening of the Gaussian response of one range look.
const RANGE_SPREAD: f64 = 1.6;

/// Peak of the boxcar response.
const BOXCAR_SCALE: f64 = 0.87;

/// Weighting of the integration cells around a measurement by the processed response:
/// Gaussian per range look and sinc² in azimuth when more than one pulse is processed, or a
/// constant over the range looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointTargetResponse {
    pub boxcar: bool,
    pub single_pulse: bool,
}

/// What one integration cell contributes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellValue {
    pub dx: f64,
    pub es: f64,
    pub is_land: bool,
    pub ambiguity: [f64; 2],
}

/// Integrated quantities of one measurement. Widths are the half-power extents of the
/// `dX` map in km.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridSums {
    pub xk: f64,
    pub x_land: f64,
    pub es: f64,
    pub ambiguity: [f64; 2],
    pub range_width: f64,
    pub azimuth_width: f64,
}

/// Regular range/azimuth grid around one measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationGrid {
    step: f64,
    range_bins: usize,
    azimuth_bins: usize,
    range_width: f64,
    azimuth_width: f64,
    looks: usize,
    range_center: f64,
    azimuth_center: f64,
    look_centers: Vec<f64>,
}

impl IntegrationGrid {
    /// Grid for a response with half widths `range_width` and `azimuth_width` (km)
    /// averaged over `looks` range looks.
    pub fn new(
        params: &IntegrationParameters,
        range_width: f64,
        azimuth_width: f64,
        looks: usize,
        single_pulse: bool,
        tabulated_widths: bool,
    ) -> Result<Self> {
        ensure!(looks % 2 == 0, error::OddRangeLooks { looks });
        ensure!(
            looks > 0 && params.step_size > 0.0,
            error::InvalidParameter {
                name: "integration grid",
                reason: format!("{looks} looks with step {} km", params.step_size)
            }
        );

        let step = params.step_size;
        let range_bins = (params.range_width_factor * range_width * 2.0 * looks as f64 / step)
            .ceil() as usize
            + 1;
        let mut azimuth_bins =
            (params.azimuth_width_factor * azimuth_width * 2.0 / step).ceil() as usize + 1;
        if single_pulse {
            azimuth_bins = params.max_azimuth_bins;
        } else if !tabulated_widths {
            azimuth_bins = azimuth_bins.min(params.max_azimuth_bins);
        }

        ensure!(
            range_bins <= params.max_range_bins && azimuth_bins <= params.max_azimuth_bins,
            error::TooManyIntegrationBins {
                range_bins,
                azimuth_bins,
                max_range_bins: params.max_range_bins,
                max_azimuth_bins: params.max_azimuth_bins,
            }
        );

        let range_center = (range_bins - 1) as f64 / 2.0;
        let half_looks = (looks / 2) as f64;
        let look_centers = (0..looks)
            .map(|n| range_center + (2.0 * (n as f64 - half_looks) + 1.0) * range_width / step)
            .collect();

        Ok(Self {
            step,
            range_bins,
            azimuth_bins,
            range_width,
            azimuth_width,
            looks,
            range_center,
            azimuth_center: (azimuth_bins - 1) as f64 / 2.0,
            look_centers,
        })
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.range_bins, self.azimuth_bins]
    }

    /// Range and azimuth offsets (km) of cell `(i, j)` from the grid center.
    pub fn offset(&self, i: usize, j: usize) -> (f64, f64) {
        (
            (i as f64 - self.range_center) * self.step,
            (j as f64 - self.azimuth_center) * self.step,
        )
    }

    pub fn weight(&self, response: PointTargetResponse, i: usize, j: usize) -> f64 {
        let step = self.step;
        if response.boxcar {
            let center = (self.range_bins / 2) as f64;
            let half = self.looks as f64 * self.range_width / step;
            return if (center - half..=center + half).contains(&(i as f64)) {
                BOXCAR_SCALE * 1_f64.sin().powi(2)
            } else {
                0.0
            };
        }

        let azimuth = if response.single_pulse {
            1.0
        } else {
            (j as f64 - self.azimuth_center) * step / self.azimuth_width * E_FACTOR
        };
        let sinc2 = if azimuth.abs() < f64::EPSILON {
            1.0
        } else {
            (azimuth.sin() / azimuth).powi(2)
        };
        self.look_centers
            .iter()
            .map(|center| {
                let range = (i as f64 - center) * step / (self.range_width * RANGE_SPREAD);
                (-range * range).exp() * sinc2
            })
            .sum()
    }

    /// Sums the contributions of all cells. `cell` receives the position of the cell in
    /// the tangent plane of the spot and its response weight.
    pub fn integrate<F>(
        &self,
        response: PointTargetResponse,
        geometry: &SpotGeometry,
        range: f64,
        azimuth: f64,
        mut cell: F,
    ) -> Result<GridSums>
    where
        F: FnMut(&Vector3, f64) -> Result<CellValue>,
    {
        let mut sums = GridSums::default();
        let mut dx_map = vec![0.0; self.range_bins * self.azimuth_bins];

        for i in 0..self.range_bins {
            for j in 0..self.azimuth_bins {
                let weight = self.weight(response, i, j);
                if weight <= 0.0 {
                    continue;
                }
                let (dr, da) = self.offset(i, j);
                let value = cell(&geometry.point_at(range + dr, azimuth + da), weight)?;

                dx_map[i * self.azimuth_bins + j] = value.dx;
                sums.xk += value.dx;
                sums.es += value.es;
                if value.is_land {
                    sums.x_land += value.dx;
                }
                sums.ambiguity[0] += value.ambiguity[0];
                sums.ambiguity[1] += value.ambiguity[1];
            }
        }

        let (range_width, azimuth_width) = self.half_power_widths(&dx_map);
        sums.range_width = range_width;
        sums.azimuth_width = azimuth_width;
        Ok(sums)
    }

    fn half_power_widths(&self, dx_map: &[f64]) -> (f64, f64) {
        let max = dx_map.iter().copied().fold(0.0, f64::max);
        if max <= 0.0 {
            return (0.0, 0.0);
        }

        let mut range = (usize::MAX, 0);
        let mut azimuth = (usize::MAX, 0);
        for (index, dx) in dx_map.iter().enumerate() {
            if *dx > 0.5 * max {
                let (i, j) = (index / self.azimuth_bins, index % self.azimuth_bins);
                range = (range.0.min(i), range.1.max(i));
                azimuth = (azimuth.0.min(j), azimuth.1.max(j));
            }
        }
        (
            self.step * (range.1 - range.0) as f64,
            self.step * (azimuth.1 - azimuth.0) as f64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::footprint::geometry::tests::{looking_right, spot_geometry};
    use approx::assert_relative_eq;

    fn params() -> IntegrationParameters {
        IntegrationParameters {
            step_size: 0.5,
            range_width_factor: 2.0,
            max_range_bins: 40,
            max_azimuth_bins: 41,
            ..IntegrationParameters::default()
        }
    }

    #[test]
    fn grid_dimensions() {
        let grid = IntegrationGrid::new(&params(), 1.0, 5.0, 2, true, false).unwrap();
        assert_eq!(grid.shape(), [17, 41]);
        assert_eq!(grid.offset(8, 20), (0.0, 0.0));
        assert_eq!(grid.look_centers, vec![6.0, 10.0]);

        assert!(matches!(
            IntegrationGrid::new(&params(), 1.0, 5.0, 3, true, false),
            Err(Error::OddRangeLooks { looks: 3 })
        ));
        assert!(matches!(
            IntegrationGrid::new(&params(), 10.0, 5.0, 2, true, false),
            Err(Error::TooManyIntegrationBins { .. })
        ));
    }

    #[test]
    fn responses_peak_at_the_looks() {
        let grid = IntegrationGrid::new(&params(), 1.0, 5.0, 2, false, false).unwrap();
        let response = PointTargetResponse {
            boxcar: false,
            single_pulse: false,
        };
        let [_, azimuth_bins] = grid.shape();
        let center = azimuth_bins / 2;

        // symmetric about the grid center
        assert_relative_eq!(
            grid.weight(response, 6, center),
            grid.weight(response, 10, center),
            max_relative = 1e-12
        );
        assert!(grid.weight(response, 6, center) > grid.weight(response, 0, center));
        assert!(grid.weight(response, 6, center) > grid.weight(response, 6, center + 3));

        let boxcar = PointTargetResponse {
            boxcar: true,
            single_pulse: false,
        };
        assert_relative_eq!(grid.weight(boxcar, 8, 0), 0.87 * 1_f64.sin().powi(2));
        assert!(grid.weight(boxcar, 0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn uniform_cells_integrate_to_the_weights() {
        let state = looking_right(1);
        let geometry = spot_geometry(&state);
        let grid = IntegrationGrid::new(&params(), 1.0, 2.0, 2, false, true).unwrap();
        let response = PointTargetResponse {
            boxcar: false,
            single_pulse: false,
        };

        let sums = grid
            .integrate(response, &geometry, 0.0, 0.0, |_, weight| {
                Ok(CellValue {
                    dx: weight,
                    es: 2.0 * weight,
                    is_land: false,
                    ambiguity: [weight, 0.0],
                })
            })
            .unwrap();

        let [range_bins, azimuth_bins] = grid.shape();
        let expected: f64 = (0..range_bins)
            .flat_map(|i| (0..azimuth_bins).map(move |j| (i, j)))
            .map(|(i, j)| grid.weight(response, i, j))
            .sum();
        assert_relative_eq!(sums.xk, expected, max_relative = 1e-12);
        assert_relative_eq!(sums.es, 2.0 * expected, max_relative = 1e-12);
        assert_relative_eq!(sums.ambiguity[0], expected, max_relative = 1e-12);
        assert!(sums.x_land.abs() < f64::EPSILON);
        assert!(sums.range_width > 0.0 && sums.azimuth_width > 0.0);
    }
}
