use snafu::Snafu;
use std::path::PathBuf;

use crate::primitives::MeasType;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("Could not access table file {}: {}", path.display(), source))]
    TableIo {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("Table file {} ended after {} values", path.display(), values_read))]
    UnexpectedEndOfTable {
        path: PathBuf,
        values_read: usize,
    },

    #[snafu(display("Malformed {} table: {}", table, reason))]
    MalformedTable {
        table: &'static str,
        reason: String,
    },

    #[snafu(display(
        "{} table sanity check failed at orbit bin {}, azimuth bin {}",
        table,
        orbit_bin,
        azimuth_bin
    ))]
    TableSanityCheck {
        table: &'static str,
        orbit_bin: usize,
        azimuth_bin: usize,
    },

    #[snafu(display(
        "X table with {} coefficient rows per beam has no known polynomial order (expected 130 or 156)",
        rows
    ))]
    UnsupportedXTableOrder {
        rows: usize,
    },

    #[snafu(display(
        "{:?} is not a valid index in the bounds {:?}, {:?} ",
        index,
        min_index,
        max_index,
    ))]
    GridIndexOutOfBounds {
        index: Vec<isize>,
        min_index: Vec<isize>,
        max_index: Vec<isize>,
    },

    #[snafu(display(
        "Dimension capacity  ≠ data capacity ({} ≠ {})",
        dimension_cap,
        data_cap
    ))]
    DimensionCapacityDoesNotMatchDataCapacity {
        dimension_cap: usize,
        data_cap: usize,
    },

    #[snafu(display("Table shapes do not match: {:?} vs. {:?}", expected, found))]
    TableShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[snafu(display("{} value {} is outside of the {} table domain", axis, value, table))]
    TableIndexOutOfRange {
        table: &'static str,
        axis: &'static str,
        value: f64,
    },

    #[snafu(display("Beam {} does not exist, the table holds {} beams", beam, beams))]
    InvalidBeam {
        beam: usize,
        beams: usize,
    },

    #[snafu(display("Slice {} does not exist, the table holds {} slices", slice, slices))]
    InvalidSlice {
        slice: i32,
        slices: usize,
    },

    #[snafu(display("No Kpm value is defined for measurement type {}", meas_type))]
    UnsupportedMeasType {
        meas_type: MeasType,
    },

    #[snafu(display("The look vector does not intersect the earth ellipsoid"))]
    NoEarthIntersection,

    #[snafu(display("Degenerate coordinate frame: {}", reason))]
    DegenerateFrame {
        reason: &'static str,
    },

    #[snafu(display("Calibration factor X must be positive before inversion, got {}", xk))]
    NonPositiveXFactor {
        xk: f64,
    },
}
