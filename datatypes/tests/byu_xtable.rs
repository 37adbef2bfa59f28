use float_cmp::approx_eq;
use scatsim_datatypes::error::Error;
use scatsim_datatypes::tables::{ByuXTable, OrbitAzimuthGrid, PolynomialOrder};
use scatsim_datatypes::test_data;
use std::f64::consts::TAU;

/// Two orbit bins of 3100 s and four azimuth bins, matching the fixtures.
fn grid() -> OrbitAzimuthGrid {
    OrbitAzimuthGrid::new(2, 4, 3100.0, 6100.0).unwrap()
}

#[test]
fn zero_third_order_table_is_neutral() {
    let table = ByuXTable::read_ascii(
        grid(),
        &[
            test_data!("byu_xtable/third_order_beam0.dat"),
            test_data!("byu_xtable/third_order_beam1.dat"),
        ],
    )
    .unwrap();

    assert_eq!(table.order(), PolynomialOrder::Third);
    assert_eq!(table.num_beams(), 2);
    for beam in 0..2 {
        let x = table
            .get_x(beam, 36_f64.to_radians(), 0.3, 12, 250.0)
            .unwrap();
        assert!(approx_eq!(f64, x, 1.0));
    }
}

#[test]
fn fifth_order_table_interpolates_across_the_azimuth_seam() {
    let table =
        ByuXTable::read_ascii(grid(), &[test_data!("byu_xtable/fifth_order_beam0.dat")]).unwrap();
    assert_eq!(table.order(), PolynomialOrder::Fifth);

    // halfway between the last azimuth bin (3 dB) and the first one (0 dB)
    let azimuth = 3.5 * TAU / 4.0;
    let x = table.get_x(0, azimuth, 0.0, 5, 0.0).unwrap();
    assert!(approx_eq!(f64, x, 10_f64.powf(0.15), epsilon = 1e-12));

    // both orbit bins hold the same values, including the closing segment
    let late = table.get_x(0, azimuth, 0.75, 5, 0.0).unwrap();
    assert!(approx_eq!(f64, late, x, epsilon = 1e-12));

    for k in [-2.0, -1.0, 1.0, 3.0] {
        let shifted = table.get_x(0, azimuth + k * TAU, 0.0, 5, 0.0).unwrap();
        assert!(approx_eq!(f64, shifted, x, epsilon = 1e-9));
    }
}

#[test]
fn fifth_order_lookup_at_slice_zero() {
    let table =
        ByuXTable::read_ascii(grid(), &[test_data!("byu_xtable/fifth_order_beam0.dat")]).unwrap();

    // azimuth bins sit at 0, 90, 180 and 270 degrees holding 0, 1, 2 and 3 dB
    let on_bin = table.get_x(0, 90_f64.to_radians(), 0.0, 0, 0.0).unwrap();
    assert!(approx_eq!(f64, on_bin, 10_f64.powf(0.1 * 1.0), epsilon = 1e-12));

    // 36 degrees is 0.4 of the way from the 0 dB bin to the 1 dB bin
    let x = table.get_x(0, 36_f64.to_radians(), 0.0, 0, 0.0).unwrap();
    assert!(approx_eq!(f64, x, 10_f64.powf(0.1 * 0.4), epsilon = 1e-12));
    assert!(approx_eq!(f64, x, 1.096_478_196_143_185, epsilon = 1e-12));
}

#[test]
fn malformed_tables_are_rejected() {
    let truncated =
        ByuXTable::read_ascii(grid(), &[test_data!("byu_xtable/truncated_beam0.dat")]);
    assert!(matches!(
        truncated,
        Err(Error::UnsupportedXTableOrder { rows: 100 })
    ));

    let mixed = ByuXTable::read_ascii(
        grid(),
        &[
            test_data!("byu_xtable/third_order_beam0.dat"),
            test_data!("byu_xtable/fifth_order_beam0.dat"),
        ],
    );
    assert!(matches!(mixed, Err(Error::MalformedTable { .. })));

    let table =
        ByuXTable::read_ascii(grid(), &[test_data!("byu_xtable/fifth_order_beam0.dat")]).unwrap();
    assert!(matches!(
        table.get_x(0, 0.0, 0.0, 26, 0.0),
        Err(Error::InvalidSlice { .. })
    ));
    assert!(matches!(
        table.get_x(1, 0.0, 0.0, 0, 0.0),
        Err(Error::InvalidBeam { .. })
    ));
}
