//! Read-only calibration tables. All tables are loaded once and shared by reference.

mod ambig;
mod byu_xtable;
mod fbb;
mod kpm;
mod orbit_azimuth;
mod ptr;
mod table;
mod topo;
mod xtable;

pub use ambig::{AmbigTable, AmbigTableLayout, AmbiguityLookup, NO_AMBIGUITY_RATIO};
pub use byu_xtable::{BYU_SLICES, ByuXTable, GroundSystemLayout, PolynomialOrder};
pub use fbb::FbbTable;
pub use kpm::{CROSS_POL_KPM, KpmTable, SpeedIndex};
pub use orbit_azimuth::{BinWeights, OrbitAzimuthGrid};
pub use ptr::{PtrAuxRecord, PtrBeamTable, PtrTable, PtrWidths};
pub use table::Table;
pub use topo::{Stable, Topo, topo_delta_f};
pub use xtable::{XTable, XTableHeader, abs_to_rel_slice, rel_to_abs_slice};
