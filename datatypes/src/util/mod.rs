pub mod binary;
pub mod test;

use crate::error::Error;

/// Result of the table readers and geometry routines.
pub type Result<T, E = Error> = std::result::Result<T, E>;
