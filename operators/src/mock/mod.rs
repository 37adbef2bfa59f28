mod mock_antenna;
mod mock_orbit;
mod mock_surface;
mod mock_wind;

pub use mock_antenna::*;
pub use mock_orbit::*;
pub use mock_surface::*;
pub use mock_wind::*;
