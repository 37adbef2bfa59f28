pub mod engine;
pub mod error;
pub mod footprint;
pub mod mock;
pub mod radar;
pub mod simulation;
pub mod util;
