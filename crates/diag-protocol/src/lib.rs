pub mod dtc;
pub mod snapshot;
pub mod telemetry;

mod hex;

pub use dtc::*;
pub use snapshot::*;
pub use telemetry::*;
