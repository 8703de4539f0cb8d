pub mod ports;
pub mod ram;

pub use ports::LinePorts;
pub use ram::{Ram64, RomImageError};
