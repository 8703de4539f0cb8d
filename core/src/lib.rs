pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::bus::{MemoryBus, PortBus};
    pub use crate::core::clock::{Clock, Pacer, WallClock};
    pub use crate::core::logger::{InstructionLogger, NullLogger};
    pub use crate::cpu::z80::Z80;
    pub use crate::device::{ports::LinePorts, ram::Ram64};
}
