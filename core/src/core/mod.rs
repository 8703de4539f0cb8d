pub mod bus;
pub mod clock;
pub mod logger;

pub use bus::{MemoryBus, PortBus};
pub use clock::{Clock, Pacer, WallClock};
pub use logger::{InstructionLogger, NullLogger};
