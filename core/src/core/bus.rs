/// Memory side of the bus: a byte-addressable 64KB image.
///
/// The CPU talks to memory exclusively through this trait. Implementations
/// may carve out a read-only region below a boundary; writes into that
/// region are silently ignored (the CPU has no way to observe the refusal).
pub trait MemoryBus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    /// Read a 16-bit little-endian word (low byte at `addr`).
    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        ((hi as u16) << 8) | lo as u16
    }

    /// Write a 16-bit little-endian word (low byte at `addr`).
    fn write_word(&mut self, addr: u16, data: u16) {
        self.write(addr, data as u8);
        self.write(addr.wrapping_add(1), (data >> 8) as u8);
    }
}

/// I/O port side of the bus, plus the interrupt lines.
///
/// Ports are addressed with the full 16-bit value the CPU places on the
/// address bus (B in the high byte for the `(C)` forms, A in the high byte
/// for `IN A,(n)` / `OUT (n),A`).
///
/// `nmi` and `mi` are sampled as levels at instruction boundaries only.
/// A device that wants edge semantics must drop the line once the CPU has
/// serviced the request. `data` is the byte the device drives onto the data
/// bus during interrupt acknowledge: an RST-style opcode for mode 0, the
/// vector-table low byte for mode 2.
pub trait PortBus {
    fn read_port(&mut self, port: u16) -> u8;
    fn write_port(&mut self, port: u16, data: u8);

    /// Non-maskable interrupt line level.
    fn nmi(&self) -> bool {
        false
    }

    /// Maskable interrupt line level.
    fn mi(&self) -> bool {
        false
    }

    /// Data bus byte at interrupt acknowledge.
    fn data(&self) -> u8 {
        0xFF
    }
}
