#![allow(dead_code)]

use galena_core::core::bus::{MemoryBus, PortBus};
use galena_core::cpu::z80::Z80;

/// Minimal memory for testing: flat 64KB read/write, no protection.
pub struct TestBus {
    pub memory: [u8; 0x10000],
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl MemoryBus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
    }
}

/// Scriptable port device: every read returns `read_value`, writes are
/// recorded, and the interrupt lines are plain fields the test flips.
pub struct TestPorts {
    pub read_value: u8,
    pub writes: Vec<(u16, u8)>,
    pub nmi: bool,
    pub irq: bool,
    pub data: u8,
}

impl TestPorts {
    pub fn new() -> Self {
        Self {
            read_value: 0xFF,
            writes: Vec::new(),
            nmi: false,
            irq: false,
            data: 0xFF,
        }
    }
}

impl PortBus for TestPorts {
    fn read_port(&mut self, _port: u16) -> u8 {
        self.read_value
    }

    fn write_port(&mut self, port: u16, data: u8) {
        self.writes.push((port, data));
    }

    fn nmi(&self) -> bool {
        self.nmi
    }

    fn mi(&self) -> bool {
        self.irq
    }

    fn data(&self) -> u8 {
        self.data
    }
}

pub type TestCpu = Z80<TestBus, TestPorts>;

pub fn make_cpu() -> TestCpu {
    Z80::new(TestBus::new(), TestPorts::new())
}

/// Load a program at address 0 on a fresh CPU.
pub fn cpu_with_program(program: &[u8]) -> TestCpu {
    let mut cpu = make_cpu();
    cpu.mem.load(0, program);
    cpu
}
