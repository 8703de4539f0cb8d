use galena_core::core::bus::{MemoryBus, PortBus};
use serde::{Deserialize, Serialize};

// --- TracingBus: flat 64KB memory with per-access recording ---

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BusOp {
    Read,
    Write,
}

#[derive(Clone, Debug)]
pub struct BusCycle {
    pub addr: u16,
    pub data: u8,
    pub op: BusOp,
}

pub struct TracingBus {
    pub memory: Box<[u8; 0x10000]>,
    pub cycles: Vec<BusCycle>,
}

impl TracingBus {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            cycles: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    pub fn clear_cycles(&mut self) {
        self.cycles.clear();
    }
}

impl Default for TracingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for TracingBus {
    fn read(&mut self, addr: u16) -> u8 {
        let data = self.memory[addr as usize];
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Read,
        });
        data
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Write,
        });
    }
}

// --- TracingPorts: scripted port reads, recorded writes ---

pub struct TracingPorts {
    /// Values handed out for successive port reads (front first).
    /// Reads past the end return 0xFF, like an open bus.
    pub inputs: Vec<u8>,
    pub writes: Vec<(u16, u8)>,
    next_input: usize,
}

impl TracingPorts {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            writes: Vec::new(),
            next_input: 0,
        }
    }
}

impl Default for TracingPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl PortBus for TracingPorts {
    fn read_port(&mut self, _port: u16) -> u8 {
        let val = self.inputs.get(self.next_input).copied().unwrap_or(0xFF);
        self.next_input += 1;
        val
    }

    fn write_port(&mut self, port: u16, data: u8) {
        self.writes.push((port, data));
    }
}

// --- JSON test vector types (SingleStepTests z80 layout) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Z80TestCase {
    pub name: String,
    pub initial: Z80CpuState,
    #[serde(rename = "final")]
    pub final_state: Z80CpuState,
    pub cycles: Vec<(u16, u8, String)>,
    #[serde(default)]
    pub ports: Vec<(u16, u8, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Z80CpuState {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub f: u8,
    pub h: u8,
    pub l: u8,
    pub i: u8,
    pub r: u8,
    pub ei: u8,
    pub wz: u16,
    pub ix: u16,
    pub iy: u16,
    #[serde(rename = "af_")]
    pub af_prime: u16,
    #[serde(rename = "bc_")]
    pub bc_prime: u16,
    #[serde(rename = "de_")]
    pub de_prime: u16,
    #[serde(rename = "hl_")]
    pub hl_prime: u16,
    pub im: u8,
    pub p: u8,
    pub q: u8,
    pub iff1: u8,
    pub iff2: u8,
    pub ram: Vec<(u16, u8)>,
}
