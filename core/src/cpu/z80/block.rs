use crate::core::bus::{MemoryBus, PortBus};
use crate::core::logger::InstructionLogger;
use crate::cpu::z80::{Flag, Z80};

/// ED block instructions. The repeating forms run one iteration per `step`
/// and rewind PC by 2 while their loop condition holds, so the same
/// two-byte opcode is fetched again next step and interrupts are
/// checkable between iterations.
impl<M: MemoryBus, P: PortBus, L: InstructionLogger> Z80<M, P, L> {
    // --- Block Transfer ---

    /// One (DE)<-(HL) transfer: HL and DE step by ±1, BC counts down.
    /// Flags: S, Z, C preserved; PV = BC != 0; H = N = 0;
    /// undocumented X/Y from (transferred byte + A).
    fn block_transfer(&mut self, dec: bool) {
        let hl = self.get_hl();
        let val = self.mem.read(hl);
        let de = self.get_de();
        self.mem.write(de, val);

        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(hl.wrapping_add(delta));
        self.set_de(de.wrapping_add(delta));
        let bc = self.get_bc().wrapping_sub(1);
        self.set_bc(bc);

        let n = val.wrapping_add(self.a);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::C as u8);
        if bc != 0 {
            f |= Flag::PV as u8;
        }
        if (n & 0x08) != 0 {
            f |= Flag::X as u8;
        }
        if (n & 0x02) != 0 {
            f |= Flag::Y as u8;
        }
        self.f = f;
    }

    /// LDI (0xA0) / LDD (0xA8) — 16 T.
    pub(crate) fn op_ldi_ldd(&mut self, dec: bool) -> u32 {
        self.block_transfer(dec);
        16
    }

    /// LDIR (0xB0) / LDDR (0xB8) — 21 T repeating / 16 T when done.
    pub(crate) fn op_ldir_lddr(&mut self, dec: bool) -> u32 {
        self.block_transfer(dec);
        if self.get_bc() != 0 {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    // --- Block Compare ---

    /// One A - (HL) compare: HL steps by ±1, BC counts down.
    /// Flags: C preserved; N set; S, Z, H from the compare;
    /// PV = BC != 0; undocumented X/Y from (result - H).
    fn block_compare(&mut self, dec: bool) {
        let hl = self.get_hl();
        let val = self.mem.read(hl);
        let result = self.a.wrapping_sub(val);
        let h = (self.a & 0x0F) < (val & 0x0F);

        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(hl.wrapping_add(delta));
        let bc = self.get_bc().wrapping_sub(1);
        self.set_bc(bc);

        let mut f = (self.f & Flag::C as u8) | Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if h {
            f |= Flag::H as u8;
        }
        if bc != 0 {
            f |= Flag::PV as u8;
        }
        let n = result.wrapping_sub(h as u8);
        if (n & 0x08) != 0 {
            f |= Flag::X as u8;
        }
        if (n & 0x02) != 0 {
            f |= Flag::Y as u8;
        }
        self.f = f;
    }

    /// CPI (0xA1) / CPD (0xA9) — 16 T.
    pub(crate) fn op_cpi_cpd(&mut self, dec: bool) -> u32 {
        self.block_compare(dec);
        16
    }

    /// CPIR (0xB1) / CPDR (0xB9) — 21 T repeating / 16 T when done.
    /// Repeats while BC != 0 and the byte did not match (Z clear).
    pub(crate) fn op_cpir_cpdr(&mut self, dec: bool) -> u32 {
        self.block_compare(dec);
        let z = (self.f & Flag::Z as u8) != 0;
        if self.get_bc() != 0 && !z {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    // --- Block I/O ---

    /// Flags shared by the block I/O family: C preserved; N set;
    /// Z when B reached zero; S and X/Y from the new B.
    fn block_io_flags(&mut self) {
        let b = self.b;
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8;
        if b == 0 {
            f |= Flag::Z as u8;
        }
        if (b & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        f |= b & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    /// One port-to-memory transfer: IN (BC) -> (HL), B--, HL±1.
    fn block_in(&mut self, dec: bool) {
        let port = self.get_bc();
        let val = self.ports.read_port(port);
        let hl = self.get_hl();
        self.mem.write(hl, val);

        self.b = self.b.wrapping_sub(1);
        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(hl.wrapping_add(delta));
        self.block_io_flags();
    }

    /// INI (0xA2) / IND (0xAA) — 16 T.
    pub(crate) fn op_ini_ind(&mut self, dec: bool) -> u32 {
        self.block_in(dec);
        16
    }

    /// INIR (0xB2) / INDR (0xBA) — 21 T repeating / 16 T when done.
    pub(crate) fn op_inir_indr(&mut self, dec: bool) -> u32 {
        self.block_in(dec);
        if self.b != 0 {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    /// One memory-to-port transfer: (HL) -> OUT (BC), B--, HL±1.
    /// B decrements before it appears on the port address.
    fn block_out(&mut self, dec: bool) {
        let hl = self.get_hl();
        let val = self.mem.read(hl);

        self.b = self.b.wrapping_sub(1);
        let port = self.get_bc();
        self.ports.write_port(port, val);

        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(hl.wrapping_add(delta));
        self.block_io_flags();
    }

    /// OUTI (0xA3) / OUTD (0xAB) — 16 T.
    pub(crate) fn op_outi_outd(&mut self, dec: bool) -> u32 {
        self.block_out(dec);
        16
    }

    /// OTIR (0xB3) / OTDR (0xBB) — 21 T repeating / 16 T when done.
    pub(crate) fn op_otir_otdr(&mut self, dec: bool) -> u32 {
        self.block_out(dec);
        if self.b != 0 {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }
}
