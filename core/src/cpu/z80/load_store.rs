use crate::core::bus::{MemoryBus, PortBus};
use crate::core::logger::InstructionLogger;
use crate::cpu::z80::{Flag, Z80};

impl<M: MemoryBus, P: PortBus, L: InstructionLogger> Z80<M, P, L> {
    /// LD r, n — 7 T; LD (HL), n — 10 T; LD (IX+d), n — 19 T.
    /// Opcode mask: 00 rrr 110
    pub(crate) fn op_ld_r_n(&mut self, opcode: u8) -> u32 {
        let r = (opcode >> 3) & 0x07;
        if r == 6 {
            // The displacement byte precedes the immediate in the DD/FD
            // encoding
            let addr = self.mem_operand_addr();
            let n = self.fetch_byte();
            self.mem.write(addr, n);
            if self.is_indexed() { 19 } else { 10 }
        } else {
            let n = self.fetch_byte();
            self.set_reg8(r, n);
            7
        }
    }

    /// LD r, r' — 4 T; LD r, (HL) / LD (HL), r — 7 T; indexed forms — 19 T.
    /// Opcode mask: 01 dst src (dst=src=6 is HALT, handled by the root table)
    pub(crate) fn op_ld_r_r(&mut self, opcode: u8) -> u32 {
        let src = opcode & 0x07;
        let dst = (opcode >> 3) & 0x07;

        if src == 6 {
            let addr = self.mem_operand_addr();
            let val = self.mem.read(addr);
            self.set_reg8(dst, val);
            if self.is_indexed() { 19 } else { 7 }
        } else if dst == 6 {
            let addr = self.mem_operand_addr();
            let val = self.get_reg8(src);
            self.mem.write(addr, val);
            if self.is_indexed() { 19 } else { 7 }
        } else {
            let val = self.get_reg8(src);
            self.set_reg8(dst, val);
            4
        }
    }

    /// LD rr, nn — 10 T (LD IX, nn — 14 T).
    /// Opcode mask: 00 rr0 001
    pub(crate) fn op_ld_rp_nn(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let val = self.fetch_word();
        self.set_rp(rp, val);
        if self.is_indexed() { 14 } else { 10 }
    }

    /// LD A, (BC) — 7 T.
    pub(crate) fn op_ld_a_bc(&mut self) -> u32 {
        let addr = self.get_bc();
        self.a = self.mem.read(addr);
        7
    }

    /// LD A, (DE) — 7 T.
    pub(crate) fn op_ld_a_de(&mut self) -> u32 {
        let addr = self.get_de();
        self.a = self.mem.read(addr);
        7
    }

    /// LD (BC), A — 7 T.
    pub(crate) fn op_ld_bc_a(&mut self) -> u32 {
        let addr = self.get_bc();
        let a = self.a;
        self.mem.write(addr, a);
        7
    }

    /// LD (DE), A — 7 T.
    pub(crate) fn op_ld_de_a(&mut self) -> u32 {
        let addr = self.get_de();
        let a = self.a;
        self.mem.write(addr, a);
        7
    }

    /// LD A, (nn) — 13 T.
    pub(crate) fn op_ld_a_nn(&mut self) -> u32 {
        let addr = self.fetch_word();
        self.a = self.mem.read(addr);
        13
    }

    /// LD (nn), A — 13 T.
    pub(crate) fn op_ld_nn_a(&mut self) -> u32 {
        let addr = self.fetch_word();
        let a = self.a;
        self.mem.write(addr, a);
        13
    }

    /// LD HL, (nn) — 16 T (LD IX, (nn) — 20 T).
    pub(crate) fn op_ld_hl_nn_ind(&mut self) -> u32 {
        let addr = self.fetch_word();
        let val = self.mem.read_word(addr);
        self.set_rp(2, val);
        if self.is_indexed() { 20 } else { 16 }
    }

    /// LD (nn), HL — 16 T (LD (nn), IX — 20 T).
    pub(crate) fn op_ld_nn_hl(&mut self) -> u32 {
        let addr = self.fetch_word();
        let val = self.get_rp(2);
        self.mem.write_word(addr, val);
        if self.is_indexed() { 20 } else { 16 }
    }

    /// LD SP, HL — 6 T (LD SP, IX — 10 T).
    pub(crate) fn op_ld_sp_hl(&mut self) -> u32 {
        self.sp = self.get_rp(2);
        if self.is_indexed() { 10 } else { 6 }
    }

    // --- Exchanges ---

    /// EX AF, AF' — 4 T.
    pub(crate) fn op_ex_af_af(&mut self) -> u32 {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
        4
    }

    /// EXX — 4 T.
    pub(crate) fn op_exx(&mut self) -> u32 {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
        4
    }

    /// EX DE, HL — 4 T. NOT affected by a DD/FD prefix.
    pub(crate) fn op_ex_de_hl(&mut self) -> u32 {
        std::mem::swap(&mut self.d, &mut self.h);
        std::mem::swap(&mut self.e, &mut self.l);
        4
    }

    /// EX (SP), HL — 19 T (EX (SP), IX — 23 T).
    pub(crate) fn op_ex_sp_hl(&mut self) -> u32 {
        let sp = self.sp;
        let from_stack = self.mem.read_word(sp);
        let from_reg = self.get_rp(2);
        self.mem.write_word(sp, from_reg);
        self.set_rp(2, from_stack);
        if self.is_indexed() { 23 } else { 19 }
    }

    // --- ED register transfers ---

    /// LD I, A — 9 T (ED prefix).
    pub(crate) fn op_ld_i_a(&mut self) -> u32 {
        self.i = self.a;
        9
    }

    /// LD R, A — 9 T (ED prefix).
    pub(crate) fn op_ld_r_a(&mut self) -> u32 {
        self.r = self.a;
        9
    }

    /// LD A, I — 9 T (ED prefix).
    /// Flags: S, Z from I, H=0, N=0, PV=IFF2, C preserved.
    pub(crate) fn op_ld_a_i(&mut self) -> u32 {
        self.a = self.i;
        self.ld_a_ir_flags();
        9
    }

    /// LD A, R — 9 T (ED prefix). Same flags as LD A, I.
    pub(crate) fn op_ld_a_r(&mut self) -> u32 {
        self.a = self.r;
        self.ld_a_ir_flags();
        9
    }

    fn ld_a_ir_flags(&mut self) {
        let a = self.a;
        let mut f = self.f & Flag::C as u8;
        if a == 0 {
            f |= Flag::Z as u8;
        }
        if (a & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if self.iff2 {
            f |= Flag::PV as u8;
        }
        f |= a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    /// LD (nn), rr — 20 T (ED prefix).
    pub(crate) fn op_ld_nn_rp_ed(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let addr = self.fetch_word();
        let val = self.get_rp(rp);
        self.mem.write_word(addr, val);
        20
    }

    /// LD rr, (nn) — 20 T (ED prefix).
    pub(crate) fn op_ld_rp_nn_ed(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let addr = self.fetch_word();
        let val = self.mem.read_word(addr);
        self.set_rp(rp, val);
        20
    }

    // --- Port I/O ---

    /// IN A, (n) — 11 T. A on the high address lines, no flag changes.
    pub(crate) fn op_in_a_n(&mut self) -> u32 {
        let n = self.fetch_byte();
        let port = ((self.a as u16) << 8) | n as u16;
        self.a = self.ports.read_port(port);
        11
    }

    /// OUT (n), A — 11 T.
    pub(crate) fn op_out_n_a(&mut self) -> u32 {
        let n = self.fetch_byte();
        let port = ((self.a as u16) << 8) | n as u16;
        let a = self.a;
        self.ports.write_port(port, a);
        11
    }

    /// IN r, (C) — 12 T (ED prefix). B on the high address lines.
    /// Flags: S, Z, PV(parity) from the input, H=0, N=0, C preserved.
    /// r=6 is the flags-only form: value tested but not stored.
    pub(crate) fn op_in_r_c(&mut self, opcode: u8) -> u32 {
        let port = self.get_bc();
        let val = self.ports.read_port(port);
        let r = (opcode >> 3) & 0x07;
        if r != 6 {
            self.set_reg8(r, val);
        }
        let mut f = self.f & Flag::C as u8;
        if val == 0 {
            f |= Flag::Z as u8;
        }
        if (val & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(val) {
            f |= Flag::PV as u8;
        }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        12
    }

    /// OUT (C), r — 12 T (ED prefix). No flag changes.
    /// r=6 outputs 0 (undocumented pairing of the flags-only IN).
    pub(crate) fn op_out_c_r(&mut self, opcode: u8) -> u32 {
        let port = self.get_bc();
        let r = (opcode >> 3) & 0x07;
        let val = if r == 6 { 0 } else { self.get_reg8(r) };
        self.ports.write_port(port, val);
        12
    }
}
