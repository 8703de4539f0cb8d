use crate::core::bus::{MemoryBus, PortBus};
use crate::core::logger::InstructionLogger;
use crate::cpu::z80::{Flag, Z80};

impl<M: MemoryBus, P: PortBus, L: InstructionLogger> Z80<M, P, L> {
    // --- Flag Helpers ---

    pub(crate) fn get_parity(val: u8) -> bool {
        val.count_ones() % 2 == 0
    }

    fn update_flags_logic(&mut self, result: u8, is_and: bool) {
        let mut f = 0;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(result) {
            f |= Flag::PV as u8;
        }
        if is_and {
            f |= Flag::H as u8; // AND sets H, others clear it
        }
        // N is 0, C is 0

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    pub(crate) fn do_add(&mut self, val: u8, with_carry: bool) {
        let a = self.a;
        let c_in = if with_carry && (self.f & Flag::C as u8) != 0 {
            1u8
        } else {
            0
        };
        let sum = a as u16 + val as u16 + c_in as u16;
        let result = sum as u8;

        let mut f = 0;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        // H: carry out of bit 3, computed on the masked nibbles
        if ((a & 0x0F) + (val & 0x0F) + c_in) > 0x0F {
            f |= Flag::H as u8;
        }
        // P/V: signed overflow = (op1 ^ res) & (op2 ^ res) & 0x80
        if ((a ^ result) & (val ^ result) & 0x80) != 0 {
            f |= Flag::PV as u8;
        }
        if sum > 0xFF {
            f |= Flag::C as u8;
        }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.f = f;
    }

    pub(crate) fn do_sub(&mut self, val: u8, with_carry: bool) {
        let a = self.a;
        let c_in = if with_carry && (self.f & Flag::C as u8) != 0 {
            1u8
        } else {
            0
        };
        let result = a.wrapping_sub(val).wrapping_sub(c_in);

        let mut f = Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        // H: borrow into bit 4
        if (a & 0x0F) < (val & 0x0F) + c_in {
            f |= Flag::H as u8;
        }
        // P/V: signed overflow = (op1 ^ op2) & (op1 ^ res) & 0x80
        if ((a ^ val) & (a ^ result) & 0x80) != 0 {
            f |= Flag::PV as u8;
        }
        // C: a borrow occurred from bit 7
        if (a as u16) < val as u16 + c_in as u16 {
            f |= Flag::C as u8;
        }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.f = f;
    }

    pub(crate) fn do_cp(&mut self, val: u8) {
        let a = self.a;
        let result = a.wrapping_sub(val);

        let mut f = Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if (a & 0x0F) < (val & 0x0F) {
            f |= Flag::H as u8;
        }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 {
            f |= Flag::PV as u8;
        }
        if (a as u16) < val as u16 {
            f |= Flag::C as u8;
        }

        // X/Y come from the operand for CP, not the result
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    pub(crate) fn alu_op(&mut self, op: u8, val: u8) {
        match op & 0x07 {
            0 => self.do_add(val, false), // ADD
            1 => self.do_add(val, true),  // ADC
            2 => self.do_sub(val, false), // SUB
            3 => self.do_sub(val, true),  // SBC
            4 => {
                self.a &= val;
                let a = self.a;
                self.update_flags_logic(a, true); // AND
            }
            5 => {
                self.a ^= val;
                let a = self.a;
                self.update_flags_logic(a, false); // XOR
            }
            6 => {
                self.a |= val;
                let a = self.a;
                self.update_flags_logic(a, false); // OR
            }
            _ => self.do_cp(val), // CP
        }
    }

    // --- Instructions ---

    /// ALU A, r — 4 T; ALU A, (HL) — 7 T; ALU A, (IX+d) — 19 T.
    /// Opcode mask: 10 xxx zzz
    pub(crate) fn op_alu_r(&mut self, opcode: u8) -> u32 {
        let alu_op = (opcode >> 3) & 0x07;
        let r = opcode & 0x07;

        if r == 6 {
            let addr = self.mem_operand_addr();
            let val = self.mem.read(addr);
            self.alu_op(alu_op, val);
            if self.is_indexed() { 19 } else { 7 }
        } else {
            let val = self.get_reg8(r);
            self.alu_op(alu_op, val);
            4
        }
    }

    /// ALU A, n — 7 T.
    /// Opcode mask: 11 xxx 110
    pub(crate) fn op_alu_n(&mut self, opcode: u8) -> u32 {
        let alu_op = (opcode >> 3) & 0x07;
        let val = self.fetch_byte();
        self.alu_op(alu_op, val);
        7
    }

    /// INC r — 4 T; INC (HL) — 11 T; INC (IX+d) — 23 T.
    pub(crate) fn op_inc_r(&mut self, opcode: u8) -> u32 {
        let r = (opcode >> 3) & 0x07;
        if r == 6 {
            let addr = self.mem_operand_addr();
            let val = self.mem.read(addr);
            let result = self.inc8(val);
            self.mem.write(addr, result);
            if self.is_indexed() { 23 } else { 11 }
        } else {
            let val = self.get_reg8(r);
            let result = self.inc8(val);
            self.set_reg8(r, result);
            4
        }
    }

    /// DEC r — 4 T; DEC (HL) — 11 T; DEC (IX+d) — 23 T.
    pub(crate) fn op_dec_r(&mut self, opcode: u8) -> u32 {
        let r = (opcode >> 3) & 0x07;
        if r == 6 {
            let addr = self.mem_operand_addr();
            let val = self.mem.read(addr);
            let result = self.dec8(val);
            self.mem.write(addr, result);
            if self.is_indexed() { 23 } else { 11 }
        } else {
            let val = self.get_reg8(r);
            let result = self.dec8(val);
            self.set_reg8(r, result);
            4
        }
    }

    pub(crate) fn inc8(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = self.f & Flag::C as u8; // Preserve C
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if (val & 0x0F) == 0x0F {
            f |= Flag::H as u8;
        }
        if val == 0x7F {
            f |= Flag::PV as u8; // Overflow 7F -> 80
        }
        // N is 0
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        result
    }

    pub(crate) fn dec8(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8; // Preserve C, set N
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if (val & 0x0F) == 0x00 {
            f |= Flag::H as u8; // Borrow from bit 4
        }
        if val == 0x80 {
            f |= Flag::PV as u8; // Overflow 80 -> 7F
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        result
    }

    // --- 16-bit arithmetic ---

    /// ADD HL,rr — 11 T (ADD IX,rr — 15 T).
    /// H from bit 11, C from bit 15, N cleared; S/Z/PV untouched.
    pub(crate) fn op_add_hl_rp(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let lhs = self.get_rp(2);
        let rhs = self.get_rp(rp);
        let result = lhs.wrapping_add(rhs);

        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if ((lhs & 0x0FFF) + (rhs & 0x0FFF)) > 0x0FFF {
            f |= Flag::H as u8;
        }
        if (lhs as u32 + rhs as u32) > 0xFFFF {
            f |= Flag::C as u8;
        }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;

        self.set_rp(2, result);
        if self.is_indexed() { 15 } else { 11 }
    }

    /// ADC HL,rr — 15 T (ED prefix). All six flags from the 16-bit result.
    pub(crate) fn op_adc_hl_rp(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let lhs = self.get_hl();
        let rhs = self.get_rp(rp);
        let c_in = (self.f & Flag::C as u8 != 0) as u16;
        let sum = lhs as u32 + rhs as u32 + c_in as u32;
        let result = sum as u16;

        let mut f = 0;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x8000) != 0 {
            f |= Flag::S as u8;
        }
        if ((lhs & 0x0FFF) + (rhs & 0x0FFF) + c_in) > 0x0FFF {
            f |= Flag::H as u8;
        }
        if (!(lhs ^ rhs) & (lhs ^ result) & 0x8000) != 0 {
            f |= Flag::PV as u8;
        }
        if sum > 0xFFFF {
            f |= Flag::C as u8;
        }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;

        self.set_hl(result);
        15
    }

    /// SBC HL,rr — 15 T (ED prefix). All six flags from the 16-bit result.
    pub(crate) fn op_sbc_hl_rp(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let lhs = self.get_hl();
        let rhs = self.get_rp(rp);
        let c_in = (self.f & Flag::C as u8 != 0) as u16;
        let result = lhs.wrapping_sub(rhs).wrapping_sub(c_in);

        let mut f = Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x8000) != 0 {
            f |= Flag::S as u8;
        }
        if (lhs & 0x0FFF) < (rhs & 0x0FFF) + c_in {
            f |= Flag::H as u8;
        }
        if ((lhs ^ rhs) & (lhs ^ result) & 0x8000) != 0 {
            f |= Flag::PV as u8;
        }
        if (lhs as u32) < rhs as u32 + c_in as u32 {
            f |= Flag::C as u8;
        }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;

        self.set_hl(result);
        15
    }

    /// INC rr — 6 T (INC IX — 10 T). No flags.
    pub(crate) fn op_inc_rp(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let val = self.get_rp(rp).wrapping_add(1);
        self.set_rp(rp, val);
        if self.is_indexed() { 10 } else { 6 }
    }

    /// DEC rr — 6 T (DEC IX — 10 T). No flags.
    pub(crate) fn op_dec_rp(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let val = self.get_rp(rp).wrapping_sub(1);
        self.set_rp(rp, val);
        if self.is_indexed() { 10 } else { 6 }
    }

    // --- Accumulator / flag housekeeping ---

    /// DAA — 4 T. BCD correction after an add or subtract.
    ///
    /// The adjustment constant is built from H/C and the nibble values;
    /// prior N selects whether it is added or subtracted. H afterwards
    /// reflects the bit-4 change, C latches once a 0x60 correction fires.
    pub(crate) fn op_daa(&mut self) -> u32 {
        let a = self.a;
        let n = (self.f & Flag::N as u8) != 0;
        let h = (self.f & Flag::H as u8) != 0;
        let c = (self.f & Flag::C as u8) != 0;

        let mut adjust = 0u8;
        let mut carry = c;
        if h || (a & 0x0F) > 0x09 {
            adjust |= 0x06;
        }
        if c || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }

        let result = if n {
            a.wrapping_sub(adjust)
        } else {
            a.wrapping_add(adjust)
        };

        let mut f = self.f & Flag::N as u8; // N preserved
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(result) {
            f |= Flag::PV as u8;
        }
        if ((a ^ result) & 0x10) != 0 {
            f |= Flag::H as u8;
        }
        if carry {
            f |= Flag::C as u8;
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.f = f;
        4
    }

    /// CPL — 4 T. A = ~A; sets H and N, rest untouched.
    pub(crate) fn op_cpl(&mut self) -> u32 {
        self.a = !self.a;
        let mut f = self.f
            & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8 | Flag::C as u8);
        f |= Flag::H as u8 | Flag::N as u8;
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        4
    }

    /// NEG — 8 T (ED prefix). A = 0 - A with full subtract flags.
    pub(crate) fn op_neg(&mut self) -> u32 {
        let val = self.a;
        self.a = 0;
        self.do_sub(val, false);
        8
    }

    /// SCF — 4 T. Set carry; H and N cleared, S/Z/PV untouched.
    pub(crate) fn op_scf(&mut self) -> u32 {
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        f |= Flag::C as u8;
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        4
    }

    /// CCF — 4 T. Invert carry; old carry lands in H, N cleared.
    pub(crate) fn op_ccf(&mut self) -> u32 {
        let old_c = (self.f & Flag::C as u8) != 0;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if old_c {
            f |= Flag::H as u8;
        } else {
            f |= Flag::C as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        4
    }

    // --- Rotates on A (fast forms: S/Z/PV untouched) ---

    /// RLCA — 4 T.
    pub(crate) fn op_rlca(&mut self) -> u32 {
        let c = (self.a >> 7) & 1;
        self.a = (self.a << 1) | c;
        self.rot_a_flags(c);
        4
    }

    /// RRCA — 4 T.
    pub(crate) fn op_rrca(&mut self) -> u32 {
        let c = self.a & 1;
        self.a = (self.a >> 1) | (c << 7);
        self.rot_a_flags(c);
        4
    }

    /// RLA — 4 T (through carry).
    pub(crate) fn op_rla(&mut self) -> u32 {
        let old_c = if (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
        let c = (self.a >> 7) & 1;
        self.a = (self.a << 1) | old_c;
        self.rot_a_flags(c);
        4
    }

    /// RRA — 4 T (through carry).
    pub(crate) fn op_rra(&mut self) -> u32 {
        let old_c = if (self.f & Flag::C as u8) != 0 { 0x80 } else { 0 };
        let c = self.a & 1;
        self.a = (self.a >> 1) | old_c;
        self.rot_a_flags(c);
        4
    }

    fn rot_a_flags(&mut self, carry_out: u8) {
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry_out != 0 {
            f |= Flag::C as u8;
        }
        // H = 0, N = 0
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    // --- Nibble rotates through (HL) ---

    /// RLD — 18 T (ED prefix). (HL) high nibble <- (HL) low, (HL) low <- A
    /// low, A low <- old (HL) high. S/Z/PV from A, H=0, N=0, C preserved.
    pub(crate) fn op_rld(&mut self) -> u32 {
        let addr = self.get_hl();
        let t = self.mem.read(addr);
        let mem = (t << 4) | (self.a & 0x0F);
        self.mem.write(addr, mem);
        self.a = (self.a & 0xF0) | (t >> 4);
        self.rld_rrd_flags();
        18
    }

    /// RRD — 18 T (ED prefix). Inverse nibble rotation of RLD.
    pub(crate) fn op_rrd(&mut self) -> u32 {
        let addr = self.get_hl();
        let t = self.mem.read(addr);
        let mem = ((self.a & 0x0F) << 4) | (t >> 4);
        self.mem.write(addr, mem);
        self.a = (self.a & 0xF0) | (t & 0x0F);
        self.rld_rrd_flags();
        18
    }

    fn rld_rrd_flags(&mut self) {
        let a = self.a;
        let mut f = self.f & Flag::C as u8;
        if a == 0 {
            f |= Flag::Z as u8;
        }
        if (a & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(a) {
            f |= Flag::PV as u8;
        }
        f |= a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }
}
