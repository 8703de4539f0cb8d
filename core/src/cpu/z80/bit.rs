use crate::core::bus::{MemoryBus, PortBus};
use crate::core::logger::InstructionLogger;
use crate::cpu::z80::{Flag, IndexMode, Z80};

impl<M: MemoryBus, P: PortBus, L: InstructionLogger> Z80<M, P, L> {
    /// Perform a CB rotate/shift operation on a value.
    /// op: 0=RLC, 1=RRC, 2=RL, 3=RR, 4=SLA, 5=SRA, 6=SLL(undoc), 7=SRL.
    /// Returns (result, new_flags). Flags: S, Z, PV(parity), C from shifted
    /// bit, H=0, N=0.
    fn do_cb_rotate_shift(&self, op: u8, val: u8) -> (u8, u8) {
        let (result, carry) = match op & 0x07 {
            0 => {
                // RLC: rotate left circular
                let c = (val >> 7) & 1;
                ((val << 1) | c, c)
            }
            1 => {
                // RRC: rotate right circular
                let c = val & 1;
                ((val >> 1) | (c << 7), c)
            }
            2 => {
                // RL: rotate left through carry
                let old_c = if (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
                let c = (val >> 7) & 1;
                ((val << 1) | old_c, c)
            }
            3 => {
                // RR: rotate right through carry
                let old_c = if (self.f & Flag::C as u8) != 0 { 0x80 } else { 0 };
                let c = val & 1;
                ((val >> 1) | old_c, c)
            }
            4 => {
                // SLA: shift left arithmetic
                let c = (val >> 7) & 1;
                (val << 1, c)
            }
            5 => {
                // SRA: shift right arithmetic (preserves sign)
                let c = val & 1;
                (((val as i8) >> 1) as u8, c)
            }
            6 => {
                // SLL: shift left logical, set bit 0 (undocumented)
                let c = (val >> 7) & 1;
                ((val << 1) | 1, c)
            }
            _ => {
                // SRL: shift right logical
                let c = val & 1;
                (val >> 1, c)
            }
        };

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
        if carry != 0 {
            f |= Flag::C as u8;
        }
        // H = 0, N = 0
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        (result, f)
    }

    /// BIT b flags: Z = ~bit, PV = Z, H=1, N=0, C preserved,
    /// S only when bit 7 is tested and set.
    fn bit_flags(&mut self, bit: u8, val: u8) {
        let tested = val & (1 << bit);
        let mut f = self.f & Flag::C as u8;
        f |= Flag::H as u8;
        if tested == 0 {
            f |= Flag::Z as u8;
            f |= Flag::PV as u8;
        }
        if bit == 7 && tested != 0 {
            f |= Flag::S as u8;
        }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    /// CB-prefixed instruction.
    /// Second byte splits [hi:2 | bit_or_fn:3 | reg:3]; hi selects
    /// rotate/shift, BIT, RES, SET. Register forms are 8 T; memory forms
    /// 15 T (12 T for BIT, which has no writeback).
    pub(crate) fn execute_cb(&mut self) -> u32 {
        let op = self.fetch_byte();
        let xx = (op >> 6) & 0x03;
        let yyy = (op >> 3) & 0x07; // bit number or shift operation
        let zzz = op & 0x07; // register index

        if zzz == 6 {
            let addr = self.get_hl();
            let val = self.mem.read(addr);
            match xx {
                0 => {
                    let (result, f) = self.do_cb_rotate_shift(yyy, val);
                    self.f = f;
                    self.mem.write(addr, result);
                    15
                }
                1 => {
                    self.bit_flags(yyy, val);
                    12
                }
                2 => {
                    self.mem.write(addr, val & !(1 << yyy)); // RES — no flags
                    15
                }
                _ => {
                    self.mem.write(addr, val | (1 << yyy)); // SET — no flags
                    15
                }
            }
        } else {
            let val = self.get_reg8(zzz);
            match xx {
                0 => {
                    let (result, f) = self.do_cb_rotate_shift(yyy, val);
                    self.f = f;
                    self.set_reg8(zzz, result);
                }
                1 => self.bit_flags(yyy, val),
                2 => self.set_reg8(zzz, val & !(1 << yyy)),
                _ => self.set_reg8(zzz, val | (1 << yyy)),
            }
            8
        }
    }

    /// DD CB d op / FD CB d op: bit operations on (IX+d)/(IY+d).
    ///
    /// The displacement byte comes before the sub-opcode. The memory
    /// location is always the operand; for non-BIT operations the result is
    /// written back and, when the low octal digit names a register, also
    /// copied into it (undocumented). BIT — 20 T, others — 23 T.
    pub(crate) fn execute_index_cb(&mut self) -> u32 {
        let d = self.fetch_byte() as i8;
        let op = self.fetch_byte();
        let base = match self.index_mode {
            IndexMode::IX => self.ix,
            _ => self.iy,
        };
        let addr = base.wrapping_add(d as i16 as u16);

        let xx = (op >> 6) & 0x03;
        let yyy = (op >> 3) & 0x07;
        let zzz = op & 0x07;

        let val = self.mem.read(addr);
        if xx == 1 {
            self.bit_flags(yyy, val);
            return 20;
        }

        let result = match xx {
            0 => {
                let (r, f) = self.do_cb_rotate_shift(yyy, val);
                self.f = f;
                r
            }
            2 => val & !(1 << yyy),
            _ => val | (1 << yyy),
        };
        self.mem.write(addr, result);
        if zzz != 6 {
            self.set_reg8(zzz, result);
        }
        23
    }
}
