use crate::core::bus::{MemoryBus, PortBus};
use crate::core::logger::InstructionLogger;
use crate::cpu::z80::{Flag, Z80};

impl<M: MemoryBus, P: PortBus, L: InstructionLogger> Z80<M, P, L> {
    /// Evaluate a condition code (3 bits from opcode bits 5-3).
    /// 0=NZ, 1=Z, 2=NC, 3=C, 4=PO, 5=PE, 6=P, 7=M
    pub(crate) fn eval_condition(&self, cc: u8) -> bool {
        match cc & 0x07 {
            0 => (self.f & Flag::Z as u8) == 0,  // NZ
            1 => (self.f & Flag::Z as u8) != 0,  // Z
            2 => (self.f & Flag::C as u8) == 0,  // NC
            3 => (self.f & Flag::C as u8) != 0,  // C
            4 => (self.f & Flag::PV as u8) == 0, // PO (parity odd)
            5 => (self.f & Flag::PV as u8) != 0, // PE (parity even)
            6 => (self.f & Flag::S as u8) == 0,  // P (positive)
            _ => (self.f & Flag::S as u8) != 0,  // M (minus)
        }
    }

    /// JP nn — 10 T.
    pub(crate) fn op_jp_nn(&mut self) -> u32 {
        self.pc = self.fetch_word();
        10
    }

    /// JP cc, nn — 10 T whether taken or not.
    pub(crate) fn op_jp_cc_nn(&mut self, opcode: u8) -> u32 {
        let cc = (opcode >> 3) & 0x07;
        let addr = self.fetch_word();
        if self.eval_condition(cc) {
            self.pc = addr;
        }
        10
    }

    /// JR e — 12 T.
    pub(crate) fn op_jr(&mut self) -> u32 {
        let disp = self.fetch_byte() as i8;
        self.pc = self.pc.wrapping_add(disp as i16 as u16);
        12
    }

    /// JR cc, e — 12 T taken / 7 T not taken.
    pub(crate) fn op_jr_cc(&mut self, opcode: u8) -> u32 {
        let cc = (opcode >> 3) & 0x03; // Only NZ/Z/NC/C for JR cc
        let disp = self.fetch_byte() as i8;
        if self.eval_condition(cc) {
            self.pc = self.pc.wrapping_add(disp as i16 as u16);
            12
        } else {
            7
        }
    }

    /// JP (HL) — 4 T (JP (IX) — 8 T). Really "JP HL": load PC from the pair.
    pub(crate) fn op_jp_hl(&mut self) -> u32 {
        self.pc = self.get_rp(2);
        if self.is_indexed() { 8 } else { 4 }
    }

    /// DJNZ e — 13 T taken / 8 T not taken.
    pub(crate) fn op_djnz(&mut self) -> u32 {
        self.b = self.b.wrapping_sub(1);
        let disp = self.fetch_byte() as i8;
        if self.b != 0 {
            self.pc = self.pc.wrapping_add(disp as i16 as u16);
            13
        } else {
            8
        }
    }

    /// CALL nn — 17 T.
    pub(crate) fn op_call_nn(&mut self) -> u32 {
        let addr = self.fetch_word();
        let ret = self.pc;
        self.push_word(ret);
        self.pc = addr;
        17
    }

    /// CALL cc, nn — 17 T taken / 10 T not taken. The address bytes are
    /// consumed either way.
    pub(crate) fn op_call_cc_nn(&mut self, opcode: u8) -> u32 {
        let cc = (opcode >> 3) & 0x07;
        let addr = self.fetch_word();
        if self.eval_condition(cc) {
            let ret = self.pc;
            self.push_word(ret);
            self.pc = addr;
            17
        } else {
            10
        }
    }

    /// RET — 10 T.
    pub(crate) fn op_ret(&mut self) -> u32 {
        self.pc = self.pop_word();
        10
    }

    /// RET cc — 11 T taken / 5 T not taken.
    pub(crate) fn op_ret_cc(&mut self, opcode: u8) -> u32 {
        let cc = (opcode >> 3) & 0x07;
        if self.eval_condition(cc) {
            self.pc = self.pop_word();
            11
        } else {
            5
        }
    }

    /// RST p — 11 T. Target address = opcode & 0x38.
    pub(crate) fn op_rst(&mut self, opcode: u8) -> u32 {
        let ret = self.pc;
        self.push_word(ret);
        self.pc = (opcode & 0x38) as u16;
        11
    }

    /// DI — 4 T.
    pub(crate) fn op_di(&mut self) -> u32 {
        self.iff1 = false;
        self.iff2 = false;
        4
    }

    /// EI — 4 T. Enables interrupts with a one-instruction delay so the
    /// instruction after EI always runs before an interrupt is accepted.
    pub(crate) fn op_ei(&mut self) -> u32 {
        self.iff1 = true;
        self.iff2 = true;
        self.ei_delay = true;
        4
    }

    /// RETN / RETI — 14 T (ED prefix): pop PC, restore IFF1 from IFF2.
    /// The two differ only on the bus, which external peripherals observe.
    pub(crate) fn op_retn(&mut self) -> u32 {
        self.iff1 = self.iff2;
        self.pc = self.pop_word();
        14
    }

    /// IM 0/1/2 — 8 T (ED prefix).
    pub(crate) fn op_im(&mut self, mode: u8) -> u32 {
        self.im = mode;
        8
    }
}
