use crate::core::bus::{MemoryBus, PortBus};
use crate::core::logger::InstructionLogger;
use crate::cpu::z80::Z80;

impl<M: MemoryBus, P: PortBus, L: InstructionLogger> Z80<M, P, L> {
    /// PUSH rr — 11 T (PUSH IX — 15 T). High byte first.
    /// Opcode mask: 11 rr0 101 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=AF)
    pub(crate) fn op_push(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let val = self.get_rp_af(rp);
        self.push_word(val);
        if self.is_indexed() { 15 } else { 11 }
    }

    /// POP rr — 10 T (POP IX — 14 T).
    /// Opcode mask: 11 rr0 001
    pub(crate) fn op_pop(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let val = self.pop_word();
        self.set_rp_af(rp, val);
        if self.is_indexed() { 14 } else { 10 }
    }
}
