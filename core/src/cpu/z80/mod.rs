mod alu;
mod bit;
mod block;
mod branch;
mod load_store;
mod stack;

use crate::core::bus::{MemoryBus, PortBus};
use crate::core::clock::Pacer;
use crate::core::logger::{InstructionLogger, NullLogger, disasm};
use crate::cpu::state::{CpuStateTrait, Z80State};

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Unused (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Unused (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndexMode {
    HL,
    IX,
    IY,
}

/// Z80 interpreter core.
///
/// Owns its collaborators: a memory image behind [`MemoryBus`], an I/O port
/// device behind [`PortBus`] (which also carries the NMI/INT lines), and an
/// optional diagnostic logger. Each call to [`Z80::step`] services pending
/// interrupts and then executes exactly one instruction, crediting its
/// T-state cost to the refresh register and the pacer.
pub struct Z80<M, P, L = NullLogger> {
    // Registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow Registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & Special Registers
    pub ix: u16,
    pub iy: u16,
    pub i: u8,
    pub r: u8,
    pub sp: u16,
    pub pc: u16,

    // Internal state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub halted: bool,
    pub ei_delay: bool,

    // Prefix handling
    pub(crate) index_mode: IndexMode,

    // Collaborators
    pub mem: M,
    pub ports: P,
    pub pacer: Pacer,
    pub logger: L,
}

impl<M: MemoryBus, P: PortBus> Z80<M, P, NullLogger> {
    pub fn new(mem: M, ports: P) -> Self {
        Self::with_logger(mem, ports, NullLogger)
    }
}

impl<M: MemoryBus, P: PortBus, L: InstructionLogger> Z80<M, P, L> {
    pub fn with_logger(mem: M, ports: P, logger: L) -> Self {
        let mut cpu = Self {
            a: 0,
            f: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            a_prime: 0,
            f_prime: 0,
            b_prime: 0,
            c_prime: 0,
            d_prime: 0,
            e_prime: 0,
            h_prime: 0,
            l_prime: 0,
            ix: 0,
            iy: 0,
            i: 0,
            r: 0,
            sp: 0,
            pc: 0,
            iff1: false,
            iff2: false,
            im: 0,
            halted: false,
            ei_delay: false,
            index_mode: IndexMode::HL,
            mem,
            ports,
            pacer: Pacer::new(),
            logger,
        };
        cpu.reset();
        cpu
    }

    /// Power-on / RESET state: A=F=0xFF, SP=0xFFFF, PC=0, interrupts off,
    /// everything else zero.
    pub fn reset(&mut self) {
        self.a = 0xFF;
        self.f = 0xFF;
        self.b = 0;
        self.c = 0;
        self.d = 0;
        self.e = 0;
        self.h = 0;
        self.l = 0;
        self.a_prime = 0;
        self.f_prime = 0;
        self.b_prime = 0;
        self.c_prime = 0;
        self.d_prime = 0;
        self.e_prime = 0;
        self.h_prime = 0;
        self.l_prime = 0;
        self.ix = 0;
        self.iy = 0;
        self.i = 0;
        self.r = 0;
        self.sp = 0xFFFF;
        self.pc = 0x0000;
        self.iff1 = false;
        self.iff2 = false;
        self.im = 0;
        self.halted = false;
        self.ei_delay = false;
        self.index_mode = IndexMode::HL;
    }

    // Helpers for 16-bit register access
    pub fn get_af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f as u16
    }
    pub fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.f = val as u8;
    }

    pub fn get_bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }
    pub fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    pub fn get_de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }
    pub fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn get_hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }
    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    /// 8-bit register by 3-bit decoder field. Callers handle the memory
    /// operand (code 6) before reaching for this.
    pub(crate) fn get_reg8(&self, r: u8) -> u8 {
        match r & 0x07 {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            7 => self.a,
            _ => unreachable!("register code 6 is the memory operand"),
        }
    }

    pub(crate) fn set_reg8(&mut self, r: u8, val: u8) {
        match r & 0x07 {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            7 => self.a = val,
            _ => unreachable!("register code 6 is the memory operand"),
        }
    }

    /// Register pair by 2-bit field: BC, DE, HL (or IX/IY under a prefix), SP.
    pub(crate) fn get_rp(&self, rp: u8) -> u16 {
        match rp & 0x03 {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => match self.index_mode {
                IndexMode::HL => self.get_hl(),
                IndexMode::IX => self.ix,
                IndexMode::IY => self.iy,
            },
            _ => self.sp,
        }
    }

    pub(crate) fn set_rp(&mut self, rp: u8, val: u16) {
        match rp & 0x03 {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => match self.index_mode {
                IndexMode::HL => self.set_hl(val),
                IndexMode::IX => self.ix = val,
                IndexMode::IY => self.iy = val,
            },
            _ => self.sp = val,
        }
    }

    /// Register pair for PUSH/POP: AF replaces SP.
    pub(crate) fn get_rp_af(&self, rp: u8) -> u16 {
        match rp & 0x03 {
            3 => self.get_af(),
            other => self.get_rp(other),
        }
    }

    pub(crate) fn set_rp_af(&mut self, rp: u8, val: u16) {
        match rp & 0x03 {
            3 => self.set_af(val),
            other => self.set_rp(other, val),
        }
    }

    /// Whether the CPU is parked on a HALT (or an unrecognized ED
    /// sequence, which lands in the same state).
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub(crate) fn is_indexed(&self) -> bool {
        self.index_mode != IndexMode::HL
    }

    /// Address of the decoder's memory operand: (HL), or (IX+d)/(IY+d)
    /// with the displacement fetched from the instruction stream.
    pub(crate) fn mem_operand_addr(&mut self) -> u16 {
        match self.index_mode {
            IndexMode::HL => self.get_hl(),
            IndexMode::IX => {
                let d = self.fetch_byte() as i8;
                self.ix.wrapping_add(d as i16 as u16)
            }
            IndexMode::IY => {
                let d = self.fetch_byte() as i8;
                self.iy.wrapping_add(d as i16 as u16)
            }
        }
    }

    // --- Instruction stream / stack access ---

    pub(crate) fn fetch_byte(&mut self) -> u8 {
        let pc = self.pc;
        let data = self.mem.read(pc);
        self.logger.log_mem_read(pc, data);
        self.pc = pc.wrapping_add(1);
        data
    }

    pub(crate) fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte();
        let hi = self.fetch_byte();
        ((hi as u16) << 8) | lo as u16
    }

    pub(crate) fn push_word(&mut self, val: u16) {
        self.sp = self.sp.wrapping_sub(1);
        let sp = self.sp;
        self.mem.write(sp, (val >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        let sp = self.sp;
        self.mem.write(sp, val as u8);
    }

    pub(crate) fn pop_word(&mut self) -> u16 {
        let sp = self.sp;
        let lo = self.mem.read(sp);
        self.sp = sp.wrapping_add(1);
        let sp = self.sp;
        let hi = self.mem.read(sp);
        self.sp = sp.wrapping_add(1);
        ((hi as u16) << 8) | lo as u16
    }

    /// Credit `t` executed T-states: bump R by ⌈t/4⌉ (low 7 bits, bit 7
    /// sticky) and hand the cost to the pacer.
    pub(crate) fn wait(&mut self, t: u32) {
        let delta = t.div_ceil(4) as u8;
        self.r = (self.r & 0x80) | ((self.r & 0x7F).wrapping_add(delta) & 0x7F);
        self.pacer.credit(t);
    }

    // --- Execution ---

    /// Advance by one instruction or interrupt service.
    ///
    /// Polls NMI first, then the maskable line (when IFF1 is set and no EI
    /// shadow is pending). While halted and uninterrupted, steps idle
    /// without decoding. Returns the T-state cost of whatever ran.
    pub fn step(&mut self) -> u32 {
        if self.ports.nmi() {
            self.halted = false;
            let pc = self.pc;
            self.push_word(pc);
            self.pc = 0x0066;
            self.iff1 = false;
            self.wait(17);
            return 17;
        }

        if self.iff1 && !self.ei_delay && self.ports.mi() {
            self.halted = false;
            self.iff1 = false;
            self.iff2 = false;
            match self.im {
                0 => {
                    // Mode 0: the device supplies an opcode, in practice an
                    // RST p; only the restart target is honored.
                    let data = self.ports.data();
                    let pc = self.pc;
                    self.push_word(pc);
                    self.pc = (data & 0x38) as u16;
                }
                1 => {
                    let pc = self.pc;
                    self.push_word(pc);
                    self.pc = 0x0038;
                }
                _ => {
                    // Mode 2: device supplies the low byte of a vector
                    // table entry at I:data.
                    let data = self.ports.data();
                    let pc = self.pc;
                    self.push_word(pc);
                    let entry = ((self.i as u16) << 8) | data as u16;
                    self.pc = self.mem.read_word(entry);
                }
            }
            self.wait(17);
            return 17;
        }
        self.ei_delay = false;

        if self.halted {
            // No decoding, no register traffic; just let time pass.
            self.pacer.credit(4);
            return 4;
        }

        self.index_mode = IndexMode::HL;
        let opcode = self.fetch_byte();
        if self.logger.enabled() {
            let pc = self.pc.wrapping_sub(1);
            let text = disasm(opcode);
            self.logger.log(&format!("{pc:04X}  {text}"));
        }
        let t = self.execute_op(opcode);
        self.wait(t);
        t
    }

    /// Root opcode table. Returns the instruction's T-state cost.
    fn execute_op(&mut self, opcode: u8) -> u32 {
        match opcode {
            0x00 => 4, // NOP

            // Prefixes
            0xCB => self.execute_cb(),
            0xED => self.execute_ed(),
            0xDD => {
                self.index_mode = IndexMode::IX;
                self.execute_index()
            }
            0xFD => {
                self.index_mode = IndexMode::IY;
                self.execute_index()
            }

            // 8-bit loads
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => self.op_ld_r_n(opcode),
            0x76 => self.op_halt(),
            0x40..=0x7F => self.op_ld_r_r(opcode),
            0x02 => self.op_ld_bc_a(),
            0x12 => self.op_ld_de_a(),
            0x0A => self.op_ld_a_bc(),
            0x1A => self.op_ld_a_de(),
            0x32 => self.op_ld_nn_a(),
            0x3A => self.op_ld_a_nn(),

            // 16-bit loads
            0x01 | 0x11 | 0x21 | 0x31 => self.op_ld_rp_nn(opcode),
            0x22 => self.op_ld_nn_hl(),
            0x2A => self.op_ld_hl_nn_ind(),
            0xF9 => self.op_ld_sp_hl(),

            // Exchanges
            0x08 => self.op_ex_af_af(),
            0xD9 => self.op_exx(),
            0xEB => self.op_ex_de_hl(),
            0xE3 => self.op_ex_sp_hl(),

            // Stack
            0xC5 | 0xD5 | 0xE5 | 0xF5 => self.op_push(opcode),
            0xC1 | 0xD1 | 0xE1 | 0xF1 => self.op_pop(opcode),

            // 8-bit arithmetic / logic
            0x80..=0xBF => self.op_alu_r(opcode),
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => self.op_alu_n(opcode),
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => self.op_inc_r(opcode),
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => self.op_dec_r(opcode),
            0x27 => self.op_daa(),
            0x2F => self.op_cpl(),
            0x37 => self.op_scf(),
            0x3F => self.op_ccf(),

            // 16-bit arithmetic
            0x09 | 0x19 | 0x29 | 0x39 => self.op_add_hl_rp(opcode),
            0x03 | 0x13 | 0x23 | 0x33 => self.op_inc_rp(opcode),
            0x0B | 0x1B | 0x2B | 0x3B => self.op_dec_rp(opcode),

            // Rotates on A
            0x07 => self.op_rlca(),
            0x0F => self.op_rrca(),
            0x17 => self.op_rla(),
            0x1F => self.op_rra(),

            // Jumps
            0xC3 => self.op_jp_nn(),
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => self.op_jp_cc_nn(opcode),
            0x18 => self.op_jr(),
            0x20 | 0x28 | 0x30 | 0x38 => self.op_jr_cc(opcode),
            0xE9 => self.op_jp_hl(),
            0x10 => self.op_djnz(),

            // Calls / returns / restarts
            0xCD => self.op_call_nn(),
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => self.op_call_cc_nn(opcode),
            0xC9 => self.op_ret(),
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => self.op_ret_cc(opcode),
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => self.op_rst(opcode),

            // I/O
            0xD3 => self.op_out_n_a(),
            0xDB => self.op_in_a_n(),

            // Interrupt enable
            0xF3 => self.op_di(),
            0xFB => self.op_ei(),
        }
    }

    /// DD/FD sub-table: a near-copy of the root table with (HL) replaced
    /// by (IX+d)/(IY+d) and HL by IX/IY in the 16-bit forms. Opcodes the
    /// prefix does not touch fall through to the root semantics at the
    /// root cost plus the 4 T prefix fetch.
    fn execute_index(&mut self) -> u32 {
        // Prefix chains: the newest DD/FD wins, each superseded prefix is
        // 4 T spent.
        let mut prefix_t: u32 = 0;
        let opcode = loop {
            match self.fetch_byte() {
                0xDD => {
                    self.index_mode = IndexMode::IX;
                    prefix_t += 4;
                }
                0xFD => {
                    self.index_mode = IndexMode::IY;
                    prefix_t += 4;
                }
                other => break other,
            }
        };

        prefix_t
            + match opcode {
                0xCB => self.execute_index_cb(),

                // ED takes over and cancels the index prefix
                0xED => {
                    self.index_mode = IndexMode::HL;
                    4 + self.execute_ed()
                }

                // HL-touching bytes: the handlers consult the index mode
                // and return the prefix-inclusive documented cost.
                0x09 | 0x19 | 0x29 | 0x39 // ADD IX,rr
                | 0x21 | 0x22 | 0x2A | 0x23 | 0x2B // LD/INC/DEC IX
                | 0x34 | 0x35 | 0x36 // INC/DEC/LD (IX+d)
                | 0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x7E // LD r,(IX+d)
                | 0x70..=0x75 | 0x77 // LD (IX+d),r
                | 0x86 | 0x8E | 0x96 | 0x9E | 0xA6 | 0xAE | 0xB6 | 0xBE // ALU A,(IX+d)
                | 0xE1 | 0xE3 | 0xE5 | 0xE9 | 0xF9 => self.execute_op(opcode),

                // Everything else ignores the prefix and runs as the plain
                // root opcode (EX DE,HL included: it never maps to IX/IY).
                _ => {
                    self.index_mode = IndexMode::HL;
                    4 + self.execute_op(opcode)
                }
            }
    }

    /// ED sub-table. Unlisted bytes stop the CPU (unrecognized sequence,
    /// observed as a halt).
    fn execute_ed(&mut self) -> u32 {
        let opcode = self.fetch_byte();
        match opcode {
            // Interrupt mode select
            0x46 | 0x4E | 0x66 | 0x6E => self.op_im(0),
            0x56 | 0x76 => self.op_im(1),
            0x5E | 0x7E => self.op_im(2),

            // Interrupt/refresh register transfers
            0x47 => self.op_ld_i_a(),
            0x4F => self.op_ld_r_a(),
            0x57 => self.op_ld_a_i(),
            0x5F => self.op_ld_a_r(),

            // 16-bit memory loads/stores
            0x43 | 0x53 | 0x63 | 0x73 => self.op_ld_nn_rp_ed(opcode),
            0x4B | 0x5B | 0x6B | 0x7B => self.op_ld_rp_nn_ed(opcode),

            // 16-bit arithmetic on HL
            0x4A | 0x5A | 0x6A | 0x7A => self.op_adc_hl_rp(opcode),
            0x42 | 0x52 | 0x62 | 0x72 => self.op_sbc_hl_rp(opcode),

            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => self.op_neg(),

            // Returns (RETI is distinguishable only by peripherals)
            0x4D => self.op_retn(),
            0x45 | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => self.op_retn(),

            // Port I/O through (C)
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => self.op_in_r_c(opcode),
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => self.op_out_c_r(opcode),

            // Nibble rotates
            0x67 => self.op_rrd(),
            0x6F => self.op_rld(),

            // Block transfer
            0xA0 => self.op_ldi_ldd(false),
            0xA8 => self.op_ldi_ldd(true),
            0xB0 => self.op_ldir_lddr(false),
            0xB8 => self.op_ldir_lddr(true),

            // Block compare
            0xA1 => self.op_cpi_cpd(false),
            0xA9 => self.op_cpi_cpd(true),
            0xB1 => self.op_cpir_cpdr(false),
            0xB9 => self.op_cpir_cpdr(true),

            // Block I/O
            0xA2 => self.op_ini_ind(false),
            0xAA => self.op_ini_ind(true),
            0xB2 => self.op_inir_indr(false),
            0xBA => self.op_inir_indr(true),
            0xA3 => self.op_outi_outd(false),
            0xAB => self.op_outi_outd(true),
            0xB3 => self.op_otir_otdr(false),
            0xBB => self.op_otir_otdr(true),

            _ => {
                self.halted = true;
                8
            }
        }
    }

    /// HALT — 4 T. Latches the halt state; PC stays past the opcode so a
    /// serviced interrupt returns to the following instruction.
    fn op_halt(&mut self) -> u32 {
        self.halted = true;
        4
    }

    // --- State export ---

    /// Raw 28-byte state dump: the 26 register bytes in decoder order
    /// followed by IFF1 and IFF2 as 0/1.
    pub fn get_state(&self) -> [u8; 28] {
        [
            self.b,
            self.c,
            self.d,
            self.e,
            self.h,
            self.l,
            self.f,
            self.a,
            self.b_prime,
            self.c_prime,
            self.d_prime,
            self.e_prime,
            self.h_prime,
            self.l_prime,
            self.f_prime,
            self.a_prime,
            self.i,
            self.r,
            (self.ix >> 8) as u8,
            self.ix as u8,
            (self.iy >> 8) as u8,
            self.iy as u8,
            (self.sp >> 8) as u8,
            self.sp as u8,
            (self.pc >> 8) as u8,
            self.pc as u8,
            self.iff1 as u8,
            self.iff2 as u8,
        ]
    }

    /// Human-readable register/flag table for diagnostics.
    pub fn dump_state(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "PC={:04X} SP={:04X} IX={:04X} IY={:04X} I={:02X} R={:02X}",
            self.pc, self.sp, self.ix, self.iy, self.i, self.r
        );
        let _ = writeln!(
            out,
            "AF ={:02X}{:02X} BC ={:02X}{:02X} DE ={:02X}{:02X} HL ={:02X}{:02X}",
            self.a, self.f, self.b, self.c, self.d, self.e, self.h, self.l
        );
        let _ = writeln!(
            out,
            "AF'={:02X}{:02X} BC'={:02X}{:02X} DE'={:02X}{:02X} HL'={:02X}{:02X}",
            self.a_prime,
            self.f_prime,
            self.b_prime,
            self.c_prime,
            self.d_prime,
            self.e_prime,
            self.h_prime,
            self.l_prime
        );
        let _ = writeln!(
            out,
            "IM={} IFF1={} IFF2={} HALT={}",
            self.im, self.iff1 as u8, self.iff2 as u8, self.halted as u8
        );
        let bit = |mask: Flag| (self.f & mask as u8 != 0) as u8;
        let _ = writeln!(
            out,
            "F: S={} Z={} H={} P/V={} N={} C={}",
            bit(Flag::S),
            bit(Flag::Z),
            bit(Flag::H),
            bit(Flag::PV),
            bit(Flag::N),
            bit(Flag::C)
        );
        out
    }
}

impl<M: MemoryBus, P: PortBus, L: InstructionLogger> CpuStateTrait for Z80<M, P, L> {
    type Snapshot = Z80State;

    fn snapshot(&self) -> Z80State {
        Z80State {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            a_prime: self.a_prime,
            f_prime: self.f_prime,
            b_prime: self.b_prime,
            c_prime: self.c_prime,
            d_prime: self.d_prime,
            e_prime: self.e_prime,
            h_prime: self.h_prime,
            l_prime: self.l_prime,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
        }
    }
}
