mod common;
use common::cpu_with_program;

const Z: u8 = 0x40;
const H: u8 = 0x10;
const C: u8 = 0x01;

#[test]
fn test_ld_ix_nn() {
    let mut cpu = cpu_with_program(&[0xDD, 0x21, 0x34, 0x12]); // LD IX,0x1234
    let cycles = cpu.step();
    assert_eq!(cycles, 14, "prefix adds 4 T to LD rr,nn");
    assert_eq!(cpu.ix, 0x1234);
    assert_eq!(cpu.get_hl(), 0, "HL untouched");
}

#[test]
fn test_ld_iy_nn() {
    let mut cpu = cpu_with_program(&[0xFD, 0x21, 0x78, 0x56]); // LD IY,0x5678
    cpu.step();
    assert_eq!(cpu.iy, 0x5678);
}

#[test]
fn test_ld_mem_ix_n() {
    let mut cpu = cpu_with_program(&[0xDD, 0x36, 0x05, 0xAB]); // LD (IX+5),0xAB
    cpu.ix = 0x4000;
    let cycles = cpu.step();
    assert_eq!(cycles, 19);
    assert_eq!(cpu.mem.memory[0x4005], 0xAB);
}

#[test]
fn test_ld_r_from_ix_negative_displacement() {
    let mut cpu = cpu_with_program(&[0xDD, 0x7E, 0xFE]); // LD A,(IX-2)
    cpu.ix = 0x4000;
    cpu.mem.memory[0x3FFE] = 0x99;
    let cycles = cpu.step();
    assert_eq!(cycles, 19);
    assert_eq!(cpu.a, 0x99);
}

#[test]
fn test_ld_iy_r_store() {
    let mut cpu = cpu_with_program(&[0xFD, 0x70, 0x10]); // LD (IY+0x10),B
    cpu.iy = 0x5000;
    cpu.b = 0x3C;
    cpu.step();
    assert_eq!(cpu.mem.memory[0x5010], 0x3C);
}

#[test]
fn test_alu_ix_operand() {
    let mut cpu = cpu_with_program(&[0xDD, 0x86, 0x01]); // ADD A,(IX+1)
    cpu.ix = 0x4000;
    cpu.a = 0x0F;
    cpu.mem.memory[0x4001] = 0x01;
    let cycles = cpu.step();
    assert_eq!(cycles, 19);
    assert_eq!(cpu.a, 0x10);
    assert_ne!(cpu.f & H, 0);
}

#[test]
fn test_inc_dec_ix_operand() {
    let mut cpu = cpu_with_program(&[0xDD, 0x34, 0x00, 0xDD, 0x35, 0x00]);
    cpu.ix = 0x4000;
    cpu.mem.memory[0x4000] = 0x41;
    let cycles = cpu.step(); // INC (IX+0)
    assert_eq!(cycles, 23);
    assert_eq!(cpu.mem.memory[0x4000], 0x42);
    let cycles = cpu.step(); // DEC (IX+0)
    assert_eq!(cycles, 23);
    assert_eq!(cpu.mem.memory[0x4000], 0x41);
}

#[test]
fn test_add_ix_rp() {
    let mut cpu = cpu_with_program(&[0xDD, 0x09]); // ADD IX,BC
    cpu.ix = 0x1000;
    cpu.set_bc(0x0234);
    let cycles = cpu.step();
    assert_eq!(cycles, 15);
    assert_eq!(cpu.ix, 0x1234);

    // rr=2 means the index register itself under a prefix
    let mut cpu = cpu_with_program(&[0xDD, 0x29]); // ADD IX,IX
    cpu.ix = 0x1100;
    cpu.step();
    assert_eq!(cpu.ix, 0x2200);
}

#[test]
fn test_inc_dec_ix() {
    let mut cpu = cpu_with_program(&[0xDD, 0x23, 0xFD, 0x2B]);
    cpu.ix = 0x00FF;
    cpu.iy = 0x0100;
    let cycles = cpu.step(); // INC IX
    assert_eq!(cycles, 10);
    assert_eq!(cpu.ix, 0x0100);
    cpu.step(); // DEC IY
    assert_eq!(cpu.iy, 0x00FF);
}

#[test]
fn test_push_pop_ix() {
    let mut cpu = cpu_with_program(&[0xDD, 0xE5, 0xFD, 0xE1]); // PUSH IX; POP IY
    cpu.sp = 0x8000;
    cpu.ix = 0xFACE;
    let cycles = cpu.step();
    assert_eq!(cycles, 15);
    assert_eq!(cpu.sp, 0x7FFE);
    let cycles = cpu.step();
    assert_eq!(cycles, 14);
    assert_eq!(cpu.iy, 0xFACE);
}

#[test]
fn test_ex_sp_ix() {
    let mut cpu = cpu_with_program(&[0xDD, 0xE3]); // EX (SP),IX
    cpu.sp = 0x8000;
    cpu.ix = 0x1234;
    cpu.mem.load(0x8000, &[0x78, 0x56]);
    let cycles = cpu.step();
    assert_eq!(cycles, 23);
    assert_eq!(cpu.ix, 0x5678);
    assert_eq!(cpu.mem.memory[0x8000], 0x34);
}

#[test]
fn test_jp_ix() {
    let mut cpu = cpu_with_program(&[0xDD, 0xE9]); // JP (IX)
    cpu.ix = 0x2000;
    let cycles = cpu.step();
    assert_eq!(cycles, 8);
    assert_eq!(cpu.pc, 0x2000);
}

#[test]
fn test_ld_sp_ix() {
    let mut cpu = cpu_with_program(&[0xDD, 0xF9]); // LD SP,IX
    cpu.ix = 0xC000;
    let cycles = cpu.step();
    assert_eq!(cycles, 10);
    assert_eq!(cpu.sp, 0xC000);
}

#[test]
fn test_ld_ix_indirect() {
    let mut cpu = cpu_with_program(&[0xDD, 0x2A, 0x00, 0x60, 0xDD, 0x22, 0x02, 0x60]);
    cpu.mem.load(0x6000, &[0xEF, 0xBE]);
    let cycles = cpu.step(); // LD IX,(0x6000)
    assert_eq!(cycles, 20);
    assert_eq!(cpu.ix, 0xBEEF);
    let cycles = cpu.step(); // LD (0x6002),IX
    assert_eq!(cycles, 20);
    assert_eq!(cpu.mem.memory[0x6002], 0xEF);
    assert_eq!(cpu.mem.memory[0x6003], 0xBE);
}

// ============================================================
// DD CB / FD CB — indexed bit operations
// ============================================================

#[test]
fn test_ddcb_bit() {
    // DD CB d op: displacement comes before the sub-opcode
    let mut cpu = cpu_with_program(&[0xDD, 0xCB, 0x03, 0x46]); // BIT 0,(IX+3)
    cpu.ix = 0x4000;
    cpu.mem.memory[0x4003] = 0x01;
    let cycles = cpu.step();
    assert_eq!(cycles, 20, "indexed BIT is 20 T-states");
    assert_eq!(cpu.f & Z, 0, "bit 0 set");
    assert_ne!(cpu.f & H, 0);
}

#[test]
fn test_ddcb_set_res() {
    let mut cpu = cpu_with_program(&[0xDD, 0xCB, 0x00, 0xC6, 0xDD, 0xCB, 0x00, 0x86]);
    cpu.ix = 0x4000;
    let cycles = cpu.step(); // SET 0,(IX+0)
    assert_eq!(cycles, 23);
    assert_eq!(cpu.mem.memory[0x4000], 0x01);
    cpu.step(); // RES 0,(IX+0)
    assert_eq!(cpu.mem.memory[0x4000], 0x00);
}

#[test]
fn test_ddcb_rotate_writes_back() {
    let mut cpu = cpu_with_program(&[0xFD, 0xCB, 0xFF, 0x06]); // RLC (IY-1)
    cpu.iy = 0x4001;
    cpu.mem.memory[0x4000] = 0x80;
    let cycles = cpu.step();
    assert_eq!(cycles, 23);
    assert_eq!(cpu.mem.memory[0x4000], 0x01);
    assert_ne!(cpu.f & C, 0);
}

#[test]
fn test_ddcb_register_copy() {
    // Non-BIT indexed CB ops also copy the result into the named register
    let mut cpu = cpu_with_program(&[0xDD, 0xCB, 0x00, 0xC7]); // SET 0,(IX+0) -> A
    cpu.ix = 0x4000;
    cpu.mem.memory[0x4000] = 0x10;
    cpu.a = 0;
    cpu.step();
    assert_eq!(cpu.mem.memory[0x4000], 0x11, "memory updated");
    assert_eq!(cpu.a, 0x11, "undocumented register copy");
}

// ============================================================
// Root fall-through under DD/FD
// ============================================================

#[test]
fn test_prefix_falls_through_to_root() {
    // FD 3E 42: LD A,n does not touch HL, so the prefix only adds 4 T
    let mut cpu = cpu_with_program(&[0xFD, 0x3E, 0x42]);
    let cycles = cpu.step();
    assert_eq!(cycles, 11, "root cost plus the prefix fetch");
    assert_eq!(cpu.a, 0x42);
    assert!(!cpu.halted);
    assert_eq!(cpu.pc, 3);
}

#[test]
fn test_prefix_fall_through_register_alu() {
    let mut cpu = cpu_with_program(&[0xDD, 0x80]); // DD ADD A,B
    cpu.a = 0x10;
    cpu.b = 0x22;
    let cycles = cpu.step();
    assert_eq!(cycles, 8);
    assert_eq!(cpu.a, 0x32);
}

#[test]
fn test_prefix_fall_through_jump() {
    let mut cpu = cpu_with_program(&[0xDD, 0xC3, 0x00, 0x40]); // DD JP 0x4000
    let cycles = cpu.step();
    assert_eq!(cycles, 14);
    assert_eq!(cpu.pc, 0x4000);
}

#[test]
fn test_ex_de_hl_ignores_prefix() {
    // EX DE,HL never maps to IX/IY: DD EB still swaps DE and HL
    let mut cpu = cpu_with_program(&[0xDD, 0xEB]);
    cpu.set_de(0x1111);
    cpu.set_hl(0x2222);
    cpu.ix = 0x3333;
    let cycles = cpu.step();
    assert_eq!(cycles, 8);
    assert_eq!(cpu.get_de(), 0x2222);
    assert_eq!(cpu.get_hl(), 0x1111);
    assert_eq!(cpu.ix, 0x3333, "IX untouched");
}

#[test]
fn test_prefix_chain_newest_wins() {
    // DD FD 21: the FD takes over and the load targets IY
    let mut cpu = cpu_with_program(&[0xDD, 0xFD, 0x21, 0x34, 0x12]);
    let cycles = cpu.step();
    assert_eq!(cycles, 18, "14 T LD IY,nn plus one superseded prefix");
    assert_eq!(cpu.iy, 0x1234);
    assert_eq!(cpu.ix, 0);
}

#[test]
fn test_prefix_then_ed() {
    // DD ED 56: the ED table takes over, the DD is 4 T spent
    let mut cpu = cpu_with_program(&[0xDD, 0xED, 0x56]);
    let cycles = cpu.step();
    assert_eq!(cycles, 12);
    assert_eq!(cpu.im, 1);
    assert!(!cpu.halted);
}
