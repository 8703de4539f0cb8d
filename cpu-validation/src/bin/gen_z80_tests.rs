use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use galena_core::cpu::z80::Z80;
use galena_cpu_validation::{BusOp, TracingBus, TracingPorts, Z80CpuState, Z80TestCase};
use rand::Rng;

const NUM_TESTS: usize = 500;

// --- Instruction Definition ---

struct InstrDef {
    /// Instruction bytes with operand positions zeroed; operands are
    /// randomized into the trailing `operand_bytes` positions.
    prefix: Vec<u8>,
    operand_bytes: u8,
    label: &'static str,
}

impl InstrDef {
    fn file_stem(&self) -> String {
        self.prefix
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join("")
    }
}

// --- Instruction Table ---

fn all_instructions() -> Vec<InstrDef> {
    let mut v = Vec::new();

    let mut add = |bytes: &[u8], operands: u8, label: &'static str| {
        v.push(InstrDef {
            prefix: bytes.to_vec(),
            operand_bytes: operands,
            label,
        });
    };

    // Root table: loads
    add(&[0x3E], 1, "LD A,n");
    add(&[0x06], 1, "LD B,n");
    add(&[0x48], 0, "LD C,B");
    add(&[0x7E], 0, "LD A,(HL)");
    add(&[0x77], 0, "LD (HL),A");
    add(&[0x01], 2, "LD BC,nn");
    add(&[0x21], 2, "LD HL,nn");
    add(&[0x31], 2, "LD SP,nn");
    add(&[0x3A], 2, "LD A,(nn)");
    add(&[0x32], 2, "LD (nn),A");
    add(&[0x2A], 2, "LD HL,(nn)");
    add(&[0x22], 2, "LD (nn),HL");
    add(&[0xF9], 0, "LD SP,HL");

    // Exchanges and stack
    add(&[0x08], 0, "EX AF,AF'");
    add(&[0xD9], 0, "EXX");
    add(&[0xEB], 0, "EX DE,HL");
    add(&[0xC5], 0, "PUSH BC");
    add(&[0xF5], 0, "PUSH AF");
    add(&[0xC1], 0, "POP BC");
    add(&[0xF1], 0, "POP AF");

    // 8-bit ALU
    add(&[0x80], 0, "ADD A,B");
    add(&[0x88], 0, "ADC A,B");
    add(&[0x90], 0, "SUB B");
    add(&[0x98], 0, "SBC A,B");
    add(&[0xA0], 0, "AND B");
    add(&[0xA8], 0, "XOR B");
    add(&[0xB0], 0, "OR B");
    add(&[0xB8], 0, "CP B");
    add(&[0xC6], 1, "ADD A,n");
    add(&[0x04], 0, "INC B");
    add(&[0x05], 0, "DEC B");
    add(&[0x34], 0, "INC (HL)");
    add(&[0x27], 0, "DAA");
    add(&[0x2F], 0, "CPL");
    add(&[0x37], 0, "SCF");
    add(&[0x3F], 0, "CCF");

    // 16-bit ALU
    add(&[0x09], 0, "ADD HL,BC");
    add(&[0x03], 0, "INC BC");
    add(&[0x0B], 0, "DEC BC");

    // Rotates
    add(&[0x07], 0, "RLCA");
    add(&[0x0F], 0, "RRCA");
    add(&[0x17], 0, "RLA");
    add(&[0x1F], 0, "RRA");

    // Branches
    add(&[0xC3], 2, "JP nn");
    add(&[0xC2], 2, "JP NZ,nn");
    add(&[0x18], 1, "JR e");
    add(&[0x28], 1, "JR Z,e");
    add(&[0x10], 1, "DJNZ e");
    add(&[0xE9], 0, "JP (HL)");
    add(&[0xCD], 2, "CALL nn");
    add(&[0xC9], 0, "RET");
    add(&[0xC8], 0, "RET Z");
    add(&[0xC7], 0, "RST 00h");
    add(&[0xFF], 0, "RST 38h");

    // CB family
    add(&[0xCB, 0x00], 0, "RLC B");
    add(&[0xCB, 0x3F], 0, "SRL A");
    add(&[0xCB, 0x46], 0, "BIT 0,(HL)");
    add(&[0xCB, 0xC6], 0, "SET 0,(HL)");

    // ED family
    add(&[0xED, 0x44], 0, "NEG");
    add(&[0xED, 0x4A], 0, "ADC HL,BC");
    add(&[0xED, 0x42], 0, "SBC HL,BC");
    add(&[0xED, 0x6F], 0, "RLD");
    add(&[0xED, 0x67], 0, "RRD");
    add(&[0xED, 0xA0], 0, "LDI");
    add(&[0xED, 0xA1], 0, "CPI");

    // Index family
    add(&[0xDD, 0x21], 2, "LD IX,nn");
    add(&[0xDD, 0x7E], 1, "LD A,(IX+d)");
    add(&[0xDD, 0x86], 1, "ADD A,(IX+d)");
    add(&[0xFD, 0xE5], 0, "PUSH IY");

    // Index prefix falling through to root semantics
    add(&[0xDD, 0x00], 0, "NOP under DD");
    add(&[0xFD, 0x3E], 1, "LD A,n under FD");
    add(&[0xDD, 0x04], 0, "INC B under DD");
    add(&[0xDD, 0x80], 0, "ADD A,B under DD");
    add(&[0xDD, 0xC3], 2, "JP nn under DD");
    add(&[0xDD, 0xEB], 0, "EX DE,HL under DD");

    v
}

// --- Helpers ---

fn snapshot_cpu(cpu: &Z80<TracingBus, TracingPorts>) -> Z80CpuState {
    Z80CpuState {
        pc: cpu.pc,
        sp: cpu.sp,
        a: cpu.a,
        b: cpu.b,
        c: cpu.c,
        d: cpu.d,
        e: cpu.e,
        f: cpu.f,
        h: cpu.h,
        l: cpu.l,
        i: cpu.i,
        r: cpu.r,
        ei: cpu.ei_delay as u8,
        wz: 0,
        ix: cpu.ix,
        iy: cpu.iy,
        af_prime: ((cpu.a_prime as u16) << 8) | cpu.f_prime as u16,
        bc_prime: ((cpu.b_prime as u16) << 8) | cpu.c_prime as u16,
        de_prime: ((cpu.d_prime as u16) << 8) | cpu.e_prime as u16,
        hl_prime: ((cpu.h_prime as u16) << 8) | cpu.l_prime as u16,
        im: cpu.im,
        p: 0,
        q: 0,
        iff1: cpu.iff1 as u8,
        iff2: cpu.iff2 as u8,
        ram: Vec::new(),
    }
}

fn build_ram(memory: &[u8; 0x10000], addresses: &BTreeSet<u16>) -> Vec<(u16, u8)> {
    addresses
        .iter()
        .map(|&addr| (addr, memory[addr as usize]))
        .collect()
}

// --- Test Generation ---

fn generate_instr(rng: &mut impl Rng, instr: &InstrDef) -> Vec<Z80TestCase> {
    let mut tests = Vec::with_capacity(NUM_TESTS);
    let total_bytes = instr.prefix.len() + instr.operand_bytes as usize;
    let max_pc = (0x10000 - total_bytes) as u16;

    while tests.len() < NUM_TESTS {
        let mut bus = TracingBus::new();
        let ports = TracingPorts::new();
        rng.fill(&mut bus.memory[..]);

        let mut cpu = Z80::new(bus, ports);
        cpu.a = rng.r#gen();
        cpu.f = rng.r#gen();
        cpu.b = rng.r#gen();
        cpu.c = rng.r#gen();
        cpu.d = rng.r#gen();
        cpu.e = rng.r#gen();
        cpu.h = rng.r#gen();
        cpu.l = rng.r#gen();
        cpu.a_prime = rng.r#gen();
        cpu.f_prime = rng.r#gen();
        cpu.b_prime = rng.r#gen();
        cpu.c_prime = rng.r#gen();
        cpu.d_prime = rng.r#gen();
        cpu.e_prime = rng.r#gen();
        cpu.h_prime = rng.r#gen();
        cpu.l_prime = rng.r#gen();
        cpu.ix = rng.r#gen();
        cpu.iy = rng.r#gen();
        cpu.sp = rng.r#gen();
        cpu.i = rng.r#gen();
        cpu.r = rng.r#gen();
        cpu.pc = rng.gen_range(0..=max_pc);

        // Place the instruction at PC
        let pc = cpu.pc;
        for (idx, &byte) in instr.prefix.iter().enumerate() {
            cpu.mem.memory[pc.wrapping_add(idx as u16) as usize] = byte;
        }

        let pre_memory = *cpu.mem.memory;
        let mut initial = snapshot_cpu(&cpu);

        let t_states = cpu.step();

        let mut final_state = snapshot_cpu(&cpu);

        // Every address the bus touched, plus the instruction bytes
        let mut addresses: BTreeSet<u16> =
            cpu.mem.cycles.iter().map(|c| c.addr).collect();
        for idx in 0..total_bytes {
            addresses.insert(pc.wrapping_add(idx as u16));
        }

        initial.ram = build_ram(&pre_memory, &addresses);
        final_state.ram = build_ram(&cpu.mem.memory, &addresses);

        // One cycle entry per T-state: bus accesses in order, padded with
        // internal cycles so the count matches the credited T-states.
        let mut cycles: Vec<(u16, u8, String)> = cpu
            .mem
            .cycles
            .iter()
            .map(|c| {
                let op = match c.op {
                    BusOp::Read => "read",
                    BusOp::Write => "write",
                };
                (c.addr, c.data, op.to_string())
            })
            .collect();
        while cycles.len() < t_states as usize {
            cycles.push((0xFFFF, 0, "internal".to_string()));
        }

        let name = (0..total_bytes as u16)
            .map(|i| format!("{:02x}", pre_memory[pc.wrapping_add(i) as usize]))
            .collect::<Vec<_>>()
            .join(" ");

        tests.push(Z80TestCase {
            name,
            initial,
            final_state,
            cycles,
            ports: Vec::new(),
        });
    }

    tests
}

fn generate_and_write(rng: &mut impl Rng, instr: &InstrDef, out_dir: &Path) {
    let tests = generate_instr(rng, instr);
    let out_path = out_dir.join(format!("{}.json", instr.file_stem()));
    let json = serde_json::to_string_pretty(&tests).expect("Failed to serialize test cases");
    fs::write(&out_path, json).expect("Failed to write output file");
    println!(
        "Generated {} tests for {} -> {}",
        tests.len(),
        instr.label,
        out_path.display()
    );
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: gen_z80_tests <opcode-byte | all>");
        eprintln!("Examples:");
        eprintln!("  gen_z80_tests 3e        # LD A,n");
        eprintln!("  gen_z80_tests all");
        std::process::exit(1);
    }

    let out_dir = Path::new("test_data/z80");
    fs::create_dir_all(out_dir).expect("Failed to create output directory");

    let all = all_instructions();
    let mut rng = rand::thread_rng();

    if args[1] == "all" {
        for instr in &all {
            generate_and_write(&mut rng, instr, out_dir);
        }
        println!("Generated tests for {} instructions", all.len());
    } else {
        let arg = args[1].trim_start_matches("0x").trim_start_matches("0X");
        let opcode = u8::from_str_radix(arg, 16).unwrap_or_else(|_| {
            eprintln!("Invalid hex opcode: {}", args[1]);
            std::process::exit(1);
        });

        let instr = all
            .iter()
            .find(|i| i.prefix[0] == opcode)
            .unwrap_or_else(|| {
                eprintln!("Opcode 0x{opcode:02X} not found in instruction table");
                std::process::exit(1);
            });

        generate_and_write(&mut rng, instr, out_dir);
    }
}
