//! Memories through the whole pipeline, with and without the memory
//! rewrites selected in the `[memory]` options table.

use fhdl_conformance::{elaborate, elaborate_with, options, Elaborated};
use fhdl_ir::{Design, Fragment, Memory, PortConfig, PortMode, SignalId};
use fhdl_lower::SpecialOverrides;
use fhdl_verilog::SpecialEmitters;
use num_bigint::BigInt;

fn single_port(design: &mut Design, mut memory: Memory, config: PortConfig) -> (Fragment, Vec<SignalId>) {
    let port = design.memory_port(&mut memory, config).unwrap();
    let mut ios = vec![port.adr, port.dat_r];
    ios.extend(port.we);
    ios.extend(port.dat_w);
    ios.extend(port.re);
    let mut f = Fragment::new();
    f.add_special(design.special(memory));
    (f, ios)
}

fn writable() -> PortConfig {
    PortConfig {
        write_capable: true,
        ..PortConfig::default()
    }
}

fn with_options(toml: &str, design: Design, fragment: Fragment, ios: Vec<SignalId>) -> Elaborated {
    elaborate_with(
        design,
        fragment,
        ios,
        &options(toml),
        &SpecialOverrides::new(),
        &SpecialEmitters::builtin(),
    )
    .unwrap()
}

// ============================================================================
// Direct emission
// ============================================================================

#[test]
fn write_first_memory_with_init_file() {
    let mut d = Design::new();
    let mem = Memory::new("storage", 8, 16).with_init([1, 0x2a, 0xff].map(BigInt::from));
    let (f, ios) = single_port(&mut d, mem, writable());
    let result = elaborate(d, f, ios).unwrap();

    assert!(result.has_line("reg [7:0] storage[0:15];"));
    assert!(result.has_line("reg [3:0] memadr;"));
    assert!(result.has_line("always @(posedge sys_clk) begin"));
    assert!(result.has_line("if (we)"));
    assert!(result.has_line("storage[adr] <= dat_w;"));
    assert!(result.has_line("memadr <= adr;"));
    assert!(result.has_line("assign dat_r = storage[memadr];"));
    assert!(result.has_line("$readmemh(\"storage.init\", storage);"));
    assert!(result.has_line("output wire [7:0] dat_r,"));
    assert_eq!(result.output.data_files.get("storage.init"), Some("01\n2A\nFF\n"));
}

#[test]
fn read_first_port_registers_data() {
    let mut d = Design::new();
    let config = PortConfig {
        mode: PortMode::ReadFirst,
        ..writable()
    };
    let (f, ios) = single_port(&mut d, Memory::new("fifo", 4, 8), config);
    let result = elaborate(d, f, ios).unwrap();

    assert!(result.has_line("reg [3:0] memdat;"));
    assert!(result.has_line("memdat <= fifo[adr];"));
    assert!(result.has_line("assign dat_r = memdat;"));
    assert!(result.output.data_files.is_empty());
}

#[test]
fn granular_write_enables() {
    let mut d = Design::new();
    let config = PortConfig {
        we_granularity: 8,
        ..writable()
    };
    let (f, ios) = single_port(&mut d, Memory::new("ram", 16, 4), config);
    let result = elaborate(d, f, ios).unwrap();

    assert!(result.has_line("input wire [1:0] we,"));
    assert!(result.has_line("if (we[0])"));
    assert!(result.has_line("ram[adr][7:0] <= dat_w[7:0];"));
    assert!(result.has_line("if (we[1])"));
    assert!(result.has_line("ram[adr][15:8] <= dat_w[15:8];"));
}

// ============================================================================
// Memory rewrites
// ============================================================================

#[test]
fn full_we_splits_into_granules() {
    let mut d = Design::new();
    let config = PortConfig {
        we_granularity: 8,
        ..writable()
    };
    let (f, ios) = single_port(&mut d, Memory::new("ram", 16, 4), config);
    let result = with_options("[memory]\nfull_we = true\n", d, f, ios);

    assert!(result.has_line("reg [7:0] ram_grain0[0:3];"));
    assert!(result.has_line("reg [7:0] ram_grain1[0:3];"));
    assert!(!result.source().contains("if (we)"));
    assert!(result.has_line("if (we[0])"));
    assert!(result.has_line("if (we[1])"));
}

#[test]
fn split_depth_uses_power_of_two_parts() {
    let mut d = Design::new();
    let (f, ios) = single_port(&mut d, Memory::new("mem", 8, 12), writable());
    let result = with_options("[memory]\nsplit_depth = true\n", d, f, ios);

    assert!(result.has_line("reg [7:0] mem_part0[0:7];"));
    assert!(result.has_line("reg [7:0] mem_part1[0:3];"));
    assert!(!result.source().contains("[0:11]"));
    assert_eq!(result.count("$readmemh"), 0);
}

#[test]
fn power_of_two_depth_is_not_split() {
    let mut d = Design::new();
    let (f, ios) = single_port(&mut d, Memory::new("mem", 8, 16), writable());
    let result = with_options("[memory]\nsplit_depth = true\n", d, f, ios);
    assert!(result.has_line("reg [7:0] mem[0:15];"));
}

#[test]
fn to_array_replaces_memory_with_registers() {
    let mut d = Design::new();
    let mem = Memory::new("lut", 8, 4).with_init([5, 6, 7, 8].map(BigInt::from));
    let config = PortConfig {
        async_read: true,
        ..PortConfig::default()
    };
    let (f, ios) = single_port(&mut d, mem, config);
    let result = with_options("[memory]\nto_array = true\n", d, f, ios);

    assert!(!result.source().contains("[0:3]"));
    assert!(!result.source().contains("$readmemh"));
    assert!(result.output.data_files.is_empty());
    assert!(result.has_line("case (adr)"));
    for init in ["8'd5;", "8'd6;", "8'd7;", "8'd8;"] {
        assert_eq!(result.count(&format!(" = {init}")), 1, "missing register initialized to {init}");
    }
}

#[test]
fn conflicting_memory_options_are_rejected() {
    let mut d = Design::new();
    let (f, ios) = single_port(&mut d, Memory::new("mem", 8, 12), writable());
    let opts = fhdl_config::ElabOptions {
        memory: fhdl_config::MemoryOptions {
            to_array: true,
            split_depth: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let err = elaborate_with(d, f, ios, &opts, &SpecialOverrides::new(), &SpecialEmitters::builtin()).err();
    assert!(matches!(err, Some(fhdl_verilog::ConvertError::Config(_))));
}
