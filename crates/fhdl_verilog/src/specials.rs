//! Verilog emission of specials that survive lowering.
//!
//! Memories, instances and tristates print themselves. Every other kind is
//! lowered before emission, so reaching one here without a registered
//! emitter is an error.

use crate::error::EmitError;
use crate::expr::{print_constant, ExprPrinter};
use crate::output::DataFiles;
use fhdl_ir::{
    bits_for, Design, Expr, Instance, InstanceItem, Memory, ParamValue, PortMode, Shape, Special, SpecialBody,
    SpecialKind, Tristate,
};
use fhdl_namer::Namer;
use num_bigint::BigInt;
use std::collections::BTreeMap;
use std::fmt;

/// What an emitter may use while printing one special.
pub struct EmitContext<'a> {
    design: &'a Design,
    namer: &'a mut Namer,
    data_files: &'a mut DataFiles,
}

impl<'a> EmitContext<'a> {
    /// Wraps the state of one conversion run.
    pub fn new(design: &'a Design, namer: &'a mut Namer, data_files: &'a mut DataFiles) -> Self {
        Self {
            design,
            namer,
            data_files,
        }
    }

    /// The design being emitted.
    pub fn design(&self) -> &Design {
        self.design
    }

    /// Prints an expression.
    pub fn expr(&self, expr: &Expr) -> Result<String, EmitError> {
        ExprPrinter::new(self.design, self.namer).print(expr)
    }

    /// The shape of an expression.
    pub fn shape_of(&self, expr: &Expr) -> Result<Shape, EmitError> {
        Ok(self.design.shape_of(expr)?)
    }

    /// Claims an identifier that no signal or earlier object uses.
    pub fn fresh(&mut self, base: &str) -> String {
        self.namer.fresh(base)
    }

    /// Registers a file to be written next to the Verilog source and
    /// returns its final name.
    pub fn add_data_file(&mut self, base: &str, content: String) -> String {
        self.data_files.add(base, content)
    }
}

/// Prints one kind of special.
pub trait SpecialEmitter {
    /// Returns the Verilog text for `special`.
    fn emit(&self, ctx: &mut EmitContext<'_>, special: &Special) -> Result<String, EmitError>;
}

impl<F> SpecialEmitter for F
where
    F: Fn(&mut EmitContext<'_>, &Special) -> Result<String, EmitError>,
{
    fn emit(&self, ctx: &mut EmitContext<'_>, special: &Special) -> Result<String, EmitError> {
        self(ctx, special)
    }
}

/// Emitters keyed by special kind.
pub struct SpecialEmitters {
    map: BTreeMap<SpecialKind, Box<dyn SpecialEmitter>>,
}

impl SpecialEmitters {
    /// A registry with no emitters at all.
    pub fn empty() -> Self {
        Self { map: BTreeMap::new() }
    }

    /// The registry holding the memory, instance and tristate emitters.
    pub fn builtin() -> Self {
        Self::empty()
            .with(SpecialKind::Memory, MemoryEmitter)
            .with(SpecialKind::Instance, InstanceEmitter)
            .with(SpecialKind::Tristate, TristateEmitter)
    }

    /// Registers `imp` for `kind`, replacing any earlier registration.
    pub fn register(&mut self, kind: SpecialKind, imp: impl SpecialEmitter + 'static) -> &mut Self {
        self.map.insert(kind, Box::new(imp));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, kind: SpecialKind, imp: impl SpecialEmitter + 'static) -> Self {
        self.register(kind, imp);
        self
    }

    /// The emitter registered for `kind`.
    pub fn get(&self, kind: SpecialKind) -> Option<&dyn SpecialEmitter> {
        self.map.get(&kind).map(|b| b.as_ref())
    }

    /// Prints `special` with the emitter registered for its kind.
    pub fn emit(&self, ctx: &mut EmitContext<'_>, special: &Special) -> Result<String, EmitError> {
        let kind = special.kind();
        let emitter = self.get(kind).ok_or(EmitError::NoEmitter { kind })?;
        emitter.emit(ctx, special)
    }
}

impl Default for SpecialEmitters {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for SpecialEmitters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}

fn mismatch(expected: SpecialKind, special: &Special) -> EmitError {
    EmitError::InvalidSpecial {
        kind: expected,
        reason: format!("emitter called with a {}", special.kind()),
    }
}

/// Prints a memory as a register array with one clocked block per port.
pub struct MemoryEmitter;

impl SpecialEmitter for MemoryEmitter {
    fn emit(&self, ctx: &mut EmitContext<'_>, special: &Special) -> Result<String, EmitError> {
        match &special.body {
            SpecialBody::Memory(memory) => emit_memory(ctx, memory),
            _ => Err(mismatch(SpecialKind::Memory, special)),
        }
    }
}

enum ReadReg {
    Address(String),
    Data(String),
    None,
}

fn emit_memory(ctx: &mut EmitContext<'_>, memory: &Memory) -> Result<String, EmitError> {
    let invalid = |reason: &str| EmitError::InvalidSpecial {
        kind: SpecialKind::Memory,
        reason: format!("'{}': {reason}", memory.name),
    };
    if memory.width == 0 || memory.depth == 0 {
        return Err(invalid("zero width or depth"));
    }
    let name = ctx.fresh(&memory.name);
    let adrbits = bits_for(&BigInt::from(memory.depth - 1), false);
    let mut r = format!("reg [{}:0] {name}[0:{}];\n", memory.width - 1, memory.depth - 1);

    let mut read_regs = Vec::with_capacity(memory.ports.len());
    for port in &memory.ports {
        let reg = if port.async_read {
            ReadReg::None
        } else if port.mode == PortMode::WriteFirst {
            let reg = ctx.fresh("memadr");
            r.push_str(&format!("reg [{}:0] {reg};\n", adrbits - 1));
            ReadReg::Address(reg)
        } else {
            let reg = ctx.fresh("memdat");
            r.push_str(&format!("reg [{}:0] {reg};\n", memory.width - 1));
            ReadReg::Data(reg)
        };
        read_regs.push(reg);
    }

    for (port, reg) in memory.ports.iter().zip(&read_regs) {
        let adr = ctx.expr(&port.adr)?;
        let mut body = String::new();
        if let Some(we) = &port.we {
            let dat_w = port.dat_w.as_ref().ok_or_else(|| invalid("write port without write data"))?;
            let we = ctx.expr(we)?;
            let dat_w = ctx.expr(dat_w)?;
            let g = port.granularity(memory.width);
            if g < memory.width {
                for i in 0..memory.width / g {
                    let sl = format!("[{}:{}]", (i + 1) * g - 1, i * g);
                    body.push_str(&format!("\tif ({we}[{i}])\n"));
                    body.push_str(&format!("\t\t{name}[{adr}]{sl} <= {dat_w}{sl};\n"));
                }
            } else {
                body.push_str(&format!("\tif ({we})\n"));
                body.push_str(&format!("\t\t{name}[{adr}] <= {dat_w};\n"));
            }
        }
        let read = match reg {
            ReadReg::None => None,
            ReadReg::Address(a) => Some(format!("\t{a} <= {adr};\n")),
            ReadReg::Data(d) => {
                let assign = format!("{d} <= {name}[{adr}];\n");
                match (&port.mode, &port.we) {
                    (PortMode::NoChange, Some(we)) => Some(format!("\tif (!{})\n\t\t{assign}", ctx.expr(we)?)),
                    _ => Some(format!("\t{assign}")),
                }
            }
        };
        if let Some(read) = read {
            match &port.re {
                None => body.push_str(&read),
                Some(re) => {
                    body.push_str(&format!("\tif ({})\n", ctx.expr(re)?));
                    body.push('\t');
                    body.push_str(&read.replace("\n\t", "\n\t\t"));
                }
            }
        }
        if !body.is_empty() {
            r.push_str(&format!("always @(posedge {}) begin\n{body}end\n\n", ctx.expr(&port.clock)?));
        }
    }

    for (port, reg) in memory.ports.iter().zip(&read_regs) {
        let dat_r = ctx.expr(&port.dat_r)?;
        let source = match reg {
            ReadReg::None => format!("{name}[{}]", ctx.expr(&port.adr)?),
            ReadReg::Address(a) => format!("{name}[{a}]"),
            ReadReg::Data(d) => d.clone(),
        };
        r.push_str(&format!("assign {dat_r} = {source};\n"));
    }
    r.push('\n');

    if let Some(init) = &memory.init {
        let digits = memory.width.div_ceil(4) as usize;
        let word = Shape::unsigned(memory.width);
        let mut content = String::new();
        for value in init {
            content.push_str(&format!("{:0digits$X}\n", word.wrap(value)));
        }
        let file = ctx.add_data_file(&format!("{name}.init"), content);
        r.push_str(&format!("initial begin\n\t$readmemh(\"{file}\", {name});\nend\n\n"));
    }
    Ok(r)
}

/// Prints an instance as a module instantiation.
pub struct InstanceEmitter;

impl SpecialEmitter for InstanceEmitter {
    fn emit(&self, ctx: &mut EmitContext<'_>, special: &Special) -> Result<String, EmitError> {
        match &special.body {
            SpecialBody::Instance(instance) => emit_instance(ctx, instance),
            _ => Err(mismatch(SpecialKind::Instance, special)),
        }
    }
}

fn emit_instance(ctx: &mut EmitContext<'_>, instance: &Instance) -> Result<String, EmitError> {
    let mut r = format!("{} ", instance.of);
    let params: Vec<String> = instance
        .items
        .iter()
        .filter_map(|item| match item {
            InstanceItem::Parameter { name, value } => {
                let value = match value {
                    ParamValue::Const(c) => print_constant(c),
                    ParamValue::Str(s) => format!("\"{s}\""),
                    ParamValue::Preformatted(s) => s.clone(),
                };
                Some(format!("\t.{name}({value})"))
            }
            _ => None,
        })
        .collect();
    if !params.is_empty() {
        r.push_str(&format!("#(\n{}\n) ", params.join(",\n")));
    }
    r.push_str(&ctx.fresh(instance.name.as_deref().unwrap_or(&instance.of)));
    if !params.is_empty() {
        r.push(' ');
    }

    let mut ports = Vec::new();
    for item in &instance.items {
        match item {
            InstanceItem::Input { name, expr } | InstanceItem::Output { name, expr } | InstanceItem::InOut { name, expr } => {
                ports.push(format!("\t.{name}({})", ctx.expr(expr)?));
            }
            InstanceItem::Parameter { .. } => {}
        }
    }
    r.push_str("(\n");
    if !ports.is_empty() {
        r.push_str(&ports.join(",\n"));
        r.push('\n');
    }
    match &instance.synthesis_directive {
        Some(directive) => r.push_str(&format!(")/* synthesis {directive} */;\n\n")),
        None => r.push_str(");\n\n"),
    }
    Ok(r)
}

/// Prints a tristate as a conditional high-impedance assignment.
pub struct TristateEmitter;

impl SpecialEmitter for TristateEmitter {
    fn emit(&self, ctx: &mut EmitContext<'_>, special: &Special) -> Result<String, EmitError> {
        match &special.body {
            SpecialBody::Tristate(t) => emit_tristate(ctx, t),
            _ => Err(mismatch(SpecialKind::Tristate, special)),
        }
    }
}

fn emit_tristate(ctx: &mut EmitContext<'_>, t: &Tristate) -> Result<String, EmitError> {
    let width = ctx.shape_of(&t.target)?.width;
    let target = ctx.expr(&t.target)?;
    let mut r = format!(
        "assign {target} = {} ? {} : {width}'bz;\n",
        ctx.expr(&t.oe)?,
        ctx.expr(&t.o)?
    );
    if let Some(i) = &t.i {
        r.push_str(&format!("assign {} = {target};\n", ctx.expr(i)?));
    }
    r.push('\n');
    Ok(r)
}
