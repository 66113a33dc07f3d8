//! Printing of one lowered, flattened fragment as a Verilog module.

use crate::error::EmitError;
use crate::expr::{print_constant, print_signal_decl, ExprPrinter};
use crate::output::DataFiles;
use crate::specials::{EmitContext, SpecialEmitters};
use crate::stmt::{AssignMode, StmtPrinter};
use fhdl_config::{AttrLookup, ElabOptions};
use fhdl_ir::{visit, AttrValue, Design, Fragment, SignalAttr, SignalId, Statement};
use fhdl_namer::Namer;
use indexmap::IndexMap;
use std::collections::BTreeSet;

const SYNTH_OFF: &str = "// synthesis translate_off\n";
const SYNTH_ON: &str = "// synthesis translate_on\n";

/// Prints `(* name = "value", ... *)` for the attributes of `id`, or
/// nothing when every attribute is suppressed.
pub(crate) fn print_attributes(design: &Design, options: &ElabOptions, id: SignalId) -> Result<Option<String>, EmitError> {
    let mut items = Vec::new();
    for attr in &design[id].attrs {
        match attr {
            SignalAttr::Tag(tag) => match options.translate_attr(tag) {
                AttrLookup::Emit(name, value) => items.push(format!("{name} = \"{value}\"")),
                AttrLookup::Suppressed => {}
                AttrLookup::Unknown => return Err(EmitError::UnknownAttribute { tag: tag.clone() }),
            },
            SignalAttr::Pair { name, value } => match value {
                AttrValue::Int(v) => items.push(format!("{name} = {v}")),
                AttrValue::Str(s) => items.push(format!("{name} = \"{s}\"")),
            },
        }
    }
    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("(* {} *)", items.join(", "))))
}

fn single_assign(stmts: &[&Statement]) -> bool {
    matches!(stmts, [Statement::Assign { .. }])
}

/// Statements of the combinational block, grouped the way they are printed.
enum CombLayout {
    /// One block per group of statements sharing targets.
    Regular(Vec<(BTreeSet<SignalId>, Vec<Statement>)>),
    /// One block per target, in order of first assignment.
    PerTarget(IndexMap<SignalId, Vec<usize>>),
}

/// Writes the module text for a fragment that has been flattened, had its
/// clock domains resolved and been lowered.
pub(crate) struct ModuleWriter<'a> {
    design: &'a Design,
    fragment: &'a Fragment,
    options: &'a ElabOptions,
    ios: Vec<SignalId>,
    signals: Vec<SignalId>,
    inouts: BTreeSet<SignalId>,
    targets: BTreeSet<SignalId>,
    wires: BTreeSet<SignalId>,
    comb: CombLayout,
}

impl<'a> ModuleWriter<'a> {
    pub(crate) fn new(
        design: &'a Design,
        fragment: &'a Fragment,
        ios: &BTreeSet<SignalId>,
        options: &'a ElabOptions,
    ) -> Self {
        let inouts = visit::list_special_ios(fragment, false, false, true);
        let special_outs = visit::list_special_ios(fragment, false, true, true);
        let mut targets = visit::fragment_targets(fragment);
        targets.extend(special_outs.iter().copied());

        let mut wires = special_outs;
        let comb = if options.regular_comb {
            let groups = visit::group_by_targets(&fragment.comb);
            for (group_targets, stmts) in &groups {
                if matches!(stmts.as_slice(), [Statement::Assign { .. }]) {
                    wires.extend(group_targets.iter().copied());
                }
            }
            CombLayout::Regular(groups)
        } else {
            let mut map: IndexMap<SignalId, Vec<usize>> = IndexMap::new();
            for (i, stmt) in fragment.comb.iter().enumerate() {
                for t in visit::list_targets(std::slice::from_ref(stmt)) {
                    map.entry(t).or_default().push(i);
                }
            }
            for (t, stmts) in &map {
                if let [i] = stmts.as_slice() {
                    if matches!(fragment.comb[*i], Statement::Assign { .. }) {
                        wires.insert(*t);
                    }
                }
            }
            CombLayout::PerTarget(map)
        };

        let mut io_list: Vec<SignalId> = ios.iter().copied().collect();
        io_list.sort_by_key(|&id| design[id].sequence);
        let mut signals: Vec<SignalId> = visit::fragment_signals(fragment)
            .into_iter()
            .filter(|id| !ios.contains(id))
            .collect();
        signals.sort_by_key(|&id| design[id].sequence);

        Self {
            design,
            fragment,
            options,
            ios: io_list,
            signals,
            inouts,
            targets,
            wires,
            comb,
        }
    }

    /// Prints the complete module, claiming helper names from `namer` and
    /// registering side files in `data_files`.
    pub(crate) fn write(
        &self,
        namer: &mut Namer,
        emitters: &SpecialEmitters,
        data_files: &mut DataFiles,
    ) -> Result<String, EmitError> {
        let mut r = String::from("/* Machine-generated using fhdl */\n");
        r.push_str(&self.header(namer)?);
        r.push_str(&self.comb(namer)?);
        r.push_str(&self.sync(namer)?);
        r.push_str(&self.specials(namer, emitters, data_files)?);
        r.push_str("endmodule\n");
        Ok(r)
    }

    fn header(&self, namer: &Namer) -> Result<String, EmitError> {
        let mut ports = Vec::with_capacity(self.ios.len());
        for &id in &self.ios {
            let mut port = String::from("\t");
            if let Some(attr) = print_attributes(self.design, self.options, id)? {
                port.push_str(&attr);
                port.push(' ');
            }
            let kind = if self.inouts.contains(&id) {
                "inout wire"
            } else if self.targets.contains(&id) {
                if self.wires.contains(&id) {
                    "output wire"
                } else {
                    "output reg"
                }
            } else {
                "input wire"
            };
            port.push_str(&format!("{kind} {}", print_signal_decl(self.design, namer, id)?));
            ports.push(port);
        }
        let mut r = format!("module {}(\n{}\n);\n\n", self.options.name, ports.join(",\n"));

        for &id in &self.signals {
            if let Some(attr) = print_attributes(self.design, self.options, id)? {
                r.push_str(&attr);
                r.push(' ');
            }
            let decl = print_signal_decl(self.design, namer, id)?;
            if self.wires.contains(&id) {
                r.push_str(&format!("wire {decl};\n"));
            } else if self.options.reg_initialization {
                r.push_str(&format!("reg {decl} = {};\n", print_constant(&self.design[id].reset)));
            } else {
                r.push_str(&format!("reg {decl};\n"));
            }
        }
        r.push('\n');
        Ok(r)
    }

    fn reset_line(&self, namer: &Namer, target: SignalId, mode: AssignMode) -> Result<String, EmitError> {
        let op = if mode == AssignMode::Blocking { "=" } else { "<=" };
        Ok(format!(
            "\t{} {op} {};\n",
            namer.get_name(target)?,
            print_constant(&self.design[target].reset)
        ))
    }

    fn comb_mode(&self) -> AssignMode {
        if self.options.blocking_assign {
            AssignMode::Blocking
        } else {
            AssignMode::NonBlocking
        }
    }

    fn comb(&self, namer: &mut Namer) -> Result<String, EmitError> {
        let mut r = String::new();
        if self.fragment.comb.is_empty() {
            r.push('\n');
            return Ok(r);
        }
        match &self.comb {
            CombLayout::Regular(groups) => {
                let exprs = ExprPrinter::new(self.design, namer);
                let mode = self.comb_mode();
                for (group_targets, stmts) in groups {
                    if let [stmt @ Statement::Assign { .. }] = stmts.as_slice() {
                        r.push_str("assign ");
                        StmtPrinter::new(self.design, exprs, AssignMode::Blocking).print(
                            &mut r,
                            0,
                            std::slice::from_ref(stmt),
                        )?;
                        continue;
                    }
                    r.push_str("always @(*) begin\n");
                    for &t in group_targets {
                        r.push_str(&self.reset_line(namer, t, mode)?);
                    }
                    StmtPrinter::new(self.design, exprs, mode).print(&mut r, 1, stmts)?;
                    r.push_str("end\n");
                }
            }
            CombLayout::PerTarget(map) => self.comb_per_target(&mut r, namer, map)?,
        }
        r.push('\n');
        Ok(r)
    }

    fn comb_per_target(
        &self,
        r: &mut String,
        namer: &mut Namer,
        map: &IndexMap<SignalId, Vec<usize>>,
    ) -> Result<(), EmitError> {
        let comb = &self.fragment.comb;
        let dummy_s = self.options.dummy_signal.then(|| namer.fresh("dummy_s"));
        let mut dummy_d = Vec::with_capacity(map.len());
        for stmts in map.values() {
            let refs: Vec<&Statement> = stmts.iter().map(|&i| &comb[i]).collect();
            let needs_dummy = dummy_s.is_some() && !single_assign(&refs);
            dummy_d.push(needs_dummy.then(|| namer.fresh("dummy_d")));
        }
        let namer: &Namer = namer;

        if let Some(s) = &dummy_s {
            r.push_str(SYNTH_OFF);
            r.push_str(&format!("reg {s};\n"));
            r.push_str(&format!("initial {s} <= 1'd0;\n"));
            r.push_str(SYNTH_ON);
        }

        let exprs = ExprPrinter::new(self.design, namer);
        let mode = self.comb_mode();
        let mut printed = BTreeSet::new();
        for (n, ((&t, stmts), dummy_d)) in map.iter().zip(&dummy_d).enumerate() {
            let refs: Vec<&Statement> = stmts.iter().map(|&i| &comb[i]).collect();
            if single_assign(&refs) {
                if printed.insert(stmts[0]) {
                    r.push_str("assign ");
                    StmtPrinter::new(self.design, exprs, AssignMode::Blocking).print(r, 0, &comb[stmts[0]..=stmts[0]])?;
                }
                continue;
            }
            let dummy = dummy_s.as_ref().zip(dummy_d.as_ref());
            if let Some((_, d)) = dummy {
                r.push('\n');
                r.push_str(SYNTH_OFF);
                r.push_str(&format!("reg {d};\n"));
                r.push_str(SYNTH_ON);
            }
            r.push_str("always @(*) begin\n");
            if self.options.display_run {
                r.push_str(&format!("\t$display(\"Running comb block #{n}\");\n"));
            }
            r.push_str(&self.reset_line(namer, t, mode)?);
            let owned: Vec<Statement> = refs.into_iter().cloned().collect();
            StmtPrinter::new(self.design, exprs, mode)
                .only_target(t)
                .print(r, 1, &owned)?;
            if let Some((s, d)) = dummy {
                r.push_str(SYNTH_OFF);
                r.push_str(&format!("\t{d} = {s};\n"));
                r.push_str(SYNTH_ON);
            }
            r.push_str("end\n");
        }
        Ok(())
    }

    fn sync(&self, namer: &Namer) -> Result<String, EmitError> {
        let exprs = ExprPrinter::new(self.design, namer);
        let mut r = String::new();
        for (domain, stmts) in &self.fragment.sync {
            let cd = self
                .fragment
                .clock_domain(domain)
                .ok_or_else(|| EmitError::MissingClockDomain { domain: domain.clone() })?;
            r.push_str(&format!("always @(posedge {}) begin\n", namer.get_name(cd.clk)?));
            StmtPrinter::new(self.design, exprs, AssignMode::BySignal).print(&mut r, 1, stmts)?;
            r.push_str("end\n\n");
        }
        Ok(r)
    }

    fn specials(
        &self,
        namer: &mut Namer,
        emitters: &SpecialEmitters,
        data_files: &mut DataFiles,
    ) -> Result<String, EmitError> {
        let mut r = String::new();
        let mut ctx = EmitContext::new(self.design, namer, data_files);
        for special in self.fragment.sorted_specials() {
            r.push_str(&emitters.emit(&mut ctx, special)?);
        }
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhdl_ir::{If, SignalSpec};

    fn write(d: &Design, f: &Fragment, ios: &[SignalId], options: &ElabOptions) -> String {
        let ios: BTreeSet<SignalId> = ios.iter().copied().collect();
        let mut all = visit::fragment_signals(f);
        all.extend(ios.iter().copied());
        let mut namer = Namer::build(d, all, fhdl_common::VERILOG_KEYWORDS.iter().copied()).unwrap();
        let mut files = DataFiles::new();
        ModuleWriter::new(d, f, &ios, options)
            .write(&mut namer, &SpecialEmitters::builtin(), &mut files)
            .unwrap()
    }

    #[test]
    fn attributes_render_in_order() {
        let mut d = Design::new();
        let s = d
            .create_signal(
                SignalSpec::new(1)
                    .named("s")
                    .attr(SignalAttr::tag("keep"))
                    .attr(SignalAttr::Pair {
                        name: "LOC".into(),
                        value: AttrValue::Str("P1".into()),
                    })
                    .attr(SignalAttr::Pair {
                        name: "weight".into(),
                        value: AttrValue::Int(3),
                    }),
            )
            .unwrap();
        let attr = print_attributes(&d, &ElabOptions::default(), s).unwrap();
        assert_eq!(attr.as_deref(), Some("(* keep = \"true\", LOC = \"P1\", weight = 3 *)"));
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let mut d = Design::new();
        let s = d.create_signal(SignalSpec::new(1).attr(SignalAttr::tag("mystery"))).unwrap();
        let options = ElabOptions {
            attr_translate: Some(Default::default()),
            ..ElabOptions::default()
        };
        let err = print_attributes(&d, &options, s).unwrap_err();
        assert_eq!(err, EmitError::UnknownAttribute { tag: "mystery".into() });
    }

    #[test]
    fn wires_and_regs_in_regular_comb() {
        let mut d = Design::new();
        let a = d.signal("a", 1).unwrap();
        let b = d.signal("b", 1).unwrap();
        let o = d.signal("o", 1).unwrap();
        let p = d.signal("p", 2).unwrap();
        let mut f = Fragment::new();
        f.add_comb([o.assign(a & b), If::new(a, [p.assign(2)]).into()]);
        let text = write(&d, &f, &[a, b, o, p], &ElabOptions::default());
        assert_eq!(
            text,
            "/* Machine-generated using fhdl */\n\
             module top(\n\tinput wire a,\n\tinput wire b,\n\toutput wire o,\n\toutput reg [1:0] p\n);\n\n\n\
             assign o = (a & b);\n\
             always @(*) begin\n\tp <= 2'd0;\n\tif (a) begin\n\t\tp <= 2'd2;\n\tend\nend\n\n\
             endmodule\n"
        );
    }

    #[test]
    fn internal_registers_are_initialized() {
        let mut d = Design::new();
        let clk = d.signal("clk", 1).unwrap();
        let q = d.create_signal(SignalSpec::new(4).named("q").reset(5)).unwrap();
        let out = d.signal("out", 4).unwrap();
        let mut f = Fragment::new();
        f.clock_domains.push(fhdl_ir::ClockDomain {
            name: "sys".into(),
            clk,
            rst: None,
        });
        f.add_sync("sys", [q.assign(q + 1)]);
        f.add_comb([out.assign(q)]);
        let text = write(&d, &f, &[clk, out], &ElabOptions::default());
        assert!(text.contains("reg [3:0] q = 4'd5;\n"));
        assert!(text.contains("always @(posedge clk) begin\n\tq <= (q + 1'd1);\nend\n\n"));

        let plain = ElabOptions {
            reg_initialization: false,
            ..ElabOptions::default()
        };
        assert!(write(&d, &f, &[clk, out], &plain).contains("reg [3:0] q;\n"));
    }

    #[test]
    fn simulation_comb_blocks_per_target() {
        let mut d = Design::new();
        let a = d.signal("a", 1).unwrap();
        let x = d.signal("x", 1).unwrap();
        let y = d.signal("y", 1).unwrap();
        let mut f = Fragment::new();
        f.add_comb([If::new(a, [x.assign(1), y.assign(1)]).into()]);
        let options = ElabOptions {
            regular_comb: false,
            display_run: true,
            ..ElabOptions::default()
        };
        let text = write(&d, &f, &[a, x, y], &options);
        assert!(text.contains("reg dummy_s;\ninitial dummy_s <= 1'd0;\n"));
        assert!(text.contains(
            "always @(*) begin\n\t$display(\"Running comb block #0\");\n\tx <= 1'd0;\n\tif (a) begin\n\t\tx <= 1'd1;\n\tend\n"
        ));
        assert!(text.contains("\tdummy_d = dummy_s;\n"));
        assert!(text.contains("\tdummy_d_1 = dummy_s;\n"));
        assert!(text.contains("\toutput reg x,\n"));
    }

    #[test]
    fn undeclared_sync_domain_is_an_error() {
        let mut d = Design::new();
        let q = d.signal("q", 1).unwrap();
        let mut f = Fragment::new();
        f.add_sync("fast", [q.assign(1)]);
        let ios = BTreeSet::from([q]);
        let mut namer = Namer::build(&d, [q], std::iter::empty()).unwrap();
        let err = ModuleWriter::new(&d, &f, &ios, &ElabOptions::default())
            .write(&mut namer, &SpecialEmitters::builtin(), &mut DataFiles::new())
            .unwrap_err();
        assert_eq!(err, EmitError::MissingClockDomain { domain: "fast".into() });
    }
}
