//! Statement printing.

use crate::error::EmitError;
use crate::expr::{print_constant, ExprPrinter};
use fhdl_ir::{visit, CaseKey, Design, SignalId, Statement};

/// Assignment operator used for printed assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignMode {
    /// Always `=`.
    Blocking,
    /// Always `<=`.
    NonBlocking,
    /// `=` for variable targets, `<=` otherwise.
    BySignal,
}

pub(crate) fn indent(level: usize) -> String {
    "\t".repeat(level)
}

/// Prints statement lists at a given indentation.
pub struct StmtPrinter<'a> {
    design: &'a Design,
    exprs: ExprPrinter<'a>,
    mode: AssignMode,
    filter: Option<SignalId>,
}

impl<'a> StmtPrinter<'a> {
    /// A printer using `mode` for every assignment.
    pub fn new(design: &'a Design, exprs: ExprPrinter<'a>, mode: AssignMode) -> Self {
        Self {
            design,
            exprs,
            mode,
            filter: None,
        }
    }

    /// Only prints statements that assign `target`.
    pub fn only_target(mut self, target: SignalId) -> Self {
        self.filter = Some(target);
        self
    }

    /// Appends `stmts` to `out`.
    pub fn print(&self, out: &mut String, level: usize, stmts: &[Statement]) -> Result<(), EmitError> {
        for stmt in stmts {
            self.print_one(out, level, stmt)?;
        }
        Ok(())
    }

    fn print_one(&self, out: &mut String, level: usize, stmt: &Statement) -> Result<(), EmitError> {
        if let Some(target) = self.filter {
            if !visit::list_targets(std::slice::from_ref(stmt)).contains(&target) {
                return Ok(());
            }
        }
        let tabs = indent(level);
        match stmt {
            Statement::Assign { target, value } => {
                let op = match self.mode {
                    AssignMode::Blocking => "=",
                    AssignMode::NonBlocking => "<=",
                    AssignMode::BySignal if visit::is_variable(self.design, target)? => "=",
                    AssignMode::BySignal => "<=",
                };
                out.push_str(&format!(
                    "{tabs}{} {op} {};\n",
                    self.exprs.print(target)?,
                    self.exprs.print(value)?
                ));
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                out.push_str(&format!("{tabs}if ({}) begin\n", self.exprs.print(condition)?));
                self.print(out, level + 1, then_body)?;
                if !else_body.is_empty() {
                    out.push_str(&format!("{tabs}end else begin\n"));
                    self.print(out, level + 1, else_body)?;
                }
                out.push_str(&format!("{tabs}end\n"));
            }
            Statement::Case { test, arms } => {
                if arms.is_empty() {
                    return Ok(());
                }
                out.push_str(&format!("{tabs}case ({})\n", self.exprs.print(test)?));
                let mut valued: Vec<_> = arms
                    .iter()
                    .filter_map(|arm| match &arm.key {
                        CaseKey::Value(c) => Some((c, &arm.body)),
                        CaseKey::Default => None,
                    })
                    .collect();
                valued.sort_by(|a, b| a.0.value().cmp(b.0.value()));
                let inner = indent(level + 1);
                for (key, body) in valued {
                    out.push_str(&format!("{inner}{}: begin\n", print_constant(key)));
                    self.print(out, level + 2, body)?;
                    out.push_str(&format!("{inner}end\n"));
                }
                if let Some(arm) = arms.iter().find(|arm| arm.key == CaseKey::Default) {
                    out.push_str(&format!("{inner}default: begin\n"));
                    self.print(out, level + 2, &arm.body)?;
                    out.push_str(&format!("{inner}end\n"));
                }
                out.push_str(&format!("{tabs}endcase\n"));
            }
        }
        Ok(())
    }
}
