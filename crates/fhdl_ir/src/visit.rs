//! Tree utilities over expressions, statements and fragments.

use crate::design::Design;
use crate::error::IrError;
use crate::expr::Expr;
use crate::fragment::Fragment;
use crate::ids::SignalId;
use crate::special::IoDirection;
use crate::stmt::Statement;
use std::collections::BTreeSet;

/// Calls `f` on every expression directly held by `stmt` and its children.
///
/// The flag passed along is `true` for assignment targets.
pub fn for_each_expr<'a>(stmt: &'a Statement, f: &mut impl FnMut(&'a Expr, bool)) {
    match stmt {
        Statement::Assign { target, value } => {
            f(target, true);
            f(value, false);
        }
        Statement::If {
            condition,
            then_body,
            else_body,
        } => {
            f(condition, false);
            for s in then_body.iter().chain(else_body) {
                for_each_expr(s, f);
            }
        }
        Statement::Case { test, arms } => {
            f(test, false);
            for arm in arms {
                for s in &arm.body {
                    for_each_expr(s, f);
                }
            }
        }
    }
}

/// Mutable counterpart of [`for_each_expr`].
pub fn for_each_expr_mut(stmt: &mut Statement, f: &mut impl FnMut(&mut Expr, bool)) {
    match stmt {
        Statement::Assign { target, value } => {
            f(target, true);
            f(value, false);
        }
        Statement::If {
            condition,
            then_body,
            else_body,
        } => {
            f(condition, false);
            for s in then_body.iter_mut().chain(else_body.iter_mut()) {
                for_each_expr_mut(s, f);
            }
        }
        Statement::Case { test, arms } => {
            f(test, false);
            for arm in arms {
                for s in &mut arm.body {
                    for_each_expr_mut(s, f);
                }
            }
        }
    }
}

/// Signals read or written anywhere in `expr`.
pub fn expr_signals(expr: &Expr, out: &mut BTreeSet<SignalId>) {
    expr.walk(&mut |e| {
        if let Expr::Signal(id) = e {
            out.insert(*id);
        }
    });
}

/// Signals written when `expr` is used as an assignment target.
///
/// Index expressions (part offsets, array keys) are not targets.
pub fn expr_targets(expr: &Expr, out: &mut BTreeSet<SignalId>) {
    match expr {
        Expr::Signal(id) => {
            out.insert(*id);
        }
        Expr::Slice { value, .. } | Expr::Part { value, .. } => expr_targets(value, out),
        Expr::Cat(items) => items.iter().for_each(|e| expr_targets(e, out)),
        Expr::ArrayProxy { choices, .. } => choices.iter().for_each(|e| expr_targets(e, out)),
        _ => {}
    }
}

/// Signals read when `expr` is used as an assignment target.
fn target_inputs(expr: &Expr, out: &mut BTreeSet<SignalId>) {
    match expr {
        Expr::Slice { value, .. } => target_inputs(value, out),
        Expr::Part { value, offset, .. } => {
            target_inputs(value, out);
            expr_signals(offset, out);
        }
        Expr::Cat(items) => items.iter().for_each(|e| target_inputs(e, out)),
        Expr::ArrayProxy { choices, key } => {
            choices.iter().for_each(|e| target_inputs(e, out));
            expr_signals(key, out);
        }
        _ => {}
    }
}

/// Every signal mentioned by `stmts`.
pub fn list_signals(stmts: &[Statement]) -> BTreeSet<SignalId> {
    let mut out = BTreeSet::new();
    for stmt in stmts {
        for_each_expr(stmt, &mut |e, _| expr_signals(e, &mut out));
    }
    out
}

/// Every signal assigned by `stmts`.
pub fn list_targets(stmts: &[Statement]) -> BTreeSet<SignalId> {
    let mut out = BTreeSet::new();
    for stmt in stmts {
        for_each_expr(stmt, &mut |e, is_target| {
            if is_target {
                expr_targets(e, &mut out);
            }
        });
    }
    out
}

/// Every signal read by `stmts`, including conditions and target indices.
pub fn list_inputs(stmts: &[Statement]) -> BTreeSet<SignalId> {
    let mut out = BTreeSet::new();
    for stmt in stmts {
        for_each_expr(stmt, &mut |e, is_target| {
            if is_target {
                target_inputs(e, &mut out);
            } else {
                expr_signals(e, &mut out);
            }
        });
    }
    out
}

/// Clusters statements whose target sets overlap, transitively.
///
/// Statements keep their original relative order inside each group.
pub fn group_by_targets(stmts: &[Statement]) -> Vec<(BTreeSet<SignalId>, Vec<Statement>)> {
    let mut groups: Vec<(BTreeSet<SignalId>, Vec<(usize, &Statement)>)> = Vec::new();
    let mut seen = BTreeSet::new();
    for (order, stmt) in stmts.iter().enumerate() {
        let mut targets = list_targets(std::slice::from_ref(stmt));
        let mut group = vec![(order, stmt)];
        let disjoint = targets.is_disjoint(&seen);
        seen.extend(targets.iter().copied());
        if !disjoint {
            let old_groups = std::mem::take(&mut groups);
            for (old_targets, old_group) in old_groups {
                if targets.is_disjoint(&old_targets) {
                    groups.push((old_targets, old_group));
                } else {
                    targets.extend(old_targets);
                    group.extend(old_group);
                }
            }
        }
        groups.push((targets, group));
    }
    groups
        .into_iter()
        .map(|(targets, mut group)| {
            group.sort_by_key(|(order, _)| *order);
            (targets, group.into_iter().map(|(_, s)| s.clone()).collect())
        })
        .collect()
}

/// Whether assigning to `target` must use blocking assignment.
///
/// Concatenations must not mix variable and non-variable members.
pub fn is_variable(design: &Design, target: &Expr) -> Result<bool, IrError> {
    match target {
        Expr::Signal(id) => Ok(design[*id].variable),
        Expr::Slice { value, .. } | Expr::Part { value, .. } => is_variable(design, value),
        Expr::Cat(items) => {
            let mut flags = items.iter().map(|e| is_variable(design, e));
            let Some(first) = flags.next().transpose()? else {
                return Ok(false);
            };
            for flag in flags {
                if flag? != first {
                    return Err(IrError::MixedVariableTargets);
                }
            }
            Ok(first)
        }
        _ => Ok(false),
    }
}

/// Domains referenced by clocked statements and clock/reset expressions.
pub fn list_clock_domains_expr(fragment: &Fragment) -> BTreeSet<String> {
    let mut out: BTreeSet<String> = fragment.sync.keys().cloned().collect();
    let mut visit = |e: &Expr| {
        e.walk(&mut |n| match n {
            Expr::ClockSignal(d) | Expr::ResetSignal { domain: d, .. } => {
                out.insert(d.clone());
            }
            _ => {}
        })
    };
    for stmt in fragment.comb.iter().chain(fragment.sync.values().flatten()) {
        for_each_expr(stmt, &mut |e, _| visit(e));
    }
    for special in &fragment.specials {
        for (e, _) in special.expressions() {
            visit(e);
        }
    }
    out
}

/// Every domain the fragment uses or declares.
pub fn list_clock_domains(fragment: &Fragment) -> BTreeSet<String> {
    let mut out = list_clock_domains_expr(fragment);
    for special in &fragment.specials {
        out.extend(special.named_domains());
    }
    out.extend(fragment.clock_domains.iter().map(|cd| cd.name.clone()));
    out
}

/// Signals connected to specials in the selected directions.
pub fn list_special_ios(fragment: &Fragment, ins: bool, outs: bool, inouts: bool) -> BTreeSet<SignalId> {
    let mut out = BTreeSet::new();
    for special in &fragment.specials {
        for (e, dir) in special.expressions() {
            let wanted = match dir {
                IoDirection::Input => ins,
                IoDirection::Output => outs,
                IoDirection::InOut => inouts,
            };
            if wanted {
                expr_signals(e, &mut out);
            }
        }
    }
    out
}

/// Signals assigned by the fragment's own statements.
pub fn fragment_targets(fragment: &Fragment) -> BTreeSet<SignalId> {
    let mut out = list_targets(&fragment.comb);
    for stmts in fragment.sync.values() {
        out.extend(list_targets(stmts));
    }
    out
}

/// Every signal mentioned by the fragment's statements and specials.
pub fn fragment_signals(fragment: &Fragment) -> BTreeSet<SignalId> {
    let mut out = list_signals(&fragment.comb);
    for stmts in fragment.sync.values() {
        out.extend(list_signals(stmts));
    }
    out.extend(list_special_ios(fragment, true, true, true));
    out
}
