//! Synchronous reset insertion.

use fhdl_ir::{visit, ClockDomain, Design, Expr, Fragment, If, Statement};

/// Reset assignments for every non-reset-less target of `stmts`, in signal
/// creation order.
pub fn generate_reset(design: &Design, stmts: &[Statement]) -> Vec<Statement> {
    let mut targets: Vec<_> = visit::list_targets(stmts)
        .into_iter()
        .filter(|t| !design[*t].reset_less)
        .collect();
    targets.sort_by_key(|t| design[*t].sequence);
    targets
        .into_iter()
        .map(|t| t.assign(design[t].reset.clone()))
        .collect()
}

/// Wraps `stmts` as `if reset { targets <- reset values } else { stmts }`.
///
/// Returns `stmts` untouched when no target has a reset.
pub fn insert_reset(design: &Design, reset: Expr, stmts: Vec<Statement>) -> Vec<Statement> {
    let resets = generate_reset(design, &stmts);
    if resets.is_empty() {
        return stmts;
    }
    vec![If::new(reset, resets).otherwise(stmts).into()]
}

/// Inserts resets into every synchronous block whose domain has a reset.
///
/// `domains` is the table the fragment will be emitted with; it is passed
/// separately so fragments produced by lowering can be normalized against
/// the enclosing design. Blocks of reset-less domains are left alone.
/// Returns the number of blocks rewritten.
pub fn insert_resets(design: &Design, fragment: &mut Fragment, domains: &[ClockDomain]) -> usize {
    let mut rewritten = 0;
    for (name, stmts) in fragment.sync.iter_mut() {
        let has_reset = domains.iter().any(|cd| &cd.name == name && cd.rst.is_some());
        if !has_reset {
            continue;
        }
        let resets = generate_reset(design, stmts);
        if resets.is_empty() {
            continue;
        }
        let body = std::mem::take(stmts);
        stmts.push(If::new(Expr::reset(name.clone()), resets).otherwise(body).into());
        rewritten += 1;
    }
    tracing::debug!(blocks = rewritten, "inserted synchronous resets");
    rewritten
}
