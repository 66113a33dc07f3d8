//! Clock domain resolution and renaming.

use crate::basics::sorted_names;
use crate::error::LowerError;
use fhdl_ir::{visit, Design, Expr, Fragment, SignalId};

/// Declares every domain the fragment uses without declaring it.
///
/// With `create` unset an undeclared domain is an error. Returns the clock
/// and reset signals of the created domains; they become module inputs.
pub fn resolve_clock_domains(
    design: &mut Design,
    fragment: &mut Fragment,
    create: bool,
) -> Result<Vec<SignalId>, LowerError> {
    let mut ios = Vec::new();
    for name in visit::list_clock_domains(fragment) {
        if fragment.clock_domain(&name).is_some() {
            continue;
        }
        if !create {
            let available = sorted_names(&fragment.clock_domains);
            tracing::error!(domain = %name, available = %available.join(", "), "unresolved clock domain");
            return Err(LowerError::UnresolvedClockDomain { domain: name, available });
        }
        let cd = design.clock_domain(&name, false)?;
        // `clock_domain` strips a `cd_` prefix; keep the name the fragment uses.
        let cd = fhdl_ir::ClockDomain { name, ..cd };
        tracing::debug!(domain = %cd.name, "created clock domain");
        ios.push(cd.clk);
        ios.extend(cd.rst);
        fragment.clock_domains.push(cd);
    }
    Ok(ios)
}

fn rename_expr(expr: &mut Expr, old: &str, new: &str) {
    expr.walk_mut(&mut |e| match e {
        Expr::ClockSignal(d) | Expr::ResetSignal { domain: d, .. } if *d == old => *d = new.to_string(),
        _ => {}
    });
}

/// Renames domain `old` to `new` everywhere in `fragment`: synchronous
/// blocks, clock and reset references, specials and declarations.
///
/// Statements already clocked by `new` keep their place ahead of the
/// renamed ones.
pub fn rename_clock_domain(fragment: &mut Fragment, old: &str, new: &str) {
    if old == new {
        return;
    }
    if let Some(stmts) = fragment.sync.remove(old) {
        fragment.sync.entry(new.to_string()).or_default().extend(stmts);
    }
    for stmt in fragment.comb.iter_mut().chain(fragment.sync.values_mut().flatten()) {
        visit::for_each_expr_mut(stmt, &mut |e, _| rename_expr(e, old, new));
    }
    for special in &mut fragment.specials {
        for (e, _) in special.expressions_mut() {
            rename_expr(e, old, new);
        }
        special.rename_named_domain(old, new);
    }
    for cd in &mut fragment.clock_domains {
        if cd.name == old {
            cd.name = new.to_string();
        }
    }
    for sub in &mut fragment.subfragments {
        rename_clock_domain(sub, old, new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhdl_ir::{MultiReg, Statement};

    #[test]
    fn missing_domains_are_created() {
        let mut d = Design::new();
        let a = d.signal("a", 1).unwrap();
        let mut f = Fragment::new();
        f.add_sync("sys", [a.assign(!a)]);
        let ios = resolve_clock_domains(&mut d, &mut f, true).unwrap();
        assert_eq!(ios.len(), 2);
        let cd = f.clock_domain("sys").unwrap();
        assert_eq!(d[cd.clk].name_override.as_deref(), Some("sys_clk"));
        assert_eq!(d[cd.rst.unwrap()].name_override.as_deref(), Some("sys_rst"));
    }

    #[test]
    fn missing_domain_without_creation_fails() {
        let mut d = Design::new();
        let a = d.signal("a", 1).unwrap();
        let mut f = Fragment::new();
        f.clock_domains.push(d.clock_domain("sys", false).unwrap());
        f.add_sync("pix", [a.assign(1)]);
        let err = resolve_clock_domains(&mut d, &mut f, false).unwrap_err();
        assert_eq!(
            err,
            LowerError::UnresolvedClockDomain {
                domain: "pix".into(),
                available: vec!["sys".into()],
            }
        );
    }

    #[test]
    fn declared_domains_are_kept() {
        let mut d = Design::new();
        let mut f = Fragment::new();
        f.clock_domains.push(d.clock_domain("sys", true).unwrap());
        assert!(resolve_clock_domains(&mut d, &mut f, true).unwrap().is_empty());
        assert_eq!(f.clock_domains.len(), 1);
    }

    #[test]
    fn rename_moves_everything() {
        let mut d = Design::new();
        let a = d.signal("a", 1).unwrap();
        let b = d.signal("b", 1).unwrap();
        let mut f = Fragment::new();
        f.add_sync("sys", [a.assign(1)]);
        f.add_sync("pix", [b.assign(1)]);
        f.add_comb([a.assign(Expr::clock("sys"))]);
        f.add_special(d.special(MultiReg::new(a, b, "sys")));
        f.clock_domains.push(d.clock_domain("sys", false).unwrap());

        rename_clock_domain(&mut f, "sys", "pix");
        assert!(!f.sync.contains_key("sys"));
        assert_eq!(f.sync["pix"].len(), 2);
        assert!(matches!(&f.comb[0], Statement::Assign { value: Expr::ClockSignal(dom), .. } if dom == "pix"));
        assert!(f.specials[0].named_domains().contains("pix"));
        assert_eq!(f.clock_domains[0].name, "pix");
        assert!(!visit::list_clock_domains(&f).contains("sys"));
    }
}
