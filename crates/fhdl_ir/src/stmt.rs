//! Statements: assignments, conditionals and case selection.

use crate::error::IrError;
use crate::expr::Expr;
use crate::ids::SignalId;
use crate::shape::Constant;
use serde::{Deserialize, Serialize};

/// A statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// `target <- value`.
    Assign {
        /// Left-hand side; restricted to signals, slices, parts,
        /// concatenations and arrays of those.
        target: Expr,
        /// Right-hand side.
        value: Expr,
    },
    /// A two-way conditional.
    If {
        /// Condition, true when non-zero.
        condition: Expr,
        /// Executed when the condition holds.
        then_body: Vec<Statement>,
        /// Executed otherwise.
        else_body: Vec<Statement>,
    },
    /// A multi-way selection on a test value.
    Case {
        /// Value being matched.
        test: Expr,
        /// Arms in insertion order; constant keys are unique.
        arms: Vec<CaseArm>,
    },
}

/// The key of a [`Statement::Case`] arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseKey {
    /// Matches one constant value.
    Value(Constant),
    /// Matches anything no other arm matches.
    Default,
}

/// One arm of a [`Statement::Case`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseArm {
    /// Arm key.
    pub key: CaseKey,
    /// Statements executed when the key matches.
    pub body: Vec<Statement>,
}

/// Fails with [`IrError::UnsupportedTarget`] unless `target` may be assigned.
pub fn check_target(target: &Expr) -> Result<(), IrError> {
    match target {
        Expr::Signal(_) => Ok(()),
        Expr::Slice { value, .. } | Expr::Part { value, .. } => check_target(value),
        Expr::Cat(items) => items.iter().try_for_each(check_target),
        Expr::ArrayProxy { choices, .. } => choices.iter().try_for_each(check_target),
        other => Err(IrError::UnsupportedTarget {
            kind: other.kind_name(),
        }),
    }
}

impl Statement {
    /// `target <- value`, rejecting targets that cannot be assigned.
    pub fn assign(target: impl Into<Expr>, value: impl Into<Expr>) -> Result<Statement, IrError> {
        let target = target.into();
        check_target(&target)?;
        Ok(Statement::Assign {
            target,
            value: value.into(),
        })
    }
}

impl Expr {
    /// Assigns `value` to this expression.
    pub fn assign(self, value: impl Into<Expr>) -> Result<Statement, IrError> {
        Statement::assign(self, value)
    }
}

impl SignalId {
    /// Assigns `value` to this signal. Never fails.
    pub fn assign(self, value: impl Into<Expr>) -> Statement {
        Statement::Assign {
            target: Expr::Signal(self),
            value: value.into(),
        }
    }
}

/// Builder for an `if` / `elif` / `else` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    condition: Expr,
    then_body: Vec<Statement>,
    else_body: Vec<Statement>,
}

impl If {
    /// `if condition { body }`.
    pub fn new(condition: impl Into<Expr>, body: impl IntoIterator<Item = Statement>) -> Self {
        Self {
            condition: condition.into(),
            then_body: body.into_iter().collect(),
            else_body: Vec::new(),
        }
    }

    /// Appends an `else if` to the innermost open else branch.
    pub fn elif(mut self, condition: impl Into<Expr>, body: impl IntoIterator<Item = Statement>) -> Self {
        let clause = Statement::from(If::new(condition, body));
        insert_else(&mut self.else_body, vec![clause]);
        self
    }

    /// Sets the innermost open else branch.
    pub fn otherwise(mut self, body: impl IntoIterator<Item = Statement>) -> Self {
        insert_else(&mut self.else_body, body.into_iter().collect());
        self
    }
}

fn insert_else(else_body: &mut Vec<Statement>, clause: Vec<Statement>) {
    if else_body.is_empty() {
        *else_body = clause;
        return;
    }
    if else_body.len() == 1 {
        if let Statement::If { else_body: inner, .. } = &mut else_body[0] {
            insert_else(inner, clause);
            return;
        }
    }
    else_body.extend(clause);
}

impl From<If> for Statement {
    fn from(b: If) -> Self {
        Statement::If {
            condition: b.condition,
            then_body: b.then_body,
            else_body: b.else_body,
        }
    }
}

/// Builder for a [`Statement::Case`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    test: Expr,
    arms: Vec<CaseArm>,
}

impl Case {
    /// A case on `test` with no arms yet.
    pub fn new(test: impl Into<Expr>) -> Self {
        Self {
            test: test.into(),
            arms: Vec::new(),
        }
    }

    /// Adds or replaces the arm for `key`.
    pub fn arm(mut self, key: impl Into<Constant>, body: impl IntoIterator<Item = Statement>) -> Self {
        self.insert(CaseKey::Value(key.into()), body.into_iter().collect());
        self
    }

    /// Adds or replaces the default arm.
    pub fn default_arm(mut self, body: impl IntoIterator<Item = Statement>) -> Self {
        self.insert(CaseKey::Default, body.into_iter().collect());
        self
    }

    fn insert(&mut self, key: CaseKey, body: Vec<Statement>) {
        match self.arms.iter_mut().find(|arm| same_key(&arm.key, &key)) {
            Some(arm) => arm.body = body,
            None => self.arms.push(CaseArm { key, body }),
        }
    }

    /// Turns one arm into the default arm.
    ///
    /// With `key = None`, an existing default is kept; otherwise the arm with
    /// the largest value becomes the default. The default arm always ends up
    /// last.
    pub fn make_default(mut self, key: Option<Constant>) -> Self {
        let position = match key {
            Some(key) => self
                .arms
                .iter()
                .position(|arm| same_key(&arm.key, &CaseKey::Value(key.clone()))),
            None => self
                .arms
                .iter()
                .position(|arm| arm.key == CaseKey::Default)
                .or_else(|| {
                    self.arms
                        .iter()
                        .enumerate()
                        .filter_map(|(i, arm)| match &arm.key {
                            CaseKey::Value(c) => Some((i, c.value().clone())),
                            CaseKey::Default => None,
                        })
                        .max_by(|a, b| a.1.cmp(&b.1))
                        .map(|(i, _)| i)
                }),
        };
        if let Some(position) = position {
            let mut arm = self.arms.remove(position);
            self.arms.retain(|a| a.key != CaseKey::Default);
            arm.key = CaseKey::Default;
            self.arms.push(arm);
        }
        self
    }
}

fn same_key(a: &CaseKey, b: &CaseKey) -> bool {
    match (a, b) {
        (CaseKey::Default, CaseKey::Default) => true,
        (CaseKey::Value(x), CaseKey::Value(y)) => x.value() == y.value(),
        _ => false,
    }
}

impl From<Case> for Statement {
    fn from(b: Case) -> Self {
        Statement::Case {
            test: b.test,
            arms: b.arms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(n: u32) -> SignalId {
        SignalId::from_raw(n)
    }

    #[test]
    fn assign_accepts_lhs_forms() {
        assert!(Expr::from(sig(0)).slice(0, 2).unwrap().assign(1).is_ok());
        assert!(Expr::cat([sig(0), sig(1)]).assign(0).is_ok());
        assert!(Expr::array([sig(0), sig(1)], sig(2)).unwrap().assign(0).is_ok());
        assert!(Expr::from(sig(0)).part(sig(3), 2).assign(0).is_ok());
    }

    #[test]
    fn assign_rejects_operators() {
        let err = (sig(0) + sig(1)).assign(0).unwrap_err();
        assert_eq!(err, IrError::UnsupportedTarget { kind: "Operator" });
        let err = Expr::from(5).assign(0).unwrap_err();
        assert_eq!(err, IrError::UnsupportedTarget { kind: "Constant" });
        let err = Expr::cat([Expr::from(sig(0)), Expr::clock("sys")])
            .assign(0)
            .unwrap_err();
        assert_eq!(err, IrError::UnsupportedTarget { kind: "ClockSignal" });
    }

    #[test]
    fn elif_chain_nests() {
        let stmt: Statement = If::new(sig(0), [sig(3).assign(1)])
            .elif(sig(1), [sig(3).assign(2)])
            .otherwise([sig(3).assign(3)])
            .into();
        let Statement::If { else_body, .. } = stmt else {
            panic!("expected if");
        };
        assert_eq!(else_body.len(), 1);
        let Statement::If {
            condition,
            else_body: inner,
            ..
        } = &else_body[0]
        else {
            panic!("expected nested if");
        };
        assert_eq!(condition, &Expr::Signal(sig(1)));
        assert_eq!(inner, &vec![sig(3).assign(3)]);
    }

    #[test]
    fn case_replaces_duplicate_keys() {
        let stmt: Statement = Case::new(sig(0))
            .arm(1, [sig(1).assign(1)])
            .arm(1, [sig(1).assign(2)])
            .into();
        let Statement::Case { arms, .. } = stmt else {
            panic!("expected case");
        };
        assert_eq!(arms.len(), 1);
        assert_eq!(arms[0].body, vec![sig(1).assign(2)]);
    }

    #[test]
    fn make_default_picks_largest_key() {
        let stmt: Statement = Case::new(sig(0))
            .arm(2, [sig(1).assign(2)])
            .arm(5, [sig(1).assign(5)])
            .arm(0, [sig(1).assign(0)])
            .make_default(None)
            .into();
        let Statement::Case { arms, .. } = stmt else {
            panic!("expected case");
        };
        assert_eq!(arms.len(), 3);
        assert_eq!(arms[2].key, CaseKey::Default);
        assert_eq!(arms[2].body, vec![sig(1).assign(5)]);
    }

    #[test]
    fn make_default_keeps_existing_default() {
        let stmt: Statement = Case::new(sig(0))
            .default_arm([sig(1).assign(9)])
            .arm(5, [sig(1).assign(5)])
            .make_default(None)
            .into();
        let Statement::Case { arms, .. } = stmt else {
            panic!("expected case");
        };
        assert_eq!(arms[0].key, CaseKey::Value(Constant::new(5)));
        assert_eq!(arms[1].body, vec![sig(1).assign(9)]);
    }
}
