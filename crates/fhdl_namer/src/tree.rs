//! Backtrace tries and per-generation name computation.
//!
//! Every signal of a generation is inserted into a trie keyed by the names
//! of its backtrace entries. Names are assembled from the trie nodes whose
//! `use_name` flag is set. When two signals still end up with the same
//! name, the nodes on their paths that were entered by several instances
//! are split by instance number and the trie is rebuilt. Anything left after
//! that is told apart by creation order.

use fhdl_common::{FhdlResult, Ident, InternalError};
use fhdl_ir::{BacktraceEntry, Design, SignalId};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashSet};

const ROOT: usize = 0;

/// Trie edge label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
enum Key {
    Name(Ident),
    Numbered(Ident, u32),
}

#[derive(Debug, Default)]
struct Node {
    /// Signals passing through or ending at this node.
    signal_count: usize,
    /// Instance numbers seen on the edge into this node.
    numbers: BTreeSet<u32>,
    use_name: bool,
    use_number: bool,
    /// Sorted instance numbers of the unsplit node, for numbered edges.
    all_numbers: Vec<u32>,
    children: IndexMap<Key, usize>,
}

/// Which step of [`name_generation`] made the names unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    Basic,
    SplitByNumber,
    SequenceSuffix,
}

impl Strategy {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Strategy::Basic => "basic",
            Strategy::SplitByNumber => "split-by-number",
            Strategy::SequenceSuffix => "sequence-suffix",
        }
    }
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Builds a trie from backtraces. Edges whose node in `basic` carries
    /// `use_number` are keyed by name and instance number.
    fn build(backtraces: &[&[BacktraceEntry]], basic: Option<&Tree>) -> FhdlResult<Tree> {
        let mut tree = Tree {
            nodes: vec![Node::default()],
        };
        for backtrace in backtraces {
            let mut cur = ROOT;
            let mut cur_basic = ROOT;
            tree.nodes[ROOT].signal_count += 1;
            for entry in backtrace.iter() {
                let split = match basic {
                    Some(b) => {
                        cur_basic = b.child(cur_basic, Key::Name(entry.name))?;
                        let node = &b.nodes[cur_basic];
                        node.use_number.then_some(&node.numbers)
                    }
                    None => None,
                };
                let key = match split {
                    Some(_) => Key::Numbered(entry.name, entry.index),
                    None => Key::Name(entry.name),
                };
                cur = tree.child_or_insert(cur, key);
                let node = &mut tree.nodes[cur];
                node.numbers.insert(entry.index);
                if let Some(numbers) = split {
                    node.all_numbers = numbers.iter().copied().collect();
                }
                node.signal_count += 1;
            }
        }
        Ok(tree)
    }

    fn child(&self, node: usize, key: Key) -> FhdlResult<usize> {
        self.nodes[node]
            .children
            .get(&key)
            .copied()
            .ok_or_else(|| InternalError::new("backtrace entry missing from naming tree"))
    }

    fn child_or_insert(&mut self, node: usize, key: Key) -> usize {
        if let Some(&c) = self.nodes[node].children.get(&key) {
            return c;
        }
        let c = self.nodes.len();
        self.nodes.push(Node::default());
        self.nodes[node].children.insert(key, c);
        c
    }

    /// Decides bottom-up which nodes contribute their name.
    ///
    /// Returns the name paths produced below `node`. A node where signals
    /// end uses its name and produces its own key; two children whose
    /// returned path sets overlap both use their name, and the paths of a
    /// child using its name are prefixed with its key.
    fn set_use_name(&mut self, node: usize, own: Option<Key>) -> HashSet<Vec<Key>> {
        let children: Vec<(Key, usize)> = self.nodes[node].children.iter().map(|(k, c)| (*k, *c)).collect();
        let below: Vec<HashSet<Vec<Key>>> = children.iter().map(|&(k, c)| self.set_use_name(c, Some(k))).collect();

        for i in 0..children.len() {
            for j in i + 1..children.len() {
                if !below[i].is_disjoint(&below[j]) {
                    self.nodes[children[i].1].use_name = true;
                    self.nodes[children[j].1].use_name = true;
                }
            }
        }

        let mut paths = HashSet::new();
        for (&(key, c), set) in children.iter().zip(below) {
            if self.nodes[c].use_name {
                paths.extend(set.into_iter().map(|p| {
                    let mut full = Vec::with_capacity(p.len() + 1);
                    full.push(key);
                    full.extend(p);
                    full
                }));
            } else {
                paths.extend(set);
            }
        }

        let in_children: usize = children.iter().map(|&(_, c)| self.nodes[c].signal_count).sum();
        let n = &mut self.nodes[node];
        if n.signal_count > in_children {
            n.use_name = true;
            paths.insert(own.into_iter().collect());
        }
        paths
    }

    /// Assembles the name of one backtrace.
    fn name(&self, design: &Design, backtrace: &[BacktraceEntry]) -> FhdlResult<String> {
        let mut parts = Vec::new();
        let mut cur = ROOT;
        for entry in backtrace {
            let numbered = self.nodes[cur]
                .children
                .get(&Key::Numbered(entry.name, entry.index))
                .copied();
            let (next, numbered) = match numbered {
                Some(c) => (c, true),
                None => (self.child(cur, Key::Name(entry.name))?, false),
            };
            cur = next;
            let node = &self.nodes[cur];
            if !node.use_name {
                continue;
            }
            let mut part = design.resolve(entry.name).to_string();
            if numbered {
                let pos = node
                    .all_numbers
                    .binary_search(&entry.index)
                    .map_err(|_| InternalError::new("instance number missing from split node"))?;
                part.push_str(&pos.to_string());
            }
            parts.push(part);
        }
        Ok(parts.join("_"))
    }

    /// Marks the nodes on the given paths that several instances entered
    /// but that hold more signals than instances. Returns whether any new
    /// node was marked.
    fn set_use_number(&mut self, backtraces: &[&[BacktraceEntry]]) -> FhdlResult<bool> {
        let mut changed = false;
        for backtrace in backtraces {
            let mut cur = ROOT;
            for entry in backtrace.iter() {
                cur = self.child(cur, Key::Name(entry.name))?;
                let node = &mut self.nodes[cur];
                if !node.use_number && node.signal_count > node.numbers.len() && node.numbers.len() > 1 {
                    node.use_number = true;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

/// Indices of members sharing a name with another member, in member order.
fn conflicting(names: &[String]) -> Vec<usize> {
    let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, name) in names.iter().enumerate() {
        by_name.entry(name.as_str()).or_default().push(i);
    }
    let mut out: Vec<usize> = by_name.into_values().filter(|v| v.len() > 1).flatten().collect();
    out.sort_unstable();
    out
}

/// Names one generation of signals.
///
/// `members` must be sorted by creation order. The returned names are
/// parallel to `members` and pairwise distinct.
pub(crate) fn name_generation(design: &Design, members: &[SignalId]) -> FhdlResult<(Vec<String>, Strategy)> {
    let backtraces: Vec<&[BacktraceEntry]> = members.iter().map(|&id| design[id].backtrace.as_slice()).collect();

    let mut basic = Tree::build(&backtraces, None)?;
    basic.set_use_name(ROOT, None);
    let mut names = backtraces
        .iter()
        .map(|bt| basic.name(design, bt))
        .collect::<FhdlResult<Vec<_>>>()?;
    let mut strategy = Strategy::Basic;

    loop {
        let clashing = conflicting(&names);
        if clashing.is_empty() {
            return Ok((names, strategy));
        }
        let clashing: Vec<&[BacktraceEntry]> = clashing.iter().map(|&i| backtraces[i]).collect();
        if !basic.set_use_number(&clashing)? {
            break;
        }
        let mut numbered = Tree::build(&backtraces, Some(&basic))?;
        numbered.set_use_name(ROOT, None);
        names = backtraces
            .iter()
            .map(|bt| numbered.name(design, bt))
            .collect::<FhdlResult<Vec<_>>>()?;
        strategy = Strategy::SplitByNumber;
    }

    let mut by_name: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, name) in names.iter().enumerate() {
        by_name.entry(name.clone()).or_default().push(i);
    }
    for group in by_name.into_values().filter(|g| g.len() > 1) {
        let mut group = group;
        group.sort_by_key(|&i| design[members[i]].sequence);
        for (n, i) in group.into_iter().enumerate() {
            names[i].push_str(&n.to_string());
        }
    }
    Ok((names, Strategy::SequenceSuffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_of(design: &Design, members: &[SignalId]) -> (Vec<String>, Strategy) {
        name_generation(design, members).unwrap()
    }

    #[test]
    fn flat_signals_use_leaf_names() {
        let mut d = Design::new();
        let a = d.signal("a", 1).unwrap();
        let b = d.signal("b", 1).unwrap();
        let (names, strategy) = names_of(&d, &[a, b]);
        assert_eq!(names, ["a", "b"]);
        assert_eq!(strategy, Strategy::Basic);
    }

    #[test]
    fn pass_through_scopes_are_dropped() {
        let mut d = Design::new();
        let x = d.scope("core", |d| d.signal("x", 4).unwrap());
        let y = d.scope("core", |d| d.signal("y", 4).unwrap());
        let (names, _) = names_of(&d, &[x, y]);
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn colliding_siblings_keep_scope_names() {
        let mut d = Design::new();
        let a = d.scope("rx", |d| d.signal("data", 8).unwrap());
        let b = d.scope("tx", |d| d.signal("data", 8).unwrap());
        let (names, strategy) = names_of(&d, &[a, b]);
        assert_eq!(names, ["rx_data", "tx_data"]);
        assert_eq!(strategy, Strategy::Basic);
    }

    #[test]
    fn signal_ending_at_inner_node_keeps_its_scope() {
        let mut d = Design::new();
        let outer = d.signal("fifo", 1).unwrap();
        let inner = d.scope("fifo", |d| d.signal("level", 4).unwrap());
        let (names, _) = names_of(&d, &[outer, inner]);
        assert_eq!(names, ["fifo", "fifo_level"]);
    }

    #[test]
    fn leaf_and_nested_leaf_with_same_name_fall_back_to_creation_order() {
        let mut d = Design::new();
        let top = d.signal("x", 1).unwrap();
        let nested = d.scope("sub", |d| d.signal("x", 1).unwrap());
        let (names, strategy) = names_of(&d, &[top, nested]);
        assert_eq!(names, ["x0", "x1"]);
        assert_eq!(strategy, Strategy::SequenceSuffix);
    }

    #[test]
    fn siblings_compare_unprefixed_name_sets() {
        let mut d = Design::new();
        let ax = d.scope("A", |d| d.signal("x", 1).unwrap());
        let bx = d.scope("B", |d| d.signal("x", 1).unwrap());
        let cax = d.scope("C", |d| d.scope("A", |d| d.signal("x", 1).unwrap()));
        let cdx = d.scope("C", |d| d.scope("D", |d| d.signal("x", 1).unwrap()));
        let (names, strategy) = names_of(&d, &[ax, bx, cax, cdx]);
        assert_eq!(names, ["A_x0", "B_x", "A_x1", "D_x"]);
        assert_eq!(strategy, Strategy::SequenceSuffix);
    }

    #[test]
    fn two_instances_of_one_submodule() {
        let mut d = Design::new();
        let mut members = Vec::new();
        for _ in 0..2 {
            d.scope("ctr", |d| {
                members.push(d.signal("enable", 1).unwrap());
                members.push(d.signal("count", 8).unwrap());
            });
        }
        let (names, strategy) = names_of(&d, &members);
        assert_eq!(names, ["ctr0_enable", "ctr0_count", "ctr1_enable", "ctr1_count"]);
        assert_eq!(strategy, Strategy::SplitByNumber);
    }

    #[test]
    fn instances_split_by_number() {
        let mut d = Design::new();
        let (x0, y0) = d.scope("sub", |d| (d.signal("x", 1).unwrap(), d.signal("y", 1).unwrap()));
        let x1 = d.scope("sub", |d| d.signal("x", 1).unwrap());
        let (names, strategy) = names_of(&d, &[x0, y0, x1]);
        assert_eq!(names, ["sub0_x", "sub0_y", "sub1_x"]);
        assert_eq!(strategy, Strategy::SplitByNumber);
    }

    #[test]
    fn identical_paths_fall_back_to_creation_order() {
        let mut d = Design::new();
        let a = d.scope("sub", |d| d.signal("x", 1).unwrap());
        let b = d.scope("sub", |d| d.signal("x", 1).unwrap());
        let (names, strategy) = names_of(&d, &[a, b]);
        assert_eq!(names, ["x0", "x1"]);
        assert_eq!(strategy, Strategy::SequenceSuffix);
    }

    #[test]
    fn conflicting_lists_all_members_of_a_clash() {
        let names = vec!["a".to_string(), "b".into(), "a".into(), "c".into(), "b".into()];
        assert_eq!(conflicting(&names), [0, 1, 2, 4]);
    }
}
