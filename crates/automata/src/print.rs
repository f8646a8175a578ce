//! Textual renderings: the human-readable automaton dump, the
//! logic-program forms of automata and runs, and the Graphviz form of a
//! run.
//!
//! The `Display` impl on [`RabinAutomaton`] doubles as the tool's input
//! language, so its exact shape matters: what it prints, the reader
//! parses back.

use core::fmt::{self, Display, Formatter, Write};

use rustc_hash::FxHashMap;

use crate::automaton::{Acceptance, RabinAutomaton};
use crate::run::{Node, Run};

impl Display for Acceptance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "( ")?;
        if self.l().is_empty() {
            f.write_str("none ")?;
        } else {
            for q in self.l().iter() {
                write!(f, "{q} ")?;
            }
        }
        f.write_str(", ")?;
        if self.u().is_empty() {
            return f.write_str("none )");
        }
        for q in self.u().iter() {
            write!(f, "{q} ")?;
        }
        f.write_str(")")
    }
}

impl Display for RabinAutomaton {
    /// The human-readable dump, which is also the input language:
    ///
    /// ```text
    /// states := 2
    /// start := 0
    /// transitions :=
    ///     0 > 1 1, 0 > 0 0
    ///     1 > 0 0
    /// acceptances :=
    ///     ( 1 , 0 )
    /// ```
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "states := {}", self.states())?;
        writeln!(f, "start := {}", self.start())?;
        if (0..self.states()).any(|q| !self.transitions(q).is_empty()) {
            writeln!(f, "transitions :=")?;
            for q in 0..self.states() {
                let transitions = self.transitions(q);
                for (i, t) in transitions.iter().enumerate() {
                    if i == 0 {
                        f.write_char('\t')?;
                    }
                    write!(f, "{q} > {} {}", t.left, t.right)?;
                    if i + 1 < transitions.len() {
                        f.write_str(", ")?;
                    } else {
                        f.write_char('\n')?;
                    }
                }
            }
        }
        if !self.conditions().is_empty() {
            writeln!(f, "acceptances :=")?;
            for (i, a) in self.conditions().iter().enumerate() {
                write!(f, "\t{a}")?;
                if i + 1 < self.conditions().len() {
                    f.write_char('\n')?;
                }
            }
        }
        Ok(())
    }
}

/// A logic-program rendering of an automaton.
pub struct LogicProgram<'a> {
    automaton: &'a RabinAutomaton,
}

impl RabinAutomaton {
    /// Render this automaton as logic-program facts.
    pub fn logic_program(&self) -> LogicProgram<'_> {
        LogicProgram { automaton: self }
    }
}

impl LogicProgram<'_> {
    /// Write the facts to `w`.
    pub fn write(&self, w: &mut dyn Write) -> fmt::Result {
        let automaton = self.automaton;
        writeln!(w, "#const n = {} + 1.", automaton.states())?;
        writeln!(w, "state(0..{}).", automaton.states() - 1)?;
        writeln!(w, "start({}).", automaton.start())?;
        for q in 0..automaton.states() {
            let transitions = automaton.transitions(q);
            for (i, t) in transitions.iter().enumerate() {
                write!(w, "transition({q},{},{}).", t.left, t.right)?;
                if i + 1 < transitions.len() {
                    w.write_char(' ')?;
                } else {
                    w.write_char('\n')?;
                }
            }
        }
        for (idx, a) in automaton.conditions().iter().enumerate() {
            for q in a.l().iter() {
                write!(w, "l({idx},{q}). ")?;
            }
            w.write_char('\n')?;
            for q in a.u().iter() {
                write!(w, "u({idx},{q}). ")?;
            }
            if idx + 1 < automaton.conditions().len() {
                w.write_char('\n')?;
            }
        }
        Ok(())
    }
}

impl Display for LogicProgram<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write(f)
    }
}

/// A logic-program rendering of a found run.
///
/// Identifiers are assigned depth-first starting from 0 at the start
/// state's witness root. A graft leaf whose target subtree has not been
/// printed yet first prints the owning root (the dependency root when the
/// target lives inside another state's subtree), then refers to the id
/// the target received.
pub struct RunLogicProgram<'a> {
    run: &'a Run,
}

/// A Graphviz rendering of a found run.
pub struct RunGraphviz<'a> {
    run: &'a Run,
}

impl Run {
    /// Render this run as logic-program facts.
    pub fn logic_program(&self) -> RunLogicProgram<'_> {
        RunLogicProgram { run: self }
    }

    /// Render this run as a Graphviz digraph.
    pub fn graphviz(&self) -> RunGraphviz<'_> {
        RunGraphviz { run: self }
    }
}

impl RunLogicProgram<'_> {
    /// Write the facts to `w`.
    pub fn write(&self, w: &mut dyn Write) -> fmt::Result {
        let Some(root) = self.run.witness(self.run.start()) else {
            debug_assert!(false, "printing a run without a start witness");
            return Ok(());
        };
        let mut free_id = 0u64;
        let mut ids = FxHashMap::default();
        self.node(w, root, &mut free_id, &mut ids)
    }

    fn node(
        &self,
        w: &mut dyn Write,
        n: Node,
        free_id: &mut u64,
        ids: &mut FxHashMap<Node, u64>,
    ) -> fmt::Result {
        let id = *free_id;
        *free_id += 1;
        ids.insert(n, id);
        let node = self.run.node(n);
        write!(w, "has_state({id},{}). ", node.state)?;
        if let (Some(left), Some(right)) = (node.left.expand(), node.right.expand()) {
            writeln!(w, "parent({id},{}).", *free_id)?;
            self.node(w, left, free_id, ids)?;
            w.write_char('\n')?;
            writeln!(w, "parent({id},{}).", *free_id)?;
            return self.node(w, right, free_id, ids);
        }
        if node.graft {
            if let Some(target) = self.run.witness(node.state) {
                if !ids.contains_key(&target) {
                    w.write_char('\n')?;
                    let owner = self.run.dependency(node.state).unwrap_or(target);
                    self.node(w, owner, free_id, ids)?;
                    w.write_char('\n')?;
                }
                if let Some(target_id) = ids.get(&target) {
                    write!(w, "graft({id},{target_id}).")?;
                } else {
                    debug_assert!(false, "graft target missing from its owner's subtree");
                }
            }
        }
        Ok(())
    }
}

impl Display for RunLogicProgram<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write(f)
    }
}

impl RunGraphviz<'_> {
    /// Write the digraph to `w`.
    pub fn write(&self, w: &mut dyn Write) -> fmt::Result {
        let Some(root) = self.run.witness(self.run.start()) else {
            debug_assert!(false, "printing a run without a start witness");
            return Ok(());
        };
        writeln!(w, "digraph {{")?;
        writeln!(w, "    node [shape = circle]")?;
        let mut free_id = 1u64;
        let mut ids = FxHashMap::default();
        self.node(w, root, 0, &mut free_id, &mut ids)?;
        write!(w, "\n}}")
    }

    fn node(
        &self,
        w: &mut dyn Write,
        n: Node,
        id: u64,
        free_id: &mut u64,
        ids: &mut FxHashMap<Node, u64>,
    ) -> fmt::Result {
        ids.insert(n, id);
        let node = self.run.node(n);
        write!(w, "    r{id} [label = \"{}\"", node.state)?;
        if id == 0 {
            // The start witness's root stands out.
            write!(w, ", shape = Mcircle")?;
        }
        write!(w, "]")?;
        if let (Some(left), Some(right)) = (node.left.expand(), node.right.expand()) {
            let left_id = *free_id;
            let right_id = *free_id + 1;
            *free_id += 2;
            w.write_char('\n')?;
            // Invisible helper edges keep twin children side by side.
            writeln!(
                w,
                "                        {{rank = same r{left_id} -> i{id} -> r{right_id} [style=invis]}}"
            )?;
            writeln!(
                w,
                "                        i{id} [label=\"\",width=.1,style=invis]"
            )?;
            writeln!(w, "                        r{id} -> i{id} [style=invis]")?;
            writeln!(w, "    r{id} -> {{ r{left_id} r{right_id} }}")?;
            self.node(w, left, left_id, free_id, ids)?;
            w.write_char('\n')?;
            return self.node(w, right, right_id, free_id, ids);
        }
        if node.graft {
            if let Some(target) = self.run.witness(node.state) {
                w.write_char('\n')?;
                if !ids.contains_key(&target) {
                    let owner = self.run.dependency(node.state).unwrap_or(target);
                    let owner_id = *free_id;
                    *free_id += 1;
                    self.node(w, owner, owner_id, free_id, ids)?;
                    w.write_char('\n')?;
                }
                if let Some(target_id) = ids.get(&target) {
                    write!(w, "    r{id} -> r{target_id} [style=\"dotted\"]")?;
                } else {
                    debug_assert!(false, "graft target missing from its owner's subtree");
                }
            }
        }
        Ok(())
    }
}

impl Display for RunGraphviz<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write(f)
    }
}
