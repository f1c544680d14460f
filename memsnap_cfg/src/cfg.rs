use crate::error::CfgError;
use crate::statement::{NodeKind, Statement};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::fmt::{Formatter, LowerHex};

#[derive(Debug, Default, Copy, Clone, Hash)]
pub struct EmptyEdge;

impl LowerHex for EmptyEdge {
    fn fmt(&self, _: &mut Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}

/// A labelled program point carrying one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CfgNode {
    pub label: usize,
    pub statement: Statement,
}

/// The control-flow graph of one function body.
///
/// Nodes are addressed by petgraph [`NodeIndex`]es; the front-end's labels are
/// kept alongside for display and lookup. A `Cfg` can only be obtained from a
/// [`CfgBuilder`], which checks the structural rules: one entry, exactly one
/// [`Statement::Exit`] node, and every call node paired with one call-return
/// node.
#[derive(Debug, Clone)]
pub struct Cfg {
    graph: DiGraph<CfgNode, EmptyEdge>,
    indices: HashMap<usize, NodeIndex>,
    entry: NodeIndex,
    exit: NodeIndex,
}

impl Cfg {
    pub fn graph(&self) -> &DiGraph<CfgNode, EmptyEdge> {
        &self.graph
    }

    pub fn entry(&self) -> NodeIndex {
        self.entry
    }

    pub fn exit(&self) -> NodeIndex {
        self.exit
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&CfgNode> {
        self.graph.node_weight(idx)
    }

    pub fn statement(&self, idx: NodeIndex) -> Option<&Statement> {
        self.node(idx).map(|n| &n.statement)
    }

    pub fn kind(&self, idx: NodeIndex) -> Option<NodeKind> {
        self.statement(idx).map(Statement::kind)
    }

    pub fn label(&self, idx: NodeIndex) -> Option<usize> {
        self.node(idx).map(|n| n.label)
    }

    pub fn index_of(&self, label: usize) -> Option<NodeIndex> {
        self.indices.get(&label).copied()
    }

    pub fn predecessors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    pub fn successors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    /// The call-return node paired with the call node `idx`.
    pub fn call_return_of(&self, idx: NodeIndex) -> Option<NodeIndex> {
        match self.statement(idx)? {
            Statement::Call { .. } => self.successors(idx).next(),
            _ => None,
        }
    }

    /// The call node paired with the call-return node `idx`.
    pub fn call_of(&self, idx: NodeIndex) -> Option<NodeIndex> {
        match self.statement(idx)? {
            Statement::CallReturn { .. } => self.predecessors(idx).next(),
            _ => None,
        }
    }
}

/// Incrementally assembles a [`Cfg`]. Edges may reference labels whose nodes are
/// added later; everything is resolved and checked in [`CfgBuilder::build`].
#[derive(Debug, Default)]
pub struct CfgBuilder {
    nodes: Vec<CfgNode>,
    edges: Vec<(usize, usize)>,
    entry: Option<usize>,
}

impl CfgBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a straight-line graph: labels `0..n`, each node flowing into the next.
    pub fn sequence<I: IntoIterator<Item = Statement>>(statements: I) -> Result<Cfg, CfgError> {
        let mut builder = Self::new();
        let mut prev = None;
        for (label, statement) in statements.into_iter().enumerate() {
            builder.add_node(label, statement);
            if let Some(p) = prev {
                builder.add_edge(p, label);
            }
            prev = Some(label);
        }
        builder.build()
    }

    pub fn add_node(&mut self, label: usize, statement: Statement) -> &mut Self {
        self.nodes.push(CfgNode { label, statement });
        self
    }

    pub fn add_edge(&mut self, from: usize, to: usize) -> &mut Self {
        self.edges.push((from, to));
        self
    }

    /// Override the entry node. Defaults to the first node added.
    pub fn set_entry(&mut self, label: usize) -> &mut Self {
        self.entry = Some(label);
        self
    }

    pub fn build(self) -> Result<Cfg, CfgError> {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();
        let first = self.nodes.first().map(|n| n.label);
        for node in self.nodes {
            let label = node.label;
            if indices.contains_key(&label) {
                return Err(CfgError::DuplicateLabel(label));
            }
            let idx = graph.add_node(node);
            indices.insert(label, idx);
        }
        for (from, to) in self.edges {
            let from_idx = *indices.get(&from).ok_or(CfgError::UnknownLabel(from))?;
            let to_idx = *indices.get(&to).ok_or(CfgError::UnknownLabel(to))?;
            if graph.find_edge(from_idx, to_idx).is_none() {
                graph.add_edge(from_idx, to_idx, EmptyEdge);
            }
        }
        let entry_label = self.entry.or(first).ok_or(CfgError::EmptyCfg)?;
        let entry = *indices
            .get(&entry_label)
            .ok_or(CfgError::UnknownLabel(entry_label))?;

        let exits: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|i| matches!(graph[*i].statement, Statement::Exit))
            .collect();
        if exits.len() != 1 {
            return Err(CfgError::ExitCount(exits.len()));
        }
        let exit = exits[0];

        let cfg = Cfg {
            graph,
            indices,
            entry,
            exit,
        };
        cfg.check_calls()?;
        Ok(cfg)
    }
}

impl Cfg {
    fn check_calls(&self) -> Result<(), CfgError> {
        for idx in self.nodes() {
            let node = &self.graph[idx];
            match node.statement {
                Statement::Call { .. } => {
                    let succs: Vec<_> = self.successors(idx).collect();
                    let paired = succs.len() == 1
                        && matches!(self.graph[succs[0]].statement, Statement::CallReturn { .. });
                    if !paired {
                        return Err(CfgError::DanglingCall(node.label));
                    }
                }
                Statement::CallReturn { .. } => {
                    let preds: Vec<_> = self.predecessors(idx).collect();
                    let paired = preds.len() == 1
                        && matches!(self.graph[preds[0]].statement, Statement::Call { .. });
                    if !paired {
                        return Err(CfgError::DanglingCallReturn(node.label));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::path::MemoryPath;

    fn diamond() -> Cfg {
        let mut b = CfgBuilder::new();
        b.add_node(0, Statement::Branch(Expr::Any))
            .add_node(1, Statement::assign(MemoryPath::local("x"), Expr::literal(1)))
            .add_node(2, Statement::assign(MemoryPath::local("x"), Expr::literal("a")))
            .add_node(3, Statement::Exit)
            .add_edge(0, 1)
            .add_edge(0, 2)
            .add_edge(1, 3)
            .add_edge(2, 3);
        b.build().unwrap()
    }

    #[test]
    fn diamond_queries() {
        let cfg = diamond();
        assert_eq!(cfg.len(), 4);
        assert_eq!(cfg.label(cfg.entry()), Some(0));
        assert_eq!(cfg.label(cfg.exit()), Some(3));
        let mut succ: Vec<_> = cfg
            .successors(cfg.entry())
            .filter_map(|i| cfg.label(i))
            .collect();
        succ.sort();
        assert_eq!(succ, vec![1, 2]);
        assert_eq!(cfg.predecessors(cfg.exit()).count(), 2);
        assert_eq!(cfg.kind(cfg.entry()), Some(NodeKind::Branch));
    }

    #[test]
    fn rejects_bad_shapes() {
        let mut b = CfgBuilder::new();
        b.add_node(0, Statement::Nop).add_node(0, Statement::Exit);
        assert!(matches!(b.build(), Err(CfgError::DuplicateLabel(0))));

        let mut b = CfgBuilder::new();
        b.add_node(0, Statement::Nop).add_edge(0, 7);
        assert!(matches!(b.build(), Err(CfgError::UnknownLabel(7))));

        let mut b = CfgBuilder::new();
        b.add_node(0, Statement::Nop);
        assert!(matches!(b.build(), Err(CfgError::ExitCount(0))));

        assert!(matches!(
            CfgBuilder::new().build(),
            Err(CfgError::EmptyCfg)
        ));

        let unpaired = CfgBuilder::sequence(vec![Statement::call("f", vec![]), Statement::Exit]);
        assert!(matches!(unpaired, Err(CfgError::DanglingCall(0))));
    }

    #[test]
    fn call_pairs() {
        let cfg = CfgBuilder::sequence(vec![
            Statement::call("f", vec![]),
            Statement::CallReturn { result: None },
            Statement::Exit,
        ])
        .unwrap();
        let call = cfg.index_of(0).unwrap();
        let ret = cfg.index_of(1).unwrap();
        assert_eq!(cfg.call_return_of(call), Some(ret));
        assert_eq!(cfg.call_of(ret), Some(call));
        assert_eq!(cfg.call_of(call), None);
    }
}
