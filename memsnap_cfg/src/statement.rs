use crate::expr::Expr;
use crate::path::MemoryPath;
use serde::{Deserialize, Serialize};

/// The coarse classification of a CFG node. The driver picks the memory-model
/// algorithm to run from this tag.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Assignment,
    Branch,
    Call,
    CallReturnMerge,
    ScopeEnter,
    ScopeExit,
    Plain,
}

/// The operation carried by one CFG node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Nop,
    /// Function (or script) entry.
    Enter,
    /// Function (or script) exit. Every [`Cfg`](crate::Cfg) has exactly one.
    Exit,
    /// `target = value`
    Assign { target: MemoryPath, value: Expr },
    /// `target = &source`
    AssignAlias {
        target: MemoryPath,
        source: MemoryPath,
    },
    /// `unset(target)`
    Unset(MemoryPath),
    /// `echo value`; a plain use of a value.
    Echo(Expr),
    /// A conditional branch on `condition`. Successors are the possible targets.
    Branch(Expr),
    /// Transfers control into `function`. Must be followed by exactly one
    /// [`Statement::CallReturn`] node.
    Call { function: String, args: Vec<Expr> },
    /// The point where the callee's effects flow back into the caller.
    CallReturn { result: Option<MemoryPath> },
    /// `return value`
    Return(Option<Expr>),
}

impl Statement {
    pub fn kind(&self) -> NodeKind {
        match self {
            Statement::Assign { .. } | Statement::AssignAlias { .. } | Statement::Unset(_) => {
                NodeKind::Assignment
            }
            Statement::Branch(_) => NodeKind::Branch,
            Statement::Call { .. } => NodeKind::Call,
            Statement::CallReturn { .. } => NodeKind::CallReturnMerge,
            Statement::Enter => NodeKind::ScopeEnter,
            Statement::Exit => NodeKind::ScopeExit,
            Statement::Nop | Statement::Echo(_) | Statement::Return(_) => NodeKind::Plain,
        }
    }

    pub fn assign(target: MemoryPath, value: Expr) -> Self {
        Statement::Assign { target, value }
    }

    pub fn alias(target: MemoryPath, source: MemoryPath) -> Self {
        Statement::AssignAlias { target, source }
    }

    pub fn call<S: Into<String>>(function: S, args: Vec<Expr>) -> Self {
        Statement::Call {
            function: function.into(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Literal;

    #[test]
    fn kinds() {
        let x = MemoryPath::local("x");
        assert_eq!(
            Statement::assign(x.clone(), Expr::Literal(Literal::Integer(1))).kind(),
            NodeKind::Assignment
        );
        assert_eq!(Statement::Unset(x.clone()).kind(), NodeKind::Assignment);
        assert_eq!(Statement::call("f", vec![]).kind(), NodeKind::Call);
        assert_eq!(
            Statement::CallReturn { result: Some(x) }.kind(),
            NodeKind::CallReturnMerge
        );
        assert_eq!(Statement::Echo(Expr::Any).kind(), NodeKind::Plain);
        assert_eq!(Statement::Exit.kind(), NodeKind::ScopeExit);
    }
}
