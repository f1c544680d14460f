use crate::expr::{Expr, Literal, ValueKind};
use crate::path::{IndexKey, MemoryPath, PathSegment, Scope};
use crate::statement::Statement;
use std::fmt::{Display, Formatter};

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Display for IndexKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKey::Integer(i) => write!(f, "{i}"),
            IndexKey::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "[{k}]"),
            PathSegment::UnknownKey => write!(f, "[?]"),
            PathSegment::Field(name) => write!(f, "->{name}"),
            PathSegment::UnknownField => write!(f, "->?"),
        }
    }
}

impl Display for MemoryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.scope {
            Scope::Global => write!(f, "$::{}", self.name)?,
            Scope::Local => write!(f, "${}", self.name)?,
        }
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Null => write!(f, "null"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(l) => write!(f, "{l}"),
            Expr::Any => write!(f, "any"),
            Expr::AnyOf(kind) => write!(f, "any<{kind}>"),
            Expr::Interval { start, end } => write!(f, "[{start}..{end}]"),
            Expr::Read(path) => write!(f, "{path}"),
            Expr::NewArray => write!(f, "array()"),
            Expr::NewObject { class } => write!(f, "new {class}"),
            Expr::ClassConstant { target, name } => write!(f, "{target}::{name}"),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Nop => write!(f, "nop"),
            Statement::Enter => write!(f, "enter"),
            Statement::Exit => write!(f, "exit"),
            Statement::Assign { target, value } => write!(f, "{target} = {value}"),
            Statement::AssignAlias { target, source } => write!(f, "{target} = &{source}"),
            Statement::Unset(path) => write!(f, "unset {path}"),
            Statement::Echo(e) => write!(f, "echo {e}"),
            Statement::Branch(e) => write!(f, "branch {e}"),
            Statement::Call { function, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "call {}({})", function, args.join(", "))
            }
            Statement::CallReturn { result: Some(path) } => write!(f, "after_call {path}"),
            Statement::CallReturn { result: None } => write!(f, "after_call"),
            Statement::Return(Some(e)) => write!(f, "return {e}"),
            Statement::Return(None) => write!(f, "return"),
        }
    }
}
