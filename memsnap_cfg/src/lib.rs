//! The program vocabulary consumed by `memsnap`: access paths, expressions,
//! statements, per-function control-flow graphs and a parser for a small
//! textual listing format.

mod cfg;
mod display;
mod error;
mod expr;
pub mod parse;
mod path;
mod program;
mod statement;

pub use cfg::{Cfg, CfgBuilder, CfgNode, EmptyEdge};
pub use error::CfgError;
pub use expr::{Expr, Literal, ValueKind};
pub use parse::parse_program;
pub use path::{IndexKey, MemoryPath, PathSegment, Scope};
pub use petgraph::graph::NodeIndex;
pub use program::{ClassDeclaration, Function, Parameter, Program};
pub use statement::{NodeKind, Statement};
