use crate::parse::Rule;
use thiserror::Error;

/// An error in the program handed to the analysis: either a malformed listing
/// or a control-flow graph that breaks the structural rules the driver relies on.
#[derive(Debug, Error)]
pub enum CfgError {
    /// The textual listing did not match the grammar
    #[error("failed to parse program listing")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
    /// The listing parsed but contains something the builder cannot represent
    #[error("invalid program listing: {0}")]
    Validation(String),
    #[error("label {0} is used by more than one node")]
    DuplicateLabel(usize),
    #[error("an edge references label {0}, which has no node")]
    UnknownLabel(usize),
    #[error("tried to build a control-flow graph with no nodes")]
    EmptyCfg,
    #[error("a control-flow graph needs exactly one exit node, found {0}")]
    ExitCount(usize),
    /// A call node must be followed by exactly one call-return node
    #[error("call node {0} must have exactly one successor, and it must be a call-return node")]
    DanglingCall(usize),
    /// A call-return node must be preceded by exactly one call node
    #[error("call-return node {0} must have exactly one predecessor, and it must be a call node")]
    DanglingCallReturn(usize),
    #[error("function {0} is defined more than once")]
    DuplicateFunction(String),
    #[error("class {0} is declared more than once")]
    DuplicateClass(String),
    #[error("the program has no main function")]
    MissingMain,
}

impl From<pest::error::Error<Rule>> for CfgError {
    fn from(value: pest::error::Error<Rule>) -> Self {
        CfgError::Parse(Box::new(value))
    }
}
