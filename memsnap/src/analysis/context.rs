use crate::value::WarningCause;
use memsnap_cfg::{Function, NodeIndex};

/// Identifies one analysed instance of a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(pub(crate) usize);

impl ContextId {
    /// The script's top level.
    pub const MAIN: ContextId = ContextId(0);
}

/// A node of a function body, in one call context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgramPoint {
    pub context: ContextId,
    pub node: NodeIndex,
}

impl ProgramPoint {
    pub fn new(context: ContextId, node: NodeIndex) -> Self {
        Self { context, node }
    }
}

#[derive(Debug, Clone)]
pub struct CallContext<'p> {
    pub function: &'p Function,
    /// The call node this instance was entered from. `None` for the script.
    pub caller: Option<ProgramPoint>,
    pub depth: usize,
}

/// Where a call node transfers control.
#[derive(Debug, Clone)]
pub(crate) enum CallTarget<'p> {
    Context(ContextId),
    /// The call is not analysed; its effects are summarised as unknown.
    Approximated {
        cause: WarningCause,
        message: String,
        callee: Option<&'p Function>,
    },
}
