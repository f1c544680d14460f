//! A forward worklist analysis over a [`Program`], keeping one [`Snapshot`]
//! per program point.
//!
//! Functions are analysed once per call site (up to `max_call_depth` nested
//! calls). A callee's entry starts from the caller's memory with a new frame
//! pushed; the call-return node in the caller closes that frame again.
//! Calls that are not analysed (unknown functions, recursion, too deep) make
//! their result and by-reference arguments unknown and leave a warning.

mod context;
mod eval;
mod report;
mod worklist;

pub use context::{CallContext, ContextId, ProgramPoint};
pub use eval::Evaluator;
pub use report::AnalysisResult;
pub use worklist::Worklist;

use crate::error::{AnalysisError, MemoryError};
use crate::memory::MemoryEntry;
use crate::snapshot::{Snapshot, SnapshotConfig};
use crate::value::WarningCause;
use context::CallTarget;
use memsnap_cfg::{Cfg, CfgError, Expr, Function, MemoryPath, NodeIndex, Program, Statement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub snapshot: SnapshotConfig,
    /// Program points processed before the run is abandoned.
    pub max_steps: usize,
    /// Nested calls analysed before further calls are approximated.
    pub max_call_depth: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            snapshot: SnapshotConfig {
                widening_limit: Some(5),
                simplify_limit: Some(16),
            },
            max_steps: 100_000,
            max_call_depth: 8,
        }
    }
}

/// What a program point's memory starts from before its statement runs.
enum Input<'s> {
    Extend(Vec<&'s Snapshot>),
    /// Entry of a callee: the caller's memory, one frame deeper.
    Call(&'s Snapshot),
    /// Call-return node: the callee's exit memory.
    Return(&'s Snapshot),
}

pub struct ForwardAnalysis<'p> {
    program: &'p Program,
    config: AnalysisConfig,
    worklist: Worklist,
    contexts: Vec<CallContext<'p>>,
    calls: BTreeMap<ProgramPoint, ContextId>,
    snapshots: BTreeMap<ProgramPoint, Snapshot>,
    initial: Snapshot,
}

fn location(function: &Function, node: NodeIndex) -> String {
    format!("{}:{}", function.name, function.cfg.label(node).unwrap_or_default())
}

fn call_point(cfg: &Cfg, point: ProgramPoint) -> Result<ProgramPoint, CfgError> {
    cfg.call_of(point.node)
        .map(|n| ProgramPoint::new(point.context, n))
        .ok_or_else(|| CfgError::DanglingCallReturn(cfg.label(point.node).unwrap_or_default()))
}

impl<'p> ForwardAnalysis<'p> {
    pub fn new(program: &'p Program, config: AnalysisConfig, worklist: Worklist) -> Self {
        Self {
            program,
            config,
            worklist,
            contexts: vec![],
            calls: BTreeMap::new(),
            snapshots: BTreeMap::new(),
            initial: Snapshot::new(config.snapshot),
        }
    }

    /// Run to a fixpoint. Every snapshot of the result is frozen.
    #[instrument(skip_all)]
    pub fn run(mut self) -> Result<AnalysisResult<'p>, AnalysisError> {
        let main = self.program.main()?;
        self.contexts.push(CallContext {
            function: main,
            caller: None,
            depth: 0,
        });
        self.worklist
            .push(ProgramPoint::new(ContextId::MAIN, main.cfg.entry()));

        let mut steps = 0;
        while let Some(point) = self.worklist.pop() {
            if steps >= self.config.max_steps {
                return Err(AnalysisError::FuelExhausted(steps));
            }
            steps += 1;
            self.step(point)?;
        }
        for snapshot in self.snapshots.values_mut() {
            snapshot.freeze()?;
        }
        debug!(
            "fixpoint after {} steps, {} contexts, {} points",
            steps,
            self.contexts.len(),
            self.snapshots.len()
        );
        Ok(AnalysisResult {
            contexts: self.contexts,
            snapshots: self.snapshots,
            steps,
        })
    }

    fn context(&self, id: ContextId) -> &CallContext<'p> {
        &self.contexts[id.0]
    }

    fn step(&mut self, point: ProgramPoint) -> Result<(), AnalysisError> {
        let function = self.context(point.context).function;
        let statement = function.cfg.statement(point.node).ok_or_else(|| {
            CfgError::Validation(format!("{:?} is not a node of {}", point.node, function.name))
        })?;
        trace!("processing {} ({})", location(function, point.node), statement);

        let target = match statement {
            Statement::Call { function: callee, .. } => Some(self.resolve_call(point, callee)),
            Statement::CallReturn { .. } => {
                let call = call_point(&function.cfg, point)?;
                match function.cfg.statement(call.node) {
                    Some(Statement::Call { function: callee, .. }) => {
                        Some(self.resolve_call(call, callee))
                    }
                    _ => None,
                }
            }
            _ => None,
        };

        let existed = self.snapshots.contains_key(&point);
        let mut snapshot = self
            .snapshots
            .remove(&point)
            .unwrap_or_else(|| Snapshot::new(self.config.snapshot));
        let previous = snapshot.clone();
        let outcome = self.transfer(
            point,
            function,
            statement,
            target.as_ref(),
            &mut snapshot,
            &previous,
        )?;
        let changed = match outcome {
            Some(changed) => changed,
            None => {
                trace!("{} is not reachable yet", location(function, point.node));
                if existed {
                    self.snapshots.insert(point, snapshot);
                }
                return Ok(());
            }
        };
        self.snapshots.insert(point, snapshot);
        if changed || !existed {
            for next in self.successors(point, function, statement, target.as_ref()) {
                self.worklist.push(next);
            }
        }
        Ok(())
    }

    /// Find or create the context a call node enters.
    fn resolve_call(&mut self, call: ProgramPoint, name: &str) -> CallTarget<'p> {
        if let Some(id) = self.calls.get(&call) {
            return CallTarget::Context(*id);
        }
        let Some(function) = self.program.function(name) else {
            return CallTarget::Approximated {
                cause: WarningCause::UnknownFunction,
                message: format!("call to undefined function {name}"),
                callee: None,
            };
        };
        let mut chain = Some(call.context);
        while let Some(id) = chain {
            let context = self.context(id);
            if context.function.name == name {
                return CallTarget::Approximated {
                    cause: WarningCause::RecursiveCall,
                    message: format!("recursive call to {name}"),
                    callee: Some(function),
                };
            }
            chain = context.caller.map(|p| p.context);
        }
        let depth = self.context(call.context).depth + 1;
        if depth > self.config.max_call_depth {
            return CallTarget::Approximated {
                cause: WarningCause::CallDepthExceeded,
                message: format!("call to {name} nested deeper than {}", self.config.max_call_depth),
                callee: Some(function),
            };
        }
        let id = ContextId(self.contexts.len());
        self.contexts.push(CallContext {
            function,
            caller: Some(call),
            depth,
        });
        self.calls.insert(call, id);
        debug!("new context {:?} for {} at depth {}", id, name, depth);
        CallTarget::Context(id)
    }

    fn callee(&self, target: Option<&CallTarget<'p>>) -> Option<&'p Function> {
        match target? {
            CallTarget::Context(id) => Some(self.context(*id).function),
            CallTarget::Approximated { callee, .. } => *callee,
        }
    }

    /// Process one point. `None` means its inputs are not available yet.
    fn transfer(
        &self,
        point: ProgramPoint,
        function: &'p Function,
        statement: &'p Statement,
        target: Option<&CallTarget<'p>>,
        snapshot: &mut Snapshot,
        previous: &Snapshot,
    ) -> Result<Option<bool>, AnalysisError> {
        let cfg = &function.cfg;
        let lookup = |p: ProgramPoint| {
            if p == point {
                Some(previous)
            } else {
                self.snapshots.get(&p)
            }
        };

        let input = if point.node == cfg.entry() && point.context != ContextId::MAIN {
            let Some(caller) = self.context(point.context).caller.and_then(lookup) else {
                return Ok(None);
            };
            Input::Call(caller)
        } else if let Some(target) = target.filter(|_| matches!(statement, Statement::CallReturn { .. })) {
            let source = match target {
                CallTarget::Context(callee) => {
                    let exit = self.context(*callee).function.cfg.exit();
                    lookup(ProgramPoint::new(*callee, exit)).map(Input::Return)
                }
                CallTarget::Approximated { .. } => {
                    lookup(call_point(cfg, point)?).map(|s| Input::Extend(vec![s]))
                }
            };
            match source {
                Some(input) => input,
                None => return Ok(None),
            }
        } else {
            let mut sources: Vec<&Snapshot> = cfg
                .predecessors(point.node)
                .filter_map(|p| lookup(ProgramPoint::new(point.context, p)))
                .collect();
            if point.context == ContextId::MAIN && point.node == cfg.entry() {
                sources.push(&self.initial);
            }
            if sources.is_empty() {
                return Ok(None);
            }
            Input::Extend(sources)
        };

        snapshot.start_transaction()?;
        match input {
            Input::Extend(sources) => snapshot.extend(&sources)?,
            Input::Call(caller) => {
                snapshot.extend_as_call(caller)?;
                self.bind_parameters(point.context, snapshot)?;
            }
            Input::Return(exit) => {
                let result = match statement {
                    Statement::CallReturn { result } => result.as_ref(),
                    _ => None,
                };
                snapshot.merge_with_call(result, &[exit])?;
            }
        }
        self.apply(point, function, statement, target, snapshot)?;
        Ok(Some(snapshot.commit_transaction()?))
    }

    fn apply(
        &self,
        point: ProgramPoint,
        function: &'p Function,
        statement: &'p Statement,
        target: Option<&CallTarget<'p>>,
        snapshot: &mut Snapshot,
    ) -> Result<(), MemoryError> {
        let eval = Evaluator::new(self.program, location(function, point.node), snapshot.call_level());
        match statement {
            Statement::Nop | Statement::Enter | Statement::Exit => {}
            Statement::Assign { target, value } => {
                let entry = eval.evaluate(snapshot, value)?;
                snapshot.assign(target, entry, false)?;
            }
            Statement::AssignAlias { target, source } => snapshot.assign_alias(target, source)?,
            Statement::Unset(path) => snapshot.unset(path)?,
            Statement::Echo(value) | Statement::Branch(value) => {
                eval.evaluate(snapshot, value)?;
            }
            Statement::Call { args, .. } => {
                let params = self.callee(target).map(|f| f.params.as_slice()).unwrap_or_default();
                for (i, arg) in args.iter().enumerate() {
                    // passing by reference creates the variable rather than reading it
                    let by_ref = params.get(i).is_some_and(|p| p.by_ref);
                    if by_ref && matches!(arg, Expr::Read(_)) {
                        continue;
                    }
                    eval.evaluate(snapshot, arg)?;
                }
            }
            Statement::CallReturn { result } => {
                if let Some(CallTarget::Approximated { cause, message, callee }) = target {
                    eval.warn(snapshot, *cause, message)?;
                    let any = MemoryEntry::from(snapshot.values().any());
                    if let Some(path) = result {
                        snapshot.assign(path, any.clone(), false)?;
                    }
                    let call = function.cfg.call_of(point.node).and_then(|n| function.cfg.statement(n));
                    if let (Some(callee), Some(Statement::Call { args, .. })) = (callee, call) {
                        for (param, arg) in callee.params.iter().zip(args) {
                            if let (true, Expr::Read(path)) = (param.by_ref, arg) {
                                snapshot.assign(path, any.clone(), false)?;
                            }
                        }
                    }
                }
            }
            Statement::Return(value) => {
                let entry = match value {
                    Some(value) => eval.evaluate(snapshot, value)?,
                    None => MemoryEntry::from(snapshot.values().null()),
                };
                snapshot.assign_return(entry)?;
            }
        }
        Ok(())
    }

    /// Bind the parameters of the callee entered in `context` to the
    /// arguments of its call node, evaluated in the caller's frame.
    fn bind_parameters(&self, context: ContextId, snapshot: &mut Snapshot) -> Result<(), MemoryError> {
        let callee = self.context(context);
        let Some(call) = callee.caller else {
            return Ok(());
        };
        let caller = self.context(call.context).function;
        let Some(Statement::Call { args, .. }) = caller.cfg.statement(call.node) else {
            return Ok(());
        };
        let level = snapshot.call_level().saturating_sub(1);
        let eval = Evaluator::new(self.program, location(caller, call.node), level).quiet();
        for (param, arg) in callee.function.params.iter().zip(args) {
            let target = MemoryPath::local(&param.name);
            match arg {
                Expr::Read(source) if param.by_ref => snapshot.bind_reference(&target, source)?,
                _ => {
                    let entry = eval.evaluate(snapshot, arg)?;
                    snapshot.assign(&target, entry, true)?;
                }
            }
        }
        Ok(())
    }

    fn successors(
        &self,
        point: ProgramPoint,
        function: &'p Function,
        statement: &'p Statement,
        target: Option<&CallTarget<'p>>,
    ) -> Vec<ProgramPoint> {
        let cfg = &function.cfg;
        if point.node == cfg.exit() {
            if let Some(call) = self.context(point.context).caller {
                let caller = &self.context(call.context).function.cfg;
                return caller
                    .call_return_of(call.node)
                    .map(|n| ProgramPoint::new(call.context, n))
                    .into_iter()
                    .collect();
            }
        }
        if let (Statement::Call { .. }, Some(CallTarget::Context(callee))) = (statement, target) {
            let entry = self.context(*callee).function.cfg.entry();
            return vec![ProgramPoint::new(*callee, entry)];
        }
        cfg.successors(point.node)
            .map(|n| ProgramPoint::new(point.context, n))
            .collect()
    }
}
