use crate::error::MemoryError;
use crate::memory::{MemoryEntry, MemoryIndex};
use crate::snapshot::Snapshot;
use crate::value::{
    AliasValue, ArrayValue, InfoValue, Interval, ObjectValue, Scalar, Value, ValueKind,
    ValueVisitor, WarningCause,
};
use memsnap_cfg::{Expr, Literal, MemoryPath, Program};
use std::sync::Arc;
use tracing::trace;

/// Turns [`Expr`]s into memory entries at one program point, reporting
/// suspicious reads into the snapshot's diagnostics.
pub struct Evaluator<'p> {
    program: &'p Program,
    location: String,
    level: usize,
    report: bool,
}

impl<'p> Evaluator<'p> {
    /// Reads resolve local variables in the frame of call level `level`.
    pub fn new<S: Into<String>>(program: &'p Program, location: S, level: usize) -> Self {
        Self {
            program,
            location: location.into(),
            level,
            report: true,
        }
    }

    /// Evaluate without reporting anything.
    pub fn quiet(mut self) -> Self {
        self.report = false;
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn evaluate(&self, snapshot: &mut Snapshot, expr: &Expr) -> Result<MemoryEntry, MemoryError> {
        let value = match expr {
            Expr::Literal(literal) => snapshot.values().literal(literal),
            Expr::Any => snapshot.values().any(),
            Expr::AnyOf(kind) => snapshot.values().any_of(*kind),
            Expr::Interval { start, end } => snapshot.values().integer_interval(*start, *end),
            Expr::NewArray => Value::Array(ArrayValue {
                owner: MemoryIndex::fresh_array(),
            }),
            Expr::Read(path) => return self.read(snapshot, path),
            Expr::NewObject { class } => return self.new_object(snapshot, class),
            Expr::ClassConstant { target, name } => {
                return self.class_constant(snapshot, target, name);
            }
        };
        Ok(MemoryEntry::from(value))
    }

    pub fn warn<M: AsRef<str>>(
        &self,
        snapshot: &mut Snapshot,
        cause: WarningCause,
        message: M,
    ) -> Result<(), MemoryError> {
        if !self.report {
            return Ok(());
        }
        trace!("{}: {} ({})", self.location, cause, message.as_ref());
        let info = snapshot.values().info(cause, &self.location, message);
        snapshot.report(info)
    }

    fn read(&self, snapshot: &mut Snapshot, path: &MemoryPath) -> Result<MemoryEntry, MemoryError> {
        let entry = snapshot.read_value_at(path, self.level);
        if entry.has_undefined() {
            let cause = if path.is_variable() {
                WarningCause::UndefinedVariable
            } else {
                WarningCause::UndefinedIndex
            };
            self.warn(snapshot, cause, format!("{path} may be undefined"))?;
        }
        Ok(entry)
    }

    fn new_object(&self, snapshot: &mut Snapshot, class: &str) -> Result<MemoryEntry, MemoryError> {
        let fields: Vec<(String, MemoryEntry)> = match self.program.class(class) {
            Some(declaration) => declaration
                .fields
                .iter()
                .map(|(name, literal)| {
                    (name.clone(), MemoryEntry::from(snapshot.values().literal(literal)))
                })
                .collect(),
            None => vec![],
        };
        let object = snapshot.create_object(class, &self.location, fields)?;
        Ok(MemoryEntry::from(Value::Object(object)))
    }

    fn class_constant(
        &self,
        snapshot: &mut Snapshot,
        target: &MemoryPath,
        name: &str,
    ) -> Result<MemoryEntry, MemoryError> {
        let targets = self.read(snapshot, target)?;
        let mut resolver = ConstantResolver {
            program: self.program,
            name,
        };
        let mut result = MemoryEntry::new();
        let mut non_object = false;
        for value in targets.values() {
            match value.accept(&mut resolver) {
                Resolution::Constant(literal) => result.insert(snapshot.values().literal(literal)),
                Resolution::Unknown => result.insert(snapshot.values().any()),
                Resolution::Missing(class) => self.warn(
                    snapshot,
                    WarningCause::ClassConstantDoesNotExist,
                    format!("{class}::{name} does not exist"),
                )?,
                Resolution::NotObject => non_object = true,
                Resolution::Skip => {}
            }
        }
        if non_object {
            self.warn(
                snapshot,
                WarningCause::ConstantOnNonObject,
                format!("{target} may not be an object"),
            )?;
        }
        if result.is_empty() {
            result.insert(snapshot.values().any());
        }
        Ok(result)
    }
}

enum Resolution<'p> {
    Constant(&'p Literal),
    /// The value may be an object of any class.
    Unknown,
    Missing(Arc<str>),
    NotObject,
    /// Already reported elsewhere, or not a program value.
    Skip,
}

/// Looks a class constant up through one value.
struct ConstantResolver<'p, 'n> {
    program: &'p Program,
    name: &'n str,
}

impl<'p> ValueVisitor for ConstantResolver<'p, '_> {
    type Output = Resolution<'p>;

    fn visit_undefined(&mut self) -> Self::Output {
        Resolution::Skip
    }

    fn visit_any(&mut self) -> Self::Output {
        Resolution::Unknown
    }

    fn visit_any_of(&mut self, kind: ValueKind) -> Self::Output {
        match kind {
            ValueKind::Object => Resolution::Unknown,
            _ => Resolution::NotObject,
        }
    }

    fn visit_scalar(&mut self, _: &Scalar) -> Self::Output {
        Resolution::NotObject
    }

    fn visit_interval(&mut self, _: &Interval) -> Self::Output {
        Resolution::NotObject
    }

    fn visit_array(&mut self, _: &ArrayValue) -> Self::Output {
        Resolution::NotObject
    }

    fn visit_object(&mut self, object: &ObjectValue) -> Self::Output {
        match self
            .program
            .class(&object.class)
            .and_then(|c| c.constant(self.name))
        {
            Some(literal) => Resolution::Constant(literal),
            None => Resolution::Missing(object.class.clone()),
        }
    }

    fn visit_resource(&mut self, _: &str) -> Self::Output {
        Resolution::NotObject
    }

    fn visit_alias(&mut self, _: &AliasValue) -> Self::Output {
        Resolution::Skip
    }

    fn visit_info(&mut self, _: &InfoValue) -> Self::Output {
        Resolution::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotConfig;
    use memsnap_cfg::ClassDeclaration;

    fn program() -> Program {
        let mut program = Program::new();
        program
            .add_class(ClassDeclaration::new("A").with_constant("X", 7).with_field("f", "init"))
            .unwrap();
        program
    }

    fn warnings_of(snapshot: &Snapshot) -> Vec<WarningCause> {
        snapshot.warnings().into_iter().map(|i| i.cause).collect()
    }

    #[test]
    fn undefined_reads_are_reported_not_replaced() {
        let program = program();
        let eval = Evaluator::new(&program, "main:0", 0);
        let mut snapshot = Snapshot::new(SnapshotConfig::default());
        snapshot.start_transaction().unwrap();
        let entry = eval
            .evaluate(&mut snapshot, &Expr::read(MemoryPath::local("nope")))
            .unwrap();
        assert_eq!(entry, MemoryEntry::undefined());
        let entry = eval
            .evaluate(&mut snapshot, &Expr::read(MemoryPath::local("a").key(1)))
            .unwrap();
        assert!(entry.has_undefined());
        assert_eq!(
            warnings_of(&snapshot),
            vec![WarningCause::UndefinedVariable, WarningCause::UndefinedIndex]
        );

        let quiet = Evaluator::new(&program, "main:1", 0).quiet();
        quiet
            .evaluate(&mut snapshot, &Expr::read(MemoryPath::local("other")))
            .unwrap();
        assert_eq!(snapshot.warnings().len(), 2);
    }

    #[test]
    fn class_constants_resolve_through_objects() {
        let program = program();
        let eval = Evaluator::new(&program, "main:0", 0);
        let mut snapshot = Snapshot::new(SnapshotConfig::default());
        snapshot.start_transaction().unwrap();
        let object = eval
            .evaluate(&mut snapshot, &Expr::NewObject { class: "A".into() })
            .unwrap();
        snapshot.assign(&MemoryPath::local("o"), object, false).unwrap();
        assert_eq!(
            snapshot.read_value(&MemoryPath::local("o").field("f")),
            MemoryEntry::from(Value::Scalar(Scalar::String(Arc::from("init"))))
        );

        let x = Expr::ClassConstant {
            target: MemoryPath::local("o"),
            name: "X".into(),
        };
        assert_eq!(
            eval.evaluate(&mut snapshot, &x).unwrap(),
            MemoryEntry::from(Value::Scalar(Scalar::Integer(7)))
        );
        assert!(snapshot.warnings().is_empty());

        let y = Expr::ClassConstant {
            target: MemoryPath::local("o"),
            name: "Y".into(),
        };
        assert_eq!(eval.evaluate(&mut snapshot, &y).unwrap(), MemoryEntry::from(Value::Any));
        assert_eq!(warnings_of(&snapshot), vec![WarningCause::ClassConstantDoesNotExist]);

        snapshot
            .assign(&MemoryPath::local("n"), MemoryEntry::from(Value::Scalar(Scalar::Integer(1))), false)
            .unwrap();
        let on_int = Expr::ClassConstant {
            target: MemoryPath::local("n"),
            name: "X".into(),
        };
        eval.evaluate(&mut snapshot, &on_int).unwrap();
        assert!(warnings_of(&snapshot).contains(&WarningCause::ConstantOnNonObject));
    }
}
