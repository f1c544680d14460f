use crate::cfg::Cfg;
use crate::error::CfgError;
use crate::expr::Literal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// `&$name`: the argument is bound by reference.
    pub by_ref: bool,
}

impl Parameter {
    pub fn value<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            by_ref: false,
        }
    }

    pub fn reference<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            by_ref: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<Parameter>,
    pub cfg: Cfg,
}

impl Function {
    pub fn new<S: Into<String>>(name: S, params: Vec<Parameter>, cfg: Cfg) -> Self {
        Self {
            name: name.into(),
            params,
            cfg,
        }
    }
}

/// A class as far as the memory model needs it: constants and declared fields
/// with their default values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassDeclaration {
    pub name: String,
    pub constants: BTreeMap<String, Literal>,
    pub fields: Vec<(String, Literal)>,
}

impl ClassDeclaration {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_constant<S: Into<String>, L: Into<Literal>>(mut self, name: S, value: L) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    pub fn with_field<S: Into<String>, L: Into<Literal>>(mut self, name: S, value: L) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn constant(&self, name: &str) -> Option<&Literal> {
        self.constants.get(name)
    }
}

/// Everything the front-end hands over: function bodies and class declarations.
/// The script's top level is the function named [`Program::MAIN`].
#[derive(Debug, Clone, Default)]
pub struct Program {
    functions: BTreeMap<String, Function>,
    classes: BTreeMap<String, ClassDeclaration>,
}

impl Program {
    pub const MAIN: &'static str = "main";

    pub fn new() -> Self {
        Self::default()
    }

    /// A program consisting of a top-level body only.
    pub fn with_main(cfg: Cfg) -> Self {
        let mut program = Self::new();
        program
            .functions
            .insert(Self::MAIN.to_string(), Function::new(Self::MAIN, vec![], cfg));
        program
    }

    pub fn add_function(&mut self, function: Function) -> Result<(), CfgError> {
        if self.functions.contains_key(&function.name) {
            return Err(CfgError::DuplicateFunction(function.name));
        }
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    pub fn add_class(&mut self, class: ClassDeclaration) -> Result<(), CfgError> {
        if self.classes.contains_key(&class.name) {
            return Err(CfgError::DuplicateClass(class.name));
        }
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    pub fn main(&self) -> Result<&Function, CfgError> {
        self.functions.get(Self::MAIN).ok_or(CfgError::MissingMain)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn class(&self, name: &str) -> Option<&ClassDeclaration> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDeclaration> {
        self.classes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::CfgBuilder;
    use crate::statement::Statement;

    #[test]
    fn duplicates_are_rejected() {
        let cfg = CfgBuilder::sequence(vec![Statement::Exit]).unwrap();
        let mut program = Program::with_main(cfg.clone());
        assert!(program.main().is_ok());
        assert!(matches!(
            program.add_function(Function::new("main", vec![], cfg)),
            Err(CfgError::DuplicateFunction(_))
        ));
        program.add_class(ClassDeclaration::new("A")).unwrap();
        assert!(matches!(
            program.add_class(ClassDeclaration::new("A")),
            Err(CfgError::DuplicateClass(_))
        ));
        assert!(Program::new().main().is_err());
    }

    #[test]
    fn class_constants() {
        let class = ClassDeclaration::new("A")
            .with_constant("X", 3)
            .with_field("f", "init");
        assert_eq!(class.constant("X"), Some(&Literal::Integer(3)));
        assert_eq!(class.constant("Y"), None);
        assert_eq!(class.fields.len(), 1);
    }
}
