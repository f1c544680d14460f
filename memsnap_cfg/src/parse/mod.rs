use pest::{
    Parser,
    iterators::{Pair, Pairs},
};
use pest_derive::Parser;
use tracing::{debug, instrument};

use crate::{
    CfgBuilder, CfgError, ClassDeclaration, Function, Parameter, Program, Statement,
};

mod helpers;

#[derive(Parser)]
#[grammar = "parse/grammar.pest"]
pub struct ProgramParser;

/// Parse a textual program listing.
///
/// A node without an explicit `-> label, ...` list falls through to the next
/// node of its function, except for `exit` (no successors) and `return` (the
/// function's exit node).
#[instrument(skip_all)]
pub fn parse_program<T: AsRef<str>>(s: T) -> Result<Program, CfgError> {
    let pairs = ProgramParser::parse(Rule::program, s.as_ref())?;
    let mut program = Program::new();
    for pair in pairs.flat_map(|p| p.into_inner()) {
        match pair.as_rule() {
            Rule::class_decl => program.add_class(parse_class(pair.into_inner())?)?,
            Rule::function_decl => {
                let function = parse_function(pair.into_inner())?;
                debug!(
                    "parsed function {} with {} nodes",
                    function.name,
                    function.cfg.len()
                );
                program.add_function(function)?
            }
            Rule::EOI => {}
            _ => return Err(helpers::unexpected(&pair)),
        }
    }
    Ok(program)
}

fn parse_class(mut pairs: Pairs<Rule>) -> Result<ClassDeclaration, CfgError> {
    let name = helpers::next_pair(&mut pairs, "class name")?;
    let mut class = ClassDeclaration::new(name.as_str());
    for member in pairs {
        let rule = member.as_rule();
        let mut inner = member.into_inner();
        let name = helpers::next_pair(&mut inner, "member name")?.as_str().to_string();
        match rule {
            Rule::const_decl => {
                let value = helpers::parse_literal(helpers::next_pair(&mut inner, "constant value")?)?;
                class.constants.insert(name, value);
            }
            Rule::field_decl => {
                let value = match inner.next() {
                    Some(literal) => helpers::parse_literal(literal)?,
                    None => crate::Literal::Null,
                };
                class.fields.push((name, value));
            }
            _ => {
                return Err(CfgError::Validation(format!(
                    "unexpected member in class {}",
                    class.name
                )));
            }
        }
    }
    Ok(class)
}

fn parse_function(mut pairs: Pairs<Rule>) -> Result<Function, CfgError> {
    let name = helpers::next_pair(&mut pairs, "function name")?
        .as_str()
        .to_string();
    let mut params = vec![];
    let mut nodes = vec![];
    for pair in pairs {
        match pair.as_rule() {
            Rule::param => params.push(parse_param(pair)?),
            Rule::node => nodes.push(parse_node(pair.into_inner())?),
            _ => return Err(helpers::unexpected(&pair)),
        }
    }

    let exit_label = nodes
        .iter()
        .find(|n| matches!(n.statement, Statement::Exit))
        .map(|n| n.label);
    let next_labels: Vec<Option<usize>> = nodes
        .iter()
        .skip(1)
        .map(|n| Some(n.label))
        .chain(std::iter::once(None))
        .collect();

    let mut builder = CfgBuilder::new();
    for (node, next) in nodes.into_iter().zip(next_labels) {
        let fallthrough = match node.statement {
            Statement::Exit => None,
            Statement::Return(_) => exit_label,
            _ => next,
        };
        match node.successors {
            Some(successors) => {
                for to in successors {
                    builder.add_edge(node.label, to);
                }
            }
            None => {
                if let Some(to) = fallthrough {
                    builder.add_edge(node.label, to);
                }
            }
        }
        builder.add_node(node.label, node.statement);
    }
    Ok(Function::new(name, params, builder.build()?))
}

fn parse_param(pair: Pair<Rule>) -> Result<Parameter, CfgError> {
    let mut by_ref = false;
    let mut name = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::by_ref => by_ref = true,
            Rule::variable => name = Some(helpers::parse_variable(inner)?.1),
            _ => return Err(helpers::unexpected(&inner)),
        }
    }
    let name = name.ok_or_else(|| CfgError::Validation("parameter without a name".to_string()))?;
    Ok(Parameter { name, by_ref })
}

struct ParsedNode {
    label: usize,
    statement: Statement,
    successors: Option<Vec<usize>>,
}

fn parse_node(mut pairs: Pairs<Rule>) -> Result<ParsedNode, CfgError> {
    let label = helpers::parse_label(helpers::next_pair(&mut pairs, "node label")?)?;
    let statement = parse_statement(helpers::next_pair(&mut pairs, "statement")?)?;
    let successors = match pairs.next() {
        Some(pair) => Some(
            pair.into_inner()
                .map(helpers::parse_label)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };
    Ok(ParsedNode {
        label,
        statement,
        successors,
    })
}

pub fn parse_statement(pair: Pair<Rule>) -> Result<Statement, CfgError> {
    let rule = pair.as_rule();
    let mut inner = pair.clone().into_inner();
    match rule {
        Rule::enter => Ok(Statement::Enter),
        Rule::exit => Ok(Statement::Exit),
        Rule::nop => Ok(Statement::Nop),
        Rule::unset => Ok(Statement::Unset(helpers::parse_path(helpers::next_pair(
            &mut inner, "path",
        )?)?)),
        Rule::echo => Ok(Statement::Echo(helpers::parse_expr(helpers::next_pair(
            &mut inner,
            "expression",
        )?)?)),
        Rule::branch => Ok(Statement::Branch(helpers::parse_expr(helpers::next_pair(
            &mut inner,
            "condition",
        )?)?)),
        Rule::call_return => {
            let result = inner.next().map(helpers::parse_path).transpose()?;
            Ok(Statement::CallReturn { result })
        }
        Rule::call => {
            let function = helpers::next_pair(&mut inner, "function name")?;
            let args = inner
                .map(helpers::parse_expr)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Statement::call(function.as_str(), args))
        }
        Rule::return_stmt => Ok(Statement::Return(
            inner.next().map(helpers::parse_expr).transpose()?,
        )),
        Rule::alias_assign => {
            let target = helpers::parse_path(helpers::next_pair(&mut inner, "target")?)?;
            let source = helpers::parse_path(helpers::next_pair(&mut inner, "source")?)?;
            Ok(Statement::alias(target, source))
        }
        Rule::assign => {
            let target = helpers::parse_path(helpers::next_pair(&mut inner, "target")?)?;
            let value = helpers::parse_expr(helpers::next_pair(&mut inner, "value")?)?;
            Ok(Statement::assign(target, value))
        }
        _ => Err(helpers::unexpected(&pair)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expr, IndexKey, Literal, MemoryPath, NodeKind, PathSegment, Scope, ValueKind};

    const DIAMOND: &str = r#"
        class A {
            const X = 1;
            field f = "init";
            field g;
        }

        // top level
        function main() {
            0: branch any -> 1, 2;
            1: $x = 1 -> 3;
            2: $x = "a" -> 3;
            3: echo $x;
            4: exit;
        }
    "#;

    #[test]
    fn parses_diamond() {
        let program = parse_program(DIAMOND).unwrap();
        let main = program.main().unwrap();
        let cfg = &main.cfg;
        assert_eq!(cfg.len(), 5);
        assert_eq!(cfg.kind(cfg.entry()), Some(NodeKind::Branch));
        assert_eq!(cfg.label(cfg.exit()), Some(4));
        let join = cfg.index_of(3).unwrap();
        assert_eq!(cfg.predecessors(join).count(), 2);
        assert_eq!(
            cfg.statement(join),
            Some(&Statement::Echo(Expr::read(MemoryPath::local("x"))))
        );
        let fallthrough: Vec<_> = cfg.successors(join).collect();
        assert_eq!(fallthrough, vec![cfg.exit()]);

        let class = program.class("A").unwrap();
        assert_eq!(class.constant("X"), Some(&Literal::Integer(1)));
        assert_eq!(
            class.fields,
            vec![
                ("f".to_string(), Literal::String("init".to_string())),
                ("g".to_string(), Literal::Null),
            ]
        );
    }

    #[test]
    fn parses_functions_and_calls() {
        let text = r#"
            function f($a, &$b) {
                0: enter;
                1: $b = $a;
                2: return [1..5];
                3: exit;
            }
            function main() {
                0: call f(1, $y);
                1: after_call $r;
                2: exit;
            }
        "#;
        let program = parse_program(text).unwrap();
        let f = program.function("f").unwrap();
        assert_eq!(f.params, vec![Parameter::value("a"), Parameter::reference("b")]);
        let ret = f.cfg.index_of(2).unwrap();
        assert_eq!(
            f.cfg.statement(ret),
            Some(&Statement::Return(Some(Expr::Interval { start: 1, end: 5 })))
        );
        assert_eq!(f.cfg.successors(ret).collect::<Vec<_>>(), vec![f.cfg.exit()]);

        let main = program.main().unwrap();
        let call = main.cfg.index_of(0).unwrap();
        assert_eq!(
            main.cfg.statement(call),
            Some(&Statement::call(
                "f",
                vec![Expr::literal(1), Expr::read(MemoryPath::local("y"))]
            ))
        );
        assert_eq!(
            main.cfg.statement(main.cfg.index_of(1).unwrap()),
            Some(&Statement::CallReturn {
                result: Some(MemoryPath::local("r"))
            })
        );
    }

    #[test]
    fn parses_paths_and_expressions() {
        let text = r#"
            function main() {
                0: $::g["k"][?]->f->? = any<string>;
                1: $a = &$b[2];
                2: unset $a[1];
                3: $o = new A;
                4: $c = $o::X;
                5: $e = array();
                6: $n = -2.5;
                7: $s = "q\"uote";
                8: $t = null;
                9: exit;
            }
        "#;
        let program = parse_program(text).unwrap();
        let cfg = &program.main().unwrap().cfg;
        let stmt = |label| cfg.statement(cfg.index_of(label).unwrap()).unwrap().clone();

        let Statement::Assign { target, value } = stmt(0) else {
            panic!("expected assignment");
        };
        assert_eq!(target.scope, Scope::Global);
        assert_eq!(
            target.segments,
            vec![
                PathSegment::Key(IndexKey::String("k".to_string())),
                PathSegment::UnknownKey,
                PathSegment::Field("f".to_string()),
                PathSegment::UnknownField,
            ]
        );
        assert_eq!(value, Expr::AnyOf(ValueKind::String));

        assert_eq!(
            stmt(1),
            Statement::alias(MemoryPath::local("a"), MemoryPath::local("b").key(2))
        );
        assert_eq!(stmt(2), Statement::Unset(MemoryPath::local("a").key(1)));
        assert_eq!(
            stmt(3),
            Statement::assign(
                MemoryPath::local("o"),
                Expr::NewObject {
                    class: "A".to_string()
                }
            )
        );
        assert_eq!(
            stmt(4),
            Statement::assign(
                MemoryPath::local("c"),
                Expr::ClassConstant {
                    target: MemoryPath::local("o"),
                    name: "X".to_string()
                }
            )
        );
        assert_eq!(stmt(5), Statement::assign(MemoryPath::local("e"), Expr::NewArray));
        assert_eq!(stmt(6), Statement::assign(MemoryPath::local("n"), Expr::literal(-2.5)));
        assert_eq!(
            stmt(7),
            Statement::assign(MemoryPath::local("s"), Expr::literal("q\"uote"))
        );
        assert_eq!(
            stmt(8),
            Statement::assign(MemoryPath::local("t"), Expr::Literal(Literal::Null))
        );
    }

    #[test]
    fn reports_errors() {
        assert!(matches!(
            parse_program("function main() { 0: $x = ; }"),
            Err(CfgError::Parse(_))
        ));
        assert!(matches!(
            parse_program("function main() { 0: nop -> 5; 1: exit; }"),
            Err(CfgError::UnknownLabel(5))
        ));
        assert!(matches!(
            parse_program("function main() { 0: $x = [5..1]; 1: exit; }"),
            Err(CfgError::Validation(_))
        ));
        assert!(matches!(
            parse_program("function f() { 0: exit; }").and_then(|p| p.main().map(|_| ())),
            Err(CfgError::MissingMain)
        ));
    }
}
