use crate::error::CfgError;
use crate::expr::{Expr, Literal, ValueKind};
use crate::parse::Rule;
use crate::path::{IndexKey, MemoryPath, PathSegment, Scope};
use pest::iterators::{Pair, Pairs};

pub fn next_pair<'a>(pairs: &mut Pairs<'a, Rule>, what: &str) -> Result<Pair<'a, Rule>, CfgError> {
    pairs
        .next()
        .ok_or_else(|| CfgError::Validation(format!("missing {what}")))
}

pub fn unexpected(pair: &Pair<'_, Rule>) -> CfgError {
    CfgError::Validation(format!(
        "unexpected {:?} at `{}`",
        pair.as_rule(),
        pair.as_str()
    ))
}

pub fn parse_label(pair: Pair<'_, Rule>) -> Result<usize, CfgError> {
    pair.as_str()
        .parse()
        .map_err(|_| CfgError::Validation(format!("invalid label: {}", pair.as_str())))
}

pub fn parse_integer(pair: Pair<'_, Rule>) -> Result<i64, CfgError> {
    pair.as_str()
        .parse()
        .map_err(|_| CfgError::Validation(format!("invalid integer literal: {}", pair.as_str())))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// `string` pairs wrap a single `string_inner` pair holding the raw contents.
pub fn parse_string(pair: Pair<'_, Rule>) -> Result<String, CfgError> {
    let inner = next_pair(&mut pair.into_inner(), "string contents")?;
    Ok(unescape(inner.as_str()))
}

pub fn parse_literal(pair: Pair<'_, Rule>) -> Result<Literal, CfgError> {
    let pair = match pair.as_rule() {
        Rule::literal => next_pair(&mut pair.into_inner(), "literal")?,
        _ => pair,
    };
    match pair.as_rule() {
        Rule::integer => Ok(Literal::Integer(parse_integer(pair)?)),
        Rule::float => pair
            .as_str()
            .parse()
            .map(Literal::Float)
            .map_err(|_| CfgError::Validation(format!("invalid float literal: {}", pair.as_str()))),
        Rule::string => Ok(Literal::String(parse_string(pair)?)),
        Rule::boolean => Ok(Literal::Boolean(pair.as_str() == "true")),
        Rule::null => Ok(Literal::Null),
        _ => Err(unexpected(&pair)),
    }
}

pub fn parse_variable(pair: Pair<'_, Rule>) -> Result<(Scope, String), CfgError> {
    let mut scope = Scope::Local;
    let mut name = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::global => scope = Scope::Global,
            Rule::ident => name = Some(inner.as_str().to_string()),
            _ => return Err(unexpected(&inner)),
        }
    }
    let name = name.ok_or_else(|| CfgError::Validation("variable without a name".to_string()))?;
    Ok((scope, name))
}

pub fn parse_path(pair: Pair<'_, Rule>) -> Result<MemoryPath, CfgError> {
    let mut inner = pair.into_inner();
    let (scope, name) = parse_variable(next_pair(&mut inner, "variable")?)?;
    let mut path = MemoryPath::new(scope, name);
    for segment in inner {
        let segment = match segment.as_rule() {
            Rule::key_segment => {
                let key = next_pair(&mut segment.into_inner(), "array key")?;
                match key.as_rule() {
                    Rule::integer => PathSegment::Key(IndexKey::Integer(parse_integer(key)?)),
                    Rule::string => PathSegment::Key(IndexKey::String(parse_string(key)?)),
                    _ => return Err(unexpected(&key)),
                }
            }
            Rule::unknown_key => PathSegment::UnknownKey,
            Rule::field_segment => {
                let name = next_pair(&mut segment.into_inner(), "field name")?;
                PathSegment::Field(name.as_str().to_string())
            }
            Rule::unknown_field => PathSegment::UnknownField,
            _ => return Err(unexpected(&segment)),
        };
        path = path.segment(segment);
    }
    Ok(path)
}

pub fn parse_expr(pair: Pair<'_, Rule>) -> Result<Expr, CfgError> {
    let pair = match pair.as_rule() {
        Rule::expr => next_pair(&mut pair.into_inner(), "expression")?,
        _ => pair,
    };
    match pair.as_rule() {
        Rule::any => Ok(Expr::Any),
        Rule::any_of => {
            let kind = next_pair(&mut pair.into_inner(), "kind")?;
            let kind_str = kind.as_str();
            ValueKind::from_name(kind_str)
                .map(Expr::AnyOf)
                .ok_or_else(|| CfgError::Validation(format!("unknown kind: {kind_str}")))
        }
        Rule::interval => {
            let mut inner = pair.into_inner();
            let start = parse_integer(next_pair(&mut inner, "interval start")?)?;
            let end = parse_integer(next_pair(&mut inner, "interval end")?)?;
            if start > end {
                return Err(CfgError::Validation(format!(
                    "empty interval [{start}..{end}]"
                )));
            }
            Ok(Expr::Interval { start, end })
        }
        Rule::new_array => Ok(Expr::NewArray),
        Rule::new_object => {
            let class = next_pair(&mut pair.into_inner(), "class name")?;
            Ok(Expr::NewObject {
                class: class.as_str().to_string(),
            })
        }
        Rule::class_constant => {
            let mut inner = pair.into_inner();
            let target = parse_path(next_pair(&mut inner, "constant target")?)?;
            let name = next_pair(&mut inner, "constant name")?;
            Ok(Expr::ClassConstant {
                target,
                name: name.as_str().to_string(),
            })
        }
        Rule::read => Ok(Expr::Read(parse_path(next_pair(
            &mut pair.into_inner(),
            "path",
        )?)?)),
        Rule::literal => Ok(Expr::Literal(parse_literal(pair)?)),
        _ => Err(unexpected(&pair)),
    }
}
