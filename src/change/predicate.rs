//! Validation predicates for `count_to_map` entries.
//!
//! A predicate is a small template in the `{{ … }}` style change files have
//! always used, for example:
//!
//! ```text
//! {{ eq .Attributes.name "web-blue" }}
//! {{ if and .Instance.IndexKey (ne .Attributes.ami "") }}true{{ end }}
//! ```
//!
//! It renders against a fixed context (`.Instance`, `.Count`, `.Attributes`).
//! The trimmed output must be empty (false) or a boolean literal.
//!
//! The language is closed: field lookups, literals, `if`/`else`/`end`, and
//! the functions `eq ne lt le gt ge and or not len`. There are no variables,
//! loops or side effects.

use serde_json::{json, Map, Number, Value};
use std::cmp::Ordering;

use crate::error::PredicateError;
use crate::state::{IndexKey, InstanceState};

use super::types::CountMapping;

/// Text rendered for a missing value.
const NO_VALUE: &str = "<no value>";

/// Maximum `if` nesting depth.
const MAX_DEPTH: usize = 32;

/// The values a predicate can see.
#[derive(Debug, Clone)]
pub struct PredicateContext {
    root: Value,
}

/// A parsed predicate template.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Output(Expr),
    If {
        cond: Expr,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Field(Vec<String>),
    Literal(Value),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Action(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(Vec<String>),
    Literal(Value),
    Ident(String),
    Open,
    Close,
}

enum Terminator {
    Eof,
    Else,
    ElseIf(Expr),
    End,
}

/// Renders `expression` against `context` and interprets the result.
///
/// Empty output is `false`.
///
/// # Errors
///
/// Returns an error if the template is malformed, cannot be evaluated, or
/// renders to something other than a boolean literal.
pub fn evaluate(expression: &str, context: &PredicateContext) -> Result<bool, PredicateError> {
    let predicate = Predicate::parse(expression)?;
    let rendered = predicate.render(context)?;
    let trimmed = rendered.trim();
    if trimmed.is_empty() {
        return Ok(false);
    }
    parse_bool(trimmed).ok_or_else(|| PredicateError::NotBoolean {
        rendered: trimmed.to_string(),
    })
}

/// Parses a boolean literal the way change files have always spelled them.
#[must_use]
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl PredicateContext {
    /// Builds the context for one re-keyed instance.
    #[must_use]
    pub fn new(instance: &InstanceState, entry: &CountMapping, attributes: Map<String, Value>) -> Self {
        let index_key = match &instance.index_key {
            IndexKey::None => Value::Null,
            IndexKey::Int(n) => json!(n),
            IndexKey::Str(s) => json!(s),
        };

        Self {
            root: json!({
                "Instance": {
                    "IndexKey": index_key,
                    "Status": instance.status,
                    "Deposed": instance.deposed,
                    "SchemaVersion": instance.schema_version,
                    "Dependencies": instance.dependencies,
                    "CreateBeforeDestroy": instance.create_before_destroy,
                },
                "Count": {
                    "Index": entry.index,
                    "Key": entry.key,
                    "Validate": entry.validate.clone().unwrap_or_default(),
                },
                "Attributes": Value::Object(attributes),
            }),
        }
    }

    fn lookup(&self, path: &[String]) -> Value {
        let mut current = &self.root;
        for segment in path {
            match current.get(segment) {
                Some(next) => current = next,
                None => return Value::Null,
            }
        }
        current.clone()
    }
}

impl Predicate {
    /// Parses a predicate template.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first syntax problem found.
    pub fn parse(expression: &str) -> Result<Self, PredicateError> {
        let to_error = |message: String| PredicateError::Parse {
            expression: expression.to_string(),
            message,
        };

        let segments = split_segments(expression).map_err(to_error)?;
        let mut iter = segments.into_iter();
        let (nodes, terminator) = parse_nodes(&mut iter, 0).map_err(to_error)?;
        match terminator {
            Terminator::Eof => Ok(Self { nodes }),
            Terminator::Else | Terminator::ElseIf(_) => Err(to_error(String::from("unexpected else"))),
            Terminator::End => Err(to_error(String::from("unexpected end"))),
        }
    }

    /// Renders the template.
    ///
    /// # Errors
    ///
    /// Returns an error if a function is unknown, called with the wrong
    /// number of arguments, or given values it cannot compare.
    pub fn render(&self, context: &PredicateContext) -> Result<String, PredicateError> {
        let mut out = String::new();
        render_nodes(&self.nodes, context, &mut out)?;
        Ok(out)
    }
}

fn render_nodes(nodes: &[Node], context: &PredicateContext, out: &mut String) -> Result<(), PredicateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(expr) => out.push_str(&display(&eval(expr, context)?)),
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                let branch = if truthy(&eval(cond, context)?) {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, context, out)?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Template structure
// ---------------------------------------------------------------------------

fn split_segments(src: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut rest = src;
    let mut trim_next = false;

    while let Some(start) = rest.find("{{") {
        let mut text = &rest[..start];
        if trim_next {
            text = text.trim_start();
        }

        let after_open = &rest[start + 2..];
        let body_start = match after_open.strip_prefix('-') {
            Some(body) if body.starts_with(char::is_whitespace) => {
                text = text.trim_end();
                body
            }
            _ => after_open,
        };
        if !text.is_empty() {
            segments.push(Segment::Text(text.to_string()));
        }

        let end = find_action_end(body_start)?;
        let mut body = &body_start[..end];
        trim_next = false;
        if let Some(stripped) = body.strip_suffix('-') {
            if stripped.ends_with(char::is_whitespace) {
                body = stripped;
                trim_next = true;
            }
        }

        let body = body.trim();
        if !(body.starts_with("/*") && body.ends_with("*/")) {
            segments.push(Segment::Action(body.to_string()));
        }
        rest = &body_start[end + 2..];
    }

    let text = if trim_next { rest.trim_start() } else { rest };
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
    Ok(segments)
}

/// Finds the closing `}}` of an action, skipping string literals.
fn find_action_end(body: &str) -> Result<usize, String> {
    let bytes = body.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'}' if !in_string && bytes.get(i + 1) == Some(&b'}') => return Ok(i),
            _ => {}
        }
        i += 1;
    }
    Err(String::from("unclosed action"))
}

fn parse_nodes(
    segments: &mut impl Iterator<Item = Segment>,
    depth: usize,
) -> Result<(Vec<Node>, Terminator), String> {
    if depth > MAX_DEPTH {
        return Err(String::from("if blocks nested too deeply"));
    }

    let mut nodes = Vec::new();
    while let Some(segment) = segments.next() {
        let body = match segment {
            Segment::Text(text) => {
                nodes.push(Node::Text(text));
                continue;
            }
            Segment::Action(body) => body,
        };

        let (keyword, rest) = body
            .split_once(char::is_whitespace)
            .map_or((body.as_str(), ""), |(k, r)| (k, r.trim()));

        match keyword {
            "if" => nodes.push(parse_if(parse_expr(rest)?, segments, depth)?),
            "else" if rest.is_empty() => return Ok((nodes, Terminator::Else)),
            "else" => {
                let cond = rest
                    .strip_prefix("if")
                    .filter(|r| r.starts_with(char::is_whitespace))
                    .ok_or_else(|| format!("unexpected {rest:?} after else"))?;
                return Ok((nodes, Terminator::ElseIf(parse_expr(cond)?)));
            }
            "end" if rest.is_empty() => return Ok((nodes, Terminator::End)),
            "range" | "with" | "define" | "template" | "block" | "break" | "continue" => {
                return Err(format!("unsupported action {keyword:?}"));
            }
            _ => nodes.push(Node::Output(parse_expr(&body)?)),
        }
    }
    Ok((nodes, Terminator::Eof))
}

fn parse_if(
    cond: Expr,
    segments: &mut impl Iterator<Item = Segment>,
    depth: usize,
) -> Result<Node, String> {
    let (then, terminator) = parse_nodes(segments, depth + 1)?;
    let otherwise = match terminator {
        Terminator::End => Vec::new(),
        Terminator::Else => match parse_nodes(segments, depth + 1)? {
            (nodes, Terminator::End) => nodes,
            _ => return Err(String::from("expected end after else")),
        },
        Terminator::ElseIf(next) => vec![parse_if(next, segments, depth + 1)?],
        Terminator::Eof => return Err(String::from("unclosed if")),
    };
    Ok(Node::If {
        cond,
        then,
        otherwise,
    })
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn parse_expr(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(String::from("missing value"));
    }
    let mut pos = 0;
    let expr = parse_command(&tokens, &mut pos, 0)?;
    if pos != tokens.len() {
        return Err(String::from("unexpected )"));
    }
    Ok(expr)
}

fn parse_command(tokens: &[Token], pos: &mut usize, depth: usize) -> Result<Expr, String> {
    if depth > MAX_DEPTH {
        return Err(String::from("expression nested too deeply"));
    }

    let mut terms = Vec::new();
    let mut function = None;

    if let Some(Token::Ident(name)) = tokens.get(*pos) {
        function = Some(name.clone());
        *pos += 1;
    }

    while let Some(token) = tokens.get(*pos) {
        if *token == Token::Close {
            break;
        }
        terms.push(parse_term(tokens, pos, depth)?);
    }

    match function {
        Some(name) => Ok(Expr::Call(name, terms)),
        None if terms.len() == 1 => Ok(terms.remove(0)),
        None if terms.is_empty() => Err(String::from("empty command")),
        None => Err(String::from("can't give argument to non-function")),
    }
}

fn parse_term(tokens: &[Token], pos: &mut usize, depth: usize) -> Result<Expr, String> {
    let token = tokens.get(*pos).ok_or("unexpected end of expression")?;
    *pos += 1;
    match token {
        Token::Field(path) => Ok(Expr::Field(path.clone())),
        Token::Literal(value) => Ok(Expr::Literal(value.clone())),
        Token::Ident(name) => Ok(Expr::Call(name.clone(), Vec::new())),
        Token::Open => {
            let inner = parse_command(tokens, pos, depth + 1)?;
            match tokens.get(*pos) {
                Some(Token::Close) => {
                    *pos += 1;
                    Ok(inner)
                }
                _ => Err(String::from("unclosed (")),
            }
        }
        Token::Close => Err(String::from("unexpected )")),
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Token::Open);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::Close);
            i += 1;
        } else if c == '"' {
            let mut text = String::new();
            i += 1;
            loop {
                let Some(&next) = chars.get(i) else {
                    return Err(String::from("unterminated quoted string"));
                };
                i += 1;
                match next {
                    '"' => break,
                    '\\' => {
                        let escaped = chars.get(i).ok_or("unterminated quoted string")?;
                        i += 1;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            '"' | '\\' => *escaped,
                            other => return Err(format!("unknown escape \\{other}")),
                        });
                    }
                    other => text.push(other),
                }
            }
            tokens.push(Token::Literal(Value::String(text)));
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(word_token(&word)?);
        }
    }
    Ok(tokens)
}

fn word_token(word: &str) -> Result<Token, String> {
    if word == "." {
        return Ok(Token::Field(Vec::new()));
    }
    if let Some(path) = word.strip_prefix('.') {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(format!("bad field {word:?}"));
        }
        return Ok(Token::Field(segments));
    }
    match word {
        "true" => return Ok(Token::Literal(Value::Bool(true))),
        "false" => return Ok(Token::Literal(Value::Bool(false))),
        "nil" => return Ok(Token::Literal(Value::Null)),
        _ => {}
    }
    if word.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') {
        if let Ok(n) = word.parse::<i64>() {
            return Ok(Token::Literal(Value::Number(n.into())));
        }
        return word
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(|n| Token::Literal(Value::Number(n)))
            .ok_or_else(|| format!("bad number {word:?}"));
    }
    if word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Ok(Token::Ident(word.to_string()));
    }
    Err(format!("unexpected {word:?}"))
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn eval(expr: &Expr, context: &PredicateContext) -> Result<Value, PredicateError> {
    match expr {
        Expr::Field(path) => Ok(context.lookup(path)),
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Call(name, args) => call(name, args, context),
    }
}

fn call(name: &str, args: &[Expr], context: &PredicateContext) -> Result<Value, PredicateError> {
    match name {
        "and" | "or" => {
            if args.is_empty() {
                return Err(PredicateError::eval(format!("{name}: wrong number of args")));
            }
            let want = name == "or";
            let mut last = Value::Null;
            for arg in args {
                last = eval(arg, context)?;
                if truthy(&last) == want {
                    break;
                }
            }
            Ok(last)
        }
        "not" => {
            let [arg] = args else {
                return Err(PredicateError::eval("not: wrong number of args, want 1"));
            };
            Ok(Value::Bool(!truthy(&eval(arg, context)?)))
        }
        "len" => {
            let [arg] = args else {
                return Err(PredicateError::eval("len: wrong number of args, want 1"));
            };
            let len = match eval(arg, context)? {
                Value::String(s) => s.len(),
                Value::Array(a) => a.len(),
                Value::Object(o) => o.len(),
                other => {
                    return Err(PredicateError::eval(format!(
                        "len of {}",
                        display(&other)
                    )));
                }
            };
            Ok(json!(len))
        }
        "eq" => {
            let [first, rest @ ..] = args else {
                return Err(PredicateError::eval("eq: missing argument for comparison"));
            };
            if rest.is_empty() {
                return Err(PredicateError::eval("eq: missing argument for comparison"));
            }
            let left = eval(first, context)?;
            for arg in rest {
                if equal(&left, &eval(arg, context)?)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "ne" | "lt" | "le" | "gt" | "ge" => {
            let [a, b] = args else {
                return Err(PredicateError::eval(format!("{name}: wrong number of args, want 2")));
            };
            let (left, right) = (eval(a, context)?, eval(b, context)?);
            let result = if name == "ne" {
                !equal(&left, &right)?
            } else {
                let ordering = compare(&left, &right)?;
                match name {
                    "lt" => ordering == Ordering::Less,
                    "le" => ordering != Ordering::Greater,
                    "gt" => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }
            };
            Ok(Value::Bool(result))
        }
        other => Err(PredicateError::eval(format!("function {other:?} not defined"))),
    }
}

fn equal(left: &Value, right: &Value) -> Result<bool, PredicateError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(a.as_f64() == b.as_f64()),
        (Value::String(a), Value::String(b)) => Ok(a == b),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (Value::Null, other) | (other, Value::Null) => Ok(other.is_null()),
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            Err(PredicateError::eval("non-comparable type"))
        }
        _ => Err(PredicateError::eval(format!(
            "incompatible types for comparison: {} and {}",
            display(left),
            display(right)
        ))),
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering, PredicateError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b))
            .ok_or_else(|| PredicateError::eval("invalid number for comparison")),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(PredicateError::eval(format!(
            "invalid type for comparison: {} and {}",
            display(left),
            display(right)
        ))),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => NO_VALUE.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            #[allow(clippy::cast_possible_truncation)]
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
