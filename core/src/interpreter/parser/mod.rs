//! PEST-based parser for the traced JavaScript subset
//!
//! Produces the location-annotated AST consumed by the interpreter. Parsing
//! never partially succeeds: the caller gets a whole [`Program`] or a
//! [`ParseError`] carrying a line and column.

use std::rc::Rc;
use std::sync::OnceLock;

use pest::error::{InputLocation, LineColLocation};
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use super::types::ast::*;
use super::types::values::format_number;

#[cfg(test)]
mod tests;

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "interpreter/parser/javascript.pest"]
struct JavaScriptParser;

fn pratt() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    // Lowest precedence first.
    PRATT.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::nullish, Assoc::Left))
            .op(Op::infix(Rule::or, Assoc::Left))
            .op(Op::infix(Rule::and, Assoc::Left))
            .op(Op::infix(Rule::strict_eq, Assoc::Left)
                | Op::infix(Rule::strict_ne, Assoc::Left)
                | Op::infix(Rule::loose_eq, Assoc::Left)
                | Op::infix(Rule::loose_ne, Assoc::Left))
            .op(Op::infix(Rule::lt, Assoc::Left)
                | Op::infix(Rule::gt, Assoc::Left)
                | Op::infix(Rule::le, Assoc::Left)
                | Op::infix(Rule::ge, Assoc::Left)
                | Op::infix(Rule::instanceof_op, Assoc::Left)
                | Op::infix(Rule::in_op, Assoc::Left))
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
            .op(Op::infix(Rule::mul, Assoc::Left)
                | Op::infix(Rule::div, Assoc::Left)
                | Op::infix(Rule::rem, Assoc::Left))
            .op(Op::infix(Rule::exp, Assoc::Right))
    })
}

/* ===================== Error Types ===================== */

/// Syntax error with a human-readable position
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SyntaxError: {message} (line {line}, column {column})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    fn at(loc: Loc, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            line: loc.line,
            column: loc.column,
        }
    }

    /// Translate pest's terse error into an "Unexpected ..." diagnostic
    fn from_pest(err: pest::error::Error<Rule>, source: &str) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        let offset = match err.location {
            InputLocation::Pos(pos) => pos,
            InputLocation::Span((start, _)) => start,
        };
        let rest = source.get(offset..).unwrap_or("");
        let message = match rest.chars().next() {
            None => "Unexpected end of input".to_string(),
            Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '$' => {
                let word: String = rest
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
                    .collect();
                format!("Unexpected token '{}'", word)
            }
            Some(c) => format!("Unexpected token '{}'", c),
        };
        ParseError {
            message,
            line,
            column,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Public API ===================== */

/// Parse a complete program
pub fn parse_program(source: &str) -> ParseResult<Program> {
    let mut pairs = JavaScriptParser::parse(Rule::program, source)
        .map_err(|err| ParseError::from_pest(err, source))?;
    let program = pairs
        .next()
        .ok_or_else(|| ParseError::at(Loc { line: 1, column: 1 }, "Empty parse result"))?;

    let body = program
        .into_inner()
        .filter(|p| p.as_rule() == Rule::statement)
        .map(build_statement)
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Program { body })
}

/// Parse a single expression (testing and tooling API)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let program = parse_program(source)?;
    match program.body.into_iter().next() {
        Some(Stmt {
            kind: StmtKind::Expr { expr },
            ..
        }) => Ok(expr),
        _ => Err(ParseError::at(
            Loc { line: 1, column: 1 },
            "Expected a single expression",
        )),
    }
}

/* ===================== Helpers ===================== */

fn loc_of(pair: &Pair<Rule>) -> Loc {
    let (line, column) = pair.line_col();
    Loc { line, column }
}

fn excerpt(text: &str) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    if first.chars().count() > 80 {
        let cut: String = first.chars().take(77).collect();
        format!("{}...", cut)
    } else {
        first.to_string()
    }
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_break
            | Rule::kw_case
            | Rule::kw_catch
            | Rule::kw_continue
            | Rule::kw_default
            | Rule::kw_do
            | Rule::kw_else
            | Rule::kw_finally
            | Rule::kw_for
            | Rule::kw_function
            | Rule::kw_if
            | Rule::kw_in
            | Rule::kw_new
            | Rule::kw_of
            | Rule::kw_return
            | Rule::kw_switch
            | Rule::kw_throw
            | Rule::kw_try
            | Rule::kw_while
    )
}

/// Children of a pair with keyword tokens dropped
fn significant(pair: Pair<Rule>) -> Pairs<Rule> {
    pair.into_inner()
}

fn children(pair: Pair<Rule>) -> Vec<Pair<Rule>> {
    significant(pair)
        .filter(|p| !is_keyword(p.as_rule()))
        .collect()
}

fn take<'i>(
    parts: &mut std::vec::IntoIter<Pair<'i, Rule>>,
    loc: Loc,
    what: &str,
) -> ParseResult<Pair<'i, Rule>> {
    parts
        .next()
        .ok_or_else(|| ParseError::at(loc, format!("Malformed {}", what)))
}

/* ===================== Statement Builder ===================== */

fn build_statement(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let loc = loc_of(&pair);
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::at(loc, "Empty statement node"))?;
    let source = excerpt(inner.as_str());
    let kind = build_statement_kind(inner)?;
    Ok(Stmt { kind, loc, source })
}

fn build_statement_kind(pair: Pair<Rule>) -> ParseResult<StmtKind> {
    let loc = loc_of(&pair);
    let rule = pair.as_rule();
    match rule {
        Rule::block => Ok(StmtKind::Block {
            body: build_block(pair)?,
        }),

        Rule::var_statement => {
            let mut parts = children(pair).into_iter();
            let (kind, declarations) = build_var_decl(take(&mut parts, loc, "declaration")?)?;
            Ok(StmtKind::VarDecl { kind, declarations })
        }

        Rule::function_decl => Ok(StmtKind::FunctionDecl(Rc::new(build_function(
            pair, false,
        )?))),

        Rule::if_stmt => {
            let mut parts = children(pair).into_iter();
            let test = build_expression(take(&mut parts, loc, "if condition")?)?;
            let consequent = build_statement(take(&mut parts, loc, "if body")?)?;
            let alternate = parts.next().map(build_statement).transpose()?;
            Ok(StmtKind::If {
                test,
                consequent: Box::new(consequent),
                alternate: alternate.map(Box::new),
            })
        }

        Rule::for_stmt => {
            let mut parts = children(pair).into_iter();
            let head = take(&mut parts, loc, "for head")?;
            let body = Box::new(build_statement(take(&mut parts, loc, "for body")?)?);
            match head.as_rule() {
                Rule::for_each_head => build_for_each(head, body),
                _ => build_for_classic(head, body),
            }
        }

        Rule::while_stmt => {
            let mut parts = children(pair).into_iter();
            let test = build_expression(take(&mut parts, loc, "while condition")?)?;
            let body = build_statement(take(&mut parts, loc, "while body")?)?;
            Ok(StmtKind::While {
                test,
                body: Box::new(body),
            })
        }

        Rule::do_while_stmt => {
            let mut parts = children(pair).into_iter();
            let body = build_statement(take(&mut parts, loc, "do body")?)?;
            let test = build_expression(take(&mut parts, loc, "do-while condition")?)?;
            Ok(StmtKind::DoWhile {
                body: Box::new(body),
                test,
            })
        }

        Rule::return_stmt => {
            let value = children(pair)
                .into_iter()
                .next()
                .map(build_wrapped_expression)
                .transpose()?;
            Ok(StmtKind::Return { value })
        }

        Rule::break_stmt => Ok(StmtKind::Break {
            label: children(pair).first().map(|p| p.as_str().to_string()),
        }),

        Rule::continue_stmt => Ok(StmtKind::Continue {
            label: children(pair).first().map(|p| p.as_str().to_string()),
        }),

        Rule::throw_stmt => {
            let mut parts = children(pair).into_iter();
            let value = build_expression(take(&mut parts, loc, "throw value")?)?;
            Ok(StmtKind::Throw { value })
        }

        Rule::try_stmt => build_try(pair),

        Rule::switch_stmt => {
            let mut parts = children(pair).into_iter();
            let discriminant = build_expression(take(&mut parts, loc, "switch value")?)?;
            let cases = parts.map(build_switch_case).collect::<ParseResult<_>>()?;
            Ok(StmtKind::Switch {
                discriminant,
                cases,
            })
        }

        Rule::labeled_stmt => {
            let mut parts = children(pair).into_iter();
            let label = take(&mut parts, loc, "label")?.as_str().to_string();
            let body = build_statement(take(&mut parts, loc, "labeled statement")?)?;
            Ok(StmtKind::Labeled {
                label,
                body: Box::new(body),
            })
        }

        Rule::empty_stmt => Ok(StmtKind::Empty),

        Rule::expr_stmt => {
            let mut parts = children(pair).into_iter();
            let expr = build_expression(take(&mut parts, loc, "expression")?)?;
            Ok(StmtKind::Expr { expr })
        }

        other => Err(ParseError::at(
            loc,
            format!("Unsupported statement: {:?}", other),
        )),
    }
}

fn build_block(pair: Pair<Rule>) -> ParseResult<Vec<Stmt>> {
    pair.into_inner().map(build_statement).collect()
}

fn build_var_decl(pair: Pair<Rule>) -> ParseResult<(DeclKind, Vec<Declarator>)> {
    let loc = loc_of(&pair);
    let mut parts = children(pair).into_iter();
    let kind = match take(&mut parts, loc, "declaration kind")?.as_str() {
        "var" => DeclKind::Var,
        "let" => DeclKind::Let,
        _ => DeclKind::Const,
    };

    let mut declarations = Vec::new();
    for declarator in parts {
        let dloc = loc_of(&declarator);
        let mut inner = children(declarator).into_iter();
        let target = build_binding_pattern(take(&mut inner, dloc, "declarator")?)?;
        let init = inner.next().map(build_assignment).transpose()?;
        if kind == DeclKind::Const && init.is_none() {
            return Err(ParseError::at(
                dloc,
                "Missing initializer in const declaration",
            ));
        }
        declarations.push(Declarator { target, init });
    }
    Ok((kind, declarations))
}

fn build_for_classic(head: Pair<Rule>, body: Box<Stmt>) -> ParseResult<StmtKind> {
    let mut init = None;
    let mut test = None;
    let mut update = None;

    for part in head.into_inner() {
        let loc = loc_of(&part);
        match part.as_rule() {
            Rule::for_init => {
                let inner = part
                    .into_inner()
                    .next()
                    .ok_or_else(|| ParseError::at(loc, "Malformed for initializer"))?;
                init = Some(match inner.as_rule() {
                    Rule::var_decl => {
                        let (kind, declarations) = build_var_decl(inner)?;
                        ForInit::Decl { kind, declarations }
                    }
                    _ => ForInit::Expr(build_expression(inner)?),
                });
            }
            Rule::for_test => test = Some(build_wrapped_expression(part)?),
            Rule::for_update => update = Some(build_wrapped_expression(part)?),
            _ => {}
        }
    }

    Ok(StmtKind::For {
        init,
        test,
        update,
        body,
    })
}

fn build_for_each(head: Pair<Rule>, body: Box<Stmt>) -> ParseResult<StmtKind> {
    let loc = loc_of(&head);
    let mut decl = None;
    let mut target = None;
    let mut mode = ForEachMode::Of;
    let mut iterable = None;

    for part in head.into_inner() {
        match part.as_rule() {
            Rule::decl_kind => {
                decl = Some(match part.as_str() {
                    "var" => DeclKind::Var,
                    "let" => DeclKind::Let,
                    _ => DeclKind::Const,
                });
            }
            Rule::binding_pattern => target = Some(build_binding_pattern(part)?),
            Rule::lhs_expr => target = Some(expr_to_pattern(build_lhs(part)?)?),
            Rule::kw_of => mode = ForEachMode::Of,
            Rule::kw_in => mode = ForEachMode::In,
            Rule::expression => iterable = Some(build_expression(part)?),
            _ => {}
        }
    }

    let target = target.ok_or_else(|| ParseError::at(loc, "Missing loop variable"))?;
    let iterable = iterable.ok_or_else(|| ParseError::at(loc, "Missing loop iterable"))?;
    Ok(StmtKind::ForEach {
        mode,
        decl,
        target,
        iterable,
        body,
    })
}

fn build_try(pair: Pair<Rule>) -> ParseResult<StmtKind> {
    let loc = loc_of(&pair);
    let mut parts = children(pair).into_iter();
    let block = build_block(take(&mut parts, loc, "try block")?)?;
    let mut handler = None;
    let mut finalizer = None;

    for part in parts {
        match part.as_rule() {
            Rule::catch_clause => {
                let mut param = None;
                let mut body = Vec::new();
                for inner in children(part) {
                    match inner.as_rule() {
                        Rule::binding_pattern => param = Some(build_binding_pattern(inner)?),
                        Rule::block => body = build_block(inner)?,
                        _ => {}
                    }
                }
                handler = Some(CatchClause { param, body });
            }
            Rule::finally_clause => {
                let floc = loc_of(&part);
                let mut inner = children(part).into_iter();
                finalizer = Some(build_block(take(&mut inner, floc, "finally block")?)?);
            }
            _ => {}
        }
    }

    if handler.is_none() && finalizer.is_none() {
        return Err(ParseError::at(loc, "Missing catch or finally after try"));
    }
    Ok(StmtKind::Try {
        block,
        handler,
        finalizer,
    })
}

fn build_switch_case(pair: Pair<Rule>) -> ParseResult<SwitchCase> {
    let mut test = None;
    let mut body = Vec::new();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::expression => test = Some(build_expression(part)?),
            Rule::statement => body.push(build_statement(part)?),
            _ => {}
        }
    }
    Ok(SwitchCase { test, body })
}

/* ===================== Function Builder ===================== */

/// Build a function from `function_decl`, `function_expr` or `method_prop`
fn build_function(pair: Pair<Rule>, is_method: bool) -> ParseResult<FunctionDef> {
    let loc = loc_of(&pair);
    let mut name = None;
    let mut params = Vec::new();
    let mut rest = None;
    let mut body = Vec::new();

    for part in children(pair) {
        match part.as_rule() {
            Rule::identifier => name = Some(part.as_str().to_string()),
            Rule::property_key if is_method => {
                if let PropKey::Static(key) = build_property_key(part)? {
                    name = Some(key);
                }
            }
            Rule::param_list => (params, rest) = build_params(part)?,
            Rule::block => body = build_block(part)?,
            _ => {}
        }
    }

    Ok(FunctionDef {
        name,
        params,
        rest,
        body: FunctionBody::Block(body),
        is_arrow: false,
        loc,
    })
}

fn build_arrow(pair: Pair<Rule>) -> ParseResult<FunctionDef> {
    let loc = loc_of(&pair);
    let mut parts = pair.into_inner();
    let head = parts
        .next()
        .ok_or_else(|| ParseError::at(loc, "Malformed arrow function"))?;

    let (params, rest) = match head.clone().into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::identifier => (
            vec![PatternElem {
                target: Pattern::Ident(inner.as_str().to_string()),
                default: None,
            }],
            None,
        ),
        Some(inner) => build_params(inner)?,
        None => (Vec::new(), None),
    };

    let body_pair = parts
        .next()
        .ok_or_else(|| ParseError::at(loc, "Missing arrow function body"))?;
    let body = match body_pair.as_rule() {
        Rule::block => FunctionBody::Block(build_block(body_pair)?),
        _ => FunctionBody::Expr(Box::new(build_assignment(body_pair)?)),
    };

    Ok(FunctionDef {
        name: None,
        params,
        rest,
        body,
        is_arrow: true,
        loc,
    })
}

fn build_params(pair: Pair<Rule>) -> ParseResult<(Vec<PatternElem>, Option<Pattern>)> {
    let mut params = Vec::new();
    let mut rest = None;
    for param in pair.into_inner() {
        let loc = loc_of(&param);
        if rest.is_some() {
            return Err(ParseError::at(loc, "Rest parameter must be last formal parameter"));
        }
        let inner = param
            .into_inner()
            .next()
            .ok_or_else(|| ParseError::at(loc, "Malformed parameter"))?;
        match inner.as_rule() {
            Rule::rest_binding => rest = Some(build_rest(inner)?),
            _ => params.push(build_binding_elem(inner)?),
        }
    }
    Ok((params, rest))
}

/* ===================== Pattern Builder ===================== */

fn build_binding_pattern(pair: Pair<Rule>) -> ParseResult<Pattern> {
    let loc = loc_of(&pair);
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::at(loc, "Malformed binding pattern"))?;

    match inner.as_rule() {
        Rule::identifier => Ok(Pattern::Ident(inner.as_str().to_string())),

        Rule::array_binding => {
            let mut elements = Vec::new();
            let mut rest = None;
            let mut slots: Vec<Pair<Rule>> = inner.into_inner().collect();
            // A trailing comma or `[]` leaves one empty slot at the end.
            if slots.last().map_or(false, |s| s.clone().into_inner().next().is_none()) {
                slots.pop();
            }
            for slot in slots {
                let sloc = loc_of(&slot);
                match slot.into_inner().next() {
                    None => elements.push(None),
                    Some(p) if p.as_rule() == Rule::rest_binding => {
                        if rest.is_some() {
                            return Err(ParseError::at(sloc, "Rest element must be last element"));
                        }
                        rest = Some(Box::new(build_rest(p)?));
                    }
                    Some(p) => {
                        if rest.is_some() {
                            return Err(ParseError::at(sloc, "Rest element must be last element"));
                        }
                        elements.push(Some(build_binding_elem(p)?));
                    }
                }
            }
            Ok(Pattern::Array { elements, rest })
        }

        Rule::object_binding => {
            let mut props = Vec::new();
            let mut rest = None;
            for prop in inner.into_inner() {
                let ploc = loc_of(&prop);
                let p = prop
                    .into_inner()
                    .next()
                    .ok_or_else(|| ParseError::at(ploc, "Malformed object pattern"))?;
                match p.as_rule() {
                    Rule::rest_binding => rest = Some(Box::new(build_rest(p)?)),
                    Rule::keyed_binding => {
                        let kloc = loc_of(&p);
                        let mut parts = p.into_inner();
                        let key = build_property_key(
                            parts
                                .next()
                                .ok_or_else(|| ParseError::at(kloc, "Missing property key"))?,
                        )?;
                        let elem = build_binding_elem(
                            parts
                                .next()
                                .ok_or_else(|| ParseError::at(kloc, "Missing binding target"))?,
                        )?;
                        props.push((key, elem));
                    }
                    _ => {
                        let elem = build_binding_elem(p)?;
                        let Pattern::Ident(name) = &elem.target else {
                            return Err(ParseError::at(ploc, "Invalid shorthand property pattern"));
                        };
                        props.push((PropKey::Static(name.clone()), elem));
                    }
                }
            }
            Ok(Pattern::Object { props, rest })
        }

        other => Err(ParseError::at(
            loc,
            format!("Unsupported binding pattern: {:?}", other),
        )),
    }
}

fn build_binding_elem(pair: Pair<Rule>) -> ParseResult<PatternElem> {
    let loc = loc_of(&pair);
    let mut parts = pair.into_inner();
    let target = build_binding_pattern(
        parts
            .next()
            .ok_or_else(|| ParseError::at(loc, "Malformed binding"))?,
    )?;
    let default = parts.next().map(build_assignment).transpose()?;
    Ok(PatternElem { target, default })
}

fn build_rest(pair: Pair<Rule>) -> ParseResult<Pattern> {
    let loc = loc_of(&pair);
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::at(loc, "Malformed rest element"))?;
    build_binding_pattern(inner)
}

/// Reinterpret an already-parsed expression as an assignment target
fn expr_to_pattern(expr: Expr) -> ParseResult<Pattern> {
    let loc = expr.loc;
    match expr.kind {
        ExprKind::Ident(name) => Ok(Pattern::Ident(name)),
        ExprKind::Member { optional: false, .. } => Ok(Pattern::Member(Box::new(expr))),
        ExprKind::Array(items) => {
            let mut elements = Vec::new();
            let mut rest = None;
            let count = items.len();
            for (idx, item) in items.into_iter().enumerate() {
                match item {
                    Element::Spread(inner) if idx + 1 == count => {
                        rest = Some(Box::new(expr_to_pattern(inner)?));
                    }
                    Element::Spread(_) => {
                        return Err(ParseError::at(loc, "Rest element must be last element"));
                    }
                    Element::Expr(inner) => elements.push(Some(expr_to_pattern_elem(inner)?)),
                }
            }
            Ok(Pattern::Array { elements, rest })
        }
        ExprKind::Object(items) => {
            let mut props = Vec::new();
            let mut rest = None;
            for item in items {
                match item {
                    ObjectProp::KeyValue(key, value) => {
                        props.push((key, expr_to_pattern_elem(value)?));
                    }
                    ObjectProp::Spread(inner) => rest = Some(Box::new(expr_to_pattern(inner)?)),
                }
            }
            Ok(Pattern::Object { props, rest })
        }
        _ => Err(ParseError::at(loc, "Invalid left-hand side in assignment")),
    }
}

fn expr_to_pattern_elem(expr: Expr) -> ParseResult<PatternElem> {
    match expr.kind {
        ExprKind::Assign {
            op: AssignOp::Assign,
            target,
            value,
        } => Ok(PatternElem {
            target,
            default: Some(*value),
        }),
        _ => Ok(PatternElem {
            target: expr_to_pattern(expr)?,
            default: None,
        }),
    }
}

/* ===================== Expression Builder ===================== */

fn build_wrapped_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::at(loc, "Missing expression"))?;
    build_expression(inner)
}

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let mut items = pair
        .into_inner()
        .map(build_assignment)
        .collect::<ParseResult<Vec<_>>>()?;
    match items.len() {
        0 => Err(ParseError::at(loc, "Missing expression")),
        1 => Ok(items.remove(0)),
        _ => Ok(Expr {
            kind: ExprKind::Sequence(items),
            loc,
        }),
    }
}

fn build_assignment(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let mut parts = pair.into_inner();
    let first = parts
        .next()
        .ok_or_else(|| ParseError::at(loc, "Missing expression"))?;

    if first.as_rule() == Rule::arrow_function {
        return Ok(Expr {
            kind: ExprKind::Function(Rc::new(build_arrow(first)?)),
            loc,
        });
    }

    let left = build_conditional(first)?;
    let Some(op_pair) = parts.next() else {
        return Ok(left);
    };
    let value_pair = parts
        .next()
        .ok_or_else(|| ParseError::at(loc, "Missing assigned value"))?;

    let op = match op_pair.as_str() {
        "=" => AssignOp::Assign,
        "+=" => AssignOp::Compound(BinaryOp::Add),
        "-=" => AssignOp::Compound(BinaryOp::Sub),
        "*=" => AssignOp::Compound(BinaryOp::Mul),
        "/=" => AssignOp::Compound(BinaryOp::Div),
        "%=" => AssignOp::Compound(BinaryOp::Rem),
        "**=" => AssignOp::Compound(BinaryOp::Exp),
        "??=" => AssignOp::Logical(LogicalOp::Nullish),
        "||=" => AssignOp::Logical(LogicalOp::Or),
        "&&=" => AssignOp::Logical(LogicalOp::And),
        other => {
            return Err(ParseError::at(
                loc_of(&op_pair),
                format!("Unknown assignment operator '{}'", other),
            ))
        }
    };

    let target = match (op, &left.kind) {
        (AssignOp::Assign, _) => expr_to_pattern(left)?,
        (_, ExprKind::Ident(_)) | (_, ExprKind::Member { optional: false, .. }) => {
            expr_to_pattern(left)?
        }
        _ => return Err(ParseError::at(loc, "Invalid left-hand side in assignment")),
    };

    Ok(Expr {
        kind: ExprKind::Assign {
            op,
            target,
            value: Box::new(build_assignment(value_pair)?),
        },
        loc,
    })
}

fn build_conditional(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let mut parts = pair.into_inner();
    let test = build_binary(
        parts
            .next()
            .ok_or_else(|| ParseError::at(loc, "Missing expression"))?,
    )?;
    let Some(consequent) = parts.next() else {
        return Ok(test);
    };
    let alternate = parts
        .next()
        .ok_or_else(|| ParseError::at(loc, "Missing ':' in conditional expression"))?;
    Ok(Expr {
        kind: ExprKind::Conditional {
            test: Box::new(test),
            consequent: Box::new(build_assignment(consequent)?),
            alternate: Box::new(build_assignment(alternate)?),
        },
        loc,
    })
}

fn build_binary(pair: Pair<Rule>) -> ParseResult<Expr> {
    pratt()
        .map_primary(build_unary)
        .map_infix(|lhs, op, rhs| {
            let lhs = lhs?;
            let rhs = rhs?;
            let loc = lhs.loc;
            let logical = match op.as_rule() {
                Rule::nullish => Some(LogicalOp::Nullish),
                Rule::or => Some(LogicalOp::Or),
                Rule::and => Some(LogicalOp::And),
                _ => None,
            };
            if let Some(op) = logical {
                return Ok(Expr {
                    kind: ExprKind::Logical {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    },
                    loc,
                });
            }
            let op = match op.as_rule() {
                Rule::strict_eq => BinaryOp::StrictEq,
                Rule::strict_ne => BinaryOp::StrictNe,
                Rule::loose_eq => BinaryOp::LooseEq,
                Rule::loose_ne => BinaryOp::LooseNe,
                Rule::lt => BinaryOp::Lt,
                Rule::gt => BinaryOp::Gt,
                Rule::le => BinaryOp::Le,
                Rule::ge => BinaryOp::Ge,
                Rule::instanceof_op => BinaryOp::Instanceof,
                Rule::in_op => BinaryOp::In,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                Rule::rem => BinaryOp::Rem,
                Rule::exp => BinaryOp::Exp,
                other => {
                    return Err(ParseError::at(
                        loc_of(&op),
                        format!("Unknown operator {:?}", other),
                    ))
                }
            };
            Ok(Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                loc,
            })
        })
        .parse(pair.into_inner())
}

fn build_unary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let mut prefixes = Vec::new();
    let mut operand = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::prefix_op => prefixes.push((part.as_str().to_string(), loc_of(&part))),
            _ => operand = Some(build_postfix(part)?),
        }
    }
    let mut expr = operand.ok_or_else(|| ParseError::at(loc, "Missing operand"))?;

    for (op, oloc) in prefixes.into_iter().rev() {
        let kind = match op.as_str() {
            "++" | "--" => {
                ensure_update_target(&expr)?;
                ExprKind::Update {
                    op: if op == "++" { UpdateOp::Inc } else { UpdateOp::Dec },
                    prefix: true,
                    target: Box::new(expr),
                }
            }
            _ => {
                let op = match op.as_str() {
                    "!" => UnaryOp::Not,
                    "-" => UnaryOp::Neg,
                    "+" => UnaryOp::Plus,
                    "~" => UnaryOp::BitNot,
                    "typeof" => UnaryOp::Typeof,
                    "void" => UnaryOp::Void,
                    _ => UnaryOp::Delete,
                };
                ExprKind::Unary {
                    op,
                    arg: Box::new(expr),
                }
            }
        };
        expr = Expr { kind, loc: oloc };
    }
    Ok(expr)
}

fn ensure_update_target(expr: &Expr) -> ParseResult<()> {
    match expr.kind {
        ExprKind::Ident(_) | ExprKind::Member { optional: false, .. } => Ok(()),
        _ => Err(ParseError::at(
            expr.loc,
            "Invalid left-hand side expression in update operation",
        )),
    }
}

fn build_postfix(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let mut parts = pair.into_inner();
    let target = build_lhs(
        parts
            .next()
            .ok_or_else(|| ParseError::at(loc, "Missing operand"))?,
    )?;
    let Some(op) = parts.next() else {
        return Ok(target);
    };
    ensure_update_target(&target)?;
    Ok(Expr {
        kind: ExprKind::Update {
            op: if op.as_str() == "++" { UpdateOp::Inc } else { UpdateOp::Dec },
            prefix: false,
            target: Box::new(target),
        },
        loc,
    })
}

fn build_lhs(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let mut parts = pair.into_inner();
    let head = parts
        .next()
        .ok_or_else(|| ParseError::at(loc, "Missing expression"))?;
    let mut expr = match head.as_rule() {
        Rule::new_expr => build_new(head)?,
        _ => build_primary(head)?,
    };
    for suffix in parts {
        expr = apply_suffix(expr, suffix)?;
    }
    Ok(expr)
}

fn apply_suffix(object: Expr, suffix: Pair<Rule>) -> ParseResult<Expr> {
    let loc = object.loc;
    let sloc = loc_of(&suffix);
    let kind = match suffix.as_rule() {
        Rule::arguments => ExprKind::Call {
            callee: Box::new(object),
            args: build_arguments(suffix)?,
            optional: false,
        },
        Rule::optional_call => {
            let args = suffix
                .into_inner()
                .next()
                .ok_or_else(|| ParseError::at(sloc, "Malformed optional call"))?;
            ExprKind::Call {
                callee: Box::new(object),
                args: build_arguments(args)?,
                optional: true,
            }
        }
        Rule::member_suffix | Rule::optional_member => {
            let optional = suffix.as_rule() == Rule::optional_member;
            let name = suffix
                .into_inner()
                .next()
                .ok_or_else(|| ParseError::at(sloc, "Missing property name"))?;
            ExprKind::Member {
                object: Box::new(object),
                property: MemberProp::Static(name.as_str().to_string()),
                optional,
            }
        }
        Rule::index_suffix | Rule::optional_index => {
            let optional = suffix.as_rule() == Rule::optional_index;
            let index = build_wrapped_expression(suffix)?;
            ExprKind::Member {
                object: Box::new(object),
                property: MemberProp::Computed(Box::new(index)),
                optional,
            }
        }
        other => {
            return Err(ParseError::at(
                sloc,
                format!("Unexpected suffix {:?}", other),
            ))
        }
    };
    Ok(Expr { kind, loc })
}

fn build_new(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let mut parts = children(pair).into_iter();
    let callee_pair = take(&mut parts, loc, "new expression")?;

    let mut callee_parts = callee_pair.into_inner();
    let head = callee_parts
        .next()
        .ok_or_else(|| ParseError::at(loc, "Missing constructor"))?;
    let mut callee = build_primary(head)?;
    for suffix in callee_parts {
        callee = apply_suffix(callee, suffix)?;
    }

    let args = parts.next().map(build_arguments).transpose()?.unwrap_or_default();
    Ok(Expr {
        kind: ExprKind::New {
            callee: Box::new(callee),
            args,
        },
        loc,
    })
}

fn build_arguments(pair: Pair<Rule>) -> ParseResult<Vec<Element>> {
    pair.into_inner().map(build_element).collect()
}

fn build_element(pair: Pair<Rule>) -> ParseResult<Element> {
    match pair.as_rule() {
        Rule::spread_elem => Ok(Element::Spread(build_wrapped_assignment(pair)?)),
        _ => Ok(Element::Expr(build_assignment(pair)?)),
    }
}

fn build_wrapped_assignment(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::at(loc, "Missing expression"))?;
    build_assignment(inner)
}

fn build_primary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let loc = loc_of(&pair);
    let kind = match pair.as_rule() {
        Rule::number => ExprKind::Num(parse_number(pair.as_str()).ok_or_else(|| {
            ParseError::at(loc, format!("Invalid number literal '{}'", pair.as_str()))
        })?),
        Rule::string => ExprKind::Str(string_value(pair)?),
        Rule::template => {
            let mut quasis = Vec::new();
            let mut exprs = Vec::new();
            let mut current = String::new();
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::template_chars => current.push_str(&unescape(part.as_str())),
                    _ => {
                        quasis.push(std::mem::take(&mut current));
                        exprs.push(build_wrapped_expression(part)?);
                    }
                }
            }
            quasis.push(current);
            ExprKind::Template { quasis, exprs }
        }
        Rule::lit_true => ExprKind::Bool(true),
        Rule::lit_false => ExprKind::Bool(false),
        Rule::lit_null => ExprKind::Null,
        Rule::lit_this => ExprKind::This,
        Rule::identifier => ExprKind::Ident(pair.as_str().to_string()),
        Rule::paren_expr => return build_wrapped_expression(pair),
        Rule::function_expr => ExprKind::Function(Rc::new(build_function(pair, false)?)),
        Rule::array_lit => ExprKind::Array(
            pair.into_inner()
                .map(build_element)
                .collect::<ParseResult<_>>()?,
        ),
        Rule::object_lit => ExprKind::Object(
            pair.into_inner()
                .map(build_object_prop)
                .collect::<ParseResult<_>>()?,
        ),
        other => {
            return Err(ParseError::at(
                loc,
                format!("Unsupported expression: {:?}", other),
            ))
        }
    };
    Ok(Expr { kind, loc })
}

fn build_object_prop(pair: Pair<Rule>) -> ParseResult<ObjectProp> {
    let loc = loc_of(&pair);
    match pair.as_rule() {
        Rule::spread_elem => Ok(ObjectProp::Spread(build_wrapped_assignment(pair)?)),
        Rule::method_prop => {
            let def = build_function(pair, true)?;
            let key = PropKey::Static(def.name.clone().unwrap_or_default());
            Ok(ObjectProp::KeyValue(
                key,
                Expr {
                    kind: ExprKind::Function(Rc::new(def)),
                    loc,
                },
            ))
        }
        Rule::key_value_prop => {
            let mut parts = pair.into_inner();
            let key = build_property_key(
                parts
                    .next()
                    .ok_or_else(|| ParseError::at(loc, "Missing property key"))?,
            )?;
            let value = build_assignment(
                parts
                    .next()
                    .ok_or_else(|| ParseError::at(loc, "Missing property value"))?,
            )?;
            Ok(ObjectProp::KeyValue(key, value))
        }
        _ => {
            let name = pair.as_str().trim().to_string();
            Ok(ObjectProp::KeyValue(
                PropKey::Static(name.clone()),
                Expr {
                    kind: ExprKind::Ident(name),
                    loc,
                },
            ))
        }
    }
}

fn build_property_key(pair: Pair<Rule>) -> ParseResult<PropKey> {
    let loc = loc_of(&pair);
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::at(loc, "Missing property key"))?;
    match inner.as_rule() {
        Rule::computed_key => Ok(PropKey::Computed(Box::new(build_wrapped_assignment(inner)?))),
        Rule::string => Ok(PropKey::Static(string_value(inner)?)),
        Rule::number => {
            let n = parse_number(inner.as_str()).ok_or_else(|| {
                ParseError::at(loc, format!("Invalid number literal '{}'", inner.as_str()))
            })?;
            Ok(PropKey::Static(format_number(n)))
        }
        _ => Ok(PropKey::Static(inner.as_str().to_string())),
    }
}

/* ===================== Literals ===================== */

fn parse_number(text: &str) -> Option<f64> {
    let lower = text.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        return u64::from_str_radix(bin, 2).ok().map(|n| n as f64);
    }
    text.parse::<f64>().ok()
}

fn string_value(pair: Pair<Rule>) -> ParseResult<String> {
    let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
    Ok(unescape(raw))
}

/// Resolve JavaScript escape sequences
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('\n') => {}
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
