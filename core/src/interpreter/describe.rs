//! Source-like rendering of AST fragments for step descriptions

use super::types::ast::*;
use super::types::format_number;

const MAX_LEN: usize = 60;

/// Render an expression back to (approximate) source text
pub fn expr_text(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(expr, &mut out);
    truncate(out)
}

pub fn pattern_text(pattern: &Pattern) -> String {
    let mut out = String::new();
    write_pattern(pattern, &mut out);
    truncate(out)
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_LEN {
        return text;
    }
    let cut: String = text.chars().take(MAX_LEN - 3).collect();
    format!("{}...", cut)
}

fn write_list<T>(items: &[T], out: &mut String, write: impl Fn(&T, &mut String)) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write(item, out);
    }
}

fn write_element(elem: &Element, out: &mut String) {
    match elem {
        Element::Expr(e) => write_expr(e, out),
        Element::Spread(e) => {
            out.push_str("...");
            write_expr(e, out);
        }
    }
}

/// Operands that need parentheses when nested in an operator
fn write_operand(expr: &Expr, out: &mut String) {
    match expr.kind {
        ExprKind::Binary { .. }
        | ExprKind::Logical { .. }
        | ExprKind::Conditional { .. }
        | ExprKind::Assign { .. }
        | ExprKind::Sequence(_) => {
            out.push('(');
            write_expr(expr, out);
            out.push(')');
        }
        _ => write_expr(expr, out),
    }
}

fn write_expr(expr: &Expr, out: &mut String) {
    match &expr.kind {
        ExprKind::Num(n) => out.push_str(&format_number(*n)),
        ExprKind::Str(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        ExprKind::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        ExprKind::Null => out.push_str("null"),
        ExprKind::Template { quasis, exprs } => {
            out.push('`');
            for (i, quasi) in quasis.iter().enumerate() {
                out.push_str(quasi);
                if let Some(e) = exprs.get(i) {
                    out.push_str("${");
                    write_expr(e, out);
                    out.push('}');
                }
            }
            out.push('`');
        }
        ExprKind::Ident(name) => out.push_str(name),
        ExprKind::This => out.push_str("this"),
        ExprKind::Array(items) => {
            out.push('[');
            write_list(items, out, write_element);
            out.push(']');
        }
        ExprKind::Object(props) if props.is_empty() => out.push_str("{}"),
        ExprKind::Object(_) => out.push_str("{...}"),
        ExprKind::Function(def) if def.is_arrow => out.push_str("() => {...}"),
        ExprKind::Function(def) => {
            out.push_str("function ");
            out.push_str(def.name.as_deref().unwrap_or(""));
            out.push_str("() {...}");
        }
        ExprKind::Unary { op, arg } => {
            out.push_str(match op {
                UnaryOp::Not => "!",
                UnaryOp::Neg => "-",
                UnaryOp::Plus => "+",
                UnaryOp::BitNot => "~",
                UnaryOp::Typeof => "typeof ",
                UnaryOp::Void => "void ",
                UnaryOp::Delete => "delete ",
            });
            write_operand(arg, out);
        }
        ExprKind::Update { op, prefix, target } => {
            let sym = if *op == UpdateOp::Inc { "++" } else { "--" };
            if *prefix {
                out.push_str(sym);
            }
            write_expr(target, out);
            if !*prefix {
                out.push_str(sym);
            }
        }
        ExprKind::Binary { op, left, right } => {
            write_operand(left, out);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            write_operand(right, out);
        }
        ExprKind::Logical { op, left, right } => {
            write_operand(left, out);
            out.push_str(match op {
                LogicalOp::And => " && ",
                LogicalOp::Or => " || ",
                LogicalOp::Nullish => " ?? ",
            });
            write_operand(right, out);
        }
        ExprKind::Assign { op, target, value } => {
            write_pattern(target, out);
            out.push_str(match op {
                AssignOp::Assign => " = ",
                AssignOp::Compound(BinaryOp::Add) => " += ",
                AssignOp::Compound(BinaryOp::Sub) => " -= ",
                AssignOp::Compound(BinaryOp::Mul) => " *= ",
                AssignOp::Compound(BinaryOp::Div) => " /= ",
                AssignOp::Compound(BinaryOp::Rem) => " %= ",
                AssignOp::Compound(_) => " **= ",
                AssignOp::Logical(LogicalOp::And) => " &&= ",
                AssignOp::Logical(LogicalOp::Or) => " ||= ",
                AssignOp::Logical(LogicalOp::Nullish) => " ??= ",
            });
            write_expr(value, out);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            write_operand(test, out);
            out.push_str(" ? ");
            write_expr(consequent, out);
            out.push_str(" : ");
            write_expr(alternate, out);
        }
        ExprKind::Call {
            callee,
            args,
            optional,
        } => {
            write_expr(callee, out);
            if *optional {
                out.push_str("?.");
            }
            out.push('(');
            write_list(args, out, write_element);
            out.push(')');
        }
        ExprKind::New { callee, args } => {
            out.push_str("new ");
            write_expr(callee, out);
            out.push('(');
            write_list(args, out, write_element);
            out.push(')');
        }
        ExprKind::Member {
            object,
            property,
            optional,
        } => {
            write_operand(object, out);
            match property {
                MemberProp::Static(name) => {
                    out.push_str(if *optional { "?." } else { "." });
                    out.push_str(name);
                }
                MemberProp::Computed(index) => {
                    if *optional {
                        out.push_str("?.");
                    }
                    out.push('[');
                    write_expr(index, out);
                    out.push(']');
                }
            }
        }
        ExprKind::Sequence(items) => write_list(items, out, write_expr),
    }
}

fn write_pattern(pattern: &Pattern, out: &mut String) {
    match pattern {
        Pattern::Ident(name) => out.push_str(name),
        Pattern::Member(expr) => write_expr(expr, out),
        Pattern::Array { elements, rest } => {
            out.push('[');
            for (i, elem) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Some(elem) = elem {
                    write_pattern(&elem.target, out);
                }
            }
            if let Some(rest) = rest {
                if !elements.is_empty() {
                    out.push_str(", ");
                }
                out.push_str("...");
                write_pattern(rest, out);
            }
            out.push(']');
        }
        Pattern::Object { props, rest } => {
            out.push_str("{ ");
            for (i, (key, elem)) in props.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match (key, &elem.target) {
                    (PropKey::Static(k), Pattern::Ident(name)) if k == name => out.push_str(k),
                    (PropKey::Static(k), target) => {
                        out.push_str(k);
                        out.push_str(": ");
                        write_pattern(target, out);
                    }
                    (PropKey::Computed(e), target) => {
                        out.push('[');
                        write_expr(e, out);
                        out.push_str("]: ");
                        write_pattern(target, out);
                    }
                }
            }
            if let Some(rest) = rest {
                if !props.is_empty() {
                    out.push_str(", ");
                }
                out.push_str("...");
                write_pattern(rest, out);
            }
            out.push_str(" }");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::parser::parse_expression;

    #[test]
    fn test_expr_text() {
        let cases = [
            ("a + b * 2", "a + (b * 2)"),
            ("obj.items[i]", "obj.items[i]"),
            ("fn(1, 'x', ...rest)", "fn(1, \"x\", ...rest)"),
            ("x ?? y", "x ?? y"),
            ("count += 1", "count += 1"),
            ("!done", "!done"),
        ];
        for (source, expected) in cases {
            let expr = parse_expression(source).unwrap();
            assert_eq!(expr_text(&expr), expected, "source: {}", source);
        }
    }

    #[test]
    fn test_long_text_is_truncated() {
        let source = format!("f({})", vec!["value"; 20].join(", "));
        let text = expr_text(&parse_expression(&source).unwrap());
        assert!(text.ends_with("..."));
        assert_eq!(text.chars().count(), MAX_LEN);
    }
}
