//! Narrowing classification.
//!
//! A pure predicate over expression shape that decides whether a later
//! type-analysis pass may refine ("narrow") a subject's type along a
//! branch, and harvests the reference keys of the narrowed subjects.
//!
//! Two expressions narrow together iff their reference keys are equal.

use pyrite_ast::{
    AstArena, CompareOperator, ConstantValue, NodeIndex, NodeKind, UnaryOperator,
};

/// Canonical string identity of a name or dotted member-access chain.
///
/// Returns `None` for any shape that is not a supported reference
/// (calls, subscripts, literals, ...).
#[must_use]
pub fn reference_key(arena: &AstArena, expr: NodeIndex) -> Option<String> {
    match arena.kind(expr)? {
        NodeKind::Name(name) => Some(name.id.clone()),
        NodeKind::Attribute(attr) => {
            let base = reference_key(arena, attr.value)?;
            Some(format!("{base}.{}", attr.attr))
        }
        _ => None,
    }
}

fn is_none_constant(arena: &AstArena, expr: NodeIndex) -> bool {
    matches!(
        arena.kind(expr),
        Some(NodeKind::Constant(c)) if c.value == ConstantValue::None
    )
}

fn push_key(arena: &AstArena, expr: NodeIndex, keys: &mut Vec<String>) -> bool {
    if let Some(key) = reference_key(arena, expr) {
        keys.push(key);
        true
    } else {
        false
    }
}

/// `type(X) is Y` narrows `X`.
fn type_call_operand(arena: &AstArena, expr: NodeIndex) -> Option<NodeIndex> {
    let NodeKind::Call(call) = arena.kind(expr)? else {
        return None;
    };
    if arena.name_text(call.func)? != "type" || call.arguments.len() != 1 {
        return None;
    }
    Some(call.arguments[0])
}

/// Decide whether `expr` participates in later narrowing, appending the
/// reference keys of every narrowed subject to `keys`.
///
/// Shapes recognized, per the original narrowing rules:
/// - bare names and dotted member chains;
/// - walrus assignment expressions (the target narrows);
/// - `is`/`is not`/`==`/`!=` against `None` (the other side narrows);
/// - `is`/`is not` between arbitrary operands (both sides narrow);
/// - `type(X) is Y` (narrows `X`);
/// - `in` (narrows the left side);
/// - logical `not` (narrows the operand);
/// - augmented-assignment right sides (narrows the RHS);
/// - `isinstance`/`issubclass` with two arguments and `callable` with one
///   (the first argument narrows).
#[must_use]
pub fn is_narrowing_expression(arena: &AstArena, expr: NodeIndex, keys: &mut Vec<String>) -> bool {
    let Some(kind) = arena.kind(expr) else {
        return false;
    };
    match kind {
        NodeKind::Name(_) | NodeKind::Attribute(_) => push_key(arena, expr, keys),
        NodeKind::NamedExpr(walrus) => push_key(arena, walrus.target, keys),
        NodeKind::Compare(compare) if compare.ops.len() == 1 => {
            let op = compare.ops[0];
            let left = compare.left;
            let right = compare.comparators[0];
            match op {
                CompareOperator::Eq | CompareOperator::NotEq => {
                    if is_none_constant(arena, right) {
                        is_narrowing_expression(arena, left, keys)
                    } else if is_none_constant(arena, left) {
                        is_narrowing_expression(arena, right, keys)
                    } else {
                        false
                    }
                }
                CompareOperator::Is | CompareOperator::IsNot => {
                    let mut narrows = false;
                    if let Some(operand) = type_call_operand(arena, left) {
                        narrows |= push_key(arena, operand, keys);
                    } else {
                        narrows |= push_key(arena, left, keys);
                    }
                    narrows |= push_key(arena, right, keys);
                    narrows
                }
                CompareOperator::In | CompareOperator::NotIn => push_key(arena, left, keys),
                _ => false,
            }
        }
        NodeKind::UnaryOp(unary) if unary.op == UnaryOperator::Not => {
            is_narrowing_expression(arena, unary.operand, keys)
        }
        NodeKind::AugAssign(aug) => is_narrowing_expression(arena, aug.value, keys),
        NodeKind::Call(call) => {
            let Some(func) = arena.name_text(call.func) else {
                return false;
            };
            let arity_matches = match func {
                "isinstance" | "issubclass" => call.arguments.len() == 2,
                "callable" => call.arguments.len() == 1,
                _ => return false,
            };
            if !arity_matches {
                return false;
            }
            push_key(arena, call.arguments[0], keys)
        }
        _ => false,
    }
}

/// Statically evaluate a boolean-like expression.
///
/// The result is advisory: branch pruning uses it, but the graph must stay
/// well-formed even when later type-based narrowing disagrees.
#[must_use]
pub fn static_bool_value(arena: &AstArena, expr: NodeIndex) -> Option<bool> {
    match arena.kind(expr)? {
        NodeKind::Constant(constant) => match &constant.value {
            ConstantValue::True => Some(true),
            ConstantValue::False => Some(false),
            ConstantValue::None => Some(false),
            ConstantValue::Int(value) => Some(*value != 0),
            ConstantValue::Str(text) => Some(!text.is_empty()),
            ConstantValue::Ellipsis => Some(true),
        },
        NodeKind::UnaryOp(unary) if unary.op == UnaryOperator::Not => {
            static_bool_value(arena, unary.operand).map(|v| !v)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrite_ast::AstBuilder;

    #[test]
    fn keys_for_dotted_chains() {
        let mut b = AstBuilder::new();
        let base = b.name("a");
        let mid = b.attr(base, "b");
        let leaf = b.attr(mid, "c");
        let arena = b.finish();
        assert_eq!(reference_key(&arena, leaf).as_deref(), Some("a.b.c"));
    }

    #[test]
    fn call_base_breaks_the_chain() {
        let mut b = AstBuilder::new();
        let call = b.call_name("f", vec![]);
        let attr = b.attr(call, "x");
        let arena = b.finish();
        assert_eq!(reference_key(&arena, attr), None);
    }

    #[test]
    fn isinstance_narrows_first_argument() {
        let mut b = AstBuilder::new();
        let subject = b.name("x");
        let class = b.name("int");
        let call = b.call_name("isinstance", vec![subject, class]);
        let arena = b.finish();
        let mut keys = Vec::new();
        assert!(is_narrowing_expression(&arena, call, &mut keys));
        assert_eq!(keys, vec!["x".to_string()]);
    }

    #[test]
    fn isinstance_wrong_arity_does_not_narrow() {
        let mut b = AstBuilder::new();
        let subject = b.name("x");
        let call = b.call_name("isinstance", vec![subject]);
        let arena = b.finish();
        let mut keys = Vec::new();
        assert!(!is_narrowing_expression(&arena, call, &mut keys));
    }

    #[test]
    fn equality_narrows_only_against_none() {
        let mut b = AstBuilder::new();
        let x = b.name("x");
        let none = b.none();
        let against_none = b.compare(x, CompareOperator::Eq, none);

        let y = b.name("y");
        let one = b.int(1);
        let against_int = b.compare(y, CompareOperator::Eq, one);
        let arena = b.finish();

        let mut keys = Vec::new();
        assert!(is_narrowing_expression(&arena, against_none, &mut keys));
        assert_eq!(keys, vec!["x".to_string()]);
        keys.clear();
        assert!(!is_narrowing_expression(&arena, against_int, &mut keys));
    }

    #[test]
    fn is_narrows_both_sides() {
        let mut b = AstBuilder::new();
        let x = b.name("x");
        let y = b.name("y");
        let cmp = b.compare(x, CompareOperator::Is, y);
        let arena = b.finish();
        let mut keys = Vec::new();
        assert!(is_narrowing_expression(&arena, cmp, &mut keys));
        assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn type_call_narrows_its_operand() {
        let mut b = AstBuilder::new();
        let x = b.name("x");
        let type_call = b.call_name("type", vec![x]);
        let y = b.name("y");
        let cmp = b.compare(type_call, CompareOperator::Is, y);
        let arena = b.finish();
        let mut keys = Vec::new();
        assert!(is_narrowing_expression(&arena, cmp, &mut keys));
        assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn walrus_contributes_target() {
        let mut b = AstBuilder::new();
        let value = b.call_name("f", vec![]);
        let walrus = b.named_expr("y", value);
        let arena = b.finish();
        let mut keys = Vec::new();
        assert!(is_narrowing_expression(&arena, walrus, &mut keys));
        assert_eq!(keys, vec!["y".to_string()]);
    }

    #[test]
    fn static_truthiness() {
        let mut b = AstBuilder::new();
        let t = b.true_lit();
        let zero = b.int(0);
        let not_zero = b.not_op(zero);
        let name = b.name("cond");
        let arena = b.finish();
        assert_eq!(static_bool_value(&arena, t), Some(true));
        assert_eq!(static_bool_value(&arena, zero), Some(false));
        assert_eq!(static_bool_value(&arena, not_zero), Some(true));
        assert_eq!(static_bool_value(&arena, name), None);
    }
}
