//! Enum lowering.
//!
//! ```text
//! enum Color { Red, Green = 4, Blue }
//! ```
//! becomes
//! ```text
//! var Color;
//! (function (Color) {
//!     Color[Color["Red"] = 0] = "Red";
//!     Color[Color["Green"] = 4] = "Green";
//!     Color[Color["Blue"] = 5] = "Blue";
//! })(Color || (Color = {}));
//! ```
//! String members get no reverse mapping. Initializers made of literals and
//! earlier members are folded to constants.

use std::collections::HashMap;

use dynscript_ast::*;

use crate::emitter::{number_text, quote_string, Emitter, PREC_ASSIGN};

#[derive(Debug, Clone, PartialEq)]
enum EnumValue {
    Number(f64),
    String(String),
}

impl Emitter<'_> {
    pub(crate) fn emit_enum(&mut self, decl: &EnumDecl) {
        if decl.is_declare {
            return;
        }
        let name = decl.name.value.name.clone();
        self.line(format!("var {};", name));
        self.line(format!("(function ({}) {{", name));
        self.indented(|e| {
            let mut known: HashMap<String, EnumValue> = HashMap::new();
            let mut next = Some(0.0);
            let mut previous: Option<String> = None;

            for member in &decl.members {
                let key = member.name.static_name().unwrap_or_default();
                let slot = format!("{}[{}]", name, quote_string(&key));

                let folded = match &member.init {
                    Some(init) => fold(&init.value, &known),
                    None => next.map(EnumValue::Number),
                };

                match folded {
                    Some(EnumValue::Number(n)) => {
                        e.line(format!(
                            "{}[{} = {}] = {};",
                            name,
                            slot,
                            number_text(n),
                            quote_string(&key)
                        ));
                        next = Some(n + 1.0);
                        known.insert(key.clone(), EnumValue::Number(n));
                    }
                    Some(EnumValue::String(s)) => {
                        e.line(format!("{} = {};", slot, quote_string(&s)));
                        next = None;
                        known.insert(key.clone(), EnumValue::String(s));
                    }
                    None => {
                        // Computed at runtime: chain off the previous member
                        let value = match &member.init {
                            Some(init) => e.expr(init, PREC_ASSIGN),
                            None => match &previous {
                                Some(prev) => format!("{}[{}] + 1", name, quote_string(prev)),
                                None => "0".to_string(),
                            },
                        };
                        e.line(format!("{}[{} = {}] = {};", name, slot, value, quote_string(&key)));
                        next = None;
                    }
                }
                previous = Some(key);
            }
        });
        self.line(format!("}})({} || ({} = {{}}));", name, name));
    }
}

/// Constant-folds an enum initializer the way the TypeScript compiler does
/// for constant enum expressions.
fn fold(expr: &Expr, known: &HashMap<String, EnumValue>) -> Option<EnumValue> {
    match expr {
        Expr::Literal(Literal::Number(n)) => Some(EnumValue::Number(*n)),
        Expr::Literal(Literal::String(s)) => Some(EnumValue::String(s.clone())),
        Expr::Template { parts, exprs } if exprs.is_empty() => {
            Some(EnumValue::String(parts.concat()))
        }
        Expr::Ident(ident) => known.get(&ident.name).cloned(),
        Expr::Paren(inner) => fold(&inner.value, known),
        Expr::Unary { op, expr: operand } => {
            let EnumValue::Number(n) = fold(&operand.value, known)? else {
                return None;
            };
            match op {
                UnaryOp::Plus => Some(EnumValue::Number(n)),
                UnaryOp::Minus => Some(EnumValue::Number(-n)),
                UnaryOp::BitNot => Some(EnumValue::Number(!to_int32(n) as f64)),
                _ => None,
            }
        }
        Expr::Binary { left, op, right } => {
            let left = fold(&left.value, known)?;
            let right = fold(&right.value, known)?;
            match (left, right) {
                (EnumValue::Number(a), EnumValue::Number(b)) => fold_numeric(*op, a, b),
                (EnumValue::String(a), EnumValue::String(b)) if *op == BinaryOp::Add => {
                    Some(EnumValue::String(a + &b))
                }
                (EnumValue::String(a), EnumValue::Number(b)) if *op == BinaryOp::Add => {
                    Some(EnumValue::String(a + &number_text(b)))
                }
                (EnumValue::Number(a), EnumValue::String(b)) if *op == BinaryOp::Add => {
                    Some(EnumValue::String(number_text(a) + &b))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn fold_numeric(op: BinaryOp, a: f64, b: f64) -> Option<EnumValue> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::Pow => a.powf(b),
        BinaryOp::BitOr => (to_int32(a) | to_int32(b)) as f64,
        BinaryOp::BitAnd => (to_int32(a) & to_int32(b)) as f64,
        BinaryOp::BitXor => (to_int32(a) ^ to_int32(b)) as f64,
        BinaryOp::LeftShift => to_int32(a).wrapping_shl(to_uint32(b) & 31) as f64,
        BinaryOp::RightShift => to_int32(a).wrapping_shr(to_uint32(b) & 31) as f64,
        BinaryOp::UnsignedRightShift => (to_uint32(a) >> (to_uint32(b) & 31)) as f64,
        _ => return None,
    };
    Some(EnumValue::Number(value))
}

fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Node<Expr> {
        Node::new(Expr::Literal(Literal::Number(n)), Span::default())
    }

    fn binary(left: Node<Expr>, op: BinaryOp, right: Node<Expr>) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    #[test]
    fn test_fold_arithmetic_and_bitwise() {
        let known = HashMap::new();
        assert_eq!(
            fold(&binary(num(1.0), BinaryOp::LeftShift, num(3.0)), &known),
            Some(EnumValue::Number(8.0))
        );
        assert_eq!(
            fold(&binary(num(6.0), BinaryOp::BitOr, num(1.0)), &known),
            Some(EnumValue::Number(7.0))
        );
        assert_eq!(
            fold(&binary(num(-1.0), BinaryOp::UnsignedRightShift, num(28.0)), &known),
            Some(EnumValue::Number(15.0))
        );
    }

    #[test]
    fn test_fold_member_references() {
        let mut known = HashMap::new();
        known.insert("A".to_string(), EnumValue::Number(2.0));
        let reference = Node::new(Expr::Ident(Ident::new("A")), Span::default());
        assert_eq!(
            fold(&binary(reference, BinaryOp::Mul, num(10.0)), &known),
            Some(EnumValue::Number(20.0))
        );
        assert_eq!(fold(&Expr::Ident(Ident::new("missing")), &known), None);
    }

    #[test]
    fn test_int32_conversion_wraps() {
        assert_eq!(to_int32(4_294_967_295.0), -1);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
    }
}
