//! Concrete values flowing through evaluated sequences.
//!
//! Tokens, positions, counts and flags all share one closed variant. The
//! coercion rules between the three kinds live here and nowhere else:
//!
//! - numeric view: `Int(i)` is `i`, `Bool(b)` is 0 or 1, `Char` has none
//! - truthiness: `Bool(b)` is `b`, `Int(i)` is `i != 0`, `Char` has none
//! - arithmetic needs two numeric views and yields `Int`
//! - equality never fails; a `Char` is simply unequal to any number
//! - ordering compares chars with chars and numbers with numbers

use std::fmt;

/// A single element of an evaluated sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    Char(char),
    Bool(bool),
}

/// The kind of a value, used in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Char,
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Int => write!(f, "int"),
            ValueKind::Char => write!(f, "char"),
            ValueKind::Bool => write!(f, "bool"),
        }
    }
}

/// Failure of a single elementwise operation.
///
/// These carry no node information; the evaluator attaches the node that
/// was being computed when it converts them into an `EvalError`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueError {
    /// Operands of these kinds cannot be combined by the operation
    TypeMismatch {
        op: &'static str,
        left: ValueKind,
        right: Option<ValueKind>,
    },
    /// Right operand of `/` or `%` was zero
    DivisionByZero { op: &'static str },
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::TypeMismatch {
                op,
                left,
                right: Some(right),
            } => write!(f, "cannot apply '{}' to {} and {}", op, left, right),
            ValueError::TypeMismatch {
                op,
                left,
                right: None,
            } => write!(f, "cannot apply '{}' to {}", op, left),
            ValueError::DivisionByZero { op } => write!(f, "division by zero in '{}'", op),
        }
    }
}

impl std::error::Error for ValueError {}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Char(_) => ValueKind::Char,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    /// Numeric view: ints as-is, booleans as 0/1, chars have none.
    pub fn as_number(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            Value::Bool(b) => Some(b as i64),
            Value::Char(_) => None,
        }
    }

    /// Truthiness: booleans as-is, ints are true when nonzero, chars have none.
    pub fn truthy(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            Value::Int(i) => Some(i != 0),
            Value::Char(_) => None,
        }
    }

    /// Strict int accessor for user map functions.
    pub fn to_int(&self) -> Result<i64, String> {
        self.as_number()
            .ok_or_else(|| format!("expected a number, got {} '{}'", self.kind(), self))
    }

    /// Strict char accessor for user map functions.
    pub fn to_char(&self) -> Result<char, String> {
        match *self {
            Value::Char(c) => Ok(c),
            other => Err(format!("expected a char, got {} '{}'", other.kind(), other)),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Char(c) => write!(f, "{}", c),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ============================================================================
// OPERATORS
// ============================================================================

/// Elementwise binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
        }
    }

    /// Binding strength in the surface syntax (higher binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 5,
        }
    }

    /// The relational operator, if this is a comparison.
    pub fn as_compare(self) -> Option<CompareOp> {
        match self {
            BinaryOp::Eq => Some(CompareOp::Eq),
            BinaryOp::Ne => Some(CompareOp::Ne),
            BinaryOp::Lt => Some(CompareOp::Lt),
            BinaryOp::Le => Some(CompareOp::Le),
            BinaryOp::Gt => Some(CompareOp::Gt),
            BinaryOp::Ge => Some(CompareOp::Ge),
            _ => None,
        }
    }

    pub fn apply(self, left: Value, right: Value) -> Result<Value, ValueError> {
        if let Some(cmp) = self.as_compare() {
            return cmp.apply(left, right).map(Value::Bool);
        }
        match self {
            BinaryOp::And | BinaryOp::Or => {
                let mismatch = || ValueError::TypeMismatch {
                    op: self.symbol(),
                    left: left.kind(),
                    right: Some(right.kind()),
                };
                let l = left.truthy().ok_or_else(mismatch)?;
                let r = right.truthy().ok_or_else(mismatch)?;
                Ok(Value::Bool(if self == BinaryOp::And { l && r } else { l || r }))
            }
            _ => {
                let (l, r) = match (left.as_number(), right.as_number()) {
                    (Some(l), Some(r)) => (l, r),
                    _ => {
                        return Err(ValueError::TypeMismatch {
                            op: self.symbol(),
                            left: left.kind(),
                            right: Some(right.kind()),
                        })
                    }
                };
                let out = match self {
                    BinaryOp::Add => l.wrapping_add(r),
                    BinaryOp::Sub => l.wrapping_sub(r),
                    BinaryOp::Mul => l.wrapping_mul(r),
                    BinaryOp::Div => floor_div(l, r).ok_or(ValueError::DivisionByZero { op: "/" })?,
                    BinaryOp::Mod => floor_mod(l, r).ok_or(ValueError::DivisionByZero { op: "%" })?,
                    _ => unreachable!("comparisons and logic handled above"),
                };
                Ok(Value::Int(out))
            }
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Elementwise unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical not (`~`)
    Not,
    /// Arithmetic negation (`-`)
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "~",
            UnaryOp::Neg => "-",
        }
    }

    pub fn apply(self, operand: Value) -> Result<Value, ValueError> {
        let mismatch = || ValueError::TypeMismatch {
            op: self.symbol(),
            left: operand.kind(),
            right: None,
        };
        match self {
            UnaryOp::Not => Ok(Value::Bool(!operand.truthy().ok_or_else(mismatch)?)),
            UnaryOp::Neg => Ok(Value::Int(operand.as_number().ok_or_else(mismatch)?.wrapping_neg())),
        }
    }
}

/// Relational operators shared by elementwise comparisons and selectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// The operator with its operands swapped: `a op b` iff `b op.flip() a`.
    pub fn flip(self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }

    pub fn apply(self, left: Value, right: Value) -> Result<bool, ValueError> {
        use std::cmp::Ordering;

        let ordering: Option<Ordering> = match (left, right) {
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(&b)),
            (Value::Char(_), _) | (_, Value::Char(_)) => None,
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        };

        match (self, ordering) {
            (CompareOp::Eq, ord) => Ok(ord == Some(Ordering::Equal)),
            (CompareOp::Ne, ord) => Ok(ord != Some(Ordering::Equal)),
            (_, None) => Err(ValueError::TypeMismatch {
                op: self.symbol(),
                left: left.kind(),
                right: Some(right.kind()),
            }),
            (CompareOp::Lt, Some(ord)) => Ok(ord == Ordering::Less),
            (CompareOp::Le, Some(ord)) => Ok(ord != Ordering::Greater),
            (CompareOp::Gt, Some(ord)) => Ok(ord == Ordering::Greater),
            (CompareOp::Ge, Some(ord)) => Ok(ord != Ordering::Less),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl From<CompareOp> for BinaryOp {
    fn from(op: CompareOp) -> Self {
        match op {
            CompareOp::Eq => BinaryOp::Eq,
            CompareOp::Ne => BinaryOp::Ne,
            CompareOp::Lt => BinaryOp::Lt,
            CompareOp::Le => BinaryOp::Le,
            CompareOp::Gt => BinaryOp::Gt,
            CompareOp::Ge => BinaryOp::Ge,
        }
    }
}

/// Floor division (rounds toward negative infinity). `None` on zero divisor.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        Some(q.wrapping_sub(1))
    } else {
        Some(q)
    }
}

/// Floor modulo: the result takes the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r.wrapping_add(b))
    } else {
        Some(r)
    }
}

// ============================================================================
// INPUT SEQUENCES
// ============================================================================

/// Conversion of user data into a concrete input sequence.
///
/// Text is read character by character; integer slices become `Int` values.
pub trait IntoInput {
    fn into_input(self) -> Vec<Value>;
}

impl IntoInput for &str {
    fn into_input(self) -> Vec<Value> {
        self.chars().map(Value::Char).collect()
    }
}

impl IntoInput for String {
    fn into_input(self) -> Vec<Value> {
        self.as_str().into_input()
    }
}

impl IntoInput for &String {
    fn into_input(self) -> Vec<Value> {
        self.as_str().into_input()
    }
}

impl IntoInput for Vec<char> {
    fn into_input(self) -> Vec<Value> {
        self.into_iter().map(Value::Char).collect()
    }
}

impl IntoInput for &[i64] {
    fn into_input(self) -> Vec<Value> {
        self.iter().copied().map(Value::Int).collect()
    }
}

impl IntoInput for Vec<i64> {
    fn into_input(self) -> Vec<Value> {
        self.into_iter().map(Value::Int).collect()
    }
}

impl<const N: usize> IntoInput for [i64; N] {
    fn into_input(self) -> Vec<Value> {
        self.into_iter().map(Value::Int).collect()
    }
}

impl IntoInput for &[Value] {
    fn into_input(self) -> Vec<Value> {
        self.to_vec()
    }
}

impl IntoInput for Vec<Value> {
    fn into_input(self) -> Vec<Value> {
        self
    }
}

/// Parse an input as typed at a prompt: `[1, -2, 3]` is a list of ints,
/// anything else is taken as text.
pub fn parse_input(text: &str) -> Result<Vec<Value>, String> {
    let trimmed = text.trim();
    match trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(inner) if inner.trim().is_empty() => Ok(vec![]),
        Some(inner) => inner
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| format!("invalid integer '{}': {}", part.trim(), e))
            })
            .collect(),
        None => Ok(trimmed.into_input()),
    }
}

/// Render a sequence as `[a, b, c]`.
pub fn format_sequence(values: &[Value]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_coerces_bools() {
        assert_eq!(BinaryOp::Add.apply(Value::Bool(true), Value::Int(1)), Ok(Value::Int(2)));
        assert_eq!(BinaryOp::Mul.apply(Value::Int(3), Value::Int(4)), Ok(Value::Int(12)));
    }

    #[test]
    fn test_arithmetic_rejects_chars() {
        let err = BinaryOp::Add.apply(Value::Char('a'), Value::Int(1)).unwrap_err();
        assert_eq!(
            err,
            ValueError::TypeMismatch {
                op: "+",
                left: ValueKind::Char,
                right: Some(ValueKind::Int),
            }
        );
    }

    #[test]
    fn test_floor_division_and_modulo() {
        assert_eq!(BinaryOp::Div.apply(Value::Int(-7), Value::Int(2)), Ok(Value::Int(-4)));
        assert_eq!(BinaryOp::Mod.apply(Value::Int(-7), Value::Int(2)), Ok(Value::Int(1)));
        assert_eq!(BinaryOp::Mod.apply(Value::Int(12), Value::Int(10)), Ok(Value::Int(2)));
        assert_eq!(BinaryOp::Mod.apply(Value::Int(7), Value::Int(-2)), Ok(Value::Int(-1)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            BinaryOp::Div.apply(Value::Int(1), Value::Int(0)),
            Err(ValueError::DivisionByZero { op: "/" })
        );
        assert_eq!(
            BinaryOp::Mod.apply(Value::Int(1), Value::Bool(false)),
            Err(ValueError::DivisionByZero { op: "%" })
        );
    }

    #[test]
    fn test_equality_is_total() {
        assert_eq!(CompareOp::Eq.apply(Value::Char('1'), Value::Int(1)), Ok(false));
        assert_eq!(CompareOp::Ne.apply(Value::Char('1'), Value::Int(1)), Ok(true));
        assert_eq!(CompareOp::Eq.apply(Value::Bool(true), Value::Int(1)), Ok(true));
    }

    #[test]
    fn test_ordering_needs_compatible_kinds() {
        assert_eq!(CompareOp::Lt.apply(Value::Char('a'), Value::Char('b')), Ok(true));
        assert!(CompareOp::Lt.apply(Value::Char('a'), Value::Int(1)).is_err());
    }

    #[test]
    fn test_flip() {
        for op in [CompareOp::Eq, CompareOp::Ne, CompareOp::Lt, CompareOp::Le, CompareOp::Gt, CompareOp::Ge] {
            for (a, b) in [(1, 2), (2, 2), (3, 2)] {
                assert_eq!(
                    op.apply(Value::Int(a), Value::Int(b)),
                    op.flip().apply(Value::Int(b), Value::Int(a))
                );
            }
        }
    }

    #[test]
    fn test_unary() {
        assert_eq!(UnaryOp::Not.apply(Value::Int(0)), Ok(Value::Bool(true)));
        assert_eq!(UnaryOp::Neg.apply(Value::Bool(true)), Ok(Value::Int(-1)));
        assert!(UnaryOp::Not.apply(Value::Char('x')).is_err());
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("[2, 1, -3]").unwrap(), vec![Value::Int(2), Value::Int(1), Value::Int(-3)]);
        assert_eq!(parse_input("ab").unwrap(), vec![Value::Char('a'), Value::Char('b')]);
        assert_eq!(parse_input("[]").unwrap(), vec![]);
        assert!(parse_input("[1, x]").is_err());
    }
}
