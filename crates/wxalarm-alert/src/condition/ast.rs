use crate::units::Unit;
use std::fmt;
use std::str::FromStr;
use wxalarm_common::fields::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Equal,
    NotEqual,
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Self::GreaterThan),
            "<" => Ok(Self::LessThan),
            ">=" => Ok(Self::GreaterEqual),
            "<=" => Ok(Self::LessEqual),
            "==" => Ok(Self::Equal),
            "!=" => Ok(Self::NotEqual),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GreaterThan => write!(f, ">"),
            Self::LessThan => write!(f, "<"),
            Self::GreaterEqual => write!(f, ">="),
            Self::LessEqual => write!(f, "<="),
            Self::Equal => write!(f, "=="),
            Self::NotEqual => write!(f, "!="),
        }
    }
}

impl CompareOp {
    /// Exact comparison; `==` and `!=` use no tolerance.
    pub fn check(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => value == threshold,
            Self::NotEqual => value != threshold,
        }
    }
}

/// Direction of a change-detection prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `*field`
    Any,
    /// `>field`
    Increase,
    /// `<field`
    Decrease,
}

impl Direction {
    pub fn prefix(self) -> char {
        match self {
            Direction::Any => '*',
            Direction::Increase => '>',
            Direction::Decrease => '<',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: Field,
    pub op: CompareOp,
    /// The number as written, before unit conversion.
    pub literal: f64,
    pub unit: Option<Unit>,
    /// `literal` converted to the field's canonical unit.
    pub canonical: f64,
}

/// A parsed condition.
///
/// Connectives are binary and left-associative with equal precedence, so
/// `a && b || c` is `Or(And(a, b), c)`. Trees are immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Comparison(Comparison),
    ChangeDetect { field: Field, direction: Direction },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Fields referenced anywhere in the tree, in source order, deduplicated.
    pub fn fields(&self) -> Vec<Field> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut Vec<Field>) {
        match self {
            Expr::Comparison(Comparison { field, .. }) | Expr::ChangeDetect { field, .. } => {
                if !out.contains(field) {
                    out.push(*field);
                }
            }
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_fields(out);
                r.collect_fields(out);
            }
        }
    }

    /// True when any node needs the previous observation.
    pub fn uses_change_detection(&self) -> bool {
        match self {
            Expr::Comparison(_) => false,
            Expr::ChangeDetect { .. } => true,
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.uses_change_detection() || r.uses_change_detection()
            }
        }
    }
}

impl fmt::Display for Expr {
    /// Canonical source form, e.g. `temperature > 85F && *lightning_count`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Comparison(c) => {
                write!(f, "{} {} {}", c.field, c.op, c.literal)?;
                if let Some(unit) = c.unit {
                    write!(f, "{unit}")?;
                }
                Ok(())
            }
            Expr::ChangeDetect { field, direction } => write!(f, "{}{field}", direction.prefix()),
            Expr::And(l, r) => write!(f, "{l} && {r}"),
            Expr::Or(l, r) => write!(f, "{l} || {r}"),
        }
    }
}
