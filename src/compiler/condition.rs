use crate::compiler::runtime::quote;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 2^53, the bound below which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// One side of a comparison, or the value a switch dispatches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Operand {
    /// A previously produced variable or ambient identifier, emitted verbatim.
    Variable(String),
    /// A string literal.
    Text(String),
    Number(f64),
    /// An arbitrary script expression.
    Raw(String),
}

impl Operand {
    pub fn variable(name: impl Into<String>) -> Self {
        Operand::Variable(name.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Operand::Text(value.into())
    }

    /// The variable this operand references, if any.
    pub fn referenced_variable(&self) -> Option<&str> {
        match self {
            Operand::Variable(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Variable(name) => write!(f, "{}", name),
            Operand::Text(text) => write!(f, "{}", quote(text)),
            Operand::Number(n) if n.is_nan() => write!(f, "NaN"),
            Operand::Number(n) if n.is_infinite() => {
                write!(f, "{}", if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            // Whole numbers print without a fraction while they stay exact.
            Operand::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                write!(f, "{}", *n as i64)
            }
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Raw(expr) => write!(f, "{}", expr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    StartsWith,
    Exists,
    NotExists,
}

impl ComparisonOperator {
    /// Unary operators look only at the left operand.
    pub fn is_unary(&self) -> bool {
        matches!(self, ComparisonOperator::Exists | ComparisonOperator::NotExists)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub left: Operand,
    pub operator: ComparisonOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Operand>,
}

impl Comparison {
    pub fn new(left: Operand, operator: ComparisonOperator, right: Operand) -> Self {
        Self {
            left,
            operator,
            right: Some(right),
        }
    }

    pub fn unary(left: Operand, operator: ComparisonOperator) -> Self {
        Self {
            left,
            operator,
            right: None,
        }
    }

    /// Renders the comparison as a script expression. A missing right operand
    /// on a binary operator renders as `null`; validation rejects that earlier.
    pub fn render(&self) -> String {
        let left = &self.left;
        let right = self
            .right
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "null".to_string());
        match self.operator {
            ComparisonOperator::Equals => format!("{} == {}", left, right),
            ComparisonOperator::NotEquals => format!("{} != {}", left, right),
            ComparisonOperator::GreaterThan => format!("{} > {}", left, right),
            ComparisonOperator::GreaterOrEqual => format!("{} >= {}", left, right),
            ComparisonOperator::LessThan => format!("{} < {}", left, right),
            ComparisonOperator::LessOrEqual => format!("{} <= {}", left, right),
            ComparisonOperator::Contains => format!("String({}).includes({})", left, right),
            ComparisonOperator::StartsWith => format!("String({}).startsWith({})", left, right),
            ComparisonOperator::Exists => format!("!!{}", prefixed(left)),
            ComparisonOperator::NotExists => format!("!{}", prefixed(left)),
        }
    }
}

/// An operand under a prefix operator; raw expressions keep their grouping.
fn prefixed(operand: &Operand) -> String {
    match operand {
        Operand::Raw(expr) => format!("({})", expr),
        other => other.to_string(),
    }
}

/// Joins comparisons left to right with their stored logical connectors.
///
/// `connectors[i]` sits between `comparisons[i]` and `comparisons[i + 1]`.
pub fn render_condition(comparisons: &[Comparison], connectors: &[LogicalOperator]) -> String {
    let mut out = String::new();
    for (i, comparison) in comparisons.iter().enumerate() {
        if i > 0 {
            let connector = connectors
                .get(i - 1)
                .copied()
                .unwrap_or(LogicalOperator::And);
            out.push_str(&format!(" {} ", connector.symbol()));
        }
        out.push_str(&comparison.render());
    }
    out
}
