use std::cmp::Ordering;
use std::fmt;

/// Predicate operators.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    NotEq,
}

impl PredicateOp {
    /// Whether `left op right` holds, given the three-way comparison of left against right.
    ///
    /// # Arguments
    ///
    /// * `ord` - Result of comparing the left value with the right value.
    pub fn matches(&self, ord: Ordering) -> bool {
        match self {
            PredicateOp::Equals => ord == Ordering::Equal,
            PredicateOp::GreaterThan => ord == Ordering::Greater,
            PredicateOp::LessThan => ord == Ordering::Less,
            PredicateOp::LessThanOrEq => ord != Ordering::Greater,
            PredicateOp::GreaterThanOrEq => ord != Ordering::Less,
            PredicateOp::NotEq => ord != Ordering::Equal,
        }
    }

    pub fn is_equality(&self) -> bool {
        *self == PredicateOp::Equals
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            PredicateOp::Equals => "=",
            PredicateOp::GreaterThan => ">",
            PredicateOp::LessThan => "<",
            PredicateOp::LessThanOrEq => "<=",
            PredicateOp::GreaterThanOrEq => ">=",
            PredicateOp::NotEq => "!=",
        };
        write!(f, "{}", op_str)
    }
}
