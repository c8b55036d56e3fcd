//! Expression evaluator.
//!
//! Predicates use three-valued logic: a comparison with a NULL operand is
//! unknown, and AND/OR combine unknowns the SQL way. Values compare within
//! a family only:
//!
//! - numbers (short, long, number, currency, BCD and numeric literals)
//! - text
//! - booleans
//! - dates, times and timestamps, which also accept ISO-formatted strings
//! - bytes

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pdx_common::ErrorCode;
use pdx_storage::pattern::like_match;
use pdx_storage::{DataType, FieldValue, Row};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::parser::BinaryOperator;
use crate::planner::BoundExpr;

/// Errors raised while evaluating an expression against a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum EvalError {
    /// Operands from different type families.
    #[error("cannot compare {left} with {right} in '{expr}'")]
    IncompatibleTypes {
        expr: String,
        left: DataType,
        right: DataType,
    },

    /// A string that does not parse as the date or time it is compared with.
    #[error("'{value}' is not a valid {expected} in '{expr}'")]
    InvalidTemporal {
        expr: String,
        value: String,
        expected: DataType,
    },

    /// A predicate produced something other than a boolean.
    #[error("'{expr}' is {found}, expected a boolean")]
    NonBooleanPredicate { expr: String, found: DataType },
}

impl EvalError {
    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            EvalError::IncompatibleTypes { .. } | EvalError::InvalidTemporal { .. } => {
                ErrorCode::TypeMismatch
            }
            EvalError::NonBooleanPredicate { .. } => ErrorCode::InvalidPredicate,
        }
    }
}

/// Evaluates `expr` against one combined row, one [`Row`] per source.
pub fn evaluate(expr: &BoundExpr, rows: &[&Row]) -> Result<FieldValue, EvalError> {
    match expr {
        BoundExpr::Column { source, index, .. } => Ok(rows
            .get(*source)
            .and_then(|row| row.get(*index))
            .cloned()
            .unwrap_or(FieldValue::Null)),

        BoundExpr::Literal(value) => Ok(value.clone()),

        BoundExpr::Compare { left, op, right } => {
            let left_val = evaluate(left, rows)?;
            let right_val = evaluate(right, rows)?;
            if left_val.is_null() || right_val.is_null() {
                return Ok(FieldValue::Null);
            }
            let ordering = compare(&left_val, &right_val, expr)?;
            Ok(FieldValue::Boolean(apply(*op, ordering)))
        }

        BoundExpr::And(left, right) => {
            let l = truth(left, rows)?;
            if l == Some(false) {
                return Ok(FieldValue::Boolean(false));
            }
            Ok(match (l, truth(right, rows)?) {
                (_, Some(false)) => FieldValue::Boolean(false),
                (Some(true), Some(true)) => FieldValue::Boolean(true),
                _ => FieldValue::Null,
            })
        }

        BoundExpr::Or(left, right) => {
            let l = truth(left, rows)?;
            if l == Some(true) {
                return Ok(FieldValue::Boolean(true));
            }
            Ok(match (l, truth(right, rows)?) {
                (_, Some(true)) => FieldValue::Boolean(true),
                (Some(false), Some(false)) => FieldValue::Boolean(false),
                _ => FieldValue::Null,
            })
        }

        BoundExpr::Not(inner) => Ok(match truth(inner, rows)? {
            Some(b) => FieldValue::Boolean(!b),
            None => FieldValue::Null,
        }),

        BoundExpr::Like {
            expr: value,
            pattern,
            negated,
        } => {
            let value = evaluate(value, rows)?;
            let pattern = evaluate(pattern, rows)?;
            match (&value, &pattern) {
                (FieldValue::Null, _) | (_, FieldValue::Null) => Ok(FieldValue::Null),
                (FieldValue::Text(v), FieldValue::Text(p)) => {
                    Ok(FieldValue::Boolean(like_match(v, p) != *negated))
                }
                _ => Err(EvalError::IncompatibleTypes {
                    expr: expr.to_string(),
                    left: value.data_type(),
                    right: pattern.data_type(),
                }),
            }
        }

        BoundExpr::IsNull {
            expr: inner,
            negated,
        } => {
            let value = evaluate(inner, rows)?;
            Ok(FieldValue::Boolean(value.is_null() != *negated))
        }
    }
}

/// Evaluates a WHERE predicate. Only TRUE keeps the row.
pub fn evaluate_predicate(expr: &BoundExpr, rows: &[&Row]) -> Result<bool, EvalError> {
    Ok(truth(expr, rows)? == Some(true))
}

/// Evaluates `expr` as a truth value; NULL is unknown.
fn truth(expr: &BoundExpr, rows: &[&Row]) -> Result<Option<bool>, EvalError> {
    match evaluate(expr, rows)? {
        FieldValue::Boolean(b) => Ok(Some(b)),
        FieldValue::Null => Ok(None),
        other => Err(EvalError::NonBooleanPredicate {
            expr: expr.to_string(),
            found: other.data_type(),
        }),
    }
}

fn apply(op: BinaryOperator, ordering: Ordering) -> bool {
    match op {
        BinaryOperator::Eq => ordering == Ordering::Equal,
        BinaryOperator::NotEq => ordering != Ordering::Equal,
        BinaryOperator::Lt => ordering == Ordering::Less,
        BinaryOperator::LtEq => ordering != Ordering::Greater,
        BinaryOperator::Gt => ordering == Ordering::Greater,
        BinaryOperator::GtEq => ordering != Ordering::Less,
        // bound as And/Or, never as a comparison
        BinaryOperator::And | BinaryOperator::Or => false,
    }
}

/// Orders two non-NULL values of one family.
fn compare(left: &FieldValue, right: &FieldValue, expr: &BoundExpr) -> Result<Ordering, EvalError> {
    use FieldValue as V;

    let ordering = match (left, right) {
        (V::Text(a), V::Text(b)) => Some(a.cmp(b)),
        (V::Boolean(a), V::Boolean(b)) => Some(a.cmp(b)),
        (V::Binary(a), V::Binary(b)) => Some(a.cmp(b)),
        (V::Date(a), V::Date(b)) => Some(a.cmp(b)),
        (V::Time(a), V::Time(b)) => Some(a.cmp(b)),
        (V::Timestamp(a), V::Timestamp(b)) => Some(a.cmp(b)),
        (V::Date(a), V::Timestamp(b)) => a.and_hms_opt(0, 0, 0).map(|a| a.cmp(b)),
        (V::Timestamp(a), V::Date(b)) => b.and_hms_opt(0, 0, 0).map(|b| a.cmp(&b)),
        (V::Date(_) | V::Time(_) | V::Timestamp(_), V::Text(s)) => {
            let parsed = parse_temporal(s, left.data_type(), expr)?;
            return compare(left, &parsed, expr);
        }
        (V::Text(s), V::Date(_) | V::Time(_) | V::Timestamp(_)) => {
            let parsed = parse_temporal(s, right.data_type(), expr)?;
            return compare(&parsed, right, expr);
        }
        (a, b) if is_numeric(a) && is_numeric(b) => compare_numbers(a, b),
        _ => None,
    };

    ordering.ok_or_else(|| EvalError::IncompatibleTypes {
        expr: expr.to_string(),
        left: left.data_type(),
        right: right.data_type(),
    })
}

fn is_numeric(value: &FieldValue) -> bool {
    matches!(
        value,
        FieldValue::SmallInt(_)
            | FieldValue::Long(_)
            | FieldValue::Number(_)
            | FieldValue::Currency(_)
            | FieldValue::Decimal(_)
    )
}

/// Exact values compare as decimals; anything involving a float compares
/// as f64.
fn compare_numbers(left: &FieldValue, right: &FieldValue) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (exact(left), exact(right)) {
        return Some(a.cmp(&b));
    }
    let a = left.to_f64()?;
    let b = right.to_f64()?;
    Some(a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b)))
}

fn exact(value: &FieldValue) -> Option<Decimal> {
    match value {
        FieldValue::SmallInt(i) => Some(Decimal::from(*i)),
        FieldValue::Long(i) => Some(Decimal::from(*i)),
        FieldValue::Decimal(d) => Some(*d),
        _ => None,
    }
}

/// Parses an ISO string as a value of `target` type.
fn parse_temporal(s: &str, target: DataType, expr: &BoundExpr) -> Result<FieldValue, EvalError> {
    let s = s.trim();
    let parsed = match target {
        DataType::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(FieldValue::Date),
        DataType::Time => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .ok()
            .map(FieldValue::Time),
        _ => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(FieldValue::Timestamp),
    };
    parsed.ok_or_else(|| EvalError::InvalidTemporal {
        expr: expr.to_string(),
        value: s.to_string(),
        expected: target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(index: usize, data_type: DataType) -> BoundExpr {
        BoundExpr::Column {
            source: 0,
            index,
            name: format!("c{}", index),
            data_type,
        }
    }

    fn lit(value: FieldValue) -> BoundExpr {
        BoundExpr::Literal(value)
    }

    fn cmp(left: BoundExpr, op: BinaryOperator, right: BoundExpr) -> BoundExpr {
        BoundExpr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    fn eval(expr: &BoundExpr, row: &Row) -> Result<FieldValue, EvalError> {
        evaluate(expr, &[row])
    }

    fn row() -> Row {
        Row::new(vec![
            FieldValue::Long(333333333),
            FieldValue::text("Elizabet"),
            FieldValue::Currency(75.0),
            FieldValue::Null,
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            FieldValue::Decimal(Decimal::new(12345, 2)),
            FieldValue::Boolean(true),
        ])
    }

    #[test]
    fn test_numeric_family() {
        let row = row();
        let cases = [
            (cmp(col(0, DataType::Integer), BinaryOperator::Eq, lit(FieldValue::Long(333333333))), true),
            (cmp(col(2, DataType::Currency), BinaryOperator::Eq, lit(FieldValue::Long(75))), true),
            (cmp(col(2, DataType::Currency), BinaryOperator::Lt, lit(FieldValue::Decimal(Decimal::new(755, 1)))), true),
            (cmp(col(5, DataType::Decimal), BinaryOperator::GtEq, lit(FieldValue::Decimal(Decimal::new(123450, 3)))), true),
            (cmp(col(5, DataType::Decimal), BinaryOperator::Gt, lit(FieldValue::SmallInt(123))), true),
            (cmp(col(0, DataType::Integer), BinaryOperator::NotEq, col(0, DataType::Integer)), false),
        ];
        for (expr, expected) in cases {
            assert_eq!(eval(&expr, &row).unwrap(), FieldValue::Boolean(expected), "{}", expr);
        }
    }

    #[test]
    fn test_text_and_boolean() {
        let row = row();
        let expr = cmp(col(1, DataType::Varchar), BinaryOperator::Eq, lit(FieldValue::text("Elizabet")));
        assert_eq!(eval(&expr, &row).unwrap(), FieldValue::Boolean(true));
        let expr = cmp(col(1, DataType::Varchar), BinaryOperator::Lt, lit(FieldValue::text("F")));
        assert_eq!(eval(&expr, &row).unwrap(), FieldValue::Boolean(true));
        let expr = cmp(col(6, DataType::Boolean), BinaryOperator::Eq, lit(FieldValue::Boolean(true)));
        assert_eq!(eval(&expr, &row).unwrap(), FieldValue::Boolean(true));
    }

    #[test]
    fn test_temporal_literals() {
        let row = row();
        let expr = cmp(col(4, DataType::Date), BinaryOperator::Eq, lit(FieldValue::text("2024-02-29")));
        assert_eq!(eval(&expr, &row).unwrap(), FieldValue::Boolean(true));
        let expr = cmp(lit(FieldValue::text("2024-01-01")), BinaryOperator::Lt, col(4, DataType::Date));
        assert_eq!(eval(&expr, &row).unwrap(), FieldValue::Boolean(true));

        let time = Row::new(vec![FieldValue::Time(NaiveTime::from_hms_opt(13, 30, 0).unwrap())]);
        let expr = cmp(col(0, DataType::Time), BinaryOperator::Gt, lit(FieldValue::text("12:00")));
        assert_eq!(eval(&expr, &time).unwrap(), FieldValue::Boolean(true));

        let ts = Row::new(vec![FieldValue::Timestamp(
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(8, 0, 0).unwrap(),
        )]);
        let expr = cmp(col(0, DataType::Timestamp), BinaryOperator::Gt, lit(FieldValue::text("2024-02-29")));
        assert_eq!(eval(&expr, &ts).unwrap(), FieldValue::Boolean(true));
        let expr = cmp(col(0, DataType::Timestamp), BinaryOperator::Eq, lit(FieldValue::text("2024-02-29T08:00:00")));
        assert_eq!(eval(&expr, &ts).unwrap(), FieldValue::Boolean(true));

        let expr = cmp(col(4, DataType::Date), BinaryOperator::Eq, lit(FieldValue::text("yesterday")));
        assert!(matches!(
            eval(&expr, &row).unwrap_err(),
            EvalError::InvalidTemporal { expected: DataType::Date, .. }
        ));
    }

    #[test]
    fn test_incompatible_types() {
        let row = row();
        let expr = cmp(col(1, DataType::Varchar), BinaryOperator::Eq, lit(FieldValue::Long(1)));
        let err = eval(&expr, &row).unwrap_err();
        assert_eq!(
            err,
            EvalError::IncompatibleTypes {
                expr: "c1 = 1".into(),
                left: DataType::Varchar,
                right: DataType::Integer,
            }
        );
        assert_eq!(err.code(), ErrorCode::TypeMismatch);

        let like = BoundExpr::Like {
            expr: Box::new(col(0, DataType::Integer)),
            pattern: Box::new(lit(FieldValue::text("3%"))),
            negated: false,
        };
        assert!(matches!(eval(&like, &row).unwrap_err(), EvalError::IncompatibleTypes { .. }));
    }

    #[test]
    fn test_null_is_unknown() {
        let row = row();
        let null_cmp = cmp(col(3, DataType::Varchar), BinaryOperator::Eq, lit(FieldValue::text("x")));
        assert_eq!(eval(&null_cmp, &row).unwrap(), FieldValue::Null);
        assert!(!evaluate_predicate(&null_cmp, &[&row]).unwrap());

        let not = BoundExpr::Not(Box::new(null_cmp.clone()));
        assert!(!evaluate_predicate(&not, &[&row]).unwrap());

        let t = lit(FieldValue::Boolean(true));
        let f = lit(FieldValue::Boolean(false));
        let and = |l: &BoundExpr, r: &BoundExpr| BoundExpr::And(Box::new(l.clone()), Box::new(r.clone()));
        let or = |l: &BoundExpr, r: &BoundExpr| BoundExpr::Or(Box::new(l.clone()), Box::new(r.clone()));

        assert_eq!(eval(&and(&null_cmp, &f), &row).unwrap(), FieldValue::Boolean(false));
        assert_eq!(eval(&and(&null_cmp, &t), &row).unwrap(), FieldValue::Null);
        assert_eq!(eval(&or(&null_cmp, &t), &row).unwrap(), FieldValue::Boolean(true));
        assert_eq!(eval(&or(&null_cmp, &f), &row).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_short_circuit() {
        let row = row();
        // the right side would fail if evaluated
        let bad = cmp(col(1, DataType::Varchar), BinaryOperator::Eq, lit(FieldValue::Long(1)));
        let and = BoundExpr::And(Box::new(lit(FieldValue::Boolean(false))), Box::new(bad.clone()));
        assert_eq!(eval(&and, &row).unwrap(), FieldValue::Boolean(false));
        let or = BoundExpr::Or(Box::new(lit(FieldValue::Boolean(true))), Box::new(bad.clone()));
        assert_eq!(eval(&or, &row).unwrap(), FieldValue::Boolean(true));
        let or = BoundExpr::Or(Box::new(lit(FieldValue::Boolean(false))), Box::new(bad));
        assert!(eval(&or, &row).is_err());
    }

    #[test]
    fn test_like_and_is_null() {
        let row = row();
        let like = |pattern: &str, negated| BoundExpr::Like {
            expr: Box::new(col(1, DataType::Varchar)),
            pattern: Box::new(lit(FieldValue::text(pattern))),
            negated,
        };
        assert_eq!(eval(&like("eliz%", false), &row).unwrap(), FieldValue::Boolean(true));
        assert_eq!(eval(&like("M%", true), &row).unwrap(), FieldValue::Boolean(true));
        assert_eq!(eval(&like("_lizabet", false), &row).unwrap(), FieldValue::Boolean(true));

        let is_null = BoundExpr::IsNull {
            expr: Box::new(col(3, DataType::Varchar)),
            negated: false,
        };
        assert!(evaluate_predicate(&is_null, &[&row]).unwrap());
        let is_not_null = BoundExpr::IsNull {
            expr: Box::new(col(1, DataType::Varchar)),
            negated: true,
        };
        assert!(evaluate_predicate(&is_not_null, &[&row]).unwrap());
    }

    #[test]
    fn test_non_boolean_predicate() {
        let row = row();
        let err = evaluate_predicate(&col(1, DataType::Varchar), &[&row]).unwrap_err();
        assert_eq!(
            err,
            EvalError::NonBooleanPredicate {
                expr: "c1".into(),
                found: DataType::Varchar,
            }
        );
        assert_eq!(err.code(), ErrorCode::InvalidPredicate);
    }
}
