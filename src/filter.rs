//! Statistics evaluation for block-level pruning.
//!
//! # Architecture
//!
//! ```text
//! eval_expr (dispatcher)
//!     ├─> eval_cmp         (=, !=, <, >, ...)
//!     ├─> eval_between     (BETWEEN as AND of bounds)
//!     ├─> eval_in_list     (IN as OR of equalities)
//!     ├─> eval_starts_with (prefix as half-open range)
//!     └─> eval_is_null     (null counts)
//! ```

use std::cmp::Ordering;

use datafusion_common::ScalarValue;

use crate::catalog::{BlockMeta, ColumnStats};
use crate::expr::{CmpOp, Expr, TriState};

/// Decide whether `predicate` conclusively rules out every row of `block`.
///
/// Pure and deterministic. Anything the statistics cannot prove evaluates to
/// unknown and keeps the block: a predicate over a missing column, a literal
/// of a mismatched type, or absent min/max bounds never exclude.
pub fn can_exclude(predicate: &Expr, block: &BlockMeta) -> bool {
    eval_expr(predicate, block) == TriState::False
}

fn eval_expr(expr: &Expr, block: &BlockMeta) -> TriState {
    match expr {
        Expr::True => TriState::True,
        Expr::False => TriState::False,
        Expr::Cmp { column, op, value } => eval_cmp(column, *op, value, block),
        Expr::Between {
            column,
            low,
            high,
            inclusive,
        } => eval_between(column, low, high, *inclusive, block),
        Expr::InList { column, values } => eval_in_list(column, values, block),
        Expr::StartsWith { column, prefix } => eval_starts_with(column, prefix, block),
        Expr::IsNull { column, negated } => eval_is_null(column, *negated, block),
        Expr::And(parts) => parts
            .iter()
            .fold(TriState::True, |acc, expr| acc.and(eval_expr(expr, block))),
        Expr::Or(parts) => parts
            .iter()
            .fold(TriState::False, |acc, expr| acc.or(eval_expr(expr, block))),
        Expr::Not(inner) => eval_expr(inner, block).not(),
    }
}

fn eval_cmp(column: &str, op: CmpOp, value: &ScalarValue, block: &BlockMeta) -> TriState {
    match block.column_stats.get(column) {
        Some(stats) => eval_cmp_stats(op, value, stats),
        None => TriState::Unknown,
    }
}

fn eval_cmp_stats(op: CmpOp, value: &ScalarValue, stats: &ColumnStats) -> TriState {
    let (Some(min), Some(max)) = (&stats.min, &stats.max) else {
        return TriState::Unknown;
    };
    let min_cmp = min.partial_cmp(value);
    let max_cmp = max.partial_cmp(value);
    let nulls = stats.null_count.unwrap_or(0);

    match op {
        CmpOp::Eq => {
            if min_cmp == Some(Ordering::Greater) || max_cmp == Some(Ordering::Less) {
                return TriState::False;
            }
            if min == max && min == value && nulls == 0 {
                return TriState::True;
            }
            TriState::Unknown
        }
        CmpOp::NotEq => {
            if min == max && min == value {
                return TriState::False;
            }
            if (min_cmp == Some(Ordering::Greater) || max_cmp == Some(Ordering::Less)) && nulls == 0
            {
                return TriState::True;
            }
            TriState::Unknown
        }
        CmpOp::Lt => {
            if min_cmp == Some(Ordering::Greater) || min_cmp == Some(Ordering::Equal) {
                return TriState::False;
            }
            if max_cmp == Some(Ordering::Less) && nulls == 0 {
                return TriState::True;
            }
            TriState::Unknown
        }
        CmpOp::LtEq => {
            if min_cmp == Some(Ordering::Greater) {
                return TriState::False;
            }
            if (max_cmp == Some(Ordering::Less) || max_cmp == Some(Ordering::Equal)) && nulls == 0 {
                return TriState::True;
            }
            TriState::Unknown
        }
        CmpOp::Gt => {
            if max_cmp == Some(Ordering::Less) || max_cmp == Some(Ordering::Equal) {
                return TriState::False;
            }
            if min_cmp == Some(Ordering::Greater) && nulls == 0 {
                return TriState::True;
            }
            TriState::Unknown
        }
        CmpOp::GtEq => {
            if max_cmp == Some(Ordering::Less) {
                return TriState::False;
            }
            if (min_cmp == Some(Ordering::Greater) || min_cmp == Some(Ordering::Equal)) && nulls == 0
            {
                return TriState::True;
            }
            TriState::Unknown
        }
    }
}

fn eval_between(
    column: &str,
    low: &ScalarValue,
    high: &ScalarValue,
    inclusive: bool,
    block: &BlockMeta,
) -> TriState {
    let op_low = if inclusive { CmpOp::GtEq } else { CmpOp::Gt };
    let op_high = if inclusive { CmpOp::LtEq } else { CmpOp::Lt };
    let low_eval = eval_cmp(column, op_low, low, block);
    let high_eval = eval_cmp(column, op_high, high, block);
    low_eval.and(high_eval)
}

fn eval_in_list(column: &str, values: &[ScalarValue], block: &BlockMeta) -> TriState {
    let Some(stats) = block.column_stats.get(column) else {
        return TriState::Unknown;
    };
    let mut any_true = false;
    let mut all_false = true;
    for value in values {
        let tri = eval_cmp_stats(CmpOp::Eq, value, stats);
        match tri {
            TriState::True => {
                any_true = true;
                all_false = false;
                break;
            }
            TriState::Unknown => {
                all_false = false;
            }
            TriState::False => {}
        }
    }
    if any_true {
        TriState::True
    } else if all_false {
        TriState::False
    } else {
        TriState::Unknown
    }
}

fn eval_is_null(column: &str, negated: bool, block: &BlockMeta) -> TriState {
    let null_count = block
        .column_stats
        .get(column)
        .and_then(|stats| stats.null_count);
    let base = match null_count {
        Some(0) => TriState::False,
        Some(count) if count == block.row_count => TriState::True,
        _ => TriState::Unknown,
    };
    if negated { base.not() } else { base }
}

fn eval_starts_with(column: &str, prefix: &str, block: &BlockMeta) -> TriState {
    if prefix.is_empty() {
        return TriState::Unknown;
    }
    let Some(stats) = block.column_stats.get(column) else {
        return TriState::Unknown;
    };
    // The column's own bounds tell us which string scalar variant to build.
    let Some(template) = stats.min.as_ref().or(stats.max.as_ref()) else {
        return TriState::Unknown;
    };
    let Some(lower) = string_scalar_like(template, prefix) else {
        return TriState::Unknown;
    };
    let lower_eval = eval_cmp_stats(CmpOp::GtEq, &lower, stats);
    let upper = next_prefix_string(prefix).and_then(|next| string_scalar_like(template, &next));
    match upper {
        Some(upper) => lower_eval.and(eval_cmp_stats(CmpOp::Lt, &upper, stats)),
        None => lower_eval,
    }
}

fn string_scalar_like(template: &ScalarValue, value: &str) -> Option<ScalarValue> {
    match template {
        ScalarValue::Utf8(_) => Some(ScalarValue::Utf8(Some(value.to_string()))),
        ScalarValue::LargeUtf8(_) => Some(ScalarValue::LargeUtf8(Some(value.to_string()))),
        ScalarValue::Utf8View(_) => Some(ScalarValue::Utf8View(Some(value.to_string()))),
        _ => None,
    }
}

fn next_prefix_string(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    for idx in (0..chars.len()).rev() {
        let mut next = chars[idx] as u32 + 1;
        while next <= char::MAX as u32 {
            if let Some(ch) = char::from_u32(next) {
                chars[idx] = ch;
                chars.truncate(idx + 1);
                return Some(chars.into_iter().collect());
            }
            next += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn int_block(min: i32, max: i32, null_count: Option<u64>) -> BlockMeta {
        BlockMeta {
            relative_path: "part-0.parquet".to_string(),
            starting_offset: 4,
            compressed_length: 128,
            row_count: 100,
            column_stats: HashMap::from([(
                "v".to_string(),
                ColumnStats::new(
                    Some(ScalarValue::Int32(Some(min))),
                    Some(ScalarValue::Int32(Some(max))),
                    null_count,
                ),
            )]),
        }
    }

    fn utf8_block(min: &str, max: &str) -> BlockMeta {
        BlockMeta {
            relative_path: "part-0.parquet".to_string(),
            starting_offset: 4,
            compressed_length: 128,
            row_count: 100,
            column_stats: HashMap::from([(
                "s".to_string(),
                ColumnStats::new(
                    Some(ScalarValue::Utf8(Some(min.to_string()))),
                    Some(ScalarValue::Utf8(Some(max.to_string()))),
                    Some(0),
                ),
            )]),
        }
    }

    #[test]
    fn eq_outside_bounds_excludes() {
        let block = int_block(10, 19, Some(0));
        assert!(can_exclude(&Expr::eq("v", ScalarValue::Int32(Some(25))), &block));
        assert!(!can_exclude(&Expr::eq("v", ScalarValue::Int32(Some(12))), &block));
    }

    #[test]
    fn unknown_column_never_excludes() {
        let block = int_block(10, 19, Some(0));
        assert!(!can_exclude(
            &Expr::eq("other", ScalarValue::Int32(Some(25))),
            &block
        ));
    }

    #[test]
    fn mismatched_literal_type_never_excludes() {
        let block = int_block(10, 19, Some(0));
        assert!(!can_exclude(
            &Expr::eq("v", ScalarValue::Utf8(Some("25".to_string()))),
            &block
        ));
    }

    #[test]
    fn missing_bounds_never_exclude() {
        let mut block = int_block(10, 19, Some(0));
        block
            .column_stats
            .insert("v".to_string(), ColumnStats::new(None, None, Some(100)));
        assert!(!can_exclude(&Expr::eq("v", ScalarValue::Int32(Some(25))), &block));
    }

    #[test]
    fn range_operators_respect_bounds() {
        let block = int_block(10, 19, Some(0));
        assert!(can_exclude(&Expr::lt("v", ScalarValue::Int32(Some(10))), &block));
        assert!(!can_exclude(&Expr::lt_eq("v", ScalarValue::Int32(Some(10))), &block));
        assert!(can_exclude(&Expr::gt("v", ScalarValue::Int32(Some(19))), &block));
        assert!(!can_exclude(&Expr::gt_eq("v", ScalarValue::Int32(Some(19))), &block));
    }

    #[test]
    fn between_excludes_disjoint_range() {
        let block = int_block(10, 19, Some(0));
        let expr = Expr::between(
            "v",
            ScalarValue::Int32(Some(30)),
            ScalarValue::Int32(Some(40)),
            true,
        );
        assert!(can_exclude(&expr, &block));

        let overlapping = Expr::between(
            "v",
            ScalarValue::Int32(Some(15)),
            ScalarValue::Int32(Some(40)),
            true,
        );
        assert!(!can_exclude(&overlapping, &block));
    }

    #[test]
    fn in_list_excludes_only_when_every_value_misses() {
        let block = int_block(10, 19, Some(0));
        let all_miss = Expr::in_list(
            "v",
            vec![ScalarValue::Int32(Some(1)), ScalarValue::Int32(Some(42))],
        );
        assert!(can_exclude(&all_miss, &block));

        let one_hit = Expr::in_list(
            "v",
            vec![ScalarValue::Int32(Some(1)), ScalarValue::Int32(Some(12))],
        );
        assert!(!can_exclude(&one_hit, &block));
    }

    #[test]
    fn is_null_uses_null_counts() {
        let no_nulls = int_block(10, 19, Some(0));
        assert!(can_exclude(&Expr::is_null("v"), &no_nulls));
        assert!(!can_exclude(&Expr::is_not_null("v"), &no_nulls));

        let mut all_nulls = int_block(10, 19, Some(100));
        all_nulls
            .column_stats
            .insert("v".to_string(), ColumnStats::new(None, None, Some(100)));
        assert!(!can_exclude(&Expr::is_null("v"), &all_nulls));
        assert!(can_exclude(&Expr::is_not_null("v"), &all_nulls));

        let unknown = int_block(10, 19, None);
        assert!(!can_exclude(&Expr::is_null("v"), &unknown));
        assert!(!can_exclude(&Expr::is_not_null("v"), &unknown));
    }

    #[test]
    fn starts_with_excludes_outside_prefix_range() {
        let block = utf8_block("apple", "banana");
        assert!(can_exclude(&Expr::starts_with("s", "car"), &block));
        assert!(!can_exclude(&Expr::starts_with("s", "app"), &block));
        // Empty prefix proves nothing either way.
        assert!(!can_exclude(&Expr::starts_with("s", ""), &block));
    }

    #[test]
    fn not_inverts_definite_answers_only() {
        let single_valued = int_block(5, 5, Some(0));
        assert!(can_exclude(
            &Expr::not(Expr::eq("v", ScalarValue::Int32(Some(5)))),
            &single_valued
        ));

        let wide = int_block(0, 9, Some(0));
        assert!(!can_exclude(
            &Expr::not(Expr::eq("v", ScalarValue::Int32(Some(5)))),
            &wide
        ));
    }

    #[test]
    fn conjunction_and_disjunction_fold() {
        let block = int_block(10, 19, Some(0));
        let and_expr = Expr::and(vec![
            Expr::gt_eq("v", ScalarValue::Int32(Some(0))),
            Expr::eq("v", ScalarValue::Int32(Some(42))),
        ]);
        assert!(can_exclude(&and_expr, &block));

        let or_expr = Expr::or(vec![
            Expr::eq("v", ScalarValue::Int32(Some(42))),
            Expr::eq("v", ScalarValue::Int32(Some(12))),
        ]);
        assert!(!can_exclude(&or_expr, &block));
    }
}
