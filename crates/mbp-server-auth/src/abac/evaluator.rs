// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fail-closed evaluation of condition trees.
//!
//! [`ConditionEvaluator::evaluate`] is total: it never returns an error and
//! never panics on malformed input.
//!
//! - A leaf whose operands cannot be resolved, or whose resolved values have
//!   incompatible kinds, evaluates to `false`.
//! - `AND` stops at the first `false` child, `OR` at the first `true` child,
//!   children are visited left to right.
//! - A tree that exceeds the configured depth, or contains a `NOT` without
//!   exactly one child, evaluates to `false` as a whole.

use std::cmp::Ordering;

use tracing::{trace, warn};

use super::attribute::{AttributeValue, EvaluationContext};
use super::condition::{ComparisonFunction, CompositeOperator, ConditionNode, Operand};

/// Default maximum condition-tree depth.
pub const DEFAULT_MAX_CONDITION_DEPTH: usize = 64;

/// Reasons evaluation of a whole tree is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abort {
	DepthExceeded,
	MalformedNot,
}

/// Evaluates condition trees against an [`EvaluationContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionEvaluator {
	max_depth: usize,
}

impl Default for ConditionEvaluator {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_CONDITION_DEPTH)
	}
}

impl ConditionEvaluator {
	/// Creates an evaluator that rejects trees deeper than `max_depth`.
	/// A depth of zero is raised to one so single leaves are always evaluable.
	pub fn new(max_depth: usize) -> Self {
		Self {
			max_depth: max_depth.max(1),
		}
	}

	pub fn max_depth(&self) -> usize {
		self.max_depth
	}

	/// Evaluates `node`; any failure inside the tree yields `false`.
	pub fn evaluate(&self, node: &ConditionNode, ctx: &EvaluationContext<'_>) -> bool {
		match self.evaluate_at(node, ctx, 1) {
			Ok(result) => result,
			Err(Abort::DepthExceeded) => {
				warn!(
					max_depth = self.max_depth,
					resource_id = %ctx.resource.resource_id(),
					"condition tree exceeds maximum depth, denying"
				);
				false
			}
			Err(Abort::MalformedNot) => {
				warn!(
					resource_id = %ctx.resource.resource_id(),
					"NOT condition without exactly one child, denying"
				);
				false
			}
		}
	}

	fn evaluate_at(
		&self,
		node: &ConditionNode,
		ctx: &EvaluationContext<'_>,
		depth: usize,
	) -> Result<bool, Abort> {
		if depth > self.max_depth {
			return Err(Abort::DepthExceeded);
		}

		match node {
			ConditionNode::Simple {
				function,
				left,
				right,
			} => Ok(evaluate_simple(*function, left, right, ctx)),
			ConditionNode::Composite { operator, children } => match operator {
				CompositeOperator::And => {
					for child in children {
						if !self.evaluate_at(child, ctx, depth + 1)? {
							return Ok(false);
						}
					}
					Ok(true)
				}
				CompositeOperator::Or => {
					for child in children {
						if self.evaluate_at(child, ctx, depth + 1)? {
							return Ok(true);
						}
					}
					Ok(false)
				}
				CompositeOperator::Not => match children.as_slice() {
					[child] => Ok(!self.evaluate_at(child, ctx, depth + 1)?),
					_ => Err(Abort::MalformedNot),
				},
			},
		}
	}
}

fn resolve_operand(operand: &Operand, ctx: &EvaluationContext<'_>) -> Option<AttributeValue> {
	match operand {
		Operand::Literal { value } => Some(value.clone()),
		Operand::Attribute { namespace, name } => {
			let value = ctx.lookup(*namespace, name);
			if value.is_none() {
				trace!(%namespace, name = %name, "attribute not available");
			}
			value
		}
	}
}

fn evaluate_simple(
	function: ComparisonFunction,
	left: &Operand,
	right: &Operand,
	ctx: &EvaluationContext<'_>,
) -> bool {
	let (Some(left), Some(right)) = (resolve_operand(left, ctx), resolve_operand(right, ctx)) else {
		return false;
	};

	match compare(function, &left, &right) {
		Some(result) => result,
		None => {
			trace!(
				?function,
				left = left.kind(),
				right = right.kind(),
				"incompatible attribute kinds"
			);
			false
		}
	}
}

/// Applies `function` to two resolved values.
///
/// Returns `None` when the value kinds cannot be compared with `function`.
pub fn compare(
	function: ComparisonFunction,
	left: &AttributeValue,
	right: &AttributeValue,
) -> Option<bool> {
	use AttributeValue::*;

	match function {
		ComparisonFunction::Equals => equals(left, right),
		ComparisonFunction::NotEquals => equals(left, right).map(|eq| !eq),
		ComparisonFunction::GreaterThan => ordering(left, right).map(|o| o == Ordering::Greater),
		ComparisonFunction::GreaterThanOrEqual => ordering(left, right).map(|o| o != Ordering::Less),
		ComparisonFunction::LessThan => ordering(left, right).map(|o| o == Ordering::Less),
		ComparisonFunction::LessThanOrEqual => ordering(left, right).map(|o| o != Ordering::Greater),
		ComparisonFunction::Contains => contains(left, right),
		ComparisonFunction::NotContains => contains(left, right).map(|c| !c),
		ComparisonFunction::BeginsWith => match (left, right) {
			(Text(l), Text(r)) => Some(l.starts_with(r.as_str())),
			_ => None,
		},
		ComparisonFunction::EndsWith => match (left, right) {
			(Text(l), Text(r)) => Some(l.ends_with(r.as_str())),
			_ => None,
		},
	}
}

fn equals(left: &AttributeValue, right: &AttributeValue) -> Option<bool> {
	use AttributeValue::*;

	match (left, right) {
		(Boolean(l), Boolean(r)) => Some(l == r),
		(Number(l), Number(r)) => Some(l == r),
		(Text(l), Text(r)) => Some(l == r),
		(List(l), List(r)) => Some(l == r),
		_ => None,
	}
}

/// `None` for incomparable kinds and for NaN operands.
fn ordering(left: &AttributeValue, right: &AttributeValue) -> Option<Ordering> {
	use AttributeValue::*;

	match (left, right) {
		(Number(l), Number(r)) => l.partial_cmp(r),
		(Text(l), Text(r)) => Some(l.cmp(r)),
		_ => None,
	}
}

fn contains(left: &AttributeValue, right: &AttributeValue) -> Option<bool> {
	use AttributeValue::*;

	match (left, right) {
		(Text(l), Text(r)) => Some(l.contains(r.as_str())),
		(List(items), needle) => Some(items.contains(needle)),
		_ => None,
	}
}
