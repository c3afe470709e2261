// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy condition trees.
//!
//! A condition is a finite tree of [`ConditionNode`]s: leaf comparisons
//! ([`ConditionNode::Simple`]) combined by boolean operators
//! ([`ConditionNode::Composite`]). Each node exclusively owns its children.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::attribute::{AttributeNamespace, AttributeRef, AttributeValue};
use crate::error::AuthError;

/// Comparison applied by a simple condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonFunction {
	Equals,
	NotEquals,
	GreaterThan,
	GreaterThanOrEqual,
	LessThan,
	LessThanOrEqual,
	Contains,
	NotContains,
	BeginsWith,
	EndsWith,
}

impl ComparisonFunction {
	/// Maps a query-builder operator name (`equal`, `less_or_equal`, ...)
	/// onto a comparison function.
	pub fn from_operator(operator: &str) -> Option<Self> {
		let function = match operator {
			"equal" => ComparisonFunction::Equals,
			"not_equal" => ComparisonFunction::NotEquals,
			"greater" => ComparisonFunction::GreaterThan,
			"greater_or_equal" => ComparisonFunction::GreaterThanOrEqual,
			"less" => ComparisonFunction::LessThan,
			"less_or_equal" => ComparisonFunction::LessThanOrEqual,
			"contains" => ComparisonFunction::Contains,
			"not_contains" => ComparisonFunction::NotContains,
			"begins_with" => ComparisonFunction::BeginsWith,
			"ends_with" => ComparisonFunction::EndsWith,
			_ => return None,
		};
		Some(function)
	}

	fn symbol(&self) -> &'static str {
		match self {
			ComparisonFunction::Equals => "==",
			ComparisonFunction::NotEquals => "!=",
			ComparisonFunction::GreaterThan => ">",
			ComparisonFunction::GreaterThanOrEqual => ">=",
			ComparisonFunction::LessThan => "<",
			ComparisonFunction::LessThanOrEqual => "<=",
			ComparisonFunction::Contains => "contains",
			ComparisonFunction::NotContains => "does not contain",
			ComparisonFunction::BeginsWith => "begins with",
			ComparisonFunction::EndsWith => "ends with",
		}
	}
}

/// Boolean combinator of a composite condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositeOperator {
	And,
	Or,
	Not,
}

/// One side of a simple comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
	Attribute {
		namespace: AttributeNamespace,
		name: String,
	},
	Literal {
		value: AttributeValue,
	},
}

impl Operand {
	pub fn attribute(reference: AttributeRef) -> Self {
		Operand::Attribute {
			namespace: reference.namespace,
			name: reference.name,
		}
	}

	pub fn literal(value: impl Into<AttributeValue>) -> Self {
		Operand::Literal {
			value: value.into(),
		}
	}
}

impl From<AttributeRef> for Operand {
	fn from(reference: AttributeRef) -> Self {
		Operand::attribute(reference)
	}
}

impl fmt::Display for Operand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operand::Attribute { namespace, name } => write!(f, "{namespace}.{name}"),
			Operand::Literal { value } => write!(f, "{value}"),
		}
	}
}

/// A node in a policy condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionNode {
	Simple {
		function: ComparisonFunction,
		left: Operand,
		right: Operand,
	},
	Composite {
		operator: CompositeOperator,
		children: Vec<ConditionNode>,
	},
}

impl ConditionNode {
	pub fn simple(function: ComparisonFunction, left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
		ConditionNode::Simple {
			function,
			left: left.into(),
			right: right.into(),
		}
	}

	/// Compares an attribute against a fixed value.
	pub fn compare(function: ComparisonFunction, attribute: AttributeRef, value: impl Into<AttributeValue>) -> Self {
		ConditionNode::Simple {
			function,
			left: Operand::attribute(attribute),
			right: Operand::literal(value),
		}
	}

	pub fn and(children: Vec<ConditionNode>) -> Self {
		ConditionNode::Composite {
			operator: CompositeOperator::And,
			children,
		}
	}

	pub fn or(children: Vec<ConditionNode>) -> Self {
		ConditionNode::Composite {
			operator: CompositeOperator::Or,
			children,
		}
	}

	#[allow(clippy::should_implement_trait)]
	pub fn not(child: ConditionNode) -> Self {
		ConditionNode::Composite {
			operator: CompositeOperator::Not,
			children: vec![child],
		}
	}

	/// Depth of the tree; a single leaf has depth 1.
	pub fn depth(&self) -> usize {
		match self {
			ConditionNode::Simple { .. } => 1,
			ConditionNode::Composite { children, .. } => {
				1 + children.iter().map(ConditionNode::depth).max().unwrap_or(0)
			}
		}
	}

	/// Checks structural rules: `NOT` has exactly one child and the tree is no
	/// deeper than `max_depth`.
	pub fn validate(&self, max_depth: usize) -> Result<(), AuthError> {
		self.validate_at(1, max_depth)
	}

	fn validate_at(&self, level: usize, max_depth: usize) -> Result<(), AuthError> {
		if level > max_depth {
			return Err(AuthError::InvalidPolicy(format!(
				"condition is nested deeper than {max_depth} levels"
			)));
		}

		if let ConditionNode::Composite { operator, children } = self {
			if *operator == CompositeOperator::Not && children.len() != 1 {
				return Err(AuthError::InvalidPolicy(format!(
					"NOT requires exactly one child, found {}",
					children.len()
				)));
			}
			for child in children {
				child.validate_at(level + 1, max_depth)?;
			}
		}

		Ok(())
	}

	/// Human-readable rendering of the condition, e.g.
	/// `(principal.department == resource.department AND context.hour < 18)`.
	pub fn describe(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for ConditionNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConditionNode::Simple {
				function,
				left,
				right,
			} => write!(f, "{left} {} {right}", function.symbol()),
			ConditionNode::Composite { operator, children } => match operator {
				CompositeOperator::Not => {
					write!(f, "NOT ")?;
					match children.first() {
						Some(child) => write!(f, "({child})"),
						None => write!(f, "()"),
					}
				}
				CompositeOperator::And | CompositeOperator::Or => {
					let joiner = if *operator == CompositeOperator::And {
						" AND "
					} else {
						" OR "
					};
					write!(f, "(")?;
					for (i, child) in children.iter().enumerate() {
						if i > 0 {
							f.write_str(joiner)?;
						}
						write!(f, "{child}")?;
					}
					write!(f, ")")
				}
			},
		}
	}
}
