// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policies and the policy evaluation service.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::attribute::EvaluationContext;
use super::condition::ConditionNode;
use super::effect::Effect;
use super::evaluator::ConditionEvaluator;
use crate::error::{AuthError, Result};
use crate::types::{AccessType, PolicyId, UserId};

/// A named, reusable access rule.
///
/// `priority` is stored for compatibility but does not influence evaluation:
/// policies attached to a resource are consulted in attachment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
	pub id: PolicyId,
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub priority: i32,
	pub access_types: BTreeSet<AccessType>,
	pub condition: ConditionNode,
	#[serde(default)]
	pub effects: Vec<Effect>,
	#[serde(default)]
	pub owner_id: Option<UserId>,
}

impl Policy {
	pub fn new(
		name: impl Into<String>,
		access_types: impl IntoIterator<Item = AccessType>,
		condition: ConditionNode,
	) -> Self {
		Self {
			id: PolicyId::generate(),
			name: name.into(),
			description: String::new(),
			priority: 0,
			access_types: access_types.into_iter().collect(),
			condition,
			effects: Vec::new(),
			owner_id: None,
		}
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	pub fn with_effect(mut self, effect: Effect) -> Self {
		self.effects.push(effect);
		self
	}

	pub fn with_owner(mut self, owner_id: UserId) -> Self {
		self.owner_id = Some(owner_id);
		self
	}

	/// Whether the policy applies to `access_type` at all.
	pub fn grants(&self, access_type: AccessType) -> bool {
		self.access_types.contains(&access_type)
	}

	/// Checks the policy is well formed before it is stored.
	pub fn validate(&self, max_condition_depth: usize) -> Result<()> {
		if self.name.trim().is_empty() {
			return Err(AuthError::InvalidPolicy("name must not be empty".to_string()));
		}
		if self.access_types.is_empty() {
			return Err(AuthError::InvalidPolicy(format!(
				"policy '{}' grants no access types",
				self.name
			)));
		}
		self.condition.validate(max_condition_depth)
	}
}

/// Decides whether a single policy grants an operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEvaluator {
	conditions: ConditionEvaluator,
}

impl PolicyEvaluator {
	pub fn new(conditions: ConditionEvaluator) -> Self {
		Self { conditions }
	}

	pub fn conditions(&self) -> &ConditionEvaluator {
		&self.conditions
	}

	/// Returns true iff `policy` covers `access_type` and its condition holds.
	///
	/// The condition is not evaluated at all when the access type does not match.
	pub fn evaluate(&self, policy: &Policy, access_type: AccessType, ctx: &EvaluationContext<'_>) -> bool {
		if !policy.grants(access_type) {
			trace!(policy_id = %policy.id, %access_type, "policy does not cover access type");
			return false;
		}

		let granted = self.conditions.evaluate(&policy.condition, ctx);
		trace!(policy_id = %policy.id, %access_type, granted, "policy evaluated");
		granted
	}
}
