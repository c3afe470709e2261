// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixtures shared by the ABAC unit tests.

use std::collections::BTreeMap;

use super::attribute::AttributeValue;
use super::condition::{ComparisonFunction, ConditionNode, Operand};
use super::resource::ProtectedResource;
use crate::types::{EntityId, PolicyId, UserId};

/// A leaf that always evaluates to `value`.
pub fn always(value: bool) -> ConditionNode {
	ConditionNode::simple(
		ComparisonFunction::Equals,
		Operand::literal(true),
		Operand::literal(value),
	)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestResource {
	pub id: EntityId,
	pub owner_id: Option<UserId>,
	pub policy_ids: Vec<PolicyId>,
	pub attributes: BTreeMap<String, AttributeValue>,
}

impl TestResource {
	pub fn owned_by(owner_id: UserId) -> Self {
		Self {
			id: EntityId::generate(),
			owner_id: Some(owner_id),
			policy_ids: Vec::new(),
			attributes: BTreeMap::new(),
		}
	}

	pub fn unowned() -> Self {
		Self {
			owner_id: None,
			..Self::owned_by(UserId::generate())
		}
	}

	pub fn with_attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
		self.attributes.insert(name.to_string(), value.into());
		self
	}

	pub fn with_policy(mut self, policy_id: PolicyId) -> Self {
		self.policy_ids.push(policy_id);
		self
	}
}

impl ProtectedResource for TestResource {
	fn resource_id(&self) -> EntityId {
		self.id
	}

	fn owner_id(&self) -> Option<UserId> {
		self.owner_id
	}

	fn policy_ids(&self) -> &[PolicyId] {
		&self.policy_ids
	}

	fn resource_attribute(&self, name: &str) -> Option<AttributeValue> {
		self.attributes.get(name).cloned()
	}
}

/// A resource owned by someone else whose attributes must never be read.
pub struct PoisonResource;

impl ProtectedResource for PoisonResource {
	fn resource_id(&self) -> EntityId {
		EntityId::new(uuid::Uuid::nil())
	}

	fn owner_id(&self) -> Option<UserId> {
		Some(UserId::new(uuid::Uuid::nil()))
	}

	fn policy_ids(&self) -> &[PolicyId] {
		&[]
	}

	fn resource_attribute(&self, name: &str) -> Option<AttributeValue> {
		panic!("resource attribute '{name}' must not be resolved");
	}
}
