// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access guard: the authorization decision for one principal and resource.
//!
//! [`AccessGuard::authorize`] applies, in order:
//!
//! 1. **Loginable check**: principals that may not log in are rejected outright
//! 2. **Admin bypass**: administrators are always allowed
//! 3. **Ownership**: the owner of a resource, or anyone for an unowned resource
//! 4. **Attached policies**: the first policy, in attachment order, that grants
//!    the access type and whose condition holds
//!
//! Anything else is denied. Decisions are pure functions of their inputs; the
//! guard holds no mutable state and can be shared freely between threads.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::attribute::{AccessRequest, EvaluationContext};
use super::effect::{apply_effects, Effect};
use super::evaluator::ConditionEvaluator;
use super::policy::{Policy, PolicyEvaluator};
use super::resource::ProtectedResource;
use crate::error::{AuthError, Result};
use crate::types::{AccessType, EntityId, PolicyId};
use crate::user::Principal;

/// Resolves policy ids attached to resources.
pub trait PolicyLookup: Send + Sync {
	fn find_by_id(&self, id: PolicyId) -> Option<Arc<Policy>>;

	/// Cheap pre-filter: true if any of `ids` resolves to a policy covering
	/// one of `access_types`. Conditions are not evaluated.
	fn exists_granting_any(&self, ids: &[PolicyId], access_types: &[AccessType]) -> bool {
		ids
			.iter()
			.filter_map(|id| self.find_by_id(*id))
			.any(|policy| access_types.iter().any(|t| policy.grants(*t)))
	}
}

impl PolicyLookup for HashMap<PolicyId, Arc<Policy>> {
	fn find_by_id(&self, id: PolicyId) -> Option<Arc<Policy>> {
		self.get(&id).cloned()
	}
}

impl<L: PolicyLookup + ?Sized> PolicyLookup for Arc<L> {
	fn find_by_id(&self, id: PolicyId) -> Option<Arc<Policy>> {
		(**self).find_by_id(id)
	}

	fn exists_granting_any(&self, ids: &[PolicyId], access_types: &[AccessType]) -> bool {
		(**self).exists_granting_any(ids, access_types)
	}
}

/// Why access was allowed.
#[derive(Debug, Clone, PartialEq)]
pub enum Grant {
	Admin,
	Owner,
	Policy(Arc<Policy>),
}

impl Grant {
	/// Effects to apply to the result. Only policy grants carry effects.
	pub fn effects(&self) -> &[Effect] {
		match self {
			Grant::Policy(policy) => &policy.effects,
			Grant::Admin | Grant::Owner => &[],
		}
	}

	pub fn policy(&self) -> Option<&Arc<Policy>> {
		match self {
			Grant::Policy(policy) => Some(policy),
			Grant::Admin | Grant::Owner => None,
		}
	}
}

/// Outcome of an authorization decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
	Allow(Grant),
	Deny {
		resource_id: EntityId,
		access_type: AccessType,
	},
}

impl Decision {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Decision::Allow(_))
	}

	/// Converts a deny into [`AuthError::MissingPermission`].
	pub fn into_grant(self) -> Result<Grant> {
		match self {
			Decision::Allow(grant) => Ok(grant),
			Decision::Deny {
				resource_id,
				access_type,
			} => Err(AuthError::missing_permission(resource_id, access_type)),
		}
	}
}

/// Applies the effects of `grant` to `view`; admin and owner grants leave it unchanged.
pub fn apply_for_grant(grant: &Grant, view: Value) -> Value {
	apply_effects(grant.effects(), view)
}

/// Makes access decisions against policies resolved through `L`.
#[derive(Debug, Clone)]
pub struct AccessGuard<L> {
	policies: L,
	evaluator: PolicyEvaluator,
}

impl<L: PolicyLookup> AccessGuard<L> {
	pub fn new(policies: L) -> Self {
		Self::with_evaluator(policies, ConditionEvaluator::default())
	}

	pub fn with_evaluator(policies: L, conditions: ConditionEvaluator) -> Self {
		Self {
			policies,
			evaluator: PolicyEvaluator::new(conditions),
		}
	}

	pub fn policies(&self) -> &L {
		&self.policies
	}

	/// Decides whether `principal` may perform `access_type` on `resource`.
	///
	/// Fails only with [`AuthError::UserNotLoginable`]; a missing grant is a
	/// [`Decision::Deny`].
	#[instrument(
		level = "debug",
		skip(self, resource, principal, request),
		fields(
			resource_id = %resource.resource_id(),
			user_id = %principal.id,
			access_type = %access_type,
		)
	)]
	pub fn authorize(
		&self,
		resource: &dyn ProtectedResource,
		principal: &Principal,
		access_type: AccessType,
		request: &AccessRequest,
	) -> Result<Decision> {
		principal.require_loginable()?;

		if principal.is_admin {
			debug!("allowed: admin");
			return Ok(Decision::Allow(Grant::Admin));
		}

		if resource.is_owned_by_or_unowned(principal.id) {
			debug!("allowed: owner");
			return Ok(Decision::Allow(Grant::Owner));
		}

		if let Some(policy) = self.first_policy_granting_access(resource, principal, access_type, request) {
			debug!(policy_id = %policy.id, policy = %policy.name, "allowed: policy");
			return Ok(Decision::Allow(Grant::Policy(policy)));
		}

		debug!("denied: no granting policy");
		Ok(Decision::Deny {
			resource_id: resource.resource_id(),
			access_type,
		})
	}

	/// Like [`authorize`](Self::authorize) but turns a deny into
	/// [`AuthError::MissingPermission`].
	pub fn require(
		&self,
		resource: &dyn ProtectedResource,
		principal: &Principal,
		access_type: AccessType,
		request: &AccessRequest,
	) -> Result<Grant> {
		self.authorize(resource, principal, access_type, request)?.into_grant()
	}

	/// First attached policy, in attachment order, that grants `access_type`.
	///
	/// Ownership and admin status are not considered. Ids that no longer
	/// resolve are skipped.
	pub fn first_policy_granting_access(
		&self,
		resource: &dyn ProtectedResource,
		principal: &Principal,
		access_type: AccessType,
		request: &AccessRequest,
	) -> Option<Arc<Policy>> {
		let ctx = EvaluationContext::new(resource, principal, request);

		for policy_id in resource.policy_ids() {
			let Some(policy) = self.policies.find_by_id(*policy_id) else {
				warn!(
					%policy_id,
					resource_id = %resource.resource_id(),
					"attached policy not found, skipping"
				);
				continue;
			};

			if self.evaluator.evaluate(&policy, access_type, &ctx) {
				return Some(policy);
			}
		}

		None
	}

	/// Keeps the items `principal` may access, in input order.
	#[instrument(
		level = "debug",
		skip(self, items, principal, request),
		fields(
			user_id = %principal.id,
			access_type = %access_type,
			candidates = items.len(),
		)
	)]
	pub fn filter<E: ProtectedResource>(
		&self,
		items: Vec<E>,
		principal: &Principal,
		access_type: AccessType,
		request: &AccessRequest,
	) -> Result<Vec<E>> {
		principal.require_loginable()?;

		if principal.is_admin {
			return Ok(items);
		}

		let visible: Vec<E> = items
			.into_iter()
			.filter(|item| {
				item.is_owned_by_or_unowned(principal.id)
					|| (self
						.policies
						.exists_granting_any(item.policy_ids(), &[access_type])
						&& self
							.first_policy_granting_access(item, principal, access_type, request)
							.is_some())
			})
			.collect();

		debug!(visible = visible.len(), "filtered collection");
		Ok(visible)
	}
}
