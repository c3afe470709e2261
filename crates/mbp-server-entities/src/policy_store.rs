// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory policy store.
//!
//! Readers take a snapshot (`Arc` of the whole map) and evaluate without
//! holding any lock. Writers build a new map and swap it in, so an in-flight
//! decision never observes a partially applied update.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use mbp_server_auth::{AccessType, AuthError, Policy, PolicyId, PolicyLookup, Principal, UserId, DEFAULT_MAX_CONDITION_DEPTH};
use tracing::info;

type Snapshot = Arc<HashMap<PolicyId, Arc<Policy>>>;

const KIND: &str = "Policy";

pub struct PolicyStore {
	snapshot: RwLock<Snapshot>,
	max_condition_depth: usize,
}

impl Default for PolicyStore {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_CONDITION_DEPTH)
	}
}

impl PolicyStore {
	/// Creates an empty store that rejects conditions deeper than `max_condition_depth`.
	pub fn new(max_condition_depth: usize) -> Self {
		Self {
			snapshot: RwLock::new(Arc::new(HashMap::new())),
			max_condition_depth,
		}
	}

	/// Current snapshot of all policies.
	pub fn snapshot(&self) -> Snapshot {
		self.snapshot.read().unwrap_or_else(PoisonError::into_inner).clone()
	}

	pub fn len(&self) -> usize {
		self.snapshot().len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshot().is_empty()
	}

	fn update<T>(&self, f: impl FnOnce(&mut HashMap<PolicyId, Arc<Policy>>) -> Result<T, AuthError>) -> Result<T, AuthError> {
		let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
		let mut next = HashMap::clone(&guard);
		let result = f(&mut next)?;
		*guard = Arc::new(next);
		Ok(result)
	}

	/// Validates and stores a new policy authored by `author`.
	///
	/// Policy names are unique across the store.
	#[tracing::instrument(skip(self, policy, author), fields(policy = %policy.name, user_id = %author.id))]
	pub fn create(&self, mut policy: Policy, author: &Principal) -> Result<Arc<Policy>, AuthError> {
		author.require_loginable()?;
		policy.validate(self.max_condition_depth)?;
		policy.owner_id = Some(author.id);

		let policy = Arc::new(policy);
		self.update(|policies| {
			if policies.values().any(|p| p.name == policy.name) {
				return Err(AuthError::EntityAlreadyExists {
					kind: KIND,
					name: policy.name.clone(),
				});
			}
			policies.insert(policy.id, policy.clone());
			Ok(())
		})?;

		info!(policy_id = %policy.id, "policy created");
		Ok(policy)
	}

	pub fn get_for_id(&self, id: PolicyId) -> Result<Arc<Policy>, AuthError> {
		self.find_by_id(id).ok_or_else(|| AuthError::not_found(KIND, id))
	}

	/// Like [`get_for_id`](Self::get_for_id) but only the policy's author may
	/// retrieve it.
	pub fn get_for_id_and_owner(&self, id: PolicyId, owner_id: UserId) -> Result<Arc<Policy>, AuthError> {
		let policy = self.get_for_id(id)?;
		if policy.owner_id != Some(owner_id) {
			return Err(AuthError::MissingOwnerPrivileges);
		}
		Ok(policy)
	}

	/// Policies authored by `owner_id`, ordered by name.
	pub fn all_for_owner(&self, owner_id: UserId) -> Vec<Arc<Policy>> {
		let mut owned: Vec<_> = self
			.snapshot()
			.values()
			.filter(|p| p.owner_id == Some(owner_id))
			.cloned()
			.collect();
		owned.sort_by(|a, b| a.name.cmp(&b.name));
		owned
	}

	/// Removes a policy; only its author may do so.
	#[tracing::instrument(skip(self))]
	pub fn delete(&self, id: PolicyId, owner_id: UserId) -> Result<(), AuthError> {
		self.update(|policies| {
			let policy = policies.get(&id).ok_or_else(|| AuthError::not_found(KIND, id))?;
			if policy.owner_id != Some(owner_id) {
				return Err(AuthError::MissingOwnerPrivileges);
			}
			policies.remove(&id);
			Ok(())
		})?;

		info!(policy_id = %id, "policy deleted");
		Ok(())
	}

	/// Replaces the whole store in a single swap. Every policy is validated
	/// first, and ids and names must be unique within the batch; on error the
	/// store is unchanged.
	pub fn replace_all(&self, policies: impl IntoIterator<Item = Policy>) -> Result<(), AuthError> {
		let mut next = HashMap::new();
		let mut names = HashSet::new();
		for policy in policies {
			policy.validate(self.max_condition_depth)?;
			if next.contains_key(&policy.id) {
				return Err(AuthError::EntityAlreadyExists {
					kind: KIND,
					name: policy.id.to_string(),
				});
			}
			if !names.insert(policy.name.clone()) {
				return Err(AuthError::EntityAlreadyExists {
					kind: KIND,
					name: policy.name,
				});
			}
			next.insert(policy.id, Arc::new(policy));
		}

		let count = next.len();
		*self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
		info!(count, "policy store replaced");
		Ok(())
	}
}

impl PolicyLookup for PolicyStore {
	fn find_by_id(&self, id: PolicyId) -> Option<Arc<Policy>> {
		self.snapshot().get(&id).cloned()
	}

	fn exists_granting_any(&self, ids: &[PolicyId], access_types: &[AccessType]) -> bool {
		let snapshot = self.snapshot();
		ids
			.iter()
			.filter_map(|id| snapshot.get(id))
			.any(|policy| access_types.iter().any(|t| policy.grants(*t)))
	}
}
