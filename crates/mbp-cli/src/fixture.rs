// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization fixtures and policy files read by `mbp-access`.
//!
//! A fixture bundles everything one decision needs:
//!
//! ```json
//! {
//!   "policies": [ ... ],
//!   "principal": { "id": "...", "username": "alice", "profile": { "department": "lab" } },
//!   "resource": {
//!     "id": "...",
//!     "owner_id": "...",
//!     "policy_ids": ["..."],
//!     "attributes": { "department": "lab" },
//!     "view": { "value": 21.4567 }
//!   },
//!   "access_type": "READ",
//!   "context": "[{\"key\": \"hour\", \"value\": 9}]"
//! }
//! ```
//!
//! `context` is the raw access-request header. It may also be given inline as
//! a JSON object or list. Without `context`, the header named by
//! `access_control.access_request_header` is read from an optional `headers`
//! map, matched case-insensitively:
//!
//! ```json
//! { "headers": { "X-MBP-Access-Request": "{\"hour\": 9}" } }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::Context;
use mbp_server_auth::{
	apply_for_grant, AccessGuard, AccessRequest, AccessType, AttributeValue, ConditionEvaluator, Decision, EntityId,
	Grant, Policy, PolicyId, Principal, ProtectedResource, UserId,
};
use mbp_server_config::AccessControlConfig;
use mbp_server_entities::PolicyStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A resource described entirely by data.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureResource {
	pub id: EntityId,
	#[serde(default)]
	pub owner_id: Option<UserId>,
	#[serde(default)]
	pub policy_ids: Vec<PolicyId>,
	#[serde(default)]
	pub attributes: BTreeMap<String, AttributeValue>,
	/// The result returned to the caller when access is granted.
	#[serde(default)]
	pub view: Value,
}

impl ProtectedResource for FixtureResource {
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

	fn resource_kind(&self) -> &'static str {
		"Resource"
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
	#[serde(default)]
	pub policies: Vec<Policy>,
	pub principal: Principal,
	pub resource: FixtureResource,
	pub access_type: AccessType,
	#[serde(default)]
	pub context: Option<Value>,
	/// Request headers as an HTTP caller would send them.
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
}

impl Fixture {
	/// Parses `context`, falling back to the `header` entry of `headers`.
	pub fn access_request(&self, header: &str) -> anyhow::Result<AccessRequest> {
		let request = match &self.context {
			Some(Value::String(raw)) => AccessRequest::from_header(raw)?,
			Some(Value::Null) | None => match self.header(header) {
				Some(raw) => AccessRequest::from_header(raw)?,
				None => AccessRequest::new(),
			},
			Some(inline) => AccessRequest::from_header(&inline.to_string())?,
		};
		Ok(request)
	}

	fn header(&self, name: &str) -> Option<&str> {
		self
			.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Printed outcome of `mbp-access evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionReport {
	pub allowed: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub granted_by: Option<&'static str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub policy_id: Option<PolicyId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub policy_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub view: Option<Value>,
}

impl DecisionReport {
	fn from_decision(decision: Decision, view: Value) -> Self {
		match decision {
			Decision::Allow(grant) => {
				let granted_by = match &grant {
					Grant::Admin => "admin",
					Grant::Owner => "owner",
					Grant::Policy(_) => "policy",
				};
				let policy = grant.policy();
				Self {
					allowed: true,
					granted_by: Some(granted_by),
					policy_id: policy.map(|p| p.id),
					policy_name: policy.map(|p| p.name.clone()),
					view: Some(apply_for_grant(&grant, view)),
				}
			}
			Decision::Deny { .. } => Self {
				allowed: false,
				granted_by: None,
				policy_id: None,
				policy_name: None,
				view: None,
			},
		}
	}
}

/// Decides the fixture against its own policies plus `shared`.
///
/// Fixture policies replace shared ones with the same id.
pub fn evaluate(
	fixture: Fixture,
	shared: Vec<Policy>,
	settings: &AccessControlConfig,
) -> anyhow::Result<DecisionReport> {
	let max_condition_depth = settings.max_condition_depth;
	let request = fixture
		.access_request(&settings.access_request_header)
		.context("invalid access-request context")?;

	let overridden: HashSet<PolicyId> = fixture.policies.iter().map(|p| p.id).collect();
	let merged: HashMap<PolicyId, Policy> = shared
		.into_iter()
		.filter(|p| !overridden.contains(&p.id))
		.chain(fixture.policies)
		.map(|p| (p.id, p))
		.collect();

	let store = PolicyStore::new(max_condition_depth);
	store.replace_all(merged.into_values()).context("invalid policy")?;
	tracing::debug!(policies = store.len(), "policy store loaded");

	let guard = AccessGuard::with_evaluator(store, ConditionEvaluator::new(max_condition_depth));
	let decision = guard.authorize(&fixture.resource, &fixture.principal, fixture.access_type, &request)?;

	Ok(DecisionReport::from_decision(decision, fixture.resource.view))
}

/// Problems found by `mbp-access check`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckReport {
	pub checked: usize,
	pub problems: Vec<String>,
}

impl CheckReport {
	pub fn is_valid(&self) -> bool {
		self.problems.is_empty()
	}
}

/// Validates every policy and flags duplicate ids or names.
pub fn check_policies(policies: &[Policy], max_condition_depth: usize) -> CheckReport {
	let mut report = CheckReport {
		checked: policies.len(),
		problems: Vec::new(),
	};
	let mut ids = HashSet::new();
	let mut names = HashSet::new();

	for policy in policies {
		if let Err(e) = policy.validate(max_condition_depth) {
			report.problems.push(format!("policy '{}' ({}): {e}", policy.name, policy.id));
		}
		if !ids.insert(policy.id) {
			report.problems.push(format!("policy '{}': duplicate id {}", policy.name, policy.id));
		}
		if !names.insert(policy.name.as_str()) {
			report.problems.push(format!("policy '{}' ({}): duplicate name", policy.name, policy.id));
		}
	}

	report
}

/// Reads and deserializes a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
	let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
	serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
