// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Protected resources and their attribute registries.
//!
//! Every resource type that can be guarded implements [`ProtectedResource`].
//! Resource attributes are looked up through a statically constructed
//! [`AttributeRegistry`] of named accessor functions, one per type:
//!
//! ```ignore
//! static ATTRIBUTES: AttributeRegistry<Device> = AttributeRegistry::new(&[
//!     ("name", |d: &Device| Some(d.name.as_str().into())),
//!     ("ip_address", |d: &Device| d.ip_address.as_deref().map(Into::into)),
//! ]);
//! ```

use super::attribute::AttributeValue;
use crate::types::{EntityId, PolicyId, UserId};

/// An entity subject to access control.
///
/// A resource without an owner is treated as accessible by everyone.
pub trait ProtectedResource {
	fn resource_id(&self) -> EntityId;

	fn owner_id(&self) -> Option<UserId>;

	/// Attached policy ids in attachment order. These are weak references;
	/// ids that no longer resolve are skipped during evaluation.
	fn policy_ids(&self) -> &[PolicyId];

	/// Resolves a named attribute in the resource namespace.
	fn resource_attribute(&self, name: &str) -> Option<AttributeValue>;

	/// Human-readable kind used in error messages and logs.
	fn resource_kind(&self) -> &'static str {
		"Entity"
	}

	/// Returns true if the resource has no owner or is owned by `user_id`.
	fn is_owned_by_or_unowned(&self, user_id: UserId) -> bool {
		match self.owner_id() {
			None => true,
			Some(owner) => owner == user_id,
		}
	}
}

/// A pure accessor for one named resource attribute.
pub type AttributeAccessor<E> = fn(&E) -> Option<AttributeValue>;

/// Static registry of the attribute names a resource type exposes.
pub struct AttributeRegistry<E: 'static> {
	entries: &'static [(&'static str, AttributeAccessor<E>)],
}

impl<E: 'static> AttributeRegistry<E> {
	pub const fn new(entries: &'static [(&'static str, AttributeAccessor<E>)]) -> Self {
		Self { entries }
	}

	/// Looks up `name` and applies its accessor to `entity`.
	pub fn get(&self, entity: &E, name: &str) -> Option<AttributeValue> {
		self
			.entries
			.iter()
			.find(|(entry_name, _)| *entry_name == name)
			.and_then(|(_, accessor)| accessor(entity))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.iter().any(|(entry_name, _)| *entry_name == name)
	}

	/// Exposed attribute names in registration order.
	pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.entries.iter().map(|(name, _)| *name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Gauge {
		label: String,
		reading: Option<f64>,
	}

	static GAUGE_ATTRIBUTES: AttributeRegistry<Gauge> = AttributeRegistry::new(&[
		("label", |p: &Gauge| Some(AttributeValue::from(p.label.as_str()))),
		("reading", |p: &Gauge| p.reading.map(AttributeValue::Number)),
	]);

	#[test]
	fn registry_applies_named_accessor() {
		let gauge = Gauge {
			label: "north".to_string(),
			reading: Some(3.5),
		};
		assert_eq!(
			GAUGE_ATTRIBUTES.get(&gauge, "label"),
			Some(AttributeValue::from("north"))
		);
		assert_eq!(
			GAUGE_ATTRIBUTES.get(&gauge, "reading"),
			Some(AttributeValue::Number(3.5))
		);
	}

	#[test]
	fn registry_returns_none_for_unknown_or_absent() {
		let gauge = Gauge {
			label: "north".to_string(),
			reading: None,
		};
		assert_eq!(GAUGE_ATTRIBUTES.get(&gauge, "reading"), None);
		assert_eq!(GAUGE_ATTRIBUTES.get(&gauge, "altitude"), None);
		assert!(GAUGE_ATTRIBUTES.contains("reading"));
		assert!(!GAUGE_ATTRIBUTES.contains("altitude"));
	}

	#[test]
	fn names_preserve_registration_order() {
		let names: Vec<_> = GAUGE_ATTRIBUTES.names().collect();
		assert_eq!(names, vec!["label", "reading"]);
	}
}
