// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed attribute values, attribute references and their resolution.
//!
//! Attributes live in one of three namespaces:
//!
//! - [`AttributeNamespace::Resource`]: exposed by the protected entity through
//!   its static [`AttributeRegistry`](super::AttributeRegistry)
//! - [`AttributeNamespace::Principal`]: fixed accessors on the requesting
//!   [`Principal`] plus its extended profile
//! - [`AttributeNamespace::Context`]: the caller-supplied [`AccessRequest`]
//!
//! Resolution is a pure function of the (resource, principal, request) triple.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::resource::ProtectedResource;
use crate::error::AuthError;
use crate::user::Principal;

/// A typed attribute value.
///
/// Serialized untagged so that JSON literals map directly onto variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
	Boolean(bool),
	Number(f64),
	Text(String),
	List(Vec<AttributeValue>),
}

impl AttributeValue {
	/// Short name of the value's kind, used in logs.
	pub fn kind(&self) -> &'static str {
		match self {
			AttributeValue::Boolean(_) => "boolean",
			AttributeValue::Number(_) => "number",
			AttributeValue::Text(_) => "text",
			AttributeValue::List(_) => "list",
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			AttributeValue::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			AttributeValue::Text(s) => Some(s),
			_ => None,
		}
	}
}

impl fmt::Display for AttributeValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttributeValue::Boolean(b) => write!(f, "{b}"),
			AttributeValue::Number(n) => write!(f, "{n}"),
			AttributeValue::Text(s) => write!(f, "'{s}'"),
			AttributeValue::List(items) => {
				write!(f, "[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{item}")?;
				}
				write!(f, "]")
			}
		}
	}
}

impl From<bool> for AttributeValue {
	fn from(value: bool) -> Self {
		AttributeValue::Boolean(value)
	}
}

impl From<f64> for AttributeValue {
	fn from(value: f64) -> Self {
		AttributeValue::Number(value)
	}
}

impl From<i64> for AttributeValue {
	fn from(value: i64) -> Self {
		AttributeValue::Number(value as f64)
	}
}

impl From<&str> for AttributeValue {
	fn from(value: &str) -> Self {
		AttributeValue::Text(value.to_string())
	}
}

impl From<String> for AttributeValue {
	fn from(value: String) -> Self {
		AttributeValue::Text(value)
	}
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
	fn from(values: Vec<T>) -> Self {
		AttributeValue::List(values.into_iter().map(Into::into).collect())
	}
}

/// The namespace an attribute is resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeNamespace {
	Resource,
	Principal,
	Context,
}

impl fmt::Display for AttributeNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttributeNamespace::Resource => write!(f, "resource"),
			AttributeNamespace::Principal => write!(f, "principal"),
			AttributeNamespace::Context => write!(f, "context"),
		}
	}
}

/// Reference to a named attribute within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRef {
	pub namespace: AttributeNamespace,
	pub name: String,
}

impl AttributeRef {
	pub fn new(namespace: AttributeNamespace, name: impl Into<String>) -> Self {
		Self {
			namespace,
			name: name.into(),
		}
	}

	pub fn resource(name: impl Into<String>) -> Self {
		Self::new(AttributeNamespace::Resource, name)
	}

	pub fn principal(name: impl Into<String>) -> Self {
		Self::new(AttributeNamespace::Principal, name)
	}

	pub fn context(name: impl Into<String>) -> Self {
		Self::new(AttributeNamespace::Context, name)
	}
}

impl fmt::Display for AttributeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.namespace, self.name)
	}
}

/// The caller-supplied bag of contextual attributes for one decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessRequest {
	attributes: BTreeMap<String, AttributeValue>,
}

/// One `{ "key": .., "value": .. }` entry of the list header format.
#[derive(Deserialize)]
struct ContextEntry {
	key: String,
	value: AttributeValue,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderPayload {
	Map(BTreeMap<String, AttributeValue>),
	List(Vec<ContextEntry>),
}

impl AccessRequest {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder: add a context attribute.
	pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
		self.attributes.insert(name.into(), value.into());
	}

	pub fn get(&self, name: &str) -> Option<&AttributeValue> {
		self.attributes.get(name)
	}

	pub fn len(&self) -> usize {
		self.attributes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.attributes.is_empty()
	}

	/// Parses the access-request header value.
	///
	/// Accepts either a JSON object of name → value or a JSON list of
	/// `{ "key": .., "value": .. }` entries. A blank header is an empty request.
	/// For duplicate keys in the list form the last entry wins.
	pub fn from_header(raw: &str) -> Result<Self, AuthError> {
		let raw = raw.trim();
		if raw.is_empty() {
			return Ok(Self::default());
		}

		let payload: HeaderPayload = serde_json::from_str(raw)
			.map_err(|e| AuthError::InvalidAccessRequest(e.to_string()))?;

		let attributes = match payload {
			HeaderPayload::Map(map) => map,
			HeaderPayload::List(entries) => entries.into_iter().map(|e| (e.key, e.value)).collect(),
		};

		Ok(Self { attributes })
	}
}

/// An attribute could not be resolved against the evaluation context.
///
/// Internal to condition evaluation: the evaluator turns it into `false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("attribute {reference} is not available")]
pub struct ResolutionFailure {
	pub reference: AttributeRef,
}

/// The (resource, principal, request) triple a decision is made against.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
	pub resource: &'a dyn ProtectedResource,
	pub principal: &'a Principal,
	pub request: &'a AccessRequest,
}

impl<'a> EvaluationContext<'a> {
	pub fn new(
		resource: &'a dyn ProtectedResource,
		principal: &'a Principal,
		request: &'a AccessRequest,
	) -> Self {
		Self {
			resource,
			principal,
			request,
		}
	}

	/// Resolves an attribute reference to a typed value.
	pub fn resolve(&self, reference: &AttributeRef) -> Result<AttributeValue, ResolutionFailure> {
		self
			.lookup(reference.namespace, &reference.name)
			.ok_or_else(|| ResolutionFailure {
				reference: reference.clone(),
			})
	}

	/// Looks up `name` in `namespace`; `None` when the attribute is not available.
	pub fn lookup(&self, namespace: AttributeNamespace, name: &str) -> Option<AttributeValue> {
		match namespace {
			AttributeNamespace::Resource => self.resource.resource_attribute(name),
			AttributeNamespace::Principal => self.principal.attribute(name),
			AttributeNamespace::Context => self.request.get(name).cloned(),
		}
	}
}

impl fmt::Debug for EvaluationContext<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EvaluationContext")
			.field("resource_id", &self.resource.resource_id())
			.field("principal_id", &self.principal.id)
			.field("request", self.request)
			.finish()
	}
}
