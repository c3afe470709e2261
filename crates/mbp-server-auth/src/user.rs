// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Principal (requesting user) types.
//!
//! Principals are created and destroyed by the identity subsystem; the
//! access-control engine only reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::abac::AttributeValue;
use crate::error::{AuthError, Result};
use crate::types::UserId;

/// The authenticated actor requesting an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
	pub id: UserId,
	pub username: String,
	#[serde(default)]
	pub is_admin: bool,
	#[serde(default)]
	pub is_system_user: bool,
	#[serde(default = "default_loginable")]
	pub is_loginable: bool,
	/// Extended profile attributes (e.g. `department`), resolvable in the
	/// principal attribute namespace.
	#[serde(default)]
	pub profile: BTreeMap<String, AttributeValue>,
}

fn default_loginable() -> bool {
	true
}

impl Principal {
	/// Creates a regular, loginable principal with an empty profile.
	pub fn new(id: UserId, username: impl Into<String>) -> Self {
		Self {
			id,
			username: username.into(),
			is_admin: false,
			is_system_user: false,
			is_loginable: true,
			profile: BTreeMap::new(),
		}
	}

	/// Builder: mark as administrator.
	pub fn with_admin(mut self, is_admin: bool) -> Self {
		self.is_admin = is_admin;
		self
	}

	/// Builder: mark as system (service) user.
	pub fn with_system_user(mut self, is_system_user: bool) -> Self {
		self.is_system_user = is_system_user;
		self
	}

	/// Builder: set whether the principal may exercise gated operations.
	pub fn with_loginable(mut self, is_loginable: bool) -> Self {
		self.is_loginable = is_loginable;
		self
	}

	/// Builder: add an extended profile attribute.
	pub fn with_profile_attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
		self.profile.insert(name.into(), value.into());
		self
	}

	/// Fails with [`AuthError::UserNotLoginable`] unless the principal may log in.
	pub fn require_loginable(&self) -> Result<()> {
		if self.is_loginable {
			Ok(())
		} else {
			Err(AuthError::UserNotLoginable)
		}
	}

	pub fn require_admin(&self) -> Result<()> {
		if self.is_admin {
			Ok(())
		} else {
			Err(AuthError::MissingAdminPrivileges)
		}
	}

	pub fn require_system_user(&self) -> Result<()> {
		if self.is_system_user {
			Ok(())
		} else {
			Err(AuthError::NoSystemUser)
		}
	}

	/// Resolves a principal attribute: fixed accessors first, then the profile.
	pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
		match name {
			"id" => Some(AttributeValue::Text(self.id.to_string())),
			"username" => Some(AttributeValue::Text(self.username.clone())),
			"is_admin" => Some(AttributeValue::Boolean(self.is_admin)),
			"is_system_user" => Some(AttributeValue::Boolean(self.is_system_user)),
			"is_loginable" => Some(AttributeValue::Boolean(self.is_loginable)),
			other => self.profile.get(other).cloned(),
		}
	}
}
