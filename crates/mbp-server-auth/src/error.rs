// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for access control.

use crate::types::AccessType;

/// Errors surfaced by access-control decisions and policy management.
///
/// `MissingPermission` and `UserNotLoginable` are terminal rejections that
/// should be returned to the caller as-is; authorization is idempotent and
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
	#[error("{kind} with id '{id}' does not exist")]
	EntityNotFound { kind: &'static str, id: String },

	#[error("{kind} with name '{name}' exists already")]
	EntityAlreadyExists { kind: &'static str, name: String },

	#[error("{kind} with id '{id}' is still in use")]
	EntityStillInUse { kind: &'static str, id: String },

	#[error("user is not allowed to log in")]
	UserNotLoginable,

	#[error("missing permission '{access_type}' for entity '{resource_id}'")]
	MissingPermission {
		resource_id: String,
		access_type: AccessType,
	},

	#[error("admin privileges required")]
	MissingAdminPrivileges,

	#[error("owner privileges required")]
	MissingOwnerPrivileges,

	#[error("system user required")]
	NoSystemUser,

	#[error("invalid policy: {0}")]
	InvalidPolicy(String),

	#[error("invalid access request: {0}")]
	InvalidAccessRequest(String),
}

impl AuthError {
	pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
		Self::EntityNotFound {
			kind,
			id: id.to_string(),
		}
	}

	pub fn missing_permission(resource_id: impl ToString, access_type: AccessType) -> Self {
		Self::MissingPermission {
			resource_id: resource_id.to_string(),
			access_type,
		}
	}

	/// Returns true for rejections caused by the caller's identity or grants
	/// rather than by missing data.
	pub fn is_forbidden(&self) -> bool {
		matches!(
			self,
			AuthError::UserNotLoginable
				| AuthError::MissingPermission { .. }
				| AuthError::MissingAdminPrivileges
				| AuthError::MissingOwnerPrivileges
				| AuthError::NoSystemUser
		)
	}
}

pub type Result<T> = std::result::Result<T, AuthError>;
