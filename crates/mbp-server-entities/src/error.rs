// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use mbp_server_auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
	#[error(transparent)]
	Auth(#[from] AuthError),

	#[error("Validation failed: {0}")]
	Validation(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl EntityError {
	/// The authorization error, if this is one.
	pub fn as_auth(&self) -> Option<&AuthError> {
		match self {
			EntityError::Auth(err) => Some(err),
			_ => None,
		}
	}
}

pub type Result<T> = std::result::Result<T, EntityError>;
