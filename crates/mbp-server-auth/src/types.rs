// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for access control.
//!
//! This module defines the foundational types used throughout the auth system:
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for different entity types
//!   ([`UserId`], [`EntityId`], [`PolicyId`]) preventing accidental mixing
//! - **Access types**: The kinds of operations that can be requested on a
//!   protected entity ([`AccessType`])
//!
//! All ID types implement transparent serde serialization (as UUID strings) and
//! provide conversion to/from [`uuid::Uuid`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user (principal).");
define_id_type!(EntityId, "Unique identifier for a protected entity.");
define_id_type!(PolicyId, "Unique identifier for an access-control policy.");

// =============================================================================
// Access Types
// =============================================================================

/// Kinds of operations that can be requested on a protected entity.
///
/// New operation kinds are added as variants; callers matching on this enum
/// must handle the non-exhaustive case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum AccessType {
	Read,
	Update,
	Delete,
	Start,
	Stop,
	Deploy,
	Undeploy,
	Monitor,
	ReadValueLogs,
	ReadValueLogStats,
	DeleteValueLogs,
}

impl AccessType {
	/// Returns all known access types.
	pub fn all() -> &'static [AccessType] {
		&[
			AccessType::Read,
			AccessType::Update,
			AccessType::Delete,
			AccessType::Start,
			AccessType::Stop,
			AccessType::Deploy,
			AccessType::Undeploy,
			AccessType::Monitor,
			AccessType::ReadValueLogs,
			AccessType::ReadValueLogStats,
			AccessType::DeleteValueLogs,
		]
	}

	/// Wire name of the access type (e.g. `READ_VALUE_LOGS`).
	pub fn as_str(&self) -> &'static str {
		match self {
			AccessType::Read => "READ",
			AccessType::Update => "UPDATE",
			AccessType::Delete => "DELETE",
			AccessType::Start => "START",
			AccessType::Stop => "STOP",
			AccessType::Deploy => "DEPLOY",
			AccessType::Undeploy => "UNDEPLOY",
			AccessType::Monitor => "MONITOR",
			AccessType::ReadValueLogs => "READ_VALUE_LOGS",
			AccessType::ReadValueLogStats => "READ_VALUE_LOG_STATS",
			AccessType::DeleteValueLogs => "DELETE_VALUE_LOGS",
		}
	}

	/// Returns true for operations that only observe an entity or its data.
	pub fn is_read_class(&self) -> bool {
		matches!(
			self,
			AccessType::Read
				| AccessType::Monitor
				| AccessType::ReadValueLogs
				| AccessType::ReadValueLogStats
		)
	}
}

impl fmt::Display for AccessType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AccessType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
		AccessType::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == normalized)
			.ok_or_else(|| format!("unknown access type: {s}"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn id_display_matches_uuid() {
		let uuid = Uuid::new_v4();
		assert_eq!(UserId::new(uuid).to_string(), uuid.to_string());
	}

	#[test]
	fn id_parses_from_string() {
		let id = PolicyId::generate();
		let parsed: PolicyId = id.to_string().parse().unwrap();
		assert_eq!(parsed, id);
	}

	#[test]
	fn access_type_serializes_screaming_snake_case() {
		let json = serde_json::to_string(&AccessType::ReadValueLogStats).unwrap();
		assert_eq!(json, "\"READ_VALUE_LOG_STATS\"");
	}

	#[test]
	fn access_type_from_str_is_case_insensitive() {
		assert_eq!("read".parse::<AccessType>(), Ok(AccessType::Read));
		assert_eq!("read-value-logs".parse::<AccessType>(), Ok(AccessType::ReadValueLogs));
		assert!("launch".parse::<AccessType>().is_err());
	}

	#[test]
	fn as_str_agrees_with_serde() {
		for access_type in AccessType::all() {
			let json = serde_json::to_string(access_type).unwrap();
			assert_eq!(json, format!("\"{}\"", access_type.as_str()));
		}
	}

	#[test]
	fn read_class_covers_observing_operations() {
		assert!(AccessType::Read.is_read_class());
		assert!(AccessType::ReadValueLogs.is_read_class());
		assert!(!AccessType::Delete.is_read_class());
		assert!(!AccessType::Deploy.is_read_class());
	}
}
