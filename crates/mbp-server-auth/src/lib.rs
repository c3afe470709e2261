// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access control core for the MBP IoT platform.
//!
//! This crate decides whether a principal may perform an operation on a
//! protected resource, and which effects transform the result when access was
//! granted by a policy.
//!
//! # Architecture
//!
//! - `abac` - Attribute model, condition trees, policies and the access guard
//! - `user` - The requesting principal
//! - `types` - Id newtypes and access types
//! - `error` - Authorization errors
//!
//! # Example
//!
//! ```ignore
//! use mbp_server_auth::{AccessGuard, AccessRequest, AccessType};
//!
//! let guard = AccessGuard::new(policy_store);
//! let request = AccessRequest::from_header(header_value)?;
//! let grant = guard.require(&device, &principal, AccessType::Read, &request)?;
//! let view = apply_for_grant(&grant, serde_json::to_value(&device)?);
//! ```

pub mod abac;
pub mod error;
pub mod types;
pub mod user;

pub use abac::*;
pub use error::{AuthError, Result};
pub use types::{AccessType, EntityId, PolicyId, UserId};
pub use user::Principal;
