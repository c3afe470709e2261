// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access-controlled entities for the MBP IoT platform.
//!
//! # Architecture
//!
//! - `repository` - Storage seam and the in-memory repository
//! - `policy_store` - Policy lookup with snapshot replacement
//! - `registry` - Create/delete validators and create handlers per entity type
//! - `service` - Generic entity service enforcing access control
//! - `resources` - Devices, sensors, actuators and operators

pub mod error;
pub mod policy_store;
pub mod registry;
pub mod repository;
pub mod resources;
pub mod service;

pub use error::{EntityError, Result};
pub use policy_store::PolicyStore;
pub use registry::{
	basic_lifecycle, device_lifecycle, CreateHandler, CreateValidator, DeleteValidator, DeviceInUseValidator,
	LifecycleRegistry,
};
pub use repository::{Entity, InMemoryRepository, Page, Pageable, Repository, Sort};
pub use resources::{Actuator, Device, Operator, Sensor};
pub use service::{EntityService, PrincipalProvider};
