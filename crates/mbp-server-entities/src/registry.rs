// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Entity lifecycle hooks.
//!
//! A [`LifecycleRegistry`] is built once at startup for each entity type and
//! lists, in execution order, the validators run before create and delete and
//! the handlers run after a successful create.

use std::sync::Arc;

use async_trait::async_trait;
use mbp_server_auth::AuthError;
use tracing::info;

use crate::error::{EntityError, Result};
use crate::repository::{Entity, Repository, Sort};
use crate::resources::{Actuator, Device, Sensor};

/// Checked before an entity is stored; the first error aborts the create.
pub type CreateValidator<E> = fn(&E) -> Result<()>;

/// Notified after an entity has been stored.
pub type CreateHandler<E> = fn(&E);

/// Checked before an entity is deleted.
#[async_trait]
pub trait DeleteValidator<E: Entity>: Send + Sync {
	async fn require_deletable(&self, entity: &E) -> Result<()>;
}

pub struct LifecycleRegistry<E: Entity> {
	create_validators: Vec<CreateValidator<E>>,
	create_handlers: Vec<CreateHandler<E>>,
	delete_validators: Vec<Arc<dyn DeleteValidator<E>>>,
}

impl<E: Entity> Default for LifecycleRegistry<E> {
	fn default() -> Self {
		Self {
			create_validators: Vec::new(),
			create_handlers: Vec::new(),
			delete_validators: Vec::new(),
		}
	}
}

impl<E: Entity> LifecycleRegistry<E> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_create_validator(mut self, validator: CreateValidator<E>) -> Self {
		self.create_validators.push(validator);
		self
	}

	pub fn with_create_handler(mut self, handler: CreateHandler<E>) -> Self {
		self.create_handlers.push(handler);
		self
	}

	pub fn with_delete_validator(mut self, validator: Arc<dyn DeleteValidator<E>>) -> Self {
		self.delete_validators.push(validator);
		self
	}

	pub fn validate_create(&self, entity: &E) -> Result<()> {
		self.create_validators.iter().try_for_each(|validate| validate(entity))
	}

	pub fn handle_created(&self, entity: &E) {
		for handler in &self.create_handlers {
			handler(entity);
		}
	}

	pub async fn validate_delete(&self, entity: &E) -> Result<()> {
		for validator in &self.delete_validators {
			validator.require_deletable(entity).await?;
		}
		Ok(())
	}
}

// =============================================================================
// Shared hooks
// =============================================================================

/// Rejects entities with a blank name.
pub fn require_name<E: Entity>(entity: &E) -> Result<()> {
	if entity.name().trim().is_empty() {
		return Err(EntityError::Validation(format!("{} name must not be empty", E::KIND)));
	}
	Ok(())
}

pub fn log_created<E: Entity>(entity: &E) {
	info!(kind = E::KIND, entity_id = %entity.id(), name = entity.name(), "entity created");
}

fn require_device_address(device: &Device) -> Result<()> {
	if device.ip_address.trim().is_empty() {
		return Err(EntityError::Validation("Device IP address must not be empty".to_string()));
	}
	Ok(())
}

/// A device cannot be deleted while sensors or actuators still reference it.
pub struct DeviceInUseValidator {
	sensors: Arc<dyn Repository<Sensor>>,
	actuators: Arc<dyn Repository<Actuator>>,
}

impl DeviceInUseValidator {
	pub fn new(sensors: Arc<dyn Repository<Sensor>>, actuators: Arc<dyn Repository<Actuator>>) -> Self {
		Self { sensors, actuators }
	}
}

#[async_trait]
impl DeleteValidator<Device> for DeviceInUseValidator {
	async fn require_deletable(&self, device: &Device) -> Result<()> {
		let used_by_sensor = self
			.sensors
			.find_all(Sort::Unsorted)
			.await?
			.iter()
			.any(|s| s.device_id == device.id);
		let used_by_actuator = self
			.actuators
			.find_all(Sort::Unsorted)
			.await?
			.iter()
			.any(|a| a.device_id == device.id);

		if used_by_sensor || used_by_actuator {
			return Err(AuthError::EntityStillInUse {
				kind: Device::KIND,
				id: device.id.to_string(),
			}
			.into());
		}
		Ok(())
	}
}

/// Hooks for devices: name and address checks, in-use check on delete.
pub fn device_lifecycle(
	sensors: Arc<dyn Repository<Sensor>>,
	actuators: Arc<dyn Repository<Actuator>>,
) -> LifecycleRegistry<Device> {
	LifecycleRegistry::new()
		.with_create_validator(require_name::<Device>)
		.with_create_validator(require_device_address)
		.with_create_handler(log_created::<Device>)
		.with_delete_validator(Arc::new(DeviceInUseValidator::new(sensors, actuators)))
}

/// Hooks for entities that only need a name.
pub fn basic_lifecycle<E: Entity>() -> LifecycleRegistry<E> {
	LifecycleRegistry::new()
		.with_create_validator(require_name::<E>)
		.with_create_handler(log_created::<E>)
}
