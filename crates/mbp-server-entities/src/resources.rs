// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! IoT platform entities: devices, the sensors and actuators attached to them,
//! and stream operators.
//!
//! Each type exposes its resource attributes through a static
//! [`AttributeRegistry`] so policy conditions can refer to them by name.

use mbp_server_auth::{AttributeRegistry, AttributeValue, EntityId, PolicyId, ProtectedResource, UserId};
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

macro_rules! impl_entity {
	($ty:ty, $kind:literal, $registry:ident) => {
		impl ProtectedResource for $ty {
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
				$registry.get(self, name)
			}

			fn resource_kind(&self) -> &'static str {
				$kind
			}
		}

		impl Entity for $ty {
			const KIND: &'static str = $kind;

			fn name(&self) -> &str {
				&self.name
			}

			fn set_owner(&mut self, owner_id: UserId) {
				self.owner_id = Some(owner_id);
			}
		}
	};
}

fn text(value: &str) -> Option<AttributeValue> {
	Some(AttributeValue::from(value))
}

fn optional_text(value: &Option<String>) -> Option<AttributeValue> {
	value.as_deref().map(AttributeValue::from)
}

// =============================================================================
// Device
// =============================================================================

/// A physical device reachable over the network that hosts sensors and actuators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
	pub id: EntityId,
	pub name: String,
	pub component_type: String,
	pub ip_address: String,
	pub port: u16,
	pub mac_address: Option<String>,
	pub department: Option<String>,
	pub location: Option<String>,
	pub owner_id: Option<UserId>,
	#[serde(default)]
	pub policy_ids: Vec<PolicyId>,
}

impl Device {
	pub fn new(name: impl Into<String>, component_type: impl Into<String>, ip_address: impl Into<String>) -> Self {
		Self {
			id: EntityId::generate(),
			name: name.into(),
			component_type: component_type.into(),
			ip_address: ip_address.into(),
			port: 22,
			mac_address: None,
			department: None,
			location: None,
			owner_id: None,
			policy_ids: Vec::new(),
		}
	}
}

pub static DEVICE_ATTRIBUTES: AttributeRegistry<Device> = AttributeRegistry::new(&[
	("id", |d: &Device| Some(AttributeValue::Text(d.id.to_string()))),
	("name", |d: &Device| text(&d.name)),
	("component_type", |d: &Device| text(&d.component_type)),
	("ip_address", |d: &Device| text(&d.ip_address)),
	("port", |d: &Device| Some(AttributeValue::Number(f64::from(d.port)))),
	("mac_address", |d: &Device| optional_text(&d.mac_address)),
	("department", |d: &Device| optional_text(&d.department)),
	("location", |d: &Device| optional_text(&d.location)),
]);

impl_entity!(Device, "Device", DEVICE_ATTRIBUTES);

// =============================================================================
// Sensor
// =============================================================================

/// A measuring component attached to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
	pub id: EntityId,
	pub name: String,
	pub component_type: String,
	pub device_id: EntityId,
	pub unit: String,
	pub department: Option<String>,
	/// Most recent reading in `unit`.
	pub value: Option<f64>,
	pub owner_id: Option<UserId>,
	#[serde(default)]
	pub policy_ids: Vec<PolicyId>,
}

impl Sensor {
	pub fn new(name: impl Into<String>, component_type: impl Into<String>, device_id: EntityId, unit: impl Into<String>) -> Self {
		Self {
			id: EntityId::generate(),
			name: name.into(),
			component_type: component_type.into(),
			device_id,
			unit: unit.into(),
			department: None,
			value: None,
			owner_id: None,
			policy_ids: Vec::new(),
		}
	}
}

pub static SENSOR_ATTRIBUTES: AttributeRegistry<Sensor> = AttributeRegistry::new(&[
	("id", |s: &Sensor| Some(AttributeValue::Text(s.id.to_string()))),
	("name", |s: &Sensor| text(&s.name)),
	("component_type", |s: &Sensor| text(&s.component_type)),
	("device_id", |s: &Sensor| Some(AttributeValue::Text(s.device_id.to_string()))),
	("unit", |s: &Sensor| text(&s.unit)),
	("department", |s: &Sensor| optional_text(&s.department)),
	("value", |s: &Sensor| s.value.map(AttributeValue::Number)),
]);

impl_entity!(Sensor, "Sensor", SENSOR_ATTRIBUTES);

// =============================================================================
// Actuator
// =============================================================================

/// A controllable component attached to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actuator {
	pub id: EntityId,
	pub name: String,
	pub component_type: String,
	pub device_id: EntityId,
	pub department: Option<String>,
	pub owner_id: Option<UserId>,
	#[serde(default)]
	pub policy_ids: Vec<PolicyId>,
}

impl Actuator {
	pub fn new(name: impl Into<String>, component_type: impl Into<String>, device_id: EntityId) -> Self {
		Self {
			id: EntityId::generate(),
			name: name.into(),
			component_type: component_type.into(),
			device_id,
			department: None,
			owner_id: None,
			policy_ids: Vec::new(),
		}
	}
}

pub static ACTUATOR_ATTRIBUTES: AttributeRegistry<Actuator> = AttributeRegistry::new(&[
	("id", |a: &Actuator| Some(AttributeValue::Text(a.id.to_string()))),
	("name", |a: &Actuator| text(&a.name)),
	("component_type", |a: &Actuator| text(&a.component_type)),
	("device_id", |a: &Actuator| Some(AttributeValue::Text(a.device_id.to_string()))),
	("department", |a: &Actuator| optional_text(&a.department)),
]);

impl_entity!(Actuator, "Actuator", ACTUATOR_ATTRIBUTES);

// =============================================================================
// Operator
// =============================================================================

/// A stream-processing operator that can be deployed onto devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
	pub id: EntityId,
	pub name: String,
	/// Name of the processing function the operator runs.
	pub function: String,
	#[serde(default)]
	pub description: String,
	pub owner_id: Option<UserId>,
	#[serde(default)]
	pub policy_ids: Vec<PolicyId>,
}

impl Operator {
	pub fn new(name: impl Into<String>, function: impl Into<String>) -> Self {
		Self {
			id: EntityId::generate(),
			name: name.into(),
			function: function.into(),
			description: String::new(),
			owner_id: None,
			policy_ids: Vec::new(),
		}
	}
}

pub static OPERATOR_ATTRIBUTES: AttributeRegistry<Operator> = AttributeRegistry::new(&[
	("id", |o: &Operator| Some(AttributeValue::Text(o.id.to_string()))),
	("name", |o: &Operator| text(&o.name)),
	("function", |o: &Operator| text(&o.function)),
	("description", |o: &Operator| text(&o.description)),
]);

impl_entity!(Operator, "Operator", OPERATOR_ATTRIBUTES);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn device_exposes_registered_attributes() {
		let mut device = Device::new("gateway-1", "raspberry_pi", "10.0.0.4");
		device.department = Some("IoT".to_string());

		assert_eq!(device.resource_attribute("ip_address"), Some(AttributeValue::from("10.0.0.4")));
		assert_eq!(device.resource_attribute("port"), Some(AttributeValue::Number(22.0)));
		assert_eq!(device.resource_attribute("department"), Some(AttributeValue::from("IoT")));
		assert_eq!(device.resource_attribute("location"), None);
		assert_eq!(device.resource_attribute("owner_password"), None);
		assert_eq!(device.resource_kind(), "Device");
	}

	#[test]
	fn sensor_value_is_numeric_attribute() {
		let mut sensor = Sensor::new("temp-1", "temperature", EntityId::generate(), "celsius");
		assert_eq!(sensor.resource_attribute("value"), None);

		sensor.value = Some(21.5);
		assert_eq!(sensor.resource_attribute("value"), Some(AttributeValue::Number(21.5)));
		assert_eq!(sensor.resource_attribute("unit"), Some(AttributeValue::from("celsius")));
	}

	#[test]
	fn set_owner_makes_entity_owned() {
		let mut actuator = Actuator::new("valve", "relay", EntityId::generate());
		let owner = UserId::generate();
		assert!(actuator.is_owned_by_or_unowned(UserId::generate()));

		actuator.set_owner(owner);
		assert!(actuator.is_owned_by_or_unowned(owner));
		assert!(!actuator.is_owned_by_or_unowned(UserId::generate()));
	}

	#[test]
	fn registries_list_attribute_names() {
		let names: Vec<_> = OPERATOR_ATTRIBUTES.names().collect();
		assert_eq!(names, vec!["id", "name", "function", "description"]);
		assert!(DEVICE_ATTRIBUTES.contains("mac_address"));
	}
}
