// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access-controlled entity service.
//!
//! [`EntityService`] is written once for every entity type: it combines a
//! [`Repository`], the [`AccessGuard`], the calling principal and the entity's
//! [`LifecycleRegistry`].

use std::marker::PhantomData;
use std::sync::Arc;

use mbp_server_auth::{
	apply_for_grant, AccessGuard, AccessRequest, AccessType, AuthError, EntityId, Policy, PolicyLookup, Principal,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::registry::LifecycleRegistry;
use crate::repository::{Entity, Page, Pageable, Repository, Sort};

/// Resolves the principal on whose behalf the service is called.
pub trait PrincipalProvider: Send + Sync {
	fn current_principal(&self) -> std::result::Result<Principal, AuthError>;
}

impl PrincipalProvider for Principal {
	fn current_principal(&self) -> std::result::Result<Principal, AuthError> {
		Ok(self.clone())
	}
}

pub struct EntityService<E: Entity, R: ?Sized, L> {
	repository: Arc<R>,
	guard: Arc<AccessGuard<L>>,
	principals: Arc<dyn PrincipalProvider>,
	lifecycle: LifecycleRegistry<E>,
	_entity: PhantomData<fn() -> E>,
}

impl<E, R, L> EntityService<E, R, L>
where
	E: Entity,
	R: Repository<E> + ?Sized,
	L: PolicyLookup,
{
	pub fn new(
		repository: Arc<R>,
		guard: Arc<AccessGuard<L>>,
		principals: Arc<dyn PrincipalProvider>,
		lifecycle: LifecycleRegistry<E>,
	) -> Self {
		Self {
			repository,
			guard,
			principals,
			lifecycle,
			_entity: PhantomData,
		}
	}

	pub fn repository(&self) -> &R {
		&self.repository
	}

	fn principal(&self) -> Result<Principal> {
		Ok(self.principals.current_principal()?)
	}

	/// Fetches an entity without any access check.
	pub async fn get_for_id(&self, id: EntityId) -> Result<E> {
		self
			.repository
			.find_by_id(id)
			.await?
			.ok_or_else(|| AuthError::not_found(E::KIND, id).into())
	}

	#[instrument(skip(self, request), fields(kind = E::KIND))]
	pub async fn get_for_id_with_access_control_check(
		&self,
		id: EntityId,
		access_type: AccessType,
		request: &AccessRequest,
	) -> Result<E> {
		let entity = self.get_for_id(id).await?;
		let principal = self.principal()?;
		self.guard.require(&entity, &principal, access_type, request)?;
		Ok(entity)
	}

	/// All entities the caller may access, ordered by name.
	#[instrument(skip(self, request), fields(kind = E::KIND))]
	pub async fn get_all_with_access_control_check(
		&self,
		access_type: AccessType,
		request: &AccessRequest,
	) -> Result<Vec<E>> {
		let principal = self.principal()?;
		let all = self.repository.find_all(Sort::by_name()).await?;
		Ok(self.guard.filter(all, &principal, access_type, request)?)
	}

	/// One page of the entities the caller may access. Paging is applied after
	/// filtering so pages are dense.
	pub async fn get_page_with_access_control_check(
		&self,
		access_type: AccessType,
		request: &AccessRequest,
		pageable: Pageable,
	) -> Result<Page<E>> {
		let visible = self.get_all_with_access_control_check(access_type, request).await?;
		Ok(Page::from_all(visible, pageable))
	}

	/// The policy that grants the caller `access_type` on `entity`, if any.
	pub fn first_policy_granting_access(
		&self,
		entity: &E,
		access_type: AccessType,
		request: &AccessRequest,
	) -> Result<Option<Arc<Policy>>> {
		let principal = self.principal()?;
		principal.require_loginable()?;
		Ok(self
			.guard
			.first_policy_granting_access(entity, &principal, access_type, request))
	}

	/// Serialized view of an entity with the granting policy's effects applied.
	///
	/// Owner and admin access return the unmodified view.
	#[instrument(skip(self, request), fields(kind = E::KIND))]
	pub async fn read_with_effects(&self, id: EntityId, access_type: AccessType, request: &AccessRequest) -> Result<Value>
	where
		E: Serialize,
	{
		let entity = self.get_for_id(id).await?;
		let principal = self.principal()?;
		let grant = self.guard.require(&entity, &principal, access_type, request)?;
		let view = serde_json::to_value(&entity)?;
		debug!(effects = grant.effects().len(), "applying effects");
		Ok(apply_for_grant(&grant, view))
	}

	/// Stores a new entity owned by the caller.
	#[instrument(skip(self, entity), fields(kind = E::KIND, entity_id = %entity.id()))]
	pub async fn create(&self, mut entity: E) -> Result<E> {
		let principal = self.principal()?;
		principal.require_loginable()?;

		if self.repository.exists_by_name(entity.name()).await? {
			return Err(AuthError::EntityAlreadyExists {
				kind: E::KIND,
				name: entity.name().to_string(),
			}
			.into());
		}

		entity.set_owner(principal.id);
		self.lifecycle.validate_create(&entity)?;
		let saved = self.repository.save(entity).await?;
		self.lifecycle.handle_created(&saved);
		Ok(saved)
	}

	/// Deletes an entity if the caller holds `DELETE` on it and no delete
	/// validator objects.
	#[instrument(skip(self, request), fields(kind = E::KIND))]
	pub async fn delete_with_access_control_check(&self, id: EntityId, request: &AccessRequest) -> Result<E> {
		let entity = self.get_for_id_with_access_control_check(id, AccessType::Delete, request).await?;
		self.lifecycle.validate_delete(&entity).await?;
		if !self.repository.delete_by_id(id).await? {
			return Err(AuthError::not_found(E::KIND, id).into());
		}
		info!(entity_id = %id, "entity deleted");
		Ok(entity)
	}

	pub fn require_admin(&self) -> Result<Principal> {
		let principal = self.principal()?;
		principal.require_admin()?;
		Ok(principal)
	}

	pub fn require_system_user(&self) -> Result<Principal> {
		let principal = self.principal()?;
		principal.require_system_user()?;
		Ok(principal)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::EntityError;
	use crate::policy_store::PolicyStore;
	use crate::registry::{basic_lifecycle, device_lifecycle, DeleteValidator};
	use crate::repository::InMemoryRepository;
	use crate::resources::{Actuator, Device, Sensor};
	use mbp_server_auth::{AttributeRef, ComparisonFunction, ConditionNode, Effect, UserId};
	use serde_json::json;

	struct Fixture {
		store: Arc<PolicyStore>,
		guard: Arc<AccessGuard<Arc<PolicyStore>>>,
		sensors: Arc<InMemoryRepository<Sensor>>,
		actuators: Arc<InMemoryRepository<Actuator>>,
		devices: Arc<InMemoryRepository<Device>>,
	}

	impl Fixture {
		fn new() -> Self {
			let store = Arc::new(PolicyStore::default());
			Self {
				guard: Arc::new(AccessGuard::new(store.clone())),
				store,
				sensors: Arc::new(InMemoryRepository::new()),
				actuators: Arc::new(InMemoryRepository::new()),
				devices: Arc::new(InMemoryRepository::new()),
			}
		}

		fn sensor_service(&self, principal: Principal) -> EntityService<Sensor, InMemoryRepository<Sensor>, Arc<PolicyStore>> {
			EntityService::new(
				self.sensors.clone(),
				self.guard.clone(),
				Arc::new(principal),
				basic_lifecycle(),
			)
		}

		fn device_service(&self, principal: Principal) -> EntityService<Device, InMemoryRepository<Device>, Arc<PolicyStore>> {
			EntityService::new(
				self.devices.clone(),
				self.guard.clone(),
				Arc::new(principal),
				device_lifecycle(self.sensors.clone(), self.actuators.clone()),
			)
		}
	}

	fn iot_user(name: &str) -> Principal {
		Principal::new(UserId::generate(), name).with_profile_attr("department", "IoT")
	}

	fn department_read_policy(author: &Principal, store: &PolicyStore) -> Arc<Policy> {
		let policy = Policy::new(
			"same-department-read",
			[AccessType::Read],
			ConditionNode::simple(
				ComparisonFunction::Equals,
				AttributeRef::principal("department"),
				AttributeRef::resource("department"),
			),
		)
		.with_effect(Effect::NumericAccuracyDegradation {
			field: "value".to_string(),
			decimal_places: 1,
		});
		store.create(policy, author).unwrap()
	}

	#[tokio::test]
	async fn create_sets_caller_as_owner() {
		let fx = Fixture::new();
		let alice = iot_user("alice");
		let service = fx.sensor_service(alice.clone());

		let created = service
			.create(Sensor::new("temp-1", "temperature", EntityId::generate(), "celsius"))
			.await
			.unwrap();
		assert_eq!(created.owner_id, Some(alice.id));
		assert_eq!(service.get_for_id(created.id).await.unwrap(), created);
	}

	#[tokio::test]
	async fn create_rejects_not_loginable_duplicate_and_invalid() {
		let fx = Fixture::new();
		let svc = Principal::new(UserId::generate(), "svc").with_loginable(false);
		let err = fx
			.sensor_service(svc)
			.create(Sensor::new("temp-1", "temperature", EntityId::generate(), "celsius"))
			.await
			.unwrap_err();
		assert!(matches!(err.as_auth(), Some(AuthError::UserNotLoginable)));

		let service = fx.sensor_service(iot_user("alice"));
		service
			.create(Sensor::new("temp-1", "temperature", EntityId::generate(), "celsius"))
			.await
			.unwrap();
		let err = service
			.create(Sensor::new("temp-1", "humidity", EntityId::generate(), "percent"))
			.await
			.unwrap_err();
		assert!(matches!(err.as_auth(), Some(AuthError::EntityAlreadyExists { .. })));

		let err = service
			.create(Sensor::new("", "humidity", EntityId::generate(), "percent"))
			.await
			.unwrap_err();
		assert!(matches!(err, EntityError::Validation(_)));
	}

	#[tokio::test]
	async fn missing_entity_is_not_found() {
		let fx = Fixture::new();
		let err = fx
			.sensor_service(iot_user("alice"))
			.get_for_id(EntityId::generate())
			.await
			.unwrap_err();
		assert!(matches!(err.as_auth(), Some(AuthError::EntityNotFound { kind: "Sensor", .. })));
	}

	#[tokio::test]
	async fn policy_grant_applies_effects_but_owner_sees_raw_view() {
		let fx = Fixture::new();
		let owner = iot_user("owner");
		let reader = iot_user("reader");
		let policy = department_read_policy(&owner, &fx.store);

		let mut sensor = Sensor::new("temp-1", "temperature", EntityId::generate(), "celsius");
		sensor.department = Some("IoT".to_string());
		sensor.value = Some(21.46);
		sensor.policy_ids.push(policy.id);
		let sensor = fx.sensor_service(owner.clone()).create(sensor).await.unwrap();

		let request = AccessRequest::new();
		let as_reader = fx
			.sensor_service(reader)
			.read_with_effects(sensor.id, AccessType::Read, &request)
			.await
			.unwrap();
		assert_eq!(as_reader["value"], json!(21.5));

		let as_owner = fx
			.sensor_service(owner)
			.read_with_effects(sensor.id, AccessType::Read, &request)
			.await
			.unwrap();
		assert_eq!(as_owner["value"], json!(21.46));
	}

	#[tokio::test]
	async fn listing_and_paging_only_return_accessible_entities() {
		let fx = Fixture::new();
		let owner = iot_user("owner");
		let policy = department_read_policy(&owner, &fx.store);
		let owner_service = fx.sensor_service(owner);

		for (name, department) in [("a", "IoT"), ("b", "Robotics"), ("c", "IoT"), ("d", "IoT")] {
			let mut sensor = Sensor::new(name, "temperature", EntityId::generate(), "celsius");
			sensor.department = Some(department.to_string());
			sensor.policy_ids.push(policy.id);
			owner_service.create(sensor).await.unwrap();
		}

		let reader = fx.sensor_service(iot_user("reader"));
		let request = AccessRequest::new();
		let visible = reader
			.get_all_with_access_control_check(AccessType::Read, &request)
			.await
			.unwrap();
		let names: Vec<_> = visible.iter().map(|s| s.name.as_str()).collect();
		assert_eq!(names, vec!["a", "c", "d"]);

		let page = reader
			.get_page_with_access_control_check(AccessType::Read, &request, Pageable::new(1, 2))
			.await
			.unwrap();
		assert_eq!(page.total, 3);
		assert_eq!(page.items.len(), 1);
		assert_eq!(page.items[0].name, "d");

		let updatable = reader
			.get_all_with_access_control_check(AccessType::Update, &request)
			.await
			.unwrap();
		assert!(updatable.is_empty());
	}

	#[tokio::test]
	async fn first_policy_granting_access_ignores_ownership() {
		let fx = Fixture::new();
		let owner = iot_user("owner");
		let policy = department_read_policy(&owner, &fx.store);
		let service = fx.sensor_service(owner);

		let mut sensor = Sensor::new("temp-1", "temperature", EntityId::generate(), "celsius");
		sensor.department = Some("Robotics".to_string());
		sensor.policy_ids.push(policy.id);
		let sensor = service.create(sensor).await.unwrap();

		let request = AccessRequest::new();
		assert!(service
			.get_for_id_with_access_control_check(sensor.id, AccessType::Read, &request)
			.await
			.is_ok());
		assert_eq!(
			service
				.first_policy_granting_access(&sensor, AccessType::Read, &request)
				.unwrap(),
			None
		);
	}

	#[tokio::test]
	async fn delete_requires_permission_and_unused_device() {
		let fx = Fixture::new();
		let owner = iot_user("owner");
		let device = fx
			.device_service(owner.clone())
			.create(Device::new("gw", "pi", "10.0.0.1"))
			.await
			.unwrap();
		let request = AccessRequest::new();

		let err = fx
			.device_service(iot_user("stranger"))
			.delete_with_access_control_check(device.id, &request)
			.await
			.unwrap_err();
		assert!(matches!(
			err.as_auth(),
			Some(AuthError::MissingPermission {
				access_type: AccessType::Delete,
				..
			})
		));

		let sensor = fx
			.sensors
			.save(Sensor::new("temp", "temperature", device.id, "celsius"))
			.await
			.unwrap();
		let err = fx
			.device_service(owner.clone())
			.delete_with_access_control_check(device.id, &request)
			.await
			.unwrap_err();
		assert!(matches!(err.as_auth(), Some(AuthError::EntityStillInUse { .. })));

		fx.sensors.delete_by_id(sensor.id).await.unwrap();
		fx.device_service(owner)
			.delete_with_access_control_check(device.id, &request)
			.await
			.unwrap();
		assert!(fx.devices.is_empty().await);
	}

	/// Removes the entity while its delete is being validated.
	struct RemovedMeanwhile(Arc<InMemoryRepository<Sensor>>);

	#[async_trait::async_trait]
	impl DeleteValidator<Sensor> for RemovedMeanwhile {
		async fn require_deletable(&self, sensor: &Sensor) -> Result<()> {
			self.0.delete_by_id(sensor.id).await?;
			Ok(())
		}
	}

	#[tokio::test]
	async fn delete_of_entity_removed_meanwhile_is_not_found() {
		let fx = Fixture::new();
		let owner = iot_user("owner");
		let sensor = fx
			.sensor_service(owner.clone())
			.create(Sensor::new("temp-1", "temperature", EntityId::generate(), "celsius"))
			.await
			.unwrap();

		let service = EntityService::new(
			fx.sensors.clone(),
			fx.guard.clone(),
			Arc::new(owner),
			basic_lifecycle::<Sensor>().with_delete_validator(Arc::new(RemovedMeanwhile(fx.sensors.clone()))),
		);
		let err = service
			.delete_with_access_control_check(sensor.id, &AccessRequest::new())
			.await
			.unwrap_err();
		assert!(matches!(err.as_auth(), Some(AuthError::EntityNotFound { kind: "Sensor", .. })));
	}

	#[test]
	fn admin_and_system_user_checks() {
		let fx = Fixture::new();
		let admin = Principal::new(UserId::generate(), "root").with_admin(true);
		assert!(fx.sensor_service(admin).require_admin().is_ok());

		let err = fx.sensor_service(iot_user("alice")).require_system_user().unwrap_err();
		assert!(matches!(err.as_auth(), Some(AuthError::NoSystemUser)));
	}
}
