// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Generic entity storage.
//!
//! [`Repository`] is the storage seam every entity service is written against.
//! [`InMemoryRepository`] keeps entities in insertion order behind a
//! `tokio::sync::RwLock`.

use async_trait::async_trait;
use mbp_server_auth::{EntityId, ProtectedResource, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;

/// A stored, access-controlled entity.
pub trait Entity: ProtectedResource + Clone + Send + Sync + 'static {
	/// Kind name used in errors and logs.
	const KIND: &'static str;

	fn id(&self) -> EntityId {
		self.resource_id()
	}

	fn name(&self) -> &str;

	fn set_owner(&mut self, owner_id: UserId);
}

/// Ordering applied by [`Repository::find_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sort {
	/// Storage order.
	#[default]
	Unsorted,
	ByName {
		descending: bool,
	},
}

impl Sort {
	pub fn by_name() -> Self {
		Sort::ByName { descending: false }
	}

	pub fn by_name_desc() -> Self {
		Sort::ByName { descending: true }
	}

	pub fn apply<E: Entity>(&self, entities: &mut [E]) {
		match self {
			Sort::Unsorted => {}
			Sort::ByName { descending } => {
				entities.sort_by(|a, b| a.name().cmp(b.name()));
				if *descending {
					entities.reverse();
				}
			}
		}
	}
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
	pub page: usize,
	pub size: usize,
}

impl Pageable {
	pub fn new(page: usize, size: usize) -> Self {
		Self { page, size }
	}
}

impl Default for Pageable {
	fn default() -> Self {
		Self { page: 0, size: 20 }
	}
}

/// One page of results together with the total number of visible items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<E> {
	pub items: Vec<E>,
	pub page: usize,
	pub size: usize,
	pub total: usize,
}

impl<E> Page<E> {
	/// Cuts `pageable` out of the complete, already ordered list.
	pub fn from_all(all: Vec<E>, pageable: Pageable) -> Self {
		let total = all.len();
		let items = all
			.into_iter()
			.skip(pageable.page.saturating_mul(pageable.size))
			.take(pageable.size)
			.collect();
		Self {
			items,
			page: pageable.page,
			size: pageable.size,
			total,
		}
	}

	pub fn total_pages(&self) -> usize {
		if self.size == 0 {
			0
		} else {
			self.total.div_ceil(self.size)
		}
	}
}

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
	async fn find_by_id(&self, id: EntityId) -> Result<Option<E>>;
	async fn find_all(&self, sort: Sort) -> Result<Vec<E>>;
	/// Inserts or replaces by id and returns the stored entity.
	async fn save(&self, entity: E) -> Result<E>;
	/// Returns whether an entity was removed.
	async fn delete_by_id(&self, id: EntityId) -> Result<bool>;
	async fn exists_by_name(&self, name: &str) -> Result<bool>;
}

/// Repository backed by a vector in insertion order.
pub struct InMemoryRepository<E> {
	entities: RwLock<Vec<E>>,
}

impl<E> Default for InMemoryRepository<E> {
	fn default() -> Self {
		Self {
			entities: RwLock::new(Vec::new()),
		}
	}
}

impl<E: Entity> InMemoryRepository<E> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_entities(entities: Vec<E>) -> Self {
		Self {
			entities: RwLock::new(entities),
		}
	}

	pub async fn len(&self) -> usize {
		self.entities.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entities.read().await.is_empty()
	}
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
	async fn find_by_id(&self, id: EntityId) -> Result<Option<E>> {
		let entities = self.entities.read().await;
		Ok(entities.iter().find(|e| e.id() == id).cloned())
	}

	async fn find_all(&self, sort: Sort) -> Result<Vec<E>> {
		let mut all = self.entities.read().await.clone();
		sort.apply(&mut all);
		Ok(all)
	}

	#[tracing::instrument(skip(self, entity), fields(kind = E::KIND, entity_id = %entity.id()))]
	async fn save(&self, entity: E) -> Result<E> {
		let mut entities = self.entities.write().await;
		match entities.iter_mut().find(|e| e.id() == entity.id()) {
			Some(existing) => *existing = entity.clone(),
			None => entities.push(entity.clone()),
		}
		Ok(entity)
	}

	#[tracing::instrument(skip(self), fields(kind = E::KIND))]
	async fn delete_by_id(&self, id: EntityId) -> Result<bool> {
		let mut entities = self.entities.write().await;
		let before = entities.len();
		entities.retain(|e| e.id() != id);
		Ok(entities.len() != before)
	}

	async fn exists_by_name(&self, name: &str) -> Result<bool> {
		let entities = self.entities.read().await;
		Ok(entities.iter().any(|e| e.name() == name))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resources::Operator;

	fn operator(name: &str) -> Operator {
		Operator::new(name, "avg")
	}

	#[tokio::test]
	async fn save_inserts_then_replaces() {
		let repo = InMemoryRepository::new();
		let mut op = repo.save(operator("smoothing")).await.unwrap();
		assert_eq!(repo.len().await, 1);

		op.description = "moving average".to_string();
		repo.save(op.clone()).await.unwrap();
		assert_eq!(repo.len().await, 1);

		let fetched = repo.find_by_id(op.id).await.unwrap().unwrap();
		assert_eq!(fetched.description, "moving average");
	}

	#[tokio::test]
	async fn find_all_sorts_by_name() {
		let repo = InMemoryRepository::with_entities(vec![operator("b"), operator("c"), operator("a")]);

		let names = |ops: Vec<Operator>| ops.into_iter().map(|o| o.name).collect::<Vec<_>>();
		assert_eq!(names(repo.find_all(Sort::Unsorted).await.unwrap()), vec!["b", "c", "a"]);
		assert_eq!(names(repo.find_all(Sort::by_name()).await.unwrap()), vec!["a", "b", "c"]);
		assert_eq!(names(repo.find_all(Sort::by_name_desc()).await.unwrap()), vec!["c", "b", "a"]);
	}

	#[tokio::test]
	async fn delete_and_exists_by_name() {
		let op = operator("threshold");
		let repo = InMemoryRepository::with_entities(vec![op.clone()]);

		assert!(repo.exists_by_name("threshold").await.unwrap());
		assert!(repo.delete_by_id(op.id).await.unwrap());
		assert!(!repo.delete_by_id(op.id).await.unwrap());
		assert!(!repo.exists_by_name("threshold").await.unwrap());
		assert!(repo.is_empty().await);
	}

	#[test]
	fn page_slices_ordered_items() {
		let page = Page::from_all((0..7).collect::<Vec<_>>(), Pageable::new(1, 3));
		assert_eq!(page.items, vec![3, 4, 5]);
		assert_eq!(page.total, 7);
		assert_eq!(page.total_pages(), 3);

		let past_end = Page::from_all((0..7).collect::<Vec<_>>(), Pageable::new(5, 3));
		assert!(past_end.items.is_empty());
		assert_eq!(Page::<i32>::from_all(vec![], Pageable::new(0, 0)).total_pages(), 0);
	}

	proptest::proptest! {
		#[test]
		fn pages_partition_the_list(len in 0usize..60, size in 1usize..10) {
			let all: Vec<usize> = (0..len).collect();
			let pages = Page::from_all(all.clone(), Pageable::new(0, size)).total_pages();

			let rejoined: Vec<usize> = (0..pages)
				.flat_map(|page| Page::from_all(all.clone(), Pageable::new(page, size)).items)
				.collect();
			proptest::prop_assert_eq!(rejoined, all);
		}
	}
}
