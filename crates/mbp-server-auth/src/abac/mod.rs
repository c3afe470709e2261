// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute-based access control.
//!
//! Evaluation is leaf first: attributes are resolved from the
//! (resource, principal, request) triple, condition trees are evaluated
//! fail-closed, policies pre-filter on access type, and the [`AccessGuard`]
//! combines ownership, admin status and attached policies into a decision.

mod attribute;
mod condition;
mod effect;
mod engine;
mod evaluator;
mod policy;
mod resource;

#[cfg(test)]
pub(crate) mod testing;

pub use attribute::{
	AccessRequest, AttributeNamespace, AttributeRef, AttributeValue, EvaluationContext, ResolutionFailure,
};
pub use condition::{ComparisonFunction, CompositeOperator, ConditionNode, Operand};
pub use effect::{apply_effects, Effect};
pub use engine::{apply_for_grant, AccessGuard, Decision, Grant, PolicyLookup};
pub use evaluator::{compare, ConditionEvaluator, DEFAULT_MAX_CONDITION_DEPTH};
pub use policy::{Policy, PolicyEvaluator};
pub use resource::{AttributeAccessor, AttributeRegistry, ProtectedResource};
