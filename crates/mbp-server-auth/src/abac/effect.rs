// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Post-authorization effects.
//!
//! Effects transform the serialized view of a resource returned to a principal
//! whose access was granted by a policy. They are applied strictly in the
//! order the policy declares them.
//!
//! Field paths are dotted (`reading.temperature`). A list met anywhere along
//! the path, including a list-shaped view, has the rest of the path applied to
//! each of its elements.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A transformation applied to an authorized result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
	/// Rounds a numeric field to `decimal_places` digits; halves round toward
	/// positive infinity, so `-2.5` becomes `-2`.
	NumericAccuracyDegradation { field: String, decimal_places: u32 },
	/// Replaces a field with `null`.
	FieldRedaction { field: String },
}

impl Effect {
	/// Dotted path of the field the effect targets.
	pub fn field(&self) -> &str {
		match self {
			Effect::NumericAccuracyDegradation { field, .. } | Effect::FieldRedaction { field } => field,
		}
	}

	/// Applies the effect to `view` in place. Missing fields are left alone.
	pub fn apply(&self, view: &mut Value) {
		let path: Vec<&str> = self.field().split('.').collect();
		for_each_target(view, &path, &mut |target: &mut Value| self.transform(target));
	}

	fn transform(&self, target: &mut Value) {
		match self {
			Effect::NumericAccuracyDegradation { decimal_places, .. } => {
				if let Some(rounded) = target.as_f64().and_then(|n| round_to(n, *decimal_places)) {
					*target = rounded;
				}
			}
			Effect::FieldRedaction { .. } => *target = Value::Null,
		}
	}
}

/// Applies `effects` to `view` in declared order and returns the result.
pub fn apply_effects(effects: &[Effect], mut view: Value) -> Value {
	for effect in effects {
		effect.apply(&mut view);
	}
	view
}

/// Calls `f` on every value `path` reaches from `node`, fanning out over lists.
fn for_each_target(node: &mut Value, path: &[&str], f: &mut dyn FnMut(&mut Value)) {
	let Some((segment, rest)) = path.split_first() else {
		f(node);
		return;
	};

	match node {
		Value::Array(items) => {
			for item in items {
				for_each_target(item, path, f);
			}
		}
		Value::Object(fields) => {
			if let Some(child) = fields.get_mut(*segment) {
				for_each_target(child, rest, f);
			}
		}
		_ => {}
	}
}

fn round_to(value: f64, decimal_places: u32) -> Option<Value> {
	let factor = 10f64.powi(i32::try_from(decimal_places).ok()?);
	if !factor.is_finite() {
		return None;
	}
	let rounded = (value * factor + 0.5).floor() / factor;
	serde_json::Number::from_f64(rounded).map(Value::Number)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn degrade(field: &str, decimal_places: u32) -> Effect {
		Effect::NumericAccuracyDegradation {
			field: field.to_string(),
			decimal_places,
		}
	}

	#[test]
	fn rounds_half_up() {
		let view = apply_effects(&[degrade("value", 1)], json!({ "value": 21.25 }));
		assert_eq!(view, json!({ "value": 21.3 }));

		let view = apply_effects(&[degrade("value", 0)], json!({ "value": 2.5 }));
		assert_eq!(view, json!({ "value": 3.0 }));
	}

	#[test]
	fn negative_halves_round_toward_positive_infinity() {
		let view = apply_effects(&[degrade("value", 0)], json!({ "value": -2.5 }));
		assert_eq!(view, json!({ "value": -2.0 }));

		let view = apply_effects(&[degrade("value", 1)], json!({ "value": -1.25 }));
		assert_eq!(view, json!({ "value": -1.2 }));
	}

	#[test]
	fn redaction_applies_to_every_list_element() {
		let effects = [Effect::FieldRedaction {
			field: "value".to_string(),
		}];
		let view = apply_effects(&effects, json!([{ "value": 21.4567 }, { "value": 19.1234 }]));
		assert_eq!(view, json!([{ "value": null }, { "value": null }]));
	}

	#[test]
	fn degradation_applies_to_every_list_element() {
		let view = apply_effects(
			&[degrade("value", 1)],
			json!([{ "value": 21.4567, "sensor": "t1" }, { "value": 19.1234, "sensor": "t2" }]),
		);
		assert_eq!(
			view,
			json!([{ "value": 21.5, "sensor": "t1" }, { "value": 19.1, "sensor": "t2" }])
		);
	}

	#[test]
	fn lists_nested_along_the_path_are_expanded() {
		let view = apply_effects(
			&[degrade("logs.value", 0)],
			json!({ "device": "d1", "logs": [{ "value": 1.4 }, { "value": 2.6 }, { "other": 3.3 }] }),
		);
		assert_eq!(
			view,
			json!({ "device": "d1", "logs": [{ "value": 1.0 }, { "value": 3.0 }, { "other": 3.3 }] })
		);
	}

	#[test]
	fn rounds_nested_field() {
		let view = apply_effects(
			&[degrade("reading.temperature", 2)],
			json!({ "reading": { "temperature": 21.4567, "unit": "C" } }),
		);
		assert_eq!(view, json!({ "reading": { "temperature": 21.46, "unit": "C" } }));
	}

	#[test]
	fn missing_or_non_numeric_fields_are_untouched() {
		let original = json!({ "value": "warm", "name": "thermometer" });
		let view = apply_effects(&[degrade("value", 1), degrade("absent.deep", 1)], original.clone());
		assert_eq!(view, original);
	}

	#[test]
	fn effects_apply_in_declared_order() {
		let effects = vec![
			Effect::FieldRedaction {
				field: "value".to_string(),
			},
			degrade("value", 1),
		];
		let view = apply_effects(&effects, json!({ "value": 1.26 }));
		assert_eq!(view, json!({ "value": null }));

		let effects = vec![
			degrade("value", 1),
			Effect::FieldRedaction {
				field: "other".to_string(),
			},
		];
		let view = apply_effects(&effects, json!({ "value": 1.26, "other": true }));
		assert_eq!(view, json!({ "value": 1.3, "other": null }));
	}

	#[test]
	fn serializes_with_type_tag() {
		let json = serde_json::to_value(degrade("value", 2)).unwrap();
		assert_eq!(
			json,
			json!({ "type": "NUMERIC_ACCURACY_DEGRADATION", "field": "value", "decimal_places": 2 })
		);
	}
}
