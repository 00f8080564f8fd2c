//! Conversion of caller-supplied values into engineering values
//!
//! Everything here runs on the caller's thread before anything reaches the
//! ordering lane, so a rejected value never becomes visible to listeners.

use std::sync::Arc;

use crate::core::errors::{ParamError, Result};
use crate::core::time::Instant;
use crate::mdb::types::{ParameterDefinition, ParameterType};
use crate::value::cache::LastValueCache;
use crate::value::parameter_value::ParameterValue;
use crate::value::value::{AggregateValue, Value};

/// Why a value does not fit a declared type
#[derive(Debug)]
struct Mismatch {
    expected: String,
    actual: String,
}

impl Mismatch {
    fn new(ptype: &ParameterType, value: &Value) -> Self {
        Self {
            expected: ptype.to_string(),
            actual: describe(value),
        }
    }

    fn within(self, context: String) -> Self {
        Self {
            expected: format!("{}: {}", context, self.expected),
            actual: self.actual,
        }
    }

    fn into_error(self, parameter: &str) -> ParamError {
        ParamError::type_mismatch(parameter, self.expected, self.actual)
    }
}

fn describe(value: &Value) -> String {
    format!("{} {}", value.type_name(), value)
}

pub struct ValueCoercionEngine {
    lvc: Arc<dyn LastValueCache>,
}

impl ValueCoercionEngine {
    pub fn new(lvc: Arc<dyn LastValueCache>) -> Self {
        Self { lvc }
    }

    /// Convert `supplied` into the representation declared for `definition`.
    ///
    /// Definitions without a declared type accept any value unchanged.
    pub fn coerce(&self, definition: &ParameterDefinition, supplied: &Value) -> Result<Value> {
        match &definition.parameter_type {
            Some(ptype) => {
                convert(ptype, supplied).map_err(|m| m.into_error(&definition.qualified_name))
            }
            None => Ok(supplied.clone()),
        }
    }

    /// Validate a single-value assignment: LOCAL source, then type
    pub fn check_assignment(
        &self,
        definition: &ParameterDefinition,
        eng_value: &Value,
    ) -> Result<Value> {
        if !definition.is_local() {
            return Err(ParamError::invalid_assignment(
                &definition.qualified_name,
                format!(
                    "data source of parameter {} is not local",
                    definition.qualified_name
                ),
            ));
        }
        self.coerce(definition, eng_value)
    }

    /// Merge a partial update into the last full value of the parameter
    pub fn merge_partial(
        &self,
        definition: &Arc<ParameterDefinition>,
        update: &ParameterValue,
    ) -> Result<ParameterValue> {
        let name = &definition.qualified_name;
        let path = update.partial.as_ref().ok_or_else(|| {
            ParamError::invalid_path(name.as_str(), "", "update carries no member path")
        })?;
        let base = self
            .lvc
            .get(definition)
            .ok_or_else(|| ParamError::missing_base_value(name.as_str()))?;

        let member_value = match &definition.parameter_type {
            Some(ptype) => {
                let member_type = path
                    .resolve_type(ptype)
                    .map_err(|e| ParamError::invalid_path(name.as_str(), path.to_string(), e.to_string()))?;
                convert(member_type, &update.eng_value)
                    .map_err(|m| m.within(path.to_string()).into_error(name))?
            }
            None => update.eng_value.clone(),
        };

        // Everything but the addressed member is carried over from the base
        let mut merged = base;
        path.replace_in(&mut merged.eng_value, member_value)
            .map_err(|e| ParamError::invalid_path(name.as_str(), path.to_string(), e.to_string()))?;
        merged.partial = None;
        merged.rebind(definition.clone());
        Ok(merged)
    }

    /// Produce the full, coerced value to submit for one batch item
    pub fn transform(&self, value: &ParameterValue) -> Result<ParameterValue> {
        if value.is_partial() {
            return self.merge_partial(value.definition(), value);
        }
        let eng_value = self.coerce(value.definition(), &value.eng_value)?;
        let mut transformed = value.clone();
        transformed.eng_value = eng_value;
        Ok(transformed)
    }
}

fn convert(ptype: &ParameterType, value: &Value) -> std::result::Result<Value, Mismatch> {
    let mismatch = || Mismatch::new(ptype, value);
    match ptype {
        ParameterType::Integer {
            signed,
            size_in_bits,
        } => {
            let n = integer_of(value).ok_or_else(mismatch)?;
            let bits = (*size_in_bits).clamp(1, 64);
            if *signed {
                let min = -(1i128 << (bits - 1));
                let max = (1i128 << (bits - 1)) - 1;
                if n < min || n > max {
                    return Err(mismatch());
                }
                Ok(Value::SInt64(n as i64))
            } else {
                let max = (1i128 << bits) - 1;
                if n < 0 || n > max {
                    return Err(mismatch());
                }
                Ok(Value::UInt64(n as u64))
            }
        }
        ParameterType::Float { size_in_bits } => {
            let f = float_of(value).ok_or_else(mismatch)?;
            if *size_in_bits == 32 {
                if f.is_finite() && f.abs() > f32::MAX as f64 {
                    return Err(mismatch());
                }
                Ok(Value::Float(f as f32))
            } else {
                Ok(Value::Double(f))
            }
        }
        ParameterType::Boolean => match value {
            Value::Boolean(b) => Ok(Value::Boolean(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Boolean(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Boolean(false)),
            _ => Err(mismatch()),
        },
        ParameterType::String => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            _ => Err(mismatch()),
        },
        ParameterType::Binary => match value {
            Value::Binary(b) => Ok(Value::Binary(b.clone())),
            _ => Err(mismatch()),
        },
        ParameterType::Enumerated { states } => {
            let state = match value {
                Value::String(label) => states.iter().find(|s| &s.label == label),
                Value::Enumerated { label, .. } => states.iter().find(|s| &s.label == label),
                Value::SInt64(_) | Value::UInt64(_) => {
                    let n = integer_of(value).ok_or_else(mismatch)?;
                    states.iter().find(|s| s.value as i128 == n)
                }
                _ => None,
            };
            state
                .map(|s| Value::Enumerated {
                    value: s.value,
                    label: s.label.clone(),
                })
                .ok_or_else(mismatch)
        }
        ParameterType::AbsoluteTime => match value {
            Value::Timestamp(t) => Ok(Value::Timestamp(*t)),
            Value::String(s) => Instant::parse_rfc3339(s)
                .map(Value::Timestamp)
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ParameterType::Aggregate { members } => {
            let Value::Aggregate(supplied) = value else {
                return Err(mismatch());
            };
            if let Some(extra) = supplied
                .names()
                .find(|n| !members.iter().any(|m| m.name == *n))
            {
                return Err(Mismatch {
                    expected: ptype.to_string(),
                    actual: format!("undeclared member '{}'", extra),
                });
            }
            let mut result = AggregateValue::new();
            for member in members {
                let member_value = supplied.get(&member.name).ok_or_else(|| Mismatch {
                    expected: ptype.to_string(),
                    actual: format!("aggregate without member '{}'", member.name),
                })?;
                let converted = convert(&member.member_type, member_value)
                    .map_err(|m| m.within(format!("member '{}'", member.name)))?;
                result.set(member.name.clone(), converted);
            }
            Ok(Value::Aggregate(result))
        }
        ParameterType::Array { element, length } => {
            let Value::Array(items) = value else {
                return Err(mismatch());
            };
            if let Some(len) = length {
                if items.len() != *len {
                    return Err(Mismatch {
                        expected: ptype.to_string(),
                        actual: format!("array of {} elements", items.len()),
                    });
                }
            }
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    convert(element, item).map_err(|m| m.within(format!("element {}", i)))
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array)
        }
    }
}

fn integer_of(value: &Value) -> Option<i128> {
    match value {
        Value::SInt64(i) => Some(*i as i128),
        Value::UInt64(u) => Some(*u as i128),
        Value::Float(f) => integral(*f as f64),
        Value::Double(f) => integral(*f),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

fn integral(f: f64) -> Option<i128> {
    if f.is_finite() && f.fract() == 0.0 {
        Some(f as i128)
    } else {
        None
    }
}

fn float_of(value: &Value) -> Option<f64> {
    match value {
        Value::SInt64(i) => Some(*i as f64),
        Value::UInt64(u) => Some(*u as f64),
        Value::Float(f) => Some(*f as f64),
        Value::Double(f) => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdb::types::{AggregateMember, DataSource, EnumState};
    use crate::value::cache::InMemoryLastValueCache;
    use crate::value::path::MemberPath;
    use pretty_assertions::assert_eq;

    fn int(bits: u32, signed: bool) -> ParameterType {
        ParameterType::Integer {
            signed,
            size_in_bits: bits,
        }
    }

    fn q_type() -> ParameterType {
        ParameterType::Aggregate {
            members: vec![
                AggregateMember {
                    name: "a".into(),
                    member_type: int(32, true),
                },
                AggregateMember {
                    name: "b".into(),
                    member_type: int(32, true),
                },
            ],
        }
    }

    fn engine() -> (ValueCoercionEngine, Arc<InMemoryLastValueCache>) {
        let lvc = Arc::new(InMemoryLastValueCache::new());
        (ValueCoercionEngine::new(lvc.clone()), lvc)
    }

    #[test]
    fn test_integer_coercion_and_range() {
        let (engine, _) = engine();
        let def = ParameterDefinition::local("/p/i8", int(8, true));
        assert_eq!(engine.coerce(&def, &Value::Double(-128.0)).unwrap(), Value::SInt64(-128));
        assert_eq!(engine.coerce(&def, &Value::from("17")).unwrap(), Value::SInt64(17));
        assert!(matches!(
            engine.coerce(&def, &Value::SInt64(128)),
            Err(ParamError::TypeMismatch { .. })
        ));
        assert!(engine.coerce(&def, &Value::Double(1.5)).is_err());

        let unsigned = ParameterDefinition::local("/p/u16", int(16, false));
        assert_eq!(engine.coerce(&unsigned, &Value::SInt64(65535)).unwrap(), Value::UInt64(65535));
        assert!(engine.coerce(&unsigned, &Value::SInt64(-1)).is_err());

        let wide = ParameterDefinition::local("/p/u64", int(64, false));
        assert_eq!(
            engine.coerce(&wide, &Value::UInt64(u64::MAX)).unwrap(),
            Value::UInt64(u64::MAX)
        );
    }

    #[test]
    fn test_float_and_boolean() {
        let (engine, _) = engine();
        let f32_def = ParameterDefinition::local("/p/f", ParameterType::Float { size_in_bits: 32 });
        assert_eq!(engine.coerce(&f32_def, &Value::SInt64(3)).unwrap(), Value::Float(3.0));
        assert!(engine.coerce(&f32_def, &Value::Double(1e300)).is_err());

        let b = ParameterDefinition::local("/p/b", ParameterType::Boolean);
        assert_eq!(engine.coerce(&b, &Value::from("TRUE")).unwrap(), Value::Boolean(true));
        assert!(engine.coerce(&b, &Value::SInt64(1)).is_err());
    }

    #[test]
    fn test_enumeration() {
        let (engine, _) = engine();
        let def = ParameterDefinition::local(
            "/p/mode",
            ParameterType::Enumerated {
                states: vec![
                    EnumState {
                        value: 0,
                        label: "SAFE".into(),
                    },
                    EnumState {
                        value: 1,
                        label: "NOMINAL".into(),
                    },
                ],
            },
        );
        let expected = Value::Enumerated {
            value: 1,
            label: "NOMINAL".into(),
        };
        assert_eq!(engine.coerce(&def, &Value::from("NOMINAL")).unwrap(), expected);
        assert_eq!(engine.coerce(&def, &Value::SInt64(1)).unwrap(), expected);
        assert!(engine.coerce(&def, &Value::from("PANIC")).is_err());
        assert!(engine.coerce(&def, &Value::SInt64(7)).is_err());
    }

    #[test]
    fn test_aggregate_structure() {
        let (engine, _) = engine();
        let def = ParameterDefinition::local("/p/Q", q_type());
        let ok = Value::Aggregate(
            AggregateValue::new()
                .with("b", Value::from("2"))
                .with("a", Value::SInt64(1)),
        );
        // Result follows declaration order
        assert_eq!(engine.coerce(&def, &ok).unwrap().to_string(), "{a: 1, b: 2}");

        let missing = Value::Aggregate(AggregateValue::new().with("a", Value::SInt64(1)));
        let err = engine.coerce(&def, &missing).unwrap_err();
        assert!(err.to_string().contains("without member 'b'"));

        let extra = Value::Aggregate(
            AggregateValue::new()
                .with("a", Value::SInt64(1))
                .with("b", Value::SInt64(2))
                .with("c", Value::SInt64(3)),
        );
        assert!(engine.coerce(&def, &extra).is_err());
    }

    #[test]
    fn test_array_length_and_elements() {
        let (engine, _) = engine();
        let def = ParameterDefinition::local(
            "/p/arr",
            ParameterType::Array {
                element: Box::new(int(8, false)),
                length: Some(2),
            },
        );
        assert_eq!(
            engine
                .coerce(&def, &Value::Array(vec![Value::SInt64(1), Value::SInt64(2)]))
                .unwrap(),
            Value::Array(vec![Value::UInt64(1), Value::UInt64(2)])
        );
        assert!(engine.coerce(&def, &Value::Array(vec![Value::SInt64(1)])).is_err());
        let err = engine
            .coerce(&def, &Value::Array(vec![Value::SInt64(1), Value::SInt64(300)]))
            .unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn test_untyped_definition_passes_through() {
        let (engine, _) = engine();
        let def = ParameterDefinition::new("/p/any", DataSource::Local);
        assert_eq!(engine.coerce(&def, &Value::from("x")).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_check_assignment_rejects_non_local() {
        let (engine, _) = engine();
        let def = ParameterDefinition::new("/p/tm", DataSource::Telemetered).with_type(int(32, true));
        let err = engine.check_assignment(&def, &Value::SInt64(1)).unwrap_err();
        assert!(matches!(err, ParamError::InvalidAssignment { .. }));
    }

    #[test]
    fn test_merge_partial_replaces_only_addressed_member() {
        let (engine, lvc) = engine();
        let def = Arc::new(ParameterDefinition::local("/p/Q", q_type()));
        let t0 = Instant::from_millis(1_000);
        lvc.put(
            ParameterValue::new(
                def.clone(),
                Value::Aggregate(
                    AggregateValue::new()
                        .with("a", Value::SInt64(1))
                        .with("b", Value::SInt64(2)),
                ),
            )
            .with_times(t0, t0)
            .with_raw_value(Value::from("rawbase")),
        );

        let t1 = Instant::from_millis(2_000);
        let update = ParameterValue::partial(def.clone(), MemberPath::member("b"), Value::SInt64(5))
            .with_times(t1, t1);
        let merged = engine.transform(&update).unwrap();
        assert_eq!(
            merged.eng_value,
            Value::Aggregate(
                AggregateValue::new()
                    .with("a", Value::SInt64(1))
                    .with("b", Value::SInt64(5))
            )
        );
        assert!(!merged.is_partial());
        assert_eq!(merged.generation_time, Some(t0));
        assert_eq!(merged.acquisition_time, Some(t0));
        assert_eq!(merged.raw_value, Some(Value::from("rawbase")));
    }

    #[test]
    fn test_merge_partial_without_base() {
        let (engine, _) = engine();
        let def = Arc::new(ParameterDefinition::local("/p/Q", q_type()));
        let update = ParameterValue::partial(def, MemberPath::member("a"), Value::SInt64(3));
        assert!(matches!(
            engine.transform(&update),
            Err(ParamError::MissingBaseValue { .. })
        ));
    }

    #[test]
    fn test_merge_partial_invalid_path_and_type() {
        let (engine, lvc) = engine();
        let def = Arc::new(ParameterDefinition::local("/p/Q", q_type()));
        lvc.put(ParameterValue::new(
            def.clone(),
            Value::Aggregate(
                AggregateValue::new()
                    .with("a", Value::SInt64(1))
                    .with("b", Value::SInt64(2)),
            ),
        ));
        let bad_path = ParameterValue::partial(def.clone(), MemberPath::member("z"), Value::SInt64(3));
        assert!(matches!(
            engine.transform(&bad_path),
            Err(ParamError::InvalidPath { .. })
        ));
        let bad_value = ParameterValue::partial(def, MemberPath::member("a"), Value::from("three"));
        let err = engine.transform(&bad_value).unwrap_err();
        assert!(matches!(err, ParamError::TypeMismatch { .. }));
        assert!(err.to_string().contains("a: integer"));
    }
}
