//! Member paths into aggregate and array values
//!
//! A path such as `pos.x` or `samples[3].flag` addresses one member or element
//! inside a composite value. Paths are checked against the declared type
//! before they are applied to a cached value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::mdb::types::ParameterType;
use crate::value::value::Value;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PathError(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathElement {
    Member(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberPath {
    elements: Vec<PathElement>,
}

impl MemberPath {
    pub fn new(elements: Vec<PathElement>) -> Result<Self, PathError> {
        if elements.is_empty() {
            return Err(PathError("empty path".into()));
        }
        Ok(Self { elements })
    }

    pub fn member(name: impl Into<String>) -> Self {
        Self {
            elements: vec![PathElement::Member(name.into())],
        }
    }

    pub fn index(index: usize) -> Self {
        Self {
            elements: vec![PathElement::Index(index)],
        }
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Declared type found at the end of the path
    pub fn resolve_type<'a>(&self, root: &'a ParameterType) -> Result<&'a ParameterType, PathError> {
        let mut current = root;
        for element in &self.elements {
            current = match (element, current) {
                (PathElement::Member(name), ParameterType::Aggregate { .. }) => current
                    .member(name)
                    .ok_or_else(|| PathError(format!("no member '{}' in {}", name, current)))?,
                (PathElement::Index(i), ParameterType::Array { element, length }) => {
                    if let Some(len) = length {
                        if i >= len {
                            return Err(PathError(format!(
                                "index {} out of bounds for {}",
                                i, current
                            )));
                        }
                    }
                    element.as_ref()
                }
                (PathElement::Member(name), other) => {
                    return Err(PathError(format!(
                        "member '{}' applied to non-aggregate type {}",
                        name, other
                    )))
                }
                (PathElement::Index(i), other) => {
                    return Err(PathError(format!(
                        "index {} applied to non-array type {}",
                        i, other
                    )))
                }
            };
        }
        Ok(current)
    }

    /// Replace the addressed member/element of `root` with `new_value`
    pub fn replace_in(&self, root: &mut Value, new_value: Value) -> Result<(), PathError> {
        let mut current = root;
        for element in &self.elements {
            current = match (element, current) {
                (PathElement::Member(name), Value::Aggregate(agg)) => agg
                    .get_mut(name)
                    .ok_or_else(|| PathError(format!("cached value has no member '{}'", name)))?,
                (PathElement::Index(i), Value::Array(items)) => {
                    let len = items.len();
                    items.get_mut(*i).ok_or_else(|| {
                        PathError(format!(
                            "index {} out of bounds for cached array of {} elements",
                            i, len
                        ))
                    })?
                }
                (el, other) => {
                    return Err(PathError(format!(
                        "cannot apply {} to cached {} value",
                        el,
                        other.type_name()
                    )))
                }
            };
        }
        *current = new_value;
        Ok(())
    }
}

impl FromStr for MemberPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut elements = Vec::new();
        let mut chars = s.chars().peekable();
        let mut name = String::new();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if name.is_empty() {
                        // Allowed only right after an index, as in a[1].b
                        if !matches!(elements.last(), Some(PathElement::Index(_))) {
                            return Err(PathError(format!("empty member name in '{}'", s)));
                        }
                    } else {
                        elements.push(PathElement::Member(std::mem::take(&mut name)));
                    }
                    if chars.peek().is_none() {
                        return Err(PathError(format!("trailing '.' in '{}'", s)));
                    }
                }
                '[' => {
                    if !name.is_empty() {
                        elements.push(PathElement::Member(std::mem::take(&mut name)));
                    }
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(d) if d.is_ascii_digit() => digits.push(d),
                            _ => return Err(PathError(format!("malformed index in '{}'", s))),
                        }
                    }
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| PathError(format!("malformed index in '{}'", s)))?;
                    elements.push(PathElement::Index(index));
                }
                ']' => return Err(PathError(format!("unbalanced ']' in '{}'", s))),
                other => name.push(other),
            }
        }
        if !name.is_empty() {
            elements.push(PathElement::Member(name));
        }
        MemberPath::new(elements)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Member(name) => write!(f, "member '{}'", name),
            PathElement::Index(i) => write!(f, "index {}", i),
        }
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            match element {
                PathElement::Member(name) if i == 0 => f.write_str(name)?,
                PathElement::Member(name) => write!(f, ".{}", name)?,
                PathElement::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdb::types::AggregateMember;
    use crate::value::value::AggregateValue;

    fn int() -> ParameterType {
        ParameterType::Integer {
            signed: true,
            size_in_bits: 32,
        }
    }

    fn nested_type() -> ParameterType {
        ParameterType::Aggregate {
            members: vec![
                AggregateMember {
                    name: "a".into(),
                    member_type: int(),
                },
                AggregateMember {
                    name: "samples".into(),
                    member_type: ParameterType::Array {
                        element: Box::new(ParameterType::Aggregate {
                            members: vec![AggregateMember {
                                name: "flag".into(),
                                member_type: ParameterType::Boolean,
                            }],
                        }),
                        length: Some(2),
                    },
                },
            ],
        }
    }

    #[test]
    fn test_parse_and_display() {
        for text in ["a", "a.b", "samples[1].flag", "[0]", "m[1][2]"] {
            let path: MemberPath = text.parse().unwrap();
            assert_eq!(path.to_string(), text);
        }
        let path: MemberPath = "samples[1].flag".parse().unwrap();
        assert_eq!(
            path.elements(),
            &[
                PathElement::Member("samples".into()),
                PathElement::Index(1),
                PathElement::Member("flag".into()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["", "a..b", "a.", "a[x]", "a[1", "a]", ".a"] {
            assert!(text.parse::<MemberPath>().is_err(), "accepted '{}'", text);
        }
    }

    #[test]
    fn test_resolve_type() {
        let t = nested_type();
        let path: MemberPath = "samples[1].flag".parse().unwrap();
        assert_eq!(path.resolve_type(&t).unwrap(), &ParameterType::Boolean);

        assert!("samples[2].flag".parse::<MemberPath>().unwrap().resolve_type(&t).is_err());
        assert!("c".parse::<MemberPath>().unwrap().resolve_type(&t).is_err());
        assert!("a.b".parse::<MemberPath>().unwrap().resolve_type(&t).is_err());
        assert!("a[0]".parse::<MemberPath>().unwrap().resolve_type(&t).is_err());
    }

    #[test]
    fn test_replace_in() {
        let mut value = Value::Aggregate(
            AggregateValue::new().with("a", Value::SInt64(1)).with(
                "samples",
                Value::Array(vec![
                    Value::Aggregate(AggregateValue::new().with("flag", Value::Boolean(false))),
                    Value::Aggregate(AggregateValue::new().with("flag", Value::Boolean(false))),
                ]),
            ),
        );
        let path: MemberPath = "samples[1].flag".parse().unwrap();
        path.replace_in(&mut value, Value::Boolean(true)).unwrap();
        assert_eq!(value.to_string(), "{a: 1, samples: [{flag: false}, {flag: true}]}");

        let short: MemberPath = "samples[5].flag".parse().unwrap();
        assert!(short.replace_in(&mut value, Value::Boolean(true)).is_err());
    }
}
