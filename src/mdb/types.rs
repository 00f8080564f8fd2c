//! Parameter definitions as exposed by the mission database
//!
//! Definitions are immutable once loaded and shared as `Arc<ParameterDefinition>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the values of a parameter come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Telemetered,
    Derived,
    Constant,
    Local,
    System,
    Command,
    CommandHistory,
    External1,
    External2,
    External3,
}

/// Alternate name of a parameter inside a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alias {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumState {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMember {
    pub name: String,
    #[serde(rename = "type")]
    pub member_type: ParameterType,
}

/// Declared engineering type of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterType {
    Integer {
        #[serde(default = "default_signed")]
        signed: bool,
        #[serde(default = "default_int_bits")]
        size_in_bits: u32,
    },
    Float {
        #[serde(default = "default_float_bits")]
        size_in_bits: u32,
    },
    Boolean,
    String,
    Binary,
    Enumerated {
        states: Vec<EnumState>,
    },
    AbsoluteTime,
    Aggregate {
        members: Vec<AggregateMember>,
    },
    Array {
        element: Box<ParameterType>,
        /// Fixed number of elements, if any
        #[serde(default)]
        length: Option<usize>,
    },
}

fn default_signed() -> bool {
    true
}

fn default_int_bits() -> u32 {
    32
}

fn default_float_bits() -> u32 {
    64
}

impl ParameterType {
    pub fn member(&self, name: &str) -> Option<&ParameterType> {
        match self {
            ParameterType::Aggregate { members } => members
                .iter()
                .find(|m| m.name == name)
                .map(|m| &m.member_type),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterType::Integer { .. } => "integer",
            ParameterType::Float { .. } => "float",
            ParameterType::Boolean => "boolean",
            ParameterType::String => "string",
            ParameterType::Binary => "binary",
            ParameterType::Enumerated { .. } => "enumeration",
            ParameterType::AbsoluteTime => "absolute time",
            ParameterType::Aggregate { .. } => "aggregate",
            ParameterType::Array { .. } => "array",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Integer {
                signed,
                size_in_bits,
            } => write!(
                f,
                "integer({} bits, {})",
                size_in_bits,
                if *signed { "signed" } else { "unsigned" }
            ),
            ParameterType::Float { size_in_bits } => write!(f, "float({} bits)", size_in_bits),
            ParameterType::Enumerated { states } => {
                let labels: Vec<&str> = states.iter().map(|s| s.label.as_str()).collect();
                write!(f, "enumeration[{}]", labels.join("|"))
            }
            ParameterType::Aggregate { members } => {
                let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
                write!(f, "aggregate{{{}}}", names.join(","))
            }
            ParameterType::Array { element, length } => match length {
                Some(n) => write!(f, "array[{}] of {}", n, element),
                None => write!(f, "array of {}", element),
            },
            other => f.write_str(other.type_name()),
        }
    }
}

/// Immutable parameter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub qualified_name: String,
    #[serde(default)]
    pub aliases: Vec<Alias>,
    pub data_source: DataSource,
    #[serde(default, rename = "type")]
    pub parameter_type: Option<ParameterType>,
}

impl ParameterDefinition {
    pub fn new(qualified_name: impl Into<String>, data_source: DataSource) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            aliases: Vec::new(),
            data_source,
            parameter_type: None,
        }
    }

    /// Create a locally-sourced definition
    pub fn local(qualified_name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self::new(qualified_name, DataSource::Local).with_type(parameter_type)
    }

    pub fn with_type(mut self, parameter_type: ParameterType) -> Self {
        self.parameter_type = Some(parameter_type);
        self
    }

    pub fn with_alias(mut self, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        self.aliases.push(Alias {
            namespace: namespace.into(),
            name: name.into(),
        });
        self
    }

    pub fn is_local(&self) -> bool {
        self.data_source == DataSource::Local
    }

    /// Last path segment of the qualified name
    pub fn name(&self) -> &str {
        self.qualified_name
            .rsplit_once('/')
            .map(|(_, n)| n)
            .unwrap_or(&self.qualified_name)
    }

    /// Space system owning the parameter, derived from the qualified name
    pub fn space_system(&self) -> Option<&str> {
        match self.qualified_name.rsplit_once('/') {
            Some(("", _)) => Some("/"),
            Some((ss, _)) => Some(ss),
            None => None,
        }
    }
}

/// Identifier used by clients: a name, optionally inside a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedObjectId {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl NamedObjectId {
    pub fn qualified(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

impl fmt::Display for NamedObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}
