//! Values, member paths, coercion and the last value cache

pub mod value;
pub mod parameter_value;
pub mod path;
pub mod coerce;
pub mod cache;

pub use value::{AggregateValue, Value};
pub use parameter_value::ParameterValue;
pub use path::{MemberPath, PathElement, PathError};
pub use coerce::ValueCoercionEngine;
pub use cache::{InMemoryLastValueCache, LastValueCache};
