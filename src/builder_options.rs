//! Serialization of the opaque trajectory builder options.
//!
//! The builder options are never interpreted here. They are copied into a
//! [`ParameterTable`] in key order and protobuf-encoded, which makes the
//! output a pure function of the configuration.

use lua_config::{Key, ParameterDictionary, Value};
use prost::Message;
use thiserror::Error;

use crate::proto::{ParameterEntry, ParameterTable, ParameterValue, parameter_entry, parameter_value};

/// Errors that can occur while serializing the builder options.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializationError {
    /// The builder options are a scalar instead of a table.
    #[error("trajectory builder options must be a table, found {0}")]
    NotATable(&'static str),

    /// NaN or an infinity somewhere in the options.
    #[error("non-finite number at '{path}'")]
    NonFiniteNumber { path: String },

    /// Failed to encode the protobuf message.
    #[error("protobuf encode error")]
    Encode(#[from] prost::EncodeError),
}

/// Serializes the builder options to bytes. Absent options serialize to an
/// empty buffer.
pub fn serialize(options: Option<&Value>) -> Result<Vec<u8>, SerializationError> {
    let Some(options) = options else {
        return Ok(Vec::new());
    };
    let dictionary = options
        .as_dictionary()
        .ok_or(SerializationError::NotATable(options.type_name()))?;
    let table = to_table(dictionary, "trajectory_builder")?;

    let mut buf = Vec::with_capacity(table.encoded_len());
    table.encode(&mut buf)?;
    Ok(buf)
}

fn to_table(dictionary: &ParameterDictionary, path: &str) -> Result<ParameterTable, SerializationError> {
    let entries = dictionary
        .iter()
        .map(|(key, value)| {
            let path = match key {
                Key::Index(index) => format!("{path}[{index}]"),
                Key::Name(name) => format!("{path}.{name}"),
            };
            Ok(ParameterEntry {
                key: Some(match key {
                    Key::Index(index) => parameter_entry::Key::Index(*index),
                    Key::Name(name) => parameter_entry::Key::Name(name.clone()),
                }),
                value: Some(to_value(value, &path)?),
            })
        })
        .collect::<Result<Vec<_>, SerializationError>>()?;

    Ok(ParameterTable { entries })
}

fn to_value(value: &Value, path: &str) -> Result<ParameterValue, SerializationError> {
    let kind = match value {
        Value::Boolean(value) => parameter_value::Kind::Boolean(*value),
        Value::Integer(value) => parameter_value::Kind::Integer(*value),
        Value::Number(value) if !value.is_finite() => {
            return Err(SerializationError::NonFiniteNumber {
                path: path.to_owned(),
            });
        }
        Value::Number(value) => parameter_value::Kind::Number(*value),
        Value::String(value) => parameter_value::Kind::Text(value.clone()),
        Value::Table(table) => parameter_value::Kind::Table(to_table(table, path)?),
    };
    Ok(ParameterValue { kind: Some(kind) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::dictionary;

    fn builder(source: &str) -> Value {
        let dict = dictionary(source).unwrap();
        dict.get("trajectory_builder").cloned().unwrap()
    }

    #[test]
    fn test_absent_options_serialize_empty() {
        assert!(serialize(None).unwrap().is_empty());
    }

    #[test]
    fn test_decodes_back_in_key_order() {
        let value = builder("return { trajectory_builder = { z = 1, a = { 'x' }, m = 0.5 } }");
        let bytes = serialize(Some(&value)).unwrap();
        let table = ParameterTable::decode(bytes.as_slice()).unwrap();

        let names: Vec<_> = table
            .entries
            .iter()
            .map(|entry| match &entry.key {
                Some(parameter_entry::Key::Name(name)) => name.as_str(),
                other => panic!("unexpected key {other:?}"),
            })
            .collect();
        assert_eq!(names, ["a", "m", "z"]);
    }

    #[test]
    fn test_same_options_same_bytes() {
        let first = builder("return { trajectory_builder = { b = true, a = { c = 1, d = 2 } } }");
        let second = builder("return { trajectory_builder = { a = { d = 2, c = 1 }, b = true } }");
        assert_eq!(
            serialize(Some(&first)).unwrap(),
            serialize(Some(&second)).unwrap()
        );
    }

    #[test]
    fn test_scalar_options_rejected() {
        let value = builder("return { trajectory_builder = 3 }");
        assert!(matches!(
            serialize(Some(&value)),
            Err(SerializationError::NotATable("integer"))
        ));
    }

    #[test]
    fn test_non_finite_number_rejected() {
        let value = builder("return { trajectory_builder = { inner = { ratio = 1 / 0. } } }");
        match serialize(Some(&value)) {
            Err(SerializationError::NonFiniteNumber { path }) => {
                assert_eq!(path, "trajectory_builder.inner.ratio");
            }
            other => panic!("expected NonFiniteNumber, got {other:?}"),
        }
    }
}
