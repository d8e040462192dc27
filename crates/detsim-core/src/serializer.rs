//! Reflective serializer with an explicit type registry.
//!
//! Primitives pass through as-is. Arrays and plain records are wrapped as
//! `{"__type": "Array" | "Object", "__data": ...}`; values of a type
//! registered in a [`TypeRegistry`] are wrapped as
//! `{"__type": <registered name>, "__data": <their own serialized form>}`.
//! An unregistered custom value degrades to a plain record on the way out
//! and comes back as one on the way in -- its original type identity is
//! lost, which mirrors the reference ecosystem's behavior for values with
//! no registered constructor.

use crate::CoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;

pub type SerializedValue = serde_json::Value;

const MAX_DEPTH: u32 = 64;

fn wrap(type_name: &str, data: SerializedValue) -> SerializedValue {
    serde_json::json!({ "__type": type_name, "__data": data })
}

/// If `value` is a `{"__type": ..., "__data": ...}` record, returns the tag
/// and the inner data.
pub fn unwrap_typed(value: &SerializedValue) -> Option<(&str, &SerializedValue)> {
    let obj = value.as_object()?;
    let type_name = obj.get("__type")?.as_str()?;
    let data = obj.get("__data")?;
    Some((type_name, data))
}

struct TypeEntry {
    type_id: TypeId,
    to_data: Box<dyn Fn(&dyn Any) -> SerializedValue>,
    from_data: Box<dyn Fn(SerializedValue) -> Result<Box<dyn Any>, CoreError>>,
}

/// Maps registered type names to the hooks needed to serialize and
/// reconstruct instances of that type.
pub struct TypeRegistry {
    by_name: HashMap<String, TypeEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    /// Registers `T` under `name`. Registering the same name twice replaces
    /// the previous registration.
    pub fn register<T>(&mut self, name: &str)
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        let name_owned = name.to_owned();
        self.by_name.insert(
            name_owned.clone(),
            TypeEntry {
                type_id: TypeId::of::<T>(),
                to_data: Box::new(|any| {
                    let value = any
                        .downcast_ref::<T>()
                        .expect("type registry invoked with mismatched concrete type");
                    serde_json::to_value(value)
                        .expect("registered types must be representable as JSON")
                }),
                from_data: Box::new(move |data| {
                    let name_owned = name_owned.clone();
                    serde_json::from_value::<T>(data)
                        .map(|v| Box::new(v) as Box<dyn Any>)
                        .map_err(|e| CoreError::DeserializationFailed {
                            type_name: name_owned,
                            details: e.to_string(),
                        })
                }),
            },
        );
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Serializes `value`, which must be the concrete type registered under
    /// `name`, into its wrapped `{__type, __data}` form.
    pub fn serialize_as<T: 'static>(&self, name: &str, value: &T) -> Result<SerializedValue, CoreError> {
        let entry = self
            .by_name
            .get(name)
            .ok_or_else(|| CoreError::UnknownType { name: name.to_owned() })?;
        debug_assert_eq!(entry.type_id, TypeId::of::<T>());
        Ok(wrap(name, (entry.to_data)(value)))
    }

    /// Reconstructs a `T` from a previously wrapped value. Fails if the
    /// wrapper's `__type` tag is not `name`, is not registered, or the data
    /// does not deserialize into `T`.
    pub fn deserialize_as<T: 'static>(&self, wrapped: &SerializedValue) -> Result<T, CoreError> {
        let (type_name, data) = unwrap_typed(wrapped).ok_or_else(|| CoreError::DeserializationFailed {
            type_name: "<unknown>".to_owned(),
            details: "value is not a {__type, __data} record".to_owned(),
        })?;
        let entry = self
            .by_name
            .get(type_name)
            .ok_or_else(|| CoreError::UnknownType { name: type_name.to_owned() })?;
        debug_assert_eq!(entry.type_id, TypeId::of::<T>());
        let boxed = (entry.from_data)(data.clone())?;
        boxed
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| CoreError::DeserializationFailed {
                type_name: type_name.to_owned(),
                details: "registered hook returned the wrong concrete type".to_owned(),
            })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively wraps/unwraps arrays and plain records, delegating registered
/// custom types to a [`TypeRegistry`]. Recursion is bounded; structures
/// deeper than [`MAX_DEPTH`] are rejected as if circular, since the
/// reference ecosystem has no other way to construct a genuine reference
/// cycle in a tree-shaped value.
pub struct Serializer<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> Serializer<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn serialize_value(&self, value: &SerializedValue) -> Result<SerializedValue, CoreError> {
        self.serialize_depth(value, 0)
    }

    fn serialize_depth(&self, value: &SerializedValue, depth: u32) -> Result<SerializedValue, CoreError> {
        if depth > MAX_DEPTH {
            return Err(CoreError::CycleDetected { limit: MAX_DEPTH });
        }
        match value {
            SerializedValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.serialize_depth(item, depth + 1)?);
                }
                Ok(wrap("Array", SerializedValue::Array(out)))
            }
            SerializedValue::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.serialize_depth(v, depth + 1)?);
                }
                Ok(wrap("Object", SerializedValue::Object(out)))
            }
            primitive => Ok(primitive.clone()),
        }
    }

    pub fn deserialize_value(&self, value: &SerializedValue) -> Result<SerializedValue, CoreError> {
        self.deserialize_depth(value, 0)
    }

    fn deserialize_depth(&self, value: &SerializedValue, depth: u32) -> Result<SerializedValue, CoreError> {
        if depth > MAX_DEPTH {
            return Err(CoreError::CycleDetected { limit: MAX_DEPTH });
        }
        match unwrap_typed(value) {
            Some(("Array", data)) => {
                let items = data.as_array().ok_or_else(|| CoreError::DeserializationFailed {
                    type_name: "Array".to_owned(),
                    details: "__data was not a JSON array".to_owned(),
                })?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.deserialize_depth(item, depth + 1)?);
                }
                Ok(SerializedValue::Array(out))
            }
            Some(("Object", data)) => {
                let map = data.as_object().ok_or_else(|| CoreError::DeserializationFailed {
                    type_name: "Object".to_owned(),
                    details: "__data was not a JSON object".to_owned(),
                })?;
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.deserialize_depth(v, depth + 1)?);
                }
                Ok(SerializedValue::Object(out))
            }
            Some((other, _)) if !self.registry.is_registered(other) => {
                Err(CoreError::UnknownType { name: other.to_owned() })
            }
            Some(_) => Ok(value.clone()),
            None => Ok(value.clone()),
        }
    }
}
