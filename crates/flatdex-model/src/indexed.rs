//! Indexed collections: in-memory maps keyed by a designated field of the
//! element, serialized as a JSON array sorted by that key and deserialized
//! back into the map.
//!
//! Fields use this module with `#[serde(with = "crate::indexed")]` (plus
//! `default` and `skip_serializing_if = "HashMap::is_empty"`, since
//! collections are never null on the wire).

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An entity that designates one of its fields as the collection key.
pub trait Keyed {
    fn key(&self) -> &str;
}

pub fn serialize<T, S>(map: &HashMap<String, T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize + Keyed,
    S: Serializer,
{
    let mut values: Vec<&T> = map.values().collect();
    values.sort_by(|a, b| a.key().cmp(b.key()));
    serializer.collect_seq(values)
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
where
    T: Deserialize<'de> + Keyed,
    D: Deserializer<'de>,
{
    let values = Vec::<T>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| (value.key().to_string(), value))
        .collect())
}
