//! Serde support: the map serializes as a map in insertion order and
//! deserializes by replaying `put` in source order, so a round trip
//! preserves both associations and ordering.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::map::RecordMap;

impl<K, V, S> Serialize for RecordMap<K, V, S>
where
    K: Serialize + Eq + Hash,
    V: Serialize,
    S: BuildHasher + Clone + Default,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.len()))?;
        for entry in self.iter() {
            state.serialize_entry(entry.key(), entry.value())?;
        }
        state.end()
    }
}

struct RecordMapVisitor<K, V, S> {
    _marker: PhantomData<(K, V, S)>,
}

impl<'de, K, V, S> Visitor<'de> for RecordMapVisitor<K, V, S>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
    S: BuildHasher + Clone + Default,
{
    type Value = RecordMap<K, V, S>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = RecordMap::with_hasher(S::default());
        while let Some((key, value)) = access.next_entry::<K, V>()? {
            map.put(key, value);
        }
        Ok(map)
    }
}

impl<'de, K, V, S> Deserialize<'de> for RecordMap<K, V, S>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
    S: BuildHasher + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RecordMapVisitor {
            _marker: PhantomData,
        })
    }
}
