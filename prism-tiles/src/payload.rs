//! Encoded tile payload: term to document count

use crate::error::{Result, TileError};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Ranked term counts for one tile.
///
/// Encodes to a JSON object whose members keep the ranking order, so the
/// same ranked input always produces the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TilePayload {
    entries: Vec<(String, u32)>,
}

impl TilePayload {
    /// Build from ranked `(term, doc_count)` pairs.
    ///
    /// Counts that do not fit in a `u32` are rejected rather than truncated.
    pub fn from_ranked(ranked: Vec<(String, u64)>) -> Result<Self> {
        let entries = ranked
            .into_iter()
            .map(|(term, count)| match u32::try_from(count) {
                Ok(count) => Ok((term, count)),
                Err(_) => Err(TileError::shape(format!(
                    "doc_count {} for term `{}` does not fit in 32 bits",
                    count, term
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, u32)] {
        &self.entries
    }

    pub fn get(&self, term: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Serialize for TilePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (term, count) in &self.entries {
            map.serialize_entry(term, count)?;
        }
        map.end()
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = TilePayload;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of term to unsigned 32-bit count")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<TilePayload, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        let mut seen = HashSet::new();
        while let Some((term, count)) = access.next_entry::<String, u32>()? {
            if !seen.insert(term.clone()) {
                return Err(de::Error::custom(format!("duplicate term `{}`", term)));
            }
            entries.push((term, count));
        }
        Ok(TilePayload { entries })
    }
}

impl<'de> Deserialize<'de> for TilePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(PayloadVisitor)
    }
}
