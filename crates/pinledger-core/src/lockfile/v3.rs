//! Generation 3 (`"version": 3`).
//!
//! Same pin shape as generation 2, plus a top-level `"originHash"` computed
//! by the host toolchain from the package manifests. The hash is opaque here:
//! it is read, exposed and written back verbatim, never recomputed. It also
//! keeps its slot among the top-level keys; every other key is sorted.

use std::fmt;

use pinledger_schema::{PackageId, Pin, PinState};
use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_json::Value;

use super::format::OrderedDocument;
use super::v2::{PinList, PinsLayout};
use super::{Generation, PinChange, PinError, PinStore};

const ORIGIN_HASH: &str = "originHash";

/// Top-level keys of a JSON object, in document order.
struct TopLevelKeys(Vec<String>);

impl<'de> Deserialize<'de> for TopLevelKeys {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeysVisitor;

        impl<'de> Visitor<'de> for KeysVisitor {
            type Value = TopLevelKeys;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<TopLevelKeys, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut keys = Vec::new();
                while let Some(key) = map.next_key::<String>()? {
                    map.next_value::<IgnoredAny>()?;
                    keys.push(key);
                }
                Ok(TopLevelKeys(keys))
            }
        }

        deserializer.deserialize_map(KeysVisitor)
    }
}

/// Index of `"originHash"` among the top-level keys of `text`.
pub(crate) fn origin_hash_slot(text: &str) -> Option<usize> {
    let TopLevelKeys(keys) = serde_json::from_str(text).ok()?;
    keys.iter().position(|k| k == ORIGIN_HASH)
}

/// Content of a generation-3 lock file.
#[derive(Debug, Clone)]
pub struct ContentV3 {
    origin_hash: Option<Value>,
    /// Position of `"originHash"` among the top-level keys on save.
    origin_hash_slot: usize,
    pins: PinList,
}

impl ContentV3 {
    /// Parse `document`, writing `"originHash"` back in its sorted slot.
    pub(crate) fn from_document(mut document: Value) -> Result<Self, serde_json::Error> {
        let origin_hash = document
            .as_object_mut()
            .and_then(|map| map.remove(ORIGIN_HASH));
        Ok(Self {
            origin_hash,
            origin_hash_slot: 0,
            pins: PinList::from_document(document)?,
        })
    }

    /// Parse `text`, remembering where `"originHash"` sits.
    pub(crate) fn from_text(document: Value, text: &str) -> Result<Self, serde_json::Error> {
        let mut content = Self::from_document(document)?;
        if let Some(slot) = origin_hash_slot(text) {
            content.origin_hash_slot = slot;
        }
        Ok(content)
    }

    pub(crate) fn to_document(&self) -> Result<OrderedDocument, serde_json::Error> {
        let map = self.pins.to_document(Generation::V3)?;
        let mut entries: Vec<(String, Value)> = map.into_iter().collect();
        if let Some(hash) = &self.origin_hash {
            let slot = self.origin_hash_slot.min(entries.len());
            entries.insert(slot, (ORIGIN_HASH.to_string(), hash.clone()));
        }
        Ok(OrderedDocument(entries))
    }

    /// The `"originHash"` as found in the file, if it is a string.
    pub fn origin_hash(&self) -> Option<&str> {
        self.origin_hash.as_ref().and_then(Value::as_str)
    }

    /// Where the pin list was found, and will be written back.
    pub fn layout(&self) -> PinsLayout {
        self.pins.layout()
    }
}

impl PinStore for ContentV3 {
    fn has_pin(&self, id: &PackageId) -> bool {
        self.pins.has_pin(id)
    }

    fn read_pin(&self, id: &PackageId) -> Result<Pin, PinError> {
        self.pins.read_pin(id)
    }

    fn update_pin(&mut self, id: &PackageId, state: PinState) -> Result<PinChange, PinError> {
        self.pins.update_pin(id, state)
    }

    fn add_pin(&mut self, id: &PackageId, location: &str, state: PinState) -> Result<usize, PinError> {
        self.pins.add_pin(id, location, state)
    }

    fn read_all_identities(&self) -> Vec<PackageId> {
        self.pins.read_all_identities()
    }
}
