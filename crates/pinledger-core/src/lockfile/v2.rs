//! Generation 2 (`"version": 2`).
//!
//! Pins are keyed by the identity derived from their location:
//!
//! ```json
//! {
//!   "identity" : "dd-sdk-ios",
//!   "kind" : "remoteSourceControl",
//!   "location" : "https://github.com/DataDog/dd-sdk-ios",
//!   "state" : {
//!     "branch" : "dogfooding",
//!     "revision" : "6f662103771eb4523164e64f7f936bf9276f6bd0"
//!   }
//! }
//! ```
//!
//! Unset state fields are omitted rather than written as `null`, and a pin
//! tracks either a branch or a version, never both. The pin list is found
//! either under `"object"` or at the top level; the layout read is the
//! layout written.

use pinledger_schema::{PackageId, Pin, PinState};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Generation, PinChange, PinError, PinStore, insertion_index};

const REMOTE_SOURCE_CONTROL: &str = "remoteSourceControl";

/// State object of a generation-2/3 pin. `None` fields are left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateV2 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl StateV2 {
    fn to_state(&self) -> PinState {
        PinState {
            branch: self.branch.clone(),
            revision: self.revision.clone(),
            version: self.version.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PinV2 {
    identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    location: String,
    state: StateV2,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl PinV2 {
    fn id(&self) -> PackageId {
        PackageId::from_identity(self.identity.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectV2 {
    pins: Vec<PinV2>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Where the pin list sits in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinsLayout {
    /// `{"object": {"pins": [...]}}`
    Wrapped,
    /// `{"pins": [...]}`
    TopLevel,
}

/// Location-keyed pin list shared by generations 2 and 3.
#[derive(Debug, Clone)]
pub(crate) struct PinList {
    layout: PinsLayout,
    pins: Vec<PinV2>,
    /// Unknown keys next to `"pins"` inside `"object"`.
    object_extra: Map<String, Value>,
    /// Unknown top-level keys.
    extra: Map<String, Value>,
}

impl PinList {
    /// Split `document` into the pin list and the remaining top-level keys.
    ///
    /// `"version"` is dropped; callers strip generation-specific keys such
    /// as `"originHash"` beforehand.
    pub(crate) fn from_document(document: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(mut map) = document else {
            return Err(serde_json::Error::custom("expected a JSON object"));
        };
        map.remove("version");

        let (layout, pins, object_extra) = if let Some(object) = map.remove("object") {
            let object: ObjectV2 = serde_json::from_value(object)?;
            (PinsLayout::Wrapped, object.pins, object.extra)
        } else if let Some(pins) = map.remove("pins") {
            (PinsLayout::TopLevel, serde_json::from_value(pins)?, Map::new())
        } else {
            return Err(serde_json::Error::missing_field("pins"));
        };

        Ok(Self {
            layout,
            pins,
            object_extra,
            extra: map,
        })
    }

    /// Rebuild the document, tagged with `generation`.
    pub(crate) fn to_document(&self, generation: Generation) -> Result<Map<String, Value>, serde_json::Error> {
        let mut map = self.extra.clone();
        let pins = serde_json::to_value(&self.pins)?;
        match self.layout {
            PinsLayout::Wrapped => {
                let mut object = self.object_extra.clone();
                object.insert("pins".to_string(), pins);
                map.insert("object".to_string(), Value::Object(object));
            }
            PinsLayout::TopLevel => {
                map.insert("pins".to_string(), pins);
            }
        }
        map.insert("version".to_string(), Value::from(generation.number()));
        Ok(map)
    }

    pub(crate) fn layout(&self) -> PinsLayout {
        self.layout
    }

    fn find(&self, id: &PackageId) -> Option<usize> {
        self.pins.iter().position(|p| id.matches_location(&p.identity))
    }

    fn not_found(id: &PackageId) -> PinError {
        PinError::NotFound {
            identity: id.location_identity().to_string(),
        }
    }

    fn check_state(id: &PackageId, state: &PinState) -> Result<(), PinError> {
        if state.is_conflicting() {
            return Err(PinError::ConflictingState {
                identity: id.location_identity().to_string(),
            });
        }
        Ok(())
    }
}

impl PinStore for PinList {
    fn has_pin(&self, id: &PackageId) -> bool {
        self.find(id).is_some()
    }

    fn read_pin(&self, id: &PackageId) -> Result<Pin, PinError> {
        let pin = self
            .find(id)
            .map(|i| &self.pins[i])
            .ok_or_else(|| Self::not_found(id))?;
        Ok(Pin {
            identity: pin.id(),
            location: pin.location.clone(),
            state: pin.state.to_state(),
        })
    }

    fn update_pin(&mut self, id: &PackageId, state: PinState) -> Result<PinChange, PinError> {
        let index = self.find(id).ok_or_else(|| Self::not_found(id))?;
        let state = state.normalized();
        Self::check_state(id, &state)?;

        let pin_state = &mut self.pins[index].state;
        let old = pin_state.to_state();

        // Absent fields delete the key instead of writing null.
        pin_state.branch = state.branch;
        pin_state.revision = state.revision;
        pin_state.version = state.version;

        Ok(PinChange {
            old,
            new: pin_state.to_state(),
        })
    }

    fn add_pin(&mut self, id: &PackageId, location: &str, state: PinState) -> Result<usize, PinError> {
        let identity = id.location_identity();
        if self.has_pin(id) {
            return Err(PinError::AlreadyPinned {
                identity: identity.to_string(),
            });
        }
        let state = state.normalized();
        Self::check_state(id, &state)?;

        let index = insertion_index(self.pins.iter().map(|p| p.identity.as_str()), identity);
        let pin = PinV2 {
            identity: identity.to_string(),
            kind: Some(REMOTE_SOURCE_CONTROL.to_string()),
            location: location.to_string(),
            state: StateV2 {
                branch: state.branch,
                revision: state.revision,
                version: state.version,
                extra: Map::new(),
            },
            extra: Map::new(),
        };
        self.pins.insert(index, pin);
        Ok(index)
    }

    fn read_all_identities(&self) -> Vec<PackageId> {
        self.pins.iter().map(PinV2::id).collect()
    }
}

/// Content of a generation-2 lock file.
#[derive(Debug, Clone)]
pub struct ContentV2 {
    pins: PinList,
}

impl ContentV2 {
    pub(crate) fn from_document(document: Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            pins: PinList::from_document(document)?,
        })
    }

    pub(crate) fn to_document(&self) -> Result<Value, serde_json::Error> {
        Ok(Value::Object(self.pins.to_document(Generation::V2)?))
    }

    /// Where the pin list was found, and will be written back.
    pub fn layout(&self) -> PinsLayout {
        self.pins.layout()
    }
}

impl PinStore for ContentV2 {
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
