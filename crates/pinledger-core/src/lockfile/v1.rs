//! Generation 1 (`"version": 1`).
//!
//! Pins live under `"object"` and are keyed by package name:
//!
//! ```json
//! {
//!   "package": "DatadogSDK",
//!   "repositoryURL": "https://github.com/DataDog/dd-sdk-ios",
//!   "state": {
//!     "branch": "dogfooding",
//!     "revision": "4e93a8f1f662d9126074a0f355b4b6d20f9f30a7",
//!     "version": null
//!   }
//! }
//! ```
//!
//! All three state keys are always written; `null` marks the unset ones.

use pinledger_schema::{PackageId, Pin, PinState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{PinChange, PinError, PinStore, insertion_index};

/// State object of a generation-1 pin. `None` serializes as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateV1 {
    branch: Option<String>,
    revision: Option<String>,
    version: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl StateV1 {
    fn to_state(&self) -> PinState {
        PinState {
            branch: self.branch.clone(),
            revision: self.revision.clone(),
            version: self.version.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PinV1 {
    package: String,
    #[serde(rename = "repositoryURL")]
    repository_url: String,
    state: StateV1,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl PinV1 {
    fn id(&self) -> PackageId {
        PackageId::new(self.package.clone(), &self.repository_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectV1 {
    pins: Vec<PinV1>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentV1 {
    object: ObjectV1,
    version: u64,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Content of a generation-1 lock file.
#[derive(Debug, Clone)]
pub struct ContentV1 {
    document: DocumentV1,
}

impl ContentV1 {
    pub(crate) fn from_document(document: Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            document: serde_json::from_value(document)?,
        })
    }

    pub(crate) fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.document)
    }

    fn pins(&self) -> &[PinV1] {
        &self.document.object.pins
    }

    fn find(&self, id: &PackageId) -> Option<usize> {
        self.pins().iter().position(|p| id.matches_legacy(&p.package))
    }

    fn not_found(id: &PackageId) -> PinError {
        PinError::NotFound {
            identity: id.legacy_name().unwrap_or(id.location_identity()).to_string(),
        }
    }
}

impl PinStore for ContentV1 {
    fn has_pin(&self, id: &PackageId) -> bool {
        self.find(id).is_some()
    }

    fn read_pin(&self, id: &PackageId) -> Result<Pin, PinError> {
        let pin = self
            .find(id)
            .map(|i| &self.pins()[i])
            .ok_or_else(|| Self::not_found(id))?;
        Ok(Pin {
            identity: pin.id(),
            location: pin.repository_url.clone(),
            state: pin.state.to_state(),
        })
    }

    fn update_pin(&mut self, id: &PackageId, state: PinState) -> Result<PinChange, PinError> {
        let index = self.find(id).ok_or_else(|| Self::not_found(id))?;
        let pin_state = &mut self.document.object.pins[index].state;
        let old = pin_state.to_state();

        pin_state.branch = state.branch;
        pin_state.revision = state.revision;
        pin_state.version = state.version;

        Ok(PinChange {
            old,
            new: pin_state.to_state(),
        })
    }

    fn add_pin(&mut self, id: &PackageId, location: &str, state: PinState) -> Result<usize, PinError> {
        let Some(package) = id.legacy_name() else {
            return Err(PinError::LegacyNameRequired {
                identity: id.location_identity().to_string(),
            });
        };
        if self.has_pin(id) {
            return Err(PinError::AlreadyPinned {
                identity: package.to_string(),
            });
        }

        let index = insertion_index(self.pins().iter().map(|p| p.package.as_str()), package);
        let pin = PinV1 {
            package: package.to_string(),
            repository_url: location.to_string(),
            state: StateV1 {
                branch: state.branch,
                revision: state.revision,
                version: state.version,
                extra: Map::new(),
            },
            extra: Map::new(),
        };
        self.document.object.pins.insert(index, pin);
        Ok(index)
    }

    fn read_all_identities(&self) -> Vec<PackageId> {
        self.pins().iter().map(PinV1::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::V1_FIXTURE;
    use super::super::{LockFile, PinStore};
    use super::*;

    fn content() -> ContentV1 {
        ContentV1::from_document(serde_json::from_str(V1_FIXTURE).unwrap()).unwrap()
    }

    #[test]
    fn test_reads_pins_by_package_name() {
        let c = content();
        assert!(c.has_pin(&PackageId::from_legacy_name("A")));
        assert!(c.has_pin(&PackageId::from_legacy_name("B")));
        assert!(!c.has_pin(&PackageId::from_legacy_name("C")));

        let a = c.read_pin(&PackageId::from_legacy_name("A")).unwrap();
        assert_eq!(a.location, "https://github.com/A-org/a.git");
        assert_eq!(a.state, PinState::on_branch("a-branch", "a-revision"));
        assert_eq!(a.identity.location_identity(), "a");

        let b = c.read_pin(&PackageId::from_legacy_name("B")).unwrap();
        assert_eq!(b.state, PinState::at_version("1.0.0", "b-revision"));
    }

    #[test]
    fn test_location_only_ids_do_not_match() {
        let c = content();
        assert!(!c.has_pin(&PackageId::from_location("https://github.com/A-org/a.git")));
        assert!(c.has_pin(
            &PackageId::from_location("https://github.com/A-org/a.git").with_legacy_name("A")
        ));
    }

    #[test]
    fn test_identities_in_file_order() {
        let ids = content().read_all_identities();
        let names: Vec<_> = ids.iter().filter_map(PackageId::legacy_name).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(ids[1].location_identity(), "b");
    }

    #[test]
    fn test_update_reports_change() {
        let mut c = content();
        let change = c
            .update_pin(
                &PackageId::from_legacy_name("A"),
                PinState::on_branch("a-branch", "a-revision"),
            )
            .unwrap();
        assert!(change.is_noop());

        let change = c
            .update_pin(&PackageId::from_legacy_name("A"), PinState::at_revision("r2"))
            .unwrap();
        assert!(!change.is_noop());
        assert_eq!(change.new, PinState::at_revision("r2"));
    }

    #[test]
    fn test_insertion_between_neighbours() {
        let fixture = r#"{"object": {"pins": [
            {"package": "a", "repositoryURL": "https://x/a", "state": {"branch": null, "revision": "1", "version": "1.0.0"}},
            {"package": "b", "repositoryURL": "https://x/b", "state": {"branch": null, "revision": "2", "version": "1.0.0"}},
            {"package": "d", "repositoryURL": "https://x/d", "state": {"branch": null, "revision": "4", "version": "1.0.0"}}
        ]}, "version": 1}"#;
        let mut c = ContentV1::from_document(serde_json::from_str(fixture).unwrap()).unwrap();
        let index = c
            .add_pin(
                &PackageId::from_legacy_name("c"),
                "https://x/c",
                PinState::at_version("1.0.0", "3"),
            )
            .unwrap();
        assert_eq!(index, 2);
        let names: Vec<_> = c
            .read_all_identities()
            .iter()
            .map(|id| id.legacy_name().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_add_rejects_duplicates_and_missing_legacy_name() {
        let mut c = content();
        let err = c
            .add_pin(&PackageId::from_legacy_name("A"), "https://x/a", PinState::at_revision("r"))
            .unwrap_err();
        assert_eq!(err, PinError::AlreadyPinned { identity: "A".into() });

        let err = c
            .add_pin(
                &PackageId::from_location("https://x/z.git"),
                "https://x/z.git",
                PinState::at_revision("r"),
            )
            .unwrap_err();
        assert_eq!(err, PinError::LegacyNameRequired { identity: "z".into() });
    }

    #[test]
    fn test_changes_are_saved_with_nulls() {
        let mut file = LockFile::parse("Package.resolved", V1_FIXTURE).unwrap();
        file.update_dependency(
            &PackageId::from_legacy_name("B"),
            PinState::on_branch("b-branch-new", "b-revision-new"),
        )
        .unwrap();
        file.add_dependency(
            &PackageId::from_legacy_name("C"),
            "https://github.com/C-org/c.git",
            PinState::on_branch("c-branch", "c-revision"),
        )
        .unwrap();
        file.add_dependency(
            &PackageId::from_legacy_name("D"),
            "https://github.com/D-org/d.git",
            PinState::at_version("1.1.0", "d-revision"),
        )
        .unwrap();

        let expected = r#"{
  "object": {
    "pins": [
      {
        "package": "A",
        "repositoryURL": "https://github.com/A-org/a.git",
        "state": {
          "branch": "a-branch",
          "revision": "a-revision",
          "version": null
        }
      },
      {
        "package": "B",
        "repositoryURL": "https://github.com/B-org/b.git",
        "state": {
          "branch": "b-branch-new",
          "revision": "b-revision-new",
          "version": null
        }
      },
      {
        "package": "C",
        "repositoryURL": "https://github.com/C-org/c.git",
        "state": {
          "branch": "c-branch",
          "revision": "c-revision",
          "version": null
        }
      },
      {
        "package": "D",
        "repositoryURL": "https://github.com/D-org/d.git",
        "state": {
          "branch": null,
          "revision": "d-revision",
          "version": "1.1.0"
        }
      }
    ]
  },
  "version": 1
}
"#;
        assert_eq!(file.render().unwrap(), expected);
    }

    #[test]
    fn test_unknown_keys_survive() {
        let fixture = r#"{"object": {"pins": [
            {"package": "a", "repositoryURL": "https://x/a", "state": {"branch": null, "revision": "1", "version": "1.0.0", "extra": true}, "note": "kept"}
        ]}, "version": 1, "zz": 1}"#;
        let mut file = LockFile::parse("Package.resolved", fixture).unwrap();
        file.update_dependency(&PackageId::from_legacy_name("a"), PinState::at_revision("2"))
            .unwrap();
        let text = file.render().unwrap();
        assert!(text.contains("\"note\": \"kept\""));
        assert!(text.contains("\"extra\": true"));
        assert!(text.contains("\"zz\": 1"));
    }
}
