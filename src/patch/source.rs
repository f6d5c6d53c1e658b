//! Providers of patch definition lists.
//!
//! The engine asks its [`PatchSource`] for the complete list on every
//! initialization and reset, so a source is the natural place to pick up
//! edited patch files.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::{patch::definition::PatchDefinition, Error, Result};

/// Supplies the ordered list of patch definitions.
pub trait PatchSource: Send + Sync {
    /// Loads every definition, in authoring order.
    ///
    /// # Errors
    ///
    /// Returns an error if the definitions cannot be read or decoded.
    fn load(&self) -> Result<Vec<PatchDefinition>>;
}

impl<F> PatchSource for F
where
    F: Fn() -> Result<Vec<PatchDefinition>> + Send + Sync,
{
    fn load(&self) -> Result<Vec<PatchDefinition>> {
        self()
    }
}

/// Definitions held in memory, replaceable between reloads.
///
/// # Examples
///
/// ```rust
/// use dynpatch::patch::{MemoryPatchSource, PatchSource};
///
/// let source = MemoryPatchSource::default();
/// assert!(source.load()?.is_empty());
/// # Ok::<(), dynpatch::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryPatchSource {
    definitions: RwLock<Vec<PatchDefinition>>,
}

impl MemoryPatchSource {
    /// Creates a source holding `definitions`.
    #[must_use]
    pub fn new(definitions: Vec<PatchDefinition>) -> Self {
        Self {
            definitions: RwLock::new(definitions),
        }
    }

    /// Replaces the held definitions; takes effect on the next load.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the lock is poisoned.
    pub fn replace(&self, definitions: Vec<PatchDefinition>) -> Result<()> {
        *self.definitions.write().map_err(|_| Error::LockError)? = definitions;
        Ok(())
    }
}

impl PatchSource for MemoryPatchSource {
    fn load(&self) -> Result<Vec<PatchDefinition>> {
        Ok(self
            .definitions
            .read()
            .map_err(|_| Error::LockError)?
            .clone())
    }
}

/// Where a [`JsonPatchSource`] reads from.
#[derive(Clone, Debug)]
enum JsonOrigin {
    Text(String),
    File(PathBuf),
}

/// JSON array of definitions, from a string or re-read from a file on every load.
///
/// # Examples
///
/// ```rust
/// use dynpatch::patch::{JsonPatchSource, PatchSource};
///
/// let source = JsonPatchSource::from_text(r#"[
///     { "Id": "a", "Target": { "Type": "Game.Farmer", "Method": "doEmote" },
///       "PatchType": "Prefix", "Action": "Log hello" }
/// ]"#);
/// let patches = source.load()?;
/// assert_eq!(patches[0].id, "a");
/// # Ok::<(), dynpatch::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct JsonPatchSource {
    origin: JsonOrigin,
}

impl JsonPatchSource {
    /// Reads definitions from JSON text.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            origin: JsonOrigin::Text(text.into()),
        }
    }

    /// Reads definitions from a JSON file, re-read on every load.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            origin: JsonOrigin::File(path.as_ref().to_path_buf()),
        }
    }

    fn parse(text: &str) -> Result<Vec<PatchDefinition>> {
        let root: serde_json::Value = serde_json::from_str(text)?;
        let found = match &root {
            serde_json::Value::Array(_) => return Ok(serde_json::from_value(root)?),
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "a boolean",
            serde_json::Value::Number(_) => "a number",
            serde_json::Value::String(_) => "a string",
            serde_json::Value::Object(_) => "an object",
        };
        Err(Error::PatchSource(format!(
            "expected a JSON array of patch definitions, found {found}"
        )))
    }
}

impl PatchSource for JsonPatchSource {
    fn load(&self) -> Result<Vec<PatchDefinition>> {
        match &self.origin {
            JsonOrigin::Text(text) => Self::parse(text),
            JsonOrigin::File(path) => {
                let text = fs::read_to_string(path)?;
                Self::parse(&text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{PatchPhase, TargetDescriptor};

    #[test]
    fn test_memory_source_replace() {
        let source = MemoryPatchSource::default();
        assert!(source.load().unwrap().is_empty());

        source
            .replace(vec![PatchDefinition::new(
                "x",
                TargetDescriptor::method("T", "M"),
                PatchPhase::After,
            )
            .with_action("A")])
            .unwrap();
        assert_eq!(source.load().unwrap().len(), 1);
    }

    #[test]
    fn test_json_source_preserves_order() {
        let source = JsonPatchSource::from_text(
            r#"[
                { "Id": "first", "Target": { "Type": "T", "Method": "M" }, "Action": "A" },
                { "Id": "second", "Target": { "Type": "T" }, "Actions": ["B", "C"] }
            ]"#,
        );
        let patches = source.load().unwrap();
        let ids: Vec<_> = patches.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
        assert!(patches[1].target.is_constructor());
        assert_eq!(patches[0].phase, PatchPhase::After);
    }

    #[test]
    fn test_json_source_errors() {
        let source = JsonPatchSource::from_text("{ not json");
        assert!(matches!(source.load(), Err(Error::Json(_))));

        let single = JsonPatchSource::from_text(r#"{ "Id": "a", "Target": { "Type": "T" } }"#);
        match single.load() {
            Err(Error::PatchSource(message)) => assert!(message.contains("found an object")),
            other => panic!("unexpected result {other:?}"),
        }

        let missing = JsonPatchSource::from_path("/nonexistent/dynpatch/patches.json");
        assert!(matches!(missing.load(), Err(Error::FileError(_))));
    }

    #[test]
    fn test_closure_source() {
        let source = || -> Result<Vec<PatchDefinition>> {
            Err(Error::PatchSource("offline".to_string()))
        };
        assert!(matches!(source.load(), Err(Error::PatchSource(_))));
    }
}
