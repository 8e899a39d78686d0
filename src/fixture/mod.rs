//! JSON fixture templates
//!
//! A fixture is a JSON request body on disk, parameterized with
//! `${property}` placeholders that are substituted from the property bag at
//! request time. Placeholder keys are lower snake case so they never collide
//! with the `${UPPER_CASE}` environment syntax the config loader expands.

use crate::config::PropertyBag;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixture errors
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read fixture '{name}': {source}")]
    IoError {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Fixture '{name}' references unset property '{property}'")]
    UnresolvedPlaceholder { name: String, property: String },

    #[error("Fixture '{name}' is not valid JSON after substitution: {source}")]
    InvalidJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Directory of JSON fixture templates.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    /// Create a store rooted at the given directory
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of a named fixture (`<dir>/<name>.json`)
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Read a fixture, substitute placeholders from the bag, parse as JSON.
    ///
    /// A placeholder with no matching property fails the render; a fixture
    /// with a hole in it is never a valid request body.
    pub fn render(&self, name: &str, properties: &PropertyBag) -> Result<Value, FixtureError> {
        let template =
            std::fs::read_to_string(self.path(name)).map_err(|source| FixtureError::IoError {
                name: name.to_string(),
                source,
            })?;

        let substituted = Self::substitute(name, &template, properties)?;

        serde_json::from_str(&substituted).map_err(|source| FixtureError::InvalidJson {
            name: name.to_string(),
            source,
        })
    }

    fn substitute(
        name: &str,
        template: &str,
        properties: &PropertyBag,
    ) -> Result<String, FixtureError> {
        let re = regex_lite::Regex::new(r"\$\{([a-z][a-z0-9_]*)\}").unwrap();
        let mut last_match = 0;
        let mut result = String::with_capacity(template.len());

        for cap in re.captures_iter(template) {
            let full_match = cap.get(0).unwrap();
            let key = cap.get(1).unwrap().as_str();

            result.push_str(&template[last_match..full_match.start()]);

            let value = properties.get(key).ok_or_else(|| {
                FixtureError::UnresolvedPlaceholder {
                    name: name.to_string(),
                    property: key.to_string(),
                }
            })?;
            result.push_str(&value);

            last_match = full_match.end();
        }

        result.push_str(&template[last_match..]);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_with_fixture(name: &str, content: &str) -> (tempfile::TempDir, FixtureStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join(format!("{name}.json"))).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let store = FixtureStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_render_substitutes_properties() {
        let (_dir, store) =
            store_with_fixture("esb_createFolder_mandatory", r#"{"path": "${folder_name_1}"}"#);
        let bag = PropertyBag::new();
        bag.set("folder_name_1", "/ConnectorFolderOne");

        let body = store.render("esb_createFolder_mandatory", &bag).unwrap();
        assert_eq!(body["path"], "/ConnectorFolderOne");
    }

    #[test]
    fn test_render_fails_on_unset_property() {
        let (_dir, store) = store_with_fixture("esb_copy_optional", r#"{"to": "${optional_path}"}"#);
        let bag = PropertyBag::new();

        let err = store.render("esb_copy_optional", &bag).unwrap_err();
        assert!(matches!(
            err,
            FixtureError::UnresolvedPlaceholder { ref property, .. } if property == "optional_path"
        ));
    }

    #[test]
    fn test_render_fails_on_invalid_json() {
        let (_dir, store) = store_with_fixture("broken", r#"{"path": ${folder_name_1}"#);
        let bag = PropertyBag::new();
        bag.set("folder_name_1", "not-quoted");

        assert!(matches!(
            store.render("broken", &bag),
            Err(FixtureError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_render_missing_fixture_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FixtureStore::new(dir.path());
        assert!(matches!(
            store.render("nope", &PropertyBag::new()),
            Err(FixtureError::IoError { .. })
        ));
    }
}
