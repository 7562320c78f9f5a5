//! Caller-supplied operation parameters
//!
//! All of these are validated before any request is sent. They can be built
//! in code or decoded from JSON, in which case unknown keys are rejected.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Decode parameters from a JSON object, rejecting unsupported keys
pub fn from_json<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Validation(e.to_string()))
}

/// Rename and/or move a file or folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_folder_id: Option<u64>,
    /// Destination folder path; must start and end with `/`
    #[serde(default)]
    pub path: Option<String>,
}

impl UpdateParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: Value) -> Result<Self> {
        from_json(value)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn parent_folder_id(mut self, id: u64) -> Self {
        self.parent_folder_id = Some(id);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.path
            && !is_folder_path(path)
        {
            return Err(Error::Validation(
                "path param must start and end with `/`".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_folder_path(path: &str) -> bool {
    path.starts_with('/') && path.ends_with('/')
}

/// Look up a file or folder by id or by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lookup {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub path: Option<String>,
}

impl Lookup {
    pub fn id(id: u64) -> Self {
        Self {
            id: Some(id),
            path: None,
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            id: None,
            path: Some(path.into()),
        }
    }

    pub fn from_json(value: Value) -> Result<Self> {
        from_json(value)
    }

    /// Exactly one of `id` and `path` must be given
    pub fn validate_exclusive(&self) -> Result<()> {
        match (&self.id, &self.path) {
            (Some(_), Some(_)) => Err(Error::Validation(
                "id takes precedence over path, please only use one or the other".to_string(),
            )),
            (None, None) => Err(Error::Validation("path or id is required".to_string())),
            _ => Ok(()),
        }
    }

    /// At least one of `id` and `path` must be given
    pub fn validate_present(&self) -> Result<()> {
        if self.id.is_none() && self.path.is_none() {
            return Err(Error::Validation("path or id is required".to_string()));
        }
        Ok(())
    }
}

/// Where to find or create a folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFolderParams {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub parent_folder_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CreateFolderParams {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn in_folder(parent_folder_id: u64, name: impl Into<String>) -> Self {
        Self {
            parent_folder_id: Some(parent_folder_id),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn from_json(value: Value) -> Result<Self> {
        from_json(value)
    }
}
