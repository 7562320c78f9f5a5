//! Response parsing
//!
//! Maps the provider's metadata objects onto [`File`] and [`Folder`]. Nested
//! `contents` arrays are walked recursively, branching on `isfolder`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::file::{File, FileParams};
use crate::folder::{Entry, Folder, FolderParams};
use crate::time::TimeNormalizer;

/// Metadata object as sent by the provider
#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    isfolder: Option<bool>,
    fileid: Option<u64>,
    folderid: Option<u64>,
    path: Option<String>,
    name: Option<String>,
    contenttype: Option<String>,
    category: Option<u64>,
    size: Option<u64>,
    parentfolderid: Option<u64>,
    isdeleted: Option<bool>,
    created: Option<Value>,
    modified: Option<Value>,
    contents: Option<Vec<RawMetadata>>,
}

/// Builds entities from JSON responses
#[derive(Debug, Clone, Default)]
pub struct EntityParser {
    normalizer: TimeNormalizer,
}

impl EntityParser {
    pub fn new(normalizer: TimeNormalizer) -> Self {
        Self { normalizer }
    }

    /// Parse `{"metadata": {...}}` as a file
    pub fn parse_file(&self, response: &Value) -> Result<File> {
        self.file_from_raw(RawMetadata::deserialize(metadata(response)?)?)
    }

    /// Parse `{"metadata": {...}}` as a folder, including its contents
    pub fn parse_folder(&self, response: &Value) -> Result<Folder> {
        self.folder_from_raw(RawMetadata::deserialize(metadata(response)?)?)
    }

    /// Parse `{"metadata": [{...}, ...]}` as a list of files, in order
    pub fn parse_files(&self, response: &Value) -> Result<Vec<File>> {
        let items = Vec::<RawMetadata>::deserialize(metadata(response)?)?;
        items
            .into_iter()
            .map(|raw| self.file_from_raw(raw))
            .collect()
    }

    /// Parse a nested `contents` array
    ///
    /// Absent or `null` contents stay `None`, which is not the same as an
    /// empty list: it tells the folder its contents were never sent.
    pub fn parse_contents(&self, contents: Option<&Value>) -> Result<Option<Vec<Entry>>> {
        match contents {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let items = Vec::<RawMetadata>::deserialize(value)?;
                self.entries_from_raw(items).map(Some)
            }
        }
    }

    /// Parse one contents item into a file or a folder
    pub fn parse_entry(&self, item: &Value) -> Result<Entry> {
        self.entry_from_raw(RawMetadata::deserialize(item)?)
    }

    fn entries_from_raw(&self, items: Vec<RawMetadata>) -> Result<Vec<Entry>> {
        items
            .into_iter()
            .map(|raw| self.entry_from_raw(raw))
            .collect()
    }

    fn entry_from_raw(&self, raw: RawMetadata) -> Result<Entry> {
        if raw.isfolder.unwrap_or(false) {
            self.folder_from_raw(raw).map(Entry::Folder)
        } else {
            self.file_from_raw(raw).map(Entry::File)
        }
    }

    fn file_from_raw(&self, raw: RawMetadata) -> Result<File> {
        File::new(FileParams {
            id: raw.fileid,
            path: raw.path,
            name: raw.name,
            content_type: raw.contenttype,
            category_id: raw.category,
            size: raw.size,
            parent_folder_id: raw.parentfolderid,
            is_deleted: raw.isdeleted,
            created_at: self.timestamp(raw.created.as_ref())?,
            modified_at: self.timestamp(raw.modified.as_ref())?,
        })
    }

    /// Absent timestamps stay absent so the entity reports them as missing
    fn timestamp(&self, value: Option<&Value>) -> Result<Option<jiff::Zoned>> {
        value
            .map(|v| self.normalizer.normalize_value(v))
            .transpose()
    }

    fn folder_from_raw(&self, raw: RawMetadata) -> Result<Folder> {
        let contents = raw
            .contents
            .map(|items| self.entries_from_raw(items))
            .transpose()?;

        Folder::new(FolderParams {
            id: raw.folderid,
            path: raw.path,
            name: raw.name,
            parent_folder_id: raw.parentfolderid,
            is_deleted: raw.isdeleted,
            created_at: self.timestamp(raw.created.as_ref())?,
            modified_at: self.timestamp(raw.modified.as_ref())?,
            contents,
        })
    }
}

fn metadata(response: &Value) -> Result<&Value> {
    response
        .get("metadata")
        .ok_or_else(|| Error::InvalidResponse("response has no metadata".to_string()))
}
