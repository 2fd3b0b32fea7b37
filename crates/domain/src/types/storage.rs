//! Matter folder records and filed documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_status_conversions;

/// A canonical subfolder name and its provider folder id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub name: String,
    pub folder_id: String,
}

/// Ordered map of canonical subfolder name → provider folder id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderStructure(Vec<FolderEntry>);

impl FolderStructure {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|entry| entry.name == name).map(|entry| entry.folder_id.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Append an entry; an existing name keeps its original id
    pub fn insert(&mut self, name: impl Into<String>, folder_id: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.0.push(FolderEntry { name, folder_id: folder_id.into() });
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FolderEntry> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for FolderStructure {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut structure = Self::new();
        for (name, id) in iter {
            structure.insert(name, id);
        }
        structure
    }
}

/// Provisioned folder hierarchy for one matter.
///
/// At most one record per matter; later provisioning only appends entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatterFolderRecord {
    pub matter_id: Uuid,
    pub practice_id: Uuid,
    pub root_folder_id: String,
    pub root_folder_link: Option<String>,
    pub folder_structure: FolderStructure,
    pub structure_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File or folder as returned by the storage provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Superseded,
}

impl_status_conversions!(DocumentStatus {
    Uploaded => "uploaded",
    Superseded => "superseded",
});

/// A filed document version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub matter_id: Uuid,
    pub task_id: Option<Uuid>,
    pub title: String,
    pub provider_file_id: String,
    pub web_link: Option<String>,
    /// Canonical subfolder name, or empty for the matter root
    pub folder_path: String,
    pub version: u32,
    pub status: DocumentStatus,
    pub size_bytes: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Bytes to file under a matter
#[derive(Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub matter_id: Uuid,
    pub task_id: Option<Uuid>,
    pub title: String,
    /// Logical classification, resolved against the matter's subfolders
    pub classification: Option<String>,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("matter_id", &self.matter_id)
            .field("task_id", &self.task_id)
            .field("title", &self.title)
            .field("classification", &self.classification)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_structure_keeps_order_and_first_id() {
        let mut structure = FolderStructure::new();
        structure.insert("Pleadings", "f1");
        structure.insert("Billing", "f2");
        structure.insert("Pleadings", "f3");

        assert_eq!(structure.len(), 2);
        assert_eq!(structure.get("Pleadings"), Some("f1"));
        assert_eq!(structure.names().collect::<Vec<_>>(), vec!["Pleadings", "Billing"]);
    }

    #[test]
    fn folder_structure_serializes_as_list() {
        let structure: FolderStructure =
            vec![("Research".to_string(), "r1".to_string())].into_iter().collect();
        let json = serde_json::to_value(&structure).unwrap();
        assert_eq!(json, serde_json::json!([{ "name": "Research", "folder_id": "r1" }]));
    }
}
