use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file or folder in Dropbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropboxItem {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    File,
    Folder,
}

impl DropboxItem {
    pub fn file(
        id: String,
        name: String,
        path: String,
        size: u64,
        modified: Option<DateTime<Utc>>,
        content_hash: Option<String>,
    ) -> Self {
        Self {
            item_type: ItemType::File,
            id,
            name,
            path,
            size: Some(size),
            modified,
            content_hash,
        }
    }

    pub fn folder(id: String, name: String, path: String) -> Self {
        Self {
            item_type: ItemType::Folder,
            id,
            name,
            path,
            size: None,
            modified: None,
            content_hash: None,
        }
    }
}

/// A single match from a file search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub match_type: MatchType,
    pub metadata: DropboxItem,
}

/// Whether a search match hit the filename, the file content, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "FILENAME")]
    Filename,
    #[serde(rename = "CONTENT")]
    Content,
    #[serde(rename = "BOTH")]
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_with_camel_case_keys() {
        let item = DropboxItem::file(
            "id:abc".into(),
            "report.pdf".into(),
            "/docs/report.pdf".into(),
            2048,
            None,
            Some("hash123".into()),
        );
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["contentHash"], "hash123");
        assert_eq!(json["size"], 2048);
    }

    #[test]
    fn folder_omits_file_only_fields() {
        let item = DropboxItem::folder("id:dir".into(), "docs".into(), "/docs".into());
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("size"));
        assert!(!json.contains("contentHash"));
        assert!(!json.contains("modified"));
    }

    #[test]
    fn match_type_uses_uppercase_wire_names() {
        assert_eq!(
            serde_json::to_string(&MatchType::Filename).unwrap(),
            "\"FILENAME\""
        );
        assert_eq!(serde_json::to_string(&MatchType::Both).unwrap(), "\"BOTH\"");
    }
}
