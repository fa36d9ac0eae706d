use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::error::DropbookError;
use crate::oauth::token::{self, TOKEN_ENDPOINT};
use crate::types::{AccountInfo, DropboxItem, MatchType, SearchResult};

pub const API_BASE: &str = "https://api.dropboxapi.com";
pub const CONTENT_BASE: &str = "https://content.dropboxapi.com";

// Refresh this many seconds before the recorded expiry so a token never
// goes stale mid-request.
const EXPIRY_LEEWAY_SECS: f64 = 300.0;

const SEARCH_MAX_RESULTS: u32 = 100;

struct AuthState {
    access_token: String,
    expires_at: Option<f64>,
}

enum Credentials {
    /// Full token quadruple; expired access tokens are renewed through the
    /// token endpoint.
    Refreshable {
        app_key: String,
        app_secret: String,
        refresh_token: String,
    },
    /// Bare access token, no refresh capability.
    Bare,
}

/// Thin typed client over the Dropbox HTTP API. File-operation semantics
/// live on the server side; this is a pass-through that speaks the wire
/// format and keeps the bearer token fresh.
pub struct DropboxClient {
    http: reqwest::Client,
    auth: Mutex<AuthState>,
    credentials: Credentials,
    api_base: String,
    content_base: String,
    token_endpoint: String,
}

impl DropboxClient {
    pub fn with_refresh(
        app_key: String,
        app_secret: String,
        access_token: String,
        refresh_token: String,
        expires_at: f64,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth: Mutex::new(AuthState {
                access_token,
                expires_at: Some(expires_at),
            }),
            credentials: Credentials::Refreshable {
                app_key,
                app_secret,
                refresh_token,
            },
            api_base: API_BASE.to_string(),
            content_base: CONTENT_BASE.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }

    pub fn with_access_token(access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth: Mutex::new(AuthState {
                access_token,
                expires_at: None,
            }),
            credentials: Credentials::Bare,
            api_base: API_BASE.to_string(),
            content_base: CONTENT_BASE.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }

    /// Point the client at alternative endpoints (tests).
    pub fn with_endpoints(
        mut self,
        api_base: &str,
        content_base: &str,
        token_endpoint: &str,
    ) -> Self {
        self.api_base = api_base.to_string();
        self.content_base = content_base.to_string();
        self.token_endpoint = token_endpoint.to_string();
        self
    }

    /// Current bearer token, renewed first when a refreshable credential has
    /// passed its expiry leeway.
    async fn bearer(&self) -> Result<String, DropbookError> {
        let mut auth = self.auth.lock().await;
        if let Credentials::Refreshable {
            app_key,
            app_secret,
            refresh_token,
        } = &self.credentials
        {
            let stale = auth
                .expires_at
                .is_some_and(|t| Utc::now().timestamp() as f64 >= t - EXPIRY_LEEWAY_SECS);
            if stale {
                tracing::debug!("access token stale, refreshing");
                let fresh = token::refresh_access_token(
                    &self.token_endpoint,
                    app_key,
                    app_secret,
                    refresh_token,
                )
                .await?;
                auth.access_token = fresh.access_token;
                auth.expires_at = Some(fresh.expires_at);
            }
        }
        Ok(auth.access_token.clone())
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        route: &str,
        body: &Value,
    ) -> Result<T, DropbookError> {
        let bearer = self.bearer().await?;
        let resp = self
            .http
            .post(format!("{}{}", self.api_base, route))
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, DropbookError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::api_error(status.as_u16(), body));
        }
        resp.json::<T>().await.map_err(|e| DropbookError::Api {
            status: status.as_u16(),
            message: format!("unexpected response body: {e}"),
        })
    }

    fn api_error(status: u16, body: String) -> DropbookError {
        #[derive(Deserialize)]
        struct ApiErrorBody {
            error_summary: String,
        }
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error_summary)
            .unwrap_or(body);
        DropbookError::Api { status, message }
    }

    pub async fn list_folder(&self, path: &str) -> Result<Vec<DropboxItem>, DropbookError> {
        let mut route = "/2/files/list_folder".to_string();
        let mut body = json!({ "path": normalize_root(path) });
        let mut items = Vec::new();

        loop {
            let page: ListFolderResponse = self.rpc(&route, &body).await?;
            items.extend(page.entries.into_iter().filter_map(MetadataEntry::into_item));
            if !page.has_more {
                break;
            }
            route = "/2/files/list_folder/continue".to_string();
            body = json!({ "cursor": page.cursor });
        }

        Ok(items)
    }

    pub async fn search(
        &self,
        query: &str,
        path: &str,
    ) -> Result<Vec<SearchResult>, DropbookError> {
        let mut options = json!({ "max_results": SEARCH_MAX_RESULTS });
        if !path.is_empty() {
            options["path"] = json!(normalize_path(path));
        }
        let resp: SearchResponse = self
            .rpc(
                "/2/files/search_v2",
                &json!({ "query": query, "options": options }),
            )
            .await?;

        Ok(resp
            .matches
            .into_iter()
            .filter_map(SearchMatch::into_result)
            .collect())
    }

    pub async fn upload(
        &self,
        remote_path: &str,
        data: Vec<u8>,
        overwrite: bool,
    ) -> Result<DropboxItem, DropbookError> {
        let bearer = self.bearer().await?;
        let arg = json!({
            "path": normalize_path(remote_path),
            "mode": if overwrite { "overwrite" } else { "add" },
            "autorename": false,
            "mute": false,
        });
        let resp = self
            .http
            .post(format!("{}/2/files/upload", self.content_base))
            .bearer_auth(bearer)
            .header("Dropbox-API-Arg", arg.to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;
        let meta: FileMetadata = Self::decode(resp).await?;
        Ok(meta.into_item())
    }

    pub async fn download(&self, remote_path: &str) -> Result<Vec<u8>, DropbookError> {
        let bearer = self.bearer().await?;
        let arg = json!({ "path": normalize_path(remote_path) });
        let resp = self
            .http
            .post(format!("{}/2/files/download", self.content_base))
            .bearer_auth(bearer)
            .header("Dropbox-API-Arg", arg.to_string())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::api_error(status.as_u16(), body));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    pub async fn delete(&self, path: &str) -> Result<(), DropbookError> {
        let _: Value = self
            .rpc("/2/files/delete_v2", &json!({ "path": normalize_path(path) }))
            .await?;
        Ok(())
    }

    pub async fn current_account(&self) -> Result<AccountInfo, DropbookError> {
        let resp: AccountResponse = self
            .rpc("/2/users/get_current_account", &Value::Null)
            .await?;
        Ok(AccountInfo {
            name: resp.name.display_name,
            email: resp.email,
        })
    }
}

/// Root is addressed as the empty string on the wire; everything else needs
/// a leading slash.
fn normalize_root(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        normalize_path(path)
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

// --- Wire shapes ---

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<MetadataEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag")]
enum MetadataEntry {
    #[serde(rename = "file")]
    File(FileMetadata),
    #[serde(rename = "folder")]
    Folder(FolderMetadata),
    #[serde(rename = "deleted")]
    Deleted(Value),
}

impl MetadataEntry {
    fn into_item(self) -> Option<DropboxItem> {
        match self {
            MetadataEntry::File(meta) => Some(meta.into_item()),
            MetadataEntry::Folder(meta) => Some(DropboxItem::folder(
                meta.id,
                meta.name,
                meta.path_display.unwrap_or_default(),
            )),
            MetadataEntry::Deleted(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    id: String,
    name: String,
    path_display: Option<String>,
    size: Option<u64>,
    server_modified: Option<DateTime<Utc>>,
    content_hash: Option<String>,
}

impl FileMetadata {
    fn into_item(self) -> DropboxItem {
        DropboxItem::file(
            self.id,
            self.name,
            self.path_display.unwrap_or_default(),
            self.size.unwrap_or(0),
            self.server_modified,
            self.content_hash,
        )
    }
}

#[derive(Debug, Deserialize)]
struct FolderMetadata {
    id: String,
    name: String,
    path_display: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    matches: Vec<SearchMatch>,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    match_type: Option<Tagged>,
    metadata: MetadataV2,
}

impl SearchMatch {
    fn into_result(self) -> Option<SearchResult> {
        let match_type = match self.match_type.as_ref().map(|t| t.tag.as_str()) {
            Some("file_content") => MatchType::Content,
            Some("filename_and_content") => MatchType::Both,
            // Filename is the safe default for image/other match kinds.
            _ => MatchType::Filename,
        };
        let MetadataV2::Metadata { metadata } = self.metadata;
        metadata
            .into_item()
            .map(|item| SearchResult {
                match_type,
                metadata: item,
            })
    }
}

#[derive(Debug, Deserialize)]
struct Tagged {
    #[serde(rename = ".tag")]
    tag: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag")]
enum MetadataV2 {
    #[serde(rename = "metadata")]
    Metadata { metadata: MetadataEntry },
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    name: AccountName,
    email: String,
}

#[derive(Debug, Deserialize)]
struct AccountName {
    display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemType;

    #[test]
    fn normalize_root_keeps_empty_path() {
        assert_eq!(normalize_root(""), "");
        assert_eq!(normalize_root("docs"), "/docs");
        assert_eq!(normalize_root("/docs"), "/docs");
    }

    #[test]
    fn file_entry_maps_to_item() {
        let entry: MetadataEntry = serde_json::from_value(json!({
            ".tag": "file",
            "id": "id:abc",
            "name": "report.pdf",
            "path_display": "/docs/report.pdf",
            "size": 2048,
            "server_modified": "2024-03-01T12:00:00Z",
            "content_hash": "hash123"
        }))
        .unwrap();

        let item = entry.into_item().unwrap();
        assert_eq!(item.item_type, ItemType::File);
        assert_eq!(item.name, "report.pdf");
        assert_eq!(item.size, Some(2048));
        assert_eq!(item.content_hash.as_deref(), Some("hash123"));
    }

    #[test]
    fn folder_entry_maps_to_item() {
        let entry: MetadataEntry = serde_json::from_value(json!({
            ".tag": "folder",
            "id": "id:dir",
            "name": "docs",
            "path_display": "/docs"
        }))
        .unwrap();

        let item = entry.into_item().unwrap();
        assert_eq!(item.item_type, ItemType::Folder);
        assert!(item.size.is_none());
    }

    #[test]
    fn deleted_entry_is_skipped() {
        let entry: MetadataEntry = serde_json::from_value(json!({
            ".tag": "deleted",
            "name": "gone.txt",
            "path_display": "/gone.txt"
        }))
        .unwrap();
        assert!(entry.into_item().is_none());
    }

    #[test]
    fn search_match_maps_match_types() {
        let raw = json!({
            "match_type": { ".tag": "filename_and_content" },
            "metadata": {
                ".tag": "metadata",
                "metadata": {
                    ".tag": "file",
                    "id": "id:abc",
                    "name": "notes.txt",
                    "path_display": "/notes.txt",
                    "size": 10
                }
            }
        });
        let m: SearchMatch = serde_json::from_value(raw).unwrap();
        let result = m.into_result().unwrap();
        assert_eq!(result.match_type, MatchType::Both);
        assert_eq!(result.metadata.path, "/notes.txt");
    }

    #[test]
    fn search_match_without_type_defaults_to_filename() {
        let raw = json!({
            "metadata": {
                ".tag": "metadata",
                "metadata": {
                    ".tag": "folder",
                    "id": "id:dir",
                    "name": "docs",
                    "path_display": "/docs"
                }
            }
        });
        let m: SearchMatch = serde_json::from_value(raw).unwrap();
        assert_eq!(m.into_result().unwrap().match_type, MatchType::Filename);
    }

    #[tokio::test]
    async fn list_folder_follows_cursor_pagination() {
        use wiremock::matchers::{body_partial_json, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(path("/2/files/list_folder"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [
                    { ".tag": "folder", "id": "id:dir", "name": "docs", "path_display": "/docs" }
                ],
                "cursor": "cur1",
                "has_more": true
            })))
            .mount(&server)
            .await;
        Mock::given(path("/2/files/list_folder/continue"))
            .and(body_partial_json(json!({ "cursor": "cur1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [
                    { ".tag": "file", "id": "id:f", "name": "a.txt", "path_display": "/a.txt", "size": 3 }
                ],
                "cursor": "cur2",
                "has_more": false
            })))
            .mount(&server)
            .await;

        let client = DropboxClient::with_access_token("tok".into()).with_endpoints(
            &server.uri(),
            &server.uri(),
            &server.uri(),
        );
        let items = client.list_folder("").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "docs");
        assert_eq!(items[1].size, Some(3));
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_before_the_request() {
        use wiremock::matchers::{body_string_contains, header, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-tok",
                "token_type": "bearer",
                "expires_in": 14400
            })))
            .mount(&server)
            .await;
        Mock::given(path("/2/files/delete_v2"))
            .and(header("authorization", "Bearer fresh-tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "metadata": {} })))
            .mount(&server)
            .await;

        // Expiry in the past forces a refresh on first use.
        let client = DropboxClient::with_refresh(
            "key".into(),
            "secret".into(),
            "stale-tok".into(),
            "ref456".into(),
            0.0,
        )
        .with_endpoints(
            &server.uri(),
            &server.uri(),
            &format!("{}/oauth2/token", server.uri()),
        );
        client.delete("/a.txt").await.unwrap();
    }

    #[test]
    fn api_error_prefers_error_summary() {
        let err = DropboxClient::api_error(
            409,
            r#"{"error_summary":"path/not_found/..","error":{}}"#.to_string(),
        );
        match err {
            DropbookError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "path/not_found/..");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
