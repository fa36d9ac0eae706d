//! MCP server over stdio.
//!
//! Speaks newline-delimited JSON-RPC 2.0 on stdin/stdout. Tool failures are
//! reported in-band with `isError: true` so one bad call never brings the
//! server down; responses are written to stdout and logs go to stderr.

pub mod jsonrpc;

use std::path::Path;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::cli::files::format_size;
use crate::error::DropbookError;
use crate::mcp::jsonrpc::{JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR};
use crate::service::DropboxService;

const PROTOCOL_VERSION: &str = "2024-11-05";

pub struct McpServer {
    service: DropboxService,
}

impl McpServer {
    pub fn new(service: DropboxService) -> Self {
        Self { service }
    }

    /// Read requests line by line until stdin closes.
    pub async fn serve(&self) -> Result<(), DropbookError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(line) {
                Ok(req) => req,
                Err(e) => {
                    let resp = JsonRpcResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("parse error: {e}"),
                    );
                    write_response(&mut stdout, &resp).await?;
                    continue;
                }
            };

            debug!(method = %request.method, "handling request");
            let id = match request.id.clone() {
                Some(id) => id,
                // Notifications get no response.
                None => continue,
            };

            let response = self.handle(&request, id).await;
            write_response(&mut stdout, &response).await?;
        }
        Ok(())
    }

    async fn handle(&self, request: &JsonRpcRequest, id: Value) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => {
                let protocol = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or(PROTOCOL_VERSION);
                JsonRpcResponse::success(
                    id,
                    json!({
                        "protocolVersion": protocol,
                        "capabilities": { "tools": {} },
                        "serverInfo": {
                            "name": "dropbook",
                            "version": env!("CARGO_PKG_VERSION"),
                        },
                    }),
                )
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tool_call(request.params.as_ref(), id).await,
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ),
        }
    }

    async fn handle_tool_call(&self, params: Option<&Value>, id: Value) -> JsonRpcResponse {
        let Some(name) = params
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
        else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "missing tool name".into());
        };
        let args = params
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let outcome = match name {
            "list_directory" => self.tool_list(&args).await,
            "search" => self.tool_search(&args).await,
            "upload" => self.tool_upload(&args).await,
            "download" => self.tool_download(&args).await,
            "read_file" => self.tool_read_file(&args).await,
            "delete" => self.tool_delete(&args).await,
            "get_account_info" => self.tool_account(&args).await,
            other => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("unknown tool: {other}"),
                );
            }
        };

        match outcome {
            Ok(text) => JsonRpcResponse::success(id, tool_result(text, false)),
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                JsonRpcResponse::success(id, tool_result(format!("Error: {e}"), true))
            }
        }
    }

    async fn tool_list(&self, args: &Value) -> Result<String, DropbookError> {
        let path = opt_str_arg(args, "path").unwrap_or_default();
        let items = self.service.list_files(&path).await?;
        if items.is_empty() {
            return Ok(format!("The folder '{}' is empty.", display_path(&path)));
        }
        let mut out = format!("Contents of '{}':\n", display_path(&path));
        for item in &items {
            match item.size {
                Some(size) => {
                    out.push_str(&format!("  {} ({})\n", item.name, format_size(size)))
                }
                None => out.push_str(&format!("  {}/\n", item.name)),
            }
        }
        Ok(out)
    }

    async fn tool_search(&self, args: &Value) -> Result<String, DropbookError> {
        let query = str_arg(args, "query")?;
        let path = opt_str_arg(args, "path").unwrap_or_default();
        let results = self.service.search(&query, &path).await?;
        if results.is_empty() {
            return Ok(format!("No results found for '{query}'."));
        }
        let mut out = format!("Found {} result(s) for '{query}':\n", results.len());
        for result in &results {
            out.push_str(&format!("  {}\n", result.metadata.path));
        }
        Ok(out)
    }

    async fn tool_upload(&self, args: &Value) -> Result<String, DropbookError> {
        let local = str_arg(args, "localPath")?;
        let remote = str_arg(args, "remotePath")?;
        let overwrite = args
            .get("overwrite")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let item = self
            .service
            .upload_file(Path::new(&local), &remote, overwrite)
            .await?;
        Ok(format!("Uploaded '{local}' to '{}'.", item.path))
    }

    async fn tool_download(&self, args: &Value) -> Result<String, DropbookError> {
        let remote = str_arg(args, "remotePath")?;
        let local = str_arg(args, "localPath")?;
        self.service
            .download_file(&remote, Path::new(&local))
            .await?;
        Ok(format!("Downloaded '{remote}' to '{local}'."))
    }

    async fn tool_read_file(&self, args: &Value) -> Result<String, DropbookError> {
        let path = str_arg(args, "path")?;
        let data = self.service.download_data(&path).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    async fn tool_delete(&self, args: &Value) -> Result<String, DropbookError> {
        let path = str_arg(args, "path")?;
        self.service.delete(&path).await?;
        Ok(format!("Deleted '{path}'."))
    }

    async fn tool_account(&self, _args: &Value) -> Result<String, DropbookError> {
        let account = self.service.account_info().await?;
        Ok(format!("{} <{}>", account.name, account.email))
    }
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &JsonRpcResponse,
) -> Result<(), DropbookError> {
    let mut line = serde_json::to_string(response)
        .map_err(|e| DropbookError::Api {
            status: 0,
            message: format!("response serialization failed: {e}"),
        })?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

fn str_arg(args: &Value, name: &str) -> Result<String, DropbookError> {
    opt_str_arg(args, name).ok_or_else(|| DropbookError::MissingArgument(name.to_string()))
}

fn opt_str_arg(args: &Value, name: &str) -> Option<String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "list_directory",
            "description": "List files and folders in a Dropbox directory",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Dropbox path to list; empty or omitted for the root"
                    }
                }
            }
        }),
        json!({
            "name": "search",
            "description": "Search Dropbox for files matching a query",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" },
                    "path": {
                        "type": "string",
                        "description": "Restrict the search to this folder"
                    }
                },
                "required": ["query"]
            }
        }),
        json!({
            "name": "upload",
            "description": "Upload a local file to Dropbox",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "localPath": { "type": "string", "description": "Local file to upload" },
                    "remotePath": { "type": "string", "description": "Destination Dropbox path" },
                    "overwrite": {
                        "type": "boolean",
                        "description": "Replace an existing file instead of failing"
                    }
                },
                "required": ["localPath", "remotePath"]
            }
        }),
        json!({
            "name": "download",
            "description": "Download a Dropbox file to a local path",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "remotePath": { "type": "string", "description": "Dropbox file to download" },
                    "localPath": { "type": "string", "description": "Local destination path" }
                },
                "required": ["remotePath", "localPath"]
            }
        }),
        json!({
            "name": "read_file",
            "description": "Read the contents of a Dropbox file as text",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Dropbox file to read" }
                },
                "required": ["path"]
            }
        }),
        json!({
            "name": "delete",
            "description": "Delete a file or folder from Dropbox",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Dropbox path to delete" }
                },
                "required": ["path"]
            }
        }),
        json!({
            "name": "get_account_info",
            "description": "Show the name and email of the linked Dropbox account",
            "inputSchema": { "type": "object", "properties": {} }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DropbookConfig;

    fn server() -> McpServer {
        let config = DropbookConfig {
            app_key: "key".into(),
            app_secret: "sec".into(),
            access_token: Some("tok".into()),
            refresh_token: None,
            expiration_timestamp: None,
            uid: None,
        };
        McpServer::new(DropboxService::new(config))
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .unwrap()
    }

    #[test]
    fn tool_definitions_cover_all_operations() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            [
                "list_directory",
                "search",
                "upload",
                "download",
                "read_file",
                "delete",
                "get_account_info"
            ]
        );
        for tool in &tools {
            assert_eq!(tool["inputSchema"]["type"], "object");
            assert!(tool["description"].is_string());
        }
    }

    #[tokio::test]
    async fn initialize_echoes_client_protocol_version() {
        let req = request("initialize", Some(json!({ "protocolVersion": "2025-03-26" })));
        let resp = server().handle(&req, json!(1)).await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "dropbook");
    }

    #[tokio::test]
    async fn initialize_defaults_protocol_version() {
        let req = request("initialize", None);
        let resp = server().handle(&req, json!(1)).await;
        assert_eq!(resp.result.unwrap()["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let req = request("resources/list", None);
        let resp = server().handle(&req, json!(1)).await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let req = request(
            "tools/call",
            Some(json!({ "name": "teleport", "arguments": {} })),
        );
        let resp = server().handle(&req, json!(1)).await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn tool_call_without_name_is_invalid_params() {
        let req = request("tools/call", Some(json!({ "arguments": {} })));
        let resp = server().handle(&req, json!(1)).await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let req = request("ping", None);
        let resp = server().handle(&req, json!(1)).await;
        assert_eq!(resp.result.unwrap(), json!({}));
    }

    #[test]
    fn missing_string_argument_is_reported_by_name() {
        let err = str_arg(&json!({}), "remotePath").unwrap_err();
        assert!(err.to_string().contains("remotePath"));
    }
}
