//! Hashtag query server.
//!
//! - JSON-RPC 2.0 over stdio (newline-delimited)
//! - Methods: `hashtags`, `team_hashtags`, `posts` (plus `initialize`, `methods/list`)
//! - Backed by a snapshot file named by `HASHTAGS_SNAPSHOT_PATH`

use std::{io::Write, sync::Arc};

use anyhow::Context;
use hashtag_core::{
    api::{self, ChannelHashtagsRequest, TagPostsRequest, TeamHashtagsRequest},
    config::Config,
    service::HashtagService,
    Error,
};
use hashtag_snapshot::SnapshotStore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const SERVER_ERROR: i64 = -32000;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    id: Option<serde_json::Value>,
    method: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct RpcResponse<'a> {
    jsonrpc: &'a str,
    id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<serde_json::Value>,
}

fn respond_ok(id: serde_json::Value, result: serde_json::Value) -> RpcResponse<'static> {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

fn respond_err(
    id: serde_json::Value,
    code: i64,
    message: &str,
    status: u16,
) -> RpcResponse<'static> {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(json!({ "code": code, "message": message, "data": { "status": status } })),
    }
}

fn respond_core_err(id: serde_json::Value, err: &Error) -> RpcResponse<'static> {
    let code = if err.is_client_error() {
        INVALID_PARAMS
    } else {
        SERVER_ERROR
    };
    respond_err(id, code, &err.to_string(), err.status_code())
}

fn parse_params<T>(params: Option<serde_json::Value>) -> Result<T, String>
where
    T: DeserializeOwned + Default,
{
    match params {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid params: {e}")),
    }
}

/// Run one query method and serialize its result.
fn call<Req, Resp>(
    id: serde_json::Value,
    params: Option<serde_json::Value>,
    run: impl FnOnce(&Req) -> hashtag_core::Result<Resp>,
) -> RpcResponse<'static>
where
    Req: DeserializeOwned + Default,
    Resp: Serialize,
{
    let req: Req = match parse_params(params) {
        Ok(r) => r,
        Err(msg) => return respond_err(id, INVALID_PARAMS, &msg, 400),
    };
    match run(&req).and_then(|resp| serde_json::to_value(resp).map_err(Error::from)) {
        Ok(v) => respond_ok(id, v),
        Err(e) => {
            if e.is_client_error() {
                tracing::debug!(error = %e, "rejected request");
            } else {
                tracing::error!(error = %e, "query failed");
            }
            respond_core_err(id, &e)
        }
    }
}

fn handle_rpc(svc: &HashtagService, req: RpcRequest) -> Option<RpcResponse<'static>> {
    // Notifications have no id => no response.
    let id = req.id?;

    match req.method.as_str() {
        "initialize" => Some(respond_ok(
            id,
            json!({
              "serverInfo": { "name": "hashtags", "version": env!("CARGO_PKG_VERSION") },
              "capabilities": { "methods": ["hashtags", "team_hashtags", "posts"] }
            }),
        )),

        "methods/list" => Some(respond_ok(
            id,
            json!({
              "methods": [
                {
                  "name": "hashtags",
                  "description": "Tag counts and prefix groups for one channel.",
                  "params": { "channel_id": "string (required)", "limit": "integer" }
                },
                {
                  "name": "team_hashtags",
                  "description": "Tag counts and prefix groups across a team's public channels.",
                  "params": { "team_id": "string (required)", "max": "integer, default 1000, <= 0 scans everything" }
                },
                {
                  "name": "posts",
                  "description": "Messages carrying an exact (case-sensitive) tag, newest first.",
                  "params": {
                    "tag": "string (required)",
                    "channel_id": "string",
                    "page": "integer, enables paging",
                    "page_size": "integer, default 20, max 100"
                  }
                }
              ]
            }),
        )),

        "hashtags" => Some(call(id, req.params, |r: &ChannelHashtagsRequest| {
            api::channel_hashtags(svc, r)
        })),

        "team_hashtags" => Some(call(id, req.params, |r: &TeamHashtagsRequest| {
            api::team_hashtags(svc, r)
        })),

        "posts" => Some(call(id, req.params, |r: &TagPostsRequest| api::tag_posts(svc, r))),

        _ => Some(respond_err(id, METHOD_NOT_FOUND, "Method not found", 404)),
    }
}

fn write_response(out: &mut impl Write, resp: &RpcResponse<'_>) -> anyhow::Result<()> {
    let txt = serde_json::to_string(resp)?;
    out.write_all(txt.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hashtag_core::logging::init("hashtag-rpc")?;

    let cfg = Config::load()?;
    let store = SnapshotStore::open(&cfg.snapshot_path)
        .with_context(|| format!("load snapshot {}", cfg.snapshot_path.display()))?;
    let svc = Arc::new(HashtagService::new(Arc::new(store), cfg.query));

    tracing::info!("hashtag query server running on stdio");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    let mut stdout = std::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(v) => v,
            Err(e) => {
                let msg = format!("Parse error: {e}");
                let resp = respond_err(serde_json::Value::Null, PARSE_ERROR, &msg, 400);
                write_response(&mut stdout, &resp)?;
                continue;
            }
        };

        // Queries block on the store; keep them off the reactor thread.
        let svc = svc.clone();
        let resp = tokio::task::spawn_blocking(move || handle_rpc(&svc, req))
            .await
            .context("query task panicked")?;

        if let Some(resp) = resp {
            write_response(&mut stdout, &resp)?;
        }
    }

    Ok(())
}
