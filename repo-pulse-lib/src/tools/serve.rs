//! Line-delimited JSON request loop.
//!
//! Each input line is one request, `{"id": ..., "tool": "...", "arguments": {...}}`.
//! Each request produces exactly one output line holding either `result` or
//! `error`, tagged with the request's `id`. Requests run concurrently, so
//! responses may arrive out of order.

use super::{ToolCall, ToolError, Toolbox};
use crate::Result;
use ohno::IntoAppError;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

const LOG_TARGET: &str = "     serve";

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,

    tool: String,

    #[serde(default)]
    arguments: Value,
}

/// Answer requests from `reader` until it reaches end of input.
pub async fn serve<R, W>(toolbox: &Toolbox, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let read_requests = async move {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.into_app_err("reading a request")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request = match serde_json::from_str::<Request>(line) {
                Ok(request) => request,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Rejecting malformed request: {e}");
                    let error = ToolError::invalid_argument(format!("malformed request: {e}"));
                    let _ = tx.send(response(&Value::Null, Err(error)).to_string());
                    continue;
                }
            };

            let toolbox = toolbox.clone();
            let tx = tx.clone();
            let _ = tokio::spawn(async move {
                let outcome = match ToolCall::parse(&request.tool, request.arguments) {
                    Ok(call) => toolbox.invoke(&call).await.map(|output| output.to_json()),
                    Err(e) => Err(e),
                };
                let _ = tx.send(response(&request.id, outcome).to_string());
            });
        }

        log::debug!(target: LOG_TARGET, "End of input, waiting for pending requests");
        Ok::<_, ohno::AppError>(())
    };

    let write_responses = async {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await.into_app_err("writing a response")?;
            writer.write_all(b"\n").await.into_app_err("writing a response")?;
            writer.flush().await.into_app_err("writing a response")?;
        }
        Ok::<_, ohno::AppError>(())
    };

    let (read, write) = tokio::join!(read_requests, write_responses);
    read?;
    write
}

fn response(id: &Value, outcome: core::result::Result<Value, ToolError>) -> Value {
    match outcome {
        Ok(result) => json!({ "id": id, "result": result }),
        Err(error) => json!({ "id": id, "error": error.to_json() }),
    }
}
