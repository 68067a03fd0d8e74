//! JSON-RPC connection to an out-of-process analysis engine.
//!
//! Messages use LSP base-protocol framing (`Content-Length: N\r\n\r\n{json}`)
//! on the engine's stdio. Requests may be in flight concurrently: writes are
//! serialized through a mutex and a background reader task routes each
//! response to the waiter registered under its id.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use log::{debug, warn};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

const LOG_TARGET: &str = "treelens::engine";

type ResponseResult = Result<Value, EngineError>;
type PendingRequests = Arc<DashMap<i64, oneshot::Sender<ResponseResult>>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Write one framed JSON-RPC message
pub async fn write_message<W>(writer: &mut W, message: &Value) -> Result<(), EngineError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let body = serde_json::to_string(message)
        .map_err(|e| EngineError::protocol(format!("Failed to serialize JSON: {e}")))?;
    let content = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);

    writer.write_all(content.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed JSON-RPC message.
///
/// Header names are matched case-insensitively and headers other than
/// `Content-Length` are skipped. End of stream yields [`EngineError::Closed`].
pub async fn read_message<R>(reader: &mut R) -> Result<Value, EngineError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut content_length = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(EngineError::Closed);
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            let length = value
                .trim()
                .parse::<usize>()
                .map_err(|e| EngineError::protocol(format!("Invalid Content-Length value: {e}")))?;
            content_length = Some(length);
        }
    }

    let content_length = content_length
        .ok_or_else(|| EngineError::protocol("Missing Content-Length header"))?;
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    serde_json::from_slice(&body)
        .map_err(|e| EngineError::protocol(format!("Failed to parse JSON: {e}")))
}

/// Live connection to one engine process (or any pair of streams in tests)
pub struct EngineConnection {
    writer: Mutex<Writer>,
    pending: PendingRequests,
    next_request_id: AtomicI64,
    shutdown: CancellationToken,
    reader_handle: JoinHandle<()>,
    /// Held so the process is killed when the connection drops
    _child: Option<Child>,
}

impl std::fmt::Debug for EngineConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConnection")
            .field("next_request_id", &self.next_request_id.load(Ordering::SeqCst))
            .field("pending", &self.pending.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl EngineConnection {
    /// Spawn the engine: `command[0]` with the remaining elements as arguments
    pub fn spawn(command: &[String]) -> Result<Self, EngineError> {
        use std::process::Stdio;

        let (program, args) = command
            .split_first()
            .ok_or_else(|| EngineError::protocol("Empty engine command"))?;
        let display = command.join(" ");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: display.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::protocol(format!("Failed to capture stdin of {display}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::protocol(format!("Failed to capture stdout of {display}")))?;

        debug!(target: LOG_TARGET, "Spawned engine `{}`", display);
        let mut connection = Self::from_streams(stdout, stdin);
        connection._child = Some(child);
        Ok(connection)
    }

    /// Connect over an arbitrary reader/writer pair
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingRequests = Arc::new(DashMap::new());
        let shutdown = CancellationToken::new();
        let reader_handle = tokio::spawn(run_reader(
            BufReader::new(reader),
            Arc::clone(&pending),
            shutdown.clone(),
        ));

        Self {
            writer: Mutex::new(Box::new(writer)),
            pending,
            next_request_id: AtomicI64::new(1),
            shutdown,
            reader_handle,
            _child: None,
        }
    }

    /// Send a request and wait for its result
    pub async fn request(&self, method: &str, params: Value) -> ResponseResult {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }

        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        let _slot = PendingSlot {
            pending: &self.pending,
            id,
        };
        // The reader may have cleared `pending` just before the insert
        if self.is_closed() {
            return Err(EngineError::Closed);
        }

        let message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let written = {
            let mut writer = self.writer.lock().await;
            write_message(&mut **writer, &message).await
        };
        written?;

        // Dropped sender: the reader stopped before answering
        rx.await.unwrap_or(Err(EngineError::Closed))
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.reader_handle.is_finished()
    }

    /// Stop the reader; requests still waiting fail with [`EngineError::Closed`]
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

/// Removes a request's waiter however `request` ends, including when the
/// caller drops the future on timeout
struct PendingSlot<'a> {
    pending: &'a PendingRequests,
    id: i64,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

impl Drop for EngineConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_reader<R>(mut reader: R, pending: PendingRequests, shutdown: CancellationToken)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = read_message(&mut reader) => message,
        };

        match message {
            Ok(message) => route_response(&pending, message),
            Err(EngineError::Closed) => {
                debug!(target: LOG_TARGET, "Engine closed its output");
                break;
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Engine reader stopped: {}", e);
                break;
            }
        }
    }

    shutdown.cancel();
    // Dropping the senders wakes every waiter with `Closed`
    pending.clear();
}

fn route_response(pending: &PendingRequests, message: Value) {
    let Some(id) = message.get("id").and_then(Value::as_i64) else {
        debug!(target: LOG_TARGET, "Ignoring engine message without id");
        return;
    };
    let Some((_, sender)) = pending.remove(&id) else {
        debug!(target: LOG_TARGET, "No waiter for engine response {}", id);
        return;
    };

    let result = if let Some(error) = message.get("error") {
        let text = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        Err(EngineError::remote(text))
    } else if let Some(result) = message.get("result") {
        Ok(result.clone())
    } else {
        Err(EngineError::protocol(format!(
            "Response {id} has neither result nor error"
        )))
    };

    // The waiter may have given up already
    let _ = sender.send(result);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf, duplex, split};

    /// Engine side of an in-memory connection
    pub(crate) struct FakeEngine {
        reader: BufReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl FakeEngine {
        pub(crate) async fn next_request(&mut self) -> Value {
            self.try_next_request().await.expect("request")
        }

        /// `None` once the client side is gone
        pub(crate) async fn try_next_request(&mut self) -> Option<Value> {
            read_message(&mut self.reader).await.ok()
        }

        pub(crate) async fn reply(&mut self, id: &Value, result: Value) {
            let response = json!({"jsonrpc": "2.0", "id": id, "result": result});
            write_message(&mut self.writer, &response).await.expect("reply");
        }

        pub(crate) async fn send_raw(&mut self, message: Value) {
            write_message(&mut self.writer, &message).await.expect("send");
        }
    }

    pub(crate) fn connected_pair() -> (EngineConnection, FakeEngine) {
        let (client, server) = duplex(64 * 1024);
        let (client_read, client_write) = split(client);
        let (server_read, server_write) = split(server);
        let connection = EngineConnection::from_streams(client_read, client_write);
        let engine = FakeEngine {
            reader: BufReader::new(server_read),
            writer: server_write,
        };
        (connection, engine)
    }

    #[tokio::test]
    async fn test_framing_round_trip() {
        let (mut a, b) = duplex(1024);
        let message = json!({"jsonrpc": "2.0", "id": 1, "result": "ünïcode"});
        write_message(&mut a, &message).await.unwrap();
        drop(a);

        let mut reader = BufReader::new(b);
        assert_eq!(read_message(&mut reader).await.unwrap(), message);
        assert!(matches!(
            read_message(&mut reader).await,
            Err(EngineError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_extra_headers_are_skipped() {
        let body = r#"{"id":3}"#;
        let raw = format!(
            "content-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let mut reader = BufReader::new(raw.as_bytes());
        assert_eq!(read_message(&mut reader).await.unwrap(), json!({"id": 3}));
    }

    #[tokio::test]
    async fn test_missing_content_length_is_protocol_error() {
        let mut reader = BufReader::new("X-Other: 1\r\n\r\n{}".as_bytes());
        assert!(matches!(
            read_message(&mut reader).await,
            Err(EngineError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_responses_routed_by_id_out_of_order() {
        let (connection, mut engine) = connected_pair();
        let connection = Arc::new(connection);

        let first = tokio::spawn({
            let connection = Arc::clone(&connection);
            async move { connection.request("evaluate", json!({"source": "1"})).await }
        });
        let first_request = engine.next_request().await;
        let second = tokio::spawn({
            let connection = Arc::clone(&connection);
            async move { connection.request("evaluate", json!({"source": "2"})).await }
        });
        let second_request = engine.next_request().await;

        // Answer the later request first
        engine.reply(&second_request["id"], json!("two")).await;
        engine.reply(&first_request["id"], json!("one")).await;

        assert_eq!(first.await.unwrap().unwrap(), json!("one"));
        assert_eq!(second.await.unwrap().unwrap(), json!("two"));
    }

    #[tokio::test]
    async fn test_jsonrpc_error_becomes_remote_error() {
        let (connection, mut engine) = connected_pair();
        let request = tokio::spawn(async move { connection.request("hover", json!({})).await });

        let incoming = engine.next_request().await;
        assert_eq!(incoming["method"], "hover");
        engine
            .send_raw(json!({
                "jsonrpc": "2.0",
                "id": incoming["id"],
                "error": {"code": -32601, "message": "method not found"}
            }))
            .await;

        let result = request.await.unwrap();
        assert!(matches!(result, Err(EngineError::Remote { message, .. }) if message == "method not found"));
    }

    #[tokio::test]
    async fn test_engine_exit_fails_pending_requests() {
        let (connection, mut engine) = connected_pair();
        let request = tokio::spawn(async move { connection.request("evaluate", json!({})).await });
        engine.next_request().await;
        drop(engine);

        let result = request.await.unwrap();
        assert!(matches!(result, Err(EngineError::Closed)));
    }

    #[tokio::test]
    async fn test_abandoned_requests_leave_no_waiters() {
        let (connection, mut engine) = connected_pair();
        let silent = tokio::spawn(async move { while engine.try_next_request().await.is_some() {} });

        for _ in 0..50 {
            let waited = tokio::time::timeout(
                std::time::Duration::from_millis(5),
                connection.request("evaluate", json!({})),
            )
            .await;
            assert!(waited.is_err());
        }
        assert_eq!(connection.pending.len(), 0);
        assert!(!connection.is_closed());

        drop(connection);
        silent.await.unwrap();
    }

    #[tokio::test]
    async fn test_answered_request_leaves_no_waiter() {
        let (connection, mut engine) = connected_pair();
        let connection = Arc::new(connection);
        let request = tokio::spawn({
            let connection = Arc::clone(&connection);
            async move { connection.request("evaluate", json!({})).await }
        });
        let incoming = engine.next_request().await;
        engine.reply(&incoming["id"], json!(null)).await;

        assert_eq!(request.await.unwrap().unwrap(), json!(null));
        assert_eq!(connection.pending.len(), 0);
    }

    #[tokio::test]
    async fn test_spawn_missing_command_fails() {
        let result = EngineConnection::spawn(&["/nonexistent/treelens-engine".to_string()]);
        assert!(matches!(result, Err(EngineError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_spawn_cat_and_close() {
        let connection = EngineConnection::spawn(&["cat".to_string()]).expect("spawn cat");
        assert!(!connection.is_closed());
        connection.close();
        assert!(connection.is_closed());
        assert!(matches!(
            connection.request("evaluate", json!({})).await,
            Err(EngineError::Closed)
        ));
    }
}
