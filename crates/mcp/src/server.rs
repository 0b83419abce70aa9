//! MCP server management (spawn, communicate, lifecycle).

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, Tool,
};

/// Default timeout for MCP operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum output size (1MB).
/// Sized for large tool outputs (file reads, search results).
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Configuration for an MCP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// How long to wait for each reply.
    pub timeout: Duration,
}

/// Pipes to the child process. Held for the whole request/reply exchange so
/// only one request is in flight at a time.
struct Channel {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Bytes of a line not yet terminated. Survives a timed-out read.
    pending: Vec<u8>,
    /// Set after an oversized line; its remainder is dropped.
    discarding: bool,
}

/// Handle to a running MCP server.
pub struct Server {
    config: ServerConfig,
    process: Mutex<Child>,
    channel: Mutex<Channel>,
    next_id: AtomicI64,
    initialized: AtomicBool,
    server_info: Mutex<Option<InitializeResult>>,
}

impl Server {
    /// Spawn a new MCP server process.
    pub async fn spawn(config: ServerConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        debug!(
            name = %config.name,
            command = %config.command,
            args = ?config.args,
            "spawning MCP server"
        );
        let mut process = cmd.spawn()?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Io(std::io::Error::other("failed to capture stdin")))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Io(std::io::Error::other("failed to capture stdout")))?;

        Ok(Self {
            config,
            process: Mutex::new(process),
            channel: Mutex::new(Channel {
                stdin,
                stdout: BufReader::new(stdout),
                pending: Vec::new(),
                discarding: false,
            }),
            next_id: AtomicI64::new(1),
            initialized: AtomicBool::new(false),
            server_info: Mutex::new(None),
        })
    }

    /// Spawn a server and complete the initialization handshake.
    pub async fn connect(config: ServerConfig) -> Result<Self> {
        let server = Self::spawn(config).await?;
        server.initialize().await?;
        Ok(server)
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Initialize the server (must be called before other operations).
    pub async fn initialize(&self) -> Result<()> {
        let params = InitializeParams::default();
        let result: InitializeResult = self.request("initialize", Some(params)).await?;
        debug!(
            name = self.name(),
            server = %result.server_info.name,
            protocol = %result.protocol_version,
            "MCP server initialized"
        );

        self.notify("notifications/initialized").await?;

        *self.server_info.lock().await = Some(result);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Check if the server is initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Get server info (after initialization).
    pub async fn server_info(&self) -> Option<InitializeResult> {
        self.server_info.lock().await.clone()
    }

    /// Fetch the server's tool catalog.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        let result: ListToolsResult = self.request("tools/list", None::<()>).await?;
        Ok(result.tools)
    }

    /// Call a tool by name.
    ///
    /// A result flagged `isError` by the server is returned as-is; only
    /// protocol and transport failures are errors here.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };

        self.request("tools/call", Some(params)).await
    }

    /// Shut down the server process.
    pub async fn shutdown(self) -> Result<()> {
        let mut process = self.process.lock().await;
        // The child may already be gone.
        let _ = process.kill().await;
        debug!(name = self.name(), "MCP server stopped");
        Ok(())
    }

    // --- Internal methods ---

    fn next_request_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn request<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_request_id();
        let mut request = JsonRpcRequest::new(id, method);
        if let Some(p) = params {
            request = request.with_params(p);
        }

        let mut channel = self.channel.lock().await;

        let request_json = serde_json::to_string(&request)?;
        trace!(%method, ?id, "sending request");
        write_line(&mut channel.stdin, &request_json).await?;

        let response = timeout(self.config.timeout, channel.read_reply(id))
            .await
            .map_err(|_| Error::Timeout)??;

        let result_value = response.into_result()?;
        let result: R = serde_json::from_value(result_value)?;

        Ok(result)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let notification_json = serde_json::to_string(&JsonRpcNotification::new(method))?;
        let mut channel = self.channel.lock().await;
        write_line(&mut channel.stdin, &notification_json).await
    }
}

async fn write_line(stdin: &mut ChildStdin, line: &str) -> Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await?;
    Ok(())
}

impl Channel {
    /// Read lines until the reply to `id` arrives, skipping blank lines,
    /// server-initiated messages and late replies to earlier requests.
    ///
    /// Cancel-safe: a partially read line is kept for the next call.
    async fn read_reply(&mut self, id: i64) -> Result<JsonRpcResponse> {
        loop {
            let line = self.next_line().await?;
            let text = String::from_utf8_lossy(&line);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }

            let message: JsonRpcResponse = serde_json::from_str(trimmed)?;
            if !message.is_reply() {
                trace!(method = ?message.method, "skipping server-initiated message");
                continue;
            }

            match message.id {
                Some(RequestId::Number(n)) if n == id => return Ok(message),
                Some(RequestId::Number(n)) if n < id => {
                    debug!(expected = id, got = n, "discarding late reply");
                }
                other => {
                    return Err(Error::InvalidResponse(format!(
                        "response ID mismatch: expected {id}, got {other:?}"
                    )));
                }
            }
        }
    }

    /// Next newline-terminated line, at most `MAX_OUTPUT_SIZE` bytes.
    async fn next_line(&mut self) -> Result<Vec<u8>> {
        loop {
            let limit = (MAX_OUTPUT_SIZE + 1).saturating_sub(self.pending.len()) as u64;
            let read = (&mut self.stdout)
                .take(limit)
                .read_until(b'\n', &mut self.pending)
                .await?;

            if self.pending.ends_with(b"\n") {
                let line = std::mem::take(&mut self.pending);
                if std::mem::take(&mut self.discarding) {
                    continue;
                }
                return Ok(line);
            }

            if self.pending.len() > MAX_OUTPUT_SIZE {
                let size = self.pending.len();
                self.pending.clear();
                if self.discarding {
                    continue;
                }
                self.discarding = true;
                warn!(size, max = MAX_OUTPUT_SIZE, "dropping oversized server message");
                return Err(Error::OutputTooLarge {
                    size,
                    max: MAX_OUTPUT_SIZE,
                });
            }

            if read == 0 {
                return Err(Error::ServerExited);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Write a shell script that answers the handshake, one `tools/list` and
    /// one `tools/call` with canned replies.
    fn fake_server_script(call_reply: &str) -> tempfile::NamedTempFile {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            script,
            r#"read -r _
printf '%s\n' '{{"jsonrpc":"2.0","id":1,"result":{{"protocolVersion":"2024-11-05","capabilities":{{"tools":{{}}}},"serverInfo":{{"name":"fake","version":"1.0.0"}}}}}}'
read -r _
read -r _
printf '%s\n' '{{"jsonrpc":"2.0","method":"notifications/message","params":{{"level":"info","data":"listing"}}}}'
printf '%s\n' '{{"jsonrpc":"2.0","id":2,"result":{{"tools":[{{"name":"calculate","description":"Evaluate","inputSchema":{{"type":"object"}}}}]}}}}'
read -r _
printf '%s\n' '{call_reply}'
read -r _"#
        )
        .unwrap();
        script
    }

    fn sh_config(script: &tempfile::NamedTempFile) -> ServerConfig {
        ServerConfig {
            name: "fake".to_string(),
            command: "sh".to_string(),
            args: vec![script.path().display().to_string()],
            env: HashMap::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Answers the handshake; the first request after it has id 2.
    const HANDSHAKE: &str = r#"read -r _
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"fake","version":"1.0.0"}}}'
read -r _
"#;

    fn text_reply(id: i64, text: &str) -> String {
        format!(
            r#"printf '%s\n' '{{"jsonrpc":"2.0","id":{id},"result":{{"content":[{{"type":"text","text":"{text}"}}]}}}}'"#
        )
    }

    fn scripted_server(lines: &[String]) -> tempfile::NamedTempFile {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        let body = lines.join("\n");
        write!(script, "{HANDSHAKE}{body}\nread -r _\n").unwrap();
        script
    }

    #[test]
    fn server_config_creation() {
        let config = ServerConfig {
            name: "test".to_string(),
            command: "echo".to_string(),
            args: vec!["hello".to_string()],
            env: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        };
        assert_eq!(config.name, "test");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn handshake_list_and_call() {
        let script = fake_server_script(
            r#"{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"2+2 = 4"}]}}"#,
        );
        let server = Server::connect(sh_config(&script)).await.unwrap();
        assert!(server.is_initialized());
        assert_eq!(server.server_info().await.unwrap().server_info.name, "fake");

        let tools = server.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "calculate");

        let mut args = Map::new();
        args.insert("expression".into(), Value::String("2+2".into()));
        let result = server.call_tool("calculate", Some(args)).await.unwrap();
        assert_eq!(result.first_text(), Some("2+2 = 4"));

        server.shutdown().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn json_rpc_error_reply_is_not_a_connection_error() {
        let script = fake_server_script(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32602,"message":"Tool nope not found"}}"#,
        );
        let server = Server::connect(sh_config(&script)).await.unwrap();
        server.list_tools().await.unwrap();

        let err = server.call_tool("nope", None).await.unwrap_err();
        assert!(matches!(err, Error::JsonRpc(_)));
        assert!(!err.is_connection());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exited_server_is_a_connection_error() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "exit 0").unwrap();

        let err = Server::connect(sh_config(&script)).await.err().unwrap();
        assert!(err.is_connection(), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn calls_before_initialize_are_rejected() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "read -r _").unwrap();

        let server = Server::spawn(sh_config(&script)).await.unwrap();
        let err = server.call_tool("calculate", None).await.unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn late_reply_after_timeout_is_discarded() {
        let script = scripted_server(&[
            "read -r _".to_string(),
            "sleep 2".to_string(),
            text_reply(2, "slow"),
            "read -r _".to_string(),
            text_reply(3, "fast"),
            "read -r _".to_string(),
            text_reply(4, "again"),
        ]);
        let mut config = sh_config(&script);
        config.timeout = Duration::from_millis(1500);
        let server = Server::connect(config).await.unwrap();

        let err = server.call_tool("slow", None).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));

        let result = server.call_tool("fast", None).await.unwrap();
        assert_eq!(result.first_text(), Some("fast"));
        let result = server.call_tool("again", None).await.unwrap();
        assert_eq!(result.first_text(), Some("again"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn partial_line_survives_timeout() {
        let script = scripted_server(&[
            "read -r _".to_string(),
            r#"printf '%s' '{"jsonrpc":"2.0","id":2,'"#.to_string(),
            "sleep 2".to_string(),
            r#"printf '%s\n' '"result":{"content":[{"type":"text","text":"slow"}]}}'"#.to_string(),
            "read -r _".to_string(),
            text_reply(3, "fast"),
        ]);
        let mut config = sh_config(&script);
        config.timeout = Duration::from_millis(1500);
        let server = Server::connect(config).await.unwrap();

        let err = server.call_tool("slow", None).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));

        // The split reply is reassembled and skipped, not parsed in halves.
        let result = server.call_tool("fast", None).await.unwrap();
        assert_eq!(result.first_text(), Some("fast"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn oversized_line_is_rejected_and_skipped() {
        let script = scripted_server(&[
            "read -r _".to_string(),
            format!(
                r#"head -c {} /dev/zero | tr '\0' 'a'"#,
                MAX_OUTPUT_SIZE + 4096
            ),
            r#"printf '\n'"#.to_string(),
            "read -r _".to_string(),
            text_reply(3, "fast"),
        ]);
        let server = Server::connect(sh_config(&script)).await.unwrap();

        let err = server.call_tool("huge", None).await.unwrap_err();
        assert!(matches!(
            err,
            Error::OutputTooLarge {
                max: MAX_OUTPUT_SIZE,
                ..
            }
        ));
        assert!(!err.is_connection());

        let result = server.call_tool("fast", None).await.unwrap();
        assert_eq!(result.first_text(), Some("fast"));
    }
}
