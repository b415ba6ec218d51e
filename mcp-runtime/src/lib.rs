use bakul_core::config::{ApiKeySource, EnvApiKeySource, StaticApiKeySource};
use bakul_core::error::{ErrorPayload, codes};
use clap::{Args, Subcommand};
use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufRead, AsyncWrite, BufReader};
use uuid::Uuid;

pub mod dispatch;
pub mod gateway;
pub mod report;
mod rpc;
pub mod tools;
pub mod transport;
mod util;

use dispatch::{DispatchError, Dispatcher};
use gateway::{Gateway, HttpGateway};
use rpc::{Inbound, RpcError, RpcResponse};
use transport::{Framing, Incoming, ServeError, read_message, write_message};
use util::to_pretty_json;

pub use bakul_core::config::DEFAULT_API_BASE;

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "bakul-mcp";
const MCP_INSTRUCTIONS: &str = "Tools for the Bakul dataset API. Call health_check or get_api_key_status first. register_user returns an API key; set it as BAKUL_API_KEY before rotate_api_key, create_dataset or update_dataset. Public datasets and their schemas are readable without a key via get_public_dataset and get_public_dataset_schema.";

#[derive(Subcommand, Clone, Debug)]
pub enum McpCommands {
    /// Run the Bakul MCP server over stdio
    Serve,
    /// Print the tool registry (tools/list payload) as JSON
    Tools,
    /// Invoke a single tool and print its report
    Call(McpCallArgs),
}

#[derive(Args, Clone, Debug)]
pub struct McpCallArgs {
    /// Tool name, e.g. health_check
    pub tool: String,
    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub api_url: String,
    /// Pinned key; when absent the environment is read on every call.
    pub api_key: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_BASE.to_string(),
            api_key: None,
        }
    }
}

impl RuntimeConfig {
    fn key_source(&self) -> Box<dyn ApiKeySource> {
        match &self.api_key {
            Some(key) => Box::new(StaticApiKeySource::new(key.clone())),
            None => Box::new(EnvApiKeySource),
        }
    }

    fn dispatcher(&self) -> Dispatcher<HttpGateway, Box<dyn ApiKeySource>> {
        Dispatcher::new(HttpGateway::new(&self.api_url), self.key_source())
    }
}

/// Runs `command` and returns the process exit code.
pub async fn run(config: RuntimeConfig, command: McpCommands) -> i32 {
    match command {
        McpCommands::Serve => {
            let dispatcher = config.dispatcher();
            tracing::info!(api_url = dispatcher.gateway().base_url(), "forwarding tool calls");
            let server = McpServer::new(dispatcher);
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => {
                    tracing::error!(error = %err, "MCP server terminated");
                    eprintln!("Server failed to start: {err}");
                    1
                }
            }
        }
        McpCommands::Tools => {
            println!("{}", to_pretty_json(&tools_list_payload()));
            0
        }
        McpCommands::Call(args) => {
            let parsed: Map<String, Value> = match serde_json::from_str(&args.args) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    let payload = ErrorPayload::new(
                        codes::VALIDATION_FAILED,
                        "--args must be a JSON object",
                    )
                    .with_field("args");
                    eprintln!("{}", to_pretty_json(&payload.to_value()));
                    return 2;
                }
            };
            match config.dispatcher().invoke(&args.tool, &parsed).await {
                Ok(report) => {
                    println!("{}", report.render());
                    0
                }
                Err(err) => {
                    eprintln!("{}", to_pretty_json(&dispatch_error_payload(&err).to_value()));
                    2
                }
            }
        }
    }
}

pub struct McpServer<G, K> {
    dispatcher: Dispatcher<G, K>,
    session_id: String,
}

impl<G: Gateway, K: ApiKeySource> McpServer<G, K> {
    pub fn new(dispatcher: Dispatcher<G, K>) -> Self {
        Self {
            dispatcher,
            session_id: format!("stdio-{}", Uuid::now_v7()),
        }
    }

    pub async fn serve_stdio(&self) -> Result<(), ServeError> {
        let mut reader = BufReader::new(io::stdin());
        let mut writer = io::stdout();
        tracing::info!(session_id = %self.session_id, "Bakul MCP server running on stdio");
        self.serve(&mut reader, &mut writer).await
    }

    /// Processes messages until EOF.
    pub async fn serve<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<(), ServeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let Some(incoming) = read_message(reader).await.map_err(ServeError::Read)? else {
                tracing::info!(session_id = %self.session_id, "stdin closed; shutting down");
                return Ok(());
            };

            let (responses, framing) = match incoming {
                Incoming::Message(message, framing) => {
                    (self.handle_incoming_message(message).await, framing)
                }
                Incoming::Malformed(reason, framing) => {
                    tracing::warn!(%reason, "discarding unparseable message");
                    let rejection = RpcError::parse_error(reason);
                    (
                        vec![RpcResponse::failure(Value::Null, rejection).into_value()],
                        framing,
                    )
                }
            };
            self.write_responses(writer, &responses, framing).await?;
        }
    }

    async fn write_responses<W>(
        &self,
        writer: &mut W,
        responses: &[Value],
        framing: Framing,
    ) -> Result<(), ServeError>
    where
        W: AsyncWrite + Unpin,
    {
        for response in responses {
            write_message(writer, response, framing)
                .await
                .map_err(ServeError::Write)?;
        }
        Ok(())
    }

    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let messages = match incoming {
            Value::Array(batch) if batch.is_empty() => {
                let rejection = RpcError::invalid_request("empty batch");
                return vec![RpcResponse::failure(Value::Null, rejection).into_value()];
            }
            Value::Array(batch) => batch,
            single => vec![single],
        };

        let mut responses = Vec::with_capacity(messages.len());
        for message in messages {
            if let Some(response) = self.handle_message(message).await {
                responses.push(response.into_value());
            }
        }
        responses
    }

    async fn handle_message(&self, message: Value) -> Option<RpcResponse> {
        match Inbound::parse(message) {
            Err(rejection) => Some(rejection),
            Ok(Inbound::Request { id, method, params }) => {
                Some(match self.handle_request(&method, params).await {
                    Ok(result) => RpcResponse::success(id, result),
                    Err(err) => RpcResponse::failure(id, err),
                })
            }
            Ok(Inbound::Notification { method }) => {
                tracing::debug!(%method, "notification ignored");
                None
            }
            Ok(Inbound::Reply) => None,
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        tracing::info!(session_id = %self.session_id, tool = name, "tool call");
        let report = self
            .dispatcher
            .invoke(name, &args)
            .await
            .map_err(|err| {
                RpcError::invalid_params(err.to_string())
                    .with_data(dispatch_error_payload(&err).to_value())
            })?;

        Ok(json!({
            "content": [{ "type": "text", "text": report.render() }],
            "isError": report.is_error
        }))
    }
}

fn initialize_payload() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": MCP_SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": MCP_INSTRUCTIONS
    })
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tools::tool_definitions()
        .iter()
        .map(tools::ToolDefinition::to_value)
        .collect();
    json!({ "tools": tools })
}

fn dispatch_error_payload(err: &DispatchError) -> ErrorPayload {
    match err {
        DispatchError::UnknownTool(name) => {
            ErrorPayload::new(codes::UNKNOWN_TOOL, format!("Unknown tool: {name}"))
                .with_docs_hint("Call tools/list for the available tool names.")
        }
        DispatchError::InvalidInput { tool, source } => {
            ErrorPayload::new(codes::VALIDATION_FAILED, source.to_string())
                .with_field(source.field())
                .with_docs_hint(format!(
                    "Argument '{}' violates its {} constraint; see the inputSchema of {tool} in tools/list.",
                    source.field(),
                    source.constraint()
                ))
        }
    }
}
