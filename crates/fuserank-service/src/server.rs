use std::io::{self, BufRead, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Instant;

use serde::Deserialize;
use serde_json::{Value, json};

use fuserank_core::Candidate;
use fuserank_engine::{ConfigError, ModelSpec, RerankConfig, RerankPipeline};

use crate::metrics::MetricsRegistry;
use crate::protocol::{self, RpcRequest};

pub struct RerankServer {
    pipeline: RerankPipeline,
    config: RerankConfig,
    metrics: MetricsRegistry,
    started: Instant,
}

#[derive(Debug, Deserialize)]
struct RerankArgs {
    query: String,
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    config: Option<RerankConfig>,
}

impl RerankServer {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = match std::env::var("FUSERANK_CONFIG") {
            Ok(path) => RerankConfig::from_json_file(path)?,
            Err(_) => {
                let mut config = RerankConfig::default();
                if let Ok(models) = std::env::var("FUSERANK_MODELS") {
                    config.models = models
                        .split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(ModelSpec::new)
                        .collect();
                }
                config
            }
        };
        Self::with_config(config)
    }

    pub fn with_config(config: RerankConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pipeline = RerankPipeline::with_config(&config)?;
        Ok(Self {
            pipeline,
            config,
            metrics: MetricsRegistry::default(),
            started: Instant::now(),
        })
    }

    pub fn pipeline(&self) -> &RerankPipeline {
        &self.pipeline
    }

    pub fn handle_request(&self, request: RpcRequest) -> Value {
        let id = request.id.unwrap_or(Value::Null);
        match request.method.as_str() {
            "rerank" => {
                let start = Instant::now();
                let outcome = self.handle_rerank(&request.params);
                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                match outcome {
                    Ok(result) => {
                        self.metrics.record_rerank(true, latency_ms);
                        protocol::success(id, result)
                    }
                    Err((code, message)) => {
                        self.metrics.record_rerank(false, latency_ms);
                        protocol::failure(id, code, message)
                    }
                }
            }
            "stats" => protocol::success(id, self.stats()),
            other => protocol::failure(
                id,
                protocol::METHOD_NOT_FOUND,
                format!("unknown method: {other}"),
            ),
        }
    }

    fn handle_rerank(&self, params: &Value) -> Result<Value, (i64, String)> {
        let args: RerankArgs = serde_json::from_value(params.clone())
            .map_err(|err| (protocol::INVALID_PARAMS, format!("invalid rerank params: {err}")))?;

        // a request config replaces the server config; an empty model list
        // inherits the server's models
        let config = match args.config {
            Some(mut overridden) => {
                if overridden.models.is_empty() {
                    overridden.models = self.config.models.clone();
                }
                overridden
            }
            None => self.config.clone(),
        };

        let results = self
            .pipeline
            .rerank(&args.query, &args.candidates, &config)
            .map_err(|err| (protocol::INTERNAL_ERROR, err.to_string()))?;
        Ok(json!({"count": results.len(), "results": results}))
    }

    fn stats(&self) -> Value {
        json!({
            "uptime_ms": self.started.elapsed().as_millis() as u64,
            "models": self.config.models.iter().map(|m| m.id.clone()).collect::<Vec<_>>(),
            "metrics": self.metrics.summary(),
            "cache": self.pipeline.cache_stats(),
        })
    }

    pub fn serve_stdio(&self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut reader = io::BufReader::new(stdin.lock());
        let mut stdout = io::stdout();
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let response = match serde_json::from_str::<RpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request),
                Err(err) => protocol::failure(
                    Value::Null,
                    protocol::PARSE_ERROR,
                    format!("parse error: {err}"),
                ),
            };
            let payload = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
            writeln!(stdout, "{payload}")?;
            stdout.flush()?;
        }
        Ok(())
    }

    pub fn serve_http(&self, addr: &str) -> io::Result<()> {
        let listener = TcpListener::bind(addr)?;
        eprintln!("fuserank-service http listening on {}", listener.local_addr()?);
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(err) = self.handle_http_connection(stream) {
                        eprintln!("fuserank-service http request error: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("fuserank-service http accept error: {err}");
                }
            }
        }
        Ok(())
    }

    fn handle_http_connection(&self, mut stream: TcpStream) -> io::Result<()> {
        let Some(request) = read_http_request(&stream)? else {
            return Ok(());
        };
        let response = self.dispatch_http(&request);
        write_http_response(&mut stream, response)
    }

    fn dispatch_http(&self, request: &HttpRequest) -> HttpResponse {
        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/health") => HttpResponse::json(200, json!({"status": "ok"})),
            ("GET", "/metrics") => HttpResponse::text(
                200,
                "text/plain; version=0.0.4; charset=utf-8",
                self.metrics.render_text(&self.pipeline.cache_stats()),
            ),
            ("GET", "/stats") => HttpResponse::json(200, self.stats()),
            ("POST", "/rerank") => {
                let params = serde_json::from_slice::<Value>(&request.body).unwrap_or(Value::Null);
                let response = self.handle_request(RpcRequest {
                    id: None,
                    method: "rerank".to_string(),
                    params,
                });
                let status = if response.get("error").is_some() { 400 } else { 200 };
                HttpResponse::json(status, response)
            }
            ("POST", "/rpc") | ("POST", "/") => match serde_json::from_slice::<RpcRequest>(
                &request.body,
            ) {
                Ok(rpc) => HttpResponse::json(200, self.handle_request(rpc)),
                Err(err) => HttpResponse::json(
                    400,
                    protocol::failure(
                        Value::Null,
                        protocol::PARSE_ERROR,
                        format!("parse error: {err}"),
                    ),
                ),
            },
            _ => HttpResponse::json(
                404,
                json!({
                    "error": "not_found",
                    "message": "endpoints: GET /health, GET /metrics, GET /stats, POST /rerank, POST /rpc"
                }),
            ),
        }
    }
}

struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

struct HttpResponse {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl HttpResponse {
    fn json(status: u16, value: Value) -> Self {
        let body = serde_json::to_vec(&value).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn text(status: u16, content_type: &'static str, body: String) -> Self {
        Self {
            status,
            content_type,
            body: body.into_bytes(),
        }
    }
}

fn read_http_request(stream: &TcpStream) -> io::Result<Option<HttpRequest>> {
    let mut reader = io::BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let first = line.trim_end_matches(['\r', '\n']);
    if first.is_empty() {
        return Ok(None);
    }

    let mut parts = first.split_whitespace();
    let Some(method) = parts.next() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid http request line (missing method)",
        ));
    };
    let Some(path_with_query) = parts.next() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid http request line (missing path)",
        ));
    };
    let path = path_with_query
        .split_once('?')
        .map_or(path_with_query, |(p, _)| p);

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            break;
        }
        let header = header.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse::<usize>().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0_u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }
    Ok(Some(HttpRequest {
        method: method.to_string(),
        path: path.to_string(),
        body,
    }))
}

fn write_http_response(stream: &mut TcpStream, response: HttpResponse) -> io::Result<()> {
    let reason = match response.status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let headers = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason,
        response.content_type,
        response.body.len()
    );
    stream.write_all(headers.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()
}
