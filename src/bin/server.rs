//! HTTP server for the HR insights backend.
//! Minimal HTTP handling on tokio: JSON in, JSON envelope out, CORS on every
//! response. Pipeline failures are payload-encoded; both shapes return 200.

use hr_insights::assistant::InsightAssistant;
use hr_insights::executor::{QueryExecutor, ResultRecord};
use hr_insights::llm::LlmClient;
use hr_insights::schema::SchemaDescriptor;

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const BIND_ADDR: &str = "0.0.0.0:8080";
const MAX_REQUEST_BYTES: usize = 1 << 20;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Fails fast when GROQ_API_KEY is absent.
    let llm = LlmClient::from_env()?;
    let db_path = std::env::var("HR_DB").unwrap_or_else(|_| "database.db".to_string());

    let assistant = Arc::new(InsightAssistant::new(
        llm,
        SchemaDescriptor::hr_default(),
        QueryExecutor::new(db_path),
    ));

    let listener = TcpListener::bind(BIND_ADDR).await?;
    info!("HR insights backend listening on {}", BIND_ADDR);

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("connection from {}", addr);
        let assistant = Arc::clone(&assistant);
        tokio::spawn(async move {
            handle_connection(stream, assistant).await;
        });
    }
}

async fn handle_connection(mut stream: TcpStream, assistant: Arc<InsightAssistant>) {
    let request = match read_request(&mut stream).await {
        Ok(request) => request,
        Err(e) => {
            error!("failed to read request: {}", e);
            return;
        }
    };

    let response = handle_request(&request, &assistant).await;
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        error!("failed to write response: {}", e);
    }
}

/// Read until the headers are complete and the declared body has arrived.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.len() > MAX_REQUEST_BYTES {
            break;
        }

        if let Some(headers_end) = find_subslice(&buffer, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buffer[..headers_end]);
            let content_length = headers
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buffer.len() >= headers_end + 4 + content_length {
                break;
            }
        }
    }

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn handle_request(request: &str, assistant: &InsightAssistant) -> String {
    let request_line = request.lines().next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts
        .next()
        .unwrap_or("")
        .split('?')
        .next()
        .unwrap_or("")
        .trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };

    info!("request: {} {}", method, path);

    match (method, path) {
        ("GET", "/") => create_response(
            200,
            "OK",
            r#"{"message":"HR insights backend running"}"#,
        ),
        ("POST", "/ask") => {
            let body = request_body(request);
            let question = body
                .as_ref()
                .and_then(|json| json.get("question").and_then(|q| q.as_str()))
                .unwrap_or("")
                .trim()
                .to_string();

            if question.is_empty() {
                return create_response(400, "Bad Request", r#"{"error":"Question is required"}"#);
            }

            let envelope = assistant.ask(&question).await;
            match serde_json::to_string(&envelope) {
                Ok(json) => create_response(200, "OK", &json),
                Err(e) => {
                    error!("failed to serialize envelope: {}", e);
                    create_response(
                        500,
                        "Internal Server Error",
                        r#"{"error":"Failed to serialize response"}"#,
                    )
                }
            }
        }
        ("POST", "/insight") => {
            let body = request_body(request);
            let question = body
                .as_ref()
                .and_then(|json| json.get("question").and_then(|q| q.as_str()))
                .unwrap_or("")
                .trim()
                .to_string();
            let data: Vec<ResultRecord> = body
                .as_ref()
                .and_then(|json| json.get("data"))
                .and_then(|value| serde_json::from_value(value.clone()).ok())
                .unwrap_or_default();

            if question.is_empty() {
                return create_response(400, "Bad Request", r#"{"error":"Question is required"}"#);
            }

            let insight = assistant.insight(&question, &data).await;
            let payload = serde_json::json!({ "insight": insight });
            create_response(200, "OK", &payload.to_string())
        }
        ("OPTIONS", _) => create_response(200, "OK", ""),
        _ => create_response(
            404,
            "Not Found",
            &format!(r#"{{"error":"Endpoint not found: {} {}"}}"#, method, path),
        ),
    }
}

/// JSON body of the request, if any.
fn request_body(request: &str) -> Option<serde_json::Value> {
    let body_start = request.find("\r\n\r\n")? + 4;
    let body = request[body_start..].trim();
    let json_start = body.find('{')?;
    serde_json::from_str(&body[json_start..]).ok()
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}
