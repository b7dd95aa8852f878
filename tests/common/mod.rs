#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory storage keeps the suite independent of a running PostgreSQL
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_jsonform-api"));
        cmd.args(["serve", "--memory", "--port", &port.to_string()])
            .env("APP_ENV", "development")
            // Small enough for the oversized-body test to stay cheap
            .env("API_MAX_REQUEST_SIZE_BYTES", "65536")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Status plus parsed JSON body
pub async fn read(res: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = res.status();
    let body = res.json::<Value>().await.context("response body is not JSON")?;
    Ok((status, body))
}

/// `data` of a success envelope, failing the test on anything else
pub fn data(status: StatusCode, body: &Value) -> Value {
    assert!(status.is_success(), "expected success, got {}: {}", status, body);
    assert_eq!(body["success"], true, "success flag false or missing: {}", body);
    body["data"].clone()
}
