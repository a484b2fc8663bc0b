// tests/common/mod.rs
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::Engine;
use httpmock::Method::GET;
use httpmock::MockServer;
pub use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::cache::token_cache::TokenCache;
use crate::credentials::manager::CredentialManager;
use crate::discovery::{BackendDescriptor, ServiceDirectory};
use crate::sources::adc::AdcSource;
use crate::sources::metadata::{MetadataSource, IDENTITY_PATH};

/// Nothing listens here, so connects fail fast.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

/// Compact JWS with a readable payload; the signature is not checked anywhere.
pub fn fake_jwt(subject: &str) -> String {
    let payload = json!({ "sub": subject, "aud": subject, "exp": 4102444800i64 }).to_string();
    format!(
        "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{}.c2lnbmF0dXJl",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload)
    )
}

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub fn backend(name: &str, pairs: &[(&str, &str)]) -> BackendDescriptor {
    BackendDescriptor {
        name: name.to_owned(),
        url: format!("https://{}.a.run.app", name),
        project_id: "labs-stg".to_owned(),
        region: "us-central1".to_owned(),
        labels: labels(pairs),
    }
}

pub fn credential_manager(metadata_url: &str, adc_path: Option<&str>, dev_mode: bool) -> CredentialManager {
    let timeout = Duration::from_secs(2);
    let metadata = MetadataSource::new(metadata_url, timeout).expect("metadata client");
    let adc = AdcSource::new(Some(adc_path.unwrap_or("/nonexistent/adc.json")), timeout).expect("adc client");
    CredentialManager::new(TokenCache::new(), metadata, adc, dev_mode)
}

/// Metadata server answering every identity request with a valid token.
pub async fn identity_server() -> MockServer {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(IDENTITY_PATH).header("Metadata-Flavor", "Google");
            then.status(200).body(fake_jwt("backend"));
        })
        .await;
    server
}

/// Plain HTTP responder on an already bound listener, for tests that need a fixed address.
pub fn serve_identity_on(listener: TcpListener, token: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut request = vec![0u8; 4096];
            let _ = stream.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                token.len(),
                token
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    })
}

/// In-memory directory keyed by project.
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
    pub projects: HashMap<String, Vec<BackendDescriptor>>,
    pub failing: HashSet<String>,
}

impl StaticDirectory {
    pub fn with_project(mut self, project: &str, backends: Vec<BackendDescriptor>) -> Self {
        self.projects.insert(project.to_owned(), backends);
        self
    }

    pub fn with_failing(mut self, project: &str) -> Self {
        self.failing.insert(project.to_owned());
        self
    }
}

impl ServiceDirectory for StaticDirectory {
    async fn list_backends(&self, project_id: &str, _region: &str) -> Result<Vec<BackendDescriptor>> {
        if self.failing.contains(project_id) {
            return Err(anyhow!("permission denied on project {}", project_id));
        }
        Ok(self.projects.get(project_id).cloned().unwrap_or_default())
    }
}
