//! Common test utilities for fairplay-ksm integration tests
//!
//! Servers are spawned on an ephemeral port and shut down when the
//! `TestServer` handle is dropped.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use fairplay_ksm::{serve, AppState};
use fps_ksm::testing::{
    test_server_keys, FixedContentKey, SERVER_CERT_PEM, SERVER_KEY_PEM, TEST_ASK_HEX,
};
use fps_ksm::Ksm;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub use fps_ksm::testing::{DeviceSpc, SpcBuilder};

/// Asset served by `sequential_engine`
pub const TEST_ASSET: &str = "track-01";

/// Content key `00 01 .. 0f`
pub const SEQUENTIAL_KEY: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];

/// Content IV `10 11 .. 1f`
pub const SEQUENTIAL_IV: [u8; 16] = [
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
];

pub struct TestServer {
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn license_url(&self) -> String {
        format!("{}/fps/license", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Serve `ksm` on 127.0.0.1 with an ephemeral port
pub async fn spawn_server(ksm: Ksm) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown = async {
            let _ = rx.await;
        };
        serve(listener, AppState::new(ksm), shutdown)
            .await
            .expect("test server");
    });

    TestServer {
        base_url: format!("http://{addr}"),
        shutdown: Some(tx),
    }
}

/// Engine with the test keys that serves the sequential key for `TEST_ASSET` only
pub fn sequential_engine() -> Ksm {
    Ksm::new(
        Arc::new(test_server_keys()),
        Arc::new(FixedContentKey::sequential().only_for(TEST_ASSET)),
    )
}

/// A device SPC for `TEST_ASSET` sealed for the test keys
pub fn device_spc() -> DeviceSpc {
    SpcBuilder::new()
        .asset_id(TEST_ASSET)
        .build(&test_server_keys())
        .expect("build SPC")
}

/// A device SPC whose standard base64 contains `+` or `/`
pub fn device_spc_with_url_unsafe_chars() -> DeviceSpc {
    loop {
        let device = device_spc();
        if BASE64.encode(&device.bytes).contains(['+', '/']) {
            return device;
        }
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// JSON request body
pub fn json_body(spc_b64: &str, asset_id: Option<&str>) -> String {
    match asset_id {
        Some(asset_id) => serde_json::json!({ "spc": spc_b64, "assetID": asset_id }),
        None => serde_json::json!({ "spc": spc_b64 }),
    }
    .to_string()
}

/// Form request body
pub fn form_body(spc_b64: &str) -> String {
    serde_urlencoded::to_string([("spc", spc_b64)]).expect("form encoding")
}

/// Indent PEM text for a YAML block scalar
pub fn indent(pem: &str) -> String {
    pem.lines().map(|l| format!("      {l}\n")).collect()
}

/// Config file with the test keys; `extra` is appended under `fairplay:`
pub fn config_yaml(extra: &str) -> String {
    format!(
        "server:\n  listen: \"127.0.0.1:0\"\n  fairplay:\n    certificate: |\n{}    private: |\n{}    ask: {}\n{}",
        indent(SERVER_CERT_PEM),
        indent(SERVER_KEY_PEM),
        TEST_ASK_HEX,
        extra
    )
}
