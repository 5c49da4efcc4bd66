//! Human readable startup output.
//!
//! These render to strings so `main` decides where they go.
use crate::backend::BackendStatus;
use crate::config::Config;
use crate::handlers::VERSION;
use std::fmt::Write as _;
use std::net::{IpAddr, UdpSocket};

/// Model names listed in the startup report.
const LISTED_MODELS: usize = 5;

pub fn banner(config: &Config) -> String {
    format!(
        "\n\
        ╔══════════════════════════════════════════════════╗\n\
        ║  Kaede Bridge v{VERSION}\n\
        ║  Relay between the Kaede PWA and Ollama\n\
        ╠══════════════════════════════════════════════════╣\n\
        ║  Backend: Ollama ({})\n\
        ╚══════════════════════════════════════════════════╝\n",
        config.model
    )
}

pub fn report(config: &Config, status: &BackendStatus) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Configuration:");
    let _ = writeln!(out, "├─ OLLAMA_URL: {}", config.backend_url);
    let _ = writeln!(out, "├─ OLLAMA_MODEL: {}", config.model);
    let _ = writeln!(out, "└─ BRIDGE_PORT: {}", config.port);
    let _ = writeln!(out);

    if status.available {
        let listed: Vec<&str> = status
            .models
            .iter()
            .take(LISTED_MODELS)
            .map(String::as_str)
            .collect();
        let _ = writeln!(out, "Ollama available - models: {}", listed.join(", "));
    } else {
        let _ = writeln!(out, "Ollama not available");
        let _ = writeln!(out, "   Run: ollama serve");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Endpoints:");
    let _ = writeln!(out, "├─ GET  /health              -> bridge status");
    let _ = writeln!(out, "├─ GET  /                    -> Ollama check");
    let _ = writeln!(out, "├─ GET  /api/tags            -> Ollama model list");
    let _ = writeln!(out, "├─ GET  /v1/models           -> models (OpenAI format)");
    let _ = writeln!(out, "└─ POST /v1/chat/completions -> chat with Ollama");
    let _ = writeln!(out);

    let state = if status.available { "ACTIVE" } else { "INACTIVE" };
    let _ = writeln!(out, "Status:");
    let _ = writeln!(out, "└─ Ollama {state}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Ready to connect with the Kaede PWA! Port: {}", config.port);
    out
}

pub fn unavailable_warning() -> &'static str {
    "Ollama is not running.\n\
     The bridge will start but cannot process requests.\n\
     In another terminal run: ollama serve"
}

/// Lines announcing a server bound to all interfaces on `port`.
pub fn serving_lines(port: u16) -> Vec<String> {
    let mut lines = vec![format!(" * Serving Kaede Bridge on http://0.0.0.0:{port}")];
    lines.extend(
        listen_addresses(port)
            .into_iter()
            .map(|address| format!(" * Running on {address}")),
    );
    lines
}

/// Addresses worth advertising for a server bound to all interfaces on `port`.
fn listen_addresses(port: u16) -> Vec<String> {
    let mut addresses = vec![format!("http://127.0.0.1:{port}")];
    if let Some(ip) = local_ip() {
        addresses.push(format!("http://{ip}:{port}"));
    }
    addresses
}

/// The address of the interface used for outbound traffic. Connecting a UDP socket sends nothing.
fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified() && !ip.is_loopback()).then_some(ip)
}
