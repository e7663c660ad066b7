//! Per-agent persisted state.
//!
//! Each agent keeps two small files next to its walk: a boot counter
//! (incremented on every start, as SNMPv3 engines do) and an engine-info
//! file describing the running instance. Persistence failures are logged
//! and never stop the agent.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Percent-encode per RFC 3986 with UTF-8: unreserved characters pass
/// through, everything else becomes `%XX`.
pub fn url_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{:02X}", byte));
            }
        }
    }
    out
}

/// The boot-counter file for an agent, beside its walk file.
pub fn boot_counter_file(walk: &Path, agent_name: &str) -> PathBuf {
    sibling(walk, &format!("{}.BC.cfg", url_encode(agent_name)))
}

/// The engine-info file for an agent, beside its walk file.
pub fn engine_info_file(walk: &Path, agent_name: &str) -> PathBuf {
    sibling(walk, &format!("{}.Config.cfg", url_encode(agent_name)))
}

fn sibling(walk: &Path, file_name: &str) -> PathBuf {
    walk.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(file_name)
}

/// Increment and persist the boot counter, returning the new count.
///
/// A missing or unreadable file counts as zero boots so far.
pub fn record_boot(walk: &Path, agent_name: &str) -> u32 {
    let path = boot_counter_file(walk, agent_name);
    let previous = std::fs::read_to_string(&path)
        .ok()
        .and_then(|text| text.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let count = previous.saturating_add(1);
    if let Err(err) = std::fs::write(&path, format!("{}\n", count)) {
        warn!(path = %path.display(), %err, "could not persist boot counter");
    } else {
        debug!(agent = agent_name, boots = count, "recorded boot");
    }
    count
}

/// Persist the engine-info file for a started agent.
pub fn write_engine_info(walk: &Path, agent_name: &str, address: SocketAddr, boots: u32) {
    let path = engine_info_file(walk, agent_name);
    let body = format!("name={}\naddress={}\nboots={}\n", agent_name, address, boots);
    if let Err(err) = std::fs::write(&path, body) {
        warn!(path = %path.display(), %err, "could not persist engine info");
    }
}
