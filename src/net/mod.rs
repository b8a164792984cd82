//! Network helpers.

use std::net::TcpListener;

/// Ask the OS for a currently-unused local TCP port.
///
/// The probe socket is released before returning, so a racing process could
/// grab the port in the meantime; callers that cannot tolerate that should
/// bind port 0 directly and read the bound address instead.
pub fn unused_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}
