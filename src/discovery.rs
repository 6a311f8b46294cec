//! Bridge discovery via SSDP.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use log::debug;
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

const SSDP_ADDR: &str = "239.255.255.250:1900";

const M_SEARCH: &str = "M-SEARCH * HTTP/1.1\r\n\
HOST: 239.255.255.250:1900\r\n\
MAN: \"ssdp:discover\"\r\n\
MX: 2\r\n\
ST: ssdp:all\r\n\r\n";

/// A Hue bridge that answered the discovery search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredBridge {
    /// Address of the bridge
    pub ip: IpAddr,
    /// Bridge id from the `hue-bridgeid` header, when the bridge sent one
    pub bridge_id: Option<String>,
}

/// Find Hue bridges on the local network.
///
/// Sends an SSDP M-SEARCH and collects answers that identify as a Hue
/// bridge, until `discovery_timeout` elapses.
///
/// # Examples
///
/// ```ignore
/// use std::time::Duration;
/// use hue_node_rs::discover_bridges;
///
/// let bridges = discover_bridges(Duration::from_secs(3)).await?;
/// for bridge in bridges {
///     println!("{} {:?}", bridge.ip, bridge.bridge_id);
/// }
/// ```
pub async fn discover_bridges(discovery_timeout: Duration) -> Result<Vec<DiscoveredBridge>> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| Error::socket("bind", e))?;

    socket
        .send_to(M_SEARCH.as_bytes(), SSDP_ADDR)
        .await
        .map_err(|e| Error::socket("send_to", e))?;

    let mut discovered: HashMap<IpAddr, DiscoveredBridge> = HashMap::new();
    let start = Instant::now();
    let mut buffer = [0u8; 4096];
    let recv_timeout = Duration::from_millis(500);

    while start.elapsed() < discovery_timeout {
        match timeout(recv_timeout, socket.recv_from(&mut buffer)).await {
            Ok(Ok((size, addr))) => {
                let response = String::from_utf8_lossy(&buffer[..size]);
                if let Some(bridge) = parse_response(&response, addr) {
                    debug!("SSDP answer from Hue bridge {}", bridge.ip);
                    discovered.insert(bridge.ip, bridge);
                }
            }
            // Timeout elapsed - continue loop to check overall timeout
            Ok(Err(_)) | Err(_) => continue,
        }
    }

    Ok(discovered.into_values().collect())
}

/// First bridge found, for hosts that configure none.
pub async fn discover_one(discovery_timeout: Duration) -> Result<DiscoveredBridge> {
    let mut bridges = discover_bridges(discovery_timeout).await?;
    bridges.sort_by_key(|b| b.ip);
    bridges.into_iter().next().ok_or(Error::NoBridgeFound)
}

fn parse_response(response: &str, from: SocketAddr) -> Option<DiscoveredBridge> {
    let mut bridge_id = None;
    let mut is_hue = false;

    for line in response.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "hue-bridgeid" => {
                is_hue = true;
                bridge_id = Some(value.to_string());
            }
            "server" if value.contains("IpBridge") => is_hue = true,
            _ => {}
        }
    }

    is_hue.then(|| DiscoveredBridge {
        ip: from.ip(),
        bridge_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from() -> SocketAddr {
        "192.168.1.10:1900".parse().unwrap()
    }

    #[test]
    fn test_parse_hue_answer() {
        let answer = "HTTP/1.1 200 OK\r\n\
            CACHE-CONTROL: max-age=100\r\n\
            LOCATION: http://192.168.1.10:80/description.xml\r\n\
            SERVER: Linux/3.14.0 UPnP/1.0 IpBridge/1.48.0\r\n\
            hue-bridgeid: 001788FFFE100491\r\n\
            ST: upnp:rootdevice\r\n\r\n";

        let bridge = parse_response(answer, from()).unwrap();
        assert_eq!(bridge.ip.to_string(), "192.168.1.10");
        assert_eq!(bridge.bridge_id.as_deref(), Some("001788FFFE100491"));
    }

    #[test]
    fn test_parse_server_token_only() {
        let answer = "HTTP/1.1 200 OK\r\nSERVER: FreeRTOS/6.0.5, UPnP/1.0, IpBridge/0.1\r\n\r\n";
        let bridge = parse_response(answer, from()).unwrap();
        assert!(bridge.bridge_id.is_none());
    }

    #[test]
    fn test_ignore_other_devices() {
        let answer = "HTTP/1.1 200 OK\r\nSERVER: Linux UPnP/1.0 Sonos/70.3\r\n\r\n";
        assert!(parse_response(answer, from()).is_none());
    }
}
