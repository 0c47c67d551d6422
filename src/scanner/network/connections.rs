//! TCP connection table enumeration.
//!
//! - Linux: reads /proc/net/tcp and /proc/net/tcp6
//! - Windows: parses `netstat -ano -p TCP`
//! - macOS: parses `netstat -an -p tcp`

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address family of a TCP socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// TCP over IPv4
    Tcp,
    /// TCP over IPv6
    Tcp6,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Tcp6 => write!(f, "TCP6"),
        }
    }
}

/// State of a TCP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Listen,
    Established,
    SynSent,
    SynReceived,
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    LastAck,
    TimeWait,
    Closed,
    Unknown,
}

impl ConnectionState {
    /// Map a kernel TCP state number (`include/net/tcp_states.h`).
    pub fn from_proc_num(num: u8) -> Self {
        match num {
            1 => Self::Established,
            2 => Self::SynSent,
            3 => Self::SynReceived,
            4 => Self::FinWait1,
            5 => Self::FinWait2,
            6 => Self::TimeWait,
            7 => Self::Closed,
            8 => Self::CloseWait,
            9 => Self::LastAck,
            10 => Self::Listen,
            11 => Self::Closing,
            _ => Self::Unknown,
        }
    }

    /// Map a netstat state column.
    pub fn from_netstat(state: &str) -> Self {
        match state.to_uppercase().as_str() {
            "LISTEN" | "LISTENING" => Self::Listen,
            "ESTABLISHED" => Self::Established,
            "SYN_SENT" => Self::SynSent,
            "SYN_RECEIVED" | "SYN_RCVD" => Self::SynReceived,
            "FIN_WAIT_1" => Self::FinWait1,
            "FIN_WAIT_2" => Self::FinWait2,
            "CLOSE_WAIT" => Self::CloseWait,
            "CLOSING" => Self::Closing,
            "LAST_ACK" => Self::LastAck,
            "TIME_WAIT" => Self::TimeWait,
            "CLOSED" => Self::Closed,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listen => write!(f, "LISTEN"),
            Self::Established => write!(f, "ESTABLISHED"),
            Self::SynSent => write!(f, "SYN_SENT"),
            Self::SynReceived => write!(f, "SYN_RECV"),
            Self::FinWait1 => write!(f, "FIN_WAIT1"),
            Self::FinWait2 => write!(f, "FIN_WAIT2"),
            Self::CloseWait => write!(f, "CLOSE_WAIT"),
            Self::Closing => write!(f, "CLOSING"),
            Self::LastAck => write!(f, "LAST_ACK"),
            Self::TimeWait => write!(f, "TIME_WAIT"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One row of the TCP connection table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub conn_type: ConnectionType,
    pub local_addr: IpAddr,
    pub local_port: u16,
    /// Remote peer; `None` for listeners and unconnected sockets
    pub remote_addr: Option<IpAddr>,
    pub remote_port: Option<u16>,
    pub state: ConnectionState,
}

impl Connection {
    /// Remote peer with IPv4-mapped IPv6 addresses folded to IPv4.
    pub fn remote_peer(&self) -> Option<IpAddr> {
        self.remote_addr.map(|addr| addr.to_canonical())
    }
}

/// Source of the host's TCP connection table.
pub trait ConnectionTable: Send + Sync {
    /// Remote addresses of all TCP connections that have a peer.
    fn remote_addresses(&self) -> Result<Vec<IpAddr>>;
}

/// Connection table read from the operating system.
#[derive(Debug, Default, Clone)]
pub struct SystemConnectionTable;

impl SystemConnectionTable {
    pub fn new() -> Self {
        Self
    }

    /// Enumerate all TCP connections.
    pub fn enumerate_connections(&self) -> Result<Vec<Connection>> {
        #[cfg(target_os = "linux")]
        {
            let mut connections = read_proc_net_tcp("/proc/net/tcp", ConnectionType::Tcp)?;
            // tcp6 is absent when IPv6 is disabled
            match read_proc_net_tcp("/proc/net/tcp6", ConnectionType::Tcp6) {
                Ok(v6) => connections.extend(v6),
                Err(e) => log::debug!("Skipping IPv6 connection table: {}", e),
            }
            Ok(connections)
        }

        #[cfg(target_os = "windows")]
        {
            let stdout = run_netstat(&["-ano", "-p", "TCP"])?;
            Ok(parse_netstat_windows(&stdout))
        }

        #[cfg(target_os = "macos")]
        {
            let stdout = run_netstat(&["-an", "-p", "tcp"])?;
            Ok(parse_netstat_macos(&stdout))
        }

        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            Err(Error::ConnectionTable(
                "connection enumeration is not supported on this platform".to_string(),
            ))
        }
    }
}

impl ConnectionTable for SystemConnectionTable {
    fn remote_addresses(&self) -> Result<Vec<IpAddr>> {
        Ok(self
            .enumerate_connections()?
            .iter()
            .filter_map(Connection::remote_peer)
            .collect())
    }
}

#[cfg(target_os = "linux")]
fn read_proc_net_tcp(path: &str, conn_type: ConnectionType) -> Result<Vec<Connection>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::ConnectionTable(format!("{}: {}", path, e)))?;
    Ok(parse_proc_net_tcp(&content, conn_type))
}

#[cfg(any(target_os = "windows", target_os = "macos"))]
fn run_netstat(args: &[&str]) -> Result<String> {
    let output = std::process::Command::new("netstat")
        .args(args)
        .output()
        .map_err(|e| Error::ConnectionTable(format!("failed to run netstat: {}", e)))?;

    if !output.status.success() {
        return Err(Error::ConnectionTable(format!(
            "netstat exited with {}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse the Linux `/proc/net/tcp{,6}` format.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn parse_proc_net_tcp(content: &str, conn_type: ConnectionType) -> Vec<Connection> {
    let mut connections = Vec::new();

    // Skip header
    for line in content.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }

        let (local_addr, local_port) = match parse_proc_endpoint(parts[1], conn_type) {
            Some(endpoint) => endpoint,
            None => continue,
        };

        let (remote_addr, remote_port) = match parse_proc_endpoint(parts[2], conn_type) {
            Some((addr, port)) if !(port == 0 && addr.is_unspecified()) => {
                (Some(addr), Some(port))
            }
            _ => (None, None),
        };

        let state = u8::from_str_radix(parts[3], 16)
            .map(ConnectionState::from_proc_num)
            .unwrap_or(ConnectionState::Unknown);

        connections.push(Connection {
            conn_type,
            local_addr,
            local_port,
            remote_addr,
            remote_port,
            state,
        });
    }

    connections
}

fn parse_proc_endpoint(field: &str, conn_type: ConnectionType) -> Option<(IpAddr, u16)> {
    let (addr, port) = field.split_once(':')?;
    let addr = parse_hex_ip(addr, conn_type)?;
    let port = u16::from_str_radix(port, 16).ok()?;
    Some((addr, port))
}

/// Decode a kernel hex address; each 32-bit word is little-endian.
fn parse_hex_ip(hex: &str, conn_type: ConnectionType) -> Option<IpAddr> {
    match conn_type {
        ConnectionType::Tcp => {
            let value = u32::from_str_radix(hex, 16).ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(value.swap_bytes())))
        }
        ConnectionType::Tcp6 => {
            if hex.len() != 32 {
                return None;
            }
            let mut bytes = [0u8; 16];
            for (i, byte) in bytes.iter_mut().enumerate() {
                let group = i / 4;
                let offset = 3 - (i % 4);
                let idx = group * 8 + offset * 2;
                *byte = u8::from_str_radix(hex.get(idx..idx + 2)?, 16).ok()?;
            }
            Some(IpAddr::V6(Ipv6Addr::from(bytes)))
        }
    }
}

/// Parse `netstat -ano -p TCP` output (Windows).
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn parse_netstat_windows(stdout: &str) -> Vec<Connection> {
    let mut connections = Vec::new();

    for line in stdout.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 || !parts[0].eq_ignore_ascii_case("TCP") {
            continue;
        }

        let (local_addr, local_port) = match parse_colon_endpoint(parts[1]) {
            Some(endpoint) => endpoint,
            None => continue,
        };
        let (remote_addr, remote_port) = match parse_colon_endpoint(parts[2]) {
            Some((addr, port)) if port != 0 && !addr.is_unspecified() => {
                (Some(addr), Some(port))
            }
            _ => (None, None),
        };

        connections.push(Connection {
            conn_type: if local_addr.is_ipv6() {
                ConnectionType::Tcp6
            } else {
                ConnectionType::Tcp
            },
            local_addr,
            local_port,
            remote_addr,
            remote_port,
            state: ConnectionState::from_netstat(parts[3]),
        });
    }

    connections
}

/// `addr:port` or `[v6addr]:port`.
fn parse_colon_endpoint(field: &str) -> Option<(IpAddr, u16)> {
    let (addr, port) = field.rsplit_once(':')?;
    let addr = addr.trim_start_matches('[').trim_end_matches(']');
    // Strip an IPv6 zone index such as %4
    let addr = addr.split('%').next()?;
    Some((addr.parse().ok()?, port.parse().ok()?))
}

/// Parse `netstat -an -p tcp` output (macOS).
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn parse_netstat_macos(stdout: &str) -> Vec<Connection> {
    let mut connections = Vec::new();

    for line in stdout.lines() {
        if !line.starts_with("tcp") {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            continue;
        }

        let conn_type = if parts[0].ends_with('6') {
            ConnectionType::Tcp6
        } else {
            ConnectionType::Tcp
        };

        let (local_addr, local_port) = match parse_dot_endpoint(parts[3]) {
            Some(endpoint) => endpoint,
            None => continue,
        };
        let (remote_addr, remote_port) = match parse_dot_endpoint(parts[4]) {
            Some((addr, port)) if port != 0 && !addr.is_unspecified() => {
                (Some(addr), Some(port))
            }
            _ => (None, None),
        };

        connections.push(Connection {
            conn_type,
            local_addr,
            local_port,
            remote_addr,
            remote_port,
            state: ConnectionState::from_netstat(parts[5]),
        });
    }

    connections
}

/// BSD netstat `addr.port`, with `*` for wildcards.
fn parse_dot_endpoint(field: &str) -> Option<(IpAddr, u16)> {
    let (addr, port) = field.rsplit_once('.')?;
    let port = if port == "*" { 0 } else { port.parse().ok()? };
    let addr = match addr {
        "*" => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        other => other.split('%').next()?.parse().ok()?,
    };
    Some((addr, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_NET_TCP: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:0CEA 00000000:0000 0A 00000000:00000000 00:00000000 00000000   100        0 1234 1
   1: 0F02000A:A2B4 04030201:01BB 01 00000000:00000000 00:00000000 00000000  1000        0 5678 1
   2: 0F02000A:A2B6 09090909:0050 06 00000000:00000000 00:00000000 00000000  1000        0 0 1
";

    #[test]
    fn test_parse_hex_ip_v4() {
        let ip = parse_hex_ip("0100007F", ConnectionType::Tcp).unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
        assert!(parse_hex_ip("zz", ConnectionType::Tcp).is_none());
    }

    #[test]
    fn test_parse_hex_ip_v4_mapped_v6() {
        // ::ffff:1.2.3.4
        let ip = parse_hex_ip("0000000000000000FFFF000004030201", ConnectionType::Tcp6).unwrap();
        assert_eq!(ip.to_canonical(), IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_parse_proc_net_tcp() {
        let connections = parse_proc_net_tcp(PROC_NET_TCP, ConnectionType::Tcp);
        assert_eq!(connections.len(), 3);

        assert_eq!(connections[0].state, ConnectionState::Listen);
        assert_eq!(connections[0].remote_addr, None);

        assert_eq!(connections[1].state, ConnectionState::Established);
        assert_eq!(connections[1].remote_peer(), Some("1.2.3.4".parse().unwrap()));
        assert_eq!(connections[1].remote_port, Some(443));

        assert_eq!(connections[2].state, ConnectionState::TimeWait);
        assert_eq!(connections[2].remote_peer(), Some("9.9.9.9".parse().unwrap()));
    }

    #[test]
    fn test_parse_netstat_windows() {
        let stdout = "\
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1000
  TCP    10.0.2.15:50000        1.2.3.4:443            ESTABLISHED     4242
  TCP    [::1]:5000             [::]:0                 LISTENING       77
";
        let connections = parse_netstat_windows(stdout);
        assert_eq!(connections.len(), 3);
        assert_eq!(connections[0].remote_addr, None);
        assert_eq!(connections[1].remote_peer(), Some("1.2.3.4".parse().unwrap()));
        assert_eq!(connections[1].state, ConnectionState::Established);
        assert_eq!(connections[2].conn_type, ConnectionType::Tcp6);
    }

    #[test]
    fn test_parse_netstat_macos() {
        let stdout = "\
Active Internet connections (including servers)
Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)
tcp4       0      0  192.168.1.5.52011      1.2.3.4.443            ESTABLISHED
tcp46      0      0  *.8080                 *.*                    LISTEN
";
        let connections = parse_netstat_macos(stdout);
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].remote_peer(), Some("1.2.3.4".parse().unwrap()));
        assert_eq!(connections[1].state, ConnectionState::Listen);
        assert_eq!(connections[1].remote_addr, None);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Listen.to_string(), "LISTEN");
        assert_eq!(ConnectionState::TimeWait.to_string(), "TIME_WAIT");
        assert_eq!(ConnectionType::Tcp6.to_string(), "TCP6");
    }

    #[test]
    fn test_enumerate_connections() {
        // Should not panic
        let _ = SystemConnectionTable::new().remote_addresses();
    }
}
