//! ICMP implementation for native ping functionality

use super::{ProbeError, ProbeOutcome, ProbeReply, Prober};
use crate::ScanError;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{checksum, IcmpCode, IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use rand::Rng;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{ErrorKind, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

/// ICMP header (8) + payload, the classic 64-byte ping
const ECHO_PACKET_SIZE: usize = 64;
const ICMP_HEADER_SIZE: usize = 8;
const RECV_BUFFER_SIZE: usize = 1500;

/// Native ICMP pinger
///
/// Every probe opens its own raw socket so workers never share receive
/// buffers; replies are matched on identifier and sequence number.
#[derive(Debug)]
pub struct IcmpPinger {
    identifier: u16,
    sequence: AtomicU16,
}

impl IcmpPinger {
    /// Create a new ICMP pinger, failing early without raw socket rights
    pub fn new() -> crate::Result<Self> {
        Self::open_socket().map_err(|e| match e {
            ProbeError::Permission(msg) => ScanError::PermissionError(format!(
                "{} (run as root or grant CAP_NET_RAW)",
                msg
            )),
            other => ScanError::NetworkError(other.to_string()),
        })?;

        Ok(Self::unchecked())
    }

    /// Create a pinger without probing for privileges
    pub fn unchecked() -> Self {
        Self {
            identifier: rand::thread_rng().gen::<u16>(),
            sequence: AtomicU16::new(0),
        }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    fn open_socket() -> Result<Socket, ProbeError> {
        Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).map_err(|e| {
            if e.kind() == ErrorKind::PermissionDenied {
                ProbeError::Permission("Permission denied for ICMP socket".to_string())
            } else {
                ProbeError::Socket(e.to_string())
            }
        })
    }

    /// Resolve `address` to its first IPv4 address
    pub fn resolve(address: &str) -> Result<Ipv4Addr, ProbeError> {
        if let Ok(ip) = address.parse::<IpAddr>() {
            return match ip {
                IpAddr::V4(v4) => Ok(v4),
                IpAddr::V6(_) => Err(ProbeError::Unsupported(format!(
                    "{} is IPv6, only IPv4 echo is implemented",
                    address
                ))),
            };
        }

        let addrs = (address, 0).to_socket_addrs().map_err(|e| ProbeError::Resolve {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| ProbeError::Resolve {
                address: address.to_string(),
                reason: "no IPv4 address".to_string(),
            })
    }

    /// Build an echo request with a valid checksum
    pub fn build_echo_request(identifier: u16, sequence: u16) -> Vec<u8> {
        let mut buffer = vec![0u8; ECHO_PACKET_SIZE];
        if let Some(mut packet) = MutableEchoRequestPacket::new(&mut buffer) {
            packet.set_icmp_type(IcmpTypes::EchoRequest);
            packet.set_icmp_code(IcmpCode(0));
            packet.set_identifier(identifier);
            packet.set_sequence_number(sequence);

            let mut payload = [0u8; ECHO_PACKET_SIZE - ICMP_HEADER_SIZE];
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);
            payload[..8].copy_from_slice(&timestamp.to_be_bytes());
            packet.set_payload(&payload);
        }

        if let Some(icmp) = IcmpPacket::new(&buffer) {
            let sum = checksum(&icmp);
            if let Some(mut packet) = MutableEchoRequestPacket::new(&mut buffer) {
                packet.set_checksum(sum);
            }
        }
        buffer
    }

    /// Return the ICMP message size if `datagram` is the reply we wait for
    pub fn match_reply(
        datagram: &[u8],
        target: Ipv4Addr,
        identifier: u16,
        sequence: u16,
    ) -> Option<usize> {
        let ip = Ipv4Packet::new(datagram)?;
        if ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp || ip.get_source() != target
        {
            return None;
        }

        let offset = (ip.get_header_length() as usize) * 4;
        let icmp_bytes = datagram.get(offset..)?;
        let reply = EchoReplyPacket::new(icmp_bytes)?;

        if reply.get_icmp_type() == IcmpTypes::EchoReply
            && reply.get_identifier() == identifier
            && reply.get_sequence_number() == sequence
        {
            Some(icmp_bytes.len())
        } else {
            None
        }
    }

    fn next_sequence(&self) -> u16 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

impl Prober for IcmpPinger {
    fn probe(&self, address: &str, timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        let target = Self::resolve(address)?;
        let socket = Self::open_socket()?;
        let sequence = self.next_sequence();

        let request = Self::build_echo_request(self.identifier, sequence);
        let dest = SockAddr::from(SocketAddr::new(IpAddr::V4(target), 0));

        let start = Instant::now();
        socket
            .send_to(&request, &dest)
            .map_err(|e| ProbeError::Socket(e.to_string()))?;

        let deadline = start + timeout;
        let mut buffer = [0u8; RECV_BUFFER_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(ProbeOutcome::Unresponsive);
            }
            socket
                .set_read_timeout(Some(remaining))
                .map_err(|e| ProbeError::Socket(e.to_string()))?;

            match (&socket).read(&mut buffer) {
                Ok(received) => {
                    if let Some(payload_size) =
                        Self::match_reply(&buffer[..received], target, self.identifier, sequence)
                    {
                        return Ok(ProbeOutcome::Responsive(ProbeReply {
                            payload_size,
                            sequence,
                            latency: start.elapsed(),
                        }));
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(ProbeOutcome::Unresponsive);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ProbeError::Socket(e.to_string())),
            }
        }
    }

    fn name(&self) -> &str {
        "icmp-echo"
    }
}
