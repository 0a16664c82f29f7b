//! RPC transports: one datagram per call over UDP, record marking over TCP.
//!
//! Both transports carry exactly one call at a time; the operation layer's
//! auth lock guarantees callers never interleave. UDP retransmits with
//! exponential backoff and drops replies whose xid does not match the call.
//! TCP treats a mismatched xid as fatal, since record boundaries guarantee
//! the reply belongs to this connection's only outstanding call.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream, UdpSocket};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};

use crate::errors::RpcError;
use crate::protocol::xdr::Endian;
use byteorder::ByteOrder;

/// Largest READ/WRITE payload the client will negotiate.
pub const MAXBLKSIZE: u32 = 32 * 1024;

/// UDP receive buffer: worst-case READ reply is the payload plus the RPC
/// and NFS framing overhead.
const UDP_RECV_BUFSIZE: usize = MAXBLKSIZE as usize + 128;

/// First UDP retransmission timeout; doubles per retry up to the cap.
const UDP_TIMEOUT_INITIAL: Duration = Duration::from_secs(1);
const UDP_TIMEOUT_CAP: Duration = Duration::from_secs(16);
/// Total transmissions of one UDP call before giving up.
const UDP_MAX_SENDS: u32 = 5;

/// Upper bound on a reassembled TCP record. Replies are bounded by the
/// negotiated transfer size; anything larger is a framing failure.
const MAX_RECORD_BYTES: usize = 1 << 20;

/// Lowest port `bindresvport` will try. Ports below 512 are left to other
/// reserved-port protocols, matching the classic BSD behavior.
const RESV_PORT_LOW: u16 = 512;
const RESV_PORT_HIGH: u16 = 1024;

/// Transport protocol selector, as written in `PORT/TRANSPORT` options.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Proto {
    Udp,
    Tcp,
}

impl Proto {
    /// The IPPROTO number portmap wants in GETPORT queries.
    pub fn ipproto(self) -> u32 {
        match self {
            Proto::Udp => crate::protocol::xdr::portmap::IPPROTO_UDP,
            Proto::Tcp => crate::protocol::xdr::portmap::IPPROTO_TCP,
        }
    }
}

impl FromStr for Proto {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "udp" => Ok(Proto::Udp),
            "tcp" => Ok(Proto::Tcp),
            other => Err(format!("invalid transport: {other}")),
        }
    }
}

/// A connected RPC transport.
#[derive(Debug)]
pub enum Transport {
    Udp(UdpTransport),
    Tcp(TcpTransport),
}

impl Transport {
    /// Connects to `addr`, binding a reserved source port when the process
    /// is privileged. Many servers refuse AUTH_UNIX calls from source ports
    /// at or above 1024.
    pub async fn connect(proto: Proto, addr: SocketAddr) -> Result<Transport, RpcError> {
        match proto {
            Proto::Udp => Ok(Transport::Udp(UdpTransport::connect(addr).await?)),
            Proto::Tcp => Ok(Transport::Tcp(TcpTransport::connect(addr).await?)),
        }
    }

    /// Sends one framed call and returns the raw reply bytes whose xid
    /// matches `xid`.
    pub async fn call(&mut self, xid: u32, message: &[u8]) -> Result<Vec<u8>, RpcError> {
        match self {
            Transport::Udp(t) => t.call(xid, message).await,
            Transport::Tcp(t) => t.call(xid, message).await,
        }
    }
}

fn reply_xid(reply: &[u8]) -> Option<u32> {
    if reply.len() < 4 {
        return None;
    }
    Some(Endian::read_u32(&reply[..4]))
}

fn privileged() -> bool {
    nix::unistd::geteuid().is_root()
}

/// One datagram per call; lost replies are retransmitted with exponential
/// backoff until the retry budget runs out.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn connect(addr: SocketAddr) -> Result<UdpTransport, RpcError> {
        let socket = bind_udp_resvport().await?;
        socket.connect(addr).await?;
        Ok(UdpTransport { socket })
    }

    async fn call(&mut self, xid: u32, message: &[u8]) -> Result<Vec<u8>, RpcError> {
        let mut buf = vec![0_u8; UDP_RECV_BUFSIZE];
        let mut wait = UDP_TIMEOUT_INITIAL;
        for attempt in 0..UDP_MAX_SENDS {
            if attempt > 0 {
                debug!(xid, attempt, "retransmitting udp call");
            }
            self.socket.send(message).await?;
            let deadline = Instant::now() + wait;
            loop {
                match timeout_at(deadline, self.socket.recv(&mut buf)).await {
                    Err(_elapsed) => break,
                    Ok(Err(e)) => return Err(RpcError::Io(e)),
                    Ok(Ok(n)) => match reply_xid(&buf[..n]) {
                        Some(got) if got == xid => return Ok(buf[..n].to_vec()),
                        got => {
                            // stray datagram, likely a late reply to an
                            // earlier retransmission
                            trace!(xid, ?got, "dropping reply with foreign xid");
                        }
                    },
                }
            }
            wait = (wait * 2).min(UDP_TIMEOUT_CAP);
        }
        warn!(xid, "udp call exhausted its retry budget");
        Err(RpcError::Timeout)
    }
}

/// Record-marked stream per RFC 5531 section 11: each record is a sequence
/// of fragments headed by a u32 whose top bit flags the last fragment.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub async fn connect(addr: SocketAddr) -> Result<TcpTransport, RpcError> {
        let stream = connect_tcp_resvport(addr).await?;
        let _ = stream.set_nodelay(true);
        Ok(TcpTransport { stream })
    }

    async fn call(&mut self, xid: u32, message: &[u8]) -> Result<Vec<u8>, RpcError> {
        write_record(&mut self.stream, message).await?;
        let reply = read_record(&mut self.stream).await?;
        match reply_xid(&reply) {
            Some(got) if got == xid => Ok(reply),
            Some(got) => Err(RpcError::XidMismatch { want: xid, got }),
            None => Err(RpcError::Decode(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "reply shorter than an xid",
            ))),
        }
    }
}

/// Writes one record. Calls always fit a single fragment, but the loop
/// handles the general case.
pub async fn write_record(stream: &mut TcpStream, buf: &[u8]) -> Result<(), RpcError> {
    const MAX_FRAGMENT: usize = (1 << 31) - 1;

    let mut offset = 0;
    while offset < buf.len() || buf.is_empty() {
        let len = (buf.len() - offset).min(MAX_FRAGMENT);
        let last = offset + len >= buf.len();
        let header = if last { len as u32 | 1 << 31 } else { len as u32 };
        stream.write_all(&header.to_be_bytes()).await?;
        stream.write_all(&buf[offset..offset + len]).await?;
        offset += len;
        if last {
            break;
        }
    }
    Ok(())
}

/// Reads fragments until the last-fragment flag, enforcing the record cap.
pub async fn read_record(stream: &mut TcpStream) -> Result<Vec<u8>, RpcError> {
    let mut record = Vec::new();
    loop {
        let mut header_buf = [0_u8; 4];
        stream.read_exact(&mut header_buf).await?;
        let header = u32::from_be_bytes(header_buf);
        let last = header & 1 << 31 != 0;
        let len = (header & ((1 << 31) - 1)) as usize;
        trace!(len, last, "reading record fragment");
        if record.len().saturating_add(len) > MAX_RECORD_BYTES {
            return Err(RpcError::Decode(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("rpc record exceeds {MAX_RECORD_BYTES} bytes"),
            )));
        }
        let start = record.len();
        record.resize(start + len, 0);
        stream.read_exact(&mut record[start..]).await?;
        if last {
            return Ok(record);
        }
    }
}

/// Binds a UDP socket, claiming a reserved port when privileged.
async fn bind_udp_resvport() -> Result<UdpSocket, RpcError> {
    if privileged() {
        for port in (RESV_PORT_LOW..RESV_PORT_HIGH).rev() {
            match UdpSocket::bind(("0.0.0.0", port)).await {
                Ok(socket) => {
                    trace!(port, "bound reserved udp source port");
                    return Ok(socket);
                }
                Err(_) => continue,
            }
        }
        warn!("no reserved udp port free, falling back to ephemeral");
    }
    Ok(UdpSocket::bind(("0.0.0.0", 0)).await?)
}

/// Connects a TCP stream, claiming a reserved source port when privileged.
async fn connect_tcp_resvport(addr: SocketAddr) -> Result<TcpStream, RpcError> {
    if privileged() {
        for port in (RESV_PORT_LOW..RESV_PORT_HIGH).rev() {
            let socket =
                if addr.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() }?;
            let bind_addr: SocketAddr = if addr.is_ipv4() {
                SocketAddr::from(([0, 0, 0, 0], port))
            } else {
                SocketAddr::from(([0_u16; 8], port))
            };
            if socket.bind(bind_addr).is_err() {
                continue;
            }
            match socket.connect(addr).await {
                Ok(stream) => {
                    trace!(port, "bound reserved tcp source port");
                    return Ok(stream);
                }
                Err(_) => continue,
            }
        }
        warn!("no reserved tcp port free, falling back to ephemeral");
    }
    Ok(TcpStream::connect(addr).await?)
}
