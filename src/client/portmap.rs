//! Portmapper queries (RFC 1833, version 2 of the binding protocol).
//!
//! Used whenever the operator did not pin a port: the client asks the
//! portmapper on port 111 where a (program, version, protocol) triple
//! listens. A port of zero means the program is not registered, surfaced as
//! a distinct error because it is the classic "server is not exporting
//! anything" failure at mount time.

use std::net::IpAddr;

use tracing::debug;

use crate::errors::RpcError;
use crate::protocol::xdr::portmap;
use crate::protocol::xdr::rpc::opaque_auth;
use crate::protocol::xdr::deserialize;
use crate::rpc::{Proto, RpcClient};

/// Asks the portmapper at `host:pmap_port` for the port of `(prog, vers)`
/// over `query_proto`. The query itself travels over `via`, which follows
/// the transport configured for the service being located. `pmap_port` is
/// almost always [`portmap::PORT`].
pub async fn getport(
    host: IpAddr,
    pmap_port: u16,
    via: Proto,
    prog: u32,
    vers: u32,
    query_proto: Proto,
) -> Result<u16, RpcError> {
    let mut rpc =
        RpcClient::connect(via, host, pmap_port, portmap::PROGRAM, portmap::VERSION).await?;
    let args = portmap::mapping { prog, vers, prot: query_proto.ipproto(), port: 0 };
    let mut body = rpc
        .call(portmap::PortmapProc::PMAPPROC_GETPORT as u32, opaque_auth::default(), &args)
        .await?;
    let port: u32 = deserialize(&mut body).map_err(RpcError::Decode)?;
    debug!(prog, vers, port, "portmap GETPORT");
    if port == 0 || port > u16::MAX as u32 {
        return Err(RpcError::NotRegistered);
    }
    Ok(port as u16)
}

/// Pings the portmapper; useful as a cheap reachability probe before the
/// full mount sequence.
pub async fn null(host: IpAddr, pmap_port: u16, via: Proto) -> Result<(), RpcError> {
    let mut rpc =
        RpcClient::connect(via, host, pmap_port, portmap::PROGRAM, portmap::VERSION).await?;
    rpc.call(portmap::PortmapProc::PMAPPROC_NULL as u32, opaque_auth::default(), &())
        .await?;
    Ok(())
}
