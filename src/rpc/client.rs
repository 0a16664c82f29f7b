//! Call/reply plumbing for one RPC program over one transport.
//!
//! A client owns its transport exclusively; the single-call-at-a-time
//! contract of [`Transport`] makes xid correlation trivial and keeps the
//! forged-credential window (set identity, send call, read reply) atomic
//! under the operation layer's lock.

use std::io::Cursor;
use std::net::{IpAddr, SocketAddr};

use tracing::debug;

use crate::errors::RpcError;
use crate::protocol::xdr::rpc::{
    accept_body, make_call, opaque_auth, reply_body, rejected_reply, rpc_body, rpc_msg,
};
use crate::protocol::xdr::{deserialize, serialize_to_vec, Serialize};
use crate::rpc::transport::{Proto, Transport};

/// A connected client for one (program, version) pair.
#[derive(Debug)]
pub struct RpcClient {
    transport: Transport,
    prog: u32,
    vers: u32,
}

impl RpcClient {
    /// Connects to `host:port` over the given transport.
    pub async fn connect(
        proto: Proto,
        host: IpAddr,
        port: u16,
        prog: u32,
        vers: u32,
    ) -> Result<RpcClient, RpcError> {
        let transport = Transport::connect(proto, SocketAddr::new(host, port)).await?;
        Ok(RpcClient { transport, prog, vers })
    }

    /// Issues one call and returns a cursor positioned at the start of the
    /// procedure-specific result body.
    ///
    /// The xid is freshly random per call. Accepted replies with a non-OK
    /// status and denied replies become the matching [`RpcError`].
    pub async fn call<A: Serialize>(
        &mut self,
        proc: u32,
        cred: opaque_auth,
        args: &A,
    ) -> Result<Cursor<Vec<u8>>, RpcError> {
        let xid: u32 = rand::random();
        debug!(xid, prog = self.prog, vers = self.vers, proc, "rpc call");

        let header = make_call(xid, self.prog, self.vers, proc, cred);
        let mut message = serialize_to_vec(&header)?;
        args.serialize(&mut message)?;

        let reply = self.transport.call(xid, &message).await?;
        let mut cursor = Cursor::new(reply);
        let msg: rpc_msg = deserialize(&mut cursor).map_err(RpcError::Decode)?;
        validate_reply(&msg)?;
        Ok(cursor)
    }
}

/// Checks the reply envelope, leaving only SUCCESS to pass through.
fn validate_reply(msg: &rpc_msg) -> Result<(), RpcError> {
    let reply = match &msg.body {
        rpc_body::REPLY(reply) => reply,
        rpc_body::CALL(_) => {
            return Err(RpcError::Decode(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "received a CALL in reply position",
            )))
        }
    };
    match reply {
        reply_body::MSG_ACCEPTED(accepted) => match &accepted.reply_data {
            accept_body::SUCCESS => Ok(()),
            accept_body::PROG_UNAVAIL => Err(RpcError::ProgUnavail),
            accept_body::PROG_MISMATCH(info) => {
                Err(RpcError::ProgMismatch { low: info.low, high: info.high })
            }
            accept_body::PROC_UNAVAIL => Err(RpcError::ProcUnavail),
            accept_body::GARBAGE_ARGS => Err(RpcError::GarbageArgs),
        },
        reply_body::MSG_DENIED(denied) => match denied {
            rejected_reply::RPC_MISMATCH(info) => {
                Err(RpcError::RpcMismatch { low: info.low, high: info.high })
            }
            rejected_reply::AUTH_ERROR(stat) => Err(RpcError::Auth(*stat)),
        },
    }
}
