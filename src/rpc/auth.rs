//! The credential forger.
//!
//! AUTH_UNIX is not authentication: the server believes whatever stamp,
//! machine name, uid and gid the caller packs into the credential. The
//! forger keeps a mutable identity pair and mints a fresh credential for
//! every outgoing call, so the resolver can claim the identity of whichever
//! object the next call touches.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::protocol::xdr::rpc::{auth_flavor, auth_unix, opaque_auth};
use crate::protocol::xdr::serialize_to_vec;

/// AUTH_UNIX caps the machinename at 255 bytes.
const MAX_MACHINENAME: usize = 255;

/// Produces AUTH_UNIX credentials claiming a caller-chosen identity.
///
/// The identity is mutated just in time by the resolver, immediately before
/// the call that depends on it; the auth lock in the operation layer keeps
/// the window between [`set_identity`](CredForger::set_identity) and the
/// reply single-threaded.
#[derive(Debug, Clone)]
pub struct CredForger {
    machinename: Vec<u8>,
    fuid: u32,
    fgid: u32,
}

impl CredForger {
    /// A forger announcing `fakename`, or this host's real name when none is
    /// given. Starts out claiming root.
    pub fn new(fakename: Option<&str>) -> CredForger {
        let mut machinename = match fakename {
            Some(name) => name.as_bytes().to_vec(),
            None => nix::unistd::gethostname()
                .map(|h| h.as_encoded_bytes().to_vec())
                .unwrap_or_default(),
        };
        machinename.truncate(MAX_MACHINENAME);
        CredForger { machinename, fuid: 0, fgid: 0 }
    }

    /// Sets the identity every subsequent credential will claim.
    pub fn set_identity(&mut self, uid: u32, gid: u32) {
        self.fuid = uid;
        self.fgid = gid;
    }

    pub fn identity(&self) -> (u32, u32) {
        (self.fuid, self.fgid)
    }

    /// Mints the AUTH_UNIX credential for the next call: current unix time
    /// as the stamp, the configured machine name, the forged uid/gid, and an
    /// empty auxiliary gid list.
    pub fn credential(&self) -> opaque_auth {
        let body = auth_unix {
            stamp: unix_now(),
            machinename: self.machinename.clone(),
            uid: self.fuid,
            gid: self.fgid,
            gids: Vec::new(),
        };
        opaque_auth {
            flavor: auth_flavor::AUTH_UNIX,
            // auth_unix always fits the 400-byte opaque body limit
            body: serialize_to_vec(&body).expect("serializing auth_unix cannot fail"),
        }
    }
}

/// Seconds since the epoch, truncated the way the wire wants it.
pub fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
