//! Mount protocol client, versions 1 (paired with NFS v2) and 3 (with v3).
//!
//! MNT yields the root filehandle of an export, which is all the state this
//! client ever asks the mount daemon for. UMNT removes the server-side
//! mount record; the `hide` option calls it immediately after MNT so the
//! export list shows no trace while the filehandle keeps working. EXPORT
//! and DUMP are carried for reconnaissance of what a server offers and who
//! mounts it.

use std::net::IpAddr;

use tracing::{debug, info};

use crate::errors::{Error, RpcError};
use crate::protocol::xdr::mount::{
    self, exports, mount_list, mountres3_ok, mountstat3, MountProc,
};
use crate::protocol::xdr::{deserialize, Deserialize};
use crate::rpc::{CredForger, Proto, RpcClient};

/// Which revision of the mount protocol to speak. Follows the NFS version.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MountVersion {
    V1,
    V3,
}

impl MountVersion {
    /// The RPC version number on the wire.
    pub fn number(self) -> u32 {
        match self {
            MountVersion::V1 => mount::VERSION1,
            MountVersion::V3 => mount::VERSION3,
        }
    }
}

/// A connected mount-protocol client.
///
/// Mount daemons apply the same AUTH_UNIX trust as NFS servers, so calls go
/// out under the forger's credential; identity stays (0, 0) since there is
/// no object owner to impersonate yet.
#[derive(Debug)]
pub struct MountClient {
    rpc: RpcClient,
    version: MountVersion,
    forger: CredForger,
}

impl MountClient {
    pub async fn connect(
        proto: Proto,
        host: IpAddr,
        port: u16,
        version: MountVersion,
        forger: CredForger,
    ) -> Result<MountClient, RpcError> {
        let rpc = RpcClient::connect(proto, host, port, mount::PROGRAM, version.number()).await?;
        Ok(MountClient { rpc, version, forger })
    }

    async fn call<A: crate::protocol::xdr::Serialize>(
        &mut self,
        proc: MountProc,
        args: &A,
    ) -> Result<std::io::Cursor<Vec<u8>>, RpcError> {
        self.rpc.call(proc as u32, self.forger.credential(), args).await
    }

    fn decode<T: Default + Deserialize>(
        body: &mut std::io::Cursor<Vec<u8>>,
    ) -> Result<T, Error> {
        deserialize(body).map_err(|e| RpcError::Decode(e).into())
    }

    /// Pings the mount daemon.
    pub async fn null(&mut self) -> Result<(), Error> {
        self.call(MountProc::MOUNTPROC_NULL, &()).await?;
        Ok(())
    }

    /// Obtains the root filehandle for `path`. Version 3 additionally
    /// returns the auth flavors the server accepts; version 1 replies with
    /// a bare errno status and a fixed 32-byte handle.
    pub async fn mnt(&mut self, path: &[u8]) -> Result<(Vec<u8>, Vec<u32>), Error> {
        let args = path.to_vec();
        let mut body = self.call(MountProc::MOUNTPROC_MNT, &args).await?;
        match self.version {
            MountVersion::V3 => {
                let status: mountstat3 = Self::decode(&mut body)?;
                if status != mountstat3::MNT3_OK {
                    return Err(status.into());
                }
                let res: mountres3_ok = Self::decode(&mut body)?;
                info!(path = %String::from_utf8_lossy(path), "mounted export (v3)");
                Ok((res.fhandle, res.auth_flavors))
            }
            MountVersion::V1 => {
                let status: u32 = Self::decode(&mut body)?;
                if status != 0 {
                    return Err(v1_status(status).into());
                }
                let fh: mount::fhandle1 = Self::decode(&mut body)?;
                info!(path = %String::from_utf8_lossy(path), "mounted export (v1)");
                Ok((fh.to_vec(), Vec::new()))
            }
        }
    }

    /// Drops the server's record of this client mounting `path`. The
    /// filehandle from MNT keeps working regardless; mountd only keeps the
    /// books.
    pub async fn umnt(&mut self, path: &[u8]) -> Result<(), Error> {
        let args = path.to_vec();
        self.call(MountProc::MOUNTPROC_UMNT, &args).await?;
        debug!(path = %String::from_utf8_lossy(path), "unmounted export");
        Ok(())
    }

    /// Lists the server's exports with their allowed client groups.
    pub async fn export(&mut self) -> Result<exports, Error> {
        let mut body = self.call(MountProc::MOUNTPROC_EXPORT, &()).await?;
        Self::decode(&mut body)
    }

    /// Lists the mount records the server currently holds.
    pub async fn dump(&mut self) -> Result<mount_list, Error> {
        let mut body = self.call(MountProc::MOUNTPROC_DUMP, &()).await?;
        Self::decode(&mut body)
    }
}

/// Version 1 MNT statuses are plain errnos drawn from the same set v3
/// formalized; unknown values collapse to a server fault.
fn v1_status(status: u32) -> mountstat3 {
    use num_traits::cast::FromPrimitive;
    mountstat3::from_u32(status).unwrap_or(mountstat3::MNT3ERR_SERVERFAULT)
}
