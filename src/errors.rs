//! Error taxonomy of the client.
//!
//! Three strata, mirroring where a failure is detected:
//!
//! - [`RpcError`]: the transport or the RPC envelope failed. These never
//!   carry filesystem meaning; at the filesystem boundary they become `EIO`.
//! - Protocol statuses: a well-formed reply carried a non-OK
//!   [`nfsstat3`]/[`mountstat3`]. Mapped to POSIX errnos by a fixed table.
//! - Local errors: conditions detected without touching the network
//!   (mis-typed operation, bad configuration), already carrying their errno.

use thiserror::Error;

use crate::protocol::xdr::mount::mountstat3;
use crate::protocol::xdr::nfs2::nfsstat2;
use crate::protocol::xdr::nfs3::nfsstat3;
use crate::protocol::xdr::rpc::auth_stat;

/// Failure of the RPC machinery itself, before any NFS status is available.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed reply: {0}")]
    Decode(std::io::Error),

    #[error("no reply within the retransmission budget")]
    Timeout,

    #[error("reply xid {got} does not match call xid {want}")]
    XidMismatch { want: u32, got: u32 },

    #[error("server denied the call: rpc version mismatch ({low}..={high})")]
    RpcMismatch { low: u32, high: u32 },

    #[error("server rejected the credential: {0:?}")]
    Auth(auth_stat),

    #[error("program not available on server")]
    ProgUnavail,

    #[error("program version mismatch (server supports {low}..={high})")]
    ProgMismatch { low: u32, high: u32 },

    #[error("procedure not available")]
    ProcUnavail,

    #[error("server could not decode the call arguments")]
    GarbageArgs,

    #[error("program not registered with the portmapper")]
    NotRegistered,
}

/// Any failure surfaced by the filesystem layer. `errno` flattens it to the
/// single integer the kernel bridge wants.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("nfs error {0:?}")]
    Nfs(nfsstat3),

    #[error("mount error {0:?}")]
    Mount(mountstat3),

    #[error("errno {0}")]
    Errno(i32),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// The POSIX errno this failure maps to.
    pub fn errno(&self) -> i32 {
        match self {
            Error::Rpc(_) => libc::EIO,
            Error::Nfs(status) => nfs_errno(*status),
            Error::Mount(status) => mount_errno(*status),
            Error::Errno(no) => *no,
            Error::Config(_) => libc::EINVAL,
        }
    }

    /// True when the server declared a filehandle stale; the resolver
    /// recovers from this by re-resolving once.
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::Nfs(nfsstat3::NFS3ERR_STALE))
    }

    /// True for a permission failure; RENAME retries these once under the
    /// destination directory's identity.
    pub fn is_acces(&self) -> bool {
        matches!(self, Error::Nfs(nfsstat3::NFS3ERR_ACCES))
    }
}

impl From<nfsstat3> for Error {
    fn from(status: nfsstat3) -> Self {
        Error::Nfs(status)
    }
}

/// Version 2 statuses fold into the v3 value space they share; the one code
/// v3 dropped (WFLUSH) degrades to a server fault.
impl From<nfsstat2> for Error {
    fn from(status: nfsstat2) -> Self {
        use num_traits::cast::FromPrimitive;
        match nfsstat3::from_u32(status as u32) {
            Some(v3) => Error::Nfs(v3),
            None => Error::Nfs(nfsstat3::NFS3ERR_SERVERFAULT),
        }
    }
}

impl From<mountstat3> for Error {
    fn from(status: mountstat3) -> Self {
        Error::Mount(status)
    }
}

/// The fixed nfsstat3 → errno table.
fn nfs_errno(status: nfsstat3) -> i32 {
    use nfsstat3::*;
    match status {
        NFS3_OK => 0,
        NFS3ERR_PERM => libc::EPERM,
        NFS3ERR_NOENT => libc::ENOENT,
        NFS3ERR_IO => libc::EIO,
        NFS3ERR_NXIO => libc::ENXIO,
        NFS3ERR_ACCES => libc::EACCES,
        NFS3ERR_EXIST => libc::EEXIST,
        NFS3ERR_XDEV => libc::EXDEV,
        NFS3ERR_NODEV => libc::ENODEV,
        NFS3ERR_NOTDIR => libc::ENOTDIR,
        NFS3ERR_ISDIR => libc::EISDIR,
        NFS3ERR_INVAL => libc::EINVAL,
        NFS3ERR_FBIG => libc::EFBIG,
        NFS3ERR_NOSPC => libc::ENOSPC,
        NFS3ERR_ROFS => libc::EROFS,
        NFS3ERR_MLINK => libc::EMLINK,
        NFS3ERR_NAMETOOLONG => libc::ENAMETOOLONG,
        NFS3ERR_NOTEMPTY => libc::ENOTEMPTY,
        NFS3ERR_DQUOT => libc::EDQUOT,
        NFS3ERR_STALE => libc::ESTALE,
        NFS3ERR_REMOTE => libc::EREMOTE,
        NFS3ERR_BADHANDLE => libc::ESTALE,
        NFS3ERR_NOT_SYNC => libc::EIO,
        NFS3ERR_BAD_COOKIE => libc::EINVAL,
        NFS3ERR_NOTSUPP => libc::ENOSYS,
        NFS3ERR_TOOSMALL => libc::EINVAL,
        NFS3ERR_SERVERFAULT => libc::EIO,
        NFS3ERR_BADTYPE => libc::EINVAL,
        NFS3ERR_JUKEBOX => libc::EAGAIN,
    }
}

fn mount_errno(status: mountstat3) -> i32 {
    use mountstat3::*;
    match status {
        MNT3_OK => 0,
        MNT3ERR_PERM => libc::EPERM,
        MNT3ERR_NOENT => libc::ENOENT,
        MNT3ERR_IO => libc::EIO,
        MNT3ERR_ACCES => libc::EACCES,
        MNT3ERR_NOTDIR => libc::ENOTDIR,
        MNT3ERR_INVAL => libc::EINVAL,
        MNT3ERR_NAMETOOLONG => libc::ENAMETOOLONG,
        MNT3ERR_NOTSUPP => libc::ENOSYS,
        MNT3ERR_SERVERFAULT => libc::EIO,
    }
}
