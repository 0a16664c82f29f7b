//! Typed clients for the three RPC programs the mount sequence touches:
//! portmap to find ports, mount to obtain the export's root filehandle, and
//! NFS for everything after.

pub mod attr;
pub mod mount;
pub mod nfs;
pub mod portmap;

pub use attr::{
    DirEntry, DirEntryPlus, Fattr, FileHandle, FileType, FsInfo, FsStats, PathConf, SetAttr,
    SetTime,
};
pub use mount::{MountClient, MountVersion};
pub use nfs::{NfsClient, Version};
