//! nfs-shade: an NFS v2/v3 client that forges its identity per call.
//!
//! The client mounts a remote export over the classic RPC protocol suite
//! (portmap, mount, NFS) and exposes a path-based filesystem surface meant
//! to sit behind a FUSE bridge. Its defining behavior is credential
//! spoofing: before every remote procedure call the AUTH_UNIX credential is
//! rewritten to claim the uid/gid of the object the call is about to touch,
//! so servers that trust AUTH_UNIX authorize each operation as if the
//! legitimate owner had issued it.
//!
//! ## Layers
//!
//! - `protocol::xdr`: wire types for RPC, portmap, mount, NFS v2 and v3.
//! - `rpc`: credential forging, UDP/TCP transports, call/reply correlation.
//! - `client`: typed portmap, mount and NFS procedure wrappers.
//! - `cache`: the pathname → filehandle cache (LRU plus TTL).
//! - `shade`: the filesystem operation layer a FUSE bridge drives.
//!
//! ## Standards
//!
//! - RFC 4506: XDR: External Data Representation Standard
//! - RFC 5531: RPC: Remote Procedure Call Protocol Specification Version 2
//! - RFC 1833: Binding Protocols for ONC RPC Version 2
//! - RFC 1094: NFS: Network File System Protocol Specification (version 2)
//! - RFC 1813: NFS Version 3 Protocol Specification
//!
//! The client does not enforce any access control of its own, caches no file
//! data (only handles and attributes), and speaks neither NFSv4 nor the
//! locking sideband protocols.

pub mod cache;
pub mod client;
pub mod errors;
pub mod protocol;
pub mod rpc;
pub mod shade;

pub use protocol::xdr;
