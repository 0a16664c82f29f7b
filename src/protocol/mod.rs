//! Wire-format definitions for the protocol suite the client speaks.
//!
//! - `xdr`: External Data Representation (RFC 4506) primitives plus the
//!   message bodies of RPC (RFC 5531), portmap (RFC 1833), mount
//!   (RFC 1094 Appendix A / RFC 1813 Appendix I) and NFS versions 2 and 3
//!   (RFC 1094 / RFC 1813).
//!
//! Everything in here is passive data: the calling conventions, transports
//! and retry behavior live in [`crate::rpc`] and [`crate::client`].

pub mod xdr;
