//! Portmap (rpcbind v2) wire structures per RFC 1833.
//!
//! The portmapper maps an RPC `(program, version, protocol)` triple to the
//! port the service listens on. This client only issues GETPORT.

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::cast::FromPrimitive;

use super::*;

/// Portmap RPC program number.
pub const PROGRAM: u32 = 100000;
/// Portmap RPC version.
pub const VERSION: u32 = 2;
/// Well-known portmapper port.
pub const PORT: u16 = 111;

/// Protocol number for TCP, as used in the `prot` field.
pub const IPPROTO_TCP: u32 = 6;
/// Protocol number for UDP.
pub const IPPROTO_UDP: u32 = 17;

/// A program-to-port mapping; GETPORT sends one with `port = 0` and receives
/// the bare port number in return.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct mapping {
    pub prog: u32,
    pub vers: u32,
    pub prot: u32,
    pub port: u32,
}
SerializeStruct!(mapping, prog, vers, prot, port);
DeserializeStruct!(mapping, prog, vers, prot, port);

/// Portmap procedure numbers.
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum PortmapProc {
    PMAPPROC_NULL = 0,
    PMAPPROC_SET = 1,
    PMAPPROC_UNSET = 2,
    PMAPPROC_GETPORT = 3,
    PMAPPROC_DUMP = 4,
    PMAPPROC_CALLIT = 5,
}
SerializeEnum!(PortmapProc);
DeserializeEnum!(PortmapProc);
