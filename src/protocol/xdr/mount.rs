//! Mount protocol wire structures, versions 1 (RFC 1094 Appendix A) and 3
//! (RFC 1813 Appendix I).
//!
//! MNT hands out the root filehandle of an export. Version 1 returns a fixed
//! 32-byte handle, version 3 a variable handle plus the list of accepted
//! auth flavors. EXPORT and DUMP return XDR-linked lists that are decoded
//! here into plain vectors.

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::cast::FromPrimitive;

use super::*;

/// Mount RPC program number.
pub const PROGRAM: u32 = 100005;
/// Mount protocol version paired with NFS v2.
pub const VERSION1: u32 = 1;
/// Mount protocol version paired with NFS v3.
pub const VERSION3: u32 = 3;

/// Fixed handle size of mount/NFS version 1/2.
pub const FHSIZE: usize = 32;
/// Maximum handle size of mount/NFS version 3.
pub const FHSIZE3: usize = 64;
/// Maximum bytes in a path name.
pub const MNTPATHLEN: usize = 1024;
/// Maximum bytes in a host name.
pub const MNTNAMLEN: usize = 255;

/// Directory path on the server.
pub type dirpath = Vec<u8>;
/// Version 1 filehandle, fixed size.
pub type fhandle1 = [u8; FHSIZE];
/// Version 3 filehandle, variable size.
pub type fhandle3 = Vec<u8>;

/// Status codes shared by both mount versions; version 1 servers answer with
/// plain errno values out of the same set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum mountstat3 {
    MNT3_OK = 0,
    MNT3ERR_PERM = 1,
    MNT3ERR_NOENT = 2,
    MNT3ERR_IO = 5,
    MNT3ERR_ACCES = 13,
    MNT3ERR_NOTDIR = 20,
    MNT3ERR_INVAL = 22,
    MNT3ERR_NAMETOOLONG = 63,
    MNT3ERR_NOTSUPP = 10004,
    MNT3ERR_SERVERFAULT = 10006,
}
SerializeEnum!(mountstat3);
DeserializeEnum!(mountstat3);

impl Default for mountstat3 {
    fn default() -> Self {
        mountstat3::MNT3_OK
    }
}

/// Successful MNT result, version 3.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct mountres3_ok {
    pub fhandle: fhandle3,
    pub auth_flavors: Vec<u32>,
}
SerializeStruct!(mountres3_ok, fhandle, auth_flavors);
DeserializeStruct!(mountres3_ok, fhandle, auth_flavors);

/// Mount procedure numbers, identical across versions 1 and 3.
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum MountProc {
    MOUNTPROC_NULL = 0,
    MOUNTPROC_MNT = 1,
    MOUNTPROC_DUMP = 2,
    MOUNTPROC_UMNT = 3,
    MOUNTPROC_UMNTALL = 4,
    MOUNTPROC_EXPORT = 5,
}
SerializeEnum!(MountProc);
DeserializeEnum!(MountProc);

/// One export advertised by the server: directory and the groups allowed to
/// mount it.
#[derive(Clone, Debug, Default)]
pub struct export_node {
    pub dir: dirpath,
    pub groups: Vec<Vec<u8>>,
}

/// EXPORT result: an XDR-linked list of [`export_node`] flattened to a
/// vector. Each entry and each group is prefixed by a `present` bool; a
/// false bool terminates the respective list.
#[derive(Clone, Debug, Default)]
pub struct exports {
    pub entries: Vec<export_node>,
}

impl Deserialize for exports {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.entries.clear();
        while deserialize::<bool>(src)? {
            let dir: dirpath = deserialize(src)?;
            let mut groups = Vec::new();
            while deserialize::<bool>(src)? {
                groups.push(deserialize::<Vec<u8>>(src)?);
            }
            self.entries.push(export_node { dir, groups });
        }
        Ok(())
    }
}

impl Serialize for exports {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for node in &self.entries {
            true.serialize(dest)?;
            node.dir.serialize(dest)?;
            for group in &node.groups {
                true.serialize(dest)?;
                group.serialize(dest)?;
            }
            false.serialize(dest)?;
        }
        false.serialize(dest)
    }
}

/// One active mount record from DUMP.
#[derive(Clone, Debug, Default)]
pub struct mount_body {
    pub hostname: Vec<u8>,
    pub directory: dirpath,
}
SerializeStruct!(mount_body, hostname, directory);
DeserializeStruct!(mount_body, hostname, directory);

/// DUMP result: the server's mount table as a flattened XDR-linked list.
#[derive(Clone, Debug, Default)]
pub struct mount_list {
    pub entries: Vec<mount_body>,
}

impl Deserialize for mount_list {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.entries.clear();
        while deserialize::<bool>(src)? {
            self.entries.push(deserialize::<mount_body>(src)?);
        }
        Ok(())
    }
}

impl Serialize for mount_list {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            true.serialize(dest)?;
            entry.serialize(dest)?;
        }
        false.serialize(dest)
    }
}
