//! NFS version 2 wire types per RFC 1094.
//!
//! Version 2 predates the v3 refinements: filehandles are fixed 32 bytes,
//! sizes and offsets are 32-bit, timestamps carry microseconds, and there are
//! no weak-cache-consistency wrappers. Set-attributes use the all-ones
//! sentinel instead of per-field booleans. Procedure numbers overlap v3 but
//! are not identical (LOOKUP is 4 here, 3 in v3).

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::cast::FromPrimitive;

use super::nfs3::nfsstring;
use super::*;

/// NFS RPC program number (shared with v3).
pub const PROGRAM: u32 = 100003;
/// Protocol version of this module.
pub const VERSION: u32 = 2;

/// Fixed size of a version 2 filehandle.
pub const FHSIZE: usize = 32;
/// Maximum data payload of a single READ or WRITE.
pub const MAXDATA: usize = 8192;

/// The sentinel meaning "do not change" in [`sattr2`] fields.
pub const SATTR2_DONT_CHANGE: u32 = u32::MAX;

/// Version 2 filehandle: fixed 32-byte opaque.
pub type fhandle2 = [u8; FHSIZE];

/// Procedure numbers for NFS version 2.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum NfsProc2 {
    NFSPROC_NULL = 0,
    NFSPROC_GETATTR = 1,
    NFSPROC_SETATTR = 2,
    NFSPROC_ROOT = 3,
    NFSPROC_LOOKUP = 4,
    NFSPROC_READLINK = 5,
    NFSPROC_READ = 6,
    NFSPROC_WRITECACHE = 7,
    NFSPROC_WRITE = 8,
    NFSPROC_CREATE = 9,
    NFSPROC_REMOVE = 10,
    NFSPROC_RENAME = 11,
    NFSPROC_LINK = 12,
    NFSPROC_SYMLINK = 13,
    NFSPROC_MKDIR = 14,
    NFSPROC_RMDIR = 15,
    NFSPROC_READDIR = 16,
    NFSPROC_STATFS = 17,
}
SerializeEnum!(NfsProc2);
DeserializeEnum!(NfsProc2);

/// Status codes returned by version 2 procedures. The numeric values are the
/// server's native errnos, which v3 kept for the codes both versions share.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum nfsstat2 {
    #[default]
    NFS_OK = 0,
    NFSERR_PERM = 1,
    NFSERR_NOENT = 2,
    NFSERR_IO = 5,
    NFSERR_NXIO = 6,
    NFSERR_ACCES = 13,
    NFSERR_EXIST = 17,
    NFSERR_NODEV = 19,
    NFSERR_NOTDIR = 20,
    NFSERR_ISDIR = 21,
    NFSERR_FBIG = 27,
    NFSERR_NOSPC = 28,
    NFSERR_ROFS = 30,
    NFSERR_NAMETOOLONG = 63,
    NFSERR_NOTEMPTY = 66,
    NFSERR_DQUOT = 69,
    NFSERR_STALE = 70,
    NFSERR_WFLUSH = 99,
}
SerializeEnum!(nfsstat2);
DeserializeEnum!(nfsstat2);

/// File type of a version 2 object. NFNON covers everything v2 cannot
/// express; sockets and fifos appear through mode bits instead.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ftype2 {
    #[default]
    NFNON = 0,
    NFREG = 1,
    NFDIR = 2,
    NFBLK = 3,
    NFCHR = 4,
    NFLNK = 5,
}
SerializeEnum!(ftype2);
DeserializeEnum!(ftype2);

/// Seconds and microseconds since the epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct timeval2 {
    pub seconds: u32,
    pub useconds: u32,
}
SerializeStruct!(timeval2, seconds, useconds);
DeserializeStruct!(timeval2, seconds, useconds);

/// Full attribute set of a version 2 object, 32-bit fields throughout.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct fattr2 {
    pub ftype: ftype2,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub blocksize: u32,
    pub rdev: u32,
    pub blocks: u32,
    pub fsid: u32,
    pub fileid: u32,
    pub atime: timeval2,
    pub mtime: timeval2,
    pub ctime: timeval2,
}
SerializeStruct!(
    fattr2, ftype, mode, nlink, uid, gid, size, blocksize, rdev, blocks, fsid, fileid, atime,
    mtime, ctime
);
DeserializeStruct!(
    fattr2, ftype, mode, nlink, uid, gid, size, blocksize, rdev, blocks, fsid, fileid, atime,
    mtime, ctime
);

/// Attributes to change; fields holding [`SATTR2_DONT_CHANGE`] (or a timeval
/// of all ones) are left alone by the server.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct sattr2 {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub atime: timeval2,
    pub mtime: timeval2,
}
SerializeStruct!(sattr2, mode, uid, gid, size, atime, mtime);
DeserializeStruct!(sattr2, mode, uid, gid, size, atime, mtime);

impl Default for sattr2 {
    /// The neutral set-attributes: every field says "do not change".
    fn default() -> Self {
        sattr2 {
            mode: SATTR2_DONT_CHANGE,
            uid: SATTR2_DONT_CHANGE,
            gid: SATTR2_DONT_CHANGE,
            size: SATTR2_DONT_CHANGE,
            atime: timeval2 { seconds: SATTR2_DONT_CHANGE, useconds: SATTR2_DONT_CHANGE },
            mtime: timeval2 { seconds: SATTR2_DONT_CHANGE, useconds: SATTR2_DONT_CHANGE },
        }
    }
}

/// Directory handle plus name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct diropargs2 {
    pub dir: fhandle2,
    pub name: nfsstring,
}
SerializeStruct!(diropargs2, dir, name);
DeserializeStruct!(diropargs2, dir, name);

/// Success body of LOOKUP, CREATE and MKDIR.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct diropres2_ok {
    pub file: fhandle2,
    pub attributes: fattr2,
}
SerializeStruct!(diropres2_ok, file, attributes);
DeserializeStruct!(diropres2_ok, file, attributes);

/// SETATTR arguments.
#[derive(Clone, Debug, Default)]
pub struct sattrargs2 {
    pub file: fhandle2,
    pub attributes: sattr2,
}
SerializeStruct!(sattrargs2, file, attributes);
DeserializeStruct!(sattrargs2, file, attributes);

/// READ arguments. `totalcount` is unused by servers and sent as zero.
#[derive(Clone, Debug, Default)]
pub struct readargs2 {
    pub file: fhandle2,
    pub offset: u32,
    pub count: u32,
    pub totalcount: u32,
}
SerializeStruct!(readargs2, file, offset, count, totalcount);
DeserializeStruct!(readargs2, file, offset, count, totalcount);

/// READ success body.
#[derive(Clone, Debug, Default)]
pub struct readres2_ok {
    pub attributes: fattr2,
    pub data: Vec<u8>,
}
SerializeStruct!(readres2_ok, attributes, data);
DeserializeStruct!(readres2_ok, attributes, data);

/// WRITE arguments. `beginoffset` and `totalcount` are vestigial and sent as
/// zero.
#[derive(Clone, Debug, Default)]
pub struct writeargs2 {
    pub file: fhandle2,
    pub beginoffset: u32,
    pub offset: u32,
    pub totalcount: u32,
    pub data: Vec<u8>,
}
SerializeStruct!(writeargs2, file, beginoffset, offset, totalcount, data);
DeserializeStruct!(writeargs2, file, beginoffset, offset, totalcount, data);

/// CREATE, MKDIR and the directory half of SYMLINK.
#[derive(Clone, Debug, Default)]
pub struct createargs2 {
    pub where_dir: diropargs2,
    pub attributes: sattr2,
}
SerializeStruct!(createargs2, where_dir, attributes);
DeserializeStruct!(createargs2, where_dir, attributes);

/// RENAME arguments.
#[derive(Clone, Debug, Default)]
pub struct renameargs2 {
    pub from: diropargs2,
    pub to: diropargs2,
}
SerializeStruct!(renameargs2, from, to);
DeserializeStruct!(renameargs2, from, to);

/// LINK arguments.
#[derive(Clone, Debug, Default)]
pub struct linkargs2 {
    pub from: fhandle2,
    pub to: diropargs2,
}
SerializeStruct!(linkargs2, from, to);
DeserializeStruct!(linkargs2, from, to);

/// SYMLINK arguments.
#[derive(Clone, Debug, Default)]
pub struct symlinkargs2 {
    pub from: diropargs2,
    pub to: nfsstring,
    pub attributes: sattr2,
}
SerializeStruct!(symlinkargs2, from, to, attributes);
DeserializeStruct!(symlinkargs2, from, to, attributes);

/// READDIR arguments. The cookie is opaque to the client and zero on the
/// first call.
#[derive(Clone, Debug, Default)]
pub struct readdirargs2 {
    pub dir: fhandle2,
    pub cookie: u32,
    pub count: u32,
}
SerializeStruct!(readdirargs2, dir, cookie, count);
DeserializeStruct!(readdirargs2, dir, cookie, count);

/// One READDIR entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct entry2 {
    pub fileid: u32,
    pub name: nfsstring,
    pub cookie: u32,
}
SerializeStruct!(entry2, fileid, name, cookie);
DeserializeStruct!(entry2, fileid, name, cookie);

/// READDIR success body: flattened XDR-linked entry list plus `eof`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct readdirres2_ok {
    pub entries: Vec<entry2>,
    pub eof: bool,
}

impl Serialize for readdirres2_ok {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            true.serialize(dest)?;
            entry.serialize(dest)?;
        }
        false.serialize(dest)?;
        self.eof.serialize(dest)
    }
}

impl Deserialize for readdirres2_ok {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.entries.clear();
        while deserialize::<bool>(src)? {
            self.entries.push(deserialize::<entry2>(src)?);
        }
        self.eof.deserialize(src)
    }
}

/// STATFS success body, all counts in units of `bsize` blocks except
/// `tsize`, the server's preferred transfer size.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct statfsres2_ok {
    pub tsize: u32,
    pub bsize: u32,
    pub blocks: u32,
    pub bfree: u32,
    pub bavail: u32,
}
SerializeStruct!(statfsres2_ok, tsize, bsize, blocks, bfree, bavail);
DeserializeStruct!(statfsres2_ok, tsize, bsize, blocks, bfree, bavail);
