//! NFS version 3 wire types per RFC 1813.
//!
//! Contains the basic data types shared by every procedure: filehandles,
//! attributes, set-attributes, weak cache consistency wrappers, and the
//! status and procedure-number enums. Per-procedure argument and result
//! bodies live in the [`dir`], [`file`] and [`fs`] submodules.
//!
//! Results on the wire start with an [`nfsstat3`]; the body that follows
//! differs between the OK and failure arms, so the client decodes the status
//! first and then picks the matching body type.

#![allow(non_camel_case_types)]

use std::fmt;
use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::cast::FromPrimitive;

use super::*;

pub mod dir;
pub mod file;
pub mod fs;

/// NFS RPC program number.
pub const PROGRAM: u32 = 100003;
/// Protocol version of this module.
pub const VERSION: u32 = 3;

/// Maximum size in bytes of an opaque filehandle.
pub const NFS3_FHSIZE: usize = 64;
/// Size in bytes of the READDIR cookie verifier.
pub const NFS3_COOKIEVERFSIZE: usize = 8;
/// Size in bytes of the exclusive-CREATE verifier.
pub const NFS3_CREATEVERFSIZE: usize = 8;
/// Size in bytes of the asynchronous WRITE verifier.
pub const NFS3_WRITEVERFSIZE: usize = 8;

/// Byte string used for filenames and symlink targets. Not interpreted as
/// UTF-8 anywhere in the protocol.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct nfsstring(pub Vec<u8>);

impl nfsstring {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for nfsstring {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for nfsstring {
    fn from(value: &[u8]) -> Self {
        Self(value.into())
    }
}

impl From<&str> for nfsstring {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().into())
    }
}

impl AsRef<[u8]> for nfsstring {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Deref for nfsstring {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for nfsstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for nfsstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for nfsstring {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.0.serialize(dest)
    }
}

impl Deserialize for nfsstring {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.0.deserialize(src)
    }
}

/// Procedure numbers for NFS version 3.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum NfsProc3 {
    NFSPROC3_NULL = 0,
    NFSPROC3_GETATTR = 1,
    NFSPROC3_SETATTR = 2,
    NFSPROC3_LOOKUP = 3,
    NFSPROC3_ACCESS = 4,
    NFSPROC3_READLINK = 5,
    NFSPROC3_READ = 6,
    NFSPROC3_WRITE = 7,
    NFSPROC3_CREATE = 8,
    NFSPROC3_MKDIR = 9,
    NFSPROC3_SYMLINK = 10,
    NFSPROC3_MKNOD = 11,
    NFSPROC3_REMOVE = 12,
    NFSPROC3_RMDIR = 13,
    NFSPROC3_RENAME = 14,
    NFSPROC3_LINK = 15,
    NFSPROC3_READDIR = 16,
    NFSPROC3_READDIRPLUS = 17,
    NFSPROC3_FSSTAT = 18,
    NFSPROC3_FSINFO = 19,
    NFSPROC3_PATHCONF = 20,
    NFSPROC3_COMMIT = 21,
}
SerializeEnum!(NfsProc3);
DeserializeEnum!(NfsProc3);

pub type filename3 = nfsstring;
pub type nfspath3 = nfsstring;
pub type fileid3 = u64;
pub type cookie3 = u64;
pub type cookieverf3 = [u8; NFS3_COOKIEVERFSIZE];
pub type createverf3 = [u8; NFS3_CREATEVERFSIZE];
pub type writeverf3 = [u8; NFS3_WRITEVERFSIZE];
pub type uid3 = u32;
pub type gid3 = u32;
pub type size3 = u64;
pub type offset3 = u64;
pub type mode3 = u32;
pub type count3 = u32;

/// Status codes returned by every NFS version 3 procedure.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum nfsstat3 {
    #[default]
    NFS3_OK = 0,
    NFS3ERR_PERM = 1,
    NFS3ERR_NOENT = 2,
    NFS3ERR_IO = 5,
    NFS3ERR_NXIO = 6,
    NFS3ERR_ACCES = 13,
    NFS3ERR_EXIST = 17,
    NFS3ERR_XDEV = 18,
    NFS3ERR_NODEV = 19,
    NFS3ERR_NOTDIR = 20,
    NFS3ERR_ISDIR = 21,
    NFS3ERR_INVAL = 22,
    NFS3ERR_FBIG = 27,
    NFS3ERR_NOSPC = 28,
    NFS3ERR_ROFS = 30,
    NFS3ERR_MLINK = 31,
    NFS3ERR_NAMETOOLONG = 63,
    NFS3ERR_NOTEMPTY = 66,
    NFS3ERR_DQUOT = 69,
    NFS3ERR_STALE = 70,
    NFS3ERR_REMOTE = 71,
    NFS3ERR_BADHANDLE = 10001,
    NFS3ERR_NOT_SYNC = 10002,
    NFS3ERR_BAD_COOKIE = 10003,
    NFS3ERR_NOTSUPP = 10004,
    NFS3ERR_TOOSMALL = 10005,
    NFS3ERR_SERVERFAULT = 10006,
    NFS3ERR_BADTYPE = 10007,
    NFS3ERR_JUKEBOX = 10008,
}
SerializeEnum!(nfsstat3);
DeserializeEnum!(nfsstat3);

/// File type of a filesystem object.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ftype3 {
    #[default]
    NF3REG = 1,
    NF3DIR = 2,
    NF3BLK = 3,
    NF3CHR = 4,
    NF3LNK = 5,
    NF3SOCK = 6,
    NF3FIFO = 7,
}
SerializeEnum!(ftype3);
DeserializeEnum!(ftype3);

/// Major and minor numbers of a special device.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct specdata3 {
    pub specdata1: u32,
    pub specdata2: u32,
}
SerializeStruct!(specdata3, specdata1, specdata2);
DeserializeStruct!(specdata3, specdata1, specdata2);

/// Opaque server-assigned identity of a filesystem object. Compared
/// byte-wise; the client never looks inside.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct nfs_fh3 {
    pub data: Vec<u8>,
}
SerializeStruct!(nfs_fh3, data);
DeserializeStruct!(nfs_fh3, data);

/// Seconds and nanoseconds since the epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct nfstime3 {
    pub seconds: u32,
    pub nseconds: u32,
}
SerializeStruct!(nfstime3, seconds, nseconds);
DeserializeStruct!(nfstime3, seconds, nseconds);

impl From<nfstime3> for filetime::FileTime {
    fn from(time: nfstime3) -> Self {
        filetime::FileTime::from_unix_time(i64::from(time.seconds), time.nseconds)
    }
}

impl From<filetime::FileTime> for nfstime3 {
    fn from(time: filetime::FileTime) -> Self {
        nfstime3 { seconds: time.unix_seconds() as u32, nseconds: time.nanoseconds() }
    }
}

/// Full attribute set of a filesystem object.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct fattr3 {
    pub ftype: ftype3,
    pub mode: mode3,
    pub nlink: u32,
    pub uid: uid3,
    pub gid: gid3,
    pub size: size3,
    pub used: size3,
    pub rdev: specdata3,
    pub fsid: u64,
    pub fileid: fileid3,
    pub atime: nfstime3,
    pub mtime: nfstime3,
    pub ctime: nfstime3,
}
SerializeStruct!(
    fattr3, ftype, mode, nlink, uid, gid, size, used, rdev, fsid, fileid, atime, mtime, ctime
);
DeserializeStruct!(
    fattr3, ftype, mode, nlink, uid, gid, size, used, rdev, fsid, fileid, atime, mtime, ctime
);

/// The subset of attributes servers return as the "before" half of weak
/// cache consistency data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct wcc_attr {
    pub size: size3,
    pub mtime: nfstime3,
    pub ctime: nfstime3,
}
SerializeStruct!(wcc_attr, size, mtime, ctime);
DeserializeStruct!(wcc_attr, size, mtime, ctime);

/// Pre-operation attributes, optionally present.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum pre_op_attr {
    #[default]
    Void,
    attributes(wcc_attr),
}
SerializeBoolUnion!(pre_op_attr, attributes, wcc_attr);
DeserializeBoolUnion!(pre_op_attr, attributes, wcc_attr);

/// Post-operation attributes, optionally present. Returned by nearly every
/// procedure; the handle cache feeds on these.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum post_op_attr {
    #[default]
    Void,
    attributes(fattr3),
}
SerializeBoolUnion!(post_op_attr, attributes, fattr3);
DeserializeBoolUnion!(post_op_attr, attributes, fattr3);

impl post_op_attr {
    pub fn into_option(self) -> Option<fattr3> {
        match self {
            post_op_attr::Void => None,
            post_op_attr::attributes(attr) => Some(attr),
        }
    }
}

/// Attributes straddling a mutating operation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct wcc_data {
    pub before: pre_op_attr,
    pub after: post_op_attr,
}
SerializeStruct!(wcc_data, before, after);
DeserializeStruct!(wcc_data, before, after);

/// Optional filehandle in create-style results.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum post_op_fh3 {
    #[default]
    Void,
    handle(nfs_fh3),
}
SerializeBoolUnion!(post_op_fh3, handle, nfs_fh3);
DeserializeBoolUnion!(post_op_fh3, handle, nfs_fh3);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum set_mode3 {
    #[default]
    Void,
    mode(mode3),
}
SerializeBoolUnion!(set_mode3, mode, mode3);
DeserializeBoolUnion!(set_mode3, mode, mode3);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum set_uid3 {
    #[default]
    Void,
    uid(uid3),
}
SerializeBoolUnion!(set_uid3, uid, uid3);
DeserializeBoolUnion!(set_uid3, uid, uid3);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum set_gid3 {
    #[default]
    Void,
    gid(gid3),
}
SerializeBoolUnion!(set_gid3, gid, gid3);
DeserializeBoolUnion!(set_gid3, gid, gid3);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum set_size3 {
    #[default]
    Void,
    size(size3),
}
SerializeBoolUnion!(set_size3, size, size3);
DeserializeBoolUnion!(set_size3, size, size3);

/// Time disposition in SETATTR: leave alone, stamp with the server clock, or
/// set to a client-supplied value. Wire discriminants are 0, 1, 2.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum set_atime {
    #[default]
    DONT_CHANGE,
    SET_TO_SERVER_TIME,
    SET_TO_CLIENT_TIME(nfstime3),
}

impl Serialize for set_atime {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            set_atime::DONT_CHANGE => 0_u32.serialize(dest),
            set_atime::SET_TO_SERVER_TIME => 1_u32.serialize(dest),
            set_atime::SET_TO_CLIENT_TIME(v) => {
                2_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for set_atime {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = set_atime::DONT_CHANGE,
            1 => *self = set_atime::SET_TO_SERVER_TIME,
            2 => *self = set_atime::SET_TO_CLIENT_TIME(deserialize(src)?),
            c => return Err(invalid_data(format!("invalid set_atime value: {c}"))),
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum set_mtime {
    #[default]
    DONT_CHANGE,
    SET_TO_SERVER_TIME,
    SET_TO_CLIENT_TIME(nfstime3),
}

impl Serialize for set_mtime {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            set_mtime::DONT_CHANGE => 0_u32.serialize(dest),
            set_mtime::SET_TO_SERVER_TIME => 1_u32.serialize(dest),
            set_mtime::SET_TO_CLIENT_TIME(v) => {
                2_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for set_mtime {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = set_mtime::DONT_CHANGE,
            1 => *self = set_mtime::SET_TO_SERVER_TIME,
            2 => *self = set_mtime::SET_TO_CLIENT_TIME(deserialize(src)?),
            c => return Err(invalid_data(format!("invalid set_mtime value: {c}"))),
        }
        Ok(())
    }
}

/// Attributes to change in SETATTR, CREATE, MKDIR, SYMLINK and MKNOD; every
/// field is individually optional.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct sattr3 {
    pub mode: set_mode3,
    pub uid: set_uid3,
    pub gid: set_gid3,
    pub size: set_size3,
    pub atime: set_atime,
    pub mtime: set_mtime,
}
SerializeStruct!(sattr3, mode, uid, gid, size, atime, mtime);
DeserializeStruct!(sattr3, mode, uid, gid, size, atime, mtime);

/// The SETATTR guard: when present, the server rejects the call unless the
/// object's ctime still equals the supplied value. Encoded as a bool followed
/// by an [`nfstime3`] when true.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum sattrguard3 {
    #[default]
    Void,
    obj_ctime(nfstime3),
}
SerializeBoolUnion!(sattrguard3, obj_ctime, nfstime3);
DeserializeBoolUnion!(sattrguard3, obj_ctime, nfstime3);

/// Directory handle plus name, the argument shape shared by LOOKUP, REMOVE
/// and RMDIR and embedded in every create-style call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct diropargs3 {
    pub dir: nfs_fh3,
    pub name: filename3,
}
SerializeStruct!(diropargs3, dir, name);
DeserializeStruct!(diropargs3, dir, name);

/// SETATTR arguments.
#[derive(Clone, Debug, Default)]
pub struct SETATTR3args {
    pub object: nfs_fh3,
    pub new_attributes: sattr3,
    pub guard: sattrguard3,
}
SerializeStruct!(SETATTR3args, object, new_attributes, guard);
DeserializeStruct!(SETATTR3args, object, new_attributes, guard);
