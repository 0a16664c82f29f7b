//! Filesystem-wide bodies: ACCESS, FSSTAT, FSINFO and PATHCONF.

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use super::*;

/// ACCESS request bit: read data or read directory.
pub const ACCESS3_READ: u32 = 0x0001;
/// Lookup a name in a directory.
pub const ACCESS3_LOOKUP: u32 = 0x0002;
/// Rewrite existing file data or modify directory entries.
pub const ACCESS3_MODIFY: u32 = 0x0004;
/// Append to file or add directory entries.
pub const ACCESS3_EXTEND: u32 = 0x0008;
/// Delete a directory entry.
pub const ACCESS3_DELETE: u32 = 0x0010;
/// Execute a file or traverse a directory.
pub const ACCESS3_EXECUTE: u32 = 0x0020;

/// The filesystem supports hard links.
pub const FSF_LINK: u32 = 0x0001;
/// The filesystem supports symbolic links.
pub const FSF_SYMLINK: u32 = 0x0002;
/// PATHCONF results apply to every object in the filesystem.
pub const FSF_HOMOGENEOUS: u32 = 0x0008;
/// SETATTR can set times.
pub const FSF_CANSETTIME: u32 = 0x0010;

/// ACCESS arguments: handle plus requested permission bits.
#[derive(Clone, Debug, Default)]
pub struct ACCESS3args {
    pub object: nfs_fh3,
    pub access: u32,
}
SerializeStruct!(ACCESS3args, object, access);
DeserializeStruct!(ACCESS3args, object, access);

/// ACCESS success body: the subset of requested bits the server grants.
#[derive(Clone, Debug, Default)]
pub struct ACCESS3resok {
    pub obj_attributes: post_op_attr,
    pub access: u32,
}
SerializeStruct!(ACCESS3resok, obj_attributes, access);
DeserializeStruct!(ACCESS3resok, obj_attributes, access);

/// READLINK success body.
#[derive(Clone, Debug, Default)]
pub struct READLINK3resok {
    pub symlink_attributes: post_op_attr,
    pub data: nfspath3,
}
SerializeStruct!(READLINK3resok, symlink_attributes, data);
DeserializeStruct!(READLINK3resok, symlink_attributes, data);

/// FSSTAT success body: volatile filesystem statistics in bytes and slots.
#[derive(Clone, Debug, Default)]
pub struct FSSTAT3resok {
    pub obj_attributes: post_op_attr,
    pub tbytes: size3,
    pub fbytes: size3,
    pub abytes: size3,
    pub tfiles: size3,
    pub ffiles: size3,
    pub afiles: size3,
    pub invarsec: u32,
}
SerializeStruct!(
    FSSTAT3resok, obj_attributes, tbytes, fbytes, abytes, tfiles, ffiles, afiles, invarsec
);
DeserializeStruct!(
    FSSTAT3resok, obj_attributes, tbytes, fbytes, abytes, tfiles, ffiles, afiles, invarsec
);

/// FSINFO success body: static filesystem information, notably the transfer
/// size limits the read/write chunking derives from.
#[derive(Clone, Debug, Default)]
pub struct FSINFO3resok {
    pub obj_attributes: post_op_attr,
    pub rtmax: u32,
    pub rtpref: u32,
    pub rtmult: u32,
    pub wtmax: u32,
    pub wtpref: u32,
    pub wtmult: u32,
    pub dtpref: u32,
    pub maxfilesize: size3,
    pub time_delta: nfstime3,
    pub properties: u32,
}
SerializeStruct!(
    FSINFO3resok,
    obj_attributes,
    rtmax,
    rtpref,
    rtmult,
    wtmax,
    wtpref,
    wtmult,
    dtpref,
    maxfilesize,
    time_delta,
    properties
);
DeserializeStruct!(
    FSINFO3resok,
    obj_attributes,
    rtmax,
    rtpref,
    rtmult,
    wtmax,
    wtpref,
    wtmult,
    dtpref,
    maxfilesize,
    time_delta,
    properties
);

/// PATHCONF success body.
#[derive(Clone, Debug, Default)]
pub struct PATHCONF3resok {
    pub obj_attributes: post_op_attr,
    pub linkmax: u32,
    pub name_max: u32,
    pub no_trunc: bool,
    pub chown_restricted: bool,
    pub case_insensitive: bool,
    pub case_preserving: bool,
}
SerializeStruct!(
    PATHCONF3resok,
    obj_attributes,
    linkmax,
    name_max,
    no_trunc,
    chown_restricted,
    case_insensitive,
    case_preserving
);
DeserializeStruct!(
    PATHCONF3resok,
    obj_attributes,
    linkmax,
    name_max,
    no_trunc,
    chown_restricted,
    case_insensitive,
    case_preserving
);
