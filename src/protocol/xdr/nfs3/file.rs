//! File I/O bodies: READ, WRITE, COMMIT and LINK.

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::cast::FromPrimitive;

use super::*;

/// READ arguments.
#[derive(Clone, Debug, Default)]
pub struct READ3args {
    pub file: nfs_fh3,
    pub offset: offset3,
    pub count: count3,
}
SerializeStruct!(READ3args, file, offset, count);
DeserializeStruct!(READ3args, file, offset, count);

/// READ success body. `count` may be short of the request; `eof` marks the
/// end of the file.
#[derive(Clone, Debug, Default)]
pub struct READ3resok {
    pub file_attributes: post_op_attr,
    pub count: count3,
    pub eof: bool,
    pub data: Vec<u8>,
}
SerializeStruct!(READ3resok, file_attributes, count, eof, data);
DeserializeStruct!(READ3resok, file_attributes, count, eof, data);

/// Durability the server must provide before answering a WRITE.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum stable_how {
    UNSTABLE = 0,
    #[default]
    DATA_SYNC = 1,
    FILE_SYNC = 2,
}
SerializeEnum!(stable_how);
DeserializeEnum!(stable_how);

/// WRITE arguments.
#[derive(Clone, Debug, Default)]
pub struct WRITE3args {
    pub file: nfs_fh3,
    pub offset: offset3,
    pub count: count3,
    pub stable: stable_how,
    pub data: Vec<u8>,
}
SerializeStruct!(WRITE3args, file, offset, count, stable, data);
DeserializeStruct!(WRITE3args, file, offset, count, stable, data);

/// WRITE success body.
#[derive(Clone, Debug, Default)]
pub struct WRITE3resok {
    pub file_wcc: wcc_data,
    pub count: count3,
    pub committed: stable_how,
    pub verf: writeverf3,
}
SerializeStruct!(WRITE3resok, file_wcc, count, committed, verf);
DeserializeStruct!(WRITE3resok, file_wcc, count, committed, verf);

/// COMMIT arguments: the byte range to flush to stable storage.
#[derive(Clone, Debug, Default)]
pub struct COMMIT3args {
    pub file: nfs_fh3,
    pub offset: offset3,
    pub count: count3,
}
SerializeStruct!(COMMIT3args, file, offset, count);
DeserializeStruct!(COMMIT3args, file, offset, count);

/// COMMIT success body.
#[derive(Clone, Debug, Default)]
pub struct COMMIT3resok {
    pub file_wcc: wcc_data,
    pub verf: writeverf3,
}
SerializeStruct!(COMMIT3resok, file_wcc, verf);
DeserializeStruct!(COMMIT3resok, file_wcc, verf);

/// LINK arguments: existing file plus the directory and name of the new
/// link.
#[derive(Clone, Debug, Default)]
pub struct LINK3args {
    pub file: nfs_fh3,
    pub link: diropargs3,
}
SerializeStruct!(LINK3args, file, link);
DeserializeStruct!(LINK3args, file, link);

/// LINK result body, identical on success and failure.
#[derive(Clone, Debug, Default)]
pub struct LINK3res_body {
    pub file_attributes: post_op_attr,
    pub linkdir_wcc: wcc_data,
}
SerializeStruct!(LINK3res_body, file_attributes, linkdir_wcc);
DeserializeStruct!(LINK3res_body, file_attributes, linkdir_wcc);
