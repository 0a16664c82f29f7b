//! Directory-related NFSv3 bodies: LOOKUP, CREATE, MKDIR, SYMLINK, MKNOD,
//! REMOVE, RMDIR, RENAME, READDIR and READDIRPLUS.
//!
//! The readdir replies carry XDR-linked entry lists; the decoders flatten
//! them into vectors and keep the trailing `eof` flag.

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use super::*;

/// LOOKUP success body: the child's handle, its attributes, and fresh
/// attributes of the directory that was searched.
#[derive(Clone, Debug, Default)]
pub struct LOOKUP3resok {
    pub object: nfs_fh3,
    pub obj_attributes: post_op_attr,
    pub dir_attributes: post_op_attr,
}
SerializeStruct!(LOOKUP3resok, object, obj_attributes, dir_attributes);
DeserializeStruct!(LOOKUP3resok, object, obj_attributes, dir_attributes);

/// How CREATE should behave when the name already exists. UNCHECKED
/// overwrites, GUARDED fails with EXIST, EXCLUSIVE uses a verifier for
/// at-most-once creation.
#[derive(Clone, Debug)]
pub enum createhow3 {
    UNCHECKED(sattr3),
    GUARDED(sattr3),
    EXCLUSIVE(createverf3),
}

impl Default for createhow3 {
    fn default() -> Self {
        createhow3::GUARDED(sattr3::default())
    }
}

impl Serialize for createhow3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            createhow3::UNCHECKED(attrs) => {
                0_u32.serialize(dest)?;
                attrs.serialize(dest)
            }
            createhow3::GUARDED(attrs) => {
                1_u32.serialize(dest)?;
                attrs.serialize(dest)
            }
            createhow3::EXCLUSIVE(verf) => {
                2_u32.serialize(dest)?;
                verf.serialize(dest)
            }
        }
    }
}

impl Deserialize for createhow3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = createhow3::UNCHECKED(deserialize(src)?),
            1 => *self = createhow3::GUARDED(deserialize(src)?),
            2 => *self = createhow3::EXCLUSIVE(deserialize(src)?),
            c => return Err(invalid_data(format!("invalid createhow3 discriminant: {c}"))),
        }
        Ok(())
    }
}

/// CREATE arguments.
#[derive(Clone, Debug, Default)]
pub struct CREATE3args {
    pub where_dir: diropargs3,
    pub how: createhow3,
}
SerializeStruct!(CREATE3args, where_dir, how);
DeserializeStruct!(CREATE3args, where_dir, how);

/// Success body shared by CREATE, MKDIR, SYMLINK and MKNOD: the new object's
/// optional handle and attributes plus wcc data for the parent directory.
#[derive(Clone, Debug, Default)]
pub struct CREATE3resok {
    pub obj: post_op_fh3,
    pub obj_attributes: post_op_attr,
    pub dir_wcc: wcc_data,
}
SerializeStruct!(CREATE3resok, obj, obj_attributes, dir_wcc);
DeserializeStruct!(CREATE3resok, obj, obj_attributes, dir_wcc);

/// MKDIR arguments.
#[derive(Clone, Debug, Default)]
pub struct MKDIR3args {
    pub where_dir: diropargs3,
    pub attributes: sattr3,
}
SerializeStruct!(MKDIR3args, where_dir, attributes);
DeserializeStruct!(MKDIR3args, where_dir, attributes);

/// Target path plus initial attributes for SYMLINK.
#[derive(Clone, Debug, Default)]
pub struct symlinkdata3 {
    pub symlink_attributes: sattr3,
    pub symlink_data: nfspath3,
}
SerializeStruct!(symlinkdata3, symlink_attributes, symlink_data);
DeserializeStruct!(symlinkdata3, symlink_attributes, symlink_data);

/// SYMLINK arguments.
#[derive(Clone, Debug, Default)]
pub struct SYMLINK3args {
    pub where_dir: diropargs3,
    pub symlink: symlinkdata3,
}
SerializeStruct!(SYMLINK3args, where_dir, symlink);
DeserializeStruct!(SYMLINK3args, where_dir, symlink);

/// Attributes and device numbers for block and character specials.
#[derive(Clone, Debug, Default)]
pub struct devicedata3 {
    pub dev_attributes: sattr3,
    pub spec: specdata3,
}
SerializeStruct!(devicedata3, dev_attributes, spec);
DeserializeStruct!(devicedata3, dev_attributes, spec);

/// What MKNOD should create, discriminated by [`ftype3`]. CHR and BLK carry
/// device data, SOCK and FIFO carry plain attributes, anything else is void
/// on the wire (and rejected by servers with BADTYPE).
#[derive(Clone, Debug)]
pub enum mknoddata3 {
    CHR(devicedata3),
    BLK(devicedata3),
    SOCK(sattr3),
    FIFO(sattr3),
}

impl Default for mknoddata3 {
    fn default() -> Self {
        mknoddata3::FIFO(sattr3::default())
    }
}

impl Serialize for mknoddata3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            mknoddata3::CHR(dev) => {
                ftype3::NF3CHR.serialize(dest)?;
                dev.serialize(dest)
            }
            mknoddata3::BLK(dev) => {
                ftype3::NF3BLK.serialize(dest)?;
                dev.serialize(dest)
            }
            mknoddata3::SOCK(attrs) => {
                ftype3::NF3SOCK.serialize(dest)?;
                attrs.serialize(dest)
            }
            mknoddata3::FIFO(attrs) => {
                ftype3::NF3FIFO.serialize(dest)?;
                attrs.serialize(dest)
            }
        }
    }
}

impl Deserialize for mknoddata3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let ftype: ftype3 = deserialize(src)?;
        match ftype {
            ftype3::NF3CHR => *self = mknoddata3::CHR(deserialize(src)?),
            ftype3::NF3BLK => *self = mknoddata3::BLK(deserialize(src)?),
            ftype3::NF3SOCK => *self = mknoddata3::SOCK(deserialize(src)?),
            ftype3::NF3FIFO => *self = mknoddata3::FIFO(deserialize(src)?),
            other => {
                return Err(invalid_data(format!("invalid mknoddata3 type: {other:?}")));
            }
        }
        Ok(())
    }
}

/// MKNOD arguments.
#[derive(Clone, Debug, Default)]
pub struct MKNOD3args {
    pub where_dir: diropargs3,
    pub what: mknoddata3,
}
SerializeStruct!(MKNOD3args, where_dir, what);
DeserializeStruct!(MKNOD3args, where_dir, what);

/// RENAME arguments: source directory/name and destination directory/name.
#[derive(Clone, Debug, Default)]
pub struct RENAME3args {
    pub from: diropargs3,
    pub to: diropargs3,
}
SerializeStruct!(RENAME3args, from, to);
DeserializeStruct!(RENAME3args, from, to);

/// Wcc data for both directories touched by RENAME, returned on success and
/// on failure alike.
#[derive(Clone, Debug, Default)]
pub struct RENAME3res_body {
    pub fromdir_wcc: wcc_data,
    pub todir_wcc: wcc_data,
}
SerializeStruct!(RENAME3res_body, fromdir_wcc, todir_wcc);
DeserializeStruct!(RENAME3res_body, fromdir_wcc, todir_wcc);

/// One READDIR entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct entry3 {
    pub fileid: fileid3,
    pub name: filename3,
    pub cookie: cookie3,
}
SerializeStruct!(entry3, fileid, name, cookie);
DeserializeStruct!(entry3, fileid, name, cookie);

/// READDIR arguments. `cookie`/`cookieverf` resume iteration where the
/// previous reply stopped; both are zero on the first call.
#[derive(Clone, Debug, Default)]
pub struct READDIR3args {
    pub dir: nfs_fh3,
    pub cookie: cookie3,
    pub cookieverf: cookieverf3,
    pub count: count3,
}
SerializeStruct!(READDIR3args, dir, cookie, cookieverf, count);
DeserializeStruct!(READDIR3args, dir, cookie, cookieverf, count);

/// Entry list plus end-of-directory marker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct dirlist3 {
    pub entries: Vec<entry3>,
    pub eof: bool,
}

impl Serialize for dirlist3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            true.serialize(dest)?;
            entry.serialize(dest)?;
        }
        false.serialize(dest)?;
        self.eof.serialize(dest)
    }
}

impl Deserialize for dirlist3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.entries.clear();
        while deserialize::<bool>(src)? {
            self.entries.push(deserialize::<entry3>(src)?);
        }
        self.eof.deserialize(src)
    }
}

/// READDIR success body.
#[derive(Clone, Debug, Default)]
pub struct READDIR3resok {
    pub dir_attributes: post_op_attr,
    pub cookieverf: cookieverf3,
    pub reply: dirlist3,
}
SerializeStruct!(READDIR3resok, dir_attributes, cookieverf, reply);
DeserializeStruct!(READDIR3resok, dir_attributes, cookieverf, reply);

/// One READDIRPLUS entry: name plus optional attributes and handle.
#[derive(Clone, Debug, Default)]
pub struct entryplus3 {
    pub fileid: fileid3,
    pub name: filename3,
    pub cookie: cookie3,
    pub name_attributes: post_op_attr,
    pub name_handle: post_op_fh3,
}
SerializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);
DeserializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);

/// READDIRPLUS arguments; `dircount` bounds the entry data, `maxcount` the
/// whole reply.
#[derive(Clone, Debug, Default)]
pub struct READDIRPLUS3args {
    pub dir: nfs_fh3,
    pub cookie: cookie3,
    pub cookieverf: cookieverf3,
    pub dircount: count3,
    pub maxcount: count3,
}
SerializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);
DeserializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);

/// Extended entry list plus end-of-directory marker.
#[derive(Clone, Debug, Default)]
pub struct dirlistplus3 {
    pub entries: Vec<entryplus3>,
    pub eof: bool,
}

impl Serialize for dirlistplus3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            true.serialize(dest)?;
            entry.serialize(dest)?;
        }
        false.serialize(dest)?;
        self.eof.serialize(dest)
    }
}

impl Deserialize for dirlistplus3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.entries.clear();
        while deserialize::<bool>(src)? {
            self.entries.push(deserialize::<entryplus3>(src)?);
        }
        self.eof.deserialize(src)
    }
}

/// READDIRPLUS success body.
#[derive(Clone, Debug, Default)]
pub struct READDIRPLUS3resok {
    pub dir_attributes: post_op_attr,
    pub cookieverf: cookieverf3,
    pub reply: dirlistplus3,
}
SerializeStruct!(READDIRPLUS3resok, dir_attributes, cookieverf, reply);
DeserializeStruct!(READDIRPLUS3resok, dir_attributes, cookieverf, reply);
