//! Version-neutral attribute model.
//!
//! The two protocol revisions disagree on widths (32 vs 64 bit sizes,
//! microseconds vs nanoseconds) and on how "do not change" is spelled in
//! set-attributes. Everything above the typed NFS client works on the
//! normalized types here; the conversions below preserve the
//! version-specific widths at the wire boundary.

use std::fmt;

use crate::errors::Error;
use crate::protocol::xdr::nfs2::{self, fattr2, ftype2, sattr2, timeval2};
use crate::protocol::xdr::nfs3::{
    fattr3, ftype3, nfstime3, sattr3, set_atime, set_gid3, set_mode3, set_mtime, set_size3,
    set_uid3, specdata3,
};

/// An opaque server filehandle: 32 fixed bytes in v2, up to 64 in v3.
/// Identity is byte equality, nothing more.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct FileHandle(pub Vec<u8>);

impl FileHandle {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for FileHandle {
    fn from(bytes: Vec<u8>) -> Self {
        FileHandle(bytes)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fh[")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        write!(f, "]")
    }
}

/// What a filesystem object is. Version 2 cannot express sockets or fifos
/// as types (they hide in mode bits); its NFNON placeholder decays to
/// Regular here.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FileType {
    #[default]
    Regular,
    Directory,
    Block,
    Char,
    Symlink,
    Socket,
    Fifo,
}

impl FileType {
    /// The S_IFMT bits of this type, for composing a full st_mode.
    pub fn mode_bits(self) -> u32 {
        match self {
            FileType::Regular => libc::S_IFREG as u32,
            FileType::Directory => libc::S_IFDIR as u32,
            FileType::Block => libc::S_IFBLK as u32,
            FileType::Char => libc::S_IFCHR as u32,
            FileType::Symlink => libc::S_IFLNK as u32,
            FileType::Socket => libc::S_IFSOCK as u32,
            FileType::Fifo => libc::S_IFIFO as u32,
        }
    }

    /// Classifies an st_mode the way mknod receives it.
    pub fn from_mode(mode: u32) -> FileType {
        match mode & libc::S_IFMT as u32 {
            m if m == libc::S_IFDIR as u32 => FileType::Directory,
            m if m == libc::S_IFBLK as u32 => FileType::Block,
            m if m == libc::S_IFCHR as u32 => FileType::Char,
            m if m == libc::S_IFLNK as u32 => FileType::Symlink,
            m if m == libc::S_IFSOCK as u32 => FileType::Socket,
            m if m == libc::S_IFIFO as u32 => FileType::Fifo,
            _ => FileType::Regular,
        }
    }
}

impl From<ftype3> for FileType {
    fn from(t: ftype3) -> Self {
        match t {
            ftype3::NF3REG => FileType::Regular,
            ftype3::NF3DIR => FileType::Directory,
            ftype3::NF3BLK => FileType::Block,
            ftype3::NF3CHR => FileType::Char,
            ftype3::NF3LNK => FileType::Symlink,
            ftype3::NF3SOCK => FileType::Socket,
            ftype3::NF3FIFO => FileType::Fifo,
        }
    }
}

impl From<ftype2> for FileType {
    fn from(t: ftype2) -> Self {
        match t {
            ftype2::NFNON | ftype2::NFREG => FileType::Regular,
            ftype2::NFDIR => FileType::Directory,
            ftype2::NFBLK => FileType::Block,
            ftype2::NFCHR => FileType::Char,
            ftype2::NFLNK => FileType::Symlink,
        }
    }
}

/// Normalized file attributes. Times are (seconds, nanoseconds); v2
/// microseconds are widened on the way in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Fattr {
    pub ftype: FileType,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub used: u64,
    pub rdev: (u32, u32),
    pub fsid: u64,
    pub fileid: u64,
    pub atime: nfstime3,
    pub mtime: nfstime3,
    pub ctime: nfstime3,
}

impl From<fattr3> for Fattr {
    fn from(a: fattr3) -> Self {
        Fattr {
            ftype: a.ftype.into(),
            mode: a.mode,
            nlink: a.nlink,
            uid: a.uid,
            gid: a.gid,
            size: a.size,
            used: a.used,
            rdev: (a.rdev.specdata1, a.rdev.specdata2),
            fsid: a.fsid,
            fileid: a.fileid,
            atime: a.atime,
            mtime: a.mtime,
            ctime: a.ctime,
        }
    }
}

fn widen_time(t: timeval2) -> nfstime3 {
    nfstime3 { seconds: t.seconds, nseconds: t.useconds.saturating_mul(1000) }
}

impl From<fattr2> for Fattr {
    fn from(a: fattr2) -> Self {
        Fattr {
            ftype: a.ftype.into(),
            mode: a.mode,
            nlink: a.nlink,
            uid: a.uid,
            gid: a.gid,
            size: u64::from(a.size),
            used: u64::from(a.blocks) * 512,
            // the classic 8/8 split of a 16-bit dev_t
            rdev: (a.rdev >> 8 & 0xff, a.rdev & 0xff),
            fsid: u64::from(a.fsid),
            fileid: u64::from(a.fileid),
            atime: widen_time(a.atime),
            mtime: widen_time(a.mtime),
            ctime: widen_time(a.ctime),
        }
    }
}

/// Time disposition for set-attributes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SetTime {
    #[default]
    DontChange,
    /// Stamp with the server clock. Version 2 cannot express this; the
    /// conversion substitutes the client clock.
    ServerTime,
    ClientTime(nfstime3),
}

/// The fields a SETATTR (or create-style call) should change; unset fields
/// are left alone.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SetAttr {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: SetTime,
    pub mtime: SetTime,
}

impl SetAttr {
    pub fn to_sattr3(&self) -> sattr3 {
        sattr3 {
            mode: match self.mode {
                Some(m) => set_mode3::mode(m),
                None => set_mode3::Void,
            },
            uid: match self.uid {
                Some(u) => set_uid3::uid(u),
                None => set_uid3::Void,
            },
            gid: match self.gid {
                Some(g) => set_gid3::gid(g),
                None => set_gid3::Void,
            },
            size: match self.size {
                Some(s) => set_size3::size(s),
                None => set_size3::Void,
            },
            atime: match self.atime {
                SetTime::DontChange => set_atime::DONT_CHANGE,
                SetTime::ServerTime => set_atime::SET_TO_SERVER_TIME,
                SetTime::ClientTime(t) => set_atime::SET_TO_CLIENT_TIME(t),
            },
            mtime: match self.mtime {
                SetTime::DontChange => set_mtime::DONT_CHANGE,
                SetTime::ServerTime => set_mtime::SET_TO_SERVER_TIME,
                SetTime::ClientTime(t) => set_mtime::SET_TO_CLIENT_TIME(t),
            },
        }
    }

    /// The sentinel-based v2 encoding. Fails with `EFBIG` when a size does
    /// not fit the protocol's 32 bits.
    pub fn to_sattr2(&self, now: u32) -> Result<sattr2, Error> {
        let size = match self.size {
            None => nfs2::SATTR2_DONT_CHANGE,
            Some(s) if s >= u64::from(u32::MAX) => return Err(Error::Errno(libc::EFBIG)),
            Some(s) => s as u32,
        };
        let time2 = |t: &SetTime| match t {
            SetTime::DontChange => timeval2 {
                seconds: nfs2::SATTR2_DONT_CHANGE,
                useconds: nfs2::SATTR2_DONT_CHANGE,
            },
            SetTime::ServerTime => timeval2 { seconds: now, useconds: 0 },
            SetTime::ClientTime(t) => {
                timeval2 { seconds: t.seconds, useconds: t.nseconds / 1000 }
            }
        };
        Ok(sattr2 {
            mode: self.mode.unwrap_or(nfs2::SATTR2_DONT_CHANGE),
            uid: self.uid.unwrap_or(nfs2::SATTR2_DONT_CHANGE),
            gid: self.gid.unwrap_or(nfs2::SATTR2_DONT_CHANGE),
            size,
            atime: time2(&self.atime),
            mtime: time2(&self.mtime),
        })
    }
}

pub(crate) fn to_specdata(rdev: (u32, u32)) -> specdata3 {
    specdata3 { specdata1: rdev.0, specdata2: rdev.1 }
}

/// One directory entry as READDIR yields it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub fileid: u64,
    pub name: Vec<u8>,
}

/// READDIRPLUS entry: name plus whatever attributes and handle the server
/// volunteered.
#[derive(Clone, Debug)]
pub struct DirEntryPlus {
    pub fileid: u64,
    pub name: Vec<u8>,
    pub attr: Option<Fattr>,
    pub handle: Option<FileHandle>,
}

/// Filesystem statistics normalized to block units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FsStats {
    /// Server's preferred transfer size, zero when it did not say.
    pub tsize: u32,
    /// Block size the counts below are measured in.
    pub bsize: u32,
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
}

/// Static v3 filesystem limits from FSINFO.
#[derive(Copy, Clone, Debug, Default)]
pub struct FsInfo {
    pub rtmax: u32,
    pub rtpref: u32,
    pub wtmax: u32,
    pub wtpref: u32,
    pub dtpref: u32,
    pub maxfilesize: u64,
    pub time_delta: nfstime3,
    pub properties: u32,
}

/// Path limits from PATHCONF.
#[derive(Copy, Clone, Debug, Default)]
pub struct PathConf {
    pub linkmax: u32,
    pub name_max: u32,
    pub no_trunc: bool,
    pub chown_restricted: bool,
    pub case_insensitive: bool,
    pub case_preserving: bool,
}
