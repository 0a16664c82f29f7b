//! The typed NFS client, versions 2 and 3 behind one surface.
//!
//! One instance speaks exactly one protocol version for its whole life; the
//! version tag decides procedure numbers and wire widths inside each method,
//! and every result is normalized into the [`attr`](super::attr) model.
//!
//! Every call is credentialed by the embedded [`CredForger`]; the resolver
//! rewrites the forged identity immediately before the call that depends on
//! it. Nothing here retries on protocol errors: staleness and permission
//! recovery belong to the operation layer.

use std::io::Cursor;
use std::net::IpAddr;

use tracing::debug;

use crate::client::attr::{
    to_specdata, DirEntry, DirEntryPlus, Fattr, FileHandle, FileType, FsInfo, FsStats, PathConf,
    SetAttr,
};
use crate::errors::{Error, RpcError};
use crate::protocol::xdr::nfs2::{self, fhandle2, NfsProc2};
use crate::protocol::xdr::nfs3::{self, dir, file, fs, nfsstat3, NfsProc3};
use crate::protocol::xdr::{deserialize, Deserialize, Serialize};
use crate::rpc::auth::unix_now;
use crate::rpc::{CredForger, Proto, RpcClient};

/// Protocol revision spoken by a client instance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Version {
    V2,
    #[default]
    V3,
}

impl Version {
    pub fn number(self) -> u32 {
        match self {
            Version::V2 => nfs2::VERSION,
            Version::V3 => nfs3::VERSION,
        }
    }
}

/// Default READDIR request size when the caller has nothing better.
const READDIR_COUNT: u32 = 4096;

/// The NFS procedure client.
#[derive(Debug)]
pub struct NfsClient {
    rpc: RpcClient,
    version: Version,
    forger: CredForger,
}

impl NfsClient {
    pub async fn connect(
        proto: Proto,
        host: IpAddr,
        port: u16,
        version: Version,
        forger: CredForger,
    ) -> Result<NfsClient, RpcError> {
        let rpc =
            RpcClient::connect(proto, host, port, nfs3::PROGRAM, version.number()).await?;
        Ok(NfsClient { rpc, version, forger })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Rewrites the identity every subsequent call will claim.
    pub fn set_identity(&mut self, uid: u32, gid: u32) {
        self.forger.set_identity(uid, gid);
    }

    pub fn identity(&self) -> (u32, u32) {
        self.forger.identity()
    }

    async fn call<A: Serialize>(
        &mut self,
        proc: u32,
        args: &A,
    ) -> Result<Cursor<Vec<u8>>, RpcError> {
        self.rpc.call(proc, self.forger.credential(), args).await
    }

    fn decode<T: Default + Deserialize>(body: &mut Cursor<Vec<u8>>) -> Result<T, Error> {
        deserialize(body).map_err(|e| RpcError::Decode(e).into())
    }

    /// Reads the v3 status and stops on anything but OK. Failure bodies
    /// carry only consistency attributes, which this client discards.
    fn check3(body: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        let status: nfsstat3 = Self::decode(body)?;
        if status == nfsstat3::NFS3_OK {
            Ok(())
        } else {
            Err(Error::Nfs(status))
        }
    }

    fn check2(body: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        let status: nfs2::nfsstat2 = Self::decode(body)?;
        if status == nfs2::nfsstat2::NFS_OK {
            Ok(())
        } else {
            Err(status.into())
        }
    }

    fn fh3(fh: &FileHandle) -> nfs3::nfs_fh3 {
        nfs3::nfs_fh3 { data: fh.0.clone() }
    }

    /// Version 2 handles are exactly 32 bytes; shorter ones (a hand-typed
    /// dirhandle, say) are zero-padded, longer ones rejected.
    fn fh2(fh: &FileHandle) -> Result<fhandle2, Error> {
        if fh.len() > nfs2::FHSIZE {
            return Err(Error::Errno(libc::EINVAL));
        }
        let mut out = [0_u8; nfs2::FHSIZE];
        out[..fh.len()].copy_from_slice(&fh.0);
        Ok(out)
    }

    fn offset2(offset: u64) -> Result<u32, Error> {
        if offset >= u64::from(u32::MAX) {
            return Err(Error::Errno(libc::EFBIG));
        }
        Ok(offset as u32)
    }

    /// Pings the server.
    pub async fn null(&mut self) -> Result<(), Error> {
        let proc = match self.version {
            Version::V3 => NfsProc3::NFSPROC3_NULL as u32,
            Version::V2 => NfsProc2::NFSPROC_NULL as u32,
        };
        self.call(proc, &()).await?;
        Ok(())
    }

    /// Fetches fresh attributes for a handle.
    pub async fn getattr(&mut self, fh: &FileHandle) -> Result<Fattr, Error> {
        match self.version {
            Version::V3 => {
                let args = Self::fh3(fh);
                let mut body = self.call(NfsProc3::NFSPROC3_GETATTR as u32, &args).await?;
                Self::check3(&mut body)?;
                let attr: nfs3::fattr3 = Self::decode(&mut body)?;
                Ok(attr.into())
            }
            Version::V2 => {
                let args = Self::fh2(fh)?;
                let mut body = self.call(NfsProc2::NFSPROC_GETATTR as u32, &args).await?;
                Self::check2(&mut body)?;
                let attr: nfs2::fattr2 = Self::decode(&mut body)?;
                Ok(attr.into())
            }
        }
    }

    /// Applies the requested attribute changes, returning the post-op
    /// attributes when the server supplies them.
    pub async fn setattr(
        &mut self,
        fh: &FileHandle,
        set: &SetAttr,
    ) -> Result<Option<Fattr>, Error> {
        match self.version {
            Version::V3 => {
                let args = nfs3::SETATTR3args {
                    object: Self::fh3(fh),
                    new_attributes: set.to_sattr3(),
                    guard: nfs3::sattrguard3::Void,
                };
                let mut body = self.call(NfsProc3::NFSPROC3_SETATTR as u32, &args).await?;
                Self::check3(&mut body)?;
                let wcc: nfs3::wcc_data = Self::decode(&mut body)?;
                Ok(wcc.after.into_option().map(Fattr::from))
            }
            Version::V2 => {
                let args = nfs2::sattrargs2 {
                    file: Self::fh2(fh)?,
                    attributes: set.to_sattr2(unix_now())?,
                };
                let mut body = self.call(NfsProc2::NFSPROC_SETATTR as u32, &args).await?;
                Self::check2(&mut body)?;
                let attr: nfs2::fattr2 = Self::decode(&mut body)?;
                Ok(Some(attr.into()))
            }
        }
    }

    /// Translates a name within a directory into a handle. The v3 reply can
    /// omit either attribute block, so lookup falls back to GETATTR to keep
    /// its contract of always returning the child's attributes.
    pub async fn lookup(
        &mut self,
        dir: &FileHandle,
        name: &[u8],
    ) -> Result<(FileHandle, Fattr, Option<Fattr>), Error> {
        debug!(name = %String::from_utf8_lossy(name), "lookup");
        match self.version {
            Version::V3 => {
                let args = nfs3::diropargs3 { dir: Self::fh3(dir), name: name.into() };
                let mut body = self.call(NfsProc3::NFSPROC3_LOOKUP as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: dir::LOOKUP3resok = Self::decode(&mut body)?;
                let fh = FileHandle(res.object.data);
                let attr = match res.obj_attributes.into_option() {
                    Some(a) => a.into(),
                    None => self.getattr(&fh).await?,
                };
                Ok((fh, attr, res.dir_attributes.into_option().map(Fattr::from)))
            }
            Version::V2 => {
                let args = nfs2::diropargs2 { dir: Self::fh2(dir)?, name: name.into() };
                let mut body = self.call(NfsProc2::NFSPROC_LOOKUP as u32, &args).await?;
                Self::check2(&mut body)?;
                let res: nfs2::diropres2_ok = Self::decode(&mut body)?;
                Ok((FileHandle(res.file.to_vec()), res.attributes.into(), None))
            }
        }
    }

    /// Asks the server which of the requested ACCESS3_* bits it grants.
    /// Version 2 has no such procedure.
    pub async fn access(&mut self, fh: &FileHandle, bits: u32) -> Result<u32, Error> {
        match self.version {
            Version::V3 => {
                let args = fs::ACCESS3args { object: Self::fh3(fh), access: bits };
                let mut body = self.call(NfsProc3::NFSPROC3_ACCESS as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: fs::ACCESS3resok = Self::decode(&mut body)?;
                Ok(res.access)
            }
            Version::V2 => Err(Error::Nfs(nfsstat3::NFS3ERR_NOTSUPP)),
        }
    }

    /// Reads the target of a symbolic link.
    pub async fn readlink(&mut self, fh: &FileHandle) -> Result<Vec<u8>, Error> {
        match self.version {
            Version::V3 => {
                let args = Self::fh3(fh);
                let mut body = self.call(NfsProc3::NFSPROC3_READLINK as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: fs::READLINK3resok = Self::decode(&mut body)?;
                Ok(res.data.0)
            }
            Version::V2 => {
                let args = Self::fh2(fh)?;
                let mut body = self.call(NfsProc2::NFSPROC_READLINK as u32, &args).await?;
                Self::check2(&mut body)?;
                let path: Vec<u8> = Self::decode(&mut body)?;
                Ok(path)
            }
        }
    }

    /// Reads up to `count` bytes at `offset`. Returns the data, the eof
    /// flag, and post-op attributes when available. Version 2 has no eof on
    /// the wire, so a short read stands in for it.
    pub async fn read(
        &mut self,
        fh: &FileHandle,
        offset: u64,
        count: u32,
    ) -> Result<(Vec<u8>, bool, Option<Fattr>), Error> {
        match self.version {
            Version::V3 => {
                let args = file::READ3args { file: Self::fh3(fh), offset, count };
                let mut body = self.call(NfsProc3::NFSPROC3_READ as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: file::READ3resok = Self::decode(&mut body)?;
                Ok((res.data, res.eof, res.file_attributes.into_option().map(Fattr::from)))
            }
            Version::V2 => {
                let args = nfs2::readargs2 {
                    file: Self::fh2(fh)?,
                    offset: Self::offset2(offset)?,
                    count,
                    totalcount: 0,
                };
                let mut body = self.call(NfsProc2::NFSPROC_READ as u32, &args).await?;
                Self::check2(&mut body)?;
                let res: nfs2::readres2_ok = Self::decode(&mut body)?;
                let eof = res.data.len() < count as usize;
                Ok((res.data, eof, Some(res.attributes.into())))
            }
        }
    }

    /// Writes `data` at `offset` with DATA_SYNC stability, returning the
    /// count the server accepted and post-op attributes when available.
    pub async fn write(
        &mut self,
        fh: &FileHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(u32, Option<Fattr>), Error> {
        match self.version {
            Version::V3 => {
                let args = file::WRITE3args {
                    file: Self::fh3(fh),
                    offset,
                    count: data.len() as u32,
                    stable: file::stable_how::DATA_SYNC,
                    data: data.to_vec(),
                };
                let mut body = self.call(NfsProc3::NFSPROC3_WRITE as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: file::WRITE3resok = Self::decode(&mut body)?;
                Ok((res.count, res.file_wcc.after.into_option().map(Fattr::from)))
            }
            Version::V2 => {
                let args = nfs2::writeargs2 {
                    file: Self::fh2(fh)?,
                    beginoffset: 0,
                    offset: Self::offset2(offset)?,
                    totalcount: 0,
                    data: data.to_vec(),
                };
                let mut body = self.call(NfsProc2::NFSPROC_WRITE as u32, &args).await?;
                Self::check2(&mut body)?;
                let attr: nfs2::fattr2 = Self::decode(&mut body)?;
                // v2 writes are all-or-nothing
                Ok((data.len() as u32, Some(attr.into())))
            }
        }
    }

    /// Decodes a v3 create-style success body, chasing the optional handle
    /// and attributes so callers always get a concrete pair.
    async fn create_result(
        &mut self,
        dir: &FileHandle,
        name: &[u8],
        res: dir::CREATE3resok,
    ) -> Result<(FileHandle, Fattr), Error> {
        let fh = match res.obj {
            nfs3::post_op_fh3::handle(h) => FileHandle(h.data),
            nfs3::post_op_fh3::Void => self.lookup(dir, name).await?.0,
        };
        let attr = match res.obj_attributes.into_option() {
            Some(a) => a.into(),
            None => self.getattr(&fh).await?,
        };
        Ok((fh, attr))
    }

    /// Creates a regular file (GUARDED in v3: an existing name fails with
    /// EXIST rather than being truncated).
    pub async fn create(
        &mut self,
        dir: &FileHandle,
        name: &[u8],
        set: &SetAttr,
    ) -> Result<(FileHandle, Fattr), Error> {
        match self.version {
            Version::V3 => {
                let args = dir::CREATE3args {
                    where_dir: nfs3::diropargs3 { dir: Self::fh3(dir), name: name.into() },
                    how: dir::createhow3::GUARDED(set.to_sattr3()),
                };
                let mut body = self.call(NfsProc3::NFSPROC3_CREATE as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: dir::CREATE3resok = Self::decode(&mut body)?;
                self.create_result(dir, name, res).await
            }
            Version::V2 => {
                let args = nfs2::createargs2 {
                    where_dir: nfs2::diropargs2 { dir: Self::fh2(dir)?, name: name.into() },
                    attributes: set.to_sattr2(unix_now())?,
                };
                let mut body = self.call(NfsProc2::NFSPROC_CREATE as u32, &args).await?;
                Self::check2(&mut body)?;
                let res: nfs2::diropres2_ok = Self::decode(&mut body)?;
                Ok((FileHandle(res.file.to_vec()), res.attributes.into()))
            }
        }
    }

    /// Creates a directory.
    pub async fn mkdir(
        &mut self,
        dir: &FileHandle,
        name: &[u8],
        set: &SetAttr,
    ) -> Result<(FileHandle, Fattr), Error> {
        match self.version {
            Version::V3 => {
                let args = dir::MKDIR3args {
                    where_dir: nfs3::diropargs3 { dir: Self::fh3(dir), name: name.into() },
                    attributes: set.to_sattr3(),
                };
                let mut body = self.call(NfsProc3::NFSPROC3_MKDIR as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: dir::CREATE3resok = Self::decode(&mut body)?;
                self.create_result(dir, name, res).await
            }
            Version::V2 => {
                let args = nfs2::createargs2 {
                    where_dir: nfs2::diropargs2 { dir: Self::fh2(dir)?, name: name.into() },
                    attributes: set.to_sattr2(unix_now())?,
                };
                let mut body = self.call(NfsProc2::NFSPROC_MKDIR as u32, &args).await?;
                Self::check2(&mut body)?;
                let res: nfs2::diropres2_ok = Self::decode(&mut body)?;
                Ok((FileHandle(res.file.to_vec()), res.attributes.into()))
            }
        }
    }

    /// Creates a symbolic link pointing at `target`. The v3 reply may hand
    /// back the new link's handle; v2 returns nothing.
    pub async fn symlink(
        &mut self,
        dir: &FileHandle,
        name: &[u8],
        target: &[u8],
        set: &SetAttr,
    ) -> Result<Option<(FileHandle, Fattr)>, Error> {
        match self.version {
            Version::V3 => {
                let args = dir::SYMLINK3args {
                    where_dir: nfs3::diropargs3 { dir: Self::fh3(dir), name: name.into() },
                    symlink: dir::symlinkdata3 {
                        symlink_attributes: set.to_sattr3(),
                        symlink_data: target.into(),
                    },
                };
                let mut body = self.call(NfsProc3::NFSPROC3_SYMLINK as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: dir::CREATE3resok = Self::decode(&mut body)?;
                if matches!(res.obj, nfs3::post_op_fh3::Void) {
                    return Ok(None);
                }
                Ok(Some(self.create_result(dir, name, res).await?))
            }
            Version::V2 => {
                let args = nfs2::symlinkargs2 {
                    from: nfs2::diropargs2 { dir: Self::fh2(dir)?, name: name.into() },
                    to: target.into(),
                    attributes: set.to_sattr2(unix_now())?,
                };
                let mut body = self.call(NfsProc2::NFSPROC_SYMLINK as u32, &args).await?;
                Self::check2(&mut body)?;
                Ok(None)
            }
        }
    }

    /// Creates a special file. Only devices, sockets and fifos are legal;
    /// version 2 has no MKNOD at all.
    pub async fn mknod(
        &mut self,
        dir: &FileHandle,
        name: &[u8],
        kind: FileType,
        set: &SetAttr,
        rdev: (u32, u32),
    ) -> Result<Option<(FileHandle, Fattr)>, Error> {
        if self.version == Version::V2 {
            return Err(Error::Errno(libc::ENOSYS));
        }
        let sattr = set.to_sattr3();
        let what = match kind {
            FileType::Char => dir::mknoddata3::CHR(dir::devicedata3 {
                dev_attributes: sattr,
                spec: to_specdata(rdev),
            }),
            FileType::Block => dir::mknoddata3::BLK(dir::devicedata3 {
                dev_attributes: sattr,
                spec: to_specdata(rdev),
            }),
            FileType::Socket => dir::mknoddata3::SOCK(sattr),
            FileType::Fifo => dir::mknoddata3::FIFO(sattr),
            _ => return Err(Error::Errno(libc::EINVAL)),
        };
        let args = dir::MKNOD3args {
            where_dir: nfs3::diropargs3 { dir: Self::fh3(dir), name: name.into() },
            what,
        };
        let mut body = self.call(NfsProc3::NFSPROC3_MKNOD as u32, &args).await?;
        Self::check3(&mut body)?;
        let res: dir::CREATE3resok = Self::decode(&mut body)?;
        if matches!(res.obj, nfs3::post_op_fh3::Void) {
            return Ok(None);
        }
        Ok(Some(self.create_result(dir, name, res).await?))
    }

    /// Removes a non-directory entry.
    pub async fn remove(&mut self, dir: &FileHandle, name: &[u8]) -> Result<(), Error> {
        match self.version {
            Version::V3 => {
                let args = nfs3::diropargs3 { dir: Self::fh3(dir), name: name.into() };
                let mut body = self.call(NfsProc3::NFSPROC3_REMOVE as u32, &args).await?;
                Self::check3(&mut body)
            }
            Version::V2 => {
                let args = nfs2::diropargs2 { dir: Self::fh2(dir)?, name: name.into() };
                let mut body = self.call(NfsProc2::NFSPROC_REMOVE as u32, &args).await?;
                Self::check2(&mut body)
            }
        }
    }

    /// Removes a directory entry.
    pub async fn rmdir(&mut self, dir: &FileHandle, name: &[u8]) -> Result<(), Error> {
        match self.version {
            Version::V3 => {
                let args = nfs3::diropargs3 { dir: Self::fh3(dir), name: name.into() };
                let mut body = self.call(NfsProc3::NFSPROC3_RMDIR as u32, &args).await?;
                Self::check3(&mut body)
            }
            Version::V2 => {
                let args = nfs2::diropargs2 { dir: Self::fh2(dir)?, name: name.into() };
                let mut body = self.call(NfsProc2::NFSPROC_RMDIR as u32, &args).await?;
                Self::check2(&mut body)
            }
        }
    }

    /// Renames an entry, possibly across directories.
    pub async fn rename(
        &mut self,
        from_dir: &FileHandle,
        from_name: &[u8],
        to_dir: &FileHandle,
        to_name: &[u8],
    ) -> Result<(), Error> {
        match self.version {
            Version::V3 => {
                let args = dir::RENAME3args {
                    from: nfs3::diropargs3 { dir: Self::fh3(from_dir), name: from_name.into() },
                    to: nfs3::diropargs3 { dir: Self::fh3(to_dir), name: to_name.into() },
                };
                let mut body = self.call(NfsProc3::NFSPROC3_RENAME as u32, &args).await?;
                Self::check3(&mut body)
            }
            Version::V2 => {
                let args = nfs2::renameargs2 {
                    from: nfs2::diropargs2 { dir: Self::fh2(from_dir)?, name: from_name.into() },
                    to: nfs2::diropargs2 { dir: Self::fh2(to_dir)?, name: to_name.into() },
                };
                let mut body = self.call(NfsProc2::NFSPROC_RENAME as u32, &args).await?;
                Self::check2(&mut body)
            }
        }
    }

    /// Creates a hard link to `file` at `dir`/`name`.
    pub async fn link(
        &mut self,
        file: &FileHandle,
        dir: &FileHandle,
        name: &[u8],
    ) -> Result<(), Error> {
        match self.version {
            Version::V3 => {
                let args = file::LINK3args {
                    file: Self::fh3(file),
                    link: nfs3::diropargs3 { dir: Self::fh3(dir), name: name.into() },
                };
                let mut body = self.call(NfsProc3::NFSPROC3_LINK as u32, &args).await?;
                Self::check3(&mut body)
            }
            Version::V2 => {
                let args = nfs2::linkargs2 {
                    from: Self::fh2(file)?,
                    to: nfs2::diropargs2 { dir: Self::fh2(dir)?, name: name.into() },
                };
                let mut body = self.call(NfsProc2::NFSPROC_LINK as u32, &args).await?;
                Self::check2(&mut body)
            }
        }
    }

    /// One READDIR exchange. Returns the entries, the cookie to resume
    /// from, the new cookie verifier, and the eof flag.
    pub async fn readdir(
        &mut self,
        dir: &FileHandle,
        cookie: u64,
        cookieverf: nfs3::cookieverf3,
        count: u32,
    ) -> Result<(Vec<DirEntry>, Option<u64>, nfs3::cookieverf3, bool), Error> {
        match self.version {
            Version::V3 => {
                let args = dir::READDIR3args {
                    dir: Self::fh3(dir),
                    cookie,
                    cookieverf,
                    count,
                };
                let mut body = self.call(NfsProc3::NFSPROC3_READDIR as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: dir::READDIR3resok = Self::decode(&mut body)?;
                let last = res.reply.entries.last().map(|e| e.cookie);
                let entries = res
                    .reply
                    .entries
                    .into_iter()
                    .map(|e| DirEntry { fileid: e.fileid, name: e.name.0 })
                    .collect();
                Ok((entries, last, res.cookieverf, res.reply.eof))
            }
            Version::V2 => {
                let args = nfs2::readdirargs2 {
                    dir: Self::fh2(dir)?,
                    cookie: Self::offset2(cookie)?,
                    count,
                };
                let mut body = self.call(NfsProc2::NFSPROC_READDIR as u32, &args).await?;
                Self::check2(&mut body)?;
                let res: nfs2::readdirres2_ok = Self::decode(&mut body)?;
                let last = res.entries.last().map(|e| u64::from(e.cookie));
                let entries = res
                    .entries
                    .into_iter()
                    .map(|e| DirEntry { fileid: u64::from(e.fileid), name: e.name.0 })
                    .collect();
                Ok((entries, last, [0; 8], res.eof))
            }
        }
    }

    /// Collects the whole directory by iterating READDIR until eof. Entries
    /// come back exactly as the server yields them; dot and dotdot are
    /// neither added nor removed.
    pub async fn read_dir(
        &mut self,
        dir: &FileHandle,
        count: u32,
    ) -> Result<Vec<DirEntry>, Error> {
        let count = if count == 0 { READDIR_COUNT } else { count };
        let mut all = Vec::new();
        let mut cookie = 0_u64;
        let mut verf: nfs3::cookieverf3 = [0; 8];
        loop {
            let (entries, last, newverf, eof) =
                self.readdir(dir, cookie, verf, count).await?;
            all.extend(entries);
            match (eof, last) {
                (true, _) | (false, None) => break,
                (false, Some(next)) => {
                    cookie = next;
                    verf = newverf;
                }
            }
        }
        Ok(all)
    }

    /// One READDIRPLUS exchange (v3 only).
    pub async fn readdirplus(
        &mut self,
        dir: &FileHandle,
        cookie: u64,
        cookieverf: nfs3::cookieverf3,
        dircount: u32,
        maxcount: u32,
    ) -> Result<(Vec<DirEntryPlus>, Option<u64>, nfs3::cookieverf3, bool), Error> {
        if self.version == Version::V2 {
            return Err(Error::Nfs(nfsstat3::NFS3ERR_NOTSUPP));
        }
        let args = dir::READDIRPLUS3args {
            dir: Self::fh3(dir),
            cookie,
            cookieverf,
            dircount,
            maxcount,
        };
        let mut body = self.call(NfsProc3::NFSPROC3_READDIRPLUS as u32, &args).await?;
        Self::check3(&mut body)?;
        let res: dir::READDIRPLUS3resok = Self::decode(&mut body)?;
        let last = res.reply.entries.last().map(|e| e.cookie);
        let entries = res
            .reply
            .entries
            .into_iter()
            .map(|e| DirEntryPlus {
                fileid: e.fileid,
                name: e.name.0,
                attr: e.name_attributes.into_option().map(Fattr::from),
                handle: match e.name_handle {
                    nfs3::post_op_fh3::handle(h) => Some(FileHandle(h.data)),
                    nfs3::post_op_fh3::Void => None,
                },
            })
            .collect();
        Ok((entries, last, res.cookieverf, res.reply.eof))
    }

    /// Filesystem statistics. The v3 reply counts bytes; `bsize_hint` is
    /// the block size to express them in (the negotiated transfer size, per
    /// the statfs conversion rule). Version 2 replies in blocks already and
    /// ignores the hint.
    pub async fn fsstat(&mut self, fh: &FileHandle, bsize_hint: u32) -> Result<FsStats, Error> {
        match self.version {
            Version::V3 => {
                let args = Self::fh3(fh);
                let mut body = self.call(NfsProc3::NFSPROC3_FSSTAT as u32, &args).await?;
                Self::check3(&mut body)?;
                let res: fs::FSSTAT3resok = Self::decode(&mut body)?;
                let bsize = if bsize_hint == 0 { 4096 } else { bsize_hint };
                Ok(FsStats {
                    tsize: bsize_hint,
                    bsize,
                    blocks: res.tbytes / u64::from(bsize),
                    bfree: res.fbytes / u64::from(bsize),
                    bavail: res.abytes / u64::from(bsize),
                    files: res.tfiles,
                    ffree: res.ffiles,
                })
            }
            Version::V2 => {
                let args = Self::fh2(fh)?;
                let mut body = self.call(NfsProc2::NFSPROC_STATFS as u32, &args).await?;
                Self::check2(&mut body)?;
                let res: nfs2::statfsres2_ok = Self::decode(&mut body)?;
                Ok(FsStats {
                    tsize: res.tsize,
                    bsize: res.bsize,
                    blocks: u64::from(res.blocks),
                    bfree: u64::from(res.bfree),
                    bavail: u64::from(res.bavail),
                    files: 0,
                    ffree: 0,
                })
            }
        }
    }

    /// Static filesystem limits (v3 only); the mount sequence derives the
    /// transfer sizes from this.
    pub async fn fsinfo(&mut self, fh: &FileHandle) -> Result<FsInfo, Error> {
        if self.version == Version::V2 {
            return Err(Error::Nfs(nfsstat3::NFS3ERR_NOTSUPP));
        }
        let args = Self::fh3(fh);
        let mut body = self.call(NfsProc3::NFSPROC3_FSINFO as u32, &args).await?;
        Self::check3(&mut body)?;
        let res: fs::FSINFO3resok = Self::decode(&mut body)?;
        Ok(FsInfo {
            rtmax: res.rtmax,
            rtpref: res.rtpref,
            wtmax: res.wtmax,
            wtpref: res.wtpref,
            dtpref: res.dtpref,
            maxfilesize: res.maxfilesize,
            time_delta: res.time_delta,
            properties: res.properties,
        })
    }

    /// Pathname limits (v3 only).
    pub async fn pathconf(&mut self, fh: &FileHandle) -> Result<PathConf, Error> {
        if self.version == Version::V2 {
            return Err(Error::Nfs(nfsstat3::NFS3ERR_NOTSUPP));
        }
        let args = Self::fh3(fh);
        let mut body = self.call(NfsProc3::NFSPROC3_PATHCONF as u32, &args).await?;
        Self::check3(&mut body)?;
        let res: fs::PATHCONF3resok = Self::decode(&mut body)?;
        Ok(PathConf {
            linkmax: res.linkmax,
            name_max: res.name_max,
            no_trunc: res.no_trunc,
            chown_restricted: res.chown_restricted,
            case_insensitive: res.case_insensitive,
            case_preserving: res.case_preserving,
        })
    }

    /// Flushes previously written data to stable storage (v3 only; the
    /// DATA_SYNC writes this client issues rarely need it).
    pub async fn commit(&mut self, fh: &FileHandle, offset: u64, count: u32) -> Result<(), Error> {
        if self.version == Version::V2 {
            return Err(Error::Nfs(nfsstat3::NFS3ERR_NOTSUPP));
        }
        let args = file::COMMIT3args { file: Self::fh3(fh), offset, count };
        let mut body = self.call(NfsProc3::NFSPROC3_COMMIT as u32, &args).await?;
        Self::check3(&mut body)?;
        Ok(())
    }
}
