//! The filesystem operation layer: what a FUSE bridge drives.
//!
//! [`ShadeFs`] owns one mounted view of one export. Each POSIX-style
//! operation resolves its pathname to a filehandle through the cache,
//! forges the AUTH_UNIX identity of the object's owner, and issues the
//! matching NFS procedures.
//!
//! ## Locking
//!
//! Every operation takes the single auth lock for its whole duration. The
//! forged credential is shared state on the NFS client and the window
//! between forging and the reply must not be interleaved with another
//! call on the same transport; the lock also covers cache writeback, so an
//! operation that follows another on the same path observes its post-op
//! attributes.
//!
//! ## Recovery
//!
//! A cached handle can go stale at any time. Any operation that hits
//! `NFS3ERR_STALE` drops the cached entries along its path and re-resolves
//! once before giving up. RENAME additionally retries `NFS3ERR_ACCES` once
//! under the destination directory's identity, for servers that authorize
//! the operation against the destination rather than the source.

pub mod options;

use filetime::FileTime;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::HandleCache;
use crate::client::attr::{Fattr, FileHandle, FileType, SetAttr, SetTime};
use crate::client::mount::{MountClient, MountVersion};
use crate::client::nfs::{NfsClient, Version};
use crate::client::portmap;
use crate::errors::Error;
use crate::protocol::xdr::nfs3::nfstime3;
use crate::protocol::xdr::{mount as mount_xdr, nfs3 as nfs3_xdr};
use crate::rpc::transport::MAXBLKSIZE;
use crate::rpc::CredForger;

pub use options::{MountOptions, PortSpec};

/// Transfer size used when the server reports zero.
const DEFAULT_TSIZE: u32 = 4096;

/// A stat record in the shape the kernel bridge wants: full st_mode with
/// type bits, and times as [`FileTime`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileType,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub used: u64,
    pub rdev: u64,
    pub fileid: u64,
    pub atime: FileTime,
    pub mtime: FileTime,
    pub ctime: FileTime,
}

impl From<Fattr> for FileStat {
    fn from(a: Fattr) -> Self {
        FileStat {
            kind: a.ftype,
            mode: a.ftype.mode_bits() | (a.mode & 0o7777),
            nlink: a.nlink,
            uid: a.uid,
            gid: a.gid,
            size: a.size,
            used: a.used,
            rdev: makedev(a.rdev.0, a.rdev.1),
            fileid: a.fileid,
            atime: a.atime.into(),
            mtime: a.mtime.into(),
            ctime: a.ctime.into(),
        }
    }
}

/// statvfs-shaped filesystem statistics. NFS exposes no native block size,
/// so counts are expressed in units of the negotiated transfer size.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatVfs {
    pub bsize: u32,
    pub frsize: u32,
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub namemax: u32,
}

/// Packs a (major, minor) pair into a Linux dev_t.
fn makedev(major: u32, minor: u32) -> u64 {
    let major = u64::from(major);
    let minor = u64::from(minor);
    (major & 0xfff) << 8 | (major & !0xfff) << 32 | (minor & 0xff) | (minor & !0xff) << 12
}

/// The inverse split, for mknod's rdev argument.
fn splitdev(rdev: u64) -> (u32, u32) {
    let major = (rdev >> 8 & 0xfff | rdev >> 32 & !0xfff) as u32;
    let minor = (rdev & 0xff | rdev >> 12 & !0xff) as u32;
    (major, minor)
}

/// Splits an absolute path into (parent, leaf). The parent of a top-level
/// name is `""`, which the resolver treats as the root.
fn split_path(path: &str) -> Result<(&str, &str), Error> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) if !name.is_empty() => Ok((parent, name)),
        _ => Err(Error::Errno(libc::EINVAL)),
    }
}

/// The client-side permission check behind `access`.
///
/// Picks the owner, group or other permission triplet by comparing the
/// forged identity against the object's owner, then requires every
/// requested R/W/X bit. Since the resolver forges the owner's identity,
/// owned objects pass by construction; the check exists to answer
/// plausibly.
fn check_access(attr: &Fattr, identity: (u32, u32), mode: u32) -> Result<(), Error> {
    if mode == libc::F_OK as u32 {
        return Ok(());
    }
    let shift = if identity.0 == attr.uid {
        6
    } else if identity.1 == attr.gid {
        3
    } else {
        0
    };
    let triplet = attr.mode >> shift;
    for (requested, bit) in [
        (libc::R_OK as u32, 4_u32),
        (libc::W_OK as u32, 2_u32),
        (libc::X_OK as u32, 1_u32),
    ] {
        if mode & requested != 0 && triplet & bit == 0 {
            return Err(Error::Errno(libc::EACCES));
        }
    }
    Ok(())
}

/// Runs `$call` once, and once more after invalidating the path's cached
/// prefixes when the server declared a handle stale.
macro_rules! retry_stale {
    ($inner:ident, $path:expr, $call:expr) => {{
        let mut retried = false;
        loop {
            match $call {
                Err(e) if e.is_stale() && !retried => {
                    debug!(path = $path, "stale handle, re-resolving");
                    retried = true;
                    $inner.invalidate_prefixes($path);
                }
                other => break other,
            }
        }
    }};
}

/// State behind the auth lock.
#[derive(Debug)]
struct Inner {
    nfs: NfsClient,
    mount: Option<MountClient>,
    cache: HandleCache,
    root_fh: FileHandle,
    root_attr: Fattr,
}

impl Inner {
    fn is_root(path: &str) -> bool {
        matches!(path, "" | "/" | "/." | "/..")
    }

    /// Drops every cached prefix of `path`, so the next resolution walks
    /// fresh from the root.
    fn invalidate_prefixes(&mut self, path: &str) {
        let mut prefix = String::new();
        for comp in path.split('/').filter(|c| !c.is_empty()) {
            prefix.push('/');
            prefix.push_str(comp);
            self.cache.remove(&prefix);
        }
    }

    /// Installs post-op attributes for a path the operation just touched.
    fn writeback(&mut self, path: &str, fh: &FileHandle, attr: Fattr) {
        if Self::is_root(path) {
            self.root_attr = attr;
        } else {
            self.cache.insert(path, fh.clone(), attr);
        }
    }

    /// Resolves `path` to its filehandle and attributes, forging the
    /// object owner's identity as a side effect.
    ///
    /// Root spellings short-circuit; a full-path cache hit answers without
    /// traffic; otherwise the walk reuses every cached prefix and issues
    /// LOOKUP for the rest, installing each discovered component. Every
    /// LOOKUP goes out under the identity of the directory it searches.
    async fn resolve(&mut self, path: &str) -> Result<(FileHandle, Fattr), Error> {
        if Self::is_root(path) {
            let attr = self.root_attr;
            self.nfs.set_identity(attr.uid, attr.gid);
            return Ok((self.root_fh.clone(), attr));
        }
        self.cache.prune_expired_if_full();
        if let Some((fh, attr)) = self.cache.get(path) {
            self.nfs.set_identity(attr.uid, attr.gid);
            return Ok((fh, attr));
        }

        let mut dir_fh = self.root_fh.clone();
        let mut dir_attr = self.root_attr;
        let mut prefix = String::new();
        for comp in path.split('/').filter(|c| !c.is_empty()) {
            let parent = prefix.clone();
            prefix.push('/');
            prefix.push_str(comp);
            if let Some((fh, attr)) = self.cache.get(&prefix) {
                dir_fh = fh;
                dir_attr = attr;
                continue;
            }
            self.nfs.set_identity(dir_attr.uid, dir_attr.gid);
            let (fh, attr, dir_after) = self.nfs.lookup(&dir_fh, comp.as_bytes()).await?;
            if let Some(fresh) = dir_after {
                self.writeback(&parent, &dir_fh, fresh);
            }
            self.cache.insert(&prefix, fh.clone(), attr);
            dir_fh = fh;
            dir_attr = attr;
        }
        self.nfs.set_identity(dir_attr.uid, dir_attr.gid);
        Ok((dir_fh, dir_attr))
    }

    async fn getattr_once(&mut self, path: &str) -> Result<Fattr, Error> {
        let (fh, _) = self.resolve(path).await?;
        let attr = self.nfs.getattr(&fh).await?;
        self.writeback(path, &fh, attr);
        Ok(attr)
    }

    async fn readlink_once(&mut self, path: &str) -> Result<Vec<u8>, Error> {
        let (fh, attr) = self.resolve(path).await?;
        if attr.ftype != FileType::Symlink {
            return Err(Error::Errno(libc::EINVAL));
        }
        self.nfs.readlink(&fh).await
    }

    async fn readdir_once(&mut self, path: &str, count: u32) -> Result<Vec<Vec<u8>>, Error> {
        let (fh, attr) = self.resolve(path).await?;
        if attr.ftype != FileType::Directory {
            return Err(Error::Errno(libc::ENOTDIR));
        }
        let entries = self.nfs.read_dir(&fh, count).await?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }

    /// Attributes for a new object: the parent owner's identity (which is
    /// also the forged identity), the given permission bits, and the
    /// client's clock.
    fn newborn_attrs(dir_attr: &Fattr, mode: u32) -> SetAttr {
        let now = nfstime3 { seconds: crate::rpc::auth::unix_now(), nseconds: 0 };
        SetAttr {
            mode: Some(mode & 0o7777),
            uid: Some(dir_attr.uid),
            gid: Some(dir_attr.gid),
            size: Some(0),
            atime: SetTime::ClientTime(now),
            mtime: SetTime::ClientTime(now),
        }
    }

    async fn mknod_once(&mut self, path: &str, mode: u32, rdev: u64) -> Result<(), Error> {
        let (parent, name) = split_path(path)?;
        let (dir_fh, dir_attr) = self.resolve(parent).await?;
        let set = Self::newborn_attrs(&dir_attr, mode);
        match FileType::from_mode(mode) {
            FileType::Regular => {
                let (fh, attr) = self.nfs.create(&dir_fh, name.as_bytes(), &set).await?;
                self.cache.insert(path, fh, attr);
            }
            kind => {
                let set = SetAttr { size: None, ..set };
                let created = self
                    .nfs
                    .mknod(&dir_fh, name.as_bytes(), kind, &set, splitdev(rdev))
                    .await?;
                if let Some((fh, attr)) = created {
                    self.cache.insert(path, fh, attr);
                }
            }
        }
        Ok(())
    }

    async fn mkdir_once(&mut self, path: &str, mode: u32) -> Result<(), Error> {
        let (parent, name) = split_path(path)?;
        let (dir_fh, dir_attr) = self.resolve(parent).await?;
        let set = SetAttr { size: None, ..Self::newborn_attrs(&dir_attr, mode) };
        let (fh, attr) = self.nfs.mkdir(&dir_fh, name.as_bytes(), &set).await?;
        self.cache.insert(path, fh, attr);
        Ok(())
    }

    async fn symlink_once(&mut self, target: &[u8], path: &str) -> Result<(), Error> {
        let (parent, name) = split_path(path)?;
        let (dir_fh, dir_attr) = self.resolve(parent).await?;
        let set = SetAttr { size: None, ..Self::newborn_attrs(&dir_attr, 0o777) };
        let created = self.nfs.symlink(&dir_fh, name.as_bytes(), target, &set).await?;
        if let Some((fh, attr)) = created {
            self.cache.insert(path, fh, attr);
        }
        Ok(())
    }

    async fn link_once(&mut self, target: &str, path: &str) -> Result<(), Error> {
        let (parent, name) = split_path(path)?;
        let (file_fh, _) = self.resolve(target).await?;
        let (dir_fh, _) = self.resolve(parent).await?;
        self.nfs.link(&file_fh, &dir_fh, name.as_bytes()).await
    }

    async fn unlink_once(&mut self, path: &str) -> Result<(), Error> {
        let (parent, name) = split_path(path)?;
        let (dir_fh, _) = self.resolve(parent).await?;
        let (_, attr) = self.resolve(path).await?;
        if attr.ftype == FileType::Directory {
            return Err(Error::Errno(libc::EISDIR));
        }
        self.nfs.remove(&dir_fh, name.as_bytes()).await?;
        self.cache.remove(path);
        Ok(())
    }

    async fn rmdir_once(&mut self, path: &str) -> Result<(), Error> {
        let (parent, name) = split_path(path)?;
        let (dir_fh, _) = self.resolve(parent).await?;
        let (_, attr) = self.resolve(path).await?;
        if attr.ftype != FileType::Directory {
            return Err(Error::Errno(libc::ENOTDIR));
        }
        self.nfs.rmdir(&dir_fh, name.as_bytes()).await?;
        self.cache.remove(path);
        Ok(())
    }

    async fn rename_once(&mut self, old: &str, new: &str) -> Result<(), Error> {
        let (from_parent, from_name) = split_path(old)?;
        let (to_parent, to_name) = split_path(new)?;
        let (from_fh, _) = self.resolve(from_parent).await?;
        let (to_fh, _) = self.resolve(to_parent).await?;
        // forge the source object's owner for the first try
        self.resolve(old).await?;
        let first = self
            .nfs
            .rename(&from_fh, from_name.as_bytes(), &to_fh, to_name.as_bytes())
            .await;
        match first {
            Err(e) if e.is_acces() => {
                // some servers authorize against the destination instead
                debug!(old, new, "rename refused, retrying as destination owner");
                self.resolve(to_parent).await?;
                self.nfs
                    .rename(&from_fh, from_name.as_bytes(), &to_fh, to_name.as_bytes())
                    .await?;
            }
            other => other?,
        }
        self.cache.remove(old);
        self.cache.remove(new);
        Ok(())
    }

    async fn setattr_once(&mut self, path: &str, set: &SetAttr) -> Result<(), Error> {
        let (fh, _) = self.resolve(path).await?;
        if let Some(attr) = self.nfs.setattr(&fh, set).await? {
            self.writeback(path, &fh, attr);
        }
        Ok(())
    }

    async fn read_once(&mut self, path: &str, size: u32, offset: u64, rtsize: u32) -> Result<Vec<u8>, Error> {
        let (fh, _) = self.resolve(path).await?;
        let mut data = Vec::with_capacity(size as usize);
        let mut last_attr = None;
        while (data.len() as u32) < size {
            let want = (size - data.len() as u32).min(rtsize);
            let (chunk, eof, attr) =
                self.nfs.read(&fh, offset + data.len() as u64, want).await?;
            let got = chunk.len();
            data.extend_from_slice(&chunk);
            if attr.is_some() {
                last_attr = attr;
            }
            if eof || got == 0 {
                break;
            }
        }
        if let Some(attr) = last_attr {
            self.writeback(path, &fh, attr);
        }
        Ok(data)
    }

    async fn write_once(
        &mut self,
        path: &str,
        data: &[u8],
        offset: u64,
        wtsize: u32,
    ) -> Result<u64, Error> {
        let (fh, _) = self.resolve(path).await?;
        let mut written = 0_u64;
        let mut last_attr = None;
        while (written as usize) < data.len() {
            let end = (written as usize + wtsize as usize).min(data.len());
            let chunk = &data[written as usize..end];
            let (count, attr) = self.nfs.write(&fh, offset + written, chunk).await?;
            if attr.is_some() {
                last_attr = attr;
            }
            if count == 0 {
                return Err(Error::Errno(libc::EIO));
            }
            written += u64::from(count);
        }
        if let Some(attr) = last_attr {
            self.writeback(path, &fh, attr);
        }
        Ok(written)
    }

    async fn access_once(&mut self, path: &str, mode: u32) -> Result<(), Error> {
        let (_, attr) = self.resolve(path).await?;
        check_access(&attr, self.nfs.identity(), mode)
    }
}

/// One mounted, ready view of a remote export.
#[derive(Debug)]
pub struct ShadeFs {
    inner: Mutex<Inner>,
    export_path: Vec<u8>,
    rtsize: u32,
    wtsize: u32,
}

impl ShadeFs {
    /// Runs the whole mount lifecycle: obtain the root filehandle (MNT, or
    /// an adopted `dirhandle`), connect NFS, learn the root's owner and the
    /// transfer sizes, and optionally walk `".."` up to the export root.
    pub async fn mount(options: MountOptions) -> Result<ShadeFs, Error> {
        let (host_str, export_path) = options.host_and_path()?;
        let export_path = export_path.as_bytes().to_vec();
        let host = resolve_host(host_str).await?;
        let forger = CredForger::new(options.fakename.as_deref());
        let version = options.version;

        let (root_fh, mount_client) = if let Some(handle) = options.dirhandle.clone() {
            // no mount daemon involved; nothing to unmount later
            (FileHandle(handle), None)
        } else {
            let mount_version = match version {
                Version::V2 => MountVersion::V1,
                Version::V3 => MountVersion::V3,
            };
            let port = match options.mountport.port {
                Some(port) => port,
                None => {
                    portmap::getport(
                        host,
                        options.portmap_port,
                        options.mountport.proto,
                        mount_xdr::PROGRAM,
                        mount_version.number(),
                        options.mountport.proto,
                    )
                    .await?
                }
            };
            let mut mc = MountClient::connect(
                options.mountport.proto,
                host,
                port,
                mount_version,
                forger.clone(),
            )
            .await?;
            let (fh, _auth_flavors) = mc.mnt(&export_path).await?;
            if options.hide {
                // drop the server's mount record right away; the handle
                // keeps working and fsdestroy will have nothing to do
                mc.umnt(&export_path).await?;
                (FileHandle(fh), None)
            } else {
                (FileHandle(fh), Some(mc))
            }
        };

        let nfs_port = match options.nfsport.port {
            Some(port) => port,
            None => {
                portmap::getport(
                    host,
                    options.portmap_port,
                    options.nfsport.proto,
                    nfs3_xdr::PROGRAM,
                    version.number(),
                    options.nfsport.proto,
                )
                .await?
            }
        };
        let mut nfs =
            NfsClient::connect(options.nfsport.proto, host, nfs_port, version, forger).await?;

        // claim root until the export root's real owner is known
        nfs.set_identity(0, 0);
        let mut root_fh = root_fh;
        let mut root_attr = nfs.getattr(&root_fh).await?;
        nfs.set_identity(root_attr.uid, root_attr.gid);

        let (rtsize, wtsize) = match version {
            Version::V3 => {
                let fsinfo = nfs.fsinfo(&root_fh).await?;
                (
                    clamp_tsize(prefer(fsinfo.rtpref, fsinfo.rtmax)),
                    clamp_tsize(prefer(fsinfo.wtpref, fsinfo.wtmax)),
                )
            }
            Version::V2 => {
                let stats = nfs.fsstat(&root_fh, 0).await?;
                let tsize = clamp_tsize(stats.tsize);
                (tsize, tsize)
            }
        };

        if options.getroot {
            // climb ".." until the handle stops changing
            loop {
                let (fh, attr, _) = nfs.lookup(&root_fh, b"..").await?;
                if fh == root_fh {
                    break;
                }
                root_fh = fh;
                root_attr = attr;
                nfs.set_identity(attr.uid, attr.gid);
            }
        }

        info!(
            server = %options.server,
            rtsize,
            wtsize,
            hide = options.hide,
            "export mounted"
        );

        Ok(ShadeFs {
            inner: Mutex::new(Inner {
                nfs,
                mount: mount_client,
                cache: HandleCache::new(options.cachesize, options.cachetimeout),
                root_fh,
                root_attr,
            }),
            export_path,
            rtsize,
            wtsize,
        })
    }

    /// Negotiated read chunk size.
    pub fn rtsize(&self) -> u32 {
        self.rtsize
    }

    /// Negotiated write chunk size.
    pub fn wtsize(&self) -> u32 {
        self.wtsize
    }

    pub async fn getattr(&self, path: &str) -> Result<FileStat, Error> {
        let mut inner = self.inner.lock().await;
        let attr = retry_stale!(inner, path, inner.getattr_once(path).await)?;
        Ok(attr.into())
    }

    /// The target of a symlink; `EINVAL` for anything else.
    pub async fn readlink(&self, path: &str) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.readlink_once(path).await)
    }

    /// Directory entry names, exactly as the server yields them: dot and
    /// dotdot appear only if the server sends them. The offset of the FUSE
    /// contract is accepted and ignored; the full listing is returned.
    pub async fn readdir(&self, path: &str, _offset: u64) -> Result<Vec<Vec<u8>>, Error> {
        let mut inner = self.inner.lock().await;
        let count = self.rtsize;
        retry_stale!(inner, path, inner.readdir_once(path, count).await)
    }

    /// Creates a file or special node. Regular files go through CREATE,
    /// devices/sockets/fifos through MKNOD with the rdev split into
    /// (major, minor).
    pub async fn mknod(&self, path: &str, mode: u32, rdev: u64) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.mknod_once(path, mode, rdev).await)
    }

    pub async fn mkdir(&self, path: &str, mode: u32) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.mkdir_once(path, mode).await)
    }

    pub async fn unlink(&self, path: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.unlink_once(path).await)
    }

    pub async fn rmdir(&self, path: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.rmdir_once(path).await)
    }

    /// Creates a symlink at `path` pointing to `target`.
    pub async fn symlink(&self, target: &[u8], path: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.symlink_once(target, path).await)
    }

    pub async fn rename(&self, old: &str, new: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        match inner.rename_once(old, new).await {
            Err(e) if e.is_stale() => {
                // either side's cached handles may be the stale ones
                debug!(old, new, "stale handle in rename, re-resolving");
                inner.invalidate_prefixes(old);
                inner.invalidate_prefixes(new);
                inner.rename_once(old, new).await
            }
            other => other,
        }
    }

    /// Creates a hard link at `path` to the object at `target`.
    pub async fn link(&self, target: &str, path: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, target, inner.link_once(target, path).await)
    }

    pub async fn chmod(&self, path: &str, mode: u32) -> Result<(), Error> {
        let set = SetAttr { mode: Some(mode & 0o7777), ..SetAttr::default() };
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.setattr_once(path, &set).await)
    }

    pub async fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<(), Error> {
        let set = SetAttr { uid: Some(uid), gid: Some(gid), ..SetAttr::default() };
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.setattr_once(path, &set).await)
    }

    pub async fn truncate(&self, path: &str, size: u64) -> Result<(), Error> {
        let set = SetAttr { size: Some(size), ..SetAttr::default() };
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.setattr_once(path, &set).await)
    }

    /// Sets access and modification times.
    pub async fn utimens(&self, path: &str, atime: SetTime, mtime: SetTime) -> Result<(), Error> {
        let set = SetAttr { atime, mtime, ..SetAttr::default() };
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.setattr_once(path, &set).await)
    }

    /// utime(2)-shaped convenience over [`utimens`](Self::utimens).
    pub async fn utime(&self, path: &str, atime: FileTime, mtime: FileTime) -> Result<(), Error> {
        self.utimens(
            path,
            SetTime::ClientTime(atime.into()),
            SetTime::ClientTime(mtime.into()),
        )
        .await
    }

    /// Reads up to `size` bytes at `offset`, issuing as many READ calls of
    /// at most the negotiated chunk size as it takes.
    pub async fn read(&self, path: &str, size: u32, offset: u64) -> Result<Vec<u8>, Error> {
        if Inner::is_root(path) {
            return Err(Error::Errno(libc::EISDIR));
        }
        let mut inner = self.inner.lock().await;
        let rtsize = self.rtsize;
        retry_stale!(inner, path, inner.read_once(path, size, offset, rtsize).await)
    }

    /// Writes the whole buffer at `offset` in chunks of at most the
    /// negotiated write size, returning the bytes written.
    pub async fn write(&self, path: &str, data: &[u8], offset: u64) -> Result<u64, Error> {
        let mut inner = self.inner.lock().await;
        let wtsize = self.wtsize;
        retry_stale!(inner, path, inner.write_once(path, data, offset, wtsize).await)
    }

    /// Filesystem statistics over the export root.
    pub async fn statfs(&self) -> Result<StatVfs, Error> {
        let mut inner = self.inner.lock().await;
        let root_fh = inner.root_fh.clone();
        let (uid, gid) = (inner.root_attr.uid, inner.root_attr.gid);
        inner.nfs.set_identity(uid, gid);
        let stats = inner.nfs.fsstat(&root_fh, self.rtsize).await?;
        Ok(StatVfs {
            bsize: stats.bsize,
            frsize: stats.bsize,
            blocks: stats.blocks,
            bfree: stats.bfree,
            bavail: stats.bavail,
            files: stats.files,
            ffree: stats.ffree,
            namemax: 255,
        })
    }

    /// The client-side permission emulation; never asks the server.
    pub async fn access(&self, path: &str, mode: u32) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        retry_stale!(inner, path, inner.access_once(path, mode).await)
    }

    /// Tears the mount down: UMNT unless `hide` already did (or a
    /// dirhandle skipped the mount daemon entirely). Transports and cache
    /// go away with the value.
    pub async fn destroy(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        if let Some(mut mc) = inner.mount.take() {
            mc.umnt(&self.export_path).await?;
        }
        Ok(())
    }
}

fn prefer(pref: u32, max: u32) -> u32 {
    if pref != 0 {
        pref
    } else {
        max
    }
}

fn clamp_tsize(tsize: u32) -> u32 {
    if tsize == 0 {
        DEFAULT_TSIZE
    } else {
        tsize.min(MAXBLKSIZE)
    }
}

async fn resolve_host(host: &str) -> Result<std::net::IpAddr, Error> {
    if let Ok(ip) = host.parse() {
        return Ok(ip);
    }
    // port 0: only the address half matters
    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| Error::Config(format!("cannot resolve {host}: {e}")))?;
    addrs
        .next()
        .map(|a| a.ip())
        .ok_or_else(|| Error::Config(format!("no address for {host}")))
}
