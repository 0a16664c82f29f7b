//! A scripted in-process NFS/mount/portmap server for exercising the
//! client end to end.
//!
//! One socket pair (UDP and TCP on the same port number) answers all three
//! programs, the way the tests' mount options expect: portmap GETPORT always
//! points back at the same port. The filesystem behind it is a small
//! in-memory tree; every call's AUTH_UNIX credential is recorded so tests
//! can assert what identity the client forged, and faults (stale handles,
//! one-shot ACCES, dropped datagrams) can be injected per scenario.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use tokio::net::{TcpListener, UdpSocket};

use nfs_shade::protocol::xdr::rpc::{
    accept_body, accepted_reply, auth_flavor, auth_unix, call_body, opaque_auth, reply_body,
    rpc_body, rpc_msg,
};
use nfs_shade::protocol::xdr::{deserialize, mount, nfs2, nfs3, portmap, Serialize};
use nfs_shade::rpc::transport::{read_record, write_record};

/// Installs a subscriber once so `RUST_LOG`-style debugging of a failing
/// scenario shows the client's call-level tracing.
pub fn trace_init() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// What one call looked like on the wire.
#[derive(Clone, Debug)]
pub struct CallRecord {
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub uid: u32,
    pub gid: u32,
    pub machinename: Vec<u8>,
}

/// One object in the mock filesystem.
#[derive(Clone, Debug)]
pub struct Node {
    pub fileid: u64,
    pub kind: nfs3::ftype3,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// File data, or the target path for symlinks.
    pub content: Vec<u8>,
    /// (name, fileid) pairs for directories.
    pub children: Vec<(Vec<u8>, u64)>,
    pub parent: u64,
}

impl Node {
    fn dir(fileid: u64, uid: u32, gid: u32, parent: u64) -> Node {
        Node {
            fileid,
            kind: nfs3::ftype3::NF3DIR,
            mode: 0o755,
            uid,
            gid,
            content: Vec::new(),
            children: Vec::new(),
            parent,
        }
    }

    fn file(fileid: u64, uid: u32, gid: u32, content: Vec<u8>, parent: u64) -> Node {
        Node {
            fileid,
            kind: nfs3::ftype3::NF3REG,
            mode: 0o644,
            uid,
            gid,
            content,
            children: Vec::new(),
            parent,
        }
    }

    fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

pub const ROOT_ID: u64 = 1;

/// The scriptable server state shared with the test body.
pub struct ServerState {
    pub nodes: HashMap<u64, Node>,
    next_id: u64,
    /// The export path MNT accepts.
    pub export: Vec<u8>,
    /// Every call seen, in arrival order.
    pub calls: Vec<CallRecord>,
    /// Fileids whose next use fails with NFS3ERR_STALE.
    pub stale_once: HashSet<u64>,
    /// Refuse this many RENAMEs with NFS3ERR_ACCES before accepting.
    pub rename_acces_once: bool,
    /// Swallow this many incoming UDP datagrams (forces retransmission).
    pub drop_datagrams: u32,
    /// Reply once with a wrong xid before the real reply (UDP only).
    pub bogus_xid_once: bool,
    /// Paths the mount daemon currently records as mounted.
    pub mounts: Vec<Vec<u8>>,
    pub umounts: Vec<Vec<u8>>,
    /// FSINFO preferred transfer sizes.
    pub rtpref: u32,
    pub wtpref: u32,
    /// v2 STATFS tsize.
    pub tsize2: u32,
    /// READDIR entries returned per exchange.
    pub readdir_page: usize,
    /// The port GETPORT hands out; set when the server starts.
    pub getport_answer: u32,
}

impl ServerState {
    pub fn new() -> ServerState {
        let mut state = ServerState {
            nodes: HashMap::new(),
            next_id: ROOT_ID + 1,
            export: b"/export".to_vec(),
            calls: Vec::new(),
            stale_once: HashSet::new(),
            rename_acces_once: false,
            drop_datagrams: 0,
            bogus_xid_once: false,
            mounts: Vec::new(),
            umounts: Vec::new(),
            rtpref: 8192,
            wtpref: 8192,
            tsize2: 8192,
            readdir_page: 2,
            getport_answer: 0,
        };
        state.nodes.insert(ROOT_ID, Node::dir(ROOT_ID, 0, 0, ROOT_ID));
        state
    }

    /// The tree most scenarios run against:
    ///
    /// ```text
    /// /            uid 0
    /// /a           uid 10   /a/b        uid 20   /a/b/c.txt  uid 30
    /// /u1          uid 101  /u1/x       uid 101
    /// /u2          uid 102
    /// /hello.txt   uid 0    "hello world\n"
    /// /big.bin     uid 0    20000 bytes
    /// /link.ln     uid 0    -> hello.txt
    /// ```
    pub fn demo() -> ServerState {
        let mut state = ServerState::new();
        let a = state.add_dir(ROOT_ID, b"a", 10, 10);
        let b = state.add_dir(a, b"b", 20, 20);
        state.add_file(b, b"c.txt", 30, 30, b"the hidden payload".to_vec());
        let u1 = state.add_dir(ROOT_ID, b"u1", 101, 101);
        state.add_dir(ROOT_ID, b"u2", 102, 102);
        state.add_file(u1, b"x", 101, 101, b"moving target".to_vec());
        state.add_file(ROOT_ID, b"hello.txt", 0, 0, b"hello world\n".to_vec());
        let big: Vec<u8> = (0..20000_u32).map(|i| (i % 251) as u8).collect();
        state.add_file(ROOT_ID, b"big.bin", 0, 0, big);
        let link = state.add_file(ROOT_ID, b"link.ln", 0, 0, b"hello.txt".to_vec());
        state.nodes.get_mut(&link).unwrap().kind = nfs3::ftype3::NF3LNK;
        state.nodes.get_mut(&link).unwrap().mode = 0o777;
        state
    }

    pub fn add_dir(&mut self, parent: u64, name: &[u8], uid: u32, gid: u32) -> u64 {
        let id = self.alloc_id();
        self.nodes.insert(id, Node::dir(id, uid, gid, parent));
        self.nodes.get_mut(&parent).unwrap().children.push((name.to_vec(), id));
        id
    }

    pub fn add_file(
        &mut self,
        parent: u64,
        name: &[u8],
        uid: u32,
        gid: u32,
        content: Vec<u8>,
    ) -> u64 {
        let id = self.alloc_id();
        self.nodes.insert(id, Node::file(id, uid, gid, content, parent));
        self.nodes.get_mut(&parent).unwrap().children.push((name.to_vec(), id));
        id
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn lookup_id(&self, dir: u64, name: &[u8]) -> Option<u64> {
        if name == b".." {
            return self.nodes.get(&dir).map(|n| n.parent);
        }
        if name == b"." {
            return Some(dir);
        }
        self.nodes
            .get(&dir)?
            .children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    /// Fileid of an absolute path in the mock tree (test convenience).
    pub fn id_of(&self, path: &str) -> u64 {
        let mut id = ROOT_ID;
        for comp in path.split('/').filter(|c| !c.is_empty()) {
            id = self.lookup_id(id, comp.as_bytes()).expect("path exists in mock tree");
        }
        id
    }

    /// Calls recorded since `mark`, restricted to the NFS program.
    pub fn nfs_calls_since(&self, mark: usize) -> Vec<CallRecord> {
        self.calls[mark..]
            .iter()
            .filter(|c| c.prog == nfs3::PROGRAM)
            .cloned()
            .collect()
    }

    fn fattr3(&self, node: &Node) -> nfs3::fattr3 {
        nfs3::fattr3 {
            ftype: node.kind,
            mode: node.mode,
            nlink: 1,
            uid: node.uid,
            gid: node.gid,
            size: node.size(),
            used: node.size(),
            rdev: nfs3::specdata3::default(),
            fsid: 1,
            fileid: node.fileid,
            atime: nfs3::nfstime3 { seconds: 1_700_000_000, nseconds: 0 },
            mtime: nfs3::nfstime3 { seconds: 1_700_000_000, nseconds: 0 },
            ctime: nfs3::nfstime3 { seconds: 1_700_000_000, nseconds: 0 },
        }
    }

    fn fattr2(&self, node: &Node) -> nfs2::fattr2 {
        let kind = match node.kind {
            nfs3::ftype3::NF3REG => nfs2::ftype2::NFREG,
            nfs3::ftype3::NF3DIR => nfs2::ftype2::NFDIR,
            nfs3::ftype3::NF3LNK => nfs2::ftype2::NFLNK,
            _ => nfs2::ftype2::NFNON,
        };
        nfs2::fattr2 {
            ftype: kind,
            mode: node.mode,
            nlink: 1,
            uid: node.uid,
            gid: node.gid,
            size: node.size() as u32,
            blocksize: 512,
            rdev: 0,
            blocks: (node.size() as u32).div_ceil(512),
            fsid: 1,
            fileid: node.fileid as u32,
            atime: nfs2::timeval2 { seconds: 1_700_000_000, useconds: 0 },
            mtime: nfs2::timeval2 { seconds: 1_700_000_000, useconds: 0 },
            ctime: nfs2::timeval2 { seconds: 1_700_000_000, useconds: 0 },
        }
    }
}

pub fn fh3_bytes(fileid: u64) -> Vec<u8> {
    fileid.to_be_bytes().to_vec()
}

pub fn fh2_bytes(fileid: u64) -> [u8; 32] {
    let mut out = [0_u8; 32];
    out[..8].copy_from_slice(&fileid.to_be_bytes());
    out
}

fn fh3_id(fh: &nfs3::nfs_fh3) -> Option<u64> {
    fh.data.get(..8).map(|b| u64::from_be_bytes(b.try_into().unwrap()))
}

fn fh2_id(fh: &[u8; 32]) -> u64 {
    u64::from_be_bytes(fh[..8].try_into().unwrap())
}

/// The mock server: one port, UDP and TCP, all three programs.
pub struct MockServer {
    pub port: u16,
    pub state: Arc<Mutex<ServerState>>,
}

impl MockServer {
    pub async fn start(state: ServerState) -> MockServer {
        trace_init();
        let state = Arc::new(Mutex::new(state));

        // same port number on both transports, so one GETPORT answer fits all
        let (tcp, udp) = loop {
            let tcp = TcpListener::bind("127.0.0.1:0").await.expect("bind tcp");
            let port = tcp.local_addr().unwrap().port();
            match UdpSocket::bind(("127.0.0.1", port)).await {
                Ok(udp) => break (tcp, udp),
                Err(_) => continue,
            }
        };
        let port = tcp.local_addr().unwrap().port();
        state.lock().unwrap().getport_answer = u32::from(port);

        let udp_state = state.clone();
        tokio::spawn(async move {
            let mut buf = vec![0_u8; 70000];
            loop {
                let Ok((n, peer)) = udp.recv_from(&mut buf).await else { break };
                let replies = {
                    let mut state = udp_state.lock().unwrap();
                    if state.drop_datagrams > 0 {
                        state.drop_datagrams -= 1;
                        continue;
                    }
                    let mut replies = Vec::new();
                    if state.bogus_xid_once {
                        state.bogus_xid_once = false;
                        replies.push(success_reply_bytes(0xdead_beef, &()));
                    }
                    if let Some(reply) = handle_message(&mut state, &buf[..n]) {
                        replies.push(reply);
                    }
                    replies
                };
                for reply in replies {
                    let _ = udp.send_to(&reply, peer).await;
                }
            }
        });

        let tcp_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = tcp.accept().await else { break };
                let state = tcp_state.clone();
                tokio::spawn(async move {
                    let _ = serve_stream(stream, state).await;
                });
            }
        });

        MockServer { port, state }
    }

    pub fn mark(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

/// One TCP connection: record-marked requests in, replies out, until the
/// peer hangs up.
async fn serve_stream(
    mut stream: tokio::net::TcpStream,
    state: Arc<Mutex<ServerState>>,
) -> anyhow::Result<()> {
    loop {
        let request = read_record(&mut stream).await?;
        let reply = {
            let mut state = state.lock().unwrap();
            handle_message(&mut state, &request)
        };
        if let Some(reply) = reply {
            write_record(&mut stream, &reply).await?;
        }
    }
}

fn success_reply(xid: u32) -> rpc_msg {
    rpc_msg {
        xid,
        body: rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted_reply {
            verf: opaque_auth::default(),
            reply_data: accept_body::SUCCESS,
        })),
    }
}

fn success_reply_bytes<B: Serialize>(xid: u32, body: &B) -> Vec<u8> {
    let mut out = Vec::new();
    success_reply(xid).serialize(&mut out).unwrap();
    body.serialize(&mut out).unwrap();
    out
}

/// Decodes one call, dispatches it, and encodes the reply. `None` drops the
/// message (malformed input).
fn handle_message(state: &mut ServerState, request: &[u8]) -> Option<Vec<u8>> {
    let mut cursor = Cursor::new(request.to_vec());
    let msg: rpc_msg = deserialize(&mut cursor).ok()?;
    let rpc_body::CALL(call) = msg.body else { return None };

    let (uid, gid, machinename) = match call.cred.flavor {
        auth_flavor::AUTH_UNIX => {
            let cred: auth_unix = deserialize(&mut Cursor::new(&call.cred.body)).ok()?;
            (cred.uid, cred.gid, cred.machinename)
        }
        _ => (u32::MAX, u32::MAX, Vec::new()),
    };
    state.calls.push(CallRecord {
        prog: call.prog,
        vers: call.vers,
        proc: call.proc,
        uid,
        gid,
        machinename,
    });

    let mut body = Vec::new();
    match call.prog {
        portmap::PROGRAM => handle_portmap(state, &call, &mut cursor, &mut body)?,
        mount::PROGRAM => handle_mount(state, &call, &mut cursor, &mut body)?,
        nfs3::PROGRAM if call.vers == 3 => handle_nfs3(state, &call, &mut cursor, &mut body)?,
        nfs3::PROGRAM if call.vers == 2 => handle_nfs2(state, &call, &mut cursor, &mut body)?,
        _ => return None,
    }

    let mut out = Vec::new();
    success_reply(msg.xid).serialize(&mut out).unwrap();
    out.extend_from_slice(&body);
    Some(out)
}

fn handle_portmap(
    state: &mut ServerState,
    call: &call_body,
    args: &mut impl Read,
    out: &mut impl Write,
) -> Option<()> {
    match call.proc {
        0 => Some(()),
        // GETPORT: every program lives on this very port
        3 => {
            let _mapping: portmap::mapping = deserialize(args).ok()?;
            state.getport_answer.serialize(out).ok()?;
            Some(())
        }
        _ => None,
    }
}

fn handle_mount(
    state: &mut ServerState,
    call: &call_body,
    args: &mut impl Read,
    out: &mut impl Write,
) -> Option<()> {
    match call.proc {
        0 => Some(()),
        // MNT
        1 => {
            let path: Vec<u8> = deserialize(args).ok()?;
            if path != state.export {
                mount::mountstat3::MNT3ERR_NOENT.serialize(out).ok()?;
                return Some(());
            }
            state.mounts.push(path);
            match call.vers {
                1 => {
                    0_u32.serialize(out).ok()?;
                    fh2_bytes(ROOT_ID).serialize(out).ok()?;
                }
                _ => {
                    mount::mountstat3::MNT3_OK.serialize(out).ok()?;
                    let res = mount::mountres3_ok {
                        fhandle: fh3_bytes(ROOT_ID),
                        auth_flavors: vec![auth_flavor::AUTH_UNIX as u32],
                    };
                    res.serialize(out).ok()?;
                }
            }
            Some(())
        }
        // DUMP
        2 => {
            let list = mount::mount_list {
                entries: state
                    .mounts
                    .iter()
                    .map(|m| mount::mount_body {
                        hostname: b"mockclient".to_vec(),
                        directory: m.clone(),
                    })
                    .collect(),
            };
            list.serialize(out).ok()?;
            Some(())
        }
        // UMNT
        3 => {
            let path: Vec<u8> = deserialize(args).ok()?;
            state.umounts.push(path.clone());
            state.mounts.retain(|m| *m != path);
            Some(())
        }
        // EXPORT
        5 => {
            let list = mount::exports {
                entries: vec![mount::export_node {
                    dir: state.export.clone(),
                    groups: vec![b"*".to_vec()],
                }],
            };
            list.serialize(out).ok()?;
            Some(())
        }
        _ => None,
    }
}

/// Writes `status` followed by nothing; the client discards failure bodies,
/// but v3 failure arms still carry their post-op attribute unions, so emit
/// empty ones where the procedure calls for them.
fn v3_error(out: &mut impl Write, status: nfs3::nfsstat3, attr_unions: usize) -> Option<()> {
    status.serialize(out).ok()?;
    for _ in 0..attr_unions {
        nfs3::post_op_attr::Void.serialize(out).ok()?;
    }
    Some(())
}

fn handle_nfs3(
    state: &mut ServerState,
    call: &call_body,
    args: &mut impl Read,
    out: &mut impl Write,
) -> Option<()> {
    use nfs3::nfsstat3::*;
    use nfs3::NfsProc3::*;

    let proc = match call.proc {
        0 => NFSPROC3_NULL,
        1 => NFSPROC3_GETATTR,
        2 => NFSPROC3_SETATTR,
        3 => NFSPROC3_LOOKUP,
        4 => NFSPROC3_ACCESS,
        5 => NFSPROC3_READLINK,
        6 => NFSPROC3_READ,
        7 => NFSPROC3_WRITE,
        8 => NFSPROC3_CREATE,
        9 => NFSPROC3_MKDIR,
        10 => NFSPROC3_SYMLINK,
        11 => NFSPROC3_MKNOD,
        12 => NFSPROC3_REMOVE,
        13 => NFSPROC3_RMDIR,
        14 => NFSPROC3_RENAME,
        15 => NFSPROC3_LINK,
        16 => NFSPROC3_READDIR,
        17 => NFSPROC3_READDIRPLUS,
        18 => NFSPROC3_FSSTAT,
        19 => NFSPROC3_FSINFO,
        20 => NFSPROC3_PATHCONF,
        21 => NFSPROC3_COMMIT,
        _ => return None,
    };

    // one-shot staleness injection, keyed by the primary handle
    let mut check_stale = |state: &mut ServerState, id: u64| -> bool {
        state.stale_once.remove(&id)
    };

    match proc {
        NFSPROC3_NULL => Some(()),
        NFSPROC3_GETATTR => {
            let fh: nfs3::nfs_fh3 = deserialize(args).ok()?;
            let id = fh3_id(&fh)?;
            if check_stale(state, id) {
                return v3_error(out, NFS3ERR_STALE, 0);
            }
            match state.nodes.get(&id) {
                Some(node) => {
                    NFS3_OK.serialize(out).ok()?;
                    state.fattr3(node).serialize(out).ok()?;
                }
                None => {
                    NFS3ERR_STALE.serialize(out).ok()?;
                }
            }
            Some(())
        }
        NFSPROC3_SETATTR => {
            let sargs: nfs3::SETATTR3args = deserialize(args).ok()?;
            let id = fh3_id(&sargs.object)?;
            if check_stale(state, id) {
                return v3_error(out, NFS3ERR_STALE, 2);
            }
            let Some(node) = state.nodes.get_mut(&id) else {
                return v3_error(out, NFS3ERR_STALE, 2);
            };
            if let nfs3::set_mode3::mode(m) = sargs.new_attributes.mode {
                node.mode = m;
            }
            if let nfs3::set_uid3::uid(u) = sargs.new_attributes.uid {
                node.uid = u;
            }
            if let nfs3::set_gid3::gid(g) = sargs.new_attributes.gid {
                node.gid = g;
            }
            if let nfs3::set_size3::size(s) = sargs.new_attributes.size {
                node.content.resize(s as usize, 0);
            }
            let node = state.nodes.get(&id).unwrap().clone();
            NFS3_OK.serialize(out).ok()?;
            let wcc = nfs3::wcc_data {
                before: nfs3::pre_op_attr::Void,
                after: nfs3::post_op_attr::attributes(state.fattr3(&node)),
            };
            wcc.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_LOOKUP => {
            let dirops: nfs3::diropargs3 = deserialize(args).ok()?;
            let dir_id = fh3_id(&dirops.dir)?;
            if check_stale(state, dir_id) {
                return v3_error(out, NFS3ERR_STALE, 1);
            }
            if state.nodes.get(&dir_id).is_none() {
                return v3_error(out, NFS3ERR_STALE, 1);
            }
            match state.lookup_id(dir_id, &dirops.name) {
                Some(id) => {
                    let node = state.nodes.get(&id).unwrap().clone();
                    let dir = state.nodes.get(&dir_id).unwrap().clone();
                    NFS3_OK.serialize(out).ok()?;
                    nfs3::nfs_fh3 { data: fh3_bytes(id) }.serialize(out).ok()?;
                    nfs3::post_op_attr::attributes(state.fattr3(&node)).serialize(out).ok()?;
                    nfs3::post_op_attr::attributes(state.fattr3(&dir)).serialize(out).ok()?;
                    Some(())
                }
                None => v3_error(out, NFS3ERR_NOENT, 1),
            }
        }
        NFSPROC3_ACCESS => {
            let aargs: nfs3::fs::ACCESS3args = deserialize(args).ok()?;
            let id = fh3_id(&aargs.object)?;
            let Some(node) = state.nodes.get(&id) else {
                return v3_error(out, NFS3ERR_STALE, 1);
            };
            let node = node.clone();
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::fs::ACCESS3resok {
                obj_attributes: nfs3::post_op_attr::attributes(state.fattr3(&node)),
                access: aargs.access,
            };
            res.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_READLINK => {
            let fh: nfs3::nfs_fh3 = deserialize(args).ok()?;
            let id = fh3_id(&fh)?;
            let Some(node) = state.nodes.get(&id) else {
                return v3_error(out, NFS3ERR_STALE, 1);
            };
            let node = node.clone();
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::fs::READLINK3resok {
                symlink_attributes: nfs3::post_op_attr::attributes(state.fattr3(&node)),
                data: node.content.clone().into(),
            };
            res.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_READ => {
            let rargs: nfs3::file::READ3args = deserialize(args).ok()?;
            let id = fh3_id(&rargs.file)?;
            if check_stale(state, id) {
                return v3_error(out, NFS3ERR_STALE, 1);
            }
            let Some(node) = state.nodes.get(&id) else {
                return v3_error(out, NFS3ERR_STALE, 1);
            };
            let node = node.clone();
            let start = (rargs.offset as usize).min(node.content.len());
            let end = (start + rargs.count as usize).min(node.content.len());
            let data = node.content[start..end].to_vec();
            let eof = end >= node.content.len();
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::file::READ3resok {
                file_attributes: nfs3::post_op_attr::attributes(state.fattr3(&node)),
                count: data.len() as u32,
                eof,
                data,
            };
            res.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_WRITE => {
            let wargs: nfs3::file::WRITE3args = deserialize(args).ok()?;
            let id = fh3_id(&wargs.file)?;
            if check_stale(state, id) {
                return v3_error(out, NFS3ERR_STALE, 2);
            }
            let Some(node) = state.nodes.get_mut(&id) else {
                return v3_error(out, NFS3ERR_STALE, 2);
            };
            let offset = wargs.offset as usize;
            if node.content.len() < offset + wargs.data.len() {
                node.content.resize(offset + wargs.data.len(), 0);
            }
            node.content[offset..offset + wargs.data.len()].copy_from_slice(&wargs.data);
            let node = state.nodes.get(&id).unwrap().clone();
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::file::WRITE3resok {
                file_wcc: nfs3::wcc_data {
                    before: nfs3::pre_op_attr::Void,
                    after: nfs3::post_op_attr::attributes(state.fattr3(&node)),
                },
                count: wargs.count,
                committed: nfs3::file::stable_how::DATA_SYNC,
                verf: [0; 8],
            };
            res.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_CREATE => {
            let cargs: nfs3::dir::CREATE3args = deserialize(args).ok()?;
            let dir_id = fh3_id(&cargs.where_dir.dir)?;
            if state.lookup_id(dir_id, &cargs.where_dir.name).is_some() {
                NFS3ERR_EXIST.serialize(out).ok()?;
                nfs3::wcc_data::default().serialize(out).ok()?;
                return Some(());
            }
            let (uid, gid, mode) = match &cargs.how {
                nfs3::dir::createhow3::UNCHECKED(sa) | nfs3::dir::createhow3::GUARDED(sa) => {
                    sattr_identity(sa)
                }
                nfs3::dir::createhow3::EXCLUSIVE(_) => (0, 0, 0o644),
            };
            let id = state.add_file(dir_id, &cargs.where_dir.name, uid, gid, Vec::new());
            state.nodes.get_mut(&id).unwrap().mode = mode;
            write_create_resok(state, out, id)
        }
        NFSPROC3_MKDIR => {
            let margs: nfs3::dir::MKDIR3args = deserialize(args).ok()?;
            let dir_id = fh3_id(&margs.where_dir.dir)?;
            if state.lookup_id(dir_id, &margs.where_dir.name).is_some() {
                NFS3ERR_EXIST.serialize(out).ok()?;
                nfs3::wcc_data::default().serialize(out).ok()?;
                return Some(());
            }
            let (uid, gid, mode) = sattr_identity(&margs.attributes);
            let id = state.add_dir(dir_id, &margs.where_dir.name, uid, gid);
            state.nodes.get_mut(&id).unwrap().mode = mode;
            write_create_resok(state, out, id)
        }
        NFSPROC3_SYMLINK => {
            let sargs: nfs3::dir::SYMLINK3args = deserialize(args).ok()?;
            let dir_id = fh3_id(&sargs.where_dir.dir)?;
            let (uid, gid, _) = sattr_identity(&sargs.symlink.symlink_attributes);
            let id = state.add_file(
                dir_id,
                &sargs.where_dir.name,
                uid,
                gid,
                sargs.symlink.symlink_data.0.clone(),
            );
            state.nodes.get_mut(&id).unwrap().kind = nfs3::ftype3::NF3LNK;
            write_create_resok(state, out, id)
        }
        NFSPROC3_MKNOD => {
            let margs: nfs3::dir::MKNOD3args = deserialize(args).ok()?;
            let dir_id = fh3_id(&margs.where_dir.dir)?;
            let (kind, sa) = match &margs.what {
                nfs3::dir::mknoddata3::CHR(d) => (nfs3::ftype3::NF3CHR, d.dev_attributes),
                nfs3::dir::mknoddata3::BLK(d) => (nfs3::ftype3::NF3BLK, d.dev_attributes),
                nfs3::dir::mknoddata3::SOCK(sa) => (nfs3::ftype3::NF3SOCK, *sa),
                nfs3::dir::mknoddata3::FIFO(sa) => (nfs3::ftype3::NF3FIFO, *sa),
            };
            let (uid, gid, mode) = sattr_identity(&sa);
            let id = state.add_file(dir_id, &margs.where_dir.name, uid, gid, Vec::new());
            let node = state.nodes.get_mut(&id).unwrap();
            node.kind = kind;
            node.mode = mode;
            write_create_resok(state, out, id)
        }
        NFSPROC3_REMOVE | NFSPROC3_RMDIR => {
            let dirops: nfs3::diropargs3 = deserialize(args).ok()?;
            let dir_id = fh3_id(&dirops.dir)?;
            match state.lookup_id(dir_id, &dirops.name) {
                Some(id) => {
                    state.nodes.remove(&id);
                    let dir = state.nodes.get_mut(&dir_id).unwrap();
                    dir.children.retain(|(_, cid)| *cid != id);
                    NFS3_OK.serialize(out).ok()?;
                    nfs3::wcc_data::default().serialize(out).ok()?;
                    Some(())
                }
                None => {
                    NFS3ERR_NOENT.serialize(out).ok()?;
                    nfs3::wcc_data::default().serialize(out).ok()?;
                    Some(())
                }
            }
        }
        NFSPROC3_RENAME => {
            let rargs: nfs3::dir::RENAME3args = deserialize(args).ok()?;
            if state.rename_acces_once {
                state.rename_acces_once = false;
                NFS3ERR_ACCES.serialize(out).ok()?;
                nfs3::dir::RENAME3res_body::default().serialize(out).ok()?;
                return Some(());
            }
            let from_dir = fh3_id(&rargs.from.dir)?;
            let to_dir = fh3_id(&rargs.to.dir)?;
            let Some(id) = state.lookup_id(from_dir, &rargs.from.name) else {
                NFS3ERR_NOENT.serialize(out).ok()?;
                nfs3::dir::RENAME3res_body::default().serialize(out).ok()?;
                return Some(());
            };
            state
                .nodes
                .get_mut(&from_dir)
                .unwrap()
                .children
                .retain(|(_, cid)| *cid != id);
            state
                .nodes
                .get_mut(&to_dir)
                .unwrap()
                .children
                .push((rargs.to.name.0.clone(), id));
            state.nodes.get_mut(&id).unwrap().parent = to_dir;
            NFS3_OK.serialize(out).ok()?;
            nfs3::dir::RENAME3res_body::default().serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_LINK => {
            let largs: nfs3::file::LINK3args = deserialize(args).ok()?;
            let file_id = fh3_id(&largs.file)?;
            let dir_id = fh3_id(&largs.link.dir)?;
            state
                .nodes
                .get_mut(&dir_id)
                .unwrap()
                .children
                .push((largs.link.name.0.clone(), file_id));
            NFS3_OK.serialize(out).ok()?;
            nfs3::file::LINK3res_body::default().serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_READDIR => {
            let rargs: nfs3::dir::READDIR3args = deserialize(args).ok()?;
            let dir_id = fh3_id(&rargs.dir)?;
            if check_stale(state, dir_id) {
                return v3_error(out, NFS3ERR_STALE, 1);
            }
            let Some(dir) = state.nodes.get(&dir_id) else {
                return v3_error(out, NFS3ERR_STALE, 1);
            };
            let dir = dir.clone();
            let start = rargs.cookie as usize;
            let page = state.readdir_page.max(1);
            let end = (start + page).min(dir.children.len());
            let entries: Vec<nfs3::dir::entry3> = dir.children[start..end]
                .iter()
                .enumerate()
                .map(|(i, (name, id))| nfs3::dir::entry3 {
                    fileid: *id,
                    name: name.clone().into(),
                    cookie: (start + i + 1) as u64,
                })
                .collect();
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::dir::READDIR3resok {
                dir_attributes: nfs3::post_op_attr::attributes(state.fattr3(&dir)),
                cookieverf: *b"mockverf",
                reply: nfs3::dir::dirlist3 { entries, eof: end >= dir.children.len() },
            };
            res.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_READDIRPLUS => {
            let rargs: nfs3::dir::READDIRPLUS3args = deserialize(args).ok()?;
            let dir_id = fh3_id(&rargs.dir)?;
            let Some(dir) = state.nodes.get(&dir_id) else {
                return v3_error(out, NFS3ERR_STALE, 1);
            };
            let dir = dir.clone();
            let start = rargs.cookie as usize;
            let end = dir.children.len();
            let entries: Vec<nfs3::dir::entryplus3> = dir.children[start..end]
                .iter()
                .enumerate()
                .map(|(i, (name, id))| {
                    let node = state.nodes.get(id).unwrap().clone();
                    nfs3::dir::entryplus3 {
                        fileid: *id,
                        name: name.clone().into(),
                        cookie: (start + i + 1) as u64,
                        name_attributes: nfs3::post_op_attr::attributes(state.fattr3(&node)),
                        name_handle: nfs3::post_op_fh3::handle(nfs3::nfs_fh3 {
                            data: fh3_bytes(*id),
                        }),
                    }
                })
                .collect();
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::dir::READDIRPLUS3resok {
                dir_attributes: nfs3::post_op_attr::attributes(state.fattr3(&dir)),
                cookieverf: *b"mockverf",
                reply: nfs3::dir::dirlistplus3 { entries, eof: true },
            };
            res.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_FSSTAT => {
            let _fh: nfs3::nfs_fh3 = deserialize(args).ok()?;
            let root = state.nodes.get(&ROOT_ID).unwrap().clone();
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::fs::FSSTAT3resok {
                obj_attributes: nfs3::post_op_attr::attributes(state.fattr3(&root)),
                tbytes: 1 << 30,
                fbytes: 1 << 29,
                abytes: 1 << 28,
                tfiles: 1000,
                ffiles: 900,
                afiles: 900,
                invarsec: 0,
            };
            res.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_FSINFO => {
            let _fh: nfs3::nfs_fh3 = deserialize(args).ok()?;
            let root = state.nodes.get(&ROOT_ID).unwrap().clone();
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::fs::FSINFO3resok {
                obj_attributes: nfs3::post_op_attr::attributes(state.fattr3(&root)),
                rtmax: 64 * 1024,
                rtpref: state.rtpref,
                rtmult: 512,
                wtmax: 64 * 1024,
                wtpref: state.wtpref,
                wtmult: 512,
                dtpref: 4096,
                maxfilesize: u64::MAX,
                time_delta: nfs3::nfstime3 { seconds: 0, nseconds: 1 },
                properties: nfs3::fs::FSF_HOMOGENEOUS | nfs3::fs::FSF_SYMLINK,
            };
            res.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_PATHCONF => {
            let _fh: nfs3::nfs_fh3 = deserialize(args).ok()?;
            let root = state.nodes.get(&ROOT_ID).unwrap().clone();
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::fs::PATHCONF3resok {
                obj_attributes: nfs3::post_op_attr::attributes(state.fattr3(&root)),
                linkmax: 32000,
                name_max: 255,
                no_trunc: true,
                chown_restricted: false,
                case_insensitive: false,
                case_preserving: true,
            };
            res.serialize(out).ok()?;
            Some(())
        }
        NFSPROC3_COMMIT => {
            let _cargs: nfs3::file::COMMIT3args = deserialize(args).ok()?;
            NFS3_OK.serialize(out).ok()?;
            let res = nfs3::file::COMMIT3resok {
                file_wcc: nfs3::wcc_data::default(),
                verf: [0; 8],
            };
            res.serialize(out).ok()?;
            Some(())
        }
    }
}

fn sattr_identity(sa: &nfs3::sattr3) -> (u32, u32, u32) {
    let uid = match sa.uid {
        nfs3::set_uid3::uid(u) => u,
        nfs3::set_uid3::Void => 0,
    };
    let gid = match sa.gid {
        nfs3::set_gid3::gid(g) => g,
        nfs3::set_gid3::Void => 0,
    };
    let mode = match sa.mode {
        nfs3::set_mode3::mode(m) => m,
        nfs3::set_mode3::Void => 0o644,
    };
    (uid, gid, mode)
}

fn write_create_resok(
    state: &mut ServerState,
    out: &mut impl Write,
    id: u64,
) -> Option<()> {
    let node = state.nodes.get(&id).unwrap().clone();
    nfs3::nfsstat3::NFS3_OK.serialize(out).ok()?;
    let res = nfs3::dir::CREATE3resok {
        obj: nfs3::post_op_fh3::handle(nfs3::nfs_fh3 { data: fh3_bytes(id) }),
        obj_attributes: nfs3::post_op_attr::attributes(state.fattr3(&node)),
        dir_wcc: nfs3::wcc_data::default(),
    };
    res.serialize(out).ok()?;
    Some(())
}

fn handle_nfs2(
    state: &mut ServerState,
    call: &call_body,
    args: &mut impl Read,
    out: &mut impl Write,
) -> Option<()> {
    use nfs2::nfsstat2::*;

    match call.proc {
        0 => Some(()),
        // GETATTR
        1 => {
            let fh: nfs2::fhandle2 = deserialize(args).ok()?;
            let id = fh2_id(&fh);
            if state.stale_once.remove(&id) {
                NFSERR_STALE.serialize(out).ok()?;
                return Some(());
            }
            match state.nodes.get(&id) {
                Some(node) => {
                    let node = node.clone();
                    NFS_OK.serialize(out).ok()?;
                    state.fattr2(&node).serialize(out).ok()?;
                }
                None => {
                    NFSERR_STALE.serialize(out).ok()?;
                }
            }
            Some(())
        }
        // LOOKUP
        4 => {
            let dirops: nfs2::diropargs2 = deserialize(args).ok()?;
            let dir_id = fh2_id(&dirops.dir);
            match state.lookup_id(dir_id, &dirops.name) {
                Some(id) => {
                    let node = state.nodes.get(&id).unwrap().clone();
                    NFS_OK.serialize(out).ok()?;
                    let res = nfs2::diropres2_ok {
                        file: fh2_bytes(id),
                        attributes: state.fattr2(&node),
                    };
                    res.serialize(out).ok()?;
                }
                None => {
                    NFSERR_NOENT.serialize(out).ok()?;
                }
            }
            Some(())
        }
        // READ
        6 => {
            let rargs: nfs2::readargs2 = deserialize(args).ok()?;
            let id = fh2_id(&rargs.file);
            let Some(node) = state.nodes.get(&id) else {
                NFSERR_STALE.serialize(out).ok()?;
                return Some(());
            };
            let node = node.clone();
            let start = (rargs.offset as usize).min(node.content.len());
            let end = (start + rargs.count as usize).min(node.content.len());
            NFS_OK.serialize(out).ok()?;
            let res = nfs2::readres2_ok {
                attributes: state.fattr2(&node),
                data: node.content[start..end].to_vec(),
            };
            res.serialize(out).ok()?;
            Some(())
        }
        // READDIR
        16 => {
            let rargs: nfs2::readdirargs2 = deserialize(args).ok()?;
            let dir_id = fh2_id(&rargs.dir);
            let Some(dir) = state.nodes.get(&dir_id) else {
                NFSERR_STALE.serialize(out).ok()?;
                return Some(());
            };
            let dir = dir.clone();
            let start = rargs.cookie as usize;
            let page = state.readdir_page.max(1);
            let end = (start + page).min(dir.children.len());
            let entries: Vec<nfs2::entry2> = dir.children[start..end]
                .iter()
                .enumerate()
                .map(|(i, (name, id))| nfs2::entry2 {
                    fileid: *id as u32,
                    name: name.clone().into(),
                    cookie: (start + i + 1) as u32,
                })
                .collect();
            NFS_OK.serialize(out).ok()?;
            let res = nfs2::readdirres2_ok { entries, eof: end >= dir.children.len() };
            res.serialize(out).ok()?;
            Some(())
        }
        // STATFS
        17 => {
            let _fh: nfs2::fhandle2 = deserialize(args).ok()?;
            NFS_OK.serialize(out).ok()?;
            let res = nfs2::statfsres2_ok {
                tsize: state.tsize2,
                bsize: 1024,
                blocks: 10000,
                bfree: 5000,
                bavail: 4000,
            };
            res.serialize(out).ok()?;
            Some(())
        }
        _ => None,
    }
}
