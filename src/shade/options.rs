//! Mount-time configuration.
//!
//! Options mirror the classic mount-option surface: a comma-separated
//! `name=value` string (the form a FUSE `-o` list arrives in) or direct
//! field access on [`MountOptions`]. Ports and transports are written
//! `PORT/TRANSPORT`, with either half optional.

use std::str::FromStr;
use std::time::Duration;

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::client::Version;
use crate::errors::Error;
use crate::protocol::xdr::nfs3::NFS3_FHSIZE;
use crate::rpc::Proto;

/// Where to reach one RPC service: an optional fixed port (portmap is asked
/// when absent) and the transport to use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortSpec {
    pub port: Option<u16>,
    pub proto: Proto,
}

impl Default for PortSpec {
    fn default() -> Self {
        PortSpec { port: None, proto: Proto::Udp }
    }
}

impl FromStr for PortSpec {
    type Err = Error;

    /// Accepts `"2049/tcp"`, `"635"`, `"udp"` or `"tcp"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::Config(format!("invalid port/transport: {s:?}"));
        match s.split_once('/') {
            Some((port, proto)) => Ok(PortSpec {
                port: Some(port.parse().map_err(|_| bad())?),
                proto: proto.parse().map_err(|_| bad())?,
            }),
            None => {
                if let Ok(port) = s.parse::<u16>() {
                    Ok(PortSpec { port: Some(port), ..Default::default() })
                } else {
                    Ok(PortSpec { port: None, proto: s.parse().map_err(|_| bad())? })
                }
            }
        }
    }
}

/// Decodes a `dirhandle` option: hex bytes, colons ignored, at most the v3
/// handle size.
pub fn parse_dirhandle(s: &str) -> Result<Vec<u8>, Error> {
    let hex: String = s.chars().filter(|c| *c != ':').collect();
    if hex.len() % 2 != 0 {
        return Err(Error::Config(format!("dirhandle has odd hex length: {s:?}")));
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for pair in hex.as_bytes().chunks(2) {
        let pair = std::str::from_utf8(pair).expect("hex input is ascii");
        let byte = u8::from_str_radix(pair, 16)
            .map_err(|_| Error::Config(format!("dirhandle is not hex: {s:?}")))?;
        bytes.push(byte);
    }
    if bytes.is_empty() || bytes.len() > NFS3_FHSIZE {
        return Err(Error::Config(format!(
            "dirhandle must be 1..={NFS3_FHSIZE} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Everything the mount sequence needs to know.
#[derive(Clone, Debug)]
pub struct MountOptions {
    /// The export to mount, `HOST:PATH`.
    pub server: String,
    /// UMNT right after MNT, dropping the server's mount record while the
    /// client keeps serving from the obtained root handle.
    pub hide: bool,
    /// Handle cache capacity.
    pub cachesize: usize,
    /// Handle cache freshness bound.
    pub cachetimeout: Duration,
    /// Mount daemon port/transport.
    pub mountport: PortSpec,
    /// NFS port/transport.
    pub nfsport: PortSpec,
    /// Where the portmapper listens; only consulted for services without a
    /// fixed port.
    pub portmap_port: u16,
    /// Root filehandle to adopt instead of calling MNT.
    pub dirhandle: Option<Vec<u8>>,
    /// Walk ".." from the adopted dirhandle up to the export root.
    pub getroot: bool,
    /// The machinename to claim in AUTH_UNIX credentials.
    pub fakename: Option<String>,
    /// Protocol version to speak; the mount protocol version follows it.
    pub version: Version,
}

impl MountOptions {
    pub fn new(server: impl Into<String>) -> MountOptions {
        MountOptions {
            server: server.into(),
            hide: false,
            cachesize: DEFAULT_CAPACITY,
            cachetimeout: DEFAULT_TTL,
            mountport: PortSpec::default(),
            nfsport: PortSpec::default(),
            portmap_port: crate::protocol::xdr::portmap::PORT,
            dirhandle: None,
            getroot: false,
            fakename: None,
            version: Version::V3,
        }
    }

    /// Splits `server` into host and export path.
    pub fn host_and_path(&self) -> Result<(&str, &str), Error> {
        self.server
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("server must be HOST:PATH, got {:?}", self.server)))
    }
}

impl FromStr for MountOptions {
    type Err = Error;

    /// Parses a comma-separated option list, e.g.
    /// `server=10.0.0.1:/export,hide,nfsport=2049/tcp,fakename=trusted`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut server = None;
        let mut options: Vec<(&str, Option<&str>)> = Vec::new();
        for item in s.split(',').filter(|i| !i.is_empty()) {
            match item.split_once('=') {
                Some(("server", v)) => server = Some(v.to_string()),
                Some((k, v)) => options.push((k, Some(v))),
                None => options.push((item, None)),
            }
        }
        let server = server.ok_or_else(|| Error::Config("no server specified".into()))?;
        let mut opts = MountOptions::new(server);

        fn need<'a>(key: &str, v: Option<&'a str>) -> Result<&'a str, Error> {
            v.ok_or_else(|| Error::Config(format!("option {key} needs a value")))
        }

        for (key, value) in options {
            match key {
                "hide" => opts.hide = true,
                "getroot" => opts.getroot = true,
                "cachesize" => {
                    opts.cachesize = need(key, value)?
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid cachesize: {value:?}")))?
                }
                "cachetimeout" => {
                    let secs: u64 = need(key, value)?
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid cachetimeout: {value:?}")))?;
                    opts.cachetimeout = Duration::from_secs(secs);
                }
                "mountport" => opts.mountport = need(key, value)?.parse()?,
                "nfsport" => opts.nfsport = need(key, value)?.parse()?,
                "portmapport" => {
                    opts.portmap_port = need(key, value)?
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid portmapport: {value:?}")))?
                }
                "dirhandle" => opts.dirhandle = Some(parse_dirhandle(need(key, value)?)?),
                "fakename" => opts.fakename = Some(need(key, value)?.to_string()),
                "vers" | "nfsvers" => {
                    opts.version = match need(key, value)? {
                        "2" => Version::V2,
                        "3" => Version::V3,
                        other => {
                            return Err(Error::Config(format!("unsupported version: {other}")))
                        }
                    }
                }
                other => return Err(Error::Config(format!("unknown option: {other}"))),
            }
        }
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portspec_accepts_all_spellings() {
        assert_eq!(
            "635/udp".parse::<PortSpec>().unwrap(),
            PortSpec { port: Some(635), proto: Proto::Udp }
        );
        assert_eq!(
            "tcp".parse::<PortSpec>().unwrap(),
            PortSpec { port: None, proto: Proto::Tcp }
        );
        assert_eq!(
            "2049".parse::<PortSpec>().unwrap(),
            PortSpec { port: Some(2049), proto: Proto::Udp }
        );
        assert!("banana".parse::<PortSpec>().is_err());
    }

    #[test]
    fn dirhandle_ignores_colons() {
        assert_eq!(parse_dirhandle("01:02:ff").unwrap(), vec![1, 2, 255]);
        assert_eq!(parse_dirhandle("0102ff").unwrap(), vec![1, 2, 255]);
        assert!(parse_dirhandle("0x!").is_err());
        assert!(parse_dirhandle("012").is_err());
        assert!(parse_dirhandle(&"00".repeat(65)).is_err());
    }

    #[test]
    fn option_string_round_trip() {
        let opts: MountOptions =
            "server=10.0.0.1:/export,hide,cachesize=16,cachetimeout=30,nfsport=2049/tcp,fakename=trusted,getroot"
                .parse()
                .unwrap();
        assert_eq!(opts.host_and_path().unwrap(), ("10.0.0.1", "/export"));
        assert!(opts.hide);
        assert!(opts.getroot);
        assert_eq!(opts.cachesize, 16);
        assert_eq!(opts.cachetimeout, Duration::from_secs(30));
        assert_eq!(opts.nfsport, PortSpec { port: Some(2049), proto: Proto::Tcp });
        assert_eq!(opts.fakename.as_deref(), Some("trusted"));
    }

    #[test]
    fn unknown_options_are_rejected() {
        assert!("server=h:/e,frobnicate".parse::<MountOptions>().is_err());
        assert!("hide".parse::<MountOptions>().is_err());
    }
}
