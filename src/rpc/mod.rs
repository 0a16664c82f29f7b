//! The RPC calling machinery: credential forging, transports, and the
//! call/reply cycle.
//!
//! A [`client::RpcClient`] frames calls per RFC 5531 and pushes them through
//! a [`transport::Transport`], which is either a retrying UDP socket or a
//! record-marked TCP stream. The [`auth::CredForger`] supplies the AUTH_UNIX
//! credential for each call; higher layers rewrite its identity just before
//! calling.

pub mod auth;
pub mod client;
pub mod transport;

pub use auth::CredForger;
pub use client::RpcClient;
pub use transport::{Proto, Transport, MAXBLKSIZE};
