//! Single-threaded listener that reads the PROXY protocol header of every
//! accepted connection, logs the original endpoints and drops the connection.

pub mod address;
pub mod config;
pub mod connection;
pub mod handler;
pub mod proxyproto;
pub mod server;
pub mod util;

pub use address::{Family, InetAddress};
pub use config::{Conf, LogLevel};
pub use proxyproto::{DecodeError, Decoded, ProxyHeader, decode};
pub use server::{Server, StartError};
