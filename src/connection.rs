use mio::{Interest, Token, net::TcpStream};
use std::{net::SocketAddr, os::fd::AsRawFd};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnState {
    Connected,
    Disconnected,
}

/// Read/write interest currently registered for a socket.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WatchMask {
    pub read: bool,
    pub write: bool,
}

impl WatchMask {
    pub const NONE: WatchMask = WatchMask {
        read: false,
        write: false,
    };
    pub const READ: WatchMask = WatchMask {
        read: true,
        write: false,
    };

    /// `None` when nothing is watched; mio has no empty interest set.
    pub fn interest(self) -> Option<Interest> {
        match (self.read, self.write) {
            (true, true) => Some(Interest::READABLE.add(Interest::WRITABLE)),
            (true, false) => Some(Interest::READABLE),
            (false, true) => Some(Interest::WRITABLE),
            (false, false) => None,
        }
    }
}

pub struct Connection {
    pub stream: TcpStream,
    pub token: Token,
    pub peer_addr: SocketAddr,
    pub name: String,
    pub state: ConnState,
    pub watch: WatchMask,
    /// Whether `watch` is currently known to the registry.
    pub registered: bool,
    pub conn_time: u64,
    pub ibuf: Vec<u8>,
    pub obuf: Vec<u8>,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        token: Token,
        peer_addr: SocketAddr,
        seq: u64,
        conn_time: u64,
    ) -> Self {
        let name = format!("conn#{seq}-{}-{conn_time}", stream.as_raw_fd());
        Connection {
            stream,
            token,
            peer_addr,
            name,
            state: ConnState::Connected,
            watch: WatchMask::NONE,
            registered: false,
            conn_time,
            ibuf: Vec::new(),
            obuf: Vec::new(),
        }
    }

    pub fn should_close(&self) -> bool {
        self.state == ConnState::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_mask_interest() {
        assert_eq!(WatchMask::NONE.interest(), None);
        assert_eq!(WatchMask::READ.interest(), Some(Interest::READABLE));
        let both = WatchMask {
            read: true,
            write: true,
        };
        let interest = both.interest().unwrap();
        assert!(interest.is_readable() && interest.is_writable());
        let write_only = WatchMask {
            read: false,
            write: true,
        };
        assert_eq!(write_only.interest(), Some(Interest::WRITABLE));
    }
}
