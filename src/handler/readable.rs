use crate::{
    connection::{ConnState, Connection},
    proxyproto::{self, Decoded},
    util::update_interests,
};
use log::{debug, info, warn};
use mio::Registry;
use std::io::{ErrorKind, Read};

pub const READ_CHUNK: usize = 1024;
/// Chunks read per readiness event before yielding to other connections.
pub const MAX_READS_PER_EVENT: usize = 16;

/// Drains the socket into the input buffer, decoding after every chunk.
///
/// Decode failures are only logged: the buffer is kept and the connection
/// stays open until the peer closes it or a header finally decodes. After
/// [`MAX_READS_PER_EVENT`] chunks the interest is re-registered so the
/// remaining bytes raise a fresh event on the next poll.
pub fn handle_readable(conn: &mut Connection, registry: &Registry) {
    let mut buf = [0u8; READ_CHUNK];
    let mut reads = 0;
    loop {
        if reads == MAX_READS_PER_EVENT {
            debug!("{} read budget spent, re-arming", conn.name);
            if let Err(e) = update_interests(conn, registry) {
                warn!("{} update interests err {}", conn.name, e);
            }
            return;
        }

        match conn.stream.read(&mut buf) {
            Ok(0) => {
                conn.state = ConnState::Disconnected;
                info!("{} closed by peer", conn.name);
                return;
            }
            Ok(n) => {
                reads += 1;
                conn.ibuf.extend_from_slice(&buf[..n]);
                debug!("{} recv {} bytes, {} buffered", conn.name, n, conn.ibuf.len());

                match proxyproto::decode(&conn.ibuf) {
                    Ok(Decoded::Header(header)) => {
                        info!("{} proxy: {} -> {}", conn.name, header.src, header.dst);
                        conn.state = ConnState::Disconnected;
                        return;
                    }
                    Ok(Decoded::NeedMoreData) => {}
                    Err(e) => {
                        warn!("{} decode proxy proto err {} ({})", conn.name, e.code(), e);
                    }
                }
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => return,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("{} recv err {}", conn.name, e);
                return;
            }
        }
    }
}
