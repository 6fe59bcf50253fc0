use crate::connection::Connection;
use log::{debug, info, warn};
use mio::Registry;
use std::{collections::HashMap, io::Result};

/// Pushes the connection's full watch mask to the registry.
pub fn update_interests(conn: &mut Connection, registry: &Registry) -> Result<()> {
    match (conn.watch.interest(), conn.registered) {
        (Some(interest), true) => registry.reregister(&mut conn.stream, conn.token, interest)?,
        (Some(interest), false) => {
            registry.register(&mut conn.stream, conn.token, interest)?;
            conn.registered = true;
        }
        (None, true) => {
            registry.deregister(&mut conn.stream)?;
            conn.registered = false;
        }
        (None, false) => {}
    }
    Ok(())
}

pub fn enable_reading(conn: &mut Connection, registry: &Registry) -> Result<()> {
    conn.watch.read = true;
    update_interests(conn, registry)
}

pub fn enable_writing(conn: &mut Connection, registry: &Registry) -> Result<()> {
    conn.watch.write = true;
    update_interests(conn, registry)
}

pub fn disable_reading(conn: &mut Connection, registry: &Registry) -> Result<()> {
    conn.watch.read = false;
    update_interests(conn, registry)
}

pub fn disable_writing(conn: &mut Connection, registry: &Registry) -> Result<()> {
    conn.watch.write = false;
    update_interests(conn, registry)
}

/// Deregisters and drops the connection, which closes its socket.
pub fn cleanup_connection(
    conn_id: usize,
    registry: &Registry,
    connections: &mut HashMap<usize, Connection>,
) {
    if let Some(mut conn) = connections.remove(&conn_id) {
        if conn.registered {
            if let Err(e) = registry.deregister(&mut conn.stream) {
                warn!("{} deregister err {}", conn.name, e);
            }
        }
        info!("remove {} (peer {})", conn.name, conn.peer_addr);
        debug!("close {}", conn.name);
    } else {
        warn!("No connection found for conn_id {} and can't cleanup", conn_id);
    }
}

/// Whole seconds on the monotonic clock.
pub fn steady_time() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if ret == 0 { ts.tv_sec as u64 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mio::{Events, Poll, Token, net::TcpStream};
    use std::{io::Write, net, time::Duration};

    const CONN: Token = Token(7);

    fn loopback_pair() -> (net::TcpStream, Connection) {
        let listener = net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (accepted, peer) = listener.accept().unwrap();
        accepted.set_nonblocking(true).unwrap();
        let conn = Connection::new(TcpStream::from_std(accepted), CONN, peer, 0, 0);
        (client, conn)
    }

    fn events_for(poll: &mut Poll, token: Token) -> Vec<(bool, bool)> {
        let mut events = Events::with_capacity(8);
        poll.poll(&mut events, Some(Duration::from_millis(50))).unwrap();
        events
            .iter()
            .filter(|e| e.token() == token)
            .map(|e| (e.is_readable(), e.is_writable()))
            .collect()
    }

    #[test]
    fn watch_transitions_follow_the_mask() {
        let mut poll = Poll::new().unwrap();
        let (mut client, mut conn) = loopback_pair();
        assert!(!conn.registered);

        enable_reading(&mut conn, poll.registry()).unwrap();
        assert!(conn.registered);
        enable_writing(&mut conn, poll.registry()).unwrap();
        assert!(conn.registered);
        disable_reading(&mut conn, poll.registry()).unwrap();
        assert!(conn.registered);
        disable_writing(&mut conn, poll.registry()).unwrap();
        assert!(!conn.registered);
        // Nothing watched and nothing registered: a no-op.
        disable_reading(&mut conn, poll.registry()).unwrap();
        assert!(!conn.registered);

        client.write_all(b"PROXY").unwrap();
        assert!(events_for(&mut poll, CONN).is_empty());

        enable_reading(&mut conn, poll.registry()).unwrap();
        assert!(conn.registered);
        let ready = events_for(&mut poll, CONN);
        assert!(ready.iter().any(|(readable, _)| *readable));
    }

    #[test]
    fn steady_time_is_monotonic() {
        let a = steady_time();
        let b = steady_time();
        assert!(b >= a);
    }
}
