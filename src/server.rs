use crate::{
    connection::{ConnState, Connection},
    handler::{handle_readable, handle_writable},
    util::{cleanup_connection, enable_reading, steady_time},
};
use log::{debug, error, info, warn};
use mio::{Events, Interest, Poll, Token, event::Event, net::TcpListener};
use socket2::{Domain, SockAddr, Socket, Type};
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};
use thiserror::Error;

const LISTENER: Token = Token(0);

pub const INITIAL_EVENTS: usize = 4;
pub const MAX_EVENTS: usize = 20;
pub const MAX_CONNECTIONS: usize = 1024;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("create poll: {0}")]
    Poll(#[source] io::Error),
    #[error("create socket: {0}")]
    Socket(#[source] io::Error),
    #[error("set socket flags: {0}")]
    Flags(#[source] io::Error),
    #[error("set SO_REUSEADDR: {0}")]
    ReuseAddr(#[source] io::Error),
    #[error("bind port {port}: {source}")]
    Bind { port: u16, source: io::Error },
    #[error("listen: {0}")]
    Listen(#[source] io::Error),
    #[error("register listener: {0}")]
    Register(#[source] io::Error),
}

impl StartError {
    pub fn code(&self) -> i32 {
        match self {
            StartError::Poll(_) => -2,
            StartError::Socket(_) => -3,
            StartError::Flags(_) => -4,
            StartError::ReuseAddr(_) => -5,
            StartError::Bind { .. } => -6,
            StartError::Listen(_) => -7,
            StartError::Register(_) => -8,
        }
    }
}

/// Capacity of the readiness batch handed to each poll.
///
/// Doubles (up to [`MAX_EVENTS`]) whenever a poll fills it; never shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventBatch {
    capacity: usize,
}

impl EventBatch {
    pub fn new() -> Self {
        EventBatch {
            capacity: INITIAL_EVENTS,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true when the capacity grew.
    pub fn record(&mut self, num_events: usize) -> bool {
        if num_events == self.capacity && self.capacity < MAX_EVENTS {
            self.capacity = (self.capacity * 2).min(MAX_EVENTS);
            return true;
        }
        false
    }
}

impl Default for EventBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Readiness flags of one event, detached from the `Events` buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub token: usize,
    pub readable: bool,
    pub writable: bool,
    pub read_closed: bool,
    pub write_closed: bool,
    pub error: bool,
}

impl Readiness {
    /// Both directions closed, i.e. a full hang-up.
    pub fn is_hup(&self) -> bool {
        self.read_closed && self.write_closed
    }
}

impl From<&Event> for Readiness {
    fn from(event: &Event) -> Self {
        Readiness {
            token: event.token().0,
            readable: event.is_readable(),
            writable: event.is_writable(),
            read_closed: event.is_read_closed(),
            write_closed: event.is_write_closed(),
            error: event.is_error(),
        }
    }
}

pub struct Server {
    port: u16,
    max_connections: usize,
    poll: Option<Poll>,
    listener: Option<TcpListener>,
    connections: HashMap<usize, Connection>,
    next_token: usize,
    conn_index: u64,
    events: Events,
    batch: EventBatch,
}

impl Server {
    pub fn new(port: u16) -> Self {
        let batch = EventBatch::new();
        Server {
            port,
            max_connections: MAX_CONNECTIONS,
            poll: None,
            listener: None,
            connections: HashMap::new(),
            next_token: LISTENER.0 + 1,
            conn_index: 0,
            events: Events::with_capacity(batch.capacity()),
            batch,
        }
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Binds `0.0.0.0:<port>` and registers the listener. Any resources
    /// from a previous start are released first; on failure everything
    /// acquired so far is released again.
    pub fn start(&mut self) -> Result<(), StartError> {
        self.stop();
        let result = self.try_start();
        if result.is_err() {
            self.stop();
        }
        result
    }

    fn try_start(&mut self) -> Result<(), StartError> {
        let poll = Poll::new().map_err(StartError::Poll)?;

        let socket = Socket::new(Domain::IPV4, Type::STREAM, None).map_err(StartError::Socket)?;
        socket.set_nonblocking(true).map_err(StartError::Flags)?;
        socket.set_cloexec(true).map_err(StartError::Flags)?;
        socket.set_reuse_address(true).map_err(StartError::ReuseAddr)?;

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port));
        socket
            .bind(&SockAddr::from(addr))
            .map_err(|source| StartError::Bind {
                port: self.port,
                source,
            })?;
        socket.listen(libc::SOMAXCONN).map_err(StartError::Listen)?;

        let mut listener = TcpListener::from_std(socket.into());
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(StartError::Register)?;

        debug!("listening on {}", addr);
        self.poll = Some(poll);
        self.listener = Some(listener);
        Ok(())
    }

    /// Closes the listener, the poll instance and every live connection.
    /// Safe to call repeatedly and on a server that never started.
    pub fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            debug!("close listener {:?}", listener.local_addr().ok());
        }
        if self.poll.take().is_some() {
            debug!("close poll");
        }
        if !self.connections.is_empty() {
            debug!("drop {} connections", self.connections.len());
            self.connections.clear();
        }
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match &self.listener {
            Some(listener) => listener.local_addr(),
            None => Err(io::Error::new(ErrorKind::NotConnected, "server not started")),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn event_capacity(&self) -> usize {
        self.batch.capacity()
    }

    /// Waits up to `timeout` for readiness and handles everything reported.
    pub fn poll(&mut self, timeout: Option<Duration>) {
        let Some(poll) = self.poll.as_mut() else {
            return;
        };

        match poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == ErrorKind::Interrupted => return,
            Err(e) => {
                error!("poll err {}", e);
                return;
            }
        }

        let ready: Vec<Readiness> = self.events.iter().map(Readiness::from).collect();
        if ready.is_empty() {
            return;
        }

        for event in &ready {
            match Token(event.token) {
                LISTENER => self.on_new_conn(event),
                _ => self.on_conn_event(event),
            }
        }

        if self.batch.record(ready.len()) {
            self.events = Events::with_capacity(self.batch.capacity());
            debug!("event batch grown to {}", self.batch.capacity());
        }
    }

    fn on_new_conn(&mut self, event: &Readiness) {
        if !(event.readable || event.read_closed) {
            return;
        }
        let (Some(poll), Some(listener)) = (self.poll.as_ref(), self.listener.as_ref()) else {
            return;
        };

        loop {
            match listener.accept() {
                Ok((stream, peer_addr)) => {
                    if self.connections.len() >= self.max_connections {
                        drop(stream);
                        info!(
                            "the number of connections exceeds the limit {}, rejected {}",
                            self.max_connections, peer_addr
                        );
                        continue;
                    }

                    let token = Token(self.next_token);
                    self.next_token += 1;
                    let seq = self.conn_index;
                    self.conn_index += 1;

                    let mut conn = Connection::new(stream, token, peer_addr, seq, steady_time());
                    if let Err(e) = enable_reading(&mut conn, poll.registry()) {
                        warn!("{} register err {}", conn.name, e);
                        continue;
                    }

                    info!("add new conn [{}] from {}", conn.name, peer_addr);
                    self.connections.insert(token.0, conn);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("accept err {}", e);
                    break;
                }
            }
        }
    }

    fn on_conn_event(&mut self, event: &Readiness) {
        let Some(poll) = self.poll.as_ref() else {
            return;
        };
        let Some(conn) = self.connections.get_mut(&event.token) else {
            debug!("No connection found for token {}", event.token);
            return;
        };

        if event.is_hup() && !event.readable {
            conn.state = ConnState::Disconnected;
            info!("{} close", conn.name);
        }

        if event.error {
            conn.state = ConnState::Disconnected;
            info!("{} error", conn.name);
        }

        if event.readable || event.read_closed {
            handle_readable(conn, poll.registry());
        }

        if event.writable {
            handle_writable(conn, poll.registry());
        }

        if conn.should_close() {
            cleanup_connection(event.token, poll.registry(), &mut self.connections);
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}
