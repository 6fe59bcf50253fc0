use crate::{connection::Connection, util::disable_writing};
use log::warn;
use mio::Registry;

/// Nothing is ever queued for writing, so write interest is dropped as soon
/// as the output buffer is seen empty.
pub fn handle_writable(conn: &mut Connection, registry: &Registry) {
    if conn.obuf.is_empty() {
        if let Err(e) = disable_writing(conn, registry) {
            warn!("{} update interests err {}", conn.name, e);
        }
    }
}
