mod readable;
mod writable;

pub use readable::{MAX_READS_PER_EVENT, READ_CHUNK, handle_readable};
pub use writable::handle_writable;
