//! PROXY protocol header decoder (text v1 and binary v2).
//!
//! [`decode`] is a pure function over everything received so far on a
//! connection. It either reports that more bytes are needed, returns the two
//! endpoints together with the exact number of bytes the header occupies, or
//! classifies the input with a [`DecodeError`].

pub mod v1;
pub mod v2;

use crate::address::InetAddress;
use thiserror::Error;

pub use v1::{V1_MAX_LINE, V1_MIN_LEN, V1_PREFIX};
pub use v2::{V2_HEADER_LEN, V2_SIGNATURE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("not a PROXY protocol header")]
    WrongProtocol,
    #[error("buffer shorter than the declared v2 frame")]
    WrongDataSize,
    #[error("unsupported v2 command")]
    UnknownCommand,
    #[error("unsupported address family")]
    UnknownFamily,
    #[error("invalid address")]
    InvalidAddr,
    #[error("invalid port")]
    InvalidPort,
}

impl DecodeError {
    /// Negative wire-compatible error code.
    pub fn code(&self) -> i32 {
        match self {
            DecodeError::WrongProtocol => -1,
            DecodeError::WrongDataSize => -2,
            DecodeError::UnknownCommand => -3,
            DecodeError::UnknownFamily => -4,
            DecodeError::InvalidAddr => -6,
            DecodeError::InvalidPort => -7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxyHeader {
    /// Bytes of the buffer taken by the header, TLV tail included.
    pub consumed: usize,
    pub src: InetAddress,
    pub dst: InetAddress,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    NeedMoreData,
    Header(ProxyHeader),
}

impl Decoded {
    /// `0` for need-more-data, otherwise the consumed length.
    pub fn code(&self) -> i32 {
        match self {
            Decoded::NeedMoreData => 0,
            Decoded::Header(header) => header.consumed as i32,
        }
    }
}

pub fn decode(buf: &[u8]) -> Result<Decoded, DecodeError> {
    if buf.len() >= V2_HEADER_LEN && v2::matches_signature(buf) {
        return v2::decode(buf).map(Decoded::Header);
    }
    if buf.len() >= V1_MIN_LEN && buf.starts_with(V1_PREFIX) {
        return v1::decode(buf).map(Decoded::Header);
    }

    // 16 bytes are enough to rule out both formats.
    if buf.len() >= V2_HEADER_LEN {
        return Err(DecodeError::WrongProtocol);
    }
    let n = buf.len().min(V2_SIGNATURE.len());
    if buf[..n] == V2_SIGNATURE[..n] {
        return Ok(Decoded::NeedMoreData);
    }

    if buf.len() >= V1_MIN_LEN {
        return Err(DecodeError::WrongProtocol);
    }
    let n = buf.len().min(V1_PREFIX.len());
    if buf[..n] == V1_PREFIX[..n] {
        return Ok(Decoded::NeedMoreData);
    }

    Err(DecodeError::WrongProtocol)
}
