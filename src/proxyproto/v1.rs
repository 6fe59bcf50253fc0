//! Text header: `PROXY <TCP4|TCP6|UNKNOWN> <src-ip> <dst-ip> <src-port> <dst-port>\r\n`.

use super::{DecodeError, ProxyHeader};
use crate::address::{Family, InetAddress};
use std::net::{IpAddr, SocketAddr};

pub const V1_PREFIX: &[u8; 5] = b"PROXY";
/// Shortest buffer the dispatcher hands to the text decoder.
pub const V1_MIN_LEN: usize = 8;
/// 107 bytes of line plus CRLF.
pub const V1_MAX_LINE: usize = 108;

const CRLF: &[u8; 2] = b"\r\n";

pub fn decode(buf: &[u8]) -> Result<ProxyHeader, DecodeError> {
    let window = &buf[..buf.len().min(V1_MAX_LINE)];
    let cr = window
        .iter()
        .position(|&b| b == b'\r')
        .ok_or(DecodeError::WrongProtocol)?;
    if window.get(cr..cr + 2) != Some(&CRLF[..]) {
        return Err(DecodeError::WrongProtocol);
    }

    // The first token is the already-checked "PROXY" keyword.
    let mut fields = window[..cr]
        .split(|&b| b == b' ')
        .filter(|field| !field.is_empty())
        .skip(1);
    let mut next = || fields.next().ok_or(DecodeError::WrongProtocol);

    let family = match next()? {
        b"TCP4" => Family::Ipv4,
        b"TCP6" => Family::Ipv6,
        _ => return Err(DecodeError::UnknownFamily),
    };
    let src_ip = parse_ip(next()?, family)?;
    let dst_ip = parse_ip(next()?, family)?;
    let src_port = parse_port(next()?)?;
    let dst_port = parse_port(next()?)?;

    Ok(ProxyHeader {
        consumed: cr + CRLF.len(),
        src: SocketAddr::new(src_ip, src_port).into(),
        dst: SocketAddr::new(dst_ip, dst_port).into(),
    })
}

fn parse_ip(field: &[u8], family: Family) -> Result<IpAddr, DecodeError> {
    let text = std::str::from_utf8(field).map_err(|_| DecodeError::InvalidAddr)?;
    InetAddress::from_ip(text, 0, family)
        .map(|addr| addr.ip())
        .map_err(|_| DecodeError::InvalidAddr)
}

fn parse_port(field: &[u8]) -> Result<u16, DecodeError> {
    if !field.iter().all(u8::is_ascii_digit) {
        return Err(DecodeError::InvalidPort);
    }
    std::str::from_utf8(field)
        .ok()
        .and_then(|digits| digits.parse::<u64>().ok())
        .and_then(|port| u16::try_from(port).ok())
        .ok_or(DecodeError::InvalidPort)
}
