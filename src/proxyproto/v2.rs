//! Binary header.
//!
//! ```text
//! 0          12        13        14       16
//! | signature | ver/cmd | fam/proto | len | address block | TLVs ... |
//! ```

use super::{DecodeError, ProxyHeader};
use crate::address::InetAddress;

pub const V2_SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
];
/// Signature, ver/cmd, fam/proto and the big-endian length.
pub const V2_HEADER_LEN: usize = 16;

const VER_CMD: usize = 12;
const FAM: usize = 13;
const LEN: usize = 14;
const ADDR: usize = V2_HEADER_LEN;

const VERSION_2: u8 = 0x20;
const CMD_PROXY: u8 = 0x01;

const TCP_OVER_IPV4: u8 = 0x11;
const TCP_OVER_IPV6: u8 = 0x21;

const IPV4_BLOCK_LEN: usize = 4 + 4 + 2 + 2;
const IPV6_BLOCK_LEN: usize = 16 + 16 + 2 + 2;

/// Full signature plus protocol version 2 in the high nibble of ver/cmd.
pub fn matches_signature(buf: &[u8]) -> bool {
    buf.len() > VER_CMD && buf[..VER_CMD] == V2_SIGNATURE && buf[VER_CMD] & 0xF0 == VERSION_2
}

pub fn decode(buf: &[u8]) -> Result<ProxyHeader, DecodeError> {
    if buf.len() < V2_HEADER_LEN {
        return Err(DecodeError::WrongDataSize);
    }
    let declared = u16::from_be_bytes([buf[LEN], buf[LEN + 1]]) as usize;
    let framed = V2_HEADER_LEN + declared;
    if buf.len() < framed {
        return Err(DecodeError::WrongDataSize);
    }

    if buf[VER_CMD] & 0x0F != CMD_PROXY {
        // LOCAL (0x0) and anything unassigned.
        return Err(DecodeError::UnknownCommand);
    }

    let block = &buf[ADDR..framed];
    let (src, dst) = match buf[FAM] {
        TCP_OVER_IPV4 => {
            if block.len() < IPV4_BLOCK_LEN {
                return Err(DecodeError::WrongDataSize);
            }
            (
                InetAddress::from_v4(take(block, 0), take(block, 8)),
                InetAddress::from_v4(take(block, 4), take(block, 10)),
            )
        }
        TCP_OVER_IPV6 => {
            if block.len() < IPV6_BLOCK_LEN {
                return Err(DecodeError::WrongDataSize);
            }
            (
                InetAddress::from_v6(take(block, 0), take(block, 32)),
                InetAddress::from_v6(take(block, 16), take(block, 34)),
            )
        }
        _ => return Err(DecodeError::UnknownFamily),
    };

    Ok(ProxyHeader {
        consumed: framed,
        src,
        dst,
    })
}

/// Copies `N` bytes at `offset`; callers check the block length first.
fn take<const N: usize>(block: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&block[offset..offset + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Family;

    fn header(ver_cmd: u8, fam: u8, block: &[u8]) -> Vec<u8> {
        let mut buf = V2_SIGNATURE.to_vec();
        buf.push(ver_cmd);
        buf.push(fam);
        buf.extend_from_slice(&(block.len() as u16).to_be_bytes());
        buf.extend_from_slice(block);
        buf
    }

    #[test]
    fn tcp4_raw_bytes_are_kept() {
        let block = [172, 16, 5, 9, 10, 0, 0, 1, 0xC3, 0x50, 0x01, 0xBB];
        let buf = header(0x21, TCP_OVER_IPV4, &block);
        let parsed = decode(&buf).unwrap();
        assert_eq!(parsed.consumed, V2_HEADER_LEN + 12);
        assert_eq!(parsed.src.family(), Family::Ipv4);
        assert_eq!(parsed.src.to_addr_port(), "172.16.5.9:50000");
        assert_eq!(parsed.dst.to_addr_port(), "10.0.0.1:443");
    }

    #[test]
    fn tlv_tail_is_consumed() {
        let mut block: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7, 8, 0, 1, 0, 2];
        // PP2_TYPE_NOOP with a 3 byte value.
        block.extend_from_slice(&[0x04, 0x00, 0x03, 0xAA, 0xBB, 0xCC]);
        let mut buf = header(0x21, TCP_OVER_IPV4, &block);
        buf.extend_from_slice(b"payload");
        let parsed = decode(&buf).unwrap();
        assert_eq!(parsed.consumed, V2_HEADER_LEN + 18);
        assert_eq!(parsed.src.to_addr_port(), "1.2.3.4:1");
        assert_eq!(parsed.dst.to_addr_port(), "5.6.7.8:2");
    }

    #[test]
    fn tcp6_block() {
        let mut block = vec![0u8; IPV6_BLOCK_LEN];
        block[15] = 1;
        block[31] = 2;
        block[32..34].copy_from_slice(&1234u16.to_be_bytes());
        block[34..36].copy_from_slice(&80u16.to_be_bytes());
        let parsed = decode(&header(0x21, TCP_OVER_IPV6, &block)).unwrap();
        assert_eq!(parsed.consumed, V2_HEADER_LEN + IPV6_BLOCK_LEN);
        assert_eq!(parsed.src.to_addr_port(), "::1:1234");
        assert_eq!(parsed.dst.to_addr_port(), "::2:80");
    }

    #[test]
    fn truncated_frame_is_wrong_data_size() {
        let buf = header(0x21, TCP_OVER_IPV4, &[0; IPV4_BLOCK_LEN]);
        assert_eq!(decode(&buf[..buf.len() - 1]), Err(DecodeError::WrongDataSize));
        assert_eq!(decode(&buf[..V2_HEADER_LEN]), Err(DecodeError::WrongDataSize));
    }

    #[test]
    fn declared_length_shorter_than_block() {
        let buf = header(0x21, TCP_OVER_IPV6, &[0; IPV4_BLOCK_LEN]);
        assert_eq!(decode(&buf), Err(DecodeError::WrongDataSize));
    }

    #[test]
    fn local_and_unknown_commands() {
        let block = [0; IPV4_BLOCK_LEN];
        assert_eq!(decode(&header(0x20, TCP_OVER_IPV4, &block)), Err(DecodeError::UnknownCommand));
        assert_eq!(decode(&header(0x2F, TCP_OVER_IPV4, &block)), Err(DecodeError::UnknownCommand));
    }

    #[test]
    fn unsupported_families() {
        let block = [0; IPV6_BLOCK_LEN];
        // UDP over IPv4, UNIX stream, AF_UNSPEC.
        for fam in [0x12, 0x31, 0x00] {
            assert_eq!(decode(&header(0x21, fam, &block)), Err(DecodeError::UnknownFamily));
        }
    }

    #[test]
    fn signature_requires_version_two() {
        let buf = header(0x21, TCP_OVER_IPV4, &[0; IPV4_BLOCK_LEN]);
        assert!(matches_signature(&buf));
        let mut v1 = buf.clone();
        v1[VER_CMD] = 0x11;
        assert!(!matches_signature(&v1));
        assert!(!matches_signature(&V2_SIGNATURE));
    }
}
