//! Minimal IPv4/TCP header peeks for rule predicates.
//!
//! Everything assumes IPv4 with a variable-length header and a 20-byte
//! minimum TCP header. A packet too short for a given check is simply
//! non-matching (`None`), never an error.

pub(crate) const PROTO_TCP: u8 = 6;

pub(crate) const TCP_FLAG_SYN: u8 = 0x02;
pub(crate) const TCP_FLAG_ACK: u8 = 0x10;

const TCP_FLAGS_OFFSET: usize = 13;
const TCP_WINDOW_OFFSET: usize = 14;

/// IPv4 header length in bytes, if the packet is long enough to carry one.
fn ipv4_header_len(packet: &[u8]) -> Option<usize> {
    if packet.len() < 20 {
        return None;
    }
    Some(usize::from(packet[0] & 0x0F) * 4)
}

/// Offset of the TCP header, if this is an IPv4/TCP packet with a complete
/// 20-byte TCP header.
fn tcp_header_offset(packet: &[u8]) -> Option<usize> {
    if packet.len() < 40 || packet[9] != PROTO_TCP {
        return None;
    }
    let ihl = ipv4_header_len(packet)?;
    if packet.len() < ihl + 20 {
        return None;
    }
    Some(ihl)
}

/// The TCP flags byte.
pub(crate) fn tcp_flags(packet: &[u8]) -> Option<u8> {
    let tcp = tcp_header_offset(packet)?;
    Some(packet[tcp + TCP_FLAGS_OFFSET])
}

/// The advertised TCP receive window.
pub(crate) fn tcp_window(packet: &[u8]) -> Option<u16> {
    let tcp = tcp_header_offset(packet)?;
    let off = tcp + TCP_WINDOW_OFFSET;
    Some(u16::from_be_bytes([packet[off], packet[off + 1]]))
}

/// Byte offset of the TCP window field, for in-place clamping.
pub(crate) fn tcp_window_offset(packet: &[u8]) -> Option<usize> {
    Some(tcp_header_offset(packet)? + TCP_WINDOW_OFFSET)
}

/// True for any IPv4/TCP packet with a complete TCP header.
pub(crate) fn is_tcp(packet: &[u8]) -> bool {
    tcp_header_offset(packet).is_some()
}

#[cfg(test)]
pub(crate) mod testutil {
    /// Builds an IPv4/TCP packet with the given flags, window and payload
    /// length. IHL is fixed at 5 words.
    pub(crate) fn tcp_packet(flags: u8, window: u16, payload_len: usize) -> Vec<u8> {
        let total = 40 + payload_len;
        let mut p = vec![0u8; total];
        p[0] = 0x45;
        p[2..4].copy_from_slice(&(total as u16).to_be_bytes());
        p[8] = 64;
        p[9] = super::PROTO_TCP;
        p[12..16].copy_from_slice(&[192, 168, 0, 1]);
        p[16..20].copy_from_slice(&[192, 168, 0, 2]);
        p[20 + 12] = 0x50;
        p[20 + 13] = flags;
        p[20 + 14..20 + 16].copy_from_slice(&window.to_be_bytes());
        for (i, b) in p[40..].iter_mut().enumerate() {
            *b = i as u8;
        }
        p
    }

    /// Builds an IPv4/UDP packet with the given payload length.
    pub(crate) fn udp_packet(payload_len: usize) -> Vec<u8> {
        let total = 28 + payload_len;
        let mut p = vec![0u8; total];
        p[0] = 0x45;
        p[2..4].copy_from_slice(&(total as u16).to_be_bytes());
        p[8] = 64;
        p[9] = 17;
        p[12..16].copy_from_slice(&[192, 168, 0, 1]);
        p[16..20].copy_from_slice(&[192, 168, 0, 2]);
        p
    }
}
