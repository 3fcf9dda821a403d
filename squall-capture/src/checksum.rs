//! IPv4/TCP/UDP checksum recomputation.
//!
//! The engine rewrites packet bytes (tamper, clamps) before re-injection, so
//! checksums must be recomputed in place. Everything here assumes IPv4 with a
//! variable-length header; packets too short for a given checksum are left
//! untouched.

use crate::metadata::PacketMetadata;

const PROTO_TCP: u8 = 6;
const PROTO_UDP: u8 = 17;

const IP_CHECKSUM_OFFSET: usize = 10;
const TCP_CHECKSUM_OFFSET: usize = 16;
const UDP_CHECKSUM_OFFSET: usize = 6;

/// Sums `data` as big-endian 16-bit words into `acc`, padding a trailing odd
/// byte with zero.
fn sum_words(data: &[u8], mut acc: u32) -> u32 {
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        acc += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = chunks.remainder() {
        acc += u32::from(u16::from_be_bytes([*last, 0]));
    }
    acc
}

/// Folds the 32-bit accumulator into a ones-complement 16-bit checksum.
fn fold(mut acc: u32) -> u16 {
    while acc >> 16 != 0 {
        acc = (acc & 0xFFFF) + (acc >> 16);
    }
    !(acc as u16)
}

fn ipv4_header_len(packet: &[u8]) -> Option<usize> {
    if packet.len() < 20 || packet[0] >> 4 != 4 {
        return None;
    }
    let ihl = usize::from(packet[0] & 0x0F) * 4;
    if ihl < 20 || packet.len() < ihl {
        return None;
    }
    Some(ihl)
}

fn update_ipv4(packet: &mut [u8], ihl: usize) {
    packet[IP_CHECKSUM_OFFSET] = 0;
    packet[IP_CHECKSUM_OFFSET + 1] = 0;
    let checksum = fold(sum_words(&packet[..ihl], 0));
    packet[IP_CHECKSUM_OFFSET..IP_CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
}

/// Pseudo-header sum shared by TCP and UDP: source, destination, protocol,
/// and transport segment length.
fn pseudo_header_sum(packet: &[u8], ihl: usize, proto: u8) -> u32 {
    let segment_len = (packet.len() - ihl) as u32;
    let mut acc = sum_words(&packet[12..20], 0);
    acc += u32::from(proto);
    acc += segment_len;
    acc
}

fn update_tcp(packet: &mut [u8], ihl: usize) -> bool {
    if packet.len() < ihl + 20 {
        return false;
    }
    let acc = pseudo_header_sum(packet, ihl, PROTO_TCP);
    let offset = ihl + TCP_CHECKSUM_OFFSET;
    packet[offset] = 0;
    packet[offset + 1] = 0;
    let checksum = fold(sum_words(&packet[ihl..], acc));
    packet[offset..offset + 2].copy_from_slice(&checksum.to_be_bytes());
    true
}

fn update_udp(packet: &mut [u8], ihl: usize) -> bool {
    if packet.len() < ihl + 8 {
        return false;
    }
    let acc = pseudo_header_sum(packet, ihl, PROTO_UDP);
    let offset = ihl + UDP_CHECKSUM_OFFSET;
    packet[offset] = 0;
    packet[offset + 1] = 0;
    let mut checksum = fold(sum_words(&packet[ihl..], acc));
    // RFC 768: an all-zero checksum means "not computed".
    if checksum == 0 {
        checksum = 0xFFFF;
    }
    packet[offset..offset + 2].copy_from_slice(&checksum.to_be_bytes());
    true
}

/// Recomputes every checksum the packet carries and updates the metadata
/// validity flags. Non-IPv4 or truncated packets are left untouched.
pub fn calculate_checksums(packet: &mut [u8], metadata: &mut PacketMetadata) {
    let Some(ihl) = ipv4_header_len(packet) else {
        return;
    };

    update_ipv4(packet, ihl);
    metadata.ip_checksum_valid = 1;

    match packet[9] {
        PROTO_TCP => {
            if update_tcp(packet, ihl) {
                metadata.tcp_checksum_valid = 1;
            }
        }
        PROTO_UDP => {
            if update_udp(packet, ihl) {
                metadata.udp_checksum_valid = 1;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a minimal IPv4+TCP packet with `payload_len` payload bytes.
    fn tcp_packet(payload_len: usize) -> Vec<u8> {
        let total = 20 + 20 + payload_len;
        let mut p = vec![0u8; total];
        p[0] = 0x45; // version 4, ihl 5
        p[2..4].copy_from_slice(&(total as u16).to_be_bytes());
        p[8] = 64; // ttl
        p[9] = PROTO_TCP;
        p[12..16].copy_from_slice(&[10, 0, 0, 1]);
        p[16..20].copy_from_slice(&[10, 0, 0, 2]);
        p[20 + 12] = 0x50; // data offset 5
        for (i, b) in p[40..].iter_mut().enumerate() {
            *b = i as u8;
        }
        p
    }

    /// A correct internet checksum makes the ones-complement sum over the
    /// covered bytes (checksum included) fold to zero.
    fn verify_region(data: &[u8], extra: u32) {
        let mut acc = sum_words(data, extra);
        while acc >> 16 != 0 {
            acc = (acc & 0xFFFF) + (acc >> 16);
        }
        assert_eq!(acc as u16, 0xFFFF);
    }

    #[test]
    fn ipv4_checksum_verifies() {
        let mut p = tcp_packet(11);
        let mut meta = PacketMetadata::default();
        calculate_checksums(&mut p, &mut meta);
        assert_eq!(meta.ip_checksum_valid, 1);
        verify_region(&p[..20], 0);
    }

    #[test]
    fn tcp_checksum_verifies_with_pseudo_header() {
        let mut p = tcp_packet(11);
        let mut meta = PacketMetadata::default();
        calculate_checksums(&mut p, &mut meta);
        assert_eq!(meta.tcp_checksum_valid, 1);
        let acc = pseudo_header_sum(&p, 20, PROTO_TCP);
        verify_region(&p[20..], acc);
    }

    #[test]
    fn udp_checksum_verifies() {
        let mut p = tcp_packet(4);
        p[9] = PROTO_UDP;
        let mut meta = PacketMetadata::default();
        calculate_checksums(&mut p, &mut meta);
        assert_eq!(meta.udp_checksum_valid, 1);
        let acc = pseudo_header_sum(&p, 20, PROTO_UDP);
        verify_region(&p[20..], acc);
    }

    #[test]
    fn non_ipv4_is_untouched() {
        let mut p = vec![0x60; 40]; // IPv6 version nibble
        let original = p.clone();
        let mut meta = PacketMetadata::default();
        calculate_checksums(&mut p, &mut meta);
        assert_eq!(p, original);
        assert_eq!(meta.ip_checksum_valid, 0);
    }

    #[test]
    fn truncated_tcp_skips_transport_checksum() {
        let mut p = tcp_packet(0);
        p.truncate(30); // IPv4 header plus a partial TCP header
        p[2..4].copy_from_slice(&30u16.to_be_bytes());
        let mut meta = PacketMetadata::default();
        calculate_checksums(&mut p, &mut meta);
        assert_eq!(meta.ip_checksum_valid, 1);
        assert_eq!(meta.tcp_checksum_valid, 0);
    }
}
