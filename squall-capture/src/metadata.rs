/// Packet flowing host → wire.
pub const DIRECTION_OUTBOUND: u8 = 0;
/// Packet flowing wire → host.
pub const DIRECTION_INBOUND: u8 = 1;

/// Per-packet metadata produced by the capture provider on receive.
///
/// The layout matches the interception driver's native address structure
/// byte-for-byte (28 bytes, plus the trailing `batch_length` extension
/// populated only in batch mode) so providers can reinterpret driver memory
/// without copying. Passed by reference throughout the pipeline; only the
/// checksum-validity flags are mutated after receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct PacketMetadata {
    /// Capture timestamp in provider ticks.
    pub timestamp: i64,
    /// Interface the packet was captured on.
    pub interface_index: u32,
    /// Sub-interface (e.g. VLAN) index.
    pub sub_interface_index: u32,
    /// [`DIRECTION_OUTBOUND`] or [`DIRECTION_INBOUND`].
    pub direction: u8,
    /// Non-zero for loopback traffic.
    pub loopback: u8,
    /// Non-zero for packets injected by an interception layer.
    pub impostor: u8,
    /// Non-zero when the IPv4 header checksum was valid on receive.
    pub ip_checksum_valid: u8,
    /// Non-zero when the TCP checksum was valid on receive.
    pub tcp_checksum_valid: u8,
    /// Non-zero when the UDP checksum was valid on receive.
    pub udp_checksum_valid: u8,
    pub reserved1: u16,
    pub reserved2: u32,
    /// Byte length of this packet within a batch buffer. Zero outside batch
    /// mode.
    pub batch_length: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_driver_wire_size() {
        // 28 bytes of driver address plus the 4-byte batch extension.
        assert_eq!(std::mem::size_of::<PacketMetadata>(), 32);
    }

    #[test]
    fn field_offsets_are_packed() {
        assert_eq!(std::mem::offset_of!(PacketMetadata, timestamp), 0);
        assert_eq!(std::mem::offset_of!(PacketMetadata, interface_index), 8);
        assert_eq!(std::mem::offset_of!(PacketMetadata, sub_interface_index), 12);
        assert_eq!(std::mem::offset_of!(PacketMetadata, direction), 16);
        assert_eq!(std::mem::offset_of!(PacketMetadata, reserved1), 22);
        assert_eq!(std::mem::offset_of!(PacketMetadata, reserved2), 24);
        assert_eq!(std::mem::offset_of!(PacketMetadata, batch_length), 28);
    }
}
