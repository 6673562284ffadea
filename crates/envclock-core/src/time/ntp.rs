//! SNTP (RFC 4330) client packet codec.

use super::TimeSyncError;

pub const PACKET_LEN: usize = 48;

/// Seconds from 1900-01-01 (NTP epoch) to 1970-01-01 (Unix epoch).
pub const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// NTP era 0 ends in February 2036; timestamps below this pivot are era 1.
const ERA_PIVOT: u32 = 0x8000_0000;

const LI_VN_MODE_CLIENT: u8 = 0x1B; // LI=0, VN=3, mode=3
const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;
const MAX_STRATUM: u8 = 15;

const TRANSMIT_OFFSET: usize = 40;

/// A client request with every field but the header zeroed.
pub fn request_packet() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = LI_VN_MODE_CLIENT;
    packet
}

/// Unix seconds from the transmit timestamp of a server reply.
pub fn parse_response(reply: &[u8]) -> Result<i64, TimeSyncError> {
    if reply.len() < PACKET_LEN {
        return Err(TimeSyncError::ShortPacket { len: reply.len() });
    }

    let mode = reply[0] & 0x07;
    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(TimeSyncError::BadMode { mode });
    }

    // Stratum 0 is a kiss-o'-death reply.
    let stratum = reply[1];
    if stratum == 0 || stratum > MAX_STRATUM {
        return Err(TimeSyncError::BadStratum { stratum });
    }

    let secs = u32::from_be_bytes([
        reply[TRANSMIT_OFFSET],
        reply[TRANSMIT_OFFSET + 1],
        reply[TRANSMIT_OFFSET + 2],
        reply[TRANSMIT_OFFSET + 3],
    ]);
    let frac = u32::from_be_bytes([
        reply[TRANSMIT_OFFSET + 4],
        reply[TRANSMIT_OFFSET + 5],
        reply[TRANSMIT_OFFSET + 6],
        reply[TRANSMIT_OFFSET + 7],
    ]);

    let mut ntp_secs = i64::from(secs);
    if secs < ERA_PIVOT {
        ntp_secs += 1 << 32;
    }
    if frac >= 0x8000_0000 {
        ntp_secs += 1;
    }

    Ok(ntp_secs - NTP_UNIX_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(mode: u8, stratum: u8, ntp_secs: u32) -> [u8; PACKET_LEN] {
        let mut packet = [0u8; PACKET_LEN];
        packet[0] = 0x18 | mode;
        packet[1] = stratum;
        packet[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 4].copy_from_slice(&ntp_secs.to_be_bytes());
        packet
    }

    #[test]
    fn test_request_header() {
        let packet = request_packet();
        assert_eq!(packet[0], 0x1B);
        assert!(packet[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_parse_server_reply() {
        // 2024-06-01T12:00:00Z
        let unix = 1_717_243_200i64;
        let packet = reply(MODE_SERVER, 2, (unix + NTP_UNIX_OFFSET) as u32);
        assert_eq!(parse_response(&packet), Ok(unix));
    }

    #[test]
    fn test_rejects_short_reply() {
        assert_eq!(
            parse_response(&[0x1C; 12]),
            Err(TimeSyncError::ShortPacket { len: 12 })
        );
    }

    #[test]
    fn test_rejects_kiss_of_death() {
        let packet = reply(MODE_SERVER, 0, 0xE000_0000);
        assert_eq!(
            parse_response(&packet),
            Err(TimeSyncError::BadStratum { stratum: 0 })
        );
    }

    #[test]
    fn test_rejects_client_mode() {
        let packet = reply(3, 2, 0xE000_0000);
        assert_eq!(parse_response(&packet), Err(TimeSyncError::BadMode { mode: 3 }));
    }

    #[test]
    fn test_era_one_timestamp() {
        // First second of NTP era 1 is 2036-02-07T06:28:16Z.
        let packet = reply(MODE_SERVER, 1, 0);
        assert_eq!(parse_response(&packet), Ok(2_085_978_496));
    }
}
