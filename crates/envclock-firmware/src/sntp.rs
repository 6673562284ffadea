//! SNTP time source over embassy-net UDP.

use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::Duration;
use envclock_core::config::{NTP_PORT, NTP_SERVER};
use envclock_core::time::ntp::{PACKET_LEN, parse_response, request_packet};
use envclock_core::time::{
    SYSTEM_CLOCK, TimeSource, TimeStatus, TimeSyncError, TimeSyncPolicy, resync_forever,
};
use log::debug;

pub struct SntpSource {
    stack: Stack<'static>,
    server: &'static str,
}

impl SntpSource {
    pub const fn new(stack: Stack<'static>) -> Self {
        Self {
            stack,
            server: NTP_SERVER,
        }
    }
}

impl TimeSource for SntpSource {
    async fn sync(&mut self) -> Result<i64, TimeSyncError> {
        let server_ip = *self
            .stack
            .dns_query(self.server, DnsQueryType::A)
            .await
            .map_err(|_| TimeSyncError::Dns)?
            .first()
            .ok_or(TimeSyncError::Dns)?;
        let server = IpEndpoint::new(server_ip, NTP_PORT);

        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 128];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_buffer = [0u8; 128];
        let mut socket = UdpSocket::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| TimeSyncError::Network)?;

        socket
            .send_to(&request_packet(), server)
            .await
            .map_err(|_| TimeSyncError::Network)?;
        debug!("SNTP request sent to {}", server);

        let mut reply = [0u8; PACKET_LEN];
        loop {
            let (len, from) = socket
                .recv_from(&mut reply)
                .await
                .map_err(|_| TimeSyncError::Network)?;
            if from.endpoint.addr == server_ip {
                return parse_response(&reply[..len]);
            }
        }
    }
}

#[embassy_executor::task]
pub async fn resync_task(
    mut source: SntpSource,
    policy: &'static TimeSyncPolicy,
    interval: Duration,
    status: TimeStatus,
) -> ! {
    resync_forever(&mut source, &SYSTEM_CLOCK, policy, interval, status).await
}
