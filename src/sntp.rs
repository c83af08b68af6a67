//! One-shot SNTP client
//!
//! Sends a single client request and waits for the reply in short,
//! bounded slices so the caller's loop never blocks for long.

use crate::ntp::TimeSource;
use crate::tz::PosixTz;
use crate::{Error, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// SNTP port (UDP 123)
pub const SNTP_PORT: u16 = 123;

/// Size of an NTP packet without extensions
const PACKET_LEN: usize = 48;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// Transmit seconds below this belong to era 1 (after 2036-02-07)
const ERA_PIVOT: u32 = 0x8000_0000;

/// Length of one NTP era in seconds
const ERA_SECS: i64 = 1 << 32;

/// LI = 0, VN = 4, Mode = 3 (client)
const CLIENT_REQUEST_HEADER: u8 = 0x23;

const MODE_SERVER: u8 = 4;

/// Builds a client request packet
pub fn encode_request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = CLIENT_REQUEST_HEADER;
    packet
}

/// Extracts the server's transmit timestamp from a reply
pub fn decode_response(packet: &[u8]) -> Result<DateTime<Utc>> {
    if packet.len() < PACKET_LEN {
        return Err(Error::InvalidNtpResponse(format!(
            "packet too short ({} bytes)",
            packet.len()
        )));
    }
    let mode = packet[0] & 0x07;
    if mode != MODE_SERVER {
        return Err(Error::InvalidNtpResponse(format!("unexpected mode {mode}")));
    }
    let stratum = packet[1];
    if stratum == 0 || stratum > 15 {
        return Err(Error::InvalidNtpResponse(format!("stratum {stratum}")));
    }

    let seconds = u32::from_be_bytes([packet[40], packet[41], packet[42], packet[43]]);
    let fraction = u32::from_be_bytes([packet[44], packet[45], packet[46], packet[47]]);
    if seconds == 0 && fraction == 0 {
        return Err(Error::InvalidNtpResponse(
            "empty transmit timestamp".to_string(),
        ));
    }

    let nanos = ((u64::from(fraction) * 1_000_000_000) >> 32) as u32;
    let mut ntp_seconds = i64::from(seconds);
    if seconds < ERA_PIVOT {
        ntp_seconds += ERA_SECS;
    }
    DateTime::from_timestamp(ntp_seconds - NTP_UNIX_OFFSET, nanos)
        .ok_or_else(|| Error::InvalidNtpResponse("timestamp out of range".to_string()))
}

/// Sends one request from a socket of the same address family as `address`
fn request_from(address: SocketAddr) -> Result<UdpSocket> {
    let local: SocketAddr = if address.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local)?;
    socket.connect(address)?;
    socket.send(&encode_request())?;
    Ok(socket)
}

/// [`TimeSource`] backed by a real NTP server
#[derive(Debug, Default)]
pub struct SntpTimeSource {
    socket: Option<UdpSocket>,
    timezone: PosixTz,
    /// Correction applied to the system clock once a reply arrived
    offset: Option<ChronoDuration>,
}

impl SntpTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries every resolved address until one accepts the request
    fn send_request(&mut self, server: &str) -> Result<()> {
        let mut last_error = None;
        for address in (server, SNTP_PORT).to_socket_addrs()? {
            debug!("Resolved {} to {}", server, address);
            match request_from(address) {
                Ok(socket) => {
                    self.socket = Some(socket);
                    return Ok(());
                }
                Err(e) => {
                    debug!("Request via {} failed: {}", address, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| Error::General(format!("{server} did not resolve"))))
    }

    /// Waits up to `timeout` for the reply to the outstanding request
    fn receive(&mut self, timeout: Duration) -> Result<Option<DateTime<Utc>>> {
        let Some(socket) = &self.socket else {
            return Ok(None);
        };
        // A zero read timeout is rejected by the OS.
        socket.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;

        let mut buffer = [0u8; PACKET_LEN * 2];
        match socket.recv(&mut buffer) {
            Ok(len) => decode_response(&buffer[..len]).map(Some),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl TimeSource for SntpTimeSource {
    #[instrument(skip(self))]
    fn start(&mut self, server: &str) {
        // Back to plain UTC until the server answers.
        self.offset = None;
        self.timezone = PosixTz::utc();
        self.socket = None;

        match self.send_request(server) {
            Ok(()) => info!("Sent SNTP request to {}", server),
            Err(e) => warn!("SNTP request to {} failed: {}", server, e),
        }
    }

    fn set_timezone(&mut self, timezone: &PosixTz) {
        info!("Setting timezone to {}", timezone);
        self.timezone = timezone.clone();
    }

    fn local_time(&mut self, timeout: Duration) -> Option<NaiveDateTime> {
        if self.offset.is_none() {
            match self.receive(timeout) {
                Ok(Some(server_time)) => {
                    let offset = server_time - Utc::now();
                    info!("SNTP reply received, system clock off by {}", offset);
                    self.offset = Some(offset);
                    self.socket = None;
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!("Discarding SNTP reply: {}", e);
                    return None;
                }
            }
        }

        let utc = (Utc::now() + self.offset?).naive_utc();
        Some(self.timezone.to_local(utc))
    }
}
