// ADS client over a single AMS/TCP connection.
//
// Owns the router socket, stamps requests with the configured source
// address and a monotonically increasing invoke id, and matches responses
// back to the request that is in flight. One request at a time: callers
// hold `&mut self` for the whole round trip.

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::addr::AmsAddress;
use crate::error::Error;
use crate::frame::{self, AMS_TCP_HEADER_LEN, AmsPacket, CMD_READ_STATE};
use crate::state::DeviceStateResult;
use crate::transport::TransportConfig;

/// Async ADS client bound to one target address.
pub struct AdsClient {
    stream: Option<TcpStream>,
    target: AmsAddress,
    config: TransportConfig,
    next_invoke_id: u32,
}

impl AdsClient {
    /// Open a TCP connection to the router and bind it to `target`.
    pub async fn connect(target: AmsAddress, config: &TransportConfig) -> Result<Self, Error> {
        debug!(
            router = %config.router,
            %target,
            source = %config.source,
            "connecting to AMS router"
        );

        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(config.router))
            .await
            .map_err(|_| Error::ConnectTimeout {
                endpoint: config.router.to_string(),
                timeout_ms: millis(config.connect_timeout),
            })??;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream: Some(stream),
            target,
            config: config.clone(),
            next_invoke_id: 1,
        })
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    // ── Services ─────────────────────────────────────────────────────

    /// Read the ADS and device state of the target.
    pub async fn read_state(&mut self) -> Result<DeviceStateResult, Error> {
        let invoke_id = self.take_invoke_id();
        let request = AmsPacket::read_state_request(self.target, self.config.source, invoke_id);
        let response = self.request(request).await?;

        if response.header.command_id != CMD_READ_STATE {
            return Err(Error::protocol(format!(
                "expected ReadState response, got command 0x{:04X}",
                response.header.command_id
            )));
        }
        if response.header.error_code != 0 {
            return Err(Error::Ads {
                code: response.header.error_code,
            });
        }

        let (ads_state, device_state) = frame::parse_read_state_response(response.data)?;
        Ok(DeviceStateResult {
            ads_state,
            device_state,
            read_at: Utc::now(),
        })
    }

    /// Shut the connection down. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), Error> {
        if let Some(mut stream) = self.stream.take() {
            debug!(target_addr = %self.target, "closing AMS connection");
            stream.shutdown().await?;
        }
        Ok(())
    }

    // ── Request plumbing ─────────────────────────────────────────────

    fn take_invoke_id(&mut self) -> u32 {
        let id = self.next_invoke_id;
        self.next_invoke_id = self.next_invoke_id.wrapping_add(1).max(1);
        id
    }

    /// Send `request` and wait for the response carrying its invoke id,
    /// bounded by the request timeout.
    ///
    /// Any failure leaves the stream at an unknown frame boundary, so the
    /// connection is dropped and later requests fail with [`Error::Closed`].
    async fn request(&mut self, request: AmsPacket) -> Result<AmsPacket, Error> {
        let timeout = self.config.request_timeout;
        let result = match tokio::time::timeout(timeout, self.round_trip(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                timeout_ms: millis(timeout),
            }),
        };

        if let Err(e) = &result {
            if self.stream.take().is_some() {
                debug!(
                    target_addr = %self.target,
                    error = %e,
                    "dropping AMS connection after failed request"
                );
            }
        }
        result
    }

    async fn round_trip(&mut self, request: AmsPacket) -> Result<AmsPacket, Error> {
        let invoke_id = request.header.invoke_id;
        let frame = request.encode()?;
        let stream = self.stream.as_mut().ok_or(Error::Closed)?;

        trace!(invoke_id, command = request.header.command_id, "sending AMS request");
        stream.write_all(&frame).await?;

        loop {
            let Some(packet) = read_frame(stream).await? else {
                continue;
            };
            if packet.header.invoke_id != invoke_id || !packet.header.is_response() {
                debug!(
                    expected = invoke_id,
                    got = packet.header.invoke_id,
                    "discarding unmatched AMS frame"
                );
                continue;
            }
            return Ok(packet);
        }
    }
}

/// Read one frame. Router-control frames (non-zero reserved word) are
/// consumed and reported as `None`.
async fn read_frame(stream: &mut TcpStream) -> Result<Option<AmsPacket>, Error> {
    let mut prefix = [0u8; AMS_TCP_HEADER_LEN];
    read_exact(stream, &mut prefix).await?;
    let (reserved, len) = frame::decode_tcp_header(prefix)?;

    let mut body = BytesMut::zeroed(len);
    read_exact(stream, &mut body).await?;

    if reserved != 0 {
        trace!(reserved, len, "skipping router control frame");
        return Ok(None);
    }
    AmsPacket::decode(Bytes::from(body)).map(Some)
}

async fn read_exact(stream: &mut TcpStream, buf: &mut [u8]) -> Result<(), Error> {
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::Closed),
        Err(e) => Err(Error::Io(e)),
    }
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
