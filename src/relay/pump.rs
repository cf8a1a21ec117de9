//! Relay Pump
//!
//! Copies one direction of a session and feeds the shared counters.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};

use crate::metrics::{BandwidthCounters, Direction};

/// Bytes moved in each direction by a finished relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub uploaded: u64,
    pub downloaded: u64,
}

/// Copy `source` into `destination` until EOF or an I/O error.
///
/// Every chunk is added to the `direction` counter before it is written.
/// When the loop ends the write side of `destination` is shut down so the
/// peer sees EOF; the opposite direction is left running.
pub async fn pump<R, W>(
    mut source: R,
    mut destination: W,
    direction: Direction,
    counters: &BandwidthCounters,
    buffer_size: usize,
) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size];
    let mut total = 0u64;

    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => {
                debug!("{} reached EOF after {} bytes", direction, total);
                break;
            }
            Ok(n) => n,
            Err(e) => {
                error!("Relay {} read error: {}", direction, e);
                break;
            }
        };

        counters.add(direction, n as u64);
        total += n as u64;

        if let Err(e) = destination.write_all(&buf[..n]).await {
            error!("Relay {} write error: {}", direction, e);
            break;
        }
    }

    if let Err(e) = destination.shutdown().await {
        debug!("Relay {} shutdown of destination failed: {}", direction, e);
    }

    total
}

/// Run both directions between `client` and `upstream` until each has ended
pub async fn relay<C, U>(
    client: C,
    upstream: U,
    counters: &BandwidthCounters,
    buffer_size: usize,
) -> RelayStats
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);

    let (uploaded, downloaded) = tokio::join!(
        pump(client_read, upstream_write, Direction::Upload, counters, buffer_size),
        pump(upstream_read, client_write, Direction::Download, counters, buffer_size),
    );

    RelayStats {
        uploaded,
        downloaded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_pump_counts_and_forwards() {
        let counters = BandwidthCounters::new();
        let (mut writer, source) = duplex(64);
        let (destination, mut reader) = duplex(64);

        writer.write_all(b"hello world").await.unwrap();
        drop(writer);

        let moved = pump(source, destination, Direction::Upload, &counters, 4).await;
        assert_eq!(moved, 11);
        assert_eq!(counters.uploaded(), 11);
        assert_eq!(counters.downloaded(), 0);

        let mut received = Vec::new();
        reader.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello world");
    }

    #[tokio::test]
    async fn test_relay_forwards_half_close() {
        let counters = BandwidthCounters::new();
        let (mut client, client_side) = duplex(1024);
        let (upstream_side, mut server) = duplex(1024);

        let relay_task = async { relay(client_side, upstream_side, &counters, 4096).await };

        let peers = async {
            client.write_all(b"request").await.unwrap();
            client.shutdown().await.unwrap();

            // The server sees EOF once the client stops writing
            let mut request = Vec::new();
            server.read_to_end(&mut request).await.unwrap();
            assert_eq!(request, b"request");

            server.write_all(b"response!").await.unwrap();
            server.shutdown().await.unwrap();

            let mut response = Vec::new();
            client.read_to_end(&mut response).await.unwrap();
            assert_eq!(response, b"response!");
        };

        let (stats, ()) = tokio::join!(relay_task, peers);
        assert_eq!(
            stats,
            RelayStats {
                uploaded: 7,
                downloaded: 9
            }
        );
        assert_eq!(counters.uploaded(), 7);
        assert_eq!(counters.downloaded(), 9);
    }
}
