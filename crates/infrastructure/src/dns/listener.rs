use super::server::DnsServerHandler;
use natc_application::ports::DatagramSocket;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MAX_DATAGRAM: usize = 4096;

/// Reads datagrams until `cancel` fires, answering each one on its own task.
///
/// In-flight tasks are abandoned on cancellation and write nothing after it.
/// Responses that cannot be written within `write_timeout` are dropped.
pub async fn serve(
    socket: Arc<dyn DatagramSocket>,
    handler: Arc<DnsServerHandler>,
    cancel: CancellationToken,
    write_timeout: Duration,
) -> io::Result<()> {
    let local = socket.local_addr()?;
    info!(bind_address = %local, "DNS listener ready");

    let mut recv_buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => {
                info!(bind_address = %local, "DNS listener stopped");
                return Ok(());
            }
            result = socket.recv_from(&mut recv_buf) => result,
        };

        let (len, src) = match received {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_transient(&e) => {
                debug!(error = %e, "Transient UDP recv error");
                continue;
            }
            Err(e) => {
                error!(error = %e, "UDP recv error, stopping listener");
                return Err(e);
            }
        };

        let datagram: Arc<[u8]> = Arc::from(&recv_buf[..len]);
        let socket = Arc::clone(&socket);
        let handler = Arc::clone(&handler);
        let cancel = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(client = %src, "Abandoning in-flight query on shutdown");
                }
                _ = respond(&*socket, &handler, &datagram, src, write_timeout) => {}
            }
        });
    }
}

async fn respond(
    socket: &dyn DatagramSocket,
    handler: &DnsServerHandler,
    datagram: &[u8],
    src: SocketAddr,
    write_timeout: Duration,
) {
    let Some(response) = handler.handle_datagram(datagram, src).await else {
        return;
    };
    match tokio::time::timeout(write_timeout, socket.send_to(&response, src)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!(client = %src, error = %e, "Failed to send DNS response"),
        Err(_) => warn!(client = %src, "Timed out sending DNS response"),
    }
}

/// Errors a UDP socket reports for earlier datagrams, such as ICMP
/// unreachable for a previous response.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::WouldBlock
    )
}
