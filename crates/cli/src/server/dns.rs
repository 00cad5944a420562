use crate::di::DnsServices;
use natc_application::ports::DatagramSocket;
use natc_domain::Config;
use natc_infrastructure::dns::serve;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Resolves `server.bind_address`, which may be an `IP:port` or a bare IP
/// combined with `server.dns_port`. Without one the connector DNS address
/// is used.
pub fn listen_address(config: &Config, dns_addr: Ipv4Addr) -> anyhow::Result<SocketAddr> {
    let port = config.server.dns_port;
    match config.server.bind_address.as_deref() {
        None => Ok(SocketAddr::new(IpAddr::V4(dns_addr), port)),
        Some(bind) => {
            if let Ok(addr) = bind.parse::<SocketAddr>() {
                return Ok(addr);
            }
            let ip: IpAddr = bind
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", bind, e))?;
            Ok(SocketAddr::new(ip, port))
        }
    }
}

pub async fn start_dns_server(
    bind_addr: SocketAddr,
    services: DnsServices,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let socket = create_udp_socket(bind_addr)?;
    let local = socket.local_addr()?;

    info!(
        bind_address = %local,
        pool_available = services.ip_pool.available_v4(),
        "DNS server ready"
    );

    let socket: Arc<dyn DatagramSocket> = Arc::new(socket);
    serve(socket, services.handler, cancel, services.write_timeout).await?;
    Ok(())
}

fn create_udp_socket(socket_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let domain = if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}
