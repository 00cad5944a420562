use natc_application::services::IpPool;
use natc_application::use_cases::HandleDnsQueryUseCase;
use natc_domain::{ula, AddressPlan, Config};
use natc_infrastructure::dns::{DnsServerHandler, ForwardingResolver};
use natc_infrastructure::identity::StaticPeerDirectory;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct DnsServices {
    pub plan: AddressPlan,
    pub ip_pool: Arc<IpPool>,
    pub handler: Arc<DnsServerHandler>,
    pub write_timeout: Duration,
}

impl DnsServices {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        info!("Initializing DNS services");

        let plan = config.address_plan()?;
        let v6_prefix = ula(config.connector.site_id);

        let identity = Self::build_identity(config)?;
        let resolver = Self::build_resolver(config)?;
        let ip_pool = Arc::new(
            IpPool::new(plan.pool.clone(), v6_prefix)
                .with_reclaim_idle(Duration::from_secs(config.connector.reclaim_idle_secs)),
        );
        let filter = Arc::new(config.destination_filter()?);

        let use_case = HandleDnsQueryUseCase::new(identity, resolver, Arc::clone(&ip_pool))
            .with_destination_filter(filter)
            .with_timeouts(
                Duration::from_millis(config.identity.whois_timeout_ms),
                Duration::from_millis(config.upstream.query_timeout_ms),
            );

        info!(
            routes = ?plan.routes,
            dns_addr = %plan.dns_addr,
            v6_prefix = %v6_prefix,
            pool_size = plan.pool.len(),
            "Address plan ready"
        );

        Ok(Self {
            plan,
            ip_pool,
            handler: Arc::new(DnsServerHandler::new(Arc::new(use_case))),
            write_timeout: Duration::from_millis(config.server.write_timeout_ms),
        })
    }

    fn build_identity(config: &Config) -> anyhow::Result<Arc<StaticPeerDirectory>> {
        let directory = StaticPeerDirectory::from_entries(&config.identity.peers)?;
        if directory.is_empty() {
            warn!("Peer directory is empty, every query will be dropped");
        } else {
            info!(peers = directory.len(), "Peer directory loaded");
        }
        Ok(Arc::new(directory))
    }

    fn build_resolver(config: &Config) -> anyhow::Result<Arc<ForwardingResolver>> {
        let servers = config.upstream_servers()?;
        info!(
            servers = ?servers,
            timeout_ms = config.upstream.query_timeout_ms,
            "Upstream resolvers configured"
        );
        Ok(Arc::new(ForwardingResolver::new(
            &servers,
            Duration::from_millis(config.upstream.query_timeout_ms),
        )))
    }
}
