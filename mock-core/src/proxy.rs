use crate::{
    admin::{start_admin_server, AdminState, Metrics},
    ca::CertificateAuthority,
    config::MockConfig,
    engine::InterceptionEngine,
    error::MockError,
    handlers::MockHandler,
    hits::HitCounter,
    Result,
};
use hudsucker::{certificate_authority::RcgenAuthority, rustls, ProxyBuilder};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info};

/// MITM proxy serving mock responses in front of the real network
pub struct MockProxy {
    config: MockConfig,
    ca: CertificateAuthority,
    engine: Arc<InterceptionEngine>,
    hits: HitCounter,
    metrics: Arc<Metrics>,
}

impl MockProxy {
    pub fn new(config: MockConfig, ca: CertificateAuthority, engine: Arc<InterceptionEngine>) -> Self {
        Self {
            config,
            ca,
            engine,
            hits: HitCounter::new(),
            metrics: Arc::new(Metrics::default()),
        }
    }

    /// Share a hit counter with the admin API.
    pub fn with_hit_counter(mut self, hits: HitCounter) -> Self {
        self.hits = hits;
        self
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Run until `shutdown` completes.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ip: IpAddr = self.config.listen_address.parse().map_err(|e| {
            MockError::Configuration(format!(
                "Invalid listen address {:?}: {}",
                self.config.listen_address, e
            ))
        })?;
        let addr = SocketAddr::new(ip, self.config.listen_port);
        info!("Starting mock proxy on {}", addr);

        let admin_port = self.config.admin_port;
        let admin_state = AdminState {
            metrics: self.metrics.clone(),
            engine: self.engine.clone(),
            hits: self.hits.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = start_admin_server(admin_port, admin_state).await {
                error!("Admin server failed: {}", e);
            }
        });

        // Hudsucker/Rustls expects DER, not PEM.
        let (ca_cert_der, ca_key_der) = self.ca.der()?;
        let authority = RcgenAuthority::new(
            rustls::PrivateKey(ca_key_der),
            rustls::Certificate(ca_cert_der),
            1000,
        )
        .map_err(|e| MockError::Certificate(format!("Failed to create CA authority: {}", e)))?;

        let proxy = ProxyBuilder::new()
            .with_addr(addr)
            .with_rustls_client()
            .with_ca(authority)
            .with_http_handler(MockHandler::new(self.engine, self.metrics))
            .build();

        proxy
            .start(shutdown)
            .await
            .map_err(|e| MockError::Network(format!("Proxy failed: {}", e)))?;

        info!("Mock proxy stopped");
        Ok(())
    }
}
