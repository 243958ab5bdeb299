use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::thread;

// Prefix metrics with `coordgate_` for better namespacing.
pub static ELECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("coordgate_elections_total", "Coordinator elections evaluated").expect("metric")
});
pub static CONNECTION_SWAPS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("coordgate_connection_swaps_total", "Downstream connections opened").expect("metric")
});
pub static CONNECT_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("coordgate_connect_failures_total", "Failed coordinator connection attempts").expect("metric")
});
pub static SNAPSHOT_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("coordgate_snapshot_failures_total", "Failed chain snapshot fetches").expect("metric")
});
pub static READY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("coordgate_ready", "1 once the first coordinator connection succeeded").expect("metric")
});

fn registry() -> Result<Registry> {
    let registry = Registry::new();
    registry.register(Box::new(ELECTIONS_TOTAL.clone()))?;
    registry.register(Box::new(CONNECTION_SWAPS_TOTAL.clone()))?;
    registry.register(Box::new(CONNECT_FAILURES_TOTAL.clone()))?;
    registry.register(Box::new(SNAPSHOT_FAILURES_TOTAL.clone()))?;
    registry.register(Box::new(READY.clone()))?;
    Ok(registry)
}

pub fn serve(cfg: crate::config::Metrics) -> Result<()> {
    let registry = registry()?;
    let bind_addr = cfg.bind.clone();
    thread::spawn(move || {
        let server = match tiny_http::Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("🔥 Could not start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        for request in server.incoming_requests() {
            let mut buffer = vec![];
            let encoder = TextEncoder::new();
            let metric_families = registry.gather();
            if encoder.encode(&metric_families, &mut buffer).is_err() {
                eprintln!("🔥 Could not encode metrics");
                continue;
            }

            let header = "Content-Type: application/openmetrics-text; version=1.0.0; charset=utf-8"
                .parse::<tiny_http::Header>();
            let response = match header {
                Ok(h) => tiny_http::Response::from_data(buffer).with_header(h),
                Err(_) => tiny_http::Response::from_data(buffer),
            };

            let _ = request.respond(response);
        }
    });

    Ok(())
}
