use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: reservations committed.
pub const RESERVATIONS_BOOKED_TOTAL: &str = "sala_reservations_booked_total";

/// Counter: reservations rescheduled.
pub const RESERVATIONS_MOVED_TOTAL: &str = "sala_reservations_moved_total";

/// Counter: reservations deleted.
pub const RESERVATIONS_CANCELLED_TOTAL: &str = "sala_reservations_cancelled_total";

/// Counter: mutations rejected because the slot was already taken.
pub const SLOT_CONFLICTS_TOTAL: &str = "sala_slot_conflicts_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: rooms in the catalog.
pub const ROOMS_ACTIVE: &str = "sala_rooms_active";

/// Gauge: live reservations.
pub const RESERVATIONS_ACTIVE: &str = "sala_reservations_active";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "sala_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "sala_wal_flush_batch_size";

/// Install the Prometheus metrics exporter on the given port. No-op if
/// `port` is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
