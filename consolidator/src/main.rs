//! One-shot binary consolidating client rule assignments from the BigQuery
//! registry into the Postgres operational store.

use telemetry::init_tracing;
use tracing::{error, info};

mod core;

#[tokio::main]
async fn main() {
    init_tracing();

    let report = core::start_consolidator().await;

    let duration_s = (report.finished_at - report.started_at).num_seconds();
    if report.outcome.is_success() {
        info!(duration_s, "{}", report.message);
    } else {
        error!(duration_s, "{}", report.message);
    }

    std::process::exit(report.outcome.exit_code());
}
