//! Tile generation metrics

use crate::error::Stage;
use std::time::Duration;

/// Record a tile that was generated and encoded
pub fn record_tile_success(duration: Duration, terms: usize) {
    metrics::counter!("prism_tiles_generated_total", "status" => "ok").increment(1);
    metrics::histogram!("prism_tile_duration_seconds", "status" => "ok")
        .record(duration.as_secs_f64());
    metrics::histogram!("prism_tile_terms").record(terms as f64);
}

/// Record a failed tile and the stage it failed in
pub fn record_tile_error(stage: Stage, duration: Duration) {
    metrics::counter!("prism_tiles_generated_total", "status" => "error").increment(1);
    metrics::counter!("prism_tile_errors_total", "stage" => stage.as_str()).increment(1);
    metrics::histogram!("prism_tile_duration_seconds", "status" => "error")
        .record(duration.as_secs_f64());
}
