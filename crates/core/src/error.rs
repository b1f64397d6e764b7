use thiserror::Error;

use crate::color::ColorError;

#[derive(Debug, Error)]
pub enum FlameChartError {
    #[error("invalid color for type `{kind}`: {source}")]
    Color {
        kind: String,
        #[source]
        source: ColorError,
    },
    #[error("invalid zoom range: start {start} must be before end {end}")]
    InvalidZoomRange { start: f64, end: f64 },
    #[error("zoom to {start}..{end} was refused")]
    ZoomRefused { start: f64, end: f64 },
    #[error("zoom must be positive and finite, got {0}")]
    InvalidZoom(f64),
    #[error("unknown panel id {0}")]
    UnknownPanel(u32),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
