//! Output file naming: `{mode_prefix}_{YYYYMMDD_HHMMSS}.{ext}`.
//!
//! Names have second resolution, so two runs finishing within the same second
//! in the same directory produce the same name and the later one wins.

use chrono::{DateTime, Local, TimeZone};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Short tag describing the model family, taken from the model identifier.
pub fn mode_prefix(model_id: &str) -> &'static str {
    let id = model_id.to_lowercase();
    if id.contains("cogvideo") {
        if id.contains("2b") {
            "cogvideo-2b"
        } else {
            "cogvideo-5b"
        }
    } else if id.contains("flux") {
        if id.contains("dev") {
            "flux-dev"
        } else {
            "flux-schnell"
        }
    } else if id.contains("turbo") {
        "fast"
    } else {
        "slow"
    }
}

pub fn timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn local_timestamp() -> String {
    timestamp(&Local::now())
}

pub fn output_file_name(model_id: &str, timestamp: &str, extension: &str) -> String {
    format!("{}_{timestamp}.{extension}", mode_prefix(model_id))
}
