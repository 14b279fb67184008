//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `SE_LOG_LEVEL`: Filter-Direktive (z.B. `debug` oder
//!   `speakeasy_moderation=trace,warn`), Standard: aus der Konfiguration
//! - `SE_LOG_FORMAT`: Format (text/json), Standard: aus der Konfiguration
//!
//! Upgrade-Versuche tragen ihre `versuch`-ID als Span-Feld.

use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const ENV_LOG_LEVEL: &str = "SE_LOG_LEVEL";

/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "SE_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Umgebungsvariablen haben Vorrang vor den uebergebenen Werten.
/// Faellt auf `info` / `text` zurueck falls der Filter ungueltig ist.
/// Darf nur einmal pro Prozess aufgerufen werden.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = filter_bauen(level);

    match format_waehlen(format).as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Logging fuer Tests: schreibt ueber den Test-Writer und ignoriert
/// mehrfachen Aufruf.
pub fn logging_fuer_tests() {
    let _ = fmt()
        .with_env_filter(filter_bauen("debug"))
        .with_test_writer()
        .try_init();
}

fn filter_bauen(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn format_waehlen(format: &str) -> String {
    std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| format.to_string())
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
