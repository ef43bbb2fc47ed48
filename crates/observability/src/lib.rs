//! Tracing and logging setup shared by the binaries.

/// Initialize process-wide tracing, picking the output format from `LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let raw = std::env::var("LOG_FORMAT").ok();
    let format = raw
        .as_deref()
        .map(str::parse::<tracing::LogFormat>)
        .transpose();

    match format {
        Ok(format) => tracing::init(format.unwrap_or_default()),
        Err(e) => {
            tracing::init(tracing::LogFormat::default());
            ::tracing::warn!(error = %e, "falling back to json logs");
        }
    }
}

/// Subscriber configuration (filters, formatters).
pub mod tracing;

pub use self::tracing::{LogFormat, UnknownLogFormat};
