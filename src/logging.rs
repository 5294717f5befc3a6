use std::error::Error;

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use crate::config::LogFormat;

/// Installs the global subscriber and forwards `log` records from teloxide into it.
pub fn init(level: &str, format: LogFormat) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_new(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_line_number(true)
        .with_target(false);

    match format {
        LogFormat::Json => {
            let subscriber = builder
                .json()
                .with_span_events(FmtSpan::ENTER)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Pretty => {
            let subscriber = builder.pretty().with_ansi(true).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    tracing_log::LogTracer::init()?;
    Ok(())
}
