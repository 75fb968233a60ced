//! Library side of the `publish-media` binary: the publish pipeline and
//! tracing setup.

pub mod publish;

pub use publish::{AssetFailure, AssetOutcome, PublishError, PublishReport, Publisher};

use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Initialize tracing for CLI binaries. Warnings and errors go to stderr,
/// progress lines to stdout.
pub fn init_tracing() {
    let writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_writer(writer)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
