use std::fmt;
use tracing::{error, info, warn};

/// Progress and failure reporting seam. The bundler never talks to a logging
/// backend directly so embedders can route diagnostics wherever they need.
pub trait Diagnostics: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str, cause: &dyn fmt::Display);
}

/// Default implementation backed by the `tracing` subscriber.
#[derive(Debug, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, message: &str, cause: &dyn fmt::Display) {
        error!("{message}: {cause}");
    }
}
