//! Tracing subscriber setup for the binary

use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Level used until the configuration file has been read
pub const BOOTSTRAP_LEVEL: &str = "info";

/// Handle for adjusting the filter after the subscriber is installed
///
/// Holds nothing when `RUST_LOG` chose the filter or another subscriber was
/// already installed; level changes are then ignored.
pub struct TracingHandle {
    reload: Option<reload::Handle<EnvFilter, Registry>>,
}

impl TracingHandle {
    /// Switch the crate filter to `level`
    pub fn set_level(&self, level: &str) {
        let Some(handle) = &self.reload else {
            return;
        };
        if let Err(e) = handle.reload(crate_filter(level)) {
            warn!(level = %level, error = %e, "Failed to apply configured log level");
        }
    }
}

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins over `level`. Calling this twice is harmless; the second
/// install is ignored.
pub fn init_tracing(level: &str) -> TracingHandle {
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_controlled = from_env.is_some();
    let (filter, handle) = reload::Layer::new(from_env.unwrap_or_else(|| crate_filter(level)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok();

    TracingHandle {
        reload: (installed && !env_controlled).then_some(handle),
    }
}

fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(crate_directives(level))
}

fn crate_directives(level: &str) -> String {
    format!("vdub={level},vdub_pipeline={level},vdub_common={level}")
}
