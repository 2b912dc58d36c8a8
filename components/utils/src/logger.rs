// Copyright 2026 sunder
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use snafu::Whatever;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration for the command line entry points.
#[derive(Debug)]
pub struct LoggingConfig {
    /// The default filter directive (in the sense of
    /// [tracing_subscriber::filter::EnvFilter]) to use for logs. Will be
    /// overridden by the `SUNDER_LOG` environment variable if set.
    pub default_filter: String,
}

impl LoggingConfig {
    /// Derive the default filter from the command line verbosity switch.
    pub fn from_verbosity(verbose: bool) -> Self {
        let default_filter = if verbose { "debug" } else { "info" };
        LoggingConfig {
            default_filter: default_filter.to_string(),
        }
    }

    /// Initialize logging to stderr.
    ///
    /// The log level comes from `default_filter` unless the `SUNDER_LOG`
    /// environment variable overrides it.
    pub fn init_tracing_subscriber(self) -> Result<(), Whatever> {
        let env_filter = create_env_filter(&self.default_filter);
        // Don't install a subscriber if we'll never emit any logs
        if env_filter.max_level_hint() == Some(LevelFilter::OFF) {
            return Ok(());
        }

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_ansi(supports_color::on(supports_color::Stream::Stderr).is_some())
            .with_target(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();

        Ok(())
    }
}

/// Create the filter from the SUNDER_LOG environment variable or the given
/// default if that variable is unset. We do this in a function because
/// [EnvFilter] isn't [Clone].
fn create_env_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_from_env("SUNDER_LOG").unwrap_or_else(|_| EnvFilter::new(filter))
}
