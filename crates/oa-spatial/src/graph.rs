//! Lazily built, process-lifetime road graph handle.
//!
//! A [`RoadGraph`] owns its segment sources and builds the network the first
//! time [`ensure_built`](RoadGraph::ensure_built) is called.  After that the
//! network is immutable and reads take no lock.
//!
//! # Source fallback
//!
//! | Primary        | Fallback       | Result                                   |
//! |----------------|----------------|------------------------------------------|
//! | segments       | —              | graph from primary                       |
//! | error or empty | segments       | graph from fallback                      |
//! | error or empty | empty          | empty graph (queries degrade to estimates) |
//! | empty          | error          | empty graph                              |
//! | error          | error / absent | `DataUnavailable`, retried on next call  |
//!
//! A failed build is never cached; the next caller tries again.

use std::sync::{Mutex, OnceLock, PoisonError};

use log::{info, warn};

use crate::build::build_network;
use crate::config::BuildOptions;
use crate::network::RoadNetwork;
use crate::segment::RoadSegment;
use crate::source::{SegmentSource, StaticSegmentSource};
use crate::{SpatialError, SpatialResult};

/// Explicitly owned road graph with a one-shot build.
///
/// Share it behind an `Arc` and hand it to every query function.
pub struct RoadGraph {
    primary:    Box<dyn SegmentSource>,
    fallback:   Option<Box<dyn SegmentSource>>,
    options:    BuildOptions,
    network:    OnceLock<RoadNetwork>,
    build_lock: Mutex<()>,
}

impl RoadGraph {
    pub fn new(primary: impl SegmentSource + 'static) -> Self {
        Self {
            primary:    Box::new(primary),
            fallback:   None,
            options:    BuildOptions::default(),
            network:    OnceLock::new(),
            build_lock: Mutex::new(()),
        }
    }

    /// Source consulted when the primary fails or yields nothing.
    pub fn with_fallback(mut self, fallback: impl SegmentSource + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Wrap an already-built network (fixtures, tests, offline builds).
    pub fn from_network(network: RoadNetwork) -> Self {
        let graph = Self::new(StaticSegmentSource::empty());
        // Fresh cell: `set` cannot fail.
        let _ = graph.network.set(network);
        graph
    }

    /// `true` once a build has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.network.get().is_some()
    }

    /// The built network, if any, without triggering a build.
    pub fn network(&self) -> Option<&RoadNetwork> {
        self.network.get()
    }

    /// Build the network if that has not happened yet and return it.
    ///
    /// Safe to call from many threads at once: exactly one caller builds,
    /// the others wait and then share the result.  Calling it again after a
    /// successful build is a no-op.
    pub fn ensure_built(&self) -> SpatialResult<&RoadNetwork> {
        if let Some(net) = self.network.get() {
            return Ok(net);
        }

        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(net) = self.network.get() {
            return Ok(net);
        }

        let segments = self.load_segments()?;
        let network = build_network(segments, &self.options);
        Ok(self.network.get_or_init(|| network))
    }

    fn load_segments(&self) -> SpatialResult<Vec<RoadSegment>> {
        let primary_err = match self.primary.load() {
            Ok(segs) if !segs.is_empty() => {
                info!("loaded {} road segments from {}", segs.len(), self.primary.name());
                return Ok(segs);
            }
            Ok(_) => {
                warn!("segment source {} returned no segments", self.primary.name());
                None
            }
            Err(e) => {
                warn!("segment source {} failed: {e}", self.primary.name());
                Some(e)
            }
        };

        let Some(fallback) = &self.fallback else {
            return match primary_err {
                Some(e) => Err(SpatialError::DataUnavailable(format!("{}: {e}", self.primary.name()))),
                None => Ok(Vec::new()),
            };
        };

        match (fallback.load(), primary_err) {
            (Ok(segs), _) => {
                if segs.is_empty() {
                    warn!("fallback source {} is empty; routing will use estimates only", fallback.name());
                } else {
                    info!("loaded {} road segments from fallback {}", segs.len(), fallback.name());
                }
                Ok(segs)
            }
            (Err(e), None) => {
                warn!("fallback source {} failed: {e}; primary was empty", fallback.name());
                Ok(Vec::new())
            }
            (Err(fallback_err), Some(primary_err)) => Err(SpatialError::DataUnavailable(format!(
                "{}: {primary_err}; {}: {fallback_err}",
                self.primary.name(),
                fallback.name()
            ))),
        }
    }
}
