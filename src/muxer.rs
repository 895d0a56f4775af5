//! Wiring of timestamp factories, normalization and the cluster stage.

use anyhow::{Context, Result};
use mediamux_common::{Timestamp, TimestampScale, TrackId};
use mediamux_packet::{
    ClusterLimits, ClusterSink, ClusterStage, ConstantOffset, ExternalTimestamps, Packet,
    StatisticsSummary, TimestampFactory,
};
use std::collections::BTreeMap;

use crate::config::MuxConfig;

/// Timestamp factory for one track
pub type BoxedFactory = Box<dyn TimestampFactory>;

/// Drives packets of all tracks from their packetizers into a cluster sink.
///
/// Each packet gets the timestamp factory of its track (if any), is
/// normalized to the timestamp scale and then queued for the cluster stage.
pub struct Muxer<S> {
    scale: TimestampScale,
    factories: BTreeMap<TrackId, BoxedFactory>,
    stage: ClusterStage<S>,
}

impl<S: ClusterSink> Muxer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            scale: TimestampScale::default(),
            factories: BTreeMap::new(),
            stage: ClusterStage::new(sink),
        }
    }

    /// Build a muxer from configuration, loading all timestamp files.
    pub fn from_config(config: &MuxConfig, sink: S) -> Result<Self> {
        let factories = build_timestamp_factories(config)?;
        tracing::info!(
            scale_ns = config.timestamp_scale_ns,
            factories = factories.len(),
            "Configured muxer"
        );

        Ok(Self {
            scale: config.timestamp_scale(),
            factories,
            stage: build_cluster_stage(config, sink),
        })
    }

    pub fn with_scale(mut self, scale: TimestampScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_limits(mut self, limits: ClusterLimits) -> Self {
        self.stage = self.stage.with_limits(limits);
        self
    }

    /// Use `factory` for every packet of `track`, replacing any earlier one.
    pub fn with_factory(mut self, track: TrackId, factory: impl TimestampFactory + 'static) -> Self {
        self.factories.insert(track, Box::new(factory));
        self
    }

    /// Time and queue one packet. Returns the number of packets the cluster
    /// stage released as a result.
    pub fn add_packet(&mut self, mut packet: Packet) -> usize {
        if let Some(factory) = self.factories.get_mut(&packet.track) {
            factory.assign(&mut packet);
        }
        packet.normalize_timestamps(self.scale);

        self.stage.push(packet.into_shared())
    }

    pub fn stage(&self) -> &ClusterStage<S> {
        &self.stage
    }

    /// Flush everything and hand back the sink with per-track statistics.
    pub fn finish(mut self) -> (S, Vec<StatisticsSummary>) {
        let released = self.stage.flush_all();
        let summaries = self.stage.summaries();
        tracing::debug!(released, tracks = summaries.len(), "Finished muxing");

        (self.stage.into_sink(), summaries)
    }
}

/// Cluster stage with the configured limits
pub fn build_cluster_stage<S: ClusterSink>(config: &MuxConfig, sink: S) -> ClusterStage<S> {
    ClusterStage::new(sink).with_limits(config.cluster.limits())
}

/// Timestamp factories for every track that has a timestamp file or a sync
/// offset configured.
pub fn build_timestamp_factories(config: &MuxConfig) -> Result<BTreeMap<TrackId, BoxedFactory>> {
    let mut factories: BTreeMap<TrackId, BoxedFactory> = BTreeMap::new();

    for entry in &config.timestamps {
        let factory = ExternalTimestamps::from_path(&entry.file).with_context(|| {
            format!(
                "Failed to load timestamps for track {}: {:?}",
                entry.track, entry.file
            )
        })?;
        tracing::debug!(track = %entry.track, frames = factory.len(), "Loaded timestamp file");
        factories.insert(entry.track, Box::new(factory));
    }

    for entry in &config.sync {
        let offset = Timestamp::from_ms(entry.offset_ms);
        tracing::debug!(track = %entry.track, %offset, "Applying sync offset");
        factories.insert(entry.track, Box::new(ConstantOffset::new(offset)));
    }

    Ok(factories)
}
