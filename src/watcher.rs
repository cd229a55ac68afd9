//! Debounced scheduling of layout and refresh passes.
//!
//! The watcher sees the diagram only as a [`StructureSignature`]. Timestamps
//! are host milliseconds, passed in explicitly so scheduling stays
//! deterministic under test.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::layout::LayoutMode;
use crate::model::Diagram;

/// Node and connection counts, compared as one signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StructureSignature {
    pub nodes: usize,
    pub connections: usize,
}

impl StructureSignature {
    pub fn of(diagram: &Diagram) -> Self {
        Self {
            nodes: diagram.nodes().len(),
            connections: diagram.connections().len(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchAction {
    Layout,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Delay from a change to the first layout pass.
    pub layout_delay_ms: f64,
    /// Delay from a layout pass to the refresh that follows it.
    pub refresh_delay_ms: f64,
    /// Delay from a change to the settling layout pass, once sizes are rendered.
    pub settle_delay_ms: f64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            layout_delay_ms: 50.0,
            refresh_delay_ms: 100.0,
            settle_delay_ms: 400.0,
        }
    }
}

#[derive(Debug)]
pub struct ChangeWatcher {
    cfg: WatcherConfig,
    last_seen: StructureSignature,
    mode: LayoutMode,
    /// Due time and action, ordered by due time.
    pending: Vec<(f64, WatchAction)>,
}

impl ChangeWatcher {
    pub fn new(cfg: WatcherConfig, baseline: StructureSignature) -> Self {
        Self {
            cfg,
            last_seen: baseline,
            mode: LayoutMode::Enabled,
            pending: Vec::new(),
        }
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Report the current structure. Returns whether a pass was scheduled.
    pub fn observe(&mut self, signature: StructureSignature, now: f64) -> bool {
        if signature == self.last_seen {
            return false;
        }
        trace!(?signature, previous = ?self.last_seen, "structure changed");
        self.last_seen = signature;
        if self.mode == LayoutMode::Disabled {
            return false;
        }
        self.schedule(now);
        true
    }

    /// Schedule a pass without a structural change, e.g. after a resize.
    pub fn poke(&mut self, now: f64) {
        if self.mode == LayoutMode::Enabled {
            self.schedule(now);
        }
    }

    pub fn begin_bulk_load(&mut self) {
        debug!(dropped = self.pending.len(), "bulk load started");
        self.mode = LayoutMode::Disabled;
        self.pending.clear();
    }

    /// Re-enable layout and schedule exactly one refresh. The loaded
    /// structure becomes the baseline, so it does not trigger a layout.
    pub fn end_bulk_load(&mut self, signature: StructureSignature, now: f64) {
        debug!(?signature, "bulk load finished");
        self.mode = LayoutMode::Enabled;
        self.last_seen = signature;
        self.pending = vec![(now + self.cfg.refresh_delay_ms, WatchAction::Refresh)];
    }

    /// Take every action due at `now`, in due order.
    pub fn poll(&mut self, now: f64) -> Vec<WatchAction> {
        let due = self.pending.iter().take_while(|(at, _)| *at <= now).count();
        self.pending.drain(..due).map(|(_, action)| action).collect()
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.pending.first().map(|(at, _)| *at)
    }

    /// Replaces whatever was pending.
    fn schedule(&mut self, now: f64) {
        let cfg = &self.cfg;
        let first = now + cfg.layout_delay_ms;
        let settle = now + cfg.settle_delay_ms;
        let mut pending = vec![
            (first, WatchAction::Layout),
            (first + cfg.refresh_delay_ms, WatchAction::Refresh),
            (settle, WatchAction::Layout),
            (settle + cfg.refresh_delay_ms, WatchAction::Refresh),
        ];
        pending.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.pending = pending;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::WatchAction::{Layout, Refresh};

    fn sig(nodes: usize, connections: usize) -> StructureSignature {
        StructureSignature { nodes, connections }
    }

    fn watcher() -> ChangeWatcher {
        ChangeWatcher::new(WatcherConfig::default(), sig(0, 0))
    }

    #[test]
    fn unchanged_signature_schedules_nothing() {
        let mut w = watcher();
        assert!(!w.observe(sig(0, 0), 0.0));
        assert!(w.is_idle());
        assert_eq!(w.next_deadline(), None);
    }

    #[test]
    fn change_schedules_layout_then_refresh_twice() {
        let mut w = watcher();
        assert!(w.observe(sig(6, 5), 1000.0));
        assert_eq!(w.next_deadline(), Some(1050.0));

        assert!(w.poll(1049.0).is_empty());
        assert_eq!(w.poll(1050.0), vec![Layout]);
        assert_eq!(w.poll(1150.0), vec![Refresh]);
        assert_eq!(w.poll(1400.0), vec![Layout]);
        assert_eq!(w.poll(2000.0), vec![Refresh]);
        assert!(w.is_idle());
    }

    #[test]
    fn late_poll_drains_in_order() {
        let mut w = watcher();
        w.observe(sig(1, 0), 0.0);
        assert_eq!(w.poll(10_000.0), vec![Layout, Refresh, Layout, Refresh]);
    }

    #[test]
    fn newer_change_replaces_pending_schedule() {
        let mut w = watcher();
        w.observe(sig(1, 0), 0.0);
        w.observe(sig(2, 1), 30.0);
        assert!(w.poll(50.0).is_empty());
        assert_eq!(w.poll(80.0), vec![Layout]);
    }

    #[test]
    fn bulk_load_suppresses_layout_and_ends_with_one_refresh() {
        let mut w = watcher();
        w.observe(sig(1, 0), 0.0);
        w.begin_bulk_load();
        assert_eq!(w.mode(), LayoutMode::Disabled);
        assert!(w.is_idle());

        assert!(!w.observe(sig(10, 4), 5.0));
        w.poke(5.0);
        assert!(w.is_idle());

        w.end_bulk_load(sig(20, 12), 100.0);
        assert_eq!(w.mode(), LayoutMode::Enabled);
        assert_eq!(w.poll(10_000.0), vec![Refresh]);
        assert!(!w.observe(sig(20, 12), 10_001.0));
    }

    #[test]
    fn poke_schedules_without_structural_change() {
        let mut w = watcher();
        w.poke(0.0);
        assert_eq!(w.next_deadline(), Some(50.0));
    }
}
