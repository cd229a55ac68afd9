//! One editing session: the diagram plus everything that keeps it laid out.
//!
//! The host drives the session with timestamps and animation frames:
//! edits notify the [`ChangeWatcher`], [`Editor::poll`] runs whatever the
//! watcher says is due, and [`Editor::animation_frame`] advances the
//! connection refresh.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::Result;
use crate::layout::{LayoutConfig, LayoutResult, MeasuredSizes, Size, Viewport, layout_pass};
use crate::model::{ConnectionId, Diagram, DiagramSnapshot, NodeId, Point, PortId, ResourceKind, ViewTransform};
use crate::refresh::{ConnectionRefresher, RefreshConfig, RenderSurface};
use crate::watcher::{ChangeWatcher, StructureSignature, WatchAction, WatcherConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub layout: LayoutConfig,
    pub watcher: WatcherConfig,
    pub refresh: RefreshConfig,
}

pub struct Editor {
    diagram: Diagram,
    sizes: MeasuredSizes,
    watcher: ChangeWatcher,
    refresher: ConnectionRefresher,
    viewport: Viewport,
    cfg: EditorConfig,
    dragging: Option<NodeId>,
    last_layout: Option<LayoutResult>,
}

impl Editor {
    /// A session over `diagram`. A non-empty diagram gets its first pass scheduled.
    pub fn new(diagram: Diagram, viewport: Viewport, cfg: EditorConfig, now: f64) -> Self {
        let mut watcher = ChangeWatcher::new(cfg.watcher.clone(), StructureSignature::default());
        watcher.observe(StructureSignature::of(&diagram), now);
        Self {
            diagram,
            sizes: MeasuredSizes::new(),
            watcher,
            refresher: ConnectionRefresher::new(),
            viewport,
            cfg,
            dragging: None,
            last_layout: None,
        }
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn config(&self) -> &EditorConfig {
        &self.cfg
    }

    pub fn last_layout(&self) -> Option<&LayoutResult> {
        self.last_layout.as_ref()
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.watcher.next_deadline()
    }

    pub fn refresh_pending(&self) -> bool {
        self.refresher.is_pending()
    }

    fn notify(&mut self, now: f64) {
        self.watcher.observe(StructureSignature::of(&self.diagram), now);
    }

    pub fn add_process(&mut self, title: &str, now: f64) -> Result<NodeId> {
        let id = self.diagram.add_process(title)?;
        self.notify(now);
        Ok(id)
    }

    pub fn add_resource(&mut self, kind: ResourceKind, title: &str, now: f64) -> Result<NodeId> {
        let id = self.diagram.add_resource(kind, title)?;
        self.notify(now);
        Ok(id)
    }

    pub fn add_input(&mut self, process: NodeId, now: f64) -> Result<NodeId> {
        let id = self.diagram.add_input(process)?;
        self.notify(now);
        Ok(id)
    }

    pub fn add_output(&mut self, process: NodeId, now: f64) -> Result<NodeId> {
        let id = self.diagram.add_output(process)?;
        self.notify(now);
        Ok(id)
    }

    pub fn add_mechanism(&mut self, process: NodeId, kind: ResourceKind, now: f64) -> Result<NodeId> {
        let id = self.diagram.add_mechanism(process, kind)?;
        self.notify(now);
        Ok(id)
    }

    pub fn spawn_downstream_process(&mut self, output_resource: NodeId, now: f64) -> Result<NodeId> {
        let id = self.diagram.spawn_downstream_process(output_resource)?;
        self.notify(now);
        Ok(id)
    }

    pub fn remove_node(&mut self, id: NodeId, now: f64) -> Result<()> {
        self.diagram.remove_node(id)?;
        self.sizes.forget(id);
        if self.dragging == Some(id) {
            self.dragging = None;
        }
        self.notify(now);
        Ok(())
    }

    pub fn connect(&mut self, from: PortId, to: PortId, now: f64) -> Result<ConnectionId> {
        let id = self.diagram.connect(from, to)?;
        self.notify(now);
        Ok(id)
    }

    pub fn disconnect(&mut self, id: ConnectionId, now: f64) -> bool {
        let removed = self.diagram.disconnect(id);
        self.notify(now);
        removed
    }

    /// A resize reschedules layout; the orientation is re-read on the next pass.
    pub fn set_viewport(&mut self, viewport: Viewport, now: f64) {
        if viewport == self.viewport {
            return;
        }
        trace!(?viewport, "viewport changed");
        self.viewport = viewport;
        self.watcher.poke(now);
    }

    /// Pan/zoom state. Footprints reported afterwards are read at this scale.
    pub fn set_view(&mut self, view: ViewTransform) {
        self.diagram.view = view;
    }

    /// Rendered footprint of `node`, in screen pixels.
    pub fn set_footprint(&mut self, node: NodeId, size: Size) {
        self.sizes.record(node, size);
    }

    pub fn begin_drag(&mut self, node: NodeId) {
        self.dragging = Some(node);
    }

    /// The rendering layer owns the position while dragging; nothing is scheduled.
    pub fn drag_to(&mut self, node: NodeId, position: Point) -> bool {
        self.diagram.set_position(node, position)
    }

    pub fn end_drag(&mut self) {
        self.dragging = None;
    }

    /// Run every action the watcher has due at `now`.
    pub fn poll(&mut self, now: f64, surface: &mut dyn RenderSurface) -> Vec<WatchAction> {
        let actions = self.watcher.poll(now);
        for action in &actions {
            match action {
                WatchAction::Layout => {
                    self.layout_now(surface);
                }
                WatchAction::Refresh => self.refresher.request(),
            }
        }
        actions
    }

    /// Advance the connection refresh by one frame. Returns whether more frames are needed.
    pub fn animation_frame(&mut self, surface: &mut dyn RenderSurface) -> bool {
        self.refresher
            .on_animation_frame(&self.diagram, surface, &self.cfg.refresh)
    }

    /// Run a pass immediately and write moved nodes back. Returns how many moved.
    pub fn layout_now(&mut self, surface: &mut dyn RenderSurface) -> usize {
        let Some(result) = layout_pass(
            &self.diagram,
            self.viewport,
            &self.sizes,
            &self.cfg.layout,
            self.watcher.mode(),
        ) else {
            return 0;
        };

        let mut moved = 0;
        for (&id, &position) in &result.positions {
            if self.dragging == Some(id) {
                trace!(node = %id, "skipping dragged node");
                continue;
            }
            let unchanged = self.diagram.node(id).is_some_and(|n| n.position == position);
            if !unchanged && self.diagram.set_position(id, position) {
                surface.set_node_position(id, position);
                moved += 1;
            }
        }
        debug!(moved, "layout applied");
        self.last_layout = Some(result);
        moved
    }

    pub fn save(&self) -> DiagramSnapshot {
        DiagramSnapshot::capture(&self.diagram)
    }

    /// Replace the diagram with a saved one. Saved positions are kept; only a
    /// refresh is scheduled so connection paths catch up. A snapshot that
    /// fails to restore leaves the session and its pending passes untouched.
    pub fn load(&mut self, snapshot: &DiagramSnapshot, now: f64) -> Result<()> {
        let diagram = snapshot.restore()?;
        self.watcher.begin_bulk_load();
        self.diagram = diagram;
        self.sizes.clear();
        self.dragging = None;
        self.last_layout = None;
        self.watcher
            .end_bulk_load(StructureSignature::of(&self.diagram), now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::tests::RecordingSurface;

    fn editor(w: f32, h: f32) -> Editor {
        Editor::new(Diagram::demo(), Viewport::new(w, h), EditorConfig::default(), 0.0)
    }

    fn settle(e: &mut Editor, surface: &mut RecordingSurface, now: f64) {
        e.poll(now, surface);
        while e.animation_frame(surface) {}
    }

    #[test]
    fn new_session_lays_out_after_delay() {
        let mut e = editor(1600.0, 900.0);
        let mut s = RecordingSurface::default();
        assert!(e.poll(10.0, &mut s).is_empty());
        assert_eq!(e.poll(50.0, &mut s), vec![WatchAction::Layout]);
        let process = e.diagram().nodes()[0].id;
        assert_eq!(s.positions[&process], Point::new(700.0, 400.0));
        assert!(e.last_layout().is_some());
    }

    #[test]
    fn refresh_draws_arrows_after_layout() {
        let mut e = editor(1600.0, 900.0);
        let mut s = RecordingSurface::default();
        for c in e.diagram().connections() {
            s.paths.insert(c.id, "M 0 0 L 10 0".to_string());
        }
        e.poll(50.0, &mut s);
        assert!(!e.refresh_pending());
        e.poll(150.0, &mut s);
        assert!(e.refresh_pending());
        while e.animation_frame(&mut s) {}
        assert_eq!(s.arrows.as_ref().map(Vec::len), Some(5));
    }

    #[test]
    fn drag_is_not_fought() {
        let mut e = editor(1600.0, 900.0);
        let mut s = RecordingSurface::default();
        settle(&mut e, &mut s, 10_000.0);

        let process = e.diagram().nodes()[0].id;
        e.begin_drag(process);
        assert!(e.drag_to(process, Point::new(5.0, 5.0)));
        assert!(e.next_deadline().is_none());

        let input = e.add_input(process, 20_000.0).unwrap();
        settle(&mut e, &mut s, 30_000.0);
        assert_eq!(e.diagram().node(process).unwrap().position, Point::new(5.0, 5.0));
        assert!(s.positions.contains_key(&input));

        e.end_drag();
        e.set_viewport(Viewport::new(1601.0, 900.0), 40_000.0);
        settle(&mut e, &mut s, 50_000.0);
        assert_ne!(e.diagram().node(process).unwrap().position, Point::new(5.0, 5.0));
    }

    #[test]
    fn footprints_are_unscaled_by_zoom() {
        let mut e = editor(1600.0, 900.0);
        let mut s = RecordingSurface::default();
        let process = e.diagram().nodes()[0].id;
        e.set_view(ViewTransform { scale: 2.0, offset_x: 0.0, offset_y: 0.0 });
        e.set_footprint(process, Size::new(400.0, 200.0));
        e.layout_now(&mut s);
        let fp = e.last_layout().unwrap().footprints[&process];
        assert_eq!(fp, Size::new(200.0, 100.0));
    }

    #[test]
    fn load_keeps_saved_positions() {
        let mut e = editor(1600.0, 900.0);
        let mut s = RecordingSurface::default();
        settle(&mut e, &mut s, 10_000.0);
        let process = e.diagram().nodes()[0].id;
        e.drag_to(process, Point::new(-300.0, 12.0));
        let snapshot = e.save();

        let mut fresh = Editor::new(Diagram::new(), Viewport::new(700.0, 1200.0), EditorConfig::default(), 0.0);
        fresh.load(&snapshot, 100.0).unwrap();
        let actions = fresh.poll(100_000.0, &mut s);
        assert_eq!(actions, vec![WatchAction::Refresh]);
        assert_eq!(fresh.diagram().node(process).unwrap().position, Point::new(-300.0, 12.0));
    }

    #[test]
    fn failed_load_keeps_current_diagram() {
        let mut e = editor(1600.0, 900.0);
        let mut snapshot = e.save();
        snapshot.version = crate::model::SNAPSHOT_VERSION + 1;
        assert!(e.load(&snapshot, 0.0).is_err());
        assert_eq!(e.diagram().nodes().len(), 6);
        assert_eq!(e.watcher.mode(), crate::layout::LayoutMode::Enabled);
    }

    #[test]
    fn failed_load_keeps_pending_layout() {
        let mut e = editor(1600.0, 900.0);
        let mut s = RecordingSurface::default();
        settle(&mut e, &mut s, 10_000.0);
        let process = e.diagram().nodes()[0].id;
        e.add_input(process, 20_000.0).unwrap();

        let mut snapshot = e.save();
        snapshot.version = crate::model::SNAPSHOT_VERSION + 1;
        assert!(e.load(&snapshot, 20_010.0).is_err());
        assert_eq!(e.next_deadline(), Some(20_050.0));
        assert_eq!(e.poll(20_050.0, &mut s), vec![WatchAction::Layout]);
    }
}
