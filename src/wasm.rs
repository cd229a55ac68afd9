//! WASM bindings for the idef-core library.
//!
//! All functions exposed to JavaScript via wasm-bindgen are defined here.
//! Everything crosses the boundary as JSON strings; failures are printed with
//! `console.error` and returned as `{"error": "..."}`.

use std::collections::BTreeMap;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::editor::{Editor, EditorConfig};
use crate::layout::{Size, Viewport};
use crate::model::{ConnectionId, Diagram, DiagramSnapshot, NodeId, Point, PortId, ResourceKind, ViewTransform};
use crate::output::{DiagramOutput, ErrorOutput, FrameSurface};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    pub fn console_log(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| error_json(&format!("Serialization error: {e}")))
}

fn error_json(message: &str) -> String {
    console_error(message);
    let out = ErrorOutput { error: message.to_string() };
    serde_json::to_string(&out).unwrap_or_else(|_| "{\"error\": \"Serialization error\"}".to_string())
}

fn result_json<T: Serialize>(result: crate::Result<T>) -> String {
    match result {
        Ok(value) => to_json(&value),
        Err(e) => error_json(&e.to_string()),
    }
}

fn parse_kind(kind: &str) -> Option<ResourceKind> {
    serde_json::from_value(serde_json::Value::String(kind.to_string())).ok()
}

/// `{"<connection id>": "<svg d>", ...}`. Malformed input reads as no paths.
fn parse_paths(paths_json: &str) -> BTreeMap<ConnectionId, String> {
    if paths_json.trim().is_empty() {
        return BTreeMap::new();
    }
    match serde_json::from_str::<BTreeMap<u32, String>>(paths_json) {
        Ok(paths) => paths.into_iter().map(|(id, d)| (ConnectionId(id), d)).collect(),
        Err(e) => {
            console_error(&format!("Error parsing connection paths: {e}"));
            BTreeMap::new()
        }
    }
}

#[derive(Serialize)]
struct Created<T> {
    id: T,
}

#[wasm_bindgen]
pub struct EditorHandle {
    editor: Editor,
}

#[wasm_bindgen]
impl EditorHandle {
    /// `config_json` may be empty; unknown or missing fields use defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, config_json: &str, demo: bool, now: f64) -> EditorHandle {
        let cfg = if config_json.trim().is_empty() {
            EditorConfig::default()
        } else {
            serde_json::from_str(config_json).unwrap_or_else(|e| {
                console_error(&format!("Error parsing config, using defaults: {e}"));
                EditorConfig::default()
            })
        };
        let diagram = if demo { Diagram::demo() } else { Diagram::new() };
        EditorHandle { editor: Editor::new(diagram, Viewport::new(width, height), cfg, now) }
    }

    pub fn diagram(&self) -> String {
        let orientation = self.editor.viewport().orientation();
        to_json(&DiagramOutput::new(self.editor.diagram(), orientation))
    }

    pub fn set_viewport(&mut self, width: f32, height: f32, now: f64) {
        self.editor.set_viewport(Viewport::new(width, height), now);
    }

    pub fn set_view(&mut self, scale: f32, offset_x: f32, offset_y: f32) {
        self.editor.set_view(ViewTransform { scale, offset_x, offset_y });
    }

    pub fn set_footprint(&mut self, node: u32, width: f32, height: f32) {
        self.editor.set_footprint(NodeId(node), Size::new(width, height));
    }

    pub fn add_process(&mut self, title: &str, now: f64) -> String {
        result_json(self.editor.add_process(title, now).map(|id| Created { id }))
    }

    pub fn add_resource(&mut self, kind: &str, title: &str, now: f64) -> String {
        match parse_kind(kind) {
            Some(kind) => result_json(self.editor.add_resource(kind, title, now).map(|id| Created { id })),
            None => error_json(&format!("Unknown resource kind '{kind}'")),
        }
    }

    pub fn add_input(&mut self, process: u32, now: f64) -> String {
        result_json(self.editor.add_input(NodeId(process), now).map(|id| Created { id }))
    }

    pub fn add_output(&mut self, process: u32, now: f64) -> String {
        result_json(self.editor.add_output(NodeId(process), now).map(|id| Created { id }))
    }

    pub fn add_mechanism(&mut self, process: u32, kind: &str, now: f64) -> String {
        let Some(kind) = parse_kind(kind) else {
            return error_json(&format!("Unknown resource kind '{kind}'"));
        };
        result_json(self.editor.add_mechanism(NodeId(process), kind, now).map(|id| Created { id }))
    }

    pub fn spawn_downstream_process(&mut self, output_resource: u32, now: f64) -> String {
        result_json(
            self.editor
                .spawn_downstream_process(NodeId(output_resource), now)
                .map(|id| Created { id }),
        )
    }

    pub fn remove_node(&mut self, node: u32, now: f64) -> String {
        result_json(self.editor.remove_node(NodeId(node), now))
    }

    pub fn connect(&mut self, from: u32, to: u32, now: f64) -> String {
        result_json(self.editor.connect(PortId(from), PortId(to), now).map(|id| Created { id }))
    }

    pub fn disconnect(&mut self, connection: u32, now: f64) -> bool {
        self.editor.disconnect(ConnectionId(connection), now)
    }

    pub fn begin_drag(&mut self, node: u32) {
        self.editor.begin_drag(NodeId(node));
    }

    pub fn drag_to(&mut self, node: u32, x: f32, y: f32) -> bool {
        self.editor.drag_to(NodeId(node), Point::new(x, y))
    }

    pub fn end_drag(&mut self) {
        self.editor.end_drag();
    }

    /// Run due layout/refresh actions. `paths_json` maps connection ids to SVG paths.
    pub fn poll(&mut self, now: f64, paths_json: &str) -> String {
        let mut surface = FrameSurface::new(parse_paths(paths_json), self.editor.config().refresh.arrow_size);
        let actions = self.editor.poll(now, &mut surface);
        if actions.contains(&crate::watcher::WatchAction::Layout) {
            surface.frame.port_sides = self.editor.last_layout().map(|l| l.port_sides.clone());
        }
        surface.frame.actions = actions;
        self.finish(surface)
    }

    pub fn animation_frame(&mut self, paths_json: &str) -> String {
        let mut surface = FrameSurface::new(parse_paths(paths_json), self.editor.config().refresh.arrow_size);
        self.editor.animation_frame(&mut surface);
        self.finish(surface)
    }

    pub fn save(&self) -> String {
        match self.editor.save().to_json() {
            Ok(json) => json,
            Err(e) => error_json(&format!("Error saving diagram: {e}")),
        }
    }

    pub fn load(&mut self, snapshot_json: &str, now: f64) -> String {
        let loaded = DiagramSnapshot::from_json(snapshot_json)
            .and_then(|snapshot| self.editor.load(&snapshot, now));
        match loaded {
            Ok(()) => {
                console_log(&format!("Loaded diagram with {} nodes", self.editor.diagram().nodes().len()));
                self.diagram()
            }
            Err(e) => error_json(&format!("Error loading diagram: {e}")),
        }
    }
}

impl EditorHandle {
    fn finish(&self, mut surface: FrameSurface) -> String {
        surface.frame.refresh_pending = self.editor.refresh_pending();
        surface.frame.next_deadline = self.editor.next_deadline();
        to_json(&surface.frame)
    }
}
