use crate::config::AppConfig;
use crate::env::Capabilities;
use crate::history::History;
use crate::map::bounds::GeoPoint;
use crate::map::{MapComponent, MapProps};
use crate::resize::ResizeDetector;
use crate::select_row::{SelectRow, SelectRowProps};
use anyhow::Result;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

/// Intents queued by component callbacks, drained by the update step.
pub enum AppEvent {
    SelectTerminal { name: String },
}

/// Application state: the map viewport, the terminal selection rows and the
/// process-wide navigation history.
pub struct App {
    pub map: MapComponent,
    pub detector: ResizeDetector,
    pub rows: Vec<SelectRow>,
    pub selected_row: usize,
    pub history: Box<dyn History>,
    /// Shared origin location; the map reads it, never writes it.
    pub origin: Option<GeoPoint>,
    /// Current position fix, if any.
    pub position: Option<GeoPoint>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking.
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for the cursor marker.
    pub mouse_pos: Option<(u16, u16)>,
    /// Terminal size from the last resize.
    pub terminal_size: (u16, u16),
    events: Rc<RefCell<VecDeque<AppEvent>>>,
}

/// One entry of the terminals dataset.
#[derive(Deserialize)]
struct TerminalEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    /// Route list kept serialized; the row component owns parsing it.
    routes: String,
}

impl App {
    pub fn new(
        config: &AppConfig,
        caps: &dyn Capabilities,
        history: Box<dyn History>,
        props: MapProps,
    ) -> Result<Self> {
        let detector = ResizeDetector::new();
        let mut map = MapComponent::new(config, props, caps);
        map.mount(&detector);

        let events: Rc<RefCell<VecDeque<AppEvent>>> = Rc::default();
        let rows = build_rows(&config.data_dir(), &events)?;

        Ok(Self {
            map,
            detector,
            rows,
            selected_row: 0,
            history,
            origin: None,
            position: None,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            terminal_size: (0, 0),
            events,
        })
    }

    /// Terminal resized: remember the size and tell the map container
    /// observer, which invalidates the viewport and re-fits if requested.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.terminal_size = (width, height);
        let (map_w, map_h) = crate::ui::map_inner_size(width, height, self.rows.len());
        self.detector.notify(map_w, map_h);
    }

    /// Poll lazy loads and drain queued intents.
    pub fn update(&mut self) {
        self.map.update();

        loop {
            let event = self.events.borrow_mut().pop_front();
            let Some(event) = event else { break };
            match event {
                AppEvent::SelectTerminal { name } => {
                    let path = format!("/terminals/{}", slug(&name));
                    tracing::info!(%path, "terminal selected");
                    self.history.push(&path);
                }
            }
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn select_next_row(&mut self) {
        if !self.rows.is_empty() {
            self.selected_row = (self.selected_row + 1) % self.rows.len();
        }
    }

    pub fn select_prev_row(&mut self) {
        if !self.rows.is_empty() {
            self.selected_row = (self.selected_row + self.rows.len() - 1) % self.rows.len();
        }
    }

    pub fn activate_selected(&self) {
        if let Some(row) = self.rows.get(self.selected_row) {
            row.activate();
        }
    }

    /// Activate the row under a terminal row coordinate, if any.
    pub fn activate_at(&mut self, y: u16) {
        let (_, height) = self.terminal_size;
        let rows_start = crate::ui::rows_panel_start(height, self.rows.len());
        if y >= rows_start {
            let index = (y - rows_start) as usize;
            if index < self.rows.len() {
                self.selected_row = index;
                self.rows[index].activate();
            }
        }
    }

    pub fn navigate_back(&mut self) {
        self.history.back();
    }

    pub fn set_origin(&mut self, origin: Option<GeoPoint>) {
        self.origin = origin;
    }

    /// Pan the map.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.map.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.map.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.map.zoom_out();
    }

    /// Zoom towards a terminal cell position.
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.map.zoom_in_at(px, py);
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.map.zoom_out_at(px, py);
    }

    /// Mouse drag pans the map; the first drag event also disables any
    /// external map tracking through the component callback.
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            self.pan(dx * 2, dy * 4);
        } else {
            self.map.disable_map_tracking();
        }
        self.last_mouse = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Mouse position in braille pixel coordinates, for the cursor marker.
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| cell_to_pixel(col, row))
    }

    /// Current zoom as a status string.
    pub fn zoom_level(&self) -> String {
        format!("z{:.0}", self.map.viewport_state().zoom)
    }

    /// Current center as a status string.
    pub fn center_coords(&self) -> String {
        let center = self.map.viewport_state().center;
        format!(
            "{:.4}°{}, {:.4}°{}",
            center.lat.abs(),
            if center.lat >= 0.0 { "N" } else { "S" },
            center.lon.abs(),
            if center.lon >= 0.0 { "E" } else { "W" }
        )
    }
}

/// Terminal cell to braille pixel coordinates, accounting for the map border.
fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    let px = (col.saturating_sub(1)) as i32 * 2;
    let py = (row.saturating_sub(1)) as i32 * 4;
    (px, py)
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}

/// Build selection rows from the terminals dataset, falling back to the
/// built-in set when no data directory exists. Each row's callback queues a
/// selection intent for the update step.
fn build_rows(
    data_dir: &Path,
    events: &Rc<RefCell<VecDeque<AppEvent>>>,
) -> Result<Vec<SelectRow>> {
    let entries = load_terminals(data_dir)?;
    entries
        .into_iter()
        .map(|entry| {
            let events = events.clone();
            let props = SelectRowProps {
                kind: entry.kind,
                name: entry.name,
                routes: entry.routes,
            };
            let row = SelectRow::new(
                props,
                Box::new(move |p| {
                    events.borrow_mut().push_back(AppEvent::SelectTerminal {
                        name: p.name.clone(),
                    });
                }),
            )?;
            Ok(row)
        })
        .collect()
}

fn load_terminals(data_dir: &Path) -> Result<Vec<TerminalEntry>> {
    let path = data_dir.join("terminals.json");
    let mut bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(demo_terminals()),
        Err(e) => return Err(e.into()),
    };
    Ok(simd_json::serde::from_slice(&mut bytes)?)
}

fn demo_terminals() -> Vec<TerminalEntry> {
    let terminal = |kind: &str, name: &str, routes: &str| TerminalEntry {
        kind: kind.to_string(),
        name: name.to_string(),
        routes: routes.to_string(),
    };
    vec![
        terminal(
            "BUS",
            "Kampin terminaali",
            r#"[{"mode":"BUS","shortName":"120"},{"mode":"BUS","shortName":"121"},{"mode":"BUS","shortName":"280"}]"#,
        ),
        terminal(
            "RAIL",
            "Pasilan asema",
            r#"[{"mode":"RAIL","shortName":"A"},{"mode":"RAIL","shortName":"I"},{"mode":"RAIL","shortName":"K"},{"mode":"BUS","shortName":"23"}]"#,
        ),
        terminal(
            "TRAM",
            "Rautatientori",
            r#"[{"mode":"TRAM","shortName":"3"},{"mode":"TRAM","shortName":"6"},{"mode":"TRAM","shortName":"9"}]"#,
        ),
        terminal(
            "SUBWAY",
            "Herttoniemen metroasema",
            r#"[{"mode":"SUBWAY","shortName":"M1"},{"mode":"BUS","shortName":"79"},{"mode":"BUS","shortName":"80"}]"#,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticCapabilities;
    use crate::history::{History, MemoryHistory};

    fn test_app() -> App {
        let caps = StaticCapabilities {
            interactive: true,
            pointer: true,
            hidpi: true,
            app_shell: false,
        };
        App::new(
            &AppConfig::default(),
            &caps,
            Box::new(MemoryHistory::new("/app")),
            MapProps::default(),
        )
        .unwrap()
    }

    #[test]
    fn selecting_a_row_pushes_history() {
        let mut app = test_app();
        let before = app.history.location().path.clone();
        app.activate_selected();
        app.update();
        let after = app.history.location().path.clone();
        assert_ne!(before, after);
        assert!(after.starts_with("/app/terminals/"));
    }

    #[test]
    fn back_returns_to_previous_location() {
        let mut app = test_app();
        app.activate_selected();
        app.update();
        app.navigate_back();
        assert_eq!(app.history.location().path, "/app/");
    }

    #[test]
    fn row_selection_wraps() {
        let mut app = test_app();
        let count = app.rows.len();
        app.select_prev_row();
        assert_eq!(app.selected_row, count - 1);
        app.select_next_row();
        assert_eq!(app.selected_row, 0);
    }

    #[test]
    fn drag_pans_the_viewport() {
        let mut app = test_app();
        app.resize(80, 24);
        let before = app.map.viewport_state().center;
        app.handle_drag(40, 12);
        app.handle_drag(35, 12);
        app.end_drag();
        let after = app.map.viewport_state().center;
        assert!(after.lon != before.lon);
    }

    #[test]
    fn first_drag_event_disables_map_tracking() {
        use std::cell::Cell;

        let disabled = Rc::new(Cell::new(false));
        let disabled2 = disabled.clone();
        let caps = StaticCapabilities {
            interactive: true,
            pointer: true,
            hidpi: false,
            app_shell: false,
        };
        let props = MapProps {
            disable_map_tracking: Some(Rc::new(move || disabled2.set(true))),
            ..Default::default()
        };
        let mut app = App::new(
            &AppConfig::default(),
            &caps,
            Box::new(MemoryHistory::new("")),
            props,
        )
        .unwrap();
        app.handle_drag(10, 10);
        assert!(disabled.get());
    }
}
