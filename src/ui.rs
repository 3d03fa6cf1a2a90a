use crate::app::App;
use crate::history::HistoryKind;
use crate::map::{ChromeControl, ChromePosition, Label, LabelKind, RenderedLayers, Viewport};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Most rows shown in the selection panel.
const MAX_VISIBLE_ROWS: usize = 8;

fn rows_panel_height(row_count: usize) -> u16 {
    row_count.min(MAX_VISIBLE_ROWS) as u16
}

/// Inner size of the map container (inside its border) for a terminal size.
/// The resize path uses this so the observer sees container cells, not the
/// whole terminal.
pub fn map_inner_size(width: u16, height: u16, row_count: usize) -> (u16, u16) {
    let map_height = height
        .saturating_sub(rows_panel_height(row_count))
        .saturating_sub(1);
    (width.saturating_sub(2), map_height.saturating_sub(2))
}

/// First terminal row of the selection panel.
pub fn rows_panel_start(height: u16, row_count: usize) -> u16 {
    height
        .saturating_sub(1)
        .saturating_sub(rows_panel_height(row_count))
}

/// Render the UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),                                        // Map
            Constraint::Length(rows_panel_height(app.rows.len())),     // Rows
            Constraint::Length(1),                                     // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_rows(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Transit Map ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    match app.map.render(
        inner.width as usize,
        inner.height as usize,
        app.origin,
        app.position,
    ) {
        Some(layers) => {
            // Cursor marker position inside the map container.
            let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
                let cx = (px / 2) as u16;
                let cy = (py / 4) as u16;
                (cx < inner.width && cy < inner.height).then_some((cx, cy))
            });

            let widget = MapWidget {
                layers,
                chrome: app.map.chrome().to_vec(),
                viewport: app.map.viewport_state(),
                cursor_pos,
            };
            frame.render_widget(widget, inner);
        }
        // Headless context: only the static wrapper, no interactive map.
        None => frame.render_widget(BackgroundGradient, inner),
    }
}

/// The wrapper's background fill, shown alone when there is no map surface.
struct BackgroundGradient;

impl Widget for BackgroundGradient {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                buf[(x, y)].set_char('░').set_fg(Color::DarkGray);
            }
        }
    }
}

/// Braille map layers plus labels, chrome and the cursor marker.
struct MapWidget {
    layers: RenderedLayers,
    chrome: Vec<ChromeControl>,
    viewport: Viewport,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    fn render_canvas(
        canvas: &crate::braille::BrailleCanvas,
        color: Color,
        area: Rect,
        buf: &mut Buffer,
    ) {
        for (cx, cy, ch) in canvas.iter_cells() {
            if cx >= area.width as usize || cy >= area.height as usize {
                continue;
            }
            let x = area.x + cx as u16;
            let y = area.y + cy as u16;
            buf[(x, y)].set_char(ch).set_fg(color);
        }
    }

    fn render_labels(&self, area: Rect, buf: &mut Buffer) {
        for label in &self.layers.labels {
            if label.x >= area.width || label.y >= area.height {
                continue;
            }
            let style = label_style(label);
            let max_len = (area.width - label.x).min(24) as usize;
            let x = area.x + label.x;
            let y = area.y + label.y;
            for (i, ch) in label.text.chars().take(max_len).enumerate() {
                buf[(x + i as u16, y)].set_char(ch).set_style(style);
            }
        }
    }

    fn render_chrome(&self, area: Rect, buf: &mut Buffer) {
        for control in &self.chrome {
            match control {
                ChromeControl::Attribution { position, text } => {
                    let style = Style::default().fg(Color::DarkGray);
                    put_anchored(buf, area, *position, 0, text, style);
                }
                ChromeControl::Scale { position, metric } => {
                    if *metric {
                        let text = scale_bar_text(&self.viewport);
                        put_anchored(
                            buf,
                            area,
                            *position,
                            0,
                            &text,
                            Style::default().fg(Color::White),
                        );
                    }
                }
                ChromeControl::Zoom { position } => {
                    let style = Style::default().fg(Color::White);
                    put_anchored(buf, area, *position, 0, "[+]", style);
                    put_anchored(buf, area, *position, 1, "[-]", style);
                }
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: base grid, route geometry, markers, chrome.
        Self::render_canvas(&self.layers.grid, Color::DarkGray, area, buf);
        Self::render_canvas(&self.layers.geometry, Color::Magenta, area, buf);
        Self::render_canvas(&self.layers.stops, Color::Cyan, area, buf);
        Self::render_canvas(&self.layers.highlighted, Color::Yellow, area, buf);
        Self::render_canvas(&self.layers.city_bikes, Color::Green, area, buf);
        Self::render_canvas(&self.layers.markers, Color::Red, area, buf);

        self.render_labels(area, buf);
        self.render_chrome(area, buf);

        if let Some((cx, cy)) = self.cursor_pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn label_style(label: &Label) -> Style {
    match label.kind {
        LabelKind::Stop => Style::default().fg(Color::White),
        LabelKind::CityBike => Style::default().fg(Color::Green),
        LabelKind::Place => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD),
        LabelKind::Position => Style::default().fg(Color::Red),
    }
}

/// Write text into a corner of the area. `line_offset` counts inward from
/// the anchored edge (for stacked controls like the zoom buttons).
fn put_anchored(
    buf: &mut Buffer,
    area: Rect,
    position: ChromePosition,
    line_offset: u16,
    text: &str,
    style: Style,
) {
    let len = text.chars().count() as u16;
    if area.width < len || area.height <= line_offset {
        return;
    }
    let (x, y) = match position {
        ChromePosition::TopLeft => (area.x, area.y + line_offset),
        ChromePosition::BottomLeft => (area.x, area.y + area.height - 1 - line_offset),
        ChromePosition::BottomRight => (
            area.x + area.width - len,
            area.y + area.height - 1 - line_offset,
        ),
    };
    for (i, ch) in text.chars().enumerate() {
        buf[(x + i as u16, y)].set_char(ch).set_style(style);
    }
}

/// Metric scale bar for the current ground resolution, e.g. "├──────┤ 500 m".
fn scale_bar_text(viewport: &Viewport) -> String {
    let meters_per_cell = viewport.ground_resolution() * 2.0;
    if !(meters_per_cell.is_finite() && meters_per_cell > 0.0) {
        return String::new();
    }

    // Largest round distance (1/2/5 x 10^k) at most ~12 cells wide.
    let target = meters_per_cell * 12.0;
    let magnitude = 10f64.powf(target.log10().floor());
    let nice = [5.0, 2.0, 1.0]
        .iter()
        .map(|f| f * magnitude)
        .find(|d| *d <= target)
        .unwrap_or(magnitude);

    let cells = (nice / meters_per_cell).round().max(2.0) as usize;
    let label = if nice >= 1000.0 {
        format!("{} km", nice / 1000.0)
    } else {
        format!("{nice} m")
    };
    format!("├{}┤ {label}", "─".repeat(cells.saturating_sub(2)))
}

fn render_rows(frame: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .rows
        .iter()
        .enumerate()
        .take(area.height as usize)
        .map(|(i, row)| row.line(i == app.selected_row))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let backend = match app.history.kind() {
        HistoryKind::Storage => "storage",
        HistoryKind::Native => "native",
        HistoryKind::Memory => "memory",
    };

    let status = Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.history.location().path.clone(),
            Style::default().fg(Color::Green),
        ),
        Span::styled(" [", Style::default().fg(Color::DarkGray)),
        Span::styled(backend, Style::default().fg(Color::Magenta)),
        Span::styled("]", Style::default().fg(Color::DarkGray)),
        Span::styled(
            " | Tab:rows Enter:open Bksp:back hjkl:pan +/-:zoom q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
