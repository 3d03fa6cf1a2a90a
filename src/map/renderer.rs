use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_cross, draw_disc, draw_line, draw_ring};
use crate::map::layers::{
    CityBikeStation, LayerSlot, OverlayLayer, PlaceMarker, PositionMarker, StopMarker,
    VectorTileLayer,
};
use crate::map::tiles::TileSource;
use crate::map::viewport::Viewport;

/// Zoom at which stop labels start to appear.
const LABEL_ZOOM: f64 = 15.0;

/// What a label belongs to; the UI picks the style per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelKind {
    Stop,
    CityBike,
    Place,
    Position,
}

/// A text label in character coordinates, printed above the braille layers.
#[derive(Clone, Debug)]
pub struct Label {
    pub x: u16,
    pub y: u16,
    pub text: String,
    pub kind: LabelKind,
}

/// One frame's braille canvases, back to front. Each canvas gets its own
/// color when blitted into the terminal buffer.
pub struct RenderedLayers {
    pub grid: BrailleCanvas,
    pub geometry: BrailleCanvas,
    pub stops: BrailleCanvas,
    pub highlighted: BrailleCanvas,
    pub city_bikes: BrailleCanvas,
    pub markers: BrailleCanvas,
    pub labels: Vec<Label>,
}

/// Render the layer sequence for a viewport of `width` x `height` character
/// cells. Slot order is z-order; canvases keep the per-kind separation so
/// the UI can color them independently.
pub fn render_layers(
    width: usize,
    height: usize,
    viewport: &Viewport,
    tile_source: &TileSource,
    slots: &[LayerSlot<'_>],
    show_stops: bool,
    hilighted_stops: &[String],
) -> RenderedLayers {
    let mut out = RenderedLayers {
        grid: BrailleCanvas::new(width, height),
        geometry: BrailleCanvas::new(width, height),
        stops: BrailleCanvas::new(width, height),
        highlighted: BrailleCanvas::new(width, height),
        city_bikes: BrailleCanvas::new(width, height),
        markers: BrailleCanvas::new(width, height),
        labels: Vec::new(),
    };

    draw_tile_grid(&mut out.grid, viewport, tile_source);

    for slot in slots {
        match slot {
            // Pending overlays render as nothing until their load resolves.
            LayerSlot::PendingOverlay(_) => {}
            LayerSlot::Overlay(OverlayLayer::Stops(stops)) => {
                draw_stops(&mut out, stops, viewport, hilighted_stops);
            }
            LayerSlot::Overlay(OverlayLayer::CityBikes(stations)) => {
                draw_city_bikes(&mut out, stations, viewport);
            }
            LayerSlot::Overlay(OverlayLayer::VectorTiles(vector)) => {
                draw_vector(&mut out, vector, viewport, show_stops, hilighted_stops);
            }
            LayerSlot::Place(place) => draw_place(&mut out, place, viewport),
            LayerSlot::Position(position) => draw_position(&mut out, position, viewport),
        }
    }

    out
}

/// Tile boundary grid, the stand-in for the raster base layer.
fn draw_tile_grid(canvas: &mut BrailleCanvas, viewport: &Viewport, tile_source: &TileSource) {
    let tiles = tile_source.visible_tiles(viewport);
    let w = viewport.width as i32;
    let h = viewport.height as i32;

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for tile in &tiles {
        let (lon, lat) = tile.nw_corner();
        let (px, py) = viewport.project(lon, lat);
        if !xs.contains(&px) {
            xs.push(px);
        }
        if !ys.contains(&py) {
            ys.push(py);
        }
    }

    for px in xs {
        if px >= 0 && px < w {
            draw_line(canvas, px, 0, px, h - 1);
        }
    }
    for py in ys {
        if py >= 0 && py < h {
            draw_line(canvas, 0, py, w - 1, py);
        }
    }
}

fn stop_radius(zoom: f64) -> i32 {
    if zoom > 14.0 {
        3
    } else if zoom > 12.0 {
        2
    } else {
        1
    }
}

fn is_hilighted(stop: &StopMarker, hilighted: &[String]) -> bool {
    hilighted
        .iter()
        .any(|h| stop.code.as_deref() == Some(h.as_str()) || stop.name == *h)
}

fn draw_stops(
    out: &mut RenderedLayers,
    stops: &[StopMarker],
    viewport: &Viewport,
    hilighted: &[String],
) {
    for stop in stops {
        let (px, py) = viewport.project(stop.pos.lon, stop.pos.lat);
        if !viewport.is_visible(px, py) {
            continue;
        }
        let radius = stop_radius(viewport.zoom);
        draw_disc(&mut out.stops, px, py, radius);
        if is_hilighted(stop, hilighted) {
            draw_ring(&mut out.highlighted, px, py, radius + 2);
        }
        if viewport.zoom >= LABEL_ZOOM && px >= 0 && py >= 0 {
            out.labels.push(Label {
                x: (px / 2) as u16 + 2,
                y: (py / 4) as u16,
                text: stop.name.clone(),
                kind: LabelKind::Stop,
            });
        }
    }
}

fn draw_city_bikes(out: &mut RenderedLayers, stations: &[CityBikeStation], viewport: &Viewport) {
    for station in stations {
        let (px, py) = viewport.project(station.pos.lon, station.pos.lat);
        if !viewport.is_visible(px, py) {
            continue;
        }
        draw_disc(&mut out.city_bikes, px, py, stop_radius(viewport.zoom));
        if viewport.zoom >= LABEL_ZOOM && px >= 0 && py >= 0 {
            let text = match station.bikes_available {
                Some(n) => format!("{} ({n})", station.name),
                None => station.name.clone(),
            };
            out.labels.push(Label {
                x: (px / 2) as u16 + 2,
                y: (py / 4) as u16,
                text,
                kind: LabelKind::CityBike,
            });
        }
    }
}

fn draw_vector(
    out: &mut RenderedLayers,
    vector: &VectorTileLayer,
    viewport: &Viewport,
    show_stops: bool,
    hilighted: &[String],
) {
    for line in &vector.geometry {
        draw_linestring(&mut out.geometry, line, viewport);
    }
    if show_stops {
        draw_stops(out, &vector.stops, viewport, hilighted);
    }
}

fn draw_place(out: &mut RenderedLayers, place: &PlaceMarker, viewport: &Viewport) {
    let (px, py) = viewport.project(place.pos.lon, place.pos.lat);
    if !viewport.is_visible(px, py) {
        return;
    }
    draw_cross(&mut out.markers, px, py, 3);
    if place.display_origin_popup && px >= 0 && py >= 0 {
        out.labels.push(Label {
            x: (px / 2) as u16 + 2,
            y: (py / 4) as u16,
            text: "Origin".to_string(),
            kind: LabelKind::Place,
        });
    }
}

fn draw_position(out: &mut RenderedLayers, position: &PositionMarker, viewport: &Viewport) {
    let Some(pos) = position.pos else {
        return;
    };
    let (px, py) = viewport.project(pos.lon, pos.lat);
    if viewport.is_visible(px, py) {
        draw_disc(&mut out.markers, px, py, 2);
        draw_ring(&mut out.markers, px, py, 4);
    }
}

/// Draw a linestring with basic viewport culling.
fn draw_linestring(canvas: &mut BrailleCanvas, line: &[(f64, f64)], viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;
    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);
        if let Some((prev_x, prev_y)) = prev {
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.segment_might_be_visible((prev_x, prev_y), (px, py))
            {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }
        prev = Some((px, py));
    }
}
