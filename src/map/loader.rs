use crate::map::bounds::GeoPoint;
use crate::map::layers::{CityBikeStation, OverlayKind, OverlayLayer, StopMarker, VectorTileLayer};
use anyhow::Result;
use geojson::{GeoJson, Geometry, Value};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

const STOPS_FILE: &str = "stops.json";
const CITYBIKES_FILE: &str = "citybikes.json";
const ROUTES_FILE: &str = "routes.json";

/// Loads overlay payloads on demand, off the UI loop. Each load checks the
/// owner's cancellation token before delivering, so a load that resolves
/// after the owning component unmounted is a no-op instead of a dangling
/// callback. Resolution order between concurrent loads is not defined.
pub struct OverlayLoader {
    data_dir: PathBuf,
    cancel: Arc<AtomicBool>,
    tx: Sender<OverlayLayer>,
    rx: Receiver<OverlayLayer>,
    requested: HashSet<OverlayKind>,
}

impl OverlayLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let (tx, rx) = channel();
        Self {
            data_dir: data_dir.into(),
            cancel: Arc::new(AtomicBool::new(false)),
            tx,
            rx,
            requested: HashSet::new(),
        }
    }

    /// Kick off a load for an overlay. Requesting the same overlay again is
    /// a no-op.
    pub fn request(&mut self, kind: OverlayKind) {
        if !self.requested.insert(kind) {
            return;
        }
        tracing::debug!(?kind, "requesting overlay");
        let dir = self.data_dir.clone();
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        thread::spawn(move || match load_overlay(kind, &dir) {
            Ok(layer) => finish_load(&cancel, &tx, layer),
            Err(e) => tracing::warn!(?kind, error = %e, "overlay load failed"),
        });
    }

    pub fn has_requested(&self, kind: OverlayKind) -> bool {
        self.requested.contains(&kind)
    }

    /// Drain overlays that resolved since the last poll.
    pub fn poll(&mut self) -> Vec<OverlayLayer> {
        self.rx.try_iter().collect()
    }

    /// Turn any still-running loads into no-ops.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

impl Drop for OverlayLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Deliver a resolved overlay unless the owner is gone.
fn finish_load(cancel: &AtomicBool, tx: &Sender<OverlayLayer>, layer: OverlayLayer) {
    if cancel.load(Ordering::Relaxed) {
        tracing::debug!(kind = ?layer.kind(), "overlay resolved after unmount, dropping");
        return;
    }
    let _ = tx.send(layer);
}

fn load_overlay(kind: OverlayKind, dir: &Path) -> Result<OverlayLayer> {
    match kind {
        OverlayKind::Stops => Ok(OverlayLayer::Stops(load_stops(&dir.join(STOPS_FILE))?)),
        OverlayKind::CityBikes => Ok(OverlayLayer::CityBikes(load_city_bikes(
            &dir.join(CITYBIKES_FILE),
        )?)),
        OverlayKind::VectorTiles => {
            let stops = load_stops(&dir.join(STOPS_FILE))?;
            let geometry = load_route_geometry(&dir.join(ROUTES_FILE))?;
            Ok(OverlayLayer::VectorTiles(VectorTileLayer {
                stops,
                geometry,
            }))
        }
    }
}

/// Load stop markers from a GeoJSON point collection. A missing file yields
/// the built-in demo stops so the map stays usable without a data directory.
fn load_stops(path: &Path) -> Result<Vec<StopMarker>> {
    let Some(geojson) = read_geojson(path)? else {
        return Ok(demo_stops());
    };
    let GeoJson::FeatureCollection(fc) = geojson else {
        anyhow::bail!("{} is not a feature collection", path.display());
    };

    Ok(fc
        .features
        .into_par_iter()
        .filter_map(|feature| {
            let pos = point_of(feature.geometry.as_ref())?;
            let props = feature.properties.as_ref();
            let name = props
                .and_then(|p| p.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_string();
            let code = props
                .and_then(|p| p.get("code"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            Some(StopMarker { pos, name, code })
        })
        .collect())
}

/// Load city-bike stations from a GeoJSON point collection.
fn load_city_bikes(path: &Path) -> Result<Vec<CityBikeStation>> {
    let Some(geojson) = read_geojson(path)? else {
        return Ok(demo_city_bikes());
    };
    let GeoJson::FeatureCollection(fc) = geojson else {
        anyhow::bail!("{} is not a feature collection", path.display());
    };

    Ok(fc
        .features
        .into_par_iter()
        .filter_map(|feature| {
            let pos = point_of(feature.geometry.as_ref())?;
            let props = feature.properties.as_ref();
            let name = props
                .and_then(|p| p.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_string();
            let bikes_available = props
                .and_then(|p| p.get("bikesAvailable"))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32);
            Some(CityBikeStation {
                pos,
                name,
                bikes_available,
            })
        })
        .collect())
}

/// Load route line geometry for the vector overlay.
fn load_route_geometry(path: &Path) -> Result<Vec<Vec<(f64, f64)>>> {
    let Some(geojson) = read_geojson(path)? else {
        return Ok(demo_route_geometry());
    };
    let mut lines = Vec::new();
    collect_lines(&geojson, &mut |line| lines.push(line));
    Ok(lines)
}

fn read_geojson(path: &Path) -> Result<Option<GeoJson>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(content.parse()?))
}

fn point_of(geometry: Option<&Geometry>) -> Option<GeoPoint> {
    match geometry.map(|g| &g.value) {
        Some(Value::Point(coords)) if coords.len() >= 2 => {
            let p = GeoPoint::new(coords[1], coords[0]);
            p.is_valid().then_some(p)
        }
        _ => None,
    }
}

/// Extract line features from any GeoJSON shape.
fn collect_lines<F>(geojson: &GeoJson, add_line: &mut F)
where
    F: FnMut(Vec<(f64, f64)>),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    collect_geometry_lines(geometry, add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                collect_geometry_lines(geometry, add_line);
            }
        }
        GeoJson::Geometry(geometry) => collect_geometry_lines(geometry, add_line),
    }
}

fn collect_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(Vec<(f64, f64)>),
{
    match &geometry.value {
        Value::LineString(coords) => {
            add_line(coords.iter().map(|c| (c[0], c[1])).collect());
        }
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(coords.iter().map(|c| (c[0], c[1])).collect());
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// A handful of central Helsinki stops, used when no data directory exists.
fn demo_stops() -> Vec<StopMarker> {
    [
        ("Rautatientori", "1020", 60.1713, 24.9414),
        ("Lasipalatsi", "1040", 60.1702, 24.9367),
        ("Kamppi", "1036", 60.1690, 24.9316),
        ("Senaatintori", "1111", 60.1692, 24.9522),
        ("Hakaniemi", "1220", 60.1789, 24.9508),
    ]
    .into_iter()
    .map(|(name, code, lat, lon)| StopMarker {
        pos: GeoPoint::new(lat, lon),
        name: name.to_string(),
        code: Some(code.to_string()),
    })
    .collect()
}

fn demo_city_bikes() -> Vec<CityBikeStation> {
    [
        ("Kaivopuisto", 60.1553, 24.9503, 7),
        ("Narinkka", 60.1699, 24.9330, 12),
        ("Kaisaniemenpuisto", 60.1745, 24.9492, 3),
    ]
    .into_iter()
    .map(|(name, lat, lon, bikes)| CityBikeStation {
        pos: GeoPoint::new(lat, lon),
        name: name.to_string(),
        bikes_available: Some(bikes),
    })
    .collect()
}

fn demo_route_geometry() -> Vec<Vec<(f64, f64)>> {
    // Tram 4 through the center, roughly.
    vec![vec![
        (24.9216, 60.1611),
        (24.9316, 60.1690),
        (24.9367, 60.1702),
        (24.9414, 60.1713),
        (24.9508, 60.1789),
    ]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn request_is_idempotent() {
        let mut loader = OverlayLoader::new("nonexistent");
        loader.request(OverlayKind::Stops);
        loader.request(OverlayKind::Stops);
        assert!(loader.has_requested(OverlayKind::Stops));
        assert_eq!(loader.requested.len(), 1);
    }

    #[test]
    fn cancelled_load_is_dropped() {
        let (tx, rx) = channel();
        let cancel = AtomicBool::new(true);
        finish_load(&cancel, &tx, OverlayLayer::Stops(Vec::new()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn live_load_is_delivered() {
        let (tx, rx) = channel();
        let cancel = AtomicBool::new(false);
        finish_load(&cancel, &tx, OverlayLayer::Stops(Vec::new()));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn missing_files_fall_back_to_demo_data() {
        let stops = load_stops(Path::new("no/such/dir/stops.json")).unwrap();
        assert!(!stops.is_empty());
    }

    #[test]
    fn stops_parse_from_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stops.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"{"type":"FeatureCollection","features":[
                {"type":"Feature",
                 "geometry":{"type":"Point","coordinates":[24.94,60.17]},
                 "properties":{"name":"Rautatientori","code":"1020"}}]}"#,
        )
        .unwrap();

        let stops = load_stops(&path).unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].name, "Rautatientori");
        assert_eq!(stops[0].code.as_deref(), Some("1020"));
        assert!((stops[0].pos.lat - 60.17).abs() < 1e-9);
    }

    #[test]
    fn vector_overlay_carries_stops_and_geometry() {
        let layer = load_overlay(OverlayKind::VectorTiles, Path::new("no/such/dir")).unwrap();
        match layer {
            OverlayLayer::VectorTiles(v) => {
                assert!(!v.stops.is_empty());
                assert!(!v.geometry.is_empty());
            }
            _ => panic!("wrong overlay kind"),
        }
    }
}
