use crate::map::bounds::GeoPoint;

/// Overlay modules the viewport can request. Loaded lazily; see
/// [`crate::map::loader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    VectorTiles,
    Stops,
    CityBikes,
}

/// A transit stop marker.
#[derive(Clone, Debug, PartialEq)]
pub struct StopMarker {
    pub pos: GeoPoint,
    pub name: String,
    pub code: Option<String>,
}

/// A city-bike station marker.
#[derive(Clone, Debug, PartialEq)]
pub struct CityBikeStation {
    pub pos: GeoPoint,
    pub name: String,
    pub bikes_available: Option<u32>,
}

/// Resolved vector overlay: route geometry plus the stops it carries.
#[derive(Clone, Debug, Default)]
pub struct VectorTileLayer {
    pub stops: Vec<StopMarker>,
    pub geometry: Vec<Vec<(f64, f64)>>,
}

/// Payload produced when a lazy overlay load resolves.
#[derive(Clone, Debug)]
pub enum OverlayLayer {
    VectorTiles(VectorTileLayer),
    Stops(Vec<StopMarker>),
    CityBikes(Vec<CityBikeStation>),
}

impl OverlayLayer {
    pub fn kind(&self) -> OverlayKind {
        match self {
            OverlayLayer::VectorTiles(_) => OverlayKind::VectorTiles,
            OverlayLayer::Stops(_) => OverlayKind::Stops,
            OverlayLayer::CityBikes(_) => OverlayKind::CityBikes,
        }
    }
}

/// Origin place marker, appended when shared state holds a usable origin.
#[derive(Clone, Copy, Debug)]
pub struct PlaceMarker {
    pub pos: GeoPoint,
    pub display_origin_popup: bool,
}

/// The user's current position marker; always part of the layer set.
#[derive(Clone, Copy, Debug, Default)]
pub struct PositionMarker {
    pub pos: Option<GeoPoint>,
}

/// One entry of the per-render layer sequence, back to front.
pub enum LayerSlot<'a> {
    /// Overlay requested but not resolved yet; renders as nothing.
    PendingOverlay(OverlayKind),
    Overlay(&'a OverlayLayer),
    Place(PlaceMarker),
    Position(PositionMarker),
}

/// Which overlays the viewport requests for the given flags. Vector-tile
/// mode excludes the marker overlays entirely, city bikes included.
pub fn requested_overlays(
    use_vector_tiles: bool,
    show_stops: bool,
    show_city_bikes: bool,
) -> Vec<OverlayKind> {
    if use_vector_tiles {
        vec![OverlayKind::VectorTiles]
    } else if show_stops {
        let mut kinds = vec![OverlayKind::Stops];
        if show_city_bikes {
            kinds.push(OverlayKind::CityBikes);
        }
        kinds
    } else {
        Vec::new()
    }
}
