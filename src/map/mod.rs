pub mod bounds;
mod component;
mod geometry;
mod layers;
mod loader;
mod renderer;
mod tiles;
mod viewport;

pub use component::{ChromeControl, ChromePosition, MapComponent, MapProps};
pub use layers::{
    CityBikeStation, LayerSlot, OverlayKind, OverlayLayer, PlaceMarker, PositionMarker,
    StopMarker, VectorTileLayer,
};
pub use renderer::{Label, LabelKind, RenderedLayers};
pub use tiles::TileSource;
pub use viewport::{BoundsOptions, Viewport};
