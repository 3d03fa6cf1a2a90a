use crate::config::AppConfig;
use crate::env::Capabilities;
use crate::map::bounds::{bound_with_minimum_area, GeoPoint};
use crate::map::layers::{
    requested_overlays, LayerSlot, OverlayKind, OverlayLayer, PlaceMarker, PositionMarker,
};
use crate::map::loader::OverlayLoader;
use crate::map::renderer::{render_layers, RenderedLayers};
use crate::map::tiles::TileSource;
use crate::map::viewport::{BoundsOptions, Viewport};
use crate::resize::{ResizeDetector, ResizeSubscription};
use std::cell::RefCell;
use std::rc::Rc;

/// Corner a chrome control is anchored to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChromePosition {
    TopLeft,
    BottomLeft,
    BottomRight,
}

/// Map chrome attached on mount.
#[derive(Clone, Debug, PartialEq)]
pub enum ChromeControl {
    Attribution {
        position: ChromePosition,
        text: String,
    },
    Scale {
        position: ChromePosition,
        metric: bool,
    },
    Zoom {
        position: ChromePosition,
    },
}

/// Per-instance inputs of the map viewport.
#[derive(Clone, Default)]
pub struct MapProps {
    /// Caller-supplied layers, rendered first (lowest in the stack).
    pub extra_layers: Vec<OverlayLayer>,
    /// Points the viewport should enclose when `fit_bounds` is set.
    pub bounds: Vec<GeoPoint>,
    pub bounds_options: BoundsOptions,
    /// Per-instance zoom range override, forwarded to the viewport verbatim.
    pub zoom_range: Option<(f64, f64)>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub zoom: Option<f64>,
    /// Extra top-left padding applied on top of `bounds_options`.
    pub padding: Option<(u16, u16)>,
    pub fit_bounds: bool,
    pub show_stops: bool,
    pub disable_zoom: bool,
    pub show_scale_bar: bool,
    pub display_origin_popup: bool,
    pub hilighted_stops: Vec<String>,
    pub disable_map_tracking: Option<Rc<dyn Fn()>>,
}

/// The map viewport: owns the viewport state, its chrome, the resize
/// subscription and the lazily loaded overlay set. Without an interactive
/// display surface it renders nothing and attaches nothing.
pub struct MapComponent {
    props: MapProps,
    interactive: bool,
    pointer: bool,
    use_vector_tiles: bool,
    show_city_bikes: bool,
    viewport: Rc<RefCell<Viewport>>,
    tile_source: TileSource,
    loader: OverlayLoader,
    overlays: Vec<OverlayLayer>,
    chrome: Vec<ChromeControl>,
    resize_sub: Option<ResizeSubscription>,
}

impl MapComponent {
    pub fn new(config: &AppConfig, props: MapProps, caps: &dyn Capabilities) -> Self {
        let retina = config.map.use_retina_tiles && caps.is_hidpi();
        let tile_source = TileSource::new(
            config.map.url.clone(),
            config.map.tile_size,
            config.map.zoom_offset,
            retina,
        );

        let center = explicit_center(&props).unwrap_or(GeoPoint::new(
            config.map.default_center_lat,
            config.map.default_center_lon,
        ));
        let zoom = props.zoom.unwrap_or(config.map.default_zoom);
        let (min_zoom, max_zoom) = props
            .zoom_range
            .unwrap_or((config.map.min_zoom, config.map.max_zoom));
        let viewport = Viewport::new(center, zoom, 1, 1).with_zoom_range(min_zoom, max_zoom);

        Self {
            interactive: caps.is_interactive(),
            pointer: caps.has_pointer(),
            use_vector_tiles: config.map.use_vector_tiles,
            show_city_bikes: config.city_bike.show_city_bikes,
            viewport: Rc::new(RefCell::new(viewport)),
            tile_source,
            loader: OverlayLoader::new(config.data_dir()),
            overlays: Vec::new(),
            chrome: Vec::new(),
            resize_sub: None,
            props,
        }
    }

    /// Attach chrome and start observing the container size. A headless
    /// component has no map to decorate, so this is a no-op there.
    pub fn mount(&mut self, detector: &ResizeDetector) {
        if !self.interactive || self.resize_sub.is_some() {
            return;
        }

        self.chrome = self.build_chrome();

        let viewport = self.viewport.clone();
        let fit = self.props.fit_bounds;
        let bounds = self.props.bounds.clone();
        let options = self.effective_bounds_options();
        self.resize_sub = Some(detector.listen(move |width, height| {
            let mut vp = viewport.borrow_mut();
            // Braille resolution: 2x4 pixels per character cell.
            vp.invalidate_size(width as usize * 2, height as usize * 4);
            if fit {
                // An empty or degenerate bounds set makes the re-fit a no-op.
                if let Some(b) = bound_with_minimum_area(&bounds) {
                    vp.fit_bounds(&b, &options);
                }
            }
        }));
        tracing::debug!("map viewport mounted");
    }

    /// Release the resize subscription. Safe to call more than once; Drop
    /// calls it too, so no exit path leaks the listener.
    pub fn unmount(&mut self) {
        if self.resize_sub.take().is_some() {
            tracing::debug!("map viewport unmounted");
        }
        self.loader.cancel();
        self.chrome.clear();
    }

    pub fn is_mounted(&self) -> bool {
        self.resize_sub.is_some()
    }

    fn build_chrome(&self) -> Vec<ChromeControl> {
        let mut chrome = vec![ChromeControl::Attribution {
            position: ChromePosition::BottomLeft,
            text: "© OpenStreetMap".to_string(),
        }];
        if self.props.show_scale_bar {
            chrome.push(ChromeControl::Scale {
                position: ChromePosition::BottomRight,
                metric: true,
            });
        }
        if !self.props.disable_zoom || self.pointer {
            chrome.push(ChromeControl::Zoom {
                position: ChromePosition::TopLeft,
            });
        }
        chrome
    }

    pub fn chrome(&self) -> &[ChromeControl] {
        &self.chrome
    }

    pub fn tile_source(&self) -> &TileSource {
        &self.tile_source
    }

    pub fn props(&self) -> &MapProps {
        &self.props
    }

    /// Bounds options for this render: the configured options plus the
    /// padding prop, built fresh so no shared value is ever mutated.
    fn effective_bounds_options(&self) -> BoundsOptions {
        let mut options = self.props.bounds_options.clone();
        if let Some(padding) = self.props.padding {
            options.padding_top_left = padding;
        }
        options
    }

    /// Request lazy overlays per the composition policy and drain any loads
    /// that resolved since the last call. Returns true when a new overlay
    /// arrived (the caller re-renders).
    pub fn update(&mut self) -> bool {
        if !self.interactive {
            return false;
        }
        for kind in self.requested_kinds() {
            self.loader.request(kind);
        }
        let resolved = self.loader.poll();
        let arrived = !resolved.is_empty();
        self.overlays.extend(resolved);
        arrived
    }

    fn requested_kinds(&self) -> Vec<OverlayKind> {
        requested_overlays(
            self.use_vector_tiles,
            self.props.show_stops,
            self.show_city_bikes,
        )
    }

    pub fn has_requested_overlay(&self, kind: OverlayKind) -> bool {
        self.loader.has_requested(kind)
    }

    /// The layer sequence for this render, built fresh every time.
    pub fn layer_slots(
        &self,
        origin: Option<GeoPoint>,
        position: Option<GeoPoint>,
    ) -> Vec<LayerSlot<'_>> {
        let mut slots = Vec::new();

        for layer in &self.props.extra_layers {
            slots.push(LayerSlot::Overlay(layer));
        }

        for kind in self.requested_kinds() {
            match self.overlays.iter().find(|l| l.kind() == kind) {
                Some(layer) => slots.push(LayerSlot::Overlay(layer)),
                None => slots.push(LayerSlot::PendingOverlay(kind)),
            }
        }

        if let Some(pos) = origin.filter(GeoPoint::is_valid) {
            slots.push(LayerSlot::Place(PlaceMarker {
                pos,
                display_origin_popup: self.props.display_origin_popup,
            }));
        }

        slots.push(LayerSlot::Position(PositionMarker { pos: position }));
        slots
    }

    /// Render the map surface for a container of character cells, or None
    /// in a headless context (the wrapper alone is rendered then).
    pub fn render(
        &self,
        width: usize,
        height: usize,
        origin: Option<GeoPoint>,
        position: Option<GeoPoint>,
    ) -> Option<RenderedLayers> {
        if !self.interactive || width == 0 || height == 0 {
            return None;
        }

        let mut viewport = self.viewport.borrow().clone();
        viewport.invalidate_size(width * 2, height * 4);

        let slots = self.layer_slots(origin, position);
        Some(render_layers(
            width,
            height,
            &viewport,
            &self.tile_source,
            &slots,
            self.props.show_stops,
            &self.props.hilighted_stops,
        ))
    }

    /// Snapshot of the viewport for chrome and the status bar.
    pub fn viewport_state(&self) -> Viewport {
        self.viewport.borrow().clone()
    }

    pub fn pan(&self, dx: i32, dy: i32) {
        self.viewport.borrow_mut().pan(dx, dy);
    }

    pub fn zoom_in(&self) {
        self.viewport.borrow_mut().zoom_in();
    }

    pub fn zoom_out(&self) {
        self.viewport.borrow_mut().zoom_out();
    }

    pub fn zoom_in_at(&self, px: i32, py: i32) {
        self.viewport.borrow_mut().zoom_in_at(px, py);
    }

    pub fn zoom_out_at(&self, px: i32, py: i32) {
        self.viewport.borrow_mut().zoom_out_at(px, py);
    }

    /// Invoke the map-tracking-disable callback, if the parent supplied one.
    /// Called when the user starts dragging the map.
    pub fn disable_map_tracking(&self) {
        if let Some(callback) = &self.props.disable_map_tracking {
            callback();
        }
    }
}

impl Drop for MapComponent {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn explicit_center(props: &MapProps) -> Option<GeoPoint> {
    if props.fit_bounds {
        return None;
    }
    match (props.lat, props.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticCapabilities;

    fn interactive_caps() -> StaticCapabilities {
        StaticCapabilities {
            interactive: true,
            pointer: true,
            hidpi: true,
            app_shell: false,
        }
    }

    fn component(props: MapProps) -> MapComponent {
        MapComponent::new(&AppConfig::default(), props, &interactive_caps())
    }

    #[test]
    fn mount_subscribes_and_unmount_detaches() {
        let detector = ResizeDetector::new();
        let mut map = component(MapProps::default());
        map.mount(&detector);
        assert!(map.is_mounted());
        assert_eq!(detector.listener_count(), 1);
        map.unmount();
        assert_eq!(detector.listener_count(), 0);
        // A second unmount stays a no-op.
        map.unmount();
        assert_eq!(detector.listener_count(), 0);
    }

    #[test]
    fn remount_never_duplicates_listeners() {
        let detector = ResizeDetector::new();
        let mut map = component(MapProps::default());
        map.mount(&detector);
        map.mount(&detector);
        assert_eq!(detector.listener_count(), 1);
        map.unmount();
        map.mount(&detector);
        assert_eq!(detector.listener_count(), 1);
    }

    #[test]
    fn drop_releases_the_subscription() {
        let detector = ResizeDetector::new();
        {
            let mut map = component(MapProps::default());
            map.mount(&detector);
            assert_eq!(detector.listener_count(), 1);
        }
        assert_eq!(detector.listener_count(), 0);
    }

    #[test]
    fn headless_component_renders_nothing_and_mounts_nothing() {
        let caps = StaticCapabilities::default();
        let mut map = MapComponent::new(&AppConfig::default(), MapProps::default(), &caps);
        let detector = ResizeDetector::new();
        map.mount(&detector);
        assert!(!map.is_mounted());
        assert_eq!(detector.listener_count(), 0);
        assert!(map.render(40, 10, None, None).is_none());
    }

    #[test]
    fn attribution_is_always_attached() {
        let detector = ResizeDetector::new();
        let mut map = component(MapProps::default());
        map.mount(&detector);
        assert!(map
            .chrome()
            .iter()
            .any(|c| matches!(c, ChromeControl::Attribution { .. })));
    }

    #[test]
    fn scale_bar_only_when_requested() {
        let detector = ResizeDetector::new();
        let mut plain = component(MapProps::default());
        plain.mount(&detector);
        assert!(!plain
            .chrome()
            .iter()
            .any(|c| matches!(c, ChromeControl::Scale { .. })));

        let mut with_scale = component(MapProps {
            show_scale_bar: true,
            ..Default::default()
        });
        with_scale.mount(&detector);
        assert!(with_scale
            .chrome()
            .iter()
            .any(|c| matches!(c, ChromeControl::Scale { metric: true, .. })));
    }

    #[test]
    fn zoom_control_respects_disable_and_pointer() {
        let detector = ResizeDetector::new();

        // Pointer available: zoom control attaches even when disabled.
        let mut disabled_with_pointer = component(MapProps {
            disable_zoom: true,
            ..Default::default()
        });
        disabled_with_pointer.mount(&detector);
        assert!(disabled_with_pointer
            .chrome()
            .iter()
            .any(|c| matches!(c, ChromeControl::Zoom { .. })));

        // No pointer and disabled: no zoom control.
        let caps = StaticCapabilities {
            interactive: true,
            pointer: false,
            ..Default::default()
        };
        let mut disabled_no_pointer = MapComponent::new(
            &AppConfig::default(),
            MapProps {
                disable_zoom: true,
                ..Default::default()
            },
            &caps,
        );
        disabled_no_pointer.mount(&detector);
        assert!(!disabled_no_pointer
            .chrome()
            .iter()
            .any(|c| matches!(c, ChromeControl::Zoom { .. })));
    }

    #[test]
    fn resize_refits_when_fit_bounds_is_set() {
        let detector = ResizeDetector::new();
        let bounds = vec![GeoPoint::new(60.15, 24.90), GeoPoint::new(60.20, 25.00)];
        let mut map = component(MapProps {
            fit_bounds: true,
            bounds: bounds.clone(),
            ..Default::default()
        });
        map.mount(&detector);
        detector.notify(80, 24);

        let vp = map.viewport_state();
        assert_eq!(vp.width, 160);
        assert_eq!(vp.height, 96);
        let mid = GeoPoint::new(60.175, 24.95);
        let (px, py) = vp.project(mid.lon, mid.lat);
        assert!(vp.is_visible(px, py));
    }

    #[test]
    fn resize_without_fit_only_invalidates_size() {
        let detector = ResizeDetector::new();
        let map_props = MapProps {
            lat: Some(60.17),
            lon: Some(24.94),
            zoom: Some(13.0),
            ..Default::default()
        };
        let mut map = component(map_props);
        map.mount(&detector);
        let before = map.viewport_state();
        detector.notify(100, 30);
        let after = map.viewport_state();
        assert_eq!(after.center, before.center);
        assert_eq!(after.zoom, before.zoom);
        assert_eq!(after.width, 200);
    }

    #[test]
    fn explicit_center_requires_both_coordinates() {
        let only_lat = component(MapProps {
            lat: Some(60.17),
            ..Default::default()
        });
        let default_center = AppConfig::default().map.default_center_lat;
        assert_eq!(only_lat.viewport_state().center.lat, default_center);

        let both = component(MapProps {
            lat: Some(61.0),
            lon: Some(25.0),
            ..Default::default()
        });
        assert_eq!(both.viewport_state().center.lat, 61.0);
    }

    #[test]
    fn fit_bounds_ignores_explicit_center() {
        let map = component(MapProps {
            fit_bounds: true,
            lat: Some(10.0),
            lon: Some(10.0),
            bounds: vec![GeoPoint::new(60.15, 24.90), GeoPoint::new(60.20, 25.00)],
            ..Default::default()
        });
        let default_center = AppConfig::default().map.default_center_lat;
        assert_eq!(map.viewport_state().center.lat, default_center);
    }

    #[test]
    fn vector_mode_never_requests_marker_overlays() {
        let mut config = AppConfig::default();
        config.map.use_vector_tiles = true;
        config.city_bike.show_city_bikes = true;
        let mut map = MapComponent::new(
            &config,
            MapProps {
                show_stops: true,
                ..Default::default()
            },
            &interactive_caps(),
        );
        map.update();
        assert!(map.has_requested_overlay(OverlayKind::VectorTiles));
        assert!(!map.has_requested_overlay(OverlayKind::Stops));
        assert!(!map.has_requested_overlay(OverlayKind::CityBikes));
    }

    #[test]
    fn stops_mode_requests_city_bikes_only_when_configured() {
        let mut config = AppConfig::default();
        config.city_bike.show_city_bikes = true;
        let mut map = MapComponent::new(
            &config,
            MapProps {
                show_stops: true,
                ..Default::default()
            },
            &interactive_caps(),
        );
        map.update();
        assert!(map.has_requested_overlay(OverlayKind::Stops));
        assert!(map.has_requested_overlay(OverlayKind::CityBikes));
        assert!(!map.has_requested_overlay(OverlayKind::VectorTiles));
    }

    #[test]
    fn origin_without_valid_latitude_adds_no_place_marker() {
        let map = component(MapProps::default());
        let slots = map.layer_slots(Some(GeoPoint::new(f64::NAN, 24.9)), None);
        assert!(!slots
            .iter()
            .any(|s| matches!(s, LayerSlot::Place(_))));
        // The position marker is always appended.
        assert!(slots
            .iter()
            .any(|s| matches!(s, LayerSlot::Position(_))));
    }

    #[test]
    fn extra_layers_come_first() {
        let map = component(MapProps {
            extra_layers: vec![OverlayLayer::Stops(Vec::new())],
            show_stops: true,
            ..Default::default()
        });
        let slots = map.layer_slots(None, None);
        assert!(matches!(slots[0], LayerSlot::Overlay(_)));
        assert!(matches!(slots[1], LayerSlot::PendingOverlay(_)));
    }

    #[test]
    fn zoom_range_override_is_applied() {
        let map = component(MapProps {
            zoom_range: Some((5.0, 10.0)),
            zoom: Some(16.0),
            ..Default::default()
        });
        assert_eq!(map.viewport_state().zoom, 10.0);
    }

    #[test]
    fn pending_slot_until_overlay_resolves() {
        let map = component(MapProps {
            show_stops: true,
            ..Default::default()
        });
        let slots = map.layer_slots(None, None);
        assert!(slots
            .iter()
            .any(|s| matches!(s, LayerSlot::PendingOverlay(OverlayKind::Stops))));
    }
}
