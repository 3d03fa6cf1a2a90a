use crate::map::bounds::{GeoBounds, GeoPoint};
use std::f64::consts::PI;

/// World size in pixels at zoom 0 (one standard 256px tile).
const WORLD_SIZE: f64 = 256.0;
/// Programmatic +/- zoom step.
const ZOOM_DELTA: f64 = 1.0;
/// Web Mercator latitude limit.
const LAT_LIMIT: f64 = 85.0511;

/// Options applied when fitting the viewport to a bounding box.
/// Constructed fresh for every fit; never shared or mutated in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundsOptions {
    /// Extra space (pixels) reserved at the top-left edge of the viewport.
    pub padding_top_left: (u16, u16),
}

/// The visible map area: center coordinate, web-map zoom level and pixel size.
#[derive(Clone, Debug)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: f64,
    pub width: usize,
    pub height: usize,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

/// Normalized Web Mercator x for a longitude, in [0, 1].
#[inline(always)]
fn merc_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Normalized Web Mercator y for a latitude, in [0, 1] (0 = north pole).
#[inline(always)]
fn merc_y(lat: f64) -> f64 {
    let rad = lat.clamp(-LAT_LIMIT, LAT_LIMIT) * PI / 180.0;
    (1.0 - (rad.tan() + 1.0 / rad.cos()).ln() / PI) / 2.0
}

/// Inverse of [`merc_y`].
#[inline(always)]
fn inv_merc_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

impl Viewport {
    pub fn new(center: GeoPoint, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
            min_zoom: 0.0,
            max_zoom: 18.0,
        }
    }

    pub fn with_zoom_range(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
        self
    }

    /// Pixels per normalized mercator unit at the current zoom.
    #[inline(always)]
    fn scale(&self) -> f64 {
        WORLD_SIZE * self.zoom.exp2()
    }

    /// Update the cached pixel size after the container changed.
    pub fn invalidate_size(&mut self, width: usize, height: usize) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Project a coordinate to viewport pixels.
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let scale = self.scale();
        let px = (merc_x(lon) - merc_x(self.center.lon)) * scale + self.width as f64 / 2.0;
        let py = (merc_y(lat) - merc_y(self.center.lat)) * scale + self.height as f64 / 2.0;
        (px.round() as i32, py.round() as i32)
    }

    /// Unproject viewport pixels back to (lon, lat).
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.scale();
        let x = (px as f64 - self.width as f64 / 2.0) / scale + merc_x(self.center.lon);
        let y = (py as f64 - self.height as f64 / 2.0) / scale + merc_y(self.center.lat);
        (x * 360.0 - 180.0, inv_merc_y(y))
    }

    /// Pan the viewport by a pixel delta.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.scale();
        let mut lon = self.center.lon + dx as f64 / scale * 360.0;
        let y = merc_y(self.center.lat) + dy as f64 / scale;
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        self.center = GeoPoint::new(inv_merc_y(y.clamp(0.0, 1.0)), lon);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_DELTA);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_DELTA);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Zoom by one step towards a pixel position, keeping the coordinate
    /// under that position fixed.
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, ZOOM_DELTA);
    }

    /// Zoom out one step from a pixel position.
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, -ZOOM_DELTA);
    }

    fn zoom_at(&mut self, px: i32, py: i32, delta: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.set_zoom(self.zoom + delta);
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Fit the viewport to a bounding box, reserving the top-left padding
    /// from the options. Zoom is clamped to the configured range.
    pub fn fit_bounds(&mut self, bounds: &GeoBounds, options: &BoundsOptions) {
        let (pad_x, pad_y) = options.padding_top_left;
        let avail_w = (self.width.saturating_sub(pad_x as usize)).max(1) as f64;
        let avail_h = (self.height.saturating_sub(pad_y as usize)).max(1) as f64;

        let fx = (merc_x(bounds.east) - merc_x(bounds.west)).max(f64::EPSILON);
        let fy = (merc_y(bounds.south) - merc_y(bounds.north)).max(f64::EPSILON);

        let zoom_x = (avail_w / (fx * WORLD_SIZE)).log2();
        let zoom_y = (avail_h / (fy * WORLD_SIZE)).log2();
        self.set_zoom(zoom_x.min(zoom_y));

        // Place the bounds center in the middle of the unpadded region.
        let scale = self.scale();
        let mid_x = (merc_x(bounds.west) + merc_x(bounds.east)) / 2.0;
        let mid_y = (merc_y(bounds.north) + merc_y(bounds.south)) / 2.0;
        let cx = mid_x - pad_x as f64 / (2.0 * scale);
        let cy = mid_y - pad_y as f64 / (2.0 * scale);
        self.center = GeoPoint::new(inv_merc_y(cy), cx * 360.0 - 180.0);
    }

    /// Ground resolution (meters per pixel) at the viewport center.
    pub fn ground_resolution(&self) -> f64 {
        const EQUATOR_M_PER_PX: f64 = 156_543.033_92;
        EQUATOR_M_PER_PX * self.center.lat.to_radians().cos() / self.zoom.exp2()
    }

    /// Check if a projected point is near the visible area.
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Rough bounding box check for a line segment.
    pub fn segment_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        p1.0.max(p2.0) >= 0
            && p1.0.min(p2.0) < self.width as i32
            && p1.1.max(p2.1) >= 0
            && p1.1.min(p2.1) < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(GeoPoint::new(0.0, 0.0), 2.0, 200, 100)
    }

    #[test]
    fn center_projects_to_middle() {
        let vp = viewport();
        assert_eq!(vp.project(0.0, 0.0), (100, 50));
    }

    #[test]
    fn project_unproject_round_trip() {
        let vp = Viewport::new(GeoPoint::new(60.17, 24.94), 10.0, 400, 300);
        let (px, py) = vp.project(24.95, 60.18);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 24.95).abs() < 0.01);
        assert!((lat - 60.18).abs() < 0.01);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = viewport().with_zoom_range(1.0, 4.0);
        vp.set_zoom(10.0);
        assert_eq!(vp.zoom, 4.0);
        vp.set_zoom(-3.0);
        assert_eq!(vp.zoom, 1.0);
    }

    #[test]
    fn pan_wraps_longitude() {
        let mut vp = Viewport::new(GeoPoint::new(0.0, 179.9), 1.0, 100, 100);
        vp.pan(200, 0);
        assert!(vp.center.lon <= 180.0 && vp.center.lon >= -180.0);
    }

    #[test]
    fn fit_bounds_centers_the_box() {
        let mut vp = viewport();
        let bounds = GeoBounds {
            south: 60.1,
            west: 24.8,
            north: 60.3,
            east: 25.1,
        };
        vp.fit_bounds(&bounds, &BoundsOptions::default());
        let c = bounds.center();
        let (px, py) = vp.project(c.lon, c.lat);
        assert!((px - 100).abs() <= 1);
        assert!((py - 50).abs() <= 1);
    }

    #[test]
    fn fit_bounds_keeps_box_inside_viewport() {
        let mut vp = Viewport::new(GeoPoint::new(0.0, 0.0), 2.0, 400, 200);
        let bounds = GeoBounds {
            south: 60.1,
            west: 24.8,
            north: 60.3,
            east: 25.1,
        };
        vp.fit_bounds(&bounds, &BoundsOptions::default());
        for (lon, lat) in [
            (bounds.west, bounds.south),
            (bounds.east, bounds.north),
        ] {
            let (px, py) = vp.project(lon, lat);
            assert!(px >= -1 && px <= vp.width as i32 + 1);
            assert!(py >= -1 && py <= vp.height as i32 + 1);
        }
    }

    #[test]
    fn fit_bounds_respects_padding() {
        let mut padded = Viewport::new(GeoPoint::new(0.0, 0.0), 2.0, 400, 200);
        let mut plain = padded.clone();
        let bounds = GeoBounds {
            south: 60.1,
            west: 24.8,
            north: 60.3,
            east: 25.1,
        };
        plain.fit_bounds(&bounds, &BoundsOptions::default());
        padded.fit_bounds(
            &bounds,
            &BoundsOptions {
                padding_top_left: (100, 0),
            },
        );
        // Less horizontal room -> the padded fit cannot be more zoomed in.
        assert!(padded.zoom <= plain.zoom);
    }
}
