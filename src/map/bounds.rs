use serde::{Deserialize, Serialize};

/// Smallest span (degrees) a fitted bounding box may have on either axis.
/// Keeps a single-point or zero-area fit from collapsing to a degenerate view.
pub const MIN_BOUND_SPAN: f64 = 0.002;

/// A geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// A coordinate usable as a map position.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// An axis-aligned geographic bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn area(&self) -> f64 {
        self.lat_span() * self.lon_span()
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lon >= self.west && p.lon <= self.east
    }
}

/// Bounding box of the given points, padded so neither axis spans less than
/// [`MIN_BOUND_SPAN`]. Invalid points are skipped; returns None when nothing
/// valid remains (callers treat that as "nothing to fit").
pub fn bound_with_minimum_area(points: &[GeoPoint]) -> Option<GeoBounds> {
    let mut bounds: Option<GeoBounds> = None;

    for p in points.iter().filter(|p| p.is_valid()) {
        bounds = Some(match bounds {
            None => GeoBounds {
                south: p.lat,
                west: p.lon,
                north: p.lat,
                east: p.lon,
            },
            Some(b) => GeoBounds {
                south: b.south.min(p.lat),
                west: b.west.min(p.lon),
                north: b.north.max(p.lat),
                east: b.east.max(p.lon),
            },
        });
    }

    bounds.map(ensure_minimum_span)
}

fn ensure_minimum_span(mut b: GeoBounds) -> GeoBounds {
    if b.lat_span() < MIN_BOUND_SPAN {
        let mid = (b.south + b.north) / 2.0;
        b.south = mid - MIN_BOUND_SPAN / 2.0;
        b.north = mid + MIN_BOUND_SPAN / 2.0;
    }
    if b.lon_span() < MIN_BOUND_SPAN {
        let mid = (b.west + b.east) / 2.0;
        b.west = mid - MIN_BOUND_SPAN / 2.0;
        b.east = mid + MIN_BOUND_SPAN / 2.0;
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_area_input_is_padded() {
        let p = GeoPoint::new(60.17, 24.94);
        let b = bound_with_minimum_area(&[p, p]).unwrap();
        assert!(b.area() >= MIN_BOUND_SPAN * MIN_BOUND_SPAN);
        assert!(b.contains(&p));
    }

    #[test]
    fn thin_box_is_padded_on_one_axis_only() {
        let b = bound_with_minimum_area(&[
            GeoPoint::new(60.0, 24.0),
            GeoPoint::new(60.0, 25.0),
        ])
        .unwrap();
        assert!((b.lon_span() - 1.0).abs() < 1e-9);
        assert!(b.lat_span() >= MIN_BOUND_SPAN);
    }

    #[test]
    fn large_box_is_untouched() {
        let b = bound_with_minimum_area(&[
            GeoPoint::new(59.0, 24.0),
            GeoPoint::new(61.0, 26.0),
        ])
        .unwrap();
        assert_eq!(
            b,
            GeoBounds {
                south: 59.0,
                west: 24.0,
                north: 61.0,
                east: 26.0
            }
        );
    }

    #[test]
    fn invalid_points_are_skipped() {
        let b = bound_with_minimum_area(&[
            GeoPoint::new(f64::NAN, 24.0),
            GeoPoint::new(60.0, 25.0),
        ])
        .unwrap();
        assert!(b.contains(&GeoPoint::new(60.0, 25.0)));
    }

    #[test]
    fn no_valid_points_yields_none() {
        assert!(bound_with_minimum_area(&[]).is_none());
        assert!(bound_with_minimum_area(&[GeoPoint::new(f64::NAN, f64::NAN)]).is_none());
    }
}
