use crate::map::viewport::Viewport;

/// Suffix appended to tile names on high-density displays.
const RETINA_SUFFIX: &str = "@2x";

/// A tile address in the standard z/x/y scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileCoord {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Geographic north-west corner of the tile as (lon, lat).
    pub fn nw_corner(&self) -> (f64, f64) {
        let n = (1u32 << self.z.min(31)) as f64;
        let lon = self.x as f64 / n * 360.0 - 180.0;
        let lat = (std::f64::consts::PI * (1.0 - 2.0 * self.y as f64 / n))
            .sinh()
            .atan()
            .to_degrees();
        (lon, lat)
    }
}

/// Builds tile URLs from the configured base map URL and enumerates the
/// tiles covering a viewport. Fetching the tiles is someone else's job.
#[derive(Clone, Debug)]
pub struct TileSource {
    base_url: String,
    tile_size: u32,
    zoom_offset: i32,
    retina: bool,
}

impl TileSource {
    /// `retina` is the already-resolved decision: retina tiles enabled in
    /// configuration AND the display reported as high-density.
    pub fn new(base_url: impl Into<String>, tile_size: u32, zoom_offset: i32, retina: bool) -> Self {
        Self {
            base_url: base_url.into(),
            tile_size: tile_size.max(1),
            zoom_offset,
            retina,
        }
    }

    fn suffix(&self) -> &'static str {
        if self.retina {
            RETINA_SUFFIX
        } else {
            ""
        }
    }

    /// URL template with `{z}/{x}/{y}` placeholders left in place.
    pub fn url_template(&self) -> String {
        format!("{}{{z}}/{{x}}/{{y}}{}.png", self.base_url, self.suffix())
    }

    /// Concrete URL for one tile.
    pub fn tile_url(&self, tile: TileCoord) -> String {
        format!(
            "{}{}/{}/{}{}.png",
            self.base_url,
            tile.z,
            tile.x,
            tile.y,
            self.suffix()
        )
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Integer tile zoom for a viewport zoom, with the configured offset.
    pub fn tile_zoom(&self, viewport_zoom: f64) -> u32 {
        (viewport_zoom.round() as i32 + self.zoom_offset).clamp(0, 22) as u32
    }

    /// Tiles covering the viewport at its current zoom.
    pub fn visible_tiles(&self, vp: &Viewport) -> Vec<TileCoord> {
        let z = self.tile_zoom(vp.zoom);
        let n = 1u32 << z.min(31);

        let (west, north) = vp.unproject(0, 0);
        let (east, south) = vp.unproject(vp.width as i32, vp.height as i32);

        let to_index = |m: f64| -> u32 {
            let idx = (m * n as f64).floor();
            idx.clamp(0.0, (n - 1) as f64) as u32
        };

        let mut x0 = to_index((west + 180.0) / 360.0);
        let mut x1 = to_index((east + 180.0) / 360.0);
        let mut y0 = to_index(merc_y(north));
        let mut y1 = to_index(merc_y(south));
        // A viewport spanning the antimeridian unprojects west > east.
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
        }
        if y0 > y1 {
            std::mem::swap(&mut y0, &mut y1);
        }

        let mut tiles = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for y in y0..=y1 {
            for x in x0..=x1 {
                tiles.push(TileCoord { z, x, y });
            }
        }
        tiles
    }
}

#[inline(always)]
fn merc_y(lat: f64) -> f64 {
    let rad = lat.clamp(-85.0511, 85.0511).to_radians();
    (1.0 - (rad.tan() + 1.0 / rad.cos()).ln() / std::f64::consts::PI) / 2.0
}
