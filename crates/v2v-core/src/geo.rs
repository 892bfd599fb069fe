//! Geographic coordinate type and spatial utilities.
//!
//! `GeoPoint` uses `f64` latitude/longitude.  Path-cache files store IEEE
//! doubles and a 30 Hz tick moves a vehicle by ~1e-6 degrees, both of which
//! single precision would quantize away.
//!
//! The simulator mixes two conventions: `(lat, lon)` for routing and
//! haversine work, `(x = lon, y = lat)` for spatial indexes and renderers.
//! Conversion happens at the boundary of each component; `GeoPoint` itself
//! is always `(lat, lon)`.

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres per degree of latitude (and of longitude at the equator).  The
/// engine's equirectangular step and the interference envelope both use this
/// constant; its ≤ 1 % error at mid-latitudes is below the resolution of the
/// communication model.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Initial great-circle bearing towards `other`, radians from north,
    /// clockwise, in `(-π, π]`.
    pub fn bearing_rad(self, other: GeoPoint) -> f64 {
        let d_lon = (other.lon - self.lon).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let y = d_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
        y.atan2(x)
    }

    /// Great-circle destination point after travelling `distance_m` metres on
    /// the given initial bearing (radians from north, clockwise).
    pub fn destination(self, distance_m: f64, bearing_rad: f64) -> GeoPoint {
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();
        let ang = distance_m / EARTH_RADIUS_M;

        let lat2 = (lat1.sin() * ang.cos() + lat1.cos() * ang.sin() * bearing_rad.cos()).asin();
        let lon2 = lon1
            + (bearing_rad.sin() * ang.sin() * lat1.cos())
                .atan2(ang.cos() - lat1.sin() * lat2.sin());

        GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
    }

    /// Linear interpolation between `self` (t = 0) and `other` (t = 1).
    #[inline]
    pub fn lerp(self, other: GeoPoint, t: f64) -> GeoPoint {
        GeoPoint::new(
            self.lat + t * (other.lat - self.lat),
            self.lon + t * (other.lon - self.lon),
        )
    }

    /// Approximate bounding-box check — much cheaper than `distance_m` for
    /// quick rejection before an exact distance test.
    #[inline]
    pub fn within_bbox(self, center: GeoPoint, half_deg: f64) -> bool {
        (self.lat - center.lat).abs() <= half_deg
            && (self.lon - center.lon).abs() <= half_deg
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── Projections ───────────────────────────────────────────────────────────────
//
// Used by external renderers only; nothing in the tick loop projects.

/// Half the Web-Mercator world extent in metres (EPSG:3857).
const MERCATOR_HALF_WORLD_M: f64 = 20_037_508.34;

/// Forward Web-Mercator projection: `(x, y)` metres.
pub fn to_mercator(p: GeoPoint) -> (f64, f64) {
    let x = p.lon * MERCATOR_HALF_WORLD_M / 180.0;
    let y = ((90.0 + p.lat) * std::f64::consts::PI / 360.0).tan().ln()
        / (std::f64::consts::PI / 180.0)
        * MERCATOR_HALF_WORLD_M
        / 180.0;
    (x, y)
}

/// Inverse Web-Mercator projection.
pub fn from_mercator(x: f64, y: f64) -> GeoPoint {
    let lon = x / MERCATOR_HALF_WORLD_M * 180.0;
    let lat = y / MERCATOR_HALF_WORLD_M * 180.0;
    let lat = 180.0 / std::f64::consts::PI
        * (2.0 * (lat * std::f64::consts::PI / 180.0).exp().atan() - std::f64::consts::PI / 2.0);
    GeoPoint::new(lat, lon)
}

/// Slippy-map tile containing `p` at `zoom`.
pub fn tile_at(p: GeoPoint, zoom: u8) -> (u32, u32) {
    let n = (1u32 << zoom) as f64;
    let x = ((p.lon + 180.0) / 360.0 * n) as u32;
    let lat_rad = p.lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n) as u32;
    (x.min(n as u32 - 1), y.min(n as u32 - 1))
}

/// North-west corner of tile `(x, y)` at `zoom`.
pub fn tile_origin(x: u32, y: u32, zoom: u8) -> GeoPoint {
    let n = (1u32 << zoom) as f64;
    let lon = x as f64 / n * 360.0 - 180.0;
    let lat = (std::f64::consts::PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan();
    GeoPoint::new(lat.to_degrees(), lon)
}
