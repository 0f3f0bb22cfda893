//! Geographic helpers: Web Mercator world coordinates for the map canvas,
//! great-circle routes and distances from the North Pole.

use std::f64::consts::PI;

pub const TILE_SIZE: f64 = 256.0;
pub const EARTH_RADIUS_KM: f64 = 6371.0088;
/// Mercator is undefined at the poles; latitudes are clamped to this.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;
/// `1 + cos` of the angle between two points below which they count as
/// antipodal (roughly 300 m from exact opposition).
const ANTIPODAL_TOLERANCE: f64 = 1e-9;

/// `[lon, lat]` to zoom-0 world pixels (0..256 on both axes, y down).
pub fn lon_lat_to_world(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = (lon + 180.0) / 360.0 * TILE_SIZE;
    let sin = lat.to_radians().sin();
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * TILE_SIZE;
    (x, y)
}

/// Zoom-0 world pixels back to `[lon, lat]`.
pub fn world_to_lon_lat(x: f64, y: f64) -> [f64; 2] {
    let lon = x / TILE_SIZE * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / TILE_SIZE;
    let lat = n.sinh().atan().to_degrees();
    [lon, lat]
}

/// Wrap longitude into `[-180, 180)`.
pub fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Great-circle distance from the North Pole in kilometres.
pub fn polar_distance_km(lat: f64) -> f64 {
    (90.0 - lat.clamp(-90.0, 90.0)).to_radians() * EARTH_RADIUS_KM
}

pub fn haversine_km(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (lat1, lat2) = (a[1].to_radians(), b[1].to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b[0] - a[0]).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

fn to_unit_vector([lon, lat]: [f64; 2]) -> [f64; 3] {
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn from_unit_vector([x, y, z]: [f64; 3]) -> [f64; 2] {
    let lat = z.clamp(-1.0, 1.0).asin().to_degrees();
    let lon = y.atan2(x).to_degrees();
    [lon, lat]
}

/// Whether `a` and `b` are so close to opposite ends of the globe that no
/// single great circle joins them.
pub fn near_antipodal(a: [f64; 2], b: [f64; 2]) -> bool {
    let a = to_unit_vector(a);
    let b = to_unit_vector(b);
    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    1.0 + dot < ANTIPODAL_TOLERANCE
}

/// Sample the great circle from `start` to `end` with `segments` steps
/// (`segments + 1` points, endpoints included).
pub fn great_circle_path(start: [f64; 2], end: [f64; 2], segments: usize) -> Vec<[f64; 2]> {
    let segments = segments.max(1);
    let a = to_unit_vector(start);
    let b = to_unit_vector(end);
    let dot = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]).clamp(-1.0, 1.0);
    let omega = dot.acos();
    // Both degenerate cases leave slerp with a zero divisor.
    if omega.abs() < 1e-12 || 1.0 + dot < ANTIPODAL_TOLERANCE {
        return vec![start, end];
    }
    let sin_omega = omega.sin();
    (0..=segments)
        .map(|i| {
            let t = i as f64 / segments as f64;
            if i == 0 {
                return start;
            }
            if i == segments {
                return end;
            }
            let wa = ((1.0 - t) * omega).sin() / sin_omega;
            let wb = (t * omega).sin() / sin_omega;
            from_unit_vector([
                wa * a[0] + wb * b[0],
                wa * a[1] + wb * b[1],
                wa * a[2] + wb * b[2],
            ])
        })
        .collect()
}

/// Inclusive tile index range `(min_x, min_y, max_x, max_y)` covering a
/// zoom-0 world rectangle at integer zoom `z`.
pub fn tile_range(z: u32, min: (f64, f64), max: (f64, f64)) -> (u32, u32, u32, u32) {
    let n = 1u32 << z.min(22);
    let to_tile = |v: f64| {
        let t = (v / TILE_SIZE * n as f64).floor();
        t.clamp(0.0, (n - 1) as f64) as u32
    };
    (to_tile(min.0), to_tile(min.1), to_tile(max.0), to_tile(max.1))
}
