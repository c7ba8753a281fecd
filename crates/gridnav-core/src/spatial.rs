//! Geodetic helpers and the local tangent-plane projection onto the grid.

use crate::models::{GeoPoint, GridCell};

/// Mean Earth radius used by [`great_circle_m`].
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two fixes in meters (haversine, spherical Earth).
///
/// Independent of the grid projection, so it serves as a sanity check on how far apart
/// the start and goal fixes really are.
pub fn great_circle_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi_a = a.lat.to_radians();
    let phi_b = b.lat.to_radians();
    let half_dphi = (b.lat - a.lat).to_radians() * 0.5;
    let half_dlambda = (b.lon - a.lon).to_radians() * 0.5;
    let h = half_dphi.sin().powi(2) + phi_a.cos() * phi_b.cos() * half_dlambda.sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

// ==== Local tangent-plane scaling ====
// Degree-to-meter factors evaluated at a reference latitude.

/// Meters per degree of latitude at a given latitude.
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude.
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    111_132.954 * lat_deg.to_radians().cos()
}

/// North/east offset of `point` from `origin`, in meters.
///
/// Both scale factors are evaluated at the midpoint latitude of the two fixes.
pub fn local_offset_m(origin: &GeoPoint, point: &GeoPoint) -> (f64, f64) {
    let lat_mid = (origin.lat + point.lat) * 0.5;
    let north_m = (point.lat - origin.lat) * meters_per_deg_lat(lat_mid);
    let east_m = (point.lon - origin.lon) * meters_per_deg_lon(lat_mid);
    (north_m, east_m)
}

/// Project a geodetic point onto the grid anchored at `origin`.
///
/// Returns `None` when the point falls outside a `rows` x `cols` grid, or when
/// `cell_size_m` is not a positive finite length.
pub fn project_to_cell(
    origin: &GeoPoint,
    point: &GeoPoint,
    cell_size_m: f64,
    rows: usize,
    cols: usize,
) -> Option<GridCell> {
    if !(cell_size_m.is_finite() && cell_size_m > 0.0) {
        return None;
    }

    let (north_m, east_m) = local_offset_m(origin, point);
    let row = (north_m / cell_size_m).floor();
    let col = (east_m / cell_size_m).floor();
    if !row.is_finite() || !col.is_finite() {
        return None;
    }
    if row < 0.0 || col < 0.0 || row >= rows as f64 || col >= cols as f64 {
        return None;
    }
    if row > f64::from(i32::MAX) || col > f64::from(i32::MAX) {
        return None;
    }

    Some(GridCell::new(row as i32, col as i32))
}

/// Geodetic position of the centre of `cell` for a grid anchored at `origin`.
///
/// Inverse of [`project_to_cell`] up to the cell quantisation; used when reporting routes.
pub fn cell_center(origin: &GeoPoint, cell: &GridCell, cell_size_m: f64) -> GeoPoint {
    let north_m = (f64::from(cell.row) + 0.5) * cell_size_m;
    let east_m = (f64::from(cell.col) + 0.5) * cell_size_m;

    // First guess at the origin latitude, then re-evaluate at the midpoint latitude so the
    // scale factors match the ones the forward projection uses.
    let mut lat = origin.lat + north_m / meters_per_deg_lat(origin.lat).max(1e-9);
    let lat_mid = (origin.lat + lat) * 0.5;
    lat = origin.lat + north_m / meters_per_deg_lat(lat_mid).max(1e-9);
    let lon = origin.lon + east_m / meters_per_deg_lon(lat_mid).max(1e-9);

    GeoPoint {
        lat,
        lon,
        altitude_m: origin.altitude_m,
    }
}
