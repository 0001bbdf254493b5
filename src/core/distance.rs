use crate::models::GeoPoint;

/// Earth's radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude (and of longitude at the equator)
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Radius of each sub-circle used to tile a search disc
pub const DEFAULT_SUB_RADIUS_M: f64 = 35_000.0;

pub const METERS_PER_MILE: f64 = 1609.344;

/// Slider bounds: roughly half a mile up to the provider's per-request cap
pub const MIN_SEARCH_RADIUS_M: f64 = 800.0;
pub const MAX_SEARCH_RADIUS_M: f64 = 50_000.0;
pub const RADIUS_STEP_M: f64 = 1609.0;

/// Upper bound on the grid half-extent, at most a 65x65 lattice
const MAX_GRID_HALF_EXTENT: i64 = 32;

/// Calculate the Haversine distance between two points in meters
#[inline]
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

/// Build a grid of search points covering a disc
///
/// The grid half-extent is `ceil(radius / sub_radius)` steps in each
/// direction. Longitude steps are widened by `1 / cos(latitude)` so the
/// spacing stays roughly square on the ground. Candidates further than
/// `radius` from the center are dropped.
///
/// # Arguments
/// * `center` - Center of the disc
/// * `radius_m` - Disc radius in meters
/// * `sub_radius_m` - Radius each grid point will be searched with
///
/// # Returns
/// Grid points in row-major order, always including `center` for a positive radius
pub fn build_search_grid_with(center: GeoPoint, radius_m: f64, sub_radius_m: f64) -> Vec<GeoPoint> {
    if !(radius_m > 0.0) || !radius_m.is_finite() || !(sub_radius_m > 0.0) {
        return vec![center];
    }

    let grid_size = ((radius_m / sub_radius_m).ceil().max(1.0) as i64).min(MAX_GRID_HALF_EXTENT);
    let lat_step = (radius_m / METERS_PER_DEGREE) / grid_size as f64;
    // Clamp near the poles so the step stays finite
    let lat_cos = center.latitude.to_radians().cos().abs().max(1e-6);
    let lon_step = (radius_m / (METERS_PER_DEGREE * lat_cos)) / grid_size as f64;

    let mut points = Vec::with_capacity(((2 * grid_size + 1) * (2 * grid_size + 1)) as usize);
    for i in -grid_size..=grid_size {
        for j in -grid_size..=grid_size {
            let candidate = if i == 0 && j == 0 {
                center
            } else {
                GeoPoint::new(
                    center.latitude + i as f64 * lat_step,
                    center.longitude + j as f64 * lon_step,
                )
            };

            if haversine_distance(center, candidate) <= radius_m {
                points.push(candidate);
            }
        }
    }

    tracing::debug!(
        "Generated {} search points (grid size {}, radius {:.0}m)",
        points.len(),
        grid_size,
        radius_m
    );

    points
}

/// Build a search grid using the default 35 km sub-radius
pub fn build_search_grid(center: GeoPoint, radius_m: f64) -> Vec<GeoPoint> {
    build_search_grid_with(center, radius_m, DEFAULT_SUB_RADIUS_M)
}

pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Format a distance for display, e.g. `"0.9 miles"`
pub fn format_distance(meters: f64) -> String {
    format!("{:.1} miles", meters_to_miles(meters))
}
