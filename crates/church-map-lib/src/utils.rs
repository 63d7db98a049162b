//! Coordinate conversions and camera math shared by the clusterer and the
//! tap-handling policy.

use geo::{Coord, Point, Rect};

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_MERCATOR_MIN: f64 = -20037508.34;
pub const EARTH_SIZE_METERS: f64 = EARTH_MERCATOR_MAX - EARTH_MERCATOR_MIN;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Side length of a map tile in pixels, used to relate zoom levels to
/// ground resolution
pub const TILE_SIZE_PX: f64 = 256.0;

/// Mean Earth radius in meters (for great-circle distances)
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;
const X_TO_LON_FACTOR: f64 = 180.0 / EARTH_MERCATOR_MAX;
const Y_TO_LAT_FACTOR: f64 = std::f64::consts::PI / EARTH_MERCATOR_MAX;

/// Build a geographic position from latitude and longitude in degrees.
///
/// Positions follow the `geo` convention of x = longitude, y = latitude.
#[inline(always)]
pub fn lat_lon(lat: f64, lon: f64) -> Point<f64> {
    Point::new(lon, lat)
}

/// Convert a WGS84 position (x = lon, y = lat) to Web Mercator meters
#[inline(always)]
pub fn wgs84_to_mercator(position: Point<f64>) -> Point<f64> {
    let lat = position.y().clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = position.x() * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;
    Point::new(x, y)
}

/// Convert Web Mercator meters back to a WGS84 position (x = lon, y = lat)
#[inline(always)]
pub fn mercator_to_wgs84(point: Point<f64>) -> Point<f64> {
    let lon = point.x() * X_TO_LON_FACTOR;
    let lat = (std::f64::consts::PI / 2.0 - 2.0 * ((-point.y() * Y_TO_LAT_FACTOR).exp()).atan())
        .to_degrees();
    Point::new(lon, lat)
}

/// Ground resolution in meters per screen pixel at the given map zoom level
///
/// Zoom 0 shows the whole Earth on one tile; each level halves the resolution.
#[inline(always)]
pub fn meters_per_pixel(zoom: f64) -> f64 {
    EARTH_SIZE_METERS / (TILE_SIZE_PX * 2f64.powf(zoom))
}

/// Great-circle distance in meters between two WGS84 positions
pub fn haversine_meters(a: Point<f64>, b: Point<f64>) -> f64 {
    let lat_a = a.y().to_radians();
    let lat_b = b.y().to_radians();
    let d_lat = (b.y() - a.y()).to_radians();
    let d_lon = (b.x() - a.x()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Bounding box in Web Mercator meters over a set of WGS84 positions
///
/// Returns `None` for an empty input.
pub fn mercator_bounds(positions: &[Point<f64>]) -> Option<Rect<f64>> {
    let mut iter = positions.iter().map(|p| wgs84_to_mercator(*p));
    let first = iter.next()?;

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x(), first.y(), first.x(), first.y());
    for p in iter {
        min_x = min_x.min(p.x());
        min_y = min_y.min(p.y());
        max_x = max_x.max(p.x());
        max_y = max_y.max(p.y());
    }

    Some(Rect::new(
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: max_y },
    ))
}

/// Camera placement that fits `bounds` into a viewport with fixed padding
///
/// Derives the zoom from the padded viewport rather than taking an explicit
/// value: the largest zoom is chosen such that the bounds plus `padding_px`
/// on every side still fit on screen.
///
/// Returns the WGS84 center and the zoom level, clamped to a sane range.
pub fn fit_bounds(
    bounds: Rect<f64>,
    viewport_px: (f64, f64),
    padding_px: f64,
) -> (Point<f64>, f64) {
    let center_mercator = Point::new(
        (bounds.min().x + bounds.max().x) / 2.0,
        (bounds.min().y + bounds.max().y) / 2.0,
    );
    let center = mercator_to_wgs84(center_mercator);

    let usable_w = (viewport_px.0 - 2.0 * padding_px).max(1.0);
    let usable_h = (viewport_px.1 - 2.0 * padding_px).max(1.0);

    // Resolution needed so both spans fit into the padded viewport
    let needed_mpp = (bounds.width() / usable_w)
        .max(bounds.height() / usable_h)
        .max(f64::EPSILON);

    let zoom = (EARTH_SIZE_METERS / (TILE_SIZE_PX * needed_mpp)).log2();
    (center, zoom.clamp(1.0, 17.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_to_mercator_origin() {
        let point = wgs84_to_mercator(lat_lon(0.0, 0.0));
        assert!(point.x().abs() < 0.01);
        assert!(point.y().abs() < 0.01);
    }

    #[test]
    fn test_wgs84_to_mercator_bounds() {
        let west = wgs84_to_mercator(lat_lon(0.0, -180.0));
        assert!((west.x() - EARTH_MERCATOR_MIN).abs() < 1.0);

        let east = wgs84_to_mercator(lat_lon(0.0, 180.0));
        assert!((east.x() - EARTH_MERCATOR_MAX).abs() < 1.0);
    }

    #[test]
    fn test_mercator_roundtrip() {
        let moscow = lat_lon(55.7558, 37.6173);
        let back = mercator_to_wgs84(wgs84_to_mercator(moscow));
        assert!((back.y() - moscow.y()).abs() < 0.0001);
        assert!((back.x() - moscow.x()).abs() < 0.0001);
    }

    #[test]
    fn test_meters_per_pixel_halves_per_level() {
        let z10 = meters_per_pixel(10.0);
        let z11 = meters_per_pixel(11.0);
        assert!((z10 / z11 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Moscow -> Saint Petersburg is roughly 634 km
        let moscow = lat_lon(55.7558, 37.6173);
        let petersburg = lat_lon(59.9343, 30.3351);
        let d = haversine_meters(moscow, petersburg);
        assert!(
            (600_000.0..670_000.0).contains(&d),
            "unexpected distance: {} m",
            d
        );
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = lat_lon(51.5, -0.1);
        assert!(haversine_meters(p, p) < 1e-6);
    }

    #[test]
    fn test_mercator_bounds_empty() {
        assert!(mercator_bounds(&[]).is_none());
    }

    #[test]
    fn test_mercator_bounds_covers_all_positions() {
        let positions = vec![lat_lon(55.0, 37.0), lat_lon(56.0, 38.0), lat_lon(55.5, 36.5)];
        let bounds = mercator_bounds(&positions).unwrap();

        for p in &positions {
            let m = wgs84_to_mercator(*p);
            assert!(m.x() >= bounds.min().x - 1e-6 && m.x() <= bounds.max().x + 1e-6);
            assert!(m.y() >= bounds.min().y - 1e-6 && m.y() <= bounds.max().y + 1e-6);
        }
    }

    #[test]
    fn test_fit_bounds_centers_on_bounds() {
        let positions = vec![lat_lon(55.0, 37.0), lat_lon(56.0, 38.0)];
        let bounds = mercator_bounds(&positions).unwrap();
        let (center, zoom) = fit_bounds(bounds, (1280.0, 720.0), 80.0);

        assert!(center.y() > 55.0 && center.y() < 56.0);
        assert!(center.x() > 37.0 && center.x() < 38.0);
        assert!((1.0..=17.0).contains(&zoom));
    }

    #[test]
    fn test_fit_bounds_more_padding_zooms_out() {
        let positions = vec![lat_lon(55.0, 37.0), lat_lon(56.0, 38.0)];
        let bounds = mercator_bounds(&positions).unwrap();
        let (_, zoom_tight) = fit_bounds(bounds, (1280.0, 720.0), 0.0);
        let (_, zoom_padded) = fit_bounds(bounds, (1280.0, 720.0), 200.0);
        assert!(
            zoom_padded < zoom_tight,
            "padding should reduce zoom: {} vs {}",
            zoom_padded,
            zoom_tight
        );
    }

    #[test]
    fn test_fit_bounds_degenerate_span_clamps() {
        let p = lat_lon(55.0, 37.0);
        let bounds = mercator_bounds(&[p, p]).unwrap();
        let (_, zoom) = fit_bounds(bounds, (1280.0, 720.0), 80.0);
        assert_eq!(zoom, 17.0);
    }
}
