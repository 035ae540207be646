//! Coordinate transformation functionality
//!
//! Every supported system is on the WGS 84 datum, so transformations go
//! through longitude/latitude: source → WGS 84 → target.

use super::bbox::BoundingBox;
use super::crs::CoordinateSystem;
use super::point::Point;
use crate::errors::{PipelineError, PipelineResult};
use std::f64::consts::PI;

/// Transformer for converting between coordinate systems
pub struct CoordinateTransformer;

impl CoordinateTransformer {
    /// WGS 84 semi-major axis in metres
    const EARTH_RADIUS: f64 = 6378137.0;
    /// WGS 84 flattening
    const FLATTENING: f64 = 1.0 / 298.257223563;
    /// UTM scale factor on the central meridian
    const UTM_K0: f64 = 0.9996;
    const UTM_FALSE_EASTING: f64 = 500_000.0;
    const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

    /// Convert from WGS84 (EPSG:4326) to Web Mercator (EPSG:3857)
    pub fn wgs84_to_web_mercator(&self, lon: f64, lat: f64) -> Point {
        // Web Mercator is undefined at the poles
        let lat = lat.clamp(-85.05, 85.05);

        let x = lon * Self::EARTH_RADIUS * PI / 180.0;
        let y = f64::ln(f64::tan((90.0 + lat) * PI / 360.0)) * Self::EARTH_RADIUS;

        Point::new(x, y)
    }

    /// Convert from Web Mercator (EPSG:3857) to WGS84 (EPSG:4326)
    pub fn web_mercator_to_wgs84(&self, x: f64, y: f64) -> Point {
        let lon = x * 180.0 / (Self::EARTH_RADIUS * PI);
        let lat = 180.0 / PI * (2.0 * f64::atan(f64::exp(y / Self::EARTH_RADIUS)) - PI / 2.0);

        Point::new(lon, lat)
    }

    fn e2() -> f64 {
        Self::FLATTENING * (2.0 - Self::FLATTENING)
    }

    fn central_meridian(zone: u8) -> f64 {
        (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }

    /// Meridian arc length from the equator to latitude `phi` (radians)
    fn meridian_arc(phi: f64) -> f64 {
        let e2 = Self::e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        Self::EARTH_RADIUS
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    /// Convert from WGS84 to UTM easting/northing (transverse Mercator series)
    pub fn wgs84_to_utm(&self, lon: f64, lat: f64, zone: u8, is_northern: bool) -> Point {
        let e2 = Self::e2();
        let ep2 = e2 / (1.0 - e2);
        let phi = lat.to_radians();
        let lambda = (lon - Self::central_meridian(zone)).to_radians();

        let (sin_phi, cos_phi) = phi.sin_cos();
        let n = Self::EARTH_RADIUS / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = phi.tan().powi(2);
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * lambda;
        let m = Self::meridian_arc(phi);

        let x = Self::UTM_K0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
            + Self::UTM_FALSE_EASTING;

        let mut y = Self::UTM_K0
            * (m + n
                * phi.tan()
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
        if !is_northern {
            y += Self::UTM_FALSE_NORTHING_SOUTH;
        }

        Point::new(x, y)
    }

    /// Convert UTM easting/northing back to WGS84
    pub fn utm_to_wgs84(&self, x: f64, y: f64, zone: u8, is_northern: bool) -> Point {
        let e2 = Self::e2();
        let ep2 = e2 / (1.0 - e2);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let northing = if is_northern { y } else { y - Self::UTM_FALSE_NORTHING_SOUTH };
        let m = northing / Self::UTM_K0;
        let mu = m / (Self::EARTH_RADIUS * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin_phi1, cos_phi1) = phi1.sin_cos();
        let c1 = ep2 * cos_phi1 * cos_phi1;
        let t1 = phi1.tan().powi(2);
        let n1 = Self::EARTH_RADIUS / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
        let r1 = Self::EARTH_RADIUS * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
        let d = (x - Self::UTM_FALSE_EASTING) / (n1 * Self::UTM_K0);

        let phi = phi1
            - (n1 * phi1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lambda = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5) / 120.0)
            / cos_phi1;

        Point::new(Self::central_meridian(zone) + lambda.to_degrees(), phi.to_degrees())
    }

    fn to_wgs84(&self, point: &Point, from_crs: &CoordinateSystem) -> Point {
        match from_crs {
            CoordinateSystem::WGS84 => *point,
            CoordinateSystem::WebMercator => self.web_mercator_to_wgs84(point.x, point.y),
            CoordinateSystem::UTM(zone, north) => self.utm_to_wgs84(point.x, point.y, *zone, *north),
        }
    }

    fn from_wgs84(&self, point: &Point, to_crs: &CoordinateSystem) -> Point {
        match to_crs {
            CoordinateSystem::WGS84 => *point,
            CoordinateSystem::WebMercator => self.wgs84_to_web_mercator(point.x, point.y),
            CoordinateSystem::UTM(zone, north) => self.wgs84_to_utm(point.x, point.y, *zone, *north),
        }
    }

    /// Transform a point between coordinate systems
    pub fn transform_point(&self, point: &Point, from_crs: &CoordinateSystem, to_crs: &CoordinateSystem) -> Point {
        if from_crs == to_crs {
            return *point;
        }
        self.from_wgs84(&self.to_wgs84(point, from_crs), to_crs)
    }

    /// Transform a bounding box between coordinate systems
    ///
    /// Edges curve under reprojection, so the result bounds the transformed
    /// corners and edge midpoints rather than just two corners.
    pub fn transform_bbox(&self, bbox: &BoundingBox, from_crs: &CoordinateSystem, to_crs: &CoordinateSystem) -> PipelineResult<BoundingBox> {
        if from_crs == to_crs {
            return Ok(*bbox);
        }

        let points: Vec<Point> = bbox
            .outline_points()
            .iter()
            .map(|p| self.transform_point(p, from_crs, to_crs))
            .collect();

        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(PipelineError::UnsupportedCrs(format!(
                "Bounding box cannot be transformed from {} to {}",
                from_crs.description(),
                to_crs.description()
            )));
        }

        BoundingBox::from_points(&points).ok_or_else(|| {
            PipelineError::InvalidGeometry("Empty bounding box outline".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: CoordinateTransformer = CoordinateTransformer;

    #[test]
    fn central_meridian_maps_to_false_easting() {
        // Zone 46 is centred on 93°E
        let p = T.wgs84_to_utm(93.0, 28.0, 46, true);
        assert!((p.x - 500_000.0).abs() < 1e-6);
        assert!((p.y - 3_097_202.0).abs() < 5.0, "northing {}", p.y);
    }

    #[test]
    fn utm_round_trip_is_centimetre_accurate() {
        for &(lon, lat, zone, north) in &[(94.2, 27.6, 46u8, true), (15.3, -12.8, 33, false)] {
            let utm = T.wgs84_to_utm(lon, lat, zone, north);
            let back = T.utm_to_wgs84(utm.x, utm.y, zone, north);
            assert!((back.x - lon).abs() < 1e-7, "lon {} vs {}", back.x, lon);
            assert!((back.y - lat).abs() < 1e-7, "lat {} vs {}", back.y, lat);
        }
    }

    #[test]
    fn web_mercator_round_trip() {
        let merc = T.wgs84_to_web_mercator(93.6, 27.1);
        let back = T.web_mercator_to_wgs84(merc.x, merc.y);
        assert!((back.x - 93.6).abs() < 1e-9);
        assert!((back.y - 27.1).abs() < 1e-9);
    }

    #[test]
    fn transformed_bbox_contains_transformed_corners() {
        let bbox = BoundingBox::new(91.5, 26.6, 97.4, 29.5);
        let utm = CoordinateSystem::UTM(46, true);
        let out = T.transform_bbox(&bbox, &CoordinateSystem::WGS84, &utm).unwrap();

        for p in bbox.outline_points() {
            assert!(out.contains(&T.transform_point(&p, &CoordinateSystem::WGS84, &utm)));
        }
    }
}
