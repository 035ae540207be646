//! Polygon geometry for region boundaries
//!
//! Rings are lists of vertices in map units; closing the ring (repeating
//! the first vertex) is optional. Containment uses the even-odd rule, so
//! hole winding order does not matter.

use super::bbox::BoundingBox;
use super::point::Point;

/// A polygon with an outer ring and optional holes
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Point>,
    pub holes: Vec<Vec<Point>>,
}

/// One or more polygons treated as a single area
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon {
    pub polygons: Vec<Polygon>,
}

fn ring_contains(ring: &[Point], point: &Point) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (&ring[i], &ring[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Signed area and area-weighted centroid sums of a ring (shoelace)
fn ring_moments(ring: &[Point]) -> (f64, f64, f64) {
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    let n = ring.len();

    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        area2 += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }

    (area2 / 2.0, cx / 6.0, cy / 6.0)
}

impl Polygon {
    pub fn new(exterior: Vec<Point>, holes: Vec<Vec<Point>>) -> Self {
        Polygon { exterior, holes }
    }

    /// Whether the point lies inside the outer ring and outside every hole
    pub fn contains(&self, point: &Point) -> bool {
        ring_contains(&self.exterior, point) && !self.holes.iter().any(|h| ring_contains(h, point))
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.exterior)
    }

    /// (area, x moment, y moment) with holes subtracted
    fn moments(&self) -> (f64, f64, f64) {
        let (a, x, y) = ring_moments(&self.exterior);
        // Normalise orientation so the exterior counts positive
        let sign = if a < 0.0 { -1.0 } else { 1.0 };
        let (mut area, mut mx, mut my) = (a * sign, x * sign, y * sign);

        for hole in &self.holes {
            let (ha, hx, hy) = ring_moments(hole);
            let hs = if ha < 0.0 { -1.0 } else { 1.0 };
            area -= ha * hs;
            mx -= hx * hs;
            my -= hy * hs;
        }
        (area, mx, my)
    }

    /// Planar area in squared map units
    pub fn area(&self) -> f64 {
        self.moments().0
    }
}

impl MultiPolygon {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        MultiPolygon { polygons }
    }

    pub fn contains(&self, point: &Point) -> bool {
        self.polygons.iter().any(|p| p.contains(point))
    }

    /// Bounding box of all parts, None when there are no vertices
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.polygons
            .iter()
            .filter_map(Polygon::bbox)
            .reduce(|a, b| a.union(&b))
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon::area).sum()
    }

    /// Area-weighted centroid; falls back to the bbox centre for degenerate shapes
    pub fn centroid(&self) -> Option<Point> {
        let (area, mx, my) = self.polygons.iter().map(Polygon::moments).fold(
            (0.0, 0.0, 0.0),
            |acc, m| (acc.0 + m.0, acc.1 + m.1, acc.2 + m.2),
        );

        if area.abs() > f64::EPSILON {
            Some(Point::new(mx / area, my / area))
        } else {
            self.bbox().map(|b| b.center())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + size, y0),
            Point::new(x0 + size, y0 + size),
            Point::new(x0, y0 + size),
            Point::new(x0, y0),
        ]
    }

    #[test]
    fn holes_are_excluded() {
        let donut = Polygon::new(square(0.0, 0.0, 10.0), vec![square(4.0, 4.0, 2.0)]);
        assert!(donut.contains(&Point::new(1.0, 1.0)));
        assert!(!donut.contains(&Point::new(5.0, 5.0)));
        assert!(!donut.contains(&Point::new(11.0, 5.0)));
        assert!((donut.area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn centroid_is_area_weighted() {
        let shape = MultiPolygon::new(vec![
            Polygon::new(square(0.0, 0.0, 2.0), vec![]),
            Polygon::new(square(10.0, 0.0, 2.0), vec![]),
        ]);
        let c = shape.centroid().unwrap();
        assert!((c.x - 6.0).abs() < 1e-9);
        assert!((c.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clockwise_rings_work_too() {
        let mut ring = square(0.0, 0.0, 4.0);
        ring.reverse();
        let poly = Polygon::new(ring, vec![]);
        assert!(poly.contains(&Point::new(2.0, 2.0)));
        assert!((poly.area() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn bbox_spans_all_parts() {
        let shape = MultiPolygon::new(vec![
            Polygon::new(square(0.0, 0.0, 1.0), vec![]),
            Polygon::new(square(5.0, -3.0, 1.0), vec![]),
        ]);
        assert_eq!(shape.bbox().unwrap(), BoundingBox::new(0.0, -3.0, 6.0, 1.0));
    }
}
