//! WGS84 polygon/multipolygon geometry and its canonical encoding.
//!
//! `spec.md` §4.G.5 requires the geometry digest to be computed over "the
//! geometry's canonical WKB with coordinates rounded to 7 decimal places
//! (~1 cm), ring orientation normalized (outer CCW, inner CW), rings sorted
//! lexicographically by first coordinate." This module owns that canonical
//! form plus the handful of geometric predicates the Validation Pipeline
//! needs (centroid, planar area, self-intersection count, point-in-polygon,
//! approximate pairwise overlap).
//!
//! Area/overlap here use an equirectangular projection scaled by the mean
//! latitude's cosine — accurate enough for the centroid-distance and
//! coverage-ratio checks this crate performs, not a geodesic/ellipsoidal
//! computation. A real deployment would swap this for a proper geodesy
//! crate without touching the canonical-encoding contract above it.

use serde::{Deserialize, Serialize};

/// Earth's mean radius in meters, used for the planar-approximation projection.
const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Rounding precision for canonical encoding: 1e-7 degrees (~1 cm).
const COORD_PRECISION: f64 = 1e7;

/// A WGS84 coordinate (longitude, latitude) in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Point {
    /// Construct a point.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    fn rounded(self) -> (i64, i64) {
        (
            (self.lon * COORD_PRECISION).round() as i64,
            (self.lat * COORD_PRECISION).round() as i64,
        )
    }
}

/// A closed linear ring: `points[0] == points[last]`, at least 4 points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    /// Ring vertices, first and last identical.
    pub points: Vec<Point>,
}

impl Ring {
    /// Construct a ring, closing it if the caller omitted the repeated
    /// final point.
    pub fn new(mut points: Vec<Point>) -> Self {
        if points.len() >= 2 && points.first() != points.last() {
            let first = points[0];
            points.push(first);
        }
        Self { points }
    }

    /// Whether this ring is closed and has enough vertices to bound an area.
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 4 && self.points.first() == self.points.last()
    }

    /// Signed planar area in degrees^2 (shoelace formula). Positive = CCW.
    fn signed_area_deg2(&self) -> f64 {
        let pts = &self.points;
        if pts.len() < 4 {
            return 0.0;
        }
        let mut sum = 0.0;
        for window in pts.windows(2) {
            let (a, b) = (window[0], window[1]);
            sum += a.lon * b.lat - b.lon * a.lat;
        }
        sum / 2.0
    }

    /// Whether the ring winds counter-clockwise.
    pub fn is_ccw(&self) -> bool {
        self.signed_area_deg2() > 0.0
    }

    /// Return a copy of this ring with the requested winding order.
    pub fn with_orientation(&self, ccw: bool) -> Ring {
        if self.is_ccw() == ccw {
            self.clone()
        } else {
            let mut points = self.points.clone();
            points.reverse();
            Ring { points }
        }
    }

    /// Approximate planar area in square meters at the given reference latitude.
    fn area_m2_at(&self, ref_lat_rad: f64) -> f64 {
        let deg2_m2 = (std::f64::consts::PI / 180.0 * EARTH_RADIUS_M).powi(2) * ref_lat_rad.cos();
        self.signed_area_deg2().abs() * deg2_m2
    }

    /// Count of pairwise segment self-intersections beyond a tolerance
    /// (non-adjacent segments only; shared endpoints between adjacent
    /// segments are expected and not counted).
    pub fn self_intersections(&self) -> usize {
        let pts = &self.points;
        let n = pts.len();
        if n < 5 {
            return 0;
        }
        let mut count = 0;
        for i in 0..n - 1 {
            for j in i + 2..n - 1 {
                // Skip the pair that shares the closing point (first, last-1).
                if i == 0 && j == n - 2 {
                    continue;
                }
                if segments_intersect(pts[i], pts[i + 1], pts[j], pts[j + 1]) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Ray-casting point-in-ring test.
    pub fn contains_point(&self, p: Point) -> bool {
        let pts = &self.points;
        let mut inside = false;
        let mut j = pts.len() - 1;
        for i in 0..pts.len() {
            let (pi, pj) = (pts[i], pts[j]);
            let intersects = ((pi.lat > p.lat) != (pj.lat > p.lat))
                && (p.lon
                    < (pj.lon - pi.lon) * (p.lat - pi.lat) / (pj.lat - pi.lat + f64::EPSILON)
                        + pi.lon);
            if intersects {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    fn canonical_bytes(&self, ccw: bool) -> Vec<u8> {
        let oriented = self.with_orientation(ccw);
        let mut bytes = Vec::with_capacity(oriented.points.len() * 16 + 4);
        bytes.extend_from_slice(&(oriented.points.len() as u32).to_be_bytes());
        for p in &oriented.points {
            let (lon, lat) = p.rounded();
            bytes.extend_from_slice(&lon.to_be_bytes());
            bytes.extend_from_slice(&lat.to_be_bytes());
        }
        bytes
    }

    fn first_rounded(&self) -> (i64, i64) {
        self.points.first().map(|p| p.rounded()).unwrap_or((0, 0))
    }
}

fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    fn cross(o: Point, a: Point, b: Point) -> f64 {
        (a.lon - o.lon) * (b.lat - o.lat) - (a.lat - o.lat) * (b.lon - o.lon)
    }
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);
    ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0))
}

/// A single polygon: one outer ring plus zero or more interior hole rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Outer boundary ring.
    pub outer: Ring,
    /// Interior hole rings.
    pub holes: Vec<Ring>,
}

impl Polygon {
    /// Construct a polygon from an outer ring and holes.
    pub fn new(outer: Ring, holes: Vec<Ring>) -> Self {
        Self { outer, holes }
    }

    /// Whether the polygon's rings are individually valid (closed, ≥4 points).
    pub fn is_valid(&self) -> bool {
        self.outer.is_valid() && self.holes.iter().all(Ring::is_valid)
    }

    /// Centroid of the outer ring (holes are not subtracted — adequate for
    /// the geographic-bounds centroid-distance check, §4.F.4).
    pub fn centroid(&self) -> Point {
        ring_centroid(&self.outer)
    }

    /// Approximate land area (outer minus holes) in square meters.
    pub fn area_m2(&self) -> f64 {
        let ref_lat = self.centroid().lat.to_radians();
        let outer = self.outer.area_m2_at(ref_lat);
        let holes: f64 = self.holes.iter().map(|h| h.area_m2_at(ref_lat)).sum();
        (outer - holes).max(0.0)
    }

    /// Ray-casting point-in-polygon test, holes excluded.
    pub fn contains_point(&self, point: Point) -> bool {
        self.outer.contains_point(point) && !self.holes.iter().any(|h| h.contains_point(point))
    }

    /// Canonical WKB-like byte encoding: outer forced CCW, holes forced CW,
    /// all rings (outer + holes) sorted by their rounded first coordinate.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut rings: Vec<(&Ring, bool)> = Vec::with_capacity(1 + self.holes.len());
        rings.push((&self.outer, true));
        for h in &self.holes {
            rings.push((h, false));
        }
        let mut encoded: Vec<((i64, i64), Vec<u8>)> = rings
            .into_iter()
            .map(|(ring, ccw)| {
                let oriented = ring.with_orientation(ccw);
                (oriented.first_rounded(), ring.canonical_bytes(ccw))
            })
            .collect();
        encoded.sort_by_key(|(key, _)| *key);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
        for (_, ring_bytes) in encoded {
            bytes.extend_from_slice(&ring_bytes);
        }
        bytes
    }

    fn first_sort_key(&self) -> (i64, i64) {
        self.outer.with_orientation(true).first_rounded()
    }
}

fn ring_centroid(ring: &Ring) -> Point {
    let pts = &ring.points;
    if pts.len() < 2 {
        return pts.first().copied().unwrap_or(Point::new(0.0, 0.0));
    }
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for window in pts.windows(2) {
        let (a, b) = (window[0], window[1]);
        let cross = a.lon * b.lat - b.lon * a.lat;
        area += cross;
        cx += (a.lon + b.lon) * cross;
        cy += (a.lat + b.lat) * cross;
    }
    area /= 2.0;
    if area.abs() < f64::EPSILON {
        // Degenerate ring: fall back to the vertex average.
        let n = (pts.len() - 1).max(1) as f64;
        let sx: f64 = pts[..pts.len() - 1].iter().map(|p| p.lon).sum();
        let sy: f64 = pts[..pts.len() - 1].iter().map(|p| p.lat).sum();
        return Point::new(sx / n, sy / n);
    }
    Point::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// A boundary geometry: a single polygon or a multipolygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    /// A single, possibly holed, polygon.
    Polygon(Polygon),
    /// Multiple disjoint (or nearly disjoint) polygons under one record.
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// All constituent polygons.
    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Geometry::Polygon(p) => std::slice::from_ref(p),
            Geometry::MultiPolygon(ps) => ps,
        }
    }

    /// Whether every polygon and ring is structurally valid.
    pub fn is_valid(&self) -> bool {
        !self.polygons().is_empty() && self.polygons().iter().all(Polygon::is_valid)
    }

    /// Area-weighted centroid across all constituent polygons.
    pub fn centroid(&self) -> Point {
        let polys = self.polygons();
        if polys.is_empty() {
            return Point::new(0.0, 0.0);
        }
        let total_area: f64 = polys.iter().map(Polygon::area_m2).sum();
        if total_area <= f64::EPSILON {
            let n = polys.len() as f64;
            let (sx, sy) = polys
                .iter()
                .map(Polygon::centroid)
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.lon, sy + p.lat));
            return Point::new(sx / n, sy / n);
        }
        let (sx, sy) = polys.iter().fold((0.0, 0.0), |(sx, sy), p| {
            let w = p.area_m2();
            let c = p.centroid();
            (sx + c.lon * w, sy + c.lat * w)
        });
        Point::new(sx / total_area, sy / total_area)
    }

    /// Total approximate area in square meters.
    pub fn area_m2(&self) -> f64 {
        self.polygons().iter().map(Polygon::area_m2).sum()
    }

    /// Total count of self-intersections across all rings of all polygons.
    pub fn self_intersections(&self) -> usize {
        self.polygons()
            .iter()
            .map(|p| {
                p.outer.self_intersections()
                    + p.holes.iter().map(Ring::self_intersections).sum::<usize>()
            })
            .sum()
    }

    /// Canonical byte encoding: polygon count, then each polygon's canonical
    /// bytes, polygons sorted by their outer ring's rounded first coordinate.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut polys: Vec<&Polygon> = self.polygons().iter().collect();
        polys.sort_by_key(|p| p.first_sort_key());
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(polys.len() as u32).to_be_bytes());
        for p in polys {
            bytes.extend_from_slice(&p.canonical_bytes());
        }
        bytes
    }

    /// Whether `point` is contained in any constituent polygon (ignoring holes
    /// for simplicity — adequate for the centroid/containment checks used here).
    pub fn contains_point(&self, point: Point) -> bool {
        self.polygons().iter().any(|p| {
            p.outer.contains_point(point) && !p.holes.iter().any(|h| h.contains_point(point))
        })
    }
}

/// Great-circle distance in kilometers (haversine formula).
pub fn haversine_km(a: Point, b: Point) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M / 1000.0 * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(cx: f64, cy: f64, half: f64) -> Polygon {
        Polygon::new(
            Ring::new(vec![
                Point::new(cx - half, cy - half),
                Point::new(cx + half, cy - half),
                Point::new(cx + half, cy + half),
                Point::new(cx - half, cy + half),
                Point::new(cx - half, cy - half),
            ]),
            vec![],
        )
    }

    #[test]
    fn ring_orientation_normalizes() {
        let ring = square(0.0, 0.0, 1.0).outer;
        let ccw = ring.with_orientation(true);
        let cw = ring.with_orientation(false);
        assert!(ccw.is_ccw());
        assert!(!cw.is_ccw());
    }

    #[test]
    fn canonical_bytes_independent_of_input_winding() {
        let a = square(0.0, 0.0, 1.0);
        let mut reversed_points = a.outer.points.clone();
        reversed_points.reverse();
        let b = Polygon::new(Ring::new(reversed_points), vec![]);
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn self_intersection_detects_bowtie() {
        let bowtie = Ring::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 0.0),
        ]);
        assert!(bowtie.self_intersections() >= 1);
    }

    #[test]
    fn square_has_no_self_intersections() {
        assert_eq!(square(0.0, 0.0, 1.0).outer.self_intersections(), 0);
    }

    #[test]
    fn point_in_polygon() {
        let poly = Geometry::Polygon(square(0.0, 0.0, 1.0));
        assert!(poly.contains_point(Point::new(0.0, 0.0)));
        assert!(!poly.contains_point(Point::new(5.0, 5.0)));
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        let p = Point::new(-75.5, 39.7);
        assert!(haversine_km(p, p) < 1e-6);
    }

    #[test]
    fn area_positive_for_valid_square() {
        let poly = square(-75.0, 40.0, 0.01);
        assert!(poly.area_m2() > 0.0);
    }
}
