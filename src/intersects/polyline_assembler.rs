use std::collections::HashMap;

use nalgebra::Point3;

use crate::misc::FloatingPoint;

use super::MeshIntersectionPoint;

/// End of an intersection segment.
///
/// Ends live in an arena where the ends of segment `i` sit at `2 * i` and `2 * i + 1`,
/// so the opposite end of `e` is always `e ^ 1`.
#[derive(Clone, Debug)]
struct SegmentEnd<T: FloatingPoint> {
    point: MeshIntersectionPoint<T>,
    /// the welded end of a touching segment
    adjacent: Option<usize>,
    visited: bool,
}

/// Uniform grid over end positions with cells as wide as the weld tolerance,
/// so every end within tolerance of a query lies in one of the 27 surrounding cells.
struct WeldIndex {
    cell_size: f64,
    cells: HashMap<(i64, i64, i64), Vec<usize>>,
}

impl WeldIndex {
    fn new<T: FloatingPoint>(ends: &[SegmentEnd<T>], tolerance: T) -> Self {
        let cell_size = tolerance.to_f64().unwrap_or(0.).max(f64::EPSILON);
        let mut index = Self {
            cell_size,
            cells: HashMap::new(),
        };
        for (i, end) in ends.iter().enumerate() {
            if let Some(key) = index.cell(&end.point.point) {
                index.cells.entry(key).or_default().push(i);
            }
        }
        index
    }

    fn cell<T: FloatingPoint>(&self, p: &Point3<T>) -> Option<(i64, i64, i64)> {
        let c = |v: T| -> Option<i64> {
            let v = v.to_f64()? / self.cell_size;
            v.is_finite().then(|| v.floor() as i64)
        };
        Some((c(p.x)?, c(p.y)?, c(p.z)?))
    }

    /// Ends other than `query` lying within `tolerance` of it
    fn neighbors<T: FloatingPoint>(
        &self,
        ends: &[SegmentEnd<T>],
        query: usize,
        tolerance: T,
    ) -> Vec<usize> {
        let p = &ends[query].point.point;
        let Some((x, y, z)) = self.cell(p) else {
            return vec![];
        };

        let mut found = vec![];
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(cell) = self.cells.get(&(x + dx, y + dy, z + dz)) else {
                        continue;
                    };
                    found.extend(cell.iter().copied().filter(|i| {
                        *i != query && (ends[*i].point.point - p).norm() < tolerance
                    }));
                }
            }
        }
        found
    }
}

/// Connects an unordered set of intersection segments into polylines.
///
/// Ends of different segments lying within tolerance of each other are welded,
/// unless more than two ends meet there (a branch), in which case
/// the polylines stop at that point.
#[derive(Clone, Debug)]
pub struct PolylineAssembler<T: FloatingPoint> {
    ends: Vec<SegmentEnd<T>>,
    tolerance: T,
}

impl<T: FloatingPoint> PolylineAssembler<T> {
    pub fn new(segments: Vec<[MeshIntersectionPoint<T>; 2]>, tolerance: T) -> Self {
        let ends = segments
            .into_iter()
            .flatten()
            .map(|point| SegmentEnd {
                point,
                adjacent: None,
                visited: false,
            })
            .collect();
        Self { ends, tolerance }
    }

    /// Weld the segment ends & walk the resulting topology.
    /// Open polylines are walked from their free ends first, closed loops afterwards,
    /// so every segment ends up in exactly one polyline.
    /// A closed polyline repeats its first point at its end.
    pub fn assemble(mut self) -> Vec<Vec<MeshIntersectionPoint<T>>> {
        self.weld();

        let free: Vec<usize> = (0..self.ends.len())
            .filter(|i| self.ends[*i].adjacent.is_none())
            .collect();

        let mut polylines = vec![];
        for start in free.into_iter().chain(0..self.ends.len()) {
            if self.ends[start].visited {
                continue;
            }
            polylines.push(self.walk(start));
        }

        #[cfg(feature = "log")]
        log::debug!(
            "assembled {} polylines from {} segments",
            polylines.len(),
            self.ends.len() / 2
        );

        polylines
    }

    fn weld(&mut self) {
        let index = WeldIndex::new(&self.ends, self.tolerance);
        #[cfg(feature = "log")]
        let mut branches = 0;

        for i in 0..self.ends.len() {
            if self.ends[i].adjacent.is_some() {
                continue;
            }
            let neighbors = index.neighbors(&self.ends, i, self.tolerance);
            match neighbors.as_slice() {
                [j] if self.ends[*j].adjacent.is_none() => {
                    self.ends[i].adjacent = Some(*j);
                    self.ends[*j].adjacent = Some(i);
                }
                #[cfg(feature = "log")]
                [_, _, ..] => {
                    branches += 1;
                }
                _ => {}
            }
        }

        #[cfg(feature = "log")]
        if branches > 0 {
            log::warn!("{} segment ends left unwelded at branch points", branches);
        }
    }

    fn walk(&mut self, start: usize) -> Vec<MeshIntersectionPoint<T>> {
        let mut polyline = vec![];
        let mut current = Some(start);
        let mut last = start;

        while let Some(end) = current {
            if self.ends[end].visited {
                break;
            }
            self.ends[end].visited = true;
            self.ends[end ^ 1].visited = true;
            polyline.push(self.ends[end].point.clone());
            last = end;

            current = self.ends[end ^ 1].adjacent;
            if current == Some(start) {
                break;
            }
        }

        polyline.push(self.ends[last ^ 1].point.clone());
        polyline
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector2};

    use super::PolylineAssembler;
    use crate::intersects::MeshIntersectionPoint;

    fn end(p: Point3<f64>) -> MeshIntersectionPoint<f64> {
        MeshIntersectionPoint {
            point: p,
            uv_a: Vector2::new(p.x, p.y),
            uv_b: Vector2::new(p.y, p.z),
            face_a: 0,
            face_b: 0,
        }
    }

    fn segment(a: Point3<f64>, b: Point3<f64>) -> [MeshIntersectionPoint<f64>; 2] {
        [end(a), end(b)]
    }

    fn circle_point(i: usize, n: usize) -> Point3<f64> {
        let t = i as f64 / n as f64 * std::f64::consts::TAU;
        Point3::new(t.cos(), t.sin(), 0.)
    }

    #[test]
    fn closed_cycle() {
        let n = 12;
        // shuffled order & alternating orientation
        let mut segments = vec![];
        for k in 0..n {
            let i = (k * 5) % n;
            let (a, b) = (circle_point(i, n), circle_point(i + 1, n));
            if k % 2 == 0 {
                segments.push(segment(a, b));
            } else {
                segments.push(segment(b, a));
            }
        }
        let polylines = PolylineAssembler::new(segments, 1e-9).assemble();
        assert_eq!(polylines.len(), 1);

        let pl = &polylines[0];
        assert_eq!(pl.len(), n + 1);
        assert_relative_eq!(pl[0].point, pl[n].point, epsilon = 1e-9);

        // every vertex of the circle is visited exactly once
        let mut visited = vec![0; n];
        for p in &pl[..n] {
            let i = (0..n)
                .find(|i| (circle_point(*i, n) - p.point).norm() < 1e-9)
                .unwrap();
            visited[i] += 1;
        }
        assert!(visited.iter().all(|v| *v == 1));
    }

    #[test]
    fn open_chain() {
        let points: Vec<_> = (0..6).map(|i| Point3::new(i as f64, (i % 2) as f64, 0.)).collect();
        let segments = vec![
            segment(points[3], points[2]),
            segment(points[0], points[1]),
            segment(points[4], points[5]),
            segment(points[1], points[2]),
            segment(points[3], points[4]),
        ];
        let polylines = PolylineAssembler::new(segments, 1e-6).assemble();
        assert_eq!(polylines.len(), 1);

        let pl: Vec<_> = polylines[0].iter().map(|p| p.point).collect();
        assert_eq!(pl.len(), 6);
        let forward = pl == points;
        let backward = pl.iter().rev().cloned().collect::<Vec<_>>() == points;
        assert!(forward || backward);
    }

    #[test]
    fn welds_ends_within_tolerance() {
        let segments = vec![
            segment(Point3::new(0., 0., 0.), Point3::new(1., 0., 0.)),
            segment(Point3::new(1. + 1e-5, 0., 0.), Point3::new(2., 0., 0.)),
        ];
        let polylines = PolylineAssembler::new(segments.clone(), 1e-4).assemble();
        assert_eq!(polylines.len(), 1);
        assert_eq!(polylines[0].len(), 3);

        let apart = PolylineAssembler::new(segments, 1e-6).assemble();
        assert_eq!(apart.len(), 2);
    }

    #[test]
    fn branch_point_splits_polylines() {
        let o = Point3::new(0., 0., 0.);
        let segments = vec![
            segment(o, Point3::new(1., 0., 0.)),
            segment(Point3::new(0., 1., 0.), o),
            segment(o, Point3::new(-1., -1., 0.)),
        ];
        let polylines = PolylineAssembler::new(segments, 1e-6).assemble();
        assert_eq!(polylines.len(), 3);
        assert!(polylines.iter().all(|pl| pl.len() == 2));
        for pl in &polylines {
            assert!(pl.iter().any(|p| p.point == o));
        }
    }

    #[test]
    fn mixed_open_and_closed() {
        let n = 4;
        let mut segments: Vec<_> = (0..n)
            .map(|i| segment(circle_point(i, n), circle_point(i + 1, n)))
            .collect();
        segments.push(segment(Point3::new(5., 0., 0.), Point3::new(6., 0., 0.)));
        segments.push(segment(Point3::new(6., 0., 0.), Point3::new(7., 0., 0.)));

        let polylines = PolylineAssembler::new(segments, 1e-9).assemble();
        assert_eq!(polylines.len(), 2);
        let mut lengths: Vec<_> = polylines.iter().map(|pl| pl.len()).collect();
        lengths.sort();
        assert_eq!(lengths, vec![3, 5]);
    }
}
