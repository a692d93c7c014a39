//! Convex cells bounded by half-spaces.
//!
//! This is the geometry behind [`MockKernel`](crate::MockKernel). A cell is
//! the intersection of `n·x <= offset` constraints; its vertices, faces and
//! edges are recovered exactly from the planes, so volumes, areas and
//! bounding boxes are real numbers a test can check by hand.
//!
//! Every plane carries an `id` that survives operations which keep the
//! plane (offsetting, transforming, adding other planes). That id is what
//! the mock kernel uses to report history.

use std::collections::BTreeSet;

use tnp_types::math::{self, Vec3};
use tnp_types::Transform;

use crate::types::KernelError;

/// Distance tolerance for "point lies on plane" / "point is inside".
pub(crate) const EPS: f64 = 1e-7;
/// Vertices closer than this are the same vertex.
const MERGE_EPS: f64 = 1e-6;
/// Cells below this volume are considered empty.
pub(crate) const VOLUME_EPS: f64 = 1e-9;
const AREA_EPS: f64 = 1e-12;

/// How a bounding plane should be reported as a face surface.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FacetKind {
    Plane,
    /// One facet of a faceted cylinder (or a single-facet fillet).
    Cylinder { radius: f64, axis: Vec3 },
}

#[derive(Debug, Clone)]
pub(crate) struct HalfSpace {
    pub id: u64,
    /// Unit outward normal.
    pub normal: Vec3,
    pub offset: f64,
    pub kind: FacetKind,
}

impl HalfSpace {
    /// Plane through `point` with outward `normal` (normalized here).
    pub fn through(id: u64, normal: Vec3, point: Vec3, kind: FacetKind) -> Option<Self> {
        let normal = math::normalize(normal)?;
        Some(Self {
            id,
            normal,
            offset: math::dot(normal, point),
            kind,
        })
    }

    /// Positive outside, negative inside.
    pub fn signed_distance(&self, p: Vec3) -> f64 {
        math::dot(self.normal, p) - self.offset
    }

    /// The complementary half-space, under a new plane id.
    pub fn flipped(&self, id: u64) -> Self {
        Self {
            id,
            normal: math::scale(self.normal, -1.0),
            offset: -self.offset,
            kind: self.kind.clone(),
        }
    }

    fn same_plane(&self, other: &HalfSpace) -> bool {
        math::dot(self.normal, other.normal) > 1.0 - 1e-9 && (self.offset - other.offset).abs() < EPS
    }

    fn transformed(&self, t: &Transform) -> Self {
        let on_plane = math::scale(self.normal, self.offset);
        let p = t.apply_point(on_plane);
        let n = math::normalize(t.apply_direction(self.normal)).unwrap_or(self.normal);
        let kind = match &self.kind {
            FacetKind::Plane => FacetKind::Plane,
            FacetKind::Cylinder { radius, axis } => {
                let factor = match t {
                    Transform::Scale { factor, .. } => factor.abs(),
                    _ => 1.0,
                };
                let axis = math::normalize(t.apply_direction(*axis)).unwrap_or(*axis);
                FacetKind::Cylinder {
                    radius: radius * factor,
                    axis: math::canonical_direction(axis),
                }
            }
        };
        Self {
            id: self.id,
            normal: n,
            offset: math::dot(n, p),
            kind,
        }
    }
}

/// Hand out the next plane id.
pub(crate) fn take_id(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}

#[derive(Debug, Clone)]
pub(crate) struct CellFace {
    /// Index into the cell's planes.
    pub plane: usize,
    /// Vertex indices, counter-clockwise seen from outside.
    pub boundary: Vec<usize>,
    pub area: f64,
    pub center: Vec3,
}

#[derive(Debug, Clone)]
pub(crate) struct CellEdge {
    /// Indices into the topology's faces.
    pub faces: (usize, usize),
    pub vertices: (usize, usize),
}

#[derive(Debug, Clone)]
pub(crate) struct CellTopology {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<CellFace>,
    pub edges: Vec<CellEdge>,
    pub volume: f64,
    pub centroid: Vec3,
}

impl CellTopology {
    pub fn face_for_plane(&self, plane: usize) -> Option<usize> {
        self.faces.iter().position(|f| f.plane == plane)
    }

    pub fn area(&self) -> f64 {
        self.faces.iter().map(|f| f.area).sum()
    }

    /// Edges of a face in boundary order.
    pub fn face_edge_indices(&self, face: usize) -> Vec<usize> {
        let boundary = &self.faces[face].boundary;
        let n = boundary.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let a = boundary[i];
            let b = boundary[(i + 1) % n];
            if let Some(ei) = self.edges.iter().position(|e| {
                (e.vertices == (a, b) || e.vertices == (b, a))
                    && (e.faces.0 == face || e.faces.1 == face)
            }) {
                out.push(ei);
            }
        }
        out
    }
}

/// A convex polyhedron given by its bounding half-spaces.
#[derive(Debug, Clone)]
pub(crate) struct Cell {
    pub planes: Vec<HalfSpace>,
}

impl Cell {
    pub fn new(planes: Vec<HalfSpace>) -> Self {
        Self { planes }
    }

    pub fn with_plane(&self, plane: HalfSpace) -> Cell {
        let mut planes = self.planes.clone();
        planes.push(plane);
        Cell { planes }
    }

    pub fn intersection(&self, other: &Cell) -> Cell {
        let mut planes = self.planes.clone();
        planes.extend(other.planes.iter().cloned());
        Cell { planes }
    }

    pub fn transformed(&self, t: &Transform) -> Cell {
        Cell {
            planes: self.planes.iter().map(|h| h.transformed(t)).collect(),
        }
    }

    pub fn volume(&self) -> f64 {
        self.topology().volume
    }

    pub fn is_empty(&self) -> bool {
        self.volume() <= VOLUME_EPS
    }

    /// Recover vertices, faces and edges from the planes.
    pub fn topology(&self) -> CellTopology {
        let planes = &self.planes;
        let n = planes.len();

        let mut raw: Vec<Vec3> = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    let Some(p) = intersect_three(&planes[i], &planes[j], &planes[k]) else {
                        continue;
                    };
                    if planes.iter().any(|h| h.signed_distance(p) > EPS) {
                        continue;
                    }
                    if raw.iter().any(|v| math::distance(*v, p) < MERGE_EPS) {
                        continue;
                    }
                    raw.push(p);
                }
            }
        }

        // Faces, one per contributing plane; duplicate planes report once.
        let mut faces: Vec<CellFace> = Vec::new();
        for (pi, plane) in planes.iter().enumerate() {
            if faces.iter().any(|f| planes[f.plane].same_plane(plane)) {
                continue;
            }
            let on: Vec<usize> = (0..raw.len())
                .filter(|&vi| plane.signed_distance(raw[vi]).abs() <= EPS)
                .collect();
            if on.len() < 3 {
                continue;
            }
            let boundary = order_boundary(&raw, &on, plane.normal);
            if boundary.len() < 3 {
                continue;
            }
            let (area, center) = polygon_area_center(&raw, &boundary, plane.normal);
            if area < AREA_EPS {
                continue;
            }
            faces.push(CellFace {
                plane: pi,
                boundary,
                area,
                center,
            });
        }

        // Keep only vertices that bound a face, in first-use order.
        let mut remap = vec![usize::MAX; raw.len()];
        let mut vertices = Vec::new();
        for face in &faces {
            for &vi in &face.boundary {
                if remap[vi] == usize::MAX {
                    remap[vi] = vertices.len();
                    vertices.push(raw[vi]);
                }
            }
        }
        for face in &mut faces {
            for vi in &mut face.boundary {
                *vi = remap[*vi];
            }
        }

        let mut edges = Vec::new();
        for fi in 0..faces.len() {
            for fj in (fi + 1)..faces.len() {
                let shared: Vec<usize> = faces[fi]
                    .boundary
                    .iter()
                    .copied()
                    .filter(|v| faces[fj].boundary.contains(v))
                    .collect();
                if shared.len() < 2 {
                    continue;
                }
                let pair = farthest_pair(&vertices, &shared);
                edges.push(CellEdge {
                    faces: (fi, fj),
                    vertices: oriented_along(&faces[fi].boundary, pair),
                });
            }
        }

        let (volume, centroid) = volume_centroid(&vertices, &faces);

        CellTopology {
            vertices,
            faces,
            edges,
            volume,
            centroid,
        }
    }

    /// `self` minus `other`, as interior-disjoint convex pieces.
    pub fn difference(&self, other: &Cell, ids: &mut u64) -> Vec<Cell> {
        if self.intersection(other).is_empty() {
            return vec![self.clone()];
        }
        let mut pieces = Vec::new();
        let mut remaining = self.clone();
        for plane in &other.planes {
            let outside = remaining.with_plane(plane.flipped(take_id(ids)));
            if !outside.is_empty() {
                pieces.push(outside);
            }
            remaining = remaining.with_plane(plane.clone());
            if remaining.is_empty() {
                break;
            }
        }
        pieces
    }

    /// Whether the interiors of two cells overlap.
    pub fn overlaps(&self, other: &Cell) -> bool {
        self.intersection(other).volume() > VOLUME_EPS * 10.0
    }
}

/// Cell of a prism: a convex planar `profile` swept along `sweep`.
/// Side planes get `side_kind`.
pub(crate) fn prism_cell(
    profile: &[Vec3],
    sweep: Vec3,
    ids: &mut u64,
    side_kind: FacetKind,
) -> Result<Cell, KernelError> {
    if profile.len() < 3 {
        return Err(KernelError::invalid("profile needs at least 3 points"));
    }
    let mut n = math::normalize(newell_normal(profile))
        .ok_or_else(|| KernelError::invalid("profile is degenerate"))?;
    let p0 = profile[0];
    let scale = profile
        .iter()
        .map(|p| math::distance(*p, p0))
        .fold(1.0_f64, f64::max);
    if profile
        .iter()
        .any(|p| math::dot(n, math::sub(*p, p0)).abs() > 1e-6 * scale)
    {
        return Err(KernelError::invalid("profile is not planar"));
    }
    let along = math::dot(n, sweep);
    if along.abs() < 1e-9 {
        return Err(KernelError::invalid(
            "sweep direction lies in the profile plane",
        ));
    }
    if along < 0.0 {
        n = math::scale(n, -1.0);
    }

    let center = math::scale(
        profile.iter().fold([0.0; 3], |acc, p| math::add(acc, *p)),
        1.0 / profile.len() as f64,
    );

    let mut planes = Vec::with_capacity(profile.len() + 2);
    planes.push(HalfSpace {
        id: take_id(ids),
        normal: math::scale(n, -1.0),
        offset: -math::dot(n, p0),
        kind: FacetKind::Plane,
    });
    planes.push(HalfSpace {
        id: take_id(ids),
        normal: n,
        offset: math::dot(n, math::add(p0, sweep)),
        kind: FacetKind::Plane,
    });

    let count = profile.len();
    for i in 0..count {
        let a = profile[i];
        let b = profile[(i + 1) % count];
        if math::distance(a, b) < MERGE_EPS {
            continue;
        }
        let Some(mut sn) = math::normalize(math::cross(math::sub(b, a), sweep)) else {
            continue;
        };
        if math::dot(sn, math::sub(center, a)) > 0.0 {
            sn = math::scale(sn, -1.0);
        }
        planes.push(HalfSpace {
            id: take_id(ids),
            normal: sn,
            offset: math::dot(sn, a),
            kind: side_kind.clone(),
        });
    }

    for side in &planes[2..] {
        if profile.iter().any(|p| side.signed_distance(*p) > 1e-6 * scale) {
            return Err(KernelError::invalid("profile must be convex"));
        }
    }

    Ok(Cell::new(planes))
}

/// Convex hull of a point cloud as a cell. `None` when the points are flat.
pub(crate) fn hull_cell(points: &[Vec3], ids: &mut u64) -> Option<Cell> {
    let n = points.len();
    let mut planes: Vec<HalfSpace> = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let normal = math::cross(
                    math::sub(points[j], points[i]),
                    math::sub(points[k], points[i]),
                );
                let Some(normal) = math::normalize(normal) else {
                    continue;
                };
                let offset = math::dot(normal, points[i]);
                let dists: Vec<f64> = points
                    .iter()
                    .map(|p| math::dot(normal, *p) - offset)
                    .collect();
                let candidate = if dists.iter().all(|d| *d <= EPS) {
                    HalfSpace {
                        id: 0,
                        normal,
                        offset,
                        kind: FacetKind::Plane,
                    }
                } else if dists.iter().all(|d| *d >= -EPS) {
                    HalfSpace {
                        id: 0,
                        normal: math::scale(normal, -1.0),
                        offset: -offset,
                        kind: FacetKind::Plane,
                    }
                } else {
                    continue;
                };
                if !planes.iter().any(|h| h.same_plane(&candidate)) {
                    planes.push(candidate);
                }
            }
        }
    }
    if planes.len() < 4 {
        return None;
    }
    for plane in &mut planes {
        plane.id = take_id(ids);
    }
    let cell = Cell::new(planes);
    if cell.is_empty() {
        None
    } else {
        Some(cell)
    }
}

pub(crate) fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut n = [0.0; 3];
    let count = points.len();
    for i in 0..count {
        let a = points[i];
        let b = points[(i + 1) % count];
        n[0] += (a[1] - b[1]) * (a[2] + b[2]);
        n[1] += (a[2] - b[2]) * (a[0] + b[0]);
        n[2] += (a[0] - b[0]) * (a[1] + b[1]);
    }
    n
}

fn intersect_three(a: &HalfSpace, b: &HalfSpace, c: &HalfSpace) -> Option<Vec3> {
    let bc = math::cross(b.normal, c.normal);
    let det = math::dot(a.normal, bc);
    if det.abs() < 1e-10 {
        return None;
    }
    let ca = math::cross(c.normal, a.normal);
    let ab = math::cross(a.normal, b.normal);
    let sum = math::add(
        math::scale(bc, a.offset),
        math::add(math::scale(ca, b.offset), math::scale(ab, c.offset)),
    );
    Some(math::scale(sum, 1.0 / det))
}

/// Sort coplanar vertices counter-clockwise about `normal` and drop
/// vertices that sit on a straight run.
fn order_boundary(points: &[Vec3], on: &[usize], normal: Vec3) -> Vec<usize> {
    let center = math::scale(
        on.iter().fold([0.0; 3], |acc, &i| math::add(acc, points[i])),
        1.0 / on.len() as f64,
    );
    let u = math::any_perpendicular(normal);
    let w = math::cross(normal, u);
    let mut keyed: Vec<(f64, usize)> = on
        .iter()
        .map(|&i| {
            let d = math::sub(points[i], center);
            (math::dot(d, w).atan2(math::dot(d, u)), i)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut ring: Vec<usize> = keyed.into_iter().map(|(_, i)| i).collect();

    loop {
        let n = ring.len();
        if n < 3 {
            return ring;
        }
        let straight = (0..n).find(|&i| {
            let prev = points[ring[(i + n - 1) % n]];
            let cur = points[ring[i]];
            let next = points[ring[(i + 1) % n]];
            let a = math::sub(cur, prev);
            let b = math::sub(next, cur);
            math::norm(math::cross(a, b)) <= 1e-9 * math::norm(a) * math::norm(b)
        });
        match straight {
            Some(i) => {
                ring.remove(i);
            }
            None => return ring,
        }
    }
}

fn polygon_area_center(points: &[Vec3], boundary: &[usize], normal: Vec3) -> (f64, Vec3) {
    let p0 = points[boundary[0]];
    let mut area = 0.0;
    let mut weighted = [0.0; 3];
    for i in 1..boundary.len() - 1 {
        let a = points[boundary[i]];
        let b = points[boundary[i + 1]];
        let tri = 0.5 * math::dot(math::cross(math::sub(a, p0), math::sub(b, p0)), normal);
        area += tri;
        let c = math::scale(math::add(p0, math::add(a, b)), 1.0 / 3.0);
        weighted = math::add(weighted, math::scale(c, tri));
    }
    if area.abs() < AREA_EPS {
        return (0.0, p0);
    }
    (area, math::scale(weighted, 1.0 / area))
}

fn volume_centroid(vertices: &[Vec3], faces: &[CellFace]) -> (f64, Vec3) {
    if vertices.is_empty() {
        return (0.0, [0.0; 3]);
    }
    let reference = math::scale(
        vertices.iter().fold([0.0; 3], |acc, p| math::add(acc, *p)),
        1.0 / vertices.len() as f64,
    );
    let mut volume = 0.0;
    let mut weighted = [0.0; 3];
    for face in faces {
        let p0 = vertices[face.boundary[0]];
        for i in 1..face.boundary.len() - 1 {
            let a = vertices[face.boundary[i]];
            let b = vertices[face.boundary[i + 1]];
            let v = math::dot(
                math::sub(p0, reference),
                math::cross(math::sub(a, reference), math::sub(b, reference)),
            ) / 6.0;
            volume += v;
            let c = math::scale(
                math::add(math::add(reference, p0), math::add(a, b)),
                0.25,
            );
            weighted = math::add(weighted, math::scale(c, v));
        }
    }
    if volume.abs() <= VOLUME_EPS {
        return (0.0, reference);
    }
    (volume, math::scale(weighted, 1.0 / volume))
}

fn farthest_pair(vertices: &[Vec3], shared: &[usize]) -> (usize, usize) {
    let mut best = (shared[0], shared[1]);
    let mut best_d = -1.0;
    for i in 0..shared.len() {
        for j in (i + 1)..shared.len() {
            let d = math::distance(vertices[shared[i]], vertices[shared[j]]);
            if d > best_d {
                best_d = d;
                best = (shared[i], shared[j]);
            }
        }
    }
    best
}

/// Order an edge's endpoints the way the first face walks them.
fn oriented_along(boundary: &[usize], pair: (usize, usize)) -> (usize, usize) {
    let n = boundary.len();
    for i in 0..n {
        if boundary[i] == pair.1 && boundary[(i + 1) % n] == pair.0 {
            return (pair.1, pair.0);
        }
    }
    pair
}

/// Plane ids present in a cell that produced a face.
pub(crate) fn face_plane_ids(cell: &Cell, topo: &CellTopology) -> BTreeSet<u64> {
    topo.faces.iter().map(|f| cell.planes[f.plane].id).collect()
}
