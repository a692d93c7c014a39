//! Small vector helpers over `[f64; 3]`.

pub type Vec3 = [f64; 3];

pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

pub fn distance(a: Vec3, b: Vec3) -> f64 {
    norm(sub(a, b))
}

/// Unit vector along `a`, or `None` for a (near) zero vector.
pub fn normalize(a: Vec3) -> Option<Vec3> {
    let len = norm(a);
    if len < 1e-12 {
        None
    } else {
        Some(scale(a, 1.0 / len))
    }
}

/// Any unit vector perpendicular to `n` (which must be unit length).
pub fn any_perpendicular(n: Vec3) -> Vec3 {
    let helper = if n[0].abs() < 0.9 {
        [1.0, 0.0, 0.0]
    } else {
        [0.0, 1.0, 0.0]
    };
    let t = cross(n, helper);
    let len = norm(t);
    scale(t, 1.0 / len)
}

/// Flip a direction so its first significant component is positive.
///
/// Lines have no preferred orientation; this gives edges a canonical
/// direction regardless of how the kernel walks them.
pub fn canonical_direction(d: Vec3) -> Vec3 {
    for c in d {
        if c.abs() > 1e-9 {
            return if c < 0.0 { scale(d, -1.0) } else { d };
        }
    }
    d
}

/// Rotate `p` about the axis through `origin` along unit `axis` (Rodrigues).
pub fn rotate_about(p: Vec3, origin: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    let v = sub(p, origin);
    let (s, c) = angle.sin_cos();
    let term1 = scale(v, c);
    let term2 = scale(cross(axis, v), s);
    let term3 = scale(axis, dot(axis, v) * (1.0 - c));
    add(origin, add(term1, add(term2, term3)))
}

/// Round to a fixed number of decimal places. Negative zero becomes zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let r = (value * factor).round() / factor;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
