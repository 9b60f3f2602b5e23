//! 2D affine matrix helpers. No runtime types, no errors.
//!
//! Storage `[m0, m1, m2, m3, m4, m5]` maps a point as
//!   x' = m0·x + m2·y + m4
//!   y' = m1·x + m3·y + m5

pub type Affine = [f64; 6];

/// Determinants below this are treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-9;

pub fn identity() -> Affine {
    [1., 0., 0., 1., 0., 0.]
}

pub fn translation(dx: f64, dy: f64) -> Affine {
    [1., 0., 0., 1., dx, dy]
}

/// Rotation by `degrees`, clockwise on a y-down screen.
pub fn rotation(degrees: f64) -> Affine {
    let (s, c) = degrees.to_radians().sin_cos();
    [c, s, -s, c, 0., 0.]
}

/// `a · b` — applying the result is applying `b` first, then `a`.
pub fn mul(a: &Affine, b: &Affine) -> Affine {
    [
        a[0] * b[0] + a[2] * b[1],
        a[1] * b[0] + a[3] * b[1],
        a[0] * b[2] + a[2] * b[3],
        a[1] * b[2] + a[3] * b[3],
        a[0] * b[4] + a[2] * b[5] + a[4],
        a[1] * b[4] + a[3] * b[5] + a[5],
    ]
}

pub fn det(m: &Affine) -> f64 {
    m[0] * m[3] - m[1] * m[2]
}

pub fn invert(m: &Affine) -> Option<Affine> {
    let d = det(m);
    if d.abs() < SINGULAR_EPSILON { return None; }
    let k = 1.0 / d;
    Some([
        m[3] * k,
        -m[1] * k,
        -m[2] * k,
        m[0] * k,
        (m[2] * m[5] - m[3] * m[4]) * k,
        (m[1] * m[4] - m[0] * m[5]) * k,
    ])
}

#[inline]
pub fn apply(m: &Affine, x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Apply only the linear part (no translation). Used for direction vectors.
#[inline]
pub fn apply_linear(m: &Affine, x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y, m[1] * x + m[3] * y)
}

/// Logical point → screen point: pre-scale, then the matrix.
#[inline]
pub fn to_screen(m: &Affine, scale: f64, lx: f64, ly: f64) -> (f64, f64) {
    apply(m, lx * scale, ly * scale)
}

/// Screen point → logical point: inverse matrix, then undo the pre-scale.
#[inline]
pub fn to_logical(inv: &Affine, scale: f64, sx: f64, sy: f64) -> (f64, f64) {
    let (x, y) = apply(inv, sx, sy);
    (x / scale, y / scale)
}

/// True when the linear part is the identity, so the matrix is a pure translation.
pub fn is_translation_only(m: &Affine) -> bool {
    const E: f64 = 1e-9;
    (m[0] - 1.0).abs() < E && m[1].abs() < E && m[2].abs() < E && (m[3] - 1.0).abs() < E
}

/// True when the linear part keeps axes axis-aligned (multiples of 90°).
pub fn is_axis_aligned(m: &Affine) -> bool {
    const E: f64 = 1e-9;
    (m[1].abs() < E && m[2].abs() < E) || (m[0].abs() < E && m[3].abs() < E)
}
