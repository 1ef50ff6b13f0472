//! Integer Bresenham line tracing.
//!
//! Every caller (freehand gap filling, line preview, line commit) relies on the
//! traced path being inclusive of both endpoints and 8-connected.  The path
//! from A to B is not guaranteed to be the reverse of B to A; diagonal ties may
//! step a different axis first depending on direction.
//!
//! The major axis advances on every step, so the cell at step `i` has a closed
//! form.  That lets [`LineIter::clipped`] jump straight to the part of a path
//! that crosses the canvas instead of walking millions of off-grid cells.

/// A grid cell `(x, y)`.  Signed so that pointer positions left of / above the
/// canvas can be traced and then bounds-checked by the caller.
pub type Cell = (i32, i32);

/// Iterator over the cells of a Bresenham line, start and end included.
///
/// All arithmetic is done in 64/128-bit, so any pair of `i32` endpoints is
/// safe to trace.
#[derive(Clone, Debug)]
pub struct LineIter {
    origin: (i64, i64),
    sign: (i64, i64),
    /// Distance along the axis that advances every step.
    major: i64,
    /// Distance along the other axis.
    minor: i64,
    x_major: bool,
    next: i64,
    end: i64,
}

impl LineIter {
    pub fn new(start: Cell, end: Cell) -> Self {
        let (x0, y0) = (start.0 as i64, start.1 as i64);
        let (x1, y1) = (end.0 as i64, end.1 as i64);
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let x_major = dx >= dy;
        let (major, minor) = if x_major { (dx, dy) } else { (dy, dx) };
        Self {
            origin: (x0, y0),
            sign: (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 }),
            major,
            minor,
            x_major,
            next: 0,
            end: major + 1,
        }
    }

    /// Restrict the remaining path to cells inside a `width` x `height` grid.
    ///
    /// The cells produced are exactly the in-grid cells of the unclipped
    /// path, in the same order.  Work is logarithmic in the path length.
    pub fn clipped(mut self, width: u32, height: u32) -> Self {
        for (axis, len) in [(0, width as i64), (1, height as i64)] {
            let sign = if axis == 0 { self.sign.0 } else { self.sign.1 };
            let coord = |it: &Self, i: i64| {
                let c = it.coord_at(i);
                if axis == 0 { c.0 } else { c.1 }
            };
            // Each axis coordinate is monotone along the path, so "has entered
            // the grid" and "has left the grid" each flip exactly once.
            let entered = |i| if sign > 0 { coord(&self, i) >= 0 } else { coord(&self, i) < len };
            let left = |i| if sign > 0 { coord(&self, i) >= len } else { coord(&self, i) < 0 };
            let lo = first_step(self.next, self.end, entered);
            let hi = first_step(lo, self.end, left);
            self.next = lo;
            self.end = hi;
        }
        self
    }

    fn coord_at(&self, i: i64) -> (i64, i64) {
        let k = if self.major == 0 {
            0
        } else {
            let num = 2 * i as i128 * self.minor as i128 + self.major as i128 - 1;
            (num / (2 * self.major as i128)) as i64
        };
        let (along_x, along_y) = if self.x_major { (i, k) } else { (k, i) };
        (self.origin.0 + self.sign.0 * along_x, self.origin.1 + self.sign.1 * along_y)
    }
}

/// First step in `lo..hi` where `pred` holds (or `hi`), for a predicate that
/// is false and then true.
fn first_step(mut lo: i64, mut hi: i64, pred: impl Fn(i64) -> bool) -> i64 {
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

impl Iterator for LineIter {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        if self.next >= self.end {
            return None;
        }
        let (x, y) = self.coord_at(self.next);
        self.next += 1;
        // Every cell lies between two i32 endpoints.
        Some((x as i32, y as i32))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.end - self.next).max(0) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for LineIter {}

/// Ordered cells from `(x0, y0)` to `(x1, y1)` inclusive.
pub fn trace_line(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Cell> {
    LineIter::new((x0, y0), (x1, y1)).collect()
}
