//! Small numeric helpers shared by the pipeline and the chart builders.

/// Median of the values, averaging the two middle values for even counts.
/// NaNs are ignored. Returns `None` when nothing is left.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Ordinary least squares fit `y = slope * x + intercept`.
/// Needs at least two points with distinct x.
pub fn linear_fit(points: &[[f64; 2]]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;

    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), p| {
        let dx = p[0] - mean_x;
        (sxy + dx * (p[1] - mean_y), sxx + dx * dx)
    });
    if sxx.abs() < f64::EPSILON {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

/// Equal-width bins over `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bins {
    pub start: f64,
    pub width: f64,
    pub count: usize,
}

impl Bins {
    /// Cover the observed range with `count` bins. A degenerate range gets a
    /// single unit-wide bin centred on the value.
    pub fn covering(values: impl Iterator<Item = f64>, count: usize) -> Option<Self> {
        let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| {
            Some(match acc {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            })
        })?;
        let range = max - min;
        if range.abs() < f64::EPSILON || count <= 1 {
            let width = if range.abs() < f64::EPSILON { 1.0 } else { range };
            let start = if range.abs() < f64::EPSILON { min - 0.5 } else { min };
            return Some(Bins { start, width, count: 1 });
        }
        Some(Bins {
            start: min,
            width: range / count as f64,
            count,
        })
    }

    /// Bin index of a value; the top edge belongs to the last bin.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        if value.is_nan() || value < self.start {
            return None;
        }
        let idx = ((value - self.start) / self.width).floor() as usize;
        if idx < self.count {
            Some(idx)
        } else if value <= self.end() {
            Some(self.count - 1)
        } else {
            None
        }
    }

    pub fn center(&self, idx: usize) -> f64 {
        self.start + self.width * (idx as f64 + 0.5)
    }

    pub fn end(&self) -> f64 {
        self.start + self.width * self.count as f64
    }
}
