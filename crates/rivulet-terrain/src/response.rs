/// Piecewise-linear shaping curve over raw height. Clamped past the end keys;
/// an empty curve passes values through.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResponseCurve {
    keys: Vec<(f32, f32)>,
}

impl ResponseCurve {
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn linear() -> Self {
        Self::new(vec![(0.0, 0.0), (1.0, 1.0)])
    }

    pub fn keys(&self) -> &[(f32, f32)] {
        &self.keys
    }

    /// Index of the first key whose output drops below its predecessor.
    pub fn first_descent(&self) -> Option<usize> {
        self.keys
            .windows(2)
            .position(|w| w[1].1 < w[0].1)
            .map(|i| i + 1)
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return t,
        };
        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }
        let i = self.keys.partition_point(|k| k.0 <= t);
        let (x0, y0) = self.keys[i - 1];
        let (x1, y1) = self.keys[i];
        let span = x1 - x0;
        if span <= f32::EPSILON {
            return y1;
        }
        y0 + (y1 - y0) * ((t - x0) / span)
    }
}

/// Maps raw samples to comparable heights. Every tile must share one instance.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightResponse {
    pub curve: ResponseCurve,
    pub multiplier: f32,
    pub world_scale: f32,
}

impl HeightResponse {
    pub fn new(curve: ResponseCurve, multiplier: f32, world_scale: f32) -> Self {
        Self {
            curve,
            multiplier,
            world_scale,
        }
    }

    pub fn identity() -> Self {
        Self::new(ResponseCurve::default(), 1.0, 1.0)
    }

    #[inline]
    pub fn evaluate(&self, raw: f32) -> f32 {
        self.curve.evaluate(raw) * self.multiplier * self.world_scale
    }
}

impl Default for HeightResponse {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_curve_is_identity() {
        let c = ResponseCurve::default();
        assert_eq!(c.evaluate(-3.5), -3.5);
        assert_eq!(c.evaluate(0.25), 0.25);
    }

    #[test]
    fn interpolates_and_clamps() {
        let c = ResponseCurve::new(vec![(1.0, 10.0), (0.0, 0.0), (0.5, 2.0)]);
        assert_eq!(c.keys()[0], (0.0, 0.0));
        assert_eq!(c.evaluate(-1.0), 0.0);
        assert_eq!(c.evaluate(2.0), 10.0);
        assert!((c.evaluate(0.25) - 1.0).abs() < 1e-6);
        assert!((c.evaluate(0.75) - 6.0).abs() < 1e-6);
        assert_eq!(c.evaluate(0.5), 2.0);
    }

    #[test]
    fn finds_descending_key() {
        assert_eq!(ResponseCurve::linear().first_descent(), None);
        let c = ResponseCurve::new(vec![(0.0, 0.0), (0.5, 1.0), (1.0, 0.5)]);
        assert_eq!(c.first_descent(), Some(2));
    }

    #[test]
    fn response_scales_curve_output() {
        let r = HeightResponse::new(ResponseCurve::linear(), 4.0, 5.0);
        assert!((r.evaluate(0.5) - 10.0).abs() < 1e-6);
    }
}
