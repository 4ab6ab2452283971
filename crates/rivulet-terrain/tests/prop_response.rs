use proptest::prelude::*;
use rivulet_terrain::{HeightResponse, ResponseCurve};

fn monotone_keys() -> impl Strategy<Value = Vec<(f32, f32)>> {
    prop::collection::vec((0.0f32..1.0, 0.0f32..1.0), 2..6).prop_map(|raw| {
        let mut xs: Vec<f32> = raw.iter().map(|k| k.0).collect();
        let mut ys: Vec<f32> = raw.iter().map(|k| k.1).collect();
        xs.sort_by(f32::total_cmp);
        ys.sort_by(f32::total_cmp);
        xs.into_iter().zip(ys).collect()
    })
}

proptest! {
    #[test]
    fn monotone_keys_give_monotone_response(keys in monotone_keys(), a in -0.5f32..1.5, b in -0.5f32..1.5) {
        let curve = ResponseCurve::new(keys);
        prop_assert!(curve.first_descent().is_none());
        let r = HeightResponse::new(curve, 3.0, 5.0);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(r.evaluate(lo) <= r.evaluate(hi) + 1e-4);
    }

    #[test]
    fn evaluation_stays_within_key_outputs(keys in monotone_keys(), t in -2.0f32..3.0) {
        let curve = ResponseCurve::new(keys.clone());
        let v = curve.evaluate(t);
        let min = keys.iter().map(|k| k.1).fold(f32::INFINITY, f32::min);
        let max = keys.iter().map(|k| k.1).fold(f32::NEG_INFINITY, f32::max);
        prop_assert!(v >= min - 1e-5 && v <= max + 1e-5);
    }
}
