//! Property tests for the spray kernel.

use proptest::prelude::*;
use sprayplan_core::{
    CalibrationTable, ExtrapolationPolicy, SprayKind, SprayModel, SprayProfile,
};

fn default_table() -> CalibrationTable {
    CalibrationTable::new(
        vec![30.0, 20.0, 10.0, 5.0, 70.0, 40.0],
        vec![4.0, 3.0, 2.0, 1.0, 8.0, 5.0],
    )
    .unwrap()
}

fn arb_kind() -> impl Strategy<Value = SprayKind> {
    prop_oneof![Just(SprayKind::Gaussian), Just(SprayKind::Calibrated)]
}

proptest! {
    #[test]
    fn weight_is_non_negative_and_monotone(
        kind in arb_kind(),
        height in 5.0..70.0f64,
        r1 in 0.0..20.0f64,
        r2 in 0.0..20.0f64,
    ) {
        let model = SprayModel::build(kind, &default_table()).unwrap();
        let (near, far) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
        let w_near = model.weight(near, height).unwrap();
        let w_far = model.weight(far, height).unwrap();
        prop_assert!(w_far >= 0.0);
        prop_assert!(w_near >= w_far);
    }

    #[test]
    fn weight_is_zero_beyond_footprint(kind in arb_kind(), height in 5.0..70.0f64, extra in 1e-6..50.0f64) {
        let model = SprayModel::build(kind, &default_table()).unwrap();
        let reach = model.footprint_radius(height).unwrap();
        prop_assert_eq!(model.weight(reach + extra, height).unwrap(), 0.0);
    }

    #[test]
    fn interpolation_stays_between_neighbours(height in 5.0..70.0f64) {
        let table = default_table();
        let r = table.interpolate(height, ExtrapolationPolicy::Reject).unwrap();
        let lo = table.radii().iter().copied().fold(f64::INFINITY, f64::min);
        let hi = table.radii().iter().copied().fold(0.0, f64::max);
        prop_assert!(r >= lo && r <= hi);
    }
}

#[test]
fn test_calibrated_height_outside_table_is_configuration_error() {
    let model = SprayModel::build(SprayKind::Calibrated, &default_table()).unwrap();
    assert!(model.weight(0.0, 71.0).unwrap_err().is_configuration());
    assert!(model.weight(0.0, 4.0).unwrap_err().is_configuration());
}
