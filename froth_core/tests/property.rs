use froth_core::analyzer::{froth_stability, size_uniformity};
use froth_core::pump::INTEGRAL_LIMIT;
use froth_core::{
    BubbleObservation, FrothAnalyzer, FrothError, PumpCfg, PumpController, PumpMode,
    StabilityHistory,
};
use froth_traits::Frame;
use proptest::prelude::*;

proptest! {
    #[test]
    fn integral_stays_bounded(
        kp in 0.0f64..5.0,
        ki in 0.0f64..5.0,
        setpoint in 0.0f64..500.0,
        max in 0.0f64..=100.0,
        counts in proptest::collection::vec(0u32..2000, 1..60),
    ) {
        let mut pump = PumpController::new(PumpCfg { kp, ki, setpoint, max_pump_duty: max });
        pump.set_mode(PumpMode::Auto);
        for c in counts {
            let duty = pump.set_speed(f64::from(c)).unwrap();
            prop_assert!((0.0..=max).contains(&duty));
            prop_assert!(pump.pi().integral.abs() <= INTEGRAL_LIMIT);
        }
    }

    #[test]
    fn manual_duty_maps_to_capped_value(d in 0.0f64..=100.0, max in 0.0f64..=100.0) {
        let mut pump = PumpController::new(PumpCfg { max_pump_duty: max, ..PumpCfg::default() });
        prop_assert_eq!(pump.set_speed(d).unwrap(), d.min(max));
        prop_assert_eq!(pump.duty(), d.min(max));
    }

    #[test]
    fn manual_out_of_range_changes_nothing(
        d in prop_oneof![-1.0e6f64..-1.0e-9, 100.000_001f64..1.0e6],
        prior in 0.0f64..=80.0,
    ) {
        let mut pump = PumpController::new(PumpCfg::default());
        pump.set_speed(prior).unwrap();
        let err = pump.set_speed(d).unwrap_err();
        prop_assert!(matches!(err, FrothError::InvalidArgument(_)));
        prop_assert_eq!(pump.duty(), prior);
    }

    #[test]
    fn stability_is_a_unit_score(u in 0.0f64..1e6, c in 0.0f64..1e6, d in 0.0f64..1e6) {
        let s = froth_stability(u, c, d);
        prop_assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn analyzer_stability_in_unit_range(
        frames in proptest::collection::vec(
            proptest::collection::vec(0.0f64..5000.0, 0..300),
            1..15,
        ),
    ) {
        let mut analyzer = FrothAnalyzer::default();
        let frame = Frame::new(8, 8);
        for areas in frames {
            let obs: Vec<BubbleObservation> =
                areas.into_iter().map(BubbleObservation::from_area).collect();
            prop_assert!((0.0..=1.0).contains(&size_uniformity(&obs)));
            let m = analyzer.analyze(&frame, &obs, None, 0);
            prop_assert!((0.0..=1.0).contains(&m.froth_stability));
            prop_assert!(m.avg_bubble_size >= 0.0);
            prop_assert!(m.size_std_dev >= 0.0);
            prop_assert!(analyzer.history().len() <= analyzer.history().capacity());
        }
    }

    #[test]
    fn consistency_is_half_below_three_frames(counts in proptest::collection::vec(0usize..1000, 0..3)) {
        let mut h = StabilityHistory::new(10);
        for c in counts {
            h.push(c, 1.0);
        }
        prop_assert_eq!(h.count_consistency(), 0.5);
    }
}
