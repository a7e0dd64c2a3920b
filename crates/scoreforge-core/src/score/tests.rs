//! Tests for score types.

use super::*;

mod simple_score {
    use super::*;

    #[test]
    fn test_ordering_and_feasibility() {
        assert!(SimpleScore::of(-3) > SimpleScore::of(-5));
        assert!(SimpleScore::of(0).is_feasible());
        assert!(!SimpleScore::of(-1).is_feasible());
    }

    #[test]
    fn test_scale_is_exact() {
        let weight = SimpleScore::of(7);
        assert_eq!(weight.checked_scale(3), Some(SimpleScore::of(21)));
        assert_eq!(weight.checked_scale(-2), Some(SimpleScore::of(-14)));
        assert_eq!(weight.checked_scale(0), Some(SimpleScore::ZERO));
        assert_eq!(weight.checked_scale(i64::MAX), None);
    }

    #[test]
    fn test_checked_add_and_sub_catch_overflow() {
        let top = SimpleScore::of(i64::MAX);
        assert_eq!(top.checked_add(&SimpleScore::of(1)), None);
        assert_eq!(top.checked_sub(&SimpleScore::of(1)), Some(SimpleScore::of(i64::MAX - 1)));
        assert_eq!(SimpleScore::of(i64::MIN).checked_sub(&SimpleScore::of(1)), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(SimpleScore::parse("42").unwrap(), SimpleScore::of(42));
        assert_eq!(SimpleScore::parse(" -10 ").unwrap(), SimpleScore::of(-10));
        assert_eq!(SimpleScore::parse("0").unwrap(), SimpleScore::ZERO);
        assert!(SimpleScore::parse("ten").is_err());
    }

    #[test]
    fn test_level_label() {
        assert_eq!(SimpleScore::level_label(0), Some(ScoreLevel::Soft));
        assert_eq!(SimpleScore::level_label(1), None);
        assert!(!SimpleScore::of(-4).has_hard_component());
    }
}

mod hard_soft_score {
    use super::*;

    #[test]
    fn test_hard_dominates_soft() {
        assert!(HardSoftScore::of(0, -1000) > HardSoftScore::of(-1, 0));
        assert!(HardSoftScore::of(-1, 5) > HardSoftScore::of(-1, 4));
    }

    #[test]
    fn test_arithmetic_round_trips() {
        let a = HardSoftScore::of(-2, 10);
        let b = HardSoftScore::of(1, -3);
        assert_eq!(a + b - b, a);
        assert_eq!(-a, HardSoftScore::of(2, -10));
        assert_eq!(a.abs(), HardSoftScore::of(2, 10));
    }

    #[test]
    fn test_parse_and_repr() {
        let score = HardSoftScore::parse("-1hard/-20soft").unwrap();
        assert_eq!(score, HardSoftScore::of(-1, -20));
        assert_eq!(score.to_string_repr(), "-1hard/-20soft");
        assert_eq!(score.to_string(), "-1hard/-20soft");
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(HardSoftScore::parse("1hard").is_err());
        assert!(HardSoftScore::parse("1hard/2soft/3soft").is_err());
        assert!(HardSoftScore::parse("1soft/2hard").is_err());
    }

    #[test]
    fn test_feasibility_reads_only_hard_levels() {
        assert!(HardSoftScore::of(0, -50).is_feasible());
        assert!(!HardSoftScore::of(-1, 50).is_feasible());
    }

    #[test]
    fn test_debug_and_sum() {
        assert_eq!(format!("{:?}", HardSoftScore::of(-1, 2)), "HardSoftScore(-1, 2)");
        let total: HardSoftScore = [HardSoftScore::ONE_HARD, HardSoftScore::of_soft(-3)]
            .into_iter()
            .sum();
        assert_eq!(total, HardSoftScore::of(1, -3));
    }

    #[test]
    fn test_hard_component() {
        assert!(HardSoftScore::ONE_HARD.has_hard_component());
        assert!(!HardSoftScore::ONE_SOFT.has_hard_component());
    }
}

mod hard_medium_soft_score {
    use super::*;

    #[test]
    fn test_level_ordering() {
        let a = HardMediumSoftScore::of(0, -10, -100);
        let b = HardMediumSoftScore::of(0, -5, -200);
        assert!(b > a);
        assert!(HardMediumSoftScore::of(1, -50, -50) > b);
    }

    #[test]
    fn test_parse() {
        let score = HardMediumSoftScore::parse("0hard/-2medium/3soft").unwrap();
        assert_eq!(score, HardMediumSoftScore::of(0, -2, 3));
        assert_eq!(score.to_level_numbers(), vec![0, -2, 3]);
        assert_eq!(HardMediumSoftScore::from_level_numbers(&[0, -2, 3]), Some(score));
        assert_eq!(HardMediumSoftScore::from_level_numbers(&[0, -2]), None);
    }
}
