//! Tests for Money arithmetic used by settlement reconciliation

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod arithmetic_tests {
    use super::*;

    #[test]
    fn test_repeated_subtraction_is_exact() {
        let gross = Money::lira(dec!(1000.10));
        let mut net = gross;
        for _ in 0..10 {
            net = net.checked_sub(&Money::lira(dec!(0.01))).unwrap();
        }
        assert_eq!(net.amount(), dec!(1000.00));
    }

    #[test]
    fn test_zero_is_neither_positive_nor_negative() {
        let zero = Money::zero(Currency::TRY);
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
    }

    #[test]
    fn test_negative_result_is_allowed() {
        let a = Money::lira(dec!(100));
        let b = Money::lira(dec!(150));
        let diff = a.checked_sub(&b).unwrap();
        assert!(diff.is_negative());
        assert_eq!(diff.amount(), dec!(-50));
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = Money::new(Decimal::MAX, Currency::TRY);
        let result = max.checked_add(&Money::lira(dec!(1)));
        assert_eq!(result, Err(MoneyError::Overflow));
    }

    #[test]
    fn test_internal_precision_is_four_places() {
        let m = Money::lira(dec!(1.123456));
        assert_eq!(m.amount(), dec!(1.1235));
        assert_eq!(m.round_to_currency().amount(), dec!(1.12));
    }
}

mod display_tests {
    use super::*;

    #[test]
    fn test_display_uses_symbol_and_two_places() {
        let m = Money::lira(dec!(425));
        assert_eq!(m.to_string(), "₺ 425.00");
    }

    #[test]
    fn test_serde_round_trip_keeps_currency() {
        let m = Money::new(dec!(12.50), Currency::EUR);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"EUR\""));
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
