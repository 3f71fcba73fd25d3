//! Request-rate to difficulty mapping.

/// Difficulty for a client's decayed request intensity: one level per 10
/// requests up to level 22, then one further level per 100 requests.
/// Never below 1.
pub fn difficulty_for_rate(request_count: f64) -> i32 {
    if request_count <= 220.0 {
        ((request_count / 10.0).ceil() as i32).max(1)
    } else {
        22 + ((request_count - 220.0) / 100.0) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_rates_floor_at_one() {
        assert_eq!(difficulty_for_rate(0.0), 1);
        assert_eq!(difficulty_for_rate(1.0), 1);
        assert_eq!(difficulty_for_rate(9.9), 1);
    }

    #[test]
    fn test_one_level_per_ten_requests() {
        assert_eq!(difficulty_for_rate(10.0), 1);
        assert_eq!(difficulty_for_rate(10.1), 2);
        assert_eq!(difficulty_for_rate(100.0), 10);
        assert_eq!(difficulty_for_rate(220.0), 22);
    }

    #[test]
    fn test_slow_growth_past_220() {
        assert_eq!(difficulty_for_rate(221.0), 22);
        assert_eq!(difficulty_for_rate(320.0), 23);
        assert_eq!(difficulty_for_rate(1020.0), 30);
    }

    #[test]
    fn test_monotone_nondecreasing() {
        let mut previous = 0;
        for tenth in 0..5000 {
            let difficulty = difficulty_for_rate(tenth as f64 / 10.0);
            assert!(difficulty >= previous);
            previous = difficulty;
        }
    }
}
