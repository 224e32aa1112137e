//! Exponential Moving Average.
//!
//! k = 2/(span+1), seeded with the first value, then
//! EMA[i] = X[i]*k + EMA[i-1]*(1-k). No warmup: every output is defined.

pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);

    for &value in &values[1..] {
        ema = value * k + ema * (1.0 - k);
        out.push(ema);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ema_seed_is_first_value() {
        let ema = calculate_ema(&[10.0, 20.0, 30.0], 3);
        assert_relative_eq!(ema[0], 10.0);
    }

    #[test]
    fn ema_recursive_calculation() {
        let ema = calculate_ema(&[10.0, 20.0, 30.0, 40.0], 3);
        let k = 2.0 / 4.0;
        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        let e3 = 40.0 * k + e2 * (1.0 - k);
        assert_eq!(ema.len(), 4);
        assert_relative_eq!(ema[1], e1);
        assert_relative_eq!(ema[2], e2);
        assert_relative_eq!(ema[3], e3);
    }

    #[test]
    fn ema_span_1_tracks_input() {
        let ema = calculate_ema(&[10.0, 20.0, 5.0], 1);
        assert_eq!(ema, vec![10.0, 20.0, 5.0]);
    }

    #[test]
    fn ema_equal_values() {
        let ema = calculate_ema(&[100.0; 6], 40);
        for v in ema {
            assert_relative_eq!(v, 100.0);
        }
    }

    #[test]
    fn ema_fast_reacts_more_than_slow() {
        let mut values = vec![100.0; 10];
        values.push(120.0);
        let fast = calculate_ema(&values, 6);
        let slow = calculate_ema(&values, 40);
        assert!(fast[10] > slow[10]);
    }

    #[test]
    fn ema_empty_and_span_0() {
        assert!(calculate_ema(&[], 6).is_empty());
        assert!(calculate_ema(&[1.0, 2.0], 0).is_empty());
    }
}
