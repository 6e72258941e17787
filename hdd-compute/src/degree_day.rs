/// Base temperature for heating demand, in °F.
pub const HDD_BASE_FAHRENHEIT: f64 = 65.0;

const KELVIN_AT_FREEZING: f64 = 273.15;

pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    (kelvin - KELVIN_AT_FREEZING) * 1.8 + 32.0
}

/// Heating degree days for a daily mean temperature in °F, clipped at zero.
/// Missing values stay missing.
pub fn heating_degree_days(mean_fahrenheit: f64) -> f64 {
    if mean_fahrenheit.is_nan() {
        return f64::NAN;
    }
    (HDD_BASE_FAHRENHEIT - mean_fahrenheit).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelvin_to_fahrenheit_fixed_points() {
        assert_eq!(kelvin_to_fahrenheit(273.15), 32.0);
        assert!((kelvin_to_fahrenheit(373.15) - 212.0).abs() < 1e-9);
    }

    #[test]
    fn test_hdd_is_never_negative() {
        let mut t = -80.0;
        while t <= 140.0 {
            assert!(heating_degree_days(t) >= 0.0, "negative HDD at {t}");
            t += 0.5;
        }
        assert_eq!(heating_degree_days(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_hdd_values() {
        assert_eq!(heating_degree_days(65.0), 0.0);
        assert_eq!(heating_degree_days(80.0), 0.0);
        assert_eq!(heating_degree_days(40.0), 25.0);
        assert!(heating_degree_days(f64::NAN).is_nan());
    }
}
