//! Raw code to voltage and strain conversion.

use super::config::Gain;

/// Magnitude of the most negative 24-bit code (2^23)
pub const FULL_SCALE: f32 = 8_388_608.0;

/// Sign-extend a big-endian 24-bit two's-complement sample to `i32`
pub const fn sign_extend_24(bytes: [u8; 3]) -> i32 {
    // Place the sample in the top three bytes and let the arithmetic shift
    // replicate bit 23.
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], 0]) >> 8
}

/// Differential input voltage for a raw code at the given gain
///
/// `(raw / 2^23) * (vref / 2^gain)`
pub fn raw_to_voltage(raw: i32, vref: f32, gain: Gain) -> f32 {
    (raw as f32 / FULL_SCALE) * (vref / gain.multiplier() as f32)
}

/// Quarter-bridge strain for a measured bridge output voltage
///
/// `4 * vout / (excitation * gauge_factor)`, dimensionless. Multiply by 1e6
/// for microstrain.
pub fn voltage_to_strain(vout: f32, excitation: f32, gauge_factor: f32) -> f32 {
    4.0 * vout / (excitation * gauge_factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        let diff = a - b;
        diff < tolerance && diff > -tolerance
    }

    #[test]
    fn sign_extension_covers_both_ends_of_range() {
        assert_eq!(sign_extend_24([0x80, 0x00, 0x00]), -8_388_608);
        assert_eq!(sign_extend_24([0x7F, 0xFF, 0xFF]), 8_388_607);
        assert_eq!(sign_extend_24([0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(sign_extend_24([0x00, 0x00, 0x01]), 1);
        assert_eq!(sign_extend_24([0x12, 0x34, 0x56]), 0x12_3456);
    }

    #[test]
    fn half_scale_at_unity_gain_is_half_vref() {
        assert!(close(raw_to_voltage(4_194_304, 3.3, Gain::X1), 1.65, 1e-6));
    }

    #[test]
    fn voltage_scales_inversely_with_gain() {
        let base = raw_to_voltage(1_000_000, 3.3, Gain::X1);
        for gain in Gain::ALL {
            let scaled = raw_to_voltage(1_000_000, 3.3, gain) * gain.multiplier() as f32;
            assert!(close(scaled, base, 1e-5), "gain {:?}", gain);
        }
    }

    #[test]
    fn one_millivolt_is_about_606_microstrain() {
        let strain = voltage_to_strain(0.001, 3.3, 2.0);
        assert!(close(strain, 6.0606e-4, 1e-7));
        assert!(close(strain * 1e6, 606.06, 0.01));
    }
}
