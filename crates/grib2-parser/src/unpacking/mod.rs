//! GRIB2 data unpacking.
//!
//! Only simple packing (template 5.0) is implemented; it is what GFS uses for
//! the surface fields this pipeline reads.

use crate::Grib2Error;

/// Unpack simple packed GRIB2 data.
///
/// `value = (R + X * 2^E) * 10^(-D)`
///
/// `num_points` is the number of grid points. With a bitmap, only points whose
/// bit is set consume a packed value; the others are returned as `None`.
pub fn unpack_simple(
    packed_data: &[u8],
    num_points: u32,
    bits_per_value: u8,
    reference_value: f32,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    bitmap: Option<&[u8]>,
) -> Result<Vec<Option<f32>>, Grib2Error> {
    let num_points = num_points as usize;
    let binary_scale = 2.0_f64.powi(binary_scale_factor as i32);
    let decimal_scale = 10.0_f64.powi(-(decimal_scale_factor as i32));
    let reference = reference_value as f64;

    let mut values = Vec::with_capacity(num_points);
    let mut bit_position = 0;
    let bits_per_value = bits_per_value as usize;

    for i in 0..num_points {
        let present = match bitmap {
            Some(bm) => {
                // 1 bit per grid point, MSB first, 1 = value present
                let byte_idx = i / 8;
                let bit_idx = 7 - (i % 8);
                match bm.get(byte_idx) {
                    Some(byte) => (byte >> bit_idx) & 1 == 1,
                    None => {
                        return Err(Grib2Error::UnpackingError(format!(
                            "Bitmap too short for {} points",
                            num_points
                        )))
                    }
                }
            }
            None => true,
        };

        if !present {
            values.push(None);
            continue;
        }

        let packed_value = if bits_per_value == 0 {
            0
        } else {
            let v = extract_bits(packed_data, bit_position, bits_per_value)
                .map_err(|e| Grib2Error::UnpackingError(format!("Failed to extract bits: {}", e)))?;
            bit_position += bits_per_value;
            v
        };

        let value = (reference + packed_value as f64 * binary_scale) * decimal_scale;
        values.push(Some(value as f32));
    }

    Ok(values)
}

/// Extract bits from a byte array, MSB first.
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> Result<u32, String> {
    if num_bits > 32 || num_bits == 0 {
        return Err(format!("Invalid number of bits: {}", num_bits));
    }

    let mut result = 0u32;

    for i in 0..num_bits {
        let absolute_bit = start_bit + i;
        let byte_idx = absolute_bit / 8;
        let bit_idx = 7 - (absolute_bit % 8);

        let byte = data
            .get(byte_idx)
            .ok_or_else(|| "Not enough data to extract bits".to_string())?;

        result = (result << 1) | ((byte >> bit_idx) & 1) as u32;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bits() {
        let data = vec![0b10110101];

        assert_eq!(extract_bits(&data, 0, 2).unwrap(), 0b10);
        assert_eq!(extract_bits(&data, 2, 2).unwrap(), 0b11);
        assert_eq!(extract_bits(&data, 0, 8).unwrap(), 0b10110101);
        assert!(extract_bits(&data, 4, 8).is_err());
    }

    #[test]
    fn test_simple_unpacking() {
        let packed = vec![100, 200];
        let vals = unpack_simple(&packed, 2, 8, 0.0, 0, 0, None).unwrap();
        assert_eq!(vals.len(), 2);
        assert!((vals[0].unwrap() - 100.0).abs() < 0.1);
        assert!((vals[1].unwrap() - 200.0).abs() < 0.1);
    }

    #[test]
    fn test_scale_factors() {
        // R = 2730, E = -1, D = 1: (2730 + 20 * 0.5) / 10 = 274.0
        let vals = unpack_simple(&[20], 1, 8, 2730.0, -1, 1, None).unwrap();
        assert!((vals[0].unwrap() - 274.0).abs() < 1e-4);
    }

    #[test]
    fn test_bitmap_skips_missing_points() {
        // points 0 and 2 present, point 1 masked; only two packed values
        let bitmap = [0b1010_0000];
        let vals = unpack_simple(&[5, 7], 3, 8, 0.0, 0, 0, Some(&bitmap)).unwrap();
        assert_eq!(vals, vec![Some(5.0), None, Some(7.0)]);
    }

    #[test]
    fn test_constant_field() {
        let vals = unpack_simple(&[], 4, 0, 12.5, 0, 0, None).unwrap();
        assert_eq!(vals, vec![Some(12.5); 4]);
    }
}
