//! GRIB2 section parsing.
//!
//! Each parser takes the bytes of one complete message (starting at "GRIB")
//! and locates its section by walking the section length headers.

use crate::tables::Grib2Tables;
use crate::Grib2Error;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub table_version: u8,
    pub local_table_version: u8,
    pub significance_of_reference_time: u8,
    pub reference_time: DateTime<Utc>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 3: Grid Definition Section (template 3.0, regular lat/lon)
///
/// Angles are in degrees as encoded, longitudes not yet normalized.
#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub template: u16,
    pub num_points: u32,
    pub ni: u32,
    pub nj: u32,
    pub first_latitude: f64,
    pub first_longitude: f64,
    pub last_latitude: f64,
    pub last_longitude: f64,
    pub i_increment: f64,
    pub j_increment: f64,
    pub scanning_mode: u8,
}

/// Statistical processing over a time range (template 4.8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticalProcess {
    /// Code table 4.10 (0 = average, 1 = accumulation, 2 = maximum, ...)
    pub process: u8,
    /// Length of the processed interval in hours
    pub length_hours: u32,
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub parameter_short_name: String,
    pub level_type: u8,
    pub level_value: u32,
    pub level_description: String,
    /// Forecast time in hours (start of interval for statistical products)
    pub forecast_hour: u32,
    pub statistical: Option<StatisticalProcess>,
}

impl ProductDefinition {
    /// Hour at which the product is valid (end of interval when processed).
    pub fn valid_hour(&self) -> u32 {
        match self.statistical {
            Some(stat) => self.forecast_hour + stat.length_hours,
            None => self.forecast_hour,
        }
    }
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    pub num_data_points: u32,
    pub template: u16,
    pub original_data_type: u8,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub indicator: u8,
    pub data: Bytes,
}

/// Section 7: Data Section
#[derive(Debug, Clone)]
pub struct DataSection {
    pub data: Bytes,
}

// ===== Signed value decoding =====

/// Decode a 4-byte GRIB2 sign-magnitude integer.
///
/// The most significant bit is the sign and the remaining 31 bits the
/// magnitude. Slices that are not exactly 4 bytes decode to 0.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    let Ok(raw) = <[u8; 4]>::try_from(bytes) else {
        return 0;
    };
    let value = u32::from_be_bytes(raw);
    let magnitude = (value & 0x7FFF_FFFF) as i32;
    if value & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a 2-byte GRIB2 sign-magnitude integer (scale factors).
pub fn decode_grib2_signed_i16(hi: u8, lo: u8) -> i16 {
    let value = u16::from_be_bytes([hi, lo]);
    let magnitude = (value & 0x7FFF) as i16;
    if value & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a 1-byte GRIB2 sign-magnitude integer.
pub fn decode_grib2_signed_i8(value: u8) -> i8 {
    let magnitude = (value & 0x7F) as i8;
    if value & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from start of message
pub fn parse_indicator(data: &[u8]) -> Result<Indicator, Grib2Error> {
    if data.len() < 16 {
        return Err(Grib2Error::InvalidFormat(
            "Not enough data for indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "Invalid GRIB magic bytes".to_string(),
        ));
    }

    // Octets 5-6 reserved, 7 discipline, 8 edition, 9-16 total length
    let discipline = data[6];
    let edition = data[7];

    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "Expected GRIB edition 2, got {}",
            edition
        )));
    }

    let message_length = u64::from_be_bytes([
        data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
    ]);

    Ok(Indicator {
        discipline,
        edition,
        message_length,
    })
}

/// Parse Section 1 (Identification), located at offset 16 in the message
pub fn parse_identification(data: &[u8]) -> Result<Identification, Grib2Error> {
    let section = find_section(data, 1)?;

    if section.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 1,
            reason: "Not enough data".to_string(),
        });
    }

    let sec_data = &section[5..];

    let center = u16::from_be_bytes([sec_data[0], sec_data[1]]);
    let sub_center = u16::from_be_bytes([sec_data[2], sec_data[3]]);

    let year = u16::from_be_bytes([sec_data[7], sec_data[8]]);
    let month = sec_data[9];
    let day = sec_data[10];
    let hour = sec_data[11];
    let minute = sec_data[12];
    let second = sec_data[13];

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| Grib2Error::InvalidSection {
            section: 1,
            reason: format!(
                "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })?;

    Ok(Identification {
        center,
        sub_center,
        table_version: sec_data[4],
        local_table_version: sec_data[5],
        significance_of_reference_time: sec_data[6],
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
        production_status: sec_data.get(14).copied().unwrap_or(0),
        data_type: sec_data.get(15).copied().unwrap_or(0),
    })
}

/// Parse Section 3 (Grid Definition)
pub fn parse_grid_definition(data: &[u8]) -> Result<GridDefinition, Grib2Error> {
    let section_data = find_section(data, 3)?;

    if section_data.len() < 14 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: "Not enough data".to_string(),
        });
    }

    // Bytes 6-9: number of data points, 12-13: template number, 14+: template
    let num_points = u32::from_be_bytes([
        section_data[6],
        section_data[7],
        section_data[8],
        section_data[9],
    ]);
    let template = u16::from_be_bytes([section_data[12], section_data[13]]);

    if template != 0 {
        return Err(Grib2Error::UnsupportedGrid(template));
    }

    let gd = &section_data[14..];
    if gd.len() < 58 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!("Template 0 needs at least 58 bytes, got {}", gd.len()),
        });
    }

    // Template 3.0 layout relative to the template start:
    // 16-19 Ni, 20-23 Nj, 24-27 basic angle, 28-31 subdivisions,
    // 32-35 La1, 36-39 Lo1, 40 flags, 41-44 La2, 45-48 Lo2,
    // 49-52 Di, 53-56 Dj, 57 scanning mode
    let ni = u32::from_be_bytes([gd[16], gd[17], gd[18], gd[19]]);
    let nj = u32::from_be_bytes([gd[20], gd[21], gd[22], gd[23]]);
    let basic_angle = u32::from_be_bytes([gd[24], gd[25], gd[26], gd[27]]);
    let subdivisions = u32::from_be_bytes([gd[28], gd[29], gd[30], gd[31]]);

    let unit = if basic_angle == 0 || basic_angle == u32::MAX || subdivisions == u32::MAX {
        1e-6
    } else {
        basic_angle as f64 / subdivisions.max(1) as f64
    };

    let la1 = decode_grib2_signed(&gd[32..36]) as f64 * unit;
    let lo1 = decode_grib2_signed(&gd[36..40]) as f64 * unit;
    let la2 = decode_grib2_signed(&gd[41..45]) as f64 * unit;
    let lo2 = decode_grib2_signed(&gd[45..49]) as f64 * unit;
    let di_raw = u32::from_be_bytes([gd[49], gd[50], gd[51], gd[52]]);
    let dj_raw = u32::from_be_bytes([gd[53], gd[54], gd[55], gd[56]]);

    // Increments flagged missing are derived from the corner points
    let i_increment = if di_raw == u32::MAX {
        span_increment(lo1, lo2, ni)
    } else {
        di_raw as f64 * unit
    };
    let j_increment = if dj_raw == u32::MAX {
        span_increment(la1, la2, nj)
    } else {
        dj_raw as f64 * unit
    };

    Ok(GridDefinition {
        template,
        num_points,
        ni,
        nj,
        first_latitude: la1,
        first_longitude: lo1,
        last_latitude: la2,
        last_longitude: lo2,
        i_increment,
        j_increment,
        scanning_mode: gd[57],
    })
}

/// Parse Section 4 (Product Definition), templates 4.0 and 4.8
pub fn parse_product_definition(
    data: &[u8],
    discipline: u8,
    tables: &Grib2Tables,
) -> Result<ProductDefinition, Grib2Error> {
    let section_data = find_section(data, 4)?;

    if section_data.len() < 34 {
        return Err(Grib2Error::InvalidSection {
            section: 4,
            reason: "Not enough data".to_string(),
        });
    }

    // Bytes 7-8: template, 9: category, 10: number, 17: time unit,
    // 18-21: forecast time, 22: first surface type, 23: scale, 24-27: value
    let template = u16::from_be_bytes([section_data[7], section_data[8]]);
    if template != 0 && template != 8 {
        return Err(Grib2Error::InvalidSection {
            section: 4,
            reason: format!("Unsupported product definition template 4.{}", template),
        });
    }

    let parameter_category = section_data[9];
    let parameter_number = section_data[10];
    let time_unit = section_data[17];
    let forecast_time = u32::from_be_bytes([
        section_data[18],
        section_data[19],
        section_data[20],
        section_data[21],
    ]);
    let forecast_hour = hours_from_unit(forecast_time, time_unit)?;

    let level_type = section_data[22];
    let scale_factor = decode_grib2_signed_i8(section_data[23]);
    let scaled_value = u32::from_be_bytes([
        section_data[24],
        section_data[25],
        section_data[26],
        section_data[27],
    ]);
    let level_value = scale_level(scaled_value, scale_factor);

    // Template 4.8 appends the interval end time and one or more time ranges;
    // the first range (bytes 46-57) describes the processing we need.
    let statistical = if template == 8 {
        if section_data.len() < 58 {
            return Err(Grib2Error::InvalidSection {
                section: 4,
                reason: "Template 8 time range truncated".to_string(),
            });
        }
        let length = u32::from_be_bytes([
            section_data[49],
            section_data[50],
            section_data[51],
            section_data[52],
        ]);
        Some(StatisticalProcess {
            process: section_data[46],
            length_hours: hours_from_unit(length, section_data[48])?,
        })
    } else {
        None
    };

    Ok(ProductDefinition {
        template,
        parameter_category,
        parameter_number,
        parameter_short_name: tables.get_parameter_name(
            discipline,
            parameter_category,
            parameter_number,
        ),
        level_type,
        level_value,
        level_description: tables.get_level_description(level_type, level_value),
        forecast_hour,
        statistical,
    })
}

/// Parse Section 5 (Data Representation)
pub fn parse_data_representation(data: &[u8]) -> Result<DataRepresentation, Grib2Error> {
    let section_data = find_section(data, 5)?;

    if section_data.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 5,
            reason: "Not enough data".to_string(),
        });
    }

    // 5-8: number of packed values, 9-10: template,
    // template 5.0: 11-14 R (IEEE float), 15-16 E, 17-18 D, 19 bits, 20 type
    let num_data_points = u32::from_be_bytes([
        section_data[5],
        section_data[6],
        section_data[7],
        section_data[8],
    ]);
    let template = u16::from_be_bytes([section_data[9], section_data[10]]);

    Ok(DataRepresentation {
        num_data_points,
        template,
        reference_value: f32::from_be_bytes([
            section_data[11],
            section_data[12],
            section_data[13],
            section_data[14],
        ]),
        binary_scale_factor: decode_grib2_signed_i16(section_data[15], section_data[16]),
        decimal_scale_factor: decode_grib2_signed_i16(section_data[17], section_data[18]),
        bits_per_value: section_data[19],
        original_data_type: section_data[20],
    })
}

/// Parse Section 6 (Bitmap). Returns `None` when no bitmap applies.
pub fn parse_bitmap(data: &[u8]) -> Result<Option<Bitmap>, Grib2Error> {
    let section_data = find_section(data, 6)?;

    if section_data.len() < 6 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "Not enough data".to_string(),
        });
    }

    let section_length = section_length(section_data);
    if section_length < 6 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "Bitmap section shorter than its header".to_string(),
        });
    }
    let indicator = section_data[5];

    match indicator {
        255 => Ok(None),
        0 => Ok(Some(Bitmap {
            indicator,
            data: Bytes::copy_from_slice(&section_data[6..section_length]),
        })),
        other => Err(Grib2Error::InvalidSection {
            section: 6,
            reason: format!("Unsupported bitmap indicator {}", other),
        }),
    }
}

/// Parse Section 7 (Data)
pub fn parse_data_section(data: &[u8]) -> Result<DataSection, Grib2Error> {
    let section_data = find_section(data, 7)?;
    let section_length = section_length(section_data);

    Ok(DataSection {
        data: Bytes::copy_from_slice(&section_data[5..section_length]),
    })
}

// ===== Helper Functions =====

fn section_length(section: &[u8]) -> usize {
    u32::from_be_bytes([section[0], section[1], section[2], section[3]]) as usize
}

/// Find a section by number within a message and return exactly its bytes.
fn find_section(data: &[u8], section_num: u8) -> Result<&[u8], Grib2Error> {
    let mut offset = 16; // After Section 0

    loop {
        if offset + 4 <= data.len() && &data[offset..offset + 4] == b"7777" {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Reached end of message without finding section".to_string(),
            });
        }

        if offset + 5 > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Section not found".to_string(),
            });
        }

        let length = section_length(&data[offset..]);
        if length < 5 || offset + length > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Invalid section length".to_string(),
            });
        }

        if data[offset + 4] == section_num {
            return Ok(&data[offset..offset + length]);
        }

        offset += length;
    }
}

fn span_increment(first: f64, last: f64, count: u32) -> f64 {
    if count > 1 {
        (last - first).abs() / (count - 1) as f64
    } else {
        0.0
    }
}

/// Convert a time value in Code Table 4.4 units into hours.
fn hours_from_unit(value: u32, unit: u8) -> Result<u32, Grib2Error> {
    let hours = match unit {
        0 => value / 60,
        1 => value,
        2 => value.saturating_mul(24),
        10 => value.saturating_mul(3),
        11 => value.saturating_mul(6),
        12 => value.saturating_mul(12),
        13 => value / 3600,
        other => {
            return Err(Grib2Error::InvalidSection {
                section: 4,
                reason: format!("Unsupported time range unit {}", other),
            })
        }
    };
    Ok(hours)
}

fn scale_level(scaled_value: u32, scale_factor: i8) -> u32 {
    if scaled_value == u32::MAX {
        return 0;
    }
    match scale_factor {
        0 => scaled_value,
        s if s > 0 => 10u32
            .checked_pow(s as u32)
            .map_or(0, |divisor| scaled_value / divisor),
        s => 10u32
            .checked_pow(s.unsigned_abs() as u32)
            .map_or(u32::MAX, |factor| scaled_value.saturating_mul(factor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_i16() {
        assert_eq!(decode_grib2_signed_i16(0x00, 0x05), 5);
        assert_eq!(decode_grib2_signed_i16(0x80, 0x05), -5);
    }

    #[test]
    fn test_hours_from_unit() {
        assert_eq!(hours_from_unit(180, 0).unwrap(), 3);
        assert_eq!(hours_from_unit(2, 2).unwrap(), 48);
        assert_eq!(hours_from_unit(4, 11).unwrap(), 24);
        assert!(hours_from_unit(1, 99).is_err());
    }

    #[test]
    fn test_scale_level() {
        assert_eq!(scale_level(2, 0), 2);
        assert_eq!(scale_level(100, 2), 1);
        assert_eq!(scale_level(u32::MAX, 0), 0);
    }
}
