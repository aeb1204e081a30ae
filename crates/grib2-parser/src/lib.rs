//! GRIB2 parser (WMO FM 92 GRIB Edition 2).
//!
//! A pure Rust reader for the subset of GRIB2 produced by GFS for surface
//! fields: regular lat/lon grids (template 3.0), instantaneous and
//! time-processed products (templates 4.0 and 4.8) and simple packing
//! (template 5.0) with optional bitmaps.

pub mod sections;
pub mod tables;
pub mod unpacking;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::debug;

pub use sections::{
    decode_grib2_signed, Bitmap, DataRepresentation, DataSection, GridDefinition,
    Identification, Indicator, ProductDefinition, StatisticalProcess,
};
pub use tables::{Grib2Tables, LevelDescription};
pub use unpacking::unpack_simple;

const END_MARKER: &[u8; 4] = b"7777";

/// Errors raised while reading GRIB2 data.
#[derive(Error, Debug)]
pub enum Grib2Error {
    #[error("Invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Unsupported grid definition template 3.{0}")]
    UnsupportedGrid(u16),

    #[error("Unsupported data representation template 5.{0}")]
    UnsupportedPacking(u16),

    #[error("Unpacking failed: {0}")]
    UnpackingError(String),
}

/// Result type for GRIB2 operations.
pub type Result<T> = std::result::Result<T, Grib2Error>;

/// One decoded GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Message {
    /// Byte offset of the message within the source buffer
    pub offset: usize,
    pub indicator: Indicator,
    pub identification: Identification,
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    pub bitmap: Option<Bitmap>,
    pub data_section: DataSection,
}

impl Grib2Message {
    /// Parameter short name (e.g. "TMP").
    pub fn parameter(&self) -> &str {
        &self.product_definition.parameter_short_name
    }

    /// Level description (e.g. "2 m above ground").
    pub fn level(&self) -> &str {
        &self.product_definition.level_description
    }

    /// Grid dimensions as (rows, columns).
    pub fn grid_dims(&self) -> (usize, usize) {
        (
            self.grid_definition.nj as usize,
            self.grid_definition.ni as usize,
        )
    }

    /// Hour after the reference time at which the field is valid.
    pub fn valid_hour(&self) -> u32 {
        self.product_definition.valid_hour()
    }

    /// Absolute valid time.
    pub fn valid_time(&self) -> DateTime<Utc> {
        self.identification.reference_time + Duration::hours(self.valid_hour() as i64)
    }

    /// Unpack the field in source scanning order; masked points are `NaN`.
    pub fn unpack_data(&self) -> Result<Vec<f32>> {
        let repr = &self.data_representation;
        if repr.template != 0 {
            return Err(Grib2Error::UnsupportedPacking(repr.template));
        }

        let num_points = self.grid_definition.ni.saturating_mul(self.grid_definition.nj);
        let values = unpack_simple(
            &self.data_section.data,
            num_points,
            repr.bits_per_value,
            repr.reference_value,
            repr.binary_scale_factor,
            repr.decimal_scale_factor,
            self.bitmap.as_ref().map(|b| b.data.as_ref()),
        )?;

        Ok(values.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    }
}

/// Sequential reader over the messages of a GRIB2 byte buffer.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
    tables: Arc<Grib2Tables>,
}

impl Grib2Reader {
    pub fn new(data: Bytes, tables: Arc<Grib2Tables>) -> Self {
        Self {
            data,
            offset: 0,
            tables,
        }
    }

    /// Decode the next message, or `None` once no "GRIB" marker remains.
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>> {
        let Some(start) = find_marker(&self.data, self.offset) else {
            self.offset = self.data.len();
            return Ok(None);
        };

        // Skip past this marker even if the message turns out to be invalid
        self.offset = start + 4;

        let indicator = sections::parse_indicator(&self.data[start..])?;
        let length = usize::try_from(indicator.message_length)
            .map_err(|_| Grib2Error::InvalidFormat("Message length overflows".to_string()))?;

        if length < 16 + END_MARKER.len() || start + length > self.data.len() {
            return Err(Grib2Error::InvalidFormat(format!(
                "Message at offset {} declares {} bytes but only {} remain",
                start,
                length,
                self.data.len() - start
            )));
        }

        let end = start + length;
        if &self.data[end - 4..end] != END_MARKER {
            return Err(Grib2Error::InvalidFormat(format!(
                "Message at offset {} is missing its end marker",
                start
            )));
        }

        self.offset = end;

        let message = self.data.slice(start..end);
        let bytes = message.as_ref();

        let parsed = Grib2Message {
            offset: start,
            identification: sections::parse_identification(bytes)?,
            grid_definition: sections::parse_grid_definition(bytes)?,
            product_definition: sections::parse_product_definition(
                bytes,
                indicator.discipline,
                &self.tables,
            )?,
            data_representation: sections::parse_data_representation(bytes)?,
            bitmap: sections::parse_bitmap(bytes)?,
            data_section: sections::parse_data_section(bytes)?,
            indicator,
        };

        debug!(
            offset = start,
            length = length,
            parameter = %parsed.parameter(),
            level = %parsed.level(),
            valid_hour = parsed.valid_hour(),
            "Decoded GRIB2 message"
        );

        Ok(Some(parsed))
    }
}

impl Iterator for Grib2Reader {
    type Item = Result<Grib2Message>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_message().transpose()
    }
}

/// True when the buffer starts with a GRIB indicator.
pub fn is_grib2(data: &[u8]) -> bool {
    data.len() >= 8 && &data[0..4] == b"GRIB" && data[7] == 2
}

fn find_marker(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(4)
        .position(|w| w == b"GRIB")
        .map(|pos| from + pos)
}
