//! Synthetic GRIB2 message builder.
//!
//! Produces structurally valid GRIB2 messages (sections 0-8) with simple
//! 16-bit packing. Coordinates and scale factors are sign-magnitude encoded
//! like real GFS output, so southern latitudes round-trip.

/// Encode a GRIB2 4-byte sign-magnitude integer.
pub fn encode_signed_i32(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs() & 0x7FFF_FFFF;
    let raw = if value < 0 {
        magnitude | 0x8000_0000
    } else {
        magnitude
    };
    raw.to_be_bytes()
}

/// Encode a GRIB2 2-byte sign-magnitude integer.
pub fn encode_signed_i16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let raw = if value < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}

fn micro(degrees: f64) -> i32 {
    (degrees * 1e6).round() as i32
}

/// Build a single GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    // Grid definition
    ni: u32,
    nj: u32,
    first_lat: f64,
    first_lon: f64,
    step: f64,
    scanning_mode: u8,
    // Product definition
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_value: u32,
    forecast_hour: u32,
    /// Statistical process and interval length for template 4.8
    interval: Option<(u8, u32)>,
    // Data representation
    packing_template: u16,
    data_values: Vec<f32>,
}

impl Grib2Builder {
    /// 2 m temperature over a small 0.25 degree grid north-west of Nairobi.
    pub fn new_gfs() -> Self {
        let ni = 8;
        let nj = 6;
        Self {
            discipline: 0,
            center: 7, // NCEP
            year: 2026,
            month: 2,
            day: 9,
            hour: 0,
            ni,
            nj,
            first_lat: 0.125,
            first_lon: 36.125,
            step: 0.25,
            scanning_mode: 0b0000_0000, // +i, -j, i consecutive
            param_category: 0,
            param_number: 0, // TMP
            level_type: 103,
            level_value: 2,
            forecast_hour: 0,
            interval: None,
            packing_template: 0,
            data_values: vec![298.15; (ni * nj) as usize],
        }
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    /// Grid of `ni` x `nj` points starting at (`first_lon`, `first_lat`).
    pub fn with_grid(mut self, ni: u32, nj: u32, first_lon: f64, first_lat: f64, step: f64) -> Self {
        self.ni = ni;
        self.nj = nj;
        self.first_lon = first_lon;
        self.first_lat = first_lat;
        self.step = step;
        self.data_values = vec![0.0; (ni * nj) as usize];
        self
    }

    pub fn with_scanning_mode(mut self, flags: u8) -> Self {
        self.scanning_mode = flags;
        self
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_value = level_value;
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.forecast_hour = hour;
        self
    }

    /// Use template 4.8 with statistical process `process` over `length_hours`
    /// ending at the forecast hour given by `with_forecast_hour`.
    pub fn with_interval(mut self, process: u8, length_hours: u32) -> Self {
        self.interval = Some((process, length_hours));
        self
    }

    pub fn with_packing_template(mut self, template: u16) -> Self {
        self.packing_template = template;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; (self.ni * self.nj) as usize];
        self
    }

    /// Values in source scanning order. `NaN` entries are written as
    /// bitmap-masked points.
    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data;
        self
    }

    /// Fill values from a function of (lon, lat), honouring the scanning mode.
    pub fn with_field(mut self, f: impl Fn(f64, f64) -> f32) -> Self {
        let i_negative = self.scanning_mode & 0x80 != 0;
        let j_positive = self.scanning_mode & 0x40 != 0;
        let lon_step = if i_negative { -self.step } else { self.step };
        let lat_step = if j_positive { self.step } else { -self.step };

        self.data_values = (0..self.nj)
            .flat_map(|j| (0..self.ni).map(move |i| (i, j)))
            .map(|(i, j)| {
                let lon = self.first_lon + i as f64 * lon_step;
                let lat = self.first_lat + j as f64 * lat_step;
                f(lon, lat)
            })
            .collect();
        self
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let sections = [
            self.build_section1(),
            self.build_section3(),
            self.build_section4(),
            self.build_section5(),
            self.build_section6(),
            self.build_section7(),
        ];

        let message_length: usize = 16 + sections.iter().map(Vec::len).sum::<usize>() + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(2);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());

        for section in &sections {
            message.extend_from_slice(section);
        }

        message.extend_from_slice(b"7777");
        message
    }

    fn present_values(&self) -> Vec<f32> {
        self.data_values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect()
    }

    fn has_missing(&self) -> bool {
        self.data_values.iter().any(|v| v.is_nan())
    }

    /// (reference value, binary scale factor, bits per value)
    fn packing_parameters(&self) -> (f32, i16, u8) {
        let present = self.present_values();
        let (min_val, max_val) = present.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), &v| (min.min(v), max.max(v)),
        );

        if present.is_empty() {
            return (0.0, 0, 0);
        }

        let range = max_val - min_val;
        if range == 0.0 {
            return (min_val, 0, 0);
        }

        // 2^E = range / 65535 rounded up so every value fits in 16 bits
        let binary_scale_factor = (range / 65535.0).log2().ceil() as i16;
        (min_val, binary_scale_factor, 16)
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(1);
        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // sub-center
        section.push(2); // master table version
        section.push(1); // local table version
        section.push(1); // significance: start of forecast
        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(0);
        section.push(0);
        section.push(0); // operational
        section.push(1); // forecast
        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&(14u32 + 58).to_be_bytes());
        section.push(3);
        section.push(0); // source of grid definition
        section.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        section.push(0);
        section.push(0);
        section.extend_from_slice(&0u16.to_be_bytes()); // template 3.0

        section.push(6); // spherical earth, radius 6371229 m
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        let i_negative = self.scanning_mode & 0x80 != 0;
        let j_positive = self.scanning_mode & 0x40 != 0;
        let last_lon = self.first_lon
            + if i_negative { -1.0 } else { 1.0 } * (self.ni - 1) as f64 * self.step;
        let last_lat = self.first_lat
            + if j_positive { 1.0 } else { -1.0 } * (self.nj - 1) as f64 * self.step;
        let first_lon = self.first_lon.rem_euclid(360.0);
        let last_lon = last_lon.rem_euclid(360.0);

        section.extend_from_slice(&self.ni.to_be_bytes());
        section.extend_from_slice(&self.nj.to_be_bytes());
        section.extend_from_slice(&0u32.to_be_bytes()); // basic angle
        section.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes()); // subdivisions
        section.extend_from_slice(&encode_signed_i32(micro(self.first_lat)));
        section.extend_from_slice(&encode_signed_i32(micro(first_lon)));
        section.push(48); // resolution and component flags
        section.extend_from_slice(&encode_signed_i32(micro(last_lat)));
        section.extend_from_slice(&encode_signed_i32(micro(last_lon)));
        section.extend_from_slice(&(micro(self.step) as u32).to_be_bytes());
        section.extend_from_slice(&(micro(self.step) as u32).to_be_bytes());
        section.push(self.scanning_mode);
        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let template: u16 = if self.interval.is_some() { 8 } else { 0 };
        let length: u32 = if self.interval.is_some() { 58 } else { 34 };

        // Template 4.8 carries the start of the interval as forecast time
        let forecast_time = match self.interval {
            Some((_, hours)) => self.forecast_hour.saturating_sub(hours),
            None => self.forecast_hour,
        };

        let mut section = Vec::new();
        section.extend_from_slice(&length.to_be_bytes());
        section.push(4);
        section.extend_from_slice(&0u16.to_be_bytes());
        section.extend_from_slice(&template.to_be_bytes());
        section.push(self.param_category);
        section.push(self.param_number);
        section.push(2); // forecast
        section.push(0);
        section.push(96); // GFS generating process
        section.extend_from_slice(&0u16.to_be_bytes());
        section.push(0);
        section.push(1); // hours
        section.extend_from_slice(&forecast_time.to_be_bytes());
        section.push(self.level_type);
        section.push(0);
        section.extend_from_slice(&self.level_value.to_be_bytes());
        section.push(255);
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        if let Some((process, hours)) = self.interval {
            // End of interval timestamp is not read by the parser
            section.extend_from_slice(&self.year.to_be_bytes());
            section.extend_from_slice(&[self.month, self.day, self.hour, 0, 0]);
            section.push(1); // one time range
            section.extend_from_slice(&0u32.to_be_bytes()); // missing values
            section.push(process);
            section.push(2); // successive forecast times
            section.push(1); // hours
            section.extend_from_slice(&hours.to_be_bytes());
            section.push(255);
            section.extend_from_slice(&0u32.to_be_bytes());
        }

        section
    }

    fn build_section5(&self) -> Vec<u8> {
        let (reference_value, binary_scale_factor, bits) = self.packing_parameters();

        let mut section = Vec::new();
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(5);
        section.extend_from_slice(&(self.present_values().len() as u32).to_be_bytes());
        section.extend_from_slice(&self.packing_template.to_be_bytes());
        section.extend_from_slice(&reference_value.to_be_bytes());
        section.extend_from_slice(&encode_signed_i16(binary_scale_factor));
        section.extend_from_slice(&encode_signed_i16(0));
        section.push(bits);
        section.push(0); // floating point
        section
    }

    fn build_section6(&self) -> Vec<u8> {
        if !self.has_missing() {
            let mut section = Vec::new();
            section.extend_from_slice(&6u32.to_be_bytes());
            section.push(6);
            section.push(255);
            return section;
        }

        let mut bitmap = vec![0u8; self.data_values.len().div_ceil(8)];
        for (i, v) in self.data_values.iter().enumerate() {
            if !v.is_nan() {
                bitmap[i / 8] |= 0x80 >> (i % 8);
            }
        }

        let mut section = Vec::new();
        section.extend_from_slice(&(6 + bitmap.len() as u32).to_be_bytes());
        section.push(6);
        section.push(0);
        section.extend_from_slice(&bitmap);
        section
    }

    fn build_section7(&self) -> Vec<u8> {
        let packed = self.pack_simple();
        let mut section = Vec::new();
        section.extend_from_slice(&(5 + packed.len() as u32).to_be_bytes());
        section.push(7);
        section.extend_from_slice(&packed);
        section
    }

    fn pack_simple(&self) -> Vec<u8> {
        let (reference_value, binary_scale_factor, bits) = self.packing_parameters();
        if bits == 0 {
            return Vec::new();
        }

        let binary_scale = 2.0_f32.powi(binary_scale_factor as i32);
        self.present_values()
            .iter()
            .flat_map(|&val| {
                let packed = ((val - reference_value) / binary_scale).round() as u16;
                packed.to_be_bytes()
            })
            .collect()
    }
}

// ===== Multi-message forecast files =====

/// Parameters written by [`ForecastFileBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// TMP, 2 m above ground, K
    Temperature,
    /// APCP, surface, kg m-2 accumulated over each step
    Precipitation,
    /// UGRD, 10 m above ground, m/s
    WindU,
    /// VGRD, 10 m above ground, m/s
    WindV,
    /// WIND, 10 m above ground, m/s
    WindSpeed,
    /// GUST, surface, m/s
    Gust,
}

impl Field {
    fn configure(self, builder: Grib2Builder, step_hours: u32) -> Grib2Builder {
        match self {
            Field::Temperature => builder.with_parameter(0, 0).with_level(103, 2),
            Field::Precipitation => builder
                .with_parameter(1, 8)
                .with_level(1, 0)
                .with_interval(1, step_hours),
            Field::WindU => builder.with_parameter(2, 2).with_level(103, 10),
            Field::WindV => builder.with_parameter(2, 3).with_level(103, 10),
            Field::WindSpeed => builder.with_parameter(2, 1).with_level(103, 10),
            Field::Gust => builder.with_parameter(2, 22).with_level(1, 0),
        }
    }
}

type FieldFn = Box<dyn Fn(Field, u32, f64, f64) -> f32>;

/// Build a concatenated multi-day GRIB2 forecast file.
///
/// Defaults: 7 days of 6-hourly steps (hours 6..=168) over
/// [`KENYA_TEST_GRID`](crate::boundaries::KENYA_TEST_GRID) with 25 C,
/// 1 mm per step, U = 3 m/s, V = 4 m/s and 8 m/s gusts.
pub struct ForecastFileBuilder {
    days: u32,
    step_hours: u32,
    fields: Vec<Field>,
    grid: crate::boundaries::GridLayout,
    reference: (u16, u8, u8, u8),
    values: FieldFn,
}

impl Default for ForecastFileBuilder {
    fn default() -> Self {
        Self {
            days: 7,
            step_hours: 6,
            fields: vec![
                Field::Temperature,
                Field::Precipitation,
                Field::WindU,
                Field::WindV,
                Field::Gust,
            ],
            grid: crate::boundaries::KENYA_TEST_GRID,
            reference: (2026, 2, 9, 0),
            values: Box::new(default_value),
        }
    }
}

/// Default constant field values in GRIB units.
pub fn default_value(field: Field, _hour: u32, _lon: f64, _lat: f64) -> f32 {
    match field {
        Field::Temperature => 298.15,
        Field::Precipitation => 1.0,
        Field::WindU => 3.0,
        Field::WindV => 4.0,
        Field::WindSpeed => 5.0,
        Field::Gust => 8.0,
    }
}

impl ForecastFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_grid(mut self, grid: crate::boundaries::GridLayout) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.reference = (year, month, day, hour);
        self
    }

    /// Value function of (field, valid hour, lon, lat) in GRIB units.
    pub fn with_values(mut self, f: impl Fn(Field, u32, f64, f64) -> f32 + 'static) -> Self {
        self.values = Box::new(f);
        self
    }

    /// Valid hours written for each field.
    pub fn hours(&self) -> Vec<u32> {
        let steps = self.days * 24 / self.step_hours;
        (1..=steps).map(|s| s * self.step_hours).collect()
    }

    pub fn build(&self) -> Vec<u8> {
        let (year, month, day, hour) = self.reference;
        let mut file = Vec::new();

        for valid_hour in self.hours() {
            for &field in &self.fields {
                let base = Grib2Builder::new_gfs()
                    .with_reference_time(year, month, day, hour)
                    .with_grid(
                        self.grid.ni,
                        self.grid.nj,
                        self.grid.first_lon,
                        self.grid.first_lat,
                        self.grid.step,
                    )
                    .with_forecast_hour(valid_hour);
                let message = field
                    .configure(base, self.step_hours)
                    .with_field(|lon, lat| (self.values)(field, valid_hour, lon, lat))
                    .build();
                file.extend_from_slice(&message);
            }
        }

        file
    }
}
