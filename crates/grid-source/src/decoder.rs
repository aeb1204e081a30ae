//! GRIB2 forecast file to daily regional snapshots.
//!
//! Every matching message is cropped to the region, converted to report
//! units and folded into the accumulator for its forecast day. Days are
//! 24 hour windows after the reference time: hour 0 belongs to day 0 and
//! hour `h > 0` to day `(h - 1) / 24`, so the 24 h step closes day 0.
//! Accumulated rainfall is first chained into non-overlapping steps, each
//! counted on the day of its end hour.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::ops::RangeInclusive;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use forecast_common::{BoundingBox, GridSpec, GridVariable, ScanMode, DAYS_PER_PERIOD};
use grib2_parser::{is_grib2, GridDefinition, Grib2Message, Grib2Reader, Grib2Tables};
use tracing::{debug, info, instrument, warn};

use crate::config::GridSourceConfig;
use crate::error::{DecodeError, IncompleteDataError, Result};
use crate::snapshot::{ForecastGrid, ForecastMetadata, GridSnapshot};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const GRID_EPSILON: f64 = 1e-6;

/// Forecast day of a valid hour.
pub fn forecast_day(hour: u32) -> usize {
    if hour == 0 {
        0
    } else {
        ((hour - 1) / 24) as usize
    }
}

/// True when the buffer starts with the gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == GZIP_MAGIC
}

/// Decompress gzip-compressed GRIB2 data.
pub fn decompress_gzip(data: &[u8]) -> std::result::Result<Bytes, DecodeError> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| DecodeError::Decompression(e.to_string()))?;
    Ok(Bytes::from(decompressed))
}

/// Longitude wrapped into [-180, 180).
pub fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Check that all seven forecast days are present.
pub fn validate_days(snapshots: &[GridSnapshot]) -> std::result::Result<(), IncompleteDataError> {
    let missing_days: Vec<usize> = (0..DAYS_PER_PERIOD)
        .filter(|day| !snapshots.iter().any(|s| s.day_index == *day))
        .collect();

    if missing_days.is_empty() {
        Ok(())
    } else {
        Err(IncompleteDataError {
            found: DAYS_PER_PERIOD - missing_days.len(),
            required: DAYS_PER_PERIOD,
            missing_days,
        })
    }
}

// ===== Temporal reduction =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reduction {
    Mean,
    Sum,
    Max,
}

impl Reduction {
    fn for_variable(variable: GridVariable) -> Self {
        match variable {
            GridVariable::Rainfall => Reduction::Sum,
            GridVariable::WindGust => Reduction::Max,
            _ => Reduction::Mean,
        }
    }
}

/// Running per-point reduction of one variable over one day.
#[derive(Debug)]
struct DayAccumulator {
    reduction: Reduction,
    totals: Vec<f64>,
    counts: Vec<u32>,
    steps: usize,
}

impl DayAccumulator {
    fn new(reduction: Reduction, len: usize) -> Self {
        let initial = match reduction {
            Reduction::Max => f64::NEG_INFINITY,
            _ => 0.0,
        };
        Self {
            reduction,
            totals: vec![initial; len],
            counts: vec![0; len],
            steps: 0,
        }
    }

    fn add(&mut self, values: &[f32]) {
        for ((total, count), &value) in self.totals.iter_mut().zip(&mut self.counts).zip(values) {
            if !value.is_finite() {
                continue;
            }
            let value = value as f64;
            match self.reduction {
                Reduction::Mean => *total += value,
                // Packing noise can produce tiny negative accumulations
                Reduction::Sum => *total += value.max(0.0),
                Reduction::Max => *total = total.max(value),
            }
            *count += 1;
        }
        self.steps += 1;
    }

    fn finish(self) -> Vec<f32> {
        let reduction = self.reduction;
        self.totals
            .into_iter()
            .zip(self.counts)
            .map(|(total, count)| match (count, reduction) {
                (0, _) => f32::NAN,
                (n, Reduction::Mean) => (total / n as f64) as f32,
                _ => total as f32,
            })
            .collect()
    }
}

// ===== Accumulation intervals =====

/// Code table 4.10 accumulation.
const ACCUMULATION: u8 = 1;

/// Accumulated fields over possibly overlapping intervals.
///
/// Files mix running totals (0-3 h, 0-6 h) with step totals (6-9 h). Each
/// interval extends a known total at its start hour; differences of
/// consecutive totals are the non-overlapping steps.
#[derive(Debug, Default)]
struct AccumulationChain {
    /// Keyed by (end, start)
    intervals: BTreeMap<(u32, u32), Vec<f32>>,
}

impl AccumulationChain {
    fn insert(&mut self, start: u32, end: u32, field: Vec<f32>) {
        self.intervals.entry((end, start)).or_insert(field);
    }

    /// Step amounts in end-hour order, each paired with its end hour.
    fn steps(self) -> Vec<(u32, Vec<f32>)> {
        let Some(anchor) = self.intervals.keys().map(|(_, start)| *start).min() else {
            return Vec::new();
        };
        let len = self.intervals.values().next().map_or(0, Vec::len);
        let mut totals: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        totals.insert(anchor, vec![0.0; len]);

        // for one end hour the longest interval comes first
        for ((end, start), field) in self.intervals {
            if totals.contains_key(&end) {
                continue;
            }
            let Some(base) = totals.get(&start) else {
                warn!(start, end, "Accumulation interval starts at an unknown total, skipping");
                continue;
            };
            let total = base.iter().zip(&field).map(|(b, v)| b + *v as f64).collect();
            totals.insert(end, total);
        }

        let mut steps = Vec::with_capacity(totals.len().saturating_sub(1));
        let mut previous: Option<Vec<f64>> = None;
        for (hour, total) in totals {
            if let Some(previous) = &previous {
                let step = total.iter().zip(previous).map(|(t, p)| (t - p) as f32).collect();
                steps.push((hour, step));
            }
            previous = Some(total);
        }
        steps
    }
}

// ===== Region cropping =====

/// Source grid of the file and the window of it that covers the region.
#[derive(Debug, Clone)]
struct RegionCrop {
    source_def: GridDefinition,
    scan: ScanMode,
    source_nx: usize,
    source_ny: usize,
    cols: RangeInclusive<usize>,
    rows: RangeInclusive<usize>,
    region: GridSpec,
}

impl RegionCrop {
    fn from_definition(def: &GridDefinition, bbox: &BoundingBox) -> std::result::Result<Self, DecodeError> {
        let scan = ScanMode::from_grib2_flag(def.scanning_mode);
        let nx = def.ni as usize;
        let ny = def.nj as usize;
        let source = GridSpec::from_first_point(
            nx,
            ny,
            def.i_increment,
            def.j_increment,
            normalize_lon(def.first_longitude),
            def.first_latitude,
            scan,
        );

        // Global grids starting at 0E extend past 180E; move the region into
        // the same frame before cropping.
        let mut target = *bbox;
        if target.max_x < source.origin_lon {
            target.min_x += 360.0;
            target.max_x += 360.0;
        }

        let (cols, rows) = source
            .index_range(&target)
            .ok_or_else(|| DecodeError::EmptyRegion(format!("{:?}", bbox)))?;

        let region = GridSpec::new(
            cols.clone().count(),
            rows.clone().count(),
            source.dx,
            source.dy,
            normalize_lon(source.lon(*cols.start())),
            source.lat(*rows.start()),
        );

        Ok(Self {
            source_def: def.clone(),
            scan,
            source_nx: nx,
            source_ny: ny,
            cols,
            rows,
            region,
        })
    }

    fn same_grid(&self, def: &GridDefinition) -> bool {
        let a = &self.source_def;
        a.template == def.template
            && a.ni == def.ni
            && a.nj == def.nj
            && a.scanning_mode == def.scanning_mode
            && (a.first_latitude - def.first_latitude).abs() < GRID_EPSILON
            && (a.first_longitude - def.first_longitude).abs() < GRID_EPSILON
            && (a.i_increment - def.i_increment).abs() < GRID_EPSILON
            && (a.j_increment - def.j_increment).abs() < GRID_EPSILON
    }

    fn source_len(&self) -> usize {
        self.source_nx * self.source_ny
    }

    /// Region values in canonical row-major order.
    fn extract(&self, source: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.region.len());
        for j in self.rows.clone() {
            for i in self.cols.clone() {
                let idx = self
                    .scan
                    .source_index(i, j, self.source_nx, self.source_ny);
                out.push(source.get(idx).copied().unwrap_or(f32::NAN));
            }
        }
        out
    }
}

// ===== Decoder =====

/// Decodes GRIB2 forecast files into [`ForecastGrid`]s.
#[derive(Debug, Clone)]
pub struct GridDecoder {
    config: GridSourceConfig,
    tables: Arc<Grib2Tables>,
}

impl GridDecoder {
    pub fn new(config: GridSourceConfig) -> Self {
        Self {
            config,
            tables: Arc::new(Grib2Tables::gfs()),
        }
    }

    pub fn with_tables(mut self, tables: Arc<Grib2Tables>) -> Self {
        self.tables = tables;
        self
    }

    pub fn config(&self) -> &GridSourceConfig {
        &self.config
    }

    /// Decode `data` over the configured region.
    pub fn decode(&self, data: Bytes, required: &[GridVariable]) -> Result<ForecastGrid> {
        let region = self.config.region;
        self.decode_region(data, &region, required)
    }

    /// Decode `data`, keeping only the grid points inside `bbox`.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn decode_region(
        &self,
        data: Bytes,
        bbox: &BoundingBox,
        required: &[GridVariable],
    ) -> Result<ForecastGrid> {
        let data = if is_gzip(&data) {
            let decompressed = decompress_gzip(&data)?;
            debug!(
                compressed = data.len(),
                decompressed = decompressed.len(),
                "Decompressed gzip forecast file"
            );
            decompressed
        } else {
            data
        };

        let starts_with_grib = is_grib2(&data);
        let mut reader = Grib2Reader::new(data, self.tables.clone());
        let mut crop: Option<RegionCrop> = None;
        let mut reference_time: Option<DateTime<Utc>> = None;
        let mut accumulators: BTreeMap<(usize, GridVariable), DayAccumulator> = BTreeMap::new();
        let mut derived_speed: BTreeMap<usize, DayAccumulator> = BTreeMap::new();
        let mut pending_wind: BTreeMap<u32, (Option<Vec<f32>>, Option<Vec<f32>>)> = BTreeMap::new();
        let mut rainfall = AccumulationChain::default();
        // (variable, interval start, valid hour)
        let mut seen: HashSet<(GridVariable, u32, u32)> = HashSet::new();
        let mut messages = 0usize;
        let mut used = 0usize;

        while let Some(message) = reader.next_message().map_err(DecodeError::from)? {
            messages += 1;

            let Some(variable) = self.variable_of(&message) else {
                continue;
            };

            let hour = message.valid_hour();
            let day = forecast_day(hour);
            if day >= DAYS_PER_PERIOD {
                debug!(parameter = %message.parameter(), hour, "Beyond forecast window, skipping");
                continue;
            }
            let accumulated = variable == GridVariable::Rainfall
                && message
                    .product_definition
                    .statistical
                    .is_some_and(|stat| stat.process == ACCUMULATION);
            let start = if accumulated {
                message.product_definition.forecast_hour
            } else {
                hour
            };
            if !seen.insert((variable, start, hour)) {
                debug!(
                    variable = %variable,
                    valid_time = %message.valid_time(),
                    "Duplicate message, keeping the first"
                );
                continue;
            }

            reference_time.get_or_insert(message.identification.reference_time);

            if let Some(existing) = &crop {
                if !existing.same_grid(&message.grid_definition) {
                    return Err(DecodeError::GridMismatch {
                        parameter: message.parameter().to_string(),
                        hour,
                    }
                    .into());
                }
            } else {
                crop = Some(RegionCrop::from_definition(&message.grid_definition, bbox)?);
            }
            let Some(region) = crop.as_ref() else {
                continue;
            };

            let values = message.unpack_data().map_err(DecodeError::from)?;
            if values.len() != region.source_len() {
                return Err(DecodeError::SizeMismatch {
                    parameter: message.parameter().to_string(),
                    expected: region.source_len(),
                    actual: values.len(),
                }
                .into());
            }

            let conversion = self.config.source(variable).conversion;
            let field: Vec<f32> = region
                .extract(&values)
                .into_iter()
                .map(|v| conversion.apply(v))
                .collect();

            if self.config.derive_wind_speed
                && matches!(variable, GridVariable::WindU | GridVariable::WindV)
            {
                let speed = {
                    let entry = pending_wind.entry(hour).or_default();
                    if variable == GridVariable::WindU {
                        entry.0 = Some(field.clone());
                    } else {
                        entry.1 = Some(field.clone());
                    }
                    match (&entry.0, &entry.1) {
                        (Some(u), Some(v)) => Some(
                            u.iter()
                                .zip(v)
                                .map(|(u, v)| u.hypot(*v))
                                .collect::<Vec<f32>>(),
                        ),
                        _ => None,
                    }
                };
                if let Some(speed) = speed {
                    pending_wind.remove(&hour);
                    derived_speed
                        .entry(day)
                        .or_insert_with(|| DayAccumulator::new(Reduction::Mean, speed.len()))
                        .add(&speed);
                }
            }

            used += 1;
            if accumulated {
                rainfall.insert(start, hour, field);
                continue;
            }
            accumulators
                .entry((day, variable))
                .or_insert_with(|| DayAccumulator::new(Reduction::for_variable(variable), field.len()))
                .add(&field);
        }

        if messages == 0 {
            let reason = if starts_with_grib {
                "GRIB2 indicator without a complete message"
            } else {
                "no GRIB2 messages found"
            };
            return Err(DecodeError::UnrecognizedFormat(reason.to_string()).into());
        }

        for (hour, step) in rainfall.steps() {
            accumulators
                .entry((forecast_day(hour), GridVariable::Rainfall))
                .or_insert_with(|| DayAccumulator::new(Reduction::Sum, step.len()))
                .add(&step);
        }

        if !accumulators.keys().any(|(_, v)| *v == GridVariable::WindSpeed) && !derived_speed.is_empty() {
            info!(days = derived_speed.len(), "Derived wind speed from U/V components");
            for (day, acc) in derived_speed {
                accumulators.insert((day, GridVariable::WindSpeed), acc);
            }
        }

        for &variable in required {
            if !accumulators.keys().any(|(_, v)| *v == variable) {
                return Err(DecodeError::MissingVariable(variable).into());
            }
        }

        let (Some(region), Some(reference_time)) = (crop, reference_time) else {
            let first = required.first().copied().unwrap_or(GridVariable::Temperature);
            return Err(DecodeError::MissingVariable(first).into());
        };

        let missing_days: Vec<usize> = (0..DAYS_PER_PERIOD)
            .filter(|day| {
                !required
                    .iter()
                    .all(|var| accumulators.contains_key(&(*day, *var)))
            })
            .collect();
        if !missing_days.is_empty() {
            warn!(missing_days = ?missing_days, "Forecast file does not cover every day");
            return Err(IncompleteDataError {
                found: DAYS_PER_PERIOD - missing_days.len(),
                required: DAYS_PER_PERIOD,
                missing_days,
            }
            .into());
        }

        let mut snapshots: Vec<GridSnapshot> = (0..DAYS_PER_PERIOD)
            .map(|day| GridSnapshot::new(day, day_date(reference_time, day), region.region.clone()))
            .collect();
        for ((day, variable), acc) in accumulators {
            debug!(day, variable = %variable, steps = acc.steps, "Reduced daily field");
            if let Some(snapshot) = snapshots.get_mut(day) {
                snapshot.values.insert(variable, acc.finish());
            }
        }
        validate_days(&snapshots)?;

        let metadata = ForecastMetadata {
            model_run_id: format!("{}.{}", self.config.model, reference_time.format("%Y%m%d%H")),
            reference_time,
            grid_resolution: region.region.resolution(),
            grid_points_total: region.region.len(),
        };

        info!(
            model_run_id = %metadata.model_run_id,
            messages,
            used,
            nx = region.region.nx,
            ny = region.region.ny,
            "Decoded forecast grid"
        );

        Ok(ForecastGrid { metadata, snapshots })
    }

    fn variable_of(&self, message: &Grib2Message) -> Option<GridVariable> {
        let pd = &message.product_definition;
        self.config
            .variable_for(message.parameter(), pd.level_type, pd.level_value)
    }
}

/// Calendar date of forecast day `day`.
fn day_date(reference_time: DateTime<Utc>, day: usize) -> NaiveDate {
    (reference_time + Duration::hours(day as i64 * 24 + 1)).date_naive()
}
