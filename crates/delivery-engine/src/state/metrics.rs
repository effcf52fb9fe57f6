//! Per-order timing records and aggregate statistics.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Timing breakdown for one delivered order, with the entity ids that were
/// resolvable from the order at record time. Resolution is best effort: the
/// order may already be mid-tombstone, so any id can be absent.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsRecord {
    pub receipt: String,
    pub queue_time: f64,
    pub prep_time: f64,
    pub driver_wait_time: f64,
    pub drive_time: f64,
    pub total_time: f64,
    pub driver_id: Option<u32>,
    pub restaurant_id: Option<u32>,
    pub house_id: Option<u32>,
}

/// Average plus rank percentiles for one breakdown field.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FieldStats {
    pub avg: f64,
    pub p50: f64,
    pub p90: f64,
}

/// Aggregates over every recorded order, one entry per breakdown field.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BreakdownStats {
    pub queue: FieldStats,
    pub prep: FieldStats,
    pub driver_wait: FieldStats,
    pub drive: FieldStats,
    pub total: FieldStats,
}

/// One delivery attributed to a house.
#[derive(Debug, Clone, Serialize)]
pub struct HouseDelivery {
    pub receipt: String,
    pub seconds: f64,
}

/// Per-entity average, for the bar-chart style displays.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntityAverage {
    pub id: u32,
    pub average: f64,
}

/// Scoreboard row. Drivers earn a flat +10 per recorded delivery.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DriverScore {
    pub driver_id: u32,
    pub score: u32,
}

/// Aggregate statistics computed upstream by the controller, stored
/// verbatim for display next to the locally computed ones.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ControllerStats {
    pub avg_total: f64,
    pub avg_prep: f64,
    pub avg_wait: f64,
    pub avg_delivery: f64,
    pub p50_total: f64,
    pub p95_total: f64,
    pub p50_prep: f64,
    pub p95_prep: f64,
    pub analyzed: u32,
}

/// Everything the metrics displays need, in one query.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    /// Records in arrival order.
    pub records: Vec<MetricsRecord>,
    pub breakdown: BreakdownStats,
    pub driver_pickup_avg: Vec<EntityAverage>,
    pub driver_drive_avg: Vec<EntityAverage>,
    pub restaurant_prep_avg: Vec<EntityAverage>,
    pub house_delivery_avg: Vec<EntityAverage>,
    /// Sorted by score, best first.
    pub scoreboard: Vec<DriverScore>,
    pub controller_stats: Option<ControllerStats>,
}

/// Collects records and answers aggregate queries.
///
/// Records keep arrival order (the detail table and the last-N chart depend
/// on it); a re-delivered record overwrites in place without double-counting
/// the per-entity series or the scoreboard.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    records: Vec<MetricsRecord>,
    by_receipt: HashMap<String, usize>,
    driver_pickup: BTreeMap<u32, Vec<f64>>,
    driver_drive: BTreeMap<u32, Vec<f64>>,
    restaurant_prep: BTreeMap<u32, Vec<f64>>,
    house_deliveries: BTreeMap<u32, Vec<HouseDelivery>>,
    scores: BTreeMap<u32, u32>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: MetricsRecord) {
        if let Some(&slot) = self.by_receipt.get(&record.receipt) {
            self.records[slot] = record;
            return;
        }

        if let Some(driver) = record.driver_id {
            self.driver_pickup
                .entry(driver)
                .or_default()
                .push(record.driver_wait_time);
            self.driver_drive
                .entry(driver)
                .or_default()
                .push(record.drive_time);
            *self.scores.entry(driver).or_insert(0) += 10;
        }
        if let Some(restaurant) = record.restaurant_id {
            self.restaurant_prep
                .entry(restaurant)
                .or_default()
                .push(record.prep_time);
        }
        if let Some(house) = record.house_id {
            self.house_deliveries
                .entry(house)
                .or_default()
                .push(HouseDelivery {
                    receipt: record.receipt.clone(),
                    seconds: record.total_time,
                });
        }

        self.by_receipt
            .insert(record.receipt.clone(), self.records.len());
        self.records.push(record);
    }

    /// Aggregates over all records, per field. Zero and missing readings are
    /// excluded before ranking.
    pub fn aggregate(&self) -> BreakdownStats {
        BreakdownStats {
            queue: self.field_stats(|r| r.queue_time),
            prep: self.field_stats(|r| r.prep_time),
            driver_wait: self.field_stats(|r| r.driver_wait_time),
            drive: self.field_stats(|r| r.drive_time),
            total: self.field_stats(|r| r.total_time),
        }
    }

    pub fn report(&self, controller_stats: Option<ControllerStats>) -> MetricsReport {
        let mut scoreboard: Vec<DriverScore> = self
            .scores
            .iter()
            .map(|(&driver_id, &score)| DriverScore { driver_id, score })
            .collect();
        scoreboard.sort_by(|a, b| b.score.cmp(&a.score).then(a.driver_id.cmp(&b.driver_id)));

        MetricsReport {
            records: self.records.clone(),
            breakdown: self.aggregate(),
            driver_pickup_avg: series_averages(&self.driver_pickup),
            driver_drive_avg: series_averages(&self.driver_drive),
            restaurant_prep_avg: series_averages(&self.restaurant_prep),
            house_delivery_avg: self
                .house_deliveries
                .iter()
                .filter(|(_, deliveries)| !deliveries.is_empty())
                .map(|(&id, deliveries)| EntityAverage {
                    id,
                    average: average(deliveries.iter().map(|d| d.seconds)),
                })
                .collect(),
            scoreboard,
            controller_stats,
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.by_receipt.clear();
        self.driver_pickup.clear();
        self.driver_drive.clear();
        self.restaurant_prep.clear();
        self.house_deliveries.clear();
        self.scores.clear();
    }

    fn field_stats(&self, field: impl Fn(&MetricsRecord) -> f64) -> FieldStats {
        let mut values: Vec<f64> = self
            .records
            .iter()
            .map(&field)
            .filter(|v| *v > 0.0)
            .collect();
        if values.is_empty() {
            return FieldStats::default();
        }
        values.sort_by(|a, b| a.total_cmp(b));
        FieldStats {
            avg: average(values.iter().copied()),
            p50: nearest_rank_floor(&values, 0.5),
            p90: nearest_rank_floor(&values, 0.9),
        }
    }
}

fn series_averages(series: &BTreeMap<u32, Vec<f64>>) -> Vec<EntityAverage> {
    series
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(&id, values)| EntityAverage {
            id,
            average: average(values.iter().copied()),
        })
        .collect()
}

fn average(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Nearest-rank-floor percentile: `sorted[floor(count * p)]`, no
/// interpolation. Downstream consumers compare against exactly this rule,
/// so it must not be replaced with an interpolating variant.
pub fn nearest_rank_floor(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    debug_assert!(p > 0.0 && p < 1.0);
    sorted[(sorted.len() as f64 * p).floor() as usize]
}
