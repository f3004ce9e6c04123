// Adaptive windowed-median downsampling
//
// Reduces a time-ordered series to at most `num_points` points. Windows start
// out uniform over the input span; whenever the data leaves a window behind
// (a gap, or a burst after a quiet stretch) the cadence is re-derived from the
// remaining span and remaining budget. Once the remaining budget covers the
// remaining input, the rest of the input is copied through untouched.
use super::accumulator::FieldAccumulators;
use crate::domain::readings::{ReadingPoint, ReducedSeries};
use crate::domain::sensor::{FieldSelection, SensorField, SensorValues};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DownsampleError {
    #[error("point budget must be at least 1")]
    ZeroPointBudget,
}

/// Downsample `points` to at most `num_points` entries.
///
/// `points` must already be sorted by time (equal timestamps are fine). An
/// unsorted series does not panic but its output order is unspecified.
/// A budget of zero is a caller error.
pub fn downsample(
    points: &[ReadingPoint],
    num_points: usize,
    selection: &FieldSelection,
) -> Result<ReducedSeries, DownsampleError> {
    if num_points == 0 {
        return Err(DownsampleError::ZeroPointBudget);
    }

    let mut output = SeriesBuilder::new(selection, points.len().min(num_points));
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > num_points => {
            Downsampler {
                points,
                budget: num_points,
                accumulators: FieldAccumulators::new(selection),
                windows: WindowController::new(first.time_ms, last.time_ms, num_points),
                output: &mut output,
            }
            .run();
        }
        _ => {
            for point in points {
                output.push(point.time_ms, &point.values);
            }
        }
    }

    Ok(output.finish())
}

/// Tracks the current window and re-derives its width when density changes
#[derive(Debug, Clone, PartialEq)]
struct WindowController {
    base_ms: f64,
    window_ms: f64,
    end_ms: f64,
}

impl WindowController {
    fn new(start_ms: f64, end_ms: f64, budget: usize) -> Self {
        Self {
            base_ms: start_ms,
            window_ms: (end_ms - start_ms) / budget as f64,
            end_ms,
        }
    }

    fn window_end(&self) -> f64 {
        self.base_ms + self.window_ms
    }

    /// Strictly past the window end; a point on the boundary stays in the window
    fn is_past_window(&self, time_ms: f64) -> bool {
        time_ms > self.window_end()
    }

    /// Move to the next window and return its stamp (the new base)
    fn advance(&mut self) -> f64 {
        self.base_ms += self.window_ms;
        self.base_ms
    }

    /// Restart windowing at `time_ms`, spreading `remaining` points over what is left
    fn re_estimate(&mut self, time_ms: f64, remaining: usize) {
        debug_assert!(remaining > 0);
        self.base_ms = time_ms;
        self.window_ms = (self.end_ms - self.base_ms) / remaining as f64;
        tracing::trace!(
            base_ms = self.base_ms,
            window_ms = self.window_ms,
            remaining,
            "re-estimated window"
        );
    }
}

struct Downsampler<'a> {
    points: &'a [ReadingPoint],
    budget: usize,
    accumulators: FieldAccumulators,
    windows: WindowController,
    output: &'a mut SeriesBuilder,
}

impl Downsampler<'_> {
    fn run(mut self) {
        let points = self.points;
        for (i, point) in points.iter().enumerate() {
            let time_ms = point.time_ms;

            let mut flushed_nothing = false;
            if self.windows.is_past_window(time_ms) && self.remaining() > 1 {
                let stamp = self.windows.advance();
                flushed_nothing = !self.flush_window(stamp);
            }

            if self.tail_reached(i) {
                self.copy_tail(i);
                return;
            }

            if self.windows.is_past_window(time_ms) || flushed_nothing {
                let remaining = self.remaining();
                self.windows.re_estimate(time_ms, remaining);
            }

            self.accumulators.accumulate(&point.values);
        }

        if let Some(last) = points.last() {
            self.flush_window(last.time_ms);
        }
    }

    /// Output slots still owed
    fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.output.len())
    }

    /// True once the budget left is larger than the input left from `index` on
    fn tail_reached(&self, index: usize) -> bool {
        self.remaining() > self.points.len() - index
    }

    /// Close the open window, then pass every point from `index` through as is
    fn copy_tail(&mut self, index: usize) {
        let points = self.points;
        let tail = &points[index..];
        let stamp = self.windows.window_end().min(tail[0].time_ms);
        self.flush_window(stamp);
        for point in tail {
            self.output.push(point.time_ms, &point.values);
        }
    }

    /// Emit the accumulated medians at `stamp`; false if no field had a value
    fn flush_window(&mut self, stamp: f64) -> bool {
        match self.accumulators.flush() {
            Some(values) => {
                self.output.push(stamp, &values);
                true
            }
            None => false,
        }
    }
}

/// Columnar output under construction, one column per tracked field
struct SeriesBuilder {
    time: Vec<f64>,
    columns: Vec<(SensorField, Vec<Option<f64>>)>,
}

impl SeriesBuilder {
    fn new(selection: &FieldSelection, capacity: usize) -> Self {
        Self {
            time: Vec::with_capacity(capacity),
            columns: selection
                .fields()
                .iter()
                .map(|&field| (field, Vec::with_capacity(capacity)))
                .collect(),
        }
    }

    fn len(&self) -> usize {
        self.time.len()
    }

    fn push(&mut self, time_ms: f64, values: &SensorValues) {
        self.time.push(time_ms);
        for (field, column) in &mut self.columns {
            column.push(values.get(*field));
        }
    }

    /// Drops every column that never received a value
    fn finish(self) -> ReducedSeries {
        ReducedSeries {
            time: self.time,
            fields: self
                .columns
                .into_iter()
                .filter(|(_, column)| column.iter().any(Option::is_some))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: f64 = 3_600_000.0;
    const DAY_MS: f64 = 24.0 * HOUR_MS;
    const BUDGETS: [usize; 9] = [1, 2, 10, 99, 100, 500, 501, 900, 999];

    /// Small deterministic generator so scenario tests are reproducible
    struct Lcg(u64);

    impl Lcg {
        fn next_f64(&mut self) -> f64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }

        fn range(&mut self, min: f64, max: f64) -> f64 {
            min + (max - min) * self.next_f64()
        }
    }

    fn temperature_point(time_ms: f64, value: f64) -> ReadingPoint {
        ReadingPoint::new(time_ms, SensorValues::new().with(SensorField::Atmp, value))
    }

    fn sorted(mut points: Vec<ReadingPoint>) -> Vec<ReadingPoint> {
        points.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        points
    }

    fn uniform_day(count: usize, seed: u64) -> Vec<ReadingPoint> {
        let mut rng = Lcg(seed);
        let points = (0..count)
            .map(|_| temperature_point(rng.range(0.0, DAY_MS), rng.range(-20.0, 30.0)))
            .collect();
        sorted(points)
    }

    /// `dense` points packed into one half of the day, `sparse` spread over the other
    fn clustered_day(dense: usize, sparse: usize, dense_late: bool, seed: u64) -> Vec<ReadingPoint> {
        let mut rng = Lcg(seed);
        let (dense_range, sparse_range) = if dense_late {
            ((DAY_MS / 2.0, DAY_MS), (0.0, DAY_MS / 2.0))
        } else {
            ((0.0, DAY_MS / 2.0), (DAY_MS / 2.0, DAY_MS))
        };
        let mut points = Vec::with_capacity(dense + sparse);
        for _ in 0..dense {
            points.push(temperature_point(
                rng.range(dense_range.0, dense_range.1),
                rng.range(-20.0, 30.0),
            ));
        }
        for _ in 0..sparse {
            points.push(temperature_point(
                rng.range(sparse_range.0, sparse_range.1),
                rng.range(-20.0, 30.0),
            ));
        }
        sorted(points)
    }

    fn run(points: &[ReadingPoint], num_points: usize) -> ReducedSeries {
        downsample(points, num_points, &FieldSelection::all()).unwrap()
    }

    fn assert_well_formed(series: &ReducedSeries) {
        for (field, column) in &series.fields {
            assert_eq!(column.len(), series.time.len(), "column {field} misaligned");
            assert!(column.iter().any(Option::is_some), "column {field} is all empty");
        }
        assert!(
            series.time.windows(2).all(|pair| pair[0] <= pair[1]),
            "time must be non-decreasing"
        );
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        let points = uniform_day(10, 1);
        assert_eq!(
            downsample(&points, 0, &FieldSelection::all()),
            Err(DownsampleError::ZeroPointBudget)
        );
        assert_eq!(
            downsample(&[], 0, &FieldSelection::all()),
            Err(DownsampleError::ZeroPointBudget)
        );
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let series = run(&[], 10);
        assert!(series.is_empty());
        assert!(series.fields.is_empty());
    }

    #[test]
    fn test_passthrough_is_lossless() {
        let points = vec![
            ReadingPoint::new(
                0.0,
                SensorValues::new()
                    .with(SensorField::Rco2, 410.0)
                    .with(SensorField::Atmp, 0.0),
            ),
            ReadingPoint::new(1000.0, SensorValues::new().with(SensorField::Rco2, 420.0)),
            ReadingPoint::new(1000.0, SensorValues::new()),
        ];

        let series = run(&points, 3);
        assert_well_formed(&series);
        assert_eq!(series.time, vec![0.0, 1000.0, 1000.0]);
        assert_eq!(
            series.column(SensorField::Rco2),
            Some(&[Some(410.0), Some(420.0), None][..])
        );
        assert_eq!(
            series.column(SensorField::Atmp),
            Some(&[Some(0.0), None, None][..])
        );
        assert_eq!(series.fields.len(), 2);
        assert_eq!(series.column(SensorField::Rhum), None);
    }

    #[test]
    fn test_unselected_fields_are_ignored() {
        let points = vec![ReadingPoint::new(
            0.0,
            SensorValues::new()
                .with(SensorField::Rco2, 410.0)
                .with(SensorField::Atmp, 20.0),
        )];
        let selection = FieldSelection::parse(&["atmp"]).unwrap();
        let series = downsample(&points, 5, &selection).unwrap();
        assert_eq!(series.fields.len(), 1);
        assert!(series.column(SensorField::Atmp).is_some());
    }

    #[test]
    fn test_boundary_point_stays_in_current_window() {
        let points: Vec<ReadingPoint> = [0.0, 5.0, 10.0, 15.0, 20.0]
            .into_iter()
            .zip(1..)
            .map(|(time, value)| temperature_point(time, value as f64))
            .collect();

        let series = run(&points, 2);
        assert_eq!(series.time, vec![10.0, 20.0]);
        assert_eq!(
            series.column(SensorField::Atmp),
            Some(&[Some(2.0), Some(4.5)][..])
        );
    }

    #[test]
    fn test_gap_triggers_window_re_estimation() {
        let points: Vec<ReadingPoint> = [0.0, 100.0, 101.0, 102.0, 103.0]
            .into_iter()
            .zip(0..)
            .map(|(time, value)| temperature_point(time, value as f64))
            .collect();

        let series = run(&points, 4);
        assert_eq!(series.time, vec![25.75, 101.0, 102.0, 103.0]);
        assert_eq!(
            series.column(SensorField::Atmp),
            Some(&[Some(0.0), Some(1.5), Some(3.0), Some(4.0)][..])
        );
    }

    #[test]
    fn test_tail_is_copied_through() {
        let points: Vec<ReadingPoint> = [0.0, 1.0, 2.0, 3.0, 100.0]
            .into_iter()
            .zip(0..)
            .map(|(time, value)| temperature_point(time, value as f64))
            .collect();

        let series = run(&points, 3);
        assert_well_formed(&series);
        assert_eq!(series.time, vec![3.0, 3.0, 100.0]);
        assert_eq!(
            series.column(SensorField::Atmp),
            Some(&[Some(1.0), Some(3.0), Some(4.0)][..])
        );
    }

    #[test]
    fn test_equal_timestamps_collapse_to_budget() {
        let points: Vec<ReadingPoint> = (0..20)
            .map(|value| temperature_point(5000.0, value as f64))
            .collect();
        for budget in [1, 3, 19] {
            let series = run(&points, budget);
            assert_well_formed(&series);
            assert_eq!(series.len(), budget);
        }
    }

    #[test]
    fn test_uniform_day_hits_budget_exactly() {
        let points = uniform_day(1000, 7);
        for budget in BUDGETS {
            let series = run(&points, budget);
            assert_well_formed(&series);
            assert_eq!(series.len(), budget.min(points.len()), "budget {budget}");
        }
    }

    #[test]
    fn test_uniform_day_larger_budget_is_passthrough() {
        let points = uniform_day(1000, 11);
        let series = run(&points, 1200);
        assert_eq!(series.len(), 1000);
        assert_eq!(series.to_points(), points);
    }

    #[test]
    fn test_dense_towards_present_hits_budget_exactly() {
        let points = clustered_day(990, 10, true, 3);
        for budget in BUDGETS {
            let series = run(&points, budget);
            assert_well_formed(&series);
            assert_eq!(series.len(), budget.min(points.len()), "budget {budget}");
        }
    }

    #[test]
    fn test_dense_towards_past_hits_budget_exactly() {
        let points = clustered_day(990, 10, false, 5);
        for budget in BUDGETS {
            let series = run(&points, budget);
            assert_well_formed(&series);
            assert_eq!(series.len(), budget.min(points.len()), "budget {budget}");
        }
    }

    #[test]
    fn test_dense_cluster_gets_most_windows() {
        let points = clustered_day(990, 10, true, 13);
        let dense_start = points
            .iter()
            .map(|p| p.time_ms)
            .find(|&t| t >= DAY_MS / 2.0)
            .unwrap();

        let series = run(&points, 500);
        assert_eq!(series.len(), 500);
        let early = series.time.iter().filter(|&&t| t < dense_start).count();
        assert!(early <= 10, "{early} windows spent on the sparse half");
        assert!(
            series
                .column(SensorField::Atmp)
                .unwrap()
                .iter()
                .all(Option::is_some)
        );
    }

    #[test]
    fn test_downsampling_twice_changes_nothing() {
        let points = clustered_day(990, 10, true, 17);
        let once = run(&points, 100);
        let again = run(&once.to_points(), 100);
        assert_eq!(again, once);
        let wider = run(&once.to_points(), 150);
        assert_eq!(wider, once);
    }

    #[test]
    fn test_sparse_fields_never_exceed_budget() {
        let mut rng = Lcg(23);
        let points: Vec<ReadingPoint> = sorted(
            (0..600)
                .map(|i| {
                    let mut values = SensorValues::new();
                    if i % 3 == 0 {
                        values.set(SensorField::Tvoc, Some(rng.range(0.0, 500.0)));
                    }
                    if i % 7 == 0 {
                        values.set(SensorField::Nox, Some(rng.range(0.0, 5.0)));
                    }
                    ReadingPoint::new(rng.range(0.0, DAY_MS), values)
                })
                .collect(),
        );

        for budget in BUDGETS {
            let series = run(&points, budget);
            assert_well_formed(&series);
            assert!(series.len() <= budget, "budget {budget}");
            assert_eq!(series.fields.len(), 2);
        }
    }

    #[test]
    fn test_unsorted_input_does_not_panic() {
        let points = vec![
            temperature_point(500.0, 1.0),
            temperature_point(10.0, 2.0),
            temperature_point(900.0, 3.0),
            temperature_point(0.0, 4.0),
            temperature_point(300.0, 5.0),
        ];
        let series = run(&points, 2);
        assert!(series.len() <= 2);
    }
}
