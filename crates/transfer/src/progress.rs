use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// Callback invoked with an overall percentage (0-100).
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

/// Highest percentage reported while chunk work remains; 100 is reserved
/// for a confirmed merge.
const CHUNK_PHASE_CAP: u8 = 99;

/// Maps chunk counts to an overall percentage.
///
/// `floor(100 * (uploaded + in_flight / 100) / total)`, capped at 99.
/// A job with no chunks reports 0 until it is finished explicitly.
pub fn chunk_percent(uploaded: u64, in_flight_percent: u8, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let in_flight = u64::from(in_flight_percent.min(100));
    // Scaled by 100 to stay in integers: 100 * (uploaded + p/100) = 100*uploaded + p.
    let scaled = (100 * uploaded + in_flight).min(100 * total);
    let percent = scaled / total;
    percent.min(u64::from(CHUNK_PHASE_CAP)) as u8
}

/// Aggregates chunk completions of one job into a monotonic percentage.
///
/// Shared by reference between concurrently running chunk uploads; a new
/// value reaches the sink only when it is higher than the last one sent.
pub struct ProgressAggregator {
    total_chunks: u64,
    uploaded: AtomicU64,
    reported: AtomicU8,
    sink: Option<ProgressSink>,
}

impl ProgressAggregator {
    pub fn new(total_chunks: u64, sink: Option<ProgressSink>) -> Self {
        Self {
            total_chunks,
            uploaded: AtomicU64::new(0),
            reported: AtomicU8::new(0),
            sink,
        }
    }

    /// Chunks accepted by the server so far.
    pub fn uploaded(&self) -> u64 {
        self.uploaded.load(Ordering::Acquire)
    }

    /// Last percentage delivered to the sink.
    pub fn percent(&self) -> u8 {
        self.reported.load(Ordering::Acquire)
    }

    /// Records transport progress of an in-flight chunk.
    pub fn chunk_progress(&self, in_flight_percent: u8) {
        let p = chunk_percent(self.uploaded(), in_flight_percent, self.total_chunks);
        self.report(p);
    }

    /// Records one accepted chunk and returns the new uploaded count.
    pub fn chunk_done(&self) -> u64 {
        let uploaded = self.uploaded.fetch_add(1, Ordering::AcqRel) + 1;
        self.report(chunk_percent(uploaded, 0, self.total_chunks));
        uploaded
    }

    /// Reports 100%. Call only after the server confirmed the object.
    pub fn finish(&self) {
        self.report(100);
    }

    fn report(&self, percent: u8) {
        let previous = self.reported.fetch_max(percent, Ordering::AcqRel);
        if percent > previous
            && let Some(sink) = &self.sink
        {
            sink(percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let sink: ProgressSink = Arc::new(move |p| s.lock().unwrap().push(p));
        (sink, seen)
    }

    #[test]
    fn percent_formula() {
        assert_eq!(chunk_percent(0, 0, 4), 0);
        assert_eq!(chunk_percent(1, 0, 4), 25);
        assert_eq!(chunk_percent(1, 50, 4), 37);
        assert_eq!(chunk_percent(2, 0, 3), 66);
    }

    #[test]
    fn percent_capped_at_99() {
        assert_eq!(chunk_percent(4, 0, 4), 99);
        assert_eq!(chunk_percent(3, 100, 4), 99);
        assert_eq!(chunk_percent(1, 0, 1), 99);
        assert_eq!(chunk_percent(9, 100, 4), 99);
    }

    #[test]
    fn zero_total_reports_zero() {
        assert_eq!(chunk_percent(0, 50, 0), 0);
    }

    #[test]
    fn aggregator_counts_and_finishes() {
        let (sink, seen) = recording_sink();
        let agg = ProgressAggregator::new(2, Some(sink));
        assert_eq!(agg.uploaded(), 0);
        assert_eq!(agg.chunk_done(), 1);
        assert_eq!(agg.percent(), 50);
        assert_eq!(agg.chunk_done(), 2);
        assert_eq!(agg.uploaded(), 2);
        assert_eq!(agg.percent(), 99);
        agg.finish();
        assert_eq!(agg.percent(), 100);
        assert_eq!(*seen.lock().unwrap(), vec![50, 99, 100]);
    }

    #[test]
    fn reported_values_never_decrease() {
        let (sink, seen) = recording_sink();
        let agg = ProgressAggregator::new(4, Some(sink));
        agg.chunk_progress(80); // 20
        agg.chunk_progress(10); // 2, suppressed
        agg.chunk_done(); // 25
        agg.chunk_progress(40); // 35
        agg.chunk_progress(0); // 25, suppressed
        agg.chunk_done(); // 50
        agg.chunk_done(); // 75
        agg.chunk_done(); // 99
        agg.finish();

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
        assert_eq!(*seen, vec![20, 25, 35, 50, 75, 99, 100]);
    }

    #[test]
    fn finish_without_chunks_jumps_to_100() {
        let (sink, seen) = recording_sink();
        let agg = ProgressAggregator::new(0, Some(sink));
        agg.chunk_progress(50);
        agg.finish();
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[test]
    fn no_sink_is_fine() {
        let agg = ProgressAggregator::new(1, None);
        agg.chunk_done();
        agg.finish();
        assert_eq!(agg.percent(), 100);
    }
}
