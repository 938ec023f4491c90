use metrics::counter;

pub struct PublishTelemetry;

impl PublishTelemetry {
    pub fn record_cycle() {
        counter!("notes_publish_cycles_total").increment(1);
    }

    pub fn record_cycle_failure() {
        counter!("notes_publish_cycle_failures_total").increment(1);
    }

    pub fn record_published() {
        counter!("notes_published_total").increment(1);
    }

    pub fn record_skipped(reason: &'static str) {
        counter!("notes_publish_skipped_total", "reason" => reason).increment(1);
    }
}
