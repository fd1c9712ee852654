//! Prometheus metrics for the search core's hot paths.

use std::sync::OnceLock;

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts};

fn search_duration_seconds() -> &'static Histogram {
    static METRIC: OnceLock<Histogram> = OnceLock::new();
    METRIC.get_or_init(|| {
        let histogram = Histogram::with_opts(HistogramOpts::new(
            "search_core_search_duration_seconds",
            "Wall-clock time to produce one page of search results",
        ))
        .expect("static histogram opts are valid");
        let _ = prometheus::register(Box::new(histogram.clone()));
        histogram
    })
}

fn pagination_duration_seconds() -> &'static Histogram {
    static METRIC: OnceLock<Histogram> = OnceLock::new();
    METRIC.get_or_init(|| {
        let histogram = Histogram::with_opts(HistogramOpts::new(
            "search_core_pagination_duration_seconds",
            "Wall-clock time to produce one more-results page",
        ))
        .expect("static histogram opts are valid");
        let _ = prometheus::register(Box::new(histogram.clone()));
        histogram
    })
}

fn index_extension_cancelled_total() -> &'static IntCounter {
    static METRIC: OnceLock<IntCounter> = OnceLock::new();
    METRIC.get_or_init(|| {
        let counter = IntCounter::with_opts(Opts::new(
            "search_core_index_extension_cancelled_total",
            "Number of index-extension requests that were cancelled and swallowed",
        ))
        .expect("static counter opts are valid");
        let _ = prometheus::register(Box::new(counter.clone()));
        counter
    })
}

fn suggestion_candidates_skipped_total() -> &'static IntCounter {
    static METRIC: OnceLock<IntCounter> = OnceLock::new();
    METRIC.get_or_init(|| {
        let counter = IntCounter::with_opts(Opts::new(
            "search_core_suggestion_candidates_skipped_total",
            "Suggestion candidates skipped because their entity could not be loaded",
        ))
        .expect("static counter opts are valid");
        let _ = prometheus::register(Box::new(counter.clone()));
        counter
    })
}

pub fn observe_search(elapsed_secs: f64) {
    search_duration_seconds().observe(elapsed_secs);
}

pub fn observe_pagination(elapsed_secs: f64) {
    pagination_duration_seconds().observe(elapsed_secs);
}

pub fn inc_index_extension_cancelled() {
    index_extension_cancelled_total().inc();
}

pub fn inc_suggestion_candidate_skipped() {
    suggestion_candidates_skipped_total().inc();
}
