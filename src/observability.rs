use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("parley.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("parley.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("parley.client.request_duration_seconds");
pub(crate) static CLIENT_UPLOADS: Counter = Counter::new("parley.client.uploads");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("parley.stream.chunks");
pub(crate) static STREAM_BYTES: Counter = Counter::new("parley.stream.bytes");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("parley.stream.errors");
pub(crate) static STREAM_DURATION: Moments = Moments::new("parley.stream.duration_seconds");

pub(crate) static DECODER_REPLACEMENTS: Counter = Counter::new("parley.decoder.replacements");
pub(crate) static DECODER_TRUNCATIONS: Counter = Counter::new("parley.decoder.truncations");

pub(crate) static SESSION_SENDS: Counter = Counter::new("parley.session.sends");
pub(crate) static SESSION_BUSY_REJECTIONS: Counter =
    Counter::new("parley.session.busy_rejections");
pub(crate) static SESSION_ERROR_TURNS: Counter = Counter::new("parley.session.error_turns");
pub(crate) static SESSION_EXPORTS: Counter = Counter::new("parley.session.exports");
pub(crate) static CATALOG_FALLBACKS: Counter = Counter::new("parley.catalog.fallbacks");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&CLIENT_UPLOADS);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&DECODER_REPLACEMENTS);
    collector.register_counter(&DECODER_TRUNCATIONS);

    collector.register_counter(&SESSION_SENDS);
    collector.register_counter(&SESSION_BUSY_REJECTIONS);
    collector.register_counter(&SESSION_ERROR_TURNS);
    collector.register_counter(&SESSION_EXPORTS);
    collector.register_counter(&CATALOG_FALLBACKS);
}
