//! Replay, diff, and metadata-index scenarios through the public API.

use tempfile::tempdir;
use tracevault::prelude::*;
use tracevault::{rebuild_from_log, MetadataIndex, SqliteIndex};

fn capture_weather(root: &std::path::Path, city: &str) -> String {
    let tracer = Tracer::builder("weather")
        .project("demos")
        .root(root)
        .start()
        .expect("start");
    let prompt = format!("what's the weather in {city}?");
    tracer.user_input(prompt.as_str()).expect("input");
    tracer
        .llm_request(Value::object([
            ("model", Value::from("gpt-4")),
            ("prompt", Value::from(prompt.as_str())),
        ]))
        .expect("request");
    tracer
        .llm_response(Value::object([("text", Value::from("Sunny, 21C"))]))
        .expect("response");
    tracer.finish(None).expect("finish");
    tracer.trace_id().to_string()
}

#[test]
fn test_replay_follows_recorded_script() {
    let dir = tempdir().expect("tempdir");
    let trace_id = capture_weather(dir.path(), "Paris");

    let reader = TraceReader::new(dir.path());
    let mut replayer = Replayer::load(&reader, &trace_id).expect("load");

    let input = replayer.consume_input().expect("input");
    assert_eq!(input, "what's the weather in Paris?");

    let response = replayer.expect_llm(Some("weather in Paris")).expect("llm");
    assert_eq!(response.get("text").and_then(|v| v.as_str()), Some("Sunny, 21C"));

    // script exhausted: another input request must fail loudly
    let err = replayer.consume_input().expect_err("exhausted");
    assert!(err.is_exhausted());
}

#[test]
fn test_replay_divergence_names_both_sides() {
    let dir = tempdir().expect("tempdir");
    let trace_id = capture_weather(dir.path(), "Paris");

    let reader = TraceReader::new(dir.path());
    let mut replayer = Replayer::load(&reader, &trace_id).expect("load");
    replayer.consume_input().expect("input");

    let err = replayer
        .expect_llm(Some("stock price of ACME"))
        .expect_err("must diverge");
    assert!(err.is_divergence());
    let rendered = err.to_string();
    assert!(rendered.contains("stock price of ACME"));
    assert!(rendered.contains("weather in Paris"));
}

#[test]
fn test_diff_pinpoints_payload_change() {
    let dir = tempdir().expect("tempdir");
    let paris = capture_weather(dir.path(), "Paris");
    let tokyo = capture_weather(dir.path(), "Tokyo");

    let reader = TraceReader::new(dir.path());
    let a = reader.get_events(&paris).expect("a");
    let b = reader.get_events(&tokyo).expect("b");

    let entries = diff_traces(&a, &b);
    // identical shape; only the city varies, in the input, the request
    // prompt, and nothing else (ids, seqs, timestamps are normalized out)
    assert!(!entries.is_empty());
    for entry in &entries {
        assert!(
            entry.path.contains("payload"),
            "unexpected diff at {}",
            entry.path
        );
    }
}

#[test]
fn test_diff_of_identical_traces_is_empty() {
    let dir = tempdir().expect("tempdir");
    let trace_id = capture_weather(dir.path(), "Paris");
    let reader = TraceReader::new(dir.path());
    let events = reader.get_events(&trace_id).expect("events");

    assert!(diff_traces(&events, &events).is_empty());
}

#[test]
fn test_index_rebuilds_from_log() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let trace_id = capture_weather(dir.path(), "Paris");

    let reader = TraceReader::new(dir.path());
    let index = SqliteIndex::in_memory()?;
    rebuild_from_log(&index, &reader, &trace_id)?;

    let listed = index.list_traces(50)?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, trace_id);
    assert_eq!(listed[0].name, "weather");
    assert_eq!(listed[0].event_count, 5);
    assert_eq!(listed[0].status.as_deref(), Some("ok"));

    let hits = index.search_events("Sunny", 10)?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].kind, kind::LLM_RESPONSE);
    Ok(())
}
