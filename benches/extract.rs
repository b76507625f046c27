use criterion::{Criterion, criterion_group, criterion_main};
use httpgrep::search::extract_matches;
use httpgrep::{Config, DumpRecord, EventEmitter, MemoryStore, Project, SearchEngine, SearchOptions};
use regex::RegexBuilder;
use std::hint::black_box;
use std::sync::Arc;

fn raw_request(i: usize) -> String {
    format!(
        "POST /api/v1/items/{i}?api_key=k{i:08x} HTTP/1.1\r\nHost: api{}.example.com\r\n\
         Authorization: Bearer eyJhbGciOi.{i}.sig\r\nContent-Type: application/json\r\n\r\n\
         {{\"name\":\"item {i}\",\"tags\":[\"a\",\"b\",\"c\"]}}",
        i % 7
    )
}

fn criterion_benchmark(c: &mut Criterion) {
    let text: String = (0..200).map(raw_request).collect::<Vec<_>>().join("\n");
    let pattern = RegexBuilder::new(r"Host:\s*(\S+)|api_key=(\w+)")
        .case_insensitive(true)
        .build()
        .expect("valid pattern");

    c.bench_function("extract_whole_matches", |b| {
        b.iter(|| extract_matches(black_box(&text), &pattern, None))
    });
    c.bench_function("extract_capture_groups", |b| {
        b.iter(|| extract_matches(black_box(&text), &pattern, Some(&[2, 1][..])))
    });

    let mut store = MemoryStore::new(Some(Project {
        id: "1".into(),
        name: "bench".into(),
    }));
    for i in 1..=2_000 {
        store.push(DumpRecord {
            id: i.to_string(),
            request: raw_request(i),
            response: Some(format!("HTTP/1.1 200 OK\r\n\r\n{{\"id\":{i}}}")),
            in_scope: true,
        });
    }
    let engine = SearchEngine::new(Arc::new(store), Config::default());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    c.bench_function("search_memory_store", |b| {
        b.iter(|| {
            runtime
                .block_on(engine.search(
                    r"api_key=\w+",
                    &SearchOptions::default(),
                    &EventEmitter::silent(),
                ))
                .expect("search succeeds")
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
