//! ifmem benchmark suite.
//!
//! Per-turn targets (one player command, no narrator):
//!   parse_engine_facts ............ < 20μs
//!   ingest_turn_40_scenes ......... < 50μs
//!   context_snapshot_40_scenes .... < 200μs
//!   render_builtin_spec ........... < 300μs

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ifmem_core::{parse_engine_facts, MemoryConfig, SceneMemoryStore};
use ifmem_llm::{render, PromptSpec};

const TRANSCRIPT: &str = "Attic            Score: 10        Moves: 42\n\n\
    Attic\n\
    This is the attic. The only exit is a stairway leading down.\n\
    A large coil of rope is lying in the corner.\n\
    On a table is a nasty-looking knife.\n\
    There is a brass lantern here.";

fn room_transcript(room: u32, moves: u32) -> String {
    format!(
        "Room {room}            Score: {score}        Moves: {moves}\n\n\
         Room {room}\n\
         You are in room number {room}. Passages lead in every direction.\n\
         There is a small brass key here.",
        score = moves / 4
    )
}

/// A store that has walked through `rooms` rooms, each visited twice.
fn walked_store(rooms: u32) -> SceneMemoryStore {
    let mut store = SceneMemoryStore::new("Ava", MemoryConfig::default());
    for lap in 0..2 {
        for i in 0..rooms {
            let transcript = room_transcript(i, i + lap * rooms);
            let facts = parse_engine_facts(&transcript);
            let previous = store.current_room().map(str::to_string);
            store.ingest(&facts, Some("north"), previous.as_deref(), Some(&transcript));
        }
    }
    store
}

/// Benchmark: parse one transcript.
fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_engine_facts", |b| {
        b.iter(|| black_box(parse_engine_facts(black_box(TRANSCRIPT))));
    });
}

/// Benchmark: ingest one turn into a store that already knows 40 scenes.
fn bench_ingest(c: &mut Criterion) {
    let facts = parse_engine_facts(TRANSCRIPT);
    c.bench_function("ingest_turn_40_scenes", |b| {
        b.iter_batched(
            || walked_store(40),
            |mut store| {
                store.ingest(&facts, Some("take lantern"), Some("Room 39"), Some(TRANSCRIPT));
                black_box(store);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

/// Benchmark: snapshot a store with 40 scenes.
fn bench_snapshot(c: &mut Criterion) {
    let store = walked_store(40);
    c.bench_function("context_snapshot_40_scenes", |b| {
        b.iter(|| black_box(store.context_snapshot()));
    });
}

/// Benchmark: render the built-in narration spec for a busy scene.
fn bench_render(c: &mut Criterion) {
    let mut store = walked_store(10);
    let facts = parse_engine_facts(TRANSCRIPT);
    for command in ["look", "take knife", "take rope", "examine table"] {
        store.ingest(&facts, Some(command), Some("Attic"), Some(TRANSCRIPT));
        store.append_narration(None, &format!("You {command}, and dust stirs."));
    }
    let context = store
        .context_snapshot()
        .to_json()
        .unwrap_or_else(|e| panic!("snapshot serializes: {e}"));
    let spec = PromptSpec::builtin().unwrap_or_else(|e| panic!("builtin spec: {e}"));

    c.bench_function("render_builtin_spec", |b| {
        b.iter(|| black_box(render(black_box(&context), &spec)));
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_ingest,
    bench_snapshot,
    bench_render,
);
criterion_main!(benches);
