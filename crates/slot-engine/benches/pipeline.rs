use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use slot_engine::plan::{plan, BusyInterval, PlanRequest};

/// A 30-day horizon with `per_day` one-hour meetings every day.
fn request(per_day: usize) -> PlanRequest {
    let mut busy = Vec::new();
    for day in 0..30 {
        for slot in 0..per_day {
            let hour = 8 + (slot * 2) % 14;
            let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
                + chrono::Duration::days(day);
            busy.push(BusyInterval {
                start: format!("{}T{:02}:00:00Z", date, hour),
                end: format!("{}T{:02}:00:00Z", date, hour + 1),
            });
        }
    }

    PlanRequest {
        busy,
        time_min: "2026-03-02T00:00:00Z".to_string(),
        time_max: "2026-04-01T00:00:00Z".to_string(),
        total_minutes: 600,
        min_chunk_minutes: 15,
        max_chunk_minutes: 120,
        reference_timezone: "Z".to_string(),
        display_timezone: Some("-05:00".to_string()),
        until: "2026-12-31T23:59:59Z".to_string(),
        week_start: None,
    }
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");

    for per_day in [0usize, 4, 7] {
        let req = request(per_day);
        group.bench_with_input(BenchmarkId::new("30_days", per_day), &req, |b, req| {
            b.iter(|| plan(black_box(req)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan);
criterion_main!(benches);
