// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use weekly_checkins::keys::Keys;
use weekly_checkins::models::{Athlete, EntityType, ItemMeta, Reward, RewardScope};
use weekly_checkins::services::find_one_away;

const HOST: &str = "host-1";
const NOW: &str = "2026-03-11T15:00:00.000Z";

fn athlete(i: u32) -> Athlete {
    let id = format!("athlete-{}", i);
    let last_name = format!("Rider{:05}", i);
    Athlete {
        meta: ItemMeta::new(
            Keys::athlete(&id, &last_name, "Pat", false),
            EntityType::Athlete,
            id,
            NOW,
        ),
        first_name: "Pat".to_string(),
        last_name,
        email: None,
        emergency_contact_name: None,
        emergency_contact_phone: None,
        last_week: HashMap::new(),
        global_count: i % 60,
        host_counts: HashMap::from([(HOST.to_string(), i % 25)]),
        disclaimers: HashMap::from([(HOST.to_string(), NOW.to_string())]),
        deleted: i % 50 == 0,
        revision: 0,
    }
}

fn reward(scope: RewardScope, threshold: u32) -> Reward {
    let id = format!("{:?}-{}", scope, threshold).to_lowercase();
    let host_id = (scope == RewardScope::Host).then(|| HOST.to_string());
    Reward {
        meta: ItemMeta::new(
            Keys::reward(&id, scope, host_id.as_deref(), threshold),
            EntityType::Reward,
            id,
            NOW,
        ),
        threshold,
        name: format!("{} check-ins", threshold),
        icon: String::new(),
        scope,
        host_id,
    }
}

fn benchmark_find_one_away(c: &mut Criterion) {
    let global: Vec<_> = [10, 25, 50]
        .into_iter()
        .map(|t| reward(RewardScope::Global, t))
        .collect();
    let host: Vec<_> = [5, 10, 20]
        .into_iter()
        .map(|t| reward(RewardScope::Host, t))
        .collect();

    let mut group = c.benchmark_group("one_away");
    for size in [100u32, 1_000, 10_000] {
        let athletes: Vec<_> = (0..size).map(athlete).collect();
        group.bench_function(format!("{}_athletes", size), |b| {
            b.iter(|| find_one_away(black_box(HOST), black_box(&athletes), &global, &host))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_find_one_away);
criterion_main!(benches);
