use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use gatekeep_auth::AuthzServices;
use gatekeep_core::{PermissionId, SystemClock};
use gatekeep_infra::InMemoryEntityStore;

/// Build a store holding `users` users, each banned from every third permission.
fn populated(rt: &tokio::runtime::Runtime, users: usize) -> AuthzServices<Arc<InMemoryEntityStore>> {
    let services = AuthzServices::new(Arc::new(InMemoryEntityStore::new()), Arc::new(SystemClock));
    rt.block_on(async {
        let mut permissions = Vec::new();
        for i in 0..30 {
            let p = services
                .permissions
                .create_permission(&format!("perm_{i}"))
                .await
                .unwrap();
            permissions.push(p.id);
        }
        for u in 0..users {
            for p in permissions.iter().step_by(3) {
                services
                    .bans
                    .ban_user(&format!("user-{u}"), *p, "bench")
                    .await
                    .unwrap();
            }
        }
    });
    services
}

fn bench_is_user_banned(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("is_user_banned");
    group.throughput(Throughput::Elements(1));

    for users in [100usize, 1_000, 10_000] {
        let services = populated(&rt, users);
        group.bench_with_input(BenchmarkId::new("hit", users), &users, |b, &users| {
            let user = format!("user-{}", users / 2);
            b.iter(|| {
                rt.block_on(services.bans.is_user_banned(black_box(&user), PermissionId::new(1)))
                    .unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("miss", users), &users, |b, _| {
            b.iter(|| {
                rt.block_on(services.bans.is_user_banned(black_box("nobody"), PermissionId::new(2)))
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_is_user_banned);
criterion_main!(benches);
