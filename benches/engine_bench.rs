//! Benchmarks for nfs-loadgen
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::Path;

fn benchmark_check_status(c: &mut Criterion) {
    use nfs_loadgen::runner::check_status;

    c.bench_function("check_status_exact", |b| {
        b.iter(|| black_box(check_status(black_box("0x00000046"), black_box(70))))
    });

    c.bench_function("check_status_wildcard", |b| {
        b.iter(|| black_box(check_status(black_box("*"), black_box(2))))
    });
}

fn benchmark_script_parse(c: &mut Criterion) {
    use nfs_loadgen::script::Script;

    let text: String = (0..1000)
        .map(|i| {
            format!(
                "{}.{:03} WRITE3 \"/clients/client$CLIENT/file{}\" 0 65536 2 0x00000000\n",
                i / 1000,
                i % 1000,
                i
            )
        })
        .collect();

    c.bench_function("script_parse_1000_lines", |b| {
        b.iter(|| {
            let script = Script::parse(black_box(&text), Path::new("bench.load")).unwrap();
            black_box(script.len())
        })
    });
}

fn benchmark_dispatch_memory(c: &mut Criterion) {
    use nfs_loadgen::config::{BackendKind, RunConfig};
    use nfs_loadgen::nfs::{ConnectOptions, MemoryConnector};
    use nfs_loadgen::runner::LoadCoordinator;
    use nfs_loadgen::script::Script;
    use std::sync::Arc;
    use std::time::Duration;

    let script = "MKDIR3 \"/clients/client$CLIENT\" 0x0\n\
                  CREATE3 \"/clients/client$CLIENT/f\" 0x0\n\
                  WRITE3 \"/clients/client$CLIENT/f\" 0 8192 0 0x0\n\
                  READ3 \"/clients/client$CLIENT/f\" 0 8192 0x0\n";
    let options = ConnectOptions {
        timeout: Duration::from_secs(5),
        nlm: false,
    };

    c.bench_function("memory_run_4_clients", |b| {
        b.iter(|| {
            let script = Script::parse(script, Path::new("bench.load")).unwrap();
            let connector = Arc::new(MemoryConnector::new(options));
            let coordinator = LoadCoordinator::new(
                RunConfig::for_backend(BackendKind::Memory, 4),
                script,
                connector,
            );
            black_box(coordinator.run(None).unwrap().total_ops)
        })
    });
}

criterion_group!(
    benches,
    benchmark_check_status,
    benchmark_script_parse,
    benchmark_dispatch_memory
);
criterion_main!(benches);
