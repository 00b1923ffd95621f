use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use lk_align::*;

fn scene(mode: WarpMode, template_size: usize) -> SyntheticScene {
    SyntheticScene::generate(&SyntheticParams {
        mode,
        width: 256,
        height: 256,
        template_size,
        ..SyntheticParams::default()
    })
    .unwrap()
}

fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration");
    for mode in [WarpMode::Translation, WarpMode::Affine] {
        let scene = scene(mode, 64);
        for kind in AlgorithmKind::ALL {
            let mut aligner = AlignerBuilder::new().mode(mode).algorithm(kind).build();
            aligner
                .prepare(&scene.template, &scene.target, &scene.initial, 1)
                .unwrap();
            let id = format!("{}/{}", mode, kind);
            group.bench_with_input(BenchmarkId::new("align", &id), &scene.initial, |b, w| {
                b.iter(|| {
                    let mut warp = *w;
                    aligner.align(black_box(&mut warp)).unwrap();
                    warp
                })
            });
        }
    }
    group.finish();
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare");
    for size in [32, 64, 128] {
        let scene = scene(WarpMode::Affine, size);
        for kind in AlgorithmKind::ALL {
            let id = format!("{}x{}/{}", size, size, kind);
            group.bench_with_input(BenchmarkId::new("affine", &id), &scene, |b, s| {
                b.iter(|| {
                    let mut aligner = AlignerBuilder::new()
                        .mode(WarpMode::Affine)
                        .algorithm(kind)
                        .build();
                    aligner
                        .prepare(black_box(&s.template), black_box(&s.target), &s.initial, 3)
                        .unwrap();
                })
            });
        }
    }
    group.finish();
}

fn bench_pyramid(c: &mut Criterion) {
    let mut group = c.benchmark_group("pyramid");
    for size in [256, 512, 1024] {
        let image = random_texture(size, size, 1);
        group.bench_with_input(BenchmarkId::new("create", size), &image, |b, i| {
            b.iter(|| ImagePyramid::create(black_box(i), 4).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_iteration, bench_prepare, bench_pyramid);
criterion_main!(benches);
