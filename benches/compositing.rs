//! Benchmarks for layout planning and compositing
//!
//! Planning is pure integer math and should stay far below a microsecond;
//! compositing is dominated by the Lanczos resize.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use vidstage_compose::{fit_inside, plan, CanvasSpec, CompositeOptions, Compositor};

const SIZES: [&str; 4] = ["480x854", "720x1280", "1280x720", "1080x1920"];

fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");

    for size in SIZES {
        let spec = CanvasSpec::new(size.parse().unwrap());
        group.bench_with_input(BenchmarkId::from_parameter(size), &spec, |b, spec| {
            b.iter(|| plan(black_box(spec)).unwrap());
        });
    }

    group.bench_function("fit_inside", |b| {
        b.iter(|| fit_inside(black_box((4032, 3024)), black_box((318, 1108))).unwrap());
    });

    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    group.sample_size(20);

    let compositor = Compositor::new(CompositeOptions::default()).unwrap();
    let before = solid(1024, 768, [200, 60, 60]);
    let after = solid(768, 1024, [60, 60, 200]);

    for size in ["480x854", "720x1280"] {
        let geometry = plan(&CanvasSpec::new(size.parse().unwrap())).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &geometry, |b, geometry| {
            b.iter(|| compositor.compose(black_box(&before), black_box(&after), geometry).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan, bench_compose);
criterion_main!(benches);
