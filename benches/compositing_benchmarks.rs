use backdrop::{
    compositor::{compose, prepare_background, DEFAULT_PAD_COLOR},
    types::{Position, ScaleMode, Size},
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

fn gradient_background(width: u32, height: u32) -> DynamicImage {
    let mut image = RgbImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]);
    }
    DynamicImage::ImageRgb8(image)
}

fn ellipse_cutout(size: Size) -> RgbaImage {
    let (w, h) = (f64::from(size.width()), f64::from(size.height()));
    RgbaImage::from_fn(size.width(), size.height(), |x, y| {
        let dx = (f64::from(x) - w / 2.0) / (w * 0.4);
        let dy = (f64::from(y) - h / 2.0) / (h * 0.45);
        let alpha = if dx * dx + dy * dy <= 1.0 { 255 } else { 0 };
        Rgba([200, 150, 100, alpha])
    })
}

fn bench_prepare_background(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare_background");
    let background = gradient_background(1920, 1080);
    let target = Size::new(800, 1000).expect("non-zero target");

    for mode in ScaleMode::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(mode), &mode, |b, &mode| {
            b.iter(|| {
                prepare_background(
                    black_box(&background),
                    target,
                    mode,
                    Position::Center,
                    DEFAULT_PAD_COLOR,
                )
            });
        });
    }
    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");

    for (width, height) in [(512, 512), (1024, 768), (2048, 1536)] {
        let target = Size::new(width, height).expect("non-zero target");
        let background = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let foreground = ellipse_cutout(target);

        group.bench_with_input(
            BenchmarkId::from_parameter(target),
            &target,
            |b, &target| {
                b.iter(|| compose(black_box(&background), black_box(&foreground), target));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_prepare_background, bench_compose);
criterion_main!(benches);
