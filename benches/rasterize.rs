use barcode_capture::capture::{Frame, PixelFormat};
use barcode_capture::snapshot::rasterize;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn frame(width: u32, height: u32, format: PixelFormat) -> Frame {
    let len = (width * height) as usize * format.channels();
    let pixels = (0..len).map(|i| (i % 251) as u8).collect();
    Frame::new(pixels, width, height, format, 1)
}

fn bench_rasterize(c: &mut Criterion) {
    let gray = frame(640, 480, PixelFormat::Luma8);
    let rgb = frame(1280, 720, PixelFormat::Rgb8);

    c.bench_function("rasterize 640x480 luma", |b| {
        b.iter(|| rasterize(black_box(&gray)).unwrap())
    });
    c.bench_function("rasterize 1280x720 rgb", |b| {
        b.iter(|| rasterize(black_box(&rgb)).unwrap())
    });
}

criterion_group!(benches, bench_rasterize);
criterion_main!(benches);
