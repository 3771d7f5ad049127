use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use planar_core::{FeatureConfig, Image};
use planar_fast::corner_detection::CornerDetector;
use planar_fast::refinement::KeypointRefinement;
use planar_fast::DetectorBuilder;

/// Create benchmark image with realistic corner patterns
fn create_benchmark_image(width: usize, height: usize, complexity: &str) -> Image {
    let mut img = Image::filled(width, height, 128);

    match complexity {
        "simple" => {
            let (cx, cy) = (width / 2, height / 2);
            for y in cy - 2..=cy + 2 {
                for x in cx - 2..=cx + 2 {
                    img.pixels[y * width + x] = 255;
                }
            }
        }
        "realistic" => {
            // Gradient with noise and a scattering of checker blobs
            for y in 0..height {
                for x in 0..width {
                    let gradient = ((x as f32 / width as f32) * 50.0) as u8;
                    let noise = ((x + y) % 7) as u8;
                    img.pixels[y * width + x] = 100 + gradient + noise;
                }
            }
            for i in 0..40 {
                let cx = 4 + (i * 37) % (width - 8);
                let cy = 4 + (i * 53) % (height - 8);
                for y in cy - 2..=cy + 2 {
                    for x in cx - 2..=cx + 2 {
                        img.pixels[y * width + x] = if (x + y) % 2 == 0 { 30 } else { 230 };
                    }
                }
            }
        }
        _ => {}
    }

    img
}

fn single_threaded_config() -> FeatureConfig {
    FeatureConfig {
        threshold: 20,
        patch_size: 15,
        ..FeatureConfig::default()
    }
}

/// Benchmark full multi-scale detection
fn bench_full_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_detection");

    for &(width, height) in &[(128, 128), (256, 256), (512, 512)] {
        for complexity in ["simple", "realistic"] {
            let detector = DetectorBuilder::from_config(single_threaded_config())
                .build()
                .unwrap();
            let img = create_benchmark_image(width, height, complexity);

            group.bench_with_input(
                BenchmarkId::new(format!("{}x{}", width, height), complexity),
                &(detector, img),
                |b, (detector, img)| b.iter(|| black_box(detector.detect_keypoints(black_box(img)).unwrap())),
            );
        }
    }

    group.finish();
}

/// Benchmark individual pipeline stages
fn bench_pipeline_stages(c: &mut Criterion) {
    let img = create_benchmark_image(256, 256, "realistic");
    let mut group = c.benchmark_group("pipeline_stages");

    group.bench_function("segment_test_scan", |b| {
        b.iter(|| black_box(CornerDetector::detect(black_box(&img), 20)))
    });

    let scored = CornerDetector::detect(&img, 20);
    group.bench_function("non_maximum_suppression", |b| {
        b.iter(|| black_box(KeypointRefinement::non_maximum_suppression(black_box(&scored), 3.0)))
    });

    group.bench_function("orientation", |b| {
        b.iter(|| black_box(KeypointRefinement::compute_orientation(black_box(&img), 128.0, 128.0, 31)))
    });

    group.finish();
}

criterion_group!(benches, bench_full_detection, bench_pipeline_stages);
criterion_main!(benches);
