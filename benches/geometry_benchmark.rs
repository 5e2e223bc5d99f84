use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use medgeom::{
    AffineFrame, Operation, Orientation, PlaneFrame, SliceStack, StandardPlaneOptions,
    TimeBounds, compute_bounding_geometry,
};
use nalgebra::{Point3, Vector3};

/// Generate an image volume with the given number of voxels per side
fn generate_volume(size: f64) -> AffineFrame {
    let mut volume = AffineFrame::new();
    volume
        .set_bounds([0.0, size, 0.0, size, 0.0, size])
        .unwrap();
    volume.set_spacing(&Vector3::new(0.7, 0.7, 1.5)).unwrap();
    volume.set_image_geometry(true);
    volume
}

fn bench_coordinate_conversion(c: &mut Criterion) {
    let volume = generate_volume(256.0);
    let world = Point3::new(12.5, -40.0, 88.0);

    c.bench_function("world_to_index", |b| {
        b.iter(|| volume.world_to_index(black_box(&world)).unwrap());
    });
    c.bench_function("index_to_world", |b| {
        b.iter(|| volume.index_to_world(black_box(&world)));
    });
    c.bench_function("corner_points", |b| {
        b.iter(|| black_box(&volume).corner_points());
    });
}

fn bench_plane_geometry(c: &mut Criterion) {
    let transversal = PlaneFrame::from_origin_and_normal(&Point3::origin(), &Vector3::z()).unwrap();
    let oblique =
        PlaneFrame::from_origin_and_normal(&Point3::new(5.0, 5.0, 5.0), &Vector3::new(1.0, 2.0, 0.5))
            .unwrap();

    c.bench_function("intersection_line", |b| {
        b.iter(|| black_box(&transversal).intersection_line(black_box(&oblique)));
    });
    c.bench_function("intersect_with_plane_2d", |b| {
        b.iter(|| black_box(&transversal).intersect_with_plane_2d(black_box(&oblique)));
    });
}

fn bench_slice_stack(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice_stack");

    for size in [64.0, 256.0, 512.0].iter() {
        let volume = generate_volume(*size);
        group.bench_with_input(
            BenchmarkId::new("derive_all_slices", *size as usize),
            &volume,
            |b, volume| {
                b.iter(|| {
                    let mut stack = SliceStack::new();
                    stack
                        .initialize_planes(
                            volume,
                            true,
                            &StandardPlaneOptions::new(Orientation::Transversal),
                        )
                        .unwrap();
                    for index in 0..stack.slices() {
                        black_box(stack.slice(index));
                    }
                });
            },
        );
        group.bench_with_input(
            BenchmarkId::new("rotate_and_realign", *size as usize),
            &volume,
            |b, volume| {
                let mut stack = SliceStack::new();
                stack
                    .initialize_planes(
                        volume,
                        true,
                        &StandardPlaneOptions::new(Orientation::Sagittal),
                    )
                    .unwrap();
                let rotation = Operation::RotateAboutPoint {
                    center: volume.center(),
                    axis: Vector3::new(0.0, 1.0, 1.0),
                    angle_degrees: 3.0,
                };
                b.iter(|| stack.apply_operation(black_box(&rotation)).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_bounding_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounding_geometry");

    for count in [10usize, 100, 1000].iter() {
        let leaves: Vec<AffineFrame> = (0..*count)
            .map(|i| {
                let mut frame = generate_volume(32.0);
                frame.set_origin(&Point3::new(i as f64 * 3.0, 0.0, -(i as f64)));
                frame.set_time_bounds(TimeBounds::new(i as f64, i as f64 + 40.0));
                frame
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &leaves, |b, leaves| {
            b.iter(|| compute_bounding_geometry(black_box(leaves.as_slice()), |_| true));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_coordinate_conversion,
    bench_plane_geometry,
    bench_slice_stack,
    bench_bounding_geometry
);
criterion_main!(benches);
