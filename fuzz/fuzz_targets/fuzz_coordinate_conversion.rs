#![no_main]

use libfuzzer_sys::arbitrary::{Arbitrary, Result, Unstructured};
use libfuzzer_sys::fuzz_target;
use medgeom::{AffineFrame, AffineTransform, Operation};
use nalgebra::{Matrix3, Point3, Vector3};

#[derive(Debug)]
struct FuzzFrame {
    matrix: [f64; 9],
    offset: [f64; 3],
    bounds: [f64; 6],
    image_geometry: bool,
    points: Vec<[f64; 3]>,
    angle_degrees: f64,
}

impl<'a> Arbitrary<'a> for FuzzFrame {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let point_count = u.int_in_range(0..=16)?;
        let mut points = Vec::with_capacity(point_count);
        for _ in 0..point_count {
            points.push(u.arbitrary()?);
        }
        Ok(FuzzFrame {
            matrix: u.arbitrary()?,
            offset: u.arbitrary()?,
            bounds: u.arbitrary()?,
            image_geometry: u.arbitrary()?,
            points,
            angle_degrees: u.arbitrary()?,
        })
    }
}

fuzz_target!(|data: FuzzFrame| {
    // Arbitrary matrices, including singular and non-finite ones, must only
    // ever produce errors, never panics
    let mut frame = AffineFrame::new();
    frame.set_transform(AffineTransform::new(
        Matrix3::from_row_slice(&data.matrix),
        Vector3::from(data.offset),
    ));
    let _ = frame.set_bounds(data.bounds);
    frame.set_image_geometry(data.image_geometry);

    for point in &data.points {
        let world = Point3::from(*point);
        if let Ok(index) = frame.world_to_index(&world) {
            let _ = frame.index_to_world(&index);
            let _ = frame.is_index_inside(&index);
        }
        let _ = frame.is_inside(&world);

        let _ = frame.apply_operation(&Operation::RotateAboutPoint {
            center: world,
            axis: Vector3::new(point[2], point[0], point[1]),
            angle_degrees: data.angle_degrees,
        });
    }

    let _ = frame.corner_points();
    let _ = frame.center();
    let _ = frame.set_spacing(&Vector3::new(data.offset[0], data.offset[1], data.offset[2]));
    let _ = frame.apply_operation(&Operation::ScaleAboutCenter {
        delta: Vector3::from(data.offset),
    });
});
