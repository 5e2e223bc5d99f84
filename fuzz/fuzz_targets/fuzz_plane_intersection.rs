#![no_main]

use libfuzzer_sys::fuzz_target;
use medgeom::{Line3, PlaneFrame};
use nalgebra::{Point3, Vector3};

fuzz_target!(|data: ([f64; 3], [f64; 3], [f64; 3], [f64; 3], [f64; 3])| {
    // Plane construction, intersection and the rectangle clip must not panic
    // for any origin or normal
    let (origin_a, normal_a, origin_b, normal_b, direction) = data;

    let Ok(a) = PlaneFrame::from_origin_and_normal(&Point3::from(origin_a), &Vector3::from(normal_a))
    else {
        return;
    };
    let Ok(b) = PlaneFrame::from_origin_and_normal(&Point3::from(origin_b), &Vector3::from(normal_b))
    else {
        return;
    };

    let _ = a.is_parallel(&b);
    let _ = a.intersection_line(&b);
    let _ = a.intersect_with_plane_2d(&b);

    let line = Line3::new(Point3::from(origin_b), Vector3::from(direction));
    let _ = a.intersection_point(&line);
    let _ = a.intersection_param(&line);
    let _ = a.angle_with_line(&line);
    if let Ok((mapped, _)) = a.map_to_plane(&Point3::from(origin_b)) {
        let _ = a.map_from_plane(&mapped);
    }
});
