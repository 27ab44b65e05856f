use std::path::Path;

use crate::{
    chunk_file_name, coords_from_chunk_path, coords_from_region_path, external_file_name,
    region_file_name, CCoord, RCoord,
};

#[test]
fn region_names_round_trip() {
    for (rx, rz) in [(0, 0), (-1, -1), (12, -47)] {
        let name = region_file_name(RCoord(rx), RCoord(rz));
        let parsed = coords_from_region_path(Path::new(&name)).unwrap();
        assert_eq!(parsed, (RCoord(rx), RCoord(rz)));
    }
}

#[test]
fn chunk_names_round_trip() {
    for (cx, cz) in [(0, 0), (-1, -1), (12, -47)] {
        let name = chunk_file_name(CCoord(cx), CCoord(cz));
        let parsed = coords_from_chunk_path(Path::new(&name)).unwrap();
        assert_eq!(parsed, (CCoord(cx), CCoord(cz)));
    }
}

#[test]
fn bad_names_are_rejected() {
    assert!(coords_from_region_path(Path::new("region.mca")).is_err());
    assert!(coords_from_region_path(Path::new("r.1.mca")).is_err());
    assert!(coords_from_region_path(Path::new("r.a.b.mca")).is_err());
    assert!(coords_from_chunk_path(Path::new("chunk_1.snbt")).is_err());
    assert!(coords_from_chunk_path(Path::new("chunk_1_2_3.snbt")).is_err());
    assert!(coords_from_chunk_path(Path::new("other_1_2.snbt")).is_err());
}

#[test]
fn external_names_use_absolute_chunk_coords() {
    assert_eq!(external_file_name(CCoord(-1), CCoord(-1)), "c.-1.-1.mcc");
}

#[test]
fn negative_chunk_coordinates_map_into_their_region() {
    let c = CCoord(-1);
    assert_eq!(c.region(), RCoord(-1));
    assert_eq!(c.local(), 31);

    let c = CCoord(-32);
    assert_eq!(c.region(), RCoord(-1));
    assert_eq!(c.local(), 0);

    assert_eq!(RCoord(-1).chunk(31), CCoord(-1));
    assert_eq!(RCoord(0).chunk(0), CCoord(0));
    assert_eq!(RCoord(1).chunk(5), CCoord(37));
}
