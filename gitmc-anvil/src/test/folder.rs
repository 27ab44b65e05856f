use std::fs;

use super::chunk_doc;
use crate::folder::{
    chunk_mode_marker_name, combine_region, explode_chunks, explode_region, REGION_INFO_FILE,
};
use crate::{create_region_file, open_region, Error, RCoord};

#[test]
fn explode_then_combine_preserves_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let mca = dir.path().join("r.0.-1.mca");

    // r.0.-1 spans cx 0..=31, cz -32..=-1.
    let mut region = create_region_file(&mca).unwrap();
    for (cx, cz) in [(0, -32), (31, -1), (5, -20)] {
        let doc = chunk_doc(cx, cz);
        let local_x = crate::CCoord(cx).local();
        let local_z = crate::CCoord(cz).local();
        region
            .write_chunk(local_x, local_z, &gitmc_nbt::to_bytes(&doc).unwrap())
            .unwrap();
    }
    drop(region);

    let folder = dir.path().join("out").join("r.0.-1.mca");
    let outcome = explode_region(&mca, &folder).unwrap();
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.written.len(), 3);
    assert!(folder.join("chunk_0_-32.snbt").exists());
    assert!(folder.join("chunk_31_-1.snbt").exists());
    assert!(folder.join("chunk_5_-20.snbt").exists());
    assert!(dir
        .path()
        .join("out")
        .join(chunk_mode_marker_name(RCoord(0), RCoord(-1)))
        .exists());

    let rebuilt_path = dir.path().join("rebuilt").join("r.0.-1.mca");
    let outcome = combine_region(&folder, &rebuilt_path).unwrap();
    assert_eq!(outcome.chunks, 3);
    assert!(outcome.warnings.is_empty());

    let mut rebuilt = open_region(&rebuilt_path).unwrap();
    for (cx, cz) in [(0, -32), (31, -1), (5, -20)] {
        let doc = rebuilt
            .read_chunk_document(crate::CCoord(cx).local(), crate::CCoord(cz).local())
            .unwrap()
            .unwrap();
        assert_eq!(doc, chunk_doc(cx, cz));
    }
    assert_eq!(rebuilt.chunks().len(), 3);
}

#[test]
fn combine_allocates_like_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let mca = dir.path().join("r.0.0.mca");

    // Written z-major, matching the combine order.
    let mut region = create_region_file(&mca).unwrap();
    for (x, z) in [(0usize, 0usize), (3, 0), (0, 7)] {
        region
            .write_chunk(x, z, &gitmc_nbt::to_bytes(&chunk_doc(x as i32, z as i32)).unwrap())
            .unwrap();
    }
    drop(region);

    let folder = dir.path().join("out").join("r.0.0.mca");
    explode_region(&mca, &folder).unwrap();
    let rebuilt_path = dir.path().join("rebuilt").join("r.0.0.mca");
    combine_region(&folder, &rebuilt_path).unwrap();

    let original = open_region(&mca).unwrap();
    let rebuilt = open_region(&rebuilt_path).unwrap();
    let strip =
        |infos: Vec<crate::ChunkInfo>| -> Vec<(usize, usize, usize, usize)> {
            infos
                .into_iter()
                .map(|i| (i.x, i.z, i.offset, i.sectors))
                .collect()
        };
    assert_eq!(strip(original.chunks()), strip(rebuilt.chunks()));
}

#[test]
fn empty_region_gets_region_info() {
    let dir = tempfile::tempdir().unwrap();
    let mca = dir.path().join("r.2.2.mca");
    create_region_file(&mca).unwrap().flush().unwrap();

    let folder = dir.path().join("out").join("r.2.2.mca");
    let outcome = explode_region(&mca, &folder).unwrap();
    assert_eq!(outcome.written.len(), 1);
    let info = fs::read_to_string(folder.join(REGION_INFO_FILE)).unwrap();
    assert!(info.contains("IsEmpty"));
    assert!(info.contains("RegionCoordinates"));

    let rebuilt_path = dir.path().join("rebuilt").join("r.2.2.mca");
    let outcome = combine_region(&folder, &rebuilt_path).unwrap();
    assert_eq!(outcome.chunks, 0);
    assert!(open_region(&rebuilt_path).unwrap().is_empty());
}

#[test]
fn explode_chunks_is_selective() {
    let dir = tempfile::tempdir().unwrap();
    let mca = dir.path().join("r.0.0.mca");
    let mut region = create_region_file(&mca).unwrap();
    for (x, z) in [(0usize, 0usize), (1, 0), (2, 0)] {
        region
            .write_chunk(x, z, &gitmc_nbt::to_bytes(&chunk_doc(x as i32, z as i32)).unwrap())
            .unwrap();
    }
    drop(region);

    let folder = dir.path().join("out").join("r.0.0.mca");
    let outcome = explode_chunks(&mca, &folder, &[(1, 0), (9, 9)]).unwrap();
    assert_eq!(outcome.written.len(), 1);
    assert!(folder.join("chunk_1_0.snbt").exists());
    assert!(!folder.join("chunk_0_0.snbt").exists());
    // (9, 9) is not present in the region.
    assert_eq!(outcome.warnings.len(), 1);
}

#[test]
fn file_name_wins_over_xpos() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("r.0.0.mca");
    fs::create_dir_all(&folder).unwrap();

    let doc = chunk_doc(5, 5);
    let text = gitmc_snbt::to_string(&doc.root, &gitmc_snbt::SnbtOptions::expanded());
    fs::write(folder.join("chunk_1_1.snbt"), text).unwrap();

    let rebuilt_path = dir.path().join("rebuilt").join("r.0.0.mca");
    let outcome = combine_region(&folder, &rebuilt_path).unwrap();
    assert_eq!(outcome.chunks, 1);
    assert_eq!(outcome.warnings.len(), 1);

    let mut rebuilt = open_region(&rebuilt_path).unwrap();
    // Stored where the file name said, not where xPos pointed.
    assert!(rebuilt.read_chunk_document(1, 1).unwrap().is_some());
    assert!(rebuilt.read_chunk_document(5, 5).unwrap().is_none());
}

#[test]
fn chunk_from_another_region_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("r.0.0.mca");
    fs::create_dir_all(&folder).unwrap();

    let doc = chunk_doc(40, 0);
    let text = gitmc_snbt::to_string(&doc.root, &gitmc_snbt::SnbtOptions::expanded());
    // cx 40 belongs to r.1.0, not r.0.0.
    fs::write(folder.join("chunk_40_0.snbt"), text).unwrap();

    let rebuilt_path = dir.path().join("rebuilt").join("r.0.0.mca");
    let outcome = combine_region(&folder, &rebuilt_path).unwrap();
    assert_eq!(outcome.chunks, 0);
    assert_eq!(outcome.warnings.len(), 1);
}

#[test]
fn snbt_parse_failure_aborts_the_region() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("r.0.0.mca");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("chunk_0_0.snbt"), "{definitely not snbt").unwrap();

    let rebuilt_path = dir.path().join("rebuilt").join("r.0.0.mca");
    assert!(matches!(
        combine_region(&folder, &rebuilt_path),
        Err(Error::ChunkSnbt { .. })
    ));
}
