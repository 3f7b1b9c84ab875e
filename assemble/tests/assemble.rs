// Assembly testing.

use std::{collections::BTreeMap, fs, path::Path};

use assemble::{Assembly, Error, PartitionMap, Request, PAD};
use simflash::gen::GenBuilder;
use simflash::styles;
use temp_dir::TempDir;

fn table(items: &[(&str, u64)]) -> BTreeMap<String, u64> {
    items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// mcuboot at 0 with 0x8000 bytes, image-0 right after with 0x10000.
fn small_map() -> PartitionMap {
    PartitionMap::load(
        &table(&[("mcuboot", 0), ("image-0", 0x8000)]),
        &table(&[("mcuboot", 0x8000), ("image-0", 0x10000)]),
        false,
    )
    .unwrap()
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).unwrap().len()
}

#[test]
fn concrete_layout() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("full.bin");

    let boot = GenBuilder::default().size(0x100).seed(1).build().unwrap();
    let app = GenBuilder::default().size(0x9000).seed(2).build().unwrap();

    let mut assembly = Assembly::new(small_map(), &output).unwrap();
    assert_eq!(assembly.cursor().unwrap(), 0);

    let placed = assembly.add_image(boot.path(), "mcuboot").unwrap();
    assert_eq!(placed.offset, 0);
    assert_eq!(placed.padding, 0);
    assert_eq!(placed.len, 0x100);
    assert_eq!(assembly.cursor().unwrap(), 0x100);

    let placed = assembly.add_image(app.path(), "image-0").unwrap();
    assert_eq!(placed.offset, 0x8000);
    assert_eq!(placed.padding, 0x8000 - 0x100);
    assert_eq!(assembly.placements().len(), 2);

    let summary = assembly.finish().unwrap();
    assert_eq!(summary.len, 0x11000);

    let data = fs::read(&output).unwrap();
    assert_eq!(data.len(), 0x11000);
    assert_eq!(&data[..0x100], &boot.data[..]);
    assert!(data[0x100..0x8000].iter().all(|&b| b == PAD));
    assert_eq!(&data[0x8000..], &app.data[..]);
}

#[test]
fn summary_digest() {
    use sha2::{Digest, Sha256};

    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("full.bin");
    let boot = GenBuilder::default().size(0x2345).seed(3).build().unwrap();
    let app = GenBuilder::default().size(0x4567).seed(4).build().unwrap();

    let mut assembly = Assembly::new(small_map(), &output).unwrap();
    assembly
        .place_all(&[
            Request::new(boot.path(), "mcuboot"),
            Request::new(app.path(), "image-0"),
        ])
        .unwrap();
    let summary = assembly.finish().unwrap();

    let expect = Sha256::digest(fs::read(&output).unwrap());
    assert_eq!(&summary.sha256[..], expect.as_slice());
    assert_eq!(summary.sha256_hex().len(), 64);
    assert_eq!(summary.output, output);
    assert_eq!(summary.placements.len(), 2);
}

#[test]
fn rerun_is_identical() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("full.bin");
    let boot = GenBuilder::default().size(0x1000).seed(5).build().unwrap();
    let app = GenBuilder::default().size(0x3000).seed(6).build().unwrap();
    let requests = [
        Request::new(boot.path(), "mcuboot"),
        Request::new(app.path(), "image-0"),
    ];

    // Leave something larger than the result behind, to be sure it is
    // discarded rather than overwritten in place.
    fs::write(&output, vec![0x5a; 0x40000]).unwrap();

    let mut results = Vec::new();
    for _ in 0..2 {
        let mut assembly = Assembly::new(small_map(), &output).unwrap();
        assembly.place_all(&requests).unwrap();
        assembly.finish().unwrap();
        results.push(fs::read(&output).unwrap());
    }
    assert_eq!(results[0].len(), 0x8000 + 0x3000);
    assert_eq!(results[0], results[1]);
}

#[test]
fn oversized_image() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("full.bin");
    let boot = GenBuilder::default().size(0x100).build().unwrap();
    let app = GenBuilder::default().size(0x10001).build().unwrap();

    let mut assembly = Assembly::new(small_map(), &output).unwrap();
    assembly.add_image(boot.path(), "mcuboot").unwrap();

    match assembly.add_image(app.path(), "image-0") {
        Err(Error::OversizedImage {
            partition,
            len,
            size,
            image,
        }) => {
            assert_eq!(partition, "image-0");
            assert_eq!(len, 0x10001);
            assert_eq!(size, 0x10000);
            assert_eq!(image, app.path());
        }
        other => panic!("unexpected: {:?}", other),
    }

    // The padding up to the partition goes out before the size is checked,
    // but none of the image does.
    assert_eq!(file_len(&output), 0x8000);
    let data = fs::read(&output).unwrap();
    assert!(data[0x100..].iter().all(|&b| b == PAD));
    assert_eq!(assembly.placements().len(), 1);
}

#[test]
fn exact_fit() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("full.bin");
    let boot = GenBuilder::default().size(0x8000).build().unwrap();

    let mut assembly = Assembly::new(small_map(), &output).unwrap();
    let placed = assembly.add_image(boot.path(), "mcuboot").unwrap();
    assert_eq!(placed.len, 0x8000);

    // An image filling its partition leaves the cursor right at the next one.
    let app = GenBuilder::default().size(0).build().unwrap();
    let placed = assembly.add_image(app.path(), "image-0").unwrap();
    assert_eq!(placed.padding, 0);
    assert_eq!(file_len(&output), 0x8000);
}

#[test]
fn out_of_order() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("full.bin");
    let map = PartitionMap::load(
        &table(&[("mcuboot", 0x1000), ("image-0", 0x2000)]),
        &table(&[("mcuboot", 0x1000), ("image-0", 0x1000)]),
        false,
    )
    .unwrap();
    let boot = GenBuilder::default().size(0x80).build().unwrap();
    let app = GenBuilder::default().size(0x80).build().unwrap();

    let mut assembly = Assembly::new(map, &output).unwrap();
    assembly.add_image(app.path(), "image-0").unwrap();
    assert_eq!(file_len(&output), 0x2080);

    match assembly.add_image(boot.path(), "mcuboot") {
        Err(Error::OutOfOrder {
            partition,
            offset,
            cursor,
        }) => {
            assert_eq!(partition, "mcuboot");
            assert_eq!(offset, 0x1000);
            assert_eq!(cursor, 0x2080);
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(file_len(&output), 0x2080);

    // Placing the same partition twice is also going backwards.
    assert!(matches!(
        assembly.add_image(app.path(), "image-0"),
        Err(Error::OutOfOrder { .. })
    ));
}

#[test]
fn unknown_partition() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("full.bin");
    let app = GenBuilder::default().size(0x80).build().unwrap();

    let mut assembly = Assembly::new(small_map(), &output).unwrap();
    match assembly.add_image(app.path(), "image-1") {
        Err(Error::UnknownPartition { partition }) => assert_eq!(partition, "image-1"),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(file_len(&output), 0);
}

#[test]
fn missing_source() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("full.bin");

    let mut assembly = Assembly::new(small_map(), &output).unwrap();
    let err = assembly
        .add_image(&tmp.path().join("nothing.bin"), "mcuboot")
        .unwrap_err();
    assert!(matches!(err, Error::Io { op: assemble::Op::Read, .. }), "{:?}", err);
}

#[test]
fn output_cannot_be_removed() {
    let tmp = TempDir::new().unwrap();
    // A directory in the way of the output can't be removed as a file.
    let output = tmp.path().join("full.bin");
    fs::create_dir(&output).unwrap();

    match Assembly::new(small_map(), &output) {
        Err(Error::Io { op, .. }) => assert_eq!(op, assemble::Op::Remove),
        Err(e) => panic!("unexpected: {:?}", e),
        Ok(_) => panic!("directory removed as output"),
    }
}

/// Assemble an image for each of the boards, flash it, and make sure each
/// image reads back from its own partition with erased flash in between.
#[test]
fn all_boards() {
    for board in styles::all_boards() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("full.bin");
        let map = PartitionMap::from_source(board, board.is_dual()).unwrap();

        let names: &[&str] = if board.is_dual() {
            &["mcuboot", "image-0", "image-1"]
        } else {
            &["mcuboot", "image-0"]
        };

        let mut images = Vec::new();
        for (seed, name) in names.iter().enumerate() {
            let part = map.get(name).unwrap();
            // Something that isn't a round number, and well inside the partition.
            let size = (part.size as usize / 3) + 13;
            images.push(GenBuilder::default().size(size).seed(seed).build().unwrap());
        }

        let mut assembly = Assembly::new(map.clone(), &output).unwrap();
        for (name, image) in names.iter().zip(&images) {
            assembly.add_image(image.path(), name).unwrap();
        }
        let summary = assembly.finish().unwrap();

        let data = fs::read(&output).unwrap();
        let mut flash = board.build().unwrap();
        flash.install(&data, 0).unwrap();

        let mut last_end = 0;
        for (name, image) in names.iter().zip(&images) {
            let part = map.get(name).unwrap();
            let offset = part.offset as usize;
            assert!(
                flash.is_erased(last_end..offset),
                "{}: gap before {} not erased",
                board.name,
                name
            );
            assert_eq!(
                flash.read(offset, image.len()).unwrap(),
                &image.data[..],
                "{}: {} mismatch",
                board.name,
                name
            );
            last_end = offset + image.len();
        }
        assert_eq!(summary.len as usize, last_end);
        assert!(flash.is_erased(last_end..flash.capacity()));
    }
}
