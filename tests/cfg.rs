mod common;

use common::*;
use rawtrack::{
    io::Cursor,
    ImageError,
    ImageFormat,
    LayoutFlags,
    OpenParams,
    RawImage,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open_with_cfg(
    data: Vec<u8>,
    config: &str,
    tag: Option<&str>,
) -> Result<RawImage<Cursor<Vec<u8>>>, ImageError> {
    RawImage::open(
        Cursor::new(data),
        ImageFormat::Img,
        OpenParams {
            tag,
            config: Some(config),
            ..OpenParams::default()
        },
    )
}

#[test]
fn test_tagged_section_beats_size_section() {
    init();
    let config = "
[::368640]
cyls = 40
heads = 2
secs = 9
bps = 512
id = 1

[xyz]
cyls = 80
heads = 1
secs = 9
bps = 512
id = 1
interleave = 2
rate = 250
";
    let im = open_with_cfg(patterned(368_640), config, Some("xyz")).unwrap();
    let geom = im.geometry();
    // The tag match (+4) outranks the empty-tag size match (+3).
    assert_eq!(geom.nr_cyls, 80);
    assert_eq!(geom.nr_sides, 1);
    assert_eq!(geom.tracks[0].interleave, 2);
    assert_eq!(geom.tracks[0].data_rate, Some(250));
}

#[test]
fn test_size_section_when_tag_misses() {
    init();
    let config = "
[::368640]
cyls = 40
heads = 2
secs = 9
bps = 512
id = 1

[xyz]
cyls = 80
heads = 1
secs = 9
bps = 512
";
    let im = open_with_cfg(patterned(368_640), config, Some("other")).unwrap();
    assert_eq!(im.geometry().nr_cyls, 40);
    assert_eq!(im.geometry().nr_sides, 2);
}

#[test]
fn test_mismatching_sections_fall_through_to_tables() {
    init();
    let config = "
[xyz::999]
cyls = 1
heads = 1
secs = 1
bps = 128
";
    // Size mismatch clobbers the only section; the generic table still
    // recognizes the 360k image.
    let im = open_with_cfg(patterned(368_640), config, Some("xyz")).unwrap();
    assert_eq!(im.geometry().nr_cyls, 40);
    assert_eq!(im.geometry().tracks[0].nr_sectors, 9);
}

#[test]
fn test_per_track_blocks() {
    init();
    // Options before the first "tracks" line form the default layout 0;
    // each "tracks" line opens a new block for the listed cylinders.
    let config = "
[dump]
cyls = 4
heads = 1
secs = 10
bps = 256
id = 0
mode = fm
tracks = 2-3
secs = 5
bps = 512
id = 1
";
    let size = 2 * 10 * 256 + 2 * 5 * 512;
    let im = open_with_cfg(patterned(size), config, Some("dump")).unwrap();
    let geom = im.geometry();
    assert_eq!(geom.tracks.len(), 2);
    assert_eq!(geom.map_entry(0, 0), Some(0));
    assert_eq!(geom.map_entry(1, 0), Some(0));
    assert_eq!(geom.map_entry(2, 0), Some(1));
    assert_eq!(geom.map_entry(3, 0), Some(1));

    let t0 = &geom.tracks[0];
    assert_eq!(t0.nr_sectors, 10);
    assert!(t0.is_fm);
    assert_eq!(geom.track_sectors(t0)[0], rawtrack::SectorId { r: 0, n: 1 });

    let t1 = &geom.tracks[1];
    assert_eq!(t1.nr_sectors, 5);
    // The second block inherits the section defaults, overridden per-block.
    assert!(t1.is_fm);
    assert_eq!(geom.track_sectors(t1)[0], rawtrack::SectorId { r: 1, n: 2 });

    // The canonical size follows the mixed layout.
    assert_eq!(im.extent(), size as u64);
}

#[test]
fn test_head_specific_tracks_and_file_layout() {
    init();
    let config = "
[mix]
cyls = 2
heads = 2
secs = 9
bps = 512
id = 1
file-layout = sequential, reverse-side1
tracks = 1.1
secs = 8
";
    let size = 3 * 9 * 512 + 8 * 512;
    let im = open_with_cfg(patterned(size), config, Some("mix")).unwrap();
    let geom = im.geometry();
    assert_eq!(
        geom.layout,
        LayoutFlags::SEQUENTIAL | LayoutFlags::REVERSE_SIDE_1
    );
    assert_eq!(geom.map_entry(0, 0), Some(0));
    assert_eq!(geom.map_entry(0, 1), Some(0));
    assert_eq!(geom.map_entry(1, 0), Some(0));
    assert_eq!(geom.map_entry(1, 1), Some(1));
    assert_eq!(geom.tracks[1].nr_sectors, 8);
}

#[test]
fn test_invalid_head_count_is_fatal() {
    init();
    let config = "
[bad]
cyls = 40
heads = 3
secs = 9
bps = 512
";
    let r = open_with_cfg(patterned(368_640), config, Some("bad"));
    assert!(matches!(r, Err(ImageError::BadImage)));
}

#[test]
fn test_gap_and_head_overrides() {
    init();
    let config = "
[ovr]
cyls = 40
heads = 1
secs = 9
bps = 512
id = 1
gap2 = 30
gap3 = a
gap4a = 12
h = 0
iam = no
rpm = 360
";
    let im = open_with_cfg(patterned(40 * 9 * 512), config, Some("ovr")).unwrap();
    let trk = &im.geometry().tracks[0];
    assert_eq!(trk.gap_2, Some(30));
    assert_eq!(trk.gap_3, None);
    assert_eq!(trk.gap_4a, Some(12));
    assert_eq!(trk.head, Some(0));
    assert!(!trk.has_iam);
    assert_eq!(trk.rpm, 360);
    assert_eq!(im.rpm(), 360);
}
