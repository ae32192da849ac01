mod common;

use common::*;
use rawtrack::{io::Cursor, ImageFormat, LayoutFlags, OpenParams, RawImage, TrackEncoding};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A TI-99 sector dump with a Volume Information Block in sector 0.
fn ti99_image(total_bytes: usize, tracks_per_side: u8, sides: u8) -> Vec<u8> {
    let mut image = patterned(total_bytes);
    image[..10].copy_from_slice(b"DISKNAME  ");
    let tot_secs = (total_bytes / 256) as u16;
    image[10..12].copy_from_slice(&tot_secs.to_be_bytes());
    image[12] = 9;
    image[13..16].copy_from_slice(b"DSK");
    image[16] = 0;
    image[17] = tracks_per_side;
    image[18] = sides;
    image[19] = 1;
    image
}

#[test]
fn test_ti99_dsdd80() {
    init();
    let im = RawImage::open(
        Cursor::new(ti99_image(737_280, 80, 2)),
        ImageFormat::Ti99,
        OpenParams::default(),
    )
    .unwrap();
    let geom = im.geometry();
    assert_eq!(geom.nr_cyls, 80);
    assert_eq!(geom.nr_sides, 2);
    assert_eq!(geom.tracks[0].nr_sectors, 18);
    assert!(!geom.tracks[0].is_fm);
    assert_eq!(geom.tracks[0].interleave, 5);
    assert_eq!(geom.tracks[0].cskew, 3);
    assert_eq!(
        geom.layout,
        LayoutFlags::SEQUENTIAL | LayoutFlags::REVERSE_SIDE_1
    );
    assert_eq!(im.encoding(), TrackEncoding::Mfm);
    // Sectors are numbered from zero.
    assert_eq!(geom.track_sectors(&geom.tracks[0])[0].r, 0);
}

#[test]
fn test_ti99_sssd_fm() {
    init();
    // 90k single-sided single-density, no VIB.
    let im = RawImage::open(
        Cursor::new(patterned(92_160)),
        ImageFormat::Ti99,
        OpenParams::default(),
    )
    .unwrap();
    let geom = im.geometry();
    assert_eq!(geom.nr_cyls, 40);
    assert_eq!(geom.nr_sides, 1);
    assert_eq!(geom.tracks[0].nr_sectors, 9);
    assert!(geom.tracks[0].is_fm);
    assert_eq!(geom.tracks[0].gap_3, Some(44));
}

#[test]
fn test_ti99_ssdd_disambiguation() {
    init();
    // 180k is DSSD unless the VIB says single-sided (SSDD).
    let im = RawImage::open(
        Cursor::new(ti99_image(184_320, 40, 1)),
        ImageFormat::Ti99,
        OpenParams::default(),
    )
    .unwrap();
    assert_eq!(im.geometry().nr_sides, 1);
    assert_eq!(im.geometry().tracks[0].nr_sectors, 18);
    assert!(!im.geometry().tracks[0].is_fm);

    let im = RawImage::open(
        Cursor::new(patterned(184_320)),
        ImageFormat::Ti99,
        OpenParams::default(),
    )
    .unwrap();
    assert_eq!(im.geometry().nr_sides, 2);
    assert_eq!(im.geometry().tracks[0].nr_sectors, 9);
    assert!(im.geometry().tracks[0].is_fm);
}

#[test]
fn test_ti99_reverse_side_1_file_order() {
    init();
    let image = ti99_image(737_280, 80, 2);
    let mut im = RawImage::open(
        Cursor::new(image.clone()),
        ImageFormat::Ti99,
        OpenParams::default(),
    )
    .unwrap();
    let mut bufs = buffers();

    // Side 0 is sequential from the start of the file.
    im.setup_track(&mut bufs, 4, None).unwrap(); // cylinder 2, head 0
    assert_eq!(im.track_offset(), 2 * 18 * 256);

    // Side 1 comes after all of side 0 and runs outward-in: cylinder 0 is
    // the last track of the file.
    im.setup_track(&mut bufs, 1, None).unwrap(); // cylinder 0, head 1
    assert_eq!(im.track_offset(), (80 + 79) as u64 * 18 * 256);

    // Bad-sector-map footer is tolerated and ignored.
    let mut with_footer = image;
    with_footer.extend_from_slice(&[0u8; 3 * 256]);
    let im = RawImage::open(Cursor::new(with_footer), ImageFormat::Ti99, OpenParams::default());
    assert!(im.is_ok());
}
