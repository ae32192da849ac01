mod common;

use common::*;
use rawtrack::{io::Cursor, HostSystem, ImageFormat, LayoutFlags, OpenParams, RawImage};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open(data: Vec<u8>, format: ImageFormat) -> RawImage<Cursor<Vec<u8>>> {
    RawImage::open(Cursor::new(data), format, OpenParams::default()).unwrap()
}

#[test]
fn test_opd() {
    init();
    let im = open(patterned(184_320), ImageFormat::Opd);
    let geom = im.geometry();
    assert_eq!((geom.nr_cyls, geom.nr_sides), (40, 1));
    assert_eq!(geom.tracks[0].nr_sectors, 18);
    assert_eq!(geom.tracks[0].interleave, 13);
    assert_eq!(geom.tracks[0].cskew, 13);
    assert_eq!(geom.track_sectors(&geom.tracks[0])[0].r, 0);

    let im = open(patterned(737_280), ImageFormat::Opd);
    assert_eq!((im.geometry().nr_cyls, im.geometry().nr_sides), (80, 2));
}

#[test]
fn test_sdu() {
    init();
    let mut image = vec![0u8; 46];
    image[30..32].copy_from_slice(&80u16.to_le_bytes()); // max cyls
    image[32..34].copy_from_slice(&2u16.to_le_bytes()); // max heads
    image[34..36].copy_from_slice(&18u16.to_le_bytes()); // max sectors
    image.extend_from_slice(&patterned(80 * 2 * 18 * 512));

    let im = open(image, ImageFormat::Sdu);
    let geom = im.geometry();
    assert_eq!((geom.nr_cyls, geom.nr_sides), (80, 2));
    assert_eq!(geom.base_off, 46);
    assert_eq!(geom.tracks[0].nr_sectors, 18);
    assert_eq!(geom.tracks[0].gap_3, Some(84));
    assert_eq!(im.extent(), 46 + 80 * 2 * 18 * 512);

    // Non-PC geometries are refused.
    let mut image = vec![0u8; 46];
    image[30..32].copy_from_slice(&77u16.to_le_bytes());
    image[32..34].copy_from_slice(&2u16.to_le_bytes());
    image[34..36].copy_from_slice(&18u16.to_le_bytes());
    assert!(
        RawImage::open(Cursor::new(image), ImageFormat::Sdu, OpenParams::default()).is_err()
    );
}

#[test]
fn test_vdk() {
    init();
    let mut image = Vec::new();
    image.extend_from_slice(b"dk");
    image.extend_from_slice(&12u16.to_le_bytes());
    image.extend_from_slice(&[0; 4]);
    image.push(40); // cyls
    image.push(1); // heads
    image.push(0);
    image.push(0);
    image.extend_from_slice(&patterned(40 * 18 * 256));

    let im = open(image, ImageFormat::Vdk);
    let geom = im.geometry();
    assert_eq!((geom.nr_cyls, geom.nr_sides), (40, 1));
    assert_eq!(geom.base_off, 12);
    assert_eq!(geom.tracks[0].nr_sectors, 18);
    assert_eq!(geom.tracks[0].interleave, 2);
    assert_eq!(geom.tracks[0].gap_4a, Some(54));
}

#[test]
fn test_jvc() {
    init();
    // Headerless: geometry from defaults and file size.
    let im = open(patterned(35 * 18 * 256), ImageFormat::Jvc);
    let geom = im.geometry();
    assert_eq!((geom.nr_cyls, geom.nr_sides), (35, 1));
    assert_eq!(geom.tracks[0].interleave, 3);
    assert_eq!(geom.base_off, 0);

    // A large single-sided cylinder count is promoted to double-sided.
    let im = open(patterned(90 * 18 * 256), ImageFormat::Jvc);
    assert_eq!((im.geometry().nr_cyls, im.geometry().nr_sides), (45, 2));

    // A trailing partial cylinder of at least one sector rounds up.
    let im = open(patterned(35 * 18 * 256 + 256), ImageFormat::Jvc);
    assert_eq!(im.geometry().nr_cyls, 36);

    // One-byte header: sectors per track.
    let mut image = vec![10u8];
    image.extend_from_slice(&patterned(35 * 10 * 256));
    let im = open(image, ImageFormat::Jvc);
    assert_eq!(im.geometry().tracks[0].nr_sectors, 10);
    assert_eq!(im.geometry().base_off, 1);
}

#[test]
fn test_dfs() {
    init();
    let im = open(patterned(80 * 10 * 256), ImageFormat::Ssd);
    let geom = im.geometry();
    assert_eq!((geom.nr_cyls, geom.nr_sides), (80, 1));
    assert!(geom.tracks[0].is_fm);
    assert!(!geom.tracks[0].has_iam);
    assert_eq!(geom.tracks[0].cskew, 3);
    assert_eq!(geom.tracks[0].gap_3, Some(21));
    assert!(im.extend().is_some());

    let im = open(patterned(80 * 2 * 10 * 256), ImageFormat::Dsd);
    assert_eq!(im.geometry().nr_sides, 2);
}

#[test]
fn test_pc98_fdi() {
    init();
    let mut image = Vec::new();
    for v in [0u32, 0x30, 4096, 77 * 2 * 8 * 512, 512, 8, 2, 77] {
        image.extend_from_slice(&v.to_le_bytes());
    }
    image.resize(4096, 0);
    image.extend_from_slice(&patterned(77 * 2 * 8 * 512));

    let im = open(image, ImageFormat::Pc98Fdi);
    let geom = im.geometry();
    assert_eq!((geom.nr_cyls, geom.nr_sides), (77, 2));
    assert_eq!(geom.base_off, 4096);
    assert_eq!(geom.tracks[0].rpm, 300);
    assert_eq!(geom.tracks[0].gap_3, Some(84));
    assert!(geom.track_sectors(&geom.tracks[0]).iter().all(|s| s.n == 2));
}

#[test]
fn test_pc98_hdm() {
    init();
    let im = open(patterned(77 * 2 * 8 * 1024), ImageFormat::Pc98Hdm);
    let geom = im.geometry();
    assert_eq!((geom.nr_cyls, geom.nr_sides), (77, 2));
    assert_eq!(geom.tracks[0].rpm, 360);
    assert!(geom.track_sectors(&geom.tracks[0]).iter().all(|s| s.n == 3));
}

#[test]
fn test_ibm3174_dual_rate() {
    init();
    let mut im = RawImage::open(
        Cursor::new(patterned(2_442_240)),
        ImageFormat::Img,
        OpenParams {
            host: HostSystem::Ibm3174,
            ..OpenParams::default()
        },
    )
    .unwrap();
    let geom = im.geometry();
    assert_eq!(geom.tracks.len(), 2);
    assert_eq!(geom.tracks[0].nr_sectors, 15);
    assert_eq!(geom.tracks[1].nr_sectors, 30);
    assert_eq!(geom.map_entry(0, 1), Some(0));
    assert_eq!(geom.map_entry(1, 0), Some(1));

    let mut bufs = buffers();
    im.setup_track(&mut bufs, 0, None).unwrap();
    assert_eq!(im.rpm(), 360);
    im.setup_track(&mut bufs, 2, None).unwrap();
    assert_eq!(im.rpm(), 180);
    assert_eq!(im.data_rate(), 500);

    // The 1.2MB variant goes through the default table.
    let im = RawImage::open(
        Cursor::new(patterned(1_228_800)),
        ImageFormat::Img,
        OpenParams {
            host: HostSystem::Ibm3174,
            ..OpenParams::default()
        },
    )
    .unwrap();
    assert_eq!(im.geometry().tracks[0].nr_sectors, 15);
    assert_eq!(im.geometry().tracks[0].rpm, 360);
}

#[test]
fn test_d81_sides_swapped() {
    init();
    let mut im = open(patterned(80 * 2 * 10 * 512), ImageFormat::D81);
    assert_eq!(im.geometry().layout, LayoutFlags::SIDES_SWAPPED);

    let mut bufs = buffers();
    // Physical side 0 is stored second within each cylinder.
    im.setup_track(&mut bufs, 0, None).unwrap();
    assert_eq!(im.track_offset(), 10 * 512);
    im.setup_track(&mut bufs, 1, None).unwrap();
    assert_eq!(im.track_offset(), 0);
}

#[test]
fn test_st_tos_skew() {
    init();
    let im = open(patterned(80 * 2 * 9 * 512), ImageFormat::St);
    let trk = &im.geometry().tracks[0];
    assert!(!trk.has_iam);
    assert_eq!(trk.cskew, 4);
    assert_eq!(trk.hskew, 2);
}

#[test]
fn test_mbd_and_mgt() {
    init();
    let im = open(patterned(80 * 2 * 11 * 1024), ImageFormat::Mbd);
    assert_eq!(im.geometry().tracks[0].nr_sectors, 11);
    assert!(im.geometry().track_sectors(&im.geometry().tracks[0]).iter().all(|s| s.n == 3));

    let im = open(patterned(737_280), ImageFormat::Mgt);
    assert_eq!(im.geometry().tracks[0].nr_sectors, 9);
}

#[test]
fn test_msx_disambiguation() {
    init();
    // With a plausible MSX boot sector, the BPB decides 40/2/9.
    let mut image = patterned(368_640);
    image[11..13].copy_from_slice(&512u16.to_le_bytes());
    image[24..26].copy_from_slice(&9u16.to_le_bytes());
    image[26..28].copy_from_slice(&2u16.to_le_bytes());
    image[19..21].copy_from_slice(&720u16.to_le_bytes());
    let im = RawImage::open(
        Cursor::new(image),
        ImageFormat::Img,
        OpenParams {
            host: HostSystem::Msx,
            ..OpenParams::default()
        },
    )
    .unwrap();
    assert_eq!((im.geometry().nr_cyls, im.geometry().nr_sides), (40, 2));

    // Without one, the MSX table prefers the 80-cylinder single-sided
    // reading of 360k.
    let mut image = patterned(368_640);
    image[11..13].copy_from_slice(&0u16.to_le_bytes());
    let im = RawImage::open(
        Cursor::new(image),
        ImageFormat::Img,
        OpenParams {
            host: HostSystem::Msx,
            ..OpenParams::default()
        },
    )
    .unwrap();
    assert_eq!((im.geometry().nr_cyls, im.geometry().nr_sides), (80, 1));
}
