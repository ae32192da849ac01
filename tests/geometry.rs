mod common;

use common::*;
use rawtrack::{io::Cursor, ImageFormat, OpenParams, RawImage, MAX_SIZE_CODE};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Check the structural invariants every successfully opened image must
/// uphold: a fully mapped track table, bounded size codes, a canonical size
/// consistent with the sector sum, and rotational maps that are
/// permutations following the interleave pattern.
fn check_invariants(im: &mut RawImage<Cursor<Vec<u8>>>) {
    let geom = im.geometry().clone();
    let mut sector_sum = geom.base_off as u64;
    for cyl in 0..geom.map_cyls() {
        for side in 0..geom.nr_sides as usize {
            let trk_idx = geom.map_entry(cyl, side).expect("unmapped track");
            let trk = &geom.tracks[trk_idx];
            for sec in geom.track_sectors(trk) {
                assert!(sec.n <= MAX_SIZE_CODE);
                sector_sum += sec.data_size() as u64;
            }
        }
    }
    assert_eq!(sector_sum, im.extent());

    let mut bufs = buffers();
    for cyl in [0usize, 1, geom.map_cyls() - 1] {
        for side in 0..geom.nr_sides as usize {
            let track = (cyl * 2 + side) as u16;
            im.setup_track(&mut bufs, track, None).unwrap();
            let trk = &geom.tracks[geom.map_entry(cyl, side).unwrap()];
            let map = im.sector_map();
            let nr = trk.nr_sectors as usize;
            assert_eq!(map.len(), nr);
            if nr == 0 {
                continue;
            }

            // Permutation of 0..nr following start + interleave with
            // forward collision skip.
            let mut expect = vec![0xFFu8; nr];
            let mut pos = (cyl * trk.cskew as usize + side * trk.hskew as usize) % nr;
            for i in 0..nr {
                while expect[pos] != 0xFF {
                    pos = (pos + 1) % nr;
                }
                expect[pos] = i as u8;
                pos = (pos + trk.interleave.max(1) as usize) % nr;
            }
            assert_eq!(map, expect, "cyl {} side {}", cyl, side);

            let mut seen = map.to_vec();
            seen.sort_unstable();
            let all: Vec<u8> = (0..nr as u8).collect();
            assert_eq!(seen, all);
        }
    }
}

#[test]
fn test_invariants_across_families() {
    init();

    let mut im = RawImage::open(
        Cursor::new(patterned(1_474_560)),
        ImageFormat::Img,
        OpenParams::default(),
    )
    .unwrap();
    check_invariants(&mut im);

    let mut im = RawImage::open(
        Cursor::new(patterned(1_720_320)),
        ImageFormat::Img,
        OpenParams::default(),
    )
    .unwrap();
    check_invariants(&mut im);

    let mut im = RawImage::open(
        Cursor::new(patterned(184_320)),
        ImageFormat::Opd,
        OpenParams::default(),
    )
    .unwrap();
    check_invariants(&mut im);

    let mut im = RawImage::open(
        Cursor::new(patterned(80 * 2 * 5 * 1024)),
        ImageFormat::Adfs,
        OpenParams::default(),
    )
    .unwrap();
    check_invariants(&mut im);
}

#[test]
fn test_invariants_xdf() {
    init();
    let mut image = patterned(1_884_160);
    image[11..13].copy_from_slice(&512u16.to_le_bytes());
    image[24..26].copy_from_slice(&23u16.to_le_bytes());
    image[26..28].copy_from_slice(&2u16.to_le_bytes());
    image[19..21].copy_from_slice(&3680u16.to_le_bytes());
    image[17..19].copy_from_slice(&224u16.to_le_bytes());
    image[22..24].copy_from_slice(&11u16.to_le_bytes());
    image[510..512].copy_from_slice(&0xAA55u16.to_le_bytes());

    let mut im = RawImage::open(Cursor::new(image), ImageFormat::Xdf, OpenParams::default()).unwrap();
    check_invariants(&mut im);
}

#[test]
fn test_linear_extent_matches_file_size() {
    init();
    for (size, format) in [
        (1_474_560usize, ImageFormat::Img),
        (368_640, ImageFormat::Img),
        (184_320, ImageFormat::Opd),
        (80 * 10 * 256, ImageFormat::Ssd),
    ] {
        let im = RawImage::open(
            Cursor::new(patterned(size)),
            format,
            OpenParams::default(),
        )
        .unwrap();
        assert_eq!(im.extent(), size as u64, "{:?}", format);
    }
}
