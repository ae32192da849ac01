mod common;

use common::*;
use rawtrack::{io::Cursor, ImageFormat, OpenParams, RawImage};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open_360k() -> RawImage<Cursor<Vec<u8>>> {
    RawImage::open(
        Cursor::new(patterned(368_640)),
        ImageFormat::Img,
        OpenParams::default(),
    )
    .unwrap()
}

#[test]
fn test_revolution_is_exact() {
    init();
    let mut im = open_360k();
    let mut bufs = buffers();
    let words = drain_revolution(&mut im, &mut bufs, 0);
    assert_eq!(words.len() as u32 * 16, im.tracklen_bc());
    assert_eq!(im.tracklen_bc() % 32, 0);
    assert_eq!(im.tracklen_bc(), 100_000);
}

#[test]
fn test_setup_at_index_hole() {
    init();
    let mut im = open_360k();
    let mut bufs = buffers();
    let echoed = im.setup_track(&mut bufs, 0, Some(0)).unwrap();
    assert_eq!(echoed, Some(0));
    assert_eq!(im.cur_bc(), 0);
    // At angle zero the consumer starts at the very first bitcell, and the
    // pipeline has been primed with the first structural unit.
    assert_eq!(bufs.read_bc.cons, 0);
    assert!(bufs.read_bc.prod > 0);
}

#[test]
fn test_setup_aligns_to_word_boundary() {
    init();
    let mut im = open_360k();
    let mut bufs = buffers();
    // An arbitrary tick position lands on a 16-bitcell boundary.
    let ticks = 1234 * im.ticks_per_cell() / 16 + 7;
    im.setup_track(&mut bufs, 0, Some(ticks)).unwrap();
    assert_eq!(im.cur_bc() % 16, 0);
    assert!(im.cur_bc() < im.tracklen_bc());
}

#[test]
fn test_resume_mid_track_matches_full_stream() {
    init();
    let mut im = open_360k();
    let mut bufs = buffers();
    let reference = drain_revolution(&mut im, &mut bufs, 0);
    let track_words = reference.len() as u32;

    for target_bc in [1024u32, 16_384, 50_000, 99_984] {
        // Invert cur_bc = sys_ticks * 16 / ticks_per_cell.
        let sys_ticks = target_bc / 16 * im.ticks_per_cell();
        let mut bufs = buffers();
        im.setup_track(&mut bufs, 0, Some(sys_ticks)).unwrap();
        assert_eq!(im.cur_bc(), target_bc);

        // The consumer cursor points at the wanted angle within the primed
        // unit; words from there to the end of the track must match the
        // angle-zero stream.
        let unit_start = target_bc / 16 - bufs.read_bc.cons / 16;
        while unit_start + bufs.read_bc.prod / 16 < track_words {
            assert!(im.read_track(&mut bufs).unwrap());
        }
        // The word straddling the resume point may differ in its leading
        // clock bit (there is no previous word to suppress it against), so
        // compare from the next word on.
        for k in (bufs.read_bc.cons / 16 + 1)..(bufs.read_bc.prod / 16) {
            assert_eq!(
                bufs.read_bc.get(k),
                reference[(unit_start + k) as usize],
                "word {} after resume at bc {}",
                k,
                target_bc
            );
        }
    }
}

#[test]
fn test_reread_is_stable() {
    init();
    let mut im = open_360k();
    let mut bufs = buffers();
    let first = drain_revolution(&mut im, &mut bufs, 4);
    let mut bufs = buffers();
    let second = drain_revolution(&mut im, &mut bufs, 4);
    assert_eq!(first, second);
}
