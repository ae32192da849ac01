/*
    rawtrack
    https://github.com/dbalsom/rawtrack

    Copyright 2024-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/format/cfg.rs

    Custom layouts from a sectioned configuration file. Sections are
    "[tag]" or "[tag::size]"; the best-scoring section describes the image.
    Within a section, options before the first "tracks =" line form the
    default track layout; each "tracks =" line opens a new layout block for
    the listed cylinders and head.
*/

use regex::Regex;

use crate::{
    geometry::SimpleLayout,
    image::RawImage,
    io::ReadWriteSeek,
    types::LayoutFlags,
    ImageError,
};

// Section scores. A tagname match beats a size match beats the default
// (empty) section; any mismatch takes the section out of the running.
const SCORE_TAG: i32 = 4;
const SCORE_SIZE: i32 = 2;
const SCORE_EMPTY: i32 = 1;
const SCORE_MISMATCH: i32 = -100;

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let Some(config) = im.config.clone() else {
        return Ok(false);
    };
    let tag = im.tag.clone();

    let section_re = Regex::new(r"^\[([^\]:]*)(?:::([0-9]+))?\]$").expect("Invalid regex");

    let mut best = 0i32;
    let mut active = 0i32;
    let mut nr_t = 0usize;
    let mut t_layout = SimpleLayout::default();
    let mut d_layout = SimpleLayout::default();

    for raw_line in config.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(caps) = section_re.captures(line) {
            // New section: finalise any currently-active section.
            if active != 0 {
                tag_add_layout(im, &t_layout, nr_t)?;
                im.geom.finalise_track_map()?;
                active = 0;
            }

            let name = caps.get(1).map_or("", |m| m.as_str()).trim();
            if let Some(size) = caps.get(2) {
                // Match on size is worth less than a match on tagname.
                // Mismatch on size clobbers the section.
                let size: u64 = size.as_str().parse().unwrap_or(0);
                active += if im.im_size() == size { SCORE_SIZE } else { SCORE_MISMATCH };
            }
            match (&tag, name) {
                (Some(t), n) if t.eq_ignore_ascii_case(n) => active += SCORE_TAG,
                (_, "") => active += SCORE_EMPTY,
                _ => active += SCORE_MISMATCH,
            }

            if active > best {
                // Best score so far: process the section.
                best = active;
                im.reset_all_params();
                d_layout = SimpleLayout::default();
                t_layout = SimpleLayout::default();
                nr_t = 0;
            }
            else {
                // Mark ourselves inactive for this section.
                active = 0;
            }
            continue;
        }

        if active == 0 {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "tracks" => {
                tag_add_layout(im, &t_layout, nr_t)?;
                if nr_t == 0 {
                    d_layout = t_layout.clone();
                }
                nr_t += 1;
                t_layout = d_layout.clone();
                assign_tracks(im, value, nr_t as u8);
            }
            "cyls" => im.geom.nr_cyls = parse_num(value) as u16,
            "heads" => im.geom.nr_sides = parse_num(value) as u8,
            "step" => im.geom.step = parse_num(value) as u8,
            "secs" => t_layout.nr_sectors = parse_num(value) as u16,
            "bps" => {
                let sz = parse_num(value) as u32;
                t_layout.no = (0..8).find(|no| 128u32 << no == sz).unwrap_or(8) as u8;
            }
            "id" => t_layout.base[0] = parse_num_auto(value) as u8,
            "h" => {
                t_layout.head = if value.starts_with('a') {
                    None
                }
                else {
                    Some((parse_num(value) & 1) as u8)
                };
            }
            "mode" => t_layout.is_fm = value == "fm",
            "interleave" => t_layout.interleave = parse_num(value) as u8,
            "cskew" => t_layout.cskew = parse_num(value) as u8,
            "hskew" => t_layout.hskew = parse_num(value) as u8,
            "rpm" => t_layout.rpm = parse_num(value) as u16,
            "gap2" => t_layout.gap_2 = parse_gap(value),
            "gap3" => t_layout.gap_3 = parse_gap(value),
            "gap4a" => t_layout.gap_4a = parse_gap(value),
            "iam" => t_layout.has_iam = value == "yes",
            "rate" => t_layout.data_rate = Some(parse_num(value) as u32),
            "file-layout" => {
                for part in value.split(',').map(str::trim) {
                    if let Some(side) = part.strip_prefix("reverse-side") {
                        let side = (parse_num(side) != 0) as u8;
                        im.geom.layout |= LayoutFlags::reverse_side(side);
                    }
                    else if part == "sequential" {
                        im.geom.layout |= LayoutFlags::SEQUENTIAL;
                    }
                    else if part == "sides-swapped" {
                        im.geom.layout |= LayoutFlags::SIDES_SWAPPED;
                    }
                }
            }
            _ => {}
        }
    }

    if active != 0 {
        tag_add_layout(im, &t_layout, nr_t)?;
        im.geom.finalise_track_map()?;
    }

    Ok(best > 0)
}

/// Commit the accumulated option block as track layout `trk_idx`.
fn tag_add_layout<F: ReadWriteSeek>(
    im: &mut RawImage<F>,
    layout: &SimpleLayout,
    trk_idx: usize,
) -> Result<(), ImageError> {
    if trk_idx == 0 {
        im.geom.init_track_map()?;
    }

    let idx = im.geom.add_track_layout(layout.nr_sectors as usize)?;
    let trk = &mut im.geom.tracks[idx];
    trk.is_fm = layout.is_fm;
    trk.rpm = layout.rpm;
    trk.has_iam = layout.has_iam;
    trk.gap_2 = layout.gap_2;
    trk.gap_3 = layout.gap_3;
    trk.gap_4a = layout.gap_4a;
    trk.data_rate = layout.data_rate;
    trk.interleave = layout.interleave;
    trk.cskew = layout.cskew;
    trk.hskew = layout.hskew;
    trk.head = layout.head;

    for (i, sec) in im.geom.track_sectors_mut(idx).iter_mut().enumerate() {
        sec.r = (i as u8).wrapping_add(layout.base[0]);
        sec.n = layout.no;
    }

    Ok(())
}

/// Map the cylinders/head listed in `list` ("c[-c][.h][,...]") to track
/// layout `target`.
fn assign_tracks<F: ReadWriteSeek>(im: &mut RawImage<F>, list: &str, target: u8) {
    let nr_cyls = im.geom.nr_cyls as i64;
    let nr_sides = im.geom.nr_sides as i64;
    if im.geom.track_map.is_empty() || nr_cyls == 0 || nr_sides == 0 {
        return;
    }

    for part in list.split(',').map(str::trim) {
        let (range, head) = match part.split_once('.') {
            Some((r, h)) => (r, Some(h)),
            None => (part, None),
        };
        let (c_s, c_e) = match range.split_once('-') {
            Some((a, b)) => (parse_num(a), parse_num(b)),
            None => {
                let c = parse_num(range);
                (c, c)
            }
        };
        let c_s = c_s.clamp(0, nr_cyls - 1);
        let c_e = c_e.clamp(0, nr_cyls - 1);
        let (h_s, h_e) = match head {
            Some(h) => {
                let h = parse_num(h).clamp(0, nr_sides - 1);
                (h, h)
            }
            None => (0, nr_sides - 1),
        };
        for c in c_s..=c_e {
            for h in h_s..=h_e {
                im.geom.track_map[(c * nr_sides + h) as usize] = target;
            }
        }
    }
}

/// Leading decimal number of `s`, ignoring any trailing text; 0 if none.
fn parse_num(s: &str) -> i64 {
    let s = s.trim();
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// As `parse_num`, but accepts a 0x prefix for hexadecimal.
fn parse_num_auto(s: &str) -> i64 {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        let digits: String = hex.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
        i64::from_str_radix(&digits, 16).unwrap_or(0)
    }
    else {
        parse_num(s)
    }
}

/// Gap option value: an integer, or 'a' for automatic.
fn parse_gap(s: &str) -> Option<u8> {
    if s.starts_with('a') {
        None
    }
    else {
        Some(parse_num(s) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_gap, parse_num, parse_num_auto};

    #[test]
    fn test_parse_num() {
        assert_eq!(parse_num("12"), 12);
        assert_eq!(parse_num(" 40 "), 40);
        assert_eq!(parse_num("7x"), 7);
        assert_eq!(parse_num("x"), 0);
    }

    #[test]
    fn test_parse_num_auto() {
        assert_eq!(parse_num_auto("0x41"), 0x41);
        assert_eq!(parse_num_auto("65"), 65);
    }

    #[test]
    fn test_parse_gap() {
        assert_eq!(parse_gap("auto"), None);
        assert_eq!(parse_gap("84"), Some(84));
    }
}
