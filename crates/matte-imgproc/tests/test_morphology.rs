use matte_image::{Alpha, AlphaPlane, Bounds, HeapRequest, ScratchHeap, MAX_ALPHA};
use matte_imgproc::arc::isqrt;
use matte_imgproc::heap;
use matte_imgproc::morphology::{bin, bin2x, max, max_fast, sum};
use matte_imgproc::parallel::ExecutionStrategy;
use matte_imgproc::{MorphError, Outcome, Sense};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const THRESH: Alpha = MAX_ALPHA / 2;
const RATE: i64 = 2048;

#[derive(Clone, Copy, Debug)]
enum Alg {
    Bin,
    Bin2x,
    Max,
    MaxFast,
    Sum,
}

const ALL: [Alg; 5] = [Alg::Bin, Alg::Bin2x, Alg::Max, Alg::MaxFast, Alg::Sum];

fn margin(alg: Alg, size_sq: i64, sense: Sense) -> usize {
    match alg {
        Alg::Bin | Alg::Max | Alg::MaxFast => isqrt(size_sq) as usize,
        Alg::Bin2x => bin2x::margin(size_sq, sense),
        Alg::Sum => sum::margin(size_sq, sense),
    }
}

fn request(alg: Alg, w: usize, h: usize, size_sq: i64, sense: Sense) -> HeapRequest {
    match alg {
        Alg::Bin => heap::bin(w, h, size_sq, sense),
        Alg::Bin2x => heap::bin2x(w, h, size_sq, sense),
        Alg::Max => heap::max(w, h, size_sq, sense),
        Alg::MaxFast => heap::max_fast(w, h, size_sq, sense),
        Alg::Sum => heap::sum(w, h, size_sq, sense),
    }
}

/// Run `alg` into a destination pre-filled with `stale`.
fn run_over(
    alg: Alg,
    src: &AlphaPlane,
    size_sq: i64,
    sense: Sense,
    stale: Alpha,
) -> Result<(AlphaPlane, Outcome), MorphError> {
    let (w, h) = (src.width(), src.height());
    let (ow, oh) = sense.output_size(w, h, margin(alg, size_sq, sense));
    let mut dst = AlphaPlane::filled(ow, oh, stale);
    let mut scratch = ScratchHeap::with_capacity(1 << 24);
    let carved = scratch.carve(request(alg, w, h, size_sq, sense))?;
    let workers = ExecutionStrategy::Parallel;
    let (src, mut out) = (src.view(), dst.view_mut());
    let outcome = match (alg, sense) {
        (Alg::Bin, Sense::Inflate) => {
            bin::inflate(&src, &mut out, THRESH, size_sq, carved.words, &workers)?
        }
        (Alg::Bin, Sense::Deflate) => {
            bin::deflate(&src, &mut out, THRESH, size_sq, carved.words, &workers)?
        }
        (Alg::Bin2x, Sense::Inflate) => {
            bin2x::inflate(&src, &mut out, THRESH, size_sq, carved.words, &workers)?
        }
        (Alg::Bin2x, Sense::Deflate) => {
            bin2x::deflate(&src, &mut out, THRESH, size_sq, carved.words, &workers)?
        }
        (Alg::Max, Sense::Inflate) => max::inflate(&src, &mut out, size_sq, carved, &workers)?,
        (Alg::Max, Sense::Deflate) => max::deflate(&src, &mut out, size_sq, carved, &workers)?,
        (Alg::MaxFast, Sense::Inflate) => {
            max_fast::inflate(&src, &mut out, size_sq, carved, &workers)?
        }
        (Alg::MaxFast, Sense::Deflate) => {
            max_fast::deflate(&src, &mut out, size_sq, carved, &workers)?
        }
        (Alg::Sum, Sense::Inflate) => {
            sum::inflate(&src, &mut out, size_sq, RATE, carved, &workers)?
        }
        (Alg::Sum, Sense::Deflate) => {
            sum::deflate(&src, &mut out, size_sq, RATE, carved, &workers)?
        }
    };
    Ok((dst, outcome))
}

fn run(alg: Alg, src: &AlphaPlane, size_sq: i64, sense: Sense) -> Result<AlphaPlane, MorphError> {
    Ok(run_over(alg, src, size_sq, sense, 0)?.0)
}

fn random_plane(rng: &mut StdRng, w: usize, h: usize) -> AlphaPlane {
    let mut plane = AlphaPlane::new(w, h);
    for y in 0..h {
        for x in 0..w {
            plane.set(x, y, rng.random_range(0..=MAX_ALPHA));
        }
    }
    plane
}

/// Blocks of transparent, opaque and noisy content, so that every mask kind shows up.
fn blocky_plane(rng: &mut StdRng, w: usize, h: usize, block: usize) -> AlphaPlane {
    let mut plane = AlphaPlane::new(w, h);
    for by in (0..h).step_by(block) {
        for bx in (0..w).step_by(block) {
            let kind = rng.random_range(0..3);
            for y in by..(by + block).min(h) {
                for x in bx..(bx + block).min(w) {
                    let a = match kind {
                        0 => 0,
                        1 => MAX_ALPHA,
                        _ => rng.random_range(0..=MAX_ALPHA),
                    };
                    plane.set(x, y, a);
                }
            }
        }
    }
    plane
}

fn center_shift(sense: Sense, m: usize) -> i32 {
    match sense {
        Sense::Inflate => -(m as i32),
        Sense::Deflate => m as i32,
    }
}

fn brute_max(src: &AlphaPlane, size_sq: i64, sense: Sense) -> AlphaPlane {
    let s = isqrt(size_sq) as i32;
    let (w, h) = sense.output_size(src.width(), src.height(), s as usize);
    let shift = center_shift(sense, s as usize);
    let view = src.view();
    let mut dst = AlphaPlane::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let (cx, cy) = (x as i32 + shift, y as i32 + shift);
            let mut v = match sense {
                Sense::Inflate => 0,
                Sense::Deflate => MAX_ALPHA,
            };
            for dy in -s..=s {
                for dx in -s..=s {
                    if (dx * dx + dy * dy) as i64 <= size_sq {
                        let a = view.sample(cx + dx, cy + dy);
                        v = match sense {
                            Sense::Inflate => v.max(a),
                            Sense::Deflate => v.min(a),
                        };
                    }
                }
            }
            dst.set(x, y, v);
        }
    }
    dst
}

fn brute_sum(src: &AlphaPlane, size_sq: i64, sense: Sense) -> AlphaPlane {
    let s = isqrt(size_sq) as i32;
    let m = sum::margin(size_sq, sense);
    let (w, h) = sense.output_size(src.width(), src.height(), m);
    let shift = center_shift(sense, m);
    let cap = sum::sum_cap(size_sq, RATE);
    let numer = (1i64 << 43) / cap;
    let scale = |v: i64| -> Alpha {
        if v >= cap {
            MAX_ALPHA
        } else {
            ((v * numer + (1i64 << 31) - 1) >> 31) as Alpha
        }
    };
    let view = src.view();
    let mut dst = AlphaPlane::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let (cx, cy) = (x as i32 + shift, y as i32 + shift);
            let (mut total, mut area) = (0i64, 0i64);
            for dy in -s..=s {
                for dx in -s..=s {
                    if (dx * dx + dy * dy) as i64 <= size_sq {
                        total += view.sample(cx + dx, cy + dy) as i64;
                        area += 1;
                    }
                }
            }
            let v = match sense {
                Sense::Inflate => scale(total),
                Sense::Deflate => MAX_ALPHA - scale(area * MAX_ALPHA as i64 - total),
            };
            dst.set(x, y, v);
        }
    }
    dst
}

fn opaque_set(plane: &AlphaPlane) -> Vec<(usize, usize)> {
    let mut set = Vec::new();
    for y in 0..plane.height() {
        for x in 0..plane.width() {
            if plane.get(x, y) == MAX_ALPHA {
                set.push((x, y));
            }
        }
    }
    set
}

#[test]
fn test_single_pixel_on_8x8_bin() -> Result<(), MorphError> {
    let mut src = AlphaPlane::new(8, 8);
    src.set(1, 1, MAX_ALPHA);
    let (dst, outcome) = run_over(Alg::Bin, &src, 4, Sense::Inflate, 0)?;
    assert_eq!((dst.width(), dst.height()), (12, 12));
    assert_eq!(outcome.bounds, Bounds::new(1, 1, 6, 6));
    // five pixels across the equator, one at the poles.
    let equator: Vec<Alpha> = (0..8).map(|x| dst.get(x, 3)).collect();
    assert_eq!(equator, vec![0, MAX_ALPHA, MAX_ALPHA, MAX_ALPHA, MAX_ALPHA, MAX_ALPHA, 0, 0]);
    assert_eq!(dst.get(3, 1), MAX_ALPHA);
    assert_eq!(dst.get(2, 1), 0);
    Ok(())
}

#[test]
fn test_disk_shape() -> Result<(), MorphError> {
    for alg in [Alg::Bin, Alg::Max] {
        for size_sq in [1, 2, 3, 4, 5, 8, 9, 10, 13] {
            let mut src = AlphaPlane::new(9, 9);
            src.set(4, 4, MAX_ALPHA);
            let (dst, outcome) = run_over(alg, &src, size_sq, Sense::Inflate, 0)?;
            let s = isqrt(size_sq);
            let c = 4 + s;
            let mut expected = Vec::new();
            for y in 0..dst.height() as i64 {
                for x in 0..dst.width() as i64 {
                    if (x - c).pow(2) + (y - c).pow(2) <= size_sq {
                        expected.push((x as usize, y as usize));
                    }
                }
            }
            assert_eq!(opaque_set(&dst), expected, "{alg:?} {size_sq}");
            let c = c as i32;
            let s = s as i32;
            assert_eq!(outcome.bounds, Bounds::new(c - s, c - s, c + s + 1, c + s + 1));
        }
    }
    Ok(())
}

#[test]
fn test_zero_budget_is_identity() -> Result<(), MorphError> {
    let mut rng = StdRng::seed_from_u64(3);
    let src = random_plane(&mut rng, 7, 5);
    for alg in ALL {
        for sense in [Sense::Inflate, Sense::Deflate] {
            let (dst, outcome) = run_over(alg, &src, 0, sense, 99)?;
            assert_eq!(outcome, Outcome::within(Bounds::new(0, 0, 7, 5)), "{alg:?}");
            for y in 0..5 {
                for x in 0..7 {
                    let a = src.get(x, y);
                    let expected = match alg {
                        Alg::Bin | Alg::Bin2x if a > THRESH => MAX_ALPHA,
                        Alg::Bin | Alg::Bin2x => 0,
                        _ => a,
                    };
                    assert_eq!(dst.get(x, y), expected, "{alg:?} {sense:?}");
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_inflate_is_monotonic_in_radius() -> Result<(), MorphError> {
    let mut rng = StdRng::seed_from_u64(5);
    let src = blocky_plane(&mut rng, 20, 16, 3);
    let budgets = [1, 2, 4, 5, 8, 9];
    for alg in [Alg::Bin, Alg::Max] {
        for pair in budgets.windows(2) {
            let (s1, s2) = (pair[0], pair[1]);
            let small = run(alg, &src, s1, Sense::Inflate)?;
            let large = run(alg, &src, s2, Sense::Inflate)?;
            let off = (isqrt(s2) - isqrt(s1)) as usize;
            for y in 0..small.height() {
                for x in 0..small.width() {
                    assert!(
                        large.get(x + off, y + off) >= small.get(x, y),
                        "{alg:?} {s1} -> {s2} at ({x}, {y})"
                    );
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_closing_is_extensive_and_opening_anti_extensive() -> Result<(), MorphError> {
    let mut rng = StdRng::seed_from_u64(8);
    let src = blocky_plane(&mut rng, 18, 18, 3);
    for alg in [Alg::Bin, Alg::Max] {
        let reference = |x: usize, y: usize| -> Alpha {
            let a = src.get(x, y);
            match alg {
                Alg::Bin if a > THRESH => MAX_ALPHA,
                Alg::Bin => 0,
                _ => a,
            }
        };
        for size_sq in [1, 2, 4, 5] {
            let grown = run(alg, &src, size_sq, Sense::Inflate)?;
            let closed = run(alg, &grown, size_sq, Sense::Deflate)?;
            let shrunk = run(alg, &src, size_sq, Sense::Deflate)?;
            let opened = run(alg, &shrunk, size_sq, Sense::Inflate)?;
            assert_eq!((closed.width(), closed.height()), (18, 18));
            assert_eq!((opened.width(), opened.height()), (18, 18));
            for y in 0..18 {
                for x in 0..18 {
                    assert!(closed.get(x, y) >= reference(x, y), "{alg:?} closing {size_sq}");
                    assert!(opened.get(x, y) <= reference(x, y), "{alg:?} opening {size_sq}");
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_masked_max_matches_brute_force() -> Result<(), MorphError> {
    let mut rng = StdRng::seed_from_u64(13);
    let planes = [
        random_plane(&mut rng, 16, 16),
        blocky_plane(&mut rng, 32, 32, 8),
        blocky_plane(&mut rng, 31, 17, 5),
    ];
    for src in &planes {
        for size_sq in [1, 2, 4, 5, 8, 10] {
            for sense in [Sense::Inflate, Sense::Deflate] {
                let dst = run(Alg::Max, src, size_sq, sense)?;
                assert_eq!(dst, brute_max(src, size_sq, sense), "{size_sq} {sense:?}");
            }
        }
    }
    Ok(())
}

#[test]
fn test_masked_sum_matches_brute_force() -> Result<(), MorphError> {
    let mut rng = StdRng::seed_from_u64(21);
    let planes = [
        random_plane(&mut rng, 16, 16),
        blocky_plane(&mut rng, 32, 32, 8),
    ];
    for src in &planes {
        for size_sq in [1, 2, 4, 5, 9] {
            for sense in [Sense::Inflate, Sense::Deflate] {
                let dst = run(Alg::Sum, src, size_sq, sense)?;
                assert_eq!(dst, brute_sum(src, size_sq, sense), "{size_sq} {sense:?}");
            }
        }
    }
    Ok(())
}

#[test]
fn test_fast_max_agrees_on_most_pixels() -> Result<(), MorphError> {
    let mut rng = StdRng::seed_from_u64(34);
    let src = blocky_plane(&mut rng, 32, 32, 8);
    for size_sq in [2, 5, 9] {
        for sense in [Sense::Inflate, Sense::Deflate] {
            let fast = run(Alg::MaxFast, &src, size_sq, sense)?;
            let exact = brute_max(&src, size_sq, sense);
            let same = fast
                .as_slice()
                .iter()
                .zip(exact.as_slice())
                .filter(|(a, b)| a == b)
                .count();
            assert!(same * 10 >= exact.as_slice().len() * 9, "{size_sq} {sense:?}");
        }
    }
    Ok(())
}

#[test]
fn test_empty_input_stays_empty() -> Result<(), MorphError> {
    let src = AlphaPlane::new(10, 10);
    for alg in ALL {
        for size_sq in [1, 4, 9, 16] {
            let (dst, outcome) = run_over(alg, &src, size_sq, Sense::Inflate, 0)?;
            assert_eq!(outcome, Outcome::EMPTY, "{alg:?} {size_sq}");
            assert!(dst.as_slice().iter().all(|&a| a == 0));
        }
    }
    Ok(())
}

#[test]
fn test_empty_input_skips_pixel_work_for_thresholds() -> Result<(), MorphError> {
    let src = AlphaPlane::new(10, 10);
    for alg in [Alg::Bin, Alg::Bin2x] {
        let (dst, outcome) = run_over(alg, &src, 9, Sense::Inflate, 123)?;
        assert!(outcome.is_empty());
        assert!(dst.as_slice().iter().all(|&a| a == 123), "{alg:?}");
    }
    Ok(())
}

#[test]
fn test_full_input_erodes_to_uniform() -> Result<(), MorphError> {
    let src = AlphaPlane::filled(10, 10, MAX_ALPHA);
    for alg in [Alg::Bin, Alg::Max, Alg::MaxFast] {
        for size_sq in [1, 4, 9] {
            let (_, outcome) = run_over(alg, &src, size_sq, Sense::Deflate, 0)?;
            assert_eq!(outcome, Outcome::FULL, "{alg:?} {size_sq}");
            assert!(outcome.is_empty());
        }
    }
    Ok(())
}
