//! Arc colour palettes.
//!
//! Colours are spread around the HSLuv hue circle so equal steps look equally different,
//! then converted to `#rrggbb`.

use palette::{Clamp, FromColor, Hsluv, Srgb};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorOptions {
    pub hue_start: f64,
    pub hue_stop: f64,
    pub chroma: f64,
    pub lightness: f64,
    /// Upper bound of the random chroma decrement applied at each step.
    pub chroma_jitter: f64,
    /// Lightness step of the `0, +j, 0, -j` pattern.
    pub lightness_jitter: f64,
}

impl Default for ColorOptions {
    fn default() -> Self {
        Self {
            hue_start: 0.0,
            hue_stop: 360.0,
            chroma: 100.0,
            lightness: 50.0,
            chroma_jitter: 5.0,
            lightness_jitter: 5.0,
        }
    }
}

impl ColorOptions {
    /// Settings used for diagram arcs: constant chroma, stronger lightness banding.
    pub fn diagram() -> Self {
        Self {
            chroma_jitter: 0.0,
            lightness_jitter: 10.0,
            ..Self::default()
        }
    }
}

const LIGHTNESS_PATTERN: [f64; 4] = [0.0, 1.0, 0.0, -1.0];

/// Generates `count` colours with hues evenly spaced over `[hue_start, hue_stop)`.
///
/// Chroma drifts downwards by a random amount per step. Lightness is offset from
/// `options.lightness` by the `0, +j, 0, -j` pattern, indexed by position mod 4.
pub fn generate_colors<R: Rng + ?Sized>(
    count: usize,
    options: &ColorOptions,
    rng: &mut R,
) -> Vec<String> {
    let mut chroma = options.chroma;
    let step = if count == 0 {
        0.0
    } else {
        (options.hue_stop - options.hue_start) / count as f64
    };

    (0..count)
        .map(|c| {
            let hue = options.hue_start + c as f64 * step;
            chroma -= options.chroma_jitter * rng.gen_range(0.0..1.0);
            let lightness = options.lightness + options.lightness_jitter * LIGHTNESS_PATTERN[c % 4];
            hsluv_hex(hue, chroma.clamp(0.0, 100.0), lightness.clamp(0.0, 100.0))
        })
        .collect()
}

fn hsluv_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    let hsluv: Hsluv<palette::white_point::D65, f64> = Hsluv::new(hue, saturation, lightness);
    let rgb: Srgb<u8> = Srgb::<f64>::from_color(hsluv).clamp().into_format();
    format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
}

/// Reorders `colors` so neighbours in the output come from far apart in the input.
///
/// With `g = (L - 1) / 3`, lists longer than six whose length is not a multiple of `g`
/// (and coprime with it) are visited in steps of `g`, starting `g` steps in. Other lists
/// longer than two take indices `1 mod 3`, then `2 mod 3`, then `0 mod 3`. Shorter lists
/// are returned as-is.
pub fn jumble<T: Clone>(colors: &[T]) -> Vec<T> {
    let len = colors.len();
    let g = len.saturating_sub(1) / 3;

    if len > 6 && len % g != 0 && gcd(g, len) == 1 {
        return (0..len).map(|i| colors[(g * (i + g)) % len].clone()).collect();
    }
    if len > 2 {
        return [1, 2, 0]
            .into_iter()
            .flat_map(|r| colors.iter().skip(r).step_by(3))
            .cloned()
            .collect();
    }
    colors.to_vec()
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn is_hex(c: &str) -> bool {
        c.len() == 7 && c.starts_with('#') && c[1..].chars().all(|ch| ch.is_ascii_hexdigit())
    }

    #[test]
    fn generates_requested_number_of_hex_colours() {
        let mut rng = StdRng::seed_from_u64(7);
        let colors = generate_colors(9, &ColorOptions::default(), &mut rng);
        assert_eq!(colors.len(), 9);
        assert!(colors.iter().all(|c| is_hex(c)));
        assert!(generate_colors(0, &ColorOptions::default(), &mut rng).is_empty());
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = generate_colors(5, &ColorOptions::default(), &mut StdRng::seed_from_u64(1));
        let b = generate_colors(5, &ColorOptions::default(), &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn without_chroma_jitter_output_does_not_depend_on_rng() {
        let opts = ColorOptions::diagram();
        let a = generate_colors(6, &opts, &mut StdRng::seed_from_u64(1));
        let b = generate_colors(6, &opts, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
        // First hue is red-ish at full chroma.
        let r = u8::from_str_radix(&a[0][1..3], 16).unwrap();
        let g = u8::from_str_radix(&a[0][3..5], 16).unwrap();
        assert!(r > g);
    }

    #[test]
    fn lightness_offsets_repeat_every_four_colours() {
        let opts = ColorOptions {
            chroma_jitter: 0.0,
            lightness_jitter: 10.0,
            ..ColorOptions::default()
        };
        let colors = generate_colors(8, &opts, &mut StdRng::seed_from_u64(3));
        let expected: Vec<String> = [50.0, 60.0, 50.0, 40.0, 50.0, 60.0, 50.0, 40.0]
            .into_iter()
            .enumerate()
            .map(|(c, l)| hsluv_hex(c as f64 * 45.0, 100.0, l))
            .collect();
        assert_eq!(colors, expected);
        assert_ne!(colors[1], hsluv_hex(45.0, 100.0, 50.0));
    }

    #[test]
    fn jumble_of_eight_takes_residues_one_two_zero() {
        let input: Vec<usize> = (0..8).collect();
        assert_eq!(jumble(&input), vec![1, 4, 7, 2, 5, 0, 3, 6]);
    }

    #[test]
    fn jumble_of_seven_visits_in_steps_of_two() {
        let input: Vec<usize> = (0..7).collect();
        assert_eq!(jumble(&input), vec![4, 6, 1, 3, 5, 0, 2]);
    }

    #[test]
    fn jumble_small_lists_use_residues_or_identity() {
        assert_eq!(jumble(&[0, 1, 2, 3, 4, 5]), vec![1, 4, 2, 5, 0, 3]);
        assert_eq!(jumble(&[0, 1, 2]), vec![1, 2, 0]);
        assert_eq!(jumble(&[0, 1]), vec![0, 1]);
        assert!(jumble::<u8>(&[]).is_empty());
    }

    #[test]
    fn jumble_is_always_a_permutation() {
        for len in 0..64usize {
            let input: Vec<usize> = (0..len).collect();
            let mut out = jumble(&input);
            out.sort_unstable();
            assert_eq!(out, input, "len {len}");
        }
    }
}
