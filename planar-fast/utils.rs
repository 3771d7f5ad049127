/// Utility functions for the FAST segment test

/// Check whether the 16-bit circular mask holds a run of at least `min_count`
/// set bits, wrapping around bit 15 to bit 0
pub fn has_contiguous_arc(mask: u16, min_count: usize) -> bool {
    if min_count > 16 || min_count == 0 {
        return false;
    }
    if (mask.count_ones() as usize) < min_count {
        return false;
    }

    // A run of n bits survives n-1 rotate-and-AND steps
    let mut test_mask = mask;
    for i in 1..min_count as u32 {
        test_mask &= mask.rotate_left(i);
        if test_mask == 0 {
            return false;
        }
    }

    test_mask != 0
}

/// Pack a circle of booleans into the mask form used by [`has_contiguous_arc`]
pub fn pack_circle(pixels: &[bool; 16]) -> u16 {
    pixels
        .iter()
        .enumerate()
        .fold(0u16, |mask, (i, &set)| if set { mask | (1 << i) } else { mask })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Straightforward scan over the doubled circle
    fn longest_run_reference(pixels: &[bool; 16]) -> usize {
        let mut best = 0;
        let mut current = 0;
        for i in 0..32 {
            if pixels[i % 16] {
                current += 1;
                best = best.max(current);
            } else {
                current = 0;
            }
        }
        best.min(16)
    }

    #[test]
    fn test_contiguous_simple() {
        let mut pixels = [false; 16];
        for p in pixels.iter_mut().take(9) {
            *p = true;
        }
        let mask = pack_circle(&pixels);
        assert!(has_contiguous_arc(mask, 9));
        assert!(!has_contiguous_arc(mask, 10));
    }

    #[test]
    fn test_contiguous_wrap_around() {
        let mut pixels = [false; 16];
        for i in 12..16 {
            pixels[i] = true;
        }
        for i in 0..5 {
            pixels[i] = true;
        }
        assert!(has_contiguous_arc(pack_circle(&pixels), 9));
    }

    #[test]
    fn test_alternating_pixels() {
        let mut pixels = [false; 16];
        for i in (0..16).step_by(2) {
            pixels[i] = true;
        }
        assert!(!has_contiguous_arc(pack_circle(&pixels), 2));
        assert!(has_contiguous_arc(pack_circle(&pixels), 1));
    }

    #[test]
    fn test_out_of_range_counts() {
        assert!(!has_contiguous_arc(u16::MAX, 0));
        assert!(!has_contiguous_arc(u16::MAX, 17));
        assert!(has_contiguous_arc(u16::MAX, 16));
    }

    proptest! {
        #[test]
        fn bitmask_agrees_with_reference(bits in any::<u16>(), min_count in 1usize..=16) {
            let mut pixels = [false; 16];
            for (i, p) in pixels.iter_mut().enumerate() {
                *p = bits & (1 << i) != 0;
            }
            prop_assert_eq!(
                has_contiguous_arc(pack_circle(&pixels), min_count),
                longest_run_reference(&pixels) >= min_count
            );
        }
    }
}
