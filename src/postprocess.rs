//! Post-process: night-mode colour inversion and the provider
//! watermark hook.

use tracing::warn;

use crate::model::{PixelFormat, Surface};

/// Invert the RGB channels of `surface` in place, leaving alpha (if any)
/// untouched. Unsupported formats are logged and left alone
/// there currently are none, since [`PixelFormat`] only
/// has the two supported variants, but the match stays exhaustive-by-hand
/// so a future format addition doesn't silently skip this warning.
pub fn invert_night(surface: &mut Surface) {
    match surface.format {
        PixelFormat::Rgba8 => invert_channels(&mut surface.bytes, 4),
        PixelFormat::Rgb8 => invert_channels(&mut surface.bytes, 3),
    }
}

fn invert_channels(bytes: &mut [u8], bytes_per_pixel: usize) {
    if bytes_per_pixel < 3 {
        warn!(bytes_per_pixel, "unsupported pixel format for night inversion, leaving image unchanged");
        return;
    }
    for pixel in bytes.chunks_exact_mut(bytes_per_pixel) {
        pixel[0] = 255 - pixel[0];
        pixel[1] = 255 - pixel[1];
        pixel[2] = 255 - pixel[2];
        // byte 3 (alpha), if present, is left untouched.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Surface;

    #[test]
    fn inverts_rgb_channels_only_rgba() {
        let mut surface = Surface::new(1, 1, PixelFormat::Rgba8, vec![10, 20, 30, 255]);
        invert_night(&mut surface);
        assert_eq!(surface.bytes, vec![245, 235, 225, 255]);
    }

    #[test]
    fn inverts_rgb_channels_rgb24() {
        let mut surface = Surface::new(1, 1, PixelFormat::Rgb8, vec![0, 128, 255]);
        invert_night(&mut surface);
        assert_eq!(surface.bytes, vec![255, 127, 0]);
    }

    #[test]
    fn scenario_2_night_switch_pixel_matches_spec() {
        // Pixel at (10,10): each of R,G,B equals
        // 255 minus the corresponding daytime channel.
        let day = (200u8, 150u8, 50u8);
        let mut surface = Surface::new(11, 11, PixelFormat::Rgba8, vec![0u8; 11 * 11 * 4]);
        let idx = (10 * 11 + 10) * 4;
        surface.bytes[idx] = day.0;
        surface.bytes[idx + 1] = day.1;
        surface.bytes[idx + 2] = day.2;
        surface.bytes[idx + 3] = 255;

        invert_night(&mut surface);

        assert_eq!(surface.bytes[idx], 255 - day.0);
        assert_eq!(surface.bytes[idx + 1], 255 - day.1);
        assert_eq!(surface.bytes[idx + 2], 255 - day.2);
        assert_eq!(surface.bytes[idx + 3], 255, "alpha must be untouched");
    }
}
