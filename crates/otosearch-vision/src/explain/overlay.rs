//! Heatmap compositing: upscale, colorize and blend the saliency map
//! onto the original image, then encode it for transport.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};

use otosearch_core::{Error, Result};

use crate::explain::SaliencyMap;

/// Bilinear upscale of the saliency map to the target dimensions.
///
/// Triangle-kernel resampling with a support radius that widens when
/// the map is larger than the target, so the same routine also
/// anti-aliases a downscale.
pub fn upscale_map(map: &SaliencyMap, target_width: u32, target_height: u32) -> Vec<f32> {
    let src_width = map.width();
    let src_height = map.height();
    let target_width = target_width as usize;
    let target_height = target_height as usize;

    let x_scale = src_width as f32 / target_width as f32;
    let y_scale = src_height as f32 / target_height as f32;
    let support_x = x_scale.max(1.0);
    let support_y = y_scale.max(1.0);

    let mut dst = vec![0.0f32; target_width * target_height];

    for dy in 0..target_height {
        for dx in 0..target_width {
            // Center of the output pixel in source coordinates.
            let src_cx = (dx as f32 + 0.5) * x_scale;
            let src_cy = (dy as f32 + 0.5) * y_scale;

            let x_min = (src_cx - support_x).floor().max(0.0) as usize;
            let x_max = (src_cx + support_x).ceil().min(src_width as f32 - 1.0) as usize;
            let y_min = (src_cy - support_y).floor().max(0.0) as usize;
            let y_max = (src_cy + support_y).ceil().min(src_height as f32 - 1.0) as usize;

            let mut total_weight = 0.0f32;
            let mut weighted_sum = 0.0f32;

            for sy in y_min..=y_max {
                for sx in x_min..=x_max {
                    let dist_x = ((sx as f32 + 0.5) - src_cx).abs() / support_x;
                    let dist_y = ((sy as f32 + 0.5) - src_cy).abs() / support_y;

                    if dist_x < 1.0 && dist_y < 1.0 {
                        let weight = (1.0 - dist_x) * (1.0 - dist_y);
                        weighted_sum += map.value(sx, sy) * weight;
                        total_weight += weight;
                    }
                }
            }

            if total_weight > 0.0 {
                dst[dy * target_width + dx] = weighted_sum / total_weight;
            }
        }
    }

    dst
}

/// Jet-style palette: low = blue, mid = green/yellow, high = red.
pub fn jet(value: f32) -> [u8; 3] {
    let v = value.clamp(0.0, 1.0);
    let r = (1.5 - (4.0 * v - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * v - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * v - 1.0).abs()).clamp(0.0, 1.0);
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// Composite the saliency map onto the original image: upscale to the
/// image's pixel dimensions, map through the jet palette and add with
/// weight `alpha`, clipped to the valid pixel range.
pub fn render_overlay(image: &DynamicImage, map: &SaliencyMap, alpha: f32) -> RgbImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let heat = upscale_map(map, width, height);

    ImageBuffer::from_fn(width, height, |x, y| {
        let value = heat[y as usize * width as usize + x as usize];
        let color = jet(value);
        let base = rgb.get_pixel(x, y);

        let mut out = [0u8; 3];
        for c in 0..3 {
            let blended = base[c] as f32 + alpha * color[c] as f32;
            out[c] = blended.min(255.0) as u8;
        }
        Rgb(out)
    })
}

/// Encode an image as JPEG wrapped in a base64 data URI, ready for
/// direct embedding in a JSON response.
pub fn to_data_uri(image: &RgbImage) -> Result<String> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| Error::Image(format!("failed to encode heatmap: {}", e)))?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        BASE64.encode(buffer.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_endpoints() {
        let low = jet(0.0);
        assert_eq!(low[0], 0); // no red at the low end
        assert!(low[2] > 100); // blue dominates

        let high = jet(1.0);
        assert!(high[0] > 100); // red dominates
        assert_eq!(high[2], 0); // no blue at the high end

        let mid = jet(0.5);
        assert!(mid[1] > high[1] && mid[1] > low[1]); // green peaks mid-scale
    }

    #[test]
    fn test_jet_clamps_out_of_range() {
        assert_eq!(jet(-1.0), jet(0.0));
        assert_eq!(jet(2.0), jet(1.0));
    }

    #[test]
    fn test_upscale_dimensions_and_bounds() {
        let map = SaliencyMap::new(2, 2, vec![0.0, 1.0, 0.5, 0.25]);
        let scaled = upscale_map(&map, 8, 6);

        assert_eq!(scaled.len(), 8 * 6);
        assert!(scaled.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_upscale_uniform_map_stays_uniform() {
        let map = SaliencyMap::new(3, 3, vec![0.5; 9]);
        let scaled = upscale_map(&map, 12, 12);
        assert!(scaled.iter().all(|&v| (v - 0.5).abs() < 1e-5));
    }

    #[test]
    fn test_overlay_clips_to_pixel_range() {
        // A pure white base cannot overflow past 255.
        let white = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(10, 10, Rgb([255, 255, 255])));
        let map = SaliencyMap::new(2, 2, vec![1.0; 4]);

        let overlay = render_overlay(&white, &map, 0.4);
        assert_eq!(overlay.dimensions(), (10, 10));
        assert!(overlay.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_overlay_tints_hot_regions() {
        let black = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(8, 8, Rgb([0, 0, 0])));
        let map = SaliencyMap::new(1, 1, vec![1.0]);

        let overlay = render_overlay(&black, &map, 0.4);
        let px = overlay.get_pixel(4, 4);
        assert!(px[0] > 0); // red tint from the hot end of the palette
    }

    #[test]
    fn test_data_uri_prefix() {
        let img = ImageBuffer::from_pixel(4, 4, Rgb([10, 20, 30]));
        let uri = to_data_uri(&img).unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        assert!(uri.len() > "data:image/jpeg;base64,".len());
    }
}
