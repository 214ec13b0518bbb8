use std::path::Path;

use image::imageops::flip_vertical_in_place;
use tracing::debug;

use crate::error::CanvasError;
use crate::gpu::backend::{GlBackend, SamplerParams, TextureImage};
use crate::types::ShaderSources;

/// Decodes the image at `path` into bottom-up RGBA8 rows.
pub fn decode_channel(index: usize, path: &Path) -> Result<TextureImage, CanvasError> {
    let image = image::open(path).map_err(|err| CanvasError::TextureLoad {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let mut rgba = image.to_rgba8();
    flip_vertical_in_place(&mut rgba);
    let (width, height) = rgba.dimensions();
    debug!(
        channel = index,
        path = %path.display(),
        width,
        height,
        "decoded texture channel"
    );
    Ok(TextureImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

/// Decodes `texture0..texture{count-1}` in order. Nothing is uploaded here, so
/// a decode failure leaves no GPU object behind.
pub fn decode_channels(
    sources: &ShaderSources,
    count: usize,
) -> Result<Vec<TextureImage>, CanvasError> {
    (0..count)
        .map(|index| {
            let path = sources
                .texture(index)
                .ok_or_else(|| CanvasError::MissingSource {
                    key: crate::types::texture_key(index),
                })?;
            decode_channel(index, path)
        })
        .collect()
}

/// Uploads each image to its own texture on unit `index`.
///
/// Textures created before a failure are deleted before the error is returned.
pub(crate) fn upload_channels<B: GlBackend>(
    backend: &B,
    images: &[TextureImage],
) -> Result<Vec<B::Texture>, CanvasError> {
    let mut textures = Vec::with_capacity(images.len());
    for (unit, image) in images.iter().enumerate() {
        let texture = match backend.create_texture() {
            Ok(texture) => texture,
            Err(message) => {
                release_channels(backend, &mut textures);
                return Err(CanvasError::gpu("texture allocation", message));
            }
        };
        backend.active_texture_unit(unit as u32);
        backend.bind_texture(Some(texture));
        backend.upload_texture(image, SamplerParams::default());
        textures.push(texture);
    }
    Ok(textures)
}

pub(crate) fn release_channels<B: GlBackend>(backend: &B, textures: &mut Vec<B::Texture>) {
    for texture in textures.drain(..) {
        backend.delete_texture(texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{GlObject, RecordingBackend};
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn decoded_rows_are_flipped_bottom_up() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("stripe.png");
        let mut img = RgbaImage::new(1, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        img.save(&path).expect("write png");

        let decoded = decode_channel(0, &path).expect("decode");
        assert_eq!((decoded.width, decoded.height), (1, 2));
        assert_eq!(&decoded.pixels[..4], &[0, 0, 255, 255]);
        assert_eq!(&decoded.pixels[4..], &[255, 0, 0, 255]);
    }

    #[test]
    fn unreadable_image_reports_texture_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("missing.png");
        let err = decode_channel(0, &path).unwrap_err();
        assert!(matches!(err, CanvasError::TextureLoad { path: p, .. } if p == path));
    }

    #[test]
    fn failed_allocation_releases_earlier_textures() {
        let backend = RecordingBackend::new();
        backend.fail_texture_allocation(1);
        let image = TextureImage {
            width: 1,
            height: 1,
            pixels: vec![0; 4],
        };
        let err = upload_channels(&backend, &[image.clone(), image]).unwrap_err();
        assert!(matches!(err, CanvasError::Gpu { .. }));
        assert!(!backend
            .live_objects()
            .iter()
            .any(|object| matches!(object, GlObject::Texture(_))));
    }
}
