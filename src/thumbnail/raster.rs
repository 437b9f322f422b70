//! 进程内图片解码、缩小并编码为 JPEG。

use image::codecs::gif::GifDecoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader};
use std::io::{BufRead, Seek};

use super::{ImageCodec, ThumbnailError};
use crate::config::{THUMBNAIL_JPEG_QUALITY, THUMBNAIL_MAX_DIMENSION};

/// 从 `reader` 解码，缩放进缩略图边界后重新编码为 JPEG。
/// 计算密集，需在阻塞线程中调用。
pub fn render<R: BufRead + Seek>(reader: R, codec: ImageCodec) -> Result<Vec<u8>, ThumbnailError> {
    let image = decode(reader, codec)?;
    let image = shrink_to_fit(image, THUMBNAIL_MAX_DIMENSION);
    encode_jpeg(&image)
}

fn decode<R: BufRead + Seek>(reader: R, codec: ImageCodec) -> Result<DynamicImage, ThumbnailError> {
    let decoded = match codec {
        ImageCodec::Jpeg => image::load(reader, ImageFormat::Jpeg),
        ImageCodec::Png => image::load(reader, ImageFormat::Png),
        ImageCodec::Gif => return first_gif_frame(reader),
        ImageCodec::Detect => ImageReader::new(reader)
            .with_guessed_format()
            .map_err(|err| ThumbnailError::Decode(err.to_string()))?
            .decode(),
    };
    decoded.map_err(|err| ThumbnailError::Decode(err.to_string()))
}

/// 动图只取第一帧。
fn first_gif_frame<R: BufRead + Seek>(reader: R) -> Result<DynamicImage, ThumbnailError> {
    let decoder = GifDecoder::new(reader).map_err(|err| ThumbnailError::Decode(err.to_string()))?;
    let frame = decoder
        .into_frames()
        .next()
        .ok_or_else(|| ThumbnailError::Decode("gif has no frames".into()))?
        .map_err(|err| ThumbnailError::Decode(err.to_string()))?;
    Ok(DynamicImage::ImageRgba8(frame.into_buffer()))
}

/// 保持宽高比缩小，使两边都不超过 `max`；已在边界内的图片原样返回。
pub fn shrink_to_fit(image: DynamicImage, max: u32) -> DynamicImage {
    if image.width() <= max && image.height() <= max {
        return image;
    }
    image.resize(max, max, FilterType::Lanczos3)
}

fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, ThumbnailError> {
    // JPEG 不支持透明通道。
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, THUMBNAIL_JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|err| ThumbnailError::Decode(format!("jpeg encode failed: {err}")))?;
    Ok(buffer)
}
