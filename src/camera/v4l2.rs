use crate::common::{CameraConfig, MaskLensError, Result};
use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use std::fs;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

pub struct Camera {
    device: Device,
    config: CameraConfig,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Result<Self> {
        let device_index = if config.device_index == 999 {
            // Special value 999 means auto-detect
            Self::detect_camera()?
        } else {
            config.device_index
        };
        Self::new_with_device(device_index, config.clone())
    }

    /// List all available cameras with their capabilities
    pub fn list_all_cameras() -> Result<Vec<(u32, String, Vec<String>)>> {
        let mut cameras = Vec::new();

        // Scan /dev/video* devices
        for entry in fs::read_dir("/dev")? {
            let entry = entry?;
            let path = entry.path();
            let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

            if let Some(index_str) = filename.strip_prefix("video") {
                if let Ok(index) = index_str.parse::<u32>() {
                    if let Ok(device) = Device::new(index as usize) {
                        if let Ok(caps) = device.query_caps() {
                            let mut features = Vec::new();

                            if caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                                features.push("VIDEO_CAPTURE".to_string());
                            }

                            let formats = device.enum_formats().unwrap_or_default();
                            for fmt in &formats {
                                let fourcc_str = fmt.fourcc.str().unwrap_or("UNKNOWN");
                                match fourcc_str {
                                    "MJPG" | "YUYV" => {
                                        features.push(format!("Color ({})", fourcc_str))
                                    }
                                    "GREY" => features.push("Grayscale (GREY)".to_string()),
                                    other => features.push(format!("Other ({})", other)),
                                }
                            }

                            cameras.push((index, caps.card.clone(), features));
                        }
                    }
                }
            }
        }

        cameras.sort_by_key(|c| c.0);
        Ok(cameras)
    }

    /// Auto-detect a usable camera by scanning for a capture device with a
    /// format we can convert. Color formats are preferred over grayscale.
    pub fn detect_camera() -> Result<u32> {
        let mut candidates = Vec::new();

        for entry in fs::read_dir("/dev")? {
            let entry = entry?;
            let path = entry.path();
            let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

            if let Some(index_str) = filename.strip_prefix("video") {
                if let Ok(index) = index_str.parse::<u32>() {
                    if let Ok(device) = Device::new(index as usize) {
                        if let Ok(caps) = device.query_caps() {
                            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                                continue;
                            }

                            let formats = device.enum_formats().unwrap_or_default();
                            let has_color = formats.iter().any(|fmt| {
                                matches!(&fmt.fourcc.repr, b"MJPG" | b"YUYV")
                            });
                            let has_grey = formats.iter().any(|fmt| fmt.fourcc.repr == *b"GREY");

                            if has_color {
                                candidates.push((index, 100));
                            } else if has_grey {
                                candidates.push((index, 50));
                            }
                        }
                    }
                }
            }
        }

        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        match candidates.first() {
            Some((index, _)) => {
                tracing::debug!("Auto-detected camera at /dev/video{}", index);
                Ok(*index)
            }
            None => Err(MaskLensError::DeviceUnavailable(
                "No camera found. Check that a camera is connected and /dev/video* is accessible"
                    .into(),
            )),
        }
    }

    pub fn new_with_device(index: u32, config: CameraConfig) -> Result<Self> {
        tracing::debug!("Opening camera device {}", index);

        let device = Device::new(index as usize).map_err(|e| {
            MaskLensError::DeviceUnavailable(format!("Failed to open camera {}: {}", index, e))
        })?;

        // Check device capabilities
        let caps = device.query_caps().map_err(|e| {
            MaskLensError::DeviceUnavailable(format!("Failed to query capabilities: {}", e))
        })?;

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(MaskLensError::DeviceUnavailable(format!(
                "Device {} does not support video capture",
                index
            )));
        }

        let mut fmt = device.format().map_err(|e| {
            MaskLensError::DeviceUnavailable(format!("Failed to get format: {}", e))
        })?;

        fmt.width = config.width;
        fmt.height = config.height;

        // Prefer MJPG for color webcams; keep GREY if that's all the device has
        if fmt.fourcc.str().unwrap_or("") != "GREY" {
            fmt.fourcc = FourCC::new(b"MJPG");
        }

        // Try to set format, but don't fail if exact resolution isn't supported
        if let Err(e) = device.set_format(&fmt) {
            tracing::warn!("Could not set exact format: {}. Using device defaults.", e);
        }

        let final_fmt = device.format().map_err(|e| {
            MaskLensError::DeviceUnavailable(format!("Failed to get final format: {}", e))
        })?;

        tracing::debug!(
            "Camera format: {}x{} {}",
            final_fmt.width,
            final_fmt.height,
            final_fmt.fourcc.str().unwrap_or("????")
        );

        Ok(Self { device, config })
    }

    /// Snapshot a single frame. The mmap stream lives only for the duration
    /// of this call, so the device's buffers are released on every exit path.
    pub fn capture_frame(&mut self) -> Result<DynamicImage> {
        let fmt = self.device.format().map_err(|e| {
            MaskLensError::DeviceUnavailable(format!("Failed to get format: {}", e))
        })?;

        let mut stream =
            v4l::io::mmap::Stream::with_buffers(&mut self.device, Type::VideoCapture, 4)
                .map_err(|e| {
                    MaskLensError::DeviceUnavailable(format!("Failed to create stream: {}", e))
                })?;

        // Warmup frames so auto-exposure settles before the real snapshot
        for _ in 0..self.config.warmup_frames {
            let (_buf, _meta) = stream.next().map_err(|e| {
                MaskLensError::DeviceUnavailable(format!("Failed to capture warmup frame: {}", e))
            })?;
            std::thread::sleep(std::time::Duration::from_millis(self.config.warmup_delay_ms));
        }

        let (buf, _meta) = stream.next().map_err(|e| {
            MaskLensError::DeviceUnavailable(format!("Failed to capture: {}", e))
        })?;

        frame_to_image(buf, &fmt)
    }

    /// Encode a captured frame as a PNG blob for upload.
    pub fn encode_png(frame: &DynamicImage) -> Result<Vec<u8>> {
        let mut png = Vec::new();
        frame.write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageOutputFormat::Png,
        )?;
        Ok(png)
    }
}

fn frame_to_image(data: &[u8], fmt: &v4l::Format) -> Result<DynamicImage> {
    match fmt.fourcc.str().unwrap_or("") {
        "GREY" => grey_to_image(data, fmt.width, fmt.height),
        "YUYV" => yuyv_to_image(data, fmt.width, fmt.height),
        "MJPG" => {
            let img = image::load_from_memory(data)?;
            Ok(img)
        }
        other => Err(MaskLensError::DeviceUnavailable(format!(
            "Unsupported pixel format: {}",
            other
        ))),
    }
}

fn grey_to_image(data: &[u8], width: u32, height: u32) -> Result<DynamicImage> {
    let img_buffer = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data.to_vec())
        .ok_or_else(|| {
            MaskLensError::DeviceUnavailable("Failed to create grayscale image buffer".into())
        })?;

    Ok(DynamicImage::ImageLuma8(img_buffer))
}

/// YUYV 4:2:2 to RGB. Two pixels per four bytes: Y0 U Y1 V.
fn yuyv_to_image(data: &[u8], width: u32, height: u32) -> Result<DynamicImage> {
    let expected = (width * height * 2) as usize;
    if data.len() < expected {
        return Err(MaskLensError::DeviceUnavailable(format!(
            "Short YUYV frame: got {} bytes, expected {}",
            data.len(),
            expected
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in data[..expected].chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
            rgb.extend_from_slice(&[r, g, b]);
        }
    }

    let img_buffer = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb).ok_or_else(|| {
        MaskLensError::DeviceUnavailable("Failed to create RGB image buffer".into())
    })?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_conversion_handles_exact_frame() {
        // 2x1 frame, both pixels mid-grey (Y=128, U=V=128 -> neutral chroma)
        let data = [128u8, 128, 128, 128];
        let img = yuyv_to_image(&data, 2, 1).unwrap();
        let rgb = img.to_rgb8();
        assert_eq!(rgb.dimensions(), (2, 1));
        let px = rgb.get_pixel(0, 0);
        assert_eq!(px.0, [128, 128, 128]);
    }

    #[test]
    fn yuyv_conversion_rejects_short_frame() {
        let data = [0u8; 4];
        assert!(yuyv_to_image(&data, 4, 4).is_err());
    }

    #[test]
    fn png_encode_roundtrip() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 4, Rgb([10, 20, 30])));
        let png = Camera::encode_png(&img).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
    }
}
