use froth_traits::Frame;

use crate::error::{HwError, Result};

/// Byte length of one planar YUV420 (I420) frame.
#[inline]
pub fn yuv420_frame_len(width: u32, height: u32) -> usize {
    let w = width as usize;
    let h = height as usize;
    w * h + 2 * (w.div_ceil(2) * h.div_ceil(2))
}

/// Convert a planar YUV420 buffer (full-range BT.601) into an RGB frame.
pub fn yuv420_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Frame> {
    let expected = yuv420_frame_len(width, height);
    if data.len() != expected {
        return Err(HwError::FrameSize {
            expected,
            got: data.len(),
        });
    }
    let w = width as usize;
    let h = height as usize;
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);
    let (y_plane, rest) = data.split_at(w * h);
    let (u_plane, v_plane) = rest.split_at(cw * ch);

    let mut out = Frame::new(width, height);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let (xi, yi) = (x as usize, y as usize);
        let luma = f32::from(y_plane[yi * w + xi]);
        let ci = (yi / 2) * cw + xi / 2;
        let cb = f32::from(u_plane[ci]) - 128.0;
        let cr = f32::from(v_plane[ci]) - 128.0;
        let r = luma + 1.402 * cr;
        let g = luma - 0.344_136 * cb - 0.714_136 * cr;
        let b = luma + 1.772 * cb;
        px.0 = [clamp_u8(r), clamp_u8(g), clamp_u8(b)];
    }
    Ok(out)
}

/// Arguments for an endless raw YUV420 stream from `rpicam-vid` on stdout.
pub fn rpicam_args(camera: u32, width: u32, height: u32, fps: u32) -> Vec<String> {
    let mut args: Vec<String> = ["-t", "0", "-n", "--codec", "yuv420", "-o", "-"]
        .into_iter()
        .map(String::from)
        .collect();
    for (flag, value) in [
        ("--camera", camera),
        ("--width", width),
        ("--height", height),
        ("--framerate", fps),
    ] {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
    args
}

#[inline]
fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
