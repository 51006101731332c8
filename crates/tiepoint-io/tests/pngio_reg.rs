//! PNG I/O regression test
//!
//! Tiles must survive PNG encoding bit for bit, transparent areas
//! included, and source imagery of any PNG color type must decode to RGBA.
//!
//! Run with:
//! ```
//! cargo test -p tiepoint-io --test pngio_reg
//! ```

use png::{BitDepth, ColorType, Encoder};
use tiepoint_core::{Raster, RasterMut, color};
use tiepoint_io::{IoError, decode_png, encode_png, read_image, write_image};
use tiepoint_test::fixtures::{checkerboard, gradient};
use tiepoint_test::{RegParams, regout_dir};

/// Opaque gradient with a transparent band down the middle.
fn banded() -> Raster {
    let mut r = gradient(64, 48).expect("gradient").to_mut();
    for y in 0..48 {
        for x in 24..40 {
            r.set_pixel_unchecked(x, y, color::compose_rgba(9, 8, 7, 0));
        }
    }
    r.into()
}

#[test]
fn pngio_reg_round_trip() {
    let mut rp = RegParams::new("pngio");

    for (name, raster) in [
        ("gradient", gradient(100, 60).expect("gradient")),
        ("checker", checkerboard(33, 17, 4).expect("checkerboard")),
        ("banded", banded()),
    ] {
        eprintln!("Round trip: {name}");
        let bytes = encode_png(&raster).expect("encode");
        let back = decode_png(&bytes).expect("decode");
        rp.compare_raster(&raster, &back);

        let path = format!("{}/pngio_{name}.png", regout_dir());
        write_image(&raster, &path).expect("write");
        let from_file = read_image(&path).expect("read");
        rp.compare_raster(&raster, &from_file);
    }

    // Alpha is kept even where the color is not black
    let back = decode_png(&encode_png(&banded()).expect("encode")).expect("decode");
    rp.compare_values(0.0, color::alpha(back.get_pixel(30, 10).unwrap_or(1)) as f64, 0.0);
    rp.compare_values(9.0, color::red(back.get_pixel(30, 10).unwrap_or(0)) as f64, 0.0);

    rp.write_raster_and_check(&banded()).expect("write banded");

    assert!(rp.cleanup(), "pngio round trip test failed");
}

fn encode_raw(width: u32, height: u32, color_type: ColorType, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = Encoder::new(&mut out, width, height);
        encoder.set_color(color_type);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header().expect("header");
        writer.write_image_data(data).expect("data");
    }
    out
}

#[test]
fn pngio_reg_color_types() {
    let mut rp = RegParams::new("pngio_types");

    // 2x1 gray
    let gray = decode_png(&encode_raw(2, 1, ColorType::Grayscale, &[10, 200])).expect("gray");
    rp.compare_values(
        color::compose_rgb(10, 10, 10) as f64,
        gray.get_pixel(0, 0).unwrap_or(0) as f64,
        0.0,
    );
    rp.compare_values(
        color::compose_rgb(200, 200, 200) as f64,
        gray.get_pixel(1, 0).unwrap_or(0) as f64,
        0.0,
    );

    // 1x1 gray + alpha
    let ga = decode_png(&encode_raw(1, 1, ColorType::GrayscaleAlpha, &[50, 128])).expect("ga");
    rp.compare_values(
        color::compose_rgba(50, 50, 50, 128) as f64,
        ga.get_pixel(0, 0).unwrap_or(0) as f64,
        0.0,
    );

    // 1x2 rgb is opaque
    let rgb = decode_png(&encode_raw(1, 2, ColorType::Rgb, &[1, 2, 3, 4, 5, 6])).expect("rgb");
    rp.compare_values(
        color::compose_rgb(4, 5, 6) as f64,
        rgb.get_pixel(0, 1).unwrap_or(0) as f64,
        0.0,
    );

    // Garbage is a decode error, not a panic
    let err = decode_png(b"not a png").unwrap_err();
    rp.compare_values(1.0, matches!(err, IoError::DecodeError(_)) as u8 as f64, 0.0);

    assert!(rp.cleanup(), "pngio color type test failed");
}

#[test]
fn pngio_reg_blank_tile() {
    let mut rp = RegParams::new("pngio_blank");

    let blank: Raster = RasterMut::new(256, 256).expect("raster").into();
    let bytes = encode_png(&blank).expect("encode");
    let back = decode_png(&bytes).expect("decode");
    rp.compare_values(1.0, back.is_fully_transparent() as u8 as f64, 0.0);
    // A blank tile compresses to almost nothing
    rp.compare_values(1.0, (bytes.len() < 2048) as u8 as f64, 0.0);

    assert!(rp.cleanup(), "pngio blank tile test failed");
}
