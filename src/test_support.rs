//! Synthetic CBZ and image fixtures for unit tests.

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Solid-color JPEG
pub fn solid_jpeg(width: u32, height: u32, color: [u8; 3], quality: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    encode(DynamicImage::ImageRgb8(img), ImageOutputFormat::Jpeg(quality))
}

/// RGBA PNG: left half fully transparent, right half opaque blue
pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    encode(DynamicImage::ImageRgba8(img), ImageOutputFormat::Png)
}

fn encode(img: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, format).unwrap();
    cursor.into_inner()
}

/// Write a stored (uncompressed) ZIP with the given members
pub fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

/// CBZ with `count` solid-color 100x100 JPEG pages plus a metadata file
pub fn write_jpeg_cbz(path: &Path, count: usize) {
    let pages: Vec<(String, Vec<u8>)> = (0..count)
        .map(|i| {
            let shade = (i * 60 % 256) as u8;
            (format!("{:03}.jpg", i + 1), solid_jpeg(100, 100, [shade, 90, 180], 95))
        })
        .collect();

    let mut members: Vec<(&str, &[u8])> = pages.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
    members.push(("ComicInfo.xml", &b"<ComicInfo/>"[..]));
    write_zip(path, &members);
}
