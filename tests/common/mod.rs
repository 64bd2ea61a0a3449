#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// 17 landmarks spread inside a `width` x `height` image.
pub fn landmarks_within(width: u32, height: u32) -> Vec<Value> {
    (1..=17u32)
        .map(|id| {
            json!({
                "id": id,
                "x": (width as f64 - 1.0) * id as f64 / 18.0,
                "y": (height as f64 - 1.0) * (18 - id) as f64 / 18.0,
            })
        })
        .collect()
}

pub fn label_value(image: &str, width: u32, height: u32) -> Value {
    json!({
        "image": image,
        "width": width,
        "height": height,
        "landmarks": landmarks_within(width, height),
    })
}

/// A scratch corpus with `images/` and `labels/` directories.
pub struct Corpus {
    pub temp: tempfile::TempDir,
    pub images: PathBuf,
    pub labels: PathBuf,
}

impl Corpus {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        let labels = temp.path().join("labels");
        fs::create_dir_all(&images).expect("create images dir");
        fs::create_dir_all(&labels).expect("create labels dir");
        Self {
            temp,
            images,
            labels,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    pub fn image(&self, name: &str, width: u32, height: u32) {
        write_bmp(&self.images.join(name), width, height);
    }

    pub fn label(&self, name: &str, value: &Value) {
        fs::write(self.labels.join(name), value.to_string()).expect("write label");
    }

    pub fn raw_label(&self, name: &str, contents: &str) {
        fs::write(self.labels.join(name), contents).expect("write label");
    }

    /// An image with a matching, valid label.
    pub fn pair(&self, stem: &str, width: u32, height: u32) {
        let image = format!("{stem}.bmp");
        self.image(&image, width, height);
        self.label(&format!("{stem}.json"), &label_value(&image, width, height));
    }
}
