//! Shared fixture types for the golden-vector generators: one flat
//! `serde`-derived struct per opcode family holding the inputs, the
//! dimensions that gate the kernel, and the expected output, written out as
//! JSON (optionally gzip-compressed for the larger corpora).

use std::fs::File;
use std::io::Write as _;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;

/// Write `value` as pretty JSON to `path`, gzip-compressing when `path`
/// ends in `.gz`.
pub fn write_fixture<T: Serialize>(path: &Path, value: &T) {
    let json = serde_json::to_string_pretty(value).expect("fixture serializes");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture directory");
    }
    if path.extension().is_some_and(|e| e == "gz") {
        let file = File::create(path).expect("create fixture file");
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(json.as_bytes()).expect("write gzip fixture");
    } else {
        std::fs::write(path, json).expect("write fixture");
    }
}

/// A complex value, stored re/im rather than interleaved, so the JSON
/// fixtures stay readable without a custom (de)serializer for
/// `num_complex::Complex`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ComplexF64 {
    pub re: f64,
    pub im: f64,
}

impl ComplexF64 {
    pub fn new(re: f64, im: f64) -> Self {
        ComplexF64 { re, im }
    }
}

/// One elementwise-vector-opcode golden case: the instruction, the operand
/// length, the inputs, and the output the core actually produced.
#[derive(Debug, Clone, Serialize)]
pub struct VectorCase {
    pub op: String,
    pub elem: String,
    pub vlen: usize,
    pub lhs: Vec<f64>,
    pub rhs: Option<Vec<f64>>,
    pub expected: Vec<f64>,
}

/// One GEMM-family golden case.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixCase {
    pub op: String,
    pub elem: String,
    pub x_size: usize,
    pub y_size: usize,
    pub z_size: usize,
    pub a: Vec<f64>,
    pub b: Vec<f64>,
    pub expected: Vec<f64>,
}

/// One signal-processing golden case (`Conv`/`Fir`/`Fft`/`Ifft`/`Ddc`).
#[derive(Debug, Clone, Serialize)]
pub struct SignalCase {
    pub op: String,
    pub ulen: usize,
    pub vlen: usize,
    pub input: Vec<ComplexF64>,
    pub kernel: Option<Vec<ComplexF64>>,
    pub expected: Vec<ComplexF64>,
    pub mse: Option<f64>,
}
