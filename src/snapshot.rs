//! Gzip-compressed JSON envelope for saving and loading a population.
//!
//! Programs are stored as 128-character hex strings (64 bytes each) so
//! the envelope round-trips through plain JSON without binary escaping.
//! Arbitrary caller metadata (the seed, epoch index, CLI flags used to
//! produce the run, anything else worth remembering) rides alongside
//! under `meta`, opaque to this module.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SoupError};
use crate::vm::{PROGRAM_LEN, Program};

#[derive(Serialize, Deserialize)]
struct Envelope {
    meta: Value,
    programs_hex: Vec<String>,
}

/// Gzip-compress a JSON envelope of `pool` and `meta` and write it to
/// `writer`.
pub fn save<W: Write>(writer: W, pool: &[Program], meta: Value) -> Result<()> {
    let programs_hex = pool.iter().map(|p| hex::encode(p)).collect();
    let envelope = Envelope { meta, programs_hex };

    let mut encoder = GzEncoder::new(writer, Compression::default());
    serde_json::to_writer(&mut encoder, &envelope)?;
    encoder.finish()?;
    Ok(())
}

/// Decompress and parse a snapshot written by [`save`], returning the
/// population and its accompanying metadata.
pub fn load<R: Read>(reader: R) -> Result<(Vec<Program>, Value)> {
    let mut decoder = GzDecoder::new(reader);
    let mut json = String::new();
    decoder.read_to_string(&mut json)?;
    let envelope: Envelope = serde_json::from_str(&json)?;

    let pool = envelope
        .programs_hex
        .iter()
        .map(|hex_str| {
            let bytes = hex::decode(hex_str)?;
            let program: Program = bytes
                .as_slice()
                .try_into()
                .map_err(|_| SoupError::InvalidProgram { expected: PROGRAM_LEN, actual: bytes.len() })?;
            Ok(program)
        })
        .collect::<Result<Vec<Program>>>()?;

    Ok((pool, envelope.meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool_of(n: usize) -> Vec<Program> {
        (0..n)
            .map(|i| {
                let mut p = [0u8; PROGRAM_LEN];
                p[0] = i as u8;
                p
            })
            .collect()
    }

    #[test]
    fn round_trips_population_and_meta() {
        let pool = pool_of(8);
        let meta = json!({"seed": 42, "epoch": 17});

        let mut buf = Vec::new();
        save(&mut buf, &pool, meta.clone()).unwrap();

        let (loaded_pool, loaded_meta) = load(buf.as_slice()).unwrap();
        assert_eq!(loaded_pool, pool);
        assert_eq!(loaded_meta, meta);
    }

    #[test]
    fn round_trips_empty_population() {
        let mut buf = Vec::new();
        save(&mut buf, &[], Value::Null).unwrap();
        let (loaded_pool, loaded_meta) = load(buf.as_slice()).unwrap();
        assert!(loaded_pool.is_empty());
        assert_eq!(loaded_meta, Value::Null);
    }

    #[test]
    fn output_is_actually_gzip_compressed() {
        let pool = pool_of(256);
        let mut buf = Vec::new();
        save(&mut buf, &pool, Value::Null).unwrap();
        // gzip magic number
        assert_eq!(&buf[0..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        let envelope = Envelope { meta: Value::Null, programs_hex: vec!["not-hex".to_string()] };
        let mut buf = Vec::new();
        {
            let mut encoder = GzEncoder::new(&mut buf, Compression::default());
            serde_json::to_writer(&mut encoder, &envelope).unwrap();
            encoder.finish().unwrap();
        }
        let err = load(buf.as_slice()).unwrap_err();
        matches!(err, SoupError::MalformedHex(_));
    }

    #[test]
    fn wrong_length_hex_is_rejected() {
        let envelope = Envelope { meta: Value::Null, programs_hex: vec![hex::encode([0u8; 32])] };
        let mut buf = Vec::new();
        {
            let mut encoder = GzEncoder::new(&mut buf, Compression::default());
            serde_json::to_writer(&mut encoder, &envelope).unwrap();
            encoder.finish().unwrap();
        }
        let err = load(buf.as_slice()).unwrap_err();
        matches!(err, SoupError::InvalidProgram { expected: PROGRAM_LEN, actual: 32 });
    }
}
