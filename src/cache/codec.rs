//! Byte encodings for cache entries
//!
//! Reference tables are plain JSON arrays. The fact snapshot is JSON
//! compressed with gzip. The freshness timestamp is an RFC 3339 string.

use super::errors::{CacheError, CacheResult};
use crate::models::LearnerAttempt;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

pub fn encode_table<T: Serialize>(rows: &[T]) -> CacheResult<Vec<u8>> {
    serde_json::to_vec(rows).map_err(|e| CacheError::SerializationError(e.to_string()))
}

pub fn decode_table<T: DeserializeOwned>(bytes: &[u8]) -> CacheResult<Vec<T>> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::SerializationError(e.to_string()))
}

pub fn encode_snapshot(rows: &[LearnerAttempt]) -> CacheResult<Vec<u8>> {
    let json = encode_table(rows)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 4), Compression::default());
    encoder
        .write_all(&json)
        .and_then(|_| encoder.finish())
        .map_err(|e| CacheError::SerializationError(format!("gzip encode failed: {e}")))
}

pub fn decode_snapshot(bytes: &[u8]) -> CacheResult<Vec<LearnerAttempt>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| CacheError::SerializationError(format!("gzip decode failed: {e}")))?;
    decode_table(&json)
}

pub fn encode_timestamp(at: DateTime<Utc>) -> Vec<u8> {
    at.to_rfc3339().into_bytes()
}

pub fn decode_timestamp(bytes: &[u8]) -> CacheResult<DateTime<Utc>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CacheError::SerializationError(format!("timestamp is not UTF-8: {e}")))?;
    DateTime::parse_from_rfc3339(text.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| CacheError::SerializationError(format!("invalid timestamp '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fact::fixtures::attempt;
    use crate::models::GradeRecord;
    use chrono::TimeZone;

    #[test]
    fn snapshot_is_compressed_and_restored() {
        let rows: Vec<_> = (0..50)
            .map(|i| attempt(&format!("L{}", i % 5), "2024-03-04 10:00:00"))
            .collect();
        let bytes = encode_snapshot(&rows).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        assert!(bytes.len() < encode_table(&rows).unwrap().len());
        assert_eq!(decode_snapshot(&bytes).unwrap(), rows);
    }

    #[test]
    fn reference_table_survives_the_codec() {
        let grades = vec![GradeRecord {
            identifier: "g-1".to_string(),
            id: 1,
            grade: Some("class-one".to_string()),
        }];
        let decoded: Vec<GradeRecord> = decode_table(&encode_table(&grades).unwrap()).unwrap();
        assert_eq!(decoded, grades);
    }

    #[test]
    fn timestamp_codec() {
        let at = Utc.with_ymd_and_hms(2024, 3, 6, 9, 30, 0).unwrap();
        assert_eq!(decode_timestamp(&encode_timestamp(at)).unwrap(), at);
        assert!(decode_timestamp(b"yesterday").is_err());
    }

    #[test]
    fn corrupt_snapshot_is_a_serialization_error() {
        let err = decode_snapshot(b"not gzip").unwrap_err();
        assert!(matches!(err, CacheError::SerializationError(_)));
    }
}
