//! Compact string encoding of supply usage history: `"ts:count|ts:count|..."`.

use thiserror::Error;

use farm_world::UsageSample;

/// A single malformed history entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryParseError {
    #[error("history entry '{0}' is not of the form ts:count")]
    Malformed(String),
    #[error("history entry '{0}' has an invalid timestamp")]
    Timestamp(String),
    #[error("history entry '{0}' has an invalid count")]
    Count(String),
}

/// Encode samples, oldest first.
pub fn encode_history<'a>(samples: impl IntoIterator<Item = &'a UsageSample>) -> String {
    samples
        .into_iter()
        .map(|sample| format!("{}:{}", sample.timestamp, sample.count))
        .collect::<Vec<_>>()
        .join("|")
}

/// Parse one `ts:count` entry.
pub fn parse_sample(entry: &str) -> Result<UsageSample, HistoryParseError> {
    let (ts, count) = entry
        .trim()
        .split_once(':')
        .ok_or_else(|| HistoryParseError::Malformed(entry.to_string()))?;

    let timestamp = ts
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .ok_or_else(|| HistoryParseError::Timestamp(entry.to_string()))?;
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|_| HistoryParseError::Count(entry.to_string()))?;

    Ok(UsageSample::new(timestamp, count))
}

/// Parse a whole history string. Bad entries are skipped and reported, good ones kept.
pub fn decode_history(raw: &str) -> (Vec<UsageSample>, Vec<HistoryParseError>) {
    let mut samples = Vec::new();
    let mut errors = Vec::new();
    for entry in raw.split('|').filter(|e| !e.trim().is_empty()) {
        match parse_sample(entry) {
            Ok(sample) => samples.push(sample),
            Err(err) => errors.push(err),
        }
    }
    (samples, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let samples = [UsageSample::new(1000.0, 50), UsageSample::new(1030.5, 48)];
        assert_eq!(encode_history(&samples), "1000:50|1030.5:48");
        assert_eq!(encode_history(std::iter::empty()), "");
    }

    #[test]
    fn test_decode_skips_bad_entries() {
        let (samples, errors) = decode_history("1000:50|garbage|1060:x|-5:3||1090:47");
        assert_eq!(
            samples,
            vec![UsageSample::new(1000.0, 50), UsageSample::new(1090.0, 47)]
        );
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], HistoryParseError::Malformed(_)));
        assert!(matches!(errors[1], HistoryParseError::Count(_)));
        assert!(matches!(errors[2], HistoryParseError::Timestamp(_)));
    }

    #[test]
    fn test_decode_empty() {
        let (samples, errors) = decode_history("");
        assert!(samples.is_empty());
        assert!(errors.is_empty());
    }
}
