use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use sha1::{Digest, Sha1};

pub const GROUP_ID_LEN: usize = 7;

/// Derives a short consumer group id from a point in time.
///
/// The timestamp is rendered as RFC 3339 with nanoseconds, hashed with SHA-1, and the first
/// seven characters of the lowercase hex digest are kept. The same instant always yields the
/// same id.
pub fn group_id_from_time(time: &DateTime<Utc>) -> String {
    let text = time.to_rfc3339_opts(SecondsFormat::Nanos, true);

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut hex = digest.iter().fold(String::new(), |mut acc, byte| {
        let _ = write!(acc, "{:02x}", byte);
        acc
    });
    hex.truncate(GROUP_ID_LEN);
    hex
}
