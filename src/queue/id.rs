use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;

pub const ID_PREFIX: &str = "wh";
const RANDOM_LEN: usize = 9;

/// `wh_<unix millis>_<9 lowercase alphanumerics>`
pub fn generate(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{ID_PREFIX}_{}_{suffix}", now.timestamp_millis())
}

/// Whether `id` has the shape produced by [`generate`].
pub fn is_valid(id: &str) -> bool {
    let mut parts = id.splitn(3, '_');
    let (Some(prefix), Some(millis), Some(suffix)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == ID_PREFIX
        && !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == RANDOM_LEN
        && suffix
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}
