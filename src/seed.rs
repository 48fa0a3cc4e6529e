/// Upper bound (exclusive) of every track seed.
pub const SEED_BOUND: u32 = 100_000;

/// Starting value of the accumulator (the 32-bit FNV offset basis).
const OFFSET_BASIS: i64 = 2_166_136_261;

/// Joins title and artist. U+001F never shows up in track metadata, so
/// `("ab", "")` and `("a", "b")` produce different keys.
const IDENTITY_SEPARATOR: char = '\u{1f}';

/// Build the identity key a track is seeded from.
pub fn identity_key(title: &str, artist: &str) -> String {
    let mut key = String::with_capacity(title.len() + artist.len() + 1);
    key.push_str(title);
    key.push(IDENTITY_SEPARATOR);
    key.push_str(artist);
    key
}

/// Map arbitrary text to a stable seed in `[0, SEED_BOUND)`.
///
/// Rolling FNV-1a style hash over UTF-16 code units: each unit is xored into
/// the accumulator (folded to 32 bits), which is then multiplied through a
/// sum of shifted copies. The last round is left unfolded before taking the
/// absolute value modulo the bound.
pub fn seed_from(text: &str) -> u32 {
    let mut acc = OFFSET_BASIS;

    for unit in text.encode_utf16() {
        let x = (acc as i32) ^ i32::from(unit);
        let shifted = |bits: u32| i64::from(x.wrapping_shl(bits));
        acc = i64::from(x) + shifted(1) + shifted(4) + shifted(7) + shifted(8) + shifted(24);
    }

    (acc.unsigned_abs() % u64::from(SEED_BOUND)) as u32
}

/// Seed for a title/artist pair.
pub fn track_seed(title: &str, artist: &str) -> u32 {
    seed_from(&identity_key(title, artist))
}
