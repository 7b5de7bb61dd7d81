//! Deterministic song identifiers.
//!
//! An id is the slugged title followed by a djb2 hash of the normalized
//! artist and title, e.g. `amazing-grace_e91e9e12`. The same title and artist
//! always produce the same id; collisions are tolerated.

const DJB2_SEED: u32 = 5381;

/// Derive the id for a song from its title and artist.
pub fn generate_song_id(title: &str, artist: &str) -> String {
    let artist = normalize_artist(artist);
    let title = normalize_title(title);
    let hash = djb2(format!("{}-{}", artist, title).as_bytes());

    format!("{}_{:08x}", title, hash)
}

/// Lowercase and keep only ASCII letters and digits.
fn normalize_artist(artist: &str) -> String {
    artist
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Lowercase, turn whitespace runs into `-`, then keep letters, digits and `-`.
fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut in_whitespace = false;

    for c in lowered.chars() {
        if is_slug_whitespace(c) {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            slug.push(c);
        }
    }

    slug
}

/// The whitespace set the web client's `\s` matches: Unicode `White_Space`
/// without NEL (U+0085), plus the byte order mark (U+FEFF).
fn is_slug_whitespace(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}'
}

fn djb2(bytes: &[u8]) -> u32 {
    bytes.iter().fold(DJB2_SEED, |hash, byte| {
        hash.wrapping_mul(33).wrapping_add(u32::from(*byte))
    })
}
