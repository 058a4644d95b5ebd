use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").unwrap());

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 6;

/// URL-safe base derived from a title: lower-cased, whitespace runs turned
/// into `-`, everything but ASCII word characters and `-` dropped.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let hyphenated = WHITESPACE.replace_all(&lower, "-");
    NON_WORD.replace_all(&hyphenated, "").into_owned()
}

/// Slug for a new post. The random base-36 suffix keeps two posts with the
/// same title apart; the store still enforces uniqueness.
pub fn unique_slug(title: &str) -> String {
    format!("{}-{}", slugify(title), random_suffix())
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn is_slug_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
    }

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Rust  &  Axum: a tour!"), "rust--axum-a-tour");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
        assert_eq!(slugify("Café crème"), "caf-crme");
    }

    #[test]
    fn unique_slug_has_only_slug_characters() {
        for title in ["Hello", "  Spaces\tand\nnewlines ", "Ünïcödé ✓ title", "", "Q&A #1"] {
            let slug = unique_slug(title);
            assert!(slug.chars().all(is_slug_char), "bad slug {slug:?}");
            assert_eq!(slug.rsplit('-').next().map(str::len), Some(SUFFIX_LEN));
        }
    }

    #[test]
    fn same_title_gives_different_slugs() {
        let slugs: HashSet<_> = (0..500).map(|_| unique_slug("Same Title")).collect();
        assert_eq!(slugs.len(), 500);
        assert!(slugs.iter().all(|s| s.starts_with("same-title-")));
    }
}
