//! Title normalization and tokenization.

/// Words of this many characters or fewer are not significant.
const MIN_TOKEN_CHARS: usize = 2;

/// Lowercase, replace everything that is not a letter or digit with a space
/// and collapse runs of whitespace. Diacritics survive.
pub fn normalize(s: &str) -> String {
    let replaced: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Significant words of a title, in order.
pub fn tokenize(s: &str) -> Vec<String> {
    normalize(s)
        .split(' ')
        .filter(|w| w.chars().count() > MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Length of the longest common leading run of two token lists.
pub fn prefix_run(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
