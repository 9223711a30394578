use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static tag regex"));

pub struct Normalizer;

impl Normalizer {
    /// Strips "invisible" characters (zero-width spaces, format controls) and
    /// applies NFKC so lookalike or split characters cannot hide a pattern.
    ///
    /// This is the classification view only; the text forwarded upstream is
    /// never rewritten.
    pub fn normalize(input: &str) -> String {
        input.nfkc().filter(|c| !is_invisible(*c)).collect()
    }

    /// Removes markup tags (`<b>`, `</p>`, `<?php ... ?>`) and trims.
    pub fn strip_tags(input: &str) -> String {
        TAG.replace_all(input, "").trim().to_string()
    }
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' | // Zero Width Space
        '\u{200C}' | // Zero Width Non-Joiner
        '\u{200D}' | // Zero Width Joiner
        '\u{2060}' | // Word Joiner
        '\u{00AD}' | // Soft Hyphen
        '\u{FEFF}' // Zero Width No-Break Space
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_characters_are_removed() {
        assert_eq!(Normalizer::normalize("ev\u{200B}al("), "eval(");
        assert_eq!(Normalizer::normalize("\u{FEFF}hello"), "hello");
    }

    #[test]
    fn fullwidth_forms_fold_to_ascii() {
        assert_eq!(Normalizer::normalize("ｅｖａｌ"), "eval");
    }

    #[test]
    fn tags_are_stripped() {
        assert_eq!(Normalizer::strip_tags("<b>hi</b>"), "hi");
        assert_eq!(Normalizer::strip_tags("  <p>\n</p>  "), "");
        assert_eq!(
            Normalizer::strip_tags("Notice <?php echo $x; ?> in view"),
            "Notice  in view"
        );
    }

    #[test]
    fn plain_text_is_untouched() {
        let text = "TypeError: undefined is not a function";
        assert_eq!(Normalizer::strip_tags(text), text);
        assert_eq!(Normalizer::normalize(text), text);
    }
}
