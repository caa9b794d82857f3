pub const ELLIPSIS: char = '…';

const ENTITIES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#039;"),
];

/// Shortens `text` to at most `max_length` characters on word boundaries.
///
/// Words are accumulated with a leading space each, so a shortened result
/// always starts with a space and ends with [`ELLIPSIS`]. When not even the
/// first word fits, the result is the ellipsis alone.
pub fn shorten(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let mut result = String::new();
    let mut length = 0usize;
    for word in text.split(' ') {
        let word_length = word.chars().count();
        if length + word_length + 1 > max_length {
            break;
        }
        result.push(' ');
        result.push_str(word);
        length += word_length + 1;
    }
    result.push(ELLIPSIS);
    result
}

/// Escapes the five markup-significant characters. `&` goes first so the
/// entities produced by later replacements are left alone.
pub fn sanitize(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (ch, entity)| {
            acc.replace(*ch, entity)
        })
}

/// Inverse of [`sanitize`]: turns escaped markup back into the text a reader
/// sees on screen.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES
            .iter()
            .find(|(_, entity)| rest.starts_with(entity))
        {
            Some((ch, entity)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [&str; 6] = [
        "Buy milk and eggs for breakfast tomorrow",
        "short",
        "exactly thirty five characters long",
        "Supercalifragilisticexpialidocious-and-then-some words",
        "double  spaced  words that keep going past the limit",
        "",
    ];

    #[test]
    fn short_text_is_returned_unchanged() {
        for sample in SAMPLES {
            if sample.chars().count() <= 35 {
                assert_eq!(shorten(sample, 35), sample);
            }
        }
        assert_eq!(
            shorten("exactly thirty five characters long", 35),
            "exactly thirty five characters long"
        );
    }

    #[test]
    fn long_text_keeps_whole_words_and_ends_with_ellipsis() {
        for sample in SAMPLES {
            if sample.chars().count() <= 35 {
                continue;
            }
            let short = shorten(sample, 35);
            assert!(short.ends_with(ELLIPSIS), "{short:?}");
            let kept = short.trim_end_matches(ELLIPSIS);
            assert!(kept.chars().count() <= 35);
            let words: Vec<&str> = sample.split(' ').collect();
            let kept_words: Vec<&str> = kept.split(' ').skip(1).collect();
            if !kept.is_empty() {
                assert_eq!(kept_words, words[..kept_words.len()].to_vec());
            }
        }
    }

    #[test]
    fn breakfast_scenario() {
        let short = shorten("Buy milk and eggs for breakfast tomorrow", 35);
        assert_eq!(short, " Buy milk and eggs for breakfast…");
        assert!(short.chars().count() <= 35);
    }

    #[test]
    fn oversized_first_word_leaves_only_the_ellipsis() {
        assert_eq!(
            shorten("Supercalifragilisticexpialidocious-and-then-some words", 35),
            "…"
        );
        assert_eq!(shorten("abcdef", 3), "…");
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "ééééé";
        assert_eq!(shorten(text, 5), text);
    }

    #[test]
    fn sanitize_escapes_in_documented_order() {
        assert_eq!(
            sanitize(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#039;s&lt;/a&gt;"
        );
        assert_eq!(sanitize("&amp;"), "&amp;amp;");
    }

    #[test]
    fn sanitize_leaves_plain_text_alone() {
        let plain = "nothing special here 123";
        assert_eq!(sanitize(plain), plain);
        assert_eq!(sanitize(&sanitize(plain)), plain);
    }

    #[test]
    fn decode_reverses_sanitize() {
        for raw in [
            "Tom & Jerry",
            "<b>bold</b>",
            "she said \"hi\" & 'bye'",
            "&amp; literally",
            "&lt;",
            "trailing &",
        ] {
            assert_eq!(decode_entities(&sanitize(raw)), raw);
        }
    }

    #[test]
    fn decode_keeps_unknown_entities() {
        assert_eq!(decode_entities("&nbsp;&amp;"), "&nbsp;&");
    }
}
