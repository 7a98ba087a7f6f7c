// Keyword-anchored field extraction from a spoken transcript
//
// For each field, the earliest occurrence of any of its keywords in the lowercased,
// whitespace-tokenized transcript anchors the value: every token after it (minus one leading connective such as "is") up to
// the end of the transcript. Values therefore run on past later keywords; "name is sita and
// my address is pune" gives the name field "sita and my address is pune".

/// Tokens dropped when they immediately follow a keyword.
const CONNECTIVES: &[&str] = &["is", "was", "hai", "है", "=", "-"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedField {
    pub field_id: &'static str,
    pub value: String,
}

/// Never fails; a transcript with no keyword matches yields an empty list.
pub fn extract_fields(
    transcript: &str,
    keywords: &[(&'static str, &[&str])],
) -> Vec<ExtractedField> {
    let lowered = transcript.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for &(field_id, field_keywords) in keywords {
        let anchor = field_keywords
            .iter()
            .filter_map(|kw| {
                let kw = kw.to_lowercase();
                tokens.iter().position(|t| trim_punctuation(t) == kw)
            })
            .min();
        let Some(pos) = anchor else {
            continue;
        };

        let mut tail = &tokens[pos + 1..];
        if let Some(first) = tail.first() {
            let first = trim_punctuation(first);
            if first.is_empty() || CONNECTIVES.contains(&first) {
                tail = &tail[1..];
            }
        }
        if tail.is_empty() {
            continue;
        }

        out.push(ExtractedField {
            field_id,
            value: tail.join(" "),
        });
    }
    out
}

fn trim_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| matches!(c, ',' | '.' | ':' | '!' | '?' | ';' | '।'))
}
