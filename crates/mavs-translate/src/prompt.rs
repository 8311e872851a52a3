//! Prompt construction and batch response alignment.

use mavs_core::TranslationKind;

/// Output token budget per field kind.
#[must_use]
pub fn max_output_tokens(kind: TranslationKind) -> u32 {
    match kind {
        TranslationKind::Title => 256,
        TranslationKind::Summary => 512,
        TranslationKind::Content => 4096,
    }
}

/// Output budget for a batch of `items` short texts.
#[must_use]
pub fn batch_max_output_tokens(items: usize) -> u32 {
    let items = u32::try_from(items).unwrap_or(u32::MAX);
    max_output_tokens(TranslationKind::Title)
        .saturating_mul(items)
        .min(8192)
}

#[must_use]
pub fn build_prompt(kind: TranslationKind, target_language: &str, text: &str) -> String {
    let instruction = match kind {
        TranslationKind::Title => format!(
            "Translate this NBA news headline into {target_language}. \
             Keep player and team names recognizable. \
             Reply with the translated headline only."
        ),
        TranslationKind::Summary => format!(
            "Translate this short NBA news summary into {target_language}. \
             Reply with the translation only."
        ),
        TranslationKind::Content => format!(
            "Translate the following NBA news article into natural {target_language}. \
             Preserve paragraph breaks and keep player and team names recognizable. \
             Reply with the translation only."
        ),
    };
    format!("{instruction}\n\n{text}")
}

/// One prompt carrying all `texts` as numbered lines (`1. ...`).
#[must_use]
pub fn build_batch_prompt(target_language: &str, texts: &[&str]) -> String {
    let mut prompt = format!(
        "Translate each numbered line below into {target_language}. \
         Reply with exactly {} lines, one translation per line, keeping the same \
         numbering (\"1. ...\"). Do not add any other text.\n\n",
        texts.len()
    );
    for (i, text) in texts.iter().enumerate() {
        let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        prompt.push_str(&format!("{}. {single_line}\n", i + 1));
    }
    prompt
}

/// Splits `"12. text"` / `"12) text"` into `(12, "text")`.
fn split_marker(line: &str) -> Option<(usize, &str)> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let number = line[..digits].parse().ok()?;
    let rest = line[digits..].strip_prefix(['.', ')'])?;
    Some((number, rest.trim()))
}

/// Re-aligns a batch response with its `expected` inputs.
///
/// When every line carries a usable marker, lines are placed by marker;
/// otherwise they are taken positionally. Slots that end up empty are
/// `None`, and the caller falls back to the original text.
#[must_use]
pub fn align_batch_response(response: &str, expected: usize) -> Vec<Option<String>> {
    let lines: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let mut slots: Vec<Option<String>> = vec![None; expected];

    let markers: Option<Vec<(usize, &str)>> = lines.iter().map(|l| split_marker(l)).collect();
    match markers {
        Some(markers) if markers.iter().all(|(n, _)| (1..=expected).contains(n)) => {
            for (n, text) in markers {
                let slot = &mut slots[n - 1];
                if slot.is_none() && !text.is_empty() {
                    *slot = Some(text.to_string());
                }
            }
        }
        _ => {
            for (slot, line) in slots.iter_mut().zip(lines) {
                let text = split_marker(line).map_or(line, |(_, rest)| rest);
                if !text.is_empty() {
                    *slot = Some(text.to_string());
                }
            }
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_budget_exceeds_title_and_summary() {
        assert!(max_output_tokens(TranslationKind::Content) > max_output_tokens(TranslationKind::Summary));
        assert!(max_output_tokens(TranslationKind::Summary) > max_output_tokens(TranslationKind::Title));
    }

    #[test]
    fn prompts_are_kind_specific() {
        let title = build_prompt(TranslationKind::Title, "Korean", "Mavs win");
        let content = build_prompt(TranslationKind::Content, "Korean", "Mavs win");
        assert!(title.contains("headline"));
        assert!(content.contains("paragraph"));
        assert!(title.ends_with("\n\nMavs win"));
    }

    #[test]
    fn batch_prompt_numbers_and_flattens_texts() {
        let prompt = build_batch_prompt("Korean", &["Mavs win", "Kyrie\nout"]);
        assert!(prompt.contains("exactly 2 lines"));
        assert!(prompt.contains("1. Mavs win\n"));
        assert!(prompt.contains("2. Kyrie out\n"));
    }

    #[test]
    fn align_by_marker_tolerates_reordering() {
        let slots = align_batch_response("2. 둘\n1. 하나\n", 2);
        assert_eq!(slots, vec![Some("하나".to_string()), Some("둘".to_string())]);
    }

    #[test]
    fn align_short_response_leaves_missing_slots_empty() {
        let slots = align_batch_response("1. 하나\n2. 둘", 3);
        assert_eq!(slots[0].as_deref(), Some("하나"));
        assert_eq!(slots[1].as_deref(), Some("둘"));
        assert_eq!(slots[2], None);
    }

    #[test]
    fn align_unnumbered_lines_positionally() {
        let slots = align_batch_response("하나\n\n둘\n셋\n넷", 3);
        assert_eq!(
            slots,
            vec![
                Some("하나".to_string()),
                Some("둘".to_string()),
                Some("셋".to_string())
            ]
        );
    }

    #[test]
    fn out_of_range_markers_fall_back_to_positions() {
        let slots = align_batch_response("1. 하나\n7. 일곱", 2);
        assert_eq!(slots, vec![Some("하나".to_string()), Some("일곱".to_string())]);
    }

    #[test]
    fn split_marker_requires_separator() {
        assert_eq!(split_marker("3. three"), Some((3, "three")));
        assert_eq!(split_marker("4) four"), Some((4, "four")));
        assert_eq!(split_marker("76ers beat Mavs"), None);
    }
}
