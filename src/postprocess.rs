use crate::config::Config;
use unicode_normalization::UnicodeNormalization;

/// Normalize a positional label answer (classification or page-order output).
///
/// Models tend to echo the labels back with separators ("2,2,5,5,3"); the
/// answer tables store the bare label string ("22553").
pub fn normalize_label_answer(cfg: &Config, raw: &str) -> String {
    let mut answer = raw.trim().to_string();

    if cfg.postprocess.normalize_unicode {
        answer = answer.nfkc().collect::<String>();
    }

    let separators = &cfg.postprocess.strip_separators;
    if !separators.is_empty() {
        answer.retain(|ch| !separators.contains(ch));
    }

    answer
}

/// Free-text answers are stored as the model produced them unless trimming
/// is switched on.
pub fn normalize_text_answer(cfg: &Config, raw: &str) -> String {
    if cfg.postprocess.trim_answers {
        raw.trim().to_string()
    } else {
        raw.to_string()
    }
}
