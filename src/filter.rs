use whatlang::Lang;

use crate::config::Config;
use crate::models::JobRecord;

/// Language detection that never fails: undetectable text (empty, too
/// short, ambiguous) is treated as English.
pub fn safe_detect(text: &str) -> Lang {
    whatlang::detect_lang(text).unwrap_or(Lang::Eng)
}

/// `accepted` holds ISO 639-3 codes ("eng", "deu", ...) or the 639-1
/// two-letter codes older configs carry ("en", "de"). Unknown codes
/// never match.
pub fn lang_accepted(lang: Lang, accepted: &[String]) -> bool {
    accepted
        .iter()
        .any(|code| lang_from_code(code) == Some(lang))
}

fn lang_from_code(code: &str) -> Option<Lang> {
    Lang::from_code(code).or_else(|| Lang::from_code(iso639_1_to_3(code)?))
}

/// 639-1 aliases for the languages whatlang can detect.
fn iso639_1_to_3(code: &str) -> Option<&'static str> {
    let three = match code.to_lowercase().as_str() {
        "af" => "afr",
        "ak" => "aka",
        "am" => "amh",
        "ar" => "ara",
        "az" => "aze",
        "be" => "bel",
        "bg" => "bul",
        "bn" => "ben",
        "ca" => "cat",
        "cs" => "ces",
        "da" => "dan",
        "de" => "deu",
        "el" => "ell",
        "en" => "eng",
        "eo" => "epo",
        "es" => "spa",
        "et" => "est",
        "fa" => "pes",
        "fi" => "fin",
        "fr" => "fra",
        "gu" => "guj",
        "he" => "heb",
        "hi" => "hin",
        "hr" => "hrv",
        "hu" => "hun",
        "hy" => "hye",
        "id" => "ind",
        "it" => "ita",
        "ja" => "jpn",
        "jv" => "jav",
        "ka" => "kat",
        "km" => "khm",
        "kn" => "kan",
        "ko" => "kor",
        "la" => "lat",
        "lt" => "lit",
        "lv" => "lav",
        "mk" => "mkd",
        "ml" => "mal",
        "mr" => "mar",
        "my" => "mya",
        "nb" | "no" => "nob",
        "ne" => "nep",
        "nl" => "nld",
        "or" => "ori",
        "pa" => "pan",
        "pl" => "pol",
        "pt" => "por",
        "ro" => "ron",
        "ru" => "rus",
        "si" => "sin",
        "sk" => "slk",
        "sl" => "slv",
        "sn" => "sna",
        "sr" => "srp",
        "sv" => "swe",
        "ta" => "tam",
        "te" => "tel",
        "th" => "tha",
        "tk" => "tuk",
        "tl" => "tgl",
        "tr" => "tur",
        "uk" => "ukr",
        "ur" => "urd",
        "uz" => "uzb",
        "vi" => "vie",
        "yi" => "yid",
        "zh" => "cmn",
        "zu" => "zul",
        _ => return None,
    };
    Some(three)
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .any(|needle| haystack.contains(&needle.to_lowercase()))
}

/// One relevance verdict. The pipeline applies this twice: once on bare
/// cards (the description is still empty, so the description and language
/// categories cannot reject anything there) and once, authoritatively,
/// after the detail fetch. An empty list for any category is a
/// pass-through for that category.
pub fn is_relevant(job: &JobRecord, config: &Config) -> bool {
    if contains_any(&job.job_description, &config.desc_words) {
        return false;
    }
    if !config.title_exclude.is_empty() && contains_any(&job.title, &config.title_exclude) {
        return false;
    }
    if !config.title_include.is_empty() && !contains_any(&job.title, &config.title_include) {
        return false;
    }
    if !config.languages.is_empty()
        && !lang_accepted(safe_detect(&job.job_description), &config.languages)
    {
        return false;
    }
    if contains_any(&job.company, &config.company_exclude) {
        return false;
    }
    true
}

/// Tags every record kept or filtered in a single pass, so the filtered
/// set is never reconstructed later by set-difference.
pub fn partition_relevant(
    records: Vec<JobRecord>,
    config: &Config,
) -> (Vec<JobRecord>, Vec<JobRecord>) {
    records
        .into_iter()
        .partition(|job| is_relevant(job, config))
}
