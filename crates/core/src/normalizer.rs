//! Row normalizer: maps localized column headers onto the canonical field
//! set and coerces raw cell text into an [`ImportedRow`].
//!
//! Every field except `title` degrades to a safe default. An empty title is
//! the single rejection rule.

use std::collections::BTreeMap;

use crate::messages::Locale;
use crate::row::{ImportedRow, ItemStatus};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const FIELD_TITLE: &str = "title";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_RATING: &str = "rating";
pub const FIELD_PLATFORM: &str = "platform";
pub const FIELD_GENRES: &str = "genres";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_ISBN: &str = "isbn";
pub const FIELD_SYNOPSIS: &str = "synopsis";

/// Canonical fields the normalizer interprets.
pub const CANONICAL_FIELDS: &[&str] = &[
    FIELD_TITLE,
    FIELD_STATUS,
    FIELD_RATING,
    FIELD_PLATFORM,
    FIELD_GENRES,
    FIELD_AUTHOR,
    FIELD_ISBN,
    FIELD_SYNOPSIS,
];

/// Header synonyms, keyed by their lower-cased, accent-folded spelling.
const HEADER_SYNONYMS: &[(&str, &str)] = &[
    ("titulo", FIELD_TITLE),
    ("nome", FIELD_TITLE),
    ("name", FIELD_TITLE),
    ("title", FIELD_TITLE),
    ("status", FIELD_STATUS),
    ("estado", FIELD_STATUS),
    ("nota", FIELD_RATING),
    ("rating", FIELD_RATING),
    ("avaliacao", FIELD_RATING),
    ("plataforma", FIELD_PLATFORM),
    ("platform", FIELD_PLATFORM),
    ("genero", FIELD_GENRES),
    ("generos", FIELD_GENRES),
    ("genres", FIELD_GENRES),
    ("genre", FIELD_GENRES),
    ("autor", FIELD_AUTHOR),
    ("author", FIELD_AUTHOR),
    ("isbn", FIELD_ISBN),
    ("sinopse", FIELD_SYNOPSIS),
    ("synopsis", FIELD_SYNOPSIS),
    ("descricao", FIELD_SYNOPSIS),
    ("description", FIELD_SYNOPSIS),
];

/// Status synonyms, keyed by their lower-cased, accent-folded spelling.
const STATUS_SYNONYMS: &[(&str, ItemStatus)] = &[
    ("pendente", ItemStatus::Pending),
    ("pending", ItemStatus::Pending),
    ("backlog", ItemStatus::Pending),
    ("assistindo", ItemStatus::Watching),
    ("watching", ItemStatus::Watching),
    ("jogando", ItemStatus::Watching),
    ("playing", ItemStatus::Watching),
    ("lendo", ItemStatus::Watching),
    ("reading", ItemStatus::Watching),
    ("completo", ItemStatus::Completed),
    ("completed", ItemStatus::Completed),
    ("concluido", ItemStatus::Completed),
    ("zerado", ItemStatus::Completed),
    ("finished", ItemStatus::Completed),
    ("casual", ItemStatus::Casual),
];

/// Separators accepted between genre tokens.
const GENRE_SEPARATORS: &[char] = &[',', ';', '|'];

/// Upper bound of the rating scale.
pub const MAX_RATING: f64 = 10.0;

// ---------------------------------------------------------------------------
// Field normalizers
// ---------------------------------------------------------------------------

/// Map a raw header to its canonical field name.
///
/// Unrecognised headers pass through lower-cased and trimmed.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let folded = fold_accents(&lowered);
    HEADER_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == folded)
        .map(|(_, field)| (*field).to_string())
        .unwrap_or(lowered)
}

/// Map a raw status cell to an [`ItemStatus`]; anything unknown is `Pending`.
pub fn normalize_status(raw: Option<&str>) -> ItemStatus {
    let Some(raw) = raw else {
        return ItemStatus::Pending;
    };
    let folded = fold_accents(&raw.trim().to_lowercase());
    STATUS_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == folded)
        .map(|(_, status)| *status)
        .unwrap_or_default()
}

/// Parse a rating, accepting `,` or `.` as decimal separator.
///
/// Non-numeric input yields `None`. Numbers are clamped to `[0, 10]` and
/// rounded to one decimal place.
pub fn normalize_rating(raw: Option<&str>) -> Option<f64> {
    let text = raw?.trim().replace(',', ".");
    if text.is_empty() {
        return None;
    }
    let value: f64 = text.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let clamped = value.clamp(0.0, MAX_RATING);
    Some((clamped * 10.0).round() / 10.0)
}

/// Split a genre cell on `,`, `;` or `|`.
///
/// Absent or empty input yields `None` so callers can tell "no genre data"
/// apart from a cell holding only separators (`Some(vec![])`).
pub fn normalize_genres(raw: Option<&str>) -> Option<Vec<String>> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.split(GENRE_SEPARATORS)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(String::from)
            .collect(),
    )
}

/// Trim a free-text cell; empty becomes `None`.
pub fn normalize_optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
}

// ---------------------------------------------------------------------------
// Row normalizer
// ---------------------------------------------------------------------------

/// Build an [`ImportedRow`] from `(canonical_header, value)` pairs.
///
/// `data_index` is the zero-based position of the row among data rows; the
/// warning returned for an empty title names the spreadsheet line
/// `data_index + 2` (one for 1-based numbering, one for the header row).
/// When a canonical header appears twice, the first column wins.
pub fn normalize_row<I, K, V>(fields: I, data_index: usize, locale: Locale) -> Result<ImportedRow, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut cells: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in fields {
        cells.entry(key.into()).or_insert_with(|| value.into());
    }

    let title = cells
        .remove(FIELD_TITLE)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    if title.is_empty() {
        return Err(locale.empty_title(display_row(data_index)));
    }

    let status = normalize_status(cells.get(FIELD_STATUS).map(String::as_str));
    let rating = normalize_rating(cells.get(FIELD_RATING).map(String::as_str));
    let genres = normalize_genres(cells.get(FIELD_GENRES).map(String::as_str));
    let platform = normalize_optional_text(cells.get(FIELD_PLATFORM).map(String::as_str));
    let author = normalize_optional_text(cells.get(FIELD_AUTHOR).map(String::as_str));
    let isbn = normalize_optional_text(cells.get(FIELD_ISBN).map(String::as_str));
    let synopsis = normalize_optional_text(cells.get(FIELD_SYNOPSIS).map(String::as_str));

    let extra = cells
        .into_iter()
        .filter(|(key, _)| !key.is_empty() && !CANONICAL_FIELDS.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let value = value.trim().to_string();
            (!value.is_empty()).then_some((key, value))
        })
        .collect();

    Ok(ImportedRow {
        title,
        status,
        rating,
        platform,
        genres,
        author,
        isbn,
        synopsis,
        extra,
    })
}

/// Spreadsheet line number of a zero-based data row.
pub fn display_row(data_index: usize) -> usize {
    data_index + 2
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Combining diacritical marks, as left behind by NFD-decomposed text.
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{300}'..='\u{36f}';

/// Strip the diacritics used in Portuguese (and a few neighbours), in both
/// precomposed and decomposed form.
fn fold_accents(text: &str) -> String {
    text.chars()
        .filter(|c| !COMBINING_MARKS.contains(c))
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- normalize_header --

    #[test]
    fn header_synonyms_map_to_canonical() {
        assert_eq!(normalize_header("Título"), "title");
        assert_eq!(normalize_header("titulo"), "title");
        assert_eq!(normalize_header("Nome"), "title");
        assert_eq!(normalize_header(" NOTA "), "rating");
        assert_eq!(normalize_header("Avaliação"), "rating");
        assert_eq!(normalize_header("Gêneros"), "genres");
        assert_eq!(normalize_header("Descrição"), "synopsis");
        assert_eq!(normalize_header("Plataforma"), "platform");
        assert_eq!(normalize_header("Estado"), "status");
    }

    #[test]
    fn canonical_headers_are_fixed_points() {
        for field in CANONICAL_FIELDS {
            assert_eq!(normalize_header(field), *field, "field: {field}");
            assert_eq!(normalize_header(&normalize_header(field)), *field);
        }
    }

    #[test]
    fn unknown_header_passes_through_lower_cased() {
        assert_eq!(normalize_header("Diretor"), "diretor");
        assert_eq!(normalize_header("Ano de Lançamento"), "ano de lançamento");
    }

    // -- normalize_status --

    #[test]
    fn status_synonyms_in_both_languages() {
        assert_eq!(normalize_status(Some("Pendente")), ItemStatus::Pending);
        assert_eq!(normalize_status(Some("backlog")), ItemStatus::Pending);
        assert_eq!(normalize_status(Some("Jogando")), ItemStatus::Watching);
        assert_eq!(normalize_status(Some("reading")), ItemStatus::Watching);
        assert_eq!(normalize_status(Some("Concluído")), ItemStatus::Completed);
        assert_eq!(normalize_status(Some("ZERADO")), ItemStatus::Completed);
        assert_eq!(normalize_status(Some(" casual ")), ItemStatus::Casual);
    }

    #[test]
    fn unknown_or_missing_status_defaults_to_pending() {
        assert_eq!(normalize_status(None), ItemStatus::Pending);
        assert_eq!(normalize_status(Some("")), ItemStatus::Pending);
        assert_eq!(normalize_status(Some("abandonado")), ItemStatus::Pending);
        assert_eq!(normalize_status(Some("42")), ItemStatus::Pending);
    }

    // -- normalize_rating --

    #[test]
    fn rating_accepts_comma_and_dot() {
        assert_eq!(normalize_rating(Some("9,5")), Some(9.5));
        assert_eq!(normalize_rating(Some("7.25")), Some(7.3));
        assert_eq!(normalize_rating(Some(" 8 ")), Some(8.0));
    }

    #[test]
    fn rating_is_clamped_then_rounded() {
        assert_eq!(normalize_rating(Some("11")), Some(10.0));
        assert_eq!(normalize_rating(Some("-3")), Some(0.0));
        assert_eq!(normalize_rating(Some("9.96")), Some(10.0));
        assert_eq!(normalize_rating(Some("0.04")), Some(0.0));
    }

    #[test]
    fn rating_bounds_hold_for_a_sweep() {
        let mut raw = -20.0_f64;
        while raw <= 20.0 {
            let rating = normalize_rating(Some(&raw.to_string())).unwrap();
            assert!((0.0..=MAX_RATING).contains(&rating), "raw {raw} -> {rating}");
            raw += 0.37;
        }
    }

    #[test]
    fn non_numeric_rating_is_absent_not_zero() {
        assert_eq!(normalize_rating(None), None);
        assert_eq!(normalize_rating(Some("")), None);
        assert_eq!(normalize_rating(Some("ótimo")), None);
        assert_eq!(normalize_rating(Some("NaN")), None);
        assert_eq!(normalize_rating(Some("inf")), None);
    }

    // -- normalize_genres --

    #[test]
    fn genres_split_on_all_separators() {
        assert_eq!(
            normalize_genres(Some("Ação, RPG;Aventura | Indie")),
            Some(vec![
                "Ação".to_string(),
                "RPG".to_string(),
                "Aventura".to_string(),
                "Indie".to_string()
            ])
        );
    }

    #[test]
    fn genres_absent_versus_explicitly_empty() {
        assert_eq!(normalize_genres(None), None);
        assert_eq!(normalize_genres(Some("")), None);
        assert_eq!(normalize_genres(Some(" ,; | ")), Some(vec![]));
    }

    // -- normalize_row --

    #[test]
    fn row_with_all_fields() {
        let row = normalize_row(
            vec![
                ("title", " Hollow Knight "),
                ("status", "zerado"),
                ("rating", "9,5"),
                ("platform", "Switch"),
                ("genres", "Metroidvania|Indie"),
                ("diretor", "Team Cherry"),
            ],
            0,
            Locale::PtBr,
        )
        .unwrap();

        assert_eq!(row.title, "Hollow Knight");
        assert_eq!(row.status, ItemStatus::Completed);
        assert_eq!(row.rating, Some(9.5));
        assert_eq!(row.platform.as_deref(), Some("Switch"));
        assert_eq!(row.genres.as_ref().map(Vec::len), Some(2));
        assert_eq!(row.extra.get("diretor").map(String::as_str), Some("Team Cherry"));
    }

    #[test]
    fn row_with_blank_title_is_rejected_with_display_line() {
        let err = normalize_row(vec![("title", "   "), ("rating", "7")], 1, Locale::PtBr)
            .unwrap_err();
        assert_eq!(err, "Linha 3: título vazio, ignorada.");
    }

    #[test]
    fn row_without_title_column_is_rejected() {
        let err = normalize_row(vec![("rating", "7")], 4, Locale::En).unwrap_err();
        assert_eq!(err, "Row 6: empty title, skipped.");
    }

    #[test]
    fn first_duplicate_column_wins() {
        let row = normalize_row(vec![("title", "Primeiro"), ("title", "Segundo")], 0, Locale::PtBr)
            .unwrap();
        assert_eq!(row.title, "Primeiro");
    }

    #[test]
    fn empty_optional_text_becomes_none() {
        let row = normalize_row(
            vec![("title", "Duna"), ("author", "  "), ("isbn", ""), ("notes", " ")],
            0,
            Locale::PtBr,
        )
        .unwrap();
        assert!(row.author.is_none());
        assert!(row.isbn.is_none());
        assert!(row.extra.is_empty());
    }

    #[test]
    fn fold_accents_strips_portuguese_diacritics() {
        assert_eq!(fold_accents("ação título gênero"), "acao titulo genero");
    }

    #[test]
    fn decomposed_accents_fold_like_precomposed() {
        assert_eq!(fold_accents("Ti\u{301}tulo"), "Titulo");
        assert_eq!(normalize_header("Ti\u{301}tulo"), "title");
        assert_eq!(normalize_header("Ge\u{302}neros"), "genres");
        assert_eq!(normalize_status(Some("conclui\u{301}do")), ItemStatus::Completed);
    }
}
