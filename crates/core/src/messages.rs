//! Operator-facing messages for the import flow.
//!
//! The dashboard is used in Brazilian Portuguese first; English is kept for
//! API clients that ask for it.

use serde::{Deserialize, Serialize};

/// Language used for warnings placed in an `ImportResult`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en")]
    En,
}

impl Locale {
    /// Parse a locale tag. Returns `None` for unknown tags.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "pt-br" | "pt_br" | "pt" => Some(Self::PtBr),
            "en" | "en-us" | "en_us" => Some(Self::En),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PtBr => "pt-BR",
            Self::En => "en",
        }
    }

    /// Warning for a data row dropped because its title is empty.
    ///
    /// `display_row` is the line number as the operator sees it in a
    /// spreadsheet (header on line 1).
    pub fn empty_title(&self, display_row: usize) -> String {
        match self {
            Self::PtBr => format!("Linha {display_row}: título vazio, ignorada."),
            Self::En => format!("Row {display_row}: empty title, skipped."),
        }
    }

    pub fn unsupported_format(&self, extension: &str) -> String {
        match self {
            Self::PtBr => format!(
                "Formato de arquivo não suportado (.{extension}). Use .xlsx, .xls, .csv ou .txt."
            ),
            Self::En => format!(
                "Unsupported file format (.{extension}). Use .xlsx, .xls, .csv or .txt."
            ),
        }
    }

    pub fn empty_file(&self) -> String {
        match self {
            Self::PtBr => "Arquivo vazio ou sem linhas de dados.".to_string(),
            Self::En => "The file is empty or has no data rows.".to_string(),
        }
    }

    pub fn read_failure(&self, detail: &str) -> String {
        match self {
            Self::PtBr => format!("Erro ao ler o arquivo: {detail}"),
            Self::En => format!("Could not read the file: {detail}"),
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_tags() {
        assert_eq!(Locale::parse("pt-BR"), Some(Locale::PtBr));
        assert_eq!(Locale::parse("PT"), Some(Locale::PtBr));
        assert_eq!(Locale::parse("en"), Some(Locale::En));
        assert_eq!(Locale::parse("fr"), None);
    }

    #[test]
    fn empty_title_wording() {
        assert_eq!(
            Locale::PtBr.empty_title(3),
            "Linha 3: título vazio, ignorada."
        );
        assert_eq!(Locale::En.empty_title(7), "Row 7: empty title, skipped.");
    }

    #[test]
    fn default_is_portuguese() {
        assert_eq!(Locale::default(), Locale::PtBr);
    }
}
