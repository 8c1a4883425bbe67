//! Media item models and DTOs.
//!
//! Maps to the `media_items` table created in migration 000001.

use std::fmt;

use painel_core::row::ImportedRow;
use painel_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Which catalogue an item belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCollection {
    #[default]
    Movies,
    Series,
    Books,
    Games,
}

impl MediaCollection {
    pub const ALL: [MediaCollection; 4] = [Self::Movies, Self::Series, Self::Books, Self::Games];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::Series => "series",
            Self::Books => "books",
            Self::Games => "games",
        }
    }

    /// Case-insensitive lookup of the stored name.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for MediaCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `media_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaItem {
    pub id: DbId,
    pub collection: String,
    pub title: String,
    pub status: String,
    pub rating: Option<f64>,
    pub platform: Option<String>,
    pub genres: Option<Vec<String>>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub synopsis: Option<String>,
    pub extra: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for inserting a new media item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateMediaItem {
    pub collection: MediaCollection,
    pub title: String,
    pub status: String,
    pub rating: Option<f64>,
    pub platform: Option<String>,
    pub genres: Option<Vec<String>>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub synopsis: Option<String>,
    pub extra: serde_json::Value,
}

impl CreateMediaItem {
    /// Build the insert payload for a normalized import row.
    ///
    /// Unrecognised spreadsheet columns end up as a flat JSON object in
    /// `extra`.
    pub fn from_imported(collection: MediaCollection, row: &ImportedRow) -> Self {
        let extra = row
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect::<serde_json::Map<_, _>>();

        Self {
            collection,
            title: row.title.clone(),
            status: row.status.as_str().to_string(),
            rating: row.rating,
            platform: row.platform.clone(),
            genres: row.genres.clone(),
            author: row.author.clone(),
            isbn: row.isbn.clone(),
            synopsis: row.synopsis.clone(),
            extra: serde_json::Value::Object(extra),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use painel_core::row::ItemStatus;

    #[test]
    fn collection_parse_is_case_insensitive() {
        assert_eq!(MediaCollection::parse("Books"), Some(MediaCollection::Books));
        assert_eq!(MediaCollection::parse(" games "), Some(MediaCollection::Games));
        assert_eq!(MediaCollection::parse("podcasts"), None);
        for c in MediaCollection::ALL {
            assert_eq!(MediaCollection::parse(c.as_str()), Some(c));
        }
    }

    #[test]
    fn collection_serializes_as_stored_name() {
        let json = serde_json::to_string(&MediaCollection::Series).unwrap();
        assert_eq!(json, "\"series\"");
    }

    #[test]
    fn from_imported_copies_fields() {
        let mut row = ImportedRow::titled("Hollow Knight");
        row.status = ItemStatus::Completed;
        row.rating = Some(9.5);
        row.platform = Some("Switch".into());
        row.genres = Some(vec!["Metroidvania".into()]);
        row.extra.insert("ano".into(), "2017".into());

        let item = CreateMediaItem::from_imported(MediaCollection::Games, &row);

        assert_eq!(item.collection, MediaCollection::Games);
        assert_eq!(item.title, "Hollow Knight");
        assert_eq!(item.status, "COMPLETED");
        assert_eq!(item.rating, Some(9.5));
        assert_eq!(item.genres.as_deref(), Some(&["Metroidvania".to_string()][..]));
        assert_eq!(item.extra, serde_json::json!({ "ano": "2017" }));
    }

    #[test]
    fn from_imported_without_extra_gives_empty_object() {
        let item = CreateMediaItem::from_imported(MediaCollection::Books, &ImportedRow::titled("Dune"));
        assert_eq!(item.status, "PENDING");
        assert_eq!(item.extra, serde_json::json!({}));
        assert!(item.author.is_none());
    }
}
