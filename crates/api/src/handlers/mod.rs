pub mod import_events;
pub mod imports;
