pub mod media_item;
