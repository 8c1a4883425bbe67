mod media_item_repo;

pub use media_item_repo::MediaItemRepo;
