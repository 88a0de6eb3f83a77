//! Local library: ledger, content store, playlists, and the link
//! materializer

pub mod entry;
pub mod ledger;
pub mod linker;
pub mod playlist;
pub mod store;

pub use entry::{SongEntry, TagStatus};
pub use ledger::SongDb;
pub use linker::{LinkReport, link_playlist};
pub use playlist::Playlist;
pub use store::MediaStore;
