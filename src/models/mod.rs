pub mod url;

pub use url::{BatchDelete, DumpRecord, OwnedUrl, UrlRecord};
