pub mod document;
pub mod fetch;
pub mod policy;

pub use document::SpecDocument;
