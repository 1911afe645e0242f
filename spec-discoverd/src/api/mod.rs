pub mod discover;
pub mod replacer;
pub mod routes;
