pub mod logging;
pub mod text;

pub use text::{clean_text, first_line, text_fingerprint};
