pub mod cortex;
pub mod extract;
pub mod parser;
pub mod state;

pub use cortex::{Completion, Cortex};
pub use extract::Extractor;
pub use parser::{normalize, normalize_with};
pub use state::AppConfig;
