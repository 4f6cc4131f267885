pub mod config;
pub mod error;

pub use config::{load_dotenv, YieldConfig};
pub use error::*;
