pub mod codec;
pub mod config;
pub mod error;
pub mod image;

pub use codec::{decode, encode, fingerprint, write_image, Fingerprint};
pub use config::{load_dotenv, CachePolicy, Config};
pub use error::*;
pub use image::*;
