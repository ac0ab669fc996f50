#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	clippy::expect_used,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::as_conversions,
	clippy::dbg_macro
)]
#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod consts;
mod decode;
mod error;
mod extension;

pub use consts::{ACCEPTED_EXTENSIONS, DEFAULT_MAXIMUM_UPLOAD_SIZE};
pub use decode::decode_image;
pub use error::{Error, Result};
pub use extension::{is_allowed_file, upload_extension};
pub use image::{DynamicImage, RgbImage};
