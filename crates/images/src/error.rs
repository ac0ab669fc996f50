pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("error while loading the image (via the `image` crate): {0}")]
	Image(#[from] image::ImageError),
	#[error("there was an i/o error: {0}")]
	Io(#[from] std::io::Error),
	#[error("the image provided is unsupported: <extension='{0}'>")]
	Unsupported(String),
	#[error("the image provided is too large: <size='{size}', maximum='{maximum}'>")]
	TooLarge { size: u64, maximum: u64 },
	#[error("the image provided is empty")]
	Empty,
	#[error("invalid filename provided (it had no file extension)")]
	NoExtension,
}
