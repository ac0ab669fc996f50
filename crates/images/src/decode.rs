use crate::error::{Error, Result};

use std::io::Cursor;

use image::{io::Reader as ImageReader, DynamicImage};
use tracing::trace;

/// Decodes an uploaded image from memory.
///
/// The container format is sniffed from the bytes themselves; the upload's
/// extension has already been checked by the caller.
pub fn decode_image(data: &[u8], maximum_size: u64) -> Result<DynamicImage> {
	if data.is_empty() {
		return Err(Error::Empty);
	}

	let size = u64::try_from(data.len()).unwrap_or(u64::MAX);
	if size > maximum_size {
		return Err(Error::TooLarge {
			size,
			maximum: maximum_size,
		});
	}

	let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
	trace!(format = ?reader.format(), size, "Decoding uploaded image");

	Ok(reader.decode()?)
}
