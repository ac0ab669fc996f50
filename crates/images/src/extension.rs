use crate::{
	consts::ACCEPTED_EXTENSIONS,
	error::{Error, Result},
};

/// Recovers the lowercased extension of an uploaded file's original name.
///
/// Only the text after the last `.` counts, so `archive.tar.JPG` yields `jpg`.
/// Names without a `.` have no extension, and extensions outside
/// [`ACCEPTED_EXTENSIONS`] are rejected.
pub fn upload_extension(filename: &str) -> Result<String> {
	let (_, ext) = filename.rsplit_once('.').ok_or(Error::NoExtension)?;
	let ext = ext.to_ascii_lowercase();

	if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
		Ok(ext)
	} else {
		Err(Error::Unsupported(ext))
	}
}

#[must_use]
pub fn is_allowed_file(filename: &str) -> bool {
	upload_extension(filename).is_ok()
}
