use std::{fmt::Display, io, path::Path};

use thiserror::Error;

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: io::Error,
	pub maybe_context: Option<String>,
}

impl Display for FileIOError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"file I/O error{}: {}; path: '{}'",
			self.maybe_context
				.as_ref()
				.map(|ctx| format!(" ({ctx})"))
				.unwrap_or_default(),
			self.source,
			self.path.display()
		)
	}
}

impl FileIOError {
	pub fn from_std_io_err(path: impl AsRef<Path>, source: io::Error) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: None,
		}
	}

	pub fn from_std_io_err_with_msg(
		path: impl AsRef<Path>,
		source: io::Error,
		msg: impl Into<String>,
	) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(msg.into()),
		}
	}
}

impl<P: AsRef<Path>> From<(P, io::Error)> for FileIOError {
	fn from((path, source): (P, io::Error)) -> Self {
		Self::from_std_io_err(path, source)
	}
}

impl<P: AsRef<Path>, M: Into<String>> From<(P, io::Error, M)> for FileIOError {
	fn from((path, source, msg): (P, io::Error, M)) -> Self {
		Self::from_std_io_err_with_msg(path, source, msg)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_includes_context_and_path() {
		let err = FileIOError::from((
			"static/uploads/abc.png",
			io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
			"Failed to save upload",
		));

		let msg = err.to_string();
		assert!(msg.starts_with("file I/O error (Failed to save upload): denied"));
		assert!(msg.ends_with("path: 'static/uploads/abc.png'"));
	}

	#[test]
	fn display_without_context() {
		let err = FileIOError::from((
			"model.onnx",
			io::Error::new(io::ErrorKind::NotFound, "missing"),
		));

		assert_eq!(err.to_string(), "file I/O error: missing; path: 'model.onnx'");
	}
}
