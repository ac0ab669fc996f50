use std::{
	env::current_exe,
	path::{Path, PathBuf},
};

use tracing::{error, warn};

pub(crate) fn get_path_relative_to_exe(path: impl AsRef<Path>) -> PathBuf {
	current_exe()
		.map_err(|e| error!("Failed to get current exe path: {e:#?}"))
		.ok()
		.and_then(|exe_path| {
			exe_path.parent().map(|parent_path| {
				let path = parent_path.join(path.as_ref());

				path.canonicalize().unwrap_or_else(|e| {
					warn!("Failed to canonicalize relative path to exe, return raw path and hope: {e:#?}");
					path
				})
			})
		})
		.unwrap_or_else(|| path.as_ref().to_path_buf())
}
