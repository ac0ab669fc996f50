/// Extensions an upload may carry to be accepted for classification.
///
/// Matching is case-insensitive; entries are lowercase.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// The maximum size an uploaded image can be in order to be decoded.
///
/// This value is in bytes.
pub const DEFAULT_MAXIMUM_UPLOAD_SIZE: u64 = MIB * 24;

/// The size of 1MiB in bytes
const MIB: u64 = 1_048_576;
