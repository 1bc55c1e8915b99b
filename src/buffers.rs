//! Constants for buffer sizes.

/// The default capacity (in bytes) of a buffer holding one line of command output.
///
/// Most lines fit without resizing, and only two of these buffers exist per running command.
pub const LINE_BUFFER_CAPACITY: usize = 1024;

/// The default capacity (in bytes) of a buffer capturing a whole output stream.
pub const CAPTURE_BUFFER_CAPACITY: usize = 16 * 1024;
