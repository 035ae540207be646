//! Seekable reader trait
//!
//! TIFF directories point backwards and forwards through a file, so every
//! decoder in the crate takes a reader that can seek as well as read.

use std::io::{Read, Seek};

/// Readers that can both read and seek (files, in-memory cursors)
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
