use bytes::{Buf, Bytes};

use crate::common::ByteStr;

/// Integer signess in postgres docs is awful.
pub trait UsizeExt {
    /// Length is `usize` in rust, while the extended protocol wants a
    /// signed 32-bit length, this will panic when overflow instead of
    /// wrapping.
    fn to_i32(self) -> i32;
}

/// Nul string operation in [`Bytes`].
pub trait BytesExt {
    /// Try to read a nul terminated string.
    ///
    /// Using [`ByteStr`] avoids allocating a [`Vec`] as required by
    /// [`String::from_utf8`]. A missing terminator takes the rest of the
    /// buffer.
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error>;
}

/// Helper trait to [`Display`][std::fmt::Display] bytes.
pub trait FmtExt {
    /// Lossy [`Display`][std::fmt::Display] bytes.
    fn lossy(&self) -> LossyFmt<'_>;
}

/// Lossy [`Display`][std::fmt::Display] implementation for bytes.
pub struct LossyFmt<'a>(pub &'a [u8]);

impl UsizeExt for usize {
    fn to_i32(self) -> i32 {
        self.try_into().expect("value size too large for protocol")
    }
}

impl BytesExt for Bytes {
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error> {
        match self.iter().position(|e| matches!(e, b'\0')) {
            Some(end) => {
                let me = self.split_to(end);
                Buf::advance(self, 1); // nul
                ByteStr::from_utf8(me)
            },
            None => ByteStr::from_utf8(self.split_to(self.len())),
        }
    }
}

impl FmtExt for [u8] {
    fn lossy(&self) -> LossyFmt<'_> {
        LossyFmt(self)
    }
}

impl std::fmt::Display for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in self.0 {
            if b.is_ascii_graphic() || b.is_ascii_whitespace() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:x}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b\"{self}\"")
    }
}
