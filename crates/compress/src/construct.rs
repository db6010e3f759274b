use crate::Compression;
use crate::error::{Error, ErrorKind};
use std::{path::Path, str::FromStr};

const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
#[cfg(feature = "xz")]
const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
#[cfg(feature = "zstd")]
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Longest magic byte sequence that [`Compression::from_magic_bytes`] inspects.
pub const MAGIC_LEN: usize = 6;

impl FromStr for Compression {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "plain" => Ok(Compression::None),
            "bz2" | "bzip2" => Ok(Compression::Bzip2),
            "gz" | "gzip" => Ok(Compression::Gzip),
            #[cfg(feature = "xz")]
            "xz" | "lzma" => Ok(Compression::Xz),
            #[cfg(not(feature = "xz"))]
            "xz" | "lzma" => exn::bail!(ErrorKind::DisabledFormat(s.to_string())),
            #[cfg(feature = "zstd")]
            "zst" | "zstd" => Ok(Compression::Zstd),
            #[cfg(not(feature = "zstd"))]
            "zst" | "zstd" => exn::bail!(ErrorKind::DisabledFormat(s.to_string())),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

impl Compression {
    /// Detect compression from a file extension.
    ///
    /// Dump files are named `<wiki>-<date>-pages-articles-multistream.xml.bz2`,
    /// so only the final extension is considered.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_lowercase().as_str() {
                "bz2" => Compression::Bzip2,
                "gz" => Compression::Gzip,
                #[cfg(feature = "xz")]
                "xz" => Compression::Xz,
                #[cfg(feature = "zstd")]
                "zst" => Compression::Zstd,
                _ => Compression::None,
            })
            .unwrap_or(Compression::None)
    }

    /// Detect compression format from magic bytes.
    ///
    /// Returns the `None` variant if no magic bytes match or if the input is
    /// too short to detect any format.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&BZIP2_MAGIC) {
            return Compression::Bzip2;
        }
        if bytes.starts_with(&GZIP_MAGIC) {
            return Compression::Gzip;
        }
        #[cfg(feature = "xz")]
        if bytes.starts_with(&XZ_MAGIC) {
            return Compression::Xz;
        }
        #[cfg(feature = "zstd")]
        if bytes.starts_with(&ZSTD_MAGIC) {
            return Compression::Zstd;
        }
        Compression::None
    }

    /// Detect the format of a file, preferring its leading bytes over its name.
    ///
    /// Renamed or extension-less dumps are common enough that the extension
    /// is only a fallback for files whose header matches nothing.
    pub fn detect(head: &[u8], path: impl AsRef<Path>) -> Self {
        match Self::from_magic_bytes(head) {
            Compression::None => Self::from_path(path),
            detected => detected,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use rstest::rstest;

    #[rstest]
    #[case("none", Compression::None)]
    #[case("plain", Compression::None)]
    #[case("bz2", Compression::Bzip2)]
    #[case("BZIP2", Compression::Bzip2)]
    #[case(" gzip ", Compression::Gzip)]
    #[cfg_attr(feature = "xz", case("lzma", Compression::Xz))]
    #[cfg_attr(feature = "zstd", case("zst", Compression::Zstd))]
    fn test_from_str(#[case] test: &str, #[case] expected: Compression) {
        assert_eq!(test.parse::<Compression>().unwrap(), expected);
    }

    #[rstest]
    #[case("invalid")]
    #[case("br")]
    #[case(" ")]
    fn test_from_str_invalid(#[case] test: &str) {
        assert!(test.parse::<Compression>().is_err());
    }

    #[rstest]
    #[case("enwiki-20240601-pages-articles-multistream.xml.bz2", Compression::Bzip2)]
    #[case("enwiki-20240601-pages-articles-multistream-index.txt.bz2", Compression::Bzip2)]
    #[case("index.txt.gz", Compression::Gzip)]
    #[case("index.txt", Compression::None)]
    // A dotfile has no extension at all.
    #[case(".bz2", Compression::None)]
    #[cfg_attr(feature = "xz", case("dump.xml.xz", Compression::Xz))]
    #[cfg_attr(feature = "zstd", case("dump.xml.zst", Compression::Zstd))]
    fn test_from_path(#[case] test: &str, #[case] expected: Compression) {
        assert_eq!(Compression::from_path(test), expected);
    }

    #[rstest]
    #[case(b"<mediawiki", Compression::None)]
    #[case(b"", Compression::None)]
    #[case(&[0x42, 0x5A, 0x68, 0x39], Compression::Bzip2)]
    #[case(&[0x1F, 0x8B, 0x08, 0x00], Compression::Gzip)]
    #[cfg_attr(feature = "xz", case(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00], Compression::Xz))]
    #[cfg_attr(feature = "zstd", case(&[0x28, 0xB5, 0x2F, 0xFD], Compression::Zstd))]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: Compression) {
        assert_eq!(Compression::from_magic_bytes(bytes), expected);
    }

    #[test]
    fn test_detect_prefers_header() {
        // Header says gzip, name says bzip2.
        assert_eq!(Compression::detect(&[0x1F, 0x8B, 0x08], "index.txt.bz2"), Compression::Gzip);
        // Unknown header falls back to the extension.
        assert_eq!(Compression::detect(b"", "index.txt.bz2"), Compression::Bzip2);
        assert_eq!(Compression::detect(b"100:1:Cat", "index.txt"), Compression::None);
    }
}
