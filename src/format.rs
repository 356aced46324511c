use std::path::Path;

use serde::Serialize;

/// Which container scheme a file belongs to, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Ncm,
    Qmc,
    Mflac,
    Mgg,
    Kgm,
    Vpr,
    Normal,
}

const EXTENSIONS: &[(&str, FormatTag)] = &[
    ("ncm", FormatTag::Ncm),
    ("qmc0", FormatTag::Qmc),
    ("qmc2", FormatTag::Qmc),
    ("qmc3", FormatTag::Qmc),
    ("qmcflac", FormatTag::Qmc),
    ("qmcogg", FormatTag::Qmc),
    ("mflac", FormatTag::Mflac),
    ("mflac0", FormatTag::Mflac),
    ("mgg", FormatTag::Mgg),
    ("mgg1", FormatTag::Mgg),
    ("kgm", FormatTag::Kgm),
    ("kgma", FormatTag::Kgm),
    ("vpr", FormatTag::Vpr),
];

impl FormatTag {
    pub fn from_extension(ext: &str) -> FormatTag {
        EXTENSIONS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(ext))
            .map(|(_, tag)| *tag)
            .unwrap_or(FormatTag::Normal)
    }

    pub fn is_encrypted(self) -> bool {
        self != FormatTag::Normal
    }
}

/// Map a file name to its container format. Unknown or missing extensions are `Normal`.
pub fn detect(filename: &str) -> FormatTag {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(FormatTag::from_extension)
        .unwrap_or(FormatTag::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_every_known_extension() {
        let cases = [
            ("a.ncm", FormatTag::Ncm),
            ("a.qmc0", FormatTag::Qmc),
            ("a.qmc2", FormatTag::Qmc),
            ("a.qmc3", FormatTag::Qmc),
            ("a.qmcflac", FormatTag::Qmc),
            ("a.qmcogg", FormatTag::Qmc),
            ("a.mflac", FormatTag::Mflac),
            ("a.mflac0", FormatTag::Mflac),
            ("a.mgg", FormatTag::Mgg),
            ("a.mgg1", FormatTag::Mgg),
            ("a.kgm", FormatTag::Kgm),
            ("a.kgma", FormatTag::Kgm),
            ("a.vpr", FormatTag::Vpr),
        ];
        for (name, expect) in cases {
            assert_eq!(detect(name), expect, "{name}");
        }
    }

    #[test]
    fn detection_is_case_insensitive_and_stable() {
        let name = "周杰伦 - 晴天.NcM";
        assert_eq!(detect(name), FormatTag::Ncm);
        assert_eq!(detect(name), detect(name));
        assert_eq!(detect("x.QMCFLAC"), FormatTag::Qmc);
    }

    #[test]
    fn everything_else_is_normal() {
        for name in ["song.mp3", "song", "ncm", ".ncm", "dir.ncm/song.flac", "a.qmc4", ""] {
            assert_eq!(detect(name), FormatTag::Normal, "{name}");
        }
        assert!(!FormatTag::Normal.is_encrypted());
        assert!(FormatTag::Vpr.is_encrypted());
    }
}
