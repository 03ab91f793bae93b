//! Path validation for rendered mirror paths.
//!
//! Record filenames come from the camera and the path template comes from
//! configuration; neither is trusted to stay inside the mirror root.

use crate::error::{ErrorKind, Result};
use std::path::PathBuf;

/// Turns a `/`-separated string into a path relative to the mirror root.
///
/// Segments are trimmed of surrounding whitespace, so a template written as
/// `{device} / {year}` renders the same as `{device}/{year}`. Empty and `.`
/// segments are dropped and `..` pops the previous segment. The result is
/// rejected if it would leave the root, contains a null byte or a backslash,
/// or ends up empty.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use camsync_mirror::validate_path;
/// assert!(validate_path("cam1/2024/05/17/20240517101500_010.h264").is_ok());
/// assert!(validate_path("../etc/passwd").is_err());
/// assert_eq!(validate_path(" /cam1// 2024 /./05/").unwrap(), Path::new("cam1/2024/05"));
/// ```
pub fn validate(raw: &str) -> Result<PathBuf> {
    let invalid = || ErrorKind::InvalidPath(PathBuf::from(raw));
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/').map(str::trim) {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
            // A backslash is a separator on Windows and never part of a camera filename.
            _ if segment.contains(['\0', '\\']) => exn::bail!(invalid()),
            _ => segments.push(segment),
        }
    }
    if segments.is_empty() {
        exn::bail!(invalid());
    }
    Ok(segments.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[rstest]
    #[case("cam1/2024/05/17/20240517.h264", "cam1/2024/05/17/20240517.h264")]
    #[case("cam1//2024//05", "cam1/2024/05")]
    #[case("./cam1/./2024/", "cam1/2024")]
    #[case("/cam1/2024", "cam1/2024")]
    #[case("cam1/tmp/../2024", "cam1/2024")]
    #[case(" cam1 / 2024 /clip.h264 ", "cam1/2024/clip.h264")]
    #[case("cam1/ . /2024", "cam1/2024")]
    fn test_normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("//")]
    #[case(" / ")]
    #[case("..")]
    #[case(" .. /cam1")]
    #[case("../cam1/record.h264")]
    #[case("cam1/../../record.h264")]
    #[case("cam1/rec\0ord.h264")]
    #[case("cam1\\..\\..\\record.h264")]
    fn test_rejects(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
