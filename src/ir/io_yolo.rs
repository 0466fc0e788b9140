//! YOLO label loading and image discovery.
//!
//! The dataset keeps images in one directory and labels in a parallel one:
//! `images/IMG_0001.jpg` pairs with `labels/IMG_0001.txt`. Each label line is
//! `class x_center y_center width height`, coordinates normalized to `[0, 1]`.
//! A missing label file means the image has no annotated fruit.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Split};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use super::{BBox, Normalized};
use crate::conversion::{ConversionIssue, ConversionIssueCode};
use crate::error::OrchardError;

/// Image extensions in lookup preference order.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];
pub const LABEL_EXTENSION: &str = "txt";

/// One parsed label line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloBox {
    /// 1-based line number in the label file.
    pub line: usize,
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl YoloBox {
    pub fn bbox(&self) -> BBox<Normalized> {
        BBox::from_cxcywh(self.x_center, self.y_center, self.width, self.height)
    }
}

/// What to do with a label line that does not parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinePolicy {
    /// Fail the whole conversion on the first malformed line.
    #[default]
    Abort,
    /// Record the line in the report and keep going.
    Skip,
}

/// An image file on disk, identified by its stem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceImage {
    pub stem: String,
    pub path: PathBuf,
}

impl SourceImage {
    /// Basename of the image, as written to COCO `file_name`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.stem.clone())
    }
}

/// Lazy iterator over the boxes of one label file.
///
/// Blank lines are skipped. A line that is not valid UTF-8 is reported as
/// malformed like any other bad line. The file handle is released when the
/// iterator is dropped, whether or not it was read to the end.
pub struct LabelLines {
    path: PathBuf,
    lines: Split<BufReader<File>>,
    line_num: usize,
}

impl LabelLines {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for LabelLines {
    type Item = Result<YoloBox, OrchardError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(err) => return Some(Err(OrchardError::read(&self.path, err))),
            };
            self.line_num += 1;

            let Ok(line) = std::str::from_utf8(&raw) else {
                return Some(Err(OrchardError::MalformedLabelLine {
                    path: self.path.clone(),
                    line: self.line_num,
                    message: "invalid UTF-8".to_string(),
                }));
            };

            match parse_label_line(line, &self.path, self.line_num) {
                Ok(Some(row)) => return Some(Ok(row)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Path of the label file for `stem`.
pub fn label_path_for(labels_dir: &Path, stem: &str) -> PathBuf {
    labels_dir.join(format!("{stem}.{LABEL_EXTENSION}"))
}

/// Opens a label file for lazy reading. `Ok(None)` if it does not exist.
pub fn open_labels(path: &Path) -> Result<Option<LabelLines>, OrchardError> {
    match File::open(path) {
        Ok(file) => Ok(Some(LabelLines {
            path: path.to_path_buf(),
            lines: BufReader::new(file).split(b'\n'),
            line_num: 0,
        })),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(OrchardError::read(path, err)),
    }
}

/// Reads every box of a label file under `policy`.
///
/// Skipped lines and a missing file are recorded in `issues`. Read errors
/// always propagate.
pub fn load_boxes(
    path: &Path,
    policy: LinePolicy,
    issues: &mut Vec<ConversionIssue>,
) -> Result<Vec<YoloBox>, OrchardError> {
    let Some(lines) = open_labels(path)? else {
        warn!("label file not found: {}", path.display());
        issues.push(
            ConversionIssue::warning(
                ConversionIssueCode::MissingLabelFile,
                "label file not found; image treated as having no boxes",
            )
            .at(path, None),
        );
        return Ok(Vec::new());
    };

    let mut boxes = Vec::new();
    for row in lines {
        match row {
            Ok(row) => boxes.push(row),
            Err(OrchardError::MalformedLabelLine {
                path,
                line,
                message,
            }) if policy == LinePolicy::Skip => {
                warn!("skipping {}:{}: {}", path.display(), line, message);
                issues.push(
                    ConversionIssue::warning(ConversionIssueCode::SkippedMalformedLine, message)
                        .at(&path, Some(line)),
                );
            }
            Err(err) => return Err(err),
        }
    }

    debug!("{}: {} box(es)", path.display(), boxes.len());
    Ok(boxes)
}

/// Parses one label line. Blank lines yield `Ok(None)`.
pub fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<YoloBox>, OrchardError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let malformed = |message: String| OrchardError::MalformedLabelLine {
        path: file_path.to_path_buf(),
        line: line_num,
        message,
    };

    // Six tokens are enough to tell "too many" apart from "exactly five".
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();
    match tokens.len() {
        5 => {}
        6 => return Err(malformed("expected 5 fields, found more".to_string())),
        n => return Err(malformed(format!("expected 5 fields, found {n}"))),
    }

    let class_id = tokens[0].parse::<usize>().map_err(|_| {
        malformed(format!(
            "invalid class_id '{}'; expected non-negative integer",
            tokens[0]
        ))
    })?;

    let x_center = parse_unit_token(tokens[1], "x_center").map_err(malformed)?;
    let y_center = parse_unit_token(tokens[2], "y_center").map_err(malformed)?;
    let width = parse_unit_token(tokens[3], "width").map_err(malformed)?;
    let height = parse_unit_token(tokens[4], "height").map_err(malformed)?;

    Ok(Some(YoloBox {
        line: line_num,
        class_id,
        x_center,
        y_center,
        width,
        height,
    }))
}

/// Fuzz-only entrypoint for single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), OrchardError> {
    let _ = parse_label_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}

fn parse_unit_token(raw: &str, field_name: &str) -> Result<f64, String> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| format!("invalid {field_name} '{raw}'; expected floating-point number"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{field_name} {raw} is outside [0, 1]"));
    }

    Ok(value)
}

/// Lists the images directly inside `images_dir`, sorted by stem.
///
/// When several files share a stem the one with the preferred extension
/// (see [`IMAGE_EXTENSIONS`]) wins.
pub fn collect_images(images_dir: &Path) -> Result<Vec<SourceImage>, OrchardError> {
    if !images_dir.is_dir() {
        return Err(OrchardError::config(format!(
            "image directory '{}' does not exist",
            images_dir.display()
        )));
    }

    let mut found: Vec<(String, usize, PathBuf)> = Vec::new();
    for entry in WalkDir::new(images_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = entry.map_err(|source| OrchardError::ImageDirTraversal {
            path: images_dir.to_path_buf(),
            message: source.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(rank) = extension_rank(path) else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!("skipping image with non UTF-8 name: {}", path.display());
            continue;
        };
        found.push((stem.to_string(), rank, path.to_path_buf()));
    }

    found.sort();

    let mut images: Vec<SourceImage> = Vec::with_capacity(found.len());
    for (stem, _, path) in found {
        if let Some(prev) = images.last() {
            if prev.stem == stem {
                warn!(
                    "ignoring {}; {} has the same stem",
                    path.display(),
                    prev.path.display()
                );
                continue;
            }
        }
        images.push(SourceImage { stem, path });
    }

    Ok(images)
}

/// Finds the image file for `stem`, trying extensions in preference order.
pub fn find_image_for_stem(images_dir: &Path, stem: &str) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| images_dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.is_file())
}

/// Reads `(width, height)` from the image header without decoding pixels.
pub fn read_image_dimensions(path: &Path) -> Result<(u32, u32), OrchardError> {
    let size = imagesize::size(path).map_err(|source| OrchardError::MissingImageDimensions {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;

    let to_u32 = |value: usize, axis: &str| -> Result<u32, OrchardError> {
        u32::try_from(value).map_err(|_| OrchardError::MissingImageDimensions {
            path: path.to_path_buf(),
            message: format!("image {axis} {value} does not fit in u32"),
        })
    };

    let width = to_u32(size.width, "width")?;
    let height = to_u32(size.height, "height")?;
    if width == 0 || height == 0 {
        return Err(OrchardError::MissingImageDimensions {
            path: path.to_path_buf(),
            message: format!("image reports zero size {width}x{height}"),
        });
    }

    Ok((width, height))
}

fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension().and_then(|ext| ext.to_str())?;
    IMAGE_EXTENSIONS
        .iter()
        .position(|allowed| ext.eq_ignore_ascii_case(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parse_label_line_accepts_valid_rows() {
        let parsed = parse_label_line("0 0.5 0.25 0.3 0.1", Path::new("a.txt"), 1)
            .expect("parse should succeed")
            .expect("line should produce a row");

        assert_eq!(
            parsed,
            YoloBox {
                line: 1,
                class_id: 0,
                x_center: 0.5,
                y_center: 0.25,
                width: 0.3,
                height: 0.1,
            }
        );
    }

    #[test]
    fn parse_label_line_skips_blank_rows() {
        let parsed = parse_label_line("  \t ", Path::new("a.txt"), 2).expect("parse ok");
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_label_line_reports_file_and_line_for_four_fields() {
        let err = parse_label_line("0 0.5 0.5 0.2", Path::new("labels/x.txt"), 7).unwrap_err();
        match err {
            OrchardError::MalformedLabelLine {
                path,
                line,
                message,
            } => {
                assert_eq!(path, PathBuf::from("labels/x.txt"));
                assert_eq!(line, 7);
                assert!(message.contains("found 4"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_label_line_rejects_extra_fields() {
        let err = parse_label_line("0 0.1 0.2 0.3 0.4 0.5", Path::new("a.txt"), 1).unwrap_err();
        assert!(matches!(err, OrchardError::MalformedLabelLine { .. }));
    }

    #[test]
    fn parse_label_line_rejects_out_of_range_and_nan() {
        for line in ["0 1.2 0.5 0.1 0.1", "0 0.5 -0.1 0.1 0.1", "0 NaN 0.5 0.1 0.1"] {
            let err = parse_label_line(line, Path::new("a.txt"), 1).unwrap_err();
            assert!(
                matches!(err, OrchardError::MalformedLabelLine { .. }),
                "{line}"
            );
        }
    }

    #[test]
    fn parse_label_line_rejects_fractional_class() {
        let err = parse_label_line("0.5 0.5 0.5 0.1 0.1", Path::new("a.txt"), 1).unwrap_err();
        assert!(matches!(err, OrchardError::MalformedLabelLine { .. }));
    }

    #[test]
    fn open_labels_treats_missing_file_as_none() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let lines = open_labels(&temp.path().join("nope.txt")).expect("open ok");
        assert!(lines.is_none());
    }

    #[test]
    fn label_lines_are_lazy_and_count_blank_lines() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("img.txt");
        fs::write(&path, "0 0.5 0.5 0.2 0.2\n\n0 0.5 0.5\n").expect("write labels");

        let mut lines = open_labels(&path).expect("open").expect("exists");
        assert!(lines.next().expect("first").is_ok());
        match lines.next().expect("second") {
            Err(OrchardError::MalformedLabelLine { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(lines.next().is_none());
    }

    #[test]
    fn load_boxes_skip_policy_records_issue() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("img.txt");
        fs::write(&path, "0 0.5 0.5 0.2 0.2\nbad line\n0 0.1 0.1 0.1 0.1\n").expect("write");

        let mut issues = Vec::new();
        let boxes = load_boxes(&path, LinePolicy::Skip, &mut issues).expect("load");
        assert_eq!(boxes.len(), 2);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConversionIssueCode::SkippedMalformedLine);
        assert_eq!(issues[0].line, Some(2));

        let mut issues = Vec::new();
        let err = load_boxes(&path, LinePolicy::Abort, &mut issues).unwrap_err();
        assert!(matches!(err, OrchardError::MalformedLabelLine { line: 2, .. }));
    }

    #[test]
    fn load_boxes_treats_invalid_utf8_as_malformed_line() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("img.txt");
        fs::write(&path, b"0 0.5 0.5 0.2 0.2\n0 0.5 \xff 0.2 0.2\n0 0.1 0.1 0.1 0.1\n")
            .expect("write");

        let mut issues = Vec::new();
        let err = load_boxes(&path, LinePolicy::Abort, &mut issues).unwrap_err();
        match err {
            OrchardError::MalformedLabelLine {
                path: err_path,
                line,
                message,
            } => {
                assert_eq!(err_path, path);
                assert_eq!(line, 2);
                assert_eq!(message, "invalid UTF-8");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut issues = Vec::new();
        let boxes = load_boxes(&path, LinePolicy::Skip, &mut issues).expect("load");
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[1].line, 3);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConversionIssueCode::SkippedMalformedLine);
        assert_eq!(issues[0].line, Some(2));
    }

    #[test]
    fn label_lines_accept_crlf_endings() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("img.txt");
        fs::write(&path, "0 0.5 0.5 0.2 0.2\r\n0 0.1 0.1 0.1 0.1").expect("write");

        let mut issues = Vec::new();
        let boxes = load_boxes(&path, LinePolicy::Abort, &mut issues).expect("load");
        assert_eq!(boxes.len(), 2);
        assert!(issues.is_empty());
    }

    #[test]
    fn open_labels_names_the_file_on_read_errors() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path().join("labels.txt");
        fs::create_dir(&dir).expect("mkdir");

        let mut lines = open_labels(&dir).expect("open").expect("exists");
        match lines.next().expect("one item") {
            Err(OrchardError::FileRead { path, .. }) => assert_eq!(path, dir),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn load_boxes_missing_file_is_empty_with_warning() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut issues = Vec::new();
        let boxes =
            load_boxes(&temp.path().join("absent.txt"), LinePolicy::Abort, &mut issues).unwrap();
        assert!(boxes.is_empty());
        assert_eq!(issues[0].code, ConversionIssueCode::MissingLabelFile);
    }

    #[test]
    fn collect_images_sorts_and_prefers_jpg() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for name in ["b.jpg", "a.png", "a.jpg", "notes.txt"] {
            fs::write(temp.path().join(name), b"x").expect("write");
        }
        fs::create_dir(temp.path().join("nested")).expect("mkdir");
        fs::write(temp.path().join("nested/c.jpg"), b"x").expect("write nested");

        let images = collect_images(temp.path()).expect("collect");
        let names: Vec<String> = images.iter().map(|img| img.file_name()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn find_image_for_stem_prefers_extension_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("sample.png"), b"dummy").expect("write png");
        fs::write(temp.path().join("sample.jpg"), b"dummy").expect("write jpg");

        let found = find_image_for_stem(temp.path(), "sample").expect("should find image");
        assert!(found.ends_with("sample.jpg"));
        assert!(find_image_for_stem(temp.path(), "other").is_none());
    }

    #[test]
    fn read_image_dimensions_rejects_garbage() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("broken.jpg");
        fs::write(&path, b"not an image").expect("write");

        let err = read_image_dimensions(&path).unwrap_err();
        assert!(matches!(err, OrchardError::MissingImageDimensions { .. }));
    }
}
