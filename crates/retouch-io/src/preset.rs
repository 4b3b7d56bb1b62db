//! Pipeline presets on disk.
//!
//! A preset is the JSON record list written by
//! [`retouch_pipeline::persist::to_json`].

use std::path::Path;

use retouch_pipeline::{Catalog, Pipeline, SkippedRecord, persist};

use crate::error::IoError;

/// Read a preset and rebuild its pipeline against `catalog`.
///
/// Records with an unknown kind or bad parameters are skipped and
/// returned alongside the pipeline.
///
/// # Errors
///
/// Returns [`IoError::Io`] if the file cannot be read and
/// [`IoError::Preset`] if it is not a JSON record list.
pub fn load_preset(
    path: impl AsRef<Path>,
    catalog: &Catalog,
) -> Result<(Pipeline, Vec<SkippedRecord>), IoError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (pipeline, skipped) =
        persist::from_json(&json, catalog).map_err(|source| IoError::Preset {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(
        path = %path.display(),
        operations = pipeline.len(),
        skipped = skipped.len(),
        "preset loaded"
    );
    Ok((pipeline, skipped))
}

/// Write `pipeline` as a preset.
///
/// # Errors
///
/// Returns [`IoError::Preset`] if a parameter cannot be encoded and
/// [`IoError::Io`] if the file cannot be written.
pub fn save_preset(pipeline: &Pipeline, path: impl AsRef<Path>) -> Result<(), IoError> {
    let path = path.as_ref();
    let json = persist::to_json(pipeline).map_err(|source| IoError::Preset {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn non_list_json_is_a_preset_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"kind": "grayscale"}"#).unwrap();
        let err = load_preset(&path, &Catalog::builtin()).unwrap_err();
        assert!(matches!(err, IoError::Preset { .. }));
    }

    #[test]
    fn unknown_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.json");
        std::fs::write(
            &path,
            r#"[{"kind": "grayscale"}, {"kind": "sepia"}, {"kind": "invert", "params": {}}]"#,
        )
        .unwrap();
        let (pipeline, skipped) = load_preset(&path, &Catalog::builtin()).unwrap();
        assert_eq!(pipeline.kinds(), vec!["grayscale", "invert"]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].index, 1);
        assert_eq!(skipped[0].kind, "sepia");
    }

    #[test]
    fn corrupt_record_does_not_block_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("damaged.json");
        std::fs::write(
            &path,
            r#"[
                {"kind": "invert"},
                {"kind": "gamma", "params": {"gamma": null}},
                {"kind": "grayscale"}
            ]"#,
        )
        .unwrap();
        let (pipeline, skipped) = load_preset(&path, &Catalog::builtin()).unwrap();
        assert_eq!(pipeline.kinds(), vec!["invert", "grayscale"]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].index, 1);
        assert_eq!(skipped[0].kind, "gamma");
    }
}
