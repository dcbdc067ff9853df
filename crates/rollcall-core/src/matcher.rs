//! Best-match selection over a reference-image folder.
//!
//! The scan delegates every comparison to the [`FaceVerifier`] capability
//! and only decides which result to keep. Reference images are visited in
//! lexicographic filename order so the outcome is deterministic across
//! filesystems, and a distance tie keeps the earlier name.

use crate::types::{FaceVerifier, VerifierError};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("reference folder unreadable: {0}")]
    FolderUnreadable(std::io::Error),
}

/// The winning reference image of a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct BestMatch {
    /// File name of the matched reference image.
    pub image: String,
    pub distance: f32,
}

/// Aggregated result of scanning one identity's reference folder.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Minimum-distance verified entry, if any reference image verified.
    pub best: Option<BestMatch>,
    /// Reference images compared.
    pub scanned: usize,
    /// Comparisons that errored; excluded from best-match consideration.
    pub failed: usize,
}

/// Scan `folder` and return the minimum-distance verified match against
/// `probe`.
///
/// A comparison error on one reference image is logged and counted but
/// never aborts the scan; an entry that is not verified is simply not a
/// candidate. `best = None` means no reference image in the folder passed
/// the verifier.
pub fn best_match<V: FaceVerifier + ?Sized>(
    verifier: &mut V,
    folder: &Path,
    probe: &Path,
) -> Result<MatchOutcome, MatcherError> {
    let mut names: Vec<String> = std::fs::read_dir(folder)
        .map_err(MatcherError::FolderUnreadable)?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if !entry.file_type().ok()?.is_file() {
                return None;
            }
            entry.file_name().into_string().ok()
        })
        .collect();
    names.sort_unstable();

    let mut outcome = MatchOutcome {
        best: None,
        scanned: 0,
        failed: 0,
    };

    for name in names {
        let reference = folder.join(&name);
        outcome.scanned += 1;

        let verification = match verifier.verify(&reference, probe) {
            Ok(v) => v,
            Err(e) => {
                outcome.failed += 1;
                log_comparison_error(&name, &e);
                continue;
            }
        };

        tracing::debug!(
            image = %name,
            verified = verification.verified,
            distance = verification.distance,
            "reference compared"
        );

        if !verification.verified {
            continue;
        }

        // Strict < keeps the lexicographically-first name on a tie.
        let better = match &outcome.best {
            None => true,
            Some(prev) => verification.distance < prev.distance,
        };
        if better {
            outcome.best = Some(BestMatch {
                image: name,
                distance: verification.distance,
            });
        }
    }

    if outcome.failed > 0 {
        tracing::warn!(
            folder = %folder.display(),
            failed = outcome.failed,
            scanned = outcome.scanned,
            "some reference comparisons errored"
        );
    }

    Ok(outcome)
}

fn log_comparison_error(image: &str, err: &VerifierError) {
    tracing::warn!(image = %image, error = %err, "reference comparison failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verification;
    use std::collections::HashMap;
    use std::fs;

    /// Verifier scripted by reference file name.
    struct ScriptedVerifier {
        script: HashMap<String, Result<Verification, VerifierError>>,
    }

    impl ScriptedVerifier {
        fn new(entries: Vec<(&str, Result<Verification, VerifierError>)>) -> Self {
            Self {
                script: entries
                    .into_iter()
                    .map(|(name, result)| (name.to_string(), result))
                    .collect(),
            }
        }
    }

    impl FaceVerifier for ScriptedVerifier {
        fn verify(
            &mut self,
            reference: &Path,
            _probe: &Path,
        ) -> Result<Verification, VerifierError> {
            let name = reference.file_name().unwrap().to_str().unwrap();
            match self.script.get(name) {
                Some(Ok(v)) => Ok(*v),
                Some(Err(_)) => Err(VerifierError::Inference("scripted failure".into())),
                None => panic!("unscripted reference {name}"),
            }
        }
    }

    fn folder_with(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            fs::write(dir.path().join(name), b"img").unwrap();
        }
        dir
    }

    fn verified(distance: f32) -> Result<Verification, VerifierError> {
        Ok(Verification { verified: true, distance })
    }

    fn rejected(distance: f32) -> Result<Verification, VerifierError> {
        Ok(Verification { verified: false, distance })
    }

    fn errored() -> Result<Verification, VerifierError> {
        Err(VerifierError::Inference("boom".into()))
    }

    #[test]
    fn test_empty_folder_has_no_candidate() {
        let dir = folder_with(&[]);
        let mut v = ScriptedVerifier::new(vec![]);
        let outcome = best_match(&mut v, dir.path(), Path::new("probe.png")).unwrap();
        assert!(outcome.best.is_none());
        assert_eq!(outcome.scanned, 0);
    }

    #[test]
    fn test_minimum_distance_wins() {
        let dir = folder_with(&["a.png", "b.png", "c.png"]);
        let mut v = ScriptedVerifier::new(vec![
            ("a.png", verified(0.5)),
            ("b.png", verified(0.3)),
            ("c.png", verified(0.4)),
        ]);
        let outcome = best_match(&mut v, dir.path(), Path::new("probe.png")).unwrap();
        let best = outcome.best.unwrap();
        assert_eq!(best.image, "b.png");
        assert!((best.distance - 0.3).abs() < 1e-6);
        assert_eq!(outcome.scanned, 3);
        assert_eq!(outcome.failed, 0);
    }

    #[test]
    fn test_unverified_entries_are_not_candidates() {
        let dir = folder_with(&["a.png", "b.png"]);
        // The closest entry is not verified, so it must not win.
        let mut v = ScriptedVerifier::new(vec![
            ("a.png", rejected(0.1)),
            ("b.png", verified(0.6)),
        ]);
        let outcome = best_match(&mut v, dir.path(), Path::new("probe.png")).unwrap();
        assert_eq!(outcome.best.unwrap().image, "b.png");
    }

    #[test]
    fn test_comparison_error_is_skipped_not_fatal() {
        let dir = folder_with(&["a.png", "b.png", "c.png"]);
        let mut v = ScriptedVerifier::new(vec![
            ("a.png", errored()),
            ("b.png", verified(0.4)),
            ("c.png", errored()),
        ]);
        let outcome = best_match(&mut v, dir.path(), Path::new("probe.png")).unwrap();
        assert_eq!(outcome.best.unwrap().image, "b.png");
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.scanned, 3);
    }

    #[test]
    fn test_all_rejected_yields_none() {
        let dir = folder_with(&["a.png", "b.png"]);
        let mut v = ScriptedVerifier::new(vec![
            ("a.png", rejected(0.9)),
            ("b.png", errored()),
        ]);
        let outcome = best_match(&mut v, dir.path(), Path::new("probe.png")).unwrap();
        assert!(outcome.best.is_none());
        assert_eq!(outcome.failed, 1);
    }

    #[test]
    fn test_tie_keeps_lexicographically_first_name() {
        let dir = folder_with(&["z.png", "a.png", "m.png"]);
        let mut v = ScriptedVerifier::new(vec![
            ("a.png", verified(0.4)),
            ("m.png", verified(0.4)),
            ("z.png", verified(0.4)),
        ]);
        let outcome = best_match(&mut v, dir.path(), Path::new("probe.png")).unwrap();
        assert_eq!(outcome.best.unwrap().image, "a.png");
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let mut v = ScriptedVerifier::new(vec![]);
        let result = best_match(&mut v, Path::new("/nonexistent/folder"), Path::new("p.png"));
        assert!(result.is_err());
    }
}
