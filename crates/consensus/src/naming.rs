use std::path::Path;

use crate::{mode::CombinationMode, types::SceneId};

/// Derives output filenames from scene ids by tagging the raw ground-truth
/// token with the mode, e.g. `X_RT.TIF` → `X_RT_Voting.TIF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    pub raw_token: String,
    pub separator: String,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            raw_token: "_RT".to_string(),
            separator: "_".to_string(),
        }
    }
}

impl OutputNaming {
    pub fn new(raw_token: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            raw_token: raw_token.into(),
            separator: separator.into(),
        }
    }

    /// `raw_token` followed by the mode token, as it appears in outputs.
    pub fn derivative_token(&self, mode: CombinationMode) -> String {
        format!("{}{}{}", self.raw_token, self.separator, mode.file_token())
    }

    pub fn output_name(&self, scene: &SceneId, mode: CombinationMode) -> String {
        let id = scene.as_str();
        if let Some(at) = id.rfind(&self.raw_token) {
            let rest = &id[at + self.raw_token.len()..];
            return format!("{}{}{}", &id[..at], self.derivative_token(mode), rest);
        }

        // No raw token: tag the stem so outputs never shadow an input name.
        let suffix = format!("{}{}", self.separator, mode.file_token());
        match id.rfind('.') {
            Some(dot) if dot > 0 => format!("{}{}{}", &id[..dot], suffix, &id[dot..]),
            _ => format!("{id}{suffix}"),
        }
    }

    /// True for files this pipeline wrote itself, in any mode.
    pub fn is_derived(&self, path: &Path) -> bool {
        let Some(stem) = path.file_stem().map(|stem| stem.to_string_lossy()) else {
            return false;
        };
        <CombinationMode as strum::IntoEnumIterator>::iter().any(|mode| {
            stem.contains(&self.derivative_token(mode))
                || stem.ends_with(&format!("{}{}", self.separator, mode.file_token()))
        })
    }
}
