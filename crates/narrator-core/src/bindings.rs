use std::fs;
use std::path::Path;

use ts_rs::TS;

use crate::errors::{ErrorInfo, ErrorSeverity, ErrorType};
use crate::events::SyncEvent;
use crate::pagination::{ExtractionMethod, PageMapping};
use crate::playback::PlaybackState;

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> Result<(), String> {
    T::export_all_to(out_dir).map_err(|err| err.to_string())
}

/// Regenerate the TypeScript declarations for every type a front end sees.
pub fn export_ts_bindings(out_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|err| format!("Failed to create {}: {err}", out_dir.display()))?;

    for entry in fs::read_dir(out_dir)
        .map_err(|err| format!("Failed to list {}: {err}", out_dir.display()))?
    {
        let entry = entry.map_err(|err| format!("Failed to read entry: {err}"))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path)
                .map_err(|err| format!("Failed to remove {}: {err}", path.display()))?;
        }
    }

    export_single_type::<PlaybackState>(out_dir)?;
    export_single_type::<PageMapping>(out_dir)?;
    export_single_type::<ExtractionMethod>(out_dir)?;
    export_single_type::<ErrorType>(out_dir)?;
    export_single_type::<ErrorSeverity>(out_dir)?;
    export_single_type::<ErrorInfo>(out_dir)?;
    export_single_type::<SyncEvent>(out_dir)?;

    let index_content = r#"export type { PlaybackState } from "./PlaybackState";
export type { PageMapping } from "./PageMapping";
export type { ExtractionMethod } from "./ExtractionMethod";
export type { ErrorType } from "./ErrorType";
export type { ErrorSeverity } from "./ErrorSeverity";
export type { ErrorInfo } from "./ErrorInfo";
export type { SyncEvent } from "./SyncEvent";
"#;

    fs::write(out_dir.join("index.ts"), index_content).map_err(|err| {
        format!(
            "Failed to write {}: {err}",
            out_dir.join("index.ts").display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::export_ts_bindings;
    use std::fs;

    #[test]
    fn export_replaces_stale_declarations() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Removed.ts"), "export type Removed = never;\n").unwrap();
        fs::write(dir.path().join("notes.md"), "kept\n").unwrap();

        export_ts_bindings(dir.path()).unwrap();

        assert!(!dir.path().join("Removed.ts").exists());
        assert!(dir.path().join("notes.md").exists());
        for name in ["PlaybackState", "PageMapping", "ErrorInfo", "SyncEvent"] {
            assert!(dir.path().join(format!("{name}.ts")).exists(), "{name}.ts missing");
        }
        let index = fs::read_to_string(dir.path().join("index.ts")).unwrap();
        assert!(index.contains(r#"export type { SyncEvent } from "./SyncEvent";"#));
        let event = fs::read_to_string(dir.path().join("SyncEvent.ts")).unwrap();
        assert!(event.contains("state_changed"));
    }
}
