use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDateTime;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};

use super::{TableEvent, event::CompletionGuard};
use crate::{
    Error,
    api::{ExportQuery, RecordsBackend},
    dataset::Dataset,
};

const EXPORT_EXTENSION: &str = "xlsx";

/// A spreadsheet written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub bytes: usize,
    pub filename: String,
}

/// Runs at most one export at a time. Exports ignore pagination: the query
/// only carries the sort and the committed search.
pub struct ExportController {
    exporting: bool,
    export_seq: u64,
    task: Option<JoinHandle<()>>,
    export_dir: PathBuf,
}

impl ExportController {
    pub fn new(export_dir: PathBuf) -> Self {
        Self {
            exporting: false,
            export_seq: 0,
            task: None,
            export_dir,
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn start(
        &mut self,
        backend: Arc<dyn RecordsBackend>,
        dataset: Dataset,
        query: ExportQuery,
        tx: &UnboundedSender<TableEvent>,
    ) -> bool {
        if self.exporting {
            tracing::debug!(dataset = %dataset, "export_ignored_in_flight");
            return false;
        }
        self.exporting = true;
        let export_id = self.next_export_id();
        let export_dir = self.export_dir.clone();
        let label = dataset.label();
        tracing::debug!(dataset = %dataset, export_id, sort = ?query.sort, search = %query.search, "export_start");
        let guard = CompletionGuard::new(tx.clone(), move |result| TableEvent::ExportFinished {
            export_id,
            result,
        });
        self.task = Some(tokio::spawn(async move {
            let result = async {
                let payload = backend.export(dataset, &query).await?;
                let filename = payload.filename.unwrap_or_else(|| {
                    fallback_export_filename(label, chrono::Local::now().naive_local())
                });
                save_export(&export_dir, &filename, &payload.bytes).await
            }
            .await;
            guard.complete(result);
        }));
        true
    }

    /// Clear the in-flight flag for `export_id`. Results from a cancelled or
    /// superseded export are ignored.
    pub fn finish(&mut self, export_id: u64) -> bool {
        if !self.exporting || export_id != self.export_seq {
            tracing::trace!(export_id, current = self.export_seq, "stale_export_dropped");
            return false;
        }
        self.exporting = false;
        self.task = None;
        true
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.export_seq = self.export_seq.saturating_add(1);
        self.exporting = false;
    }

    fn next_export_id(&mut self) -> u64 {
        self.export_seq = self.export_seq.saturating_add(1);
        self.export_seq
    }
}

impl Drop for ExportController {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// `{label}_{YYYYMMDD_HHMMSS}.xlsx` for when the server names no file.
pub fn fallback_export_filename(label: &str, now: NaiveDateTime) -> String {
    format!(
        "{}_{}.{EXPORT_EXTENSION}",
        sanitize_label(label),
        now.format("%Y%m%d_%H%M%S")
    )
}

fn sanitize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars().flat_map(char::to_lowercase) {
        let ch = fold_accent(ch);
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "export".to_string()
    } else {
        trimmed.to_string()
    }
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Write `bytes` under `dir`, never overwriting an existing file.
pub async fn save_export(dir: &Path, filename: &str, bytes: &[u8]) -> Result<ExportOutcome, Error> {
    if bytes.is_empty() {
        return Err(Error::EmptyPayload);
    }
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir).await.map_err(Error::Save)?;
    }
    let filename = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or("export.xlsx")
        .to_string();
    let path = unique_path(dir, &filename).await;
    tokio::fs::write(&path, bytes).await.map_err(Error::Save)?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or(filename);
    tracing::info!(path = %path.display(), bytes = bytes.len(), "export_saved");
    Ok(ExportOutcome {
        path,
        bytes: bytes.len(),
        filename,
    })
}

async fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }
    let (stem, extension) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };
    let mut counter = 1u32;
    loop {
        let name = match extension {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = dir.join(name);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .expect("valid timestamp")
    }

    #[test]
    fn fallback_filename_folds_accents() {
        assert_eq!(
            fallback_export_filename("Integrações", at(9, 5, 1)),
            "integracoes_20240307_090501.xlsx"
        );
        assert_eq!(
            fallback_export_filename("Ocorrências", at(23, 59, 59)),
            "ocorrencias_20240307_235959.xlsx"
        );
    }

    #[test]
    fn sanitize_label_collapses_separators() {
        assert_eq!(sanitize_label("Minhas  Exportações/2024"), "minhas_exportacoes_2024");
        assert_eq!(sanitize_label("***"), "export");
    }

    #[tokio::test]
    async fn save_export_never_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = save_export(dir.path(), "relatorio.xlsx", b"one")
            .await
            .expect("first save");
        let second = save_export(dir.path(), "relatorio.xlsx", b"two")
            .await
            .expect("second save");
        assert_eq!(first.filename, "relatorio.xlsx");
        assert_eq!(second.filename, "relatorio_1.xlsx");
        assert_eq!(std::fs::read(&second.path).expect("read"), b"two");
        assert_eq!(second.bytes, 3);
    }

    #[tokio::test]
    async fn save_export_strips_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = save_export(dir.path(), "../../etc/dados.xlsx", b"x")
            .await
            .expect("save");
        assert_eq!(outcome.path, dir.path().join("dados.xlsx"));
    }

    #[tokio::test]
    async fn save_export_rejects_empty_payload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = save_export(dir.path(), "a.xlsx", b"").await.unwrap_err();
        assert!(matches!(err, Error::EmptyPayload));
    }

    #[test]
    fn stale_export_results_are_ignored() {
        let mut export = ExportController::new(PathBuf::from("."));
        export.exporting = true;
        let id = export.next_export_id();
        assert!(!export.finish(id + 1));
        assert!(export.is_exporting());
        assert!(export.finish(id));
        assert!(!export.is_exporting());
    }
}
