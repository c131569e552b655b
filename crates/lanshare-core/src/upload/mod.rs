//! 多文件上传
//!
//! 每个请求固定启动 N 个 worker（每个槽位一个），各自独立写文件，
//! 结果通过 channel 汇总到收集任务。全部 worker 结束后关闭 channel，
//! 再生成成功/失败两个列表。单个文件失败不会影响其他文件。
//!
//! 文件先写入上传目录下的临时文件，完整写入后再改名为目标文件名，
//! 失败的上传不会破坏已有的同名文件。

pub mod form;

pub use form::{
    DEFAULT_MEMORY_LIMIT, MAX_UPLOAD_SLOTS, UploadForm, UploadSlot, slot_field_name, slot_index,
};

use log::{debug, error, info, warn};

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// 上传过程中的临时文件名前缀
const TEMP_PREFIX: &str = ".lanshare-upload-";

/// 单个槽位的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub slot: usize,
    pub filename: String,
    pub succeeded: bool,
}

/// 一次上传请求的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// 按槽位顺序
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// 上传目录的绝对路径
    pub upload_root: PathBuf,
}

impl UploadReport {
    fn from_outcomes(mut outcomes: Vec<UploadOutcome>, upload_root: PathBuf) -> Self {
        outcomes.sort_by_key(|o| o.slot);
        let (ok, failed): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(|o| o.succeeded);
        Self {
            succeeded: ok.into_iter().map(|o| o.filename).collect(),
            failed: failed.into_iter().map(|o| o.filename).collect(),
            upload_root,
        }
    }
}

/// 上传协调器
#[derive(Debug, Clone)]
pub struct UploadCoordinator {
    root: PathBuf,
    slots: usize,
    memory_limit: usize,
}

impl UploadCoordinator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            slots: MAX_UPLOAD_SLOTS,
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }

    /// 设置单个槽位在内存中保存的上限
    pub fn with_memory_limit(mut self, memory_limit: usize) -> Self {
        self.memory_limit = memory_limit;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }

    /// 处理一次上传，总是返回汇总结果
    pub async fn process(&self, mut form: UploadForm) -> UploadReport {
        let (tx, mut rx) = mpsc::channel::<UploadOutcome>(self.slots);

        let collector = tokio::spawn(async move {
            let mut outcomes = Vec::new();
            while let Some(outcome) = rx.recv().await {
                outcomes.push(outcome);
            }
            outcomes
        });

        let mut workers = JoinSet::new();
        for index in 1..=self.slots {
            let slot = form.take(index);
            let root = self.root.clone();
            let tx = tx.clone();
            workers.spawn(async move {
                store_slot(index, slot, &root, &tx).await;
            });
        }

        // 等待所有 worker 结束后再关闭 channel
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Upload worker failed: {}", e);
            }
        }
        drop(tx);

        let outcomes = collector.await.unwrap_or_else(|e| {
            error!("Upload collector failed: {}", e);
            Vec::new()
        });

        let upload_root = std::path::absolute(&self.root).unwrap_or_else(|_| self.root.clone());
        let report = UploadReport::from_outcomes(outcomes, upload_root);
        info!(
            "Upload finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        report
    }
}

async fn store_slot(
    index: usize,
    slot: Option<UploadSlot>,
    root: &Path,
    outcomes: &mpsc::Sender<UploadOutcome>,
) {
    let Some(slot) = slot else {
        debug!("{} not submitted", slot_field_name(index));
        return;
    };
    if slot.filename().is_empty() {
        debug!("{} has no file selected", slot_field_name(index));
        return;
    }

    let filename = slot.filename().to_string();
    let succeeded = match write_slot(slot, root).await {
        Ok((path, written)) => {
            info!("Saved {:?} ({} bytes)", path, written);
            true
        }
        Err(e) => {
            warn!("Failed to save {}: {}", filename, e);
            false
        }
    };

    let outcome = UploadOutcome {
        slot: index,
        filename,
        succeeded,
    };
    if outcomes.send(outcome).await.is_err() {
        error!("Upload collector is gone, dropping outcome of slot {}", index);
    }
}

async fn write_slot(slot: UploadSlot, root: &Path) -> io::Result<(PathBuf, u64)> {
    let name = sanitize_filename(slot.filename()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "unusable file name")
    })?;
    if let Some(reason) = slot.read_error() {
        return Err(io::Error::other(reason.to_string()));
    }
    let path = root.join(name);

    let (file, temp_path) = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(root)?
        .into_parts();
    let mut file = File::from_std(file);
    let written = slot.copy_to(&mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    // 完整写入后替换同名文件；出错时 temp_path 析构会删除临时文件
    temp_path.persist(&path)?;
    Ok((path, written))
}

/// 只保留文件名的最后一段，`/` 和 `\` 都视为分隔符
pub fn sanitize_filename(declared: &str) -> Option<&str> {
    let name = declared.rsplit(['/', '\\']).next()?;
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.jpg"), Some("photo.jpg"));
        assert_eq!(sanitize_filename("../../etc/passwd"), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.txt"), Some("notes.txt"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[tokio::test]
    async fn test_populated_slots_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut form = UploadForm::new();
        form.insert(1, UploadSlot::from_bytes("a.txt", "alpha"));
        form.insert(3, UploadSlot::from_bytes("b.txt", "bravo"));

        let report = UploadCoordinator::new(dir.path()).process(form).await;

        assert_eq!(report.succeeded, vec!["a.txt", "b.txt"]);
        assert!(report.failed.is_empty());
        assert!(report.upload_root.is_absolute());
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "bravo");
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        // 目标路径是目录，创建文件必然失败
        fs::create_dir(dir.path().join("blocked.txt")).unwrap();

        let mut form = UploadForm::new();
        form.insert(1, UploadSlot::from_bytes("a.txt", "alpha"));
        form.insert(2, UploadSlot::from_bytes("blocked.txt", "nope"));
        form.insert(3, UploadSlot::from_bytes("c.txt", "charlie"));

        let report = UploadCoordinator::new(dir.path()).process(form).await;

        assert_eq!(report.succeeded, vec!["a.txt", "c.txt"]);
        assert_eq!(report.failed, vec!["blocked.txt"]);
    }

    #[tokio::test]
    async fn test_empty_filename_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut form = UploadForm::new();
        form.insert(2, UploadSlot::from_bytes("", ""));

        let report = UploadCoordinator::new(dir.path()).process(form).await;

        assert!(report.succeeded.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_existing_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a much longer previous content").unwrap();

        let mut form = UploadForm::new();
        form.insert(1, UploadSlot::from_bytes("a.txt", "new"));
        let report = UploadCoordinator::new(dir.path()).process(form).await;

        assert_eq!(report.succeeded, vec!["a.txt"]);
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_unreadable_slot_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "precious original").unwrap();

        let mut form = UploadForm::new();
        form.insert(1, UploadSlot::from_bytes("a.txt", "alpha"));
        form.insert(2, UploadSlot::unreadable("b.txt", "connection reset"));
        let report = UploadCoordinator::new(dir.path()).process(form).await;

        assert_eq!(report.succeeded, vec!["a.txt"]);
        assert_eq!(report.failed, vec!["b.txt"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("b.txt")).unwrap(),
            "precious original"
        );
        // 不残留临时文件
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| !n.starts_with(TEMP_PREFIX)));
    }

    #[tokio::test]
    async fn test_traversal_name_stays_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("inbox");
        fs::create_dir(&root).unwrap();

        let mut form = UploadForm::new();
        form.insert(1, UploadSlot::from_bytes("../escape.txt", "x"));
        form.insert(2, UploadSlot::from_bytes("..", "y"));
        let report = UploadCoordinator::new(&root).process(form).await;

        assert_eq!(report.succeeded, vec!["../escape.txt"]);
        assert_eq!(report.failed, vec![".."]);
        assert!(root.join("escape.txt").exists());
        assert!(!dir.path().join("escape.txt").exists());
    }
}
