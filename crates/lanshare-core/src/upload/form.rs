//! 上传表单解析
//!
//! 表单中固定有 `upfile1`..`upfileN` 共 N 个文件字段（槽位）。
//! 槽位内容不超过内存上限（默认 32 MiB）时保存在内存中，超过后写入匿名临时文件。

use log::{debug, warn};

use axum::extract::multipart::{Field, Multipart};
use std::collections::BTreeMap;
use std::io::{self, SeekFrom};
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWrite, AsyncWriteExt};

/// 每次请求最多处理的文件数
pub const MAX_UPLOAD_SLOTS: usize = 5;

/// 单个槽位保存在内存中的默认上限
pub const DEFAULT_MEMORY_LIMIT: usize = 32 << 20;

const SLOT_FIELD_PREFIX: &str = "upfile";

/// 槽位序号对应的表单字段名（从 1 开始）
pub fn slot_field_name(index: usize) -> String {
    format!("{SLOT_FIELD_PREFIX}{index}")
}

/// 字段名对应的槽位序号，不属于 1..=N 时返回 `None`
pub fn slot_index(field_name: &str) -> Option<usize> {
    let index: usize = field_name.strip_prefix(SLOT_FIELD_PREFIX)?.parse().ok()?;
    (1..=MAX_UPLOAD_SLOTS).contains(&index).then_some(index)
}

enum SlotBody {
    Memory(Vec<u8>),
    Spooled(File),
    /// 读取请求体时出错，写入时报告失败
    Unreadable(String),
}

/// 一个已提交的槽位
pub struct UploadSlot {
    filename: String,
    body: SlotBody,
}

impl UploadSlot {
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            body: SlotBody::Memory(data.into()),
        }
    }

    /// 请求体读取失败的槽位
    pub(crate) fn unreadable(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            body: SlotBody::Unreadable(reason.into()),
        }
    }

    /// 客户端声明的文件名
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// 读取请求体时的错误；内容完整时为 `None`
    pub fn read_error(&self) -> Option<&str> {
        match &self.body {
            SlotBody::Unreadable(reason) => Some(reason),
            _ => None,
        }
    }

    /// 把内容完整写入 `dest`，返回写入字节数
    pub async fn copy_to<W>(self, dest: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        match self.body {
            SlotBody::Memory(data) => {
                dest.write_all(&data).await?;
                Ok(data.len() as u64)
            }
            SlotBody::Spooled(mut file) => tokio::io::copy(&mut file, dest).await,
            SlotBody::Unreadable(reason) => Err(io::Error::other(reason)),
        }
    }
}

/// 一次上传请求中的全部槽位
#[derive(Default)]
pub struct UploadForm {
    slots: BTreeMap<usize, UploadSlot>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入槽位；序号越界或槽位已被占用时返回 `false`
    pub fn insert(&mut self, index: usize, slot: UploadSlot) -> bool {
        if !(1..=MAX_UPLOAD_SLOTS).contains(&index) || self.slots.contains_key(&index) {
            return false;
        }
        self.slots.insert(index, slot);
        true
    }

    pub fn take(&mut self, index: usize) -> Option<UploadSlot> {
        self.slots.remove(&index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 读取 multipart 请求体
    ///
    /// 只保留槽位字段，同名字段以第一个为准。
    /// 请求体中途出错时保留已读到的槽位。
    /// 超过 `memory_limit` 字节的槽位写入临时文件。
    pub async fn from_multipart(mut multipart: Multipart, memory_limit: usize) -> Self {
        let mut form = Self::new();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    warn!("Multipart stream error: {}", e.body_text());
                    break;
                }
            };

            let Some(index) = field.name().and_then(slot_index) else {
                debug!("Ignoring form field {:?}", field.name());
                continue;
            };
            if form.slots.contains_key(&index) {
                debug!("Ignoring duplicate field {}", slot_field_name(index));
                continue;
            }

            let filename = field.file_name().unwrap_or_default().to_string();
            match read_body(field, memory_limit).await {
                Ok(body) => {
                    form.insert(index, UploadSlot { filename, body });
                }
                Err(e) => {
                    warn!("Failed to read {}: {}", slot_field_name(index), e);
                    form.insert(index, UploadSlot::unreadable(filename, e.to_string()));
                    break;
                }
            }
        }

        form
    }
}

async fn read_body(mut field: Field<'_>, memory_limit: usize) -> io::Result<SlotBody> {
    let mut buffer = Vec::new();
    let mut spool: Option<File> = None;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| io::Error::other(e.body_text()))?
    {
        if let Some(file) = spool.as_mut() {
            file.write_all(&chunk).await?;
            continue;
        }

        if buffer.len() + chunk.len() > memory_limit {
            let mut file = File::from_std(tempfile::tempfile()?);
            file.write_all(&buffer).await?;
            file.write_all(&chunk).await?;
            buffer = Vec::new();
            spool = Some(file);
        } else {
            buffer.extend_from_slice(&chunk);
        }
    }

    match spool {
        Some(mut file) => {
            file.flush().await?;
            file.seek(SeekFrom::Start(0)).await?;
            Ok(SlotBody::Spooled(file))
        }
        None => Ok(SlotBody::Memory(buffer)),
    }
}
