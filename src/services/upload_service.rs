// src/services/upload_service.rs
//
// Anexos do formulário público: validação, gravação em disco e localização
// para download/visualização.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::TicketRepository,
    models::{auth::Role, ticket::UploadedFile},
    services::auth::SessionContext,
};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const PUBLIC_PREFIX: &str = "/uploads/";

const ALLOWED_MIME: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const ALLOWED_EXT: &[&str] = &["pdf", "png", "jpg", "jpeg", "doc", "docx", "xls", "xlsx"];

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Aceito pelo tipo MIME declarado ou, na falta dele, pela extensão.
pub fn is_allowed(file_name: &str, content_type: Option<&str>) -> bool {
    if content_type.is_some_and(|ct| ALLOWED_MIME.contains(&ct)) {
        return true;
    }
    extension(file_name).is_some_and(|ext| ALLOWED_EXT.contains(&ext.as_str()))
}

pub fn validate(file: &UploadedFile) -> Result<(), AppError> {
    if !is_allowed(&file.file_name, file.content_type.as_deref()) {
        return Err(AppError::UnsupportedFileType);
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::FileTooLarge);
    }
    Ok(())
}

/// Só o nome do arquivo, sem diretórios nem separadores.
pub fn base_name(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    match last {
        "." | ".." => String::new(),
        other => other.to_string(),
    }
}

/// Remove o prefixo `<10 a 14 dígitos>-` quando presente.
pub fn strip_timestamp_prefix(name: &str) -> &str {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if (10..=14).contains(&digits) && name.as_bytes().get(digits) == Some(&b'-') {
        &name[digits + 1..]
    } else {
        name
    }
}

fn has_timestamp_prefix(name: &str) -> bool {
    strip_timestamp_prefix(name).len() != name.len()
}

/// Nome gravado em disco: prefixo de timestamp, exceto se o nome já tiver um.
pub fn stored_name(original: &str, millis: i64) -> String {
    let original = base_name(original);
    if has_timestamp_prefix(&original) {
        original
    } else {
        format!("{millis}-{original}")
    }
}

// As formas em que um nome pedido pode ter sido gravado
#[derive(Debug, Clone, PartialEq)]
pub struct NameVariants {
    pub requested: String,
    pub plain: String,
    pub underscored: String,
}

impl NameVariants {
    pub fn from_request(raw: &str) -> Self {
        let requested = base_name(raw);
        let plain = strip_timestamp_prefix(&requested).to_string();
        let underscored = plain.split_whitespace().collect::<Vec<_>>().join("_");
        Self {
            requested,
            plain,
            underscored,
        }
    }

    pub fn public_paths(&self) -> Vec<String> {
        [&self.requested, &self.plain, &self.underscored]
            .iter()
            .map(|name| format!("{PUBLIC_PREFIX}{name}"))
            .collect()
    }

    /// Padrões LIKE para `/uploads/<qualquer coisa>-<nome>`.
    pub fn prefixed_patterns(&self) -> Vec<String> {
        [&self.plain, &self.underscored]
            .iter()
            .map(|name| format!("{PUBLIC_PREFIX}%-{}", escape_like(name)))
            .collect()
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Procura o arquivo físico: nomes exatos primeiro, depois qualquer `<timestamp>-<nome>`.
pub async fn find_on_disk(dir: &Path, variants: &NameVariants) -> Result<Option<PathBuf>, AppError> {
    for name in [&variants.requested, &variants.plain, &variants.underscored] {
        if name.is_empty() {
            continue;
        }
        let candidate = dir.join(name);
        if let Ok(meta) = tokio::fs::metadata(&candidate).await {
            if meta.is_file() {
                return Ok(Some(candidate));
            }
        }
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !has_timestamp_prefix(file_name) {
            continue;
        }
        let rest = strip_timestamp_prefix(file_name);
        let matches = rest.eq_ignore_ascii_case(&variants.plain)
            || rest.eq_ignore_ascii_case(&variants.underscored);
        if matches && entry.file_type().await?.is_file() {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Tipo para visualização inline; o resto vai como binário.
pub fn preview_content_type(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub original_name: String,
    pub public_path: String,
}

#[derive(Debug, Clone)]
pub struct ServedFile {
    pub path: PathBuf,
    /// Nome mostrado ao usuário (sem o prefixo).
    pub display_name: String,
}

#[derive(Clone)]
pub struct UploadService {
    dir: PathBuf,
    ticket_repo: TicketRepository,
}

impl UploadService {
    pub fn new(dir: PathBuf, ticket_repo: TicketRepository) -> Self {
        Self { dir, ticket_repo }
    }

    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub async fn store(&self, file: &UploadedFile) -> Result<StoredUpload, AppError> {
        validate(file)?;
        let original_name = base_name(&file.file_name);
        if original_name.is_empty() {
            return Err(AppError::UnsupportedFileType);
        }
        let name = stored_name(&original_name, Utc::now().timestamp_millis());

        tokio::fs::write(self.dir.join(&name), &file.bytes).await?;
        tracing::info!(file = %name, bytes = file.bytes.len(), "Anexo gravado");

        Ok(StoredUpload {
            original_name,
            public_path: format!("{PUBLIC_PREFIX}{name}"),
        })
    }

    /// Resolve o anexo pedido, checando se algum caso o referencia e se o
    /// responsável é o dono do caso.
    pub async fn locate(&self, raw_name: &str, ctx: &SessionContext) -> Result<ServedFile, AppError> {
        let variants = NameVariants::from_request(raw_name);
        if variants.plain.is_empty() {
            return Err(AppError::NotFound("not_found"));
        }

        let owner = self
            .ticket_repo
            .find_attachment_owner(&variants.public_paths(), &variants.prefixed_patterns())
            .await?
            .ok_or(AppError::NotFound("not_found"))?;

        if ctx.role == Role::Responsible && owner != Some(ctx.user_id) {
            return Err(AppError::Forbidden("forbidden"));
        }

        let path = find_on_disk(&self.dir, &variants)
            .await?
            .ok_or(AppError::NotFound("not_found"))?;

        Ok(ServedFile {
            path,
            display_name: variants.plain,
        })
    }
}
